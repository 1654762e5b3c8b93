//! Camera Set Library
//!
//! Treats an ordered set of calibrated cameras as one batched observation model
//! for a single 3D landmark. Projecting the landmark through a [`CameraSet`]
//! returns one measurement per camera and, on request, the stacked Jacobians a
//! bundle-adjustment or SLAM back-end needs to linearize the observation:
//! - `F`: derivatives with respect to each camera pose (6 columns)
//! - `E`: derivatives with respect to the landmark (3 columns)
//! - `H`: derivatives with respect to each camera calibration (`DIM - 6` columns)
//!
//! Row-block `i` of every matrix belongs to the `i`-th camera added to the set.
//!
//! The library ships the camera models used to build such sets:
//! - Pinhole camera with optimizable calibration ([`PinholeCamera`])
//! - Pinhole camera with fixed calibration ([`PinholePose`])
//! - Rectified stereo camera ([`StereoCamera`])

pub mod camera;
pub mod camera_set;
pub mod geometry;

// Re-export commonly used types
pub use camera::{
    CameraModel, CameraModelError, Intrinsics, JacobianRequest, Measurement, PinholeCamera,
    PinholePose, Pose3, Projection, StereoCalibration, StereoCamera, StereoPoint2,
};

pub use camera_set::{CameraSet, StackedProjection};
