//! Camera capability shared by every model that can be stacked in a
//! [`CameraSet`](crate::camera_set::CameraSet).
//!
//! A camera is parameterized by 6 pose parameters followed by `DIM - 6`
//! calibration parameters. Projecting a world point yields a measurement of
//! fixed dimension and, on request, the Jacobian blocks of that measurement
//! with respect to the pose, the point and the calibration.

use nalgebra::{DMatrix, DVector, Point3, Vector2};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod pinhole;
pub mod pose;
pub mod stereo;

pub use pinhole::{PinholeCamera, PinholePose};
pub use pose::Pose3;
pub use stereo::{StereoCalibration, StereoCamera, StereoPoint2};

/// Number of pose parameters leading every camera parameter vector.
pub const POSE_DIM: usize = 6;

/// Dimension of a 3D landmark.
pub const POINT_DIM: usize = 3;

/// Smallest camera-frame depth at which a point is considered observable.
pub const MIN_DEPTH: f64 = 1.4901161193847656e-8; // sqrt(f64::EPSILON)

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

#[derive(thiserror::Error, Debug)]
pub enum CameraModelError {
    #[error("Projection not observable: point depth {depth} is behind or at the camera center")]
    ProjectionNotObservable { depth: f64 },
    #[error("Focal length must be positive")]
    FocalLengthMustBePositive,
    #[error("Principal point must be finite")]
    PrincipalPointMustBeFinite,
    #[error("Invalid camera parameters: {0}")]
    InvalidParams(String),
    #[error("Camera {camera} returned an invalid {block} Jacobian: {reason}")]
    InvalidJacobian {
        camera: usize,
        block: &'static str,
        reason: String,
    },
    #[error("Expected {expected} measurements, one per camera, found {found}")]
    MeasurementCountMismatch { expected: usize, found: usize },
    #[error("Failed to process YAML: {0}")]
    YamlError(String),
    #[error("Failed to process JSON: {0}")]
    JsonError(String),
    #[error("IO Error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for CameraModelError {
    fn from(err: std::io::Error) -> Self {
        CameraModelError::IOError(err.to_string())
    }
}

impl From<serde_yaml::Error> for CameraModelError {
    fn from(err: serde_yaml::Error) -> Self {
        CameraModelError::YamlError(err.to_string())
    }
}

impl From<serde_json::Error> for CameraModelError {
    fn from(err: serde_json::Error) -> Self {
        CameraModelError::JsonError(err.to_string())
    }
}

/// Selects which derivative blocks a projection should produce.
///
/// Derivatives are a pure side output: the measurement is the same whatever
/// is requested. A request is built from [`JacobianRequest::none`] or
/// [`JacobianRequest::all`] and refined with the `with_*` setters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JacobianRequest {
    pub pose: bool,
    pub point: bool,
    pub calibration: bool,
}

impl JacobianRequest {
    /// Measurement only.
    pub fn none() -> Self {
        Self::default()
    }

    /// Pose, point and calibration blocks.
    pub fn all() -> Self {
        Self {
            pose: true,
            point: true,
            calibration: true,
        }
    }

    /// Sets whether the `ZDim x 6` pose block is requested.
    ///
    /// # Examples
    ///
    /// ```
    /// use camera_set::JacobianRequest;
    ///
    /// let request = JacobianRequest::none().with_pose(true).with_point(true);
    /// assert!(request.pose && request.point && !request.calibration);
    /// ```
    pub fn with_pose(mut self, pose: bool) -> Self {
        self.pose = pose;
        self
    }

    /// Sets whether the `ZDim x 3` point block is requested.
    pub fn with_point(mut self, point: bool) -> Self {
        self.point = point;
        self
    }

    /// Sets whether the `ZDim x (DIM - 6)` calibration block is requested.
    ///
    /// Ignored for cameras without calibration parameters.
    pub fn with_calibration(mut self, calibration: bool) -> Self {
        self.calibration = calibration;
        self
    }

    /// Returns `true` if at least one block is requested.
    pub fn any(&self) -> bool {
        self.pose || self.point || self.calibration
    }
}

/// A measurement produced by a camera, with a fixed dimension `ZDim`.
pub trait Measurement: Clone + fmt::Debug + PartialEq + Send {
    /// Measurement dimension.
    const DIM: usize;

    /// Returns the measurement as a column vector of length [`Measurement::DIM`].
    fn to_vector(&self) -> DVector<f64>;
}

impl Measurement for Vector2<f64> {
    const DIM: usize = 2;

    fn to_vector(&self) -> DVector<f64> {
        DVector::from_column_slice(self.as_slice())
    }
}

/// Result of projecting one point through one camera.
///
/// Each Jacobian block has `Measurement::DIM` rows and is `Some` exactly when
/// it was requested (the calibration block only for cameras with `DIM > 6`).
#[derive(Debug, Clone)]
pub struct Projection<Z> {
    pub measurement: Z,
    /// `ZDim x 6` derivative with respect to the pose.
    pub pose_jacobian: Option<DMatrix<f64>>,
    /// `ZDim x 3` derivative with respect to the point.
    pub point_jacobian: Option<DMatrix<f64>>,
    /// `ZDim x (DIM - 6)` derivative with respect to the calibration.
    pub calibration_jacobian: Option<DMatrix<f64>>,
}

impl<Z> Projection<Z> {
    /// A projection without derivative blocks.
    pub fn measurement_only(measurement: Z) -> Self {
        Projection {
            measurement,
            pose_jacobian: None,
            point_jacobian: None,
            calibration_jacobian: None,
        }
    }
}

/// Trait defining the projection capability of a camera.
///
/// Implementations are homogeneous inside a [`CameraSet`](crate::camera_set::CameraSet):
/// the parameter dimension and the measurement type are fixed by the type.
pub trait CameraModel: Clone + fmt::Debug + fmt::Display + Send + Sync {
    /// Number of parameters: 6 pose parameters followed by the calibration.
    const DIM: usize;

    /// Measurement produced by [`CameraModel::project`].
    type Measurement: Measurement;

    /// Project a world point, computing the requested Jacobian blocks.
    ///
    /// # Errors
    ///
    /// [`CameraModelError::ProjectionNotObservable`] when the point is behind
    /// the camera or at its center.
    fn project(
        &self,
        point: &Point3<f64>,
        request: JacobianRequest,
    ) -> Result<Projection<Self::Measurement>, CameraModelError>;

    /// Equality up to `tol` on every parameter.
    fn equals(&self, other: &Self, tol: f64) -> bool;

    /// Validate camera parameters
    fn validate_params(&self) -> Result<(), CameraModelError>;
}

/// Common validation functions for camera parameters
pub mod validation {
    use super::*;

    /// Focal lengths must be positive and finite, the principal point finite.
    pub fn validate_intrinsics(intrinsics: &Intrinsics) -> Result<(), CameraModelError> {
        let positive = |f: f64| f > 0.0 && f.is_finite();
        if !positive(intrinsics.fx) || !positive(intrinsics.fy) {
            return Err(CameraModelError::FocalLengthMustBePositive);
        }
        if !intrinsics.cx.is_finite() || !intrinsics.cy.is_finite() {
            return Err(CameraModelError::PrincipalPointMustBeFinite);
        }
        Ok(())
    }

    /// Fails with [`CameraModelError::ProjectionNotObservable`] below [`MIN_DEPTH`].
    pub fn check_depth(depth: f64) -> Result<(), CameraModelError> {
        if depth < MIN_DEPTH || !depth.is_finite() {
            return Err(CameraModelError::ProjectionNotObservable { depth });
        }
        Ok(())
    }
}
