//! Rectified stereo pair with a fixed calibration.
//!
//! The pose is the one of the left camera. A point at camera-frame position
//! `q` is observed at `u_l = fx * qx / qz + cx`, `u_r = fx * (qx - b) / qz + cx`
//! and `v = fy * qy / qz + cy`, where `b` is the baseline.

use crate::camera::{
    validation, CameraModel, CameraModelError, Intrinsics, JacobianRequest, Measurement, Pose3,
    Projection,
};
use crate::geometry::to_dynamic;
use approx::abs_diff_eq;
use nalgebra::{DVector, Matrix3, Point3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Left and right horizontal image coordinates sharing one row `v`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StereoPoint2 {
    pub u_l: f64,
    pub u_r: f64,
    pub v: f64,
}

impl StereoPoint2 {
    /// Creates a stereo measurement.
    ///
    /// # Arguments
    ///
    /// * `u_l` - Horizontal coordinate in the left image.
    /// * `u_r` - Horizontal coordinate in the right image. For a point in
    ///   front of a rig with positive baseline, `u_r <= u_l`.
    /// * `v` - Row, shared by both rectified images.
    pub fn new(u_l: f64, u_r: f64, v: f64) -> Self {
        StereoPoint2 { u_l, u_r, v }
    }
}

impl Measurement for StereoPoint2 {
    const DIM: usize = 3;

    fn to_vector(&self) -> DVector<f64> {
        DVector::from_vec(vec![self.u_l, self.u_r, self.v])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StereoCalibration {
    pub intrinsics: Intrinsics,
    /// Distance between the two optical centers, along the left camera x axis.
    pub baseline: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StereoCamera {
    pub pose: Pose3,
    pub calibration: StereoCalibration,
}

impl StereoCamera {
    /// Creates a new [`StereoCamera`].
    ///
    /// # Errors
    ///
    /// Fails on an invalid pose, invalid intrinsics or a non-positive baseline.
    pub fn new(pose: Pose3, calibration: StereoCalibration) -> Result<Self, CameraModelError> {
        let camera = StereoCamera { pose, calibration };
        camera.validate_params()?;
        Ok(camera)
    }
}

impl CameraModel for StereoCamera {
    const DIM: usize = 6;
    type Measurement = StereoPoint2;

    fn project(
        &self,
        point: &Point3<f64>,
        request: JacobianRequest,
    ) -> Result<Projection<StereoPoint2>, CameraModelError> {
        let (q, d_pose, d_point) = self.pose.transform_to_with_jacobians(point);
        validation::check_depth(q.z)?;

        let Intrinsics { fx, fy, cx, cy } = self.calibration.intrinsics;
        let b = self.calibration.baseline;
        let inv_z = 1.0 / q.z;
        let inv_z2 = inv_z * inv_z;

        let measurement = StereoPoint2::new(
            fx * q.x * inv_z + cx,
            fx * (q.x - b) * inv_z + cx,
            fy * q.y * inv_z + cy,
        );
        let mut projection = Projection::measurement_only(measurement);

        if request.pose || request.point {
            let d_z_d_q = Matrix3::new(
                fx * inv_z,
                0.0,
                -fx * q.x * inv_z2,
                fx * inv_z,
                0.0,
                -fx * (q.x - b) * inv_z2,
                0.0,
                fy * inv_z,
                -fy * q.y * inv_z2,
            );
            if request.pose {
                projection.pose_jacobian = Some(to_dynamic(&(d_z_d_q * d_pose)));
            }
            if request.point {
                projection.point_jacobian = Some(to_dynamic(&(d_z_d_q * d_point)));
            }
        }

        Ok(projection)
    }

    fn equals(&self, other: &Self, tol: f64) -> bool {
        let (a, b) = (&self.calibration, &other.calibration);
        self.pose.equals(&other.pose, tol)
            && abs_diff_eq!(a.intrinsics.fx, b.intrinsics.fx, epsilon = tol)
            && abs_diff_eq!(a.intrinsics.fy, b.intrinsics.fy, epsilon = tol)
            && abs_diff_eq!(a.intrinsics.cx, b.intrinsics.cx, epsilon = tol)
            && abs_diff_eq!(a.intrinsics.cy, b.intrinsics.cy, epsilon = tol)
            && abs_diff_eq!(a.baseline, b.baseline, epsilon = tol)
    }

    fn validate_params(&self) -> Result<(), CameraModelError> {
        self.pose.validate()?;
        validation::validate_intrinsics(&self.calibration.intrinsics)?;
        let baseline = self.calibration.baseline;
        if baseline <= 0.0 || !baseline.is_finite() {
            return Err(CameraModelError::InvalidParams(format!(
                "Stereo baseline must be positive and finite, got {baseline}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for StereoCamera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let k = &self.calibration.intrinsics;
        write!(
            f,
            "StereoCamera [{} fx: {} fy: {} cx: {} cy: {} baseline: {}]",
            self.pose, k.fx, k.fy, k.cx, k.cy, self.calibration.baseline,
        )
    }
}
