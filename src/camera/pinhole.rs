//! Implements the Pinhole camera model on a [`Pose3`].
//!
//! Two flavours share the same projection:
//! * [`PinholeCamera`] optimizes its calibration, `DIM = 6 + 4`, with the
//!   calibration parameters ordered `fx, fy, cx, cy`.
//! * [`PinholePose`] keeps its calibration fixed, `DIM = 6`.
//!
//! A world point `p` is first expressed in the camera frame, `q = R^T (p - t)`,
//! then projected with `u = fx * qx / qz + cx` and `v = fy * qy / qz + cy`.

use crate::camera::{
    validation, CameraModel, CameraModelError, Intrinsics, JacobianRequest, Pose3, Projection,
};
use crate::geometry::to_dynamic;
use approx::abs_diff_eq;
use nalgebra::{Matrix2x3, Matrix2x4, Point3, Vector2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A pinhole camera whose pose and calibration are both parameters.
///
/// # Examples
///
/// ```rust
/// use nalgebra::Point3;
/// use camera_set::camera::{CameraModel, Intrinsics, JacobianRequest, PinholeCamera, Pose3};
///
/// let intrinsics = Intrinsics { fx: 500.0, fy: 500.0, cx: 320.0, cy: 240.0 };
/// let camera = PinholeCamera::new(Pose3::identity(), intrinsics).unwrap();
///
/// let projection = camera
///     .project(&Point3::new(0.1, 0.2, 1.0), JacobianRequest::none())
///     .unwrap();
/// // u = 500 * 0.1 / 1.0 + 320 = 370, v = 500 * 0.2 / 1.0 + 240 = 340
/// assert!((projection.measurement.x - 370.0).abs() < 1e-9);
/// assert!((projection.measurement.y - 340.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinholeCamera {
    pub pose: Pose3,
    pub intrinsics: Intrinsics,
}

/// A pinhole camera with a fixed calibration: only the pose is a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinholePose {
    pub pose: Pose3,
    pub intrinsics: Intrinsics,
}

impl PinholeCamera {
    /// Creates a new [`PinholeCamera`].
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::FocalLengthMustBePositive`]
    /// * [`CameraModelError::PrincipalPointMustBeFinite`]
    /// * [`CameraModelError::InvalidParams`] for a non-unit rotation or a
    ///   non-finite translation.
    pub fn new(pose: Pose3, intrinsics: Intrinsics) -> Result<Self, CameraModelError> {
        let camera = PinholeCamera { pose, intrinsics };
        camera.validate_params()?;
        Ok(camera)
    }
}

impl PinholePose {
    /// Creates a new [`PinholePose`], validating the fixed calibration.
    pub fn new(pose: Pose3, intrinsics: Intrinsics) -> Result<Self, CameraModelError> {
        let camera = PinholePose { pose, intrinsics };
        camera.validate_params()?;
        Ok(camera)
    }
}

/// Projection shared by both pinhole flavours. The calibration block is only
/// produced when `calibrated` is set and it was requested.
fn project_pinhole(
    pose: &Pose3,
    intrinsics: &Intrinsics,
    point: &Point3<f64>,
    request: JacobianRequest,
    calibrated: bool,
) -> Result<Projection<Vector2<f64>>, CameraModelError> {
    let (q, transform_jacobians) = if request.pose || request.point {
        let (q, d_pose, d_point) = pose.transform_to_with_jacobians(point);
        (q, Some((d_pose, d_point)))
    } else {
        (pose.transform_to(point), None)
    };

    validation::check_depth(q.z)?;

    let inv_z = 1.0 / q.z;
    let x = q.x * inv_z;
    let y = q.y * inv_z;
    let Intrinsics { fx, fy, cx, cy } = *intrinsics;

    let mut projection = Projection::measurement_only(Vector2::new(fx * x + cx, fy * y + cy));

    if let Some((d_pose, d_point)) = transform_jacobians {
        let d_uv_d_q = Matrix2x3::new(
            fx * inv_z,
            0.0,
            -fx * x * inv_z,
            0.0,
            fy * inv_z,
            -fy * y * inv_z,
        );
        if request.pose {
            projection.pose_jacobian = Some(to_dynamic(&(d_uv_d_q * d_pose)));
        }
        if request.point {
            projection.point_jacobian = Some(to_dynamic(&(d_uv_d_q * d_point)));
        }
    }

    if calibrated && request.calibration {
        // d[u, v] / d[fx, fy, cx, cy]
        let d_uv_d_k = Matrix2x4::new(
            x, 0.0, 1.0, 0.0, //
            0.0, y, 0.0, 1.0,
        );
        projection.calibration_jacobian = Some(to_dynamic(&d_uv_d_k));
    }

    Ok(projection)
}

fn intrinsics_equal(a: &Intrinsics, b: &Intrinsics, tol: f64) -> bool {
    abs_diff_eq!(a.fx, b.fx, epsilon = tol)
        && abs_diff_eq!(a.fy, b.fy, epsilon = tol)
        && abs_diff_eq!(a.cx, b.cx, epsilon = tol)
        && abs_diff_eq!(a.cy, b.cy, epsilon = tol)
}

impl CameraModel for PinholeCamera {
    const DIM: usize = 10;
    type Measurement = Vector2<f64>;

    fn project(
        &self,
        point: &Point3<f64>,
        request: JacobianRequest,
    ) -> Result<Projection<Vector2<f64>>, CameraModelError> {
        project_pinhole(&self.pose, &self.intrinsics, point, request, true)
    }

    fn equals(&self, other: &Self, tol: f64) -> bool {
        self.pose.equals(&other.pose, tol) && intrinsics_equal(&self.intrinsics, &other.intrinsics, tol)
    }

    fn validate_params(&self) -> Result<(), CameraModelError> {
        self.pose.validate()?;
        validation::validate_intrinsics(&self.intrinsics)
    }
}

impl CameraModel for PinholePose {
    const DIM: usize = 6;
    type Measurement = Vector2<f64>;

    fn project(
        &self,
        point: &Point3<f64>,
        request: JacobianRequest,
    ) -> Result<Projection<Vector2<f64>>, CameraModelError> {
        project_pinhole(&self.pose, &self.intrinsics, point, request, false)
    }

    fn equals(&self, other: &Self, tol: f64) -> bool {
        self.pose.equals(&other.pose, tol) && intrinsics_equal(&self.intrinsics, &other.intrinsics, tol)
    }

    fn validate_params(&self) -> Result<(), CameraModelError> {
        self.pose.validate()?;
        validation::validate_intrinsics(&self.intrinsics)
    }
}

impl fmt::Display for PinholeCamera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PinholeCamera [{} fx: {} fy: {} cx: {} cy: {}]",
            self.pose, self.intrinsics.fx, self.intrinsics.fy, self.intrinsics.cx, self.intrinsics.cy,
        )
    }
}

impl fmt::Display for PinholePose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PinholePose [{} fx: {} fy: {} cx: {} cy: {}]",
            self.pose, self.intrinsics.fx, self.intrinsics.fy, self.intrinsics.cx, self.intrinsics.cy,
        )
    }
}
