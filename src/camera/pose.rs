//! Rigid camera pose.
//!
//! [`Pose3`] stores the camera-to-world transform. Its 6 tangent coordinates
//! are ordered rotation first, then translation, and a perturbation `xi` acts
//! on the right: `T * Exp(xi)`. This is the layout of the leading 6 columns of
//! every camera Jacobian in this crate.

use crate::camera::CameraModelError;
use approx::abs_diff_eq;
use nalgebra::{Matrix3, Matrix3x6, Point3, UnitQuaternion, Vector3, Vector6};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose3 {
    /// Orientation of the camera frame in the world frame.
    pub rotation: UnitQuaternion<f64>,
    /// Position of the camera center in the world frame.
    pub translation: Vector3<f64>,
}

impl Default for Pose3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose3 {
    pub fn new(rotation: UnitQuaternion<f64>, translation: Vector3<f64>) -> Self {
        Pose3 {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Pose3::new(UnitQuaternion::identity(), Vector3::zeros())
    }

    /// Builds a pose from an axis-angle rotation vector and a camera center.
    pub fn from_scaled_axis(axis_angle: Vector3<f64>, translation: Vector3<f64>) -> Self {
        Pose3::new(UnitQuaternion::from_scaled_axis(axis_angle), translation)
    }

    /// Camera at `eye` with its optical axis (+z) pointing at `target`.
    ///
    /// The image y axis points away from `up`, so `up` appears at the top of
    /// the image.
    pub fn look_at(eye: &Point3<f64>, target: &Point3<f64>, up: &Vector3<f64>) -> Self {
        let rotation = UnitQuaternion::face_towards(&(target - eye), &(-up));
        Pose3::new(rotation, eye.coords)
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.rotation.to_rotation_matrix().into_inner()
    }

    /// Expresses a world point in the camera frame: `R^T * (p - t)`.
    pub fn transform_to(&self, point: &Point3<f64>) -> Vector3<f64> {
        self.rotation
            .inverse_transform_vector(&(point.coords - self.translation))
    }

    /// Same as [`Pose3::transform_to`], also returning the `3x6` derivative
    /// with respect to the pose and the `3x3` derivative with respect to the
    /// point.
    pub fn transform_to_with_jacobians(
        &self,
        point: &Point3<f64>,
    ) -> (Vector3<f64>, Matrix3x6<f64>, Matrix3<f64>) {
        let q = self.transform_to(point);

        let mut d_pose = Matrix3x6::zeros();
        d_pose.fixed_view_mut::<3, 3>(0, 0).copy_from(&q.cross_matrix());
        d_pose
            .fixed_view_mut::<3, 3>(0, 3)
            .copy_from(&(-Matrix3::identity()));

        let d_point = self.rotation_matrix().transpose();
        (q, d_pose, d_point)
    }

    /// Applies a tangent-space update on the right: `T * Exp(xi)`.
    pub fn retract(&self, xi: &Vector6<f64>) -> Pose3 {
        let omega: Vector3<f64> = xi.fixed_rows::<3>(0).into_owned();
        let v: Vector3<f64> = xi.fixed_rows::<3>(3).into_owned();
        Pose3::new(
            self.rotation * UnitQuaternion::from_scaled_axis(omega),
            self.translation + self.rotation * v,
        )
    }

    /// Checks that the rotation is a unit quaternion and the translation is finite.
    ///
    /// Deserialized poses are taken as-is, so a rotation read from a file may
    /// not be normalized.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::InvalidParams`]: If the quaternion norm differs
    ///   from 1 by more than `1e-9`, or any coordinate is not finite.
    pub fn validate(&self) -> Result<(), CameraModelError> {
        let norm = self.rotation.quaternion().norm();
        if !((norm - 1.0).abs() < 1e-9) {
            return Err(CameraModelError::InvalidParams(format!(
                "Pose rotation must be a unit quaternion, got norm {norm}"
            )));
        }
        if self.translation.iter().any(|t| !t.is_finite()) {
            return Err(CameraModelError::InvalidParams(
                "Pose translation must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Element-wise comparison of rotation matrices and translations.
    pub fn equals(&self, other: &Pose3, tol: f64) -> bool {
        abs_diff_eq!(self.rotation_matrix(), other.rotation_matrix(), epsilon = tol)
            && abs_diff_eq!(self.translation, other.translation, epsilon = tol)
    }
}

impl fmt::Display for Pose3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let axis_angle = self.rotation.scaled_axis();
        write!(
            f,
            "Pose3 [rotation: ({}, {}, {}) translation: ({}, {}, {})]",
            axis_angle.x,
            axis_angle.y,
            axis_angle.z,
            self.translation.x,
            self.translation.y,
            self.translation.z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::numerical_jacobian;
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    fn sample_pose() -> Pose3 {
        Pose3::from_scaled_axis(Vector3::new(0.1, -0.2, 0.3), Vector3::new(0.5, -0.4, -2.0))
    }

    #[test]
    fn test_transform_to_identity() {
        let pose = Pose3::identity();
        let q = pose.transform_to(&Point3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(q, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_transform_to_translated() {
        let pose = Pose3::new(UnitQuaternion::identity(), Vector3::new(0.0, 0.0, -5.0));
        let q = pose.transform_to(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(q, Vector3::new(1.0, 0.0, 5.0));
    }

    #[test]
    fn test_look_at_places_target_on_optical_axis() {
        let eye = Point3::new(2.0, 1.0, -4.0);
        let target = Point3::new(0.0, 0.0, 0.0);
        let pose = Pose3::look_at(&eye, &target, &Vector3::y());
        let q = pose.transform_to(&target);
        assert_relative_eq!(q.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(q.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(q.z, (target - eye).norm(), epsilon = 1e-12);
    }

    #[test]
    fn test_transform_to_jacobians_match_numerical() {
        let pose = sample_pose();
        let point = Point3::new(0.3, 0.7, 4.0);
        let (_, d_pose, d_point) = pose.transform_to_with_jacobians(&point);

        let numerical_pose = numerical_jacobian(
            |xi: &DVector<f64>| {
                let xi = Vector6::from_column_slice(xi.as_slice());
                DVector::from_column_slice(pose.retract(&xi).transform_to(&point).as_slice())
            },
            &DVector::zeros(6),
            1e-6,
        );
        let numerical_point = numerical_jacobian(
            |p: &DVector<f64>| {
                let p = Point3::new(p[0], p[1], p[2]);
                DVector::from_column_slice(pose.transform_to(&p).as_slice())
            },
            &DVector::from_column_slice(point.coords.as_slice()),
            1e-6,
        );

        for r in 0..3 {
            for c in 0..6 {
                assert_relative_eq!(d_pose[(r, c)], numerical_pose[(r, c)], epsilon = 1e-6);
            }
            for c in 0..3 {
                assert_relative_eq!(d_point[(r, c)], numerical_point[(r, c)], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_retract_zero_is_identity() {
        let pose = sample_pose();
        assert!(pose.retract(&Vector6::zeros()).equals(&pose, 1e-12));
    }

    #[test]
    fn test_validate_rejects_non_unit_rotation() {
        assert!(sample_pose().validate().is_ok());

        let skewed = Pose3::new(
            UnitQuaternion::new_unchecked(nalgebra::Quaternion::new(2.0, 0.0, 0.3, 0.0)),
            Vector3::zeros(),
        );
        assert!(matches!(
            skewed.validate(),
            Err(CameraModelError::InvalidParams(_))
        ));

        let mut lost = sample_pose();
        lost.translation.y = f64::INFINITY;
        assert!(lost.validate().is_err());
    }

    #[test]
    fn test_equals_tolerance() {
        let pose = sample_pose();
        let mut moved = pose.clone();
        moved.translation.x += 1e-4;
        assert!(pose.equals(&moved, 1e-3));
        assert!(!pose.equals(&moved, 1e-6));
    }
}
