//! Reading and writing a [`CameraSet`] as an ordered list of cameras.
//!
//! The set is archived through its plain camera sequence, so the row-block
//! order of a loaded set is the order of the records in the file. Every loaded
//! camera is validated with [`CameraModel::validate_params`].

use crate::camera::{CameraModel, CameraModelError};
use crate::camera_set::CameraSet;
use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

impl<C> CameraSet<C>
where
    C: CameraModel + Serialize,
{
    /// Saves the cameras, in order, to a YAML file.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::YamlError`]: If serialization fails.
    /// * [`CameraModelError::IOError`]: If the file cannot be written.
    pub fn save_to_yaml(&self, path: impl AsRef<Path>) -> Result<(), CameraModelError> {
        let path = path.as_ref();
        let yaml_string = serde_yaml::to_string(self)?;
        fs::write(path, yaml_string)?;
        info!("Saved {} cameras to {}", self.len(), path.display());
        Ok(())
    }

    /// Serializes the cameras, in order, to a JSON string.
    pub fn to_json(&self) -> Result<String, CameraModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<C> CameraSet<C>
where
    C: CameraModel + DeserializeOwned,
{
    /// Loads a camera set from a YAML file holding a list of cameras.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::IOError`]: If the file cannot be read.
    /// * [`CameraModelError::YamlError`]: If the content is not a list of cameras.
    /// * Errors from `validate_params` for the first invalid camera.
    pub fn load_from_yaml(path: impl AsRef<Path>) -> Result<Self, CameraModelError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let set: Self = serde_yaml::from_str(&contents)?;
        set.validate()?;
        info!("Loaded {} cameras from {}", set.len(), path.display());
        Ok(set)
    }

    /// Parses a camera set from a JSON list of cameras.
    pub fn from_json(json: &str) -> Result<Self, CameraModelError> {
        let set: Self = serde_json::from_str(json)?;
        set.validate()?;
        Ok(set)
    }

    fn validate(&self) -> Result<(), CameraModelError> {
        self.iter().try_for_each(|camera| camera.validate_params())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{
        Intrinsics, JacobianRequest, PinholeCamera, Pose3, StereoCalibration, StereoCamera,
    };
    use nalgebra::{Point3, Quaternion, UnitQuaternion, Vector3};

    fn sample_rig() -> CameraSet<PinholeCamera> {
        (0..3)
            .map(|i| {
                let pose = Pose3::from_scaled_axis(
                    Vector3::new(0.0, 0.1 * i as f64, 0.0),
                    Vector3::new(0.5 * i as f64, 0.0, -4.0),
                );
                let intrinsics = Intrinsics {
                    fx: 450.0 + i as f64,
                    fy: 455.0,
                    cx: 320.0,
                    cy: 240.0,
                };
                PinholeCamera::new(pose, intrinsics).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_save_and_load_yaml() {
        let rig = sample_rig();
        let path = std::env::temp_dir().join(format!(
            "camera_set_archive_test_{}.yaml",
            std::process::id()
        ));

        rig.save_to_yaml(&path).unwrap();
        let loaded: CameraSet<PinholeCamera> = CameraSet::load_from_yaml(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded.len(), 3);
        assert!(loaded.equals(&rig, 1e-12));
        // Order is preserved: fx grows with the index.
        assert_eq!(loaded.get(2).unwrap().intrinsics.fx, 452.0);
    }

    #[test]
    fn test_json_round_trip_keeps_projection() {
        let calibration = StereoCalibration {
            intrinsics: Intrinsics {
                fx: 400.0,
                fy: 400.0,
                cx: 320.0,
                cy: 240.0,
            },
            baseline: 0.2,
        };
        let rig: CameraSet<StereoCamera> = (0..2)
            .map(|i| {
                let pose = Pose3::from_scaled_axis(Vector3::zeros(), Vector3::new(i as f64, 0.0, -3.0));
                StereoCamera::new(pose, calibration.clone()).unwrap()
            })
            .collect();

        let json = rig.to_json().unwrap();
        let loaded: CameraSet<StereoCamera> = CameraSet::from_json(&json).unwrap();

        let point = Point3::new(0.1, 0.2, 1.0);
        let before = rig.project(&point, JacobianRequest::none()).unwrap();
        let after = loaded.project(&point, JacobianRequest::none()).unwrap();
        for (a, b) in before.measurements.iter().zip(&after.measurements) {
            assert!((a.u_l - b.u_l).abs() < 1e-9);
            assert!((a.u_r - b.u_r).abs() < 1e-9);
            assert!((a.v - b.v).abs() < 1e-9);
        }
    }

    #[test]
    fn test_load_rejects_invalid_camera() {
        let mut cameras = sample_rig().into_cameras();
        cameras[1].intrinsics.fy = -10.0;
        let json = serde_json::to_string(&cameras).unwrap();

        assert!(matches!(
            CameraSet::<PinholeCamera>::from_json(&json),
            Err(CameraModelError::FocalLengthMustBePositive)
        ));
    }

    #[test]
    fn test_load_rejects_non_unit_rotation() {
        let mut cameras = sample_rig().into_cameras();
        // Serialized as [0, 0.3, 0, 2.0], the way a hand-edited file would hold it.
        cameras[2].pose.rotation =
            UnitQuaternion::new_unchecked(Quaternion::new(2.0, 0.0, 0.3, 0.0));
        let json = serde_json::to_string(&cameras).unwrap();

        assert!(matches!(
            CameraSet::<PinholeCamera>::from_json(&json),
            Err(CameraModelError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_load_rejects_non_finite_translation() {
        let mut rig = sample_rig();
        rig.cameras[0].pose.translation.z = f64::INFINITY;
        let path = std::env::temp_dir().join(format!(
            "camera_set_archive_inf_{}.yaml",
            std::process::id()
        ));

        rig.save_to_yaml(&path).unwrap();
        let result = CameraSet::<PinholeCamera>::load_from_yaml(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(CameraModelError::InvalidParams(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = CameraSet::<PinholeCamera>::load_from_yaml("samples/does_not_exist.yaml");
        assert!(matches!(result, Err(CameraModelError::IOError(_))));
    }

    #[test]
    fn test_load_sample_rig() {
        let rig: CameraSet<PinholeCamera> = CameraSet::load_from_yaml("samples/rig.yaml").unwrap();
        assert_eq!(rig.len(), 3);

        let stacked = rig
            .project(&Point3::new(0.0, 0.0, 0.0), JacobianRequest::all())
            .unwrap();
        assert_eq!(stacked.measurements.len(), 3);
        assert_eq!(stacked.calibration_jacobian.unwrap().shape(), (6, 4));
    }
}
