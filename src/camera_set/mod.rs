//! An ordered set of cameras observing a single landmark.
//!
//! [`CameraSet`] projects one 3D point through every camera and stacks the
//! per-camera Jacobian blocks into the matrices a least-squares back-end
//! consumes when it linearizes a multi-view observation:
//!
//! ```text
//!        pose (6)    point (3)    calibration (DIM - 6)
//!      +---------+  +---------+  +---------+
//! cam0 |   F_0   |  |   E_0   |  |   H_0   |   ZDim rows
//! cam1 |   F_1   |  |   E_1   |  |   H_1   |   ZDim rows
//!  ... |   ...   |  |   ...   |  |   ...   |
//!      +---------+  +---------+  +---------+
//! ```
//!
//! Row-block `i` always belongs to the `i`-th camera added to the set. This
//! order must match the order of the measurements and of any key list kept by
//! the caller.

use crate::camera::{
    CameraModel, CameraModelError, JacobianRequest, Measurement, Projection, POINT_DIM, POSE_DIM,
};
use log::{debug, warn};
use nalgebra::{DMatrix, DVector, Point3};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod archive;

/// Measurements of one point in every camera, with the stacked Jacobians.
#[derive(Debug, Clone)]
pub struct StackedProjection<Z> {
    /// One measurement per camera, in insertion order.
    pub measurements: Vec<Z>,
    /// `F`: `(ZDim * N) x 6`, present when pose derivatives were requested.
    pub pose_jacobian: Option<DMatrix<f64>>,
    /// `E`: `(ZDim * N) x 3`, present when point derivatives were requested.
    pub point_jacobian: Option<DMatrix<f64>>,
    /// `H`: `(ZDim * N) x (DIM - 6)`, present when calibration derivatives
    /// were requested and the camera has calibration parameters.
    pub calibration_jacobian: Option<DMatrix<f64>>,
}

/// An append-only, ordered collection of cameras of one model.
///
/// # Examples
///
/// Two pinhole cameras looking down +z at the origin. With every block
/// requested, each stacked matrix has `ZDim = 2` rows per camera.
///
/// ```rust
/// use camera_set::{CameraSet, Intrinsics, JacobianRequest, PinholeCamera, Pose3};
/// use nalgebra::{Point3, Vector3};
///
/// let intrinsics = Intrinsics { fx: 500.0, fy: 500.0, cx: 320.0, cy: 240.0 };
/// let mut rig = CameraSet::new();
/// for x in [0.0, 1.0] {
///     let pose = Pose3::from_scaled_axis(Vector3::zeros(), Vector3::new(x, 0.0, -5.0));
///     rig.add(PinholeCamera::new(pose, intrinsics.clone()).unwrap());
/// }
///
/// let stacked = rig.project(&Point3::origin(), JacobianRequest::all()).unwrap();
/// assert_eq!(stacked.measurements.len(), 2);
/// assert_eq!(stacked.pose_jacobian.unwrap().shape(), (4, 6));
/// assert_eq!(stacked.point_jacobian.unwrap().shape(), (4, 3));
/// assert_eq!(stacked.calibration_jacobian.unwrap().shape(), (4, 4));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraSet<C> {
    cameras: Vec<C>,
}

impl<C> Default for CameraSet<C> {
    fn default() -> Self {
        CameraSet {
            cameras: Vec::new(),
        }
    }
}

impl<C> CameraSet<C> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from cameras already in measurement order.
    ///
    /// # Arguments
    ///
    /// * `cameras` - Camera `i` of the vector owns row-block `i` of every
    ///   stacked matrix.
    pub fn from_cameras(cameras: Vec<C>) -> Self {
        CameraSet { cameras }
    }

    /// Appends a camera at the end of the set.
    ///
    /// The camera owns the next row-block: after `n` calls it answers for rows
    /// `ZDim * (n - 1) .. ZDim * n`. Cameras are never removed or reordered.
    ///
    /// # Arguments
    ///
    /// * `camera` - The camera to append, taken by value.
    pub fn add(&mut self, camera: C) {
        self.cameras.push(camera);
    }

    /// Number of cameras, which is also the number of row-blocks produced by
    /// [`CameraSet::project`].
    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// The cameras, in insertion order.
    pub fn cameras(&self) -> &[C] {
        &self.cameras
    }

    /// The camera owning row-block `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<&C> {
        self.cameras.get(index)
    }

    /// Iterates over the cameras in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, C> {
        self.cameras.iter()
    }

    /// Consumes the set, returning the cameras in insertion order.
    pub fn into_cameras(self) -> Vec<C> {
        self.cameras
    }
}

impl<C: CameraModel> CameraSet<C> {
    /// Measurement dimension of the camera model.
    pub const ZDIM: usize = <C::Measurement as Measurement>::DIM;

    /// Width of the calibration block, `DIM - 6`.
    pub const CALIBRATION_DIM: usize = {
        assert!(
            C::DIM >= POSE_DIM,
            "camera parameters must start with the 6 pose parameters"
        );
        C::DIM - POSE_DIM
    };

    /// Projects `point` through every camera.
    ///
    /// The stacked matrices are allocated for the current number of cameras,
    /// then row-block `i` of each requested matrix is filled with the block
    /// returned by camera `i`. A calibration request is ignored for models
    /// without calibration parameters.
    ///
    /// # Arguments
    ///
    /// * `point` - The landmark, in world coordinates.
    /// * `request` - Which of `F`, `E` and `H` to compute.
    ///
    /// # Return Value
    ///
    /// A [`StackedProjection`] holding one measurement per camera and the
    /// requested blocks. With no cameras, every matrix has zero rows.
    ///
    /// # Errors
    ///
    /// * The first [`CameraModelError::ProjectionNotObservable`] raised by a
    ///   camera, unchanged. No partial result is returned.
    /// * [`CameraModelError::InvalidJacobian`] if a camera omits a requested
    ///   block or returns one of the wrong shape.
    pub fn project(
        &self,
        point: &Point3<f64>,
        request: JacobianRequest,
    ) -> Result<StackedProjection<C::Measurement>, CameraModelError> {
        let zdim = Self::ZDIM;
        let calibration_dim = Self::CALIBRATION_DIM;
        let rows = zdim * self.cameras.len();

        let request = if request.calibration && calibration_dim == 0 {
            debug!("Camera model has no calibration parameters, dropping calibration Jacobian");
            request.with_calibration(false)
        } else {
            request
        };
        if request.any() {
            debug!(
                "Projecting {:?} through {} cameras, Jacobians requested: {:?}",
                point,
                self.cameras.len(),
                request
            );
        } else {
            debug!(
                "Projecting {:?} through {} cameras, measurements only",
                point,
                self.cameras.len()
            );
        }

        let mut stacked = StackedProjection {
            measurements: Vec::with_capacity(self.cameras.len()),
            pose_jacobian: request.pose.then(|| DMatrix::zeros(rows, POSE_DIM)),
            point_jacobian: request.point.then(|| DMatrix::zeros(rows, POINT_DIM)),
            calibration_jacobian: request
                .calibration
                .then(|| DMatrix::zeros(rows, calibration_dim)),
        };

        let projections = self.project_each(point, request)?;

        for (i, projection) in projections.into_iter().enumerate() {
            let row = zdim * i;
            write_block(&mut stacked.pose_jacobian, projection.pose_jacobian, row, zdim, i, "pose")?;
            write_block(&mut stacked.point_jacobian, projection.point_jacobian, row, zdim, i, "point")?;
            write_block(
                &mut stacked.calibration_jacobian,
                projection.calibration_jacobian,
                row,
                zdim,
                i,
                "calibration",
            )?;
            stacked.measurements.push(projection.measurement);
        }

        Ok(stacked)
    }

    /// Stacked reprojection error `h(point) - measured`, row-block `i` for
    /// camera `i`, together with the requested Jacobians of `h`.
    ///
    /// # Arguments
    ///
    /// * `point` - The landmark, in world coordinates.
    /// * `measured` - One observed measurement per camera, in set order.
    /// * `request` - Which Jacobian blocks to compute alongside the error.
    ///
    /// # Return Value
    ///
    /// The `ZDim * N` error vector and the [`StackedProjection`] it was
    /// computed from.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::MeasurementCountMismatch`] unless there is
    ///   exactly one measurement per camera.
    /// * Any error of [`CameraSet::project`].
    pub fn reprojection_error(
        &self,
        point: &Point3<f64>,
        measured: &[C::Measurement],
        request: JacobianRequest,
    ) -> Result<(DVector<f64>, StackedProjection<C::Measurement>), CameraModelError> {
        if measured.len() != self.cameras.len() {
            return Err(CameraModelError::MeasurementCountMismatch {
                expected: self.cameras.len(),
                found: measured.len(),
            });
        }

        let zdim = Self::ZDIM;
        let stacked = self.project(point, request)?;
        let mut error = DVector::zeros(zdim * self.cameras.len());
        for (i, (predicted, observed)) in stacked.measurements.iter().zip(measured).enumerate() {
            error
                .rows_mut(zdim * i, zdim)
                .copy_from(&(predicted.to_vector() - observed.to_vector()));
        }

        Ok((error, stacked))
    }

    /// Camera-wise comparison with tolerance `tol`.
    ///
    /// Sets of different length are never equal. Otherwise every index is
    /// compared in order with [`CameraModel::equals`] and the first mismatch
    /// ends the comparison.
    ///
    /// # Arguments
    ///
    /// * `other` - The set to compare against.
    /// * `tol` - Absolute tolerance applied to every camera parameter.
    pub fn equals(&self, other: &Self, tol: f64) -> bool {
        self.cameras.len() == other.cameras.len()
            && self
                .cameras
                .iter()
                .zip(&other.cameras)
                .all(|(a, b)| a.equals(b, tol))
    }

    /// Writes `label` followed by every camera to stdout.
    pub fn print(&self, label: &str) {
        print!("{label}{self}");
    }

    #[cfg(not(feature = "rayon"))]
    fn project_each(
        &self,
        point: &Point3<f64>,
        request: JacobianRequest,
    ) -> Result<Vec<Projection<C::Measurement>>, CameraModelError> {
        self.cameras
            .iter()
            .enumerate()
            .map(|(i, camera)| project_one(i, camera, point, request))
            .collect()
    }

    #[cfg(feature = "rayon")]
    fn project_each(
        &self,
        point: &Point3<f64>,
        request: JacobianRequest,
    ) -> Result<Vec<Projection<C::Measurement>>, CameraModelError> {
        use rayon::prelude::*;

        self.cameras
            .par_iter()
            .enumerate()
            .map(|(i, camera)| project_one(i, camera, point, request))
            .collect()
    }
}

fn project_one<C: CameraModel>(
    index: usize,
    camera: &C,
    point: &Point3<f64>,
    request: JacobianRequest,
) -> Result<Projection<C::Measurement>, CameraModelError> {
    camera
        .project(point, request)
        .inspect_err(|err| warn!("Camera {} failed to project {:?}: {}", index, point, err))
}

/// Copies one camera's block into its row-block of a requested stacked matrix.
fn write_block(
    stacked: &mut Option<DMatrix<f64>>,
    block: Option<DMatrix<f64>>,
    row: usize,
    zdim: usize,
    camera: usize,
    name: &'static str,
) -> Result<(), CameraModelError> {
    let Some(stacked) = stacked.as_mut() else {
        return Ok(());
    };
    let block = block.ok_or_else(|| CameraModelError::InvalidJacobian {
        camera,
        block: name,
        reason: "requested but not returned".to_string(),
    })?;

    let shape = (zdim, stacked.ncols());
    if block.shape() != shape {
        return Err(CameraModelError::InvalidJacobian {
            camera,
            block: name,
            reason: format!(
                "expected {}x{}, found {}x{}",
                shape.0,
                shape.1,
                block.nrows(),
                block.ncols()
            ),
        });
    }

    stacked.view_mut((row, 0), shape).copy_from(&block);
    Ok(())
}

impl<C: fmt::Display> fmt::Display for CameraSet<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CameraSet, cameras = ")?;
        for (i, camera) in self.cameras.iter().enumerate() {
            writeln!(f, "  [{i}] {camera}")?;
        }
        Ok(())
    }
}

impl<C> FromIterator<C> for CameraSet<C> {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        CameraSet::from_cameras(iter.into_iter().collect())
    }
}

impl<C> Extend<C> for CameraSet<C> {
    fn extend<I: IntoIterator<Item = C>>(&mut self, iter: I) {
        self.cameras.extend(iter);
    }
}

impl<'a, C> IntoIterator for &'a CameraSet<C> {
    type Item = &'a C;
    type IntoIter = std::slice::Iter<'a, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.cameras.iter()
    }
}

impl<C> IntoIterator for CameraSet<C> {
    type Item = C;
    type IntoIter = std::vec::IntoIter<C>;

    fn into_iter(self) -> Self::IntoIter {
        self.cameras.into_iter()
    }
}
