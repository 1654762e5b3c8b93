//! Camera Rig Projection Example
//!
//! Loads a rig of pinhole cameras from YAML, projects one landmark through
//! every camera and prints the measurements and the stacked Jacobians.
//!
//! Usage:
//! ```bash
//! RUST_LOG=debug cargo run --example project_rig -- \
//!   --rig samples/rig.yaml \
//!   --point 0.1,-0.2,0.5 \
//!   --jacobians
//! ```

use camera_set::{CameraSet, JacobianRequest, PinholeCamera};
use clap::Parser;
use log::{error, info};
use nalgebra::Point3;
use std::path::PathBuf;

/// Project a landmark through a camera rig
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the rig YAML file
    #[arg(short = 'r', long, default_value = "samples/rig.yaml")]
    rig: PathBuf,

    /// Landmark in world coordinates, as x,y,z
    #[arg(short = 'p', long, value_delimiter = ',', allow_hyphen_values = true, default_values_t = [0.0, 0.0, 0.0])]
    point: Vec<f64>,

    /// Also compute the pose, point and calibration Jacobians
    #[arg(short = 'j', long)]
    jacobians: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let rig: CameraSet<PinholeCamera> = CameraSet::load_from_yaml(&cli.rig)?;
    rig.print(&format!("{}: ", cli.rig.display()));

    let [x, y, z] = cli.point[..] else {
        return Err(format!("expected 3 coordinates, got {}", cli.point.len()).into());
    };
    let point = Point3::new(x, y, z);
    let request = if cli.jacobians {
        JacobianRequest::all()
    } else {
        JacobianRequest::none()
    };

    let stacked = match rig.project(&point, request) {
        Ok(stacked) => stacked,
        Err(e) => {
            error!("Landmark {:?} cannot be observed by the rig: {}", point, e);
            return Err(e.into());
        }
    };

    info!("Projected {:?} into {} cameras", point, stacked.measurements.len());
    for (i, z) in stacked.measurements.iter().enumerate() {
        println!("camera {i}: u = {:.3}, v = {:.3}", z.x, z.y);
    }
    if let Some(f) = &stacked.pose_jacobian {
        println!("F (pose):{f}");
    }
    if let Some(e) = &stacked.point_jacobian {
        println!("E (point):{e}");
    }
    if let Some(h) = &stacked.calibration_jacobian {
        println!("H (calibration):{h}");
    }

    Ok(())
}
