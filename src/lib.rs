//! Stereo Visualization Tools Library
//!
//! Rendering helpers for the end of a stereo vision pipeline. Everything
//! upstream (calibration, matching, fundamental matrix and depth estimation)
//! is assumed done; this library only draws the results:
//! - Epipolar lines on one image with their matching points on the other
//! - Colored 3D point clouds from a per-pixel point map and an RGB image
//!
//! Both renderers are stateless. Correspondence colors come from an injected
//! random number generator and point clouds are drawn into an explicit
//! [`Scene3D`] value, so separate calls never interfere.

pub mod config;
pub mod epipolar;
pub mod error;
pub mod pointcloud;
pub mod scene;
pub mod util;

// Re-export commonly used types
pub use config::{EpipolarConfig, PointCloudConfig, RenderConfig};
pub use epipolar::{draw_epipolar_lines, random_color, EpipolarLine, EpipolarRenderer};
pub use error::VizError;
pub use pointcloud::{build_point_cloud_scene, render_point_cloud};
pub use scene::{AxisLimits, CanvasConfig, Scene3D, SceneAxes, ViewAngle};
