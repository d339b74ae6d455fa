//! Render configuration.
//!
//! Every value has a default matching the depth sensor calibration the
//! renderers were first written for, so a YAML file only needs to list the
//! fields it overrides:
//!
//! ```yaml
//! epipolar:
//!   marker_size: 3
//! point_cloud:
//!   stride: 4
//!   view:
//!     elevation: 90.0
//!     azimuth: -90.0
//! ```

use crate::error::VizError;
use crate::scene::{AxisLimits, CanvasConfig, ViewAngle};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;

/// Default marker size (line thickness, and square root of the circle radius).
pub const DEFAULT_MARKER_SIZE: u32 = 5;
/// Depth-source unit conversion applied to every 3D coordinate.
pub const DEFAULT_SCALE: f64 = 0.0002;
/// Spatial stride used to downsample the point map.
pub const DEFAULT_STRIDE: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpipolarConfig {
    pub marker_size: u32,
}

impl Default for EpipolarConfig {
    fn default() -> Self {
        EpipolarConfig {
            marker_size: DEFAULT_MARKER_SIZE,
        }
    }
}

impl EpipolarConfig {
    pub fn validate(&self) -> Result<(), VizError> {
        if self.marker_size == 0 {
            return Err(VizError::InvalidParams(
                "Marker size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters of the point cloud scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointCloudConfig {
    /// Linear factor applied to all coordinates of the point map.
    pub scale: f64,
    /// Keep every `stride`-th row and column.
    pub stride: usize,
    pub x_limits: AxisLimits,
    pub y_limits: AxisLimits,
    pub z_limits: AxisLimits,
    pub invert_z: bool,
    pub view: ViewAngle,
    pub canvas: CanvasConfig,
}

impl Default for PointCloudConfig {
    fn default() -> Self {
        PointCloudConfig {
            scale: DEFAULT_SCALE,
            stride: DEFAULT_STRIDE,
            x_limits: AxisLimits::new(-0.006, 0.006),
            y_limits: AxisLimits::new(-0.006, 0.006),
            z_limits: AxisLimits::new(0.006, 0.016),
            invert_z: true,
            view: ViewAngle {
                elevation: 112.0,
                azimuth: -88.0,
            },
            canvas: CanvasConfig::default(),
        }
    }
}

impl PointCloudConfig {
    pub fn validate(&self) -> Result<(), VizError> {
        if self.stride == 0 {
            return Err(VizError::InvalidParams(
                "Downsample stride must be positive".to_string(),
            ));
        }
        if !self.scale.is_finite() || self.scale == 0.0 {
            return Err(VizError::InvalidParams(format!(
                "Scale must be finite and non-zero, got {}",
                self.scale
            )));
        }
        for (name, limits) in [
            ("x", &self.x_limits),
            ("y", &self.y_limits),
            ("z", &self.z_limits),
        ] {
            limits.validate(name)?;
        }
        if !self.view.elevation.is_finite() || !self.view.azimuth.is_finite() {
            return Err(VizError::InvalidParams(
                "View angles must be finite".to_string(),
            ));
        }
        self.canvas.validate()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub epipolar: EpipolarConfig,
    pub point_cloud: PointCloudConfig,
}

impl RenderConfig {
    /// Loads a configuration from a YAML file and validates it.
    ///
    /// Missing sections and fields keep their defaults.
    ///
    /// # Errors
    ///
    /// * [`VizError::Io`] if the file cannot be read.
    /// * [`VizError::Yaml`] if the contents are not a valid configuration.
    /// * [`VizError::InvalidParams`] if a value fails validation.
    pub fn load_from_yaml(path: &str) -> Result<Self, VizError> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&contents)?;
        log::debug!("Loaded render config from {path}: {config:?}");
        Ok(config)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, VizError> {
        // An empty document deserializes to unit, not to a mapping.
        let config: RenderConfig = if contents.trim().is_empty() {
            RenderConfig::default()
        } else {
            serde_yaml::from_str(contents)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_yaml(&self, path: &str) -> Result<(), VizError> {
        let yaml_string = serde_yaml::to_string(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(yaml_string.as_bytes())?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), VizError> {
        self.epipolar.validate()?;
        self.point_cloud.validate()
    }
}
