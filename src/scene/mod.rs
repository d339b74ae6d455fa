//! Explicit 3D scatter scene.
//!
//! A [`Scene3D`] owns everything needed to draw a colored point cloud: the
//! points, their colors, the axes box and the viewing angle. Each scene is an
//! independent value, so building several scenes in one process never mixes
//! their contents. Scenes can be rasterized to an [`RgbImage`], saved, opened
//! in the system image viewer, or exported as CSV/JSON.

use crate::error::VizError;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use log::{debug, info, warn};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

const AXES_BOX_COLOR: Rgb<u8> = Rgb([160, 160, 160]);

/// Closed range shown along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisLimits {
    pub min: f64,
    pub max: f64,
}

impl AxisLimits {
    pub fn new(min: f64, max: f64) -> Self {
        AxisLimits { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Maps `value` linearly so that `min` lands on -1 and `max` on 1.
    pub fn normalize(&self, value: f64) -> f64 {
        2.0 * (value - self.min) / self.span() - 1.0
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub(crate) fn validate(&self, axis: &str) -> Result<(), VizError> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min >= self.max {
            return Err(VizError::InvalidParams(format!(
                "{axis} limits must be finite with min < max, got [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Initial camera orientation in degrees.
///
/// Elevation is measured up from the XY plane, azimuth around the Z axis
/// starting from +X.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewAngle {
    pub elevation: f64,
    pub azimuth: f64,
}

impl ViewAngle {
    /// Orthonormal screen basis `(right, up, toward_viewer)` for this view.
    pub fn basis(&self) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
        let elev = self.elevation.to_radians();
        let azim = self.azimuth.to_radians();
        let (se, ce) = elev.sin_cos();
        let (sa, ca) = azim.sin_cos();

        let right = Vector3::new(-sa, ca, 0.0);
        let up = Vector3::new(-se * ca, -se * sa, ce);
        let toward_viewer = Vector3::new(ce * ca, ce * sa, se);
        (right, up, toward_viewer)
    }
}

/// Raster target used when a scene is turned into an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    /// Radius of each scatter marker in pixels; 0 draws single pixels.
    pub point_radius: u32,
    pub background: [u8; 3],
}

impl Default for CanvasConfig {
    fn default() -> Self {
        CanvasConfig {
            width: 800,
            height: 800,
            point_radius: 1,
            background: [255, 255, 255],
        }
    }
}

impl CanvasConfig {
    pub fn validate(&self) -> Result<(), VizError> {
        if self.width == 0 || self.height == 0 {
            return Err(VizError::InvalidParams(format!(
                "Canvas must not be empty, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneAxes {
    pub labels: [String; 3],
    pub x: AxisLimits,
    pub y: AxisLimits,
    pub z: AxisLimits,
    pub invert_z: bool,
}

impl SceneAxes {
    pub fn new(x: AxisLimits, y: AxisLimits, z: AxisLimits, invert_z: bool) -> Self {
        SceneAxes {
            labels: [
                "X axis".to_string(),
                "Y axis".to_string(),
                "Z axis".to_string(),
            ],
            x,
            y,
            z,
            invert_z,
        }
    }

    /// Position of `point` inside the axes box, where the box spans [-1, 1] on
    /// every axis.
    pub fn normalize(&self, point: &Point3<f64>) -> Vector3<f64> {
        let z = self.z.normalize(point.z);
        Vector3::new(
            self.x.normalize(point.x),
            self.y.normalize(point.y),
            if self.invert_z { -z } else { z },
        )
    }
}

#[derive(Serialize)]
struct ScenePointRecord {
    x: f64,
    y: f64,
    z: f64,
    r: f64,
    g: f64,
    b: f64,
}

/// Colored 3D scatter plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene3D {
    axes: SceneAxes,
    view: ViewAngle,
    points: Vec<Point3<f64>>,
    colors: Vec<[f64; 3]>,
}

impl Scene3D {
    pub fn new(axes: SceneAxes, view: ViewAngle) -> Self {
        Scene3D {
            axes,
            view,
            points: Vec::new(),
            colors: Vec::new(),
        }
    }

    pub fn with_capacity(axes: SceneAxes, view: ViewAngle, capacity: usize) -> Self {
        Scene3D {
            axes,
            view,
            points: Vec::with_capacity(capacity),
            colors: Vec::with_capacity(capacity),
        }
    }

    /// Adds a point with its color, each channel normalized to [0, 1].
    pub fn push(&mut self, point: Point3<f64>, color: [f64; 3]) {
        self.points.push(point);
        self.colors.push(color);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn colors(&self) -> &[[f64; 3]] {
        &self.colors
    }

    pub fn axes(&self) -> &SceneAxes {
        &self.axes
    }

    pub fn view(&self) -> &ViewAngle {
        &self.view
    }

    /// Projects a data-space point onto the screen.
    ///
    /// # Returns
    ///
    /// * `(u, v, depth)` - screen coordinates of the point in axes-box units
    ///   (the whole box fits within a radius of `sqrt(3)`), and its distance
    ///   along the viewing direction, larger meaning closer to the viewer.
    pub fn project(&self, point: &Point3<f64>) -> (f64, f64, f64) {
        project_normalized(&self.view, &self.axes.normalize(point))
    }

    /// Rasterizes the scene with an orthographic camera.
    ///
    /// The axes box is drawn first, then the points from the farthest to the
    /// nearest so closer points cover farther ones. Points with non-finite
    /// coordinates are skipped, and points whose marker would fall entirely
    /// outside the canvas are culled.
    pub fn render_image(&self, canvas: &CanvasConfig) -> Result<RgbImage, VizError> {
        canvas.validate()?;
        let mut image = RgbImage::from_pixel(canvas.width, canvas.height, Rgb(canvas.background));

        let half_extent = 0.5 * canvas.width.min(canvas.height) as f64 / 3f64.sqrt();
        let center_x = canvas.width as f64 / 2.0;
        let center_y = canvas.height as f64 / 2.0;
        let to_pixel = |u: f64, v: f64| (center_x + u * half_extent, center_y - v * half_extent);

        for (start, end) in box_edges() {
            let (u0, v0, _) = project_normalized(&self.view, &start);
            let (u1, v1, _) = project_normalized(&self.view, &end);
            let (x0, y0) = to_pixel(u0, v0);
            let (x1, y1) = to_pixel(u1, v1);
            draw_line_segment_mut(
                &mut image,
                (x0 as f32, y0 as f32),
                (x1 as f32, y1 as f32),
                AXES_BOX_COLOR,
            );
        }

        let finite: Vec<(&Point3<f64>, &[f64; 3])> = self
            .points
            .iter()
            .zip(self.colors.iter())
            .filter(|(point, _)| point.iter().all(|c| c.is_finite()))
            .collect();
        let skipped = self.points.len() - finite.len();
        if skipped > 0 {
            warn!("Skipped {skipped} scene points with non-finite coordinates");
        }

        // Markers entirely off the canvas are culled before the pixel cast.
        let reach = f64::from(canvas.point_radius) + 1.0;
        let (max_x, max_y) = (f64::from(canvas.width) + reach, f64::from(canvas.height) + reach);
        let mut projected: Vec<(f64, f64, f64, Rgb<u8>)> = finite
            .into_iter()
            .filter_map(|(point, color)| {
                let (u, v, depth) = self.project(point);
                let (x, y) = to_pixel(u, v);
                let visible = x >= -reach && x <= max_x && y >= -reach && y <= max_y;
                visible.then(|| (depth, x, y, to_rgb8(color)))
            })
            .collect();

        let culled = self.points.len() - skipped - projected.len();
        if culled > 0 {
            debug!("Culled {culled} scene points projecting outside the canvas");
        }

        projected.sort_by(|a, b| a.0.total_cmp(&b.0));

        let radius = canvas.point_radius as i32;
        for &(_, x, y, color) in &projected {
            draw_filled_circle_mut(&mut image, (x.round() as i32, y.round() as i32), radius, color);
        }

        debug!(
            "Rendered {} points on a {}x{} canvas",
            projected.len(),
            canvas.width,
            canvas.height
        );
        Ok(image)
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P, canvas: &CanvasConfig) -> Result<(), VizError> {
        let image = self.render_image(canvas)?;
        image.save(path.as_ref())?;
        info!("Saved scene snapshot: {}", path.as_ref().display());
        Ok(())
    }

    /// Renders the scene to a PNG file and opens it in the system viewer.
    ///
    /// The file is kept on disk since viewers may read it after this call
    /// returns.
    ///
    /// # Returns
    ///
    /// * `Result<PathBuf, VizError>` - Path of the rendered snapshot
    pub fn show(&self, canvas: &CanvasConfig) -> Result<PathBuf, VizError> {
        let image = self.render_image(canvas)?;
        let temp_path = tempfile::Builder::new()
            .prefix("scene-")
            .suffix(".png")
            .tempfile()?
            .into_temp_path();
        image.save(&temp_path)?;
        let path = temp_path.keep()?;

        open::that(&path)?;
        info!("Opened scene with {} points: {}", self.len(), path.display());
        Ok(path)
    }

    /// Writes one `x,y,z,r,g,b` row per point, colors in [0, 1].
    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), VizError> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        for (point, color) in self.points.iter().zip(self.colors.iter()) {
            writer.serialize(ScenePointRecord {
                x: point.x,
                y: point.y,
                z: point.z,
                r: color[0],
                g: color[1],
                b: color[2],
            })?;
        }
        writer.flush()?;
        info!("Exported {} scene points to {}", self.len(), path.as_ref().display());
        Ok(())
    }

    pub fn export_json<P: AsRef<Path>>(&self, path: P) -> Result<(), VizError> {
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(writer, self)?;
        info!("Exported scene to {}", path.as_ref().display());
        Ok(())
    }
}

fn project_normalized(view: &ViewAngle, normalized: &Vector3<f64>) -> (f64, f64, f64) {
    let (right, up, toward_viewer) = view.basis();
    (
        normalized.dot(&right),
        normalized.dot(&up),
        normalized.dot(&toward_viewer),
    )
}

/// The 12 edges of the [-1, 1] cube.
fn box_edges() -> Vec<(Vector3<f64>, Vector3<f64>)> {
    let corner = |i: usize| {
        Vector3::new(
            if i & 1 == 0 { -1.0 } else { 1.0 },
            if i & 2 == 0 { -1.0 } else { 1.0 },
            if i & 4 == 0 { -1.0 } else { 1.0 },
        )
    };
    let mut edges = Vec::with_capacity(12);
    for i in 0..8 {
        for bit in [1, 2, 4] {
            if i & bit == 0 {
                edges.push((corner(i), corner(i | bit)));
            }
        }
    }
    edges
}

fn to_rgb8(color: &[f64; 3]) -> Rgb<u8> {
    let channel = |c: f64| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb([channel(color[0]), channel(color[1]), channel(color[2])])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_axes(invert_z: bool) -> SceneAxes {
        SceneAxes::new(
            AxisLimits::new(-1.0, 1.0),
            AxisLimits::new(-1.0, 1.0),
            AxisLimits::new(-1.0, 1.0),
            invert_z,
        )
    }

    fn top_down() -> ViewAngle {
        ViewAngle {
            elevation: 90.0,
            azimuth: -90.0,
        }
    }

    #[test]
    fn test_axis_normalize() {
        let limits = AxisLimits::new(0.006, 0.016);
        assert_relative_eq!(limits.normalize(0.006), -1.0, epsilon = 1e-12);
        assert_relative_eq!(limits.normalize(0.016), 1.0, epsilon = 1e-12);
        assert_relative_eq!(limits.normalize(0.011), 0.0, epsilon = 1e-12);
        assert!(limits.contains(0.01));
        assert!(!limits.contains(0.02));
    }

    #[test]
    fn test_view_basis_is_orthonormal() {
        let view = ViewAngle {
            elevation: 112.0,
            azimuth: -88.0,
        };
        let (right, up, toward_viewer) = view.basis();
        assert_relative_eq!(right.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(up.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(toward_viewer.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(right.dot(&up), 0.0, epsilon = 1e-12);
        assert_relative_eq!(right.dot(&toward_viewer), 0.0, epsilon = 1e-12);
        assert_relative_eq!(up.dot(&toward_viewer), 0.0, epsilon = 1e-12);
        assert_relative_eq!(right.cross(&up), toward_viewer, epsilon = 1e-12);
    }

    #[test]
    fn test_top_down_projection() {
        let scene = Scene3D::new(unit_axes(false), top_down());

        let (u, v, _) = scene.project(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(u, 1.0, epsilon = 1e-12);
        assert_relative_eq!(v, 0.0, epsilon = 1e-12);

        let (u, v, _) = scene.project(&Point3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(u, 0.0, epsilon = 1e-12);
        assert_relative_eq!(v, 1.0, epsilon = 1e-12);

        let (_, _, near) = scene.project(&Point3::new(0.0, 0.0, 1.0));
        let (_, _, far) = scene.project(&Point3::new(0.0, 0.0, -1.0));
        assert!(near > far);
    }

    #[test]
    fn test_inverted_z_flips_depth() {
        let scene = Scene3D::new(unit_axes(true), top_down());
        let (_, _, high) = scene.project(&Point3::new(0.0, 0.0, 1.0));
        let (_, _, low) = scene.project(&Point3::new(0.0, 0.0, -1.0));
        assert!(high < low);
    }

    #[test]
    fn test_render_draws_points_over_background() {
        let mut scene = Scene3D::new(unit_axes(false), top_down());
        scene.push(Point3::new(0.0, 0.0, 0.0), [1.0, 0.0, 0.0]);

        let canvas = CanvasConfig {
            width: 101,
            height: 101,
            point_radius: 2,
            background: [0, 0, 0],
        };
        let image = scene.render_image(&canvas).unwrap();
        assert_eq!(image.dimensions(), (101, 101));
        assert_eq!(*image.get_pixel(50, 50), Rgb([255, 0, 0]));
        assert_eq!(*image.get_pixel(0, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_render_nearest_point_wins() {
        let mut scene = Scene3D::new(unit_axes(false), top_down());
        // Pushed near first so painter ordering, not insertion order, decides.
        scene.push(Point3::new(0.0, 0.0, 0.5), [0.0, 1.0, 0.0]);
        scene.push(Point3::new(0.0, 0.0, -0.5), [0.0, 0.0, 1.0]);

        let canvas = CanvasConfig {
            width: 64,
            height: 64,
            point_radius: 3,
            background: [0, 0, 0],
        };
        let image = scene.render_image(&canvas).unwrap();
        assert_eq!(*image.get_pixel(32, 32), Rgb([0, 255, 0]));
    }

    #[test]
    fn test_render_skips_non_finite_points() {
        let mut scene = Scene3D::new(unit_axes(false), top_down());
        scene.push(Point3::new(f64::NAN, 0.0, 0.0), [1.0, 1.0, 1.0]);
        let canvas = CanvasConfig {
            width: 32,
            height: 32,
            point_radius: 1,
            background: [0, 0, 0],
        };
        assert!(scene.render_image(&canvas).is_ok());
    }

    #[test]
    fn test_render_culls_far_away_points() {
        let config = crate::config::PointCloudConfig::default();
        let axes = SceneAxes::new(config.x_limits, config.y_limits, config.z_limits, config.invert_z);
        let mut scene = Scene3D::new(axes, config.view);
        scene.push(Point3::new(1e9, 0.0, 0.01), [1.0, 0.0, 0.0]);
        scene.push(Point3::new(0.0, -3e8, 3e8), [0.0, 1.0, 0.0]);
        scene.push(Point3::new(0.0, 0.0, 0.011), [0.0, 0.0, 1.0]);

        let image = scene.render_image(&CanvasConfig::default()).unwrap();
        assert_eq!(image.dimensions(), (800, 800));
        assert_eq!(*image.get_pixel(400, 400), Rgb([0, 0, 255]));
    }

    #[test]
    fn test_empty_canvas_is_rejected() {
        let scene = Scene3D::new(unit_axes(false), top_down());
        let canvas = CanvasConfig {
            width: 0,
            ..CanvasConfig::default()
        };
        assert!(matches!(
            scene.render_image(&canvas),
            Err(VizError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_export_csv_and_json() {
        let mut scene = Scene3D::new(unit_axes(true), top_down());
        scene.push(Point3::new(0.5, -0.25, 1.0), [1.0, 0.5, 0.0]);
        scene.push(Point3::new(0.0, 0.0, 0.0), [0.0, 0.0, 1.0]);

        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("scene.csv");
        scene.export_csv(&csv_path).unwrap();

        let contents = std::fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "x,y,z,r,g,b");
        assert_eq!(lines[1], "0.5,-0.25,1.0,1.0,0.5,0.0");

        let json_path = dir.path().join("scene.json");
        scene.export_json(&json_path).unwrap();
        let loaded: Scene3D =
            serde_json::from_reader(File::open(&json_path).unwrap()).unwrap();
        assert_eq!(loaded, scene);
    }

    #[test]
    fn test_save_png() {
        let mut scene = Scene3D::new(unit_axes(false), top_down());
        scene.push(Point3::origin(), [0.2, 0.4, 0.6]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.png");
        scene.save_png(&path, &CanvasConfig::default()).unwrap();
        let reloaded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(reloaded.dimensions(), (800, 800));
    }
}
