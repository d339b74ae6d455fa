//! Colored point clouds from dense per-pixel 3D maps.
//!
//! The point map is a `Matrix3xX<f64>` holding one column per pixel of the
//! color image, in row-major pixel order: column `r * width + c` is the 3D
//! coordinate seen at row `r`, column `c`. Row 0 of the matrix is the X plane,
//! row 1 the Y plane and row 2 the Z plane.

use crate::config::PointCloudConfig;
use crate::error::VizError;
use crate::scene::{Scene3D, SceneAxes};
use image::RgbImage;
use log::{debug, info, warn};
use nalgebra::{Matrix3xX, Point3};
use std::path::PathBuf;

/// Multiplies every coordinate of the point map by `scale`.
pub fn scale_point_map(point_map: &Matrix3xX<f64>, scale: f64) -> Matrix3xX<f64> {
    point_map * scale
}

/// Pixel positions kept when downsampling a `rows x cols` grid.
///
/// The grid keeps `rows / stride` rows and `cols / stride` columns (floor
/// division) starting at 0: rows `0, stride, 2 * stride, ...`, likewise for
/// columns. Positions are returned as `(row, col)` in row-major order.
///
/// # Errors
///
/// * [`VizError::InvalidParams`] if `stride` is zero.
pub fn downsample_indices(
    rows: usize,
    cols: usize,
    stride: usize,
) -> Result<Vec<(usize, usize)>, VizError> {
    if stride == 0 {
        return Err(VizError::InvalidParams(
            "Downsample stride must be positive".to_string(),
        ));
    }
    let rows_down = rows / stride;
    let cols_down = cols / stride;
    let mut indices = Vec::with_capacity(rows_down * cols_down);
    for row in 0..rows_down {
        for col in 0..cols_down {
            indices.push((row * stride, col * stride));
        }
    }
    Ok(indices)
}

/// Builds the colored scatter scene for `point_map` seen through `color_image`.
///
/// # Arguments
///
/// * `point_map` - One 3D coordinate per pixel of `color_image`, see the
///   module docs for the layout.
/// * `color_image` - RGB colors of the same pixels.
/// * `config` - Scale, stride, axes limits and view of the scene.
///
/// # Returns
///
/// * `Result<Scene3D, VizError>` - Scaled, downsampled points with their
///   colors normalized to [0, 1].
///
/// # Errors
///
/// * [`VizError::InvalidInput`] if the point map does not have exactly
///   `height * width` columns.
/// * [`VizError::InvalidParams`] if the configuration is invalid.
pub fn build_point_cloud_scene(
    point_map: &Matrix3xX<f64>,
    color_image: &RgbImage,
    config: &PointCloudConfig,
) -> Result<Scene3D, VizError> {
    config.validate()?;

    let (width, height) = color_image.dimensions();
    let (cols, rows) = (width as usize, height as usize);
    if point_map.ncols() != rows * cols {
        return Err(VizError::InvalidInput(format!(
            "Point map has {} points but the image has {}x{} = {} pixels",
            point_map.ncols(),
            cols,
            rows,
            rows * cols
        )));
    }

    let scaled = scale_point_map(point_map, config.scale);
    let indices = downsample_indices(rows, cols, config.stride)?;

    let axes = SceneAxes::new(
        config.x_limits,
        config.y_limits,
        config.z_limits,
        config.invert_z,
    );
    let mut scene = Scene3D::with_capacity(axes, config.view, indices.len());
    for (row, col) in indices {
        let coords = scaled.column(row * cols + col);
        let pixel = color_image.get_pixel(col as u32, row as u32);
        scene.push(
            Point3::new(coords[0], coords[1], coords[2]),
            [
                f64::from(pixel[0]) / 255.0,
                f64::from(pixel[1]) / 255.0,
                f64::from(pixel[2]) / 255.0,
            ],
        );
    }

    if scene.is_empty() {
        warn!(
            "Image {}x{} is smaller than the downsample stride {}, scene is empty",
            cols, rows, config.stride
        );
    }
    debug!(
        "Downsampled {}x{} point map by {} to {} points",
        cols,
        rows,
        config.stride,
        scene.len()
    );
    Ok(scene)
}

/// Builds the point cloud scene and opens it in the system viewer.
///
/// # Returns
///
/// * `Result<PathBuf, VizError>` - Path of the rendered snapshot
pub fn render_point_cloud(
    point_map: &Matrix3xX<f64>,
    color_image: &RgbImage,
    config: &PointCloudConfig,
) -> Result<PathBuf, VizError> {
    let scene = build_point_cloud_scene(point_map, color_image, config)?;
    info!("Displaying point cloud with {} points", scene.len());
    scene.show(&config.canvas)
}
