use crate::epipolar::EpipolarLine;
use crate::error::VizError;
use image::RgbImage;
use nalgebra::{Matrix3xX, Point2};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Ensure the output directory exists
pub fn ensure_output_dir<P: AsRef<Path>>(dir: P) -> Result<(), VizError> {
    let output_dir = dir.as_ref();
    if !output_dir.exists() {
        fs::create_dir_all(output_dir).map_err(|e| {
            VizError::InvalidParams(format!(
                "Failed to create output directory {}: {e}",
                output_dir.display()
            ))
        })?;
    }
    Ok(())
}

/// Load an image from file path
///
/// Gray and RGBA images are converted to RGB.
///
/// # Arguments
///
/// * `image_path` - Path to the image file
///
/// # Returns
///
/// * `Result<RgbImage, VizError>` - Loaded RGB image
pub fn load_image<P: AsRef<Path>>(image_path: P) -> Result<RgbImage, VizError> {
    let img = image::open(image_path.as_ref())?;
    log::debug!(
        "Loaded {}x{} image from {}",
        img.width(),
        img.height(),
        image_path.as_ref().display()
    );
    Ok(img.to_rgb8())
}

/// Save an image, format deduced from the file extension
pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<(), VizError> {
    image.save(path.as_ref())?;
    log::info!("Saved image: {}", path.as_ref().display());
    Ok(())
}

#[derive(Deserialize)]
struct PointRecord {
    x: i32,
    y: i32,
}

#[derive(Deserialize)]
struct LineRecord {
    a: f64,
    b: f64,
    c: f64,
}

#[derive(Deserialize)]
struct MapRecord {
    x: f64,
    y: f64,
    z: f64,
}

fn read_records<T, P>(path: P) -> Result<Vec<T>, VizError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path.as_ref())?;
    let records = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
    log::debug!(
        "Read {} records from {}",
        records.len(),
        path.as_ref().display()
    );
    Ok(records)
}

/// Load pixel coordinates from a CSV file with an `x,y` header
pub fn load_points_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Point2<i32>>, VizError> {
    let records: Vec<PointRecord> = read_records(path)?;
    Ok(records.into_iter().map(|r| Point2::new(r.x, r.y)).collect())
}

/// Load epipolar line coefficients from a CSV file with an `a,b,c` header
pub fn load_lines_csv<P: AsRef<Path>>(path: P) -> Result<Vec<EpipolarLine>, VizError> {
    let records: Vec<LineRecord> = read_records(path)?;
    Ok(records
        .into_iter()
        .map(|r| EpipolarLine::new(r.a, r.b, r.c))
        .collect())
}

/// Load a dense point map from a CSV file with an `x,y,z` header
///
/// The file holds one row per pixel in row-major order; the result has one
/// column per row of the file.
pub fn load_point_map_csv<P: AsRef<Path>>(path: P) -> Result<Matrix3xX<f64>, VizError> {
    let records: Vec<MapRecord> = read_records(path)?;
    Ok(Matrix3xX::from_fn(records.len(), |channel, index| {
        let record = &records[index];
        match channel {
            0 => record.x,
            1 => record.y,
            _ => record.z,
        }
    }))
}

/// Build a point map from three consecutive coordinate planes
///
/// # Arguments
///
/// * `planes` - All X values, then all Y values, then all Z values
///
/// # Returns
///
/// * `Result<Matrix3xX<f64>, VizError>` - One column per pixel
pub fn point_map_from_planes(planes: &[f64]) -> Result<Matrix3xX<f64>, VizError> {
    if planes.len() % 3 != 0 {
        return Err(VizError::InvalidInput(format!(
            "Point map length {} is not a multiple of 3",
            planes.len()
        )));
    }
    Ok(Matrix3xX::from_row_slice(planes))
}
