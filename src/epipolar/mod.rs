//! Epipolar line overlays for a stereo image pair.
//!
//! Given point correspondences and the epipolar lines they induce, each line
//! is drawn across one image and its point is drawn as a filled disc on the
//! other image, both in the same color, so the eye can pair them up.
//!
//! Colors come from a caller supplied random number generator. Passing a
//! seeded generator makes the output fully reproducible:
//!
//! ```rust
//! use image::RgbImage;
//! use nalgebra::Point2;
//! use rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256PlusPlus;
//! use stereo_viz_tools::epipolar::{EpipolarLine, EpipolarRenderer};
//!
//! let left = RgbImage::new(64, 48);
//! let right = RgbImage::new(64, 48);
//! let points = [Point2::new(10, 10)];
//! let lines = [EpipolarLine::new(0.0, 1.0, -10.0)];
//!
//! let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
//! let renderer = EpipolarRenderer::default();
//! let (with_lines, with_points) = renderer
//!     .render(left, &points, right, &lines, &mut rng)
//!     .unwrap();
//! assert_eq!(with_lines.dimensions(), (64, 48));
//! assert_eq!(with_points.dimensions(), (64, 48));
//! ```

use crate::config::{EpipolarConfig, DEFAULT_MARKER_SIZE};
use crate::error::VizError;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;
use log::{debug, info};
use nalgebra::{Point2, Vector3};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Line `a * x + b * y + c = 0` in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpipolarLine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl EpipolarLine {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        EpipolarLine { a, b, c }
    }

    /// Row of the line at column `x`, or `None` for a vertical line (`b == 0`).
    pub fn y_at(&self, x: f64) -> Option<f64> {
        if self.b == 0.0 {
            return None;
        }
        Some(-(self.c + self.a * x) / self.b)
    }

    /// Checks that the line can be evaluated as `y = f(x)`.
    ///
    /// # Errors
    ///
    /// * [`VizError::InvalidGeometry`] if a coefficient is not finite or the
    ///   line is vertical.
    pub fn validate(&self, index: usize) -> Result<(), VizError> {
        if !self.a.is_finite() || !self.b.is_finite() || !self.c.is_finite() {
            return Err(VizError::InvalidGeometry {
                index,
                reason: format!("non-finite coefficients {self:?}"),
            });
        }
        if self.b == 0.0 {
            return Err(VizError::InvalidGeometry {
                index,
                reason: "vertical line, second coefficient is zero".to_string(),
            });
        }
        Ok(())
    }
}

impl From<Vector3<f64>> for EpipolarLine {
    fn from(coefficients: Vector3<f64>) -> Self {
        EpipolarLine::new(coefficients.x, coefficients.y, coefficients.z)
    }
}

impl From<[f64; 3]> for EpipolarLine {
    fn from([a, b, c]: [f64; 3]) -> Self {
        EpipolarLine::new(a, b, c)
    }
}

/// Draws three independent uniform channel values.
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> Rgb<u8> {
    Rgb([rng.gen(), rng.gen(), rng.gen()])
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpipolarRenderer {
    marker_size: u32,
}

impl Default for EpipolarRenderer {
    fn default() -> Self {
        EpipolarRenderer {
            marker_size: DEFAULT_MARKER_SIZE,
        }
    }
}

impl EpipolarRenderer {
    /// Creates a renderer drawing lines `marker_size` pixels thick and discs
    /// of radius `marker_size²`.
    ///
    /// # Errors
    ///
    /// * [`VizError::InvalidParams`] if `marker_size` is zero or its square
    ///   does not fit a pixel radius.
    pub fn new(marker_size: u32) -> Result<Self, VizError> {
        if marker_size == 0 {
            return Err(VizError::InvalidParams(
                "Marker size must be positive".to_string(),
            ));
        }
        let radius = u64::from(marker_size) * u64::from(marker_size);
        if i32::try_from(radius).is_err() {
            return Err(VizError::InvalidParams(format!(
                "Marker size {marker_size} is too large"
            )));
        }
        Ok(EpipolarRenderer { marker_size })
    }

    pub fn from_config(config: &EpipolarConfig) -> Result<Self, VizError> {
        Self::new(config.marker_size)
    }

    pub fn marker_size(&self) -> u32 {
        self.marker_size
    }

    fn circle_radius(&self) -> i32 {
        // Bounded by the check in `new`.
        (self.marker_size * self.marker_size) as i32
    }

    /// Draws every correspondence and returns `(lines_image, points_image)`.
    ///
    /// Line `i` is drawn on `lines_image` from its intersection with the left
    /// border (`x = 0`) to the right border (`x = width - 1`); point `i` is
    /// drawn on `points_image`. Both get the `i`-th color drawn from `rng`.
    /// Correspondences are processed in order, so later ones overdraw earlier
    /// ones. All inputs are checked before any pixel is written.
    ///
    /// # Errors
    ///
    /// * [`VizError::InvalidInput`] if `points` and `lines` differ in length or
    ///   `lines_image` is empty.
    /// * [`VizError::InvalidGeometry`] if a line is vertical, has non-finite
    ///   coefficients, or its border intersections overflow.
    pub fn render<R: Rng + ?Sized>(
        &self,
        mut points_image: RgbImage,
        points: &[Point2<i32>],
        mut lines_image: RgbImage,
        lines: &[EpipolarLine],
        rng: &mut R,
    ) -> Result<(RgbImage, RgbImage), VizError> {
        if points.len() != lines.len() {
            return Err(VizError::InvalidInput(format!(
                "Expected one epipolar line per point, got {} points and {} lines",
                points.len(),
                lines.len()
            )));
        }
        let (width, height) = lines_image.dimensions();
        if width == 0 || height == 0 {
            return Err(VizError::InvalidInput(
                "Cannot draw epipolar lines on an empty image".to_string(),
            ));
        }

        let x_right = f64::from(width - 1);
        let segments = lines
            .iter()
            .enumerate()
            .map(|(index, line)| border_segment(line, index, x_right))
            .collect::<Result<Vec<_>, _>>()?;

        let thickness = self.marker_size;
        let radius = self.circle_radius();
        for (index, (point, (start, end))) in points.iter().zip(segments).enumerate() {
            let color = random_color(rng);
            let drawn = draw_thick_segment(&mut lines_image, start, end, thickness, color);
            if !drawn {
                debug!("Epipolar line {index} does not cross the image");
            }
            if disc_overlaps_image(&points_image, point, radius) {
                draw_filled_circle_mut(&mut points_image, (point.x, point.y), radius, color);
            } else {
                debug!("Point {index} at ({}, {}) is outside the image", point.x, point.y);
            }
            debug!(
                "Correspondence {index}: point ({}, {}), line ({:.1}, {:.1}) -> ({:.1}, {:.1}), color {:?}",
                point.x, point.y, start.0, start.1, end.0, end.1, color.0
            );
        }

        info!(
            "Drew {} epipolar correspondences (marker size {})",
            points.len(),
            self.marker_size
        );
        Ok((lines_image, points_image))
    }
}

/// Draws `points` on `points_image` and `lines` on `lines_image`.
///
/// Shorthand for [`EpipolarRenderer::new`] followed by
/// [`EpipolarRenderer::render`].
pub fn draw_epipolar_lines<R: Rng + ?Sized>(
    points_image: RgbImage,
    points: &[Point2<i32>],
    lines_image: RgbImage,
    lines: &[EpipolarLine],
    marker_size: u32,
    rng: &mut R,
) -> Result<(RgbImage, RgbImage), VizError> {
    EpipolarRenderer::new(marker_size)?.render(points_image, points, lines_image, lines, rng)
}

type Segment = ((f64, f64), (f64, f64));

/// Whether the bounding box of a disc touches the image.
fn disc_overlaps_image(image: &RgbImage, center: &Point2<i32>, radius: i32) -> bool {
    let (width, height) = image.dimensions();
    let (x, y, r) = (i64::from(center.x), i64::from(center.y), i64::from(radius));
    x + r >= 0 && y + r >= 0 && x - r < i64::from(width) && y - r < i64::from(height)
}

fn border_segment(line: &EpipolarLine, index: usize, x_right: f64) -> Result<Segment, VizError> {
    line.validate(index)?;
    let endpoints = line.y_at(0.0).zip(line.y_at(x_right));
    match endpoints {
        Some((y_left, y_right)) if y_left.is_finite() && y_right.is_finite() => {
            Ok(((0.0, y_left), (x_right, y_right)))
        }
        _ => Err(VizError::InvalidGeometry {
            index,
            reason: format!("line {line:?} has no finite intersection with the image borders"),
        }),
    }
}

/// Draws a segment `thickness` pixels wide. Returns false when nothing of it
/// falls on the image.
fn draw_thick_segment(
    image: &mut RgbImage,
    start: (f64, f64),
    end: (f64, f64),
    thickness: u32,
    color: Rgb<u8>,
) -> bool {
    let (width, height) = image.dimensions();
    let margin = f64::from(thickness);
    let lower = (-margin, -margin);
    let upper = (f64::from(width) - 1.0 + margin, f64::from(height) - 1.0 + margin);
    let Some((start, end)) = clip_segment(start, end, lower, upper) else {
        return false;
    };

    if thickness == 1 {
        draw_line_segment_mut(
            image,
            (start.0 as f32, start.1 as f32),
            (end.0 as f32, end.1 as f32),
            color,
        );
        return true;
    }

    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let length = dx.hypot(dy);
    let (nx, ny) = if length > 0.0 {
        (-dy / length, dx / length)
    } else {
        (0.0, 1.0)
    };

    // The outline is drawn too, so the band spans `thickness - 1` pixels
    // between its edges to cover exactly `thickness` pixels.
    let below = f64::from((thickness - 1) / 2);
    let above = f64::from(thickness - 1) - below;

    let corner = |x: f64, y: f64| Point::new(x.round() as i32, y.round() as i32);
    let polygon = [
        corner(start.0 + nx * above, start.1 + ny * above),
        corner(end.0 + nx * above, end.1 + ny * above),
        corner(end.0 - nx * below, end.1 - ny * below),
        corner(start.0 - nx * below, start.1 - ny * below),
    ];
    if polygon[0] == polygon[3] {
        draw_line_segment_mut(
            image,
            (start.0 as f32, start.1 as f32),
            (end.0 as f32, end.1 as f32),
            color,
        );
    } else {
        draw_polygon_mut(image, &polygon, color);
    }
    true
}

/// Liang-Barsky clipping of the segment `p0 -> p1` against the box
/// `[lower, upper]`.
fn clip_segment(
    p0: (f64, f64),
    p1: (f64, f64),
    lower: (f64, f64),
    upper: (f64, f64),
) -> Option<Segment> {
    let (dx, dy) = (p1.0 - p0.0, p1.1 - p0.1);
    let mut t_enter = 0.0_f64;
    let mut t_exit = 1.0_f64;

    for (p, q) in [
        (-dx, p0.0 - lower.0),
        (dx, upper.0 - p0.0),
        (-dy, p0.1 - lower.1),
        (dy, upper.1 - p0.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t_exit {
                return None;
            }
            t_enter = t_enter.max(t);
        } else {
            if t < t_enter {
                return None;
            }
            t_exit = t_exit.min(t);
        }
    }

    Some((
        (p0.0 + t_enter * dx, p0.1 + t_enter * dy),
        (p0.0 + t_exit * dx, p0.1 + t_exit * dy),
    ))
}
