//! Candidate point extraction.
//!
//! [`HarrisCorners`] follows the usual "good features to track" recipe:
//! Sobel gradients, a block-summed structure tensor, a Harris (or minimum
//! eigenvalue) response, a threshold relative to the strongest response,
//! 3×3 non-maximum suppression and a greedy minimum-distance pass over the
//! survivors, strongest first.

use image::{imageops, GrayImage};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use serde::{Deserialize, Serialize};

use crate::geometry::{Point2, Rect};
use crate::profile::ConfigError;

/// Generic keypoint detector. Points are returned in the frame of `patch`.
pub trait KeypointDetector: Send + Sync {
    fn extract(&self, patch: &GrayImage) -> Vec<Point2>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerParams {
    pub max_corners: usize,
    /// Fraction of the strongest response a corner must reach.
    pub quality_level: f32,
    pub min_distance: f32,
    pub block_size: u32,
    pub use_harris: bool,
    pub harris_k: f32,
}

impl Default for CornerParams {
    fn default() -> Self {
        Self {
            max_corners: 20,
            quality_level: 0.01,
            min_distance: 3.0,
            block_size: 3,
            use_harris: true,
            harris_k: 0.04,
        }
    }
}

impl CornerParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_corners == 0 {
            return Err(ConfigError::Corners("max_corners must be positive".into()));
        }
        if !(self.quality_level > 0.0 && self.quality_level <= 1.0) {
            return Err(ConfigError::Corners(format!(
                "quality_level must be within (0, 1] (got {})",
                self.quality_level
            )));
        }
        if self.min_distance.is_nan() || self.min_distance < 0.0 {
            return Err(ConfigError::Corners(format!(
                "min_distance must be a non-negative number (got {})",
                self.min_distance
            )));
        }
        if self.block_size == 0 || self.block_size % 2 == 0 {
            return Err(ConfigError::Corners(format!(
                "block_size must be odd (got {})",
                self.block_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct HarrisCorners {
    pub params: CornerParams,
}

impl HarrisCorners {
    pub fn new(params: CornerParams) -> Self {
        Self { params }
    }

    /// Corner response for every pixel, row-major.
    fn response(&self, patch: &GrayImage) -> Vec<f32> {
        let (w, h) = patch.dimensions();
        let (w, h) = (w as usize, h as usize);
        let gx = horizontal_sobel(patch);
        let gy = vertical_sobel(patch);

        let mut xx = vec![0f32; w * h];
        let mut xy = vec![0f32; w * h];
        let mut yy = vec![0f32; w * h];
        for (i, (dx, dy)) in gx.pixels().zip(gy.pixels()).enumerate() {
            let (dx, dy) = (dx[0] as f32, dy[0] as f32);
            xx[i] = dx * dx;
            xy[i] = dx * dy;
            yy[i] = dy * dy;
        }

        let radius = (self.params.block_size / 2) as isize;
        let k = self.params.harris_k;
        let mut out = vec![0f32; w * h];
        for y in 0..h {
            for x in 0..w {
                let (mut a, mut b, mut c) = (0f32, 0f32, 0f32);
                for oy in -radius..=radius {
                    let yy_idx = (y as isize + oy).clamp(0, h as isize - 1) as usize;
                    for ox in -radius..=radius {
                        let xx_idx = (x as isize + ox).clamp(0, w as isize - 1) as usize;
                        let i = yy_idx * w + xx_idx;
                        a += xx[i];
                        b += xy[i];
                        c += yy[i];
                    }
                }
                out[y * w + x] = if self.params.use_harris {
                    let trace = a + c;
                    a * c - b * b - k * trace * trace
                } else {
                    ((a + c) - ((a - c) * (a - c) + 4.0 * b * b).sqrt()) / 2.0
                };
            }
        }
        out
    }
}

impl KeypointDetector for HarrisCorners {
    fn extract(&self, patch: &GrayImage) -> Vec<Point2> {
        let (w, h) = patch.dimensions();
        if w < 3 || h < 3 {
            return Vec::new();
        }
        let (w, h) = (w as usize, h as usize);
        let response = self.response(patch);

        let max = response.iter().copied().fold(0f32, f32::max);
        if max <= 0.0 {
            return Vec::new();
        }
        let threshold = max * self.params.quality_level;

        // Local maxima above threshold, skipping the one-pixel border.
        let mut peaks: Vec<(f32, usize)> = Vec::new();
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let v = response[y * w + x];
                if v < threshold {
                    continue;
                }
                let is_peak = (y - 1..=y + 1)
                    .flat_map(|ny| (x - 1..=x + 1).map(move |nx| ny * w + nx))
                    .all(|i| response[i] <= v);
                if is_peak {
                    peaks.push((v, y * w + x));
                }
            }
        }
        // Stable: equal responses keep raster order.
        peaks.sort_by(|a, b| b.0.total_cmp(&a.0));

        let min_dist_sq = self.params.min_distance * self.params.min_distance;
        let mut corners: Vec<Point2> = Vec::new();
        for (_, idx) in peaks {
            let p = Point2::new((idx % w) as f32, (idx / w) as f32);
            let crowded = corners.iter().any(|c| {
                let (dx, dy) = (c.x - p.x, c.y - p.y);
                dx * dx + dy * dy < min_dist_sq
            });
            if crowded {
                continue;
            }
            corners.push(p);
            if corners.len() == self.params.max_corners {
                break;
            }
        }
        corners
    }
}

/// Candidate points inside `rect` (global frame) of `luma`, returned in the
/// local frame of the clipped rectangle, together with that rectangle. `None`
/// when `rect` lies entirely outside the image.
pub fn extract_candidates(
    detector: &dyn KeypointDetector,
    luma: &GrayImage,
    rect: &Rect,
) -> Option<(Rect, Vec<Point2>)> {
    let area = rect.clip_to(luma.width(), luma.height())?;
    let patch = imageops::crop_imm(
        luma,
        area.x as u32,
        area.y as u32,
        area.width as u32,
        area.height as u32,
    )
    .to_image();
    Some((area, detector.extract(&patch)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn square_image() -> GrayImage {
        let mut img = GrayImage::from_pixel(40, 40, Luma([255]));
        for y in 10..30 {
            for x in 10..30 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        img
    }

    #[test]
    fn test_square_corners() {
        let corners = HarrisCorners::default().extract(&square_image());
        assert!(!corners.is_empty());
        assert!(corners.len() <= 20);

        let expected = [
            Point2::new(10.0, 10.0),
            Point2::new(29.0, 10.0),
            Point2::new(10.0, 29.0),
            Point2::new(29.0, 29.0),
        ];
        for c in &corners {
            let nearest = expected
                .iter()
                .map(|e| e.distance(c))
                .fold(f32::MAX, f32::min);
            assert!(nearest <= 4.0, "{c:?} is not near a square corner");
        }
    }

    #[test]
    fn test_min_distance_respected() {
        let corners = HarrisCorners::default().extract(&square_image());
        for (i, a) in corners.iter().enumerate() {
            for b in &corners[i + 1..] {
                assert!(a.distance(b) >= 3.0);
            }
        }
    }

    #[test]
    fn test_flat_patch_has_no_corners() {
        let img = GrayImage::from_pixel(20, 20, Luma([128]));
        assert!(HarrisCorners::default().extract(&img).is_empty());
    }

    #[test]
    fn test_tiny_patch_has_no_corners() {
        let img = GrayImage::from_pixel(2, 9, Luma([0]));
        assert!(HarrisCorners::default().extract(&img).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let detector = HarrisCorners::default();
        let img = square_image();
        assert_eq!(detector.extract(&img), detector.extract(&img));
    }

    #[test]
    fn test_max_corners_cap() {
        let mut img = GrayImage::from_pixel(120, 120, Luma([255]));
        for by in 0..6 {
            for bx in 0..6 {
                for y in 0..6 {
                    for x in 0..6 {
                        img.put_pixel(8 + bx * 18 + x, 8 + by * 18 + y, Luma([0]));
                    }
                }
            }
        }
        let detector = HarrisCorners::new(CornerParams {
            max_corners: 7,
            ..CornerParams::default()
        });
        assert_eq!(detector.extract(&img).len(), 7);
    }

    #[test]
    fn test_extract_candidates_is_local_and_clipped() {
        let img = square_image();
        let (area, corners) =
            extract_candidates(&HarrisCorners::default(), &img, &Rect::new(20, 20, 40, 40))
                .unwrap();
        assert_eq!(area, Rect::new(20, 20, 20, 20));
        for c in corners {
            assert!(c.x >= 0.0 && c.x < 20.0 && c.y >= 0.0 && c.y < 20.0);
        }
        assert!(extract_candidates(&HarrisCorners::default(), &img, &Rect::new(50, 0, 5, 5)).is_none());
    }

    #[test]
    fn test_params_validation() {
        assert!(CornerParams::default().validate().is_ok());
        let even = CornerParams {
            block_size: 4,
            ..CornerParams::default()
        };
        assert!(even.validate().is_err());
        let zero = CornerParams {
            quality_level: 0.0,
            ..CornerParams::default()
        };
        assert!(zero.validate().is_err());
        for min_distance in [-1.0, f32::NAN] {
            let bad = CornerParams {
                min_distance,
                ..CornerParams::default()
            };
            assert!(bad.validate().is_err(), "min_distance {min_distance} accepted");
        }
    }
}
