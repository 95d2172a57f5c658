//! Feature detectors seeded from the face detector's own five landmarks.
//!
//! YuNet already places both eyes, the nose tip and the mouth corners. The
//! boxes built here around those points stand in for dedicated eye, nose and
//! mouth cascades: they go through the same search band, ranking, padding and
//! corner refinement as any other [`ObjectDetector`].

use image::GrayImage;

use crate::detector::ObjectDetector;
use crate::face::Detection;
use crate::geometry::{Point2, Rect};
use crate::locator::FeatureDetectors;

/// Fixed set of boxes in the image frame. Reports the ones whose center falls
/// inside the searched area.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnchoredDetector {
    pub boxes: Vec<Rect>,
}

impl ObjectDetector for AnchoredDetector {
    fn detect(&self, _gray: &GrayImage, area: Rect, min_size: u32) -> Vec<Rect> {
        let min_size = min_size as i32;
        self.boxes
            .iter()
            .filter(|b| area.contains(b.center()))
            .filter_map(|b| b.intersection(&area))
            .filter(|b| b.width >= min_size && b.height >= min_size)
            .map(|b| b.translate(-area.x, -area.y))
            .collect()
    }
}

fn centered(at: Point2, width: f32, height: f32) -> Rect {
    Rect::from([at.x - width / 2.0, at.y - height / 2.0, width, height])
}

/// Eye, nose and mouth boxes for one detected face.
#[derive(Debug, Clone, Default)]
pub struct AnchoredFeatures {
    pub eye: AnchoredDetector,
    pub nose: AnchoredDetector,
    pub mouth: AnchoredDetector,
}

impl AnchoredFeatures {
    /// Boxes are scaled by the distance between the eyes, falling back to a
    /// fraction of the face width when the landmarks collapse.
    pub fn from_detection(det: &Detection) -> Self {
        let [left_eye, right_eye] = det.eyes();
        let mut d = left_eye.distance(&right_eye);
        if d < 1.0 {
            d = det.bbox[2] * 0.4;
        }

        let eye = AnchoredDetector {
            boxes: vec![
                centered(left_eye, 0.5 * d, 0.3 * d),
                centered(right_eye, 0.5 * d, 0.3 * d),
            ],
        };
        let nose = AnchoredDetector {
            boxes: vec![centered(det.nose_tip(), 0.55 * d, 0.45 * d)],
        };

        let [left, right] = det.mouth_corners();
        let mid = Point2::new((left.x + right.x) / 2.0, (left.y + right.y) / 2.0);
        let mouth = AnchoredDetector {
            boxes: vec![centered(mid, 1.3 * left.distance(&right), 0.45 * d)],
        };

        Self { eye, nose, mouth }
    }

    pub fn detectors(&self) -> FeatureDetectors<'_> {
        FeatureDetectors {
            eye: &self.eye,
            nose: &self.nose,
            mouth: &self.mouth,
        }
    }
}
