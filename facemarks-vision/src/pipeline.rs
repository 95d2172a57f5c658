use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;
use ort::session::Session;
use serde::{Deserialize, Serialize};

use crate::anchors::AnchoredFeatures;
use crate::corners::KeypointDetector;
use crate::face::{self, Detection};
use crate::geometry::Rect;
use crate::locator::{FaceLandmarks, FeatureDetectors, Frame, Locator};
use crate::overlay::{composite, Overlay};
use crate::profile::MIN_FACE_SIZE;

/// Face detector thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    pub score_threshold: f32,
    pub nms_threshold: f32,
    /// Faces narrower or shorter than this are ignored.
    pub min_face_size: u32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            score_threshold: 0.6,
            nms_threshold: 0.3,
            min_face_size: MIN_FACE_SIZE,
        }
    }
}

/// Landmarks of every face in one image, in detection order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImageLandmarks {
    pub faces: Vec<FaceLandmarks>,
    #[serde(skip)]
    pub overlays: Vec<Overlay>,
}

impl ImageLandmarks {
    pub fn annotate(&self, canvas: &mut RgbImage) {
        composite(canvas, &self.overlays);
    }
}

/// Locate landmarks on each face in turn. Features within a face run
/// concurrently; faces do not.
pub fn locate_faces<K: KeypointDetector>(
    locator: &Locator<K>,
    frame: &Frame,
    faces: &[(Rect, FeatureDetectors)],
) -> ImageLandmarks {
    let mut result = ImageLandmarks::default();
    for (face, detectors) in faces {
        let located = locator.locate(frame, *face, detectors);
        result.faces.push(located.landmarks);
        result.overlays.extend(located.overlays);
    }
    result
}

/// Full pipeline: detect faces → seed feature boxes → locate landmarks
pub struct Pipeline<K = crate::corners::HarrisCorners> {
    pub detector: Session,
    pub locator: Locator<K>,
    pub settings: DetectionSettings,
}

impl<K: KeypointDetector> Pipeline<K> {
    pub fn new(model: &Path, locator: Locator<K>, settings: DetectionSettings) -> Result<Self> {
        Ok(Self {
            detector: crate::model::detector_session(model)?,
            locator,
            settings,
        })
    }

    /// Faces large enough to work on, with boxes clipped to the image.
    pub fn detect_faces(&mut self, img: &RgbImage) -> Result<Vec<(Rect, Detection)>> {
        let detections = face::detect_faces(
            &mut self.detector,
            img,
            self.settings.score_threshold,
            self.settings.nms_threshold,
        )
        .context("detecting faces")?;

        let min = self.settings.min_face_size as i32;
        Ok(detections
            .into_iter()
            .filter_map(|d| {
                let rect = d.rect().clip_to(img.width(), img.height())?;
                (rect.width >= min && rect.height >= min).then_some((rect, d))
            })
            .collect())
    }

    /// Detect faces and locate landmarks on each. An image without faces
    /// yields an empty result, not an error.
    pub fn process_image(&mut self, img: &RgbImage) -> Result<ImageLandmarks> {
        let faces = self.detect_faces(img)?;
        log::debug!("{} faces", faces.len());

        let frame = Frame::new(img);
        let features: Vec<AnchoredFeatures> = faces
            .iter()
            .map(|(_, d)| AnchoredFeatures::from_detection(d))
            .collect();
        let seeded: Vec<(Rect, FeatureDetectors)> = faces
            .iter()
            .zip(&features)
            .map(|((rect, _), f)| (*rect, f.detectors()))
            .collect();

        Ok(locate_faces(&self.locator, &frame, &seeded))
    }
}
