//! Per-face orchestration: eyes (with eyebrows), nose and mouth are located
//! concurrently and joined before the call returns.

use image::{GrayImage, RgbImage};
use serde::Serialize;

use crate::corners::{extract_candidates, HarrisCorners, KeypointDetector};
use crate::detector::{select_boxes, ObjectDetector};
use crate::geometry::{eyebrow_region, feature_region, Point2, Rect};
use crate::landmarks::{
    filter_eye, filter_mouth, filter_nose, reduce_eye, reduce_eyebrow, reduce_mouth, reduce_nose,
    EyeLandmarks, EyebrowLandmarks, MouthLandmarks, NoseLandmarks,
};
use crate::overlay::{Overlay, BLUE, CYAN, GREEN, MAGENTA, ORANGE, RED, YELLOW};
use crate::profile::{Profiles, Search};

/// Read-only buffers derived once per image and shared by every task.
pub struct Frame {
    /// Plain luminance; corners are extracted from it.
    pub luma: GrayImage,
    /// Histogram-equalized luminance handed to the object detectors.
    pub gray: GrayImage,
}

impl Frame {
    pub fn new(color: &RgbImage) -> Self {
        let luma = image::imageops::grayscale(color);
        let gray = imageproc::contrast::equalize_histogram(&luma);
        Self { luma, gray }
    }
}

/// Object detectors used for one face.
#[derive(Clone, Copy)]
pub struct FeatureDetectors<'a> {
    pub eye: &'a dyn ObjectDetector,
    pub nose: &'a dyn ObjectDetector,
    pub mouth: &'a dyn ObjectDetector,
}

/// Everything found on one face. All points are in the image frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FaceLandmarks {
    pub face: Rect,
    pub eyes: Vec<EyeLandmarks>,
    pub noses: Vec<NoseLandmarks>,
    pub mouths: Vec<MouthLandmarks>,
}

impl FaceLandmarks {
    pub fn is_empty(&self) -> bool {
        self.eyes.is_empty() && self.noses.is_empty() && self.mouths.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Located {
    pub landmarks: FaceLandmarks,
    /// In paint order.
    pub overlays: Vec<Overlay>,
}

pub struct Locator<K = HarrisCorners> {
    pub profiles: Profiles,
    pub keypoints: K,
    /// Also draw feature boxes, raw candidates and filtered candidates.
    pub debug: bool,
}

impl<K: KeypointDetector> Locator<K> {
    pub fn new(profiles: Profiles, keypoints: K) -> Self {
        Self {
            profiles,
            keypoints,
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Locate landmarks on `face`. Blocks until the eye, nose and mouth tasks
    /// have all finished.
    pub fn locate(&self, frame: &Frame, face: Rect, detectors: &FeatureDetectors) -> Located {
        let mut eyes: (Vec<EyeLandmarks>, Vec<Overlay>) = Default::default();
        let mut noses: (Vec<NoseLandmarks>, Vec<Overlay>) = Default::default();
        let mut mouths: (Vec<MouthLandmarks>, Vec<Overlay>) = Default::default();

        rayon::scope(|s| {
            s.spawn(|_| eyes = self.eyes(frame, &face, detectors.eye));
            s.spawn(|_| noses = self.noses(frame, &face, detectors.nose));
            s.spawn(|_| mouths = self.mouths(frame, &face, detectors.mouth));
        });

        log::debug!(
            "face {:?}: {} eyes, {} noses, {} mouths",
            face,
            eyes.0.len(),
            noses.0.len(),
            mouths.0.len()
        );

        let mut overlays = Vec::new();
        if self.debug {
            let mut outline = Overlay::new(face);
            outline.outline(RED);
            overlays.push(outline);
        }
        overlays.extend(eyes.1);
        overlays.extend(noses.1);
        overlays.extend(mouths.1);

        Located {
            landmarks: FaceLandmarks {
                face,
                eyes: eyes.0,
                noses: noses.0,
                mouths: mouths.0,
            },
            overlays,
        }
    }

    fn boxes(
        &self,
        frame: &Frame,
        face: &Rect,
        search: &Search,
        detector: &dyn ObjectDetector,
    ) -> Vec<Rect> {
        let region = feature_region(face, &search.profile);
        select_boxes(detector, &frame.gray, &region, search)
    }

    /// Candidates of `rect` in the global frame, plus the clipped rectangle
    /// they are local to.
    fn candidates(&self, frame: &Frame, rect: &Rect) -> Option<(Rect, Vec<Point2>)> {
        extract_candidates(&self.keypoints, &frame.luma, rect)
    }

    fn debug_marks(&self, overlay: &mut Overlay, area: &Rect, raw: &[Point2], kept: &[Point2]) {
        if !self.debug {
            return;
        }
        let raw: Vec<Point2> = raw.iter().map(|p| p.to_global(area)).collect();
        overlay.dots(&raw, GREEN);
        overlay.dots(kept, YELLOW);
        overlay.outline(RED);
    }

    fn eyes(
        &self,
        frame: &Frame,
        face: &Rect,
        detector: &dyn ObjectDetector,
    ) -> (Vec<EyeLandmarks>, Vec<Overlay>) {
        let settings = &self.profiles.eye;
        let mut found = Vec::new();
        let mut overlays = Vec::new();

        for b in self.boxes(frame, face, &settings.search, detector) {
            let Some((area, raw)) = self.candidates(frame, &b) else {
                continue;
            };
            let kept = filter_eye(&area, &raw, settings.band_ratio);
            log::debug!("eye {:?}: {} candidates, {} kept", area, raw.len(), kept.len());
            let mut eye = reduce_eye(&area, &kept, face.center().x);

            let mut overlay = Overlay::new(area);
            self.debug_marks(&mut overlay, &area, &raw, &kept);
            overlay.dot_opt(eye.left_corner, ORANGE);
            overlay.dot_opt(eye.right_corner, ORANGE);
            overlay.dot(eye.center, RED);
            overlays.push(overlay);

            if let Some((brow, overlay)) = self.eyebrow(frame, &area) {
                eye.eyebrow = Some(brow);
                overlays.push(overlay);
            }
            found.push(eye);
        }
        (found, overlays)
    }

    fn eyebrow(&self, frame: &Frame, eye: &Rect) -> Option<(EyebrowLandmarks, Overlay)> {
        let region = eyebrow_region(eye, &self.profiles.eyebrow);
        let (area, raw) = self.candidates(frame, &region)?;
        let brow = reduce_eyebrow(&area, &raw, eye.center().x);
        log::debug!("eyebrow {:?}: {} candidates", area, raw.len());

        let mut overlay = Overlay::new(area);
        if self.debug {
            let raw: Vec<Point2> = raw.iter().map(|p| p.to_global(&area)).collect();
            overlay.dots(&raw, GREEN);
            overlay.outline(RED);
        }
        overlay.dot_opt(brow.left_end, CYAN);
        overlay.dot_opt(brow.right_end, CYAN);
        Some((brow, overlay))
    }

    fn noses(
        &self,
        frame: &Frame,
        face: &Rect,
        detector: &dyn ObjectDetector,
    ) -> (Vec<NoseLandmarks>, Vec<Overlay>) {
        let settings = &self.profiles.nose;
        let mut found = Vec::new();
        let mut overlays = Vec::new();

        for b in self.boxes(frame, face, &settings.search, detector) {
            let Some((area, raw)) = self.candidates(frame, &b) else {
                continue;
            };
            let kept = filter_nose(&area, &raw, settings);
            log::debug!("nose {:?}: {} candidates, {} kept", area, raw.len(), kept.len());
            let nose = reduce_nose(&area, &kept);

            let mut overlay = Overlay::new(area);
            self.debug_marks(&mut overlay, &area, &raw, &kept);
            overlay.dot_opt(nose.left_nostril, MAGENTA);
            overlay.dot_opt(nose.right_nostril, MAGENTA);
            overlay.dot(nose.center, MAGENTA);
            overlays.push(overlay);
            found.push(nose);
        }
        (found, overlays)
    }

    fn mouths(
        &self,
        frame: &Frame,
        face: &Rect,
        detector: &dyn ObjectDetector,
    ) -> (Vec<MouthLandmarks>, Vec<Overlay>) {
        let settings = &self.profiles.mouth;
        let mut found = Vec::new();
        let mut overlays = Vec::new();

        for b in self.boxes(frame, face, &settings.search, detector) {
            let Some((area, raw)) = self.candidates(frame, &b) else {
                continue;
            };
            let kept = filter_mouth(&area, &raw);
            log::debug!("mouth {:?}: {} candidates, {} kept", area, raw.len(), kept.len());
            let mouth = reduce_mouth(&area, &kept, settings);

            let mut overlay = Overlay::new(area);
            self.debug_marks(&mut overlay, &area, &raw, &kept);
            overlay.dot_opt(mouth.left_corner, BLUE);
            overlay.dot_opt(mouth.right_corner, BLUE);
            overlay.dot_opt(mouth.midline, BLUE);
            overlay.dot(mouth.center, BLUE);
            overlays.push(overlay);
            found.push(mouth);
        }
        (found, overlays)
    }
}
