//! Feature box selection on top of a pluggable object detector.

use image::GrayImage;

use crate::geometry::Rect;
use crate::profile::Search;

/// Object detector for one kind of facial feature.
///
/// Implementations look only inside `area` (global frame, already clipped to
/// `gray`) and return boxes in the local frame of `area`. Boxes smaller than
/// `min_size` on either side should not be reported.
pub trait ObjectDetector: Send + Sync {
    fn detect(&self, gray: &GrayImage, area: Rect, min_size: u32) -> Vec<Rect>;
}

/// Total order used to rank detections: larger area first, then leftmost,
/// topmost, narrower and shorter. Detector return order never matters.
fn rank(a: &Rect, b: &Rect) -> std::cmp::Ordering {
    b.area()
        .cmp(&a.area())
        .then(a.x.cmp(&b.x))
        .then(a.y.cmp(&b.y))
        .then(a.width.cmp(&b.width))
        .then(a.height.cmp(&b.height))
}

/// Keep at most `k` boxes, the largest first.
pub fn top_k(mut boxes: Vec<Rect>, k: usize) -> Vec<Rect> {
    boxes.sort_by(rank);
    boxes.truncate(k);
    boxes
}

/// Run `detector` over `region` (global frame) and return at most
/// `search.expected_count` boxes, translated to the global frame, padded and
/// clipped to the image. An empty result is a normal outcome.
pub fn select_boxes(
    detector: &dyn ObjectDetector,
    gray: &GrayImage,
    region: &Rect,
    search: &Search,
) -> Vec<Rect> {
    let Some(area) = region.clip_to(gray.width(), gray.height()) else {
        return Vec::new();
    };
    let raw = detector.detect(gray, area, search.profile.min_object_size);
    log::debug!("detector returned {} boxes in {:?}", raw.len(), area);

    let pad = search.padding;
    top_k(raw, search.expected_count)
        .into_iter()
        .filter_map(|b| {
            b.translate(area.x, area.y)
                .pad(pad.horizontal, pad.top, pad.bottom)
                .clip_to(gray.width(), gray.height())
        })
        .collect()
}
