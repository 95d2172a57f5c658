//! Landmark filtering and reduction.
//!
//! Each feature goes through two steps. A *filter* converts the candidate
//! points of a box (local to the box) into the global frame and drops those
//! outside the feature-specific zone. A *reduction* collapses the survivors
//! into landmarks, either by extremum or by centroid. Every point returned
//! from this module is in the global frame.
//!
//! Landmarks that depend on candidate points are `Option`s: an empty set is a
//! normal outcome and simply leaves that landmark absent. Box centers do not
//! depend on candidates and are always present.

use serde::Serialize;

use crate::geometry::{Point2, Rect};
use crate::profile::{MouthSettings, NoseSettings};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EyebrowLandmarks {
    pub bounds: Rect,
    pub left_end: Option<Point2>,
    pub right_end: Option<Point2>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EyeLandmarks {
    pub bounds: Rect,
    pub left_corner: Option<Point2>,
    pub right_corner: Option<Point2>,
    /// Corner farther from the face's vertical center line.
    pub outer_corner: Option<Point2>,
    /// Corner closer to the face's vertical center line.
    pub inner_corner: Option<Point2>,
    pub center: Point2,
    pub eyebrow: Option<EyebrowLandmarks>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoseLandmarks {
    pub bounds: Rect,
    pub left_nostril: Option<Point2>,
    pub right_nostril: Option<Point2>,
    pub center: Point2,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MouthLandmarks {
    pub bounds: Rect,
    pub left_corner: Option<Point2>,
    pub right_corner: Option<Point2>,
    pub midline: Option<Point2>,
    pub center: Point2,
}

pub fn centroid(points: &[Point2]) -> Option<Point2> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f32;
    let (sx, sy) = points
        .iter()
        .fold((0f32, 0f32), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point2::new(sx / n, sy / n))
}

/// Leftmost and rightmost points. Among points sharing an x the earliest is
/// leftmost and the latest is rightmost.
pub fn horizontal_extremes(points: &[Point2]) -> (Option<Point2>, Option<Point2>) {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x));
    (sorted.first().copied(), sorted.last().copied())
}

/// Split at `x`: strictly left of it, and the rest.
fn partition_at(points: &[Point2], x: f32) -> (Vec<Point2>, Vec<Point2>) {
    points.iter().partition(|p| p.x < x)
}

fn to_global<'a>(bounds: &Rect, local: &'a [Point2]) -> impl Iterator<Item = Point2> + 'a {
    let bounds = *bounds;
    local.iter().map(move |p| p.to_global(&bounds))
}

/// Eye corners lie close to the horizontal center line of the box.
pub fn filter_eye(bounds: &Rect, candidates: &[Point2], band_ratio: f32) -> Vec<Point2> {
    let center = bounds.center();
    let band = bounds.height as f32 * band_ratio;
    to_global(bounds, candidates)
        .filter(|p| (p.y - center.y).abs() <= band)
        .collect()
}

/// `face_center_x` decides which corner is outer: an eye left of the face
/// center has its outer corner on the left.
pub fn reduce_eye(bounds: &Rect, kept: &[Point2], face_center_x: f32) -> EyeLandmarks {
    let (left_corner, right_corner) = horizontal_extremes(kept);
    let center = bounds.center();
    let (outer_corner, inner_corner) = if center.x < face_center_x {
        (left_corner, right_corner)
    } else {
        (right_corner, left_corner)
    };
    EyeLandmarks {
        bounds: *bounds,
        left_corner,
        right_corner,
        outer_corner,
        inner_corner,
        center,
        eyebrow: None,
    }
}

/// Eyebrow ends: the outermost point on each side of `split_x` (the eye
/// center), at the mean height of that side. `candidates` are local to
/// `bounds`.
pub fn reduce_eyebrow(bounds: &Rect, candidates: &[Point2], split_x: f32) -> EyebrowLandmarks {
    let points: Vec<Point2> = to_global(bounds, candidates).collect();
    let (left, right) = partition_at(&points, split_x);

    let mean_y = |side: &[Point2]| centroid(side).map(|c| c.y);
    let left_end = left.iter().map(|p| p.x).reduce(f32::min);
    let right_end = right.iter().map(|p| p.x).reduce(f32::max);

    EyebrowLandmarks {
        bounds: *bounds,
        left_end: left_end
            .zip(mean_y(&left))
            .map(|(x, y)| Point2::new(x, y)),
        right_end: right_end
            .zip(mean_y(&right))
            .map(|(x, y)| Point2::new(x, y)),
    }
}

/// Nostril candidates: below the center line, clear of the bottom and side
/// edges, and clear of the central column where the septum sits.
pub fn filter_nose(bounds: &Rect, candidates: &[Point2], settings: &NoseSettings) -> Vec<Point2> {
    let center = bounds.center();
    let side = bounds.width as f32 * settings.side_margin_ratio;
    let bottom = bounds.height as f32 * settings.bottom_margin_ratio;
    let (left, right) = (bounds.x as f32, bounds.right() as f32);
    let floor = bounds.bottom() as f32 - bottom;

    to_global(bounds, candidates)
        .filter(|p| {
            p.y >= center.y + settings.center_offset
                && p.y <= floor
                && p.x >= left + side
                && p.x <= right - side
                && (p.x - center.x).abs() >= side
        })
        .collect()
}

pub fn reduce_nose(bounds: &Rect, kept: &[Point2]) -> NoseLandmarks {
    let center = bounds.center();
    let (left, right) = partition_at(kept, center.x);
    NoseLandmarks {
        bounds: *bounds,
        left_nostril: centroid(&left),
        right_nostril: centroid(&right),
        center,
    }
}

/// Mouth corners are searched in the upper half of the padded box.
pub fn filter_mouth(bounds: &Rect, candidates: &[Point2]) -> Vec<Point2> {
    let center = bounds.center();
    to_global(bounds, candidates)
        .filter(|p| p.y <= center.y)
        .collect()
}

pub fn reduce_mouth(bounds: &Rect, kept: &[Point2], settings: &MouthSettings) -> MouthLandmarks {
    let center = bounds.center();
    let (left_corner, right_corner) = horizontal_extremes(kept);
    let column = bounds.width as f32 * settings.midline_ratio;
    let mid: Vec<Point2> = kept
        .iter()
        .copied()
        .filter(|p| (p.x - center.x).abs() <= column)
        .collect();

    MouthLandmarks {
        bounds: *bounds,
        left_corner,
        right_corner,
        midline: centroid(&mid),
        center,
    }
}
