//! Integer rectangles, float points and the sub-region arithmetic used to
//! narrow a face down to the band where a single feature is searched.
//!
//! Two coordinate frames are in play: *global* (the full image) and *local*
//! (relative to the origin of some [`Rect`]). Every function here states which
//! frame it consumes and produces; converting between them is a translation by
//! the owning rectangle's origin.

use serde::{Deserialize, Serialize};

use crate::profile::{EyebrowGeometry, FeatureProfile};

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Center in the same frame as the rectangle itself.
    pub fn center(&self) -> Point2 {
        Point2::new(
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn contains(&self, p: Point2) -> bool {
        p.x >= self.x as f32
            && p.y >= self.y as f32
            && p.x < self.right() as f32
            && p.y < self.bottom() as f32
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        let r = Rect::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y));
        (!r.is_empty()).then_some(r)
    }

    /// Intersect with the `width` × `height` image. `None` means nothing of
    /// the rectangle is readable.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Rect> {
        self.intersection(&Rect::new(0, 0, width as i32, height as i32))
    }

    /// Grow by `dx` on both sides, `top` above and `bottom` below.
    pub fn pad(&self, dx: i32, top: i32, bottom: i32) -> Self {
        Self::new(
            self.x - dx,
            self.y - top,
            self.width + 2 * dx,
            self.height + top + bottom,
        )
    }
}

impl From<[f32; 4]> for Rect {
    /// `[x, y, w, h]`, truncating toward zero. Out-of-range values saturate
    /// and NaN becomes 0.
    fn from(b: [f32; 4]) -> Self {
        Rect::new(b[0] as i32, b[1] as i32, b[2] as i32, b[3] as i32)
    }
}

/// Sub-pixel point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Moves a point local to `rect` into the frame `rect` itself lives in.
    pub fn to_global(self, rect: &Rect) -> Self {
        Self::new(self.x + rect.x as f32, self.y + rect.y as f32)
    }

    pub fn to_local(self, rect: &Rect) -> Self {
        Self::new(self.x - rect.x as f32, self.y - rect.y as f32)
    }

    pub fn distance(&self, other: &Point2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Band of `face` between the profile's height ratios. Fractional bounds are
/// truncated toward zero, so the band never reaches below the face.
pub fn feature_region(face: &Rect, profile: &FeatureProfile) -> Rect {
    let h = face.height as f32;
    Rect::new(
        face.x,
        face.y + (profile.min_height_ratio * h) as i32,
        face.width,
        ((profile.max_height_ratio - profile.min_height_ratio) * h) as i32,
    )
}

/// Region above an eye box where the eyebrow is expected, in the eye box's
/// frame.
pub fn eyebrow_region(eye: &Rect, geometry: &EyebrowGeometry) -> Rect {
    let widen = (eye.width as f32 * geometry.widen_ratio) as i32;
    let lift = (eye.height as f32 * geometry.lift_ratio) as i32;
    Rect::new(
        eye.x - widen,
        eye.y - lift,
        eye.width + 2 * widen,
        (eye.height as f32 * geometry.height_ratio) as i32,
    )
}
