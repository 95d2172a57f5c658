//! Annotation overlays.
//!
//! Feature tasks never touch the output image. Each one records marks into
//! its own [`Overlay`], bounded by the box it worked on; overlays are painted
//! one after another once every task has finished. Painting goes through a
//! copy of the bounded region, so nothing outside `bounds` can change.

use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};

use crate::geometry::{Point2, Rect};

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
pub const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);
pub const CYAN: Rgb<u8> = Rgb([0, 255, 255]);
pub const MAGENTA: Rgb<u8> = Rgb([255, 0, 255]);
pub const ORANGE: Rgb<u8> = Rgb([255, 165, 0]);

const DOT_RADIUS: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mark {
    Dot { at: Point2, color: Rgb<u8> },
    Outline { rect: Rect, color: Rgb<u8> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub bounds: Rect,
    pub marks: Vec<Mark>,
}

impl Overlay {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            marks: Vec::new(),
        }
    }

    /// Dot at a global point.
    pub fn dot(&mut self, at: Point2, color: Rgb<u8>) {
        self.marks.push(Mark::Dot { at, color });
    }

    pub fn dots(&mut self, points: &[Point2], color: Rgb<u8>) {
        for &p in points {
            self.dot(p, color);
        }
    }

    pub fn dot_opt(&mut self, at: Option<Point2>, color: Rgb<u8>) {
        if let Some(p) = at {
            self.dot(p, color);
        }
    }

    /// Outline of the overlay's own bounds.
    pub fn outline(&mut self, color: Rgb<u8>) {
        self.marks.push(Mark::Outline {
            rect: self.bounds,
            color,
        });
    }

    /// Paint every mark onto `canvas`, clipped to `bounds`.
    pub fn paint(&self, canvas: &mut RgbImage) {
        let Some(area) = self.bounds.clip_to(canvas.width(), canvas.height()) else {
            return;
        };
        let mut patch = imageops::crop_imm(
            &*canvas,
            area.x as u32,
            area.y as u32,
            area.width as u32,
            area.height as u32,
        )
        .to_image();

        for mark in &self.marks {
            match *mark {
                Mark::Dot { at, color } => {
                    let p = at.to_local(&area);
                    draw_filled_circle_mut(
                        &mut patch,
                        (p.x.round() as i32, p.y.round() as i32),
                        DOT_RADIUS,
                        color,
                    );
                }
                Mark::Outline { rect, color } => {
                    if let Some(r) = rect.intersection(&area) {
                        let r = r.translate(-area.x, -area.y);
                        draw_hollow_rect_mut(
                            &mut patch,
                            imageproc::rect::Rect::at(r.x, r.y)
                                .of_size(r.width as u32, r.height as u32),
                            color,
                        );
                    }
                }
            }
        }

        imageops::replace(canvas, &patch, area.x as i64, area.y as i64);
    }
}

/// Paint overlays in order; later overlays draw over earlier ones.
pub fn composite(canvas: &mut RgbImage, overlays: &[Overlay]) {
    for overlay in overlays {
        overlay.paint(canvas);
    }
}
