//! YuNet output decoding.
//!
//! YuNet is anchor-free. For each stride (8, 16, 32) over a square input it
//! emits four heads, flattened over the H×W grid:
//! - cls: [1, H*W, 1]
//! - obj: [1, H*W, 1]
//! - bbox: [1, H*W, 4] (dx, dy, log w, log h) in stride units
//! - kps: [1, H*W, 10] (5 landmark offsets) in stride units
//!
//! Heads arrive grouped by kind: cls ×3, obj ×3, bbox ×3, kps ×3.

use anyhow::Result;
use ndarray::ArrayView2;

pub const STRIDES: [usize; 3] = [8, 16, 32];

#[derive(Debug, Clone)]
pub struct RawDetection {
    pub bbox: [f32; 4], // x, y, w, h (normalized [0,1])
    pub score: f32,
    pub landmarks: [f32; 10], // 5 points: x1,y1,...,x5,y5 (normalized [0,1])
}

/// One head of one stride as a `[cells, cols]` view.
fn head<'a>(
    outputs: &'a [(&'a [i64], &'a [f32])],
    index: usize,
    cells: usize,
    cols: usize,
) -> Result<ArrayView2<'a, f32>> {
    let Some((shape, data)) = outputs.get(index) else {
        anyhow::bail!("missing YuNet output {}", index);
    };
    if shape.len() != 3 || shape[0] != 1 || shape[1] as usize != cells || shape[2] as usize != cols
    {
        anyhow::bail!(
            "YuNet output {} has shape {:?}, expected [1, {}, {}]",
            index,
            shape,
            cells,
            cols
        );
    }
    Ok(ArrayView2::from_shape((cells, cols), data)?)
}

/// Decode the twelve YuNet heads for a `input_size`×`input_size` input,
/// keeping cells whose score reaches `score_threshold`. Scores are the
/// geometric mean of the clamped class and objectness outputs.
pub fn decode(
    outputs: &[(&[i64], &[f32])],
    input_size: usize,
    score_threshold: f32,
) -> Result<Vec<RawDetection>> {
    let n = STRIDES.len();
    let size = input_size as f32;
    let mut detections = Vec::new();

    for (s, &stride) in STRIDES.iter().enumerate() {
        let grid = input_size / stride;
        let cells = grid * grid;
        let cls = head(outputs, s, cells, 1)?;
        let obj = head(outputs, n + s, cells, 1)?;
        let bbox = head(outputs, 2 * n + s, cells, 4)?;
        let kps = head(outputs, 3 * n + s, cells, 10)?;
        let stride = stride as f32;

        for idx in 0..cells {
            let score =
                (cls[[idx, 0]].clamp(0.0, 1.0) * obj[[idx, 0]].clamp(0.0, 1.0)).sqrt();
            if score < score_threshold {
                continue;
            }
            let (row, col) = ((idx / grid) as f32, (idx % grid) as f32);

            let cx = (col + bbox[[idx, 0]]) * stride;
            let cy = (row + bbox[[idx, 1]]) * stride;
            let w = bbox[[idx, 2]].exp() * stride;
            let h = bbox[[idx, 3]].exp() * stride;

            let mut landmarks = [0f32; 10];
            for k in 0..5 {
                landmarks[2 * k] = (col + kps[[idx, 2 * k]]) * stride / size;
                landmarks[2 * k + 1] = (row + kps[[idx, 2 * k + 1]]) * stride / size;
            }

            detections.push(RawDetection {
                bbox: [(cx - w / 2.0) / size, (cy - h / 2.0) / size, w / size, h / size],
                score,
                landmarks,
            });
        }
    }

    Ok(detections)
}
