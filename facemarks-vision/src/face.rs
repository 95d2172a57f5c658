use crate::geometry::{Point2, Rect};
use crate::yunet;
use anyhow::Result;
use image::{imageops, RgbImage};
use ndarray::Array4;
use ort::{session::Session, value::Value};

/// YuNet works on a fixed square input.
pub const INPUT_SIZE: u32 = 640;

/// Face found by YuNet, in source image pixels.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: [f32; 4], // x, y, w, h
    pub score: f32,
    /// Eye, eye, nose tip, mouth corner, mouth corner; as x1,y1,...,x5,y5.
    pub landmarks: [f32; 10],
}

impl Detection {
    /// False when the model produced NaN or infinite coordinates.
    pub fn is_finite(&self) -> bool {
        self.bbox.iter().chain(&self.landmarks).all(|v| v.is_finite())
    }

    pub fn rect(&self) -> Rect {
        Rect::from(self.bbox)
    }

    fn point(&self, i: usize) -> Point2 {
        Point2::new(self.landmarks[2 * i], self.landmarks[2 * i + 1])
    }

    /// Both eyes, leftmost in the image first.
    pub fn eyes(&self) -> [Point2; 2] {
        ordered(self.point(0), self.point(1))
    }

    pub fn nose_tip(&self) -> Point2 {
        self.point(2)
    }

    /// Both mouth corners, leftmost in the image first.
    pub fn mouth_corners(&self) -> [Point2; 2] {
        ordered(self.point(3), self.point(4))
    }
}

fn ordered(a: Point2, b: Point2) -> [Point2; 2] {
    if a.x <= b.x {
        [a, b]
    } else {
        [b, a]
    }
}

/// Square model input plus the mapping back to the source image.
pub struct Letterbox {
    pub canvas: RgbImage,
    pub scale: f32,
    pub offset: (u32, u32),
}

impl Letterbox {
    /// Fit `img` into a `size`×`size` canvas without distortion, centered.
    pub fn new(img: &RgbImage, size: u32) -> Self {
        let (width, height) = img.dimensions();
        let scale = size as f32 / width.max(height).max(1) as f32;
        let new_width = ((width as f32 * scale) as u32).clamp(1, size);
        let new_height = ((height as f32 * scale) as u32).clamp(1, size);

        let resized = imageops::resize(img, new_width, new_height, imageops::FilterType::Triangle);
        let mut canvas = RgbImage::new(size, size);
        let offset = ((size - new_width) / 2, (size - new_height) / 2);
        imageops::overlay(&mut canvas, &resized, offset.0 as i64, offset.1 as i64);

        Self {
            canvas,
            scale,
            offset,
        }
    }

    /// Canvas pixel coordinates back to source pixels.
    pub fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.offset.0 as f32) / self.scale,
            (y - self.offset.1 as f32) / self.scale,
        )
    }

    /// `[1, 3, H, W]` planar BGR, values in [0, 255].
    pub fn to_tensor(&self) -> Array4<f32> {
        let (w, h) = self.canvas.dimensions();
        Array4::from_shape_fn((1, 3, h as usize, w as usize), |(_, c, y, x)| {
            self.canvas.get_pixel(x as u32, y as u32)[2 - c] as f32
        })
    }
}

/// Detect faces in an image using YuNet detector
pub fn detect_faces(
    session: &mut Session,
    img: &RgbImage,
    score_threshold: f32,
    nms_threshold: f32,
) -> Result<Vec<Detection>> {
    let letterbox = Letterbox::new(img, INPUT_SIZE);
    let input_tensor = Value::from_array(letterbox.to_tensor())?;

    let outputs = session.run(ort::inputs![input_tensor])?;

    let mut output_data: Vec<(Vec<i64>, Vec<f32>)> = Vec::new();
    for (_name, output) in outputs.iter() {
        let (shape, data) = output.try_extract_tensor::<f32>()?;
        output_data.push((shape.iter().copied().collect(), data.to_vec()));
    }
    let output_refs: Vec<(&[i64], &[f32])> = output_data
        .iter()
        .map(|(s, d)| (s.as_slice(), d.as_slice()))
        .collect();

    let size = INPUT_SIZE as f32;
    let raw = yunet::decode(&output_refs, INPUT_SIZE as usize, score_threshold)?;
    let detections: Vec<Detection> = raw
        .into_iter()
        .map(|d| {
            let (x, y) = letterbox.unmap(d.bbox[0] * size, d.bbox[1] * size);
            let mut landmarks = [0.0f32; 10];
            for i in 0..5 {
                let (lx, ly) =
                    letterbox.unmap(d.landmarks[2 * i] * size, d.landmarks[2 * i + 1] * size);
                landmarks[2 * i] = lx;
                landmarks[2 * i + 1] = ly;
            }
            Detection {
                bbox: [
                    x,
                    y,
                    d.bbox[2] * size / letterbox.scale,
                    d.bbox[3] * size / letterbox.scale,
                ],
                score: d.score,
                landmarks,
            }
        })
        .filter(Detection::is_finite)
        .collect();

    log::debug!("yunet: {} candidates above {}", detections.len(), score_threshold);

    if nms_threshold < 1.0 {
        return Ok(nms(&detections, nms_threshold));
    }
    Ok(detections)
}

/// Greedy non-maximum suppression, highest score first.
pub fn nms(detections: &[Detection], iou_threshold: f32) -> Vec<Detection> {
    let mut sorted = detections.to_vec();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in sorted {
        if keep
            .iter()
            .all(|kept| compute_iou(&kept.bbox, &candidate.bbox) <= iou_threshold)
        {
            keep.push(candidate);
        }
    }
    keep
}

pub fn compute_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = (a[0] + a[2]).min(b[0] + b[2]);
    let y2 = (a[1] + a[3]).min(b[1] + b[3]);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let inter = (x2 - x1) * (y2 - y1);
    let area_a = a[2] * a[3];
    let area_b = b[2] * b[3];
    inter / (area_a + area_b - inter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn detection(bbox: [f32; 4], score: f32) -> Detection {
        Detection {
            bbox,
            score,
            landmarks: [0.0; 10],
        }
    }

    #[test]
    fn test_iou() {
        let a = [10.0, 10.0, 20.0, 20.0];
        let b = [15.0, 15.0, 20.0, 20.0];
        let iou = compute_iou(&a, &b);
        assert!(iou > 0.0 && iou < 1.0);
        assert!((compute_iou(&a, &a) - 1.0).abs() < 1e-6);

        // No overlap
        let c = [100.0, 100.0, 10.0, 10.0];
        assert_eq!(compute_iou(&a, &c), 0.0);
    }

    #[test]
    fn test_nms() {
        let detections = vec![
            detection([10.0, 10.0, 20.0, 20.0], 0.8),
            detection([12.0, 12.0, 20.0, 20.0], 0.9),
            detection([100.0, 100.0, 20.0, 20.0], 0.85),
        ];

        let result = nms(&detections, 0.3);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].score, 0.9);
        assert_eq!(result[1].score, 0.85);
    }

    #[test]
    fn test_non_finite_detections_flagged() {
        assert!(detection([10.0, 10.0, 20.0, 20.0], 0.9).is_finite());
        assert!(!detection([10.0, 10.0, f32::INFINITY, 20.0], 0.9).is_finite());
        let mut det = detection([10.0, 10.0, 20.0, 20.0], 0.9);
        det.landmarks[3] = f32::NAN;
        assert!(!det.is_finite());
    }

    #[test]
    fn test_landmark_accessors_order_by_x() {
        let det = Detection {
            bbox: [0.0, 0.0, 100.0, 100.0],
            score: 1.0,
            landmarks: [70.0, 30.0, 30.0, 31.0, 50.0, 55.0, 65.0, 75.0, 35.0, 76.0],
        };
        let [left, right] = det.eyes();
        assert_eq!(left, Point2::new(30.0, 31.0));
        assert_eq!(right, Point2::new(70.0, 30.0));
        assert_eq!(det.nose_tip(), Point2::new(50.0, 55.0));
        let [left, right] = det.mouth_corners();
        assert!(left.x < right.x);
        assert_eq!(det.rect(), Rect::new(0, 0, 100, 100));
    }

    #[test]
    fn test_letterbox_centers_and_unmaps() {
        let img = RgbImage::from_pixel(320, 160, Rgb([10, 20, 30]));
        let letterbox = Letterbox::new(&img, INPUT_SIZE);
        assert_eq!(letterbox.scale, 2.0);
        assert_eq!(letterbox.offset, (0, 160));
        assert_eq!(*letterbox.canvas.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*letterbox.canvas.get_pixel(320, 320), Rgb([10, 20, 30]));
        assert_eq!(letterbox.unmap(320.0, 320.0), (160.0, 80.0));
    }

    #[test]
    fn test_tensor_is_planar_bgr() {
        let img = RgbImage::from_pixel(640, 640, Rgb([10, 20, 30]));
        let tensor = Letterbox::new(&img, INPUT_SIZE).to_tensor();
        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_eq!(tensor[[0, 0, 5, 5]], 30.0);
        assert_eq!(tensor[[0, 1, 5, 5]], 20.0);
        assert_eq!(tensor[[0, 2, 5, 5]], 10.0);
    }
}
