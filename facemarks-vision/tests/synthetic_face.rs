use facemarks_vision::anchors::AnchoredDetector;
use facemarks_vision::pipeline::locate_faces;
use facemarks_vision::{
    FaceLandmarks, FeatureDetectors, Frame, HarrisCorners, Locator, Point2, Profiles, Rect,
};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_ellipse_mut, draw_filled_rect_mut};

const SKIN: Rgb<u8> = Rgb([190, 160, 140]);
const DARK: Rgb<u8> = Rgb([30, 20, 20]);
const FACE: Rect = Rect::new(20, 20, 160, 160);

/// Cartoon face: two eyes with brows, two nostrils and a mouth on a flat
/// background. The brows sit inside the band searched above each eye box
/// (rows 60..66) and above the eye boxes themselves (from row 62).
fn face_image() -> RgbImage {
    let mut img = RgbImage::from_pixel(200, 200, SKIN);
    draw_filled_ellipse_mut(&mut img, (70, 70), 12, 6, DARK);
    draw_filled_ellipse_mut(&mut img, (130, 70), 12, 6, DARK);
    draw_filled_rect_mut(&mut img, imageproc::rect::Rect::at(56, 60).of_size(28, 2), DARK);
    draw_filled_rect_mut(&mut img, imageproc::rect::Rect::at(116, 60).of_size(28, 2), DARK);
    draw_filled_circle_mut(&mut img, (90, 118), 4, DARK);
    draw_filled_circle_mut(&mut img, (110, 118), 4, DARK);
    draw_filled_rect_mut(&mut img, imageproc::rect::Rect::at(75, 145).of_size(50, 10), DARK);
    img
}

struct Boxes {
    eye: AnchoredDetector,
    nose: AnchoredDetector,
    mouth: AnchoredDetector,
}

impl Boxes {
    fn new() -> Self {
        Self {
            eye: AnchoredDetector {
                boxes: vec![Rect::new(115, 62, 30, 16), Rect::new(55, 62, 30, 16)],
            },
            nose: AnchoredDetector {
                boxes: vec![Rect::new(80, 100, 40, 28)],
            },
            mouth: AnchoredDetector {
                boxes: vec![Rect::new(65, 138, 70, 24)],
            },
        }
    }

    fn detectors(&self) -> FeatureDetectors<'_> {
        FeatureDetectors {
            eye: &self.eye,
            nose: &self.nose,
            mouth: &self.mouth,
        }
    }
}

fn locate(debug: bool) -> (FaceLandmarks, RgbImage) {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
    let img = face_image();
    let frame = Frame::new(&img);
    let locator = Locator::new(Profiles::default(), HarrisCorners::default()).with_debug(debug);
    let boxes = Boxes::new();
    let mut result = locate_faces(&locator, &frame, &[(FACE, boxes.detectors())]);
    assert_eq!(result.faces.len(), 1);

    let mut canvas = img;
    result.annotate(&mut canvas);
    (result.faces.remove(0), canvas)
}

fn assert_near(point: Option<Point2>, x: f32, y: f32, what: &str) {
    let p = point.unwrap_or_else(|| panic!("{what} missing"));
    assert!(
        (p.x - x).abs() <= 3.0 && (p.y - y).abs() <= 3.0,
        "{what} at {p:?}, expected near ({x}, {y})"
    );
}

fn assert_inside(bounds: &Rect, point: Option<Point2>, what: &str) {
    if let Some(p) = point {
        assert!(bounds.contains(p), "{what} {p:?} outside {bounds:?}");
    }
}

#[test]
fn finds_every_feature() {
    let (face, _) = locate(false);
    assert_eq!(face.face, FACE);
    assert_eq!(face.eyes.len(), 2);
    assert_eq!(face.noses.len(), 1);
    assert_eq!(face.mouths.len(), 1);

    // Equal areas rank left to right; padding adds 3 px on each side.
    assert_eq!(face.eyes[0].bounds, Rect::new(52, 62, 36, 16));
    assert_eq!(face.eyes[0].center, Point2::new(70.0, 70.0));
    assert_eq!(face.eyes[1].center, Point2::new(130.0, 70.0));

    assert_eq!(face.noses[0].bounds, Rect::new(80, 100, 40, 28));
    assert_eq!(face.mouths[0].bounds, Rect::new(60, 133, 80, 29));
    assert_eq!(face.mouths[0].center, Point2::new(100.0, 147.5));
}

#[test]
fn corners_come_from_the_drawn_shapes() {
    let (face, _) = locate(false);

    // Eye tips sit at the ends of each ellipse.
    let (left, right) = (&face.eyes[0], &face.eyes[1]);
    assert_near(left.left_corner, 58.0, 70.0, "left eye, left corner");
    assert_near(left.right_corner, 82.0, 70.0, "left eye, right corner");
    assert_near(right.left_corner, 118.0, 70.0, "right eye, left corner");
    assert_near(right.right_corner, 142.0, 70.0, "right eye, right corner");

    // Outer corners point away from the face center at x = 100.
    assert_eq!(left.outer_corner, left.left_corner);
    assert_eq!(left.inner_corner, left.right_corner);
    assert_eq!(right.outer_corner, right.right_corner);
    assert_eq!(right.inner_corner, right.left_corner);

    // Brow ends are the outermost candidates on each side of the eye center.
    for (eye, left_x, right_x) in [(left, 56.0, 83.0), (right, 116.0, 143.0)] {
        let brow = eye.eyebrow.as_ref().expect("eyebrow region inside the image");
        assert_near(brow.left_end, left_x, 61.0, "brow left end");
        assert_near(brow.right_end, right_x, 61.0, "brow right end");
    }

    let nose = &face.noses[0];
    assert_near(nose.left_nostril, 90.0, 120.0, "left nostril");
    assert_near(nose.right_nostril, 110.0, 120.0, "right nostril");

    let mouth = &face.mouths[0];
    assert_near(mouth.left_corner, 75.0, 145.0, "mouth left corner");
    assert_near(mouth.right_corner, 124.0, 145.0, "mouth right corner");
}

#[test]
fn landmarks_stay_inside_their_boxes() {
    let (face, _) = locate(false);
    for eye in &face.eyes {
        assert_inside(&eye.bounds, eye.left_corner, "eye corner");
        assert_inside(&eye.bounds, eye.right_corner, "eye corner");
        if let (Some(l), Some(r)) = (eye.left_corner, eye.right_corner) {
            assert!(l.x <= r.x);
        }
        let brow = eye.eyebrow.as_ref().expect("eyebrow region inside the image");
        assert_inside(&brow.bounds, brow.left_end, "eyebrow end");
        assert_inside(&brow.bounds, brow.right_end, "eyebrow end");
        if let Some(l) = brow.left_end {
            assert!(l.x < eye.center.x);
        }
        if let Some(r) = brow.right_end {
            assert!(r.x >= eye.center.x);
        }
    }
    for nose in &face.noses {
        assert_inside(&nose.bounds, nose.left_nostril, "nostril");
        assert_inside(&nose.bounds, nose.right_nostril, "nostril");
    }
    for mouth in &face.mouths {
        assert_inside(&mouth.bounds, mouth.left_corner, "mouth corner");
        assert_inside(&mouth.bounds, mouth.right_corner, "mouth corner");
        assert_inside(&mouth.bounds, mouth.midline, "mouth midline");
        // Only the upper half of the mouth box contributes.
        for p in [mouth.left_corner, mouth.right_corner, mouth.midline]
            .into_iter()
            .flatten()
        {
            assert!(p.y <= mouth.center.y);
        }
    }
}

#[test]
fn repeated_runs_agree() {
    let (first, first_canvas) = locate(true);
    let (second, second_canvas) = locate(true);
    assert_eq!(first, second);
    assert_eq!(first_canvas, second_canvas);
}

#[test]
fn annotations_stay_on_the_face() {
    let original = face_image();
    let (_, canvas) = locate(true);
    let mut changed = 0;
    for (x, y, px) in canvas.enumerate_pixels() {
        let p = Point2::new(x as f32, y as f32);
        if !FACE.contains(p) {
            assert_eq!(px, original.get_pixel(x, y), "pixel ({x}, {y}) changed");
        } else if px != original.get_pixel(x, y) {
            changed += 1;
        }
    }
    assert!(changed > 0);
}

#[test]
fn faces_are_reported_in_order() {
    let img = face_image();
    let frame = Frame::new(&img);
    let locator = Locator::new(Profiles::default(), HarrisCorners::default());
    let boxes = Boxes::new();
    let nothing = AnchoredDetector::default();
    let empty = FeatureDetectors {
        eye: &nothing,
        nose: &nothing,
        mouth: &nothing,
    };
    let other = Rect::new(0, 0, 50, 50);

    let result = locate_faces(
        &locator,
        &frame,
        &[(other, empty), (FACE, boxes.detectors())],
    );
    assert_eq!(result.faces.len(), 2);
    assert_eq!(result.faces[0].face, other);
    assert!(result.faces[0].is_empty());
    assert_eq!(result.faces[1].eyes.len(), 2);
    assert!(result.overlays.iter().all(|o| FACE.intersection(&o.bounds) == Some(o.bounds)));
}
