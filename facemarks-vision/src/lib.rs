pub mod anchors;
pub mod corners;
pub mod detector;
pub mod face;
pub mod geometry;
pub mod landmarks;
pub mod locator;
pub mod model;
pub mod overlay;
pub mod pipeline;
pub mod profile;
pub mod yunet;

// Re-export commonly used types
pub use corners::{CornerParams, HarrisCorners, KeypointDetector};
pub use detector::ObjectDetector;
pub use face::Detection;
pub use geometry::{Point2, Rect};
pub use locator::{FaceLandmarks, FeatureDetectors, Frame, Locator};
pub use pipeline::{DetectionSettings, ImageLandmarks, Pipeline};
pub use profile::{ConfigError, Feature, Profiles};
