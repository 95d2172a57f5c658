pub mod config;
pub mod report;

// Re-export vision types for convenience
pub use facemarks_vision::{
    DetectionSettings, FaceLandmarks, HarrisCorners, ImageLandmarks, Locator, Pipeline, Profiles,
};
