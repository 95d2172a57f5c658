//! Per-feature tuning: search bands, detector limits, padding and the
//! thresholds used by the landmark filters.
//!
//! Everything here is plain data, deserializable from the `[features]` table
//! of the config file and checked once by [`Profiles::validate`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest face the face detector reports, in pixels.
pub const MIN_FACE_SIZE: u32 = 30;

/// Default floor on the size of a detected feature box.
pub const DEFAULT_MIN_OBJECT_SIZE: u32 = MIN_FACE_SIZE / 5;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{feature}: height ratios must satisfy 0 <= min < max <= 1 (got {min}..{max})")]
    HeightBand {
        feature: Feature,
        min: f32,
        max: f32,
    },
    #[error("{feature}: expected count must be at least 1")]
    ExpectedCount { feature: Feature },
    #[error("{feature}: {name} must be within [0, 1] (got {value})")]
    Ratio {
        feature: Feature,
        name: &'static str,
        value: f32,
    },
    #[error("{feature}: padding must not be negative")]
    Padding { feature: Feature },
    #[error("corner detector: {0}")]
    Corners(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Eye,
    Eyebrow,
    Nose,
    Mouth,
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Feature::Eye => "eye",
            Feature::Eyebrow => "eyebrow",
            Feature::Nose => "nose",
            Feature::Mouth => "mouth",
        })
    }
}

/// Vertical band of the face (as fractions of its height) where a feature is
/// searched, plus the smallest box the detector may report for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureProfile {
    pub min_height_ratio: f32,
    pub max_height_ratio: f32,
    #[serde(default = "default_min_object_size")]
    pub min_object_size: u32,
}

fn default_min_object_size() -> u32 {
    DEFAULT_MIN_OBJECT_SIZE
}

impl FeatureProfile {
    pub const fn new(min_height_ratio: f32, max_height_ratio: f32) -> Self {
        Self {
            min_height_ratio,
            max_height_ratio,
            min_object_size: DEFAULT_MIN_OBJECT_SIZE,
        }
    }

    fn validate(&self, feature: Feature) -> Result<(), ConfigError> {
        let (min, max) = (self.min_height_ratio, self.max_height_ratio);
        if !(0.0..=1.0).contains(&min) || !(0.0..=1.0).contains(&max) || min >= max {
            return Err(ConfigError::HeightBand { feature, min, max });
        }
        Ok(())
    }
}

/// Pixels added around a detected box once it is in the image frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Padding {
    /// Added on both the left and the right.
    pub horizontal: i32,
    pub top: i32,
    pub bottom: i32,
}

/// Search settings shared by every feature found with the object detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Search {
    pub profile: FeatureProfile,
    pub expected_count: usize,
    #[serde(default)]
    pub padding: Padding,
}

impl Search {
    fn validate(&self, feature: Feature) -> Result<(), ConfigError> {
        self.profile.validate(feature)?;
        if self.expected_count == 0 {
            return Err(ConfigError::ExpectedCount { feature });
        }
        let p = self.padding;
        if p.horizontal < 0 || p.top < 0 || p.bottom < 0 {
            return Err(ConfigError::Padding { feature });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeSettings {
    pub search: Search,
    /// Half-height of the band around the box center, as a fraction of box
    /// height, where eye corners may lie.
    pub band_ratio: f32,
}

impl Default for EyeSettings {
    fn default() -> Self {
        Self {
            search: Search {
                profile: FeatureProfile::new(0.2, 0.55),
                expected_count: 2,
                padding: Padding {
                    horizontal: 3,
                    top: 0,
                    bottom: 0,
                },
            },
            band_ratio: 0.12,
        }
    }
}

/// Eyebrow box relative to its eye box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyebrowGeometry {
    /// Added on each side, as a fraction of eye width.
    pub widen_ratio: f32,
    /// Upward shift, as a fraction of eye height.
    pub lift_ratio: f32,
    /// Height kept, as a fraction of eye height.
    pub height_ratio: f32,
}

impl Default for EyebrowGeometry {
    fn default() -> Self {
        Self {
            widen_ratio: 0.15,
            lift_ratio: 0.15,
            height_ratio: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoseSettings {
    pub search: Search,
    /// Margin from each vertical edge and from the center column, as a
    /// fraction of box width.
    pub side_margin_ratio: f32,
    /// Margin from the bottom edge, as a fraction of box height.
    pub bottom_margin_ratio: f32,
    /// Points must lie at least this many pixels below the box center.
    pub center_offset: f32,
}

impl Default for NoseSettings {
    fn default() -> Self {
        Self {
            search: Search {
                profile: FeatureProfile::new(0.4, 0.75),
                expected_count: 1,
                padding: Padding::default(),
            },
            side_margin_ratio: 0.09,
            bottom_margin_ratio: 0.12,
            center_offset: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouthSettings {
    pub search: Search,
    /// Half-width of the column around the box center averaged into the
    /// midline point, as a fraction of box width.
    pub midline_ratio: f32,
}

impl Default for MouthSettings {
    fn default() -> Self {
        Self {
            search: Search {
                profile: FeatureProfile::new(0.7, 0.99),
                expected_count: 1,
                padding: Padding {
                    horizontal: 5,
                    top: 5,
                    bottom: 0,
                },
            },
            midline_ratio: 0.1,
        }
    }
}

/// Full per-feature table.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profiles {
    pub eye: EyeSettings,
    pub eyebrow: EyebrowGeometry,
    pub nose: NoseSettings,
    pub mouth: MouthSettings,
}

impl Profiles {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.eye.search.validate(Feature::Eye)?;
        self.nose.search.validate(Feature::Nose)?;
        self.mouth.search.validate(Feature::Mouth)?;

        let ratios = [
            (Feature::Eye, "band_ratio", self.eye.band_ratio),
            (Feature::Eyebrow, "widen_ratio", self.eyebrow.widen_ratio),
            (Feature::Eyebrow, "lift_ratio", self.eyebrow.lift_ratio),
            (Feature::Eyebrow, "height_ratio", self.eyebrow.height_ratio),
            (Feature::Nose, "side_margin_ratio", self.nose.side_margin_ratio),
            (Feature::Nose, "bottom_margin_ratio", self.nose.bottom_margin_ratio),
            (Feature::Mouth, "midline_ratio", self.mouth.midline_ratio),
        ];
        for (feature, name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Ratio {
                    feature,
                    name,
                    value,
                });
            }
        }
        Ok(())
    }
}
