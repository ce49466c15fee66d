//! The adjustment profile produced by analysis.
//!
//! Every field is optional: a provider may populate only part of the
//! structure. Missing values are filled with neutral defaults by the sidecar
//! encoder, never here, so the profile keeps track of what was actually
//! recommended.

use serde::{Deserialize, Serialize};

/// Inclusive valid range for a numeric field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRange {
    pub min: f64,
    pub max: f64,
}

impl FieldRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp a value into range. Non-finite values are rejected.
    pub fn clamp(&self, value: f64) -> Option<f64> {
        value.is_finite().then(|| value.clamp(self.min, self.max))
    }
}

pub const EXPOSURE_RANGE: FieldRange = FieldRange::new(-5.0, 5.0);
pub const PERCENT_RANGE: FieldRange = FieldRange::new(-100.0, 100.0);
pub const POSITIVE_PERCENT_RANGE: FieldRange = FieldRange::new(0.0, 100.0);
pub const TINT_RANGE: FieldRange = FieldRange::new(-150.0, 150.0);
pub const SHARPNESS_RANGE: FieldRange = FieldRange::new(0.0, 150.0);
pub const RADIUS_RANGE: FieldRange = FieldRange::new(0.5, 3.0);

/// The canonical analysis output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentProfile {
    pub basic: BasicAdjustments,
    pub color: ColorAdjustments,
    pub hsl: HslAdjustments,
    pub detail: DetailAdjustments,
    pub effects: EffectAdjustments,
}

/// Tonal adjustments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicAdjustments {
    /// Exposure in stops, -5.0..5.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contrast: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlights: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadows: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whites: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blacks: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibrance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dehaze: Option<f64>,
}

/// White balance.
///
/// `temperature` is always held on the normalized -100..100 scale (see
/// [`crate::temperature`]). `absolute_kelvin` records the reading it was
/// derived from, for display only; the encoder never consults it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorAdjustments {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tint: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absolute_kelvin: Option<u32>,
}

/// Sharpening and noise reduction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailAdjustments {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharpness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masking: Option<f64>,
    #[serde(
        rename = "noiseReduction",
        alias = "noise_reduction",
        skip_serializing_if = "Option::is_none"
    )]
    pub noise_reduction: Option<f64>,
    #[serde(
        rename = "colorNoiseReduction",
        alias = "color_noise_reduction",
        skip_serializing_if = "Option::is_none"
    )]
    pub color_noise_reduction: Option<f64>,
}

/// Post-crop vignette.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectAdjustments {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feather: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub midpoint: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roundness: Option<f64>,
}

/// One hue/saturation/luminance triple.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HslChannel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub luminance: Option<f64>,
}

impl HslChannel {
    fn is_empty(&self) -> bool {
        self.hue.is_none() && self.saturation.is_none() && self.luminance.is_none()
    }
}

/// The eight color bands the editor exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Orange,
    Yellow,
    Green,
    Aqua,
    Blue,
    Purple,
    Magenta,
}

impl Channel {
    /// All channels in document order.
    pub const ALL: [Channel; 8] = [
        Channel::Red,
        Channel::Orange,
        Channel::Yellow,
        Channel::Green,
        Channel::Aqua,
        Channel::Blue,
        Channel::Purple,
        Channel::Magenta,
    ];

    /// Lowercase key used in JSON.
    pub fn key(self) -> &'static str {
        match self {
            Channel::Red => "red",
            Channel::Orange => "orange",
            Channel::Yellow => "yellow",
            Channel::Green => "green",
            Channel::Aqua => "aqua",
            Channel::Blue => "blue",
            Channel::Purple => "purple",
            Channel::Magenta => "magenta",
        }
    }

    /// Capitalized suffix used in sidecar tag names.
    pub fn tag_suffix(self) -> &'static str {
        match self {
            Channel::Red => "Red",
            Channel::Orange => "Orange",
            Channel::Yellow => "Yellow",
            Channel::Green => "Green",
            Channel::Aqua => "Aqua",
            Channel::Blue => "Blue",
            Channel::Purple => "Purple",
            Channel::Magenta => "Magenta",
        }
    }
}

/// Per-channel HSL adjustments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HslAdjustments {
    #[serde(skip_serializing_if = "HslChannel::is_empty")]
    pub red: HslChannel,
    #[serde(skip_serializing_if = "HslChannel::is_empty")]
    pub orange: HslChannel,
    #[serde(skip_serializing_if = "HslChannel::is_empty")]
    pub yellow: HslChannel,
    #[serde(skip_serializing_if = "HslChannel::is_empty")]
    pub green: HslChannel,
    #[serde(skip_serializing_if = "HslChannel::is_empty")]
    pub aqua: HslChannel,
    #[serde(skip_serializing_if = "HslChannel::is_empty")]
    pub blue: HslChannel,
    #[serde(skip_serializing_if = "HslChannel::is_empty")]
    pub purple: HslChannel,
    #[serde(skip_serializing_if = "HslChannel::is_empty")]
    pub magenta: HslChannel,
}

impl HslAdjustments {
    pub fn channel(&self, channel: Channel) -> &HslChannel {
        match channel {
            Channel::Red => &self.red,
            Channel::Orange => &self.orange,
            Channel::Yellow => &self.yellow,
            Channel::Green => &self.green,
            Channel::Aqua => &self.aqua,
            Channel::Blue => &self.blue,
            Channel::Purple => &self.purple,
            Channel::Magenta => &self.magenta,
        }
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut HslChannel {
        match channel {
            Channel::Red => &mut self.red,
            Channel::Orange => &mut self.orange,
            Channel::Yellow => &mut self.yellow,
            Channel::Green => &mut self.green,
            Channel::Aqua => &mut self.aqua,
            Channel::Blue => &mut self.blue,
            Channel::Purple => &mut self.purple,
            Channel::Magenta => &mut self.magenta,
        }
    }

    pub fn is_empty(&self) -> bool {
        Channel::ALL.iter().all(|c| self.channel(*c).is_empty())
    }
}

impl BasicAdjustments {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl ColorAdjustments {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.tint.is_none()
    }
}

impl DetailAdjustments {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl EffectAdjustments {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn clamp_field(field: &mut Option<f64>, range: FieldRange) {
    *field = field.and_then(|v| range.clamp(v));
}

impl AdjustmentProfile {
    /// Clamp every populated field into its documented range.
    ///
    /// Non-finite values are dropped so the encoder falls back to defaults.
    pub fn clamp_to_ranges(&mut self) {
        let b = &mut self.basic;
        clamp_field(&mut b.exposure, EXPOSURE_RANGE);
        for field in [
            &mut b.contrast,
            &mut b.highlights,
            &mut b.shadows,
            &mut b.whites,
            &mut b.blacks,
            &mut b.clarity,
            &mut b.vibrance,
            &mut b.saturation,
            &mut b.dehaze,
        ] {
            clamp_field(field, PERCENT_RANGE);
        }

        clamp_field(&mut self.color.temperature, PERCENT_RANGE);
        clamp_field(&mut self.color.tint, TINT_RANGE);

        for channel in Channel::ALL {
            let c = self.hsl.channel_mut(channel);
            clamp_field(&mut c.hue, PERCENT_RANGE);
            clamp_field(&mut c.saturation, PERCENT_RANGE);
            clamp_field(&mut c.luminance, PERCENT_RANGE);
        }

        let d = &mut self.detail;
        clamp_field(&mut d.sharpness, SHARPNESS_RANGE);
        clamp_field(&mut d.radius, RADIUS_RANGE);
        for field in [
            &mut d.detail,
            &mut d.masking,
            &mut d.noise_reduction,
            &mut d.color_noise_reduction,
        ] {
            clamp_field(field, POSITIVE_PERCENT_RANGE);
        }

        let e = &mut self.effects;
        for field in [&mut e.amount, &mut e.feather, &mut e.midpoint] {
            clamp_field(field, POSITIVE_PERCENT_RANGE);
        }
        clamp_field(&mut e.roundness, PERCENT_RANGE);
    }

    /// Number of top-level groups carrying at least one value.
    pub fn populated_groups(&self) -> usize {
        [
            !self.basic.is_empty(),
            !self.color.is_empty(),
            !self.hsl.is_empty(),
            !self.detail.is_empty(),
            !self.effects.is_empty(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}
