//! Sidecar document encoding and decoding.
//!
//! The document is an XMP packet with Camera Raw settings (`crs:`) tags.
//! Every tag is always emitted, in a fixed order, so downstream editors see
//! a structurally complete preset. Absent fields fall back to neutral
//! defaults. Temperature is written as absolute Kelvin.
//!
//! Output is byte-for-byte deterministic: no timestamps, no identifiers and
//! no locale-dependent number formatting.

use std::collections::HashMap;

use crate::error::SidecarError;
use crate::profile::{AdjustmentProfile, Channel};
use crate::temperature;

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/" x:xmptk="XMP Core 6.0.0">
   <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
      <rdf:Description rdf:about=""
            xmlns:crs="http://ns.adobe.com/camera-raw-settings/1.0/">
"#;

const FOOTER: &str = r#"      </rdf:Description>
   </rdf:RDF>
</x:xmpmeta>
"#;

const INDENT: &str = "         ";

type Getter = fn(&AdjustmentProfile) -> Option<f64>;
type Setter = fn(&mut AdjustmentProfile, f64);

/// One numeric tag of the document.
struct Field {
    tag: &'static str,
    default: f64,
    /// Decimal places kept on output
    precision: usize,
    get: Getter,
    set: Setter,
}

impl Field {
    const fn new(tag: &'static str, default: f64, precision: usize, get: Getter, set: Setter) -> Self {
        Self {
            tag,
            default,
            precision,
            get,
            set,
        }
    }
}

fn basic_fields() -> [Field; 10] {
    [
        Field::new("Exposure", 0.0, 2, |p| p.basic.exposure, |p, v| p.basic.exposure = Some(v)),
        Field::new("Contrast", 0.0, 0, |p| p.basic.contrast, |p, v| p.basic.contrast = Some(v)),
        Field::new("Highlights", 0.0, 0, |p| p.basic.highlights, |p, v| p.basic.highlights = Some(v)),
        Field::new("Shadows", 0.0, 0, |p| p.basic.shadows, |p, v| p.basic.shadows = Some(v)),
        Field::new("Whites", 0.0, 0, |p| p.basic.whites, |p, v| p.basic.whites = Some(v)),
        Field::new("Blacks", 0.0, 0, |p| p.basic.blacks, |p, v| p.basic.blacks = Some(v)),
        Field::new("Clarity", 0.0, 0, |p| p.basic.clarity, |p, v| p.basic.clarity = Some(v)),
        Field::new("Vibrance", 0.0, 0, |p| p.basic.vibrance, |p, v| p.basic.vibrance = Some(v)),
        Field::new("Saturation", 0.0, 0, |p| p.basic.saturation, |p, v| p.basic.saturation = Some(v)),
        Field::new("Dehaze", 0.0, 0, |p| p.basic.dehaze, |p, v| p.basic.dehaze = Some(v)),
    ]
}

fn tint_field() -> Field {
    Field::new("Tint", 0.0, 0, |p| p.color.tint, |p, v| p.color.tint = Some(v))
}

fn noise_fields() -> [Field; 3] {
    [
        Field::new("Sharpness", 0.0, 0, |p| p.detail.sharpness, |p, v| p.detail.sharpness = Some(v)),
        Field::new(
            "LuminanceNoiseReductionDetail",
            0.0,
            0,
            |p| p.detail.noise_reduction,
            |p, v| p.detail.noise_reduction = Some(v),
        ),
        Field::new(
            "ColorNoiseReduction",
            0.0,
            0,
            |p| p.detail.color_noise_reduction,
            |p, v| p.detail.color_noise_reduction = Some(v),
        ),
    ]
}

fn sharpen_fields() -> [Field; 3] {
    [
        Field::new("SharpenRadius", 1.0, 1, |p| p.detail.radius, |p, v| p.detail.radius = Some(v)),
        Field::new("SharpenDetail", 0.0, 0, |p| p.detail.detail, |p, v| p.detail.detail = Some(v)),
        Field::new("SharpenEdgeMasking", 0.0, 0, |p| p.detail.masking, |p, v| p.detail.masking = Some(v)),
    ]
}

fn vignette_fields() -> [Field; 4] {
    [
        Field::new("PostCropVignetteAmount", 0.0, 0, |p| p.effects.amount, |p, v| p.effects.amount = Some(v)),
        Field::new("PostCropVignetteFeather", 50.0, 0, |p| p.effects.feather, |p, v| p.effects.feather = Some(v)),
        Field::new("PostCropVignetteMidpoint", 50.0, 0, |p| p.effects.midpoint, |p, v| p.effects.midpoint = Some(v)),
        Field::new(
            "PostCropVignetteRoundness",
            0.0,
            0,
            |p| p.effects.roundness,
            |p, v| p.effects.roundness = Some(v),
        ),
    ]
}

/// HSL tag prefixes in document order.
const HSL_PREFIXES: [&str; 3] = ["HueAdjustment", "SaturationAdjustment", "LuminanceAdjustment"];

const PARAMETRIC: [(&str, &str); 7] = [
    ("ParametricShadows", "0"),
    ("ParametricDarks", "0"),
    ("ParametricLights", "0"),
    ("ParametricHighlights", "0"),
    ("ParametricShadowSplit", "25"),
    ("ParametricMidtoneSplit", "50"),
    ("ParametricHighlightSplit", "75"),
];

fn push_tag(out: &mut String, tag: &str, value: &str) {
    out.push_str(INDENT);
    out.push_str("<crs:");
    out.push_str(tag);
    out.push('>');
    out.push_str(value);
    out.push_str("</crs:");
    out.push_str(tag);
    out.push_str(">\n");
}

fn push_field(out: &mut String, field: &Field, profile: &AdjustmentProfile) {
    let value = (field.get)(profile).unwrap_or(field.default);
    push_tag(out, field.tag, &format_number(value, field.precision));
}

/// Format a number with at most `precision` decimals and no trailing zeros.
fn format_number(value: f64, precision: usize) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let factor = 10f64.powi(precision as i32);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        return "0".to_string();
    }
    if precision == 0 {
        return format!("{}", rounded as i64);
    }
    let text = format!("{rounded:.precision$}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn hsl_value(profile: &AdjustmentProfile, prefix: &str, channel: Channel) -> Option<f64> {
    let c = profile.hsl.channel(channel);
    match prefix {
        "HueAdjustment" => c.hue,
        "SaturationAdjustment" => c.saturation,
        _ => c.luminance,
    }
}

/// Serialize a profile into a complete sidecar document.
pub fn encode(profile: &AdjustmentProfile) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str(HEADER);

    push_tag(&mut out, "Version", "14.0");
    push_tag(&mut out, "ProcessVersion", "11.0");
    let white_balance = if profile.color.temperature.is_some() {
        "Custom"
    } else {
        "As Shot"
    };
    push_tag(&mut out, "WhiteBalance", white_balance);

    for field in &basic_fields() {
        push_field(&mut out, field, profile);
    }

    let kelvin = temperature::to_kelvin(profile.color.temperature.unwrap_or(0.0));
    push_tag(&mut out, "Temperature", &kelvin.to_string());
    push_field(&mut out, &tint_field(), profile);

    for field in &noise_fields() {
        push_field(&mut out, field, profile);
    }

    for prefix in HSL_PREFIXES {
        for channel in Channel::ALL {
            let value = hsl_value(profile, prefix, channel).unwrap_or(0.0);
            let tag = format!("{prefix}{}", channel.tag_suffix());
            push_tag(&mut out, &tag, &format_number(value, 0));
        }
    }

    for (tag, value) in PARAMETRIC {
        push_tag(&mut out, tag, value);
    }

    for field in &sharpen_fields() {
        push_field(&mut out, field, profile);
    }
    for field in &vignette_fields() {
        push_field(&mut out, field, profile);
    }
    push_tag(&mut out, "PostCropVignetteStyle", "1");
    push_tag(&mut out, "PostCropVignetteHighlightContrast", "0");

    out.push_str(FOOTER);
    out
}

/// Collect `<crs:Tag>value</crs:Tag>` pairs.
fn scan_tags(document: &str) -> HashMap<&str, &str> {
    let mut tags = HashMap::new();
    let mut rest = document;
    while let Some(start) = rest.find("<crs:") {
        rest = &rest[start + 5..];
        let Some(name_end) = rest.find('>') else {
            break;
        };
        let name = &rest[..name_end];
        if name.contains(['/', ' ', '=']) {
            continue;
        }
        let body = &rest[name_end + 1..];
        let close = format!("</crs:{name}>");
        if let Some(value_end) = body.find(&close) {
            tags.insert(name, body[..value_end].trim());
            rest = &body[value_end + close.len()..];
        }
    }
    tags
}

fn parse_number(tag: &str, value: &str) -> Result<f64, SidecarError> {
    value
        .trim_start_matches('+')
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| SidecarError::InvalidNumber {
            tag: tag.to_string(),
            value: value.to_string(),
        })
}

/// Read a sidecar document back into a profile.
///
/// Tags that are absent stay unset. The Kelvin temperature is converted
/// back to the normalized scale as an absolute reading.
pub fn decode(document: &str) -> Result<AdjustmentProfile, SidecarError> {
    let tags = scan_tags(document);
    if !tags.contains_key("Version") {
        return Err(SidecarError::MissingField("Version".to_string()));
    }

    let mut profile = AdjustmentProfile::default();
    let scalar_fields = basic_fields()
        .into_iter()
        .chain(std::iter::once(tint_field()))
        .chain(noise_fields())
        .chain(sharpen_fields())
        .chain(vignette_fields());
    for field in scalar_fields {
        if let Some(raw) = tags.get(field.tag) {
            (field.set)(&mut profile, parse_number(field.tag, raw)?);
        }
    }

    if let Some(raw) = tags.get("Temperature") {
        let kelvin = parse_number("Temperature", raw)?;
        let clamped = kelvin.clamp(temperature::MIN_KELVIN, temperature::MAX_KELVIN);
        profile.color.temperature = Some(f64::from(temperature::kelvin_to_normalized(clamped)));
        profile.color.absolute_kelvin = Some(clamped.round() as u32);
    }

    for prefix in HSL_PREFIXES {
        for channel in Channel::ALL {
            let tag = format!("{prefix}{}", channel.tag_suffix());
            if let Some(raw) = tags.get(tag.as_str()) {
                let value = Some(parse_number(&tag, raw)?);
                let c = profile.hsl.channel_mut(channel);
                match prefix {
                    "HueAdjustment" => c.hue = value,
                    "SaturationAdjustment" => c.saturation = value,
                    _ => c.luminance = value,
                }
            }
        }
    }

    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_value<'a>(document: &'a str, tag: &str) -> &'a str {
        scan_tags(document)
            .get(tag)
            .copied()
            .unwrap_or_else(|| panic!("missing <crs:{tag}>"))
    }

    #[test]
    fn test_exposure_only_profile_is_complete() {
        let mut profile = AdjustmentProfile::default();
        profile.basic.exposure = Some(0.5);
        let doc = encode(&profile);

        assert_eq!(tag_value(&doc, "Exposure"), "0.5");
        assert_eq!(tag_value(&doc, "Contrast"), "0");
        assert_eq!(tag_value(&doc, "Temperature"), "5500");
        assert_eq!(tag_value(&doc, "Tint"), "0");
        assert_eq!(tag_value(&doc, "SharpenRadius"), "1");
        assert_eq!(tag_value(&doc, "PostCropVignetteFeather"), "50");
        assert_eq!(tag_value(&doc, "PostCropVignetteMidpoint"), "50");
        assert_eq!(tag_value(&doc, "WhiteBalance"), "As Shot");
        for channel in Channel::ALL {
            for prefix in HSL_PREFIXES {
                assert_eq!(tag_value(&doc, &format!("{prefix}{}", channel.tag_suffix())), "0");
            }
        }
        assert!(!doc.contains("null"));
        // 3 fixed + 10 basic + 2 color + 3 noise + 24 hsl + 7 parametric
        // + 3 sharpen + 4 vignette + 2 fixed
        assert_eq!(scan_tags(&doc).len(), 58);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let mut profile = AdjustmentProfile::default();
        profile.basic.contrast = Some(12.0);
        profile.color.temperature = Some(-7.0);
        profile.hsl.orange.saturation = Some(-18.0);
        assert_eq!(encode(&profile), encode(&profile.clone()));
    }

    #[test]
    fn test_normalized_temperature_emitted_as_kelvin() {
        let mut profile = AdjustmentProfile::default();
        profile.basic.exposure = Some(0.3);
        profile.color.temperature = Some(-20.0);
        let doc = encode(&profile);

        assert!(doc.contains("<crs:Temperature>14400</crs:Temperature>"));
        assert!(doc.contains("<crs:Exposure>0.3</crs:Exposure>"));
        assert!(doc.contains("<crs:WhiteBalance>Custom</crs:WhiteBalance>"));
    }

    #[test]
    fn test_reference_point_temperature() {
        let mut profile = AdjustmentProfile::default();
        profile.color.temperature = Some(14.0);
        assert_eq!(tag_value(&encode(&profile), "Temperature"), "5000");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.3, 2), "0.3");
        assert_eq!(format_number(-1.256, 2), "-1.26");
        assert_eq!(format_number(1.0, 1), "1");
        assert_eq!(format_number(12.6, 0), "13");
        assert_eq!(format_number(-0.4, 0), "0");
        assert_eq!(format_number(f64::NAN, 0), "0");
    }

    #[test]
    fn test_decode_round_trip_preserves_kelvin() {
        let mut profile = AdjustmentProfile::default();
        profile.basic.exposure = Some(-0.75);
        profile.basic.highlights = Some(-30.0);
        profile.color.temperature = Some(-20.0);
        profile.color.tint = Some(8.0);
        profile.hsl.blue.luminance = Some(-12.0);
        profile.detail.radius = Some(1.4);
        profile.effects.amount = Some(15.0);

        let first = encode(&profile);
        let decoded = decode(&first).unwrap();
        assert_eq!(decoded.color.temperature, Some(-20.0));
        assert_eq!(decoded.color.absolute_kelvin, Some(14400));
        assert_eq!(decoded.basic.exposure, Some(-0.75));
        assert_eq!(decoded.hsl.blue.luminance, Some(-12.0));
        assert_eq!(decoded.detail.radius, Some(1.4));

        let second = encode(&decoded);
        assert_eq!(first, second);
        assert_eq!(decode(&second).unwrap().color.absolute_kelvin, Some(14400));
    }

    #[test]
    fn test_decode_accepts_plus_sign_and_skips_unknown_tags() {
        let doc = "<crs:Version>14.0</crs:Version>\n\
                   <crs:Exposure2012>+1.00</crs:Exposure2012>\n\
                   <crs:Exposure>+0.40</crs:Exposure>\n\
                   <crs:ToneCurveName2012 rdf:resource=\"x\"/>\n";
        let profile = decode(doc).unwrap();
        assert_eq!(profile.basic.exposure, Some(0.4));
        assert_eq!(profile.color.temperature, None);
    }

    #[test]
    fn test_decode_rejects_bad_documents() {
        assert!(matches!(
            decode("<x:xmpmeta/>"),
            Err(SidecarError::MissingField(_))
        ));
        let err = decode("<crs:Version>14.0</crs:Version><crs:Contrast>high</crs:Contrast>")
            .unwrap_err();
        assert!(matches!(err, SidecarError::InvalidNumber { ref tag, .. } if tag == "Contrast"));
    }
}
