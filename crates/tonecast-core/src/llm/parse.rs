//! Turning a provider's free-text reply into an [`AdjustmentProfile`].
//!
//! Models rarely return clean JSON. The reply is searched for a fenced
//! ```json block first, then for the span between the first `{` and the last
//! `}`. Group and field names are matched leniently (case, `_` and spacing
//! are ignored, plus a handful of known aliases). When no object parses at
//! all, `key: number` lines are recovered from the prose.

use serde_json::{Map, Value};

use crate::error::{AnalysisError, AnalysisResult};
use crate::profile::{AdjustmentProfile, Channel};
use crate::temperature;

/// A reply must populate at least this many top-level groups.
const MIN_GROUPS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Basic,
    Color,
    Hsl,
    Detail,
    Effects,
}

impl Group {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "basic" | "basicadjustments" => Some(Self::Basic),
            "color" | "coloradjustments" | "whitebalance" => Some(Self::Color),
            "hsl" | "hsladjustments" => Some(Self::Hsl),
            "detail" | "detailadjustments" => Some(Self::Detail),
            "effects" | "effect" | "effectadjustments" | "effectsadjustments" => {
                Some(Self::Effects)
            }
            _ => None,
        }
    }
}

/// Parse, normalize, map and validate a provider reply.
pub fn parse_profile(provider: &str, text: &str) -> AnalysisResult<AdjustmentProfile> {
    let mut json_error = None;
    let mut profile = match extract_json(text) {
        Some(candidate) => match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(root)) => profile_from_object(&root),
            Ok(_) => {
                json_error = Some("extracted value is not an object".to_string());
                recover_from_text(text)
            }
            Err(e) => {
                json_error = Some(e.to_string());
                recover_from_text(text)
            }
        },
        None => {
            json_error = Some("no JSON object found in response".to_string());
            recover_from_text(text)
        }
    };

    if let Some(message) = json_error {
        if profile.populated_groups() == 0 {
            return Err(AnalysisError::ResponseParseError {
                provider: provider.to_string(),
                message,
            });
        }
        tracing::debug!("{provider}: recovered values from prose ({message})");
    }

    if let Some(raw) = profile.color.temperature {
        profile.color.temperature = Some(f64::from(temperature::to_normalized(raw)));
        profile.color.absolute_kelvin = Some(temperature::effective_kelvin(raw).round() as u32);
    }
    profile.clamp_to_ranges();

    let groups = profile.populated_groups();
    if groups < MIN_GROUPS {
        return Err(AnalysisError::ValidationError {
            provider: provider.to_string(),
            message: format!("expected at least {MIN_GROUPS} adjustment groups, found {groups}"),
        });
    }
    Ok(profile)
}

/// Locate the structured object inside a reply.
pub fn extract_json(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let body = &text[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            if let Some(span) = brace_span(&body[..end]) {
                return Some(span);
            }
        }
    }
    brace_span(text)
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Lowercase and keep only alphanumerics: `noise_reduction` and
/// `noiseReduction` both become `noisereduction`.
fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number_token(s),
        _ => None,
    }
}

/// Parse a token such as `+0.7`, `6500K`, `-12,` or `30%`.
fn parse_number_token(token: &str) -> Option<f64> {
    let trimmed = token
        .trim()
        .trim_matches(|c: char| !(c.is_ascii_digit() || c == '-' || c == '.' || c == '+'))
        .trim_start_matches('+');
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Slot for a scalar field within a group, by normalized key.
///
/// Temperature and tint reported under `basic` land in `color`.
fn scalar_slot<'a>(
    profile: &'a mut AdjustmentProfile,
    group: Group,
    key: &str,
) -> Option<&'a mut Option<f64>> {
    match (group, key) {
        (Group::Basic | Group::Color, "temperature" | "temp") => Some(&mut profile.color.temperature),
        (Group::Basic | Group::Color, "tint") => Some(&mut profile.color.tint),
        (Group::Basic, "exposure") => Some(&mut profile.basic.exposure),
        (Group::Basic, "contrast") => Some(&mut profile.basic.contrast),
        (Group::Basic, "highlights") => Some(&mut profile.basic.highlights),
        (Group::Basic, "shadows") => Some(&mut profile.basic.shadows),
        (Group::Basic, "whites") => Some(&mut profile.basic.whites),
        (Group::Basic, "blacks") => Some(&mut profile.basic.blacks),
        (Group::Basic, "clarity") => Some(&mut profile.basic.clarity),
        (Group::Basic, "vibrance") => Some(&mut profile.basic.vibrance),
        (Group::Basic, "saturation") => Some(&mut profile.basic.saturation),
        (Group::Basic, "dehaze") => Some(&mut profile.basic.dehaze),
        (Group::Detail, "sharpness" | "sharpening" | "amount") => Some(&mut profile.detail.sharpness),
        (Group::Detail, "radius") => Some(&mut profile.detail.radius),
        (Group::Detail, "detail") => Some(&mut profile.detail.detail),
        (Group::Detail, "masking") => Some(&mut profile.detail.masking),
        (Group::Detail, "noisereduction" | "luminancenoisereduction" | "luminancesmoothing") => {
            Some(&mut profile.detail.noise_reduction)
        }
        (Group::Detail, "colornoisereduction") => Some(&mut profile.detail.color_noise_reduction),
        (Group::Effects, "amount" | "vignette" | "vignetteamount") => {
            Some(&mut profile.effects.amount)
        }
        (Group::Effects, "midpoint") => Some(&mut profile.effects.midpoint),
        (Group::Effects, "roundness") => Some(&mut profile.effects.roundness),
        (Group::Effects, "feather") => Some(&mut profile.effects.feather),
        _ => None,
    }
}

#[derive(Clone, Copy)]
enum HslField {
    Hue,
    Saturation,
    Luminance,
}

impl HslField {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "hue" => Some(Self::Hue),
            "saturation" | "sat" => Some(Self::Saturation),
            "luminance" | "lum" => Some(Self::Luminance),
            _ => None,
        }
    }
}

fn hsl_slot(profile: &mut AdjustmentProfile, channel: Channel, field: HslField) -> &mut Option<f64> {
    let c = profile.hsl.channel_mut(channel);
    match field {
        HslField::Hue => &mut c.hue,
        HslField::Saturation => &mut c.saturation,
        HslField::Luminance => &mut c.luminance,
    }
}

/// Split a flattened key like `huered` or `redhue` into channel and field.
fn flattened_hsl_key(key: &str) -> Option<(Channel, HslField)> {
    Channel::ALL.into_iter().find_map(|channel| {
        let name = channel.key();
        let rest = key
            .strip_suffix(name)
            .or_else(|| key.strip_prefix(name))?;
        HslField::from_key(rest).map(|field| (channel, field))
    })
}

/// Write `value` unless the slot is already populated.
fn fill(slot: &mut Option<f64>, value: f64) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

fn profile_from_object(root: &Map<String, Value>) -> AdjustmentProfile {
    let mut groups: Vec<(Group, &Map<String, Value>)> = root
        .iter()
        .filter_map(|(key, value)| {
            let group = Group::from_key(&normalize_key(key))?;
            value.as_object().map(|obj| (group, obj))
        })
        .collect();
    // Canonical placements win over aliases moved in from other groups
    groups.sort_by_key(|(group, _)| match group {
        Group::Hsl => 0,
        Group::Color => 1,
        Group::Basic => 2,
        Group::Detail => 3,
        Group::Effects => 4,
    });

    let mut profile = AdjustmentProfile::default();
    for (group, obj) in groups {
        if group == Group::Hsl {
            read_hsl_group(&mut profile, obj);
            continue;
        }
        for (key, value) in obj {
            let Some(value) = number(value) else {
                continue;
            };
            let key = normalize_key(key);
            if group == Group::Color {
                if let Some((channel, field)) = flattened_hsl_key(&key) {
                    fill(hsl_slot(&mut profile, channel, field), value);
                    continue;
                }
            }
            if let Some(slot) = scalar_slot(&mut profile, group, &key) {
                fill(slot, value);
            }
        }
    }
    profile
}

fn read_hsl_group(profile: &mut AdjustmentProfile, obj: &Map<String, Value>) {
    for (key, value) in obj {
        let key = normalize_key(key);
        if let Some(channel) = Channel::ALL.into_iter().find(|c| c.key() == key) {
            let Some(inner) = value.as_object() else {
                continue;
            };
            for (field_key, field_value) in inner {
                if let (Some(field), Some(v)) =
                    (HslField::from_key(&normalize_key(field_key)), number(field_value))
                {
                    fill(hsl_slot(profile, channel, field), v);
                }
            }
        } else if let (Some((channel, field)), Some(v)) = (flattened_hsl_key(&key), number(value)) {
            fill(hsl_slot(profile, channel, field), v);
        }
    }
}

/// Section implied by a header line such as `Detail:` or `## HSL`.
fn section_header(lower: &str) -> Option<Group> {
    if lower.contains("hsl") || lower.contains("color mix") {
        Some(Group::Hsl)
    } else if lower.contains("detail") || lower.contains("sharpen") || lower.contains("noise") {
        Some(Group::Detail)
    } else if lower.contains("effect") || lower.contains("vignette") {
        Some(Group::Effects)
    } else if lower.contains("white balance") || lower.contains("color") {
        Some(Group::Color)
    } else if lower.contains("basic") || lower.contains("tone") || lower.contains("light") {
        Some(Group::Basic)
    } else {
        None
    }
}

/// Channel and HSL field named in a free-text line, e.g. `Orange Saturation`.
fn line_hsl_target(lower: &str) -> Option<(Channel, HslField)> {
    let channel = Channel::ALL.into_iter().find(|c| lower.contains(c.key()))?;
    let field = if lower.contains("hue") {
        HslField::Hue
    } else if lower.contains("saturation") {
        HslField::Saturation
    } else if lower.contains("luminance") {
        HslField::Luminance
    } else {
        return None;
    };
    Some((channel, field))
}

/// Best-effort recovery of `key: number` lines.
fn recover_from_text(text: &str) -> AdjustmentProfile {
    let mut profile = AdjustmentProfile::default();
    let mut section = Group::Basic;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let lower = line.to_lowercase();

        let value = line
            .split_once(':')
            .and_then(|(_, rest)| rest.split_whitespace().find_map(parse_number_token));
        let Some(value) = value else {
            if let Some(group) = section_header(&lower) {
                section = group;
            }
            continue;
        };

        if let Some((channel, field)) = line_hsl_target(&lower) {
            fill(hsl_slot(&mut profile, channel, field), value);
            continue;
        }

        // Drop list numbering such as "1. Exposure"
        let key = line
            .split_once(':')
            .map(|(k, _)| normalize_key(k).trim_start_matches(|c: char| c.is_ascii_digit()).to_string())
            .unwrap_or_default();
        let search = [section, Group::Basic, Group::Color, Group::Effects, Group::Detail];
        if let Some(group) = search
            .into_iter()
            .find(|g| scalar_slot(&mut profile, *g, &key).is_some())
        {
            if let Some(slot) = scalar_slot(&mut profile, group, &key) {
                fill(slot, value);
            }
        }
    }
    profile
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_prefers_fenced_block() {
        let text = "Note {not this}\n```json\n{\"basic\": {}}\n```\ntrailing }";
        assert_eq!(extract_json(text), Some("{\"basic\": {}}"));
    }

    #[test]
    fn test_extract_brace_span_tolerates_prose() {
        let text = "Here is the preset: {\"a\": {\"b\": 1}} Hope it helps!";
        assert_eq!(extract_json(text), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(extract_json("no object here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_parse_canonical_reply() {
        let text = r#"```json
{
  "basic": {"exposure": 0.4, "contrast": 12, "shadows": 25},
  "color": {"temperature": 6500, "tint": -4},
  "hsl": {"orange": {"hue": -5, "saturation": 10}},
  "detail": {"sharpness": 35, "noiseReduction": 20},
  "effects": {"amount": -10}
}
```"#;
        let profile = parse_profile("gemini", text).unwrap();
        assert_eq!(profile.basic.exposure, Some(0.4));
        assert_eq!(profile.color.temperature, Some(-2.0));
        assert_eq!(profile.color.absolute_kelvin, Some(6500));
        assert_eq!(profile.color.tint, Some(-4.0));
        assert_eq!(profile.hsl.orange.hue, Some(-5.0));
        assert_eq!(profile.detail.noise_reduction, Some(20.0));
        // vignette amount is clamped into 0..100
        assert_eq!(profile.effects.amount, Some(0.0));
    }

    #[test]
    fn test_parse_aliases_and_flattened_hsl() {
        let text = r#"{
  "basic_adjustments": {"exposure": 0.5, "temperature": 5000},
  "color_adjustments": {"tint": 5, "hue_red": 10, "saturation_blue": -20},
  "detail": {"noise_reduction": 15, "color_noise_reduction": 25}
}"#;
        let profile = parse_profile("anthropic", text).unwrap();
        assert_eq!(profile.basic.exposure, Some(0.5));
        assert_eq!(profile.color.temperature, Some(14.0));
        assert_eq!(profile.color.absolute_kelvin, Some(5000));
        assert_eq!(profile.color.tint, Some(5.0));
        assert_eq!(profile.hsl.red.hue, Some(10.0));
        assert_eq!(profile.hsl.blue.saturation, Some(-20.0));
        assert_eq!(profile.detail.noise_reduction, Some(15.0));
        assert_eq!(profile.detail.color_noise_reduction, Some(25.0));
    }

    #[test]
    fn test_color_group_temperature_wins_over_basic() {
        let text = r#"{"basic": {"temperature": 3000, "exposure": 0.1},
                       "color": {"temperature": 5000}}"#;
        let profile = parse_profile("openai", text).unwrap();
        assert_eq!(profile.color.temperature, Some(14.0));
    }

    #[test]
    fn test_relative_temperature_and_clamping() {
        let text = r#"{"basic": {"exposure": 9, "contrast": -250}, "color": {"temperature": 300}}"#;
        let profile = parse_profile("gemini", text).unwrap();
        assert_eq!(profile.basic.exposure, Some(5.0));
        assert_eq!(profile.basic.contrast, Some(-100.0));
        assert_eq!(profile.color.temperature, Some(0.0));
        assert_eq!(profile.color.absolute_kelvin, Some(5800));
    }

    #[test]
    fn test_string_numbers_are_accepted() {
        let text = r#"{"basic": {"exposure": "+0.3"}, "color": {"temperature": "6500K"}}"#;
        let profile = parse_profile("gemini", text).unwrap();
        assert_eq!(profile.basic.exposure, Some(0.3));
        assert_eq!(profile.color.absolute_kelvin, Some(6500));
    }

    #[test]
    fn test_single_group_fails_validation() {
        let err = parse_profile("gemini", r#"{"basic": {"exposure": 0.5}}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::ValidationError { ref provider, .. } if provider == "gemini"));
    }

    #[test]
    fn test_unparseable_reply() {
        let err = parse_profile("openai", "I'm sorry, I can't help with that.").unwrap_err();
        assert!(matches!(err, AnalysisError::ResponseParseError { .. }));

        let err = parse_profile("openai", "{ this is not json }").unwrap_err();
        assert!(matches!(err, AnalysisError::ResponseParseError { .. }));
    }

    #[test]
    fn test_text_recovery() {
        let text = "Basic adjustments:\n\
                    Exposure: +0.7\n\
                    Contrast: 15\n\
                    Shadows: 30\n\
                    HSL:\n\
                    Orange Saturation: -12\n\
                    Blue Luminance: 8\n\
                    Detail:\n\
                    Sharpness: 40\n\
                    - Noise Reduction: 20\n";
        let profile = parse_profile("anthropic", text).unwrap();
        assert_eq!(profile.basic.exposure, Some(0.7));
        assert_eq!(profile.basic.contrast, Some(15.0));
        assert_eq!(profile.basic.shadows, Some(30.0));
        assert_eq!(profile.hsl.orange.saturation, Some(-12.0));
        assert_eq!(profile.hsl.blue.luminance, Some(8.0));
        assert_eq!(profile.detail.sharpness, Some(40.0));
        assert_eq!(profile.detail.noise_reduction, Some(20.0));
        assert_eq!(profile.populated_groups(), 3);
    }

    #[test]
    fn test_text_recovery_uses_section_for_ambiguous_keys() {
        let text = "Exposure: 0.2\nVignette:\nAmount: 15\nSharpening:\nAmount: 50\n";
        let profile = parse_profile("gemini", text).unwrap();
        assert_eq!(profile.effects.amount, Some(15.0));
        assert_eq!(profile.detail.sharpness, Some(50.0));
    }

    #[test]
    fn test_parse_number_token() {
        assert_eq!(parse_number_token("+0.7"), Some(0.7));
        assert_eq!(parse_number_token("-12,"), Some(-12.0));
        assert_eq!(parse_number_token("30%"), Some(30.0));
        assert_eq!(parse_number_token("(approx"), None);
    }
}
