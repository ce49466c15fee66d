//! Conversion between absolute color temperature and the editor's
//! normalized slider scale.
//!
//! The scale is centered on [`NEUTRAL_KELVIN`] and is piecewise linear:
//!
//! ```text
//!  2000 K ──────── 5500 K ─────────────────────────── 50000 K
//!   +100             0                                  -100
//! ```
//!
//! Cooler light maps to **positive** values and warmer light to **negative**
//! values, matching the target editor. Each half is an independent linear
//! segment, so one normalized step is ~35 K on the cool side and ~445 K on
//! the warm side. That step width is the round-trip tolerance.
//!
//! # Relative offsets
//!
//! Some providers report a temperature *adjustment* instead of a reading.
//! [`to_normalized`] therefore treats any input inside
//! `[-RELATIVE_LIMIT, RELATIVE_LIMIT]` as an offset from 5500 K. The rule is
//! purely range based: an input of exactly 1800 is read as 5500 + 1800 K,
//! never as an absolute 1800 K (which would be out of range anyway), and an
//! input of exactly 2000 is read as 7500 K. Callers that *know* they hold an
//! absolute reading, such as the sidecar decoder, use
//! [`kelvin_to_normalized`] which skips the offset rule.

/// Neutral temperature; the zero point of the normalized scale.
pub const NEUTRAL_KELVIN: f64 = 5500.0;

/// Lowest representable temperature.
pub const MIN_KELVIN: f64 = 2000.0;

/// Highest representable temperature.
pub const MAX_KELVIN: f64 = 50000.0;

/// Inputs with magnitude up to this value are read as offsets from neutral.
pub const RELATIVE_LIMIT: f64 = 2000.0;

/// Bound of the normalized scale (both signs).
pub const NORMALIZED_LIMIT: i32 = 100;

/// Hard-coded reference points `(kelvin, normalized)`.
///
/// These win over the general formula in both directions.
const REFERENCE_POINTS: &[(u32, i32)] = &[(5000, 14)];

/// Map a provider-reported temperature to the normalized scale.
///
/// Values inside `[-2000, 2000]` are relative offsets from 5500 K; anything
/// else is an absolute Kelvin reading. Both are clamped to
/// `[2000, 50000]` K before the piecewise mapping is applied.
pub fn to_normalized(raw: f64) -> i32 {
    kelvin_to_normalized(effective_kelvin(raw))
}

/// Resolve the absolute Kelvin value a provider-reported temperature stands for.
pub fn effective_kelvin(raw: f64) -> f64 {
    let kelvin = if (-RELATIVE_LIMIT..=RELATIVE_LIMIT).contains(&raw) {
        tracing::trace!("Reading temperature {raw} as an offset from neutral");
        NEUTRAL_KELVIN + raw
    } else {
        raw
    };
    kelvin.clamp(MIN_KELVIN, MAX_KELVIN)
}

/// Map an absolute Kelvin reading to the normalized scale.
///
/// The fractional position is truncated toward zero, so a reading only
/// moves to the next step once it has fully crossed it.
pub fn kelvin_to_normalized(kelvin: f64) -> i32 {
    let kelvin = kelvin.clamp(MIN_KELVIN, MAX_KELVIN);

    if let Some(&(_, value)) = REFERENCE_POINTS
        .iter()
        .find(|(k, _)| f64::from(*k) == kelvin)
    {
        return value;
    }

    let limit = f64::from(NORMALIZED_LIMIT);
    let value = if kelvin < NEUTRAL_KELVIN {
        (NEUTRAL_KELVIN - kelvin) * limit / (NEUTRAL_KELVIN - MIN_KELVIN)
    } else {
        -((kelvin - NEUTRAL_KELVIN) * limit / (MAX_KELVIN - NEUTRAL_KELVIN))
    };
    value.trunc() as i32
}

/// Map a normalized value back to absolute Kelvin.
///
/// The sign of the input selects the branch. Out-of-range inputs are clamped
/// to `[-100, 100]` and the result is rounded to the nearest Kelvin.
pub fn to_kelvin(value: f64) -> u32 {
    let limit = f64::from(NORMALIZED_LIMIT);
    let value = value.clamp(-limit, limit);

    if let Some(&(kelvin, _)) = REFERENCE_POINTS
        .iter()
        .find(|(_, v)| f64::from(*v) == value)
    {
        return kelvin;
    }

    let kelvin = if value > 0.0 {
        NEUTRAL_KELVIN - value * (NEUTRAL_KELVIN - MIN_KELVIN) / limit
    } else if value < 0.0 {
        NEUTRAL_KELVIN + (-value) * (MAX_KELVIN - NEUTRAL_KELVIN) / limit
    } else {
        NEUTRAL_KELVIN
    };
    kelvin.round() as u32
}

/// Width in Kelvin of one normalized step on the side of neutral `kelvin` is on.
pub fn step_width(kelvin: f64) -> f64 {
    let limit = f64::from(NORMALIZED_LIMIT);
    if kelvin < NEUTRAL_KELVIN {
        (NEUTRAL_KELVIN - MIN_KELVIN) / limit
    } else {
        (MAX_KELVIN - NEUTRAL_KELVIN) / limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_point() {
        assert_eq!(to_normalized(5500.0), 0);
        assert_eq!(to_kelvin(0.0), 5500);
    }

    #[test]
    fn test_reference_point_5000k() {
        assert_eq!(to_normalized(5000.0), 14);
        assert_eq!(to_kelvin(14.0), 5000);
    }

    #[test]
    fn test_cool_is_positive_warm_is_negative() {
        assert!(to_normalized(3200.0) > 0);
        assert!(to_normalized(7000.0) < 0);
        assert!(to_kelvin(50.0) < 5500);
        assert!(to_kelvin(-50.0) > 5500);
    }

    #[test]
    fn test_segment_endpoints() {
        assert_eq!(kelvin_to_normalized(2000.0), 100);
        assert_eq!(to_normalized(50000.0), -100);
        assert_eq!(to_kelvin(100.0), 2000);
        assert_eq!(to_kelvin(-100.0), 50000);
    }

    #[test]
    fn test_warm_branch_twenty_percent() {
        // 5500 + 0.2 * (50000 - 5500)
        assert_eq!(to_kelvin(-20.0), 14400);
        assert_eq!(to_normalized(14400.0), -20);
    }

    #[test]
    fn test_relative_offset_interpretation() {
        assert_eq!(to_normalized(300.0), to_normalized(5800.0));
        assert_eq!(to_normalized(-500.0), to_normalized(5000.0));
        assert_eq!(effective_kelvin(-2000.0), 3500.0);
        assert_eq!(effective_kelvin(1800.0), 7300.0);
    }

    #[test]
    fn test_relative_boundary_is_inclusive() {
        // 2000 overlaps the absolute range; the offset reading wins
        assert_eq!(effective_kelvin(2000.0), 7500.0);
        assert_eq!(effective_kelvin(2001.0), 2001.0);
    }

    #[test]
    fn test_out_of_range_input_is_clamped() {
        assert_eq!(to_normalized(90000.0), -100);
        assert_eq!(to_normalized(-9000.0), 100);
        assert_eq!(to_kelvin(250.0), 2000);
        assert_eq!(to_kelvin(-250.0), 50000);
    }

    #[test]
    fn test_kelvin_round_trip_within_one_step() {
        // Absolute-only path covers the full range including 2000 K
        for kelvin in (2000..=50000).step_by(7) {
            let k = f64::from(kelvin);
            let back = f64::from(to_kelvin(f64::from(kelvin_to_normalized(k))));
            assert!(
                (back - k).abs() <= step_width(k) + 1.0,
                "{kelvin}K came back as {back}K"
            );
        }
        // Provider-facing path agrees everywhere outside the offset window
        for kelvin in (2001..=50000).step_by(13) {
            let k = f64::from(kelvin);
            assert_eq!(to_normalized(k), kelvin_to_normalized(k));
        }
    }

    #[test]
    fn test_normalized_round_trip_within_one_unit() {
        for value in -100..=100 {
            let back = kelvin_to_normalized(f64::from(to_kelvin(f64::from(value))));
            assert!((back - value).abs() <= 1, "{value} came back as {back}");
        }
    }
}
