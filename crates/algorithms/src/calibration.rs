//! Landsat Collection 2 Level-2 calibration.
//!
//! Pure per-value transforms from digital numbers (DN) to physical units.
//! Callers exclude the DN no-data value before calling these.

/// Digital number marking a missing measurement in Level-2 products.
pub const DN_NODATA: u16 = 0;

/// Surface temperature band (ST_B10) multiplicative scale, kelvin per DN.
pub const THERMAL_SCALE: f64 = 0.00341802;
/// Surface temperature band additive offset, kelvin.
pub const THERMAL_OFFSET: f64 = 149.0;
pub const KELVIN_TO_CELSIUS: f64 = 273.15;

/// Surface reflectance bands (SR_B*) multiplicative scale.
pub const REFLECTANCE_SCALE: f64 = 0.0000275;
/// Surface reflectance bands additive offset.
pub const REFLECTANCE_OFFSET: f64 = -0.2;

/// Surface temperature in degrees Celsius.
///
/// `T = DN * 0.00341802 + 149.0 - 273.15`
#[inline]
pub fn to_temperature_celsius(dn: f64) -> f64 {
    dn * THERMAL_SCALE + THERMAL_OFFSET - KELVIN_TO_CELSIUS
}

/// Surface reflectance (unitless, nominally 0..1).
///
/// `R = DN * 0.0000275 - 0.2`
#[inline]
pub fn to_reflectance(dn: f64) -> f64 {
    dn * REFLECTANCE_SCALE + REFLECTANCE_OFFSET
}

/// `(a - b) / (a + b)`, or NaN when `a + b == 0`.
#[inline]
pub fn normalized_difference(a: f64, b: f64) -> f64 {
    let sum = a + b;
    if sum == 0.0 {
        return f64::NAN;
    }
    (a - b) / sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_temperature_known_values() {
        // 0 K offset reached at DN = (273.15 - 149) / scale
        assert_relative_eq!(to_temperature_celsius(0.0), -124.15, epsilon = 1e-9);
        assert_relative_eq!(
            to_temperature_celsius(44_000.0),
            44_000.0 * 0.00341802 + 149.0 - 273.15,
            epsilon = 1e-9
        );
        // typical summer urban surface
        let t = to_temperature_celsius(48_000.0);
        assert!(t > 38.0 && t < 40.0, "got {t}");
    }

    #[test]
    fn test_temperature_monotonic_over_dn_range() {
        let mut prev = f64::NEG_INFINITY;
        for dn in (1..=u16::MAX).step_by(97) {
            let t = to_temperature_celsius(dn as f64);
            assert!(t > prev, "not increasing at DN {dn}");
            prev = t;
        }
    }

    #[test]
    fn test_reflectance_scaling() {
        assert_relative_eq!(to_reflectance(7_273.0), 7_273.0 * 0.0000275 - 0.2, epsilon = 1e-12);
        assert_relative_eq!(to_reflectance(43_636.0), 1.0, epsilon = 1e-4);
        assert!(to_reflectance(1.0) < 0.0);
    }

    #[test]
    fn test_normalized_difference_zero_sum_is_nan() {
        assert!(normalized_difference(0.0, 0.0).is_nan());
        assert!(normalized_difference(0.3, -0.3).is_nan());
    }

    #[test]
    fn test_normalized_difference_bounded_for_non_negative_inputs() {
        let samples = [0.0, 1e-6, 0.01, 0.2, 0.5, 0.9, 1.0, 3.0];
        for &a in &samples {
            for &b in &samples {
                if a + b > 0.0 {
                    let v = normalized_difference(a, b);
                    assert!((-1.0..=1.0).contains(&v), "nd({a}, {b}) = {v}");
                }
            }
        }
        assert_relative_eq!(normalized_difference(0.8, 0.2), 0.6, epsilon = 1e-12);
        assert_relative_eq!(normalized_difference(0.0, 0.4), -1.0);
    }
}
