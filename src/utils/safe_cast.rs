//! Safe casting utilities for pulse-width arithmetic

/// Round to the nearest integer and clamp into `[min, max]`
///
/// Non-finite values map to `min`.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Clamping ensures safe truncation
pub fn f64_round_to_i32_clamp(value: f64, min: i32, max: i32) -> i32 {
    // Ensure min <= max
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    if !value.is_finite() {
        return min;
    }

    let clamped = value.round().clamp(f64::from(min), f64::from(max));
    (clamped as i32).clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_round_clamp() {
        assert_eq!(f64_round_to_i32_clamp(1759.999_999, 600, 2300), 1760);
        assert_eq!(f64_round_to_i32_clamp(1764.5, 600, 2300), 1765);
        assert_eq!(f64_round_to_i32_clamp(-10.0, 600, 2300), 600);
        assert_eq!(f64_round_to_i32_clamp(9000.0, 600, 2300), 2300);
        assert_eq!(f64_round_to_i32_clamp(f64::NAN, 600, 2300), 600);

        // Swapped bounds are normalized
        assert_eq!(f64_round_to_i32_clamp(100.0, 2300, 600), 600);
    }

    // Property-based tests
    proptest! {
        #[test]
        fn prop_round_clamp_always_within_bounds(
            value in any::<f64>(),
            min in -100_000i32..100_000,
            max in -100_000i32..100_000
        ) {
            let (min, max) = if min <= max { (min, max) } else { (max, min) };
            let result = f64_round_to_i32_clamp(value, min, max);
            prop_assert!(result >= min);
            prop_assert!(result <= max);
        }

        #[test]
        fn prop_integral_values_pass_through(value in 600i32..=2300) {
            prop_assert_eq!(f64_round_to_i32_clamp(f64::from(value), 600, 2300), value);
        }
    }
}
