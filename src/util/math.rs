//! Numeric helpers shared by the decoder, crop logic and validation.

use crate::util::{CascadeError, CascadeResult};

/// Checks that `value` is finite and within `[0, 1]`.
pub(crate) fn check_unit_interval(name: &'static str, value: f32) -> CascadeResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CascadeError::InvalidThreshold { name, value })
    }
}

/// Truncates a non-negative float toward zero into `usize`.
///
/// Negative and NaN inputs map to 0; values past `usize::MAX` saturate.
pub(crate) fn trunc_to_usize(value: f32) -> usize {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        value as usize
    }
}

/// Returns the index and value of the first maximum in `values`.
///
/// Ties resolve to the lowest index. Returns `None` for an empty iterator.
pub(crate) fn argmax<I>(values: I) -> Option<(usize, f32)>
where
    I: IntoIterator<Item = f32>,
{
    let mut best: Option<(usize, f32)> = None;
    for (idx, value) in values.into_iter().enumerate() {
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ if value.is_nan() => {}
            _ => best = Some((idx, value)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::{argmax, check_unit_interval, trunc_to_usize};

    #[test]
    fn unit_interval_accepts_bounds() {
        assert!(check_unit_interval("t", 0.0).is_ok());
        assert!(check_unit_interval("t", 1.0).is_ok());
        assert!(check_unit_interval("t", 1.01).is_err());
        assert!(check_unit_interval("t", -0.1).is_err());
        assert!(check_unit_interval("t", f32::NAN).is_err());
    }

    #[test]
    fn trunc_clamps_negative_to_zero() {
        assert_eq!(trunc_to_usize(-3.7), 0);
        assert_eq!(trunc_to_usize(f32::NAN), 0);
        assert_eq!(trunc_to_usize(12.9), 12);
    }

    #[test]
    fn argmax_prefers_first_of_ties() {
        assert_eq!(argmax([0.2, 0.7, 0.7, 0.1]), Some((1, 0.7)));
        assert_eq!(argmax(std::iter::empty()), None);
        assert_eq!(argmax([f32::NAN, 0.3]), Some((1, 0.3)));
    }
}
