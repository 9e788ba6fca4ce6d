//! Numeric helpers shared by the formulas: decimal rounding and descriptive statistics

use lexee_core::{FormulaError, FormulaResult};
use rust_decimal::{Decimal, RoundingStrategy};
use std::cmp::Ordering;

/// Round half away from zero (spreadsheet ROUND)
///
/// Rounding is done on the shortest decimal form of the number, so
/// `round(2.675, 2)` is `2.68`. Negative `digits` round left of the point.
pub fn round(value: f64, digits: i32) -> f64 {
    round_with(value, digits, RoundingStrategy::MidpointAwayFromZero)
}

/// Round away from zero (spreadsheet ROUNDUP)
pub fn round_up(value: f64, digits: i32) -> f64 {
    round_with(value, digits, RoundingStrategy::AwayFromZero)
}

/// Round toward zero (spreadsheet ROUNDDOWN)
pub fn round_down(value: f64, digits: i32) -> f64 {
    round_with(value, digits, RoundingStrategy::ToZero)
}

fn round_with(value: f64, digits: i32, strategy: RoundingStrategy) -> f64 {
    // Beyond 2^53 every double is already whole
    if !value.is_finite() || (digits >= 0 && value.abs() >= 9.0e15) {
        return value;
    }

    // Shift left of the decimal point for negative digits
    let (scaled, shift) = if digits < 0 {
        let factor = 10_f64.powi(-digits);
        (value / factor, factor)
    } else {
        (value, 1.0)
    };
    let dp = digits.max(0) as u32;

    let rounded = match format!("{}", scaled).parse::<Decimal>() {
        Ok(d) => d
            .round_dp_with_strategy(dp, strategy)
            .to_string()
            .parse::<f64>()
            .unwrap_or(scaled),
        Err(_) => round_by_multiplier(scaled, dp, strategy),
    };

    rounded * shift
}

/// Fallback for magnitudes outside the decimal range
fn round_by_multiplier(value: f64, dp: u32, strategy: RoundingStrategy) -> f64 {
    let multiplier = 10_f64.powi(dp.min(300) as i32);
    let scaled = value * multiplier;
    let r = match strategy {
        RoundingStrategy::AwayFromZero => {
            if scaled >= 0.0 {
                scaled.ceil()
            } else {
                scaled.floor()
            }
        }
        RoundingStrategy::ToZero => scaled.trunc(),
        _ => scaled.round(),
    };
    r / multiplier
}

/// Total order for floats (NaN sorts last)
pub fn compare(a: &f64, b: &f64) -> Ordering {
    a.total_cmp(b)
}

/// Sorted copy
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(compare);
    v
}

fn require_values(values: &[f64]) -> FormulaResult<()> {
    if values.is_empty() {
        Err(FormulaError::domain("the list of values is empty"))
    } else {
        Ok(())
    }
}

pub fn mean(values: &[f64]) -> FormulaResult<f64> {
    require_values(values)?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> FormulaResult<f64> {
    require_values(values)?;
    let v = sorted(values);
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        Ok((v[mid - 1] + v[mid]) / 2.0)
    } else {
        Ok(v[mid])
    }
}

/// Variance with divisor `n` (population) or `n - 1` (sample)
pub fn variance(values: &[f64], sample: bool) -> FormulaResult<f64> {
    require_values(values)?;
    let n = values.len();
    if sample && n < 2 {
        return Err(FormulaError::domain(
            "at least 2 values are required for a sample statistic",
        ));
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    let divisor = if sample { n - 1 } else { n };
    Ok(ss / divisor as f64)
}

/// Inclusive percentile with linear interpolation (PERCENTILE.INC), `k` in [0, 1]
pub fn percentile_inc(values: &[f64], k: f64) -> FormulaResult<f64> {
    require_values(values)?;
    if !(0.0..=1.0).contains(&k) {
        return Err(FormulaError::domain("k must be between 0 and 1"));
    }
    let v = sorted(values);
    let rank = k * (v.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let frac = rank - lo as f64;
    match v.get(lo + 1) {
        Some(next) => Ok(v[lo] + frac * (next - v[lo])),
        None => Ok(v[lo]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round(2.5, 0), 3.0);
        assert_eq!(round(-2.5, 0), -3.0);
        assert_eq!(round(2.675, 2), 2.68);
        assert_eq!(round(3.14159, 2), 3.14);
        assert_eq!(round(1234.5, -2), 1200.0);
        assert_eq!(round(0.1 + 0.2, 10), 0.3);
    }

    #[test]
    fn test_round_up_down() {
        assert_eq!(round_up(3.14159, 2), 3.15);
        assert_eq!(round_down(3.14159, 2), 3.14);
        assert_eq!(round_up(-3.141, 2), -3.15);
        assert_eq!(round_down(-3.149, 2), -3.14);
        assert_eq!(round_up(1.1, 1), 1.1);
    }

    #[test]
    fn test_round_large_values() {
        assert_eq!(round(1e300, 2), 1e300);
        assert!(round(f64::NAN, 2).is_nan());
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 5.0, 2.0, 4.0]).unwrap(), 3.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]).unwrap(), 2.5);
        assert!(median(&[]).is_err());
    }

    #[test]
    fn test_variance() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(variance(&v, false).unwrap(), 4.0);
        assert!((variance(&v, true).unwrap() - 32.0 / 7.0).abs() < 1e-12);
        assert!(variance(&[1.0], true).is_err());
    }

    #[test]
    fn test_percentile_inc() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_inc(&v, 0.5).unwrap(), 3.0);
        assert_eq!(percentile_inc(&v, 0.25).unwrap(), 2.0);
        assert_eq!(percentile_inc(&[10.0, 20.0, 30.0], 1.0).unwrap(), 30.0);
        assert!(percentile_inc(&v, 1.5).is_err());
    }
}
