//! Time value of money and depreciation
//!
//! Rates here are decimal fractions per period (0.005 = 0.5 %), and the usual
//! spreadsheet sign convention applies: money paid out is negative. Periods
//! are 1-based.

use super::newton::{find_root, Root};
use lexee_core::{FormulaError, FormulaResult};

/// Rates closer to zero than this use the zero-rate limit of each formula
const ZERO_RATE: f64 = 1e-10;

/// Longest period range walked by the schedule loops
pub const MAX_SCHEDULE_PERIODS: usize = 100_000;

fn check_schedule_len(periods: usize) -> FormulaResult<()> {
    if periods > MAX_SCHEDULE_PERIODS {
        return Err(FormulaError::domain(format!(
            "{} periods is too many (at most {})",
            periods, MAX_SCHEDULE_PERIODS
        )));
    }
    Ok(())
}

/// When payments fall within each period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentTiming {
    #[default]
    End,
    Begin,
}

impl PaymentTiming {
    /// 0 = end of period, 1 = beginning
    pub fn from_flag(flag: i64) -> FormulaResult<Self> {
        match flag {
            0 => Ok(Self::End),
            1 => Ok(Self::Begin),
            other => Err(FormulaError::domain(format!(
                "payment timing must be 0 (end) or 1 (beginning), got {}",
                other
            ))),
        }
    }

    fn flag(self) -> f64 {
        match self {
            Self::End => 0.0,
            Self::Begin => 1.0,
        }
    }
}

fn is_zero(rate: f64) -> bool {
    rate.abs() < ZERO_RATE
}

fn check_rate(rate: f64) -> FormulaResult<()> {
    if rate.is_finite() && rate > -1.0 {
        Ok(())
    } else {
        Err(FormulaError::domain("rate must be greater than -100%"))
    }
}

fn check_finite(value: f64) -> FormulaResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FormulaError::domain("result is not a finite number"))
    }
}

/// Fixed payment per period (PMT)
pub fn payment(rate: f64, nper: f64, pv: f64, fv: f64, timing: PaymentTiming) -> FormulaResult<f64> {
    if nper <= 0.0 {
        return Err(FormulaError::domain("number of periods must be > 0"));
    }
    check_rate(rate)?;
    if is_zero(rate) {
        return check_finite(-(pv + fv) / nper);
    }
    let growth = (1.0 + rate).powf(nper);
    let pmt = -(rate * (pv * growth + fv)) / ((1.0 + rate * timing.flag()) * (growth - 1.0));
    check_finite(pmt)
}

/// Future value (FV)
pub fn future_value(rate: f64, nper: f64, pmt: f64, pv: f64, timing: PaymentTiming) -> FormulaResult<f64> {
    check_rate(rate)?;
    if is_zero(rate) {
        return check_finite(-(pv + pmt * nper));
    }
    let growth = (1.0 + rate).powf(nper);
    let fv = -(pv * growth + pmt * (1.0 + rate * timing.flag()) * (growth - 1.0) / rate);
    check_finite(fv)
}

/// Present value (PV)
pub fn present_value(rate: f64, nper: f64, pmt: f64, fv: f64, timing: PaymentTiming) -> FormulaResult<f64> {
    check_rate(rate)?;
    if is_zero(rate) {
        return check_finite(-(fv + pmt * nper));
    }
    let growth = (1.0 + rate).powf(nper);
    let pv = -(fv + pmt * (1.0 + rate * timing.flag()) * (growth - 1.0) / rate) / growth;
    check_finite(pv)
}

/// Number of periods (NPER)
pub fn periods(rate: f64, pmt: f64, pv: f64, fv: f64, timing: PaymentTiming) -> FormulaResult<f64> {
    check_rate(rate)?;
    if is_zero(rate) {
        if pmt == 0.0 {
            return Err(FormulaError::domain("payment cannot be 0 when the rate is 0"));
        }
        return check_finite(-(pv + fv) / pmt);
    }
    let z = pmt * (1.0 + rate * timing.flag()) / rate;
    let ratio = (z - fv) / (pv + z);
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(FormulaError::domain(
            "the payment can never repay this amount at this rate",
        ));
    }
    check_finite(ratio.ln() / (1.0 + rate).ln())
}

fn check_period(period: usize, nper: usize) -> FormulaResult<()> {
    if period == 0 || period > nper {
        Err(FormulaError::domain(format!(
            "period {} is out of range (1 to {})",
            period, nper
        )))
    } else {
        Ok(())
    }
}

/// Interest part of the payment for one period (IPMT)
pub fn interest_payment(
    rate: f64,
    period: usize,
    nper: usize,
    pv: f64,
    fv: f64,
    timing: PaymentTiming,
) -> FormulaResult<f64> {
    check_period(period, nper)?;
    if is_zero(rate) {
        return Ok(0.0);
    }
    let pmt = payment(rate, nper as f64, pv, fv, timing)?;
    match timing {
        PaymentTiming::End => Ok(future_value(rate, (period - 1) as f64, pmt, pv, timing)? * rate),
        PaymentTiming::Begin if period == 1 => Ok(0.0),
        PaymentTiming::Begin => {
            let balance = future_value(rate, (period - 1) as f64, pmt, pv, timing)?;
            Ok(balance * rate / (1.0 + rate))
        }
    }
}

/// Principal part of the payment for one period (PPMT)
pub fn principal_payment(
    rate: f64,
    period: usize,
    nper: usize,
    pv: f64,
    fv: f64,
    timing: PaymentTiming,
) -> FormulaResult<f64> {
    let pmt = payment(rate, nper as f64, pv, fv, timing)?;
    Ok(pmt - interest_payment(rate, period, nper, pv, fv, timing)?)
}

/// Interest and principal paid over `start..=end` (CUMIPMT, CUMPRINC)
pub fn cumulative(
    rate: f64,
    nper: usize,
    pv: f64,
    start: usize,
    end: usize,
    timing: PaymentTiming,
) -> FormulaResult<(f64, f64)> {
    if start == 0 || start > end || end > nper {
        return Err(FormulaError::domain(format!(
            "invalid period range {} to {} (1 to {})",
            start, end, nper
        )));
    }
    check_schedule_len(end - start + 1)?;
    let pmt = payment(rate, nper as f64, pv, 0.0, timing)?;
    let mut interest = 0.0;
    for period in start..=end {
        interest += interest_payment(rate, period, nper, pv, 0.0, timing)?;
    }
    let principal = pmt * (end - start + 1) as f64 - interest;
    Ok((interest, principal))
}

/// Periodic rate implied by a fixed-payment schedule (RATE)
pub fn implied_rate(
    nper: f64,
    pmt: f64,
    pv: f64,
    fv: f64,
    timing: PaymentTiming,
    guess: f64,
) -> FormulaResult<Root> {
    if nper <= 0.0 {
        return Err(FormulaError::domain("number of periods must be > 0"));
    }
    let t = timing.flag();

    let f = |r: f64| {
        if is_zero(r) {
            return pv + pmt * nper + fv;
        }
        let growth = (1.0 + r).powf(nper);
        pv * growth + pmt * (1.0 + r * t) * (growth - 1.0) / r + fv
    };
    let df = |r: f64| {
        if is_zero(r) {
            return pv * nper + pmt * (nper * (nper - 1.0) / 2.0 + t * nper);
        }
        let growth = (1.0 + r).powf(nper);
        let growth_prime = nper * (1.0 + r).powf(nper - 1.0);
        pv * growth_prime
            + pmt * t * (growth - 1.0) / r
            + pmt * (1.0 + r * t) * (growth_prime * r - (growth - 1.0)) / (r * r)
    };

    let scale = pv.abs() + fv.abs() + (pmt * nper).abs();
    let root = find_root(f, df, guess, 1e-6 * scale.max(1.0))?;
    if root.value <= -1.0 {
        return Err(FormulaError::Convergence(
            "solved rate is not above -100%".to_string(),
        ));
    }
    Ok(root)
}

/// Net present value, first flow discounted one period (NPV)
pub fn net_present_value(rate: f64, flows: &[f64]) -> FormulaResult<f64> {
    check_rate(rate)?;
    let npv = flows
        .iter()
        .enumerate()
        .map(|(i, cf)| cf / (1.0 + rate).powi(i as i32 + 1))
        .sum();
    check_finite(npv)
}

/// Internal rate of return, first flow at time 0 (IRR)
pub fn internal_rate_of_return(flows: &[f64], guess: f64) -> FormulaResult<Root> {
    if flows.len() < 2 {
        return Err(FormulaError::domain("at least 2 cash flows are required"));
    }
    if !flows.iter().any(|cf| *cf > 0.0) || !flows.iter().any(|cf| *cf < 0.0) {
        return Err(FormulaError::domain(
            "cash flows must contain both positive and negative values",
        ));
    }

    let f = |r: f64| {
        flows
            .iter()
            .enumerate()
            .map(|(i, cf)| cf / (1.0 + r).powi(i as i32))
            .sum::<f64>()
    };
    let df = |r: f64| {
        flows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, cf)| -(i as f64) * cf / (1.0 + r).powi(i as i32 + 1))
            .sum::<f64>()
    };

    let scale: f64 = flows.iter().map(|cf| cf.abs()).sum();
    let root = find_root(f, df, guess, 1e-7 * scale)?;
    if root.value <= -1.0 {
        return Err(FormulaError::Convergence(
            "solved rate is not above -100%".to_string(),
        ));
    }
    Ok(root)
}

fn check_asset(cost: f64, salvage: f64, life: f64) -> FormulaResult<()> {
    if life <= 0.0 {
        return Err(FormulaError::domain("useful life must be > 0"));
    }
    if cost < 0.0 || salvage < 0.0 {
        return Err(FormulaError::domain("cost and salvage value must not be negative"));
    }
    Ok(())
}

/// Straight-line depreciation per period (SLN)
pub fn straight_line(cost: f64, salvage: f64, life: f64) -> FormulaResult<f64> {
    check_asset(cost, salvage, life)?;
    Ok((cost - salvage) / life)
}

/// One period of fixed-declining-balance depreciation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecliningBalance {
    pub amount: f64,
    /// Fixed rate, rounded to 3 decimals
    pub rate: f64,
    /// Depreciation accumulated up to and including this period
    pub accumulated: f64,
}

/// Fixed-declining-balance depreciation (DB)
///
/// `month` is the number of months in the first year; when it is below 12
/// the schedule gains a partial period `life + 1`.
pub fn declining_balance(
    cost: f64,
    salvage: f64,
    life: usize,
    period: usize,
    month: u32,
) -> FormulaResult<DecliningBalance> {
    check_asset(cost, salvage, life as f64)?;
    if cost == 0.0 {
        return Err(FormulaError::domain("cost must be > 0"));
    }
    if !(1..=12).contains(&month) {
        return Err(FormulaError::domain("month must be between 1 and 12"));
    }
    let last = if month < 12 { life + 1 } else { life };
    check_period(period, last)?;
    check_schedule_len(period)?;

    let rate = crate::numeric::round(1.0 - (salvage / cost).powf(1.0 / life as f64), 3);
    let months = f64::from(month);

    let mut accumulated = 0.0;
    let mut amount = 0.0;
    for p in 1..=period {
        amount = if p == 1 {
            cost * rate * months / 12.0
        } else if p == life + 1 {
            (cost - accumulated) * rate * (12.0 - months) / 12.0
        } else {
            (cost - accumulated) * rate
        };
        accumulated += amount;
    }
    Ok(DecliningBalance {
        amount,
        rate,
        accumulated,
    })
}

/// Sum-of-years'-digits depreciation for one period (SYD)
pub fn sum_of_years(cost: f64, salvage: f64, life: usize, period: usize) -> FormulaResult<f64> {
    check_asset(cost, salvage, life as f64)?;
    check_period(period, life)?;
    let n = life as f64;
    Ok((cost - salvage) * (n - period as f64 + 1.0) * 2.0 / (n * (n + 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const END: PaymentTiming = PaymentTiming::End;

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    #[test]
    fn test_payment() {
        assert!(close(payment(0.05 / 12.0, 240.0, 200_000.0, 0.0, END).unwrap(), -1319.91, 0.005));
        assert!(close(payment(0.01, 360.0, 300_000.0, 0.0, END).unwrap(), -3085.84, 0.005));
        assert_eq!(payment(0.0, 120.0, 120_000.0, 0.0, END).unwrap(), -1000.0);
        let begin = payment(0.05 / 12.0, 240.0, 200_000.0, 0.0, PaymentTiming::Begin).unwrap();
        assert!(begin > -1319.91);
        assert!(payment(0.05, 0.0, 1000.0, 0.0, END).is_err());
    }

    #[test]
    fn test_future_and_present_value() {
        assert_eq!(future_value(0.0, 120.0, -500.0, 0.0, END).unwrap(), 60_000.0);
        let fv = future_value(0.005, 120.0, 0.0, -10_000.0, END).unwrap();
        assert!(close(fv, 10_000.0 * 1.005f64.powi(120), 1e-6));
        assert_eq!(present_value(0.0, 120.0, -1000.0, 0.0, END).unwrap(), 120_000.0);
        let pv = present_value(0.05 / 12.0, 240.0, -1319.91, 0.0, END).unwrap();
        assert!(close(pv, 200_000.0, 100.0));
    }

    #[test]
    fn test_periods() {
        assert_eq!(periods(0.0, -1000.0, 120_000.0, 0.0, END).unwrap(), 120.0);
        let pmt = payment(0.005, 360.0, 300_000.0, 0.0, END).unwrap();
        assert!(close(periods(0.005, pmt, 300_000.0, 0.0, END).unwrap(), 360.0, 1e-6));
        assert!(periods(0.0, 0.0, 100_000.0, 0.0, END).is_err());
        // Payment below the interest never repays
        assert!(periods(0.01, -100.0, 100_000.0, 0.0, END).is_err());
    }

    #[test]
    fn test_interest_and_principal() {
        let pmt = payment(0.005, 60.0, 200_000.0, 0.0, END).unwrap();
        let ipmt = interest_payment(0.005, 1, 60, 200_000.0, 0.0, END).unwrap();
        let ppmt = principal_payment(0.005, 1, 60, 200_000.0, 0.0, END).unwrap();
        assert!(close(ipmt, -1000.0, 1e-9));
        assert!(close(ipmt + ppmt, pmt, 1e-9));

        assert_eq!(interest_payment(0.0, 5, 10, 5000.0, 0.0, END).unwrap(), 0.0);
        assert_eq!(principal_payment(0.0, 1, 10, 5000.0, 0.0, END).unwrap(), -500.0);
        assert_eq!(
            interest_payment(0.01, 1, 12, 10_000.0, 0.0, PaymentTiming::Begin).unwrap(),
            0.0
        );
        assert!(matches!(
            interest_payment(0.01, 0, 12, 10_000.0, 0.0, END),
            Err(FormulaError::Domain(_))
        ));
    }

    #[test]
    fn test_cumulative() {
        let (interest, _) = cumulative(0.01, 12, 10_000.0, 1, 1, END).unwrap();
        let ipmt = interest_payment(0.01, 1, 12, 10_000.0, 0.0, END).unwrap();
        assert!(close(interest, ipmt, 1e-9));
        assert!(cumulative(0.01, 12, 10_000.0, 5, 3, END).is_err());
        assert!(cumulative(0.01, 12, 10_000.0, 1, 13, END).is_err());
    }

    #[test]
    fn test_schedule_loops_are_bounded() {
        let max = MAX_SCHEDULE_PERIODS;
        assert!(cumulative(0.0001, max, 1_000_000.0, 1, max, END).is_ok());
        assert!(matches!(
            cumulative(0.0001, max + 1, 1_000_000.0, 1, max + 1, END),
            Err(FormulaError::Domain(_))
        ));
        // A long loan is fine as long as the range walked is short
        assert!(cumulative(0.0001, 1_000_000, 1_000_000.0, 1, 12, END).is_ok());

        assert!(declining_balance(10_000.0, 1000.0, max, max, 12).is_ok());
        assert!(matches!(
            declining_balance(10_000.0, 1000.0, max + 1, max + 1, 12),
            Err(FormulaError::Domain(_))
        ));
    }

    #[test]
    fn test_implied_rate() {
        let root = implied_rate(240.0, -1319.91, 200_000.0, 0.0, END, 0.01).unwrap();
        assert!(close(root.value * 1200.0, 5.0, 0.01));
        let root = implied_rate(360.0, -3085.84, 300_000.0, 0.0, END, 0.01).unwrap();
        assert!(close(root.value * 1200.0, 12.0, 0.01));
    }

    #[test]
    fn test_irr() {
        let root = internal_rate_of_return(&[-1000.0, 1100.0], 0.1).unwrap();
        assert!(close(root.value, 0.1, 1e-9));
        let root = internal_rate_of_return(&[-100.0, 50.0, 50.0], 0.1).unwrap();
        assert!(close(root.value, 0.0, 1e-9));
        assert!(internal_rate_of_return(&[-1000.0], 0.1).is_err());
        assert!(internal_rate_of_return(&[100.0, 100.0], 0.1).is_err());
    }

    #[test]
    fn test_npv() {
        let npv = net_present_value(0.1, &[30_000.0, 35_000.0, 40_000.0, 45_000.0]).unwrap();
        assert!(close(npv, 116_986.54, 0.01));
    }

    #[test]
    fn test_depreciation() {
        assert_eq!(straight_line(10_000.0, 1000.0, 10.0).unwrap(), 900.0);
        assert!(straight_line(10_000.0, 0.0, 0.0).is_err());

        assert_eq!(sum_of_years(10_000.0, 1000.0, 5, 1).unwrap(), 3000.0);
        assert_eq!(sum_of_years(10_000.0, 1000.0, 5, 5).unwrap(), 600.0);
        let total: f64 = (1..=5).map(|p| sum_of_years(10_000.0, 1000.0, 5, p).unwrap()).sum();
        assert!(close(total, 9000.0, 1e-9));

        let first = declining_balance(10_000.0, 1000.0, 5, 1, 12).unwrap();
        let second = declining_balance(10_000.0, 1000.0, 5, 2, 12).unwrap();
        assert_eq!(first.rate, 0.369);
        assert!(close(first.amount, 3690.0, 1e-9));
        assert!(first.amount > second.amount);
        assert!(declining_balance(10_000.0, 1000.0, 5, 6, 12).is_err());
        assert!(declining_balance(10_000.0, 1000.0, 5, 6, 7).is_ok());
    }

    proptest! {
        #[test]
        fn prop_interest_plus_principal_is_total_payment(
            rate in 0.0001f64..0.05,
            nper in 1usize..120,
            pv in 100.0f64..1_000_000.0,
        ) {
            let pmt = payment(rate, nper as f64, pv, 0.0, END).unwrap();
            let (interest, principal) = cumulative(rate, nper, pv, 1, nper, END).unwrap();
            prop_assert!(((interest + principal) - pmt * nper as f64).abs() < 1e-6 * pv);
            // Principal repaid is the whole loan
            prop_assert!((principal + pv).abs() < 1e-6 * pv);
        }

        #[test]
        fn prop_irr_residual_is_small(
            inflows in proptest::collection::vec(10.0f64..50_000.0, 1..10),
            recovered in 0.05f64..1.0,
        ) {
            // The outlay is recovered by the inflows, so the rate is >= 0
            let outlay = recovered * inflows.iter().sum::<f64>();
            let mut flows = vec![-outlay];
            flows.extend(inflows);

            let result = internal_rate_of_return(&flows, 0.1);
            prop_assert!(result.is_ok(), "no rate found for {:?}: {:?}", flows, result);
            let root = result.unwrap();
            prop_assert!(root.value >= -1e-9);

            let residual: f64 = flows
                .iter()
                .enumerate()
                .map(|(i, cf)| cf / (1.0 + root.value).powi(i as i32))
                .sum();
            let scale: f64 = flows.iter().map(|cf| cf.abs()).sum();
            prop_assert!(residual.abs() <= 1e-7 * scale);
        }
    }
}
