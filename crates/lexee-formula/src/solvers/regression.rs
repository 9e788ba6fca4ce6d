//! Least-squares line fitting

use lexee_core::{FormulaError, FormulaResult};

/// Closed-form fit of `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation; `None` when `y` is constant
    pub correlation: Option<f64>,
    pub r_squared: Option<f64>,
    pub n: usize,
}

impl LinearFit {
    pub fn fit(x: &[f64], y: &[f64]) -> FormulaResult<Self> {
        if x.len() != y.len() {
            return Err(FormulaError::shape(format!(
                "x has {} values but y has {}",
                x.len(),
                y.len()
            )));
        }
        let n = x.len();
        if n < 2 {
            return Err(FormulaError::domain("at least 2 points are required"));
        }

        let count = n as f64;
        let mean_x = x.iter().sum::<f64>() / count;
        let mean_y = y.iter().sum::<f64>() / count;

        let mut sxx = 0.0;
        let mut syy = 0.0;
        let mut sxy = 0.0;
        for (xi, yi) in x.iter().zip(y) {
            let dx = xi - mean_x;
            let dy = yi - mean_y;
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }

        if sxx == 0.0 {
            return Err(FormulaError::domain("x values are all identical"));
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;
        let correlation = (syy > 0.0).then(|| (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0));

        Ok(Self {
            slope,
            intercept,
            correlation,
            r_squared: correlation.map(|r| r * r),
            n,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}
