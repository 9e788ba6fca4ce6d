//! Evaluation context
//!
//! The few ambient inputs a formula may consult: the calendar date and the
//! random seed. Everything else comes from the variable mapping.

use chrono::{Local, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Context for formula execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaContext {
    /// Date reported as "today" by date formulas
    pub today: NaiveDate,
    /// Seed for random-generation formulas (None = entropy)
    pub seed: Option<u64>,
}

impl FormulaContext {
    /// Context using the local calendar date and entropy-seeded randomness
    pub fn new() -> Self {
        Self {
            today: Local::now().date_naive(),
            seed: None,
        }
    }

    /// Override the calendar date
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Make random formulas reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Fresh random generator for one formula call
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl Default for FormulaContext {
    fn default() -> Self {
        Self::new()
    }
}
