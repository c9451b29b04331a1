//! Engine configuration
//!
//! Tuning parameters for the numerical methods, grouped per method. Every
//! section has sensible defaults so a partial JSON file is enough:
//!
//! ```json
//! { "lattice": { "steps": 500 }, "monte_carlo": { "seed": 42 } }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{PricingError, PricingResult};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub lattice: LatticeConfig,
    pub monte_carlo: MonteCarloConfig,
    pub implied_vol: SolverConfig,
}

impl EngineConfig {
    /// Coarse settings for quick indicative numbers
    pub fn fast() -> Self {
        Self {
            lattice: LatticeConfig { steps: 50 },
            monte_carlo: MonteCarloConfig {
                paths: 10_000,
                ..Default::default()
            },
            implied_vol: SolverConfig {
                tolerance: 1e-8,
                vol_tolerance: 1e-6,
                ..Default::default()
            },
        }
    }

    /// Fine settings for benchmarking against the analytic price
    pub fn precise() -> Self {
        Self {
            lattice: LatticeConfig { steps: 1_000 },
            monte_carlo: MonteCarloConfig {
                paths: 1_000_000,
                ..Default::default()
            },
            implied_vol: SolverConfig {
                tolerance: 1e-12,
                vol_tolerance: 1e-10,
                max_bisection_iterations: 400,
                ..Default::default()
            },
        }
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> PricingResult<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| PricingError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> PricingResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!("Loaded engine configuration from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> PricingResult<()> {
        self.lattice.validate()?;
        self.monte_carlo.validate()?;
        self.implied_vol.validate()
    }
}

/// Binomial lattice configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    /// Number of time steps in the tree
    /// Default: 100
    pub steps: usize,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self { steps: 100 }
    }
}

impl LatticeConfig {
    pub fn validate(&self) -> PricingResult<()> {
        if self.steps == 0 {
            return Err(PricingError::config("lattice.steps must be >= 1"));
        }
        Ok(())
    }
}

/// Monte Carlo configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Total number of simulated terminal prices
    /// With antithetic variates this counts both legs of every pair.
    /// Default: 100_000
    pub paths: usize,

    /// Pair every normal draw Z with -Z
    /// Default: true
    pub antithetic: bool,

    /// Base seed; None draws one from OS entropy
    /// Default: None
    pub seed: Option<u64>,

    /// Samples per independently-seeded batch
    /// Fixing this keeps the estimate identical however batches are scheduled.
    /// Default: 4096
    pub batch_size: usize,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            paths: 100_000,
            antithetic: true,
            seed: None,
            batch_size: 4_096,
        }
    }
}

impl MonteCarloConfig {
    pub fn validate(&self) -> PricingResult<()> {
        if self.paths == 0 {
            return Err(PricingError::config("monte_carlo.paths must be >= 1"));
        }
        if self.antithetic && self.paths % 2 != 0 {
            return Err(PricingError::config(format!(
                "monte_carlo.paths must be even with antithetic variates, got {}",
                self.paths
            )));
        }
        if self.batch_size == 0 {
            return Err(PricingError::config("monte_carlo.batch_size must be >= 1"));
        }
        Ok(())
    }
}

/// Implied volatility solver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Absolute price residual a solution must meet
    /// Default: 1e-10
    pub tolerance: f64,

    /// Volatility resolution: Newton stops once its step is below this,
    /// bisection once the bracket is narrower. A price too coarse to pin the
    /// volatility to this resolution is a convergence error.
    /// Default: 1e-8
    pub vol_tolerance: f64,

    /// Newton-Raphson iteration budget before forcing bisection
    /// Default: 50
    pub max_newton_iterations: usize,

    /// Bisection iteration budget
    /// Default: 200
    pub max_bisection_iterations: usize,

    /// Starting volatility; None uses the Brenner-Subrahmanyam approximation
    /// Default: None
    pub initial_guess: Option<f64>,

    /// Lower end of the volatility search interval
    /// Default: 1e-4
    pub min_vol: f64,

    /// Upper end of the volatility search interval
    /// Default: 5.0
    pub max_vol: f64,

    /// Vega below which a Newton step is not attempted
    /// Default: 1e-10
    pub min_vega: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            vol_tolerance: 1e-8,
            max_newton_iterations: 50,
            max_bisection_iterations: 200,
            initial_guess: None,
            min_vol: 1e-4,
            max_vol: 5.0,
            min_vega: 1e-10,
        }
    }
}

impl SolverConfig {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_vol_tolerance(mut self, vol_tolerance: f64) -> Self {
        self.vol_tolerance = vol_tolerance;
        self
    }

    pub fn with_initial_guess(mut self, initial_guess: f64) -> Self {
        self.initial_guess = Some(initial_guess);
        self
    }

    pub fn with_bounds(mut self, min_vol: f64, max_vol: f64) -> Self {
        self.min_vol = min_vol;
        self.max_vol = max_vol;
        self
    }

    pub fn with_max_iterations(mut self, newton: usize, bisection: usize) -> Self {
        self.max_newton_iterations = newton;
        self.max_bisection_iterations = bisection;
        self
    }

    pub fn validate(&self) -> PricingResult<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(PricingError::config("implied_vol.tolerance must be positive"));
        }
        if !(self.vol_tolerance.is_finite() && self.vol_tolerance > 0.0) {
            return Err(PricingError::config("implied_vol.vol_tolerance must be positive"));
        }
        if !(self.min_vol.is_finite() && self.min_vol > 0.0) {
            return Err(PricingError::config("implied_vol.min_vol must be positive"));
        }
        if !(self.max_vol.is_finite() && self.max_vol > self.min_vol) {
            return Err(PricingError::config(
                "implied_vol.max_vol must exceed implied_vol.min_vol",
            ));
        }
        if !(self.min_vega.is_finite() && self.min_vega >= 0.0) {
            return Err(PricingError::config("implied_vol.min_vega must be non-negative"));
        }
        if let Some(guess) = self.initial_guess {
            if !(guess.is_finite() && guess > 0.0) {
                return Err(PricingError::config(
                    "implied_vol.initial_guess must be positive",
                ));
            }
        }
        if self.max_bisection_iterations == 0 {
            return Err(PricingError::config(
                "implied_vol.max_bisection_iterations must be >= 1",
            ));
        }
        Ok(())
    }
}
