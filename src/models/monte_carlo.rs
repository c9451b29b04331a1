//! Monte Carlo Pricer
//!
//! Simulates terminal prices under geometric Brownian motion,
//!
//! ```text
//! S_T = S·exp((r - σ²/2)T + σ√T·Z),   Z ~ N(0, 1)
//! ```
//!
//! and reports the discounted mean payoff together with its standard error.
//!
//! ## Antithetic variates
//!
//! Each draw `Z` is paired with `-Z` and the two payoffs are averaged into a
//! single sample. `paths` always counts simulated terminal prices, so an
//! antithetic run of `paths` uses `paths / 2` pair-averages, and the standard
//! error is taken over those pair-averages (the legs of a pair are correlated
//! and are never counted as two observations).
//!
//! ## Reproducibility
//!
//! Samples are generated in fixed-size batches. Batch `k` draws from a
//! `ChaCha8Rng` seeded with the run seed and set to stream `k`, and batch
//! statistics are merged in batch order. The estimate therefore depends only on
//! (seed, paths, antithetic, batch size), not on which worker produced which
//! batch, and is bit-identical across runs and platforms.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use super::black_scholes::ensure_european;
use crate::core::{MonteCarloConfig, OptionContract, OptionType, PricingError, PricingResult};

/// Relative spot bump used by `monte_carlo_greeks`
const GREEKS_SPOT_BUMP: f64 = 0.01;

/// Terminal payoff applied to each simulated price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Payoff {
    /// max(S_T - K, 0) or max(K - S_T, 0)
    Vanilla(OptionType),
    /// Fixed `payout` if the option finishes in the money
    CashOrNothing { option_type: OptionType, payout: f64 },
}

impl Payoff {
    pub fn evaluate(&self, terminal: f64, strike: f64) -> f64 {
        match *self {
            Payoff::Vanilla(option_type) => option_type.intrinsic(terminal, strike),
            Payoff::CashOrNothing {
                option_type: OptionType::Call,
                payout,
            } => {
                if terminal > strike {
                    payout
                } else {
                    0.0
                }
            }
            Payoff::CashOrNothing {
                option_type: OptionType::Put,
                payout,
            } => {
                if terminal < strike {
                    payout
                } else {
                    0.0
                }
            }
        }
    }
}

/// Running count, mean and sum of squared deviations of a sample
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleStats {
    pub count: usize,
    pub mean: f64,
    pub m2: f64,
}

impl SampleStats {
    /// Add one observation (Welford update)
    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    /// Combine two disjoint samples (Chan et al. pairwise update)
    pub fn merge(&self, other: &SampleStats) -> SampleStats {
        if self.count == 0 {
            return *other;
        }
        if other.count == 0 {
            return *self;
        }
        let count = self.count + other.count;
        let n_a = self.count as f64;
        let n_b = other.count as f64;
        let delta = other.mean - self.mean;
        SampleStats {
            count,
            mean: self.mean + delta * n_b / count as f64,
            m2: self.m2 + other.m2 + delta * delta * n_a * n_b / count as f64,
        }
    }

    /// Unbiased sample variance (n - 1 denominator)
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        self.m2 / (self.count - 1) as f64
    }

    /// Standard error of the mean
    pub fn std_error(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.variance() / self.count as f64).sqrt()
    }
}

/// Monte Carlo price estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct McEstimate {
    /// Discounted mean payoff
    pub price: f64,
    /// Standard error of `price`
    pub std_error: f64,
    /// Simulated terminal prices (both legs of antithetic pairs)
    pub paths: usize,
    /// Independent observations behind `std_error`
    pub samples: usize,
    /// Base seed actually used (drawn from entropy when none was given)
    pub seed: u64,
}

impl McEstimate {
    /// Symmetric confidence interval `price ± z·std_error`
    pub fn confidence_interval(&self, z: f64) -> (f64, f64) {
        (self.price - z * self.std_error, self.price + z * self.std_error)
    }
}

/// A fully specified simulation, split into independently seeded batches
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    contract: OptionContract,
    payoff: Payoff,
    paths: usize,
    antithetic: bool,
    samples: usize,
    batch_size: usize,
    seed: u64,
}

impl SimulationPlan {
    /// Validate the inputs and fix the seed.
    ///
    /// Fails on American contracts, zero paths, an odd path count with
    /// antithetic variates, or fewer than two independent samples.
    pub fn new(
        contract: &OptionContract,
        payoff: Payoff,
        config: &MonteCarloConfig,
    ) -> PricingResult<Self> {
        ensure_european(contract, "Monte Carlo")?;

        let paths = config.paths;
        if paths == 0 {
            return Err(PricingError::invalid_parameter(
                "Monte Carlo path count must be positive, got 0",
            ));
        }
        if config.antithetic && paths % 2 != 0 {
            return Err(PricingError::invalid_parameter(format!(
                "antithetic variates need an even path count, got {paths}"
            )));
        }
        if config.batch_size == 0 {
            return Err(PricingError::invalid_parameter(
                "Monte Carlo batch size must be positive, got 0",
            ));
        }
        if let Payoff::CashOrNothing { payout, .. } = payoff {
            if !(payout.is_finite() && payout > 0.0) {
                return Err(PricingError::invalid_parameter(format!(
                    "payout must be positive, got {payout}"
                )));
            }
        }

        let samples = if config.antithetic { paths / 2 } else { paths };
        if samples < 2 {
            return Err(PricingError::invalid_parameter(format!(
                "{paths} paths give {samples} independent sample(s); at least 2 are needed \
                 for a standard error"
            )));
        }

        let seed = match config.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::random::<u64>();
                tracing::debug!(seed, "Monte Carlo seed drawn from entropy");
                seed
            }
        };

        Ok(Self {
            contract: *contract,
            payoff,
            paths,
            antithetic: config.antithetic,
            samples,
            batch_size: config.batch_size,
            seed,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Independent observations (pair-averages when antithetic)
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn num_batches(&self) -> usize {
        self.samples.div_ceil(self.batch_size)
    }

    /// Simulate batch `batch` (`0..num_batches()`) and return undiscounted
    /// payoff statistics. Batches may be run in any order or on any thread.
    pub fn simulate_batch(&self, batch: usize) -> SampleStats {
        let start = batch * self.batch_size;
        let end = ((batch + 1) * self.batch_size).min(self.samples);

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(batch as u64);

        let spot = self.contract.spot();
        let strike = self.contract.strike();
        let vol = self.contract.volatility();
        let time = self.contract.time_to_maturity();
        let drift = (self.contract.rate() - 0.5 * vol * vol) * time;
        let diffusion = vol * time.sqrt();

        let mut stats = SampleStats::default();
        for _ in start..end {
            let z: f64 = Distribution::<f64>::sample(&StandardNormal, &mut rng);
            let up = self.payoff.evaluate(spot * (drift + diffusion * z).exp(), strike);
            let sample = if self.antithetic {
                let down = self.payoff.evaluate(spot * (drift - diffusion * z).exp(), strike);
                0.5 * (up + down)
            } else {
                up
            };
            stats.push(sample);
        }
        stats
    }

    /// Turn merged batch statistics into a discounted estimate
    pub fn finish(&self, stats: &SampleStats) -> McEstimate {
        let df = self.contract.discount_factor();
        McEstimate {
            price: df * stats.mean,
            std_error: df * stats.std_error(),
            paths: self.paths,
            samples: stats.count,
            seed: self.seed,
        }
    }

    /// Run every batch and merge in batch order
    pub fn run(&self) -> McEstimate {
        tracing::debug!(
            paths = self.paths,
            samples = self.samples,
            batches = self.num_batches(),
            antithetic = self.antithetic,
            seed = self.seed,
            "Monte Carlo run"
        );
        let stats = (0..self.num_batches())
            .map(|batch| self.simulate_batch(batch))
            .fold(SampleStats::default(), |acc, s| acc.merge(&s));
        self.finish(&stats)
    }
}

/// Price a European option by Monte Carlo.
///
/// `paths` counts simulated terminal prices; with `antithetic` it must be even.
/// Supplying `seed` makes the result exactly reproducible.
pub fn price_monte_carlo(
    contract: &OptionContract,
    paths: usize,
    antithetic: bool,
    seed: Option<u64>,
) -> PricingResult<McEstimate> {
    let config = MonteCarloConfig {
        paths,
        antithetic,
        seed,
        ..Default::default()
    };
    price_monte_carlo_with(contract, &config)
}

/// Price a European option with explicit Monte Carlo configuration
pub fn price_monte_carlo_with(
    contract: &OptionContract,
    config: &MonteCarloConfig,
) -> PricingResult<McEstimate> {
    price_payoff_monte_carlo(contract, Payoff::Vanilla(contract.option_type()), config)
}

/// Price an arbitrary terminal payoff on the contract's underlying
pub fn price_payoff_monte_carlo(
    contract: &OptionContract,
    payoff: Payoff,
    config: &MonteCarloConfig,
) -> PricingResult<McEstimate> {
    Ok(SimulationPlan::new(contract, payoff, config)?.run())
}

/// Monte Carlo price with finite-difference delta and gamma
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct McGreeks {
    pub price: f64,
    pub std_error: f64,
    pub delta: f64,
    pub gamma: f64,
}

/// Estimate delta and gamma by central differences on a 1% spot bump.
///
/// All three revaluations share one seed (common random numbers), which
/// removes most of the simulation noise from the differences.
pub fn monte_carlo_greeks(
    contract: &OptionContract,
    paths: usize,
    seed: Option<u64>,
) -> PricingResult<McGreeks> {
    let base = price_monte_carlo(contract, paths, true, seed)?;
    let seed = Some(base.seed);

    let bump = contract.spot() * GREEKS_SPOT_BUMP;
    let up = contract.with_spot(contract.spot() + bump)?;
    let down = contract.with_spot(contract.spot() - bump)?;
    let price_up = price_monte_carlo(&up, paths, true, seed)?.price;
    let price_down = price_monte_carlo(&down, paths, true, seed)?.price;

    Ok(McGreeks {
        price: base.price,
        std_error: base.std_error,
        delta: (price_up - price_down) / (2.0 * bump),
        gamma: (price_up - 2.0 * base.price + price_down) / (bump * bump),
    })
}
