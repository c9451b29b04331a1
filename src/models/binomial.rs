//! Cox-Ross-Rubinstein Binomial Lattice
//!
//! Partitions the life of the option into `N` steps of `Δt = T/N` with
//!
//! ```text
//! u = e^(σ√Δt),  d = 1/u,  p = (e^(rΔt) - d) / (u - d)
//! ```
//!
//! Because `d = 1/u` the tree recombines: layer `i` has `i + 1` nodes and the
//! node with `j` up-moves sits at `S·u^(2j - i)`. Option values are rolled back
//! from the terminal payoff in a single buffer of `N + 1` values; American
//! exercise compares continuation against intrinsic value at every node.
//!
//! European prices converge to Black-Scholes as `N → ∞` with the usual
//! odd/even oscillation.

use serde::Serialize;

use crate::core::{ExerciseStyle, OptionContract, OptionType, PricingError, PricingResult};

/// Per-step parameters of a CRR lattice
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrrParameters {
    /// Number of time steps
    pub steps: usize,
    /// Step length Δt in years
    pub dt: f64,
    /// Up factor u
    pub up: f64,
    /// Down factor d = 1/u
    pub down: f64,
    /// Risk-neutral up probability p
    pub probability: f64,
    /// One-step discount factor e^(-rΔt)
    pub discount: f64,
}

impl CrrParameters {
    /// Derive lattice parameters, rejecting `steps == 0` and any risk-neutral
    /// probability outside the open interval (0, 1).
    pub fn new(contract: &OptionContract, steps: usize) -> PricingResult<Self> {
        if steps == 0 {
            return Err(PricingError::invalid_parameter(
                "binomial steps must be >= 1, got 0",
            ));
        }

        let dt = contract.time_to_maturity() / steps as f64;
        let up = (contract.volatility() * dt.sqrt()).exp();
        let down = 1.0 / up;
        let growth = (contract.rate() * dt).exp();
        let probability = (growth - down) / (up - down);

        if !probability.is_finite() || probability <= 0.0 || probability >= 1.0 {
            return Err(PricingError::invalid_parameter(format!(
                "risk-neutral probability {probability} is outside (0, 1) \
                 (steps = {steps}, u = {up}, growth = {growth}); increase the step count"
            )));
        }

        Ok(Self {
            steps,
            dt,
            up,
            down,
            probability,
            discount: 1.0 / growth,
        })
    }

    /// Underlying price at layer `step` after `ups` up-moves
    pub fn node_price(&self, spot: f64, step: usize, ups: usize) -> f64 {
        spot * self.up.powi(2 * ups as i32 - step as i32)
    }
}

/// Price an option on a CRR lattice with `steps` time steps.
///
/// Supports European and American exercise for both calls and puts.
pub fn price_binomial(contract: &OptionContract, steps: usize) -> PricingResult<f64> {
    roll_back(contract, steps, None)
}

/// Early exercise boundary of an American option.
///
/// Element `i` is the critical underlying price at time step `i` (`0..steps`):
/// the highest node where exercising a put is optimal, or the lowest such node
/// for a call. `None` marks steps with no optimal exercise. European contracts
/// return an empty vector.
pub fn early_exercise_boundary(
    contract: &OptionContract,
    steps: usize,
) -> PricingResult<Vec<Option<f64>>> {
    if contract.exercise_style() != ExerciseStyle::American {
        return Ok(Vec::new());
    }
    let mut boundary = Vec::with_capacity(steps);
    roll_back(contract, steps, Some(&mut boundary))?;
    boundary.reverse();
    Ok(boundary)
}

fn roll_back(
    contract: &OptionContract,
    steps: usize,
    mut boundary: Option<&mut Vec<Option<f64>>>,
) -> PricingResult<f64> {
    let params = CrrParameters::new(contract, steps)?;
    tracing::debug!(
        steps,
        up = params.up,
        probability = params.probability,
        "CRR lattice"
    );

    let spot = contract.spot();
    let strike = contract.strike();
    let option_type = contract.option_type();
    let american = contract.exercise_style() == ExerciseStyle::American;
    let p = params.probability;
    let q = 1.0 - p;
    let disc = params.discount;

    // Terminal layer
    let mut values: Vec<f64> = (0..=steps)
        .map(|j| option_type.intrinsic(params.node_price(spot, steps, j), strike))
        .collect();

    for i in (0..steps).rev() {
        let mut critical: Option<f64> = None;

        for j in 0..=i {
            let continuation = disc * (p * values[j + 1] + q * values[j]);
            values[j] = if american {
                let node = params.node_price(spot, i, j);
                let exercise = option_type.intrinsic(node, strike);
                if exercise > continuation {
                    // Puts: keep the highest exercising node; calls: the lowest
                    critical = Some(match (option_type, critical) {
                        (OptionType::Put, Some(c)) => c.max(node),
                        (OptionType::Call, Some(c)) => c.min(node),
                        (_, None) => node,
                    });
                    exercise
                } else {
                    continuation
                }
            } else {
                continuation
            };
        }

        if let Some(b) = boundary.as_deref_mut() {
            b.push(critical);
        }
    }

    Ok(values[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::black_scholes;

    fn european(
        spot: f64,
        strike: f64,
        rate: f64,
        vol: f64,
        time: f64,
        ty: OptionType,
    ) -> OptionContract {
        OptionContract::european(spot, strike, rate, vol, time, ty).unwrap()
    }

    fn american(
        spot: f64,
        strike: f64,
        rate: f64,
        vol: f64,
        time: f64,
        ty: OptionType,
    ) -> OptionContract {
        OptionContract::american(spot, strike, rate, vol, time, ty).unwrap()
    }

    #[test]
    fn test_crr_parameters() {
        let opt = european(100.0, 100.0, 0.05, 0.20, 1.0, OptionType::Call);
        let params = CrrParameters::new(&opt, 100).unwrap();

        assert!((params.dt - 0.01).abs() < 1e-15);
        assert!((params.up * params.down - 1.0).abs() < 1e-15);
        assert!(params.probability > 0.0 && params.probability < 1.0);
        // Recombination: up then down returns to spot
        assert!((params.node_price(100.0, 2, 1) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_matches_black_scholes_at_500_steps() {
        for &(s, k, r, v, t) in &[
            (100.0, 100.0, 0.05, 0.20, 1.0),
            (100.0, 80.0, 0.03, 0.25, 0.5),
            (100.0, 130.0, 0.01, 0.35, 2.0),
            (50.0, 55.0, -0.01, 0.15, 0.25),
            (100.0, 90.0, 0.0, 0.40, 1.5),
        ] {
            for ty in [OptionType::Call, OptionType::Put] {
                let opt = european(s, k, r, v, t, ty);
                let lattice = price_binomial(&opt, 500).unwrap();
                let analytic = black_scholes::price(&opt).unwrap();
                assert!(
                    (lattice - analytic).abs() < 1e-2,
                    "{ty:?} S={s} K={k}: lattice {lattice} vs analytic {analytic}"
                );
            }
        }
    }

    #[test]
    fn test_reference_scenario() {
        let call = european(100.0, 100.0, 0.05, 0.20, 1.0, OptionType::Call);
        assert!((price_binomial(&call, 200).unwrap() - 10.45).abs() < 0.015);

        let put = american(100.0, 100.0, 0.05, 0.20, 1.0, OptionType::Put);
        let am = price_binomial(&put, 200).unwrap();
        assert!((am - 6.09).abs() < 0.01, "American put {am}");
    }

    #[test]
    fn test_error_shrinks_with_steps() {
        let opt = european(100.0, 100.0, 0.05, 0.20, 1.0, OptionType::Call);
        let analytic = black_scholes::price(&opt).unwrap();
        let errors: Vec<f64> = [10, 50, 200, 1000]
            .iter()
            .map(|&n| (price_binomial(&opt, n).unwrap() - analytic).abs())
            .collect();

        for pair in errors.windows(2) {
            assert!(pair[1] < pair[0], "errors not shrinking: {errors:?}");
        }
    }

    #[test]
    fn test_american_put_early_exercise_premium() {
        for &(s, k, v, t) in &[
            (100.0, 100.0, 0.20, 1.0),
            (80.0, 100.0, 0.25, 0.5),
            (120.0, 100.0, 0.30, 2.0),
        ] {
            let am = price_binomial(&american(s, k, 0.05, v, t, OptionType::Put), 200).unwrap();
            let eu = black_scholes::price(&european(s, k, 0.05, v, t, OptionType::Put)).unwrap();
            assert!(am >= eu, "American {am} < European {eu}");
        }

        // Deep ITM: premium is material and the price never drops below intrinsic
        let deep = american(60.0, 100.0, 0.05, 0.20, 1.0, OptionType::Put);
        let am = price_binomial(&deep, 200).unwrap();
        let eu = black_scholes::price(&deep.with_exercise_style(ExerciseStyle::European)).unwrap();
        assert!(am >= 40.0 - 1e-12);
        assert!(am - eu > 0.5);
    }

    #[test]
    fn test_american_call_equals_european_without_dividends() {
        for &k in &[80.0, 100.0, 120.0] {
            let am = price_binomial(&american(100.0, k, 0.05, 0.25, 1.0, OptionType::Call), 300)
                .unwrap();
            let eu = price_binomial(&european(100.0, k, 0.05, 0.25, 1.0, OptionType::Call), 300)
                .unwrap();
            assert!((am - eu).abs() < 1e-10);
        }
    }

    #[test]
    fn test_bounds_and_monotonicity() {
        let mut last_call = 0.0;
        let mut last_put = f64::INFINITY;
        for s in [80.0, 90.0, 100.0, 110.0, 120.0] {
            let call =
                price_binomial(&american(s, 100.0, 0.05, 0.2, 1.0, OptionType::Call), 100).unwrap();
            let put =
                price_binomial(&american(s, 100.0, 0.05, 0.2, 1.0, OptionType::Put), 100).unwrap();
            assert!(call > last_call && call <= s);
            assert!(put < last_put && put <= 100.0);
            last_call = call;
            last_put = put;
        }
    }

    #[test]
    fn test_single_step() {
        let opt = european(100.0, 100.0, 0.05, 0.20, 1.0, OptionType::Call);
        let params = CrrParameters::new(&opt, 1).unwrap();
        let expected = params.discount * params.probability * (100.0 * params.up - 100.0);
        assert!((price_binomial(&opt, 1).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_parameters() {
        let opt = european(100.0, 100.0, 0.05, 0.20, 1.0, OptionType::Call);
        assert!(price_binomial(&opt, 0).unwrap_err().is_invalid_parameter());

        // e^(rΔt) > u: probability above one must be reported, not clamped
        let high_rate = european(100.0, 100.0, 0.5, 0.05, 1.0, OptionType::Call);
        let err = price_binomial(&high_rate, 1).unwrap_err();
        assert!(err.is_invalid_parameter());
        assert!(err.to_string().contains("probability"));
    }

    #[test]
    fn test_early_exercise_boundary() {
        let put = american(100.0, 100.0, 0.05, 0.20, 1.0, OptionType::Put);
        let boundary = early_exercise_boundary(&put, 100).unwrap();
        assert_eq!(boundary.len(), 100);

        // Near expiry exercise is optimal just below the strike
        let last = boundary.last().copied().flatten().unwrap();
        assert!(last < 100.0 && last > 90.0);
        for b in boundary.iter().flatten() {
            assert!(*b < 100.0);
        }

        let eu = put.with_exercise_style(ExerciseStyle::European);
        assert!(early_exercise_boundary(&eu, 100).unwrap().is_empty());
    }
}
