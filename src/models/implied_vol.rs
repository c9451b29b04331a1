//! Implied Volatility Solver
//!
//! Inverts the Black-Scholes price for volatility in two explicit phases:
//!
//! 1. **Newton**: `σ ← σ - (BS(σ) - P) / vega(σ)` from the Brenner-Subrahmanyam
//!    guess `P / (0.4·S·√T)` (or a configured starting point).
//! 2. **Bisection** over `[min_vol, max_vol]`, entered once and never left, when
//!    a Newton step is non-finite, vega is below `min_vega`, the step leaves the
//!    volatility interval, the absolute residual stops decreasing, or the
//!    Newton budget runs out.
//!
//! Newton stops when the residual is below `tolerance` and the step below
//! `vol_tolerance`; bisection stops when the bracket is narrower than
//! `vol_tolerance`. A small price residual alone is not enough: deep in or
//! out of the money a wide range of volatilities reprices within `tolerance`.
//!
//! Prices outside the no-arbitrage band are rejected up front:
//!
//! ```text
//! call: max(0, S - K·e^(-rT)) < P < S
//! put:  max(0, K·e^(-rT) - S) < P < K·e^(-rT)
//! ```

use serde::{Deserialize, Serialize};

use super::black_scholes::{self, ensure_european, norm_cdf};
use crate::core::{OptionContract, OptionType, PricingError, PricingResult, SolverConfig};

/// Solver phase in which the root was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverPhase {
    Newton,
    Bisection,
}

/// Implied volatility together with solver diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IvSolution {
    pub volatility: f64,
    /// Total iterations across both phases
    pub iterations: usize,
    pub phase: SolverPhase,
    /// Model price minus market price at `volatility`
    pub residual: f64,
}

/// Implied volatility with default solver settings
pub fn implied_volatility(contract: &OptionContract, market_price: f64) -> PricingResult<f64> {
    implied_volatility_with(contract, market_price, &SolverConfig::default())
}

/// Implied volatility with explicit solver settings
pub fn implied_volatility_with(
    contract: &OptionContract,
    market_price: f64,
    config: &SolverConfig,
) -> PricingResult<f64> {
    Ok(solve_implied_volatility(contract, market_price, config)?.volatility)
}

/// No-arbitrage price band (exclusive) for a European contract
pub fn price_bounds(contract: &OptionContract) -> (f64, f64) {
    let spot = contract.spot();
    let pv_strike = contract.strike() * contract.discount_factor();
    match contract.option_type() {
        OptionType::Call => ((spot - pv_strike).max(0.0), spot),
        OptionType::Put => ((pv_strike - spot).max(0.0), pv_strike),
    }
}

/// Solve for the volatility that reproduces `market_price`.
///
/// The contract's own volatility is ignored. Fails with a convergence error
/// when the price is infeasible, not bracketed by the volatility interval,
/// too coarse to resolve the volatility to `vol_tolerance`, or the iteration
/// budget is exhausted.
pub fn solve_implied_volatility(
    contract: &OptionContract,
    market_price: f64,
    config: &SolverConfig,
) -> PricingResult<IvSolution> {
    ensure_european(contract, "implied volatility")?;
    config.validate()?;

    if !(market_price.is_finite() && market_price > 0.0) {
        return Err(PricingError::invalid_parameter(format!(
            "market price must be positive and finite, got {market_price}"
        )));
    }

    let (lower, upper) = price_bounds(contract);
    if market_price <= lower || market_price >= upper {
        return Err(PricingError::convergence(format!(
            "market price {market_price} is outside the no-arbitrage range ({lower}, {upper}) \
             for a {} option",
            contract.option_type().label()
        )));
    }

    let solver = Solver {
        contract,
        target: market_price,
        config,
    };

    let brenner_subrahmanyam =
        || market_price / (0.4 * contract.spot() * contract.time_to_maturity().sqrt());
    let guess = config
        .initial_guess
        .unwrap_or_else(brenner_subrahmanyam)
        .clamp(config.min_vol, config.max_vol);

    let (volatility, iterations, phase) = match solver.newton(guess)? {
        NewtonOutcome::Converged {
            volatility,
            iterations,
        } => (volatility, iterations, SolverPhase::Newton),
        NewtonOutcome::Abandoned {
            iterations,
            volatility,
            reason,
        } => {
            tracing::warn!(
                iterations,
                volatility,
                reason,
                "implied volatility: Newton abandoned, switching to bisection"
            );
            let (volatility, iterations) = solver.bisection(iterations)?;
            (volatility, iterations, SolverPhase::Bisection)
        }
    };

    let solution = solver.accept(volatility, iterations, phase)?;
    tracing::debug!(
        iterations,
        vol = solution.volatility,
        phase = ?phase,
        "implied volatility converged"
    );
    Ok(solution)
}

/// Smallest volatility change the f64 price of `contract` can register.
///
/// Each Black-Scholes leg carries about one ulp of rounding, so the price is
/// known to `ε·(asset leg + cash leg)`; dividing by vega converts that to
/// volatility.
fn volatility_resolution(contract: &OptionContract) -> PricingResult<f64> {
    let (d1, d2) = black_scholes::d1_d2(contract);
    let sign = match contract.option_type() {
        OptionType::Call => 1.0,
        OptionType::Put => -1.0,
    };
    let asset_leg = contract.spot() * norm_cdf(sign * d1);
    let cash_leg = contract.strike() * contract.discount_factor() * norm_cdf(sign * d2);
    Ok(f64::EPSILON * (asset_leg + cash_leg) / black_scholes::vega(contract)?)
}

enum NewtonOutcome {
    Converged {
        volatility: f64,
        iterations: usize,
    },
    Abandoned {
        iterations: usize,
        volatility: f64,
        reason: &'static str,
    },
}

struct Solver<'a> {
    contract: &'a OptionContract,
    target: f64,
    config: &'a SolverConfig,
}

impl Solver<'_> {
    fn residual(&self, vol: f64) -> PricingResult<f64> {
        let priced = self.contract.with_volatility(vol)?;
        Ok(black_scholes::price(&priced)? - self.target)
    }

    /// Newton converges only when both the price residual and the next
    /// volatility step are within tolerance.
    fn newton(&self, start: f64) -> PricingResult<NewtonOutcome> {
        let cfg = self.config;
        let mut vol = start;
        let mut last_abs = f64::INFINITY;

        for iteration in 0..cfg.max_newton_iterations {
            let priced = self.contract.with_volatility(vol)?;
            let residual = black_scholes::price(&priced)? - self.target;

            let abandon = |reason: &'static str| -> PricingResult<NewtonOutcome> {
                Ok(NewtonOutcome::Abandoned {
                    iterations: iteration + 1,
                    volatility: vol,
                    reason,
                })
            };

            if residual.abs() >= last_abs {
                return abandon("residual not decreasing");
            }
            last_abs = residual.abs();

            let vega = black_scholes::vega(&priced)?;
            if !(vega >= cfg.min_vega) {
                return abandon("vega below threshold");
            }

            let step = residual / vega;
            if !step.is_finite() {
                return abandon("non-finite step");
            }
            if residual.abs() < cfg.tolerance && step.abs() < cfg.vol_tolerance {
                return Ok(NewtonOutcome::Converged {
                    volatility: vol,
                    iterations: iteration + 1,
                });
            }

            let next = vol - step;
            if next < cfg.min_vol || next > cfg.max_vol {
                return abandon("step outside volatility interval");
            }
            vol = next;
        }

        Ok(NewtonOutcome::Abandoned {
            iterations: cfg.max_newton_iterations,
            volatility: vol,
            reason: "iteration budget exhausted",
        })
    }

    /// Halve `[min_vol, max_vol]` until it is narrower than `vol_tolerance`,
    /// then interpolate linearly inside the final bracket.
    fn bisection(&self, iterations_so_far: usize) -> PricingResult<(f64, usize)> {
        let cfg = self.config;
        let mut low = cfg.min_vol;
        let mut high = cfg.max_vol;

        // Price is increasing in volatility
        let mut f_low = self.residual(low)?;
        let mut f_high = self.residual(high)?;
        if f_low > 0.0 || f_high < 0.0 {
            return Err(PricingError::Convergence {
                message: format!(
                    "market price {} is not attainable for volatility in [{}, {}] \
                     (model prices {} to {})",
                    self.target,
                    low,
                    high,
                    f_low + self.target,
                    f_high + self.target
                ),
                iterations: iterations_so_far,
                last_estimate: None,
            });
        }

        for iteration in 0..cfg.max_bisection_iterations {
            let mid = 0.5 * (low + high);
            let f_mid = self.residual(mid)?;
            if f_mid > 0.0 {
                high = mid;
                f_high = f_mid;
            } else {
                low = mid;
                f_low = f_mid;
            }

            if f_mid == 0.0 || high - low < cfg.vol_tolerance {
                let span = f_high - f_low;
                let vol = if f_mid == 0.0 {
                    mid
                } else if span > 0.0 {
                    low - f_low * (high - low) / span
                } else {
                    0.5 * (low + high)
                };
                return Ok((vol, iterations_so_far + iteration + 1));
            }
        }

        Err(PricingError::Convergence {
            message: format!(
                "implied volatility bracket did not narrow below {} within {} bisection iterations",
                cfg.vol_tolerance, cfg.max_bisection_iterations
            ),
            iterations: iterations_so_far + cfg.max_bisection_iterations,
            last_estimate: Some(0.5 * (low + high)),
        })
    }

    /// Final checks on a root: price residual within `tolerance`, and a
    /// price sensitive enough to pin the volatility to `vol_tolerance`.
    fn accept(
        &self,
        volatility: f64,
        iterations: usize,
        phase: SolverPhase,
    ) -> PricingResult<IvSolution> {
        let cfg = self.config;
        let priced = self.contract.with_volatility(volatility)?;
        let residual = black_scholes::price(&priced)? - self.target;

        if !(residual.abs() < cfg.tolerance) {
            return Err(PricingError::Convergence {
                message: format!(
                    "price residual {residual:e} at volatility {volatility} exceeds tolerance {}",
                    cfg.tolerance
                ),
                iterations,
                last_estimate: Some(volatility),
            });
        }

        let resolution = volatility_resolution(&priced)?;
        if !(resolution <= cfg.vol_tolerance) {
            return Err(PricingError::Convergence {
                message: format!(
                    "market price {} only determines volatility to ±{resolution:.1e} \
                     near {volatility}, coarser than {}",
                    self.target, cfg.vol_tolerance
                ),
                iterations,
                last_estimate: Some(volatility),
            });
        }

        Ok(IvSolution {
            volatility,
            iterations,
            phase,
            residual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(
        spot: f64,
        strike: f64,
        rate: f64,
        vol: f64,
        time: f64,
        ty: OptionType,
    ) -> OptionContract {
        OptionContract::european(spot, strike, rate, vol, time, ty).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let cases = [
            (100.0, 100.0, 0.05, 0.20, 1.0),
            (100.0, 80.0, 0.05, 0.20, 1.0),
            (100.0, 120.0, 0.05, 0.20, 1.0),
            (100.0, 100.0, 0.05, 0.05, 1.0),
            (100.0, 100.0, 0.03, 1.50, 1.0),
            (100.0, 100.0, 0.05, 0.30, 0.05),
            (100.0, 110.0, 0.0, 0.25, 0.5),
            (50.0, 45.0, -0.01, 0.40, 2.0),
        ];
        for &(s, k, r, v, t) in &cases {
            for ty in [OptionType::Call, OptionType::Put] {
                let opt = contract(s, k, r, v, t, ty);
                let market = black_scholes::price(&opt).unwrap();
                // Start the solver from an unrelated volatility
                let unknown = opt.with_volatility(0.9).unwrap();
                let iv = implied_volatility(&unknown, market).unwrap();
                assert!(
                    (iv - v).abs() < 1e-6,
                    "{ty:?} S={s} K={k} vol={v} T={t}: recovered {iv}"
                );
            }
        }
    }

    #[test]
    fn test_round_trip_low_vega() {
        // Deep OTM call (price ~1e-11), deep ITM puts, short-dated wings
        let cases = [
            (100.0, 200.0, 0.05, 0.20, 0.25, OptionType::Call),
            (100.0, 170.0, 0.05, 0.20, 0.25, OptionType::Put),
            (100.0, 60.0, 0.05, 0.20, 0.25, OptionType::Put),
            (100.0, 60.0, 0.05, 0.20, 0.25, OptionType::Call),
            (100.0, 90.0, 0.05, 0.20, 0.02, OptionType::Put),
            (100.0, 115.0, 0.05, 0.20, 0.02, OptionType::Call),
        ];
        for &(s, k, r, v, t, ty) in &cases {
            let opt = contract(s, k, r, v, t, ty);
            let market = black_scholes::price(&opt).unwrap();
            let sol = solve_implied_volatility(&opt, market, &SolverConfig::default()).unwrap();
            assert!(
                (sol.volatility - v).abs() < 1e-6,
                "{ty:?} K={k} T={t}: recovered {} via {:?}",
                sol.volatility,
                sol.phase
            );
        }
    }

    #[test]
    fn test_tiny_price_does_not_accept_floor_guess() {
        // The target is below the price tolerance, so a residual test alone
        // would accept the clamped starting point
        let opt = contract(100.0, 200.0, 0.05, 0.20, 0.25, OptionType::Call);
        let market = black_scholes::price(&opt).unwrap();
        assert!(market < 1e-10);

        let sol = solve_implied_volatility(&opt, market, &SolverConfig::default()).unwrap();
        assert!(sol.volatility > 0.19 && sol.volatility < 0.21);
        assert!(sol.iterations > 1);
    }

    #[test]
    fn test_unresolvable_volatility_is_an_error() {
        // Deep ITM put: the time value (~1e-11) sits below the rounding of a
        // price near 97.5, so the volatility cannot be pinned down
        let opt = contract(100.0, 200.0, 0.05, 0.20, 0.25, OptionType::Put);
        let market = black_scholes::price(&opt).unwrap();
        let err = solve_implied_volatility(&opt, market, &SolverConfig::default()).unwrap_err();
        assert!(err.is_convergence(), "{err}");
    }

    #[test]
    fn test_atm_converges_in_newton_phase() {
        let opt = contract(100.0, 100.0, 0.05, 0.20, 1.0, OptionType::Call);
        let market = black_scholes::price(&opt).unwrap();
        let sol = solve_implied_volatility(&opt, market, &SolverConfig::default()).unwrap();

        assert_eq!(sol.phase, SolverPhase::Newton);
        assert!(sol.iterations < 10);
        assert!(sol.residual.abs() < 1e-10);
        assert!((sol.volatility - 0.20).abs() < 1e-8);
    }

    #[test]
    fn test_bad_start_falls_back_to_bisection() {
        let opt = contract(100.0, 100.0, 0.05, 0.20, 1.0, OptionType::Call);
        let market = black_scholes::price(&opt).unwrap();

        // At σ = 4.9 vega is tiny and the Newton step overshoots below zero
        let config = SolverConfig::default().with_initial_guess(4.9);
        let sol = solve_implied_volatility(&opt, market, &config).unwrap();

        assert_eq!(sol.phase, SolverPhase::Bisection);
        assert!((sol.volatility - 0.20).abs() < 1e-6);
    }

    #[test]
    fn test_bisection_only() {
        let opt = contract(100.0, 90.0, 0.02, 0.35, 0.75, OptionType::Put);
        let market = black_scholes::price(&opt).unwrap();
        let config = SolverConfig::default().with_max_iterations(0, 200);
        let sol = solve_implied_volatility(&opt, market, &config).unwrap();

        assert_eq!(sol.phase, SolverPhase::Bisection);
        assert!((sol.volatility - 0.35).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible_prices() {
        let call = contract(100.0, 80.0, 0.05, 0.20, 1.0, OptionType::Call);
        let put = call.with_option_type(OptionType::Put);

        // Above the spot ceiling
        assert!(implied_volatility(&call, 100.5).unwrap_err().is_convergence());
        // Below the discounted intrinsic floor (100 - 80e^-0.05 ≈ 23.90)
        let err = implied_volatility(&call, 20.0).unwrap_err();
        assert!(err.is_convergence());
        assert!(err.to_string().contains("no-arbitrage"));
        // Put above the discounted strike
        assert!(implied_volatility(&put, 80.0).unwrap_err().is_convergence());

        assert!(implied_volatility(&call, 0.0).unwrap_err().is_invalid_parameter());
        assert!(implied_volatility(&call, -1.0).unwrap_err().is_invalid_parameter());
        assert!(implied_volatility(&call, f64::NAN).unwrap_err().is_invalid_parameter());
    }

    #[test]
    fn test_price_not_bracketed() {
        // Feasible in principle, but needs far more than the 5.0 volatility cap
        let call = contract(100.0, 100.0, 0.0, 0.20, 1.0, OptionType::Call);
        let err = implied_volatility(&call, 99.9).unwrap_err();
        assert!(err.is_convergence());
        assert!(err.to_string().contains("not attainable"));
    }

    #[test]
    fn test_iteration_budget_exhausted() {
        let opt = contract(100.0, 100.0, 0.05, 0.20, 1.0, OptionType::Call);
        let market = black_scholes::price(&opt).unwrap();
        let config = SolverConfig::default().with_max_iterations(0, 5);

        match solve_implied_volatility(&opt, market, &config) {
            Err(PricingError::Convergence {
                iterations,
                last_estimate,
                ..
            }) => {
                assert_eq!(iterations, 5);
                assert!(last_estimate.is_some());
            }
            other => panic!("expected convergence error, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_american() {
        let opt = OptionContract::american(100.0, 100.0, 0.05, 0.2, 1.0, OptionType::Put).unwrap();
        let err = implied_volatility(&opt, 6.0).unwrap_err();
        assert!(err.is_model_applicability());
    }

    #[test]
    fn test_price_bounds() {
        let call = contract(100.0, 100.0, 0.05, 0.2, 1.0, OptionType::Call);
        let (lo, hi) = price_bounds(&call);
        assert!((lo - (100.0 - 100.0 * (-0.05_f64).exp())).abs() < 1e-12);
        assert_eq!(hi, 100.0);

        let put = call.with_option_type(OptionType::Put);
        let (lo, hi) = price_bounds(&put);
        assert_eq!(lo, 0.0);
        assert!((hi - 100.0 * (-0.05_f64).exp()).abs() < 1e-12);
    }
}
