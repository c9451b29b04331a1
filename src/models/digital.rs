//! Cash-or-Nothing Digital Options
//!
//! Pays a fixed `payout` at expiry if the option finishes in the money:
//!
//! ```text
//! digital call = payout·e^(-rT)·N(d2)
//! digital put  = payout·e^(-rT)·N(-d2)
//! ```
//!
//! The Monte Carlo variant reuses the vanilla simulator with a
//! `Payoff::CashOrNothing` payoff. Antithetic pairing is not used: the
//! indicator payoff is not monotone enough for it to help reliably.

use super::black_scholes::{d1_d2, ensure_european, norm_cdf, norm_pdf};
use super::monte_carlo::{price_payoff_monte_carlo, McEstimate, Payoff};
use crate::core::{MonteCarloConfig, OptionContract, OptionType, PricingError, PricingResult};

fn check_payout(payout: f64) -> PricingResult<()> {
    if !(payout.is_finite() && payout > 0.0) {
        return Err(PricingError::invalid_parameter(format!(
            "payout must be positive, got {payout}"
        )));
    }
    Ok(())
}

/// Closed-form price of a European cash-or-nothing digital
pub fn price_digital_black_scholes(contract: &OptionContract, payout: f64) -> PricingResult<f64> {
    ensure_european(contract, "digital pricing")?;
    check_payout(payout)?;

    let (_, d2) = d1_d2(contract);
    let df = contract.discount_factor();
    Ok(match contract.option_type() {
        OptionType::Call => payout * df * norm_cdf(d2),
        OptionType::Put => payout * df * norm_cdf(-d2),
    })
}

/// Monte Carlo price of a European cash-or-nothing digital
pub fn price_digital_monte_carlo(
    contract: &OptionContract,
    payout: f64,
    paths: usize,
    seed: Option<u64>,
) -> PricingResult<McEstimate> {
    ensure_european(contract, "digital pricing")?;
    check_payout(payout)?;

    let payoff = Payoff::CashOrNothing {
        option_type: contract.option_type(),
        payout,
    };
    let config = MonteCarloConfig {
        paths,
        antithetic: false,
        seed,
        ..Default::default()
    };
    price_payoff_monte_carlo(contract, payoff, &config)
}

/// Delta of a cash-or-nothing digital.
///
/// Spikes near the strike as expiry approaches.
pub fn digital_delta(contract: &OptionContract, payout: f64) -> PricingResult<f64> {
    ensure_european(contract, "digital pricing")?;
    check_payout(payout)?;

    let (_, d2) = d1_d2(contract);
    let sensitivity = payout * contract.discount_factor() * norm_pdf(d2)
        / (contract.spot() * contract.volatility() * contract.time_to_maturity().sqrt());
    Ok(match contract.option_type() {
        OptionType::Call => sensitivity,
        OptionType::Put => -sensitivity,
    })
}
