//! Black-Scholes Model
//!
//! Provides:
//! - European option pricing (closed form)
//! - Analytic Greeks (delta, gamma, vega, theta, rho, plus vanna and volga)
//!
//! With `d1 = (ln(S/K) + (r + σ²/2)T) / (σ√T)` and `d2 = d1 - σ√T`:
//!
//! ```text
//! call = S·N(d1) - K·e^(-rT)·N(d2)
//! put  = K·e^(-rT)·N(-d2) - S·N(-d1)
//! ```
//!
//! American contracts are rejected: early exercise has no closed form here,
//! use the binomial lattice instead.

use std::f64::consts::{PI, SQRT_2};

use statrs::function::erf::erfc;

use crate::core::{Greeks, OptionContract, OptionType, PricingError, PricingResult};

/// Standard normal CDF
///
/// Computed through the complementary error function: absolute error around
/// 1e-12, and no cancellation in the lower tail.
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal PDF
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Black-Scholes (d1, d2) for a contract
pub fn d1_d2(contract: &OptionContract) -> (f64, f64) {
    let vol = contract.volatility();
    let time = contract.time_to_maturity();
    let vol_sqrt_t = vol * time.sqrt();
    let drift = (contract.rate() + 0.5 * vol * vol) * time;
    let d1 = ((contract.spot() / contract.strike()).ln() + drift) / vol_sqrt_t;
    (d1, d1 - vol_sqrt_t)
}

/// Fail with a model-applicability error unless the contract is European
pub(crate) fn ensure_european(contract: &OptionContract, model: &str) -> PricingResult<()> {
    if !contract.is_european() {
        return Err(PricingError::model_applicability(format!(
            "{model} supports European exercise only, got {}",
            contract.exercise_style().label()
        )));
    }
    Ok(())
}

/// Black-Scholes European option price
pub fn price(contract: &OptionContract) -> PricingResult<f64> {
    ensure_european(contract, "Black-Scholes")?;

    let (d1, d2) = d1_d2(contract);
    let spot = contract.spot();
    let df = contract.discount_factor();
    let strike = contract.strike();

    let value = match contract.option_type() {
        OptionType::Call => spot * norm_cdf(d1) - strike * df * norm_cdf(d2),
        OptionType::Put => strike * df * norm_cdf(-d2) - spot * norm_cdf(-d1),
    };
    Ok(value)
}

/// Delta: N(d1) for calls, N(d1) - 1 for puts
pub fn delta(contract: &OptionContract) -> PricingResult<f64> {
    ensure_european(contract, "Black-Scholes")?;
    let (d1, _) = d1_d2(contract);
    Ok(match contract.option_type() {
        OptionType::Call => norm_cdf(d1),
        OptionType::Put => norm_cdf(d1) - 1.0,
    })
}

/// Gamma: φ(d1) / (S·σ·√T), same for calls and puts
pub fn gamma(contract: &OptionContract) -> PricingResult<f64> {
    ensure_european(contract, "Black-Scholes")?;
    let (d1, _) = d1_d2(contract);
    let sqrt_t = contract.time_to_maturity().sqrt();
    Ok(norm_pdf(d1) / (contract.spot() * contract.volatility() * sqrt_t))
}

/// Vega per unit of volatility: S·φ(d1)·√T, same for calls and puts
pub fn vega(contract: &OptionContract) -> PricingResult<f64> {
    ensure_european(contract, "Black-Scholes")?;
    let (d1, _) = d1_d2(contract);
    Ok(raw_vega(contract, d1))
}

/// Theta per year (dV/dt in calendar time)
pub fn theta(contract: &OptionContract) -> PricingResult<f64> {
    ensure_european(contract, "Black-Scholes")?;
    let (d1, d2) = d1_d2(contract);
    Ok(raw_theta(contract, d1, d2))
}

/// Rho per unit of rate
pub fn rho(contract: &OptionContract) -> PricingResult<f64> {
    ensure_european(contract, "Black-Scholes")?;
    let (_, d2) = d1_d2(contract);
    Ok(raw_rho(contract, d2))
}

/// All Greeks in one pass
pub fn greeks(contract: &OptionContract) -> PricingResult<Greeks> {
    ensure_european(contract, "Black-Scholes")?;

    let (d1, d2) = d1_d2(contract);
    let spot = contract.spot();
    let vol = contract.volatility();
    let sqrt_t = contract.time_to_maturity().sqrt();
    let pdf_d1 = norm_pdf(d1);

    let delta = match contract.option_type() {
        OptionType::Call => norm_cdf(d1),
        OptionType::Put => norm_cdf(d1) - 1.0,
    };
    let gamma = pdf_d1 / (spot * vol * sqrt_t);
    let vega = raw_vega(contract, d1);

    let mut greeks = Greeks::new(
        delta,
        gamma,
        raw_theta(contract, d1, d2),
        vega,
        raw_rho(contract, d2),
    );

    // Vanna: d(delta)/d(vol) = d(vega)/d(spot)
    greeks.vanna = Some(-pdf_d1 * d2 / vol);
    // Volga: d(vega)/d(vol)
    greeks.volga = Some(vega * d1 * d2 / vol);

    Ok(greeks)
}

fn raw_vega(contract: &OptionContract, d1: f64) -> f64 {
    contract.spot() * norm_pdf(d1) * contract.time_to_maturity().sqrt()
}

fn raw_theta(contract: &OptionContract, d1: f64, d2: f64) -> f64 {
    let spot = contract.spot();
    let strike = contract.strike();
    let rate = contract.rate();
    let df = contract.discount_factor();

    let sqrt_t = contract.time_to_maturity().sqrt();
    let decay = -spot * norm_pdf(d1) * contract.volatility() / (2.0 * sqrt_t);
    match contract.option_type() {
        OptionType::Call => decay - rate * strike * df * norm_cdf(d2),
        OptionType::Put => decay + rate * strike * df * norm_cdf(-d2),
    }
}

fn raw_rho(contract: &OptionContract, d2: f64) -> f64 {
    let k_t_df = contract.strike() * contract.time_to_maturity() * contract.discount_factor();
    match contract.option_type() {
        OptionType::Call => k_t_df * norm_cdf(d2),
        OptionType::Put => -k_t_df * norm_cdf(-d2),
    }
}
