//! Volatility smile and term structure
//!
//! Generates Black-Scholes call prices from known volatilities and inverts
//! them strike by strike (or maturity by maturity) through the implied
//! volatility solver. Seeded relative noise on the prices mimics quotes.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::core::{OptionContract, OptionType, PricingError, PricingResult};
use crate::models::{black_scholes, implied_volatility};

/// Gaussian price noise proportional to each price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceNoise {
    /// Standard deviation as a fraction of the price
    pub relative_std: f64,
    pub seed: Option<u64>,
}

impl Default for PriceNoise {
    fn default() -> Self {
        Self {
            relative_std: 0.05,
            seed: None,
        }
    }
}

/// Implied volatility across strikes at one maturity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolSmile {
    pub strikes: Vec<f64>,
    /// Prices actually inverted (after noise)
    pub prices: Vec<f64>,
    pub implied_vols: Vec<f64>,
}

/// Implied volatility across maturities at one strike
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermStructure {
    pub maturities: Vec<f64>,
    pub implied_vols: Vec<f64>,
}

fn european_call(
    spot: f64,
    strike: f64,
    rate: f64,
    vol: f64,
    time: f64,
) -> PricingResult<OptionContract> {
    OptionContract::european(spot, strike, rate, vol, time, OptionType::Call)
}

fn check_lengths(what: &str, a: usize, other: &str, b: usize) -> PricingResult<()> {
    if a != b {
        return Err(PricingError::invalid_parameter(format!(
            "{what} and {other} must have the same length, got {a} and {b}"
        )));
    }
    Ok(())
}

/// European call prices for each strike under a flat volatility
pub fn synthetic_call_prices(
    spot: f64,
    rate: f64,
    time_to_maturity: f64,
    strikes: &[f64],
    true_vol: f64,
) -> PricingResult<Vec<f64>> {
    strikes
        .iter()
        .map(|&k| black_scholes::price(&european_call(spot, k, rate, true_vol, time_to_maturity)?))
        .collect()
}

/// Invert each (strike, call price) pair to an implied volatility
pub fn recover_implied_vols(
    spot: f64,
    rate: f64,
    time_to_maturity: f64,
    strikes: &[f64],
    prices: &[f64],
) -> PricingResult<Vec<f64>> {
    check_lengths("strikes", strikes.len(), "prices", prices.len())?;
    strikes
        .iter()
        .zip(prices)
        .map(|(&k, &price)| {
            // Volatility field is a placeholder; the solver ignores it
            let contract = european_call(spot, k, rate, 0.2, time_to_maturity)?;
            implied_volatility(&contract, price)
        })
        .collect()
}

/// Price a flat-volatility smile, optionally perturb it, and recover the IVs
pub fn vol_smile(
    spot: f64,
    rate: f64,
    time_to_maturity: f64,
    strikes: &[f64],
    true_vol: f64,
    noise: Option<PriceNoise>,
) -> PricingResult<VolSmile> {
    let mut prices = synthetic_call_prices(spot, rate, time_to_maturity, strikes, true_vol)?;

    if let Some(noise) = noise {
        if !(noise.relative_std.is_finite() && noise.relative_std >= 0.0) {
            return Err(PricingError::invalid_parameter(format!(
                "noise level must be finite and non-negative, got {}",
                noise.relative_std
            )));
        }
        let normal = Normal::new(0.0, noise.relative_std).map_err(|e| {
            PricingError::invalid_parameter(format!(
                "invalid noise level {}: {e}",
                noise.relative_std
            ))
        })?;
        let seed = noise.seed.unwrap_or_else(rand::random::<u64>);
        tracing::debug!(seed, relative_std = noise.relative_std, "perturbing smile prices");

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for price in prices.iter_mut() {
            *price *= 1.0 + normal.sample(&mut rng);
        }
    }

    let implied_vols = recover_implied_vols(spot, rate, time_to_maturity, strikes, &prices)?;
    Ok(VolSmile {
        strikes: strikes.to_vec(),
        prices,
        implied_vols,
    })
}

/// Price an ATM-style call at each maturity with its own volatility and
/// recover the term structure
pub fn term_structure(
    spot: f64,
    strike: f64,
    rate: f64,
    maturities: &[f64],
    true_vols: &[f64],
) -> PricingResult<TermStructure> {
    check_lengths("maturities", maturities.len(), "volatilities", true_vols.len())?;
    let implied_vols = maturities
        .iter()
        .zip(true_vols)
        .map(|(&t, &vol)| {
            let contract = european_call(spot, strike, rate, vol, t)?;
            implied_volatility(&contract, black_scholes::price(&contract)?)
        })
        .collect::<PricingResult<Vec<_>>>()?;
    Ok(TermStructure {
        maturities: maturities.to_vec(),
        implied_vols,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRIKES: [f64; 5] = [90.0, 95.0, 100.0, 105.0, 110.0];

    #[test]
    fn test_flat_smile_recovers_true_vol() {
        let smile = vol_smile(100.0, 0.05, 1.0, &STRIKES, 0.20, None).unwrap();
        assert_eq!(smile.strikes, STRIKES.to_vec());
        for iv in &smile.implied_vols {
            assert!((iv - 0.20).abs() < 1e-6, "iv {iv}");
        }
    }

    #[test]
    fn test_noisy_smile_is_seeded() {
        let noise = PriceNoise {
            relative_std: 0.01,
            seed: Some(42),
        };
        let a = vol_smile(100.0, 0.05, 1.0, &STRIKES, 0.20, Some(noise)).unwrap();
        let b = vol_smile(100.0, 0.05, 1.0, &STRIKES, 0.20, Some(noise)).unwrap();
        assert_eq!(a, b);

        assert!(a.implied_vols.iter().any(|iv| (iv - 0.20).abs() > 1e-6));
        for iv in &a.implied_vols {
            assert!((iv - 0.20).abs() < 0.02, "iv {iv}");
        }
    }

    #[test]
    fn test_synthetic_prices_decrease_in_strike() {
        let prices = synthetic_call_prices(100.0, 0.05, 1.0, &STRIKES, 0.25).unwrap();
        assert!(prices.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_term_structure() {
        let maturities = [0.25, 0.5, 1.0, 2.0];
        let vols = [0.30, 0.27, 0.24, 0.22];
        let ts = term_structure(100.0, 100.0, 0.03, &maturities, &vols).unwrap();
        for (iv, vol) in ts.implied_vols.iter().zip(vols) {
            assert!((iv - vol).abs() < 1e-6);
        }
    }

    #[test]
    fn test_length_mismatch() {
        assert!(recover_implied_vols(100.0, 0.05, 1.0, &[90.0, 100.0], &[12.0])
            .unwrap_err()
            .is_invalid_parameter());
        assert!(term_structure(100.0, 100.0, 0.05, &[1.0], &[])
            .unwrap_err()
            .is_invalid_parameter());
    }

    #[test]
    fn test_bad_noise_level() {
        let noise = PriceNoise {
            relative_std: -1.0,
            seed: Some(1),
        };
        let err = vol_smile(100.0, 0.05, 1.0, &STRIKES, 0.2, Some(noise)).unwrap_err();
        assert!(err.is_invalid_parameter());

        let nan = PriceNoise {
            relative_std: f64::NAN,
            seed: Some(1),
        };
        assert!(vol_smile(100.0, 0.05, 1.0, &STRIKES, 0.2, Some(nan)).is_err());

        // Zero noise is allowed and leaves prices untouched
        let none = PriceNoise {
            relative_std: 0.0,
            seed: Some(1),
        };
        let smile = vol_smile(100.0, 0.05, 1.0, &STRIKES, 0.2, Some(none)).unwrap();
        for iv in &smile.implied_vols {
            assert!((iv - 0.20).abs() < 1e-6);
        }
    }
}
