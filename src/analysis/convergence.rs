//! Convergence studies
//!
//! Tracks how the lattice and Monte Carlo prices approach the analytic
//! benchmark as resolution grows.

use serde::Serialize;

use crate::core::{OptionContract, PricingResult};
use crate::models::{black_scholes, price_binomial, price_monte_carlo};

/// One resolution level of a convergence study
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConvergencePoint {
    /// Lattice steps or Monte Carlo paths
    pub resolution: usize,
    pub price: f64,
    /// price - benchmark
    pub error: f64,
    /// Monte Carlo only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_error: Option<f64>,
}

/// Prices at increasing resolution against the Black-Scholes benchmark
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvergenceReport {
    pub benchmark: f64,
    pub points: Vec<ConvergencePoint>,
}

impl ConvergenceReport {
    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn errors(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.error).collect()
    }

    /// Monte Carlo standard errors (empty for lattice studies)
    pub fn std_errors(&self) -> Vec<f64> {
        self.points.iter().filter_map(|p| p.std_error).collect()
    }

    /// Absolute error at the finest resolution
    pub fn final_abs_error(&self) -> Option<f64> {
        self.points.last().map(|p| p.error.abs())
    }
}

/// Lattice prices for each step count (European contracts only)
pub fn binomial_convergence(
    contract: &OptionContract,
    steps_list: &[usize],
) -> PricingResult<ConvergenceReport> {
    let benchmark = black_scholes::price(contract)?;
    let points = steps_list
        .iter()
        .map(|&steps| -> PricingResult<ConvergencePoint> {
            let price = price_binomial(contract, steps)?;
            Ok(ConvergencePoint {
                resolution: steps,
                price,
                error: price - benchmark,
                std_error: None,
            })
        })
        .collect::<PricingResult<Vec<_>>>()?;
    Ok(ConvergenceReport { benchmark, points })
}

/// Antithetic Monte Carlo prices for each path count, all with one seed
pub fn monte_carlo_convergence(
    contract: &OptionContract,
    paths_list: &[usize],
    seed: u64,
) -> PricingResult<ConvergenceReport> {
    let benchmark = black_scholes::price(contract)?;
    let points = paths_list
        .iter()
        .map(|&paths| -> PricingResult<ConvergencePoint> {
            let est = price_monte_carlo(contract, paths, true, Some(seed))?;
            Ok(ConvergencePoint {
                resolution: paths,
                price: est.price,
                error: est.price - benchmark,
                std_error: Some(est.std_error),
            })
        })
        .collect::<PricingResult<Vec<_>>>()?;
    Ok(ConvergenceReport { benchmark, points })
}

/// Lattice and Monte Carlo studies of one contract
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvergenceStudy {
    pub binomial: ConvergenceReport,
    pub monte_carlo: ConvergenceReport,
}

/// Default lattice step counts for `convergence_study`
pub const DEFAULT_STEPS: [usize; 6] = [10, 25, 50, 100, 200, 500];
/// Default Monte Carlo path counts for `convergence_study`
pub const DEFAULT_PATHS: [usize; 5] = [1_000, 5_000, 10_000, 50_000, 100_000];

pub fn convergence_study(
    contract: &OptionContract,
    steps_list: &[usize],
    paths_list: &[usize],
    seed: u64,
) -> PricingResult<ConvergenceStudy> {
    Ok(ConvergenceStudy {
        binomial: binomial_convergence(contract, steps_list)?,
        monte_carlo: monte_carlo_convergence(contract, paths_list, seed)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OptionType;

    fn atm_call() -> OptionContract {
        OptionContract::european(100.0, 100.0, 0.05, 0.20, 1.0, OptionType::Call).unwrap()
    }

    #[test]
    fn test_binomial_convergence() {
        let report = binomial_convergence(&atm_call(), &[10, 50, 100]).unwrap();
        assert!((report.benchmark - 10.4506).abs() < 1e-4);
        assert_eq!(report.points.len(), 3);
        assert!(report.std_errors().is_empty());

        let errors = report.errors();
        assert!(errors[2].abs() < errors[0].abs());
        assert!(report.final_abs_error().unwrap() < 0.05);
    }

    #[test]
    fn test_monte_carlo_convergence() {
        let report = monte_carlo_convergence(&atm_call(), &[1_000, 10_000, 100_000], 42).unwrap();
        let ses = report.std_errors();
        assert_eq!(ses.len(), 3);
        assert!(ses[2] < ses[1] && ses[1] < ses[0]);
        for p in &report.points {
            assert!(p.error.abs() < 4.0 * p.std_error.unwrap());
        }
    }

    #[test]
    fn test_study_and_errors() {
        let study = convergence_study(&atm_call(), &DEFAULT_STEPS, &[2_000, 20_000], 7).unwrap();
        assert_eq!(study.binomial.points.len(), DEFAULT_STEPS.len());
        assert_eq!(study.binomial.benchmark, study.monte_carlo.benchmark);

        assert!(binomial_convergence(&atm_call(), &[10, 0]).unwrap_err().is_invalid_parameter());
        assert!(monte_carlo_convergence(&atm_call(), &[1_001], 1).is_err());

        let american =
            OptionContract::american(100.0, 100.0, 0.05, 0.2, 1.0, OptionType::Put).unwrap();
        assert!(binomial_convergence(&american, &[10]).unwrap_err().is_model_applicability());
    }
}
