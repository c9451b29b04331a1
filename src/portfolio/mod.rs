//! Option Portfolios
//!
//! Aggregates signed positions and stress-tests them:
//! - Portfolio value and net Greeks (quantity-weighted sums)
//! - Spot/volatility scenario grids of P&L against the unshocked value
//! - Synthetic forward construction (long call + short put)
//!
//! Valuation is analytic, so every position must be European.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::core::{OptionContract, OptionType, PortfolioGreeks, PricingError, PricingResult};
use crate::models::black_scholes;

/// A signed holding of one contract (negative quantity = short)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub contract: OptionContract,
    pub quantity: f64,
}

impl Position {
    pub fn new(contract: OptionContract, quantity: f64) -> Self {
        Self { contract, quantity }
    }

    pub fn long(contract: OptionContract, quantity: f64) -> Self {
        Self::new(contract, quantity.abs())
    }

    pub fn short(contract: OptionContract, quantity: f64) -> Self {
        Self::new(contract, -quantity.abs())
    }
}

/// A non-empty collection of positions
#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    positions: Vec<Position>,
}

impl Portfolio {
    /// Rejects an empty list and non-finite quantities
    pub fn new(positions: Vec<Position>) -> PricingResult<Self> {
        if positions.is_empty() {
            return Err(PricingError::invalid_parameter(
                "portfolio must have at least one position",
            ));
        }
        if let Some(bad) = positions.iter().find(|p| !p.quantity.is_finite()) {
            return Err(PricingError::invalid_parameter(format!(
                "position quantity must be finite, got {}",
                bad.quantity
            )));
        }
        Ok(Self { positions })
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Copy of the portfolio with every contract shifted by the given shocks
    fn shocked(&self, spot_shock: f64, vol_shock: f64) -> PricingResult<Portfolio> {
        let positions = self
            .positions
            .iter()
            .map(|p| -> PricingResult<Position> {
                let c = p.contract;
                let shocked = c
                    .with_spot(c.spot() + spot_shock)?
                    .with_volatility(c.volatility() + vol_shock)?;
                Ok(Position::new(shocked, p.quantity))
            })
            .collect::<PricingResult<Vec<_>>>()?;
        Ok(Portfolio { positions })
    }
}

/// Total value: Σ quantity × Black-Scholes price
pub fn portfolio_price(portfolio: &Portfolio) -> PricingResult<f64> {
    let mut total = 0.0;
    for p in &portfolio.positions {
        total += p.quantity * black_scholes::price(&p.contract)?;
    }
    Ok(total)
}

/// Net Greeks: Σ quantity × per-contract Greeks
pub fn portfolio_greeks(portfolio: &Portfolio) -> PricingResult<PortfolioGreeks> {
    let mut total = PortfolioGreeks::new();
    for p in &portfolio.positions {
        total.add_position(&black_scholes::greeks(&p.contract)?, p.quantity);
    }
    Ok(total)
}

/// P&L grid over absolute spot and volatility shocks
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioGrid {
    /// Row labels: absolute spot shifts
    pub spot_shocks: Vec<f64>,
    /// Column labels: absolute volatility shifts
    pub vol_shocks: Vec<f64>,
    /// Unshocked portfolio value
    pub base_value: f64,
    /// Shocked portfolio value [spot shock, vol shock]
    pub values: Array2<f64>,
    /// values - base_value
    pub pnl: Array2<f64>,
}

impl ScenarioGrid {
    pub fn pnl_at(&self, spot_shock: usize, vol_shock: usize) -> Option<f64> {
        self.pnl.get((spot_shock, vol_shock)).copied()
    }

    /// Worst P&L and its (spot shock, vol shock)
    pub fn worst_case(&self) -> (f64, f64, f64) {
        let mut worst = (f64::INFINITY, 0.0, 0.0);
        for ((i, j), &pnl) in self.pnl.indexed_iter() {
            if pnl < worst.0 {
                worst = (pnl, self.spot_shocks[i], self.vol_shocks[j]);
            }
        }
        worst
    }
}

/// Revalue the portfolio on every (spot shock, vol shock) pair.
///
/// Shocks that push any contract to a non-positive spot or volatility are a
/// parameter error; they are not clamped.
pub fn scenario_pnl(
    portfolio: &Portfolio,
    spot_shocks: &[f64],
    vol_shocks: &[f64],
) -> PricingResult<ScenarioGrid> {
    if spot_shocks.is_empty() || vol_shocks.is_empty() {
        return Err(PricingError::invalid_parameter(
            "scenario grid needs at least one spot shock and one vol shock",
        ));
    }

    let base_value = portfolio_price(portfolio)?;
    let mut values = Array2::<f64>::zeros((spot_shocks.len(), vol_shocks.len()));

    for (i, &ds) in spot_shocks.iter().enumerate() {
        for (j, &dv) in vol_shocks.iter().enumerate() {
            let shocked = portfolio.shocked(ds, dv).map_err(|e| {
                PricingError::invalid_parameter(format!(
                    "scenario (spot {ds:+}, vol {dv:+}) is invalid: {e}"
                ))
            })?;
            values[[i, j]] = portfolio_price(&shocked)?;
        }
    }

    tracing::debug!(
        rows = spot_shocks.len(),
        cols = vol_shocks.len(),
        base_value,
        "scenario grid computed"
    );

    let pnl = values.mapv(|v| v - base_value);
    Ok(ScenarioGrid {
        spot_shocks: spot_shocks.to_vec(),
        vol_shocks: vol_shocks.to_vec(),
        base_value,
        values,
        pnl,
    })
}

/// Long call plus short put at one strike; worth `S - K·e^(-rT)`
pub fn synthetic_forward(
    spot: f64,
    strike: f64,
    rate: f64,
    volatility: f64,
    time_to_maturity: f64,
) -> PricingResult<Portfolio> {
    let call = OptionContract::european(
        spot,
        strike,
        rate,
        volatility,
        time_to_maturity,
        OptionType::Call,
    )?;
    let put = call.with_option_type(OptionType::Put);
    Portfolio::new(vec![Position::long(call, 1.0), Position::short(put, 1.0)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(strike: f64) -> OptionContract {
        OptionContract::european(100.0, strike, 0.05, 0.20, 1.0, OptionType::Call).unwrap()
    }

    #[test]
    fn test_empty_portfolio_rejected() {
        assert!(Portfolio::new(vec![]).unwrap_err().is_invalid_parameter());
        assert!(Portfolio::new(vec![Position::new(call(100.0), f64::NAN)]).is_err());
    }

    #[test]
    fn test_price_is_quantity_weighted() {
        let single = black_scholes::price(&call(100.0)).unwrap();
        let book = Portfolio::new(vec![
            Position::long(call(100.0), 10.0),
            Position::short(call(100.0), 4.0),
        ])
        .unwrap();
        assert!((portfolio_price(&book).unwrap() - 6.0 * single).abs() < 1e-10);
    }

    #[test]
    fn test_greeks_aggregate() {
        let book = Portfolio::new(vec![
            Position::long(call(100.0), 2.0),
            Position::short(call(110.0), 1.0),
        ])
        .unwrap();
        let g = portfolio_greeks(&book).unwrap();
        let a = black_scholes::greeks(&call(100.0)).unwrap();
        let b = black_scholes::greeks(&call(110.0)).unwrap();

        assert_eq!(g.num_positions, 2);
        assert!((g.net.delta - (2.0 * a.delta - b.delta)).abs() < 1e-12);
        assert!((g.net.vega - (2.0 * a.vega - b.vega)).abs() < 1e-12);
        assert!((g.net.theta - (2.0 * a.theta - b.theta)).abs() < 1e-12);
    }

    #[test]
    fn test_synthetic_forward() {
        let fwd = synthetic_forward(100.0, 95.0, 0.05, 0.3, 0.5).unwrap();
        let value = portfolio_price(&fwd).unwrap();
        assert!((value - (100.0 - 95.0 * (-0.025_f64).exp())).abs() < 1e-9);

        // Pure delta-one exposure
        let g = portfolio_greeks(&fwd).unwrap();
        assert!((g.net.delta - 1.0).abs() < 1e-12);
        assert!(g.net.gamma.abs() < 1e-12);
        assert!(g.net.vega.abs() < 1e-9);
    }

    #[test]
    fn test_scenario_grid() {
        let book = Portfolio::new(vec![Position::long(call(100.0), 1.0)]).unwrap();
        let spots = [-10.0, 0.0, 10.0];
        let vols = [-0.05, 0.0, 0.05];
        let grid = scenario_pnl(&book, &spots, &vols).unwrap();

        assert_eq!(grid.pnl.dim(), (3, 3));
        assert!(grid.pnl_at(1, 1).unwrap().abs() < 1e-12);
        // Long call gains with spot and with vol
        assert!(grid.pnl[[2, 1]] > 0.0 && grid.pnl[[0, 1]] < 0.0);
        assert!(grid.pnl[[1, 2]] > 0.0 && grid.pnl[[1, 0]] < 0.0);
        assert_eq!(grid.worst_case().1, -10.0);
        assert_eq!(grid.worst_case().2, -0.05);
        assert!(grid.pnl_at(3, 0).is_none());
    }

    #[test]
    fn test_invalid_scenarios_are_errors() {
        let book = Portfolio::new(vec![Position::long(call(100.0), 1.0)]).unwrap();
        assert!(scenario_pnl(&book, &[-150.0], &[0.0]).unwrap_err().is_invalid_parameter());
        assert!(scenario_pnl(&book, &[0.0], &[-0.25]).unwrap_err().is_invalid_parameter());
        assert!(scenario_pnl(&book, &[], &[0.0]).is_err());
    }

    #[test]
    fn test_american_position_rejected() {
        let american =
            OptionContract::american(100.0, 100.0, 0.05, 0.2, 1.0, OptionType::Put).unwrap();
        let book = Portfolio::new(vec![Position::long(american, 1.0)]).unwrap();
        assert!(portfolio_price(&book).unwrap_err().is_model_applicability());
        assert!(portfolio_greeks(&book).unwrap_err().is_model_applicability());
    }
}
