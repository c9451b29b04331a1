//! Option Greeks
//!
//! Conventions used throughout the crate:
//! - theta is dV/dt in calendar time, **per year** (negative for a decaying long option)
//! - vega and rho are per unit change (1.00 = 100 vol or rate points)
//!
//! Use `theta_per_day`, `vega_per_point` and `rho_per_point` for the
//! desk-style scalings.

use serde::{Deserialize, Serialize};

/// Calendar days used by `theta_per_day`
pub const DAYS_PER_YEAR_THETA: f64 = 365.0;

/// Option Greeks (sensitivities)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    /// Delta: dV/dS
    pub delta: f64,
    /// Gamma: d²V/dS²
    pub gamma: f64,
    /// Theta: dV/dt per year
    pub theta: f64,
    /// Vega: dV/dσ per unit of volatility
    pub vega: f64,
    /// Rho: dV/dr per unit of rate
    pub rho: f64,
    /// Vanna: d²V/dSdσ
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub vanna: Option<f64>,
    /// Volga/Vomma: d²V/dσ²
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub volga: Option<f64>,
}

impl Greeks {
    pub fn new(delta: f64, gamma: f64, theta: f64, vega: f64, rho: f64) -> Self {
        Self {
            delta,
            gamma,
            theta,
            vega,
            rho,
            vanna: None,
            volga: None,
        }
    }

    /// Theta per calendar day
    pub fn theta_per_day(&self) -> f64 {
        self.theta / DAYS_PER_YEAR_THETA
    }

    /// Vega per 1 percentage point of volatility
    pub fn vega_per_point(&self) -> f64 {
        self.vega / 100.0
    }

    /// Rho per 1 percentage point of rate
    pub fn rho_per_point(&self) -> f64 {
        self.rho / 100.0
    }

    /// Scale Greeks by a factor (e.g. position quantity)
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            delta: self.delta * factor,
            gamma: self.gamma * factor,
            theta: self.theta * factor,
            vega: self.vega * factor,
            rho: self.rho * factor,
            vanna: self.vanna.map(|v| v * factor),
            volga: self.volga.map(|v| v * factor),
        }
    }

    /// Add two Greeks (for portfolio)
    pub fn add(&self, other: &Greeks) -> Self {
        Self {
            delta: self.delta + other.delta,
            gamma: self.gamma + other.gamma,
            theta: self.theta + other.theta,
            vega: self.vega + other.vega,
            rho: self.rho + other.rho,
            vanna: add_optional(self.vanna, other.vanna),
            volga: add_optional(self.volga, other.volga),
        }
    }
}

fn add_optional(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (Some(a), None) | (None, Some(a)) => Some(a),
        _ => None,
    }
}

/// Net Greeks for a book of positions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioGreeks {
    /// Quantity-weighted sum of per-contract Greeks
    pub net: Greeks,
    /// Number of positions folded in
    pub num_positions: usize,
}

impl PortfolioGreeks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a position's Greeks, signed by quantity (negative = short)
    pub fn add_position(&mut self, greeks: &Greeks, quantity: f64) {
        self.net = self.net.add(&greeks.scale(quantity));
        self.num_positions += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalings() {
        let g = Greeks::new(0.5, 0.02, -6.5, 37.5, 53.2);
        assert!((g.theta_per_day() - (-6.5 / 365.0)).abs() < 1e-15);
        assert!((g.vega_per_point() - 0.375).abs() < 1e-15);
        assert!((g.rho_per_point() - 0.532).abs() < 1e-15);
    }

    #[test]
    fn test_portfolio_accumulation() {
        let mut g1 = Greeks::new(0.6, 0.02, -6.0, 37.0, 50.0);
        g1.vanna = Some(0.1);
        let g2 = Greeks::new(-0.4, 0.02, -2.0, 37.0, -45.0);

        let mut book = PortfolioGreeks::new();
        book.add_position(&g1, 2.0);
        book.add_position(&g2, -1.0);

        assert_eq!(book.num_positions, 2);
        assert!((book.net.delta - 1.6).abs() < 1e-12);
        assert!((book.net.gamma - 0.02).abs() < 1e-12);
        assert!((book.net.vega - 37.0).abs() < 1e-12);
        assert_eq!(book.net.vanna, Some(0.2));
        assert_eq!(book.net.volga, None);
    }
}
