//! # Options Pricing Engine
//!
//! Prices vanilla and digital European/American options and their risk
//! sensitivities with three independent methods, and inverts the analytic
//! price for implied volatility.
//!
//! ## Key Components
//!
//! - **Black-Scholes**: closed-form European price and analytic Greeks
//! - **Binomial (CRR)**: recombining lattice with American early exercise
//! - **Monte Carlo**: GBM terminal sampling, antithetic variates, seeded
//!   partition-invariant batches and a standard error
//! - **Implied Volatility**: Newton-Raphson with a bisection fallback
//! - **Portfolio / Analysis**: aggregation, scenario P&L, convergence studies
//!   and smile recovery
//!
//! ## Usage
//!
//! ```rust,no_run
//! use options_pricing_engine::prelude::*;
//!
//! let call = OptionContract::european(100.0, 100.0, 0.05, 0.20, 1.0, OptionType::Call).unwrap();
//!
//! let analytic = bs_price(&call).unwrap();
//! let lattice = price_binomial(&call, 200).unwrap();
//! let mc = price_monte_carlo(&call, 100_000, true, Some(42)).unwrap();
//! let iv = implied_volatility(&call, analytic).unwrap();
//!
//! println!("{analytic:.4} {lattice:.4} {:.4} ± {:.4} (iv {iv:.4})", mc.price, mc.std_error);
//! ```
//!
//! ## Conventions
//!
//! - Theta is per year (`dV/dt`); vega and rho are per unit change
//! - Monte Carlo `paths` counts terminal prices, both legs of antithetic pairs
//! - Errors are never clamped away: invalid inputs return `PricingError`

pub mod analysis;
pub mod core;
pub mod models;
pub mod portfolio;

/// Prelude with commonly used types
pub mod prelude {
    // Core types
    pub use crate::core::{
        EngineConfig, ExerciseStyle, Greeks, LatticeConfig, MonteCarloConfig, OptionContract,
        OptionType, PortfolioGreeks, PricingError, PricingResult, SolverConfig,
    };

    // Black-Scholes
    pub use crate::models::black_scholes::{greeks as bs_greeks, price as bs_price};

    // Models
    pub use crate::models::{
        digital_delta,
        early_exercise_boundary,
        implied_volatility,
        implied_volatility_with,
        monte_carlo_greeks,
        norm_cdf,
        norm_pdf,
        price_binomial,
        price_digital_black_scholes,
        price_digital_monte_carlo,
        price_monte_carlo,
        price_monte_carlo_with,
        solve_implied_volatility,
        CrrParameters,
        IvSolution,
        McEstimate,
        McGreeks,
        Payoff,
        SolverPhase,
    };

    // Portfolio
    pub use crate::portfolio::{
        portfolio_greeks, portfolio_price, scenario_pnl, synthetic_forward, Portfolio, Position,
        ScenarioGrid,
    };

    // Analysis
    pub use crate::analysis::{
        binomial_convergence, monte_carlo_convergence, term_structure, vol_smile,
        ConvergenceReport, PriceNoise, VolSmile,
    };
}

// Re-export main types at crate root
pub use crate::core::{OptionContract, OptionType, PricingError, PricingResult};
