//! Pricing Models
//!
//! Implements:
//! - Black-Scholes (closed-form price and Greeks)
//! - Cox-Ross-Rubinstein binomial lattice (European and American exercise)
//! - Monte Carlo under GBM with antithetic variates
//! - Implied volatility (Newton with bisection fallback)
//! - Cash-or-nothing digital options

pub mod binomial;
pub mod black_scholes;
pub mod digital;
pub mod implied_vol;
pub mod monte_carlo;

pub use binomial::*;
pub use black_scholes::{d1_d2, norm_cdf, norm_pdf};
pub use digital::*;
pub use implied_vol::*;
pub use monte_carlo::*;
