//! Analysis Tools
//!
//! - Convergence of the lattice and Monte Carlo pricers to Black-Scholes
//! - Volatility smile and term structure recovery through the IV solver

pub mod convergence;
pub mod smile;

pub use convergence::*;
pub use smile::*;
