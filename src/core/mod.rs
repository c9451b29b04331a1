//! Core data types for the pricing engine
//!
//! Defines fundamental types:
//! - OptionContract: validated pricing inputs, type (call/put) and exercise style
//! - Greeks: sensitivities and their reporting conventions
//! - PricingError: the error taxonomy shared by every pricer
//! - EngineConfig: per-method tuning parameters

pub mod config;
pub mod error;
pub mod greeks;
pub mod option;

pub use config::*;
pub use error::*;
pub use greeks::*;
pub use option::*;
