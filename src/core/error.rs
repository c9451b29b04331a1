//! Error types for the pricing engine
//!
//! Three families of failure surface from the pricers:
//! - parameter validation (bad contract fields, step/path counts, lattice probability)
//! - model applicability (analytic formulas asked to price American exercise)
//! - numerical convergence (implied volatility solver)
//!
//! Configuration loading adds its own I/O and parsing failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Model not applicable: {0}")]
    ModelApplicability(String),

    #[error("Convergence failure after {iterations} iterations: {message}")]
    Convergence {
        message: String,
        iterations: usize,
        /// Last iterate before giving up, when one exists
        last_estimate: Option<f64>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type PricingResult<T> = Result<T, PricingError>;

impl PricingError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn model_applicability(msg: impl Into<String>) -> Self {
        Self::ModelApplicability(msg.into())
    }

    /// Convergence failure with no usable iterate (e.g. infeasible market price)
    pub fn convergence(msg: impl Into<String>) -> Self {
        Self::Convergence {
            message: msg.into(),
            iterations: 0,
            last_estimate: None,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter(_))
    }

    pub fn is_model_applicability(&self) -> bool {
        matches!(self, Self::ModelApplicability(_))
    }

    pub fn is_convergence(&self) -> bool {
        matches!(self, Self::Convergence { .. })
    }
}
