//! Option contract definitions
//!
//! An `OptionContract` is an immutable, validated bundle of the six pricing
//! inputs plus exercise style. Pricers take it by reference and never mutate it;
//! bumped or substituted variants are produced through the `with_*` methods,
//! which re-run validation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{PricingError, PricingResult};

/// Days per year used to convert calendar dates to year fractions
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Option type (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Payoff direction: +1 for call, -1 for put
    pub fn phi(&self) -> f64 {
        match self {
            OptionType::Call => 1.0,
            OptionType::Put => -1.0,
        }
    }

    /// Intrinsic value at given spot
    pub fn intrinsic(&self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionType::Call => (spot - strike).max(0.0),
            OptionType::Put => (strike - spot).max(0.0),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OptionType::Call => "call",
            OptionType::Put => "put",
        }
    }
}

/// Exercise style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseStyle {
    European,
    American,
}

impl ExerciseStyle {
    pub fn label(&self) -> &'static str {
        match self {
            ExerciseStyle::European => "european",
            ExerciseStyle::American => "american",
        }
    }
}

/// Option contract specification
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptionContract {
    spot: f64,
    strike: f64,
    rate: f64,
    volatility: f64,
    time_to_maturity: f64,
    option_type: OptionType,
    exercise_style: ExerciseStyle,
}

impl OptionContract {
    /// Create a contract, rejecting any field that violates the model invariants.
    ///
    /// `spot`, `strike`, `volatility` and `time_to_maturity` must be strictly
    /// positive; `rate` may be negative. All values must be finite.
    pub fn new(
        spot: f64,
        strike: f64,
        rate: f64,
        volatility: f64,
        time_to_maturity: f64,
        option_type: OptionType,
        exercise_style: ExerciseStyle,
    ) -> PricingResult<Self> {
        check_positive("spot", spot)?;
        check_positive("strike", strike)?;
        check_positive("volatility", volatility)?;
        check_positive("time_to_maturity", time_to_maturity)?;
        if !rate.is_finite() {
            return Err(PricingError::invalid_parameter(format!(
                "rate must be finite, got {rate}"
            )));
        }

        Ok(Self {
            spot,
            strike,
            rate,
            volatility,
            time_to_maturity,
            option_type,
            exercise_style,
        })
    }

    /// Create a new European option
    pub fn european(
        spot: f64,
        strike: f64,
        rate: f64,
        volatility: f64,
        time_to_maturity: f64,
        option_type: OptionType,
    ) -> PricingResult<Self> {
        Self::new(
            spot,
            strike,
            rate,
            volatility,
            time_to_maturity,
            option_type,
            ExerciseStyle::European,
        )
    }

    /// Create a new American option
    pub fn american(
        spot: f64,
        strike: f64,
        rate: f64,
        volatility: f64,
        time_to_maturity: f64,
        option_type: OptionType,
    ) -> PricingResult<Self> {
        Self::new(
            spot,
            strike,
            rate,
            volatility,
            time_to_maturity,
            option_type,
            ExerciseStyle::American,
        )
    }

    /// Create a contract whose maturity is given as a calendar date.
    ///
    /// Time to maturity is `(expiry - as_of)` in days over 365.25; an expiry on
    /// or before `as_of` is rejected, since an expired contract should be valued
    /// from its payoff directly.
    #[allow(clippy::too_many_arguments)]
    pub fn from_expiry(
        spot: f64,
        strike: f64,
        rate: f64,
        volatility: f64,
        expiry: NaiveDate,
        as_of: NaiveDate,
        option_type: OptionType,
        exercise_style: ExerciseStyle,
    ) -> PricingResult<Self> {
        let days = (expiry - as_of).num_days();
        if days <= 0 {
            return Err(PricingError::invalid_parameter(format!(
                "expiry {expiry} is not after valuation date {as_of}"
            )));
        }
        Self::new(
            spot,
            strike,
            rate,
            volatility,
            days as f64 / DAYS_PER_YEAR,
            option_type,
            exercise_style,
        )
    }

    pub fn spot(&self) -> f64 {
        self.spot
    }

    pub fn strike(&self) -> f64 {
        self.strike
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    pub fn time_to_maturity(&self) -> f64 {
        self.time_to_maturity
    }

    pub fn option_type(&self) -> OptionType {
        self.option_type
    }

    pub fn exercise_style(&self) -> ExerciseStyle {
        self.exercise_style
    }

    pub fn is_european(&self) -> bool {
        self.exercise_style == ExerciseStyle::European
    }

    /// Copy with a different spot
    pub fn with_spot(&self, spot: f64) -> PricingResult<Self> {
        Self::new(
            spot,
            self.strike,
            self.rate,
            self.volatility,
            self.time_to_maturity,
            self.option_type,
            self.exercise_style,
        )
    }

    /// Copy with a different volatility
    pub fn with_volatility(&self, volatility: f64) -> PricingResult<Self> {
        Self::new(
            self.spot,
            self.strike,
            self.rate,
            volatility,
            self.time_to_maturity,
            self.option_type,
            self.exercise_style,
        )
    }

    /// Copy with a different rate
    pub fn with_rate(&self, rate: f64) -> PricingResult<Self> {
        Self::new(
            self.spot,
            self.strike,
            rate,
            self.volatility,
            self.time_to_maturity,
            self.option_type,
            self.exercise_style,
        )
    }

    /// Copy with a different time to maturity
    pub fn with_time_to_maturity(&self, time_to_maturity: f64) -> PricingResult<Self> {
        Self::new(
            self.spot,
            self.strike,
            self.rate,
            self.volatility,
            time_to_maturity,
            self.option_type,
            self.exercise_style,
        )
    }

    /// Copy with the opposite option type (call <-> put)
    pub fn with_option_type(&self, option_type: OptionType) -> Self {
        Self {
            option_type,
            ..*self
        }
    }

    /// Copy with a different exercise style
    pub fn with_exercise_style(&self, exercise_style: ExerciseStyle) -> Self {
        Self {
            exercise_style,
            ..*self
        }
    }

    /// Intrinsic value at the current spot
    pub fn intrinsic_value(&self) -> f64 {
        self.option_type.intrinsic(self.spot, self.strike)
    }

    /// Discount factor to maturity: e^(-rT)
    pub fn discount_factor(&self) -> f64 {
        (-self.rate * self.time_to_maturity).exp()
    }

    /// Forward price: S * e^(rT)
    pub fn forward(&self) -> f64 {
        self.spot * (self.rate * self.time_to_maturity).exp()
    }

    /// Log-moneyness: ln(K/S)
    pub fn log_moneyness(&self) -> f64 {
        (self.strike / self.spot).ln()
    }

    /// Is this option in the money?
    pub fn is_itm(&self) -> bool {
        match self.option_type {
            OptionType::Call => self.spot > self.strike,
            OptionType::Put => self.spot < self.strike,
        }
    }

    /// Is this option at the money (within relative tolerance)?
    pub fn is_atm(&self, tolerance: f64) -> bool {
        (self.strike - self.spot).abs() / self.spot < tolerance
    }

    /// Is this option out of the money?
    pub fn is_otm(&self) -> bool {
        !self.is_itm() && !self.is_atm(0.01)
    }
}

fn check_positive(name: &str, value: f64) -> PricingResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PricingError::invalid_parameter(format!(
            "{name} must be positive and finite, got {value}"
        )));
    }
    Ok(())
}

/// Raw, unvalidated contract fields as they appear in configuration or
/// portfolio files. Deserializing an `OptionContract` goes through this and
/// then through `OptionContract::new`.
#[derive(Debug, Clone, Deserialize)]
struct ContractFields {
    spot: f64,
    strike: f64,
    rate: f64,
    volatility: f64,
    time_to_maturity: f64,
    option_type: OptionType,
    #[serde(default = "default_exercise")]
    exercise_style: ExerciseStyle,
}

fn default_exercise() -> ExerciseStyle {
    ExerciseStyle::European
}

impl<'de> Deserialize<'de> for OptionContract {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let f = ContractFields::deserialize(deserializer)?;
        OptionContract::new(
            f.spot,
            f.strike,
            f.rate,
            f.volatility,
            f.time_to_maturity,
            f.option_type,
            f.exercise_style,
        )
        .map_err(serde::de::Error::custom)
    }
}
