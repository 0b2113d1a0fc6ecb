use serde::Serialize;
use thiserror::Error;

/// First simulated year; snapshot index 0 maps to this calendar year.
pub const BASE_YEAR: i32 = 2025;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ModelKey {
    Aggressive,
    Balanced,
    Conservative,
}

impl ModelKey {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelKey::Aggressive => "aggressive",
            ModelKey::Balanced => "balanced",
            ModelKey::Conservative => "conservative",
        }
    }
}

/// A deterministic price schedule: a USD starting price plus one growth rate
/// (in percent) per simulated year. The table length fixes the horizon.
#[derive(Debug, Clone)]
pub struct GrowthModel {
    pub name: String,
    pub start_price_usd: f64,
    pub annual_growth_rates: Vec<f64>,
}

impl GrowthModel {
    pub fn horizon_years(&self) -> usize {
        self.annual_growth_rates.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WithdrawalPolicy {
    /// Fixed annual amount in JPY, already net of tax; never grossed up.
    FixedAmount { annual_amount_jpy: f64 },
    /// Fixed percentage of the year's opening portfolio value, in [0, 100].
    FixedRate { annual_rate_pct: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CashFlowPolicy {
    /// Decumulation: withdraw every year from `start_year` onward.
    Withdrawal {
        policy: WithdrawalPolicy,
        start_year: i32,
    },
    /// Accumulation: buy every simulated year starting at year 0.
    Investment { monthly_contribution_jpy: f64 },
}

#[derive(Debug, Clone)]
pub struct SimulationInput {
    pub initial_holdings_btc: f64,
    pub model: GrowthModel,
    pub exchange_rate_jpy_per_usd: f64,
    pub policy: CashFlowPolicy,
}

/// One output row per simulated year. All fields are raw numbers; display
/// strings are derived at the presentation boundary, never parsed back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSnapshot {
    pub year: i32,
    pub growth_rate_pct: f64,
    pub btc_price_usd: f64,
    pub btc_price_jpy: f64,
    /// Withdrawal or contribution for the year, in JPY.
    pub cash_flow_jpy: f64,
    /// Cash flow as a percentage of portfolio value; 0 when the portfolio
    /// is empty.
    pub cash_flow_rate_pct: f64,
    pub cumulative_cash_flow_jpy: f64,
    /// Holdings after the year's cash flow.
    pub holdings_btc: f64,
    /// Opening value for withdrawal years, post-purchase value for
    /// investment years.
    pub portfolio_value_jpy: f64,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown model key: {0}")]
    UnknownModel(String),

    #[error("invalid growth model: {0}")]
    InvalidModel(String),
}

impl SimulationError {
    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        SimulationError::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
