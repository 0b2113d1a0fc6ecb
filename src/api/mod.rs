use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    BASE_YEAR, CashFlowPolicy, MAN_YEN, ModelKey, SimulationError, SimulationInput,
    WithdrawalPolicy, YearSnapshot, builtin_model, format_jpy, power_law_price_usd,
    power_law_slope, run_simulation,
};

const DEFAULT_EXCHANGE_RATE_JPY_PER_USD: f64 = 150.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliMode {
    Withdrawal,
    Investment,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliModelKey {
    Aggressive,
    Balanced,
    Conservative,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliWithdrawalType {
    FixedAmount,
    FixedRate,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiMode {
    Withdrawal,
    Investment,
}

impl From<CliMode> for ApiMode {
    fn from(value: CliMode) -> Self {
        match value {
            CliMode::Withdrawal => ApiMode::Withdrawal,
            CliMode::Investment => ApiMode::Investment,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
enum ApiModelKey {
    Aggressive,
    Balanced,
    Conservative,
}

impl From<ApiModelKey> for ModelKey {
    fn from(value: ApiModelKey) -> Self {
        match value {
            ApiModelKey::Aggressive => ModelKey::Aggressive,
            ApiModelKey::Balanced => ModelKey::Balanced,
            ApiModelKey::Conservative => ModelKey::Conservative,
        }
    }
}

impl From<CliModelKey> for ApiModelKey {
    fn from(value: CliModelKey) -> Self {
        match value {
            CliModelKey::Aggressive => ApiModelKey::Aggressive,
            CliModelKey::Balanced => ApiModelKey::Balanced,
            CliModelKey::Conservative => ApiModelKey::Conservative,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiWithdrawalType {
    #[serde(alias = "fixed", alias = "fixedAmount", alias = "fixed_amount")]
    FixedAmount,
    #[serde(alias = "percentage", alias = "fixedRate", alias = "fixed_rate")]
    FixedRate,
}

impl From<CliWithdrawalType> for ApiWithdrawalType {
    fn from(value: CliWithdrawalType) -> Self {
        match value {
            CliWithdrawalType::FixedAmount => ApiWithdrawalType::FixedAmount,
            CliWithdrawalType::FixedRate => ApiWithdrawalType::FixedRate,
        }
    }
}

/// Raw request body/query. Numeric fields arrive as user-entered text and
/// are parsed during input building; empty strings count as missing.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    mode: Option<ApiMode>,
    model: Option<ApiModelKey>,
    initial_holdings_btc: Option<String>,
    exchange_rate: Option<String>,
    withdrawal_type: Option<ApiWithdrawalType>,
    /// Annual withdrawal in 万円, net of tax.
    withdrawal_amount: Option<String>,
    /// Annual withdrawal rate in percent of portfolio value.
    withdrawal_rate: Option<String>,
    start_year: Option<String>,
    /// Monthly contribution in 万円.
    monthly_contribution: Option<String>,
}

#[derive(Parser, Debug)]
#[command(
    name = "btcsim",
    about = "Deterministic Bitcoin holding projection (withdrawal and accumulation schedules)"
)]
pub struct Cli {
    #[arg(long, value_enum, default_value_t = CliMode::Withdrawal)]
    mode: CliMode,
    #[arg(long, value_enum, default_value_t = CliModelKey::Balanced)]
    model: CliModelKey,
    #[arg(long, help = "Starting holdings in BTC")]
    initial_holdings_btc: Option<f64>,
    #[arg(
        long,
        default_value_t = DEFAULT_EXCHANGE_RATE_JPY_PER_USD,
        help = "JPY per USD, held constant across the horizon"
    )]
    exchange_rate: f64,
    #[arg(long, value_enum, default_value_t = CliWithdrawalType::FixedAmount)]
    withdrawal_type: CliWithdrawalType,
    #[arg(long, help = "Annual withdrawal in 万円, net of tax")]
    withdrawal_amount: Option<f64>,
    #[arg(long, help = "Annual withdrawal rate in percent of portfolio value")]
    withdrawal_rate: Option<f64>,
    #[arg(long, help = "First calendar year withdrawals apply")]
    start_year: Option<i32>,
    #[arg(long, help = "Monthly contribution in 万円")]
    monthly_contribution: Option<f64>,
}

/// Inputs after text parsing but before policy assembly. Both the HTTP
/// payload and the CLI reduce to this.
#[derive(Debug, Clone, Copy)]
struct SimulationOptions {
    mode: ApiMode,
    model: ApiModelKey,
    initial_holdings_btc: Option<f64>,
    exchange_rate: Option<f64>,
    withdrawal_type: ApiWithdrawalType,
    withdrawal_amount_man: Option<f64>,
    withdrawal_rate_pct: Option<f64>,
    start_year: Option<i32>,
    monthly_contribution_man: Option<f64>,
}

#[derive(Debug)]
struct ApiRequest {
    mode: ApiMode,
    model: ApiModelKey,
    input: SimulationInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    mode: ApiMode,
    model: ApiModelKey,
    model_name: String,
    start_price_usd: f64,
    exchange_rate_jpy_per_usd: f64,
    years: Vec<YearRow>,
}

/// One table row: the raw snapshot plus the strings the table renders.
/// Chart consumers read the raw fields; nothing re-parses the strings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct YearRow {
    #[serde(flatten)]
    snapshot: YearSnapshot,
    btc_price_display: String,
    cash_flow_display: String,
    cash_flow_rate_display: String,
    holdings_display: String,
    portfolio_value_display: String,
}

impl YearRow {
    fn from_snapshot(snapshot: &YearSnapshot) -> Self {
        YearRow {
            btc_price_display: format_jpy(snapshot.btc_price_jpy),
            cash_flow_display: format_jpy(snapshot.cash_flow_jpy),
            cash_flow_rate_display: format!("{:.1}%", snapshot.cash_flow_rate_pct),
            holdings_display: format!("{:.8} BTC", snapshot.holdings_btc),
            portfolio_value_display: format_jpy(snapshot.portfolio_value_jpy),
            snapshot: snapshot.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PowerLawPayload {
    model: Option<ApiModelKey>,
    start_year: Option<String>,
    target_year: Option<String>,
    exchange_rate: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PowerLawResponse {
    model: ApiModelKey,
    model_name: String,
    slope: f64,
    start_year: i32,
    target_year: i32,
    btc_price_usd: f64,
    btc_price_jpy: f64,
    btc_price_display: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn parse_optional_f64(field: &str, value: Option<&str>) -> Result<Option<f64>, SimulationError> {
    let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<f64>().map(Some).map_err(|_| {
        SimulationError::validation(field, format!("not a number: {raw}"))
    })
}

fn parse_optional_i32(field: &str, value: Option<&str>) -> Result<Option<i32>, SimulationError> {
    let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<i32>().map(Some).map_err(|_| {
        SimulationError::validation(field, format!("not a whole year: {raw}"))
    })
}

fn options_from_payload(payload: &SimulatePayload) -> Result<SimulationOptions, SimulationError> {
    Ok(SimulationOptions {
        mode: payload.mode.unwrap_or(ApiMode::Withdrawal),
        model: payload.model.unwrap_or(ApiModelKey::Balanced),
        initial_holdings_btc: parse_optional_f64(
            "initialHoldingsBtc",
            payload.initial_holdings_btc.as_deref(),
        )?,
        exchange_rate: parse_optional_f64("exchangeRate", payload.exchange_rate.as_deref())?,
        withdrawal_type: payload
            .withdrawal_type
            .unwrap_or(ApiWithdrawalType::FixedAmount),
        withdrawal_amount_man: parse_optional_f64(
            "withdrawalAmount",
            payload.withdrawal_amount.as_deref(),
        )?,
        withdrawal_rate_pct: parse_optional_f64(
            "withdrawalRate",
            payload.withdrawal_rate.as_deref(),
        )?,
        start_year: parse_optional_i32("startYear", payload.start_year.as_deref())?,
        monthly_contribution_man: parse_optional_f64(
            "monthlyContribution",
            payload.monthly_contribution.as_deref(),
        )?,
    })
}

fn options_from_cli(cli: &Cli) -> SimulationOptions {
    SimulationOptions {
        mode: cli.mode.into(),
        model: cli.model.into(),
        initial_holdings_btc: cli.initial_holdings_btc,
        exchange_rate: Some(cli.exchange_rate),
        withdrawal_type: cli.withdrawal_type.into(),
        withdrawal_amount_man: cli.withdrawal_amount,
        withdrawal_rate_pct: cli.withdrawal_rate,
        start_year: cli.start_year,
        monthly_contribution_man: cli.monthly_contribution,
    }
}

fn require(field: &str, value: Option<f64>) -> Result<f64, SimulationError> {
    value.ok_or_else(|| SimulationError::validation(field, "value is required"))
}

fn build_request(options: SimulationOptions) -> Result<ApiRequest, SimulationError> {
    let model_key: ModelKey = options.model.into();
    let model = builtin_model(model_key).clone();
    let exchange_rate = options
        .exchange_rate
        .unwrap_or(DEFAULT_EXCHANGE_RATE_JPY_PER_USD);

    let (initial_holdings_btc, policy) = match options.mode {
        ApiMode::Withdrawal => {
            let holdings = require("initialHoldingsBtc", options.initial_holdings_btc)?;
            let start_year = options
                .start_year
                .ok_or_else(|| SimulationError::validation("startYear", "value is required"))?;
            let policy = match options.withdrawal_type {
                ApiWithdrawalType::FixedAmount => WithdrawalPolicy::FixedAmount {
                    annual_amount_jpy: require("withdrawalAmount", options.withdrawal_amount_man)?
                        * MAN_YEN,
                },
                ApiWithdrawalType::FixedRate => WithdrawalPolicy::FixedRate {
                    annual_rate_pct: require("withdrawalRate", options.withdrawal_rate_pct)?,
                },
            };
            (holdings, CashFlowPolicy::Withdrawal { policy, start_year })
        }
        ApiMode::Investment => {
            let monthly = require("monthlyContribution", options.monthly_contribution_man)?;
            (
                options.initial_holdings_btc.unwrap_or(0.0),
                CashFlowPolicy::Investment {
                    monthly_contribution_jpy: monthly * MAN_YEN,
                },
            )
        }
    };

    Ok(ApiRequest {
        mode: options.mode,
        model: options.model,
        input: SimulationInput {
            initial_holdings_btc,
            model,
            exchange_rate_jpy_per_usd: exchange_rate,
            policy,
        },
    })
}

fn simulate(request: &ApiRequest) -> Result<SimulateResponse, SimulationError> {
    debug!(
        "simulate: mode={:?} model={} horizon={}y",
        request.mode,
        ModelKey::from(request.model).as_str(),
        request.input.model.horizon_years()
    );
    let snapshots = run_simulation(&request.input)?;

    if request.input.initial_holdings_btc > 0.0
        && snapshots.last().is_some_and(|row| row.holdings_btc == 0.0)
    {
        let depleted_year = snapshots
            .iter()
            .find(|row| row.holdings_btc == 0.0)
            .map(|row| row.year)
            .unwrap_or(BASE_YEAR);
        warn!("holdings depleted in {depleted_year}, before the model horizon");
    }

    Ok(build_simulate_response(request, &snapshots))
}

fn build_simulate_response(request: &ApiRequest, snapshots: &[YearSnapshot]) -> SimulateResponse {
    SimulateResponse {
        mode: request.mode,
        model: request.model,
        model_name: request.input.model.name.clone(),
        start_price_usd: request.input.model.start_price_usd,
        exchange_rate_jpy_per_usd: request.input.exchange_rate_jpy_per_usd,
        years: snapshots.iter().map(YearRow::from_snapshot).collect(),
    }
}

fn power_law(payload: &PowerLawPayload) -> Result<PowerLawResponse, SimulationError> {
    let api_model = payload.model.unwrap_or(ApiModelKey::Balanced);
    let model_key: ModelKey = api_model.into();
    let model = builtin_model(model_key);
    let slope = power_law_slope(model_key);

    let start_year =
        parse_optional_i32("startYear", payload.start_year.as_deref())?.unwrap_or(BASE_YEAR);
    let target_year = parse_optional_i32("targetYear", payload.target_year.as_deref())?
        .ok_or_else(|| SimulationError::validation("targetYear", "value is required"))?;
    let exchange_rate = parse_optional_f64("exchangeRate", payload.exchange_rate.as_deref())?
        .unwrap_or(DEFAULT_EXCHANGE_RATE_JPY_PER_USD);
    if !exchange_rate.is_finite() || exchange_rate <= 0.0 {
        return Err(SimulationError::validation(
            "exchangeRate",
            "must be a finite number > 0",
        ));
    }

    let btc_price_usd = power_law_price_usd(model.start_price_usd, slope, start_year, target_year);
    let btc_price_jpy = btc_price_usd * exchange_rate;

    Ok(PowerLawResponse {
        model: api_model,
        model_name: model.name.clone(),
        slope,
        start_year,
        target_year,
        btc_price_usd,
        btc_price_jpy,
        btc_price_display: format_jpy(btc_price_jpy),
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/power-law", get(power_law_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!("btcsim HTTP API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match options_from_payload(&payload).and_then(build_request) {
        Ok(request) => request,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    match simulate(&request) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

async fn power_law_handler(Query(payload): Query<PowerLawPayload>) -> Response {
    match power_law(&payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

pub fn run_cli(cli: Cli) -> Result<(), SimulationError> {
    let request = build_request(options_from_cli(&cli))?;
    let response = simulate(&request)?;

    println!(
        "{} — start price {} USD, {} JPY/USD",
        response.model_name, response.start_price_usd, response.exchange_rate_jpy_per_usd
    );
    println!(
        "{:<6} {:>8} {:>14} {:>14} {:>8} {:>16} {:>14}",
        "year", "growth", "BTC price", "cash flow", "rate", "holdings", "value"
    );
    for row in &response.years {
        println!(
            "{:<6} {:>7.1}% {:>14} {:>14} {:>8} {:>16} {:>14}",
            row.snapshot.year,
            row.snapshot.growth_rate_pct,
            row.btc_price_display,
            row.cash_flow_display,
            row.cash_flow_rate_display,
            row.holdings_display,
            row.portfolio_value_display,
        );
    }
    Ok(())
}
