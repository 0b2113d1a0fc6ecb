use super::types::{
    BASE_YEAR, CashFlowPolicy, GrowthModel, SimulationError, SimulationInput, WithdrawalPolicy,
    YearSnapshot,
};

/// Runs one projection: validates the input, compounds the price path, then
/// applies the cash-flow policy year by year. Either a complete snapshot
/// sequence comes back or nothing does; no partial output.
pub fn run_simulation(input: &SimulationInput) -> Result<Vec<YearSnapshot>, SimulationError> {
    validate_input(input)?;
    let prices_usd = project_usd_prices(&input.model)?;

    let snapshots = match &input.policy {
        CashFlowPolicy::Withdrawal { policy, start_year } => {
            run_withdrawal(input, &prices_usd, *policy, *start_year)
        }
        CashFlowPolicy::Investment {
            monthly_contribution_jpy,
        } => run_investment(input, &prices_usd, *monthly_contribution_jpy),
    };
    Ok(snapshots)
}

/// Long-horizon power-law preview: `log10(price)` grows linearly in
/// `log10(years elapsed)`. Years at or before the start return the start
/// price unchanged.
pub fn power_law_price_usd(
    start_price_usd: f64,
    slope: f64,
    start_year: i32,
    target_year: i32,
) -> f64 {
    let years_elapsed = target_year - start_year + 1;
    if years_elapsed <= 0 {
        return start_price_usd;
    }
    let log_price = start_price_usd.log10() + slope * f64::from(years_elapsed).log10();
    10.0_f64.powf(log_price)
}

fn validate_input(input: &SimulationInput) -> Result<(), SimulationError> {
    if !input.initial_holdings_btc.is_finite() || input.initial_holdings_btc < 0.0 {
        return Err(SimulationError::validation(
            "initial_holdings_btc",
            "must be a finite number >= 0",
        ));
    }

    if !input.exchange_rate_jpy_per_usd.is_finite() || input.exchange_rate_jpy_per_usd <= 0.0 {
        return Err(SimulationError::validation(
            "exchange_rate_jpy_per_usd",
            "must be a finite number > 0",
        ));
    }

    match &input.policy {
        CashFlowPolicy::Withdrawal { policy, .. } => match policy {
            WithdrawalPolicy::FixedAmount { annual_amount_jpy } => {
                if !annual_amount_jpy.is_finite() || *annual_amount_jpy < 0.0 {
                    return Err(SimulationError::validation(
                        "annual_amount_jpy",
                        "must be a finite number >= 0",
                    ));
                }
            }
            WithdrawalPolicy::FixedRate { annual_rate_pct } => {
                if !annual_rate_pct.is_finite() || !(0.0..=100.0).contains(annual_rate_pct) {
                    return Err(SimulationError::validation(
                        "annual_rate_pct",
                        "must be between 0 and 100",
                    ));
                }
            }
        },
        CashFlowPolicy::Investment {
            monthly_contribution_jpy,
        } => {
            if !monthly_contribution_jpy.is_finite() || *monthly_contribution_jpy < 0.0 {
                return Err(SimulationError::validation(
                    "monthly_contribution_jpy",
                    "must be a finite number >= 0",
                ));
            }
        }
    }

    Ok(())
}

/// Compounds the USD price path. `price[0]` is the model's start price;
/// each later year applies that year's growth rate. Rates may be negative,
/// but any non-positive computed price aborts the run.
fn project_usd_prices(model: &GrowthModel) -> Result<Vec<f64>, SimulationError> {
    if model.annual_growth_rates.is_empty() {
        return Err(SimulationError::InvalidModel(format!(
            "{}: growth-rate table is empty",
            model.name
        )));
    }

    if !model.start_price_usd.is_finite() || model.start_price_usd <= 0.0 {
        return Err(SimulationError::InvalidModel(format!(
            "{}: start price must be > 0, got {}",
            model.name, model.start_price_usd
        )));
    }

    let mut prices = Vec::with_capacity(model.horizon_years());
    let mut price = model.start_price_usd;
    for (index, rate) in model.annual_growth_rates.iter().enumerate() {
        if index > 0 {
            price *= 1.0 + rate / 100.0;
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(SimulationError::InvalidModel(format!(
                "{}: computed price for year {} is not positive ({price})",
                model.name,
                BASE_YEAR + index as i32
            )));
        }
        prices.push(price);
    }
    Ok(prices)
}

fn run_withdrawal(
    input: &SimulationInput,
    prices_usd: &[f64],
    policy: WithdrawalPolicy,
    start_year: i32,
) -> Vec<YearSnapshot> {
    let mut snapshots = Vec::with_capacity(prices_usd.len());
    let mut remaining_btc = input.initial_holdings_btc;
    let mut cumulative_cash_flow = 0.0;

    for (index, price_usd) in prices_usd.iter().enumerate() {
        let year = BASE_YEAR + index as i32;
        let price_jpy = price_usd * input.exchange_rate_jpy_per_usd;
        // Opening value: the year's withdrawal has not been taken yet.
        let portfolio_value = remaining_btc * price_jpy;

        let cash_flow = if year < start_year {
            0.0
        } else {
            match policy {
                WithdrawalPolicy::FixedAmount { annual_amount_jpy } => annual_amount_jpy,
                WithdrawalPolicy::FixedRate { annual_rate_pct } => {
                    portfolio_value * annual_rate_pct / 100.0
                }
            }
        };

        // A request exceeding the available value is capped, not rejected;
        // the run reports depletion instead.
        let withdrawn_btc = cash_flow / price_jpy;
        let next_btc = (remaining_btc - withdrawn_btc).max(0.0);
        cumulative_cash_flow += cash_flow;

        snapshots.push(YearSnapshot {
            year,
            growth_rate_pct: input.model.annual_growth_rates[index],
            btc_price_usd: *price_usd,
            btc_price_jpy: price_jpy,
            cash_flow_jpy: cash_flow,
            cash_flow_rate_pct: cash_flow_rate_pct(cash_flow, portfolio_value),
            cumulative_cash_flow_jpy: cumulative_cash_flow,
            holdings_btc: next_btc,
            portfolio_value_jpy: portfolio_value,
        });

        remaining_btc = next_btc;
    }

    snapshots
}

fn run_investment(
    input: &SimulationInput,
    prices_usd: &[f64],
    monthly_contribution_jpy: f64,
) -> Vec<YearSnapshot> {
    let mut snapshots = Vec::with_capacity(prices_usd.len());
    let mut total_btc = input.initial_holdings_btc;
    let mut total_contributed = 0.0;
    let annual_contribution = monthly_contribution_jpy * 12.0;

    for (index, price_usd) in prices_usd.iter().enumerate() {
        let price_jpy = price_usd * input.exchange_rate_jpy_per_usd;
        let btc_purchased = annual_contribution / price_jpy;
        total_btc += btc_purchased;
        total_contributed += annual_contribution;
        // Valued after the year's purchase.
        let portfolio_value = total_btc * price_jpy;

        snapshots.push(YearSnapshot {
            year: BASE_YEAR + index as i32,
            growth_rate_pct: input.model.annual_growth_rates[index],
            btc_price_usd: *price_usd,
            btc_price_jpy: price_jpy,
            cash_flow_jpy: annual_contribution,
            cash_flow_rate_pct: cash_flow_rate_pct(annual_contribution, portfolio_value),
            cumulative_cash_flow_jpy: total_contributed,
            holdings_btc: total_btc,
            portfolio_value_jpy: portfolio_value,
        });
    }

    snapshots
}

fn cash_flow_rate_pct(cash_flow: f64, portfolio_value: f64) -> f64 {
    if portfolio_value > 0.0 {
        cash_flow / portfolio_value * 100.0
    } else {
        0.0
    }
}
