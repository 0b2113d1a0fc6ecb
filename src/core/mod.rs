mod engine;
mod models;
mod money;
mod types;

pub use engine::{power_law_price_usd, run_simulation};
pub use models::{builtin_model, power_law_slope};
pub use money::{MAN_YEN, format_jpy, parse_jpy};
pub use types::{
    BASE_YEAR, CashFlowPolicy, GrowthModel, ModelKey, SimulationError, SimulationInput,
    WithdrawalPolicy, YearSnapshot,
};
