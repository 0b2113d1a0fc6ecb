//! The three built-in growth-rate schedules. These are fixed reference data
//! (30-year decaying CAGR tables), loaded once and shared process-wide.

use std::sync::LazyLock;

use super::types::{GrowthModel, ModelKey};

static AGGRESSIVE: LazyLock<GrowthModel> = LazyLock::new(|| GrowthModel {
    name: "積極的モデル".to_string(),
    start_price_usd: 100_000.0,
    annual_growth_rates: vec![
        48.4, 44.9, 42.1, 39.2, 37.1, 34.8, 33.1, 31.2, 29.5, 28.3, 27.0, 25.6, 24.5, 23.4, 22.2,
        21.0, 19.8, 18.6, 17.7, 16.8, 15.9, 15.1, 14.4, 13.6, 12.9, 12.3, 11.7, 11.1, 10.5, 10.0,
    ],
});

static BALANCED: LazyLock<GrowthModel> = LazyLock::new(|| GrowthModel {
    name: "標準的モデル".to_string(),
    start_price_usd: 68_000.0,
    annual_growth_rates: vec![
        48.8, 46.2, 42.6, 39.2, 37.0, 34.9, 33.1, 31.3, 29.5, 28.1, 27.0, 25.7, 24.6, 23.7, 22.7,
        21.6, 20.6, 19.6, 18.6, 17.7, 16.8, 15.9, 15.1, 14.4, 13.6, 12.9, 12.3, 11.7, 11.1, 10.5,
    ],
});

static CONSERVATIVE: LazyLock<GrowthModel> = LazyLock::new(|| GrowthModel {
    name: "保守的モデル".to_string(),
    start_price_usd: 36_000.0,
    annual_growth_rates: vec![
        50.0, 50.0, 41.7, 39.1, 36.6, 34.9, 32.8, 31.4, 29.5, 28.4, 27.1, 25.7, 24.6, 23.7, 22.8,
        21.7, 20.4, 19.6, 18.6, 17.7, 16.8, 15.9, 15.1, 14.4, 13.6, 12.9, 12.3, 11.7, 11.1, 10.5,
    ],
});

pub fn builtin_model(key: ModelKey) -> &'static GrowthModel {
    match key {
        ModelKey::Aggressive => &AGGRESSIVE,
        ModelKey::Balanced => &BALANCED,
        ModelKey::Conservative => &CONSERVATIVE,
    }
}

/// Power-law slope for the long-horizon price preview, per model.
pub fn power_law_slope(key: ModelKey) -> f64 {
    match key {
        ModelKey::Aggressive => 0.168,
        ModelKey::Balanced => 0.152,
        ModelKey::Conservative => 0.136,
    }
}
