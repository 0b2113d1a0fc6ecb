//! JPY display formatting in 万円/億円 units, plus the companion parser.
//!
//! The parser exists so that anything the formatter emits can be recovered
//! numerically (to the 2-decimal display precision). Consumers should still
//! prefer the raw fields on [`super::types::YearSnapshot`]; parsing formatted
//! strings is a fallback, not a data path.

use super::types::SimulationError;

pub const MAN_YEN: f64 = 10_000.0;
pub const OKU_YEN: f64 = 100_000_000.0;

/// Formats a JPY amount for tabular display: `X.XX億円` at or above 10^8,
/// `X.XX万円` at or above 10^4, whole `X円` below that.
pub fn format_jpy(amount: f64) -> String {
    if amount >= OKU_YEN {
        format!("{:.2}億円", amount / OKU_YEN)
    } else if amount >= MAN_YEN {
        format!("{:.2}万円", amount / MAN_YEN)
    } else {
        format!("{amount:.0}円")
    }
}

/// Recovers the numeric value from a string produced by [`format_jpy`].
pub fn parse_jpy(formatted: &str) -> Result<f64, SimulationError> {
    let formatted = formatted.trim();
    let (digits, unit) = if let Some(rest) = formatted.strip_suffix("億円") {
        (rest, OKU_YEN)
    } else if let Some(rest) = formatted.strip_suffix("万円") {
        (rest, MAN_YEN)
    } else if let Some(rest) = formatted.strip_suffix("円") {
        (rest, 1.0)
    } else {
        return Err(SimulationError::validation(
            "amount",
            format!("not a formatted JPY amount: {formatted}"),
        ));
    };

    digits
        .trim()
        .parse::<f64>()
        .map(|value| value * unit)
        .map_err(|_| {
            SimulationError::validation("amount", format!("not a formatted JPY amount: {formatted}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Half of the leading digits' 2-decimal resolution in the given unit.
    fn display_tolerance(amount: f64) -> f64 {
        if amount >= OKU_YEN {
            0.005 * OKU_YEN
        } else if amount >= MAN_YEN {
            0.005 * MAN_YEN
        } else {
            0.5
        }
    }

    #[test]
    fn formats_each_magnitude_band() {
        assert_eq!(format_jpy(500.0), "500円");
        assert_eq!(format_jpy(15_000.0), "1.50万円");
        assert_eq!(format_jpy(250_000_000.0), "2.50億円");
        assert_eq!(format_jpy(10_200_000.0), "1020.00万円");
    }

    #[test]
    fn round_trips_within_display_precision() {
        for amount in [500.0, 15_000.0, 250_000_000.0, 9_999.0, 10_000.0, 123_456_789.0] {
            let parsed = parse_jpy(&format_jpy(amount)).expect("formatter output must parse");
            let tol = display_tolerance(amount);
            assert!(
                (parsed - amount).abs() <= tol,
                "amount {amount}: parsed {parsed}, tolerance {tol}"
            );
        }
    }

    #[test]
    fn parses_whole_yen_without_decimals() {
        assert_eq!(parse_jpy("0円").unwrap(), 0.0);
        assert_eq!(parse_jpy("500円").unwrap(), 500.0);
    }

    #[test]
    fn rejects_strings_the_formatter_never_produces() {
        assert!(parse_jpy("500").is_err());
        assert!(parse_jpy("abc万円").is_err());
        assert!(parse_jpy("").is_err());
    }
}
