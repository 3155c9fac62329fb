use thiserror::Error;
use tracing::debug;

use super::models::{CalculatedCurrency, Snapshot};

/// Errors that can occur when deriving a display ratio
#[derive(Debug, Error, PartialEq)]
pub enum CalculationError {
    #[error("Could not parse currency value '{0}' as a number")]
    InvalidValue(String),

    #[error("Currency multiplier must be positive, got {0}")]
    ZeroMultiplier(i32),

    #[error("Currency value is zero, ratio is undefined")]
    ZeroValue,

    #[error("Failed to calculate ratio for {char_code}: {source}")]
    Record {
        char_code: String,
        #[source]
        source: Box<CalculationError>,
    },
}

/// Computes `1 / (value / multiplier)` and formats it with the shortest
/// representation that round-trips to the same `f64`.
pub fn calculate_ratio(value: &str, multiplier: i32) -> Result<String, CalculationError> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| CalculationError::InvalidValue(value.to_string()))?;

    if !parsed.is_finite() {
        return Err(CalculationError::InvalidValue(value.to_string()));
    }

    if multiplier <= 0 {
        return Err(CalculationError::ZeroMultiplier(multiplier));
    }

    if parsed == 0.0 {
        return Err(CalculationError::ZeroValue);
    }

    let ratio = 1.0 / (parsed / f64::from(multiplier));

    Ok(format!("{ratio}"))
}

/// Derives the display list for every record of a snapshot, keeping its order.
/// Fails on the first record that cannot be converted.
pub fn calculate_all(snapshot: &Snapshot) -> Result<Vec<CalculatedCurrency>, CalculationError> {
    let mut calculated = Vec::with_capacity(snapshot.len());

    for currency in snapshot {
        let ratio = calculate_ratio(&currency.value, currency.multiplier).map_err(|e| {
            CalculationError::Record {
                char_code: currency.char_code.clone(),
                source: Box::new(e),
            }
        })?;

        calculated.push(CalculatedCurrency {
            name: currency.name.clone(),
            char_code: currency.char_code.clone(),
            ratio,
        });
    }

    debug!("Calculated ratios for {} currencies", calculated.len());

    Ok(calculated)
}
