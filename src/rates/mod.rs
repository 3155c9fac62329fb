pub mod cache;
pub mod models;
pub mod ratio;

pub use cache::{RatesCache, RatesView};
pub use models::{CalculatedCurrency, CurrencyRecord, Snapshot, UpdateDatetime};
pub use ratio::{calculate_all, calculate_ratio, CalculationError};
