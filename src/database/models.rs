use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::rates::models::CurrencyRecord;

/// Static description of a currency, seeded ahead of any feed import.
///
/// Value rows reference this by `num_code`; the multiplier returned with a
/// snapshot comes from here, not from the feed.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CurrencyMetadata {
    pub num_code: i32,
    pub char_code: String,
    pub name: String,
    pub multiplier: i32,
}

impl From<&CurrencyRecord> for CurrencyMetadata {
    fn from(record: &CurrencyRecord) -> Self {
        Self {
            num_code: record.num_code,
            char_code: record.char_code.clone(),
            name: record.name.clone(),
            multiplier: record.multiplier,
        }
    }
}

/// One stored quote: the value of a currency at a given update
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CurrencyValue {
    pub info_num_code: i32,
    pub update_datetime_id: i32,
    pub currency_value: String,
}
