use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single currency quote as published in the daily feed
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CurrencyRecord {
    /// ISO 4217 numeric code
    pub num_code: i32,

    /// ISO 4217 alphabetic code, e.g. "USD"
    pub char_code: String,

    /// Units of the currency the quoted value refers to (always > 0)
    pub multiplier: i32,

    /// Display name as published by the source
    pub name: String,

    /// Quoted value exactly as received, decimal point normalized
    pub value: String,
}

/// An ordered, immutable set of currency records captured together
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    currencies: Vec<CurrencyRecord>,
}

impl Snapshot {
    pub fn new(currencies: Vec<CurrencyRecord>) -> Self {
        Self { currencies }
    }

    pub fn currencies(&self) -> &[CurrencyRecord] {
        &self.currencies
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CurrencyRecord> {
        self.currencies.iter()
    }

    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }

    /// Looks up a record by its alphabetic code
    pub fn find(&self, char_code: &str) -> Option<&CurrencyRecord> {
        self.currencies.iter().find(|c| c.char_code == char_code)
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a CurrencyRecord;
    type IntoIter = std::slice::Iter<'a, CurrencyRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.currencies.iter()
    }
}

/// Row of the `update_datetimes` table marking when a snapshot was captured
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UpdateDatetime {
    /// Identifier assigned by the store
    pub id: i32,

    /// RFC3339 capture timestamp
    pub update_datetime: String,
}

impl UpdateDatetime {
    pub fn new(id: i32, update_datetime: impl Into<String>) -> Self {
        Self {
            id,
            update_datetime: update_datetime.into(),
        }
    }

    /// Parses the stored RFC3339 timestamp
    pub fn timestamp(&self) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(&self.update_datetime)
    }
}

/// Display ratio derived from a currency record, served over HTTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedCurrency {
    pub name: String,

    #[serde(rename = "charCode")]
    pub char_code: String,

    pub ratio: String,
}
