//! Test data factories for feeds, records and snapshots

use encoding_rs::WINDOWS_1251;

use crate::database::models::CurrencyMetadata;
use crate::rates::models::{CurrencyRecord, Snapshot};

/// One `<Valute>` entry as it appears in the feed, values with a comma
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub num_code: &'static str,
    pub char_code: &'static str,
    pub nominal: &'static str,
    pub name: &'static str,
    pub value: &'static str,
}

impl FeedEntry {
    pub const fn new(
        num_code: &'static str,
        char_code: &'static str,
        nominal: &'static str,
        name: &'static str,
        value: &'static str,
    ) -> Self {
        Self {
            num_code,
            char_code,
            nominal,
            name,
            value,
        }
    }

    fn to_xml(&self, id: usize) -> String {
        format!(
            "<Valute ID=\"R{id:05}\"><NumCode>{}</NumCode><CharCode>{}</CharCode>\
             <Nominal>{}</Nominal><Name>{}</Name><Value>{}</Value>\
             <VunitRate>{}</VunitRate></Valute>",
            self.num_code, self.char_code, self.nominal, self.name, self.value, self.value
        )
    }
}

pub const USD: FeedEntry = FeedEntry::new("840", "USD", "1", "Доллар США", "90,1234");
pub const EUR: FeedEntry = FeedEntry::new("978", "EUR", "1", "Евро", "98,5678");
pub const JPY: FeedEntry = FeedEntry::new("392", "JPY", "100", "Японских иен", "60,1122");

/// Factory for daily feed documents
pub struct FeedFactory;

impl FeedFactory {
    /// Feed text declaring `encoding`, one `<Valute>` per entry
    pub fn document(encoding: &str, entries: &[FeedEntry]) -> String {
        let body: String = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| entry.to_xml(i))
            .collect();

        format!(
            "<?xml version=\"1.0\" encoding=\"{encoding}\"?>\
             <ValCurs Date=\"02.03.2024\" name=\"Foreign Currency Market\">{body}</ValCurs>"
        )
    }

    /// UTF-8 feed with comma decimal separators
    pub fn utf8(entries: &[FeedEntry]) -> Vec<u8> {
        Self::document("UTF-8", entries).into_bytes()
    }

    /// windows-1251 feed, the encoding the upstream publishes in
    pub fn windows_1251(entries: &[FeedEntry]) -> Vec<u8> {
        let text = Self::document("windows-1251", entries);
        let (bytes, _, had_errors) = WINDOWS_1251.encode(&text);
        assert!(!had_errors, "fixture must be representable in windows-1251");
        bytes.into_owned()
    }

    /// The USD/EUR/JPY feed in its upstream encoding
    pub fn sample() -> Vec<u8> {
        Self::windows_1251(&[USD, EUR, JPY])
    }
}

/// Factory for parsed records and snapshots
pub struct SnapshotFactory;

impl SnapshotFactory {
    pub fn record(num_code: i32, char_code: &str, multiplier: i32, name: &str, value: &str) -> CurrencyRecord {
        CurrencyRecord {
            num_code,
            char_code: char_code.to_string(),
            multiplier,
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// What parsing `FeedFactory::sample()` yields, in feed order
    pub fn sample() -> Snapshot {
        Snapshot::new(vec![
            Self::record(840, "USD", 1, "Доллар США", "90.1234"),
            Self::record(978, "EUR", 1, "Евро", "98.5678"),
            Self::record(392, "JPY", 100, "Японских иен", "60.1122"),
        ])
    }

    /// Metadata rows matching every record of `snapshot`
    pub fn metadata(snapshot: &Snapshot) -> Vec<CurrencyMetadata> {
        snapshot.iter().map(CurrencyMetadata::from).collect()
    }
}
