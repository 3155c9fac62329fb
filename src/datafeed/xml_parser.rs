use std::collections::HashSet;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;
use xml::reader::{EventReader, ParserConfig, XmlEvent};

use super::encoding::decode_to_utf8;
use crate::constants::feed::{CURRENCY_ELEMENT, DEFAULT_INITIAL_CAPACITY};
use crate::rates::models::{CurrencyRecord, Snapshot};

/// Errors that can occur while turning feed bytes into a snapshot
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to decode feed encoding: {0}")]
    Encoding(String),

    #[error("Malformed XML: {0}")]
    Malformed(String),

    #[error("Truncated XML document: {0}")]
    Truncated(String),

    #[error("Currency is missing required field {0}")]
    MissingField(&'static str),

    #[error("Invalid value '{value}' for field {field}")]
    InvalidField { field: &'static str, value: String },

    #[error("Currency {char_code} has non-positive multiplier {multiplier}")]
    InvalidMultiplier { char_code: String, multiplier: i32 },

    #[error("Duplicate currency code {0} in feed")]
    DuplicateCharCode(String),
}

impl ParseError {
    /// Sorts a reader failure into truncation or malformed markup
    fn from_reader_message(message: String) -> Self {
        let lowered = message.to_ascii_lowercase();

        if lowered.contains("end of stream") || lowered.contains("eof") {
            ParseError::Truncated(message)
        } else {
            ParseError::Malformed(message)
        }
    }
}

impl From<xml::reader::Error> for ParseError {
    fn from(e: xml::reader::Error) -> Self {
        ParseError::from_reader_message(e.to_string())
    }
}

/// How the document is walked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// Read and check the whole document before extracting currencies
    Document,
    /// Walk the event stream and decode each currency element as it appears
    Streaming,
}

/// Fields of one currency element as found in the feed
#[derive(Debug, Default)]
struct XmlValute {
    num_code: Option<String>,
    char_code: Option<String>,
    nominal: Option<String>,
    name: Option<String>,
    value: Option<String>,
}

impl XmlValute {
    fn set(&mut self, element: &str, text: String) {
        let slot = match element {
            "NumCode" => &mut self.num_code,
            "CharCode" => &mut self.char_code,
            "Nominal" => &mut self.nominal,
            "Name" => &mut self.name,
            "Value" => &mut self.value,
            _ => return,
        };
        *slot = Some(text);
    }

    fn into_record(self) -> Result<CurrencyRecord, ParseError> {
        let num_code = required(self.num_code, "NumCode")?;
        let nominal = required(self.nominal, "Nominal")?;

        let num_code = num_code
            .parse::<i32>()
            .map_err(|_| ParseError::InvalidField {
                field: "NumCode",
                value: num_code.clone(),
            })?;
        let multiplier = nominal
            .parse::<i32>()
            .map_err(|_| ParseError::InvalidField {
                field: "Nominal",
                value: nominal.clone(),
            })?;

        let char_code = required(self.char_code, "CharCode")?;
        if multiplier <= 0 {
            return Err(ParseError::InvalidMultiplier {
                char_code,
                multiplier,
            });
        }

        Ok(CurrencyRecord {
            num_code,
            char_code,
            multiplier,
            name: required(self.name, "Name")?,
            value: required(self.value, "Value")?,
        })
    }
}

fn required(field: Option<String>, name: &'static str) -> Result<String, ParseError> {
    field
        .map(|value| value.trim().to_string())
        .ok_or(ParseError::MissingField(name))
}

/// Decodes normalized feed bytes into a snapshot
#[derive(Debug, Clone)]
pub struct FeedParser {
    strategy: ParseStrategy,
    capacity_hint: usize,
}

impl FeedParser {
    pub fn new(strategy: ParseStrategy, capacity_hint: usize) -> Self {
        Self {
            strategy,
            capacity_hint,
        }
    }

    pub fn strategy(&self) -> ParseStrategy {
        self.strategy
    }

    pub fn parse(&self, data: &[u8]) -> Result<Snapshot, ParseError> {
        let started = Instant::now();
        let text = decode_to_utf8(data)?;

        let raw = match self.strategy {
            ParseStrategy::Document => {
                debug!("Using whole-document parsing");
                self.parse_document(&text)?
            }
            ParseStrategy::Streaming => {
                debug!("Using streaming parsing");
                self.parse_streaming(&text)?
            }
        };

        let snapshot = self.finalize(raw)?;

        debug!(
            "Parsing time overall: {:?} ({} currencies)",
            started.elapsed(),
            snapshot.len()
        );

        Ok(snapshot)
    }

    fn parse_document(&self, text: &str) -> Result<Vec<XmlValute>, ParseError> {
        let events = event_reader(text).into_iter().collect::<Result<Vec<_>, _>>()?;
        debug!("Read {} XML events", events.len());

        collect_currencies(events.into_iter().map(Ok), self.capacity_hint)
    }

    fn parse_streaming(&self, text: &str) -> Result<Vec<XmlValute>, ParseError> {
        let events = event_reader(text)
            .into_iter()
            .map(|event| event.map_err(ParseError::from));

        collect_currencies(events, self.capacity_hint)
    }

    fn finalize(&self, raw: Vec<XmlValute>) -> Result<Snapshot, ParseError> {
        let mut records = Vec::with_capacity(self.capacity_hint.max(raw.len()));
        let mut seen = HashSet::with_capacity(raw.len());

        for currency in raw {
            let record = currency.into_record()?;

            if !seen.insert(record.char_code.clone()) {
                return Err(ParseError::DuplicateCharCode(record.char_code));
            }

            records.push(record);
        }

        Ok(Snapshot::new(records))
    }
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new(ParseStrategy::Streaming, DEFAULT_INITIAL_CAPACITY)
    }
}

fn event_reader(text: &str) -> EventReader<&[u8]> {
    ParserConfig::new()
        .trim_whitespace(true)
        .cdata_to_characters(true)
        .create_reader(text.as_bytes())
}

/// Picks every currency element out of the event sequence, skipping
/// anything else found between them
fn collect_currencies<I>(mut events: I, capacity: usize) -> Result<Vec<XmlValute>, ParseError>
where
    I: Iterator<Item = Result<XmlEvent, ParseError>>,
{
    let mut currencies = Vec::with_capacity(capacity);

    while let Some(event) = events.next() {
        match event? {
            XmlEvent::StartElement { name, .. } if name.local_name == CURRENCY_ELEMENT => {
                currencies.push(read_currency(&mut events)?);
            }
            XmlEvent::EndDocument => return Ok(currencies),
            _ => {}
        }
    }

    Err(ParseError::Truncated("document ended before its root element closed".to_string()))
}

/// Consumes events up to the end of the current currency element.
///
/// Only text directly inside a field counts; markup nested in a field is
/// dropped along with its text.
fn read_currency<I>(events: &mut I) -> Result<XmlValute, ParseError>
where
    I: Iterator<Item = Result<XmlEvent, ParseError>>,
{
    let mut currency = XmlValute::default();
    let mut depth = 0usize;
    let mut field: Option<String> = None;
    let mut text = String::new();

    for event in events.by_ref() {
        match event? {
            XmlEvent::StartElement { name, .. } => {
                depth += 1;
                if depth == 1 {
                    field = Some(name.local_name);
                    text.clear();
                }
            }
            XmlEvent::Characters(chunk) if depth == 1 => text.push_str(&chunk),
            XmlEvent::EndElement { .. } => {
                if depth == 0 {
                    return Ok(currency);
                }
                if depth == 1 {
                    if let Some(element) = field.take() {
                        currency.set(&element, std::mem::take(&mut text));
                    }
                }
                depth -= 1;
            }
            XmlEvent::EndDocument => break,
            _ => {}
        }
    }

    Err(ParseError::Truncated(format!(
        "document ended inside <{CURRENCY_ELEMENT}>"
    )))
}
