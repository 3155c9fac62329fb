//! Decimal separator fix-up for locale-specific feeds.
//!
//! Some publishers write quotes as `90,1234`. Two strategies are available:
//!
//! * [`NormalizeStrategy::NumericFields`] rewrites commas only inside the text
//!   of known numeric elements (`<Value>`, `<VunitRate>`).
//! * [`NormalizeStrategy::Positional`] rewrites every comma after a fixed byte
//!   offset. It is blind to content and relies on the prolog fitting inside
//!   the offset, so a feed with a longer header or commas in names will be
//!   corrupted.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::constants::feed::{DEFAULT_DECIMAL_FIXUP_OFFSET, NUMERIC_ELEMENTS};

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("Feed data is empty")]
    Empty,

    #[error("Unknown normalizer strategy: {0}")]
    UnknownStrategy(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeStrategy {
    /// Replace commas after `offset` bytes, leaving the prolog untouched
    Positional { offset: usize },
    /// Replace commas only inside numeric leaf elements
    NumericFields,
}

impl Default for NormalizeStrategy {
    fn default() -> Self {
        NormalizeStrategy::NumericFields
    }
}

impl FromStr for NormalizeStrategy {
    type Err = NormalizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "numeric_fields" => Ok(NormalizeStrategy::NumericFields),
            "positional" => Ok(NormalizeStrategy::Positional {
                offset: DEFAULT_DECIMAL_FIXUP_OFFSET,
            }),
            other => Err(NormalizeError::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for NormalizeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeStrategy::Positional { offset } => write!(f, "positional (offset {offset})"),
            NormalizeStrategy::NumericFields => f.write_str("numeric_fields"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedNormalizer {
    strategy: NormalizeStrategy,
}

impl FeedNormalizer {
    pub fn new(strategy: NormalizeStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> NormalizeStrategy {
        self.strategy
    }

    /// Rewrites decimal commas to periods in place and hands the buffer back
    pub fn normalize(&self, mut data: Vec<u8>) -> Result<Vec<u8>, NormalizeError> {
        if data.is_empty() {
            return Err(NormalizeError::Empty);
        }

        let replaced = match self.strategy {
            NormalizeStrategy::Positional { offset } => replace_after_offset(&mut data, offset),
            NormalizeStrategy::NumericFields => NUMERIC_ELEMENTS
                .iter()
                .map(|element| replace_inside_element(&mut data, element))
                .sum(),
        };

        debug!(
            "Normalized {} decimal separators using {} strategy",
            replaced, self.strategy
        );

        Ok(data)
    }
}

impl Default for FeedNormalizer {
    fn default() -> Self {
        Self::new(NormalizeStrategy::default())
    }
}

fn replace_after_offset(data: &mut [u8], offset: usize) -> usize {
    let mut replaced = 0;

    if let Some(tail) = data.get_mut(offset..) {
        for byte in tail.iter_mut().filter(|b| **b == b',') {
            *byte = b'.';
            replaced += 1;
        }
    }

    replaced
}

fn replace_inside_element(data: &mut [u8], element: &str) -> usize {
    let open = format!("<{element}>");
    let open = open.as_bytes();
    let mut replaced = 0;
    let mut cursor = 0;

    while let Some(found) = find(&data[cursor..], open) {
        let mut i = cursor + found + open.len();

        // Element text runs until the next markup character
        while i < data.len() && data[i] != b'<' {
            if data[i] == b',' {
                data[i] = b'.';
                replaced += 1;
            }
            i += 1;
        }

        cursor = i;
    }

    replaced
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
