use chrono::{DateTime, Duration, FixedOffset, NaiveTime};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::clock::Clock;
use crate::constants::time::CUTOVER_TIME_FORMAT;
use crate::rates::models::UpdateDatetime;

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("Invalid cutover time '{value}', expected HH:MM:SS: {source}")]
    InvalidCutover {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Cannot parse stored update time '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Decides when the stored snapshot needs refreshing, relative to a fixed
/// daily cutover time.
///
/// Today's, yesterday's and tomorrow's cutover instants are derived from the
/// clock on every call, so nothing has to survive restarts or day changes.
pub struct UpdateScheduler {
    cutover: NaiveTime,
    clock: Arc<dyn Clock>,
}

impl UpdateScheduler {
    pub fn new(cutover: &str, clock: Arc<dyn Clock>) -> Result<Self, SchedulingError> {
        let parsed = parse_cutover(cutover)?;

        Ok(Self {
            cutover: parsed,
            clock,
        })
    }

    pub fn cutover(&self) -> NaiveTime {
        self.cutover
    }

    /// Whether a new snapshot should be fetched.
    ///
    /// Data is fresh when it was captured after today's cutover, or when it
    /// was captured between yesterday's and today's cutover and today's
    /// cutover has not been reached yet. No stored update means stale.
    pub fn is_stale(&self, latest: Option<&UpdateDatetime>) -> Result<bool, SchedulingError> {
        let latest = match latest {
            Some(latest) => latest,
            None => {
                debug!("No update recorded yet, data is stale");
                return Ok(true);
            }
        };

        let captured = latest
            .timestamp()
            .map_err(|source| SchedulingError::InvalidTimestamp {
                value: latest.update_datetime.clone(),
                source,
            })?;

        let now = self.clock.now();
        let today = self.cutover_on(now, 0);
        let yesterday = self.cutover_on(now, -1);

        let fresh = captured > today
            || (captured > yesterday && captured < today && now < today);

        debug!(
            "Latest update {} against cutover {}: {}",
            captured,
            today,
            if fresh { "fresh" } else { "stale" }
        );

        Ok(!fresh)
    }

    /// Time left until the next cutover: today's if it is still ahead,
    /// otherwise tomorrow's.
    pub fn next_due(&self) -> std::time::Duration {
        let now = self.clock.now();
        let today = self.cutover_on(now, 0);

        let due = if now > today {
            self.cutover_on(now, 1)
        } else {
            today
        };

        (due - now).abs().to_std().unwrap_or_default()
    }

    /// The cutover instant `days` days away from `now`'s calendar date,
    /// in `now`'s offset
    fn cutover_on(&self, now: DateTime<FixedOffset>, days: i64) -> DateTime<FixedOffset> {
        let offset = *now.offset();
        let local = (now.date_naive() + Duration::days(days)).and_time(self.cutover);
        let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));

        DateTime::from_naive_utc_and_offset(utc, offset)
    }
}

/// Parses a strict `HH:MM:SS` time of day
pub fn parse_cutover(value: &str) -> Result<NaiveTime, SchedulingError> {
    NaiveTime::parse_from_str(value.trim(), CUTOVER_TIME_FORMAT).map_err(|source| {
        SchedulingError::InvalidCutover {
            value: value.to_string(),
            source,
        }
    })
}
