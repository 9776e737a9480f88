//! Departures - Schedule Histogram and Expiry Sweep
//!
//! ## Responsibilities
//!
//! - Reduce stored departure times to a per-minute histogram
//! - Periodically delete schedule entries whose time-of-day has passed

use crate::error::Result;
use crate::lot_store::LotRepository;
use chrono::{Local, NaiveTime};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Default number of histogram slots returned to clients
pub const DEFAULT_HISTOGRAM_SLOTS: usize = 5;

/// One histogram slot: a minute of the day and how many departures fall on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartureSlot {
    /// Minute of day, `HH:MM`
    pub time: String,
    pub count: u32,
}

/// Reduce stored departure times to the earliest `top_n` per-minute counts.
///
/// Times are normalized to `HH:MM` (seconds dropped), counted per distinct
/// minute, and returned ascending by time-of-day. Unparseable rows are
/// skipped.
pub fn departure_histogram(times: &[String], top_n: usize) -> Vec<DepartureSlot> {
    let mut counts: BTreeMap<String, u32> = BTreeMap::new();

    for raw in times {
        let Some(time) = parse_time_of_day(raw) else {
            tracing::debug!(value = %raw, "Skipping unparseable departure time");
            continue;
        };
        *counts.entry(time.format("%H:%M").to_string()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .take(top_n)
        .map(|(time, count)| DepartureSlot { time, count })
        .collect()
}

/// Parse a `HH:MM[:SS]` time-of-day string
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Background sweep of expired departure schedule entries.
///
/// Compares only time-of-day, so it is sound while sweeps happen much more
/// often than once per day; a schedule set for before midnight yesterday is
/// indistinguishable from one set for earlier today.
pub struct DepartureSweeper {
    lots: LotRepository,
    tick_interval_secs: u64,
}

impl DepartureSweeper {
    /// Create new DepartureSweeper with the default 60-second interval
    pub fn new(lots: LotRepository) -> Self {
        Self {
            lots,
            tick_interval_secs: 60,
        }
    }

    /// Override the sweep interval (tests)
    pub fn with_tick_interval(mut self, secs: u64) -> Self {
        self.tick_interval_secs = secs;
        self
    }

    /// Start the sweep loop as a background task
    pub async fn start(self: Arc<Self>) {
        tracing::info!(
            interval_secs = self.tick_interval_secs,
            "Departure sweeper started"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.tick_interval_secs));
            loop {
                interval.tick().await;
                if let Err(e) = self.sweep().await {
                    tracing::error!(error = %e, "Departure sweep failed");
                }
            }
        });
    }

    /// Delete every entry whose time-of-day precedes the current wall clock
    pub async fn sweep(&self) -> Result<u64> {
        let cutoff = expiry_cutoff(Local::now().time());
        let deleted = self.lots.delete_expired_schedules(&cutoff).await?;

        if deleted > 0 {
            tracing::info!(deleted = deleted, cutoff = %cutoff, "Expired departure schedules removed");
        }

        Ok(deleted)
    }
}

/// Cutoff string for the expiry deletion: zero-padded `HH:MM:SS`, so the
/// store's lexicographic comparison matches temporal order
pub(crate) fn expiry_cutoff(now: NaiveTime) -> String {
    now.format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_histogram_counts_per_minute_sorted_ascending() {
        let histogram = departure_histogram(
            &times(&["08:00:00", "08:00:00", "09:15:00"]),
            DEFAULT_HISTOGRAM_SLOTS,
        );

        assert_eq!(
            histogram,
            vec![
                DepartureSlot {
                    time: "08:00".to_string(),
                    count: 2
                },
                DepartureSlot {
                    time: "09:15".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_histogram_drops_seconds_when_normalizing() {
        let histogram = departure_histogram(&times(&["14:30:15", "14:30:45", "14:30"]), 5);
        assert_eq!(histogram.len(), 1);
        assert_eq!(histogram[0].time, "14:30");
        assert_eq!(histogram[0].count, 3);
    }

    #[test]
    fn test_histogram_skips_unparseable_rows() {
        let histogram = departure_histogram(&times(&["08:00:00", "not-a-time", "25:99"]), 5);
        assert_eq!(histogram.len(), 1);
        assert_eq!(histogram[0].count, 1);
    }

    #[test]
    fn test_histogram_truncates_to_top_n() {
        let histogram = departure_histogram(
            &times(&["06:00", "07:00", "08:00", "09:00", "10:00", "11:00"]),
            5,
        );
        assert_eq!(histogram.len(), 5);
        assert_eq!(histogram.last().unwrap().time, "10:00");
    }

    #[test]
    fn test_histogram_of_no_rows_is_empty() {
        assert!(departure_histogram(&[], 5).is_empty());
    }

    #[test]
    fn test_expiry_cutoff_orders_like_time_of_day() {
        let cutoff = expiry_cutoff(NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert_eq!(cutoff, "12:00:00");

        // The sweep predicate is a string comparison against this cutoff
        assert!("00:01:00" < cutoff.as_str());
        assert!("23:59:00" > cutoff.as_str());
        // Minute-precision entries zero-pad the same way
        assert!("08:45" < cutoff.as_str());
    }
}
