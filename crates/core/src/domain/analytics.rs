// Daily shop analytics (derived from queue entries)

use crate::domain::entry::{EntryStatus, QueueEntry};
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

const MILLIS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAnalytics {
    pub shop_id: String,
    pub date: NaiveDate,
    /// Entries served to completion
    pub total_customers: u32,
    /// Entries that left the queue before being called
    pub cancelled: u32,
    /// Mean minutes between joining and being called, rounded
    pub average_wait_time: Option<u32>,
    /// UTC hour with the most joins (earliest hour wins ties)
    pub peak_hour: Option<u32>,
}

impl DailyAnalytics {
    /// Summarise the entries that joined on `date` (UTC)
    pub fn compute(shop_id: &str, date: NaiveDate, entries: &[QueueEntry]) -> Self {
        let todays: Vec<&QueueEntry> = entries
            .iter()
            .filter(|e| e.shop_id == shop_id && utc_date(e.joined_at) == Some(date))
            .collect();

        let total_customers = todays
            .iter()
            .filter(|e| e.status == EntryStatus::Completed)
            .count() as u32;
        let cancelled = todays
            .iter()
            .filter(|e| e.status == EntryStatus::Cancelled)
            .count() as u32;

        let waits: Vec<i64> = todays
            .iter()
            .filter_map(|e| e.called_at.map(|called| (called - e.joined_at).max(0)))
            .collect();
        let average_wait_time = if waits.is_empty() {
            None
        } else {
            let mean_ms = waits.iter().sum::<i64>() as f64 / waits.len() as f64;
            Some((mean_ms / MILLIS_PER_MINUTE as f64).round() as u32)
        };

        let mut joins_per_hour = [0u32; 24];
        for entry in &todays {
            if let Some(hour) = utc_hour(entry.joined_at) {
                joins_per_hour[hour as usize] += 1;
            }
        }
        let peak_hour = joins_per_hour
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            // max_by_key keeps the last maximum, so compare on reversed hour
            .max_by_key(|(hour, count)| (**count, std::cmp::Reverse(*hour)))
            .map(|(hour, _)| hour as u32);

        Self {
            shop_id: shop_id.to_string(),
            date,
            total_customers,
            cancelled,
            average_wait_time,
            peak_hour,
        }
    }
}

/// Epoch-ms bounds `[start, end)` of a UTC day
pub fn day_bounds_millis(date: NaiveDate) -> (i64, i64) {
    let start = date
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or_default();
    (start, start + 24 * 60 * MILLIS_PER_MINUTE)
}

/// UTC calendar date of an epoch-ms timestamp
pub fn utc_date(millis: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.date_naive())
}

fn utc_hour(millis: i64) -> Option<u32> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.hour())
}
