//! Period and Block Partitioning
//!
//! Groups row indices of a time column into calendar-period buckets (e.g.
//! month-of-year, day-of-week, or "truncate to month") or into consecutive
//! fixed-size blocks. The resulting mapping drives block aggregation: one
//! aggregated value per bucket, stamped with the bucket's representative
//! time.

use crate::core::error::{Error, Result};
use crate::temporal::delta::to_datetime;
use chrono::{Datelike, TimeZone, Timelike, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The calendar unit a period descriptor extracts or truncates to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodUnit {
    /// Truncate to the start of the year
    Years,
    /// Truncate to the start of the month
    Months,
    /// Truncate to midnight
    Days,
    /// Truncate to the start of the hour
    Hours,
    /// Truncate to the start of the minute
    Minutes,
    /// Truncate to the whole second
    Seconds,
    /// Periodic: month within the year, 1 to 12
    MonthOfYear,
    /// Periodic: day within the week, 0 (Monday) to 6 (Sunday)
    DayOfWeek,
    /// Periodic: ordinal day within the year, 1 to 366
    DayOfYear,
    /// Periodic: hour within the day, 0 to 23
    HourOfDay,
}

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const WEEKDAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Immutable description of a calendar partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodDescriptor {
    /// Registry key
    pub key: &'static str,
    /// The extracted or truncated unit
    pub unit: PeriodUnit,
    /// Whether the unit is periodic (bounded cardinality)
    pub periodic: bool,
    /// Categorical level names for named periodic units
    pub level_names: Option<&'static [&'static str]>,
}

impl PeriodDescriptor {
    /// Extract the bucket key for one timestamp. Periodic units yield the
    /// calendar field; truncating units yield the POSIX seconds of the
    /// period start.
    pub fn extract(&self, t: f64) -> Result<f64> {
        let dt = to_datetime(t)
            .ok_or_else(|| Error::InvalidInput(format!("Timestamp out of range: {}", t)))?;
        let key = match self.unit {
            PeriodUnit::MonthOfYear => dt.month() as f64,
            PeriodUnit::DayOfWeek => dt.weekday().num_days_from_monday() as f64,
            PeriodUnit::DayOfYear => dt.ordinal() as f64,
            PeriodUnit::HourOfDay => dt.hour() as f64,
            PeriodUnit::Years => Utc
                .with_ymd_and_hms(dt.year(), 1, 1, 0, 0, 0)
                .single()
                .map(|d| d.timestamp() as f64)
                .unwrap_or(f64::NAN),
            PeriodUnit::Months => Utc
                .with_ymd_and_hms(dt.year(), dt.month(), 1, 0, 0, 0)
                .single()
                .map(|d| d.timestamp() as f64)
                .unwrap_or(f64::NAN),
            PeriodUnit::Days => Utc
                .with_ymd_and_hms(dt.year(), dt.month(), dt.day(), 0, 0, 0)
                .single()
                .map(|d| d.timestamp() as f64)
                .unwrap_or(f64::NAN),
            PeriodUnit::Hours => Utc
                .with_ymd_and_hms(dt.year(), dt.month(), dt.day(), dt.hour(), 0, 0)
                .single()
                .map(|d| d.timestamp() as f64)
                .unwrap_or(f64::NAN),
            PeriodUnit::Minutes => Utc
                .with_ymd_and_hms(dt.year(), dt.month(), dt.day(), dt.hour(), dt.minute(), 0)
                .single()
                .map(|d| d.timestamp() as f64)
                .unwrap_or(f64::NAN),
            PeriodUnit::Seconds => t.floor(),
        };
        if key.is_nan() {
            return Err(Error::InvalidInput(format!(
                "Timestamp out of range: {}",
                t
            )));
        }
        Ok(key)
    }

    /// Human-readable label for a bucket key produced by [`extract`](Self::extract)
    pub fn label(&self, key: f64) -> String {
        match self.unit {
            PeriodUnit::MonthOfYear => MONTH_NAMES[(key as usize - 1).min(11)].to_string(),
            PeriodUnit::DayOfWeek => WEEKDAY_NAMES[(key as usize).min(6)].to_string(),
            PeriodUnit::DayOfYear | PeriodUnit::HourOfDay => format!("{}", key as i64),
            _ => {
                let fmt = match self.unit {
                    PeriodUnit::Years => "%Y",
                    PeriodUnit::Months => "%Y-%m",
                    PeriodUnit::Days => "%Y-%m-%d",
                    PeriodUnit::Hours => "%Y-%m-%d %H:00",
                    PeriodUnit::Minutes => "%Y-%m-%d %H:%M",
                    _ => "%Y-%m-%d %H:%M:%S",
                };
                to_datetime(key)
                    .map(|d| d.format(fmt).to_string())
                    .unwrap_or_else(|| format!("{}", key))
            }
        }
    }
}

lazy_static! {
    static ref PERIOD_REGISTRY: BTreeMap<&'static str, PeriodDescriptor> = {
        let descriptors = [
            PeriodDescriptor { key: "years", unit: PeriodUnit::Years, periodic: false, level_names: None },
            PeriodDescriptor { key: "months", unit: PeriodUnit::Months, periodic: false, level_names: None },
            PeriodDescriptor { key: "days", unit: PeriodUnit::Days, periodic: false, level_names: None },
            PeriodDescriptor { key: "hours", unit: PeriodUnit::Hours, periodic: false, level_names: None },
            PeriodDescriptor { key: "minutes", unit: PeriodUnit::Minutes, periodic: false, level_names: None },
            PeriodDescriptor { key: "seconds", unit: PeriodUnit::Seconds, periodic: false, level_names: None },
            PeriodDescriptor { key: "month_of_year", unit: PeriodUnit::MonthOfYear, periodic: true, level_names: Some(&MONTH_NAMES) },
            PeriodDescriptor { key: "day_of_week", unit: PeriodUnit::DayOfWeek, periodic: true, level_names: Some(&WEEKDAY_NAMES) },
            PeriodDescriptor { key: "day_of_year", unit: PeriodUnit::DayOfYear, periodic: true, level_names: None },
            PeriodDescriptor { key: "hour_of_day", unit: PeriodUnit::HourOfDay, periodic: true, level_names: None },
        ];
        descriptors.into_iter().map(|d| (d.key, d)).collect()
    };
}

/// Look up a period descriptor by key
pub fn lookup_period(key: &str) -> Result<&'static PeriodDescriptor> {
    PERIOD_REGISTRY
        .get(key)
        .ok_or_else(|| Error::UnknownPeriod(key.to_string()))
}

/// All registered period descriptors, ordered by key
pub fn all_periods() -> impl Iterator<Item = &'static PeriodDescriptor> {
    PERIOD_REGISTRY.values()
}

/// Default partition for a sampling classification, used by hosts to
/// preselect a sensible bucketing for a freshly loaded series
pub fn default_period_for(class: crate::temporal::delta::SamplingClass) -> &'static PeriodDescriptor {
    use crate::temporal::delta::SamplingClass;
    let key = match class {
        SamplingClass::Daily => "day_of_week",
        SamplingClass::Monthly => "month_of_year",
        SamplingClass::Yearly => "years",
        SamplingClass::Fixed(seconds) if seconds < 86_400.0 => "hour_of_day",
        SamplingClass::Fixed(_) | SamplingClass::Irregular => "days",
    };
    &PERIOD_REGISTRY[key]
}

/// Result of grouping rows into calendar-period buckets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeBuckets {
    /// Distinct bucket keys, ascending
    pub keys: Vec<f64>,
    /// Labels parallel to `keys`
    pub labels: Vec<String>,
    /// Bucket index for each original row
    pub index_map: Vec<usize>,
    /// Row count per bucket, parallel to `keys`
    pub counts: Vec<usize>,
}

/// Group row indices of a time sequence into calendar-period buckets.
/// Buckets are ordered ascending by bucket key; `index_map[i]` gives the
/// bucket index of row `i`.
pub fn time_blocks(times: &[f64], descriptor: &PeriodDescriptor) -> Result<TimeBuckets> {
    let mut row_keys = Vec::with_capacity(times.len());
    for &t in times {
        if !t.is_finite() {
            return Err(Error::InvalidInput(
                "Time column contains undefined values".to_string(),
            ));
        }
        row_keys.push(descriptor.extract(t)?);
    }

    let mut keys: Vec<f64> = row_keys.clone();
    keys.sort_by(|a, b| a.partial_cmp(b).unwrap());
    keys.dedup();

    let index_map: Vec<usize> = row_keys
        .iter()
        .map(|k| keys.partition_point(|x| x < k))
        .collect();

    let mut counts = vec![0usize; keys.len()];
    for &b in &index_map {
        counts[b] += 1;
    }

    let labels = keys.iter().map(|&k| descriptor.label(k)).collect();

    Ok(TimeBuckets {
        keys,
        labels,
        index_map,
        counts,
    })
}

/// Which row stands in for a fixed-size block, and how an incomplete
/// trailing block is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockReference {
    /// Drop an incomplete trailing block entirely
    Discard,
    /// First row of each block
    First,
    /// Middle row of each block
    Middle,
    /// Last row of each block
    Last,
}

/// One consecutive block of rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// First row index (inclusive)
    pub start: usize,
    /// Past-the-end row index
    pub end: usize,
    /// Representative row per the reference policy
    pub reference: usize,
}

/// Slice the row range `0..n` into consecutive blocks of `width` rows.
/// Under [`BlockReference::Discard`] an incomplete trailing block is
/// dropped; otherwise it is kept and the reference policy picks each
/// block's representative row.
pub fn fixed_blocks(n: usize, width: usize, reference: BlockReference) -> Result<Vec<Block>> {
    if width == 0 {
        return Err(Error::InvalidInput(
            "Block width must be at least 1".to_string(),
        ));
    }
    let mut blocks = Vec::new();
    let mut start = 0;
    while start < n {
        let end = (start + width).min(n);
        let complete = end - start == width;
        if !complete && reference == BlockReference::Discard {
            break;
        }
        let reference_row = match reference {
            BlockReference::First | BlockReference::Discard => start,
            BlockReference::Middle => start + (end - start) / 2,
            BlockReference::Last => end - 1,
        };
        blocks.push(Block {
            start,
            end,
            reference: reference_row,
        });
        start = end;
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32) -> f64 {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp() as f64
    }

    #[test]
    fn test_month_of_year_buckets() {
        let desc = lookup_period("month_of_year").unwrap();
        let times = vec![
            ts(2020, 1, 5),
            ts(2020, 2, 5),
            ts(2021, 1, 5),
            ts(2021, 3, 5),
        ];
        let buckets = time_blocks(&times, desc).unwrap();
        assert_eq!(buckets.keys, vec![1.0, 2.0, 3.0]);
        assert_eq!(buckets.labels, vec!["Jan", "Feb", "Mar"]);
        assert_eq!(buckets.index_map, vec![0, 1, 0, 2]);
        assert_eq!(buckets.counts, vec![2, 1, 1]);
    }

    #[test]
    fn test_truncate_to_month() {
        let desc = lookup_period("months").unwrap();
        let times = vec![ts(2020, 1, 5), ts(2020, 1, 20), ts(2020, 2, 3)];
        let buckets = time_blocks(&times, desc).unwrap();
        assert_eq!(buckets.keys.len(), 2);
        assert_eq!(buckets.keys[0], ts(2020, 1, 1));
        assert_eq!(buckets.labels[0], "2020-01");
        assert_eq!(buckets.index_map, vec![0, 0, 1]);
    }

    #[test]
    fn test_day_of_week_extraction() {
        let desc = lookup_period("day_of_week").unwrap();
        // 2020-01-06 was a Monday
        assert_eq!(desc.extract(ts(2020, 1, 6)).unwrap(), 0.0);
        assert_eq!(desc.label(0.0), "Mon");
        assert_eq!(desc.label(6.0), "Sun");
    }

    #[test]
    fn test_unknown_period_key() {
        assert!(matches!(
            lookup_period("fortnights"),
            Err(Error::UnknownPeriod(_))
        ));
    }

    #[test]
    fn test_fixed_blocks_discard() {
        let blocks = fixed_blocks(10, 4, BlockReference::Discard).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].start, 4);
        assert_eq!(blocks[1].end, 8);
    }

    #[test]
    fn test_fixed_blocks_keep_last() {
        let blocks = fixed_blocks(10, 4, BlockReference::Last).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[2].start, 8);
        assert_eq!(blocks[2].end, 10);
        assert_eq!(blocks[2].reference, 9);
    }

    #[test]
    fn test_fixed_blocks_middle_reference() {
        let blocks = fixed_blocks(9, 3, BlockReference::Middle).unwrap();
        assert_eq!(blocks[0].reference, 1);
        assert_eq!(blocks[1].reference, 4);
    }

    #[test]
    fn test_zero_width_rejected() {
        assert!(fixed_blocks(10, 0, BlockReference::First).is_err());
    }

    #[test]
    fn test_registry_lists_all_descriptors() {
        let keys: Vec<&str> = all_periods().map(|d| d.key).collect();
        assert_eq!(keys.len(), 10);
        assert!(keys.contains(&"month_of_year"));
        assert!(keys.contains(&"seconds"));
    }

    #[test]
    fn test_default_period_from_sampling() {
        use crate::temporal::delta::SamplingClass;
        assert_eq!(default_period_for(SamplingClass::Monthly).key, "month_of_year");
        assert_eq!(default_period_for(SamplingClass::Daily).key, "day_of_week");
        assert_eq!(default_period_for(SamplingClass::Fixed(3600.0)).key, "hour_of_day");
    }
}
