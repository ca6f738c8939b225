//! Sampling Interval Classification
//!
//! Derives a read-only summary of the distinct consecutive gaps in an ordered
//! time column. Gaps are classified as exact-second steps, calendar-month
//! steps (any valid month length, 28 to 31 days) or calendar-year steps
//! (leap aware). Windowing and bucketing consult the classification to pick
//! sensible defaults.

use chrono::{DateTime, Months, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One observed gap class between consecutive timestamps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Gap {
    /// A fixed step of this many seconds
    Seconds(f64),
    /// One calendar month (28 to 31 days depending on the month)
    Month,
    /// One calendar year (365 or 366 days)
    Year,
}

/// Overall sampling classification of a time column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SamplingClass {
    /// Equispaced at one day
    Daily,
    /// Calendar-monthly steps
    Monthly,
    /// Calendar-yearly steps
    Yearly,
    /// Equispaced at a fixed number of seconds
    Fixed(f64),
    /// More than one distinct gap class
    Irregular,
}

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Read-only summary of the gap structure of a time sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeDelta {
    gaps: Vec<Gap>,
    /// Whether exactly one gap class remains after zero gaps are discarded
    pub is_equispaced: bool,
}

impl TimeDelta {
    /// Derive the gap summary from an ordered time sequence (POSIX seconds).
    /// Zero gaps (duplicate timestamps) are discarded before classification.
    pub fn from_times(times: &[f64]) -> Self {
        let mut gaps: Vec<Gap> = Vec::new();
        for pair in times.windows(2) {
            let (t0, t1) = (pair[0], pair[1]);
            let dt = t1 - t0;
            if !dt.is_finite() || dt == 0.0 {
                continue;
            }
            let gap = classify_gap(t0, t1);
            if !gaps.contains(&gap) {
                gaps.push(gap);
            }
        }
        let is_equispaced = gaps.len() == 1;
        Self { gaps, is_equispaced }
    }

    /// The distinct gap classes, in order of first appearance
    pub fn gaps(&self) -> &[Gap] {
        &self.gaps
    }

    /// The single gap class when equispaced
    pub fn gap(&self) -> Option<Gap> {
        if self.is_equispaced {
            self.gaps.first().copied()
        } else {
            None
        }
    }

    /// Classify the sampling interval
    pub fn classification(&self) -> SamplingClass {
        match self.gap() {
            Some(Gap::Month) => SamplingClass::Monthly,
            Some(Gap::Year) => SamplingClass::Yearly,
            Some(Gap::Seconds(s)) if s == SECONDS_PER_DAY => SamplingClass::Daily,
            Some(Gap::Seconds(s)) => SamplingClass::Fixed(s),
            None => SamplingClass::Irregular,
        }
    }

    /// Smallest observed gap expressed in seconds, approximating calendar
    /// steps by their shortest instance
    pub fn min_seconds(&self) -> Option<f64> {
        self.gaps
            .iter()
            .map(|g| match g {
                Gap::Seconds(s) => *s,
                Gap::Month => 28.0 * SECONDS_PER_DAY,
                Gap::Year => 365.0 * SECONDS_PER_DAY,
            })
            .min_by(|a, b| a.partial_cmp(b).unwrap())
    }
}

/// Convert a POSIX-second value to a UTC datetime. Sub-second fractions are
/// preserved as nanoseconds.
pub(crate) fn to_datetime(t: f64) -> Option<DateTime<Utc>> {
    let secs = t.floor();
    let nanos = ((t - secs) * 1e9).round() as u32;
    Utc.timestamp_opt(secs as i64, nanos).single()
}

fn classify_gap(t0: f64, t1: f64) -> Gap {
    let dt = t1 - t0;
    // Calendar steps only make sense for whole-second timestamps
    if t0.fract() == 0.0 && t1.fract() == 0.0 {
        if let (Some(d0), Some(d1)) = (to_datetime(t0), to_datetime(t1)) {
            if d0.checked_add_months(Months::new(1)) == Some(d1) {
                return Gap::Month;
            }
            if d0.checked_add_months(Months::new(12)) == Some(d1) {
                return Gap::Year;
            }
        }
    }
    Gap::Seconds(dt)
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
    fn test_daily_classification() {
        let times: Vec<f64> = (0..10).map(|i| i as f64 * 86_400.0).collect();
        let delta = TimeDelta::from_times(&times);
        assert!(delta.is_equispaced);
        assert_eq!(delta.classification(), SamplingClass::Daily);
    }

    #[test]
    fn test_monthly_spans_all_month_lengths() {
        // Jan..Jun 2020 includes a leap February
        let times = vec![
            ts(2020, 1, 1),
            ts(2020, 2, 1),
            ts(2020, 3, 1),
            ts(2020, 4, 1),
            ts(2020, 5, 1),
            ts(2020, 6, 1),
        ];
        let delta = TimeDelta::from_times(&times);
        assert!(delta.is_equispaced);
        assert_eq!(delta.classification(), SamplingClass::Monthly);
    }

    #[test]
    fn test_yearly_across_leap_years() {
        let times = vec![ts(2019, 3, 1), ts(2020, 3, 1), ts(2021, 3, 1)];
        let delta = TimeDelta::from_times(&times);
        assert!(delta.is_equispaced);
        assert_eq!(delta.classification(), SamplingClass::Yearly);
    }

    #[test]
    fn test_duplicate_timestamps_discarded() {
        let times = vec![0.0, 3600.0, 3600.0, 7200.0];
        let delta = TimeDelta::from_times(&times);
        assert!(delta.is_equispaced);
        assert_eq!(delta.classification(), SamplingClass::Fixed(3600.0));
    }

    #[test]
    fn test_irregular() {
        let times = vec![0.0, 10.0, 30.0, 35.0];
        let delta = TimeDelta::from_times(&times);
        assert!(!delta.is_equispaced);
        assert_eq!(delta.classification(), SamplingClass::Irregular);
        assert_eq!(delta.gaps().len(), 3);
        assert_eq!(delta.min_seconds(), Some(5.0));
    }
}
