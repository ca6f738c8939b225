//! Integration tests for interpolation over tables and the temporal
//! classification and partitioning components.

use chrono::NaiveDate;
use tslab::core::{Column, Role, Table};
use tslab::temporal::{
    fixed_blocks, lookup_period, time_blocks, BlockReference, SamplingClass, TimeDelta,
};
use tslab::{interpolate_table, InterpolationMethod};

fn day(y: i32, m: u32, d: u32) -> f64 {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
        .timestamp() as f64
}

fn gappy_table() -> Table {
    let time: Vec<f64> = (0..12).map(|i| day(2021, 1, 1) + i as f64 * 86_400.0).collect();
    let mut demand: Vec<f64> = (0..12).map(|i| 100.0 + i as f64 * 2.0).collect();
    demand[3] = f64::NAN;
    demand[7] = f64::NAN;
    let mut humidity: Vec<f64> = (0..12).map(|i| 0.4 + 0.01 * i as f64).collect();
    humidity[0] = f64::NAN;
    let weekday_codes: Vec<f64> = vec![
        0.0, 1.0, f64::NAN, 3.0, 4.0, 5.0, 6.0, 0.0, 1.0, 2.0, 3.0, 0.0,
    ];
    Table::new(vec![
        Column::continuous("time", time),
        Column::continuous("demand", demand).with_role(Role::Target),
        Column::continuous("humidity", humidity),
        Column::categorical(
            "day",
            weekday_codes,
            (0..7).map(|d| format!("d{}", d)).collect(),
        ),
    ])
    .unwrap()
    .with_time_column("time")
    .unwrap()
}

#[test]
fn test_interpolation_closes_every_gap() {
    let table = gappy_table();
    for method in [
        InterpolationMethod::Linear,
        InterpolationMethod::Cubic,
        InterpolationMethod::Nearest,
        InterpolationMethod::Mean,
    ] {
        let out = interpolate_table(&table, method, false).unwrap();
        for name in ["demand", "humidity", "day"] {
            assert!(
                !out.column(name).unwrap().has_missing(),
                "method {:?} left gaps in '{}'",
                method,
                name
            );
        }
    }
}

#[test]
fn test_linear_interpolation_is_exact_on_linear_data() {
    let out = interpolate_table(&gappy_table(), InterpolationMethod::Linear, false).unwrap();
    let demand = out.column("demand").unwrap().data.values();
    assert!((demand[3] - 106.0).abs() < 1e-9);
    assert!((demand[7] - 114.0).abs() < 1e-9);
}

#[test]
fn test_categorical_uses_mode() {
    let out = interpolate_table(&gappy_table(), InterpolationMethod::Linear, false).unwrap();
    // Level 0 appears most often in the day column
    assert_eq!(out.column("day").unwrap().data.values()[2], 0.0);
}

#[test]
fn test_time_column_is_untouched() {
    let table = gappy_table();
    let before = table.time_values().unwrap().to_vec();
    let out = interpolate_table(&table, InterpolationMethod::Mean, false).unwrap();
    assert_eq!(out.time_values().unwrap(), &before[..]);
}

#[test]
fn test_daily_sampling_classification() {
    let table = gappy_table();
    let delta = TimeDelta::from_times(table.time_values().unwrap());
    assert!(delta.is_equispaced);
    assert_eq!(delta.classification(), SamplingClass::Daily);
}

#[test]
fn test_monthly_classification_through_leap_february() {
    let times: Vec<f64> = (0..14)
        .map(|i| day(2020 + (i / 12) as i32, (i % 12) as u32 + 1, 1))
        .collect();
    let delta = TimeDelta::from_times(&times);
    assert!(delta.is_equispaced);
    assert_eq!(delta.classification(), SamplingClass::Monthly);
}

#[test]
fn test_weekday_buckets_align_with_calendar() {
    let table = gappy_table();
    let descriptor = lookup_period("day_of_week").unwrap();
    let buckets = time_blocks(table.time_values().unwrap(), descriptor).unwrap();
    // 2021-01-01 was a Friday
    assert_eq!(buckets.labels[buckets.index_map[0]], "Fri");
    // Twelve consecutive days hit every weekday
    assert_eq!(buckets.keys.len(), 7);
    let total: usize = buckets.counts.iter().sum();
    assert_eq!(total, 12);
}

#[test]
fn test_block_partition_covers_rows_in_order() {
    let blocks = fixed_blocks(12, 5, BlockReference::First).unwrap();
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[2].end, 12);
    assert_eq!(blocks[2].end - blocks[2].start, 2);

    let discarded = fixed_blocks(12, 5, BlockReference::Discard).unwrap();
    assert_eq!(discarded.len(), 2);
}

#[test]
fn test_block_aggregation_over_partition() {
    // Aggregate a column per block using the registry, stamping each block
    // with its reference row's time
    let table = gappy_table();
    let filled = interpolate_table(&table, InterpolationMethod::Linear, false).unwrap();
    let values = filled.column("demand").unwrap().data.values();
    let times = filled.time_values().unwrap();

    let op = tslab::lookup("mean").unwrap();
    let blocks = fixed_blocks(values.len(), 4, BlockReference::First).unwrap();
    let aggregated: Vec<(f64, f64)> = blocks
        .iter()
        .map(|b| {
            (
                times[b.reference],
                op.block(&values[b.start..b.end]).unwrap(),
            )
        })
        .collect();
    assert_eq!(aggregated.len(), 3);
    // Linear data: each block mean is the mean of its endpoints
    assert!((aggregated[0].1 - 103.0).abs() < 1e-9);
    assert_eq!(aggregated[1].0, times[4]);
}
