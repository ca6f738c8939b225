//! Temporal Structure: Sampling Intervals and Calendar Partitions
//!
//! Classification of the sampling interval of a time column and the
//! period/block partitioners used by block aggregation.

pub mod delta;
pub mod partition;

pub use delta::{Gap, SamplingClass, TimeDelta};
pub use partition::{
    all_periods, default_period_for, fixed_blocks, lookup_period, time_blocks, Block,
    BlockReference, PeriodDescriptor, PeriodUnit, TimeBuckets,
};
