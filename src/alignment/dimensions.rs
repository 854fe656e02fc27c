//! Canonical axes of an aligned dataset

use super::intersect::CommonIndices;
use crate::errors::{AlignError, Result};
use crate::source::{Location, Source};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::cmp::Ordering;

/// Post-intersection axes shared by every source
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalAxes {
    pub times: Vec<i64>,
    pub offsets: Vec<f64>,
    pub locations: Vec<Location>,
    pub thresholds: Vec<f64>,
    pub quantiles: Vec<f64>,
    /// First-of-month epoch seconds (UTC) present in `times`
    pub months: Vec<i64>,
    /// First-of-year epoch seconds (UTC) present in `times`
    pub years: Vec<i64>,
}

impl CanonicalAxes {
    /// Resolve axes from the first source and the intersector outputs
    ///
    /// `sources` must be the same slice, in the same order, that produced the
    /// common indices.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a common time lies outside the
    /// calendar range month and year buckets can be computed for.
    pub fn resolve(
        sources: &[&dyn Source],
        times: &CommonIndices<i64>,
        offsets: &CommonIndices<f64>,
        locations: &CommonIndices<i64>,
    ) -> Result<Self> {
        let first = sources[0];
        let times: Vec<i64> = times.indices[0].iter().map(|&i| first.times()[i]).collect();
        let offsets = offsets.indices[0]
            .iter()
            .map(|&i| first.offsets()[i])
            .collect();
        let locations = locations.indices[0]
            .iter()
            .map(|&i| first.locations()[i].clone())
            .collect();

        let thresholds = value_intersection(sources.iter().map(|s| s.thresholds()));
        let quantiles = value_intersection(sources.iter().map(|s| s.quantiles()));
        if thresholds.is_empty() {
            log::warn!("no thresholds common to all sources");
        }
        if quantiles.is_empty() {
            log::warn!("no quantiles common to all sources");
        }

        let months = bucket_times(&times, month_start)?;
        let years = bucket_times(&times, year_start)?;

        Ok(Self {
            times,
            offsets,
            locations,
            thresholds,
            quantiles,
            months,
            years,
        })
    }
}

/// Set intersection of value lists, sorted ascending; may be empty
fn value_intersection<'a>(lists: impl Iterator<Item = &'a [f64]>) -> Vec<f64> {
    let mut common: Option<Vec<f64>> = None;
    for list in lists {
        common = Some(match common {
            None => list.to_vec(),
            Some(acc) => acc
                .into_iter()
                .filter(|v| list.iter().any(|w| w.total_cmp(v) == Ordering::Equal))
                .collect(),
        });
    }
    let mut common = common.unwrap_or_default();
    common.sort_by(f64::total_cmp);
    common.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);
    common
}

fn bucket_times(times: &[i64], truncate: fn(i64) -> Result<i64>) -> Result<Vec<i64>> {
    let mut buckets = times
        .iter()
        .map(|&t| truncate(t))
        .collect::<Result<Vec<i64>>>()?;
    buckets.sort_unstable();
    buckets.dedup();
    Ok(buckets)
}

/// Epoch seconds as a UTC date-time
///
/// # Errors
///
/// Returns a configuration error when `epoch` is outside chrono's range.
pub fn utc_datetime(epoch: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(epoch, 0).ok_or_else(|| {
        AlignError::configuration(format!("time {epoch} is outside the supported date range"))
    })
}

fn date_epoch(date: Option<NaiveDate>, epoch: i64) -> Result<i64> {
    date.and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| AlignError::configuration(format!("no calendar bucket for time {epoch}")))
}

/// Truncate epoch seconds to the first of its month, UTC
pub fn month_start(epoch: i64) -> Result<i64> {
    let date = utc_datetime(epoch)?.date_naive();
    date_epoch(NaiveDate::from_ymd_opt(date.year(), date.month(), 1), epoch)
}

/// Truncate epoch seconds to the first of its year, UTC
pub fn year_start(epoch: i64) -> Result<i64> {
    let year = utc_datetime(epoch)?.year();
    date_epoch(NaiveDate::from_ymd_opt(year, 1, 1), epoch)
}
