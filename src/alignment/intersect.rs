//! Common index sets across sources
//!
//! For one dimension, finds the values present in every source (and in the
//! optional allow-list), sorted ascending, together with each source's
//! positions of those values in its own raw order.

use crate::errors::{AlignError, Result};
use crate::source::Source;
use std::cmp::Ordering;
use std::fmt;

/// A value type that can be intersected along a dimension
pub trait DimensionValue: Copy + fmt::Debug {
    fn total_cmp(&self, other: &Self) -> Ordering;
}

impl DimensionValue for i64 {
    fn total_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

impl DimensionValue for f64 {
    fn total_cmp(&self, other: &Self) -> Ordering {
        f64::total_cmp(self, other)
    }
}

/// The dimensions that are intersected across sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Time,
    Offset,
    /// Compared by location id
    Location,
}

impl Dimension {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Offset => "offset",
            Self::Location => "location",
        }
    }
}

/// Common values of a dimension and where they sit in each source
#[derive(Debug, Clone, PartialEq)]
pub struct CommonIndices<T> {
    /// Sorted values present in every source
    pub values: Vec<T>,
    /// One index array per source; `raw[indices[i][k]] == values[k]`
    pub indices: Vec<Vec<usize>>,
}

fn sorted_unique<T: DimensionValue>(values: &[T]) -> Vec<T> {
    let mut out = values.to_vec();
    out.sort_by(T::total_cmp);
    out.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);
    out
}

fn contains<T: DimensionValue>(sorted: &[T], value: &T) -> bool {
    sorted.binary_search_by(|probe| probe.total_cmp(value)).is_ok()
}

/// Intersect raw value sequences, one per source
///
/// The running intersection is seeded with `auxiliary` when given, otherwise
/// with the first sequence. Fails when the result is empty.
pub fn intersect<T: DimensionValue>(
    raw: &[Vec<T>],
    auxiliary: Option<&[T]>,
    dimension: Dimension,
) -> Result<CommonIndices<T>> {
    let seed = match (auxiliary, raw.first()) {
        (Some(aux), _) => aux,
        (None, Some(first)) => first.as_slice(),
        (None, None) => &[],
    };
    let mut common = sorted_unique(seed);
    for values in raw {
        let other = sorted_unique(values);
        common.retain(|v| contains(&other, v));
    }

    if common.is_empty() {
        return Err(AlignError::configuration(format!(
            "No valid {}s selected",
            dimension.as_str()
        )));
    }

    let indices = raw
        .iter()
        .map(|values| {
            common
                .iter()
                .map(|target| {
                    values
                        .iter()
                        .position(|v| v.total_cmp(target) == Ordering::Equal)
                        .ok_or_else(|| {
                            AlignError::invariant(format!(
                                "common {} value {target:?} missing from a source",
                                dimension.as_str()
                            ))
                        })
                })
                .collect::<Result<Vec<usize>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    log::debug!(
        "{} intersection: {} common values across {} sources",
        dimension.as_str(),
        common.len(),
        raw.len()
    );

    Ok(CommonIndices {
        values: common,
        indices,
    })
}

/// Common times across sources, optionally restricted to `allowed`
pub fn intersect_times(
    sources: &[&dyn Source],
    allowed: Option<&[i64]>,
) -> Result<CommonIndices<i64>> {
    let raw: Vec<Vec<i64>> = sources.iter().map(|s| s.times().to_vec()).collect();
    intersect(&raw, allowed, Dimension::Time)
}

/// Common offsets across sources, optionally restricted to `allowed`
pub fn intersect_offsets(
    sources: &[&dyn Source],
    allowed: Option<&[f64]>,
) -> Result<CommonIndices<f64>> {
    let raw: Vec<Vec<f64>> = sources.iter().map(|s| s.offsets().to_vec()).collect();
    intersect(&raw, allowed, Dimension::Offset)
}

/// Common location ids across sources, optionally restricted to `allowed`
pub fn intersect_locations(
    sources: &[&dyn Source],
    allowed: Option<&[i64]>,
) -> Result<CommonIndices<i64>> {
    let raw: Vec<Vec<i64>> = sources
        .iter()
        .map(|s| s.locations().iter().map(|loc| loc.id).collect())
        .collect();
    intersect(&raw, allowed, Dimension::Location)
}
