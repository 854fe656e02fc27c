//! Axis slicing, climatology normalization and joint masking of scores

use crate::alignment::CanonicalAxes;
use crate::axis::{Axis, AxisCategory};
use crate::errors::{AlignError, Result};
use ndarray::{Array1, Array3, ArrayD, Axis as ArrayAxis, Zip};
use std::fmt;
use std::str::FromStr;

/// How climatology is applied to obs and fcst values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClimatologyMode {
    /// Anomaly: value minus climatology
    #[default]
    Subtract,
    /// Ratio: value divided by climatology
    Divide,
}

impl ClimatologyMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subtract => "subtract",
            Self::Divide => "divide",
        }
    }

    #[must_use]
    pub fn apply(self, value: f64, climatology: f64) -> f64 {
        match self {
            Self::Subtract => value - climatology,
            Self::Divide => value / climatology,
        }
    }
}

impl fmt::Display for ClimatologyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClimatologyMode {
    type Err = AlignError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "subtract" => Ok(Self::Subtract),
            "divide" => Ok(Self::Divide),
            other => Err(AlignError::configuration(format!(
                "climatology mode must be 'subtract' or 'divide', got '{other}'"
            ))),
        }
    }
}

/// Which part of a `(time, offset, location)` array an axis request selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Whole array, shape kept
    All,
    /// Whole array, flattened
    Flatten,
    /// These time indices, flattened
    Times(Vec<usize>),
    Offset(usize),
    Location(usize),
}

impl Selection {
    /// Translate an axis and optional index into a selection on the axes
    pub fn resolve(axis: Axis, index: Option<usize>, axes: &CanonicalAxes) -> Result<Self> {
        let index = match (axis.needs_index(), index) {
            (false, _) => 0,
            (true, Some(index)) => index,
            (true, None) => {
                return Err(AlignError::configuration(format!(
                    "axis {axis} requires an index"
                )))
            }
        };
        let check = |len: usize| -> Result<usize> {
            if index < len {
                Ok(index)
            } else {
                Err(AlignError::configuration(format!(
                    "index {index} out of range for axis {axis} of size {len}"
                )))
            }
        };

        Ok(match axis {
            Axis::All => Self::All,
            Axis::Time => Self::Times(vec![check(axes.times.len())?]),
            Axis::Month => {
                let month = check(axes.months.len())?;
                Self::Times(bucket_members(&axes.times, &axes.months, month))
            }
            Axis::Year => {
                let year = check(axes.years.len())?;
                Self::Times(bucket_members(&axes.times, &axes.years, year))
            }
            Axis::Offset => Self::Offset(check(axes.offsets.len())?),
            _ if axis.category() == AxisCategory::LocationLike => {
                Self::Location(check(axes.locations.len())?)
            }
            _ => Self::Flatten,
        })
    }

    /// Cut the selection out of `values`
    ///
    /// [`Selection::All`] keeps the 3D shape; everything else is flattened in
    /// row-major order of the remaining dimensions.
    pub fn apply(&self, values: &Array3<f64>) -> ArrayD<f64> {
        match self {
            Self::All => values.clone().into_dyn(),
            Self::Flatten => flatten(values.iter()),
            Self::Times(indices) => flatten(values.select(ArrayAxis(0), indices).iter()),
            Self::Offset(o) => flatten(values.index_axis(ArrayAxis(1), *o).iter()),
            Self::Location(l) => flatten(values.index_axis(ArrayAxis(2), *l).iter()),
        }
    }

    #[must_use]
    pub fn keeps_shape(&self) -> bool {
        matches!(self, Self::All)
    }
}

fn flatten<'a>(values: impl Iterator<Item = &'a f64>) -> ArrayD<f64> {
    values.copied().collect::<Array1<f64>>().into_dyn()
}

/// Time indices inside bucket `[buckets[i], buckets[i + 1])`, open-ended for the last one
fn bucket_members(times: &[i64], buckets: &[i64], i: usize) -> Vec<usize> {
    let lower = buckets[i];
    let upper = buckets.get(i + 1).copied();
    times
        .iter()
        .enumerate()
        .filter(|&(_, &t)| t >= lower && upper.map_or(true, |u| t < u))
        .map(|(k, _)| k)
        .collect()
}

/// Normalize `values` by an identically sliced climatology
pub fn normalize(values: &mut ArrayD<f64>, climatology: &ArrayD<f64>, mode: ClimatologyMode) {
    Zip::from(values)
        .and(climatology)
        .par_for_each(|v, &c| *v = mode.apply(*v, c));
}

/// Restrict every score array to the positions finite in all of them
///
/// With `keep_shape` the arrays keep their shape and invalid positions become
/// NaN; otherwise (flat arrays) invalid positions are dropped. An empty result
/// becomes a single NaN per field.
pub fn mask_jointly(mut scores: Vec<ArrayD<f64>>, keep_shape: bool) -> Vec<ArrayD<f64>> {
    let Some(first) = scores.first() else {
        return scores;
    };
    let mut valid = first.mapv(f64::is_finite);
    for values in &scores[1..] {
        Zip::from(&mut valid)
            .and(values)
            .par_for_each(|ok, &v| *ok &= v.is_finite());
    }

    if keep_shape {
        for values in &mut scores {
            Zip::from(values).and(&valid).par_for_each(|v, &ok| {
                if !ok {
                    *v = f64::NAN;
                }
            });
        }
    } else {
        scores = scores
            .into_iter()
            .map(|values| {
                flatten(
                    values
                        .iter()
                        .zip(valid.iter())
                        .filter_map(|(v, &ok)| ok.then_some(v)),
                )
            })
            .collect();
    }

    if scores.first().map_or(true, |s| s.is_empty()) {
        let placeholder = Array1::from_elem(1, f64::NAN).into_dyn();
        scores = vec![placeholder; scores.len()];
    }
    scores
}
