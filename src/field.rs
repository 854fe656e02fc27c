//! Field selectors and obs/fcst field adapters
//!
//! A [`Field`] names which array of a source is retrieved. Equality and
//! hashing are structural, with float payloads compared bit-for-bit so a
//! field can key the cache.

use crate::errors::AlignError;
use crate::source::Variable;
use ndarray::Array3;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Selector for one array variant of a source
#[derive(Debug, Clone, Copy)]
pub enum Field {
    /// Observations
    Obs,
    /// Deterministic forecast
    Fcst,
    /// One ensemble member
    Ensemble(usize),
    /// Threshold score (e.g. probability of exceeding the threshold value)
    Threshold(f64),
    /// Quantile score at the given quantile level
    Quantile(f64),
    /// Time until the cumulative observation crosses the window threshold
    ObsWindow,
    /// Time until the cumulative forecast crosses the window threshold
    FcstWindow,
}

impl Field {
    /// Human readable name used in error messages and CLI output
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Obs => "obs".to_string(),
            Self::Fcst => "fcst".to_string(),
            Self::Ensemble(member) => format!("ensemble{member}"),
            Self::Threshold(value) => format!("p{value}"),
            Self::Quantile(value) => format!("q{value}"),
            Self::ObsWindow => "obswindow".to_string(),
            Self::FcstWindow => "fcstwindow".to_string(),
        }
    }

    /// Whether the field is subject to climatology normalization
    #[must_use]
    pub const fn is_obs_or_fcst(&self) -> bool {
        matches!(self, Self::Obs | Self::Fcst)
    }

    /// The two derived pseudo-fields every source offers
    #[must_use]
    pub const fn window_fields() -> [Field; 2] {
        [Self::ObsWindow, Self::FcstWindow]
    }

    fn tag(&self) -> u8 {
        match self {
            Self::Obs => 0,
            Self::Fcst => 1,
            Self::Ensemble(_) => 2,
            Self::Threshold(_) => 3,
            Self::Quantile(_) => 4,
            Self::ObsWindow => 5,
            Self::FcstWindow => 6,
        }
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Ensemble(a), Self::Ensemble(b)) => a == b,
            (Self::Threshold(a), Self::Threshold(b)) | (Self::Quantile(a), Self::Quantile(b)) => {
                a.to_bits() == b.to_bits()
            }
            _ => self.tag() == other.tag(),
        }
    }
}

impl Eq for Field {}

impl Hash for Field {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag().hash(state);
        match self {
            Self::Ensemble(member) => member.hash(state),
            Self::Threshold(value) | Self::Quantile(value) => value.to_bits().hash(state),
            _ => {}
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Parses the names produced by [`Field::name`]
impl FromStr for Field {
    type Err = AlignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let invalid = || AlignError::configuration(format!("unrecognized field: {s}"));
        match lower.as_str() {
            "obs" => Ok(Self::Obs),
            "fcst" => Ok(Self::Fcst),
            "obswindow" => Ok(Self::ObsWindow),
            "fcstwindow" => Ok(Self::FcstWindow),
            _ => {
                if let Some(member) = lower.strip_prefix("ensemble") {
                    member.parse().map(Self::Ensemble).map_err(|_| invalid())
                } else if let Some(value) = lower.strip_prefix('p') {
                    value.parse().map(Self::Threshold).map_err(|_| invalid())
                } else if let Some(value) = lower.strip_prefix('q') {
                    value.parse().map(Self::Quantile).map_err(|_| invalid())
                } else {
                    Err(invalid())
                }
            }
        }
    }
}

/// Maps the caller-facing `Obs`/`Fcst` fields onto what is actually loaded
///
/// Adapters allow derived variables: the loaded field can be swapped for
/// another one, its values converted, and the reported variable relabelled.
pub trait FieldAdapter: Send + Sync {
    /// The field whose array is selected from each source
    fn field(&self) -> Field;

    /// Transform applied to the raw (untrimmed) array after selection
    fn transform(&self, values: Array3<f64>) -> Array3<f64> {
        values
    }

    /// Variable metadata describing the adapted values
    fn variable(&self, base: &Variable) -> Variable {
        base.clone()
    }
}

/// A plain field is its own identity adapter
impl FieldAdapter for Field {
    fn field(&self) -> Field {
        *self
    }
}

/// Linear unit conversion `value * scale + offset` on top of another field
#[derive(Debug, Clone)]
pub struct UnitConversion {
    pub field: Field,
    pub scale: f64,
    pub offset: f64,
    pub units: String,
}

impl FieldAdapter for UnitConversion {
    fn field(&self) -> Field {
        self.field
    }

    fn transform(&self, values: Array3<f64>) -> Array3<f64> {
        let (scale, offset) = (self.scale, self.offset);
        values.mapv_into(|v| v * scale + offset)
    }

    fn variable(&self, base: &Variable) -> Variable {
        Variable {
            units: self.units.clone(),
            ..base.clone()
        }
    }
}
