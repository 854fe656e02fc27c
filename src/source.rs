//! Read interface to a verification source
//!
//! A source is one independently collected dataset (observations plus a
//! forecast) indexed by initialization time, lead-time offset and location.
//! The file format behind it is not this crate's concern; drivers implement
//! [`Source`] and the alignment engine only reads through it.

use crate::errors::Result;
use crate::field::Field;
use ndarray::{Array3, Array4};
use serde::{Deserialize, Serialize};

/// A forecast point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub elev: f64,
}

impl Location {
    pub fn new(id: i64, lat: f64, lon: f64, elev: f64) -> Self {
        Self { id, lat, lon, elev }
    }
}

/// Name and units of the verified quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub units: String,
    /// printf-style pattern for rendering values, e.g. `%g`
    #[serde(default = "default_formatter")]
    pub formatter: String,
}

fn default_formatter() -> String {
    "%g".to_string()
}

impl Variable {
    pub fn new(name: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
            formatter: default_formatter(),
        }
    }
}

/// Read-only view of one input dataset
///
/// Axis accessors are cheap. Array accessors may do I/O and are called at
/// most once per (source, field) by the field cache. Arrays are shaped
/// `(time, offset, location)` with an extra trailing member/threshold/quantile
/// axis for the 4D ones; NaN marks missing values.
pub trait Source: Send + Sync {
    /// Short name, used for the default legend and error messages
    fn name(&self) -> &str;

    /// Longer descriptive name; defaults to [`Source::name`]
    fn full_name(&self) -> String {
        self.name().to_string()
    }

    /// Initialization times in seconds since the unix epoch
    fn times(&self) -> &[i64];

    /// Lead times, in hours
    fn offsets(&self) -> &[f64];

    fn locations(&self) -> &[Location];

    fn thresholds(&self) -> &[f64];

    fn quantiles(&self) -> &[f64];

    fn variable(&self) -> &Variable;

    fn obs(&self) -> Result<Array3<f64>>;

    fn fcst(&self) -> Result<Array3<f64>>;

    /// Ensemble members along the last axis
    fn ensemble(&self) -> Result<Array4<f64>>;

    /// Threshold scores, last axis ordered like [`Source::thresholds`]
    fn threshold_scores(&self) -> Result<Array4<f64>>;

    /// Quantile scores, last axis ordered like [`Source::quantiles`]
    fn quantile_scores(&self) -> Result<Array4<f64>>;

    /// Fields this source can deliver (window fields excluded)
    fn declared_fields(&self) -> Vec<Field>;
}
