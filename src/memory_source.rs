//! In-memory source, buildable in code or from a JSON document
//!
//! The JSON form mirrors the source interface one-to-one. Arrays are nested
//! lists ordered `[time][offset][location]` (plus `[member]`, `[threshold]` or
//! `[quantile]` for the 4D ones) and missing values are written as `null`:
//!
//! ```json
//! {
//!   "name": "raw",
//!   "times": [1483228800, 1483315200],
//!   "offsets": [0, 6],
//!   "locations": [{"id": 18700, "lat": 59.9, "lon": 10.7, "elev": 94}],
//!   "variable": {"name": "Temperature", "units": "C"},
//!   "obs": [[[1.2], [null]], [[0.4], [0.9]]],
//!   "fcst": [[[1.0], [1.8]], [[0.1], [1.1]]]
//! }
//! ```

use crate::errors::{AlignError, Result};
use crate::field::Field;
use crate::source::{Location, Source, Variable};
use ndarray::{Array3, Array4};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// A source whose arrays are already resident in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    times: Vec<i64>,
    offsets: Vec<f64>,
    locations: Vec<Location>,
    thresholds: Vec<f64>,
    quantiles: Vec<f64>,
    variable: Variable,
    obs: Option<Array3<f64>>,
    fcst: Option<Array3<f64>>,
    ensemble: Option<Array4<f64>>,
    threshold_scores: Option<Array4<f64>>,
    quantile_scores: Option<Array4<f64>>,
}

impl MemorySource {
    /// Create a source with axes only; attach arrays with the `with_*` methods
    pub fn new(
        name: impl Into<String>,
        times: Vec<i64>,
        offsets: Vec<f64>,
        locations: Vec<Location>,
    ) -> Self {
        Self {
            name: name.into(),
            times,
            offsets,
            locations,
            thresholds: Vec::new(),
            quantiles: Vec::new(),
            variable: Variable::new("Unknown", ""),
            obs: None,
            fcst: None,
            ensemble: None,
            threshold_scores: None,
            quantile_scores: None,
        }
    }

    #[must_use]
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variable = variable;
        self
    }

    #[must_use]
    pub fn with_obs(mut self, obs: Array3<f64>) -> Self {
        self.obs = Some(obs);
        self
    }

    #[must_use]
    pub fn with_fcst(mut self, fcst: Array3<f64>) -> Self {
        self.fcst = Some(fcst);
        self
    }

    #[must_use]
    pub fn with_ensemble(mut self, ensemble: Array4<f64>) -> Self {
        self.ensemble = Some(ensemble);
        self
    }

    #[must_use]
    pub fn with_thresholds(mut self, thresholds: Vec<f64>, scores: Array4<f64>) -> Self {
        self.thresholds = thresholds;
        self.threshold_scores = Some(scores);
        self
    }

    #[must_use]
    pub fn with_quantiles(mut self, quantiles: Vec<f64>, scores: Array4<f64>) -> Self {
        self.quantiles = quantiles;
        self.quantile_scores = Some(scores);
        self
    }

    /// Parse a JSON source document
    pub fn from_json_str(text: &str) -> Result<Self> {
        let doc: SourceDocument = serde_json::from_str(text)?;
        doc.into_source()
    }

    /// Read and parse a JSON source document from disk
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.times.len(), self.offsets.len(), self.locations.len())
    }

    /// Check that every attached array matches the axes
    pub fn validate(&self) -> Result<()> {
        let (t, o, l) = self.shape();
        let check = |what: &str, dims: &[usize], last: Option<usize>| -> Result<()> {
            let ok = dims.len() >= 3
                && dims[..3] == [t, o, l]
                && last.map_or(true, |n| dims.get(3) == Some(&n));
            if ok {
                Ok(())
            } else {
                Err(AlignError::SourceLoad {
                    source_name: self.name.clone(),
                    message: format!("{what} has shape {dims:?}, axes are ({t}, {o}, {l})"),
                })
            }
        };
        if let Some(obs) = &self.obs {
            check("obs", obs.shape(), None)?;
        }
        if let Some(fcst) = &self.fcst {
            check("fcst", fcst.shape(), None)?;
        }
        if let Some(ensemble) = &self.ensemble {
            check("ensemble", ensemble.shape(), None)?;
        }
        if let Some(scores) = &self.threshold_scores {
            check("threshold scores", scores.shape(), Some(self.thresholds.len()))?;
        }
        if let Some(scores) = &self.quantile_scores {
            check("quantile scores", scores.shape(), Some(self.quantiles.len()))?;
        }
        Ok(())
    }

    fn missing(&self, what: &str) -> AlignError {
        AlignError::SourceLoad {
            source_name: self.name.clone(),
            message: format!("no {what} array"),
        }
    }
}

impl Source for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn times(&self) -> &[i64] {
        &self.times
    }

    fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    fn locations(&self) -> &[Location] {
        &self.locations
    }

    fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    fn quantiles(&self) -> &[f64] {
        &self.quantiles
    }

    fn variable(&self) -> &Variable {
        &self.variable
    }

    fn obs(&self) -> Result<Array3<f64>> {
        self.obs.clone().ok_or_else(|| self.missing("obs"))
    }

    fn fcst(&self) -> Result<Array3<f64>> {
        self.fcst.clone().ok_or_else(|| self.missing("fcst"))
    }

    fn ensemble(&self) -> Result<Array4<f64>> {
        self.ensemble.clone().ok_or_else(|| self.missing("ensemble"))
    }

    fn threshold_scores(&self) -> Result<Array4<f64>> {
        self.threshold_scores
            .clone()
            .ok_or_else(|| self.missing("threshold score"))
    }

    fn quantile_scores(&self) -> Result<Array4<f64>> {
        self.quantile_scores
            .clone()
            .ok_or_else(|| self.missing("quantile score"))
    }

    fn declared_fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        if self.obs.is_some() {
            fields.push(Field::Obs);
        }
        if self.fcst.is_some() {
            fields.push(Field::Fcst);
        }
        if let Some(ensemble) = &self.ensemble {
            fields.extend((0..ensemble.shape()[3]).map(Field::Ensemble));
        }
        if self.threshold_scores.is_some() {
            fields.extend(self.thresholds.iter().copied().map(Field::Threshold));
        }
        if self.quantile_scores.is_some() {
            fields.extend(self.quantiles.iter().copied().map(Field::Quantile));
        }
        fields
    }
}

type Nested3 = Vec<Vec<Vec<Option<f64>>>>;
type Nested4 = Vec<Vec<Vec<Vec<Option<f64>>>>>;

#[derive(Debug, Deserialize)]
struct SourceDocument {
    name: String,
    times: Vec<i64>,
    offsets: Vec<f64>,
    locations: Vec<Location>,
    #[serde(default)]
    thresholds: Vec<f64>,
    #[serde(default)]
    quantiles: Vec<f64>,
    variable: Option<Variable>,
    obs: Option<Nested3>,
    fcst: Option<Nested3>,
    ensemble: Option<Nested4>,
    threshold_scores: Option<Nested4>,
    quantile_scores: Option<Nested4>,
}

impl SourceDocument {
    fn into_source(self) -> Result<MemorySource> {
        let mut source = MemorySource::new(self.name, self.times, self.offsets, self.locations);
        source.thresholds = self.thresholds;
        source.quantiles = self.quantiles;
        if let Some(variable) = self.variable {
            source.variable = variable;
        }
        source.obs = self.obs.map(nested_to_array3).transpose()?;
        source.fcst = self.fcst.map(nested_to_array3).transpose()?;
        source.ensemble = self.ensemble.map(nested_to_array4).transpose()?;
        source.threshold_scores = self.threshold_scores.map(nested_to_array4).transpose()?;
        source.quantile_scores = self.quantile_scores.map(nested_to_array4).transpose()?;
        source.validate()?;
        Ok(source)
    }
}

fn nested_to_array3(data: Nested3) -> Result<Array3<f64>> {
    let d0 = data.len();
    let d1 = data.first().map_or(0, Vec::len);
    let d2 = data.first().and_then(|p| p.first()).map_or(0, Vec::len);
    let ragged = data
        .iter()
        .any(|plane| plane.len() != d1 || plane.iter().any(|row| row.len() != d2));
    if ragged {
        return Err(AlignError::configuration("ragged 3D array in source document"));
    }
    let flat: Vec<f64> = data
        .into_iter()
        .flatten()
        .flatten()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    Ok(Array3::from_shape_vec((d0, d1, d2), flat)?)
}

fn nested_to_array4(data: Nested4) -> Result<Array4<f64>> {
    let d0 = data.len();
    let first = data.first();
    let d1 = first.map_or(0, Vec::len);
    let d2 = first.and_then(|p| p.first()).map_or(0, Vec::len);
    let d3 = first
        .and_then(|p| p.first())
        .and_then(|r| r.first())
        .map_or(0, Vec::len);
    let ragged = data.iter().any(|plane| {
        plane.len() != d1
            || plane
                .iter()
                .any(|row| row.len() != d2 || row.iter().any(|cell| cell.len() != d3))
    });
    if ragged {
        return Err(AlignError::configuration("ragged 4D array in source document"));
    }
    let flat: Vec<f64> = data
        .into_iter()
        .flatten()
        .flatten()
        .flatten()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    Ok(Array4::from_shape_vec((d0, d1, d2, d3), flat)?)
}
