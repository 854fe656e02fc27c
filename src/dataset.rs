//! Aligned multi-source dataset
//!
//! [`AlignedDataset`] organizes data from several sources and only exposes
//! points available in all of them, so sources are compared on equal terms
//! even when some times, offsets or locations are missing from one of them.

use crate::alignment::{
    allowed_location_ids, intersect_locations, intersect_offsets, intersect_times, utc_datetime,
    CanonicalAxes, Range,
};
use crate::axis::Axis;
use crate::cache::{FieldCache, FieldLoader, TrimIndices};
use crate::errors::{AlignError, Result};
use crate::field::{Field, FieldAdapter};
use crate::slicer::{mask_jointly, normalize, ClimatologyMode, Selection};
use crate::source::{Location, Source, Variable};
use ndarray::{Array3, ArrayD};
use std::sync::Arc;

/// Optional arguments for [`AlignedDataset::build`]
pub struct AlignOptions {
    /// Discard all other initialization times
    pub times: Option<Vec<i64>>,
    /// Discard all other offsets
    pub offsets: Option<Vec<f64>>,
    /// Discard all other location ids
    pub locations: Option<Vec<i64>>,
    pub lat_range: Option<Range>,
    pub lon_range: Option<Range>,
    pub elev_range: Option<Range>,
    /// Climatological forecast used to turn obs/fcst into anomalies
    pub climatology: Option<Box<dyn Source>>,
    pub climatology_mode: ClimatologyMode,
    /// One entry per source; defaults to the source names
    pub legend: Option<Vec<String>>,
    /// When one source is missing a value, treat it as missing in all
    pub require_consistent_missingness: bool,
    pub obs_adapter: Box<dyn FieldAdapter>,
    pub fcst_adapter: Box<dyn FieldAdapter>,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            times: None,
            offsets: None,
            locations: None,
            lat_range: None,
            lon_range: None,
            elev_range: None,
            climatology: None,
            climatology_mode: ClimatologyMode::Subtract,
            legend: None,
            require_consistent_missingness: true,
            obs_adapter: Box::new(Field::Obs),
            fcst_adapter: Box::new(Field::Fcst),
        }
    }
}

/// Sources aligned on their common times, offsets and locations
pub struct AlignedDataset {
    /// Visible sources, then the climatology source if configured
    sources: Vec<Box<dyn Source>>,
    num_visible: usize,
    climatology_mode: Option<ClimatologyMode>,
    legend: Option<Vec<String>>,
    trims: Vec<TrimIndices>,
    axes: CanonicalAxes,
    variable: Variable,
    cache: FieldCache,
    obs_adapter: Box<dyn FieldAdapter>,
    fcst_adapter: Box<dyn FieldAdapter>,
}

impl AlignedDataset {
    /// Align `sources` under `options`
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no sources are given, the legend
    /// length does not match, or any dimension ends up with no common values.
    pub fn build(sources: Vec<Box<dyn Source>>, options: AlignOptions) -> Result<Self> {
        if sources.is_empty() {
            return Err(AlignError::configuration("at least one source is required"));
        }
        if let Some(legend) = &options.legend {
            if legend.len() != sources.len() {
                return Err(AlignError::configuration(format!(
                    "Need one legend entry for each source ({} entries for {} sources)",
                    legend.len(),
                    sources.len()
                )));
            }
        }

        let num_visible = sources.len();
        let climatology_mode = options.climatology.as_ref().map(|_| options.climatology_mode);
        let mut sources = sources;
        sources.extend(options.climatology);

        let refs: Vec<&dyn Source> = sources.iter().map(|s| s.as_ref()).collect();
        let allowed_locations = allowed_location_ids(
            refs[0].locations(),
            options.locations.as_deref(),
            options.lat_range,
            options.lon_range,
            options.elev_range,
        )?;

        let times = intersect_times(&refs, options.times.as_deref())?;
        let offsets = intersect_offsets(&refs, options.offsets.as_deref())?;
        let locations = intersect_locations(&refs, allowed_locations.as_deref())?;

        let trims = (0..refs.len())
            .map(|i| TrimIndices {
                times: times.indices[i].clone(),
                offsets: offsets.indices[i].clone(),
                locations: locations.indices[i].clone(),
            })
            .collect();
        let axes = CanonicalAxes::resolve(&refs, &times, &offsets, &locations)?;
        let variable = options.obs_adapter.variable(refs[0].variable());

        log::info!(
            "aligned {} sources{}: {} times, {} offsets, {} locations",
            num_visible,
            if climatology_mode.is_some() { " + climatology" } else { "" },
            axes.times.len(),
            axes.offsets.len(),
            axes.locations.len()
        );

        let cache = FieldCache::new(
            sources.len(),
            num_visible,
            options.require_consistent_missingness,
        );
        Ok(Self {
            sources,
            num_visible,
            climatology_mode,
            legend: options.legend,
            trims,
            axes,
            variable,
            cache,
            obs_adapter: options.obs_adapter,
            fcst_adapter: options.fcst_adapter,
        })
    }

    fn cached_field(&self, field: Field, source_index: usize) -> Result<Arc<Array3<f64>>> {
        let refs: Vec<&dyn Source> = self.sources.iter().map(|s| s.as_ref()).collect();
        let loader = FieldLoader {
            sources: &refs,
            trims: &self.trims,
            obs_adapter: self.obs_adapter.as_ref(),
            fcst_adapter: self.fcst_adapter.as_ref(),
        };
        self.cache.get(field, source_index, &loader)
    }

    fn check_source_index(&self, source_index: usize) -> Result<()> {
        if source_index < self.num_visible {
            Ok(())
        } else {
            Err(AlignError::configuration(format!(
                "source index must be between 0 and {}, got {source_index}",
                self.num_visible.saturating_sub(1)
            )))
        }
    }

    /// Trimmed `(time, offset, location)` array of one field for one source
    pub fn field(&self, field: Field, source_index: usize) -> Result<Arc<Array3<f64>>> {
        self.check_source_index(source_index)?;
        self.cached_field(field, source_index)
    }

    /// Trimmed forecast of the climatology source, if one is configured
    pub fn climatology(&self) -> Result<Option<Arc<Array3<f64>>>> {
        match self.climatology_mode {
            Some(_) => self.cached_field(Field::Fcst, self.num_visible).map(Some),
            None => Ok(None),
        }
    }

    /// Retrieve aligned scores of several fields from one source
    ///
    /// Obs and fcst fields are normalized by the climatology when one is
    /// configured. With [`Axis::All`] the full 3D arrays are returned with
    /// NaN wherever any requested field is invalid; every other axis slices
    /// and flattens, keeping only positions valid in all fields.
    ///
    /// # Errors
    ///
    /// Configuration errors for a bad source index, missing or out-of-range
    /// axis index, or an empty field list; field errors from loading.
    pub fn get_scores(
        &self,
        fields: &[Field],
        source_index: usize,
        axis: Axis,
        axis_index: Option<usize>,
    ) -> Result<Vec<ArrayD<f64>>> {
        self.check_source_index(source_index)?;
        if fields.is_empty() {
            return Err(AlignError::configuration("no fields requested"));
        }
        let selection = Selection::resolve(axis, axis_index, &self.axes)?;

        let climatology = match self.climatology_mode {
            Some(mode) if fields.iter().any(Field::is_obs_or_fcst) => {
                let values = self.cached_field(Field::Fcst, self.num_visible)?;
                Some((mode, selection.apply(&values)))
            }
            _ => None,
        };

        let mut scores = Vec::with_capacity(fields.len());
        for &field in fields {
            let values = self.cached_field(field, source_index)?;
            let mut current = selection.apply(&values);
            if let Some((mode, clim)) = &climatology {
                if field.is_obs_or_fcst() {
                    normalize(&mut current, clim, *mode);
                }
            }
            scores.push(current);
        }

        Ok(mask_jointly(scores, selection.keeps_shape()))
    }

    /// Values representing each position along `axis`
    ///
    /// Time-like axes give epoch seconds; axes without positions give `[0]`.
    pub fn axis_values(&self, axis: Axis) -> Vec<f64> {
        let as_f64 = |values: &[i64]| -> Vec<f64> { values.iter().map(|&v| v as f64).collect() };
        match axis {
            Axis::Time => as_f64(&self.axes.times),
            Axis::Month => as_f64(&self.axes.months),
            Axis::Year => as_f64(&self.axes.years),
            Axis::Offset => self.axes.offsets.clone(),
            Axis::Location => (0..self.axes.locations.len()).map(|i| i as f64).collect(),
            Axis::LocationId => self.location_ids().iter().map(|&id| id as f64).collect(),
            Axis::Elevation => self.elevs(),
            Axis::Lat => self.lats(),
            Axis::Lon => self.lons(),
            Axis::Threshold | Axis::Quantile | Axis::No | Axis::All => vec![0.0],
        }
    }

    pub fn axis_size(&self, axis: Axis) -> usize {
        self.axis_values(axis).len()
    }

    /// One description per axis position: location attributes for
    /// location-like axes, dates for time-like axes, the values otherwise
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a time outside the supported
    /// calendar range.
    pub fn axis_descriptions(&self, axis: Axis, csv: bool) -> Result<Vec<String>> {
        if axis.is_location_like() {
            return Ok(self
                .axes
                .locations
                .iter()
                .map(|loc| {
                    if csv {
                        format!("{},{:.6},{:.6},{:.6}", loc.id, loc.lat, loc.lon, loc.elev)
                    } else {
                        format!("{:6} {:5.2} {:5.2} {:5.0}", loc.id, loc.lat, loc.lon, loc.elev)
                    }
                })
                .collect());
        }
        let epochs = match axis {
            Axis::Time => &self.axes.times,
            Axis::Month => &self.axes.months,
            Axis::Year => &self.axes.years,
            _ => {
                return Ok(self
                    .axis_values(axis)
                    .iter()
                    .map(ToString::to_string)
                    .collect())
            }
        };
        epochs
            .iter()
            .map(|&t| -> Result<String> { Ok(utc_datetime(t)?.format("%Y/%m/%d").to_string()) })
            .collect()
    }

    /// Header line matching [`AlignedDataset::axis_descriptions`]
    pub fn axis_description_header(&self, axis: Axis, csv: bool) -> String {
        if axis.is_location_like() {
            if csv {
                "id,lat,lon,elev".to_string()
            } else {
                format!("{:>6} {:>5} {:>5} {:>5}", "id", "lat", "lon", "elev")
            }
        } else {
            axis.name().to_string()
        }
    }

    /// Label for plots and tables
    pub fn axis_label(&self, axis: Axis) -> String {
        match axis {
            Axis::Time => "Date".to_string(),
            Axis::Offset => "Lead time (h)".to_string(),
            Axis::Month => "Month".to_string(),
            Axis::Year => "Year".to_string(),
            Axis::Elevation => "Elevation (m)".to_string(),
            Axis::Lat => "Latitude".to_string(),
            Axis::Lon => "Longitude".to_string(),
            Axis::Threshold | Axis::Quantile => self.variable_and_units(),
            Axis::Location | Axis::LocationId | Axis::No | Axis::All => axis.name().to_string(),
        }
    }

    pub fn variable_and_units(&self) -> String {
        format!("{} ({})", self.variable.name, self.variable.units)
    }

    pub fn times(&self) -> &[i64] {
        &self.axes.times
    }

    pub fn offsets(&self) -> &[f64] {
        &self.axes.offsets
    }

    pub fn locations(&self) -> &[Location] {
        &self.axes.locations
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.axes.thresholds
    }

    pub fn quantiles(&self) -> &[f64] {
        &self.axes.quantiles
    }

    pub fn months(&self) -> &[i64] {
        &self.axes.months
    }

    pub fn years(&self) -> &[i64] {
        &self.axes.years
    }

    pub fn axes(&self) -> &CanonicalAxes {
        &self.axes
    }

    /// Number of visible sources (climatology not counted)
    pub fn num_sources(&self) -> usize {
        self.num_visible
    }

    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    pub fn has_climatology(&self) -> bool {
        self.climatology_mode.is_some()
    }

    /// Whether `field` is already resident for `source_index`
    pub fn is_cached(&self, field: Field, source_index: usize) -> bool {
        self.cache.contains(source_index, field)
    }

    pub fn names(&self) -> Vec<String> {
        self.visible().map(|s| s.name().to_string()).collect()
    }

    pub fn full_names(&self) -> Vec<String> {
        self.visible().map(|s| s.full_name()).collect()
    }

    /// Caller-supplied legend, or the source names
    pub fn legend(&self) -> Vec<String> {
        self.legend.clone().unwrap_or_else(|| self.names())
    }

    pub fn lats(&self) -> Vec<f64> {
        self.axes.locations.iter().map(|loc| loc.lat).collect()
    }

    pub fn lons(&self) -> Vec<f64> {
        self.axes.locations.iter().map(|loc| loc.lon).collect()
    }

    pub fn elevs(&self) -> Vec<f64> {
        self.axes.locations.iter().map(|loc| loc.elev).collect()
    }

    pub fn location_ids(&self) -> Vec<i64> {
        self.axes.locations.iter().map(|loc| loc.id).collect()
    }

    fn visible(&self) -> impl Iterator<Item = &dyn Source> {
        self.sources[..self.num_visible].iter().map(|s| s.as_ref())
    }
}
