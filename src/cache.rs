//! Lazily populated per-source field cache
//!
//! Entries are keyed by (source index, field) and hold arrays already trimmed
//! to the common `(time, offset, location)` index set. A miss loads the field
//! for every participating source at once, then applies cross-source
//! missingness before any entry becomes visible. Each field has its own slot,
//! so concurrent callers asking for the same field wait for the one batched
//! load while other fields load independently.

use crate::errors::{AlignError, Result};
use crate::field::{Field, FieldAdapter};
use crate::source::Source;
use crate::window::window;
use ndarray::{Array3, Array4, Axis, Zip};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, TryLockError};

/// Positions of the common index set inside one source's raw arrays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimIndices {
    pub times: Vec<usize>,
    pub offsets: Vec<usize>,
    pub locations: Vec<usize>,
}

impl TrimIndices {
    /// Fancy-index along time, then offset, then location
    pub fn apply(&self, values: &Array3<f64>) -> Array3<f64> {
        values
            .select(Axis(0), &self.times)
            .select(Axis(1), &self.offsets)
            .select(Axis(2), &self.locations)
    }
}

/// Everything needed to pull a field out of the sources
pub struct FieldLoader<'a> {
    pub sources: &'a [&'a dyn Source],
    pub trims: &'a [TrimIndices],
    pub obs_adapter: &'a dyn FieldAdapter,
    pub fcst_adapter: &'a dyn FieldAdapter,
}

impl FieldLoader<'_> {
    fn adapter_for(&self, field: Field) -> Option<&dyn FieldAdapter> {
        match field {
            Field::Obs => Some(self.obs_adapter),
            Field::Fcst => Some(self.fcst_adapter),
            _ => None,
        }
    }

    /// Load `field` from one source and trim it to the common index set
    pub fn load(&self, field: Field, source_index: usize) -> Result<Array3<f64>> {
        let source = self.sources[source_index];
        let adapter = self.adapter_for(field);
        let resolved = adapter.map_or(field, |a| a.field());

        let mut catalog = source.declared_fields();
        catalog.extend(Field::window_fields());
        if !catalog.contains(&resolved) {
            return Err(AlignError::FieldUnavailable {
                source_name: source.name().to_string(),
                field: resolved.name(),
            });
        }

        let mut raw = select(source, resolved)?;
        let expected = [
            source.times().len(),
            source.offsets().len(),
            source.locations().len(),
        ];
        if raw.shape() != &expected[..] {
            return Err(AlignError::invariant(format!(
                "{} delivered '{}' with shape {:?}, expected {expected:?}",
                source.name(),
                resolved,
                raw.shape()
            )));
        }
        if let Some(adapter) = adapter {
            raw = adapter.transform(raw);
        }

        log::debug!("loaded '{}' from {}", field, source.name());
        Ok(self.trims[source_index].apply(&raw))
    }
}

fn select(source: &dyn Source, field: Field) -> Result<Array3<f64>> {
    match field {
        Field::Obs => source.obs(),
        Field::Fcst => source.fcst(),
        Field::Ensemble(member) => {
            let ensemble = source.ensemble()?;
            member_slice(&ensemble, member, source.name())
        }
        Field::Threshold(value) => {
            let index = unique_position(source.thresholds(), value, "threshold", source.name())?;
            member_slice(&source.threshold_scores()?, index, source.name())
        }
        Field::Quantile(value) => {
            let index = unique_position(source.quantiles(), value, "quantile", source.name())?;
            member_slice(&source.quantile_scores()?, index, source.name())
        }
        Field::ObsWindow => window(source.obs()?.view(), source.offsets()),
        Field::FcstWindow => window(source.fcst()?.view(), source.offsets()),
    }
}

fn member_slice(values: &Array4<f64>, index: usize, source_name: &str) -> Result<Array3<f64>> {
    if index >= values.shape()[3] {
        return Err(AlignError::invariant(format!(
            "{source_name}: index {index} outside trailing axis of length {}",
            values.shape()[3]
        )));
    }
    Ok(values.index_axis(Axis(3), index).to_owned())
}

/// Position of `value` in `values`; anything but exactly one match is a defect
fn unique_position(values: &[f64], value: f64, kind: &str, source_name: &str) -> Result<usize> {
    let matches: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(i, &v)| (v == value).then_some(i))
        .collect();
    match matches.as_slice() {
        [index] => Ok(*index),
        _ => Err(AlignError::invariant(format!(
            "{source_name}: {kind} {value} matches {} entries, expected exactly one",
            matches.len()
        ))),
    }
}

/// Trimmed arrays of one field, indexed by source
type Entry = Option<Vec<Arc<Array3<f64>>>>;
type Slot = Arc<Mutex<Entry>>;

/// Cache of trimmed arrays with one single-flight slot per field
///
/// The climatology source (the last source) only takes part in the `Fcst`
/// batch; every other field is loaded for the visible sources alone.
#[derive(Debug)]
pub struct FieldCache {
    slots: Mutex<HashMap<Field, Slot>>,
    num_sources: usize,
    num_visible: usize,
    require_consistent_missingness: bool,
}

impl FieldCache {
    pub fn new(num_sources: usize, num_visible: usize, require_consistent_missingness: bool) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            num_sources,
            num_visible,
            require_consistent_missingness,
        }
    }

    /// Number of sources loaded together for `field`
    pub fn participants(&self, field: Field) -> usize {
        if field == Field::Fcst {
            self.num_sources
        } else {
            self.num_visible
        }
    }

    fn slot(&self, field: Field) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(field).or_default())
    }

    /// Whether `field` is already resident for `source_index`
    ///
    /// A field whose load is still in flight counts as absent.
    pub fn contains(&self, source_index: usize, field: Field) -> bool {
        let slot = self.slot(field);
        let entry = match slot.try_lock() {
            Ok(entry) => entry,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return false,
        };
        entry
            .as_ref()
            .is_some_and(|arrays| source_index < arrays.len())
    }

    /// Return the cached array, loading the field for all its sources on a miss
    ///
    /// Only the field's own slot is locked while loading, so requests for
    /// other fields proceed. Work under the slot lock stays on the calling
    /// thread and never waits on the rayon pool.
    pub fn get(
        &self,
        field: Field,
        source_index: usize,
        loader: &FieldLoader<'_>,
    ) -> Result<Arc<Array3<f64>>> {
        let participants = self.participants(field);
        if source_index >= participants {
            return Err(AlignError::configuration(format!(
                "source index {source_index} out of range: '{field}' is held by {participants} sources"
            )));
        }

        let slot = self.slot(field);
        // A panic mid-load never commits anything, so a poisoned slot is safe.
        let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if entry.is_none() {
            let mut loaded = (0..participants)
                .map(|i| loader.load(field, i))
                .collect::<Result<Vec<_>>>()?;
            if self.require_consistent_missingness {
                if let Some(missing) = union_missing(loaded.iter()) {
                    for values in &mut loaded {
                        mask_with(values, &missing);
                    }
                }
            }
            log::debug!("cached '{field}' for {participants} sources");
            *entry = Some(loaded.into_iter().map(Arc::new).collect());
        }

        entry
            .as_ref()
            .and_then(|arrays| arrays.get(source_index))
            .map(Arc::clone)
            .ok_or_else(|| {
                AlignError::invariant(format!("'{field}' cached without source {source_index}"))
            })
    }
}

/// Elementwise OR of the NaN masks; `None` when there are no arrays
fn union_missing<'a>(arrays: impl Iterator<Item = &'a Array3<f64>>) -> Option<Array3<bool>> {
    let mut union: Option<Array3<bool>> = None;
    for values in arrays {
        match union.as_mut() {
            None => union = Some(values.mapv(f64::is_nan)),
            Some(mask) => Zip::from(mask)
                .and(values)
                .for_each(|m, &v| *m |= v.is_nan()),
        }
    }
    union
}

fn mask_with(values: &mut Array3<f64>, missing: &Array3<bool>) {
    Zip::from(values).and(missing).for_each(|v, &m| {
        if m {
            *v = f64::NAN;
        }
    });
}
