//! Location pre-filters applied before the location intersection

use crate::errors::{AlignError, Result};
use crate::source::Location;

/// Inclusive `[min, max]` range
pub type Range = (f64, f64);

fn within(value: f64, (min, max): Range) -> bool {
    value >= min && value <= max
}

/// Location ids allowed by an explicit id list plus lat/lon/elevation ranges
///
/// Ranges are evaluated against `reference` (the first source's locations).
/// Returns `None` when no constraint is configured, so the intersection is
/// seeded from the sources alone.
pub fn allowed_location_ids(
    reference: &[Location],
    ids: Option<&[i64]>,
    lat_range: Option<Range>,
    lon_range: Option<Range>,
    elev_range: Option<Range>,
) -> Result<Option<Vec<i64>>> {
    let mut allowed: Option<Vec<i64>> = ids.map(<[i64]>::to_vec);

    if lat_range.is_some() || lon_range.is_some() {
        let lat_range = lat_range.unwrap_or((-90.0, 90.0));
        let lon_range = lon_range.unwrap_or((-180.0, 180.0));
        let in_box: Vec<i64> = reference
            .iter()
            .filter(|loc| within(loc.lat, lat_range) && within(loc.lon, lon_range))
            .map(|loc| loc.id)
            .collect();
        let selected = match allowed {
            Some(ids) => ids.into_iter().filter(|id| in_box.contains(id)).collect(),
            None => in_box,
        };
        if selected.is_empty() {
            return Err(AlignError::configuration(
                "No available locations within lat/lon range",
            ));
        }
        allowed = Some(selected);
    }

    if let Some(range) = elev_range {
        let in_range: Vec<i64> = reference
            .iter()
            .filter(|loc| within(loc.elev, range))
            .map(|loc| loc.id)
            .collect();
        let base = allowed.unwrap_or_else(|| reference.iter().map(|loc| loc.id).collect());
        let selected: Vec<i64> = base.into_iter().filter(|id| in_range.contains(id)).collect();
        if selected.is_empty() {
            return Err(AlignError::configuration(
                "No available locations within elevation range",
            ));
        }
        allowed = Some(selected);
    }

    Ok(allowed)
}
