//! Time-to-crossing transform behind the window fields
//!
//! At every offset `o` the values from `o` onwards are accumulated along the
//! offset axis. The number of steps whose running sum stays at or below
//! [`WINDOW_THRESHOLD`] gives the crossing step, and the output is the lead
//! time from `o` to that step, clamped to the last offset. A NaN in the running
//! sum poisons the rest of it, so those steps never count.

use crate::errors::{AlignError, Result};
use ndarray::{Array3, ArrayView3, Zip};

/// Cumulative amount that has to be exceeded
pub const WINDOW_THRESHOLD: f64 = 0.5;

/// Compute the window transform of a `(time, offset, location)` array
///
/// Returns a new array of the same shape. Positions that are NaN in the input
/// are NaN in the output. Runs on the calling thread, since the field cache
/// calls it while holding a field slot.
///
/// # Errors
///
/// Returns an invariant violation if `offsets` does not match the offset axis.
pub fn window(values: ArrayView3<'_, f64>, offsets: &[f64]) -> Result<Array3<f64>> {
    let num_offsets = values.shape()[1];
    if offsets.len() != num_offsets {
        return Err(AlignError::invariant(format!(
            "window needs {num_offsets} offsets, got {}",
            offsets.len()
        )));
    }

    let mut output = Array3::<f64>::zeros(values.raw_dim());
    Zip::indexed(&mut output).for_each(|(t, o, l), out| {
        if values[[t, o, l]].is_nan() {
            *out = f64::NAN;
            return;
        }
        let mut running = 0.0;
        let mut steps = 0;
        for k in o..num_offsets {
            running += values[[t, k, l]];
            if running <= WINDOW_THRESHOLD {
                steps += 1;
            }
        }
        let target = (o + steps).min(num_offsets - 1);
        *out = offsets[target] - offsets[o];
    });

    Ok(output)
}
