//! verif_align: multi-source data alignment for forecast verification
//!
//! Given several independently collected datasets (observations plus one or
//! more forecast sources, each indexed by initialization time, lead-time
//! offset and location), verif_align computes the index set common to all of
//! them and exposes aligned, cached, axis-sliceable score arrays for
//! downstream statistics and plotting.
//!
//! ## Key Features
//!
//! - **Exact intersection**: common times, offsets and location ids across N sources
//! - **Derived axes**: months and years bucketed from the common times
//! - **Lazy field cache**: per-source arrays loaded once and trimmed to the common set
//! - **Consistent missingness**: a value missing in one source is missing in all
//! - **Climatology**: obs/fcst turned into anomalies (subtract) or ratios (divide)
//! - **Window fields**: lead time until a cumulative signal crosses a threshold
//!
//! ## Module Organization
//!
//! - [`source`]: the read interface sources implement
//! - [`memory_source`]: in-memory source with a JSON document form
//! - [`field`]: field selectors and obs/fcst adapters
//! - [`axis`]: slicing axes
//! - [`alignment`]: intersection and canonical axes
//! - [`cache`]: the per-source field cache
//! - [`window`]: the window transform
//! - [`slicer`]: axis slicing, climatology and joint masking
//! - [`dataset`]: the aligned dataset tying it together
//! - [`parallel`]: thread pool configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust
//! use ndarray::Array3;
//! use verif_align::prelude::*;
//!
//! let loc = vec![Location::new(1, 60.0, 10.0, 100.0)];
//! let a = MemorySource::new("a", vec![100, 200, 300], vec![0.0], loc.clone())
//!     .with_fcst(Array3::from_shape_vec((3, 1, 1), vec![1.0, 2.0, 3.0]).unwrap());
//! let b = MemorySource::new("b", vec![200, 300, 400], vec![0.0], loc)
//!     .with_fcst(Array3::from_shape_vec((3, 1, 1), vec![5.0, 6.0, 7.0]).unwrap());
//!
//! let sources: Vec<Box<dyn Source>> = vec![Box::new(a), Box::new(b)];
//! let data = AlignedDataset::build(sources, AlignOptions::default()).unwrap();
//! assert_eq!(data.times(), &[200, 300]);
//!
//! let scores = data.get_scores(&[Field::Fcst], 1, Axis::Time, Some(0)).unwrap();
//! assert_eq!(scores[0].as_slice().unwrap(), &[5.0]);
//! ```

pub mod alignment;
pub mod axis;
pub mod cache;
pub mod dataset;
pub mod errors;
pub mod field;
pub mod memory_source;
pub mod parallel;
pub mod slicer;
pub mod source;
pub mod window;

pub use axis::{Axis, AxisCategory};
pub use dataset::{AlignOptions, AlignedDataset};
pub use errors::{AlignError, Result};
pub use field::{Field, FieldAdapter, UnitConversion};
pub use memory_source::MemorySource;
pub use parallel::ParallelConfig;
pub use slicer::ClimatologyMode;
pub use source::{Location, Source, Variable};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::axis::Axis;
    pub use crate::dataset::{AlignOptions, AlignedDataset};
    pub use crate::errors::{AlignError, Result};
    pub use crate::field::{Field, FieldAdapter, UnitConversion};
    pub use crate::memory_source::MemorySource;
    pub use crate::parallel::ParallelConfig;
    pub use crate::slicer::ClimatologyMode;
    pub use crate::source::{Location, Source, Variable};
}
