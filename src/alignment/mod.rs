//! Index alignment across sources
//!
//! # Organization
//!
//! - [`intersect`]: common index sets per dimension
//! - [`dimensions`]: canonical axes derived from the common sets
//! - [`location_filter`]: lat/lon/elevation pre-filters on location ids

pub mod dimensions;
pub mod intersect;
pub mod location_filter;

pub use dimensions::{month_start, utc_datetime, year_start, CanonicalAxes};
pub use intersect::{
    intersect, intersect_locations, intersect_offsets, intersect_times, CommonIndices, Dimension,
    DimensionValue,
};
pub use location_filter::{allowed_location_ids, Range};
