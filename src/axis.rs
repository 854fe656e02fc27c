//! Axes along which scores are sliced or aggregated

use std::fmt;
use std::str::FromStr;

use crate::errors::AlignError;

/// Broad grouping of an axis, fixed per variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisCategory {
    /// Time, month and year axes
    TimeLike,
    /// Any axis that selects one location
    LocationLike,
    /// Offset axis
    Offset,
    /// Threshold and quantile axes
    ThresholdLike,
    /// No slicing at all
    None,
}

/// Dimension or derived grouping used when extracting scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Time,
    Offset,
    Month,
    Year,
    Location,
    LocationId,
    Elevation,
    Lat,
    Lon,
    Threshold,
    Quantile,
    /// Flatten everything, no selection
    No,
    /// No aggregation; the full 3D array is returned
    All,
}

impl Axis {
    pub const ALL_VARIANTS: [Axis; 13] = [
        Axis::Time,
        Axis::Offset,
        Axis::Month,
        Axis::Year,
        Axis::Location,
        Axis::LocationId,
        Axis::Elevation,
        Axis::Lat,
        Axis::Lon,
        Axis::Threshold,
        Axis::Quantile,
        Axis::No,
        Axis::All,
    ];

    #[must_use]
    pub const fn category(self) -> AxisCategory {
        match self {
            Self::Time | Self::Month | Self::Year => AxisCategory::TimeLike,
            Self::Location | Self::LocationId | Self::Elevation | Self::Lat | Self::Lon => {
                AxisCategory::LocationLike
            }
            Self::Offset => AxisCategory::Offset,
            Self::Threshold | Self::Quantile => AxisCategory::ThresholdLike,
            Self::No | Self::All => AxisCategory::None,
        }
    }

    #[must_use]
    pub const fn is_location_like(self) -> bool {
        matches!(self.category(), AxisCategory::LocationLike)
    }

    #[must_use]
    pub const fn is_time_like(self) -> bool {
        matches!(self.category(), AxisCategory::TimeLike)
    }

    /// Whether slicing this axis needs an index
    #[must_use]
    pub const fn needs_index(self) -> bool {
        matches!(
            self.category(),
            AxisCategory::TimeLike | AxisCategory::LocationLike | AxisCategory::Offset
        )
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Time => "Time",
            Self::Offset => "Offset",
            Self::Month => "Month",
            Self::Year => "Year",
            Self::Location => "Location",
            Self::LocationId => "LocationId",
            Self::Elevation => "Elev",
            Self::Lat => "Lat",
            Self::Lon => "Lon",
            Self::Threshold => "Threshold",
            Self::Quantile => "Quantile",
            Self::No => "No",
            Self::All => "All",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Axis {
    type Err = AlignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Axis::ALL_VARIANTS
            .into_iter()
            .find(|axis| axis.name().to_ascii_lowercase() == lower)
            .or(match lower.as_str() {
                "elevation" => Some(Axis::Elevation),
                "none" => Some(Axis::No),
                _ => None,
            })
            .ok_or_else(|| AlignError::configuration(format!("unrecognized axis: {s}")))
    }
}
