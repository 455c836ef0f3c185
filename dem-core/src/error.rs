use std::fmt;

/// Construction/configuration-time failures. Per-frame pipeline logic is
/// total (spec §7) and never returns this type; `DemError` only guards the
/// seams where a caller can hand in a nonsensical raster geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum DemError {
    /// `WIDSIZ`, `LENSIZ`, or `PIXSIZ` combine to a non-positive grid
    /// dimension.
    InvalidGridDimensions { width: isize, length: isize },
    /// `PIXSIZ` is zero or negative.
    InvalidCellSize(f64),
    /// The range view's declared dimensions don't match its point buffer.
    RangeViewSizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for DemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemError::InvalidGridDimensions { width, length } => write!(
                f,
                "invalid DEM grid dimensions: width={}, length={} (both must be positive)",
                width, length
            ),
            DemError::InvalidCellSize(size) => {
                write!(f, "invalid cell size PIXSIZ={} (must be positive)", size)
            }
            DemError::RangeViewSizeMismatch { expected, actual } => write!(
                f,
                "range view point buffer has {} entries, expected {}",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for DemError {}
