use thiserror::Error;

pub type Result<T> = std::result::Result<T, SGError>;

#[derive(Error, Clone, Debug, PartialEq)]
pub enum SGError
{
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("lower bound {lower} must be less than upper bound {upper} in dimension {dim}")]
    InvalidBounds { dim: usize, lower: f64, upper: f64 },
    #[error("invalid levels: lmin = {lmin}, lmax = {lmax}")]
    InvalidLevels { lmin: u32, lmax: u32 },
    #[error("tolerance must be finite and non-negative, got {0}")]
    InvalidTolerance(f64),
    #[error("coarsening version must be 0, 1 or 2, got {0}")]
    InvalidVersion(u8),
    #[error("cell {cell} has {actual} children, expected {expected}")]
    InvalidSiblingCount { cell: usize, expected: usize, actual: usize },
    #[error("invalid cell index {0}")]
    InvalidIndex(usize),
    #[error("combination scheme is empty")]
    EmptyScheme,
    #[error("kd-tree operation failed")]
    KdTreeError,
}
