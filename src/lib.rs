//! Spatially adaptive sparse grid combination technique.
//!
//! The domain is decomposed into a tree of axis-aligned cells. Every leaf is integrated with
//! all component grids of a classic combination scheme, coarsened per cell, and the refinement
//! driver repeatedly either splits a cell into `2^d` children or extends its resolution,
//! whichever promises the larger benefit.

pub mod algorithms;
pub mod combination_scheme;
pub mod errors;
pub mod function;
pub mod grids;
pub mod refinement;
pub mod standard_combi;
pub mod utilities;

pub use algorithms::refinement::{AdaptiveResult, ExtendSplitOptions, ExtendSplitStrategy, SpatiallyAdaptiveExtendSplit};
pub use combination_scheme::{CombinationScheme, ComponentGrid};
pub use errors::{Result, SGError};
pub use function::{Function, FunctionCache, FunctionWrapper};
pub use grids::{gauss_legendre::GaussLegendreGrid, grid::{Area, Grid}, trapezoidal::TrapezoidalGrid};
pub use utilities::norm::Norm;
