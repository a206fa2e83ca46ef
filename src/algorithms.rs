pub mod coarsening;
pub mod error_estimation;
pub mod integration;
pub mod refinement;
