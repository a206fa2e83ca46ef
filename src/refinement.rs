pub mod cell;
pub mod container;
