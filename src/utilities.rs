pub mod interpolation;
pub mod multi_index_manipulation;
pub mod norm;
