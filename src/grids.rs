pub mod gauss_legendre;
pub mod grid;
pub mod trapezoidal;
