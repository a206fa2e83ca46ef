use std::f64::consts::PI;

use rustc_hash::FxHashMap;

use super::grid::{Area, Grid};

/// Compute the Legendre polynomial P_n(x) and its derivative using recurrence
fn legendre_and_derivative(n: usize, x: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = x;
    let mut dp0 = 0.0;
    let mut dp1 = 1.0;

    for k in 2..=n {
        let kf = k as f64;
        let pk = ((2.0 * kf - 1.0) * x * p1 - (kf - 1.0) * p0) / kf;
        let dpk = ((2.0 * kf - 1.0) * (p1 + x * dp1) - (kf - 1.0) * dp0) / kf;

        p0 = p1;
        p1 = pk;
        dp0 = dp1;
        dp1 = dpk;
    }

    (p1, dp1)
}

/// Compute Gauss-Legendre nodes and weights on the interval (0, 1), sorted by node.
pub fn gauss_legendre(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);
    let eps = 1e-15;

    for i in 0..n {
        // Chebyshev-like initial guess
        let theta = PI * (i as f64 + 0.75) / (n as f64 + 0.5);
        let mut x = theta.cos();

        for _ in 0..100 {
            let (p, dp) = legendre_and_derivative(n, x);
            let dx = -p / dp;
            x += dx;
            if dx.abs() < eps {
                break;
            }
        }

        let (_, dp) = legendre_and_derivative(n, x);
        let w = 2.0 / ((1.0 - x * x) * dp * dp);
        pairs.push((0.5 * (x + 1.0), 0.5 * w));
    }
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    pairs.into_iter().unzip()
}

///
/// Tensor Gauss-Legendre rule with `2^l` points per dimension. High order and not nested;
/// it never places points on the boundary of an area.
///
#[derive(Debug, Clone)]
pub struct GaussLegendreGrid
{
    domain: Area,
    rules: FxHashMap<usize, (Vec<f64>, Vec<f64>)>,
    coordinates: Vec<Vec<f64>>,
    weights: Vec<Vec<f64>>,
}

impl GaussLegendreGrid
{
    pub fn new(a: &[f64], b: &[f64]) -> Self
    {
        let ndim = a.len();
        Self { domain: Area::new(a, b), rules: FxHashMap::default(), coordinates: vec![Vec::new(); ndim], weights: vec![Vec::new(); ndim] }
    }
}

impl Grid for GaussLegendreGrid
{
    fn ndim(&self) -> usize
    {
        self.domain.ndim()
    }

    fn set_area(&mut self, start: &[f64], end: &[f64], levelvec: &[u32])
    {
        for d in 0..self.ndim()
        {
            let n = 1usize << levelvec[d];
            let (nodes, weights) = self.rules.entry(n).or_insert_with(|| gauss_legendre(n));
            let width = end[d] - start[d];
            self.coordinates[d] = nodes.iter().map(|x| start[d] + width * x).collect();
            self.weights[d] = weights.iter().map(|w| width * w).collect();
        }
    }

    fn coordinates(&self, dim: usize) -> &[f64]
    {
        &self.coordinates[dim]
    }

    fn weights(&self, dim: usize) -> &[f64]
    {
        &self.weights[dim]
    }

    fn level_to_num_points(&self, levelvec: &[u32]) -> Vec<usize>
    {
        levelvec.iter().map(|&level| 1usize << level).collect()
    }

    fn is_nested(&self) -> bool
    {
        false
    }

    fn is_high_order_grid(&self) -> bool
    {
        true
    }

    fn boundaries(&self) -> Vec<bool>
    {
        vec![false; self.ndim()]
    }

    fn set_boundaries(&mut self, _boundaries: &[bool])
    {
    }

    fn point_not_zero(&self, _point: &[f64]) -> bool
    {
        true
    }
}

#[test]
fn test_gauss_legendre() {
    let (nodes, weights) = gauss_legendre(10);
    let expected_nodes = [0.0130467357414145,0.067468316655508,0.160295215850488,0.283302302935377,0.425562830509185,0.574437169490815,0.716697697064624,0.839704784149512,0.932531683344492,0.986953264258586];
    let expected_weights = [0.033335672154344,0.07472567457529,0.109543181257991,0.134633359654998,0.147762112357376,0.147762112357376,0.134633359654998,0.109543181257991,0.07472567457529,0.033335672154344];

    for (n1, n2) in nodes.iter().zip(expected_nodes.iter()) {
        assert!((n1 - n2).abs() < 1e-12);
    }
    for (w1, w2) in weights.iter().zip(expected_weights.iter()) {
        assert!((w1 - w2).abs() < 1e-12);
    }
}

#[test]
fn check_gauss_legendre_grid_polynomial_exactness()
{
    use crate::function::{FunctionCache, FunctionWrapper};
    let mut grid = GaussLegendreGrid::new(&[0.0, -1.0], &[2.0, 1.0]);
    let f = FunctionWrapper::new(1, |x: &[f64], out: &mut [f64]| out[0] = x[0].powi(3) * x[1] * x[1]);
    let mut cache = FunctionCache::new();
    // 2 points per dimension integrate cubics exactly: int x^3 = 4, int y^2 = 2/3
    let integral = grid.integrate(&f, &mut cache, &[1, 1], &[0.0, -1.0], &[2.0, 1.0]);
    assert!((integral[0] - 8.0 / 3.0).abs() < 1e-13);
    assert_eq!(grid.level_to_num_points(&[1, 2]), vec![2, 4]);
}
