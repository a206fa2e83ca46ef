use super::grid::{Area, Grid};

/// Number of dyadic refinements of the domain a grid point can be resolved to.
const RESOLUTION: f64 = 48.0;

///
/// Composite trapezoidal rule with `2^l + 1` equidistant points per dimension on the current
/// area. Without boundary points, points on the domain boundary are dropped and treated as
/// zero.
///
#[derive(Debug, Clone)]
pub struct TrapezoidalGrid
{
    domain: Area,
    boundary: Vec<bool>,
    coordinates: Vec<Vec<f64>>,
    weights: Vec<Vec<f64>>,
}

impl TrapezoidalGrid
{
    pub fn new(a: &[f64], b: &[f64], boundary: bool) -> Self
    {
        let ndim = a.len();
        Self { domain: Area::new(a, b), boundary: vec![boundary; ndim], coordinates: vec![Vec::new(); ndim], weights: vec![Vec::new(); ndim] }
    }

    ///
    /// Coordinate of the domain-global dyadic index `k` in `dim`. Points shared by several
    /// cells or levels come out bitwise identical, whichever cell places them.
    ///
    #[inline]
    fn global_coordinate(&self, dim: usize, k: f64) -> f64
    {
        let scale = RESOLUTION.exp2();
        let (a, b) = (self.domain.start[dim], self.domain.end[dim]);
        if k <= 0.0
        {
            a
        }
        else if k >= scale
        {
            b
        }
        else
        {
            a + (b - a) * (k / scale)
        }
    }

    ///
    /// 1d points and weights on `[start, end]` at `level`, including both end points.
    ///
    fn rule_1d(&self, dim: usize, start: f64, end: f64, level: u32) -> (Vec<f64>, Vec<f64>)
    {
        let scale = RESOLUTION.exp2();
        let width = self.domain.width(dim);
        let first = ((start - self.domain.start[dim]) / width * scale).round();
        let last = ((end - self.domain.start[dim]) / width * scale).round();
        let intervals = 1usize << level;
        let h = (end - start) / intervals as f64;
        let coordinates = (0..=intervals).map(|i| self.global_coordinate(dim, first + (last - first) * (i as f64 / intervals as f64))).collect();
        let mut weights = vec![h; intervals + 1];
        weights[0] = 0.5 * h;
        weights[intervals] = 0.5 * h;
        (coordinates, weights)
    }

    #[inline]
    fn drops_lower(&self, start: f64, dim: usize) -> bool
    {
        !self.boundary[dim] && self.domain.on_face(start, dim) && (start - self.domain.start[dim]).abs() <= (start - self.domain.end[dim]).abs()
    }

    #[inline]
    fn drops_upper(&self, end: f64, dim: usize) -> bool
    {
        !self.boundary[dim] && self.domain.on_face(end, dim) && (end - self.domain.end[dim]).abs() <= (end - self.domain.start[dim]).abs()
    }
}

impl Grid for TrapezoidalGrid
{
    fn ndim(&self) -> usize
    {
        self.domain.ndim()
    }

    fn set_area(&mut self, start: &[f64], end: &[f64], levelvec: &[u32])
    {
        for d in 0..self.ndim()
        {
            let (mut coordinates, mut weights) = self.rule_1d(d, start[d], end[d], levelvec[d]);
            if self.drops_upper(end[d], d)
            {
                coordinates.pop();
                weights.pop();
            }
            if self.drops_lower(start[d], d)
            {
                coordinates.remove(0);
                weights.remove(0);
            }
            self.coordinates[d] = coordinates;
            self.weights[d] = weights;
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
        levelvec.iter().enumerate().map(|(d, &level)|
        {
            let n = (1usize << level) + 1;
            if self.boundary[d] { n } else { n.saturating_sub(2) }
        }).collect()
    }

    fn is_nested(&self) -> bool
    {
        true
    }

    fn is_high_order_grid(&self) -> bool
    {
        false
    }

    fn boundaries(&self) -> Vec<bool>
    {
        self.boundary.clone()
    }

    fn set_boundaries(&mut self, boundaries: &[bool])
    {
        self.boundary = boundaries.to_owned();
    }

    fn point_not_zero(&self, point: &[f64]) -> bool
    {
        (0..self.ndim()).all(|d| self.boundary[d] || !self.domain.on_face(point[d], d))
    }
}

#[test]
fn check_trapezoidal_points_and_weights()
{
    let mut grid = TrapezoidalGrid::new(&[0.0, 0.0], &[1.0, 2.0], true);
    grid.set_area(&[0.0, 0.0], &[1.0, 2.0], &[1, 0]);
    let (points, weights) = grid.points_and_weights();
    assert_eq!(points.len() / 2, 6);
    assert_eq!(points, vec![0.0,0.0, 0.0,2.0, 0.5,0.0, 0.5,2.0, 1.0,0.0, 1.0,2.0]);
    let total: f64 = weights.iter().sum();
    assert!((total - 2.0).abs() < 1e-15);
    assert_eq!(grid.level_to_num_points(&[1, 0]), vec![3, 2]);
}

#[test]
fn check_trapezoidal_without_boundary()
{
    let mut grid = TrapezoidalGrid::new(&[0.0], &[1.0], false);
    grid.set_area(&[0.0], &[0.5], &[1]);
    // the domain boundary point 0.0 is dropped, the interior cell face 0.5 is kept
    assert_eq!(grid.coordinates(0), &[0.25, 0.5]);
    assert!(!grid.point_not_zero(&[0.0]));
    assert!(grid.point_not_zero(&[0.5]));
}

#[test]
fn check_trapezoidal_integrates_linear_exactly()
{
    use crate::function::{Function, FunctionCache, FunctionLinear};
    let a = [-3.0, -3.0, -3.0];
    let b = [7.3, 7.3, 7.3];
    let f = FunctionLinear::new(vec![1.0, 10.0, 100.0]);
    let mut grid = TrapezoidalGrid::new(&a, &b, true);
    let mut cache = FunctionCache::new();
    let integral = grid.integrate(&f, &mut cache, &[0, 2, 1], &a, &b);
    let exact = f.analytic_integral(&a, &b).unwrap();
    assert!(((integral[0] - exact[0]) / exact[0]).abs() < 1e-13);
    assert_eq!(cache.unique_evaluations(), 2 * 5 * 3);
}

#[test]
fn check_shared_points_are_evaluated_once()
{
    use crate::combination_scheme::count_distinct_points;
    use crate::function::{FunctionCache, FunctionLinear};
    let a = [-3.0, -3.0];
    let b = [7.3, 7.3];
    let f = FunctionLinear::new(vec![1.0, 10.0]);
    let mut grid = TrapezoidalGrid::new(&a, &b, true);
    let mut cache = FunctionCache::new();
    let mut points = Vec::new();
    let domain = Area::new(&a, &b);
    grid.integrate(&f, &mut cache, &[3, 3], &a, &b);
    points.extend(grid.points_and_weights().0);
    for child in domain.split()
    {
        for grandchild in child.split()
        {
            grid.integrate(&f, &mut cache, &[1, 1], &grandchild.start, &grandchild.end);
            points.extend(grid.points_and_weights().0);
        }
    }
    // the grandchild grids only repeat points of the 9x9 parent grid
    assert_eq!(count_distinct_points(&points, 2).unwrap(), 81);
    assert_eq!(cache.unique_evaluations(), 81);
}
