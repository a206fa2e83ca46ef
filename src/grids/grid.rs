use serde::{Deserialize, Serialize};

use crate::function::{Function, FunctionCache};
use crate::utilities::multi_index_manipulation::cartesian_product;

///
/// Axis-aligned box `[start, end]`.
///
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area
{
    pub start: Vec<f64>,
    pub end: Vec<f64>,
}

impl Area
{
    pub fn new(start: &[f64], end: &[f64]) -> Self
    {
        Self { start: start.to_owned(), end: end.to_owned() }
    }

    #[inline]
    pub fn ndim(&self) -> usize
    {
        self.start.len()
    }

    #[inline]
    pub fn width(&self, dim: usize) -> f64
    {
        self.end[dim] - self.start[dim]
    }

    ///
    /// Volume of the box (width(dim1)*...*width(dim_n))
    ///
    pub fn volume(&self) -> f64
    {
        (0..self.ndim()).map(|d| self.width(d)).product()
    }

    #[inline]
    fn tolerance(&self, dim: usize) -> f64
    {
        1e-12 * self.width(dim).abs().max(f64::MIN_POSITIVE)
    }

    ///
    /// Whether `x` coincides with the lower or upper face of the box in `dim`.
    ///
    #[inline]
    pub fn on_face(&self, x: f64, dim: usize) -> bool
    {
        let tol = self.tolerance(dim);
        (x - self.start[dim]).abs() <= tol || (x - self.end[dim]).abs() <= tol
    }

    ///
    /// Closed containment test, faces included.
    ///
    pub fn contains(&self, point: &[f64]) -> bool
    {
        (0..self.ndim()).all(|d|
        {
            let tol = self.tolerance(d);
            point[d] >= self.start[d] - tol && point[d] <= self.end[d] + tol
        })
    }

    ///
    /// Weight factor of a point of a `parent` grid when it is attributed to this (child) box:
    /// halved for every coordinate lying on a face of this box that is not a parent face,
    /// since the neighbouring child receives the other half.
    ///
    pub fn point_factor(&self, point: &[f64], parent: &Area) -> f64
    {
        let mut factor = 1.0;
        for d in 0..self.ndim()
        {
            if self.on_face(point[d], d) && !parent.on_face(point[d], d)
            {
                factor *= 0.5;
            }
        }
        factor
    }

    ///
    /// Bisect the box in every dimension. Child `i` takes the upper half in dimension `d`
    /// if bit `d` of `i` is set.
    ///
    pub fn split(&self) -> Vec<Area>
    {
        let ndim = self.ndim();
        let midpoint: Vec<f64> = (0..ndim).map(|d| self.start[d] + 0.5 * self.width(d)).collect();
        (0..1usize << ndim).map(|i|
        {
            let mut child = self.clone();
            for d in 0..ndim
            {
                if i >> d & 1 == 1
                {
                    child.start[d] = midpoint[d];
                }
                else
                {
                    child.end[d] = midpoint[d];
                }
            }
            child
        }).collect()
    }

    ///
    /// Volume of the intersection with `other`.
    ///
    pub fn intersection_volume(&self, other: &Area) -> f64
    {
        (0..self.ndim()).map(|d|
        {
            (self.end[d].min(other.end[d]) - self.start[d].max(other.start[d])).max(0.0)
        }).product()
    }
}

///
/// Capability of a tensor product quadrature grid that can be placed on an arbitrary
/// sub-box of the domain with a per-dimension level.
///
pub trait Grid
{
    fn ndim(&self) -> usize;

    ///
    /// Place the grid on `[start, end]` with the given `levelvec`.
    ///
    fn set_area(&mut self, start: &[f64], end: &[f64], levelvec: &[u32]);

    ///
    /// 1d coordinates of the current area in dimension `dim`.
    ///
    fn coordinates(&self, dim: usize) -> &[f64];

    ///
    /// 1d quadrature weights of the current area in dimension `dim`.
    ///
    fn weights(&self, dim: usize) -> &[f64];

    ///
    /// Number of points per dimension the current area carries at `levelvec`.
    ///
    fn level_to_num_points(&self, levelvec: &[u32]) -> Vec<usize>;

    ///
    /// Whether the points of level `l` are contained in the points of level `l + 1`.
    ///
    fn is_nested(&self) -> bool;

    fn is_high_order_grid(&self) -> bool;

    ///
    /// Whether the grid carries points on the domain boundary, per dimension.
    ///
    fn boundaries(&self) -> Vec<bool>;

    fn set_boundaries(&mut self, boundaries: &[bool]);

    ///
    /// Points on a domain face without boundary points are implicitly zero.
    ///
    fn point_not_zero(&self, point: &[f64]) -> bool;

    ///
    /// Flattened points (`ndim` coordinates each) and tensor weights of the current area.
    ///
    fn points_and_weights(&self) -> (Vec<f64>, Vec<f64>)
    {
        let ndim = self.ndim();
        let num_points: Vec<usize> = (0..ndim).map(|d| self.coordinates(d).len()).collect();
        let indices = cartesian_product(&num_points);
        let total = num_points.iter().product::<usize>();
        let mut points = Vec::with_capacity(total * ndim);
        let mut weights = Vec::with_capacity(total);
        for index in indices.chunks_exact(ndim)
        {
            let mut weight = 1.0;
            for d in 0..ndim
            {
                points.push(self.coordinates(d)[index[d]]);
                weight *= self.weights(d)[index[d]];
            }
            weights.push(weight);
        }
        (points, weights)
    }

    ///
    /// Integral of `f` over `[start, end]` at `levelvec`. Function values go through `cache`.
    ///
    fn integrate(&mut self, f: &dyn Function, cache: &mut FunctionCache, levelvec: &[u32], start: &[f64], end: &[f64]) -> Vec<f64>
    {
        self.set_area(start, end, levelvec);
        let (points, weights) = self.points_and_weights();
        let mut integral = vec![0.0; f.num_outputs()];
        for (point, &weight) in points.chunks_exact(self.ndim()).zip(&weights)
        {
            for (acc, &value) in integral.iter_mut().zip(cache.eval(f, point))
            {
                *acc += weight * value;
            }
        }
        integral
    }
}

#[test]
fn check_split_tiles_parent()
{
    let area = Area::new(&[-3.0, 0.0, 1.0], &[7.3, 1.0, 2.5]);
    let children = area.split();
    assert_eq!(children.len(), 8);
    let volume: f64 = children.iter().map(|c| c.volume()).sum();
    assert!((volume - area.volume()).abs() < 1e-12 * area.volume());
    for (i, a) in children.iter().enumerate()
    {
        for b in children.iter().skip(i + 1)
        {
            assert_eq!(a.intersection_volume(b), 0.0);
        }
    }
    // child 1 is the upper half in dimension 0 only
    assert!((children[1].start[0] - 2.15).abs() < 1e-12);
    assert_eq!(children[1].start[0], children[0].end[0]);
    assert_eq!(children[1].start[1], 0.0);
}

#[test]
fn check_point_factor()
{
    let parent = Area::new(&[0.0, 0.0], &[1.0, 1.0]);
    let child = &parent.split()[0];
    assert_eq!(child.point_factor(&[0.25, 0.25], &parent), 1.0);
    assert_eq!(child.point_factor(&[0.5, 0.25], &parent), 0.5);
    assert_eq!(child.point_factor(&[0.5, 0.5], &parent), 0.25);
    assert_eq!(child.point_factor(&[0.0, 0.5], &parent), 0.5);
    assert!(child.contains(&[0.5, 0.5]));
    assert!(!child.contains(&[0.75, 0.5]));
}
