use kdtree::distance::squared_euclidean;
use kdtree::KdTree;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SGError};
use crate::grids::grid::{Area, Grid};
use crate::utilities::multi_index_manipulation::{simplex_level_sets, weight_modifiers};

///
/// One full tensor grid of the combination technique.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentGrid
{
    pub levelvector: Vec<u32>,
    pub coefficient: f64,
}

///
/// Classic combination scheme: all level vectors `l >= lmin` on the `dim` topmost diagonals
/// `|l|_1 = lmax + (dim - 1) * lmin - q`, `q = 0..dim-1`, with coefficient
/// `(-1)^q binom(dim - 1, q)`. Grids are ordered by diagonal, top diagonal first.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationScheme
{
    lmin: u32,
    lmax: u32,
    dim: usize,
    grids: Vec<ComponentGrid>,
}

impl CombinationScheme
{
    pub fn new(lmin: u32, lmax: u32, dim: usize) -> Result<Self>
    {
        if dim == 0
        {
            return Err(SGError::DimensionMismatch { expected: 1, actual: 0 });
        }
        if lmax < lmin
        {
            return Err(SGError::InvalidLevels { lmin, lmax });
        }
        let level_sets = simplex_level_sets(dim, lmin, lmax + (dim as u32 - 1) * lmin);
        let weights = weight_modifiers(&level_sets, dim)?;
        let mut grids: Vec<ComponentGrid> = level_sets.chunks_exact(dim).zip(weights)
            .filter(|(_, weight)| *weight != 0.0)
            .map(|(level, coefficient)| ComponentGrid { levelvector: level.to_owned(), coefficient })
            .collect();
        grids.sort_by_key(|grid| std::cmp::Reverse(grid.levelvector.iter().sum::<u32>()));
        if grids.is_empty()
        {
            return Err(SGError::EmptyScheme);
        }
        Ok(Self { lmin, lmax, dim, grids })
    }

    #[inline]
    pub fn lmin(&self) -> u32
    {
        self.lmin
    }

    #[inline]
    pub fn lmax(&self) -> u32
    {
        self.lmax
    }

    #[inline]
    pub fn dim(&self) -> usize
    {
        self.dim
    }

    pub fn grids(&self) -> &[ComponentGrid]
    {
        &self.grids
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ComponentGrid>
    {
        self.grids.iter()
    }

    pub fn len(&self) -> usize
    {
        self.grids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.grids.is_empty()
    }

    ///
    /// `|l|_1` of the grids on the top diagonal.
    ///
    #[inline]
    pub fn max_level_sum(&self) -> u32
    {
        self.lmax + (self.dim as u32 - 1) * self.lmin
    }

    ///
    /// Distance of `levelvec` below the top diagonal (0 for grids on the top diagonal).
    ///
    pub fn num_sub_diagonal(&self, levelvec: &[u32]) -> u32
    {
        self.max_level_sum().saturating_sub(levelvec.iter().sum::<u32>())
    }

    #[inline]
    pub fn is_top_diagonal(&self, levelvec: &[u32]) -> bool
    {
        levelvec.iter().sum::<u32>() == self.max_level_sum()
    }

    ///
    /// Number of points of the scheme on `area`. With `distinct` each grid is weighted with its
    /// coefficient, which for nested grids yields the number of distinct points.
    ///
    pub fn total_num_points<G: Grid>(&self, grid: &mut G, area: &Area, distinct: bool) -> f64
    {
        let mut num_points = 0.0;
        for component in &self.grids
        {
            grid.set_area(&area.start, &area.end, &component.levelvector);
            let factor = if distinct { component.coefficient } else { 1.0 };
            num_points += factor * grid.level_to_num_points(&component.levelvector).iter().product::<usize>() as f64;
        }
        num_points
    }

    ///
    /// Number of geometrically distinct points of all component grids on `area`.
    ///
    pub fn distinct_points<G: Grid>(&self, grid: &mut G, area: &Area) -> Result<usize>
    {
        let mut points = Vec::new();
        for component in &self.grids
        {
            grid.set_area(&area.start, &area.end, &component.levelvector);
            points.extend(grid.points_and_weights().0);
        }
        count_distinct_points(&points, self.dim)
    }
}

///
/// Count the points (flattened, `ndim` coordinates each) that are distinct up to round-off.
///
pub fn count_distinct_points(points: &[f64], ndim: usize) -> Result<usize>
{
    let mut tree: KdTree<f64, usize, Vec<f64>> = KdTree::new(ndim);
    let mut count = 0;
    for point in points.chunks_exact(ndim)
    {
        let nodes = tree.within(point, 1e-20, &squared_euclidean).map_err(|_| SGError::KdTreeError)?;
        if nodes.is_empty()
        {
            tree.add(point.to_vec(), count).map_err(|_| SGError::KdTreeError)?;
            count += 1;
        }
    }
    Ok(count)
}

#[test]
fn check_classic_scheme_2d()
{
    let scheme = CombinationScheme::new(0, 2, 2).unwrap();
    let grids: Vec<(Vec<u32>, f64)> = scheme.iter().map(|g| (g.levelvector.clone(), g.coefficient)).collect();
    assert_eq!(grids, vec![
        (vec![0, 2], 1.0), (vec![1, 1], 1.0), (vec![2, 0], 1.0),
        (vec![0, 1], -1.0), (vec![1, 0], -1.0)]);
    assert_eq!(scheme.num_sub_diagonal(&[1, 1]), 0);
    assert_eq!(scheme.num_sub_diagonal(&[1, 0]), 1);
}

#[test]
fn check_scheme_point_count_matches_sparse_grid()
{
    use crate::grids::trapezoidal::TrapezoidalGrid;
    let scheme = CombinationScheme::new(0, 2, 2).unwrap();
    let area = Area::new(&[0.0, 0.0], &[1.0, 1.0]);
    let mut grid = TrapezoidalGrid::new(&area.start, &area.end, true);
    // 10 + 9 + 10 - 6 - 6 points
    assert_eq!(scheme.total_num_points(&mut grid, &area, true), 17.0);
    assert_eq!(scheme.total_num_points(&mut grid, &area, false), 41.0);
    assert_eq!(scheme.distinct_points(&mut grid, &area).unwrap(), 17);
}

#[test]
fn check_scheme_with_lmin()
{
    for dim in 2..5
    {
        for lmax in 1..4
        {
            for lmin in 1..=lmax
            {
                let scheme = CombinationScheme::new(lmin, lmax, dim).unwrap();
                let sum: f64 = scheme.iter().map(|g| g.coefficient).sum();
                // the coefficients of a combination scheme add up to one
                assert_eq!(sum, 1.0, "lmin {lmin} lmax {lmax} dim {dim}");
                assert!(scheme.iter().all(|g| g.levelvector.iter().all(|&l| l >= lmin && l <= lmax)));
                assert!(scheme.iter().all(|g| scheme.num_sub_diagonal(&g.levelvector) < dim as u32));
            }
        }
    }
    assert!(CombinationScheme::new(3, 2, 2).is_err());
    assert_eq!(CombinationScheme::new(2, 2, 3).unwrap().len(), 1);
}
