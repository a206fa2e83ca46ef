use crate::combination_scheme::{CombinationScheme, ComponentGrid};
use crate::function::{Function, FunctionCache};
use crate::grids::grid::{Area, Grid};
use crate::refinement::cell::CellId;
use crate::refinement::container::RefinementContainer;
use crate::utilities::interpolation::interpolate_multilinear;
use crate::utilities::multi_index_manipulation::cartesian_product;

use super::coarsening::{ChargeCache, Coarsened, CoarseningPolicy};

///
/// Combined integral and point count of one pass of a combination scheme over an area.
///
#[derive(Debug, Clone, PartialEq)]
pub struct PassResult
{
    pub integral: Vec<f64>,
    pub num_points: f64,
}

impl PassResult
{
    fn new(num_outputs: usize) -> Self
    {
        Self { integral: vec![0.0; num_outputs], num_points: 0.0 }
    }

    fn add(&mut self, partial: &[f64], coefficient: f64)
    {
        self.integral.iter_mut().zip(partial).for_each(|(a, p)| *a += coefficient * p);
    }
}

///
/// Integrates component grids on cells. Owns the grid, the coarsening policy and the caches of
/// one adaptive run, so nothing outside the run observes them.
///
#[derive(Debug, Clone)]
pub struct Evaluator<G: Grid>
{
    grid: G,
    policy: CoarseningPolicy,
    charges: ChargeCache,
    cache: FunctionCache,
}

impl<G: Grid> Evaluator<G>
{
    pub fn new(grid: G, policy: CoarseningPolicy) -> Self
    {
        Self { grid, policy, charges: ChargeCache::new(), cache: FunctionCache::new() }
    }

    ///
    /// Start a new run: forget all function values and charges.
    ///
    pub fn reset(&mut self, policy: CoarseningPolicy)
    {
        self.policy = policy;
        self.charges.clear();
        self.cache.clear();
    }

    pub fn grid(&self) -> &G
    {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut G
    {
        &mut self.grid
    }

    pub fn policy(&self) -> &CoarseningPolicy
    {
        &self.policy
    }

    pub fn function_cache(&self) -> &FunctionCache
    {
        &self.cache
    }

    ///
    /// Weight of a grid in point counts: for nested grids the coefficient, so that the
    /// combination counts distinct points.
    ///
    #[inline]
    pub fn point_weight(&self, coefficient: f64) -> f64
    {
        if self.grid.is_nested() { coefficient } else { 1.0 }
    }

    #[inline]
    fn current_num_points(&self) -> usize
    {
        (0..self.grid.ndim()).map(|d| self.grid.coordinates(d).len()).product()
    }

    ///
    /// Coarsen a level vector of the global scheme on the cell `key`.
    ///
    pub fn coarsen(&mut self, key: CellId, levelvec: &[u32], coarsening: u32, global: &CombinationScheme) -> Coarsened
    {
        self.coarsen_in(key, levelvec, coarsening, global, global)
    }

    ///
    /// Coarsen a level vector of `grids`, a scheme that may reach beyond the global one. The top
    /// diagonal is the one of `grids`, the maximum level the one of the `global` scheme.
    ///
    pub fn coarsen_in(&mut self, key: CellId, levelvec: &[u32], coarsening: u32, grids: &CombinationScheme, global: &CombinationScheme) -> Coarsened
    {
        self.policy.coarsen(&mut self.charges, key, levelvec, coarsening, global.lmax(), grids.is_top_diagonal(levelvec))
    }

    ///
    /// Plain integral of a single grid of `levelvec` over `area`, without coarsening.
    ///
    pub fn integrate(&mut self, f: &dyn Function, levelvec: &[u32], area: &Area) -> Vec<f64>
    {
        self.grid.integrate(f, &mut self.cache, levelvec, &area.start, &area.end)
    }

    ///
    /// Integrate one component grid on a leaf and accumulate `coefficient * partial` into the
    /// leaf and the container. Degenerate grids contribute `(0, 0)` without touching the grid.
    ///
    pub fn evaluate(&mut self, f: &dyn Function, container: &mut RefinementContainer, id: CellId, component: &ComponentGrid, scheme: &CombinationScheme) -> (Vec<f64>, usize)
    {
        let coarsening = container.cell(id).coarsening;
        let coarsened = self.coarsen(id, &component.levelvector, coarsening, scheme);
        if coarsened.is_degenerate
        {
            return (vec![0.0; f.num_outputs()], 0);
        }
        let area = &container.cell(id).area;
        let partial = self.grid.integrate(f, &mut self.cache, &coarsened.levelvec, &area.start, &area.end);
        let num_points = self.current_num_points();
        container.accumulate(id, &partial, component.coefficient, self.point_weight(component.coefficient) * num_points as f64);
        (partial, num_points)
    }

    ///
    /// Evaluate the whole scheme on a leaf, replacing its previous contribution. Returns the
    /// number of grid points used.
    ///
    pub fn evaluate_cell(&mut self, f: &dyn Function, container: &mut RefinementContainer, id: CellId, scheme: &CombinationScheme) -> usize
    {
        self.charges.clear_cell(id);
        container.reset_cell(id);
        let mut num_points = 0;
        for component in scheme.iter()
        {
            num_points += self.evaluate(f, container, id, component, scheme).1;
        }
        container.cell_mut(id).flags.set_considered(true);
        num_points
    }

    ///
    /// Combined integral of `scheme` over `area` with the given coarsening. Nothing is
    /// accumulated.
    ///
    pub fn scheme_integral(&mut self, f: &dyn Function, key: CellId, area: &Area, coarsening: u32, scheme: &CombinationScheme) -> PassResult
    {
        self.charges.clear_cell(key);
        let mut result = PassResult::new(f.num_outputs());
        for component in scheme.iter()
        {
            let coarsened = self.coarsen(key, &component.levelvector, coarsening, scheme);
            if coarsened.is_degenerate
            {
                continue;
            }
            let partial = self.grid.integrate(f, &mut self.cache, &coarsened.levelvec, &area.start, &area.end);
            result.add(&partial, component.coefficient);
            result.num_points += self.point_weight(component.coefficient) * self.current_num_points() as f64;
        }
        result
    }

    ///
    /// Integral over `child` using only the points of the `grids` placed on `parent`. Points on
    /// an inner face of the child are shared with its neighbour and count with half their
    /// weight per such face.
    ///
    pub fn filtered_integral(&mut self, f: &dyn Function, key: CellId, parent: &Area, child: &Area, coarsening: u32, grids: &CombinationScheme, global: &CombinationScheme) -> PassResult
    {
        self.charges.clear_cell(key);
        let ndim = parent.ndim();
        let mut result = PassResult::new(f.num_outputs());
        for component in grids.iter()
        {
            let coarsened = self.coarsen(key, &component.levelvector, coarsening, global);
            if coarsened.is_degenerate
            {
                continue;
            }
            self.grid.set_area(&parent.start, &parent.end, &coarsened.levelvec);
            let (points, weights) = self.grid.points_and_weights();
            let point_weight = self.point_weight(component.coefficient);
            for (point, &weight) in points.chunks_exact(ndim).zip(&weights)
            {
                if !child.contains(point)
                {
                    continue;
                }
                let factor = weight * child.point_factor(point, parent) * component.coefficient;
                result.integral.iter_mut().zip(self.cache.eval(f, point)).for_each(|(a, v)| *a += factor * v);
                result.num_points += point_weight;
            }
        }
        result
    }

    ///
    /// Integral over `child` of the multilinear interpolant of the `grids` placed on `parent`.
    /// The parent mesh always includes the boundary; mesh points the grid would not carry are
    /// zero. The point count is the number of non-zero mesh points inside the child.
    ///
    pub fn interpolated_integral(&mut self, f: &dyn Function, key: CellId, parent: &Area, child: &Area, coarsening: u32, grids: &CombinationScheme, global: &CombinationScheme) -> PassResult
    {
        self.charges.clear_cell(key);
        let ndim = parent.ndim();
        let num_outputs = f.num_outputs();
        let mut result = PassResult::new(num_outputs);
        for component in grids.iter()
        {
            let coarsened = self.coarsen_in(key, &component.levelvector, coarsening, grids, global);
            if coarsened.is_degenerate
            {
                continue;
            }
            let boundaries = self.grid.boundaries();
            self.grid.set_boundaries(&vec![true; ndim]);
            self.grid.set_area(&parent.start, &parent.end, &coarsened.levelvec);
            self.grid.set_boundaries(&boundaries);
            let mesh: Vec<Vec<f64>> = (0..ndim).map(|d| self.grid.coordinates(d).to_owned()).collect();

            let sizes: Vec<usize> = mesh.iter().map(|m| m.len()).collect();
            let mut values = Vec::with_capacity(sizes.iter().product::<usize>() * num_outputs);
            let mut point = vec![0.0; ndim];
            let point_weight = self.point_weight(component.coefficient);
            for index in cartesian_product(&sizes).chunks_exact(ndim)
            {
                for d in 0..ndim
                {
                    point[d] = mesh[d][index[d]];
                }
                if self.grid.point_not_zero(&point)
                {
                    values.extend_from_slice(self.cache.eval(f, &point));
                    if child.contains(&point)
                    {
                        result.num_points += point_weight;
                    }
                }
                else
                {
                    values.extend(std::iter::repeat(0.0).take(num_outputs));
                }
            }

            self.grid.set_area(&child.start, &child.end, &coarsened.levelvec);
            let (points, weights) = self.grid.points_and_weights();
            let interpolated = interpolate_multilinear(&mesh, &values, num_outputs, &points);
            for (value, &weight) in interpolated.chunks_exact(num_outputs).zip(&weights)
            {
                result.add(value, weight * component.coefficient);
            }
        }
        result
    }

    ///
    /// Number of points of the `scheme` placed on `parent` that lie inside `child`.
    ///
    pub fn points_inside(&mut self, key: CellId, parent: &Area, child: &Area, coarsening: u32, scheme: &CombinationScheme) -> f64
    {
        self.charges.clear_cell(key);
        let ndim = parent.ndim();
        let mut num_points = 0.0;
        for component in scheme.iter()
        {
            let coarsened = self.coarsen(key, &component.levelvector, coarsening, scheme);
            if coarsened.is_degenerate
            {
                continue;
            }
            self.grid.set_area(&parent.start, &parent.end, &coarsened.levelvec);
            let (points, _) = self.grid.points_and_weights();
            let inside = points.chunks_exact(ndim).filter(|p| child.contains(p)).count();
            num_points += self.point_weight(component.coefficient) * inside as f64;
        }
        num_points
    }

    ///
    /// Points of the grid of `levelvec` on every leaf, coarsened per leaf. With `skip_degenerate`
    /// grids dropped by the coarsening are left out.
    ///
    pub fn points_component_grid(&mut self, container: &RefinementContainer, levelvec: &[u32], scheme: &CombinationScheme, skip_degenerate: bool) -> Vec<f64>
    {
        let mut points = Vec::new();
        for id in container.leaves()
        {
            let cell = container.cell(id);
            self.charges.clear_cell(id);
            let coarsened = self.coarsen(id, levelvec, cell.coarsening, scheme);
            if skip_degenerate && coarsened.is_degenerate
            {
                continue;
            }
            self.grid.set_area(&cell.area.start, &cell.area.end, &coarsened.levelvec);
            points.extend(self.grid.points_and_weights().0);
        }
        points
    }
}

#[cfg(test)]
fn unit_evaluator(boundary: bool) -> Evaluator<crate::grids::trapezoidal::TrapezoidalGrid>
{
    use crate::grids::trapezoidal::TrapezoidalGrid;
    Evaluator::new(TrapezoidalGrid::new(&[0.0, 0.0], &[1.0, 1.0], boundary), CoarseningPolicy::new(0, 1).unwrap())
}

#[test]
fn check_evaluate_cell_accumulates_into_container()
{
    use crate::function::FunctionLinear;
    let f = FunctionLinear::new(vec![1.0, 10.0]);
    let mut evaluator = unit_evaluator(true);
    let scheme = CombinationScheme::new(1, 2, 2).unwrap();
    let mut container = RefinementContainer::new(Area::new(&[0.0, 0.0], &[1.0, 1.0]), 1);
    let children = container.split(container.root(), 0).unwrap();
    for &child in &children
    {
        evaluator.evaluate_cell(&f, &mut container, child, &scheme);
        assert!(container.cell(child).considered());
    }
    // trapezoidal grids are exact for linear functions
    assert!((container.integral()[0] - 5.5).abs() < 1e-13);
    let exact = f.analytic_integral(&container.cell(children[3]).area.start, &container.cell(children[3]).area.end).unwrap();
    assert!((container.cell(children[3]).integral[0] - exact[0]).abs() < 1e-13);
    // [0,1] and [1,0] carry 2x3 points, [0,0] carries 2x2 points
    assert_eq!(container.cell(children[0]).evaluations, 6.0 + 6.0 - 4.0);
    // evaluating again replaces the contribution
    evaluator.evaluate_cell(&f, &mut container, children[0], &scheme);
    assert!((container.integral()[0] - 5.5).abs() < 1e-13);
}

#[test]
fn check_filtered_integral_of_children_sums_to_parent()
{
    use crate::function::FunctionWrapper;
    let f = FunctionWrapper::new(1, |x: &[f64], out: &mut [f64]| out[0] = (x[0] + 2.0 * x[1]).exp());
    let mut evaluator = unit_evaluator(true);
    let scheme = CombinationScheme::new(1, 3, 2).unwrap();
    let parent = Area::new(&[0.0, 0.0], &[1.0, 1.0]);
    let whole = evaluator.scheme_integral(&f, CellId(0), &parent, 0, &scheme);
    let mut sum = 0.0;
    for child in parent.split()
    {
        sum += evaluator.filtered_integral(&f, CellId(0), &parent, &child, 0, &scheme, &scheme).integral[0];
    }
    // shared face points are split between the children, so nothing is counted twice
    assert!((sum - whole.integral[0]).abs() < 1e-12 * whole.integral[0].abs());
}

#[test]
fn check_interpolated_integral_is_exact_for_bilinear_functions()
{
    use crate::function::FunctionWrapper;
    let f = FunctionWrapper::new(1, |x: &[f64], out: &mut [f64]| out[0] = 1.0 + x[0] * x[1]);
    let mut evaluator = unit_evaluator(true);
    let scheme = CombinationScheme::new(1, 2, 2).unwrap();
    let parent = Area::new(&[0.0, 0.0], &[1.0, 1.0]);
    let child = parent.split()[3].clone();
    let result = evaluator.interpolated_integral(&f, CellId(0), &parent, &child, 0, &scheme, &scheme);
    // int_{[0.5,1]^2} 1 + xy = 0.25 + 9/64
    assert!((result.integral[0] - (0.25 + 9.0 / 64.0)).abs() < 1e-13);
    assert!(result.num_points > 0.0);
}

#[test]
fn check_degenerate_grid_contributes_nothing()
{
    use crate::function::FunctionLinear;
    let f = FunctionLinear::new(vec![1.0, 1.0]);
    let mut evaluator = unit_evaluator(true);
    let scheme = CombinationScheme::new(1, 3, 2).unwrap();
    let mut container = RefinementContainer::new(Area::new(&[0.0, 0.0], &[1.0, 1.0]), 1);
    let id = container.root();
    container.cell_mut(id).coarsening = 1;
    evaluator.evaluate_cell(&f, &mut container, id, &scheme);
    let requests = evaluator.function_cache().requests();
    // [2,2] collapses on a cell with coarsening 1
    let (partial, num_points) = evaluator.evaluate(&f, &mut container, id, &ComponentGrid { levelvector: vec![2, 2], coefficient: 1.0 }, &scheme);
    assert_eq!(partial, vec![0.0]);
    assert_eq!(num_points, 0);
    assert_eq!(evaluator.function_cache().requests(), requests);
    assert!((container.integral()[0] - 1.0).abs() < 1e-13);
}

#[test]
fn check_raised_scheme_uses_its_own_top_diagonal()
{
    use crate::grids::trapezoidal::TrapezoidalGrid;
    let mut evaluator = Evaluator::new(TrapezoidalGrid::new(&[0.0, 0.0], &[1.0, 1.0], true), CoarseningPolicy::new(1, 1).unwrap());
    let global = CombinationScheme::new(1, 2, 2).unwrap();
    let raised = CombinationScheme::new(1, 3, 2).unwrap();
    // [2, 2] lies on the top diagonal of the raised scheme only, which saves one coarsening unit
    assert_eq!(evaluator.coarsen_in(CellId(0), &[2, 2], 1, &raised, &global).levelvec, vec![0, 0]);
    assert_eq!(evaluator.coarsen(CellId(0), &[2, 2], 1, &global).levelvec, vec![1, 1]);
}
