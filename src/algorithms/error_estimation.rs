use log::debug;

use crate::combination_scheme::CombinationScheme;
use crate::errors::{Result, SGError};
use crate::function::Function;
use crate::grids::grid::{Area, Grid};
use crate::refinement::cell::{CellId, Estimate, ParentPass, SiblingGroup};
use crate::refinement::container::RefinementContainer;
use crate::utilities::norm::Norm;

use super::integration::{Evaluator, PassResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitEstimate
{
    Filtered,
    Interpolated,
}

///
/// Decides which of the two estimates of a split parent is used for the benefit of splitting.
/// There is no proof that any choice is optimal; the default keeps whichever is closer to the
/// integral already observed on the cell.
///
pub trait SplitEstimateSelector : Send + Sync
{
    fn select(&self, integral: &[f64], filtered: &[f64], interpolated: &[f64], norm: Norm) -> SplitEstimate;
}

#[derive(Default, Debug, Clone, Copy)]
pub struct ClosestToIntegral;

impl SplitEstimateSelector for ClosestToIntegral
{
    fn select(&self, integral: &[f64], filtered: &[f64], interpolated: &[f64], norm: Norm) -> SplitEstimate
    {
        if norm.distance(integral, filtered) < norm.distance(integral, interpolated)
        {
            SplitEstimate::Filtered
        }
        else
        {
            SplitEstimate::Interpolated
        }
    }
}

///
/// Always uses the filtered estimate.
///
#[derive(Default, Debug, Clone, Copy)]
pub struct FilteredOnly;

impl SplitEstimateSelector for FilteredOnly
{
    fn select(&self, _integral: &[f64], _filtered: &[f64], _interpolated: &[f64], _norm: Norm) -> SplitEstimate
    {
        SplitEstimate::Filtered
    }
}

///
/// Points a refinement costs on top of the points already spent in the region. Low order grids
/// only pay for the additional points; if there are none the full count is used.
///
#[inline]
pub fn refinement_cost(num_points: f64, num_reference: f64, high_order: bool) -> f64
{
    if high_order || num_points - num_reference <= 0.0
    {
        num_points
    }
    else
    {
        num_points - num_reference
    }
}

///
/// `|(estimate - comparison) / (|comparison| + 1e-100)| * cost`
///
#[inline]
pub fn benefit(norm: Norm, estimate: &[f64], comparison: &[f64], cost: f64) -> f64
{
    norm.relative_distance(estimate, comparison) * cost
}

///
/// Computes the what-if integrals of a leaf relative to its parent and derives the benefits of
/// extending and splitting it. Results are stored on the cell and reused until the cell is
/// invalidated.
///
pub struct ErrorEstimator
{
    pub norm: Norm,
    pub max_split_estimate_increase: u32,
    selector: Box<dyn SplitEstimateSelector>,
}

impl std::fmt::Debug for ErrorEstimator
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("ErrorEstimator").field("norm", &self.norm).field("max_split_estimate_increase", &self.max_split_estimate_increase).finish()
    }
}

impl ErrorEstimator
{
    pub fn new(norm: Norm, max_split_estimate_increase: u32) -> Self
    {
        Self { norm, max_split_estimate_increase, selector: Box::new(ClosestToIntegral) }
    }

    pub fn set_selector(&mut self, selector: Box<dyn SplitEstimateSelector>)
    {
        self.selector = selector;
    }

    ///
    /// Estimate the error and the benefits of the leaf `id`. Does nothing if they are already
    /// known for the current generation. All leaves must have been evaluated against `scheme`.
    ///
    pub fn estimate<G: Grid>(&self, evaluator: &mut Evaluator<G>, container: &mut RefinementContainer, scheme: &CombinationScheme, f: &dyn Function, id: CellId) -> Result<()>
    {
        let cell = container.get(id)?;
        if cell.parent_info.is_complete()
        {
            return Ok(());
        }
        let parent = cell.parent.ok_or(SGError::InvalidIndex(id.index()))?;
        let siblings = container.siblings(id).to_vec();
        let expected = 1usize << container.ndim();
        if siblings.len() != expected
        {
            return Err(SGError::InvalidSiblingCount { cell: parent.index(), expected, actual: siblings.len() });
        }
        let area = cell.area.clone();
        let coarsening = cell.coarsening;
        let evaluations = cell.evaluations;
        let integral = cell.integral.clone();
        let parent_area = container.cell(parent).area.clone();
        let high_order = evaluator.grid().is_high_order_grid();
        let mut switch = cell.switch_to_parent_estimation() || high_order;

        let mut filtered = None;
        if !switch
        {
            let estimate = evaluator.filtered_integral(f, parent, &parent_area, &area, coarsening, scheme, scheme);
            if estimate.num_points <= 0.0 || estimate.num_points >= evaluations
            {
                debug!("cell {} switches to parent estimation ({} parent points, {} own points)", id.index(), estimate.num_points, evaluations);
                switch = true;
            }
            else
            {
                filtered = Some(estimate);
            }
        }

        let group = if switch { Some(self.sibling_group(evaluator, container, scheme, f, parent, &siblings, coarsening)) } else { None };
        let extend = match group.as_ref()
        {
            Some((group, _)) => PassResult { integral: group.extend_integral.clone(), num_points: group.extend_num_points },
            None => evaluator.scheme_integral(f, id, &area, coarsening + 1, scheme),
        };

        let (split, num_points_split, num_points_reference, comparison, interpolated) = match filtered
        {
            Some(filtered) =>
            {
                let interpolated = self.interpolated_estimate(evaluator, scheme, f, parent, &parent_area, &area, coarsening, extend.num_points)?;
                let reference = evaluator.points_inside(parent, &parent_area, &area, coarsening + 1, scheme);
                let chosen = match self.selector.select(&integral, &filtered.integral, &interpolated.integral, self.norm)
                {
                    SplitEstimate::Filtered => filtered,
                    SplitEstimate::Interpolated => interpolated.clone(),
                };
                (chosen.integral, chosen.num_points, reference, integral.clone(), Some(interpolated.integral))
            }
            None =>
            {
                let (group, parent_pass) = group.ok_or(SGError::InvalidIndex(id.index()))?;
                let info = &mut container.cell_mut(id).parent_info;
                info.sum_siblings.set(group.sum_siblings.clone());
                info.sibling_evaluations.set(group.sibling_evaluations);
                (parent_pass.integral, parent_pass.num_points, parent_pass.num_points_reference, group.sum_siblings, None)
            }
        };

        let mut error = self.norm.distance(&comparison, &split);
        if switch
        {
            error /= expected as f64;
        }
        let benefit_extend = benefit(self.norm, &extend.integral, &comparison, refinement_cost(extend.num_points, num_points_reference, high_order));
        let benefit_split = benefit(self.norm, &split, &comparison, refinement_cost(num_points_split, num_points_reference, high_order));

        let cell = container.cell_mut(id);
        cell.flags.set_switch_to_parent_estimation(switch);
        cell.error = error;
        let info = &mut cell.parent_info;
        info.extend_parent_integral.set(extend.integral);
        info.num_points_extend_parent.set(extend.num_points);
        info.split_parent_integral.set(split);
        if let Some(interpolated) = interpolated
        {
            info.split_parent_integral2.set(interpolated);
        }
        info.num_points_split_parent.set(num_points_split);
        info.num_points_reference.set(num_points_reference);
        info.benefit_extend.set(benefit_extend);
        info.benefit_split.set(benefit_split);
        Ok(())
    }

    ///
    /// Estimates shared by all children of `parent`, computed once per group and kept on the
    /// parent. The pass over the parent itself depends on the child coarsening.
    ///
    #[allow(clippy::too_many_arguments)]
    fn sibling_group<G: Grid>(&self, evaluator: &mut Evaluator<G>, container: &mut RefinementContainer, scheme: &CombinationScheme, f: &dyn Function,
        parent: CellId, siblings: &[CellId], coarsening: u32) -> (SiblingGroup, ParentPass)
    {
        if !container.cell(parent).sibling_group.is_computed()
        {
            let mut group = SiblingGroup { extend_integral: vec![0.0; f.num_outputs()], sum_siblings: vec![0.0; f.num_outputs()], ..Default::default() };
            for &sibling in siblings
            {
                let sibling_cell = container.cell(sibling);
                let pass = evaluator.scheme_integral(f, sibling, &sibling_cell.area, sibling_cell.coarsening + 1, scheme);
                group.extend_integral.iter_mut().zip(&pass.integral).for_each(|(a, b)| *a += b);
                group.extend_num_points += pass.num_points;
                let (subtree, subtree_evaluations) = container.subtree_integral(sibling);
                group.sum_siblings.iter_mut().zip(&subtree).for_each(|(a, b)| *a += b);
                group.sibling_evaluations += subtree_evaluations;
            }
            container.cell_mut(parent).sibling_group.set(group);
        }
        let known = container.cell(parent).sibling_group.get().and_then(|group| group.parent_pass(coarsening).cloned());
        let parent_pass = match known
        {
            Some(pass) => pass,
            None =>
            {
                let parent_area = container.cell(parent).area.clone();
                let pass = evaluator.scheme_integral(f, parent, &parent_area, coarsening, scheme);
                let num_points_reference = evaluator.points_inside(parent, &parent_area, &parent_area, coarsening + 1, scheme);
                let pass = ParentPass { coarsening, integral: pass.integral, num_points: pass.num_points, num_points_reference };
                if let Estimate::Value(group) = &mut container.cell_mut(parent).sibling_group
                {
                    group.parent_passes.push(pass.clone());
                }
                pass
            }
        };
        let group = container.cell(parent).sibling_group.get().cloned().unwrap_or_default();
        (group, parent_pass)
    }

    ///
    /// Interpolate the parent onto the cell, raising the maximum level of the parent scheme
    /// until the parent puts enough points into the cell or the increase limit is reached.
    ///
    #[allow(clippy::too_many_arguments)]
    fn interpolated_estimate<G: Grid>(&self, evaluator: &mut Evaluator<G>, scheme: &CombinationScheme, f: &dyn Function, parent: CellId,
        parent_area: &Area, area: &Area, coarsening: u32, num_points_extend: f64) -> Result<PassResult>
    {
        let mut lmax = scheme.lmax();
        let mut estimate = evaluator.interpolated_integral(f, parent, parent_area, area, coarsening, scheme, scheme);
        while 3.0 * estimate.num_points <= num_points_extend && lmax < scheme.lmax() + self.max_split_estimate_increase
        {
            lmax += 1;
            let grids = CombinationScheme::new(scheme.lmin(), lmax, scheme.dim())?;
            estimate = evaluator.interpolated_integral(f, parent, parent_area, area, coarsening, &grids, scheme);
        }
        Ok(estimate)
    }
}

///
/// Global error: the relative deviation from `reference` if one is given, else the sum of the
/// leaf errors.
///
pub fn total_error(container: &RefinementContainer, reference: Option<&[f64]>, norm: Norm) -> f64
{
    match reference
    {
        Some(reference) if norm.eval(reference) == 0.0 => norm.eval(container.integral()),
        Some(reference) => norm.relative_distance(container.integral(), reference),
        None => container.leaves().map(|id| container.cell(id).error).sum(),
    }
}

#[test]
fn check_refinement_cost()
{
    assert_eq!(refinement_cost(10.0, 4.0, false), 6.0);
    assert_eq!(refinement_cost(4.0, 4.0, false), 4.0);
    assert_eq!(refinement_cost(10.0, 4.0, true), 10.0);
}

#[test]
fn check_closest_to_integral()
{
    let selector = ClosestToIntegral;
    assert_eq!(selector.select(&[1.0], &[1.1], &[0.8], Norm::L2), SplitEstimate::Filtered);
    assert_eq!(selector.select(&[1.0], &[1.3], &[0.8], Norm::L2), SplitEstimate::Interpolated);
    // equal distance keeps the interpolated estimate
    assert_eq!(selector.select(&[1.0], &[1.5], &[0.5], Norm::L2), SplitEstimate::Interpolated);
    assert_eq!(FilteredOnly.select(&[1.0], &[1.3], &[0.8], Norm::L2), SplitEstimate::Filtered);
    // benefit of a zero comparison stays finite
    assert!(benefit(Norm::L2, &[1e-3], &[0.0], 2.0).is_finite());
}

#[cfg(test)]
fn setup(f: &dyn Function) -> (Evaluator<crate::grids::trapezoidal::TrapezoidalGrid>, RefinementContainer, CombinationScheme)
{
    use crate::algorithms::coarsening::CoarseningPolicy;
    use crate::grids::trapezoidal::TrapezoidalGrid;
    let area = Area::new(&[0.0, 0.0], &[1.0, 1.0]);
    let mut evaluator = Evaluator::new(TrapezoidalGrid::new(&area.start, &area.end, true), CoarseningPolicy::new(0, 1).unwrap());
    let scheme = CombinationScheme::new(1, 3, 2).unwrap();
    let mut container = RefinementContainer::new(area, f.num_outputs());
    for child in container.split(container.root(), 0).unwrap()
    {
        evaluator.evaluate_cell(f, &mut container, child, &scheme);
    }
    (evaluator, container, scheme)
}

#[test]
fn check_benefits_are_memoized()
{
    use crate::function::FunctionWrapper;
    let f = FunctionWrapper::new(1, |x: &[f64], out: &mut [f64]| out[0] = (3.0 * x[0]).sin() * (x[1] * x[1]).exp());
    let (mut evaluator, mut container, scheme) = setup(&f);
    let estimator = ErrorEstimator::new(Norm::L2, 3);
    let id = container.leaf_ids()[2];
    estimator.estimate(&mut evaluator, &mut container, &scheme, &f, id).unwrap();
    let first = container.cell(id).parent_info.clone();
    let requests = evaluator.function_cache().requests();
    estimator.estimate(&mut evaluator, &mut container, &scheme, &f, id).unwrap();
    assert_eq!(evaluator.function_cache().requests(), requests);
    let second = &container.cell(id).parent_info;
    assert_eq!(first.benefit_split.value().map(f64::to_bits), second.benefit_split.value().map(f64::to_bits));
    assert_eq!(first.benefit_extend.value().map(f64::to_bits), second.benefit_extend.value().map(f64::to_bits));
    assert!(first.benefit_split.value().unwrap() >= 0.0);
    // invalidation forces a recomputation that reproduces the same values
    container.cell_mut(id).parent_info.invalidate();
    estimator.estimate(&mut evaluator, &mut container, &scheme, &f, id).unwrap();
    assert_eq!(first.benefit_split, container.cell(id).parent_info.benefit_split);
}

#[test]
fn check_linear_function_has_no_error()
{
    use crate::function::FunctionLinear;
    let f = FunctionLinear::new(vec![1.0, 10.0]);
    let (mut evaluator, mut container, scheme) = setup(&f);
    let estimator = ErrorEstimator::new(Norm::L2, 3);
    for id in container.leaf_ids()
    {
        estimator.estimate(&mut evaluator, &mut container, &scheme, &f, id).unwrap();
        assert!(container.cell(id).error < 1e-13);
    }
    assert!(total_error(&container, None, Norm::L2) < 1e-12);
    assert!(total_error(&container, Some(&[5.5]), Norm::L2) < 1e-14);
}

#[test]
fn check_high_order_grid_uses_parent_estimation()
{
    use crate::algorithms::coarsening::CoarseningPolicy;
    use crate::function::FunctionWrapper;
    use crate::grids::gauss_legendre::GaussLegendreGrid;
    let f = FunctionWrapper::new(1, |x: &[f64], out: &mut [f64]| out[0] = (x[0] * x[1]).exp());
    let area = Area::new(&[0.0, 0.0], &[1.0, 1.0]);
    let mut evaluator = Evaluator::new(GaussLegendreGrid::new(&area.start, &area.end), CoarseningPolicy::new(0, 1).unwrap());
    let scheme = CombinationScheme::new(1, 2, 2).unwrap();
    let mut container = RefinementContainer::new(area, 1);
    let children = container.split(container.root(), 0).unwrap();
    for &child in &children
    {
        evaluator.evaluate_cell(&f, &mut container, child, &scheme);
    }
    let estimator = ErrorEstimator::new(Norm::L2, 3);
    estimator.estimate(&mut evaluator, &mut container, &scheme, &f, children[0]).unwrap();
    let requests = evaluator.function_cache().requests();
    for &child in &children
    {
        estimator.estimate(&mut evaluator, &mut container, &scheme, &f, child).unwrap();
        assert!(container.cell(child).switch_to_parent_estimation());
    }
    // the siblings reuse the group estimate kept on the parent
    assert_eq!(evaluator.function_cache().requests(), requests);
    let group = container.cell(container.root()).sibling_group.get().unwrap();
    assert_eq!(group.parent_passes.len(), 1);
    assert_eq!(container.cell(children[3]).parent_info.extend_parent_integral.get(), Some(&group.extend_integral));
    let info = &container.cell(children[0]).parent_info;
    let sum_siblings = info.sum_siblings.get().unwrap()[0];
    assert!((sum_siblings - container.integral()[0]).abs() < 1e-14);
    assert!(!info.split_parent_integral2.is_computed());
    // every sibling carries the same share of the discrepancy
    let errors: Vec<f64> = children.iter().map(|&c| container.cell(c).error).collect();
    assert!(errors.iter().all(|&e| e == errors[0]));
}
