use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::combination_scheme::{count_distinct_points, CombinationScheme};
use crate::errors::{Result, SGError};
use crate::function::Function;
use crate::grids::grid::{Area, Grid};
use crate::refinement::cell::CellId;
use crate::refinement::container::RefinementContainer;
use crate::standard_combi::check_domain;
use crate::utilities::norm::Norm;

use super::coarsening::CoarseningPolicy;
use super::error_estimation::{total_error, ErrorEstimator, SplitEstimateSelector};
use super::integration::Evaluator;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtendSplitStrategy
{
    /// Split or extend, whichever benefit is larger.
    #[default]
    Automatic,
    /// Split a cell `splits_before_extend` times, then extend it once, and repeat.
    Fixed { splits_before_extend: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendSplitOptions
{
    /// Coarsening version, 0, 1 or 2.
    pub version: u8,
    pub strategy: ExtendSplitStrategy,
    pub norm: Norm,
    /// How many levels the scheme of the interpolated split estimate may be raised.
    pub max_split_estimate_increase: u32,
    pub max_refinements: Option<usize>,
    /// If given, the error is the relative deviation of the integral from this value.
    pub reference_solution: Option<Vec<f64>>,
}

impl Default for ExtendSplitOptions
{
    fn default() -> Self
    {
        Self
        {
            version: 0,
            strategy: ExtendSplitStrategy::Automatic,
            norm: Norm::L2,
            max_split_estimate_increase: 3,
            max_refinements: None,
            reference_solution: None,
        }
    }
}

impl ExtendSplitOptions
{
    pub fn new(version: u8) -> Self
    {
        Self { version, ..Default::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Refinement
{
    Split,
    Extend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveResult
{
    pub scheme: CombinationScheme,
    pub error_estimate: f64,
    pub integral: Vec<f64>,
    pub converged: bool,
    /// Points of all leaves, counted once per distinct point for nested grids.
    pub num_points: f64,
    pub function_evaluations: usize,
    pub refinements: usize,
}

///
/// State of one leaf, for visualisation and debugging.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSummary
{
    pub id: CellId,
    pub start: Vec<f64>,
    pub end: Vec<f64>,
    pub integral: Vec<f64>,
    pub error: f64,
    pub coarsening: u32,
    pub generation: u32,
    pub evaluations: f64,
    pub benefit_extend: Option<f64>,
    pub benefit_split: Option<f64>,
    pub switch_to_parent_estimation: bool,
}

///
/// Spatially adaptive combination technique. The domain is split into a tree of cells, every
/// leaf is integrated with the coarsened component grids of a global scheme, and in each
/// iteration the most promising leaf is either split into `2^d` children or extended.
///
/// ```
/// use sgcombi::{ExtendSplitOptions, SpatiallyAdaptiveExtendSplit, TrapezoidalGrid};
/// use sgcombi::function::FunctionLinear;
///
/// let (a, b) = ([0.0, 0.0], [1.0, 1.0]);
/// let f = FunctionLinear::new(vec![1.0, 2.0]);
/// let mut adaptive = SpatiallyAdaptiveExtendSplit::new(&a, &b, TrapezoidalGrid::new(&a, &b, true), ExtendSplitOptions::default()).unwrap();
/// let result = adaptive.perform_spatially_adaptive(1, 2, &f, 1e-10, Some(10_000)).unwrap();
/// assert!(result.converged);
/// assert!((result.integral[0] - 1.5).abs() < 1e-12);
/// ```
///
#[derive(Debug)]
pub struct SpatiallyAdaptiveExtendSplit<G: Grid>
{
    domain: Area,
    options: ExtendSplitOptions,
    evaluator: Evaluator<G>,
    estimator: ErrorEstimator,
    scheme: CombinationScheme,
    container: RefinementContainer,
}

impl<G: Grid> SpatiallyAdaptiveExtendSplit<G>
{
    pub fn new(a: &[f64], b: &[f64], grid: G, options: ExtendSplitOptions) -> Result<Self>
    {
        check_domain(a, b, grid.ndim())?;
        let policy = CoarseningPolicy::new(options.version, 0)?;
        let domain = Area::new(a, b);
        let estimator = ErrorEstimator::new(options.norm, options.max_split_estimate_increase);
        Ok(Self
        {
            scheme: CombinationScheme::new(0, 0, a.len())?,
            container: RefinementContainer::new(domain.clone(), 1),
            domain,
            options,
            evaluator: Evaluator::new(grid, policy),
            estimator,
        })
    }

    ///
    /// Replace the rule reconciling the filtered and the interpolated split estimate.
    ///
    pub fn set_split_estimate_selector(&mut self, selector: Box<dyn SplitEstimateSelector>)
    {
        self.estimator.set_selector(selector);
    }

    pub fn options(&self) -> &ExtendSplitOptions
    {
        &self.options
    }

    pub fn scheme(&self) -> &CombinationScheme
    {
        &self.scheme
    }

    pub fn container(&self) -> &RefinementContainer
    {
        &self.container
    }

    pub fn integral(&self) -> &[f64]
    {
        self.container.integral()
    }

    pub fn grid(&self) -> &G
    {
        self.evaluator.grid()
    }

    ///
    /// Number of distinct points `f` has been evaluated at during the current run.
    ///
    pub fn function_evaluations(&self) -> usize
    {
        self.evaluator.function_cache().unique_evaluations()
    }

    ///
    /// Integrate `f` adaptively, starting from the scheme `(lmin, lmax)`, until the error
    /// estimate drops to `tolerance` or a budget is exhausted. Running out of budget is not an
    /// error; the result then reports `converged == false`.
    ///
    pub fn perform_spatially_adaptive(&mut self, lmin: u32, lmax: u32, f: &dyn Function, tolerance: f64, max_evaluations: Option<usize>) -> Result<AdaptiveResult>
    {
        if !tolerance.is_finite() || tolerance < 0.0
        {
            return Err(SGError::InvalidTolerance(tolerance));
        }
        if let Some(reference) = self.options.reference_solution.as_ref()
        {
            if reference.len() != f.num_outputs()
            {
                return Err(SGError::DimensionMismatch { expected: f.num_outputs(), actual: reference.len() });
            }
        }
        self.initialize(lmin, lmax, f)?;
        let mut refinements = 0;
        let (error, converged) = loop
        {
            self.evaluate_leaves(f);
            self.estimate_leaves(f)?;
            let error = total_error(&self.container, self.options.reference_solution.as_deref(), self.options.norm);
            let evaluations = self.function_evaluations();
            info!("iteration {}: error {:e}, {} function evaluations, {} leaves, lmax {}", refinements, error, evaluations, self.container.num_leaves(), self.scheme.lmax());
            if error <= tolerance
            {
                break (error, true);
            }
            if max_evaluations.is_some_and(|max| evaluations >= max) || self.options.max_refinements.is_some_and(|max| refinements >= max)
            {
                warn!("stopping without convergence after {} refinements: error {:e} > {:e}", refinements, error, tolerance);
                break (error, false);
            }
            let Some((id, refinement)) = self.select() else
            {
                warn!("no refinable cell left, error {:e}", error);
                break (error, false);
            };
            self.refine(id, refinement)?;
            refinements += 1;
        };
        Ok(AdaptiveResult
        {
            scheme: self.scheme.clone(),
            error_estimate: error,
            integral: self.container.integral().to_owned(),
            converged,
            num_points: self.container.leaves().map(|id| self.container.cell(id).evaluations).sum(),
            function_evaluations: self.function_evaluations(),
            refinements,
        })
    }

    ///
    /// Reset the run: new scheme, root cell integrated on the coarsest grid and split into its
    /// `2^d` children, which are the initial leaves.
    ///
    pub fn initialize(&mut self, lmin: u32, lmax: u32, f: &dyn Function) -> Result<()>
    {
        if lmax < lmin
        {
            return Err(SGError::InvalidLevels { lmin, lmax });
        }
        self.scheme = CombinationScheme::new(lmin, lmax, self.domain.ndim())?;
        self.evaluator.reset(CoarseningPolicy::new(self.options.version, lmin)?);
        self.container = RefinementContainer::new(self.domain.clone(), f.num_outputs());
        let root = self.container.root();
        let root_integral = self.evaluator.integrate(f, &vec![0; self.domain.ndim()], &self.domain);
        let splits_before_extend = match self.options.strategy
        {
            ExtendSplitStrategy::Fixed { splits_before_extend } => splits_before_extend,
            ExtendSplitStrategy::Automatic => 0,
        };
        self.container.split(root, splits_before_extend)?;
        self.container.set_integral(root, root_integral);
        debug!("initial scheme lmin {} lmax {} with {} component grids", lmin, lmax, self.scheme.len());
        Ok(())
    }

    ///
    /// Evaluate every leaf that has not yet been evaluated against the current scheme.
    ///
    pub fn evaluate_leaves(&mut self, f: &dyn Function)
    {
        for id in self.container.leaf_ids()
        {
            if !self.container.cell(id).considered()
            {
                self.evaluator.evaluate_cell(f, &mut self.container, id, &self.scheme);
            }
        }
    }

    ///
    /// Compute the missing benefits and errors of all leaves.
    ///
    pub fn estimate_leaves(&mut self, f: &dyn Function) -> Result<()>
    {
        for id in self.container.leaf_ids()
        {
            self.estimator.estimate(&mut self.evaluator, &mut self.container, &self.scheme, f, id)?;
        }
        Ok(())
    }

    fn priority(&self, id: CellId) -> (f64, Refinement)
    {
        let cell = self.container.cell(id);
        let (priority, refinement) = match self.options.strategy
        {
            ExtendSplitStrategy::Automatic =>
            {
                let split = cell.parent_info.benefit_split.value().unwrap_or(0.0);
                let extend = cell.parent_info.benefit_extend.value().unwrap_or(0.0);
                if split >= extend { (split, Refinement::Split) } else { (extend, Refinement::Extend) }
            }
            ExtendSplitStrategy::Fixed { .. } =>
            {
                (cell.error, if cell.splits_before_extend > 0 { Refinement::Split } else { Refinement::Extend })
            }
        };
        (if priority.is_nan() { f64::NEG_INFINITY } else { priority }, refinement)
    }

    ///
    /// Leaf with the largest priority and the refinement to apply. The leaf inserted first wins
    /// ties.
    ///
    pub fn select(&self) -> Option<(CellId, Refinement)>
    {
        let mut best: Option<(f64, CellId, Refinement)> = None;
        for id in self.container.leaves()
        {
            let (priority, refinement) = self.priority(id);
            if best.map_or(true, |(p, _, _)| priority > p)
            {
                best = Some((priority, id, refinement));
            }
        }
        best.map(|(_, id, refinement)| (id, refinement))
    }

    pub fn refine(&mut self, id: CellId, refinement: Refinement) -> Result<()>
    {
        debug!("{:?} cell {} ({:?} - {:?})", refinement, id.index(), self.container.cell(id).area.start, self.container.cell(id).area.end);
        match refinement
        {
            Refinement::Split => self.split_cell(id).map(|_| ()),
            Refinement::Extend => self.extend_cell(id),
        }
    }

    ///
    /// Split a leaf into `2^d` children.
    ///
    pub fn split_cell(&mut self, id: CellId) -> Result<Vec<CellId>>
    {
        let counter = match self.options.strategy
        {
            ExtendSplitStrategy::Fixed { .. } => self.container.get(id)?.splits_before_extend.saturating_sub(1),
            ExtendSplitStrategy::Automatic => 0,
        };
        let children = self.container.split(id, counter)?;
        self.invalidate_neighbourhood(id);
        Ok(children)
    }

    ///
    /// Extend a leaf: lower its coarsening, or, if it is not coarsened at all, raise `lmax` of
    /// the global scheme and coarsen every other cell by one more level instead.
    ///
    pub fn extend_cell(&mut self, id: CellId) -> Result<()>
    {
        let cell = self.container.get(id)?;
        if !cell.is_leaf()
        {
            return Err(SGError::InvalidIndex(id.index()));
        }
        let coarsening = cell.coarsening;
        if let ExtendSplitStrategy::Fixed { splits_before_extend } = self.options.strategy
        {
            self.container.cell_mut(id).splits_before_extend = splits_before_extend;
        }
        if coarsening > 0
        {
            self.container.reset_cell(id);
            let cell = self.container.cell_mut(id);
            cell.coarsening -= 1;
            cell.invalidate();
            self.invalidate_neighbourhood(id);
            return Ok(());
        }
        let scheme = CombinationScheme::new(self.scheme.lmin(), self.scheme.lmax() + 1, self.scheme.dim())?;
        debug!("raising lmax to {}: {} component grids", scheme.lmax(), scheme.len());
        self.scheme = scheme;
        for i in 0..self.container.len()
        {
            let other = CellId(i as u32);
            let cell = self.container.cell_mut(other);
            if other != id
            {
                cell.coarsening += 1;
            }
            cell.invalidate();
        }
        self.container.reset_all();
        Ok(())
    }

    ///
    /// Drop the estimates of every leaf whose estimate depends on `id`: the siblings of `id`
    /// and of each of its ancestors, together with the group estimates of their parents.
    ///
    fn invalidate_neighbourhood(&mut self, id: CellId)
    {
        let mut current = Some(id);
        while let Some(node) = current
        {
            for sibling in self.container.siblings(node).to_vec()
            {
                self.container.cell_mut(sibling).parent_info.invalidate();
            }
            current = self.container.cell(node).parent;
            if let Some(parent) = current
            {
                self.container.cell_mut(parent).sibling_group.reset();
            }
        }
    }

    pub fn leaf_summaries(&self) -> Vec<CellSummary>
    {
        self.container.leaves().map(|id|
        {
            let cell = self.container.cell(id);
            CellSummary
            {
                id,
                start: cell.area.start.clone(),
                end: cell.area.end.clone(),
                integral: cell.integral.clone(),
                error: cell.error,
                coarsening: cell.coarsening,
                generation: cell.generation,
                evaluations: cell.evaluations,
                benefit_extend: cell.parent_info.benefit_extend.value(),
                benefit_split: cell.parent_info.benefit_split.value(),
                switch_to_parent_estimation: cell.switch_to_parent_estimation(),
            }
        }).collect()
    }

    ///
    /// Points of the component grid `levelvec` over all leaves, without grids dropped by the
    /// coarsening.
    ///
    pub fn points_component_grid(&mut self, levelvec: &[u32]) -> Vec<f64>
    {
        self.evaluator.points_component_grid(&self.container, levelvec, &self.scheme, true)
    }

    ///
    /// Number of points of all component grids over all leaves. With `distinct` points shared
    /// between grids or cells are counted once.
    ///
    pub fn total_num_points(&mut self, distinct: bool) -> Result<f64>
    {
        let mut points = Vec::new();
        let levelvecs: Vec<Vec<u32>> = self.scheme.iter().map(|g| g.levelvector.clone()).collect();
        for levelvec in levelvecs
        {
            points.extend(self.points_component_grid(&levelvec));
        }
        let ndim = self.domain.ndim();
        if distinct
        {
            Ok(count_distinct_points(&points, ndim)? as f64)
        }
        else
        {
            Ok((points.len() / ndim) as f64)
        }
    }
}

#[cfg(test)]
fn linear_setup(d: usize) -> (SpatiallyAdaptiveExtendSplit<crate::grids::trapezoidal::TrapezoidalGrid>, crate::function::FunctionLinear, Vec<f64>)
{
    use crate::function::FunctionLinear;
    use crate::grids::trapezoidal::TrapezoidalGrid;
    let a = vec![-3.0; d];
    let b = vec![7.3; d];
    let f = FunctionLinear::new((0..d).map(|i| 10f64.powi(i as i32)).collect());
    let exact = f.analytic_integral(&a, &b).unwrap();
    let options = ExtendSplitOptions { reference_solution: Some(exact.clone()), ..Default::default() };
    let adaptive = SpatiallyAdaptiveExtendSplit::new(&a, &b, TrapezoidalGrid::new(&a, &b, true), options).unwrap();
    (adaptive, f, exact)
}

#[cfg(test)]
fn unit_square(options: ExtendSplitOptions) -> SpatiallyAdaptiveExtendSplit<crate::grids::trapezoidal::TrapezoidalGrid>
{
    use crate::grids::trapezoidal::TrapezoidalGrid;
    let (a, b) = ([0.0, 0.0], [1.0, 1.0]);
    SpatiallyAdaptiveExtendSplit::new(&a, &b, TrapezoidalGrid::new(&a, &b, true), options).unwrap()
}

#[cfg(test)]
fn peak() -> crate::function::GenzProductPeak
{
    crate::function::GenzProductPeak::new(vec![3.0, 3.0], vec![0.3, 0.6])
}

#[test]
fn check_linear_function_is_exact()
{
    for d in 2..6
    {
        for lmax in 2..4
        {
            let (mut adaptive, f, exact) = linear_setup(d);
            let result = adaptive.perform_spatially_adaptive(1, lmax, &f, 1e-10, Some(100_000)).unwrap();
            let relative = ((result.integral[0] - exact[0]) / exact[0]).abs();
            assert!(relative < 1e-10, "d {d} lmax {lmax}: {relative}");
            assert!(result.converged);
            assert_eq!(result.refinements, 0);
            assert_eq!(adaptive.container().num_leaves(), 1 << d);
        }
    }
}

#[test]
fn check_integral_is_conserved_over_refinements()
{
    let f = peak();
    let options = ExtendSplitOptions { max_refinements: Some(12), ..Default::default() };
    let mut adaptive = unit_square(options);
    let result = adaptive.perform_spatially_adaptive(1, 2, &f, 0.0, None).unwrap();
    assert!(!result.converged);
    assert_eq!(result.refinements, 12);
    let container = adaptive.container();
    container.check_structure().unwrap();
    let sum = container.leaf_integral_sum();
    assert!((sum[0] - container.integral()[0]).abs() <= 1e-10 * container.integral()[0].abs());
    assert!(result.function_evaluations > 0);
    assert!(result.num_points > 0.0);
    let exact = f.analytic_integral(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
    assert!(((result.integral[0] - exact[0]) / exact[0]).abs() < 5e-2);
}

#[test]
fn check_peak_converges_with_reference()
{
    let f = peak();
    let exact = f.analytic_integral(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
    for version in 0..3
    {
        let options = ExtendSplitOptions { version, reference_solution: Some(exact.clone()), max_refinements: Some(500), ..Default::default() };
        let mut adaptive = unit_square(options);
        let result = adaptive.perform_spatially_adaptive(1, 2, &f, 1e-3, Some(200_000)).unwrap();
        assert!(result.converged, "version {version}: error {}", result.error_estimate);
        assert!(((result.integral[0] - exact[0]) / exact[0]).abs() <= 1e-3);
        assert!(result.function_evaluations <= 200_000);
    }
}

#[test]
fn check_evaluation_budget_stops_refinement()
{
    let f = peak();
    let mut adaptive = unit_square(ExtendSplitOptions::default());
    let result = adaptive.perform_spatially_adaptive(1, 2, &f, 0.0, Some(200)).unwrap();
    assert!(!result.converged);
    assert!(result.function_evaluations >= 200);
}

#[test]
fn check_fixed_strategy_splits_then_extends()
{
    let f = peak();
    let mut adaptive = unit_square(ExtendSplitOptions { strategy: ExtendSplitStrategy::Fixed { splits_before_extend: 1 }, ..Default::default() });
    adaptive.initialize(1, 2, &f).unwrap();
    adaptive.evaluate_leaves(&f);
    adaptive.estimate_leaves(&f).unwrap();
    let (id, refinement) = adaptive.select().unwrap();
    assert_eq!(refinement, Refinement::Split);
    let children = adaptive.split_cell(id).unwrap();
    adaptive.evaluate_leaves(&f);
    adaptive.estimate_leaves(&f).unwrap();
    // the children have used up their splits
    for &child in &children
    {
        assert_eq!(adaptive.container().cell(child).splits_before_extend, 0);
        assert_eq!(adaptive.priority(child).1, Refinement::Extend);
    }
    adaptive.extend_cell(children[0]).unwrap();
    assert_eq!(adaptive.container().cell(children[0]).splits_before_extend, 1);
}

#[test]
fn check_extend_raises_lmax_and_coarsens_others()
{
    let f = peak();
    let mut adaptive = unit_square(ExtendSplitOptions::default());
    adaptive.initialize(1, 2, &f).unwrap();
    adaptive.evaluate_leaves(&f);
    let leaves = adaptive.container().leaf_ids();
    adaptive.extend_cell(leaves[1]).unwrap();
    assert_eq!(adaptive.scheme().lmax(), 3);
    assert_eq!(adaptive.container().cell(leaves[1]).coarsening, 0);
    assert_eq!(adaptive.container().cell(leaves[0]).coarsening, 1);
    assert!(leaves.iter().all(|&l| !adaptive.container().cell(l).considered()));
    adaptive.evaluate_leaves(&f);
    let integral = adaptive.integral()[0];
    let sum = adaptive.container().leaf_integral_sum()[0];
    assert!((integral - sum).abs() < 1e-12);
    // a coarsened cell is extended without touching the scheme or the other leaves
    adaptive.extend_cell(leaves[0]).unwrap();
    assert_eq!(adaptive.scheme().lmax(), 3);
    assert_eq!(adaptive.container().cell(leaves[0]).coarsening, 0);
    assert!(!adaptive.container().cell(leaves[0]).considered());
    assert!(adaptive.container().cell(leaves[2]).considered());
    assert!(adaptive.container().cell(leaves[2]).parent_info.benefit_split.value().is_none());
}

#[test]
fn check_ties_pick_the_first_leaf()
{
    let f = peak();
    let mut adaptive = unit_square(ExtendSplitOptions::default());
    adaptive.initialize(1, 2, &f).unwrap();
    let leaves = adaptive.container().leaf_ids();
    for &leaf in &leaves
    {
        let info = &mut adaptive.container.cell_mut(leaf).parent_info;
        info.benefit_split.set(1.0);
        info.benefit_extend.set(0.5);
    }
    assert_eq!(adaptive.select(), Some((leaves[0], Refinement::Split)));
    adaptive.container.cell_mut(leaves[2]).parent_info.benefit_extend.set(1.0 + 1e-12);
    assert_eq!(adaptive.select(), Some((leaves[2], Refinement::Extend)));
    adaptive.container.cell_mut(leaves[0]).parent_info.benefit_split.set(f64::NAN);
    adaptive.container.cell_mut(leaves[2]).parent_info.benefit_extend.set(f64::NAN);
    assert_eq!(adaptive.select(), Some((leaves[1], Refinement::Split)));
}

#[test]
fn check_high_order_grid()
{
    use crate::grids::gauss_legendre::GaussLegendreGrid;
    let f = peak();
    let (a, b) = ([0.0, 0.0], [1.0, 1.0]);
    let exact = f.analytic_integral(&a, &b).unwrap();
    let options = ExtendSplitOptions { max_refinements: Some(50), ..Default::default() };
    let mut adaptive = SpatiallyAdaptiveExtendSplit::new(&a, &b, GaussLegendreGrid::new(&a, &b), options).unwrap();
    let result = adaptive.perform_spatially_adaptive(1, 2, &f, 1e-6, Some(100_000)).unwrap();
    assert!(adaptive.leaf_summaries().iter().all(|s| s.switch_to_parent_estimation));
    assert!(((result.integral[0] - exact[0]) / exact[0]).abs() < 1e-3);
}

#[test]
fn check_point_diagnostics()
{
    let (mut adaptive, f, _) = linear_setup(2);
    adaptive.perform_spatially_adaptive(1, 2, &f, 1e-10, None).unwrap();
    // levels are relative to lmin, so [1, 2] places 2x3 points on each of the four leaves
    assert_eq!(adaptive.points_component_grid(&[1, 2]).len() / 2, 4 * 6);
    // 2x3 + 3x2 + 2x2 points per leaf
    assert_eq!(adaptive.total_num_points(false).unwrap(), 4.0 * 16.0);
    // the leaves together form the 3x5 and 5x3 grids of the whole domain
    assert_eq!(adaptive.total_num_points(true).unwrap(), 15.0 + 15.0 - 9.0);
    let summaries = adaptive.leaf_summaries();
    assert_eq!(summaries.len(), 4);
    assert!(summaries.iter().all(|s| s.benefit_split.is_some() && s.coarsening == 0));
}

#[test]
fn check_invalid_configuration()
{
    use crate::grids::trapezoidal::TrapezoidalGrid;
    let (a, b) = ([0.0, 0.0], [1.0, 1.0]);
    let grid = TrapezoidalGrid::new(&a, &b, true);
    assert!(matches!(SpatiallyAdaptiveExtendSplit::new(&a, &b, grid.clone(), ExtendSplitOptions::new(3)), Err(SGError::InvalidVersion(3))));
    assert!(matches!(SpatiallyAdaptiveExtendSplit::new(&a, &[1.0], grid, ExtendSplitOptions::default()), Err(SGError::DimensionMismatch { .. })));
    let (mut adaptive, f, _) = linear_setup(2);
    assert!(matches!(adaptive.perform_spatially_adaptive(1, 2, &f, -1.0, None), Err(SGError::InvalidTolerance(_))));
    assert!(matches!(adaptive.perform_spatially_adaptive(1, 2, &f, f64::NAN, None), Err(SGError::InvalidTolerance(_))));
    assert!(matches!(adaptive.perform_spatially_adaptive(3, 2, &f, 1e-3, None), Err(SGError::InvalidLevels { lmin: 3, lmax: 2 })));
    let mut adaptive = unit_square(ExtendSplitOptions { reference_solution: Some(vec![1.0, 2.0]), ..Default::default() });
    assert!(matches!(adaptive.perform_spatially_adaptive(1, 2, &peak(), 1e-3, None), Err(SGError::DimensionMismatch { expected: 1, actual: 2 })));
}
