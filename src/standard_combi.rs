use log::info;
use serde::{Deserialize, Serialize};

use crate::combination_scheme::{CombinationScheme, ComponentGrid};
use crate::errors::{Result, SGError};
use crate::function::{Function, FunctionCache};
use crate::grids::grid::{Area, Grid};
use crate::utilities::interpolation::interpolate_multilinear;
use crate::utilities::multi_index_manipulation::cartesian_product;
use crate::utilities::norm::Norm;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombiResult
{
    pub scheme: CombinationScheme,
    pub integral: Vec<f64>,
    /// Norm of the deviation from the reference integral, if one was supplied.
    pub error: Option<f64>,
}

///
/// Non-adaptive combination technique on the whole domain. Each component grid is integrated
/// once at its level vector and the results are combined with the scheme coefficients.
///
#[derive(Debug, Clone)]
pub struct StandardCombi<G: Grid>
{
    domain: Area,
    grid: G,
    scheme: Option<CombinationScheme>,
    cache: FunctionCache,
    norm: Norm,
}

pub(crate) fn check_domain(a: &[f64], b: &[f64], ndim: usize) -> Result<()>
{
    if a.len() != b.len()
    {
        return Err(SGError::DimensionMismatch { expected: a.len(), actual: b.len() });
    }
    if ndim != a.len()
    {
        return Err(SGError::DimensionMismatch { expected: a.len(), actual: ndim });
    }
    for d in 0..a.len()
    {
        if !(a[d] < b[d])
        {
            return Err(SGError::InvalidBounds { dim: d, lower: a[d], upper: b[d] });
        }
    }
    Ok(())
}

impl<G: Grid> StandardCombi<G>
{
    pub fn new(a: &[f64], b: &[f64], grid: G) -> Result<Self>
    {
        check_domain(a, b, grid.ndim())?;
        Ok(Self { domain: Area::new(a, b), grid, scheme: None, cache: FunctionCache::new(), norm: Norm::L2 })
    }

    pub fn with_norm(mut self, norm: Norm) -> Self
    {
        self.norm = norm;
        self
    }

    pub fn scheme(&self) -> Option<&CombinationScheme>
    {
        self.scheme.as_ref()
    }

    pub fn function_cache(&self) -> &FunctionCache
    {
        &self.cache
    }

    pub fn perform_combi(&mut self, lmin: u32, lmax: u32, f: &dyn Function, reference: Option<&[f64]>) -> Result<CombiResult>
    {
        let scheme = CombinationScheme::new(lmin, lmax, self.domain.ndim())?;
        let mut integral = vec![0.0; f.num_outputs()];
        for component in scheme.iter()
        {
            let partial = self.grid.integrate(f, &mut self.cache, &component.levelvector, &self.domain.start, &self.domain.end);
            integral.iter_mut().zip(&partial).for_each(|(a, p)| *a += component.coefficient * p);
        }
        let error = reference.map(|reference| self.norm.distance(&integral, reference));
        info!("combination integral {:?} with {} component grids, error {:?}", integral, scheme.len(), error);
        self.scheme = Some(scheme.clone());
        Ok(CombiResult { scheme, integral, error })
    }

    ///
    /// Values of the multilinear interpolant of one component grid at `points` (flattened,
    /// `ndim` coordinates each). The mesh always includes the domain boundary; boundary points
    /// a grid without boundary does not carry are zero.
    ///
    pub fn interpolate_component(&mut self, f: &dyn Function, component: &ComponentGrid, points: &[f64]) -> Vec<f64>
    {
        let ndim = self.domain.ndim();
        let num_outputs = f.num_outputs();
        let boundaries = self.grid.boundaries();
        self.grid.set_boundaries(&vec![true; ndim]);
        self.grid.set_area(&self.domain.start, &self.domain.end, &component.levelvector);
        self.grid.set_boundaries(&boundaries);
        let mesh: Vec<Vec<f64>> = (0..ndim).map(|d| self.grid.coordinates(d).to_owned()).collect();
        let sizes: Vec<usize> = mesh.iter().map(|m| m.len()).collect();
        let mut values = Vec::with_capacity(sizes.iter().product::<usize>() * num_outputs);
        let mut point = vec![0.0; ndim];
        for index in cartesian_product(&sizes).chunks_exact(ndim)
        {
            for d in 0..ndim
            {
                point[d] = mesh[d][index[d]];
            }
            if self.grid.point_not_zero(&point)
            {
                values.extend_from_slice(self.cache.eval(f, &point));
            }
            else
            {
                values.extend(std::iter::repeat(0.0).take(num_outputs));
            }
        }
        interpolate_multilinear(&mesh, &values, num_outputs, points)
    }

    ///
    /// Surrogate of the last scheme at `points`: the combination of the interpolants of all
    /// component grids.
    ///
    pub fn interpolate_points(&mut self, f: &dyn Function, points: &[f64]) -> Result<Vec<f64>>
    {
        let scheme = self.scheme.clone().ok_or(SGError::EmptyScheme)?;
        if points.len() % self.domain.ndim() != 0
        {
            return Err(SGError::DimensionMismatch { expected: self.domain.ndim(), actual: points.len() % self.domain.ndim() });
        }
        let mut result = vec![0.0; points.len() / self.domain.ndim() * f.num_outputs()];
        for component in scheme.iter()
        {
            let values = self.interpolate_component(f, component, points);
            result.iter_mut().zip(&values).for_each(|(r, v)| *r += component.coefficient * v);
        }
        Ok(result)
    }

    ///
    /// Surrogate on the tensor mesh spanned by the 1d `coordinates`, last dimension running
    /// fastest.
    ///
    pub fn interpolate_grid(&mut self, f: &dyn Function, coordinates: &[Vec<f64>]) -> Result<Vec<f64>>
    {
        let ndim = self.domain.ndim();
        if coordinates.len() != ndim
        {
            return Err(SGError::DimensionMismatch { expected: ndim, actual: coordinates.len() });
        }
        let sizes: Vec<usize> = coordinates.iter().map(|c| c.len()).collect();
        let points: Vec<f64> = cartesian_product(&sizes).chunks_exact(ndim)
            .flat_map(|index| (0..ndim).map(move |d| coordinates[d][index[d]]))
            .collect();
        self.interpolate_points(f, &points)
    }

    ///
    /// Number of points of the last scheme. With `distinct` every point shared by several
    /// component grids is counted once.
    ///
    pub fn total_num_points(&mut self, distinct: bool) -> Result<f64>
    {
        let scheme = self.scheme.as_ref().ok_or(SGError::EmptyScheme)?;
        if distinct
        {
            Ok(scheme.distinct_points(&mut self.grid, &self.domain)? as f64)
        }
        else
        {
            Ok(scheme.total_num_points(&mut self.grid, &self.domain, false))
        }
    }
}

#[test]
fn check_standard_combi_integrates_linear_functions()
{
    use crate::function::FunctionLinear;
    use crate::grids::trapezoidal::TrapezoidalGrid;
    for d in 2..6
    {
        let a = vec![-3.0; d];
        let b = vec![7.3; d];
        let f = FunctionLinear::new((0..d).map(|i| 10f64.powi(i as i32)).collect());
        let exact = f.analytic_integral(&a, &b).unwrap();
        let mut combi = StandardCombi::new(&a, &b, TrapezoidalGrid::new(&a, &b, true)).unwrap();
        for lmax in 0..(8 - d as u32)
        {
            for lmin in 0..=lmax
            {
                let result = combi.perform_combi(lmin, lmax, &f, Some(&exact)).unwrap();
                let relative = result.error.unwrap() / exact[0].abs();
                assert!(relative < 1e-13, "d {d} lmin {lmin} lmax {lmax}: {relative}");
            }
        }
    }
}

#[test]
fn check_standard_combi_point_counts()
{
    use crate::function::FunctionLinear;
    use crate::grids::trapezoidal::TrapezoidalGrid;
    let a = [-3.0, -3.0];
    let b = [7.3, 7.3];
    let mut combi = StandardCombi::new(&a, &b, TrapezoidalGrid::new(&a, &b, true)).unwrap();
    assert_eq!(combi.total_num_points(true), Err(SGError::EmptyScheme));
    combi.perform_combi(0, 2, &FunctionLinear::new(vec![1.0, 10.0]), None).unwrap();
    assert_eq!(combi.total_num_points(false).unwrap(), 41.0);
    assert_eq!(combi.total_num_points(true).unwrap(), 17.0);
    // the cache saw every distinct point exactly once
    assert_eq!(combi.function_cache().unique_evaluations(), 17);
}

#[test]
fn check_invalid_domain()
{
    use crate::grids::trapezoidal::TrapezoidalGrid;
    let grid = TrapezoidalGrid::new(&[0.0, 0.0], &[1.0, 1.0], true);
    assert!(matches!(StandardCombi::new(&[0.0, 1.0], &[1.0, 1.0], grid.clone()), Err(SGError::InvalidBounds { dim: 1, .. })));
    assert!(matches!(StandardCombi::new(&[0.0], &[1.0], grid), Err(SGError::DimensionMismatch { .. })));
}

#[test]
fn check_interpolation_of_linear_functions()
{
    use crate::function::FunctionLinear;
    use crate::grids::trapezoidal::TrapezoidalGrid;
    let (a, b) = (-3.0, 7.0);
    for d in 2..5
    {
        let f = FunctionLinear::new((0..d).map(|i| 10.0 * i as f64).collect());
        let mut combi = StandardCombi::new(&vec![a; d], &vec![b; d], TrapezoidalGrid::new(&vec![a; d], &vec![b; d], true)).unwrap();
        let coordinates: Vec<Vec<f64>> = (0..d).map(|_| (0..10).map(|i| a + (b - a) * i as f64 / 9.0).collect()).collect();
        let sizes = vec![10; d];
        let points: Vec<f64> = cartesian_product(&sizes).chunks_exact(d).flat_map(|index| (0..d).map(|k| coordinates[k][index[k]]).collect::<Vec<f64>>()).collect();
        let exact: Vec<f64> = points.chunks_exact(d).map(|p| { let mut out = [0.0]; f.eval(p, &mut out); out[0] }).collect();
        let check = |values: &[f64]|
        {
            for (value, expected) in values.iter().zip(&exact)
            {
                let factor = if *expected != 0.0 { expected.abs() } else { 1.0 };
                assert!(((value - expected) / factor).abs() < 1e-13, "{value} != {expected}");
            }
        };
        for lmax in 0..(8 - d as u32)
        {
            for lmin in 0..=lmax
            {
                let scheme = combi.perform_combi(lmin, lmax, &f, None).unwrap().scheme;
                for component in scheme.iter()
                {
                    check(&combi.interpolate_component(&f, component, &points));
                }
                check(&combi.interpolate_points(&f, &points).unwrap());
                check(&combi.interpolate_grid(&f, &coordinates).unwrap());
            }
        }
    }
}

#[test]
fn check_interpolation_needs_a_scheme()
{
    use crate::function::FunctionLinear;
    use crate::grids::trapezoidal::TrapezoidalGrid;
    let mut combi = StandardCombi::new(&[0.0, 0.0], &[1.0, 1.0], TrapezoidalGrid::new(&[0.0, 0.0], &[1.0, 1.0], true)).unwrap();
    let f = FunctionLinear::new(vec![1.0, 1.0]);
    assert_eq!(combi.interpolate_points(&f, &[0.5, 0.5]), Err(SGError::EmptyScheme));
    combi.perform_combi(1, 2, &f, None).unwrap();
    assert!(matches!(combi.interpolate_points(&f, &[0.5, 0.5, 0.5]), Err(SGError::DimensionMismatch { .. })));
    assert!(matches!(combi.interpolate_grid(&f, &[vec![0.5]]), Err(SGError::DimensionMismatch { .. })));
    let value = combi.interpolate_points(&f, &[0.25, 0.5]).unwrap();
    assert!((value[0] - 0.75).abs() < 1e-15);
}
