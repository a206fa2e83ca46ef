use rustc_hash::FxHashMap;

///
/// A (possibly vector-valued) model evaluated at points of the integration domain.
///
pub trait Function
{
    ///
    /// Number of outputs produced per point.
    ///
    fn num_outputs(&self) -> usize
    {
        1
    }

    ///
    /// Evaluate the model at `x`, writing `num_outputs()` values into `out`.
    ///
    fn eval(&self, x: &[f64], out: &mut [f64]);

    ///
    /// Exact integral over the box `[start, end]`, if known. Used for validation only.
    ///
    fn analytic_integral(&self, _start: &[f64], _end: &[f64]) -> Option<Vec<f64>>
    {
        None
    }
}

///
/// Wraps a closure `fn(x, out)` producing `num_outputs` values per point.
///
pub struct FunctionWrapper<F>
{
    fun: F,
    num_outputs: usize,
}

impl<F: Fn(&[f64], &mut [f64])> FunctionWrapper<F>
{
    pub fn new(num_outputs: usize, fun: F) -> Self
    {
        Self { fun, num_outputs }
    }
}

impl<F: Fn(&[f64], &mut [f64])> Function for FunctionWrapper<F>
{
    fn num_outputs(&self) -> usize
    {
        self.num_outputs
    }

    #[inline]
    fn eval(&self, x: &[f64], out: &mut [f64])
    {
        (self.fun)(x, out)
    }
}

///
/// `f(x) = sum_i c_i x_i`.
///
#[derive(Clone, Debug)]
pub struct FunctionLinear
{
    pub coefficients: Vec<f64>,
}

impl FunctionLinear
{
    pub fn new(coefficients: Vec<f64>) -> Self
    {
        Self { coefficients }
    }
}

impl Function for FunctionLinear
{
    fn eval(&self, x: &[f64], out: &mut [f64])
    {
        out[0] = self.coefficients.iter().zip(x).map(|(c, xi)| c * xi).sum();
    }

    fn analytic_integral(&self, start: &[f64], end: &[f64]) -> Option<Vec<f64>>
    {
        let volume: f64 = start.iter().zip(end).map(|(a, b)| b - a).product();
        let integral = self.coefficients.iter().zip(start.iter().zip(end))
            .map(|(c, (a, b))| c * 0.5 * (a + b) * volume).sum();
        Some(vec![integral])
    }
}

///
/// Genz product peak `f(x) = prod_i 1 / (c_i^-2 + (x_i - w_i)^2)`.
///
#[derive(Clone, Debug)]
pub struct GenzProductPeak
{
    pub coefficients: Vec<f64>,
    pub midpoint: Vec<f64>,
}

impl GenzProductPeak
{
    pub fn new(coefficients: Vec<f64>, midpoint: Vec<f64>) -> Self
    {
        Self { coefficients, midpoint }
    }
}

impl Function for GenzProductPeak
{
    fn eval(&self, x: &[f64], out: &mut [f64])
    {
        let mut value = 1.0;
        for ((xi, c), w) in x.iter().zip(&self.coefficients).zip(&self.midpoint)
        {
            value /= c.powi(-2) + (xi - w) * (xi - w);
        }
        out[0] = value;
    }

    fn analytic_integral(&self, start: &[f64], end: &[f64]) -> Option<Vec<f64>>
    {
        let mut integral = 1.0;
        for d in 0..start.len()
        {
            let c = self.coefficients[d];
            let w = self.midpoint[d];
            integral *= c * ((c * (end[d] - w)).atan() - (c * (start[d] - w)).atan());
        }
        Some(vec![integral])
    }
}

///
/// Evaluation cache scoped to one adaptive run. Points are keyed by the bit pattern of
/// their coordinates, so identical coordinates are evaluated once.
///
#[derive(Default, Debug, Clone)]
pub struct FunctionCache
{
    values: FxHashMap<Vec<u64>, Vec<f64>>,
    unique_evaluations: usize,
    requests: usize,
}

impl FunctionCache
{
    pub fn new() -> Self
    {
        Self::default()
    }

    #[inline]
    fn key(x: &[f64]) -> Vec<u64>
    {
        // +0.0 and -0.0 are the same point
        x.iter().map(|&v| if v == 0.0 { 0 } else { v.to_bits() }).collect()
    }

    ///
    /// Value of `f` at `x`, evaluating `f` only if the point has not been seen before.
    ///
    pub fn eval(&mut self, f: &dyn Function, x: &[f64]) -> &[f64]
    {
        self.requests += 1;
        let unique_evaluations = &mut self.unique_evaluations;
        self.values.entry(Self::key(x)).or_insert_with(||
        {
            *unique_evaluations += 1;
            let mut out = vec![0.0; f.num_outputs()];
            f.eval(x, &mut out);
            out
        })
    }

    ///
    /// Number of distinct points `f` has been evaluated at.
    ///
    pub fn unique_evaluations(&self) -> usize
    {
        self.unique_evaluations
    }

    ///
    /// Number of lookups, including cache hits.
    ///
    pub fn requests(&self) -> usize
    {
        self.requests
    }

    pub fn clear(&mut self)
    {
        self.values.clear();
        self.unique_evaluations = 0;
        self.requests = 0;
    }
}

#[test]
fn check_cache_deduplicates_points()
{
    use std::cell::Cell;
    let calls = Cell::new(0);
    let f = FunctionWrapper::new(2, |x: &[f64], out: &mut [f64]|
    {
        calls.set(calls.get() + 1);
        out[0] = x[0];
        out[1] = 2.0 * x[0];
    });
    let mut cache = FunctionCache::new();
    assert_eq!(cache.eval(&f, &[0.5]), &[0.5, 1.0]);
    assert_eq!(cache.eval(&f, &[0.5]), &[0.5, 1.0]);
    cache.eval(&f, &[-0.0]);
    cache.eval(&f, &[0.0]);
    assert_eq!(calls.get(), 2);
    assert_eq!(cache.unique_evaluations(), 2);
    assert_eq!(cache.requests(), 4);
}

#[test]
fn check_linear_analytic_integral()
{
    let f = FunctionLinear::new(vec![1.0, 10.0]);
    // int_0^1 int_0^2 x + 10 y dy dx = 1 + 20
    let integral = f.analytic_integral(&[0.0, 0.0], &[1.0, 2.0]).unwrap();
    assert!((integral[0] - 21.0).abs() < 1e-14);
}
