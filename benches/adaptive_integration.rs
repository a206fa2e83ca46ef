use criterion::{criterion_group, criterion_main, Criterion};
use sgcombi::{function::GenzProductPeak, ExtendSplitOptions, SpatiallyAdaptiveExtendSplit, TrapezoidalGrid, GaussLegendreGrid};
use sgcombi::standard_combi::StandardCombi;

fn peak(ndim: usize) -> GenzProductPeak
{
    GenzProductPeak::new(vec![5.0; ndim], vec![0.4; ndim])
}

fn adaptive_trapezoidal(ndim: usize, version: u8)
{
    let (a, b) = (vec![0.0; ndim], vec![1.0; ndim]);
    let f = peak(ndim);
    let reference = sgcombi::Function::analytic_integral(&f, &a, &b);
    let options = ExtendSplitOptions { version, reference_solution: reference, ..Default::default() };
    let mut adaptive = SpatiallyAdaptiveExtendSplit::new(&a, &b, TrapezoidalGrid::new(&a, &b, true), options).unwrap();
    let _ = adaptive.perform_spatially_adaptive(1, 2, &f, 1e-3, Some(50_000)).unwrap();
}

fn adaptive_gauss_legendre(ndim: usize)
{
    let (a, b) = (vec![0.0; ndim], vec![1.0; ndim]);
    let f = peak(ndim);
    let options = ExtendSplitOptions { max_refinements: Some(20), ..Default::default() };
    let mut adaptive = SpatiallyAdaptiveExtendSplit::new(&a, &b, GaussLegendreGrid::new(&a, &b), options).unwrap();
    let _ = adaptive.perform_spatially_adaptive(1, 2, &f, 1e-8, None).unwrap();
}

fn standard(ndim: usize)
{
    let (a, b) = (vec![0.0; ndim], vec![1.0; ndim]);
    let mut combi = StandardCombi::new(&a, &b, TrapezoidalGrid::new(&a, &b, true)).unwrap();
    let _ = combi.perform_combi(1, 6, &peak(ndim), None).unwrap();
}

fn run_case(c: &mut Criterion)
{
    c.bench_function("extend_split_2d_v0", |b| b.iter(|| adaptive_trapezoidal(2, 0)));
    c.bench_function("extend_split_2d_v2", |b| b.iter(|| adaptive_trapezoidal(2, 2)));
    c.bench_function("extend_split_3d_v0", |b| b.iter(|| adaptive_trapezoidal(3, 0)));
    c.bench_function("extend_split_gauss_legendre_2d", |b| b.iter(|| adaptive_gauss_legendre(2)));
    c.bench_function("standard_combi_3d", |b| b.iter(|| standard(3)));
}

criterion_group!(benches, run_case);
criterion_main!(benches);
