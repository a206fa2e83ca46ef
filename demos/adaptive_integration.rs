use sgcombi::{function::GenzProductPeak, ExtendSplitOptions, ExtendSplitStrategy, Function, SpatiallyAdaptiveExtendSplit, TrapezoidalGrid};

fn peak_example(version: u8, strategy: ExtendSplitStrategy)
{
    let ndim = 2;
    let (a, b) = (vec![0.0; ndim], vec![1.0; ndim]);
    let f = GenzProductPeak::new(vec![10.0; ndim], vec![0.3, 0.7]);
    let exact = f.analytic_integral(&a, &b).unwrap();
    let options = ExtendSplitOptions { version, strategy, reference_solution: Some(exact.clone()), ..Default::default() };
    let mut adaptive = SpatiallyAdaptiveExtendSplit::new(&a, &b, TrapezoidalGrid::new(&a, &b, true), options).unwrap();
    let result = adaptive.perform_spatially_adaptive(1, 2, &f, 1e-4, Some(100_000)).unwrap();
    println!("version {version} {strategy:?}: expected = {}, value = {}, error = {:e}, converged = {}",
        exact[0], result.integral[0], result.error_estimate, result.converged);
    println!("    {} refinements, {} leaves, lmax {}, {} function evaluations, {} distinct grid points",
        result.refinements, adaptive.container().num_leaves(), result.scheme.lmax(), result.function_evaluations,
        adaptive.total_num_points(true).unwrap());
    for leaf in adaptive.leaf_summaries().iter().take(4)
    {
        println!("    [{:?} - {:?}] coarsening {} error {:e}", leaf.start, leaf.end, leaf.coarsening, leaf.error);
    }
}

fn main()
{
    for version in 0..3
    {
        peak_example(version, ExtendSplitStrategy::Automatic);
    }
    peak_example(0, ExtendSplitStrategy::Fixed { splits_before_extend: 2 });
}
