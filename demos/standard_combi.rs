use sgcombi::{function::FunctionLinear, standard_combi::StandardCombi, Function, GaussLegendreGrid, TrapezoidalGrid};

fn main()
{
    let ndim = 3;
    let (a, b) = (vec![-3.0; ndim], vec![7.3; ndim]);
    let f = FunctionLinear::new(vec![1.0, 10.0, 100.0]);
    let exact = f.analytic_integral(&a, &b).unwrap();

    let mut combi = StandardCombi::new(&a, &b, TrapezoidalGrid::new(&a, &b, true)).unwrap();
    let result = combi.perform_combi(1, 4, &f, Some(&exact)).unwrap();
    println!("trapezoidal: expected = {}, value = {}, error = {:?}", exact[0], result.integral[0], result.error);
    println!("    {} component grids, {} points, {} distinct", result.scheme.len(),
        combi.total_num_points(false).unwrap(), combi.total_num_points(true).unwrap());
    let point = [0.5, 1.25, -2.0];
    let surrogate = combi.interpolate_points(&f, &point).unwrap();
    let mut value = [0.0];
    f.eval(&point, &mut value);
    println!("    surrogate at {:?}: {} (f = {})", point, surrogate[0], value[0]);

    let mut combi = StandardCombi::new(&a, &b, GaussLegendreGrid::new(&a, &b)).unwrap();
    let result = combi.perform_combi(1, 3, &f, Some(&exact)).unwrap();
    println!("gauss-legendre: expected = {}, value = {}, error = {:?}", exact[0], result.integral[0], result.error);
}
