///
/// Locate `x` in the sorted `nodes` and return the left node index together with the
/// weight of the right node. Points outside are clamped to the closest interval.
///
#[inline]
fn bracket(x: f64, nodes: &[f64]) -> (usize, f64)
{
    if nodes.len() < 2
    {
        return (0, 0.0);
    }
    let right = nodes.partition_point(|&node| node <= x).clamp(1, nodes.len() - 1);
    let left = right - 1;
    let t = (x - nodes[left]) / (nodes[right] - nodes[left]);
    (left, t.clamp(0.0, 1.0))
}

///
/// Multilinear interpolation on a tensor mesh.
///
/// `mesh` holds the sorted coordinates in every dimension, `values` the `num_outputs` values
/// of every mesh node (last dimension running fastest). The result for each of the
/// `points` (flattened, `mesh.len()` coordinates per point) is written consecutively.
///
pub fn interpolate_multilinear(mesh: &[Vec<f64>], values: &[f64], num_outputs: usize, points: &[f64]) -> Vec<f64>
{
    let ndim = mesh.len();
    let mut strides = vec![1; ndim];
    for d in (0..ndim.saturating_sub(1)).rev()
    {
        strides[d] = strides[d + 1] * mesh[d + 1].len();
    }
    let mut result = vec![0.0; points.len() / ndim * num_outputs];
    let mut brackets = vec![(0, 0.0); ndim];
    for (point, y) in points.chunks_exact(ndim).zip(result.chunks_exact_mut(num_outputs))
    {
        for d in 0..ndim
        {
            brackets[d] = bracket(point[d], &mesh[d]);
        }
        // visit the 2^d corners of the enclosing mesh cell
        for corner in 0..(1usize << ndim)
        {
            let mut weight = 1.0;
            let mut offset = 0;
            for d in 0..ndim
            {
                let (left, t) = brackets[d];
                if corner >> d & 1 == 1
                {
                    if mesh[d].len() < 2
                    {
                        weight = 0.0;
                        break;
                    }
                    weight *= t;
                    offset += (left + 1) * strides[d];
                }
                else
                {
                    weight *= 1.0 - t;
                    offset += left * strides[d];
                }
            }
            if weight == 0.0
            {
                continue;
            }
            let node_values = &values[offset * num_outputs..(offset + 1) * num_outputs];
            for (yi, &vi) in y.iter_mut().zip(node_values)
            {
                *yi += weight * vi;
            }
        }
    }
    result
}

#[test]
fn check_bilinear_interpolation_is_exact_for_bilinear_functions()
{
    let mesh = vec![vec![0.0, 0.5, 2.0], vec![-1.0, 1.0]];
    let f = |x: f64, y: f64| 1.0 + 2.0 * x - 3.0 * y + 0.5 * x * y;
    let mut values = Vec::new();
    for &x in &mesh[0]
    {
        for &y in &mesh[1]
        {
            values.push(f(x, y));
        }
    }
    let points = [0.25, 0.0, 1.0, 0.5, 2.0, 1.0, 0.0, -1.0];
    let result = interpolate_multilinear(&mesh, &values, 1, &points);
    for (p, r) in points.chunks_exact(2).zip(&result)
    {
        assert!((f(p[0], p[1]) - r).abs() < 1e-13, "{p:?}");
    }
}

#[test]
fn check_interpolation_vector_valued()
{
    let mesh = vec![vec![0.0, 1.0]];
    let values = [0.0, 10.0, 1.0, 20.0];
    let result = interpolate_multilinear(&mesh, &values, 2, &[0.5]);
    assert_eq!(result, vec![0.5, 15.0]);
}
