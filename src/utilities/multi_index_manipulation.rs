use std::cmp::Ordering;

use crate::errors::SGError;

///
/// Sort level sets lexicographically, once per dimension while ignoring that dimension.
/// Returns the sorted maps together with the boundaries of the 1d lines in each map.
/// Used by `weight_modifiers`.
///
fn sort_level_sets(level_sets: &[u32], ndim: usize) -> Result<(Vec<Vec<u32>>, Vec<Vec<u32>>), SGError> {
    let tensors: Vec<&[u32]> = level_sets.chunks_exact(ndim).collect();
    let num_tensors = tensors.len();
    if num_tensors == 0
    {
        return Err(SGError::EmptyScheme);
    }

    let mut sorted_maps: Vec<Vec<u32>> = vec![(0..num_tensors as u32).collect(); ndim];
    let mut lines_1d: Vec<Vec<u32>> = vec![Vec::new(); ndim];

    let match_outside_dim = |dim: usize, a: &[u32], b: &[u32]| -> bool {
        a.iter()
            .zip(b.iter())
            .enumerate()
            .all(|(j, (&x, &y))| j == dim || x == y)
    };

    for dim in 0..ndim {
        // stable sort, so entries of a line stay ordered by their level in `dim`
        sorted_maps[dim].sort_by(|&a, &b| {
            tensors[a as usize].iter()
                .zip(tensors[b as usize].iter())
                .enumerate()
                .filter(|(j, _)| *j != dim)
                .find_map(|(_, (&v_a, &v_b))| match v_a.cmp(&v_b) {
                    Ordering::Equal => None,
                    other => Some(other),
                })
                .unwrap_or(Ordering::Equal)
        });

        let mut current_idx = tensors[sorted_maps[dim][0] as usize];
        lines_1d[dim].push(0);
        for (i, &tensor) in sorted_maps[dim].iter().enumerate().skip(1) {
            let next_idx = tensors.get(tensor as usize).ok_or(SGError::InvalidIndex(tensor as usize))?;
            if !match_outside_dim(dim, current_idx, next_idx) {
                lines_1d[dim].push(i as u32);
                current_idx = next_idx;
            }
        }
        lines_1d[dim].push(num_tensors as u32);
    }

    Ok((sorted_maps, lines_1d))
}

///
/// Compute the combination coefficients of a lower (downward closed) level set. The level
/// sets must be stored lexicographically with the last dimension running fastest. Approach
/// adapted from TASMANIAN.
///
pub fn weight_modifiers(level_sets: &[u32], ndim: usize) -> Result<Vec<f64>, SGError> {
    let num_tensors = level_sets.len() / ndim;

    if ndim == 1 {
        let mut weights = vec![0.0; num_tensors];
        if let Some(last) = weights.last_mut()
        {
            *last = 1.0;
        }
        return Ok(weights);
    }

    let mut weights = vec![0.0; num_tensors];
    let (sorted_maps, lines_1d) = sort_level_sets(level_sets, ndim)?;

    // the topmost tensor of every line in the last dimension starts with weight one
    let last_dim_lines = &lines_1d[ndim - 1];
    for i in last_dim_lines.windows(2) {
        weights[i[1] as usize - 1] = 1.0;
    }

    for dim in (0..ndim - 1).rev() {
        for segment in lines_1d[dim].windows(2) {
            let start = segment[0];
            let end = segment[1];

            for i in (start..end - 1).rev() {
                let mut val = weights[sorted_maps[dim][i as usize] as usize];
                for j in i + 1..end {
                    val -= weights[sorted_maps[dim][j as usize] as usize];
                }
                weights[sorted_maps[dim][i as usize] as usize] = val;
            }
        }
    }
    Ok(weights)
}

///
/// All level vectors `l` with `l[d] >= lmin` and `|l|_1 <= max_sum`, flattened and ordered
/// lexicographically (last dimension fastest). This is the lower set of the classic
/// combination technique.
///
pub fn simplex_level_sets(ndim: usize, lmin: u32, max_sum: u32) -> Vec<u32>
{
    let mut level_sets = Vec::new();
    if ndim == 0 || max_sum < lmin * ndim as u32
    {
        return level_sets;
    }
    let mut current = vec![lmin; ndim];
    let mut sum = lmin * ndim as u32;
    loop
    {
        level_sets.extend_from_slice(&current);
        // odometer step: increase the last dimension that still fits, reset everything behind it
        let mut dim = ndim;
        loop
        {
            if dim == 0
            {
                return level_sets;
            }
            dim -= 1;
            if sum < max_sum
            {
                current[dim] += 1;
                sum += 1;
                break;
            }
            sum -= current[dim] - lmin;
            current[dim] = lmin;
        }
    }
}

///
/// Flattened cartesian product `0..bounds[0] x ... x 0..bounds[n-1]`, last index fastest.
///
pub fn cartesian_product(bounds: &[usize]) -> Vec<usize>
{
    let ndim = bounds.len();
    let total_combinations = bounds.iter().product::<usize>();
    let mut multi_indices = vec![0; total_combinations * ndim];
    for (i, current) in multi_indices.chunks_exact_mut(ndim.max(1)).enumerate().take(total_combinations) {
        let mut index = i;
        for (j, &bound) in bounds.iter().rev().enumerate() {
            current[ndim - 1 - j] = index % bound;
            index /= bound;
        }
    }
    multi_indices
}

#[test]
fn check_simplex_level_sets_2d()
{
    let sets = simplex_level_sets(2, 0, 2);
    assert_eq!(sets, vec![0,0, 0,1, 0,2, 1,0, 1,1, 2,0]);
    let sets = simplex_level_sets(3, 1, 4);
    // (1,1,1), (1,1,2), (1,2,1), (2,1,1)
    assert_eq!(sets.len() / 3, 4);
    assert!(sets.chunks_exact(3).all(|l| l.iter().sum::<u32>() <= 4 && l.iter().all(|&x| x >= 1)));
}

#[test]
fn check_weight_modifiers_classic_2d()
{
    let sets = simplex_level_sets(2, 0, 2);
    let weights = weight_modifiers(&sets, 2).unwrap();
    assert_eq!(weights, vec![0.0, -1.0, 1.0, -1.0, 1.0, 1.0]);
}

#[test]
fn check_weight_modifiers_classic_3d()
{
    // classic coefficients are (-1)^q binom(d-1, q) on the q-th diagonal below the top
    let ndim = 3;
    let max_sum = 5;
    let sets = simplex_level_sets(ndim, 0, max_sum);
    let weights = weight_modifiers(&sets, ndim).unwrap();
    for (level, &weight) in sets.chunks_exact(ndim).zip(&weights)
    {
        let q = max_sum - level.iter().sum::<u32>();
        let expected = match q { 0 => 1.0, 1 => -2.0, 2 => 1.0, _ => 0.0 };
        assert_eq!(weight, expected, "level {:?}", level);
    }
}

#[test]
fn check_weight_modifiers_1d()
{
    let sets = simplex_level_sets(1, 1, 3);
    assert_eq!(sets, vec![1, 2, 3]);
    assert_eq!(weight_modifiers(&sets, 1).unwrap(), vec![0.0, 0.0, 1.0]);
}

#[test]
fn check_cartesian_product()
{
    let product = cartesian_product(&[2, 3]);
    assert_eq!(product, vec![0,0, 0,1, 0,2, 1,0, 1,1, 1,2]);
    assert!(cartesian_product(&[2, 0]).is_empty());
}
