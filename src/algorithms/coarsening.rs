use rustc_hash::FxHashMap;

use crate::errors::{Result, SGError};
use crate::refinement::cell::CellId;

///
/// Level vectors already charged on a cell during the current evaluation pass:
/// reduced level vector -> original level vector of the scheme.
///
#[derive(Default, Debug, Clone)]
pub struct ChargeCache
{
    charged: FxHashMap<CellId, FxHashMap<Vec<u32>, Vec<u32>>>,
}

impl ChargeCache
{
    pub fn new() -> Self
    {
        Self::default()
    }

    ///
    /// Forget every charge made on `cell`. Called at the start of each pass over the scheme.
    ///
    pub fn clear_cell(&mut self, cell: CellId)
    {
        if let Some(charged) = self.charged.get_mut(&cell)
        {
            charged.clear();
        }
    }

    pub fn clear(&mut self)
    {
        self.charged.clear();
    }

    ///
    /// Record that `reduced` was charged for `original`. Returns false if `reduced` was already
    /// charged by a different original level vector.
    ///
    fn charge(&mut self, cell: CellId, reduced: &[u32], original: &[u32]) -> bool
    {
        let charged = self.charged.entry(cell).or_default();
        match charged.get(reduced)
        {
            Some(previous) => previous.as_slice() == original,
            None =>
            {
                charged.insert(reduced.to_owned(), original.to_owned());
                true
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coarsened
{
    /// Level vector relative to `lmin`, ready to be handed to a grid.
    pub levelvec: Vec<u32>,
    /// The grid must not contribute on this cell.
    pub is_degenerate: bool,
}

///
/// Reduces a level vector of the global scheme to the level vector used on a cell with a given
/// coarsening value.
///
/// * version 0 coarsens as much and as early as possible. Grids whose two largest levels are
///   closer than the coarsening value collapse and are dropped, and a reduced level vector is
///   only evaluated once per cell and pass.
/// * versions 1 and 2 coarsen all maximal levels together, and only while no finer grid of the
///   scheme would be reduced below a coarser one. Version 1 spends one unit less on grids of
///   the top diagonal.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoarseningPolicy
{
    version: u8,
    lmin: u32,
}

impl CoarseningPolicy
{
    pub fn new(version: u8, lmin: u32) -> Result<Self>
    {
        if version > 2
        {
            return Err(SGError::InvalidVersion(version));
        }
        Ok(Self { version, lmin })
    }

    #[inline]
    pub fn version(&self) -> u8
    {
        self.version
    }

    #[inline]
    pub fn lmin(&self) -> u32
    {
        self.lmin
    }

    ///
    /// Coarsen `levelvec` on `cell`. `lmax` is the current global maximum level and
    /// `top_diagonal` tells whether `levelvec` lies on the top diagonal of its scheme.
    ///
    pub fn coarsen(&self, cache: &mut ChargeCache, cell: CellId, levelvec: &[u32], coarsening: u32, lmax: u32, top_diagonal: bool) -> Coarsened
    {
        let mut reduced = levelvec.to_owned();
        let mut is_degenerate = false;
        if coarsening > 0 && !reduced.is_empty()
        {
            if self.version == 0
            {
                is_degenerate = self.coarsen_greedy(cache, cell, &mut reduced, levelvec, coarsening);
            }
            else
            {
                self.coarsen_balanced(&mut reduced, coarsening, lmax, top_diagonal);
            }
        }
        let levelvec = reduced.iter().map(|&l| l.saturating_sub(self.lmin)).collect();
        Coarsened { levelvec, is_degenerate }
    }

    fn coarsen_greedy(&self, cache: &mut ChargeCache, cell: CellId, reduced: &mut [u32], original: &[u32], coarsening: u32) -> bool
    {
        let mut sorted = reduced.to_owned();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        let gap = if sorted.len() > 1 { sorted[0] - sorted[1] } else { sorted[0] - self.lmin };
        if gap < coarsening
        {
            let mut budget = coarsening;
            while budget > 0
            {
                let (position, max_level) = first_max(reduced);
                if max_level <= self.lmin
                {
                    break;
                }
                reduced[position] -= 1;
                budget -= 1;
            }
            true
        }
        else
        {
            let (position, _) = first_max(reduced);
            reduced[position] -= coarsening;
            !cache.charge(cell, reduced, original)
        }
    }

    fn coarsen_balanced(&self, reduced: &mut [u32], coarsening: u32, lmax: u32, top_diagonal: bool)
    {
        let initial = coarsening as i64;
        let mut budget = initial;
        let slack = if self.version == 1 { 2 } else { 3 };
        while budget > 0
        {
            let (_, max_level) = first_max(reduced);
            if max_level <= self.lmin
            {
                break;
            }
            let occurrences = reduced.iter().filter(|&&l| l == max_level).count() as i64;
            let no_forward_problem = initial >= lmax as i64 - 2 * max_level as i64 + slack;
            let affordable = if self.version == 1 { budget >= occurrences - top_diagonal as i64 } else { budget >= occurrences };
            if !(no_forward_problem && affordable)
            {
                break;
            }
            for level in reduced.iter_mut().filter(|l| **l == max_level)
            {
                *level -= 1;
            }
            budget -= occurrences;
        }
    }
}

///
/// Position and value of the first maximal entry.
///
#[inline]
fn first_max(levels: &[u32]) -> (usize, u32)
{
    let mut position = 0;
    for (i, &level) in levels.iter().enumerate()
    {
        if level > levels[position]
        {
            position = i;
        }
    }
    (position, levels[position])
}

#[cfg(test)]
fn coarsen_scheme(policy: &CoarseningPolicy, lmin: u32, lmax: u32, dim: usize, coarsening: u32) -> FxHashMap<Vec<u32>, f64>
{
    use crate::combination_scheme::CombinationScheme;
    let scheme = CombinationScheme::new(lmin, lmax, dim).unwrap();
    let mut cache = ChargeCache::new();
    let mut combined: FxHashMap<Vec<u32>, f64> = FxHashMap::default();
    for grid in scheme.iter()
    {
        let top = scheme.num_sub_diagonal(&grid.levelvector) == 0;
        let coarsened = policy.coarsen(&mut cache, CellId(0), &grid.levelvector, coarsening, lmax, top);
        if !coarsened.is_degenerate
        {
            *combined.entry(coarsened.levelvec).or_default() += grid.coefficient;
        }
    }
    combined.retain(|_, c| *c != 0.0);
    combined
}

#[test]
fn check_greedy_coarsening_reproduces_smaller_scheme()
{
    // coarsening the lmax = 3 scheme by one yields the lmax = 2 scheme
    let policy = CoarseningPolicy::new(0, 1).unwrap();
    let coarse = coarsen_scheme(&policy, 1, 3, 2, 1);
    let reference = coarsen_scheme(&policy, 1, 2, 2, 0);
    assert_eq!(coarse, reference);
    let mut expected: FxHashMap<Vec<u32>, f64> = FxHashMap::default();
    expected.insert(vec![0, 1], 1.0);
    expected.insert(vec![1, 0], 1.0);
    expected.insert(vec![0, 0], -1.0);
    assert_eq!(coarse, expected);
}

#[test]
fn check_coarsened_coefficients_sum_to_one()
{
    for version in 0..3
    {
        for dim in 2..5
        {
            for lmax in 2..5
            {
                let policy = CoarseningPolicy::new(version, 1).unwrap();
                for coarsening in 0..lmax - 1
                {
                    let sum: f64 = coarsen_scheme(&policy, 1, lmax, dim, coarsening).values().sum();
                    assert_eq!(sum, 1.0, "version {version} dim {dim} lmax {lmax} coarsening {coarsening}");
                }
            }
        }
    }
}

#[test]
fn check_degenerate_idempotence()
{
    let policy = CoarseningPolicy::new(0, 1).unwrap();
    let mut cache = ChargeCache::new();
    let first = policy.coarsen(&mut cache, CellId(3), &[1, 3], 1, 3, true);
    let second = policy.coarsen(&mut cache, CellId(3), &[1, 3], 1, 3, true);
    assert_eq!(first, second);
    assert!(!first.is_degenerate);
    // a different original level vector reducing to the same grid is dropped
    let other = policy.coarsen(&mut cache, CellId(3), &[2, 2], 1, 3, true);
    assert!(other.is_degenerate);
    let collapsed = policy.coarsen(&mut cache, CellId(3), &[3, 1], 1, 3, true);
    assert_eq!(collapsed.levelvec, vec![1, 0]);
    assert!(!collapsed.is_degenerate);
    assert!(policy.coarsen(&mut cache, CellId(3), &[2, 2], 1, 3, true).is_degenerate);
    cache.clear_cell(CellId(3));
    assert!(!policy.coarsen(&mut cache, CellId(3), &[2, 1], 1, 3, false).is_degenerate);
    assert!(CoarseningPolicy::new(3, 1).is_err());
}

#[test]
fn check_balanced_coarsening_table()
{
    // (version, lmax, level vector, coarsening, top diagonal, expected level relative to lmin = 1)
    let cases: [(u8, u32, [u32; 2], u32, bool, [u32; 2]); 10] = [
        (1, 3, [2, 2], 1, true, [0, 0]),
        (2, 3, [2, 2], 1, true, [1, 1]),
        // without the top diagonal reserve one unit does not pay for two maxima
        (1, 3, [2, 2], 1, false, [1, 1]),
        // 1 < lmax - 2 * 2 + 2: coarsening would overtake a finer grid
        (1, 4, [2, 2], 1, false, [1, 1]),
        (1, 4, [3, 1], 1, false, [1, 0]),
        (2, 4, [3, 1], 1, false, [1, 0]),
        (1, 4, [3, 2], 2, true, [0, 0]),
        (2, 4, [3, 2], 2, true, [1, 1]),
        (1, 4, [3, 2], 0, true, [2, 1]),
        (2, 4, [1, 1], 3, false, [0, 0]),
    ];
    let mut cache = ChargeCache::new();
    for (version, lmax, levelvec, coarsening, top, expected) in cases
    {
        let policy = CoarseningPolicy::new(version, 1).unwrap();
        let coarsened = policy.coarsen(&mut cache, CellId(0), &levelvec, coarsening, lmax, top);
        assert_eq!(coarsened.levelvec, expected.to_vec(), "version {version} lmax {lmax} {levelvec:?} coarsening {coarsening}");
        assert!(!coarsened.is_degenerate);
    }
}

#[cfg(test)]
mod proptests
{
    use proptest::prelude::*;

    use super::*;

    proptest!
    {
        #[test]
        fn coarsening_is_monotone(version in 0u8..3, lmin in 0u32..3, levels in prop::collection::vec(0u32..6, 2..5), coarsening in 0u32..6)
        {
            let policy = CoarseningPolicy::new(version, lmin).unwrap();
            let levelvec: Vec<u32> = levels.iter().map(|l| l + lmin).collect();
            let lmax = *levelvec.iter().max().unwrap();
            let mut cache = ChargeCache::new();
            let current = policy.coarsen(&mut cache, CellId(0), &levelvec, coarsening, lmax, false);
            cache.clear();
            let coarser = policy.coarsen(&mut cache, CellId(0), &levelvec, coarsening + 1, lmax, false);
            for d in 0..levelvec.len()
            {
                // effective levels are relative to lmin, so they can never drop below it
                prop_assert!(current.levelvec[d] <= levelvec[d] - lmin);
                prop_assert!(coarser.levelvec[d] <= current.levelvec[d]);
            }
        }
    }
}
