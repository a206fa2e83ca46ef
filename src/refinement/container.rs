use indexmap::IndexSet;

use crate::errors::{Result, SGError};
use crate::grids::grid::Area;

use super::cell::{Cell, CellId};

///
/// Arena of all cells of the refinement tree, the ordered set of active leaves and the global
/// integral. Leaves keep insertion order, which is the tie break order of the driver.
///
#[derive(Debug, Clone)]
pub struct RefinementContainer
{
    cells: Vec<Cell>,
    leaves: IndexSet<CellId>,
    integral: Vec<f64>,
    ndim: usize,
    num_outputs: usize,
}

impl RefinementContainer
{
    ///
    /// Create a container holding only the root cell covering `area`.
    ///
    pub fn new(area: Area, num_outputs: usize) -> Self
    {
        let ndim = area.ndim();
        let root = Cell::new(area, 0, num_outputs, None);
        let mut leaves = IndexSet::new();
        leaves.insert(CellId(0));
        Self { cells: vec![root], leaves, integral: vec![0.0; num_outputs], ndim, num_outputs }
    }

    #[inline]
    pub fn root(&self) -> CellId
    {
        CellId(0)
    }

    #[inline]
    pub fn ndim(&self) -> usize
    {
        self.ndim
    }

    #[inline]
    pub fn num_outputs(&self) -> usize
    {
        self.num_outputs
    }

    #[inline]
    pub fn cell(&self, id: CellId) -> &Cell
    {
        &self.cells[id.index()]
    }

    #[inline]
    pub fn cell_mut(&mut self, id: CellId) -> &mut Cell
    {
        &mut self.cells[id.index()]
    }

    pub fn get(&self, id: CellId) -> Result<&Cell>
    {
        self.cells.get(id.index()).ok_or(SGError::InvalidIndex(id.index()))
    }

    ///
    /// Total number of cells including internal ones.
    ///
    pub fn len(&self) -> usize
    {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.cells.is_empty()
    }

    pub fn leaves(&self) -> impl Iterator<Item=CellId> + '_
    {
        self.leaves.iter().copied()
    }

    pub fn leaf_ids(&self) -> Vec<CellId>
    {
        self.leaves.iter().copied().collect()
    }

    pub fn num_leaves(&self) -> usize
    {
        self.leaves.len()
    }

    pub fn integral(&self) -> &[f64]
    {
        &self.integral
    }

    ///
    /// Remove the contribution of a leaf from the global integral and zero its accumulators.
    ///
    pub fn reset_cell(&mut self, id: CellId)
    {
        let cell = &mut self.cells[id.index()];
        for (total, value) in self.integral.iter_mut().zip(cell.integral.iter_mut())
        {
            *total -= *value;
            *value = 0.0;
        }
        cell.evaluations = 0.0;
    }

    ///
    /// Zero every accumulator, e.g. before all leaves are evaluated against a new scheme.
    ///
    pub fn reset_all(&mut self)
    {
        for cell in self.cells.iter_mut()
        {
            cell.integral.iter_mut().for_each(|v| *v = 0.0);
            cell.evaluations = 0.0;
        }
        self.integral.iter_mut().for_each(|v| *v = 0.0);
    }

    ///
    /// Add `coefficient * partial` to a cell and to the global integral.
    ///
    pub fn accumulate(&mut self, id: CellId, partial: &[f64], coefficient: f64, evaluations: f64)
    {
        let cell = &mut self.cells[id.index()];
        for ((total, value), p) in self.integral.iter_mut().zip(cell.integral.iter_mut()).zip(partial)
        {
            *value += coefficient * p;
            *total += coefficient * p;
        }
        cell.evaluations += evaluations;
    }

    ///
    /// Set the integral of a cell that does not take part in the global sum (the root before
    /// its initial split).
    ///
    pub fn set_integral(&mut self, id: CellId, integral: Vec<f64>)
    {
        self.cells[id.index()].integral = integral;
    }

    ///
    /// Split a leaf into `2^d` children that inherit its coarsening. The leaf's contribution
    /// leaves the global integral; the children start at zero. Returns the children.
    ///
    pub fn split(&mut self, id: CellId, splits_before_extend: u32) -> Result<Vec<CellId>>
    {
        let cell = self.get(id)?;
        if !cell.is_leaf()
        {
            return Err(SGError::InvalidIndex(id.index()));
        }
        let areas = cell.area.split();
        let coarsening = cell.coarsening;
        if areas.len() != 1 << self.ndim
        {
            return Err(SGError::InvalidSiblingCount { cell: id.index(), expected: 1 << self.ndim, actual: areas.len() });
        }
        self.reset_cell(id);
        let first = self.cells.len() as u32;
        let children: Vec<CellId> = (0..areas.len() as u32).map(|i| CellId(first + i)).collect();
        for area in areas
        {
            let mut child = Cell::new(area, coarsening, self.num_outputs, Some(id));
            child.splits_before_extend = splits_before_extend;
            self.cells.push(child);
        }
        let cell = &mut self.cells[id.index()];
        cell.flags.set_is_leaf(false);
        cell.children = children.clone();
        cell.generation += 1;
        self.leaves.shift_remove(&id);
        self.leaves.extend(children.iter().copied());
        Ok(children)
    }

    ///
    /// Children of the parent of `id`, including `id` itself. Empty for the root.
    ///
    pub fn siblings(&self, id: CellId) -> &[CellId]
    {
        match self.cells[id.index()].parent
        {
            Some(parent) => &self.cells[parent.index()].children,
            None => &[],
        }
    }

    ///
    /// Sum of the leaf integrals and leaf evaluations below `id` (or of `id` itself if it is a
    /// leaf).
    ///
    pub fn subtree_integral(&self, id: CellId) -> (Vec<f64>, f64)
    {
        let mut integral = vec![0.0; self.num_outputs];
        let mut evaluations = 0.0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop()
        {
            let cell = &self.cells[current.index()];
            if cell.is_leaf()
            {
                integral.iter_mut().zip(&cell.integral).for_each(|(a, b)| *a += b);
                evaluations += cell.evaluations;
            }
            else
            {
                stack.extend(cell.children.iter().copied());
            }
        }
        (integral, evaluations)
    }

    ///
    /// Sum of all leaf integrals, accumulated in leaf order.
    ///
    pub fn leaf_integral_sum(&self) -> Vec<f64>
    {
        let mut sum = vec![0.0; self.num_outputs];
        for id in &self.leaves
        {
            sum.iter_mut().zip(&self.cells[id.index()].integral).for_each(|(a, b)| *a += b);
        }
        sum
    }

    ///
    /// Check the structural invariants of the tree: every internal cell has `2^d` children that
    /// tile it, and the leaf set holds exactly the cells without children.
    ///
    pub fn check_structure(&self) -> Result<()>
    {
        let expected = 1usize << self.ndim;
        for (i, cell) in self.cells.iter().enumerate()
        {
            if cell.is_leaf()
            {
                if !cell.children.is_empty() || !self.leaves.contains(&CellId(i as u32))
                {
                    return Err(SGError::InvalidIndex(i));
                }
                continue;
            }
            if cell.children.len() != expected
            {
                return Err(SGError::InvalidSiblingCount { cell: i, expected, actual: cell.children.len() });
            }
            let volume: f64 = cell.children.iter().map(|c| self.cells[c.index()].area.volume()).sum();
            if (volume - cell.area.volume()).abs() > 1e-12 * cell.area.volume().abs()
            {
                return Err(SGError::InvalidSiblingCount { cell: i, expected, actual: cell.children.len() });
            }
            for (j, a) in cell.children.iter().enumerate()
            {
                let area = &self.cells[a.index()].area;
                if !cell.children.iter().skip(j + 1).all(|b| area.intersection_volume(&self.cells[b.index()].area) == 0.0)
                {
                    return Err(SGError::InvalidSiblingCount { cell: i, expected, actual: cell.children.len() });
                }
            }
        }
        Ok(())
    }
}

#[test]
fn check_split_updates_leaves()
{
    let area = Area::new(&[0.0, 0.0], &[1.0, 1.0]);
    let mut container = RefinementContainer::new(area, 1);
    let children = container.split(container.root(), 0).unwrap();
    assert_eq!(children.len(), 4);
    assert_eq!(container.leaf_ids(), children);
    let grandchildren = container.split(children[1], 2).unwrap();
    assert_eq!(container.num_leaves(), 7);
    // the split leaf leaves the set, its children are appended
    assert_eq!(container.leaf_ids(), vec![children[0], children[2], children[3], grandchildren[0], grandchildren[1], grandchildren[2], grandchildren[3]]);
    assert_eq!(container.siblings(grandchildren[0]), grandchildren.as_slice());
    assert_eq!(container.cell(grandchildren[3]).splits_before_extend, 2);
    assert!(container.split(children[1], 0).is_err());
    container.check_structure().unwrap();
}

#[test]
fn check_accumulate_conserves_integral()
{
    let area = Area::new(&[0.0, 0.0], &[1.0, 1.0]);
    let mut container = RefinementContainer::new(area, 2);
    let children = container.split(container.root(), 0).unwrap();
    for (i, &child) in children.iter().enumerate()
    {
        container.accumulate(child, &[i as f64, 1.0], 1.0, 9.0);
        container.accumulate(child, &[0.5, 1.0], -1.0, 4.0);
    }
    assert_eq!(container.integral(), container.leaf_integral_sum().as_slice());
    container.split(children[0], 0).unwrap();
    assert_eq!(container.integral(), container.leaf_integral_sum().as_slice());
    let (subtree, evaluations) = container.subtree_integral(container.root());
    assert_eq!(subtree, container.leaf_integral_sum());
    assert_eq!(evaluations, 3.0 * 13.0);
}

#[cfg(test)]
mod proptests
{
    use proptest::prelude::*;

    use super::*;

    proptest!
    {
        #[test]
        fn split_sequences_keep_partition(ndim in 1usize..4, picks in prop::collection::vec(0usize..64, 1..12))
        {
            let start = vec![-3.0; ndim];
            let end = vec![7.3; ndim];
            let mut container = RefinementContainer::new(Area::new(&start, &end), 1);
            for pick in picks
            {
                let leaves = container.leaf_ids();
                let id = leaves[pick % leaves.len()];
                container.split(id, 0).unwrap();
                prop_assert!(container.check_structure().is_ok());
            }
            let volume: f64 = container.leaves().map(|id| container.cell(id).area.volume()).sum();
            let expected = 10.3f64.powi(ndim as i32);
            prop_assert!((volume - expected).abs() < 1e-10 * expected);
        }
    }
}
