use bitfield_struct::bitfield;
use serde::{Deserialize, Serialize};

use crate::grids::grid::Area;

///
/// Index of a cell in the `RefinementContainer` arena. Cells are never removed, so an id stays
/// valid for the lifetime of the container.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub u32);

impl CellId
{
    #[inline]
    pub fn index(&self) -> usize
    {
        self.0 as usize
    }
}

#[bitfield(u8, new=false)]
#[derive(Serialize, Deserialize, PartialEq, Eq)]
pub struct CellFlags
{
    pub is_leaf: bool,
    /// Too few points inside the cell; estimates are made on the whole sibling group.
    pub switch_to_parent_estimation: bool,
    /// The cell has been evaluated against the current scheme.
    pub considered: bool,
    #[bits(5)]
    pub _empty: u8
}

impl CellFlags
{
    pub fn new(is_leaf: bool) -> Self
    {
        let mut r = Self::default();
        r.set_is_leaf(is_leaf);
        r
    }
}

///
/// A lazily computed quantity. Replaces "not yet computed" sentinels.
///
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Estimate<T>
{
    #[default]
    Uncomputed,
    Value(T),
}

impl<T> Estimate<T>
{
    #[inline]
    pub fn is_computed(&self) -> bool
    {
        matches!(self, Estimate::Value(_))
    }

    #[inline]
    pub fn get(&self) -> Option<&T>
    {
        match self
        {
            Estimate::Value(value) => Some(value),
            Estimate::Uncomputed => None,
        }
    }

    #[inline]
    pub fn set(&mut self, value: T)
    {
        *self = Estimate::Value(value);
    }

    #[inline]
    pub fn reset(&mut self)
    {
        *self = Estimate::Uncomputed;
    }
}

impl<T: Copy> Estimate<T>
{
    #[inline]
    pub fn value(&self) -> Option<T>
    {
        self.get().copied()
    }
}

///
/// What-if quantities of a cell relative to its parent. All fields are reset together by
/// `invalidate` whenever the cell, one of its siblings or the scheme changes.
///
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentInfo
{
    /// Integral of the cell (or sibling group) evaluated one coarsening step coarser.
    pub extend_parent_integral: Estimate<Vec<f64>>,
    /// Parent grid points filtered to the cell.
    pub split_parent_integral: Estimate<Vec<f64>>,
    /// Parent grid interpolated onto the cell.
    pub split_parent_integral2: Estimate<Vec<f64>>,
    pub num_points_extend_parent: Estimate<f64>,
    pub num_points_split_parent: Estimate<f64>,
    pub num_points_reference: Estimate<f64>,
    pub sum_siblings: Estimate<Vec<f64>>,
    pub sibling_evaluations: Estimate<f64>,
    pub benefit_extend: Estimate<f64>,
    pub benefit_split: Estimate<f64>,
}

impl ParentInfo
{
    pub fn invalidate(&mut self)
    {
        *self = Self::default();
    }

    ///
    /// Whether both benefits are available for the current generation.
    ///
    pub fn is_complete(&self) -> bool
    {
        self.benefit_extend.is_computed() && self.benefit_split.is_computed()
    }
}

///
/// Pass of the whole parent scheme over the parent area at one child coarsening.
///
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentPass
{
    pub coarsening: u32,
    pub integral: Vec<f64>,
    pub num_points: f64,
    /// Points of the parent scheme one coarsening step coarser.
    pub num_points_reference: f64,
}

///
/// Estimates shared by all children of a cell in parent estimation mode. Kept on the parent
/// and reset whenever one of the children or their subtrees changes.
///
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiblingGroup
{
    /// Every child evaluated one coarsening step coarser.
    pub extend_integral: Vec<f64>,
    pub extend_num_points: f64,
    pub sum_siblings: Vec<f64>,
    pub sibling_evaluations: f64,
    pub parent_passes: Vec<ParentPass>,
}

impl SiblingGroup
{
    pub fn parent_pass(&self, coarsening: u32) -> Option<&ParentPass>
    {
        self.parent_passes.iter().find(|pass| pass.coarsening == coarsening)
    }
}

///
/// One axis-aligned cell of the refinement tree.
///
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell
{
    pub area: Area,
    /// Number of levels the global scheme is reduced by on this cell.
    pub coarsening: u32,
    pub integral: Vec<f64>,
    pub evaluations: f64,
    pub children: Vec<CellId>,
    pub parent: Option<CellId>,
    pub flags: CellFlags,
    pub parent_info: ParentInfo,
    /// Estimates shared by the children of this cell.
    pub sibling_group: Estimate<SiblingGroup>,
    pub splits_before_extend: u32,
    pub error: f64,
    /// Incremented every time the cell is refined or re-evaluated against a new scheme.
    pub generation: u32,
}

impl Cell
{
    pub fn new(area: Area, coarsening: u32, num_outputs: usize, parent: Option<CellId>) -> Self
    {
        Self
        {
            area,
            coarsening,
            integral: vec![0.0; num_outputs],
            evaluations: 0.0,
            children: Vec::new(),
            parent,
            flags: CellFlags::new(true),
            parent_info: ParentInfo::default(),
            sibling_group: Estimate::Uncomputed,
            splits_before_extend: 0,
            error: 0.0,
            generation: 0,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool
    {
        self.flags.is_leaf()
    }

    #[inline]
    pub fn switch_to_parent_estimation(&self) -> bool
    {
        self.flags.switch_to_parent_estimation()
    }

    #[inline]
    pub fn considered(&self) -> bool
    {
        self.flags.considered()
    }

    ///
    /// Start a new generation: the cell must be evaluated and estimated again.
    ///
    pub fn invalidate(&mut self)
    {
        self.flags.set_considered(false);
        self.parent_info.invalidate();
        self.sibling_group.reset();
        self.generation += 1;
    }
}

#[test]
fn check_cell_flags()
{
    let mut flags = CellFlags::new(true);
    assert!(flags.is_leaf());
    assert!(!flags.considered());
    flags.set_switch_to_parent_estimation(true);
    flags.set_is_leaf(false);
    assert!(flags.switch_to_parent_estimation());
    assert!(!flags.is_leaf());
}

#[test]
fn check_parent_info_invalidate()
{
    let mut info = ParentInfo::default();
    info.benefit_split.set(2.0);
    info.benefit_extend.set(1.0);
    info.extend_parent_integral.set(vec![1.0]);
    assert!(info.is_complete());
    assert_eq!(info.benefit_split.value(), Some(2.0));
    info.invalidate();
    assert!(!info.is_complete());
    assert_eq!(info.extend_parent_integral, Estimate::Uncomputed);
}
