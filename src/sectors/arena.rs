//! Slot arena owning every node of a sector index.
//!
//! Children and parents are stored as [`NodeId`] handles, so a parent link never owns
//! anything. Freed slots are recycled through a free list.

use std::ops::{Index, IndexMut};

use super::sector::{Color, Sector};

/// Handle of a node inside a [`SectorArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A sector plus its tree links.
#[derive(Debug, Clone)]
pub struct SectorNode {
    sector: Sector,
    color: Color,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) parent: Option<NodeId>,
}

impl SectorNode {
    pub fn sector(&self) -> &Sector {
        &self.sector
    }

    pub fn code(&self) -> &str {
        &self.sector.code
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn is_red(&self) -> bool {
        self.color == Color::Red
    }

    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    pub fn right(&self) -> Option<NodeId> {
        self.right
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub(crate) fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    fn child_count(&self) -> usize {
        usize::from(self.left.is_some()) + usize::from(self.right.is_some())
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.child_count() == 0
    }
}

#[derive(Debug, Default)]
pub struct SectorArena {
    slots: Vec<Option<SectorNode>>,
    free: Vec<usize>,
    len: usize,
}

impl SectorArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocates a red, unlinked node.
    pub fn alloc(&mut self, sector: Sector, parent: Option<NodeId>) -> NodeId {
        let node = SectorNode {
            sector,
            color: Color::Red,
            left: None,
            right: None,
            parent,
        };
        self.len += 1;
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    /// Releases a node. Its links are not touched; the caller unhooks it first.
    pub fn release(&mut self, id: NodeId) -> Sector {
        match self.slots.get_mut(id.0).and_then(Option::take) {
            Some(node) => {
                self.free.push(id.0);
                self.len -= 1;
                node.sector
            }
            None => panic!("release of dangling sector handle {id:?}"),
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&SectorNode> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Exchanges the sector data of two nodes, leaving links and colors in place.
    pub fn swap_sectors(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        let sector_a = self[a].sector.clone();
        let sector_b = std::mem::replace(&mut self[b].sector, sector_a);
        self[a].sector = sector_b;
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.len = 0;
    }
}

impl Index<NodeId> for SectorArena {
    type Output = SectorNode;

    fn index(&self, id: NodeId) -> &SectorNode {
        match self.get(id) {
            Some(node) => node,
            None => panic!("dangling sector handle {id:?}"),
        }
    }
}

impl IndexMut<NodeId> for SectorArena {
    fn index_mut(&mut self, id: NodeId) -> &mut SectorNode {
        match self.slots.get_mut(id.0).and_then(Option::as_mut) {
            Some(node) => node,
            None => panic!("dangling sector handle {id:?}"),
        }
    }
}
