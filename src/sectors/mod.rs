//! Binary search trees over space sectors, keyed by (x, y, z).
//!
//! Two variants share the node arena and the read-only surface defined by [`SectorIndex`]:
//! [`UnbalancedSectorIndex`] is a plain BST that finds paths through parent links, and
//! [`BalancedSectorIndex`] is a left-leaning red-black tree that finds paths through the
//! lowest common ancestor of two root-to-node paths.

pub mod arena;
pub mod bst;
pub mod llrb;
pub mod sector;

pub use arena::{NodeId, SectorArena, SectorNode};
pub use bst::UnbalancedSectorIndex;
pub use llrb::BalancedSectorIndex;
pub use sector::{Color, REFERENCE_CODE, Sector, SectorKey};

use std::cmp::Ordering;
use std::collections::VecDeque;

use crate::error::InvariantViolation;

/// Depth-first visiting order used by [`SectorIndex::traverse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalOrder {
    InOrder,
    PreOrder,
    PostOrder,
}

/// Operations common to both sector indexes.
pub trait SectorIndex {
    fn arena(&self) -> &SectorArena;

    fn root(&self) -> Option<NodeId>;

    /// Inserts the sector at `(x, y, z)`. Returns `false` when those coordinates are already
    /// present; the tree is left unchanged in that case.
    fn insert(&mut self, x: i32, y: i32, z: i32) -> bool;

    /// Removes the sector with the given code and returns its data, or `None` if no sector
    /// carries that code.
    fn delete(&mut self, code: &str) -> Option<Sector>;

    /// The sectors visited when travelling from the reference sector to `code`.
    /// Empty when either end is missing.
    fn stellar_path(&self, code: &str) -> Vec<&Sector>;

    /// Drops every node, children before parents.
    fn clear(&mut self);

    fn len(&self) -> usize {
        self.arena().len()
    }

    fn is_empty(&self) -> bool {
        self.root().is_none()
    }

    fn node(&self, id: NodeId) -> &SectorNode {
        &self.arena()[id]
    }

    /// Breadth-first search for the first node carrying `code`.
    ///
    /// The code is not the sort key, so the whole tree may be visited.
    fn locate(&self, code: &str) -> Option<NodeId> {
        let arena = self.arena();
        let mut queue: VecDeque<NodeId> = self.root().into_iter().collect();
        while let Some(id) = queue.pop_front() {
            let node = &arena[id];
            if node.code() == code {
                return Some(id);
            }
            queue.extend(node.left);
            queue.extend(node.right);
        }
        None
    }

    fn find_by_code(&self, code: &str) -> Option<&Sector> {
        self.locate(code).map(|id| self.arena()[id].sector())
    }

    fn contains_code(&self, code: &str) -> bool {
        self.locate(code).is_some()
    }

    fn traverse(&self, order: TraversalOrder) -> Vec<&SectorNode> {
        let mut ids = Vec::with_capacity(self.len());
        collect_ids(self.arena(), self.root(), order, &mut ids);
        ids.into_iter().map(|id| &self.arena()[id]).collect()
    }

    fn in_order(&self) -> Vec<&SectorNode> {
        self.traverse(TraversalOrder::InOrder)
    }

    fn pre_order(&self) -> Vec<&SectorNode> {
        self.traverse(TraversalOrder::PreOrder)
    }

    fn post_order(&self) -> Vec<&SectorNode> {
        self.traverse(TraversalOrder::PostOrder)
    }

    fn codes(&self, order: TraversalOrder) -> Vec<String> {
        self.traverse(order)
            .into_iter()
            .map(|node| node.code().to_string())
            .collect()
    }

    /// Inserts every coordinate triple in order, returning how many were new.
    fn extend_from_coordinates<I>(&mut self, coordinates: I) -> usize
    where
        I: IntoIterator<Item = SectorKey>,
        Self: Sized,
    {
        coordinates
            .into_iter()
            .filter(|&(x, y, z)| self.insert(x, y, z))
            .count()
    }
}

enum Visit {
    Expand(NodeId),
    Emit(NodeId),
}

/// Depth-first walk with an explicit stack; an unbalanced index can be as deep as it is long.
fn collect_ids(arena: &SectorArena, root: Option<NodeId>, order: TraversalOrder, out: &mut Vec<NodeId>) {
    let mut stack: Vec<Visit> = root.map(Visit::Expand).into_iter().collect();
    while let Some(visit) = stack.pop() {
        let id = match visit {
            Visit::Emit(id) => {
                out.push(id);
                continue;
            }
            Visit::Expand(id) => id,
        };
        let (left, right) = (arena[id].left.map(Visit::Expand), arena[id].right.map(Visit::Expand));
        // Pushed in reverse of the order they are handled.
        match order {
            TraversalOrder::PreOrder => stack.extend([right, left, Some(Visit::Emit(id))].into_iter().flatten()),
            TraversalOrder::InOrder => stack.extend([right, Some(Visit::Emit(id)), left].into_iter().flatten()),
            TraversalOrder::PostOrder => stack.extend([Some(Visit::Emit(id)), right, left].into_iter().flatten()),
        }
    }
}

/// Releases the subtree under `root` in post-order.
pub(crate) fn release_subtree(arena: &mut SectorArena, root: Option<NodeId>) {
    let mut ids = Vec::with_capacity(arena.len());
    collect_ids(arena, root, TraversalOrder::PostOrder, &mut ids);
    for id in ids {
        arena.release(id);
    }
    debug_assert!(arena.is_empty(), "unreachable nodes left in the arena");
    arena.clear();
}

/// Checks strict (x, y, z) ordering, parent back-links and that every arena node is reachable.
pub(crate) fn check_links(arena: &SectorArena, root: Option<NodeId>) -> Result<(), InvariantViolation> {
    if let Some(root_id) = root {
        if arena[root_id].parent.is_some() {
            return Err(InvariantViolation(format!("root {} has a parent", arena[root_id].code())));
        }
    }

    let mut ids = Vec::with_capacity(arena.len());
    collect_ids(arena, root, TraversalOrder::InOrder, &mut ids);
    if ids.len() != arena.len() {
        return Err(InvariantViolation(format!(
            "{} nodes reachable from the root, {} allocated",
            ids.len(),
            arena.len()
        )));
    }

    for pair in ids.windows(2) {
        let (a, b) = (arena[pair[0]].sector(), arena[pair[1]].sector());
        if a.key().cmp(&b.key()) != Ordering::Less {
            return Err(InvariantViolation(format!("{:?} is not before {:?} in key order", a.key(), b.key())));
        }
    }

    for &id in &ids {
        for child in [arena[id].left, arena[id].right].into_iter().flatten() {
            if arena[child].parent != Some(id) {
                return Err(InvariantViolation(format!(
                    "{} does not point back to its parent {}",
                    arena[child].code(),
                    arena[id].code()
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::Rng;

    use super::SectorKey;

    /// Random coordinates in a small cube so that duplicates and shared codes show up.
    pub fn random_coordinates(seed: u64, count: usize) -> Vec<SectorKey> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| (rng.gen_range(-6..=6), rng.gen_range(-6..=6), rng.gen_range(-6..=6)))
            .collect()
    }

    pub fn shuffled<T>(seed: u64, mut items: Vec<T>) -> Vec<T> {
        let mut rng = StdRng::seed_from_u64(seed);
        items.shuffle(&mut rng);
        items
    }
}
