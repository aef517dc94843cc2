//! Unbalanced sector index: a plain binary search tree with parent links.

use std::cmp::Ordering;
use tracing::{debug, warn};

use super::{
    NodeId, SectorArena, SectorIndex, check_links, release_subtree,
    sector::Sector,
};
use crate::error::InvariantViolation;

#[derive(Debug, Default)]
pub struct UnbalancedSectorIndex {
    arena: SectorArena,
    root: Option<NodeId>,
}

impl UnbalancedSectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path from the reference sector down to `code`, rebuilt by following parent links up
    /// from the target and reversing.
    ///
    /// Empty when `code` is absent or the reference sector is not one of its ancestors.
    pub fn path_from_root_to(&self, code: &str) -> Vec<&Sector> {
        let Some(target) = self.locate(code) else {
            warn!(code, "Stellar path target not found");
            return Vec::new();
        };

        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(id) = cursor {
            let node = &self.arena[id];
            path.push(node.sector());
            if node.sector().is_reference() {
                path.reverse();
                return path;
            }
            cursor = node.parent;
        }
        warn!(code, "Reference sector is not an ancestor of the target");
        Vec::new()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        check_links(&self.arena, self.root)
    }

    fn min_node(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.arena[id].left {
            id = left;
        }
        id
    }

    /// Points whichever link of `parent` held `old` (or the root) at `new`.
    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(p) if self.arena[p].left == Some(old) => self.arena[p].left = new,
            Some(p) => self.arena[p].right = new,
        }
    }

    /// Removes a node with at most one child, splicing that child into its place.
    fn unlink(&mut self, id: NodeId) -> Sector {
        let node = &self.arena[id];
        debug_assert!(
            node.left.is_none() || node.right.is_none(),
            "unlink called on a node with two children"
        );
        let (parent, child) = (node.parent, node.left.or(node.right));
        self.replace_child(parent, id, child);
        if let Some(child) = child {
            self.arena[child].parent = parent;
        }
        self.arena.release(id)
    }
}

impl SectorIndex for UnbalancedSectorIndex {
    fn arena(&self) -> &SectorArena {
        &self.arena
    }

    fn root(&self) -> Option<NodeId> {
        self.root
    }

    fn insert(&mut self, x: i32, y: i32, z: i32) -> bool {
        let key = (x, y, z);
        let mut parent: Option<(NodeId, Ordering)> = None;
        let mut cursor = self.root;

        while let Some(id) = cursor {
            let node = &self.arena[id];
            let side = key.cmp(&node.sector().key());
            cursor = match side {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => {
                    debug!(?key, "Ignoring duplicate sector");
                    return false;
                }
            };
            parent = Some((id, side));
        }

        let id = self.arena.alloc(Sector::new(x, y, z), parent.map(|(p, _)| p));
        match parent {
            None => self.root = Some(id),
            Some((p, Ordering::Less)) => self.arena[p].left = Some(id),
            Some((p, _)) => self.arena[p].right = Some(id),
        }
        true
    }

    fn delete(&mut self, code: &str) -> Option<Sector> {
        let Some(target) = self.locate(code) else {
            warn!(code, "Sector not found, nothing deleted");
            return None;
        };

        let node = &self.arena[target];
        let removed = match (node.left, node.right) {
            (Some(_), Some(right)) => {
                // The successor has no left child, so unlinking it is a 0/1-child removal.
                let successor = self.min_node(right);
                self.arena.swap_sectors(target, successor);
                self.unlink(successor)
            }
            _ => self.unlink(target),
        };
        debug!(code = %removed.code, remaining = self.arena.len(), "Deleted sector");
        Some(removed)
    }

    fn stellar_path(&self, code: &str) -> Vec<&Sector> {
        self.path_from_root_to(code)
    }

    fn clear(&mut self) {
        release_subtree(&mut self.arena, self.root.take());
    }
}
