//! Balanced sector index: a left-leaning red-black tree.
//!
//! Insertion and deletion are recursive and return the new root of the subtree they were
//! given; the caller re-links that root, which also refreshes its parent handle. Red links
//! only ever lean left once a top-level operation has returned, and the root is black.

use std::cmp::Ordering;
use tracing::{debug, warn};

use super::{
    NodeId, SectorArena, SectorIndex, check_links, release_subtree,
    sector::{Color, REFERENCE_CODE, Sector, SectorKey},
};
use crate::error::InvariantViolation;

#[derive(Debug, Default)]
pub struct BalancedSectorIndex {
    arena: SectorArena,
    root: Option<NodeId>,
}

impl BalancedSectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path from the reference sector to `code` through their lowest common ancestor.
    ///
    /// Both ends are located with a root-to-node search; the result climbs from the reference
    /// sector up to (not including) the ancestor, then descends from the ancestor to the
    /// target. This is a path through the tree, not a geometric route.
    pub fn path_to(&self, code: &str) -> Vec<&Sector> {
        let (Some(reference_path), Some(target_path)) =
            (self.root_path(REFERENCE_CODE), self.root_path(code))
        else {
            warn!(code, "Stellar path endpoint not found");
            return Vec::new();
        };

        // Both paths start at the root, so they share at least one node.
        let shared = reference_path
            .iter()
            .zip(&target_path)
            .take_while(|(a, b)| a == b)
            .count();
        let ancestor = shared - 1;

        reference_path[ancestor + 1..]
            .iter()
            .rev()
            .chain(&target_path[ancestor..])
            .map(|&id| self.arena[id].sector())
            .collect()
    }

    /// Every LLRB property plus the structural checks shared with the plain BST.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        check_links(&self.arena, self.root)?;
        if let Some(root) = self.root {
            if self.arena[root].is_red() {
                return Err(InvariantViolation("root is red".to_string()));
            }
        }
        self.black_height(self.root).map(|_| ())
    }

    /// Nodes from the root down to the first node carrying `code` in pre-order.
    fn root_path(&self, code: &str) -> Option<Vec<NodeId>> {
        let mut path = Vec::new();
        self.collect_root_path(self.root, code, &mut path).then_some(path)
    }

    fn collect_root_path(&self, node: Option<NodeId>, code: &str, path: &mut Vec<NodeId>) -> bool {
        let Some(id) = node else { return false };
        path.push(id);
        let node = &self.arena[id];
        if node.code() == code
            || self.collect_root_path(node.left, code, path)
            || self.collect_root_path(node.right, code, path)
        {
            return true;
        }
        path.pop();
        false
    }

    fn black_height(&self, node: Option<NodeId>) -> Result<usize, InvariantViolation> {
        let Some(id) = node else { return Ok(1) };
        let node = &self.arena[id];
        if self.is_red(node.right) {
            return Err(InvariantViolation(format!("{} has a red right link", node.code())));
        }
        if node.is_red() && self.is_red(node.left) {
            return Err(InvariantViolation(format!("{} and its left child are both red", node.code())));
        }
        let left = self.black_height(node.left)?;
        let right = self.black_height(node.right)?;
        if left != right {
            return Err(InvariantViolation(format!(
                "black height differs under {} ({left} left, {right} right)",
                node.code()
            )));
        }
        Ok(left + usize::from(!node.is_red()))
    }

    fn is_red(&self, node: Option<NodeId>) -> bool {
        node.is_some_and(|id| self.arena[id].is_red())
    }

    fn left(&self, node: Option<NodeId>) -> Option<NodeId> {
        node.and_then(|id| self.arena[id].left)
    }

    fn key(&self, id: NodeId) -> SectorKey {
        self.arena[id].sector().key()
    }

    fn set_left(&mut self, node: NodeId, child: Option<NodeId>) {
        self.arena[node].left = child;
        if let Some(child) = child {
            self.arena[child].parent = Some(node);
        }
    }

    fn set_right(&mut self, node: NodeId, child: Option<NodeId>) {
        self.arena[node].right = child;
        if let Some(child) = child {
            self.arena[child].parent = Some(node);
        }
    }

    fn rotate_left(&mut self, h: NodeId) -> NodeId {
        let Some(x) = self.arena[h].right else {
            panic!("rotate_left on {} which has no right child", self.arena[h].code());
        };
        let parent = self.arena[h].parent;
        let inner = self.arena[x].left;
        self.set_right(h, inner);
        self.set_left(x, Some(h));
        self.arena[x].parent = parent;
        let color = self.arena[h].color();
        self.arena[x].set_color(color);
        self.arena[h].set_color(Color::Red);
        x
    }

    fn rotate_right(&mut self, h: NodeId) -> NodeId {
        let Some(x) = self.arena[h].left else {
            panic!("rotate_right on {} which has no left child", self.arena[h].code());
        };
        let parent = self.arena[h].parent;
        let inner = self.arena[x].right;
        self.set_left(h, inner);
        self.set_right(x, Some(h));
        self.arena[x].parent = parent;
        let color = self.arena[h].color();
        self.arena[x].set_color(color);
        self.arena[h].set_color(Color::Red);
        x
    }

    fn flip_colors(&mut self, h: NodeId) {
        let node = &self.arena[h];
        let (left, right) = (node.left, node.right);
        debug_assert!(left.is_some() && right.is_some(), "flip_colors needs two children");
        for id in [Some(h), left, right].into_iter().flatten() {
            let color = self.arena[id].color().flipped();
            self.arena[id].set_color(color);
        }
    }

    /// Restores the left-leaning shape on the way back up.
    fn rebalance(&mut self, mut h: NodeId) -> NodeId {
        if self.is_red(self.arena[h].right) && !self.is_red(self.arena[h].left) {
            h = self.rotate_left(h);
        }
        if self.is_red(self.arena[h].left) && self.is_red(self.left(self.arena[h].left)) {
            h = self.rotate_right(h);
        }
        if self.is_red(self.arena[h].left) && self.is_red(self.arena[h].right) {
            self.flip_colors(h);
        }
        h
    }

    fn insert_at(
        &mut self,
        node: Option<NodeId>,
        parent: Option<NodeId>,
        key: SectorKey,
        inserted: &mut bool,
    ) -> NodeId {
        let Some(h) = node else {
            *inserted = true;
            let (x, y, z) = key;
            return self.arena.alloc(Sector::new(x, y, z), parent);
        };

        match key.cmp(&self.key(h)) {
            Ordering::Less => {
                let left = self.arena[h].left;
                let child = self.insert_at(left, Some(h), key, inserted);
                self.set_left(h, Some(child));
            }
            Ordering::Greater => {
                let right = self.arena[h].right;
                let child = self.insert_at(right, Some(h), key, inserted);
                self.set_right(h, Some(child));
            }
            Ordering::Equal => debug!(?key, "Ignoring duplicate sector"),
        }
        self.rebalance(h)
    }

    fn move_red_left(&mut self, mut h: NodeId) -> NodeId {
        self.flip_colors(h);
        let right = self.arena[h].right;
        if self.is_red(self.left(right)) {
            if let Some(right) = right {
                let rotated = self.rotate_right(right);
                self.set_right(h, Some(rotated));
            }
            h = self.rotate_left(h);
            self.flip_colors(h);
        }
        h
    }

    fn move_red_right(&mut self, mut h: NodeId) -> NodeId {
        self.flip_colors(h);
        if self.is_red(self.left(self.arena[h].left)) {
            h = self.rotate_right(h);
            self.flip_colors(h);
        }
        h
    }

    /// Removes the minimum of the subtree under `h`, storing its data in `removed`.
    fn delete_min(&mut self, mut h: NodeId, removed: &mut Option<Sector>) -> Option<NodeId> {
        if self.arena[h].left.is_none() {
            debug_assert!(self.arena[h].is_leaf(), "minimum with a right child");
            *removed = Some(self.arena.release(h));
            return None;
        }
        let left = self.arena[h].left;
        if !self.is_red(left) && !self.is_red(self.left(left)) {
            h = self.move_red_left(h);
        }
        let left = self.arena[h].left;
        let child = left.and_then(|l| self.delete_min(l, removed));
        self.set_left(h, child);
        Some(self.rebalance(h))
    }

    fn delete_at(&mut self, mut h: NodeId, key: SectorKey, removed: &mut Option<Sector>) -> Option<NodeId> {
        if key < self.key(h) {
            let left = self.arena[h].left;
            if !self.is_red(left) && !self.is_red(self.left(left)) {
                h = self.move_red_left(h);
            }
            let left = self.arena[h].left;
            let child = left.and_then(|l| self.delete_at(l, key, removed));
            self.set_left(h, child);
        } else {
            if self.is_red(self.arena[h].left) {
                h = self.rotate_right(h);
            }
            if key == self.key(h) && self.arena[h].right.is_none() {
                *removed = Some(self.arena.release(h));
                return None;
            }
            let right = self.arena[h].right;
            if !self.is_red(right) && !self.is_red(self.left(right)) {
                h = self.move_red_right(h);
            }
            let right = self.arena[h].right;
            if key == self.key(h) {
                // Trade data with the in-order successor, then drop the successor's node.
                let child = right.and_then(|r| {
                    let successor = self.min_node(r);
                    self.arena.swap_sectors(h, successor);
                    self.delete_min(r, removed)
                });
                self.set_right(h, child);
            } else {
                let child = right.and_then(|r| self.delete_at(r, key, removed));
                self.set_right(h, child);
            }
        }
        Some(self.rebalance(h))
    }

    fn min_node(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.arena[id].left {
            id = left;
        }
        id
    }

    /// Detaches the root from any stale parent handle and paints it black.
    fn settle_root(&mut self) {
        if let Some(root) = self.root {
            self.arena[root].parent = None;
            self.arena[root].set_color(Color::Black);
        }
        debug_assert!(
            self.check_invariants().is_ok(),
            "LLRB invariants violated: {:?}",
            self.check_invariants()
        );
    }
}

impl SectorIndex for BalancedSectorIndex {
    fn arena(&self) -> &SectorArena {
        &self.arena
    }

    fn root(&self) -> Option<NodeId> {
        self.root
    }

    fn insert(&mut self, x: i32, y: i32, z: i32) -> bool {
        let mut inserted = false;
        let root = self.insert_at(self.root, None, (x, y, z), &mut inserted);
        self.root = Some(root);
        self.settle_root();
        inserted
    }

    fn delete(&mut self, code: &str) -> Option<Sector> {
        let (Some(target), Some(root)) = (self.locate(code), self.root) else {
            warn!(code, "Sector not found, nothing deleted");
            return None;
        };
        let key = self.key(target);

        if !self.is_red(self.arena[root].left) && !self.is_red(self.arena[root].right) {
            self.arena[root].set_color(Color::Red);
        }
        let mut removed = None;
        self.root = self.delete_at(root, key, &mut removed);
        self.settle_root();

        if let Some(sector) = &removed {
            debug!(code = %sector.code, remaining = self.arena.len(), "Deleted sector");
        }
        removed
    }

    fn stellar_path(&self, code: &str) -> Vec<&Sector> {
        self.path_to(code)
    }

    fn clear(&mut self) {
        release_subtree(&mut self.arena, self.root.take());
    }
}
