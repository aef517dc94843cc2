//! This module contains utility structures for managing k-best elements using a binary heap.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use ordered_float::OrderedFloat; // For using f64 in BinaryHeap

/// Represents an element in the KBestNeighbors heap, pairing a distance with data.
///
/// `sequence` records the order in which candidates were offered, so equal distances keep
/// their encounter order.
#[derive(Debug)]
pub struct HeapElement<P> {
    pub distance: OrderedFloat<f64>,
    pub sequence: usize,
    pub data: P,
}

impl<P> HeapElement<P> {
    fn rank(&self) -> (OrderedFloat<f64>, usize) {
        (self.distance, self.sequence)
    }
}

impl<P> PartialEq for HeapElement<P> {
    fn eq(&self, other: &Self) -> bool {
        self.rank() == other.rank()
    }
}
impl<P> Eq for HeapElement<P> {}

impl<P> PartialOrd for HeapElement<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for HeapElement<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap on (distance, sequence): the top is the worst neighbor kept so far,
        // and among equal distances the one seen last.
        self.rank().cmp(&other.rank())
    }
}

/// Manages a collection of the K "best" (smallest distance) items seen so far.
#[derive(Debug)]
pub struct KBestNeighbors<P> {
    capacity: usize,
    offered: usize,
    heap: BinaryHeap<HeapElement<P>>,
}

impl<P> KBestNeighbors<P> {
    pub fn new(capacity: usize) -> Self {
        KBestNeighbors {
            capacity,
            offered: 0,
            heap: BinaryHeap::with_capacity(capacity + 1), // +1 for easier logic
        }
    }

    pub fn add(&mut self, distance: f64, point_data: P) {
        if self.capacity == 0 { return; }
        let item = HeapElement { distance: OrderedFloat(distance), sequence: self.offered, data: point_data };
        self.offered += 1;
        if self.heap.len() < self.capacity {
            self.heap.push(item);
        } else if self.heap.peek().is_some_and(|worst| item.distance < worst.distance) {
            // A later candidate at the same distance never displaces an earlier one.
            self.heap.pop();
            self.heap.push(item);
        }
    }

    pub fn current_farthest_distance(&self) -> Option<f64> {
        if self.heap.len() == self.capacity {
            self.heap.peek().map(|heap_elem| heap_elem.distance.0)
        } else {
            None // Not full yet, effectively infinite radius for pruning
        }
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() == self.capacity
    }

    /// Kept items with their distances, nearest first.
    pub fn into_sorted(self) -> Vec<(f64, P)> {
        self.heap.into_sorted_vec().into_iter().map(|elem| (elem.distance.0, elem.data)).collect()
    }

    /// Returns the current number of neighbors stored.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::KBestNeighbors;

    #[test]
    fn test_k_best_neighbors_logic() {
        let mut k_best = KBestNeighbors::new(3); // Keep 3 best (smallest distance)

        k_best.add(10.0, "P10");
        k_best.add(5.0, "P5");
        k_best.add(12.0, "P12");

        assert_eq!(k_best.len(), 3);
        assert_eq!(k_best.current_farthest_distance(), Some(12.0)); // Farthest of the 3 best

        k_best.add(4.0, "P4"); // P4 (4.0) displaces P12 (12.0)
        assert_eq!(k_best.len(), 3);
        assert_eq!(k_best.current_farthest_distance(), Some(10.0));

        k_best.add(15.0, "P15"); // Not better than P10
        assert_eq!(k_best.len(), 3);
        assert_eq!(k_best.current_farthest_distance(), Some(10.0));

        let sorted_points: Vec<_> = k_best.into_sorted().into_iter().map(|(_, p)| p).collect();
        assert_eq!(sorted_points, vec!["P4", "P5", "P10"]);
    }

    #[test]
    fn test_not_full_has_no_pruning_radius() {
        let mut k_best = KBestNeighbors::new(2);
        assert!(k_best.is_empty());
        k_best.add(1.0, 'a');
        assert!(!k_best.is_full());
        assert_eq!(k_best.current_farthest_distance(), None);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut k_best = KBestNeighbors::new(0);
        k_best.add(1.0, 'a');
        assert!(k_best.is_empty());
        assert!(k_best.into_sorted().is_empty());
    }

    #[test]
    fn test_ties_keep_encounter_order() {
        let mut k_best = KBestNeighbors::new(3);
        k_best.add(2.0, "first");
        k_best.add(1.0, "near");
        k_best.add(2.0, "second");
        k_best.add(2.0, "third"); // Same distance as the worst kept: rejected
        assert_eq!(k_best.into_sorted(), vec![(1.0, "near"), (2.0, "first"), (2.0, "second")]);

        let mut k_best = KBestNeighbors::new(2);
        k_best.add(2.0, "first");
        k_best.add(2.0, "second");
        k_best.add(1.0, "near"); // Evicts the later of the tied pair
        assert_eq!(k_best.into_sorted(), vec![(1.0, "near"), (2.0, "first")]);
    }
}
