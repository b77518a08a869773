//! Indexed binary min-heap of putative reaction times.
//!
//! Every reaction owns one slot whose key can be changed in O(log n).
//! Ties on the key are broken by the lower reaction index, so the
//! ordering is total and the minimum is deterministic.

use std::cmp::Ordering;

#[derive(Debug, Clone, Default)]
pub struct IndexedPriorityQueue {
    keys: Vec<f64>,
    heap: Vec<usize>,
    positions: Vec<usize>,
}

impl IndexedPriorityQueue {
    pub fn new(keys: Vec<f64>) -> Self {
        let n = keys.len();
        let mut q = Self {
            keys,
            heap: (0..n).collect(),
            positions: (0..n).collect(),
        };
        for pos in (0..n / 2).rev() {
            q.sift_down(pos);
        }
        q
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn key(&self, index: usize) -> f64 {
        self.keys[index]
    }

    /// Reaction index and key of the minimum.
    pub fn min(&self) -> Option<(usize, f64)> {
        self.heap.first().map(|&i| (i, self.keys[i]))
    }

    pub fn update(&mut self, index: usize, key: f64) {
        let old = self.keys[index];
        self.keys[index] = key;
        let pos = self.positions[index];
        match key.total_cmp(&old) {
            Ordering::Less => self.sift_up(pos),
            Ordering::Greater => self.sift_down(pos),
            Ordering::Equal => {}
        }
    }

    fn less(&self, a: usize, b: usize) -> bool {
        let (ia, ib) = (self.heap[a], self.heap[b]);
        match self.keys[ia].total_cmp(&self.keys[ib]) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => ia < ib,
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.positions[self.heap[a]] = a;
        self.positions[self.heap[b]] = b;
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.less(pos, parent) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let n = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut smallest = pos;
            if left < n && self.less(left, smallest) {
                smallest = left;
            }
            if right < n && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == pos {
                break;
            }
            self.swap(pos, smallest);
            pos = smallest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn naive_min(keys: &[f64]) -> Option<(usize, f64)> {
        keys.iter()
            .copied()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let q = IndexedPriorityQueue::new(vec![2.0, 1.0, 1.0, f64::INFINITY]);
        assert_eq!(q.min(), Some((1, 1.0)));
    }

    #[test]
    fn update_reorders() {
        let mut q = IndexedPriorityQueue::new(vec![3.0, 2.0, 1.0]);
        q.update(2, f64::INFINITY);
        assert_eq!(q.min(), Some((1, 2.0)));
        q.update(0, 0.5);
        assert_eq!(q.min(), Some((0, 0.5)));
        assert_eq!(q.key(2), f64::INFINITY);
        assert!(IndexedPriorityQueue::new(Vec::new()).min().is_none());
    }

    proptest! {
        #[test]
        fn min_matches_linear_scan(
            keys in prop::collection::vec(0.0f64..10.0, 1..40),
            updates in prop::collection::vec((0usize..40, 0.0f64..10.0), 0..60),
        ) {
            let mut keys = keys;
            let mut q = IndexedPriorityQueue::new(keys.clone());
            prop_assert_eq!(q.min(), naive_min(&keys));
            for (i, k) in updates {
                let i = i % keys.len();
                keys[i] = k;
                q.update(i, k);
                prop_assert_eq!(q.min(), naive_min(&keys));
            }
        }
    }
}
