//! Fixed-capacity ring buffer of `(time, value)` samples.
//!
//! Once full, each insert overwrites the oldest sample. External indices
//! run from the oldest stored sample (0) to the newest. The mean of the
//! stored values is maintained incrementally and recomputed exactly once
//! per `capacity` inserts to stop rounding drift.

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone)]
pub struct SlidingWindow {
    times: Vec<f64>,
    values: Vec<f64>,
    next: usize,
    len: usize,
    min_index: usize,
    last_time: f64,
    average: f64,
    inserts_since_exact: usize,
    last_nonzero_time: Option<f64>,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> SimResult<Self> {
        if capacity == 0 {
            return Err(SimError::invalid_arg("sliding window capacity must be positive"));
        }
        Ok(Self {
            times: vec![0.0; capacity],
            values: vec![0.0; capacity],
            next: 0,
            len: 0,
            min_index: 0,
            last_time: 0.0,
            average: 0.0,
            inserts_since_exact: 0,
            last_nonzero_time: None,
        })
    }

    pub fn capacity(&self) -> usize {
        self.times.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.times.fill(0.0);
        self.values.fill(0.0);
        self.next = 0;
        self.len = 0;
        self.min_index = 0;
        self.last_time = 0.0;
        self.average = 0.0;
        self.inserts_since_exact = 0;
        self.last_nonzero_time = None;
    }

    pub fn insert(&mut self, time: f64, value: f64) {
        let capacity = self.capacity();
        let mut total = self.average * self.len as f64;

        if self.len < capacity {
            if self.len == 0 {
                self.min_index = self.next;
            }
            self.len += 1;
        } else {
            total -= self.values[self.next];
            self.min_index = (self.next + 1) % capacity;
        }

        self.times[self.next] = time;
        self.values[self.next] = value;
        self.next = (self.next + 1) % capacity;
        self.last_time = time;

        if value > 0.0 {
            self.last_nonzero_time = Some(time);
        } else if self
            .last_nonzero_time
            .is_some_and(|t| t < self.times[self.min_index])
        {
            self.last_nonzero_time = None;
        }

        self.inserts_since_exact += 1;
        if self.inserts_since_exact <= capacity {
            self.average = (total + value) / self.len as f64;
        } else {
            self.average = self.exact_average();
            self.inserts_since_exact = 0;
        }
    }

    fn internal_index(&self, index: usize) -> SimResult<usize> {
        if index >= self.len {
            return Err(SimError::illegal_state(format!(
                "no sample stored at history index {index} (holding {})",
                self.len
            )));
        }
        if self.len == self.capacity() {
            Ok((self.next + index) % self.capacity())
        } else {
            Ok(index)
        }
    }

    pub fn value(&self, index: usize) -> SimResult<f64> {
        Ok(self.values[self.internal_index(index)?])
    }

    pub fn time(&self, index: usize) -> SimResult<f64> {
        Ok(self.times[self.internal_index(index)?])
    }

    /// Time of the oldest stored sample.
    pub fn min_time(&self) -> f64 {
        self.times[self.min_index]
    }

    pub fn last_time(&self) -> f64 {
        self.last_time
    }

    pub fn average(&self) -> f64 {
        self.average
    }

    /// True if some stored sample is positive.
    pub fn has_nonzero_value(&self) -> bool {
        self.last_nonzero_time.is_some()
    }

    fn exact_average(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        let total: f64 = (0..self.len)
            .map(|i| self.values[(self.min_index + i) % self.capacity()])
            .sum();
        total / self.len as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(SlidingWindow::new(0).is_err());
    }

    #[test]
    fn overwrites_oldest_first() {
        let mut w = SlidingWindow::new(3).unwrap();
        for i in 0..5 {
            w.insert(i as f64, 10.0 * i as f64);
        }
        assert_eq!(w.len(), 3);
        assert_eq!(w.min_time(), 2.0);
        assert_eq!(w.last_time(), 4.0);
        assert_eq!(w.value(0).unwrap(), 20.0);
        assert_eq!(w.value(2).unwrap(), 40.0);
        assert!(w.value(3).is_err());
        assert!((w.average() - 30.0).abs() < 1e-12);
    }

    #[test]
    fn partial_fill_reads_in_order() {
        let mut w = SlidingWindow::new(10).unwrap();
        w.insert(0.5, 1.0);
        w.insert(1.0, 3.0);
        assert_eq!(w.time(1).unwrap(), 1.0);
        assert!(matches!(w.value(2), Err(SimError::IllegalState { .. })));
        assert_eq!(w.average(), 2.0);
        w.clear();
        assert!(w.is_empty());
        assert!(!w.has_nonzero_value());
    }

    #[test]
    fn nonzero_tracking_expires() {
        let mut w = SlidingWindow::new(2).unwrap();
        w.insert(0.0, 1.0);
        assert!(w.has_nonzero_value());
        w.insert(1.0, 0.0);
        assert!(w.has_nonzero_value());
        w.insert(2.0, 0.0);
        assert!(!w.has_nonzero_value());
    }

    proptest! {
        #[test]
        fn window_matches_last_n(
            capacity in 1usize..20,
            values in prop::collection::vec(0.0f64..1000.0, 1..80),
        ) {
            let mut w = SlidingWindow::new(capacity).unwrap();
            for (i, v) in values.iter().enumerate() {
                w.insert(i as f64, *v);
            }
            let kept = &values[values.len().saturating_sub(capacity)..];
            prop_assert_eq!(w.len(), kept.len());
            for (i, v) in kept.iter().enumerate() {
                prop_assert_eq!(w.value(i).unwrap(), *v);
            }
            let first = (values.len() - kept.len()) as f64;
            prop_assert_eq!(w.min_time(), first);
            let mean = kept.iter().sum::<f64>() / kept.len() as f64;
            prop_assert!((w.average() - mean).abs() <= 1e-9 * (1.0 + mean.abs()));
        }
    }
}
