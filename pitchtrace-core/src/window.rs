//! # Analysis Window
//!
//! Bounded FIFO of the most recent [`AnalysisResult`]s, shared between the
//! capture worker (single writer) and the render loop (snapshot readers).
//! Appends and snapshots take the same lock, so a reader always sees a
//! complete set of records.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::AnalysisResult;

#[derive(Debug)]
pub struct AnalysisWindow {
    capacity: usize,
    results: Mutex<VecDeque<AnalysisResult>>,
}

impl AnalysisWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            results: Mutex::new(VecDeque::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a result, evicting the oldest entry once the window is full.
    pub fn push(&self, result: AnalysisResult) {
        let mut results = self.lock();
        if self.capacity == 0 {
            return;
        }
        while results.len() >= self.capacity {
            results.pop_front();
        }
        results.push_back(result);
    }

    /// Returns a point-in-time copy of the window, oldest first.
    pub fn snapshot(&self) -> Vec<AnalysisResult> {
        self.lock().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panicking writer cannot leave a half-written record behind.
    fn lock(&self) -> MutexGuard<'_, VecDeque<AnalysisResult>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
