//! Fixed-window moving average over a scalar signal.

use std::collections::VecDeque;

/// Keeps the last `window` readings and reports their mean.
///
/// One instance per tracked angle; two logically distinct angle streams
/// must never share a smoother.
#[derive(Debug, Clone)]
pub struct Smoother {
    window: usize,
    values: VecDeque<f32>,
}

impl Smoother {
    /// `window` must be at least 1; profile validation rejects zero before
    /// any counter gets here.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            values: VecDeque::with_capacity(window),
        }
    }

    pub fn update(&mut self, value: f32) -> f32 {
        if self.values.len() == self.window {
            self.values.pop_front();
        }
        self.values.push_back(value);
        self.mean()
    }

    fn mean(&self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f32>() / self.values.len() as f32
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
