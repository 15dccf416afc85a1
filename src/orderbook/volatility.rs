//! Rolling mid-price history and realized-volatility proxy

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Bounded FIFO of recent mid prices
#[derive(Debug, Clone)]
pub struct VolatilityTracker {
    history: VecDeque<Decimal>,
    capacity: usize,
}

impl VolatilityTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a mid price, evicting the oldest sample when full
    pub fn push(&mut self, mid_price: Decimal) {
        if self.capacity == 0 {
            return;
        }
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(mid_price);
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples oldest first
    pub fn samples(&self) -> impl Iterator<Item = &Decimal> {
        self.history.iter()
    }

    /// Population standard deviation of the last `window` mid prices divided by their mean.
    ///
    /// Returns 0 when fewer than `window` samples exist, when `window` is 0, or when the
    /// mean is not positive. Not annualized.
    pub fn volatility(&self, window: usize) -> f64 {
        if window == 0 || self.history.len() < window {
            return 0.0;
        }

        let recent: Vec<f64> = self
            .history
            .iter()
            .skip(self.history.len() - window)
            .map(|p| p.to_f64().unwrap_or(0.0))
            .collect();

        // Zero dispersion must come out as exactly 0, not float noise
        let first = recent[0];
        if recent.iter().all(|p| *p == first) {
            return 0.0;
        }

        let n = window as f64;
        let mean = recent.iter().sum::<f64>() / n;
        if mean.is_nan() || mean <= 0.0 {
            return 0.0;
        }

        let variance = recent.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
        let ratio = variance.sqrt() / mean;

        if ratio.is_finite() {
            ratio.max(0.0)
        } else {
            0.0
        }
    }
}
