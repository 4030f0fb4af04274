//! Fixed-capacity rolling window of readings.
//!
//! Readings are kept in append order. Once the window is full, every new
//! reading evicts exactly the oldest one.

use crate::sensor::types::Reading;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Whether a window has ever received a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    Empty,
    Populated,
}

/// Bounded FIFO buffer of recent readings.
#[derive(Debug, Clone)]
pub struct SensorWindow {
    capacity: usize,
    readings: VecDeque<Reading>,
}

impl SensorWindow {
    /// Create an empty window. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            readings: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a reading, evicting the oldest one first when full.
    pub fn push(&mut self, reading: Reading) -> Option<Reading> {
        let evicted = if self.readings.len() == self.capacity {
            self.readings.pop_front()
        } else {
            None
        };
        self.readings.push_back(reading);
        evicted
    }

    /// Most recently appended reading.
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    /// Readings in append order.
    pub fn iter(&self) -> impl Iterator<Item = &Reading> + '_ {
        self.readings.iter()
    }

    /// Readings strictly newer than `cutoff`.
    pub fn since(&self, cutoff: DateTime<Utc>) -> impl Iterator<Item = &Reading> + '_ {
        self.readings.iter().filter(move |r| r.timestamp > cutoff)
    }

    pub fn values(&self) -> Vec<f64> {
        self.readings.iter().map(|r| r.value).collect()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn state(&self) -> WindowState {
        if self.readings.is_empty() {
            WindowState::Empty
        } else {
            WindowState::Populated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_window_starts_empty() {
        let window = SensorWindow::new(10);
        assert!(window.is_empty());
        assert!(window.latest().is_none());
        assert_eq!(window.state(), WindowState::Empty);
    }

    #[test]
    fn test_fifo_eviction_keeps_last_n() {
        let mut window = SensorWindow::new(100);
        for i in 0..250 {
            window.push(Reading::new(f64::from(i)));
            assert!(window.len() <= 100);
        }

        let values = window.values();
        let expected: Vec<f64> = (150..250).map(f64::from).collect();
        assert_eq!(values, expected);
        assert_eq!(window.latest().map(|r| r.value), Some(249.0));
    }

    #[test]
    fn test_push_reports_evicted_reading() {
        let mut window = SensorWindow::new(2);
        assert!(window.push(Reading::new(1.0)).is_none());
        assert!(window.push(Reading::new(2.0)).is_none());
        let evicted = window.push(Reading::new(3.0));
        assert_eq!(evicted.map(|r| r.value), Some(1.0));
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let mut window = SensorWindow::new(0);
        window.push(Reading::new(1.0));
        window.push(Reading::new(2.0));
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.values(), vec![2.0]);
    }

    #[test]
    fn test_since_is_strict() {
        let start = Utc::now();
        let mut window = SensorWindow::new(10);
        for i in 0..5 {
            window.push(Reading::at(start + Duration::minutes(i), i as f64));
        }

        let recent: Vec<f64> = window
            .since(start + Duration::minutes(2))
            .map(|r| r.value)
            .collect();
        assert_eq!(recent, vec![3.0, 4.0]);
    }
}
