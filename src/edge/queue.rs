//! Two-lane transmission queue: critical data (anomalies, resource alerts)
//! jumps ahead of routine readings, which are batched.

use serde::Serialize;
use std::collections::VecDeque;

use crate::device::SensorReading;

/// Queue lane for a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Critical,
    Normal,
}

/// Queue statistics.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub critical_pending: usize,
    pub normal_pending: usize,
    pub total_critical_processed: u64,
    pub total_normal_processed: u64,
}

/// Priority queue separating critical and routine data for transmission.
#[derive(Default)]
pub struct PriorityDataQueue {
    critical_queue: VecDeque<SensorReading>,
    normal_queue: VecDeque<SensorReading>,
    total_critical: u64,
    total_normal: u64,
}

impl PriorityDataQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, data: SensorReading, priority: Priority) {
        match priority {
            Priority::Critical => {
                self.critical_queue.push_back(data);
                self.total_critical += 1;
            }
            Priority::Normal => {
                self.normal_queue.push_back(data);
                self.total_normal += 1;
            }
        }
    }

    /// Drain everything from the critical lane.
    pub fn dequeue_critical(&mut self) -> Vec<SensorReading> {
        self.critical_queue.drain(..).collect()
    }

    /// Pop up to `batch_size` routine readings.
    pub fn dequeue_normal(&mut self, batch_size: usize) -> Vec<SensorReading> {
        let take = batch_size.min(self.normal_queue.len());
        self.normal_queue.drain(..take).collect()
    }

    pub fn has_critical(&self) -> bool {
        !self.critical_queue.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            critical_pending: self.critical_queue.len(),
            normal_pending: self.normal_queue.len(),
            total_critical_processed: self.total_critical,
            total_normal_processed: self.total_normal,
        }
    }
}
