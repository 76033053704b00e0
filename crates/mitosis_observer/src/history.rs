use mitosis_data::RunRecord;
use std::collections::VecDeque;

/// Bounded in-memory log of run records, oldest evicted first.
#[derive(Debug, Clone)]
pub struct RunHistory {
    records: VecDeque<RunRecord>,
    capacity: usize,
}

impl RunHistory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Replaces the record with the same run id, or appends a new one.
    pub fn upsert(&mut self, record: RunRecord) {
        if let Some(existing) = self.records.iter_mut().find(|r| r.id == record.id) {
            *existing = record;
            return;
        }
        if self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Up to `n` records, newest first.
    #[must_use]
    pub fn latest(&self, n: usize) -> Vec<RunRecord> {
        self.records.iter().rev().take(n).cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
