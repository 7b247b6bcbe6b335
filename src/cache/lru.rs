//! Recency ranks for cached records
//!
//! Each touch hands out the next value of a monotonically increasing
//! high-water mark. Ranks are never reused; a rank freed by a touch or a
//! removal leaves a gap that is skipped when the lowest rank is next looked
//! up.

use std::collections::HashMap;

use crate::types::RecordId;

#[derive(Debug, Default)]
pub struct LruRanks {
    rank_to_id: HashMap<u64, RecordId>,
    id_to_rank: HashMap<RecordId, u64>,
    /// No live rank is below this
    low: u64,
    /// Next rank to hand out
    high: u64,
}

impl LruRanks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `id` the most recently used record
    pub fn touch(&mut self, id: RecordId) {
        if let Some(old) = self.id_to_rank.insert(id, self.high) {
            self.rank_to_id.remove(&old);
        }
        self.rank_to_id.insert(self.high, id);
        self.high += 1;
    }

    pub fn remove(&mut self, id: RecordId) -> bool {
        match self.id_to_rank.remove(&id) {
            Some(rank) => {
                self.rank_to_id.remove(&rank);
                true
            }
            None => false,
        }
    }

    /// Least recently used record, skipping stale ranks
    pub fn lowest(&mut self) -> Option<RecordId> {
        while self.low < self.high {
            if let Some(id) = self.rank_to_id.get(&self.low) {
                return Some(*id);
            }
            self.low += 1;
        }
        None
    }

    /// Remove and return the least recently used record other than `keep`
    pub fn pop_lowest_except(&mut self, keep: RecordId) -> Option<RecordId> {
        let id = self.lowest()?;
        if id == keep {
            // `keep` was touched last, so it is the only live rank
            return None;
        }
        self.remove(id);
        Some(id)
    }

    pub fn len(&self) -> usize {
        self.id_to_rank.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_rank.is_empty()
    }

    pub fn clear(&mut self) {
        self.rank_to_id.clear();
        self.id_to_rank.clear();
        self.low = self.high;
    }

    /// Live records from least to most recently used
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = RecordId> + '_ {
        let mut ranked: Vec<(u64, RecordId)> =
            self.rank_to_id.iter().map(|(r, id)| (*r, *id)).collect();
        ranked.sort_unstable_by_key(|(rank, _)| *rank);
        ranked.into_iter().map(|(_, id)| id)
    }
}
