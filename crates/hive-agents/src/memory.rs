use std::collections::VecDeque;

use hive_models::Opinion;

/// Opinions an agent remembers between iterations.
pub const MEMORY_CAPACITY: usize = 10;

/// Bounded, oldest-first record of an agent's own recent opinions.
///
/// Each agent loop owns exactly one; it is never shared.
#[derive(Debug, Clone)]
pub struct OpinionMemory {
    entries: VecDeque<Opinion>,
    capacity: usize,
}

impl OpinionMemory {
    pub fn new() -> Self {
        Self::with_capacity(MEMORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuild from stored opinions given newest first.
    pub fn seeded(capacity: usize, newest_first: Vec<Opinion>) -> Self {
        let mut memory = Self::with_capacity(capacity);
        for opinion in newest_first.into_iter().rev() {
            memory.push(opinion);
        }
        memory
    }

    pub fn push(&mut self, opinion: Opinion) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(opinion);
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Opinion> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for OpinionMemory {
    fn default() -> Self {
        Self::new()
    }
}
