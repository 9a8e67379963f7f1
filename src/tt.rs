//! Transposition table for caching search results.
//!
//! Direct-mapped: each key maps to exactly one slot, and a colliding store
//! only replaces the occupant when it was searched at least as deep.
//!
//! Scores are keyed by position, depth and side, but best moves are keyed by
//! position alone so one iteration's choice orders the next, deeper one.

use crate::action::PlayerAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    /// The search completed inside the window.
    Exact,
    /// Beta cutoff: the true value is at least the stored score.
    LowerBound,
    /// Fail-low: the true value is at most the stored score.
    UpperBound,
}

#[derive(Debug, Clone)]
pub struct TTEntry {
    pub key: u64,
    pub depth: u8,
    pub score: i32,
    pub entry_type: EntryType,
}

pub struct TranspositionTable {
    entries: Vec<Option<TTEntry>>,
    moves: Vec<Option<(u64, PlayerAction)>>,
}

impl TranspositionTable {
    pub fn new(slots: usize) -> Self {
        Self {
            entries: vec![None; slots.max(1)],
            moves: vec![None; slots.max(1)],
        }
    }

    #[inline]
    fn slot(&self, key: u64) -> usize {
        (key % self.entries.len() as u64) as usize
    }

    /// A cached score usable for this window, if one was stored at least
    /// `depth` deep.
    pub fn probe(&self, key: u64, depth: u8, alpha: i32, beta: i32) -> Option<i32> {
        let entry = self.entries[self.slot(key)].as_ref()?;
        if entry.key != key || entry.depth < depth {
            return None;
        }
        match entry.entry_type {
            EntryType::Exact => Some(entry.score),
            EntryType::LowerBound if entry.score >= beta => Some(entry.score),
            EntryType::UpperBound if entry.score <= alpha => Some(entry.score),
            _ => None,
        }
    }

    /// The best action last recorded for a position hash, for move ordering.
    pub fn best_action(&self, hash: u64) -> Option<&PlayerAction> {
        match &self.moves[self.slot(hash)] {
            Some((h, action)) if *h == hash => Some(action),
            _ => None,
        }
    }

    pub fn store(&mut self, key: u64, depth: u8, score: i32, entry_type: EntryType) {
        let idx = self.slot(key);
        let replace = match &self.entries[idx] {
            Some(old) => old.key == key || depth >= old.depth,
            None => true,
        };
        if replace {
            self.entries[idx] = Some(TTEntry {
                key,
                depth,
                score,
                entry_type,
            });
        }
    }

    /// Record the move that scored best from this position. Always replaces.
    pub fn store_action(&mut self, hash: u64, action: PlayerAction) {
        let idx = self.slot(hash);
        self.moves[idx] = Some((hash, action));
    }

    pub fn clear(&mut self) {
        self.entries.iter_mut().for_each(|e| *e = None);
        self.moves.iter_mut().for_each(|m| *m = None);
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
