//! Undo/redo snapshot stacks.

use crate::game::GameState;

/// Past states (oldest first) and undone states waiting to be redone.
#[derive(Clone, Debug, Default)]
pub struct History {
    past: Vec<GameState>,
    future: Vec<GameState>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the state that is about to be replaced. Clears the redo list.
    pub fn push(&mut self, state: GameState) {
        self.past.push(state);
        self.future.clear();
    }

    /// Step back: returns the previous state and keeps `current` for redo.
    pub fn undo(&mut self, current: GameState) -> Option<GameState> {
        let previous = self.past.pop()?;
        self.future.push(current);
        Some(previous)
    }

    pub fn redo(&mut self, current: GameState) -> Option<GameState> {
        let next = self.future.pop()?;
        self.past.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Pos;

    #[test]
    fn test_undo_redo_and_push_clears_future() {
        let s0 = GameState::default();
        let mut s1 = s0.clone();
        assert!(s1.place(Pos::new(0, 0)));

        let mut history = History::new();
        assert!(!history.can_undo());
        history.push(s0.clone());

        let back = history.undo(s1.clone()).unwrap();
        assert_eq!(back, s0);
        assert!(history.can_redo());
        assert_eq!(history.redo(back).unwrap(), s1);

        history.undo(s1.clone());
        history.push(s0);
        assert!(!history.can_redo());
    }
}
