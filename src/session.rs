//! The authoritative game owner.
//!
//! [`Game`] holds the one live [`GameState`] plus its undo history. Every
//! change to the live state bumps a generation counter; agents are asked
//! for a move against a generation, and a reply for an older generation is
//! discarded instead of applied.

use tracing::{debug, info};

use crate::action::PlayerAction;
use crate::agent::{AgentError, AgentResponse};
use crate::board::{Direction, Pos};
use crate::game::{ConfigError, GameConfig, GameState};
use crate::history::History;

pub struct Game {
    config: GameConfig,
    state: GameState,
    history: History,
    generation: u64,
}

impl Game {
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        let state = GameState::new(config.clone())?;
        Ok(Self {
            config,
            state,
            history: History::new(),
            generation: 0,
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Owned copy of the live state, for handing to an agent.
    pub fn snapshot(&self) -> GameState {
        self.state.clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Run a transition; on success record the previous state for undo.
    fn commit(&mut self, transition: impl FnOnce(&mut GameState) -> bool) -> bool {
        let before = self.state.clone();
        if !transition(&mut self.state) {
            return false;
        }
        self.history.push(before);
        self.generation += 1;
        true
    }

    pub fn place(&mut self, pos: Pos) -> bool {
        self.commit(|s| s.place(pos))
    }

    /// Selection is not an undo step, but it does change the live state.
    pub fn select_stone(&mut self, pos: Pos) -> bool {
        let changed = self.state.select_stone(pos);
        if changed {
            self.generation += 1;
        }
        changed
    }

    pub fn move_to(&mut self, pos: Pos) -> bool {
        self.commit(|s| s.move_to(pos))
    }

    pub fn build_wall(&mut self, pos: Pos, dir: Direction) -> bool {
        self.commit(|s| s.build_wall(pos, dir))
    }

    pub fn apply_action(&mut self, action: &PlayerAction) -> bool {
        self.commit(|s| s.apply_action(action))
    }

    /// Apply an agent's answer to a request made at `requested_at`.
    ///
    /// Replies for an older generation are dropped. So is an action that is
    /// not a whole legal turn in the live state. Error responses surface as
    /// [`AgentError::SearchFault`].
    pub fn apply_agent_response(
        &mut self,
        requested_at: u64,
        response: &AgentResponse,
    ) -> Result<bool, AgentError> {
        if requested_at != self.generation {
            debug!(requested_at, current = self.generation, "discarding stale agent response");
            return Ok(false);
        }
        match response {
            AgentResponse::Action { action } => {
                if !self.state.is_action_legal(action) {
                    debug!(%action, "agent action is not a legal turn, discarded");
                    return Ok(false);
                }
                Ok(self.apply_action(action))
            }
            AgentResponse::Info { info } => {
                debug!(%info, "agent had nothing to do");
                Ok(false)
            }
            AgentResponse::Error { error, detail } => Err(AgentError::SearchFault {
                message: error.clone(),
                detail: detail.clone(),
            }),
        }
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.state.clone()) {
            Some(previous) => {
                self.state = previous;
                self.generation += 1;
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.state.clone()) {
            Some(next) => {
                self.state = next;
                self.generation += 1;
                true
            }
            None => false,
        }
    }

    /// Start over with the same configuration.
    pub fn reset(&mut self) {
        self.state = GameState::new(self.config.clone()).unwrap_or_default();
        self.history.clear();
        self.generation += 1;
        info!("new game");
    }
}
