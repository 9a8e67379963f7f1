//! Player actions and legal-action enumeration.
//!
//! A [`PlayerAction`] is one step of input to the state machine. A whole
//! playing turn is usually one `Move` whose follow-up is the closing `Wall`,
//! so agents can answer with a single value.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::board::{Direction, Pos};
use crate::constants::MAX_STEPS;
use crate::game::{GameState, Phase};
use crate::movegen::moves_from;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlayerAction {
    Place {
        pos: Pos,
    },
    Move {
        from: Pos,
        pos: Pos,
        #[serde(rename = "followUp", default, skip_serializing_if = "Option::is_none")]
        follow_up: Option<Box<PlayerAction>>,
    },
    /// Walls go on the acting stone's own cell, so `from` and `pos` agree
    /// in every legal wall.
    Wall {
        from: Pos,
        pos: Pos,
        dir: Direction,
    },
}

impl PlayerAction {
    pub fn place(pos: Pos) -> Self {
        PlayerAction::Place { pos }
    }

    pub fn wall(pos: Pos, dir: Direction) -> Self {
        PlayerAction::Wall { from: pos, pos, dir }
    }

    /// A full playing turn: move `from -> to`, then wall `dir` on `to`.
    pub fn move_then_wall(from: Pos, to: Pos, dir: Direction) -> Self {
        PlayerAction::Move {
            from,
            pos: to,
            follow_up: Some(Box::new(PlayerAction::wall(to, dir))),
        }
    }

    pub fn follow_up(&self) -> Option<&PlayerAction> {
        match self {
            PlayerAction::Move { follow_up, .. } => follow_up.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerAction::Place { pos } => write!(f, "place {pos}"),
            PlayerAction::Wall { pos, dir, .. } => write!(f, "wall {pos} {dir:?}"),
            PlayerAction::Move {
                from,
                pos,
                follow_up,
            } => {
                write!(f, "move {from} -> {pos}")?;
                match follow_up {
                    Some(next) => write!(f, ", {next}"),
                    None => Ok(()),
                }
            }
        }
    }
}

impl GameState {
    /// Apply an action and its follow-up chain as one unit.
    ///
    /// If any link of the chain is rejected the state is restored to what
    /// it was before the call and `false` is returned.
    pub fn apply_action(&mut self, action: &PlayerAction) -> bool {
        let before = self.clone();
        if self.apply_chain(action) {
            true
        } else {
            trace!(%action, "action rejected, state restored");
            *self = before;
            false
        }
    }

    fn apply_chain(&mut self, action: &PlayerAction) -> bool {
        let applied = match *action {
            PlayerAction::Place { pos } => self.place(pos),
            PlayerAction::Wall { from, pos, dir } => {
                // A bare wall is also how a turn starts without moving.
                if self.selected() != Some(from) && !self.select_stone(from) {
                    return false;
                }
                self.build_wall(pos, dir)
            }
            PlayerAction::Move { from, pos, .. } => {
                if self.selected() != Some(from) && !self.select_stone(from) {
                    return false;
                }
                self.move_to(pos)
            }
        };
        match action.follow_up() {
            Some(next) if applied => self.apply_chain(next),
            _ => applied,
        }
    }

    /// Whether `action` is a whole turn here: `apply_action` accepts it and
    /// the turn is over afterwards. A move that stops short of its wall is
    /// not.
    pub fn is_action_legal(&self, action: &PlayerAction) -> bool {
        let mut after = self.clone();
        after.apply_action(action) && after.is_between_turns()
    }

    fn is_between_turns(&self) -> bool {
        self.is_finished() || (self.selected().is_none() && self.steps_taken() == 0)
    }
}

/// Every action the player to move could submit right now.
///
/// During play each entry completes the turn: walls on the acting stone's
/// cell, and moves to each legal destination chained with each wall there.
pub fn legal_actions(state: &GameState) -> Vec<PlayerAction> {
    let board = state.board();
    let me = state.turn();
    match state.phase() {
        Phase::Finished => Vec::new(),
        Phase::Placing => {
            if state.stones_placed(me) >= state.stones_per_player() {
                return Vec::new();
            }
            board.empty_cells().map(PlayerAction::place).collect()
        }
        Phase::Playing => {
            let origins: Vec<(Pos, _)> = match state.selected() {
                Some(sel) if state.steps_taken() > 0 => {
                    vec![(sel, state.legal_destinations().clone())]
                }
                _ => board
                    .stones_of(me)
                    .map(|s| (s, moves_from(board, s, MAX_STEPS)))
                    .collect(),
            };
            let mut actions = Vec::new();
            for (origin, destinations) in origins {
                actions.extend(board.open_edges(origin).map(|d| PlayerAction::wall(origin, d)));
                for dest in destinations {
                    actions.extend(
                        board
                            .open_edges(dest)
                            .map(|d| PlayerAction::move_then_wall(origin, dest, d)),
                    );
                }
            }
            actions
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Player};
    use crate::game::GameConfig;

    fn small_game() -> GameState {
        let mut board = Board::new(3);
        board.place_stone(Pos::new(0, 0), Player::Red);
        board.place_stone(Pos::new(2, 2), Player::Blue);
        GameState::in_play(GameConfig::default(), board, Player::Red).unwrap()
    }

    #[test]
    fn test_json_shape() {
        let action = PlayerAction::move_then_wall(Pos::new(0, 0), Pos::new(1, 0), Direction::Bottom);
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "move");
        assert_eq!(json["from"]["x"], 0);
        assert_eq!(json["followUp"]["type"], "wall");
        assert_eq!(json["followUp"]["from"], json["pos"]);
        assert_eq!(json["followUp"]["dir"], "bottom");

        let wall = serde_json::to_value(PlayerAction::wall(Pos::new(2, 1), Direction::Left)).unwrap();
        assert_eq!(
            wall,
            serde_json::json!({"type": "wall", "from": {"x": 2, "y": 1}, "pos": {"x": 2, "y": 1}, "dir": "left"})
        );

        let plain: PlayerAction =
            serde_json::from_str(r#"{"type":"move","from":{"x":0,"y":0},"pos":{"x":1,"y":0}}"#)
                .unwrap();
        assert_eq!(plain.follow_up(), None);
    }

    #[test]
    fn test_full_turn_applies_as_one_action() {
        let mut state = small_game();
        let action = PlayerAction::move_then_wall(Pos::new(0, 0), Pos::new(1, 1), Direction::Top);
        assert!(state.apply_action(&action));
        assert_eq!(state.board().stone(Pos::new(1, 1)), Some(Player::Red));
        assert_eq!(state.turn(), Player::Blue);
    }

    #[test]
    fn test_rejected_follow_up_restores_state() {
        let mut state = small_game();
        let before = state.clone();
        // Top of (1,0) is the outer boundary.
        let action = PlayerAction::move_then_wall(Pos::new(0, 0), Pos::new(1, 0), Direction::Top);
        assert!(!state.apply_action(&action));
        assert_eq!(state, before);
    }

    #[test]
    fn test_wall_from_another_cell_is_rejected() {
        let mut state = small_game();
        let before = state.clone();
        let action = PlayerAction::Wall {
            from: Pos::new(0, 0),
            pos: Pos::new(1, 0),
            dir: Direction::Bottom,
        };
        assert!(!state.is_action_legal(&action));
        assert!(!state.apply_action(&action));
        assert_eq!(state, before);
    }

    #[test]
    fn test_half_turn_is_not_a_legal_action() {
        let state = small_game();
        let half = PlayerAction::Move {
            from: Pos::new(0, 0),
            pos: Pos::new(1, 0),
            follow_up: None,
        };
        assert!(!state.is_action_legal(&half));

        // The state machine itself still takes it as one step.
        let mut stepped = state.clone();
        assert!(stepped.apply_action(&half));
        assert_eq!(stepped.turn(), Player::Red);
        assert_eq!(stepped.selected(), Some(Pos::new(1, 0)));
    }

    #[test]
    fn test_every_enumerated_action_is_legal() {
        let state = small_game();
        let actions = legal_actions(&state);
        assert!(!actions.is_empty());
        for action in &actions {
            assert!(state.is_action_legal(action), "{action}");
        }
        // Corner cell has 2 open edges, then (1,0) (0,1) (2,0) (1,1) (0,2).
        assert_eq!(actions.len(), 2 + 3 + 3 + 2 + 4 + 2);
    }

    #[test]
    fn test_mid_turn_enumeration_uses_selected_stone() {
        let mut state = small_game();
        assert!(state.select_stone(Pos::new(0, 0)));
        assert!(state.move_to(Pos::new(1, 0)));
        let actions = legal_actions(&state);
        assert!(actions.iter().all(|a| match a {
            PlayerAction::Wall { pos, .. } => *pos == Pos::new(1, 0),
            PlayerAction::Move { from, .. } => *from == Pos::new(1, 0),
            PlayerAction::Place { .. } => false,
        }));
        for action in &actions {
            assert!(state.is_action_legal(action), "{action}");
        }
    }

    #[test]
    fn test_placing_enumerates_empty_cells() {
        let state = GameState::default();
        assert_eq!(legal_actions(&state).len(), 49);
    }
}
