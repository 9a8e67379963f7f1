//! Turn-phase state machine.
//!
//! A game runs `placing -> playing -> finished` and never goes back. During
//! play each turn is: select one of your stones, optionally move it up to two
//! steps (one hop or two one-step hops), then build one wall on an edge of
//! the cell the stone ends on. Building the wall ends the turn.
//!
//! Every transition is a silent no-op when its preconditions fail: it returns
//! `false` and leaves the state exactly as it was.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::board::{Board, Direction, Player, Pos};
use crate::constants::{MAX_PLAYERS, MAX_STEPS, N, STONES_PER_PLAYER};
use crate::movegen::moves_from;
use crate::territory::{territory_map, TerritoryMap};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Placing,
    Playing,
    Finished,
}

/// Why the turn order jumped past a player.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    NoLegalAction { player: Player },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    pub finished: bool,
    pub winner: Option<Player>,
    pub tie: bool,
    pub score_per_player: BTreeMap<Player, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("a game needs at least one player")]
    NoPlayers,
    #[error("at most {max} players are supported, got {count}", max = MAX_PLAYERS)]
    TooManyPlayers { count: usize },
    #[error("player {player} is seated twice")]
    DuplicatePlayer { player: Player },
    #[error("board size {size} is too small")]
    BoardTooSmall { size: usize },
    #[error("{stones} stones to place do not fit on {cells} cells")]
    TooManyStones { stones: usize, cells: usize },
    #[error("player {player} is not seated in this game")]
    UnknownPlayer { player: Player },
}

/// Static setup of a game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameConfig {
    pub size: usize,
    pub players: Vec<Player>,
    pub stones_per_player: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            size: N,
            players: vec![Player::Red, Player::Blue],
            stones_per_player: STONES_PER_PLAYER,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.players.is_empty() {
            return Err(ConfigError::NoPlayers);
        }
        if self.players.len() > MAX_PLAYERS {
            return Err(ConfigError::TooManyPlayers {
                count: self.players.len(),
            });
        }
        for (i, &p) in self.players.iter().enumerate() {
            if self.players[..i].contains(&p) {
                return Err(ConfigError::DuplicatePlayer { player: p });
            }
        }
        if self.size < 2 {
            return Err(ConfigError::BoardTooSmall { size: self.size });
        }
        let stones = self.stones_per_player * self.players.len();
        let cells = self.size * self.size;
        if stones > cells {
            return Err(ConfigError::TooManyStones { stones, cells });
        }
        Ok(())
    }
}

/// Seat that places the `index`-th stone (0-based) during the placing phase.
///
/// Rounds of `player_count` placements alternate forward and reverse, so the
/// seat that places last in one round also places first in the next.
pub fn placing_slot(index: usize, player_count: usize) -> usize {
    let round = index / player_count;
    let offset = index % player_count;
    if round % 2 == 0 {
        offset
    } else {
        player_count - 1 - offset
    }
}

/// Whether a player can complete a turn: some stone of theirs can end on a
/// cell (its own, or one it can reach) that still has an open interior edge.
pub fn has_legal_action(board: &Board, player: Player) -> bool {
    board.stones_of(player).any(|stone| {
        board.open_edges(stone).next().is_some()
            || moves_from(board, stone, MAX_STEPS)
                .into_iter()
                .any(|dest| board.open_edges(dest).next().is_some())
    })
}

fn score_result(map: &TerritoryMap, players: &[Player], finished: bool) -> GameResult {
    let score_per_player: BTreeMap<Player, usize> =
        players.iter().map(|&p| (p, map.area(p))).collect();
    let (winner, tie) = if finished {
        let best = score_per_player.values().copied().max().unwrap_or(0);
        let leaders: Vec<Player> = players
            .iter()
            .copied()
            .filter(|p| score_per_player[p] == best)
            .collect();
        match leaders.as_slice() {
            [only] => (Some(*only), false),
            _ => (None, true),
        }
    } else {
        (None, false)
    };
    GameResult {
        finished,
        winner,
        tie,
        score_per_player,
    }
}

/// Score the board and decide whether the game is over.
///
/// The game is over once every cell lies in a region owned by a single
/// player, or when no player has any legal action left.
pub fn check_game_end(board: &Board, players: &[Player]) -> GameResult {
    let map = territory_map(board);
    let finished = map.is_fully_claimed()
        || players.iter().all(|&p| !has_legal_action(board, p));
    score_result(&map, players, finished)
}

/// A complete game snapshot. Cloning yields an independent value: the only
/// shared part is the immutable seating order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    board: Board,
    turn: Player,
    phase: Phase,
    selected: Option<Pos>,
    legal_destinations: BTreeSet<Pos>,
    steps_taken_this_turn: u8,
    players: Arc<[Player]>,
    stones_per_player: usize,
    stones_placed_per_player: BTreeMap<Player, usize>,
    result: Option<GameResult>,
    skip_reason: Option<SkipReason>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::fresh(&GameConfig::default())
    }
}

impl GameState {
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::fresh(&config))
    }

    fn fresh(config: &GameConfig) -> Self {
        let players: Arc<[Player]> = config.players.clone().into();
        Self {
            board: Board::new(config.size),
            turn: players[0],
            phase: Phase::Placing,
            selected: None,
            legal_destinations: BTreeSet::new(),
            steps_taken_this_turn: 0,
            stones_per_player: config.stones_per_player,
            stones_placed_per_player: players.iter().map(|&p| (p, 0)).collect(),
            players,
            result: None,
            skip_reason: None,
        }
    }

    /// Start directly in the playing phase from a prepared board.
    ///
    /// The stones already on the board count as placed. If the board is
    /// already terminal the state comes back finished.
    pub fn in_play(config: GameConfig, board: Board, turn: Player) -> Result<Self, ConfigError> {
        config.validate()?;
        if !config.players.contains(&turn) {
            return Err(ConfigError::UnknownPlayer { player: turn });
        }
        if let Some((_, p)) = board.stones().find(|(_, p)| !config.players.contains(p)) {
            return Err(ConfigError::UnknownPlayer { player: p });
        }
        let mut state = Self::fresh(&GameConfig {
            size: board.size(),
            ..config
        });
        for (_, p) in board.stones() {
            *state.stones_placed_per_player.entry(p).or_insert(0) += 1;
        }
        state.board = board;
        state.turn = turn;
        state.phase = Phase::Playing;
        state.hand_over(0);
        Ok(state)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Player {
        self.turn
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn selected(&self) -> Option<Pos> {
        self.selected
    }

    pub fn legal_destinations(&self) -> &BTreeSet<Pos> {
        &self.legal_destinations
    }

    pub fn steps_taken(&self) -> u8 {
        self.steps_taken_this_turn
    }

    pub fn remaining_steps(&self) -> u8 {
        MAX_STEPS.saturating_sub(self.steps_taken_this_turn)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Everyone seated except `player`, in seating order.
    pub fn opponents(&self, player: Player) -> Vec<Player> {
        self.players.iter().copied().filter(|&p| p != player).collect()
    }

    pub fn stones_per_player(&self) -> usize {
        self.stones_per_player
    }

    pub fn stones_placed(&self, player: Player) -> usize {
        self.stones_placed_per_player.get(&player).copied().unwrap_or(0)
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        self.skip_reason
    }

    /// Current territory totals, whether or not the game is over.
    pub fn scores(&self) -> BTreeMap<Player, usize> {
        crate::territory::scores(&self.board, &self.players)
    }

    fn total_placed(&self) -> usize {
        self.stones_placed_per_player.values().sum()
    }

    fn seat_of(&self, player: Player) -> usize {
        self.players.iter().position(|&p| p == player).unwrap_or(0)
    }

    /// Who places the stone after the current one, if placing continues.
    pub fn next_placing_player(&self) -> Option<Player> {
        if self.phase != Phase::Placing {
            return None;
        }
        let n = self.players.len();
        let next = self.total_placed() + 1;
        (next < self.stones_per_player * n).then(|| self.players[placing_slot(next, n)])
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Put the acting player's next stone on an empty cell.
    pub fn place(&mut self, pos: Pos) -> bool {
        if self.phase != Phase::Placing {
            trace!(%pos, phase = ?self.phase, "place rejected: not placing");
            return false;
        }
        if self.stones_placed(self.turn) >= self.stones_per_player {
            trace!(player = %self.turn, "place rejected: quota reached");
            return false;
        }
        if !self.board.place_stone(pos, self.turn) {
            trace!(%pos, "place rejected: cell unavailable");
            return false;
        }
        *self.stones_placed_per_player.entry(self.turn).or_insert(0) += 1;
        debug!(player = %self.turn, %pos, "stone placed");

        let n = self.players.len();
        let total = self.total_placed();
        self.turn = self.players[placing_slot(total, n)];
        if total >= self.stones_per_player * n {
            self.phase = Phase::Playing;
            info!(first = %self.turn, "placement complete, play begins");
            self.hand_over(0);
        }
        true
    }

    /// Choose which stone acts this turn. Allowed until the first step.
    pub fn select_stone(&mut self, pos: Pos) -> bool {
        if self.phase != Phase::Playing || self.steps_taken_this_turn > 0 {
            trace!(%pos, "select rejected: wrong phase or already moving");
            return false;
        }
        if self.board.stone(pos) != Some(self.turn) {
            trace!(%pos, player = %self.turn, "select rejected: not an own stone");
            return false;
        }
        self.selected = Some(pos);
        self.legal_destinations = moves_from(&self.board, pos, MAX_STEPS);
        true
    }

    /// Move the selected stone to one of the stored legal destinations.
    pub fn move_to(&mut self, pos: Pos) -> bool {
        if self.phase != Phase::Playing {
            return false;
        }
        let Some(from) = self.selected else {
            trace!(%pos, "move rejected: nothing selected");
            return false;
        };
        if !self.legal_destinations.contains(&pos) || !self.board.move_stone(from, pos) {
            trace!(%from, %pos, "move rejected: destination not legal");
            return false;
        }
        let steps = u8::try_from(from.manhattan(pos)).unwrap_or(MAX_STEPS);
        self.steps_taken_this_turn = self.steps_taken_this_turn.saturating_add(steps);
        self.selected = Some(pos);
        let remaining = self.remaining_steps();
        self.legal_destinations = if remaining > 0 {
            moves_from(&self.board, pos, remaining)
        } else {
            BTreeSet::new()
        };
        debug!(player = %self.turn, %from, %pos, steps = self.steps_taken_this_turn, "stone moved");
        true
    }

    /// Wall one edge of the selected stone's cell, ending the turn.
    pub fn build_wall(&mut self, pos: Pos, dir: Direction) -> bool {
        if self.phase != Phase::Playing || self.selected != Some(pos) {
            trace!(%pos, "wall rejected: not on the selected stone");
            return false;
        }
        if !self.board.set_wall(pos, dir, self.turn) {
            trace!(%pos, ?dir, "wall rejected: edge unavailable");
            return false;
        }
        debug!(player = %self.turn, %pos, ?dir, "wall built");
        self.selected = None;
        self.legal_destinations.clear();
        self.steps_taken_this_turn = 0;
        self.hand_over(1);
        true
    }

    /// Evaluate termination, then pass the turn to the first seat, starting
    /// `offset` seats after the current one, that has a legal action.
    fn hand_over(&mut self, offset: usize) {
        let result = check_game_end(&self.board, &self.players);
        if result.finished {
            self.finish(result);
            return;
        }
        let n = self.players.len();
        let seat = self.seat_of(self.turn);
        let mut skipped = None;
        for k in offset..offset + n {
            let candidate = self.players[(seat + k) % n];
            if has_legal_action(&self.board, candidate) {
                self.turn = candidate;
                self.skip_reason = skipped.map(|player| SkipReason::NoLegalAction { player });
                if let Some(player) = skipped {
                    debug!(%player, next = %candidate, "skipping player without legal action");
                }
                return;
            }
            skipped = Some(candidate);
        }
        // check_game_end already reports a board nobody can act on; this is
        // only reached if that invariant is broken.
        let map = territory_map(&self.board);
        self.finish(score_result(&map, &self.players, true));
    }

    fn finish(&mut self, result: GameResult) {
        info!(winner = ?result.winner, tie = result.tie, scores = ?result.score_per_player, "game finished");
        self.phase = Phase::Finished;
        self.selected = None;
        self.legal_destinations.clear();
        self.steps_taken_this_turn = 0;
        self.result = Some(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placing_slot_alternates_rounds() {
        let order: Vec<usize> = (0..8).map(|i| placing_slot(i, 2)).collect();
        assert_eq!(order, vec![0, 1, 1, 0, 0, 1, 1, 0]);
        let order: Vec<usize> = (0..6).map(|i| placing_slot(i, 3)).collect();
        assert_eq!(order, vec![0, 1, 2, 2, 1, 0]);
    }

    #[test]
    fn test_config_validation() {
        let mut config = GameConfig::default();
        assert!(config.validate().is_ok());
        config.players = vec![Player::Red, Player::Red];
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicatePlayer { player: Player::Red })
        );
        config.players = vec![];
        assert_eq!(config.validate(), Err(ConfigError::NoPlayers));
        let config = GameConfig {
            size: 1,
            ..GameConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::BoardTooSmall { size: 1 }));
    }

    #[test]
    fn test_config_rejects_more_stones_than_cells() {
        let crowded = GameConfig {
            size: 3,
            players: Player::ALL.to_vec(),
            stones_per_player: 4,
        };
        assert_eq!(
            crowded.validate(),
            Err(ConfigError::TooManyStones { stones: 16, cells: 9 })
        );
        assert!(GameState::new(crowded).is_err());

        let full = GameConfig {
            size: 3,
            players: vec![Player::Red, Player::Blue, Player::Green],
            stones_per_player: 3,
        };
        assert!(full.validate().is_ok());
    }

    #[test]
    fn test_select_requires_own_stone_and_playing_phase() {
        let mut state = GameState::default();
        assert!(!state.select_stone(Pos::new(0, 0)));
        let mut board = Board::new(5);
        board.place_stone(Pos::new(0, 0), Player::Red);
        board.place_stone(Pos::new(4, 4), Player::Blue);
        let mut state = GameState::in_play(GameConfig::default(), board, Player::Red).unwrap();
        assert!(!state.select_stone(Pos::new(4, 4)));
        assert!(state.select_stone(Pos::new(0, 0)));
        assert_eq!(state.legal_destinations().len(), 5);
    }

    #[test]
    fn test_two_single_hops_use_up_the_budget() {
        let mut board = Board::new(5);
        board.place_stone(Pos::new(2, 2), Player::Red);
        board.place_stone(Pos::new(4, 4), Player::Blue);
        let mut state = GameState::in_play(GameConfig::default(), board, Player::Red).unwrap();

        assert!(state.select_stone(Pos::new(2, 2)));
        assert!(state.move_to(Pos::new(2, 1)));
        assert_eq!(state.steps_taken(), 1);
        assert!(!state.select_stone(Pos::new(2, 1)));
        assert!(state.legal_destinations().contains(&Pos::new(1, 1)));
        assert!(!state.legal_destinations().contains(&Pos::new(2, 3)));

        assert!(state.move_to(Pos::new(1, 1)));
        assert_eq!(state.steps_taken(), 2);
        assert!(state.legal_destinations().is_empty());
        assert!(!state.move_to(Pos::new(1, 0)));

        assert!(!state.build_wall(Pos::new(2, 2), Direction::Top));
        assert!(state.build_wall(Pos::new(1, 1), Direction::Top));
        assert_eq!(state.turn(), Player::Blue);
        assert_eq!(state.selected(), None);
        assert_eq!(state.steps_taken(), 0);
    }

    #[test]
    fn test_wall_without_moving_ends_turn() {
        let mut board = Board::new(5);
        board.place_stone(Pos::new(2, 2), Player::Red);
        board.place_stone(Pos::new(4, 4), Player::Blue);
        let mut state = GameState::in_play(GameConfig::default(), board, Player::Red).unwrap();
        assert!(state.select_stone(Pos::new(2, 2)));
        assert!(state.build_wall(Pos::new(2, 2), Direction::Top));
        assert_eq!(state.turn(), Player::Blue);
        assert_eq!(state.board().wall_owner(Pos::new(2, 2), Direction::Top), Some(Player::Red));
        assert!(!state.build_wall(Pos::new(2, 2), Direction::Left));
    }

    #[test]
    fn test_skip_player_without_legal_action() {
        // Blue sits in a sealed single cell with no open interior edge.
        let mut board = Board::new(3);
        board.place_stone(Pos::new(0, 0), Player::Blue);
        board.set_wall(Pos::new(0, 0), Direction::Right, Player::Blue);
        board.set_wall(Pos::new(0, 0), Direction::Bottom, Player::Blue);
        board.place_stone(Pos::new(2, 2), Player::Red);
        board.place_stone(Pos::new(1, 1), Player::Green);
        let config = GameConfig {
            size: 3,
            players: vec![Player::Red, Player::Blue, Player::Green],
            stones_per_player: 1,
        };
        let mut state = GameState::in_play(config, board, Player::Red).unwrap();
        assert!(!state.is_finished());
        assert!(state.select_stone(Pos::new(2, 2)));
        assert!(state.build_wall(Pos::new(2, 2), Direction::Top));
        assert_eq!(state.turn(), Player::Green);
        assert_eq!(
            state.skip_reason(),
            Some(SkipReason::NoLegalAction { player: Player::Blue })
        );
    }

    #[test]
    fn test_three_way_tie_has_no_winner() {
        let mut board = Board::new(3);
        for y in 0..3 {
            board.set_wall(Pos::new(0, y), Direction::Right, Player::Red);
            board.set_wall(Pos::new(1, y), Direction::Right, Player::Red);
        }
        board.place_stone(Pos::new(0, 0), Player::Red);
        board.place_stone(Pos::new(1, 0), Player::Blue);
        board.place_stone(Pos::new(2, 0), Player::Green);
        let result = check_game_end(&board, &[Player::Red, Player::Blue, Player::Green]);
        assert!(result.finished);
        assert!(result.tie);
        assert_eq!(result.winner, None);
    }
}
