//! Iterative-deepening alpha-beta search.
//!
//! The search is paranoid: the side to move at the root maximizes and every
//! other seat is assumed to minimize the root player's evaluation. Each node
//! works on its own cloned [`GameState`], so exploration never touches the
//! caller's state.
//!
//! The wall-clock budget is a soft deadline checked once per node. A depth
//! that runs out of time is discarded and the previous depth's answer kept;
//! if not even depth 1 finishes, a uniformly random candidate is returned.

use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::action::{legal_actions, PlayerAction};
use crate::board::{Board, Player};
use crate::constants::{EDGE_PENALTY, MAX_SEARCH_DEPTH, MAX_STEPS, TT_ENTRIES, WIN_SCORE};
use crate::eval::{liberty_cells, Evaluator};
use crate::game::{GameState, Phase};
use crate::movegen::reachable_cells;
use crate::tt::{EntryType, TranspositionTable};
use crate::zobrist::ZobristTable;

const INF: i32 = i32::MAX / 2;

#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Deepest iteration attempted, in full turns.
    pub max_depth: u8,
    pub evaluator: Evaluator,
    /// Drop candidate turns that leave one of our stones open to being
    /// sealed in on the opponent's next move.
    pub suicide_filter: bool,
    pub tt_entries: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_SEARCH_DEPTH,
            evaluator: Evaluator::Composite,
            suicide_filter: false,
            tt_entries: TT_ENTRIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub action: PlayerAction,
    pub score: i32,
    /// Deepest completed iteration; 0 when the answer is a random fallback.
    pub depth: u8,
    pub nodes: u64,
}

pub struct Searcher {
    config: SearchConfig,
    zobrist: ZobristTable,
    tt: TranspositionTable,
    rng: fastrand::Rng,
    stop: Arc<AtomicBool>,
    deadline: Option<Instant>,
    aborted: bool,
    nodes: u64,
}

impl Searcher {
    pub fn new(config: SearchConfig) -> Self {
        Self::with_rng(config, fastrand::Rng::new())
    }

    /// Deterministic tie-breaking, for tests and reproducible self-play.
    pub fn with_seed(config: SearchConfig, seed: u64) -> Self {
        Self::with_rng(config, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(config: SearchConfig, rng: fastrand::Rng) -> Self {
        Self {
            tt: TranspositionTable::new(config.tt_entries),
            zobrist: ZobristTable::new(crate::constants::N),
            config,
            rng,
            stop: Arc::new(AtomicBool::new(false)),
            deadline: None,
            aborted: false,
            nodes: 0,
        }
    }

    /// Flag that aborts a running search when set from another thread.
    /// Replaced per request, so raising an old flag never touches a newer
    /// search.
    pub fn set_stop_flag(&mut self, stop: Arc<AtomicBool>) {
        self.stop = stop;
    }

    #[inline]
    fn time_up(&self) -> bool {
        self.stop.load(Ordering::Relaxed) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Pick one of `actions` for the player to move in `state`.
    ///
    /// Returns `None` only when `actions` is empty.
    pub fn best_action(
        &mut self,
        state: &GameState,
        actions: &[PlayerAction],
        budget: Duration,
    ) -> Option<SearchOutcome> {
        if actions.is_empty() {
            return None;
        }
        self.deadline = Some(Instant::now() + budget);
        self.aborted = false;
        self.nodes = 0;
        self.tt.clear();
        if self.zobrist.size() != state.board().size() {
            self.zobrist = ZobristTable::new(state.board().size());
        }

        if state.phase() == Phase::Placing {
            return Some(self.best_placement(state, actions));
        }

        let candidates = if self.config.suicide_filter {
            suicide_filter(state, actions)
        } else {
            actions.to_vec()
        };

        let me = state.turn();
        let started = Instant::now();
        let mut best: Option<SearchOutcome> = None;
        for depth in 1..=self.config.max_depth {
            match self.search_root(state, &candidates, depth, me) {
                Some((action, score)) => {
                    debug!(
                        depth,
                        score,
                        nodes = self.nodes,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        %action,
                        "depth complete"
                    );
                    best = Some(SearchOutcome {
                        action,
                        score,
                        depth,
                        nodes: self.nodes,
                    });
                    if score.abs() >= WIN_SCORE / 2 {
                        break;
                    }
                }
                None => {
                    debug!(depth, nodes = self.nodes, "depth abandoned on deadline");
                    break;
                }
            }
            if self.time_up() {
                break;
            }
        }

        best.or_else(|| {
            debug!("no depth completed, falling back to a random candidate");
            let i = self.rng.usize(..candidates.len());
            Some(SearchOutcome {
                action: candidates[i].clone(),
                score: 0,
                depth: 0,
                nodes: self.nodes,
            })
        })
    }

    fn evaluate(&self, state: &GameState, me: Player) -> i32 {
        self.config.evaluator.evaluate(state, me)
    }

    /// Children of `state`, best-first for the side to move when `ordered`.
    fn expand(
        &self,
        state: &GameState,
        actions: &[PlayerAction],
        me: Player,
        ordered: bool,
        hint: Option<&PlayerAction>,
    ) -> Vec<(PlayerAction, GameState)> {
        let children = actions.iter().filter_map(|a| {
            let mut child = state.clone();
            child.apply_action(a).then(|| (a.clone(), child))
        });
        if !ordered {
            return children.collect();
        }
        let maximizing = state.turn() == me;
        let mut scored: Vec<(i32, PlayerAction, GameState)> = children
            .map(|(a, child)| (self.evaluate(&child, me), a, child))
            .collect();
        if maximizing {
            scored.sort_by_key(|(s, ..)| Reverse(*s));
        } else {
            scored.sort_by_key(|(s, ..)| *s);
        }
        if let Some(hint) = hint {
            if let Some(i) = scored.iter().position(|(_, a, _)| a == hint) {
                let entry = scored.remove(i);
                scored.insert(0, entry);
            }
        }
        scored.into_iter().map(|(_, a, c)| (a, c)).collect()
    }

    /// One root iteration. `None` if the deadline hit before it finished.
    fn search_root(
        &mut self,
        state: &GameState,
        candidates: &[PlayerAction],
        depth: u8,
        me: Player,
    ) -> Option<(PlayerAction, i32)> {
        let children = self.expand(state, candidates, me, depth > 1, None);
        let mut best_score = -INF;
        let mut best_actions: Vec<PlayerAction> = Vec::new();
        for (action, child) in children {
            if self.time_up() {
                return None;
            }
            // Searching one below the best keeps ties exact, so every
            // equally good action is seen and can be drawn at random.
            let score = self.minimax(&child, depth - 1, best_score - 1, INF, me);
            if self.aborted {
                return None;
            }
            if score > best_score {
                best_score = score;
                best_actions.clear();
                best_actions.push(action);
            } else if score == best_score {
                best_actions.push(action);
            }
        }
        if best_actions.is_empty() {
            return None;
        }
        let i = self.rng.usize(..best_actions.len());
        Some((best_actions.swap_remove(i), best_score))
    }

    fn minimax(&mut self, state: &GameState, depth: u8, mut alpha: i32, mut beta: i32, me: Player) -> i32 {
        self.nodes += 1;
        if depth == 0 || state.is_finished() {
            return self.evaluate(state, me);
        }
        if self.time_up() {
            self.aborted = true;
            return self.evaluate(state, me);
        }

        let maximizing = state.turn() == me;
        let hash = self.zobrist.hash(state);
        let key = self.zobrist.search_key(hash, depth, maximizing);
        if let Some(score) = self.tt.probe(key, depth, alpha, beta) {
            return score;
        }

        let actions = legal_actions(state);
        if actions.is_empty() {
            return self.evaluate(state, me);
        }
        let hint = self.tt.best_action(hash).cloned();
        let children = self.expand(state, &actions, me, depth > 1, hint.as_ref());

        let (alpha0, beta0) = (alpha, beta);
        let mut best = if maximizing { -INF } else { INF };
        let mut best_action = None;
        for (action, child) in children {
            let score = self.minimax(&child, depth - 1, alpha, beta, me);
            if self.aborted {
                return if best_action.is_some() { best } else { score };
            }
            if maximizing {
                if score > best {
                    best = score;
                    best_action = Some(action);
                }
                alpha = alpha.max(score);
            } else {
                if score < best {
                    best = score;
                    best_action = Some(action);
                }
                beta = beta.min(score);
            }
            if alpha >= beta {
                break;
            }
        }

        let entry_type = if best <= alpha0 {
            EntryType::UpperBound
        } else if best >= beta0 {
            EntryType::LowerBound
        } else {
            EntryType::Exact
        };
        self.tt.store(key, depth, best, entry_type);
        if let Some(action) = best_action {
            self.tt.store_action(hash, action);
        }
        best
    }

    /// Placement needs no tree: maximize immediate reach, avoid the rim, and
    /// when we also place the next stone, score the best pair.
    fn best_placement(&mut self, state: &GameState, actions: &[PlayerAction]) -> SearchOutcome {
        let me = state.turn();
        let pair = state.next_placing_player() == Some(me);
        let mut best_score = i32::MIN;
        let mut best_actions: Vec<PlayerAction> = Vec::new();

        for action in actions {
            let mut child = state.clone();
            if !child.apply_action(action) {
                continue;
            }
            self.nodes += 1;
            let mut score = placement_value(child.board(), me);
            if pair && !self.time_up() {
                for follow in legal_actions(&child) {
                    let mut grandchild = child.clone();
                    if grandchild.apply_action(&follow) {
                        self.nodes += 1;
                        score = score.max(placement_value(grandchild.board(), me));
                    }
                }
            }
            if score > best_score {
                best_score = score;
                best_actions.clear();
                best_actions.push(action.clone());
            } else if score == best_score {
                best_actions.push(action.clone());
            }
        }

        if best_actions.is_empty() {
            best_actions = actions.to_vec();
        }
        let i = self.rng.usize(..best_actions.len());
        let action = best_actions.swap_remove(i);
        debug!(%action, score = best_score, pair, "placement chosen");
        SearchOutcome {
            action,
            score: best_score,
            depth: if pair { 2 } else { 1 },
            nodes: self.nodes,
        }
    }
}

/// Reach of `player`'s stones, minus a penalty for every board edge they touch.
/// Scaled by ten so it stays an integer.
pub fn placement_value(board: &Board, player: Player) -> i32 {
    let reach = reachable_cells(board, player, MAX_STEPS).len() as f64;
    let last = board.size() - 1;
    let edges: usize = board
        .stones_of(player)
        .map(|p| {
            usize::from(p.x == 0)
                + usize::from(p.y == 0)
                + usize::from(p.x == last)
                + usize::from(p.y == last)
        })
        .sum();
    ((reach - EDGE_PENALTY * edges as f64) * 10.0).round() as i32
}

/// Stones of `player` that are sealed already, or whose single remaining
/// liberty an opponent can step onto next turn.
pub fn endangered_stones(board: &Board, player: Player, opponents: &[Player]) -> usize {
    let mut threatened = std::collections::BTreeSet::new();
    for &opp in opponents {
        threatened.extend(reachable_cells(board, opp, MAX_STEPS));
    }
    board
        .stones_of(player)
        .filter(|&s| {
            let mut libs = liberty_cells(board, s);
            match (libs.next(), libs.next()) {
                (None, _) => true,
                (Some(only), None) => threatened.contains(&only),
                _ => false,
            }
        })
        .count()
}

/// Candidates that do not leave more of our stones endangered than before.
/// Falls back to every action when none qualify.
pub fn suicide_filter(state: &GameState, actions: &[PlayerAction]) -> Vec<PlayerAction> {
    let me = state.turn();
    let opponents = state.opponents(me);
    let before = endangered_stones(state.board(), me, &opponents);
    let safe: Vec<PlayerAction> = actions
        .iter()
        .filter(|a| {
            let mut child = state.clone();
            child.apply_action(a) && endangered_stones(child.board(), me, &opponents) <= before
        })
        .cloned()
        .collect();
    if safe.is_empty() {
        debug!(candidates = actions.len(), "every candidate is risky, keeping all");
        actions.to_vec()
    } else {
        safe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Direction, Pos};
    use crate::game::GameConfig;

    fn play_state() -> GameState {
        let mut board = Board::new(4);
        board.place_stone(Pos::new(0, 0), Player::Red);
        board.place_stone(Pos::new(3, 3), Player::Blue);
        GameState::in_play(GameConfig::default(), board, Player::Red).unwrap()
    }

    #[test]
    fn test_empty_action_set_returns_none() {
        let mut searcher = Searcher::with_seed(SearchConfig::default(), 1);
        assert_eq!(searcher.best_action(&play_state(), &[], Duration::from_millis(50)), None);
    }

    #[test]
    fn test_result_is_one_of_the_candidates() {
        let state = play_state();
        let actions = legal_actions(&state);
        let config = SearchConfig {
            max_depth: 2,
            ..SearchConfig::default()
        };
        let mut searcher = Searcher::with_seed(config, 7);
        let outcome = searcher
            .best_action(&state, &actions, Duration::from_secs(5))
            .unwrap();
        assert!(actions.contains(&outcome.action));
        assert_eq!(outcome.depth, 2);
        assert!(outcome.nodes > 0);
    }

    #[test]
    fn test_best_move_is_found_by_position_for_the_next_iteration() {
        let state = play_state();
        let mut searcher = Searcher::with_seed(SearchConfig::default(), 2);
        searcher.zobrist = ZobristTable::new(state.board().size());
        searcher.minimax(&state, 2, -INF, INF, Player::Red);

        let hash = searcher.zobrist.hash(&state);
        let hint = searcher.tt.best_action(hash).cloned().expect("no move recorded");
        assert!(state.is_action_legal(&hint), "{hint}");
        // The depth-3 score key differs, the move lookup does not.
        assert!(searcher.tt.probe(searcher.zobrist.search_key(hash, 3, true), 3, -INF, INF).is_none());
    }

    #[test]
    fn test_zero_budget_falls_back_to_random_candidate() {
        let state = play_state();
        let actions = legal_actions(&state);
        let mut searcher = Searcher::with_seed(SearchConfig::default(), 3);
        let outcome = searcher.best_action(&state, &actions, Duration::ZERO).unwrap();
        assert_eq!(outcome.depth, 0);
        assert!(actions.contains(&outcome.action));
    }

    #[test]
    fn test_takes_immediate_win() {
        // Walling the last gap gives Red twelve cells against Blue's four.
        let mut board = Board::new(4);
        for y in 0..3 {
            board.set_wall(Pos::new(2, y), Direction::Right, Player::Red);
        }
        board.place_stone(Pos::new(2, 3), Player::Red);
        board.place_stone(Pos::new(3, 0), Player::Blue);
        board.place_stone(Pos::new(3, 1), Player::Blue);
        let state = GameState::in_play(GameConfig::default(), board, Player::Red).unwrap();
        let actions = legal_actions(&state);
        let config = SearchConfig {
            max_depth: 1,
            ..SearchConfig::default()
        };
        let mut searcher = Searcher::with_seed(config, 11);
        let outcome = searcher
            .best_action(&state, &actions, Duration::from_secs(5))
            .unwrap();
        assert!(outcome.score >= WIN_SCORE, "{outcome:?}");
        let mut after = state.clone();
        assert!(after.apply_action(&outcome.action));
        assert_eq!(after.result().and_then(|r| r.winner), Some(Player::Red));
    }

    #[test]
    fn test_placement_avoids_the_rim() {
        let state = GameState::default();
        let actions = legal_actions(&state);
        let mut searcher = Searcher::with_seed(SearchConfig::default(), 5);
        let outcome = searcher
            .best_action(&state, &actions, Duration::from_secs(5))
            .unwrap();
        let PlayerAction::Place { pos } = outcome.action else {
            panic!("expected a placement, got {}", outcome.action);
        };
        assert!(pos.x >= 2 && pos.x <= 4 && pos.y >= 2 && pos.y <= 4, "{pos}");
    }

    #[test]
    fn test_suicide_filter_never_empties_the_set() {
        // Red is boxed into a corner pocket: every option is equally bad.
        let mut board = Board::new(3);
        board.place_stone(Pos::new(0, 0), Player::Red);
        board.set_wall(Pos::new(0, 0), Direction::Bottom, Player::Blue);
        board.place_stone(Pos::new(2, 0), Player::Blue);
        let state = GameState::in_play(GameConfig::default(), board, Player::Red).unwrap();
        let actions = legal_actions(&state);
        let filtered = suicide_filter(&state, &actions);
        assert!(!filtered.is_empty());
        assert!(filtered.iter().all(|a| actions.contains(a)));
    }

    #[test]
    fn test_endangered_counts_single_reachable_liberty() {
        let mut board = Board::new(3);
        board.place_stone(Pos::new(0, 0), Player::Red);
        board.set_wall(Pos::new(0, 0), Direction::Bottom, Player::Blue);
        assert_eq!(endangered_stones(&board, Player::Red, &[Player::Blue]), 0);
        board.place_stone(Pos::new(2, 0), Player::Blue);
        assert_eq!(endangered_stones(&board, Player::Red, &[Player::Blue]), 1);
    }
}
