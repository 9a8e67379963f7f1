//! Static evaluation of positions.
//!
//! All scores are from the point of view of one player (`me`) against the
//! union of everyone else. Positive is good for `me`.

use crate::board::{Board, Player, Pos};
use crate::constants::*;
use crate::game::GameState;
use crate::movegen::{can_step, distance_field, reachable_cells};
use crate::territory::regions;

/// Neighbors a stone at `pos` could step into right now.
pub fn liberty_cells(board: &Board, pos: Pos) -> impl Iterator<Item = Pos> + '_ {
    board
        .neighbors(pos)
        .map(|(_, n)| n)
        .filter(move |&n| can_step(board, pos, n))
}

pub fn liberties(board: &Board, pos: Pos) -> usize {
    liberty_cells(board, pos).count()
}

fn stones_of_all<'a>(board: &'a Board, players: &'a [Player]) -> impl Iterator<Item = Pos> + 'a {
    board
        .stones()
        .filter(|(_, p)| players.contains(p))
        .map(|(pos, _)| pos)
}

#[inline]
fn closeness(d: Option<u32>) -> f64 {
    d.map_or(0.0, |d| 1.0 / (f64::from(d) + 1.0))
}

/// Zone of control: per cell, how much closer `me` is than the nearest
/// opponent, with occupied cells counting for less than empty ones.
pub fn zoc_score(board: &Board, me: Player, opponents: &[Player]) -> f64 {
    let mine = distance_field(board, board.stones_of(me), None);
    let theirs = distance_field(board, stones_of_all(board, opponents), None);
    board
        .positions()
        .map(|pos| {
            let i = board.index(pos);
            let weight = if board.stone(pos).is_some() {
                OCCUPIED_CELL_WEIGHT
            } else {
                1.0
            };
            weight * (closeness(mine[i]) - closeness(theirs[i]))
        })
        .sum()
}

/// Owned regions, discounted by the stones pressing on them from outside.
pub fn territory_potential(board: &Board, me: Player, opponents: &[Player]) -> f64 {
    let mut total = 0.0;
    for region in regions(board) {
        let Some(owner) = region.owner() else {
            continue;
        };
        let value = region.area() as f64
            - TERRITORY_BORDER_PENALTY * region.border_stone_count(board) as f64;
        if owner == me {
            total += value;
        } else if opponents.contains(&owner) {
            total -= value;
        }
    }
    total
}

/// Liberty sum of a set of stones minus penalties for trapped ones.
fn liberty_health(board: &Board, stones: impl Iterator<Item = Pos>) -> f64 {
    stones
        .map(|s| match liberties(board, s) {
            0 => -CAPTURED_STONE_PENALTY,
            1 => 1.0 - ATARI_STONE_PENALTY,
            n => n as f64,
        })
        .sum()
}

pub fn liberty_score(board: &Board, me: Player, opponents: &[Player]) -> f64 {
    liberty_health(board, board.stones_of(me))
        - liberty_health(board, stones_of_all(board, opponents))
}

/// Aggressive evaluation: shrink the opponents' reach and liberties while
/// keeping our own.
pub fn devil_score(board: &Board, me: Player, opponents: &[Player]) -> f64 {
    let my_reach = reachable_cells(board, me, MAX_STEPS).len() as f64;
    let their_reach = opponents
        .iter()
        .map(|&p| reachable_cells(board, p, MAX_STEPS).len() as f64)
        .sum::<f64>();
    let my_libs: usize = board.stones_of(me).map(|s| liberties(board, s)).sum();
    let their_libs: usize = stones_of_all(board, opponents)
        .map(|s| liberties(board, s))
        .sum();
    DEVIL_REACH_WEIGHT * (my_reach - their_reach)
        + DEVIL_LIBERTY_WEIGHT * (my_libs as f64 - their_libs as f64)
        + liberty_score(board, me, opponents)
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Evaluator {
    #[default]
    Composite,
    Devil,
}

impl Evaluator {
    /// Score a state for `me`. Finished games score beyond any heuristic
    /// value, adjusted by the final margin.
    pub fn evaluate(self, state: &GameState, me: Player) -> i32 {
        let opponents = state.opponents(me);
        if let Some(result) = state.result().filter(|r| r.finished) {
            let mine = result.score_per_player.get(&me).copied().unwrap_or(0) as i32;
            let best_other = opponents
                .iter()
                .filter_map(|p| result.score_per_player.get(p))
                .copied()
                .max()
                .unwrap_or(0) as i32;
            let margin = (mine - best_other) * MARGIN_SCORE;
            return match result.winner {
                Some(w) if w == me => WIN_SCORE + margin,
                Some(_) => -WIN_SCORE + margin,
                None => margin,
            };
        }

        let board = state.board();
        let raw = match self {
            Evaluator::Composite => {
                WEIGHT_ZOC * zoc_score(board, me, &opponents)
                    + WEIGHT_TERRITORY * territory_potential(board, me, &opponents)
                    + WEIGHT_LIBERTY * liberty_score(board, me, &opponents)
            }
            Evaluator::Devil => {
                devil_score(board, me, &opponents)
                    + WEIGHT_TERRITORY * territory_potential(board, me, &opponents)
            }
        };
        let bound = f64::from(WIN_SCORE / 2);
        raw.round().clamp(-bound, bound) as i32
    }
}
