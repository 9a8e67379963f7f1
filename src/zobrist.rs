//! Zobrist hashing for transposition lookups.
//!
//! Every independent component of a [`GameState`] that can influence the
//! search (stones, walls, selection, step count, side to move, phase) gets its
//! own random key; a position hash is the XOR of the keys that are present.

use crate::board::{Player, Pos};
use crate::constants::{MAX_PLAYERS, MAX_SEARCH_DEPTH, MAX_STEPS, ZOBRIST_SEED};
use crate::game::{GameState, Phase};

pub struct ZobristTable {
    size: usize,
    stones: Vec<[u64; MAX_PLAYERS]>,
    walls_top: Vec<[u64; MAX_PLAYERS]>,
    walls_left: Vec<[u64; MAX_PLAYERS]>,
    selected: Vec<u64>,
    steps: [u64; MAX_STEPS as usize + 1],
    turn: [u64; MAX_PLAYERS],
    phase: [u64; 3],
    depth: [u64; MAX_SEARCH_DEPTH as usize + 1],
    maximizing: u64,
}

impl ZobristTable {
    /// Key table for a `size`x`size` board. Keys come from a fixed seed so
    /// hashes are reproducible across runs.
    pub fn new(size: usize) -> Self {
        let mut rng = fastrand::Rng::with_seed(ZOBRIST_SEED);
        let cells = size * size;
        let per_player = |rng: &mut fastrand::Rng| -> Vec<[u64; MAX_PLAYERS]> {
            (0..cells)
                .map(|_| std::array::from_fn(|_| rng.u64(..)))
                .collect()
        };
        let stones = per_player(&mut rng);
        let walls_top = per_player(&mut rng);
        let walls_left = per_player(&mut rng);
        Self {
            size,
            stones,
            walls_top,
            walls_left,
            selected: (0..cells).map(|_| rng.u64(..)).collect(),
            steps: std::array::from_fn(|_| rng.u64(..)),
            turn: std::array::from_fn(|_| rng.u64(..)),
            phase: std::array::from_fn(|_| rng.u64(..)),
            depth: std::array::from_fn(|_| rng.u64(..)),
            maximizing: rng.u64(..),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn index(&self, pos: Pos) -> usize {
        pos.y * self.size + pos.x
    }

    /// Full hash of a state. The board must match the table's size.
    pub fn hash(&self, state: &GameState) -> u64 {
        let board = state.board();
        debug_assert_eq!(board.size(), self.size);
        let mut h = 0u64;
        for pos in board.positions() {
            let i = self.index(pos);
            let cell = board.cell(pos);
            if let Some(p) = cell.stone {
                h ^= self.stone_key(pos, p);
            }
            if let Some(p) = cell.wall_top {
                h ^= self.walls_top[i][p.index()];
            }
            if let Some(p) = cell.wall_left {
                h ^= self.walls_left[i][p.index()];
            }
        }
        if let Some(sel) = state.selected() {
            h ^= self.selected[self.index(sel)];
        }
        h ^= self.steps[usize::from(state.steps_taken().min(MAX_STEPS))];
        h ^= self.turn[state.turn().index()];
        h ^= self.phase[phase_index(state.phase())];
        h
    }

    /// Fold search depth and the maximizing flag into a position hash, so
    /// values from different search contexts never share a key.
    #[inline]
    pub fn search_key(&self, hash: u64, depth: u8, maximizing: bool) -> u64 {
        let d = usize::from(depth.min(MAX_SEARCH_DEPTH));
        let flag = if maximizing { self.maximizing } else { 0 };
        hash ^ self.depth[d] ^ flag
    }

    /// Key for a single stone.
    #[inline]
    pub fn stone_key(&self, pos: Pos, player: Player) -> u64 {
        self.stones[self.index(pos)][player.index()]
    }
}

fn phase_index(phase: Phase) -> usize {
    match phase {
        Phase::Placing => 0,
        Phase::Playing => 1,
        Phase::Finished => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Direction};
    use crate::game::GameConfig;

    fn sample() -> GameState {
        let mut board = Board::new(4);
        board.place_stone(Pos::new(0, 0), Player::Red);
        board.place_stone(Pos::new(3, 3), Player::Blue);
        GameState::in_play(GameConfig::default(), board, Player::Red).unwrap()
    }

    #[test]
    fn test_hash_is_reproducible() {
        let a = ZobristTable::new(4);
        let b = ZobristTable::new(4);
        let state = sample();
        assert_eq!(a.hash(&state), b.hash(&state));
        assert_eq!(a.hash(&state), a.hash(&state.clone()));
    }

    #[test]
    fn test_single_change_changes_hash() {
        let zt = ZobristTable::new(4);
        let state = sample();
        let base = zt.hash(&state);

        let mut walled = state.clone();
        assert!(walled.select_stone(Pos::new(0, 0)));
        let selected = zt.hash(&walled);
        assert_ne!(selected, base);
        assert!(walled.build_wall(Pos::new(0, 0), Direction::Right));
        assert_ne!(zt.hash(&walled), base);
        assert_ne!(zt.hash(&walled), selected);
    }

    #[test]
    fn test_stone_key_folds_into_hash() {
        let zt = ZobristTable::new(4);
        let state = sample();
        let mut board = state.board().clone();
        board.place_stone(Pos::new(1, 1), Player::Red);
        let moved = GameState::in_play(GameConfig::default(), board, Player::Red).unwrap();
        assert_eq!(
            zt.hash(&moved),
            zt.hash(&state) ^ zt.stone_key(Pos::new(1, 1), Player::Red)
        );
    }

    #[test]
    fn test_search_key_separates_depth_and_side() {
        let zt = ZobristTable::new(4);
        let h = zt.hash(&sample());
        let mut keys = Vec::new();
        for depth in 0..=MAX_SEARCH_DEPTH {
            for maximizing in [false, true] {
                keys.push(zt.search_key(h, depth, maximizing));
            }
        }
        let mut unique = keys.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), keys.len());
    }
}
