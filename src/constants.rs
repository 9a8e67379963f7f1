//! Constants for board geometry, rules, evaluation weights, and search parameters.
//!
//! This module contains all the tunable configuration for the engine.
//! The shipped board is a fixed 7x7 grid; smaller boards are only built
//! by tests through [`crate::game::GameConfig`].

use std::time::Duration;

// =============================================================================
// Board Geometry
// =============================================================================

/// Board size (NxN).
pub const N: usize = 7;

/// Largest player set the data model supports.
pub const MAX_PLAYERS: usize = 4;

// =============================================================================
// Rules
// =============================================================================

/// Stones each player places during the placing phase.
pub const STONES_PER_PLAYER: usize = 4;

/// Step budget for a single turn (orthogonal grid steps).
pub const MAX_STEPS: u8 = 2;

// =============================================================================
// Evaluation Weights
// =============================================================================

/// ZOC weight of an occupied cell relative to an empty one.
pub const OCCUPIED_CELL_WEIGHT: f64 = 0.2;

/// Multiplier applied to the zone-of-control score.
pub const WEIGHT_ZOC: f64 = 100.0;

/// Multiplier applied to the territory-potential score.
pub const WEIGHT_TERRITORY: f64 = 4.0;

/// Territory discount per stone pressing on a region from outside.
pub const TERRITORY_BORDER_PENALTY: f64 = 10.0;

/// Multiplier applied to the liberty score.
pub const WEIGHT_LIBERTY: f64 = 1.0;

/// Penalty for a stone with no liberties.
pub const CAPTURED_STONE_PENALTY: f64 = 30.0;

/// Penalty for a stone with a single liberty.
pub const ATARI_STONE_PENALTY: f64 = 8.0;

/// Devil evaluator: weight of the reachable-cell difference.
pub const DEVIL_REACH_WEIGHT: f64 = 6.0;

/// Devil evaluator: weight of the liberty-sum difference.
pub const DEVIL_LIBERTY_WEIGHT: f64 = 4.0;

/// Score for a won terminal position (before the margin bonus).
pub const WIN_SCORE: i32 = 1_000_000;

/// Bonus per cell of score margin in terminal positions.
pub const MARGIN_SCORE: i32 = 1_000;

// =============================================================================
// Search Parameters
// =============================================================================

/// Hard ceiling for iterative deepening.
pub const MAX_SEARCH_DEPTH: u8 = 8;

/// Slots in the transposition table.
pub const TT_ENTRIES: usize = 1 << 16;

/// Seed for the Zobrist key table. Fixed so hashes are reproducible.
pub const ZOBRIST_SEED: u64 = 0x5EED_0F_7A11_5A1D;

/// Placement heuristic: penalty per board edge a cell touches.
pub const EDGE_PENALTY: f64 = 2.0;

// =============================================================================
// Agent Time Budgets
// =============================================================================

/// Time budget for the one-ply heuristic agent.
pub const FAST_BUDGET: Duration = Duration::from_millis(300);

/// Time budget for the iterative-deepening agent.
pub const DEEP_BUDGET: Duration = Duration::from_millis(1500);

/// Time budget for the devil agent.
pub const DEVIL_BUDGET: Duration = Duration::from_millis(2000);
