//! Wallgo-Rust: rules engine and search for a wall-building territory game.
//!
//! Players place stones on a 7x7 grid, then take turns moving one stone up
//! to two steps and building a wall next to it. Walls split the board into
//! regions; a region holding stones of a single player is that player's
//! territory, and the larger territory wins once every region is decided.
//!
//! ## Modules
//!
//! - [`constants`] - Board dimensions, rule limits, weights, and budgets
//! - [`board`] - Cells, stones, and canonical wall storage
//! - [`movegen`] - Step-limited reachability under walls
//! - [`territory`] - Region flood fill and scoring
//! - [`game`] - The placing/playing/finished state machine
//! - [`action`] - Player actions and legal-action enumeration
//! - [`history`] - Undo/redo stacks
//! - [`session`] - The authoritative game owner
//! - [`eval`] - Static evaluation functions
//! - [`zobrist`] / [`tt`] - Position hashing and the transposition table
//! - [`search`] - Iterative-deepening alpha-beta
//! - [`agent`] - Computer players and the background worker
//! - [`protocol`] - JSON-lines request server
//!
//! ## Example
//!
//! ```
//! use wallgo_rust::action::legal_actions;
//! use wallgo_rust::agent::{Agent, AgentKind};
//! use wallgo_rust::game::{GameConfig, GameState};
//!
//! let mut state = GameState::new(GameConfig::default()).unwrap();
//! let mut agent = Agent::with_seed(AgentKind::Random, 42);
//! let action = agent.choose_action(&state).unwrap().unwrap();
//! assert!(legal_actions(&state).contains(&action));
//! assert!(state.apply_action(&action));
//! ```

pub mod action;
pub mod agent;
pub mod board;
pub mod constants;
pub mod eval;
pub mod game;
pub mod history;
pub mod movegen;
pub mod protocol;
pub mod search;
pub mod session;
pub mod territory;
pub mod tt;
pub mod zobrist;
