//! Computer players and the request/response boundary around them.
//!
//! An agent receives a snapshot and answers with exactly one
//! [`AgentResponse`]. Failures inside the search never cross the boundary as
//! panics: they come back as `{ error, detail }` responses.
//!
//! [`AgentWorker`] runs one agent on its own thread. Snapshots go in by value
//! over a channel and replies come back tagged with the caller's request id,
//! so the owner can poll without blocking and drop anything it no longer
//! wants.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::action::{legal_actions, PlayerAction};
use crate::board::Player;
use crate::constants::{DEEP_BUDGET, DEVIL_BUDGET, FAST_BUDGET, MAX_SEARCH_DEPTH};
use crate::eval::Evaluator;
use crate::game::GameState;
use crate::search::{SearchConfig, Searcher};

pub const GAME_FINISHED_INFO: &str = "game already finished";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    /// Uniformly random legal action.
    Random,
    /// One-ply look-ahead with the suicide filter.
    HeuristicFast,
    /// Iterative deepening with the suicide filter.
    HeuristicDeep,
    /// Iterative deepening on the aggressive evaluator, suicide filter on.
    Devil,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Random,
        AgentKind::HeuristicFast,
        AgentKind::HeuristicDeep,
        AgentKind::Devil,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AgentKind::Random => "random",
            AgentKind::HeuristicFast => "heuristic-fast",
            AgentKind::HeuristicDeep => "heuristic-deep",
            AgentKind::Devil => "devil",
        }
    }

    pub fn time_budget(self) -> Duration {
        match self {
            AgentKind::Random => Duration::ZERO,
            AgentKind::HeuristicFast => FAST_BUDGET,
            AgentKind::HeuristicDeep => DEEP_BUDGET,
            AgentKind::Devil => DEVIL_BUDGET,
        }
    }

    /// Search settings, `None` for agents that do not search.
    pub fn search_config(self) -> Option<SearchConfig> {
        let config = match self {
            AgentKind::Random => return None,
            AgentKind::HeuristicFast => SearchConfig {
                max_depth: 1,
                suicide_filter: true,
                ..SearchConfig::default()
            },
            AgentKind::HeuristicDeep => SearchConfig {
                max_depth: MAX_SEARCH_DEPTH,
                suicide_filter: true,
                ..SearchConfig::default()
            },
            AgentKind::Devil => SearchConfig {
                evaluator: Evaluator::Devil,
                suicide_filter: true,
                ..SearchConfig::default()
            },
        };
        Some(config)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AgentKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| AgentError::UnknownAgent(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    #[error("unknown agent kind `{0}`")]
    UnknownAgent(String),
    #[error("a request is already in flight")]
    Busy,
    #[error("agent worker is not running")]
    Disconnected,
    #[error("failed to start agent worker: {0}")]
    Spawn(String),
    #[error("no legal action for {player} while the game is still running")]
    NoLegalAction { player: Player },
    #[error("{message}")]
    SearchFault {
        message: String,
        detail: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    pub agent_kind: AgentKind,
    pub snapshot: GameState,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentResponse {
    Action {
        action: PlayerAction,
    },
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    Info {
        info: String,
    },
}

impl AgentResponse {
    pub fn error(error: impl Into<String>, detail: Option<String>) -> Self {
        AgentResponse::Error {
            error: error.into(),
            detail,
        }
    }

    pub fn action(&self) -> Option<&PlayerAction> {
        match self {
            AgentResponse::Action { action } => Some(action),
            _ => None,
        }
    }
}

impl From<AgentError> for AgentResponse {
    fn from(e: AgentError) -> Self {
        match e {
            AgentError::SearchFault { message, detail } => AgentResponse::error(message, detail),
            other => AgentResponse::error(other.to_string(), None),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// A computer player.
pub struct Agent {
    kind: AgentKind,
    budget: Duration,
    searcher: Option<Searcher>,
    rng: fastrand::Rng,
}

impl Agent {
    pub fn new(kind: AgentKind) -> Self {
        Self::build(kind, fastrand::Rng::new(), None)
    }

    pub fn with_seed(kind: AgentKind, seed: u64) -> Self {
        Self::build(kind, fastrand::Rng::with_seed(seed), Some(seed))
    }

    fn build(kind: AgentKind, rng: fastrand::Rng, seed: Option<u64>) -> Self {
        let searcher = kind.search_config().map(|config| match seed {
            Some(seed) => Searcher::with_seed(config, seed),
            None => Searcher::new(config),
        });
        Self {
            kind,
            budget: kind.time_budget(),
            searcher,
            rng,
        }
    }

    /// Override the per-move time budget.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    /// Cancellation flag checked by the search between nodes. Searches
    /// started after this call watch `stop`.
    pub fn set_stop_flag(&mut self, stop: Arc<AtomicBool>) {
        if let Some(searcher) = self.searcher.as_mut() {
            searcher.set_stop_flag(stop);
        }
    }

    /// `Ok(None)` when the game is over.
    pub fn choose_action(&mut self, state: &GameState) -> Result<Option<PlayerAction>, AgentError> {
        if state.is_finished() {
            return Ok(None);
        }
        let actions = legal_actions(state);
        if actions.is_empty() {
            return Err(AgentError::NoLegalAction {
                player: state.turn(),
            });
        }
        let action = match self.searcher.as_mut() {
            None => actions[self.rng.usize(..actions.len())].clone(),
            Some(searcher) => searcher
                .best_action(state, &actions, self.budget)
                .map(|outcome| outcome.action)
                .ok_or(AgentError::NoLegalAction {
                    player: state.turn(),
                })?,
        };
        debug!(agent = %self.kind, player = %state.turn(), %action, "agent chose action");
        Ok(Some(action))
    }

    /// Answer one snapshot. Never panics.
    pub fn respond(&mut self, snapshot: &GameState) -> AgentResponse {
        match panic::catch_unwind(AssertUnwindSafe(|| self.choose_action(snapshot))) {
            Ok(Ok(Some(action))) => AgentResponse::Action { action },
            Ok(Ok(None)) => AgentResponse::Info {
                info: GAME_FINISHED_INFO.to_string(),
            },
            Ok(Err(e)) => {
                warn!(agent = %self.kind, error = %e, "agent failed");
                e.into()
            }
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                warn!(agent = %self.kind, %detail, "search panicked");
                AgentResponse::error("search fault", Some(detail))
            }
        }
    }
}

/// One-shot handling of a boundary request.
pub fn handle_request(request: &AgentRequest) -> AgentResponse {
    Agent::new(request.agent_kind).respond(&request.snapshot)
}

/// A response paired with the id of the request it answers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentReply {
    pub id: u64,
    pub response: AgentResponse,
}

/// A snapshot to answer, with the flag that cancels this request alone.
type Job = (u64, GameState, Arc<AtomicBool>);

/// An agent running on a background thread.
pub struct AgentWorker {
    kind: AgentKind,
    requests: Option<Sender<Job>>,
    replies: Receiver<AgentReply>,
    /// Cancellation flag of the most recent request.
    stop: Arc<AtomicBool>,
    in_flight: Option<u64>,
    handle: Option<JoinHandle<()>>,
}

impl AgentWorker {
    pub fn spawn(kind: AgentKind) -> Result<Self, AgentError> {
        Self::spawn_agent(Agent::new(kind))
    }

    pub fn spawn_agent(mut agent: Agent) -> Result<Self, AgentError> {
        let kind = agent.kind();
        let (request_tx, request_rx) = mpsc::channel::<Job>();
        let (reply_tx, reply_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name(format!("agent-{kind}"))
            .spawn(move || {
                for (id, snapshot, stop) in request_rx {
                    trace!(id, agent = %kind, "request received");
                    agent.set_stop_flag(stop);
                    let response = agent.respond(&snapshot);
                    if reply_tx.send(AgentReply { id, response }).is_err() {
                        break;
                    }
                }
                debug!(agent = %kind, "agent worker exiting");
            })
            .map_err(|e| AgentError::Spawn(e.to_string()))?;

        Ok(Self {
            kind,
            requests: Some(request_tx),
            replies: reply_rx,
            stop: Arc::new(AtomicBool::new(false)),
            in_flight: None,
            handle: Some(handle),
        })
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Hand a snapshot to the worker. Only one request may be in flight.
    pub fn request(&mut self, id: u64, snapshot: GameState) -> Result<(), AgentError> {
        if self.in_flight.is_some() {
            return Err(AgentError::Busy);
        }
        let sender = self.requests.as_ref().ok_or(AgentError::Disconnected)?;
        let stop = Arc::new(AtomicBool::new(false));
        sender
            .send((id, snapshot, Arc::clone(&stop)))
            .map_err(|_| AgentError::Disconnected)?;
        self.stop = stop;
        self.in_flight = Some(id);
        Ok(())
    }

    /// Accept a reply only if it answers the request still in flight.
    fn accept(&mut self, reply: AgentReply) -> Option<AgentReply> {
        if self.in_flight == Some(reply.id) {
            self.in_flight = None;
            Some(reply)
        } else {
            trace!(id = reply.id, "dropping reply to a cancelled request");
            None
        }
    }

    /// Non-blocking poll for the in-flight reply.
    pub fn try_recv(&mut self) -> Result<Option<AgentReply>, AgentError> {
        loop {
            match self.replies.try_recv() {
                Ok(reply) => {
                    if let Some(reply) = self.accept(reply) {
                        return Ok(Some(reply));
                    }
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => {
                    self.in_flight = None;
                    return Err(AgentError::Disconnected);
                }
            }
        }
    }

    /// Wait up to `timeout` for the in-flight reply.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<AgentReply>, AgentError> {
        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.replies.recv_timeout(left) {
                Ok(reply) => {
                    if let Some(reply) = self.accept(reply) {
                        return Ok(Some(reply));
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => {
                    self.in_flight = None;
                    return Err(AgentError::Disconnected);
                }
            }
        }
    }

    /// Abort the in-flight search. Its reply, if one still arrives, is
    /// dropped.
    pub fn cancel(&mut self) {
        if let Some(id) = self.in_flight.take() {
            debug!(id, agent = %self.kind, "cancelling in-flight request");
            self.stop.store(true, Ordering::Relaxed);
        }
    }
}

impl Drop for AgentWorker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.requests = None;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Pos;

    #[test]
    fn test_agent_kind_names_round_trip() {
        for kind in AgentKind::ALL {
            assert_eq!(kind.name().parse::<AgentKind>(), Ok(kind));
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
        }
        assert!("grandmaster".parse::<AgentKind>().is_err());
    }

    #[test]
    fn test_response_shapes() {
        let action = AgentResponse::Action {
            action: PlayerAction::place(Pos::new(1, 2)),
        };
        assert_eq!(
            serde_json::to_string(&action).unwrap(),
            r#"{"action":{"type":"place","pos":{"x":1,"y":2}}}"#
        );
        let error = AgentResponse::error("boom", None);
        assert_eq!(serde_json::to_string(&error).unwrap(), r#"{"error":"boom"}"#);

        let info: AgentResponse = serde_json::from_str(r#"{"info":"game already finished"}"#).unwrap();
        assert_eq!(
            info,
            AgentResponse::Info {
                info: GAME_FINISHED_INFO.to_string()
            }
        );
        let detailed: AgentResponse =
            serde_json::from_str(r#"{"error":"search fault","detail":"index out of bounds"}"#)
                .unwrap();
        assert_eq!(detailed.action(), None);
    }

    #[test]
    fn test_random_agent_places_on_empty_cell() {
        let mut agent = Agent::with_seed(AgentKind::Random, 9);
        let state = GameState::default();
        let response = agent.respond(&state);
        let action = response.action().cloned().unwrap();
        assert!(state.is_action_legal(&action));
    }

    #[test]
    fn test_request_json_round_trip_keeps_snapshot() {
        let mut state = GameState::default();
        assert!(state.place(Pos::new(3, 3)));
        let request = AgentRequest {
            agent_kind: AgentKind::HeuristicFast,
            snapshot: state.clone(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""agentKind":"heuristic-fast""#));
        let back: AgentRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.snapshot, state);
    }
}
