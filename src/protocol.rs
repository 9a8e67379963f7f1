//! Line-oriented JSON front end for the agents.
//!
//! Each input line holds one [`AgentRequest`]; each gets exactly one
//! [`AgentResponse`] line back, in order. Blank lines and lines starting
//! with `#` are skipped. A line that does not parse is answered with an
//! error response rather than ending the session.
//!
//! ```text
//! > {"agentKind":"random","snapshot":{...}}
//! < {"action":{"type":"place","pos":{"x":3,"y":3}}}
//! ```

use std::collections::HashMap;
use std::io::{self, BufRead, Write};

use tracing::{debug, info};

use crate::agent::{Agent, AgentKind, AgentRequest, AgentResponse};

/// Serves agent requests, keeping one agent per kind alive between requests.
#[derive(Default)]
pub struct ProtocolServer {
    agents: HashMap<AgentKind, Agent>,
    seed: Option<u64>,
    handled: u64,
}

impl ProtocolServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed every agent this server creates.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn handled(&self) -> u64 {
        self.handled
    }

    /// Answer requests from `input` until it ends.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        info!("serving agent requests");
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let response = self.execute_line(line);
            serde_json::to_writer(&mut output, &response)?;
            writeln!(output)?;
            output.flush()?;
        }
        debug!(handled = self.handled, "input closed");
        Ok(())
    }

    /// Parse and answer a single request line.
    pub fn execute_line(&mut self, line: &str) -> AgentResponse {
        self.handled += 1;
        match serde_json::from_str::<AgentRequest>(line) {
            Ok(request) => self.execute(&request),
            Err(e) => AgentResponse::error("invalid request", Some(e.to_string())),
        }
    }

    pub fn execute(&mut self, request: &AgentRequest) -> AgentResponse {
        let seed = self.seed;
        let agent = self
            .agents
            .entry(request.agent_kind)
            .or_insert_with(|| match seed {
                Some(seed) => Agent::with_seed(request.agent_kind, seed),
                None => Agent::new(request.agent_kind),
            });
        agent.respond(&request.snapshot)
    }
}
