//! Wallgo-Rust command line.
//!
//! ## Usage
//!
//! - `wallgo-rust` - Show a demo
//! - `wallgo-rust serve` - Answer JSON agent requests on stdin/stdout
//! - `wallgo-rust play --red devil --blue heuristic-fast` - Watch two agents play
//!
//! Logs go to stderr; set `RUST_LOG` to change the level.

use std::io;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wallgo_rust::agent::{Agent, AgentKind, AgentWorker};
use wallgo_rust::board::{Direction, Player, Pos};
use wallgo_rust::game::GameConfig;
use wallgo_rust::protocol::ProtocolServer;
use wallgo_rust::session::Game;
use wallgo_rust::territory::territory_map;

/// Wallgo-Rust: territory game engine with alpha-beta agents
#[derive(Parser)]
#[command(name = "wallgo-rust")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one JSON agent request per input line
    Serve {
        /// Seed for reproducible tie-breaking
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Play a full game between two agents
    Play {
        #[arg(long, default_value = "heuristic-deep")]
        red: AgentKind,
        #[arg(long, default_value = "heuristic-fast")]
        blue: AgentKind,
        #[arg(long)]
        seed: Option<u64>,
        /// Per-move budget in milliseconds, overriding each agent's default
        #[arg(long)]
        budget_ms: Option<u64>,
    },
    /// Run a short scripted demo
    Demo,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { seed }) => {
            let mut server = match seed {
                Some(seed) => ProtocolServer::with_seed(seed),
                None => ProtocolServer::new(),
            };
            let stdin = io::stdin();
            server
                .run(stdin.lock(), io::stdout().lock())
                .context("agent request loop failed")?;
        }
        Some(Commands::Play {
            red,
            blue,
            seed,
            budget_ms,
        }) => play(red, blue, seed, budget_ms.map(Duration::from_millis))?,
        Some(Commands::Demo) | None => run_demo()?,
    }
    Ok(())
}

fn play(red: AgentKind, blue: AgentKind, seed: Option<u64>, budget: Option<Duration>) -> Result<()> {
    let make = |kind: AgentKind, offset: u64| {
        let agent = match seed {
            Some(seed) => Agent::with_seed(kind, seed.wrapping_add(offset)),
            None => Agent::new(kind),
        };
        let agent = match budget {
            Some(b) => agent.with_budget(b),
            None => agent,
        };
        AgentWorker::spawn_agent(agent)
    };
    let mut workers = [(Player::Red, make(red, 0)?), (Player::Blue, make(blue, 1)?)];

    let mut game = Game::new(GameConfig::default())?;
    info!(%red, %blue, "starting self-play");
    while !game.state().is_finished() {
        let turn = game.state().turn();
        let Some((_, worker)) = workers.iter_mut().find(|(p, _)| *p == turn) else {
            bail!("no agent seated for {turn}");
        };
        let asked_at = game.generation();
        worker.request(asked_at, game.snapshot())?;
        let reply = loop {
            if let Some(reply) = worker.recv_timeout(Duration::from_millis(50))? {
                break reply;
            }
        };
        if !game.apply_agent_response(reply.id, &reply.response)? {
            bail!("{turn} answered with an action the game rejected: {:?}", reply.response);
        }
    }

    let state = game.state();
    println!("{}", state.board());
    if let Some(result) = state.result() {
        for (player, score) in &result.score_per_player {
            println!("{player}: {score}");
        }
        match result.winner {
            Some(winner) => println!("winner: {winner}"),
            None => println!("tie"),
        }
    }
    Ok(())
}

fn run_demo() -> Result<()> {
    println!("Wallgo-Rust: wall-building territory game\n");

    let mut game = Game::new(GameConfig::default())?;
    let placements = [(1, 1), (5, 5), (5, 1), (1, 5), (3, 2), (3, 4), (2, 3), (4, 3)];
    for (x, y) in placements {
        game.place(Pos::new(x, y));
    }
    println!("=== After placement ({} to move) ===", game.state().turn());
    println!("{}", game.state().board());

    let turn = game.state().turn();
    let stone = game
        .state()
        .board()
        .stones_of(turn)
        .next()
        .context("player to move has no stones")?;
    game.select_stone(stone);
    let dest = game
        .state()
        .legal_destinations()
        .iter()
        .next()
        .copied()
        .context("selected stone cannot move")?;
    game.move_to(dest);
    let dir = Direction::ALL
        .into_iter()
        .find(|&d| game.state().board().can_build_wall(dest, d))
        .context("no open edge")?;
    game.build_wall(dest, dir);
    println!("=== {turn} moved {stone} -> {dest} and walled {dir:?} ===");
    println!("{}", game.state().board());

    let owned = territory_map(game.state().board())
        .owners()
        .iter()
        .filter(|o| o.is_some())
        .count();
    println!("Claimed cells: {owned}");

    println!("\nAsking heuristic-fast for a move...");
    let mut agent = Agent::new(AgentKind::HeuristicFast);
    match agent.choose_action(game.state())? {
        Some(action) => println!("Suggested: {action}"),
        None => println!("Game is over"),
    }
    Ok(())
}
