//! uct-go: a UCT/RAVE Go engine.
//!
//! ## Usage
//!
//! - `uct-go` - Play a short self-play demo
//! - `uct-go gtp` - Start GTP server for GUI integration
//! - `uct-go demo --size 7` - Self-play demo on a 7x7 board
//!
//! Search options (`--threads`, `--playouts`, `--no-rave`, ...) go before
//! the subcommand. Logging goes to stderr and is controlled by `RUST_LOG`.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::info;

use uct_go::config::{MoveSelect, SearchConfig};
use uct_go::constants::DEFAULT_BOARD_SIZE;
use uct_go::coord::{Move, move_to_string};
use uct_go::engine::{Engine, SearchBudget};
use uct_go::gtp::GtpEngine;
use uct_go::position::{Position, Superko};

/// uct-go: a Monte Carlo tree search Go engine
#[derive(Parser)]
#[command(name = "uct-go")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    search: SearchArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the GTP (Go Text Protocol) server for use with GUI applications
    Gtp,
    /// Let the engine play a game against itself
    Demo {
        /// Board size
        #[arg(long, default_value_t = 9)]
        size: usize,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Tree memory per thread, in megabytes
    #[arg(long, default_value_t = 350)]
    memory: usize,
    /// UCB exploration constant
    #[arg(long, default_value_t = 0.1)]
    exploration: f32,
    /// Use UCB1-Tuned instead of UCB1
    #[arg(long)]
    ucb1_tuned: bool,
    /// Disable RAVE
    #[arg(long)]
    no_rave: bool,
    #[arg(long, default_value_t = 1.0)]
    rave_weight_initial: f32,
    #[arg(long, default_value_t = 5000.0)]
    rave_weight_final: f32,
    /// Give every RAVE update the same weight
    #[arg(long)]
    no_weighted_rave: bool,
    /// Let passes receive RAVE updates
    #[arg(long)]
    rave_update_passes: bool,
    /// Skip RAVE credit when the opponent played the point first
    #[arg(long)]
    rave_check_same: bool,
    /// Count RAVE visits in the exploration term
    #[arg(long)]
    include_rave_count_for_exploration: bool,
    /// Uniformly random rollouts instead of pattern-guided ones
    #[arg(long)]
    no_patterns: bool,
    /// Visits before a leaf is expanded
    #[arg(long, default_value_t = 2)]
    expansion_threshold: u32,
    /// Weight of the grandfather heuristic (0 disables it)
    #[arg(long, default_value_t = 4.0)]
    grandfather_weight: f32,
    /// times_played, value_estimate or mean_wins
    #[arg(long, default_value = "times_played", value_parser = parse_move_select)]
    move_select: MoveSelect,
    /// Keep the relevant part of the tree between moves
    #[arg(long)]
    reuse_tree: bool,
    /// Never resign
    #[arg(long)]
    no_resign: bool,
    /// Search threads
    #[arg(long, default_value_t = 1)]
    threads: usize,
    /// Fixed simulations per thread per move (0 = use the clock)
    #[arg(long, default_value_t = 0)]
    playouts: u32,
    /// Random seed
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// positional, situational or natural
    #[arg(long, default_value = "positional", value_parser = parse_superko)]
    superko: Superko,
}

fn parse_move_select(text: &str) -> Result<MoveSelect, String> {
    MoveSelect::parse(text)
        .ok_or_else(|| "expected times_played, value_estimate or mean_wins".to_string())
}

fn parse_superko(text: &str) -> Result<Superko, String> {
    match text {
        "positional" => Ok(Superko::Positional),
        "situational" => Ok(Superko::Situational),
        "natural" => Ok(Superko::NaturalSituational),
        _ => Err("expected positional, situational or natural".to_string()),
    }
}

impl SearchArgs {
    fn to_config(&self) -> SearchConfig {
        SearchConfig {
            max_mem_mb: self.memory,
            exploration_constant: self.exploration,
            use_ucb1_tuned: self.ucb1_tuned,
            use_rave: !self.no_rave,
            rave_weight_initial: self.rave_weight_initial,
            rave_weight_final: self.rave_weight_final,
            weighted_rave: !self.no_weighted_rave,
            rave_update_passes: self.rave_update_passes,
            rave_check_same: self.rave_check_same,
            include_rave_count_for_exploration: self.include_rave_count_for_exploration,
            use_patterns: !self.no_patterns,
            expansion_threshold: self.expansion_threshold,
            grandfather_weight: self.grandfather_weight,
            move_select: self.move_select,
            reuse_tree: self.reuse_tree,
            resign_if_appropriate: !self.no_resign,
            num_threads: self.threads,
            fixed_playouts: self.playouts,
            seed: self.seed,
            superko: self.superko,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.search.to_config();

    match cli.command {
        Some(Commands::Gtp) => {
            let mut gtp = GtpEngine::new(config).context("invalid search configuration")?;
            gtp.run()
        }
        Some(Commands::Demo { size }) => run_demo(config, size),
        None => run_demo(config, DEFAULT_BOARD_SIZE),
    }
}

/// Simulations per move in the demo unless `--playouts` is given.
const DEMO_PLAYOUTS: u32 = 2000;

fn run_demo(config: SearchConfig, size: usize) -> anyhow::Result<()> {
    let playouts = if config.fixed_playouts > 0 {
        config.fixed_playouts
    } else {
        DEMO_PLAYOUTS
    };
    println!("uct-go: self-play on {size}x{size}, {playouts} playouts per move\n");

    config.validate(size).context("invalid search configuration")?;
    let state = Position::new_game(size, config.superko);
    let mut engine = Engine::new(state, config).context("invalid search configuration")?;

    let max_moves = 3 * size * size;
    for _ in 0..max_moves {
        if engine.state().is_game_over() {
            break;
        }
        let color = engine.to_play();
        let mv = engine.request_move(SearchBudget::Playouts(playouts), false);
        println!("{color}: {}", move_to_string(mv, size));
        if mv == Move::Resign {
            info!("{color} resigns");
            break;
        }
        engine
            .notify_move_played(mv)
            .context("engine chose an illegal move")?;
    }

    println!("\n{}\n", engine.render());
    println!("Score: {}", engine.score());
    Ok(())
}
