//! Go Text Protocol (GTP) implementation.
//!
//! GTP is a text-based protocol for communicating with Go-playing programs.
//! This module implements GTP version 2 on top of [`Engine`], allowing it to
//! be used with graphical interfaces like Sabaki or GoGui and with game
//! servers.
//!
//! ## Supported Commands
//!
//! - `name`, `version`, `protocol_version`
//! - `list_commands`, `known_command <cmd>`
//! - `quit`
//! - `boardsize <size>` - any size from 2 to 19
//! - `clear_board`
//! - `komi <value>`
//! - `play <color> <vertex>`
//! - `genmove <color> [verbose]` - search, play and return a move
//! - `showboard`
//! - `final_score` - area score of the current position
//! - `time_settings <main> <byo_yomi_time> <byo_yomi_stones>`
//! - `time_left <color> <seconds> <stones>`
//!
//! Only the main time is used for time control; byo-yomi figures are
//! accepted and ignored.
//!
//! ## Example
//!
//! ```no_run
//! use uct_go::config::SearchConfig;
//! use uct_go::gtp::GtpEngine;
//!
//! let mut gtp = GtpEngine::new(SearchConfig::default()).unwrap();
//! gtp.run().unwrap();
//! ```

use std::io::{self, BufRead, Write};
use std::time::{Duration, Instant};

use anyhow::Context;
use log::debug;

use crate::config::{ConfigError, SearchConfig};
use crate::constants::DEFAULT_BOARD_SIZE;
use crate::coord::{Color, move_to_string, parse_move};
use crate::engine::{Engine, SearchBudget};
use crate::position::Position;

/// The list of known GTP commands.
const KNOWN_COMMANDS: &[&str] = &[
    "boardsize",
    "clear_board",
    "final_score",
    "genmove",
    "known_command",
    "komi",
    "list_commands",
    "name",
    "play",
    "protocol_version",
    "quit",
    "showboard",
    "time_left",
    "time_settings",
    "version",
];

/// Clock assumed for both players until the controller says otherwise.
const DEFAULT_MAIN_TIME: Duration = Duration::from_secs(300);

/// GTP engine state.
pub struct GtpEngine {
    engine: Engine,
    time_left: [Duration; 2],
}

impl GtpEngine {
    /// A GTP engine on an empty board of the default size.
    pub fn new(config: SearchConfig) -> Result<Self, ConfigError> {
        let state = Position::new_game(DEFAULT_BOARD_SIZE, config.superko);
        Ok(Self {
            engine: Engine::new(state, config)?,
            time_left: [DEFAULT_MAIN_TIME; 2],
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Run the GTP command loop, reading from stdin and writing to stdout.
    pub fn run(&mut self) -> anyhow::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run_with(stdin.lock(), stdout.lock())
    }

    /// Run the command loop over arbitrary streams until `quit` or end of
    /// input.
    pub fn run_with(&mut self, input: impl BufRead, mut output: impl Write) -> anyhow::Result<()> {
        for line in input.lines() {
            let line = line.context("failed to read GTP command")?;

            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (id, command_line) = Self::parse_id(line);

            let parts: Vec<&str> = command_line.split_whitespace().collect();
            if parts.is_empty() {
                continue;
            }

            let command = parts[0].to_lowercase();
            let args = &parts[1..];

            let (success, message) = self.execute(&command, args);

            let prefix = if success { '=' } else { '?' };
            let id_str = id.map(|i| i.to_string()).unwrap_or_default();

            write!(output, "{prefix}{id_str} {message}\n\n").context("failed to write GTP response")?;
            output.flush().context("failed to flush GTP response")?;

            if command == "quit" {
                break;
            }
        }
        Ok(())
    }

    /// Parse an optional numeric command ID from the beginning of the line.
    fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());

        if end > 0 {
            if let Ok(id) = trimmed[..end].parse::<u32>() {
                return (Some(id), trimmed[end..].trim());
            }
        }

        (None, trimmed)
    }

    /// Execute a GTP command and return (success, response).
    fn execute(&mut self, command: &str, args: &[&str]) -> (bool, String) {
        match command {
            "name" => (true, env!("CARGO_PKG_NAME").to_string()),

            "version" => (true, env!("CARGO_PKG_VERSION").to_string()),

            "protocol_version" => (true, "2".to_string()),

            "list_commands" => (true, KNOWN_COMMANDS.join("\n")),

            "known_command" => {
                if args.is_empty() {
                    return (false, "missing argument".to_string());
                }
                let known = KNOWN_COMMANDS.contains(&args[0].to_lowercase().as_str());
                (true, known.to_string())
            }

            "quit" => (true, String::new()),

            "boardsize" => {
                let [size] = args else {
                    return (false, "boardsize takes one integer argument".to_string());
                };
                let superko = self.engine.state().superko();
                match size.parse::<usize>() {
                    Ok(size) => match self.engine.new_game(size, superko) {
                        Ok(()) => (true, String::new()),
                        Err(e) => (false, format!("unacceptable size ({e})")),
                    },
                    Err(_) => (false, "invalid size".to_string()),
                }
            }

            "clear_board" => {
                let (size, superko) = (self.engine.state().size(), self.engine.state().superko());
                match self.engine.new_game(size, superko) {
                    Ok(()) => (true, String::new()),
                    Err(e) => (false, e.to_string()),
                }
            }

            "komi" => {
                let [komi] = args else {
                    return (false, "komi takes one float argument".to_string());
                };
                match komi.parse::<f32>() {
                    Ok(komi) if komi.is_finite() => {
                        self.engine.set_komi(komi);
                        (true, String::new())
                    }
                    _ => (false, "invalid komi".to_string()),
                }
            }

            "play" => {
                let [color, vertex] = args else {
                    return (false, "play takes a color and a vertex".to_string());
                };
                let Some(color) = Color::parse(color) else {
                    return (false, "invalid color".to_string());
                };
                let Some(mv) = parse_move(vertex, self.engine.state().size()) else {
                    return (false, "invalid vertex".to_string());
                };
                match self.engine.apply(color, mv) {
                    Ok(_) => (true, String::new()),
                    Err(e) => (false, e.to_string()),
                }
            }

            "genmove" => {
                let (color, verbose) = match args {
                    [color] => (color, false),
                    [color, "verbose"] => (color, true),
                    _ => return (false, "genmove takes a color and an optional 'verbose'".to_string()),
                };
                let Some(color) = Color::parse(color) else {
                    return (false, "invalid color".to_string());
                };
                self.engine.set_to_play(color);

                let start = Instant::now();
                let clock = self.time_left[color.index()];
                let mv = self.engine.request_move(SearchBudget::ClockRemaining(clock), verbose);
                if let Err(e) = self.engine.notify_move_played(mv) {
                    return (false, format!("engine chose an unplayable move: {e}"));
                }

                // Keep an estimate of the clock in case time_left never comes.
                let elapsed = start.elapsed();
                self.time_left[color.index()] = clock.saturating_sub(elapsed);
                debug!("spent {} ms thinking\n{}", elapsed.as_millis(), self.engine.render());

                (true, move_to_string(mv, self.engine.state().size()))
            }

            "showboard" => (true, format!("\n{}", self.engine.render().trim_end())),

            "final_score" => (true, self.engine.score().to_string()),

            "time_settings" => {
                let [main, _, _] = args else {
                    return (false, "time_settings takes three integer arguments".to_string());
                };
                if args.iter().any(|a| a.parse::<u64>().is_err()) {
                    return (false, "time_settings takes three integer arguments".to_string());
                }
                let main = Duration::from_secs(main.parse().unwrap_or(0));
                self.time_left = [main; 2];
                (true, String::new())
            }

            "time_left" => {
                let [color, seconds, stones] = args else {
                    return (false, "time_left takes three arguments".to_string());
                };
                let Some(color) = Color::parse(color) else {
                    return (false, "invalid color".to_string());
                };
                let (Ok(seconds), Ok(_stones)) = (seconds.parse::<u64>(), stones.parse::<u32>()) else {
                    return (false, "time and stones must be integers".to_string());
                };
                self.time_left[color.index()] = Duration::from_secs(seconds);
                (true, String::new())
            }

            _ => (false, format!("unknown command: {command}")),
        }
    }
}
