//! CLI arguments and the interactive stdin commands.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::constants::{DEFAULT_SERVER_URL, SERVER_URL_ENV};
use crate::protocol::PlaybackAction;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// `play`, `pause`, `seek` with an explicit or current position
    Control {
        action: PlaybackAction,
        at: Option<f64>,
    },
    Sync,
    Status,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            bail!("empty command");
        };
        let at = parts
            .next()
            .map(|raw| raw.parse::<f64>())
            .transpose()
            .context("position must be a number of seconds")?;

        let command = match verb {
            "play" => Self::Control {
                action: PlaybackAction::Play,
                at,
            },
            "pause" => Self::Control {
                action: PlaybackAction::Pause,
                at,
            },
            "seek" => {
                if at.is_none() {
                    bail!("seek needs a position");
                }
                Self::Control {
                    action: PlaybackAction::Seek,
                    at,
                }
            }
            "sync" => Self::Sync,
            "status" => Self::Status,
            "quit" | "exit" => Self::Quit,
            other => bail!("unknown command: {other}"),
        };
        Ok(command)
    }
}

/// Headless participant in a two-person watch session
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "tandem-client")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub mode: Mode,

    /// Base URL of the sync server
    #[arg(long, global = true, env = SERVER_URL_ENV, default_value = DEFAULT_SERVER_URL)]
    pub server: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Mode {
    /// Create a room for a local media file and join it as host
    Create { media: PathBuf },
    /// Join an existing room
    Join {
        room_id: String,
        /// Take the host role on join
        #[arg(long = "host")]
        as_host: bool,
    },
}
