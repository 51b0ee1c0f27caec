use std::path::PathBuf;

use clap::Parser;

use crate::message_database::{Retention, DEFAULT_MAX_MESSAGES};

/// Minimal message board: POST messages, poll them back.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to bind to
    #[arg(long, env = "MESSAGE_BOARD_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "MESSAGE_BOARD_PORT", default_value_t = 5000)]
    pub port: u16,

    /// JSON file holding the message history
    #[arg(long, env = "MESSAGE_BOARD_DATA_FILE", default_value = "messages.json")]
    pub data_file: PathBuf,

    /// Keep only this many most recent messages (0 keeps everything)
    #[arg(long, env = "MESSAGE_BOARD_MAX_MESSAGES", default_value_t = DEFAULT_MAX_MESSAGES)]
    pub max_messages: usize,

    /// Copy the data file into this directory before serving
    #[arg(long, env = "MESSAGE_BOARD_BACKUP_DIR")]
    pub backup_dir: Option<PathBuf>,

    /// Directory with the page templates
    #[arg(long, env = "MESSAGE_BOARD_TEMPLATES_DIR", default_value = "templates")]
    pub templates_dir: PathBuf,

    /// Directory served under /static
    #[arg(long, env = "MESSAGE_BOARD_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// How often the client page polls for new messages
    #[arg(long, env = "MESSAGE_BOARD_POLL_INTERVAL_MS", default_value_t = 2000)]
    pub poll_interval_ms: u64,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn retention(&self) -> Retention {
        Retention::from_cap(self.max_messages)
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }

    /// Glob Tera loads templates from.
    pub fn templates_glob(&self) -> String {
        format!("{}/*.html", self.templates_dir.display())
    }
}
