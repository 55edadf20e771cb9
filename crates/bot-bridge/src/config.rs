//! Bridge configuration

use crate::peer::PeerCommand;
use bot_bridge_core::{BridgeError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// How the bridge exchanges traffic with the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Discipline {
    /// One atomic round-trip per tick: flush events, block for at least one
    /// reply, then take whatever else is already available
    #[default]
    Synchronous,
    /// Free-running writer and reader tasks, decoupled from ticks
    Asynchronous,
}

impl FromStr for Discipline {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" | "synchronous" => Ok(Discipline::Synchronous),
            "async" | "asynchronous" => Ok(Discipline::Asynchronous),
            other => Err(BridgeError::Config(format!("Unknown discipline: {}", other))),
        }
    }
}

/// Configuration for one bridge instance
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Peer launch command
    pub peer: PeerCommand,
    /// Delivery discipline
    pub discipline: Discipline,
    /// Upper bound on the synchronous wait for a tick's first reply.
    /// `None` waits as long as the peer takes.
    pub reply_timeout: Option<Duration>,
    /// Time allowed for queued events to flush and tasks to exit on shutdown
    pub shutdown_grace: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            peer: PeerCommand::default(),
            discipline: Discipline::default(),
            reply_timeout: None,
            shutdown_grace: Duration::from_secs(2),
        }
    }
}

impl BridgeConfig {
    /// Defaults overridden by `BOT_BRIDGE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each key
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(interpreter) = lookup("BOT_BRIDGE_INTERPRETER") {
            config.peer.interpreter = interpreter;
        }
        if let Some(flag) = lookup("BOT_BRIDGE_UNBUFFERED_FLAG") {
            config.peer.unbuffered_flag = (!flag.is_empty()).then_some(flag);
        }
        if let Some(script) = lookup("BOT_BRIDGE_SCRIPT") {
            config.peer.script = PathBuf::from(script);
        }
        if let Some(mode) = lookup("BOT_BRIDGE_MODE") {
            config.discipline = mode.parse()?;
        }
        if let Some(ms) = lookup("BOT_BRIDGE_REPLY_TIMEOUT_MS") {
            let timeout = parse_millis("BOT_BRIDGE_REPLY_TIMEOUT_MS", &ms)?;
            config.reply_timeout = (!timeout.is_zero()).then_some(timeout);
        }
        if let Some(ms) = lookup("BOT_BRIDGE_SHUTDOWN_GRACE_MS") {
            config.shutdown_grace = parse_millis("BOT_BRIDGE_SHUTDOWN_GRACE_MS", &ms)?;
        }

        Ok(config)
    }

    /// Same configuration with a different script
    pub fn with_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.peer.script = script.into();
        self
    }
}

fn parse_millis(key: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| BridgeError::Config(format!("{}={:?}: {}", key, value, e)))
}
