//! Command dispatch: decoded peer lines → control-loop actions

use crate::codec::decode_command;
use bot_bridge_core::{BotAction, BotControl, BridgeError, CommandRecord, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Running totals, shared by every clone of a dispatcher
#[derive(Debug, Default)]
struct Counters {
    dispatched: AtomicU64,
    rejected: AtomicU64,
}

/// Snapshot of dispatcher activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Lines that produced an action
    pub dispatched: u64,
    /// Lines that were undecodable or named an unknown command
    pub rejected: u64,
}

/// Maps command records onto `BotControl` calls
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    counters: Arc<Counters>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a record to its action without executing it
    pub fn resolve(record: &CommandRecord) -> Result<BotAction> {
        let kind = record
            .kind()
            .ok_or_else(|| BridgeError::UnknownCommand(record.name.clone()))?;

        let value = match kind.param_key() {
            Some(key) => {
                let raw = record.param(key);
                if raw.is_finite() {
                    raw
                } else {
                    warn!("Non-finite {:?} for {}, using 0", key, kind);
                    0.0
                }
            }
            None => 0.0,
        };
        Ok(kind.action(value))
    }

    /// Execute one record against the control loop
    ///
    /// Unknown commands leave the control loop untouched.
    pub fn dispatch(&self, record: &CommandRecord, control: &mut dyn BotControl) -> Result<BotAction> {
        let action = Self::resolve(record)?;
        action.apply(control);
        Ok(action)
    }

    /// Decode and execute one raw line, logging and discarding failures
    pub fn handle_line(&self, line: &str, control: &mut dyn BotControl) -> Option<BotAction> {
        let result = decode_command(line)
            .map_err(BridgeError::from)
            .and_then(|record| self.dispatch(&record, control));

        match result {
            Ok(action) => {
                debug!("Dispatched {:?}", action);
                self.counters.dispatched.fetch_add(1, Ordering::Relaxed);
                Some(action)
            }
            Err(e) => {
                warn!("Discarding peer line {:?}: {}", line, e);
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
        }
    }
}
