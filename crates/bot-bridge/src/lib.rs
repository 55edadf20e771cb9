//! Turn-synchronized bridge between a bot control loop and an external peer
//!
//! This crate provides:
//! - Event encoding and command decoding for the line protocol
//! - The outbound event queue
//! - Peer process management over piped stdio
//! - Command dispatch onto `BotControl`
//! - The `Bridge` orchestrator with synchronous and asynchronous disciplines

pub mod bridge;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod peer;
pub mod queue;
pub mod transport;

#[cfg(test)]
mod testing;

pub use bridge::{Bridge, BridgeState, TickOutcome};
pub use codec::{decode_command, encode};
pub use config::{BridgeConfig, Discipline};
pub use dispatch::{DispatchStats, Dispatcher};
pub use peer::{Peer, PeerCommand};
pub use queue::OutboundQueue;
pub use transport::{LineSink, LineSource, PipeReader, PipeWriter};

pub use bot_bridge_core::{BotAction, BotControl, BridgeError, EventRecord, Result};
