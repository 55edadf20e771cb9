//! # bot-bridge-core
//!
//! Core types shared by the bot bridge and its hosts:
//! - Simulation event records (host → peer)
//! - Command records and the fixed command vocabulary (peer → host)
//! - The `BotControl` action boundary
//! - Error taxonomy

pub mod command;
pub mod control;
pub mod error;
pub mod event;

pub use command::{BotAction, CommandKind, CommandRecord, ParamKey, RecordForm};
pub use control::BotControl;
pub use error::{BridgeError, DecodeError, Result};
pub use event::EventRecord;
