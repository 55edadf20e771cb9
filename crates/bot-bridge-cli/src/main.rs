//! Bot bridge dry-run harness
//!
//! Launches a decision script and drives it through a synthetic battle
//! against a stand-in bot, without the simulation engine:
//!
//! ```text
//! bot-bridge [script] [turns]
//! ```
//!
//! Peer command, discipline and timeouts come from `BOT_BRIDGE_*` variables.

mod harness;

use anyhow::{Context, Result, bail};
use bot_bridge::{Bridge, BridgeConfig, Discipline};
use harness::HarnessBot;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_TURNS: u32 = 100;

/// Turn pacing when the peer runs free
const ASYNC_TURN_INTERVAL: Duration = Duration::from_millis(30);

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut args = std::env::args().skip(1);
    let mut config = BridgeConfig::from_env()?;
    if let Some(script) = args.next() {
        config = config.with_script(script);
    }
    let turns = match args.next() {
        Some(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("Invalid turn count: {}", raw))?,
        None => DEFAULT_TURNS,
    };

    info!(
        "Dry run: {} {} for {} turns ({:?})",
        config.peer.interpreter,
        config.peer.script.display(),
        turns,
        config.discipline
    );

    let discipline = config.discipline;
    let mut bridge = Bridge::new(config, HarnessBot::new());
    bridge.start(1).await;
    if !bridge.is_running() {
        bail!("Peer did not start");
    }

    let control = bridge.control();
    for turn in 1..=turns {
        let events = control.lock().advance(turn);
        for event in events {
            bridge.emit(event);
        }

        let outcome = bridge.tick().await;
        debug!("Turn {}: {:?}", turn, outcome);

        if !bridge.is_running() {
            warn!("Bridge stopped at turn {}", turn);
            break;
        }
        if control.lock().is_disabled() {
            info!("Bot disabled at turn {}", turn);
            break;
        }
        if discipline == Discipline::Asynchronous {
            sleep(ASYNC_TURN_INTERVAL).await;
        }
    }

    bridge.on_death().await;

    let stats = bridge.stats();
    let bot = control.lock().clone();
    info!(
        "Dry run finished: {} commands dispatched, {} rejected; bot at ({:.1}, {:.1}) energy {:.1}",
        stats.dispatched, stats.rejected, bot.x, bot.y, bot.energy
    );
    Ok(())
}
