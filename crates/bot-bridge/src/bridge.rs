//! Bridge orchestrator
//!
//! Owns the outbound queue, the peer and the dispatcher for one bot, and
//! drives them through `Unstarted → Starting → Running → Draining → Terminated`.
//!
//! The host calls `start` (or `attach`) once, `emit` from its event handlers,
//! `tick` once per turn, and `on_death`/`close` at the end. None of these
//! return errors: failures are logged and turned into a state change.
//!
//! # Disciplines
//!
//! - **Synchronous**: `tick` flushes the queue, waits for at least one reply,
//!   then dispatches whatever further replies are already available.
//! - **Asynchronous**: a writer task pops the queue into the peer and a reader
//!   task dispatches replies as they arrive; `tick` never waits on the peer.
//!
//! In both disciplines the peer's stderr is drained by its own task for the
//! life of the peer, so a chatty peer never stalls on a full pipe.

use crate::codec::encode;
use crate::config::{BridgeConfig, Discipline};
use crate::dispatch::{DispatchStats, Dispatcher};
use crate::peer::Peer;
use crate::queue::OutboundQueue;
use crate::transport::{LineSink, LineSource};
use bot_bridge_core::{BotControl, BridgeError, EventRecord, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Traffic previews in logs are cut to this many characters
const PREVIEW_LEN: usize = 200;

/// Bridge lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Unstarted,
    Starting,
    Running,
    Draining,
    Terminated,
}

/// What one call to `tick` achieved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Event lines written to the peer since the previous tick
    pub written: u64,
    /// Commands dispatched since the previous tick
    pub dispatched: u64,
}

struct PeerTasks {
    writer: Option<JoinHandle<()>>,
    reader: JoinHandle<()>,
}

/// Turn-synchronized bridge between a control loop and one external peer
pub struct Bridge<C: BotControl + 'static> {
    config: BridgeConfig,
    state: BridgeState,
    queue: OutboundQueue,
    control: Arc<Mutex<C>>,
    dispatcher: Dispatcher,
    peer: Option<Peer>,
    tasks: Option<PeerTasks>,
    diagnostics: Option<JoinHandle<()>>,
    sent: Arc<AtomicU64>,
    stderr_lines: Arc<AtomicU64>,
    last_sent: u64,
    last_stats: DispatchStats,
}

impl<C: BotControl + 'static> Bridge<C> {
    /// Create an unstarted bridge driving `control`
    pub fn new(config: BridgeConfig, control: C) -> Self {
        Self {
            config,
            state: BridgeState::Unstarted,
            queue: OutboundQueue::new(),
            control: Arc::new(Mutex::new(control)),
            dispatcher: Dispatcher::new(),
            peer: None,
            tasks: None,
            diagnostics: None,
            sent: Arc::new(AtomicU64::new(0)),
            stderr_lines: Arc::new(AtomicU64::new(0)),
            last_sent: 0,
            last_stats: DispatchStats::default(),
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == BridgeState::Running
    }

    pub fn discipline(&self) -> Discipline {
        self.config.discipline
    }

    /// Shared handle to the control loop
    pub fn control(&self) -> Arc<Mutex<C>> {
        self.control.clone()
    }

    /// Queue handle for event handlers running off the bridge's task
    pub fn outbound(&self) -> OutboundQueue {
        self.queue.clone()
    }

    pub fn stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    /// Lines the peer has written to its diagnostic stream so far
    pub fn diagnostic_lines(&self) -> u64 {
        self.stderr_lines.load(Ordering::Relaxed)
    }

    /// Spawn the configured peer and begin the session
    ///
    /// If the peer cannot be started the bridge goes straight to
    /// `Terminated` and the host carries on without external control.
    pub async fn start(&mut self, round: u32) {
        if !self.begin_start() {
            return;
        }
        match Peer::spawn(&self.config.peer) {
            Ok(peer) => self.run_peer(peer, round).await,
            Err(e) => {
                error!("{}; continuing without external control", e);
                self.state = BridgeState::Terminated;
            }
        }
    }

    /// Begin the session over an already-connected peer
    pub async fn attach(&mut self, peer: Peer, round: u32) {
        if self.begin_start() {
            self.run_peer(peer, round).await;
        }
    }

    fn begin_start(&mut self) -> bool {
        if self.state != BridgeState::Unstarted {
            warn!("Bridge already started ({:?})", self.state);
            return false;
        }
        self.state = BridgeState::Starting;
        true
    }

    async fn run_peer(&mut self, mut peer: Peer, round: u32) {
        // Connected goes out before anything else the host emits
        self.queue.enqueue(EventRecord::Connected { round });
        self.state = BridgeState::Running;

        self.diagnostics = peer
            .take_diagnostics()
            .map(|source| tokio::spawn(diagnostics_task(source, self.stderr_lines.clone())));

        match self.config.discipline {
            Discipline::Synchronous => {
                self.peer = Some(peer);
                if let Err(e) = self.flush().await {
                    error!("Failed to greet peer: {}", e);
                    self.shutdown_peer().await;
                    return;
                }
            }
            Discipline::Asynchronous => {
                let tasks = self.spawn_tasks(&mut peer);
                self.peer = Some(peer);
                match tasks {
                    Some(tasks) => self.tasks = Some(tasks),
                    None => {
                        error!("Peer streams unavailable");
                        self.shutdown_peer().await;
                        return;
                    }
                }
            }
        }
        info!("Bridge running ({:?}, round {})", self.config.discipline, round);
    }

    /// Queue an event for the peer. Dropped unless the bridge is running.
    pub fn emit(&self, event: EventRecord) {
        if self.state == BridgeState::Running {
            self.queue.enqueue(event);
        } else {
            debug!("Bridge {:?}, dropping {} event", self.state, event.name());
        }
    }

    /// Advance one turn
    pub async fn tick(&mut self) -> TickOutcome {
        if self.state == BridgeState::Running {
            match self.config.discipline {
                Discipline::Synchronous => self.round_trip().await,
                Discipline::Asynchronous => self.check_tasks().await,
            }
        }

        let sent = self.sent.load(Ordering::Relaxed);
        let stats = self.dispatcher.stats();
        let outcome = TickOutcome {
            written: sent - self.last_sent,
            dispatched: stats.dispatched - self.last_stats.dispatched,
        };
        self.last_sent = sent;
        self.last_stats = stats;
        outcome
    }

    /// The control loop died: tell the peer, then shut down
    pub async fn on_death(&mut self) {
        if self.state == BridgeState::Running {
            self.queue.enqueue(EventRecord::Death);
        }
        self.close().await;
    }

    /// Flush what is queued and shut the peer down
    pub async fn close(&mut self) {
        match self.state {
            BridgeState::Running => {}
            BridgeState::Unstarted | BridgeState::Starting => {
                self.state = BridgeState::Terminated;
                return;
            }
            BridgeState::Draining | BridgeState::Terminated => return,
        }
        self.state = BridgeState::Draining;

        match self.config.discipline {
            Discipline::Synchronous => {
                if let Err(e) = self.flush().await {
                    warn!("Could not deliver final events: {}", e);
                }
            }
            Discipline::Asynchronous => {
                self.queue.close();
                // Writer exits once the queue is empty
                if let Some(writer) = self.tasks.as_mut().and_then(|t| t.writer.take()) {
                    join_task("writer", writer, self.config.shutdown_grace).await;
                }
            }
        }

        self.shutdown_peer().await;
    }

    /// Synchronous discipline: one atomic exchange with the peer
    async fn round_trip(&mut self) {
        if let Err(e) = self.flush().await {
            error!("Failed to send events to peer: {}", e);
            self.shutdown_peer().await;
            return;
        }

        // The turn may not advance before at least one reply
        match self.read_reply().await {
            Ok(Some(line)) => self.handle_line(&line),
            Ok(None) => {
                warn!("Peer closed its output");
                self.shutdown_peer().await;
                return;
            }
            Err(e) => {
                error!("No reply from peer this tick: {}", e);
                return;
            }
        }

        loop {
            let polled = match self.peer.as_mut() {
                Some(peer) => peer.poll_available().await,
                None => break,
            };
            match polled {
                Ok(Some(line)) => self.handle_line(&line),
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to drain peer replies: {}", e);
                    break;
                }
            }
        }
    }

    async fn read_reply(&mut self) -> Result<Option<String>> {
        let Some(peer) = self.peer.as_mut() else {
            return Ok(None);
        };
        match self.config.reply_timeout {
            Some(limit) => tokio::time::timeout(limit, peer.read_line())
                .await
                .map_err(|_| BridgeError::Read(format!("No reply within {:?}", limit)))?,
            None => peer.read_line().await,
        }
    }

    /// Write every queued event, oldest first
    async fn flush(&mut self) -> Result<()> {
        let Some(peer) = self.peer.as_mut() else {
            return Ok(());
        };
        for event in self.queue.drain_all() {
            let line = encode(&event);
            debug!("[Host→Peer] {}", preview(&line));
            peer.write_line(&line).await?;
            self.sent.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn handle_line(&self, line: &str) {
        dispatch_line(&self.dispatcher, &self.control, line);
    }

    /// Asynchronous discipline: move each stream into its own task
    fn spawn_tasks(&self, peer: &mut Peer) -> Option<PeerTasks> {
        let writer = peer.take_writer()?;
        let reader = peer.take_reader()?;

        let writer = tokio::spawn(writer_task(writer, self.queue.clone(), self.sent.clone()));
        let reader = tokio::spawn(reader_task(
            reader,
            self.dispatcher.clone(),
            self.control.clone(),
            self.queue.clone(),
        ));
        Some(PeerTasks {
            writer: Some(writer),
            reader,
        })
    }

    /// Asynchronous discipline: notice a dead channel between ticks
    async fn check_tasks(&mut self) {
        let ended = self
            .tasks
            .as_ref()
            .is_some_and(|t| {
                t.reader.is_finished() || t.writer.as_ref().is_none_or(JoinHandle::is_finished)
            });
        if ended {
            warn!("Peer channel closed, terminating bridge");
            self.shutdown_peer().await;
        }
    }

    /// Terminate the peer and join its tasks. Leaves the bridge `Terminated`.
    async fn shutdown_peer(&mut self) {
        self.queue.close();

        if let Some(mut peer) = self.peer.take() {
            peer.terminate().await;
        }

        if let Some(tasks) = self.tasks.take() {
            let grace = self.config.shutdown_grace;
            if let Some(writer) = tasks.writer {
                join_task("writer", writer, grace).await;
            }
            join_task("reader", tasks.reader, grace).await;
        }
        // Stderr ends once the process is gone; whatever it wrote last is logged
        if let Some(diagnostics) = self.diagnostics.take() {
            join_task("diagnostics", diagnostics, self.config.shutdown_grace).await;
        }

        self.state = BridgeState::Terminated;
        info!("Bridge terminated");
    }
}

impl<C: BotControl + 'static> Drop for Bridge<C> {
    fn drop(&mut self) {
        self.queue.close();
        if let Some(tasks) = self.tasks.take() {
            if let Some(writer) = tasks.writer {
                writer.abort();
            }
            tasks.reader.abort();
        }
        if let Some(diagnostics) = self.diagnostics.take() {
            diagnostics.abort();
        }
    }
}

fn dispatch_line<C: BotControl>(dispatcher: &Dispatcher, control: &Mutex<C>, line: &str) {
    debug!("[Peer→Host] {}", preview(line));
    let mut control = control.lock();
    dispatcher.handle_line(line, &mut *control);
}

fn preview(line: &str) -> String {
    line.chars().take(PREVIEW_LEN).collect()
}

/// Pops events into the peer until the queue closes or the pipe breaks
async fn writer_task(mut writer: Box<dyn LineSink>, queue: OutboundQueue, sent: Arc<AtomicU64>) {
    while let Some(event) = queue.pop().await {
        let line = encode(&event);
        debug!("[Host→Peer] {}", preview(&line));
        if let Err(e) = writer.write_line(&line).await {
            error!("Writer task failed: {}", e);
            queue.close();
            break;
        }
        sent.fetch_add(1, Ordering::Relaxed);
    }
    debug!("Writer task exiting");
}

/// Dispatches peer lines until its output closes
async fn reader_task<C: BotControl>(
    mut reader: Box<dyn LineSource>,
    dispatcher: Dispatcher,
    control: Arc<Mutex<C>>,
    queue: OutboundQueue,
) {
    loop {
        match reader.read_line().await {
            Ok(Some(line)) => dispatch_line(&dispatcher, &control, &line),
            Ok(None) => {
                info!("Peer closed its output, reader task exiting");
                break;
            }
            Err(e) => {
                error!("Reader task failed: {}", e);
                break;
            }
        }
    }
    // Nothing more will be dispatched; let the writer wind down too
    queue.close();
}

/// Logs the peer's stderr until it closes
async fn diagnostics_task(mut source: Box<dyn LineSource>, lines: Arc<AtomicU64>) {
    loop {
        match source.read_line().await {
            Ok(Some(line)) => {
                warn!("[Peer stderr] {}", preview(&line));
                lines.fetch_add(1, Ordering::Relaxed);
            }
            Ok(None) => break,
            Err(e) => {
                debug!("Peer diagnostic stream failed: {}", e);
                break;
            }
        }
    }
}

async fn join_task(name: &str, handle: JoinHandle<()>, grace: Duration) {
    let abort = handle.abort_handle();
    match tokio::time::timeout(grace, handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) if e.is_cancelled() => {}
        Ok(Err(e)) => warn!("{} task ended abnormally: {}", name, e),
        Err(_) => {
            warn!("{} task did not exit within {:?}, aborting", name, grace);
            abort.abort();
        }
    }
}
