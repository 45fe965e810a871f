//! Observer publication for the simulation loop.
//!
//! The loop publishes a [`TickUpdate`] after every merged tick and one
//! [`TerminalUpdate`] when a run stops. The [`RunObserver`] trait
//! abstracts the mechanism: a broadcast channel fans updates out to the
//! dashboard plumbing, a tracing observer writes structured logs, and a
//! collecting observer records everything for assertions in tests.

use std::sync::{Arc, Mutex};

use heatwatch_types::{TerminalUpdate, TickUpdate};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Capacity of the broadcast channel for run events.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
pub const BROADCAST_CAPACITY: usize = 256;

/// Sink for the loop's per-tick and terminal publications.
///
/// Implementations must be `Send`: the observer moves into the run task.
pub trait RunObserver: Send {
    /// Called after each tick's merge with the published snapshot.
    fn on_tick(&mut self, update: &TickUpdate);

    /// Called exactly once when the run reaches a terminal state.
    fn on_terminal(&mut self, update: &TerminalUpdate);
}

/// A no-op observer for tests and fire-and-forget runs.
pub struct NoOpObserver;

impl RunObserver for NoOpObserver {
    fn on_tick(&mut self, _update: &TickUpdate) {}
    fn on_terminal(&mut self, _update: &TerminalUpdate) {}
}

// ---------------------------------------------------------------------------
// Broadcast observer
// ---------------------------------------------------------------------------

/// One message on the run event channel.
///
/// The tick payload is boxed: it carries a full worker snapshot and
/// would otherwise dwarf the terminal variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RunEvent {
    /// A per-tick state publication.
    Tick(Box<TickUpdate>),
    /// A terminal transition publication.
    Terminal(TerminalUpdate),
}

/// Observer that fans run events out over a tokio broadcast channel.
///
/// Sending never blocks the tick loop; with no receivers the event is
/// simply dropped.
pub struct BroadcastObserver {
    tx: broadcast::Sender<RunEvent>,
}

impl BroadcastObserver {
    /// Create an observer together with an initial receiver.
    pub fn channel() -> (Self, broadcast::Receiver<RunEvent>) {
        let (tx, rx) = broadcast::channel(BROADCAST_CAPACITY);
        (Self { tx }, rx)
    }

    /// Subscribe a new receiver to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.tx.subscribe()
    }
}

impl RunObserver for BroadcastObserver {
    fn on_tick(&mut self, update: &TickUpdate) {
        let receivers = self
            .tx
            .send(RunEvent::Tick(Box::new(update.clone())))
            .unwrap_or(0);
        debug!(step = update.step, receivers, "Tick broadcast sent");
    }

    fn on_terminal(&mut self, update: &TerminalUpdate) {
        let receivers = self
            .tx
            .send(RunEvent::Terminal(update.clone()))
            .unwrap_or(0);
        debug!(cause = update.cause.code(), receivers, "Terminal broadcast sent");
    }
}

// ---------------------------------------------------------------------------
// Tracing observer
// ---------------------------------------------------------------------------

/// Observer that writes run events to the tracing subscriber.
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn on_tick(&mut self, update: &TickUpdate) {
        info!(
            worker = %update.worker_id,
            mode = %update.mode,
            step = update.step,
            temperature_c = update.worker.vitals.temperature_c,
            humidity_pct = update.worker.vitals.humidity_pct,
            hr_mean = update.worker.vitals.hr_mean,
            progress_pct = update.progress_pct,
            annotated = update.worker.risk.is_some(),
            "Tick published"
        );
    }

    fn on_terminal(&mut self, update: &TerminalUpdate) {
        info!(
            worker = %update.worker_id,
            phase = ?update.phase,
            cause = update.cause.code(),
            reason = %update.reason,
            steps = update.steps,
            "Run ended"
        );
    }
}

// ---------------------------------------------------------------------------
// Collecting observer
// ---------------------------------------------------------------------------

/// Observer that records every publication in shared memory.
///
/// Clones share the same storage, so a test can hand one clone to the
/// loop and keep another for assertions.
#[derive(Debug, Clone, Default)]
pub struct CollectingObserver {
    ticks: Arc<Mutex<Vec<TickUpdate>>>,
    terminals: Arc<Mutex<Vec<TerminalUpdate>>>,
}

impl CollectingObserver {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot all tick updates published so far.
    pub fn ticks(&self) -> Vec<TickUpdate> {
        match self.ticks.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Snapshot all terminal updates published so far.
    pub fn terminals(&self) -> Vec<TerminalUpdate> {
        match self.terminals.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl RunObserver for CollectingObserver {
    fn on_tick(&mut self, update: &TickUpdate) {
        match self.ticks.lock() {
            Ok(mut guard) => guard.push(update.clone()),
            Err(poisoned) => poisoned.into_inner().push(update.clone()),
        }
    }

    fn on_terminal(&mut self, update: &TerminalUpdate) {
        match self.terminals.lock() {
            Ok(mut guard) => guard.push(update.clone()),
            Err(poisoned) => poisoned.into_inner().push(update.clone()),
        }
    }
}
