//! Keystroke debouncer
//!
//! Turns a stream of raw input values into discrete commit events. States:
//! `Idle` (empty buffer), `Pending` (timer armed), `Committed` (last timer
//! fired or the user submitted).
//!
//! Every keystroke drops the previous timer guard, which cancels its token,
//! and bumps a generation counter. A timer only commits if its generation is
//! still current when it takes the lock, so a superseded timer can never
//! commit even if it already woke up.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::runtime::{runtime_handle, DropGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    Pending,
    Committed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceEvent {
    /// A trimmed, non-empty query to resolve
    Commit(String),
    /// The buffer became empty: show the unfiltered catalog
    Cleared,
}

struct DebounceInner {
    state: DebounceState,
    raw: String,
    generation: u64,
    timer: Option<DropGuard>,
}

pub struct QueryDebouncer {
    delay: Duration,
    inner: Arc<Mutex<DebounceInner>>,
    events: mpsc::UnboundedSender<DebounceEvent>,
    runtime: tokio::runtime::Handle,
}

impl QueryDebouncer {
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<DebounceEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            delay,
            inner: Arc::new(Mutex::new(DebounceInner {
                state: DebounceState::Idle,
                raw: String::new(),
                generation: 0,
                timer: None,
            })),
            events,
            runtime: runtime_handle(),
        };
        (debouncer, rx)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn state(&self) -> DebounceState {
        self.inner.lock().state
    }

    /// Feed one raw keystroke buffer
    pub fn push(&self, raw: &str) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.timer = None;
        inner.raw = raw.to_string();

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            let was_idle = inner.state == DebounceState::Idle;
            inner.state = DebounceState::Idle;
            if !was_idle {
                let _ = self.events.send(DebounceEvent::Cleared);
            }
            return;
        }

        inner.state = DebounceState::Pending;

        let token = CancellationToken::new();
        let generation = inner.generation;
        let deadline = tokio::time::Instant::now() + self.delay;
        let value = trimmed.to_string();
        let shared = Arc::clone(&self.inner);
        let events = self.events.clone();
        let cancelled = token.clone();

        self.runtime.spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    Self::fire(&shared, &events, generation, value);
                }
            }
        });

        inner.timer = Some(DropGuard::new(token));
    }

    /// Commit the pending value now (enter/return)
    pub fn submit(&self) {
        let mut inner = self.inner.lock();
        if inner.state != DebounceState::Pending {
            return;
        }
        inner.generation += 1;
        inner.timer = None;
        inner.state = DebounceState::Committed;
        let value = inner.raw.trim().to_string();
        let _ = self.events.send(DebounceEvent::Commit(value));
    }

    fn fire(
        inner: &Mutex<DebounceInner>,
        events: &mpsc::UnboundedSender<DebounceEvent>,
        generation: u64,
        value: String,
    ) {
        let mut inner = inner.lock();
        if inner.generation != generation || inner.state != DebounceState::Pending {
            return;
        }
        inner.state = DebounceState::Committed;
        inner.timer = None;
        let _ = events.send(DebounceEvent::Commit(value));
    }
}

impl Drop for QueryDebouncer {
    fn drop(&mut self) {
        self.inner.lock().timer = None;
    }
}
