//! Keystrokes in, rendered results out.
//!
//! A `QueryPipeline` owns a debouncer and a worker task. The worker consumes
//! commit events strictly in order, resolves each on a blocking thread, and
//! hands the outcome to the presentation sink. Blocked outcomes additionally
//! request the upgrade flow.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::debounce::{DebounceEvent, DebounceState, QueryDebouncer};
use crate::runtime::{runtime_handle, DropGuard};
use crate::session::{LookupSession, SearchOutcome};

/// Presentation layer
pub trait ResultSink: Send + Sync {
    fn on_results(&self, outcome: &SearchOutcome);

    /// Signal only; the core does not implement the upgrade flow
    fn on_upgrade_requested(&self);
}

pub struct QueryPipeline {
    debouncer: QueryDebouncer,
    session: Arc<LookupSession>,
    _worker: DropGuard,
}

impl QueryPipeline {
    /// Start the worker. The debounce window comes from the session config.
    pub fn spawn(session: Arc<LookupSession>, sink: Arc<dyn ResultSink>) -> Self {
        let (debouncer, mut events) = QueryDebouncer::new(session.config().debounce());
        let token = CancellationToken::new();
        let stopped = token.clone();
        let worker_session = Arc::clone(&session);
        let runtime = runtime_handle();
        let blocking = runtime.clone();

        runtime.spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = stopped.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };

                let query = match event {
                    DebounceEvent::Commit(query) => query,
                    DebounceEvent::Cleared => String::new(),
                };

                let session = Arc::clone(&worker_session);
                let outcome = match blocking.spawn_blocking(move || session.commit(&query)).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::warn!(error = %e, "Query resolution task failed");
                        continue;
                    }
                };
                if stopped.is_cancelled() {
                    break;
                }

                sink.on_results(&outcome);
                if outcome.blocked {
                    sink.on_upgrade_requested();
                }
            }
            tracing::debug!("Query pipeline stopped");
        });

        Self {
            debouncer,
            session,
            _worker: DropGuard::new(token),
        }
    }

    /// One keystroke: the full current text of the search field
    pub fn input(&self, raw: &str) {
        self.session.record_input(raw);
        self.debouncer.push(raw);
    }

    /// Enter/return pressed
    pub fn submit(&self) {
        self.debouncer.submit();
    }

    pub fn state(&self) -> DebounceState {
        self.debouncer.state()
    }

    pub fn session(&self) -> &Arc<LookupSession> {
        &self.session
    }
}
