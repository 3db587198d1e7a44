//! Runtime plumbing shared by the async entry points.
//!
//! Foreign callers (UniFFI) don't provide a tokio runtime, so work is spawned
//! on the caller's runtime when there is one and on a process-wide fallback
//! otherwise. Cancellation is driven by dropping a `DropGuard`.

use std::sync::Once;

use once_cell::sync::Lazy;
use tokio_util::sync::CancellationToken;

/// Global fallback Tokio runtime for when async functions are called outside any runtime context.
/// Shared by every session and never dropped.
static FALLBACK_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("rafinity-tokio")
        .enable_all()
        .build()
        .expect("Failed to create fallback tokio runtime")
});

static RAYON_INIT: Once = Once::new();

/// Current runtime if available, otherwise the global fallback
pub(crate) fn runtime_handle() -> tokio::runtime::Handle {
    tokio::runtime::Handle::try_current().unwrap_or_else(|_| FALLBACK_RUNTIME.handle().clone())
}

/// Initialize the global Rayon pool used for fuzzy scoring.
/// Leaves one core for the UI thread and runs at lowered priority.
pub(crate) fn init_rayon() {
    RAYON_INIT.call_once(|| {
        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let rayon_threads = num_threads.saturating_sub(1).max(1);

        let result = rayon::ThreadPoolBuilder::new()
            .num_threads(rayon_threads)
            .thread_name(|i| format!("rafinity-rayon-{}", i))
            .start_handler(|_| {
                use thread_priority::*;
                let _ = set_current_thread_priority(ThreadPriority::Min);
            })
            .build_global();

        // Someone else (tests, the host app) already built the global pool
        if let Err(e) = result {
            tracing::debug!(error = %e, "Rayon global pool already initialized");
        }
    });
}

/// RAII guard that cancels a token when dropped.
/// When the foreign side cancels an async Task, UniFFI drops the Future,
/// which drops this guard, which triggers the cancellation token. The same
/// mechanism retires superseded debounce timers.
pub(crate) struct DropGuard {
    token: CancellationToken,
}

impl DropGuard {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_dropguard_cancels() {
        let token = CancellationToken::new();
        let guard = DropGuard::new(token.clone());
        assert!(!token.is_cancelled());

        drop(guard);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_dropguard_cancels_on_panic() {
        let token = CancellationToken::new();
        let token_clone = token.clone();

        let result = std::panic::catch_unwind(|| {
            let _guard = DropGuard::new(token_clone);
            panic!("Intentional panic to test unwinding");
        });

        assert!(result.is_err());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_runtime_handle_without_runtime_uses_fallback() {
        let handle = runtime_handle();
        let value = handle.block_on(async { 7 });
        assert_eq!(value, 7);
    }

    #[test]
    fn test_init_rayon_is_idempotent() {
        init_rayon();
        init_rayon();
        let sum: u32 = (0..10u32).into_par_iter().sum();
        assert_eq!(sum, 45);
    }
}
