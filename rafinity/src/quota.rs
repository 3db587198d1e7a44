//! Free-tier quota and the premium status it depends on.
//!
//! Premium status is owned by the billing collaborator and pushed in through
//! `PremiumStatus::set`. The gate reads it synchronously at decision time, so
//! an upgrade takes effect on the very next commit.

use std::sync::Arc;

use tokio::sync::watch;

use crate::session::QuerySession;

/// Shared premium flag, backed by a watch channel so interested parties can
/// await changes instead of polling.
#[derive(Debug, Clone)]
pub struct PremiumStatus {
    tx: Arc<watch::Sender<bool>>,
}

impl PremiumStatus {
    pub fn new(is_premium: bool) -> Self {
        let (tx, _rx) = watch::channel(is_premium);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_premium(&self) -> bool {
        *self.tx.borrow()
    }

    /// Update from the billing side. Returns the previous value.
    pub fn set(&self, is_premium: bool) -> bool {
        let previous = self.tx.send_replace(is_premium);
        if previous != is_premium {
            tracing::info!(is_premium, "Premium status changed");
        }
        previous
    }

    /// Receiver notified on every change
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for PremiumStatus {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Enforces the per-session free search limit.
///
/// The counter is sticky: it only resets when the session is recreated. An
/// upgrade stops further charges but does not zero it, so a lapsed
/// subscription resumes counting where it stopped.
#[derive(Debug, Clone, Copy)]
pub struct QuotaGate {
    free_limit: u32,
}

impl QuotaGate {
    pub fn new(free_limit: u32) -> Self {
        Self { free_limit }
    }

    pub fn free_limit(&self) -> u32 {
        self.free_limit
    }

    /// Whether a committed query must be refused. Empty queries never are.
    pub fn should_block(&self, session: &QuerySession, query: &str, is_premium: bool) -> bool {
        !is_premium && !query.trim().is_empty() && session.search_count >= self.free_limit
    }

    /// Count one committed query against the free tier.
    ///
    /// Only non-empty queries that differ from the current committed query are
    /// charged, and never for premium users. Returns whether a charge happened.
    pub fn charge(&self, session: &mut QuerySession, query: &str, is_premium: bool) -> bool {
        let query = query.trim();
        if is_premium || query.is_empty() || query == session.committed_query {
            return false;
        }
        session.search_count = session.search_count.saturating_add(1);
        true
    }

    pub fn remaining(&self, session: &QuerySession) -> u32 {
        self.free_limit.saturating_sub(session.search_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_premium_status_set_and_read() {
        let status = PremiumStatus::default();
        assert!(!status.is_premium());
        assert!(!status.set(true));
        assert!(status.is_premium());
        assert!(status.set(true));
    }

    #[tokio::test]
    async fn test_premium_status_notifies_subscribers() {
        let status = PremiumStatus::new(false);
        let mut rx = status.subscribe();
        let clone = status.clone();

        tokio::spawn(async move {
            clone.set(true);
        });

        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[test]
    fn test_charge_rules() {
        let gate = QuotaGate::new(10);
        let mut session = QuerySession::new(4);

        assert!(gate.charge(&mut session, "asthma", false));
        session.committed_query = "asthma".to_string();

        // Same as the current committed query
        assert!(!gate.charge(&mut session, " asthma ", false));
        // Empty
        assert!(!gate.charge(&mut session, "   ", false));
        // Premium
        assert!(!gate.charge(&mut session, "copd", true));

        assert_eq!(session.search_count, 1);
        assert_eq!(gate.remaining(&session), 9);
    }

    #[test]
    fn test_block_at_limit() {
        let gate = QuotaGate::new(2);
        let mut session = QuerySession::new(4);
        session.search_count = 2;

        assert!(gate.should_block(&session, "copd", false));
        assert!(!gate.should_block(&session, "copd", true));
        assert!(!gate.should_block(&session, "  ", false));

        session.search_count = 1;
        assert!(!gate.should_block(&session, "copd", false));
    }
}
