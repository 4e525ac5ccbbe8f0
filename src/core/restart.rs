//! Collapses bursts of rule edits into a single tunnel rebuild.
//!
//! At most one restart request is outstanding at a time. The flag is cleared
//! by the tunnel worker when it dequeues the request, so an edit that lands
//! while a rebuild is already running queues exactly one follow-up and the
//! final tunnel always reflects the last committed rule.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::tunnel::TunnelHandle;

use super::rule_store::RuleStore;

#[derive(Clone)]
pub struct RestartCoordinator {
    store: RuleStore,
    tunnel: TunnelHandle,
    pending: Arc<AtomicBool>,
}

impl RestartCoordinator {
    pub fn new(store: RuleStore, tunnel: TunnelHandle) -> Self {
        Self {
            store,
            tunnel,
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A rule was committed. Returns `true` if a new restart was queued.
    pub fn notify_rule_changed(&self) -> bool {
        if !self.store.is_master_enabled() {
            return false;
        }
        if self.pending.swap(true, Ordering::AcqRel) {
            tracing::debug!("Restart already pending; coalesced");
            return false;
        }
        match self.tunnel.request_restart(Arc::clone(&self.pending)) {
            Ok(()) => true,
            Err(e) => {
                self.pending.store(false, Ordering::Release);
                tracing::warn!("Could not queue tunnel restart: {e}");
                false
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}
