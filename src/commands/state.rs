//! Shared state behind every command handler.

use std::sync::Arc;

use crate::core::{AppCatalog, FirewallProfile, RestartCoordinator, RuleStore};
use crate::tunnel::TunnelHandle;

/// Everything a command handler may touch. Cheap to clone.
#[derive(Clone)]
pub struct FirewallState {
    pub store: RuleStore,
    pub tunnel: TunnelHandle,
    pub restarts: RestartCoordinator,
    pub catalog: Arc<dyn AppCatalog>,
    /// Profile edited and enforced by the command surface.
    pub profile: FirewallProfile,
}
