//! Startup wiring.
//!
//! `FirewallServices` builds the shared state in dependency order:
//! 1. Rule store over the injected storage backend
//! 2. Tunnel controller on its dedicated worker thread
//! 3. Restart coordinator bound to both
//! 4. Enforcement restored if the master switch was left on

use std::sync::Arc;
use std::time::Duration;

use crate::commands::FirewallState;
use crate::config;
use crate::core::{AppCatalog, FirewallProfile, RestartCoordinator, RuleStore, Transport};
use crate::db::KeyValueStore;
use crate::error::FirewallError;
use crate::tunnel::{TunnelController, TunnelHandle, VpnPlatform};

/// Startup knobs. Defaults match the production constants.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub profile: FirewallProfile,
    /// Transport active at startup; later changes arrive through `TunnelHandle::transport_changed`.
    pub initial_transport: Transport,
    pub settle_delay: Duration,
    /// Bring the tunnel back up when the stored master switch is on.
    pub restore_enforcement: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            profile: FirewallProfile::Vpn,
            initial_transport: Transport::Wifi,
            settle_delay: Duration::from_millis(config::RESTART_SETTLE_DELAY_MS),
            restore_enforcement: true,
        }
    }
}

pub struct FirewallServices;

impl FirewallServices {
    /// Build the shared state and spawn the tunnel worker.
    ///
    /// A failed enforcement restore is logged, not returned: the state is
    /// still usable and the user can retry through the master switch.
    pub async fn start(
        storage: Arc<dyn KeyValueStore>,
        platform: Arc<dyn VpnPlatform>,
        catalog: Arc<dyn AppCatalog>,
        options: ServiceOptions,
    ) -> Result<FirewallState, FirewallError> {
        let store = RuleStore::new(storage);

        let controller = TunnelController::new(
            platform,
            store.clone(),
            options.profile,
            options.initial_transport,
            options.settle_delay,
        );
        let tunnel = TunnelHandle::spawn(controller)?;

        let restarts = RestartCoordinator::new(store.clone(), tunnel.clone());

        if options.restore_enforcement && store.is_master_enabled() {
            tracing::info!("Master switch is on; restoring enforcement");
            if let Err(e) = tunnel.start().await {
                tracing::warn!("Failed to restore enforcement at startup: {e}");
            }
        }

        Ok(FirewallState {
            store,
            tunnel,
            restarts,
            catalog,
            profile: options.profile,
        })
    }
}
