//! Tunnel lifecycle state machine.
//!
//! `Stopped → Starting → Running → Stopping → Stopped`. A restart goes
//! `Running → Stopping → Starting → Running` without passing through
//! `Stopped`, so the foreground signal stays up across rebuilds.
//!
//! The controller is single-owner: it lives on the worker thread and is only
//! reached through [`TunnelHandle`](super::TunnelHandle), which serializes
//! every transition.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use crate::core::{FirewallProfile, RuleStore, Transport};
use crate::error::FirewallError;

use super::platform::{ConsentOutcome, Release, TunnelConfig, TunnelInterface, VpnPlatform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl TunnelState {
    /// Foreground notification must be shown in this state.
    pub fn is_active(self) -> bool {
        self != TunnelState::Stopped
    }
}

/// The live tunnel and what it was built from.
struct TunnelSession {
    interface: Box<dyn TunnelInterface>,
    excluded: BTreeSet<String>,
    generation: u64,
}

/// Point-in-time view of the controller, serializable for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TunnelStatus {
    pub state: TunnelState,
    /// Generation of the live session, or of the last one when stopped.
    pub generation: u64,
    pub transport: Transport,
    /// Exclusion set of the live session; empty when stopped.
    pub excluded: BTreeSet<String>,
}

pub struct TunnelController {
    platform: Arc<dyn VpnPlatform>,
    store: RuleStore,
    profile: FirewallProfile,
    settle_delay: Duration,
    state: TunnelState,
    transport: Transport,
    consent_granted: bool,
    generation: u64,
    session: Option<TunnelSession>,
    state_tx: watch::Sender<TunnelState>,
}

impl TunnelController {
    pub fn new(
        platform: Arc<dyn VpnPlatform>,
        store: RuleStore,
        profile: FirewallProfile,
        transport: Transport,
        settle_delay: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(TunnelState::Stopped);
        Self {
            platform,
            store,
            profile,
            settle_delay,
            state: TunnelState::Stopped,
            transport,
            consent_granted: false,
            generation: 0,
            session: None,
            state_tx,
        }
    }

    pub fn state(&self) -> TunnelState {
        self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<TunnelState> {
        self.state_tx.subscribe()
    }

    pub fn status(&self) -> TunnelStatus {
        TunnelStatus {
            state: self.state,
            generation: self.generation,
            transport: self.transport,
            excluded: self
                .session
                .as_ref()
                .map(|s| s.excluded.clone())
                .unwrap_or_default(),
        }
    }

    /// Bring the tunnel up from `Stopped`.
    pub fn start(&mut self) -> Result<(), FirewallError> {
        if self.state != TunnelState::Stopped {
            return Err(FirewallError::InvalidState(format!(
                "Cannot start tunnel while {:?}",
                self.state
            )));
        }

        if !self.consent_granted {
            match self.platform.request_consent() {
                ConsentOutcome::Granted => self.consent_granted = true,
                ConsentOutcome::Denied => {
                    tracing::warn!("VPN consent denied; tunnel stays stopped");
                    return Err(FirewallError::ConsentDenied);
                }
            }
        }

        self.establish()
    }

    /// Tear the tunnel down. No-op when already stopped.
    pub fn stop(&mut self) -> Result<(), FirewallError> {
        if self.state == TunnelState::Stopped {
            tracing::debug!("Stop requested while already stopped");
            return Ok(());
        }
        self.close_session();
        self.transition(TunnelState::Stopped);
        Ok(())
    }

    /// Rebuild the tunnel from a fresh rule snapshot. No-op when the master switch is off.
    pub fn restart(&mut self) -> Result<(), FirewallError> {
        if !self.store.is_master_enabled() {
            tracing::debug!("Restart skipped: master switch is off");
            return Ok(());
        }
        if self.state == TunnelState::Stopped {
            return self.start();
        }
        self.rebuild()
    }

    /// Record a new active transport; rebuild if the tunnel is running.
    pub fn transport_changed(&mut self, transport: Transport) -> Result<(), FirewallError> {
        if transport == self.transport {
            return Ok(());
        }
        tracing::info!(
            "Active transport changed: {} -> {}",
            self.transport.suffix(),
            transport.suffix()
        );
        self.transport = transport;
        if self.state == TunnelState::Running {
            self.rebuild()
        } else {
            Ok(())
        }
    }

    /// The platform revoked consent for the session with `generation`.
    pub fn consent_revoked(&mut self, generation: u64) {
        let live = self.session.as_ref().map(|s| s.generation);
        if live != Some(generation) {
            tracing::debug!("Ignoring revocation for stale generation {generation} (live: {live:?})");
            return;
        }
        tracing::warn!("VPN consent revoked for generation {generation}; stopping tunnel");
        self.consent_granted = false;
        self.close_session();
        self.transition(TunnelState::Stopped);
    }

    /// Release everything before the worker exits.
    pub fn shutdown(&mut self) {
        if self.state != TunnelState::Stopped {
            self.close_session();
            self.transition(TunnelState::Stopped);
        }
    }

    /// Close the live session and establish a new one from a fresh snapshot.
    fn rebuild(&mut self) -> Result<(), FirewallError> {
        if self.close_session() == Release::Unconfirmed {
            std::thread::sleep(self.settle_delay);
        }
        self.establish()
    }

    fn establish(&mut self) -> Result<(), FirewallError> {
        self.transition(TunnelState::Starting);

        let excluded = self.store.blocked_packages(self.profile, self.transport);
        let generation = self.generation + 1;
        let config = TunnelConfig::new(excluded.clone(), generation);

        match self.platform.establish(&config) {
            Ok(interface) => {
                self.generation = generation;
                tracing::info!(
                    "Tunnel generation {generation} established on {} with {} excluded apps",
                    self.transport.suffix(),
                    excluded.len()
                );
                self.session = Some(TunnelSession {
                    interface,
                    excluded,
                    generation,
                });
                self.transition(TunnelState::Running);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Tunnel establishment failed: {e:#}");
                self.transition(TunnelState::Stopped);
                Err(FirewallError::TunnelEstablish(format!("{e:#}")))
            }
        }
    }

    /// Enter `Stopping` and close the live interface, if any.
    fn close_session(&mut self) -> Release {
        self.transition(TunnelState::Stopping);
        match self.session.take() {
            Some(session) => {
                let release = session.interface.close();
                tracing::info!(
                    "Tunnel generation {} closed ({release:?})",
                    session.generation
                );
                release
            }
            None => Release::Confirmed,
        }
    }

    fn transition(&mut self, next: TunnelState) {
        let prev = self.state;
        if prev == next {
            return;
        }
        if !prev.is_active() && next.is_active() {
            self.platform.start_foreground();
        } else if prev.is_active() && !next.is_active() {
            self.platform.stop_foreground();
        }
        self.state = next;
        self.state_tx.send_replace(next);
        tracing::debug!("Tunnel state {prev:?} -> {next:?}");
    }
}
