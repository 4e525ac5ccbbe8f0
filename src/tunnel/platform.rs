//! Seam between the tunnel controller and the host VPN facility.
//!
//! The host implements [`VpnPlatform`]: it shows the consent dialog, builds
//! the virtual interface from a [`TunnelConfig`], and keeps the user-visible
//! "enforcement running" notification in sync with the controller.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config;

/// Outcome of the platform VPN consent prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentOutcome {
    Granted,
    Denied,
}

/// Whether the platform confirmed that a closed tunnel released its routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Confirmed,
    /// No confirmation available; callers wait the settle delay instead.
    Unconfirmed,
}

/// Parameters of one tunnel establishment. Immutable once established.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TunnelConfig {
    pub session_name: String,
    pub address: String,
    pub prefix_len: u8,
    pub route: String,
    pub mtu: u16,
    /// Packages kept out of the otherwise default-allow tunnel.
    pub excluded_packages: BTreeSet<String>,
    /// Generation of the session this config creates. Revocation callbacks echo it back.
    pub generation: u64,
}

impl TunnelConfig {
    pub fn new(excluded_packages: BTreeSet<String>, generation: u64) -> Self {
        Self {
            session_name: config::TUNNEL_SESSION_NAME.to_string(),
            address: config::TUNNEL_ADDRESS_V4.to_string(),
            prefix_len: config::TUNNEL_PREFIX_V4,
            route: config::TUNNEL_ROUTE_V4.to_string(),
            mtu: config::TUNNEL_MTU,
            excluded_packages,
            generation,
        }
    }
}

/// A live tunnel interface.
pub trait TunnelInterface: Send {
    /// Tear the interface down.
    fn close(self: Box<Self>) -> Release;
}

/// Host VPN facility.
pub trait VpnPlatform: Send + Sync {
    fn request_consent(&self) -> ConsentOutcome;

    fn establish(&self, config: &TunnelConfig) -> anyhow::Result<Box<dyn TunnelInterface>>;

    /// Enforcement became an ongoing background process.
    fn start_foreground(&self);

    /// Enforcement ended.
    fn stop_foreground(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_uses_central_constants() {
        let excluded = BTreeSet::from(["com.a".to_string()]);
        let cfg = TunnelConfig::new(excluded.clone(), 3);
        assert_eq!(cfg.route, config::TUNNEL_ROUTE_V4);
        assert_eq!(cfg.mtu, config::TUNNEL_MTU);
        assert_eq!(cfg.excluded_packages, excluded);
        assert_eq!(cfg.generation, 3);
    }
}
