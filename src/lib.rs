//! Per-app Wi-Fi / mobile-data firewall core built on a local VPN tunnel.
//!
//! The host supplies a [`VpnPlatform`], an [`AppCatalog`] and a
//! [`KeyValueStore`]; [`FirewallServices::start`] wires them into a
//! [`FirewallState`] that the [`commands`] operate on.

pub mod commands;
pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod services;
pub mod tunnel;

pub use crate::commands::FirewallState;
pub use crate::core::{
    AppCatalog, AppEntry, AppRule, FilterChip, FirewallProfile, InstalledApp, RuleStore,
    ThemeMode, Transport,
};
pub use db::{Database, KeyValueStore, MemoryStore};
pub use error::FirewallError;
pub use services::{FirewallServices, ServiceOptions};
pub use tunnel::{
    ConsentOutcome, Release, TunnelConfig, TunnelHandle, TunnelInterface, TunnelState,
    TunnelStatus, VpnPlatform,
};

/// Install the global `tracing` subscriber and a panic hook that logs through it.
///
/// Filter comes from `RUST_LOG`, defaulting to `tunnelguard=info`. Only the
/// first call has any effect.
pub fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!("PANIC in tunnelguard: {info}");
            default_hook(info);
        }));

        if let Err(e) = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "tunnelguard=info".into()),
            )
            .try_init()
        {
            eprintln!("tunnelguard: tracing subscriber already installed: {e}");
        }
    });
}
