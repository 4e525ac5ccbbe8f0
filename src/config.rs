//! Centralized runtime constants for tunnelguard.
//!
//! Storage key names, tunnel parameters and lifecycle timings live here so
//! they can be found and adjusted in a single place.

/// Fallback wait between tearing down a tunnel and establishing the next one
/// when the platform cannot confirm the old interface was released (milliseconds).
pub const RESTART_SETTLE_DELAY_MS: u64 = 300;

/// Session label shown by the platform while the tunnel is up.
pub const TUNNEL_SESSION_NAME: &str = "tunnelguard";

/// Address assigned to the local tunnel interface.
pub const TUNNEL_ADDRESS_V4: &str = "10.111.222.1";

/// Prefix length of [`TUNNEL_ADDRESS_V4`].
pub const TUNNEL_PREFIX_V4: u8 = 32;

/// Route captured by the tunnel (everything).
pub const TUNNEL_ROUTE_V4: &str = "0.0.0.0/0";

/// MTU of the tunnel interface.
pub const TUNNEL_MTU: u16 = 1500;

/// Storage namespace for global settings.
pub const SETTINGS_NAMESPACE: &str = "default_prefs";

/// Top-level export document key holding global settings.
pub const EXPORT_DEFAULTS_KEY: &str = "defaults";

/// Settings key of the master switch.
pub const KEY_MASTER_ENABLED: &str = "is_firewall_enabled";

/// Settings key of the "blocked apps first" sort flag.
pub const KEY_SORT_BLOCKED_FIRST: &str = "sort_blocked_first";

/// Settings key of the reboot reminder flag.
pub const KEY_REBOOT_REMINDER: &str = "reboot_reminder_enabled";

/// Settings key of the theme mode string.
pub const KEY_THEME_MODE: &str = "theme_mode";

/// Prefix of per-chip filter state keys (`filter_chip_<id>`).
pub const FILTER_CHIP_KEY_PREFIX: &str = "filter_chip_";
