//! Unified error type for the firewall core.
//!
//! `FirewallError` is the single error type returned by the rule store, the
//! tunnel controller and the command surface. It serializes as
//! `{ "kind": "...", "message": "..." }` so a presentation layer can
//! programmatically distinguish error categories.

use serde::ser::SerializeStruct;

/// Firewall-level error returned by every public operation.
///
/// None of these are retried in the background; each is reported once.
#[derive(Debug, thiserror::Error)]
pub enum FirewallError {
    /// The user declined the platform VPN consent dialog. Offered again on the next start.
    #[error("VPN consent was denied")]
    ConsentDenied,

    /// The platform rejected the tunnel configuration. Requires a new explicit trigger.
    #[error("{0}")]
    TunnelEstablish(String),

    /// Building the export document failed; stored state is untouched.
    #[error("{0}")]
    Serialization(String),

    /// The import document was malformed or incomplete.
    #[error("{0}")]
    Import(String),

    /// A durable write did not complete. Re-verify with `is_blocked`.
    #[error("{0}")]
    StorageCommit(String),

    /// Invalid or missing caller input.
    #[error("{0}")]
    InvalidInput(String),

    /// The requested tunnel transition is not valid from the current state.
    #[error("{0}")]
    InvalidState(String),

    /// The tunnel controller worker has exited.
    #[error("{0}")]
    ControllerUnavailable(String),

    /// A host-provided facility (app inventory, connectivity) failed.
    #[error("{0}")]
    Platform(String),
}

impl FirewallError {
    /// Returns the error kind as a string matching the variant name.
    pub fn kind(&self) -> &'static str {
        match self {
            FirewallError::ConsentDenied => "ConsentDenied",
            FirewallError::TunnelEstablish(_) => "TunnelEstablish",
            FirewallError::Serialization(_) => "Serialization",
            FirewallError::Import(_) => "Import",
            FirewallError::StorageCommit(_) => "StorageCommit",
            FirewallError::InvalidInput(_) => "InvalidInput",
            FirewallError::InvalidState(_) => "InvalidState",
            FirewallError::ControllerUnavailable(_) => "ControllerUnavailable",
            FirewallError::Platform(_) => "Platform",
        }
    }
}

/// Custom Serialize: produces `{ "kind": "Variant", "message": "..." }`.
impl serde::Serialize for FirewallError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut s = serializer.serialize_struct("FirewallError", 2)?;
        s.serialize_field("kind", self.kind())?;
        s.serialize_field("message", &self.to_string())?;
        s.end()
    }
}

impl From<serde_json::Error> for FirewallError {
    fn from(err: serde_json::Error) -> Self {
        FirewallError::Import(err.to_string())
    }
}
