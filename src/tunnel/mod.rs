//! Enforcement tunnel: lifecycle controller plus the worker that owns it.
//!
//! All tunnel mutations run on one dedicated `tunnel-controller` thread.
//! Callers hold a cloneable [`TunnelHandle`] and submit commands over a FIFO
//! queue, so at most one transition is ever in flight and a `stop` issued
//! while a start is establishing simply waits its turn.

pub mod controller;
pub mod platform;

pub use controller::{TunnelController, TunnelState, TunnelStatus};
pub use platform::{ConsentOutcome, Release, TunnelConfig, TunnelInterface, VpnPlatform};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use tokio::sync::{oneshot, watch};

use crate::core::Transport;
use crate::error::FirewallError;

type Reply<T> = oneshot::Sender<Result<T, FirewallError>>;

enum TunnelCommand {
    Start(Reply<()>),
    Stop(Reply<()>),
    Restart {
        /// Coalescing flag of the requester, cleared once the request is dequeued.
        pending: Option<Arc<AtomicBool>>,
        reply: Option<Reply<()>>,
    },
    TransportChanged(Transport),
    ConsentRevoked { generation: u64 },
    Status(oneshot::Sender<TunnelStatus>),
}

/// Cloneable handle to the tunnel worker.
#[derive(Clone)]
pub struct TunnelHandle {
    commands: mpsc::Sender<TunnelCommand>,
    state: watch::Receiver<TunnelState>,
}

impl TunnelHandle {
    /// Move `controller` onto its own worker thread.
    ///
    /// The worker exits, tearing down any live tunnel, once every handle is dropped.
    pub fn spawn(controller: TunnelController) -> Result<Self, FirewallError> {
        let (commands, queue) = mpsc::channel();
        let state = controller.subscribe();

        std::thread::Builder::new()
            .name("tunnel-controller".into())
            .spawn(move || run_worker(controller, queue))
            .map_err(|e| {
                FirewallError::ControllerUnavailable(format!(
                    "Failed to spawn tunnel controller thread: {e}"
                ))
            })?;

        tracing::info!("Tunnel controller worker started");
        Ok(Self { commands, state })
    }

    pub async fn start(&self) -> Result<(), FirewallError> {
        let (tx, rx) = oneshot::channel();
        self.send(TunnelCommand::Start(tx))?;
        rx.await.map_err(|_| worker_gone())?
    }

    pub async fn stop(&self) -> Result<(), FirewallError> {
        let (tx, rx) = oneshot::channel();
        self.send(TunnelCommand::Stop(tx))?;
        rx.await.map_err(|_| worker_gone())?
    }

    pub async fn restart(&self) -> Result<(), FirewallError> {
        let (tx, rx) = oneshot::channel();
        self.send(TunnelCommand::Restart {
            pending: None,
            reply: Some(tx),
        })?;
        rx.await.map_err(|_| worker_gone())?
    }

    /// Status after every previously queued command has been processed.
    pub async fn status(&self) -> Result<TunnelStatus, FirewallError> {
        let (tx, rx) = oneshot::channel();
        self.send(TunnelCommand::Status(tx))?;
        rx.await.map_err(|_| worker_gone())
    }

    /// Latest published state, without queueing.
    pub fn state(&self) -> TunnelState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<TunnelState> {
        self.state.clone()
    }

    /// Platform callback: the device's active transport changed.
    pub fn transport_changed(&self, transport: Transport) -> Result<(), FirewallError> {
        self.send(TunnelCommand::TransportChanged(transport))
    }

    /// Platform callback: consent was revoked for the session with `generation`.
    pub fn consent_revoked(&self, generation: u64) -> Result<(), FirewallError> {
        self.send(TunnelCommand::ConsentRevoked { generation })
    }

    /// Queue a fire-and-forget restart; `pending` is cleared when the worker picks it up.
    pub(crate) fn request_restart(&self, pending: Arc<AtomicBool>) -> Result<(), FirewallError> {
        self.send(TunnelCommand::Restart {
            pending: Some(pending),
            reply: None,
        })
    }

    fn send(&self, command: TunnelCommand) -> Result<(), FirewallError> {
        self.commands.send(command).map_err(|_| worker_gone())
    }
}

fn worker_gone() -> FirewallError {
    FirewallError::ControllerUnavailable("Tunnel controller worker has exited".into())
}

fn run_worker(mut controller: TunnelController, queue: mpsc::Receiver<TunnelCommand>) {
    while let Ok(command) = queue.recv() {
        match command {
            TunnelCommand::Start(reply) => {
                let _ = reply.send(controller.start());
            }
            TunnelCommand::Stop(reply) => {
                let _ = reply.send(controller.stop());
            }
            TunnelCommand::Restart { pending, reply } => {
                // Edits landing after this point need a rebuild of their own.
                if let Some(pending) = pending {
                    pending.store(false, Ordering::Release);
                }
                let result = controller.restart();
                match reply {
                    Some(reply) => {
                        let _ = reply.send(result);
                    }
                    None => {
                        if let Err(e) = result {
                            tracing::warn!("Scheduled tunnel restart failed: {e}");
                        }
                    }
                }
            }
            TunnelCommand::TransportChanged(transport) => {
                if let Err(e) = controller.transport_changed(transport) {
                    tracing::warn!("Restart after transport change failed: {e}");
                }
            }
            TunnelCommand::ConsentRevoked { generation } => controller.consent_revoked(generation),
            TunnelCommand::Status(reply) => {
                let _ = reply.send(controller.status());
            }
        }
    }

    controller.shutdown();
    tracing::info!("Tunnel controller worker exited");
}
