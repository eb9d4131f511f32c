//! Viewer connection hub.
//!
//! A single coordinator task owns the viewer set; registration,
//! unregistration, and broadcast are all serialized through its command
//! queue, so the set is never observed or mutated by two operations at
//! once and broadcast iteration never races a registration.
//!
//! The hub never performs socket I/O: each viewer has a bounded outbox
//! drained by its own forward task, so a slow peer cannot stall the hub.

use crate::metrics::MetricsSink;
use axum::extract::ws::Message;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Unique viewer identifier.
pub type ViewerId = Uuid;

/// Outbox capacity per viewer. A viewer that falls this far behind starts
/// losing frames instead of stalling delivery to everyone else.
pub const VIEWER_OUTBOX_CAPACITY: usize = 64;

/// State for a single registered viewer, owned exclusively by the hub.
struct Viewer {
    /// Channel to the viewer's forward task. Dropping it closes the socket.
    outbox: mpsc::Sender<Message>,
    /// Timestamp when the viewer was registered (millis).
    connected_at: i64,
}

enum HubCommand {
    Register {
        id: ViewerId,
        outbox: mpsc::Sender<Message>,
    },
    Unregister {
        id: ViewerId,
    },
    Broadcast {
        payload: String,
    },
    ViewerCount {
        reply: oneshot::Sender<usize>,
    },
    Shutdown,
}

/// Coordinator task state: the single owner of the viewer set.
pub struct Hub {
    viewers: HashMap<ViewerId, Viewer>,
    commands: mpsc::UnboundedReceiver<HubCommand>,
    metrics: Arc<dyn MetricsSink>,
}

/// Clonable handle for submitting hub commands.
///
/// Commands are processed strictly in submission order, so every viewer
/// sees broadcasts in generation order and a viewer registered after a
/// broadcast was queued is not retroactively included in it.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<HubCommand>,
}

impl Hub {
    /// Create the hub and its command handle. Run [`Hub::run`] on a task to
    /// start processing commands.
    pub fn new(metrics: Arc<dyn MetricsSink>) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                viewers: HashMap::new(),
                commands: rx,
                metrics,
            },
            HubHandle { tx },
        )
    }

    /// Run the coordinator loop until shutdown or until every handle is
    /// dropped. On exit, all remaining viewers are closed.
    pub async fn run(mut self) {
        info!("Hub started");

        while let Some(cmd) = self.commands.recv().await {
            match cmd {
                HubCommand::Register { id, outbox } => self.register(id, outbox),
                HubCommand::Unregister { id } => self.unregister(id),
                HubCommand::Broadcast { payload } => self.broadcast(payload),
                HubCommand::ViewerCount { reply } => {
                    let _ = reply.send(self.viewers.len());
                }
                HubCommand::Shutdown => break,
            }
        }

        let remaining = self.viewers.len();
        self.viewers.clear();
        if remaining > 0 {
            info!("Hub stopped, closed {} viewers", remaining);
        } else {
            info!("Hub stopped");
        }
    }

    fn register(&mut self, id: ViewerId, outbox: mpsc::Sender<Message>) {
        self.viewers.insert(
            id,
            Viewer {
                outbox,
                connected_at: Utc::now().timestamp_millis(),
            },
        );
        self.metrics.viewer_connected();
        info!("Viewer {} connected, {} active", id, self.viewers.len());
    }

    /// Remove a viewer if present. Removing an absent viewer is a no-op.
    fn unregister(&mut self, id: ViewerId) {
        if let Some(viewer) = self.viewers.remove(&id) {
            self.metrics.viewer_disconnected();
            let connected_secs = (Utc::now().timestamp_millis() - viewer.connected_at) / 1000;
            info!(
                "Viewer {} disconnected after {}s, {} active",
                id,
                connected_secs,
                self.viewers.len()
            );
        }
    }

    /// Deliver one payload to every registered viewer as a text frame.
    ///
    /// A viewer whose outbox is closed has a severed transport: it is
    /// evicted and closed, and the failure is not surfaced to the caller.
    /// A viewer whose outbox is merely full loses this frame only.
    fn broadcast(&mut self, payload: String) {
        if self.viewers.is_empty() {
            return;
        }

        let mut severed = Vec::new();
        for (id, viewer) in &self.viewers {
            match viewer.outbox.try_send(Message::Text(payload.clone().into())) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    debug!("Viewer {} outbox full, frame dropped", id);
                    self.metrics.delivery_failed();
                }
                Err(mpsc::error::TrySendError::Closed(_)) => severed.push(*id),
            }
        }

        for id in severed {
            warn!("Viewer {} transport severed, evicting", id);
            self.metrics.delivery_failed();
            self.unregister(id);
        }
    }
}

impl HubHandle {
    /// Add a viewer with the given outbox to the active set. Never fails;
    /// returns the assigned id.
    pub fn register(&self, outbox: mpsc::Sender<Message>) -> ViewerId {
        let id = Uuid::new_v4();
        self.send(HubCommand::Register { id, outbox });
        id
    }

    /// Remove a viewer if present and close it. Idempotent.
    pub fn unregister(&self, id: ViewerId) {
        self.send(HubCommand::Unregister { id });
    }

    /// Queue a payload for delivery to every currently registered viewer.
    pub fn broadcast(&self, payload: String) {
        self.send(HubCommand::Broadcast { payload });
    }

    /// Number of registered viewers, observed in command order. Because
    /// commands are serialized, the answer reflects every command submitted
    /// before this one.
    pub async fn viewer_count(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::ViewerCount { reply });
        rx.await.unwrap_or(0)
    }

    /// Stop the coordinator and close all registered viewers.
    pub fn shutdown(&self) {
        self.send(HubCommand::Shutdown);
    }

    fn send(&self, cmd: HubCommand) {
        if self.tx.send(cmd).is_err() {
            debug!("Hub is stopped, command dropped");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
