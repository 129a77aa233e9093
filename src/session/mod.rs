use crate::bus::{ConnectionStatus, SessionListener};
use crate::config::BridgeConfig;
use crate::errors::BridgeError;
use crate::jid;
use crate::media::MediaFetcher;
use crate::normalizer::MessageNormalizer;
use crate::reconnect::{ReconnectDecision, ReconnectPolicy};
use crate::transport::{
    CloseReason, ConnectionPhase, ConnectionUpdate, MessageBatch, Transport, TransportEvent,
    TransportHandle, TransportSession, UpsertKind,
};
use futures_util::future::BoxFuture;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// The installed engine session, if any. `session` names the installed
/// handle so late events from a replaced one can be told apart; `epoch`
/// moves on every connect, swap and disconnect, and a pending retry only
/// runs while it still matches the epoch it was armed with.
struct Slot {
    state: ConnectionState,
    handle: Option<Arc<dyn TransportHandle>>,
    shutdown: Option<oneshot::Sender<()>>,
    session: u64,
    epoch: u64,
}

struct Reconnector {
    policy: ReconnectPolicy,
    timer: Option<JoinHandle<()>>,
}

struct Shared {
    auth_dir: PathBuf,
    transport: Arc<dyn Transport>,
    listener: Arc<dyn SessionListener>,
    normalizer: MessageNormalizer,
    slot: Mutex<Slot>,
    reconnect: Mutex<Reconnector>,
}

/// How one open attempt ended.
enum Attempt {
    Opened,
    /// A later connect or a disconnect moved the epoch first.
    Superseded,
    Failed { epoch: u64, error: BridgeError },
}

/// Owns a single WhatsApp connection and turns its events into caller
/// notifications.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SessionManager {
    shared: Arc<Shared>,
}

impl SessionManager {
    pub fn new(
        config: &BridgeConfig,
        transport: Arc<dyn Transport>,
        listener: Arc<dyn SessionListener>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                auth_dir: config.resolved_auth_dir(),
                transport,
                listener,
                normalizer: MessageNormalizer::new(MediaFetcher::from_config(config)),
                slot: Mutex::new(Slot {
                    state: ConnectionState::Disconnected,
                    handle: None,
                    shutdown: None,
                    session: 0,
                    epoch: 0,
                }),
                reconnect: Mutex::new(Reconnector {
                    policy: ReconnectPolicy::new(config.reconnect_delay()),
                    timer: None,
                }),
            }),
        }
    }

    /// Open a new engine session and swap it in for the current one.
    ///
    /// The current session stays in place until the new one has opened, so a
    /// failed attempt leaves a live connection untouched. Returns once the
    /// event loop is running; the handshake carries on in the background and
    /// reports through the listener.
    pub async fn connect(&self) -> Result<(), BridgeError> {
        match self.shared.connect(None).await {
            Attempt::Failed { error, .. } => Err(error),
            Attempt::Opened | Attempt::Superseded => Ok(()),
        }
    }

    /// Send a text message. Fails with [`BridgeError::NotConnected`] when no
    /// session is held.
    pub async fn send_message(&self, to: &str, text: &str) -> Result<Option<String>, BridgeError> {
        let handle = self
            .shared
            .slot
            .lock()
            .await
            .handle
            .clone()
            .ok_or(BridgeError::NotConnected)?;

        let recipient = jid::normalize_recipient(to);
        debug!(
            "WhatsApp send: to={}, content_len={}",
            recipient,
            text.len()
        );
        match handle.send_text(&recipient, text).await {
            Ok(id) => {
                info!("WhatsApp message sent to {}: id={:?}", recipient, id);
                Ok(id)
            }
            Err(e) => {
                error!("WhatsApp send to {} failed: {:#}", recipient, e);
                Err(BridgeError::Transport(format!("{:#}", e)))
            }
        }
    }

    /// Tear the session down and cancel any pending or in-flight reconnect.
    /// No-op when already disconnected.
    pub async fn disconnect(&self) {
        self.shared.disconnect().await;
    }

    pub async fn state(&self) -> ConnectionState {
        self.shared.slot.lock().await.state
    }
}

/// Reconnect entry point for the retry timer. Boxed so the timer task does
/// not embed the connect future's type in its own.
fn run_reconnect(shared: Arc<Shared>, expected: u64) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        info!("Reconnecting to WhatsApp...");
        match shared.connect(Some(expected)).await {
            Attempt::Opened => {}
            Attempt::Superseded => {
                debug!("WhatsApp session changed since the close, reconnect dropped");
            }
            Attempt::Failed { epoch, error } => {
                error!("WhatsApp reconnect failed: {}", error);
                // Keep retrying at the fixed interval, same as a dropped socket
                shared.schedule_after_close(epoch, None).await;
            }
        }
    })
}

impl Shared {
    /// With `expected` set, the attempt only starts if nothing has touched
    /// the slot since that epoch was read.
    async fn connect(self: &Arc<Self>, expected: Option<u64>) -> Attempt {
        let (ticket, prior) = {
            let mut slot = self.slot.lock().await;
            if expected.is_some_and(|epoch| epoch != slot.epoch) {
                return Attempt::Superseded;
            }
            slot.epoch += 1;
            let prior = slot.state;
            if prior == ConnectionState::Disconnected {
                slot.state = ConnectionState::Connecting;
            }
            (slot.epoch, prior)
        };

        info!(
            "Connecting to WhatsApp (auth dir: {})",
            self.auth_dir.display()
        );
        let opened = self.transport.open(&self.auth_dir).await;

        let mut slot = self.slot.lock().await;
        if slot.epoch != ticket {
            // A later connect or a disconnect won the race
            drop(slot);
            debug!("WhatsApp connect superseded");
            if let Ok(session) = opened {
                session.handle.end().await;
            }
            return Attempt::Superseded;
        }

        let TransportSession { handle, events } = match opened {
            Ok(session) => session,
            Err(e) => {
                if prior == ConnectionState::Disconnected {
                    slot.state = ConnectionState::Disconnected;
                }
                return Attempt::Failed {
                    epoch: ticket,
                    error: BridgeError::Transport(format!("{:#}", e)),
                };
            }
        };

        slot.epoch += 1;
        let session = slot.epoch;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let was = slot.state;
        let replaced = slot.handle.replace(handle);
        slot.session = session;
        slot.state = ConnectionState::Connecting;
        // Dropping the old sender stops the previous event loop
        slot.shutdown = Some(shutdown_tx);
        drop(slot);

        if let Some(old) = replaced {
            debug!("Replacing existing WhatsApp session");
            old.end().await;
            if was == ConnectionState::Connected {
                self.listener.on_status(ConnectionStatus::Disconnected).await;
            }
        }

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            shared.run_dispatch(session, events, shutdown_rx).await;
        });
        debug!("WhatsApp session {} event loop started", session);
        Attempt::Opened
    }

    async fn disconnect(&self) {
        {
            let mut reconnect = self.reconnect.lock().await;
            reconnect.policy.cancel();
            if let Some(timer) = reconnect.timer.take() {
                debug!("Cancelling pending WhatsApp reconnect");
                timer.abort();
            }
        }

        let (handle, was) = {
            let mut slot = self.slot.lock().await;
            slot.epoch += 1;
            slot.shutdown = None;
            let was = slot.state;
            slot.state = ConnectionState::Disconnected;
            (slot.handle.take(), was)
        };

        if let Some(handle) = handle {
            handle.end().await;
            info!("WhatsApp session closed");
            if was != ConnectionState::Disconnected {
                self.listener.on_status(ConnectionStatus::Disconnected).await;
            }
        }
    }

    /// Consume one session's events in delivery order until the stream ends
    /// or the session is replaced.
    async fn run_dispatch(
        self: Arc<Self>,
        session: u64,
        mut events: mpsc::Receiver<TransportEvent>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        loop {
            let event = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    debug!("WhatsApp session {} event loop stopped", session);
                    break;
                }
                event = events.recv() => event,
            };
            let Some(event) = event else {
                debug!("WhatsApp session {} event stream ended", session);
                break;
            };

            match event {
                TransportEvent::ConnectionUpdate(update) => {
                    self.on_connection_update(session, update).await;
                }
                TransportEvent::CredentialsUpdate => {
                    if let Some(handle) = self.current_handle(session).await
                        && let Err(e) = handle.persist_credentials().await
                    {
                        error!("Failed to persist WhatsApp credentials: {:#}", e);
                    }
                }
                TransportEvent::MessagesUpsert(batch) => {
                    self.on_messages(session, batch).await;
                }
            }
        }
    }

    async fn current_handle(&self, session: u64) -> Option<Arc<dyn TransportHandle>> {
        let slot = self.slot.lock().await;
        if slot.session == session {
            slot.handle.clone()
        } else {
            None
        }
    }

    /// Apply a state change if `session` is still installed. Returns the
    /// epoch the change was made under.
    async fn transition(&self, session: u64, state: ConnectionState) -> Option<u64> {
        let mut slot = self.slot.lock().await;
        if slot.session != session || slot.handle.is_none() {
            return None;
        }
        slot.state = state;
        Some(slot.epoch)
    }

    async fn on_connection_update(self: &Arc<Self>, session: u64, update: ConnectionUpdate) {
        if self.current_handle(session).await.is_none() {
            debug!("Ignoring connection update from replaced WhatsApp session");
            return;
        }

        if let Some(qr) = &update.qr {
            info!("WhatsApp pairing code issued");
            self.listener.on_qr(qr).await;
        }

        match update.connection {
            Some(ConnectionPhase::Close) => {
                let Some(epoch) = self
                    .transition(session, ConnectionState::Disconnected)
                    .await
                else {
                    return;
                };
                let reason = update.last_disconnect;
                let will_reconnect = !reason.as_ref().is_some_and(CloseReason::is_logged_out);
                warn!(
                    "WhatsApp connection closed. Status: {:?}, Will reconnect: {}",
                    reason.and_then(|r| r.status_code),
                    will_reconnect
                );
                self.listener.on_status(ConnectionStatus::Disconnected).await;
                self.schedule_after_close(epoch, reason).await;
            }
            Some(ConnectionPhase::Open) => {
                if self
                    .transition(session, ConnectionState::Connected)
                    .await
                    .is_some()
                {
                    info!("Connected to WhatsApp");
                    self.listener.on_status(ConnectionStatus::Connected).await;
                }
            }
            Some(ConnectionPhase::Connecting) => {
                self.transition(session, ConnectionState::Connecting)
                    .await;
            }
            None => {}
        }
    }

    async fn schedule_after_close(self: &Arc<Self>, epoch: u64, reason: Option<CloseReason>) {
        let mut reconnect = self.reconnect.lock().await;
        match reconnect.policy.on_close(reason.as_ref()) {
            ReconnectDecision::Terminal => {
                warn!("WhatsApp logged out, not reconnecting");
            }
            ReconnectDecision::AlreadyScheduled => {
                debug!("WhatsApp reconnect already scheduled");
            }
            ReconnectDecision::Schedule(delay) => {
                info!("Reconnecting to WhatsApp in {} seconds...", delay.as_secs());
                reconnect.timer = Some(self.spawn_reconnect_timer(delay, epoch));
            }
        }
    }

    fn spawn_reconnect_timer(self: &Arc<Self>, delay: Duration, epoch: u64) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut reconnect = shared.reconnect.lock().await;
                reconnect.policy.fire();
                reconnect.timer = None;
            }
            run_reconnect(shared, epoch).await;
        })
    }

    async fn on_messages(&self, session: u64, batch: MessageBatch) {
        if batch.kind != UpsertKind::Notify {
            debug!(
                "Ignoring WhatsApp {:?} batch of {} message(s)",
                batch.kind,
                batch.messages.len()
            );
            return;
        }

        for event in &batch.messages {
            // Looked up per message: a disconnect mid-batch turns later
            // downloads into text-only deliveries
            let handle = self.current_handle(session).await;
            let Some(msg) = self.normalizer.normalize(handle.as_deref(), event).await else {
                continue;
            };

            let preview: String = msg.content.chars().take(50).collect();
            info!(
                "WhatsApp message from sender={}, id={}, content={}...",
                msg.sender, msg.id, preview
            );
            self.listener.on_message(msg).await;
        }
    }
}
