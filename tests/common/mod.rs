// Shared test helpers: not all items used by every test binary.
#![allow(unused)]

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use wa_bridge::bus::{BusListener, SessionNotification};
use wa_bridge::config::BridgeConfig;
use wa_bridge::session::SessionManager;
use wa_bridge::transport::{
    CloseReason, ConnectionPhase, ConnectionUpdate, MessageBatch, RawEvent, Transport,
    TransportEvent, TransportHandle, TransportSession, UpsertKind,
};

// --- Mock engine ---

/// Engine handle that records everything done to it.
pub struct RecordingHandle {
    download: Option<Vec<u8>>,
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail_sends: AtomicBool,
    pub persisted: AtomicUsize,
    pub ended: AtomicUsize,
}

impl RecordingHandle {
    fn new(download: Option<Vec<u8>>) -> Self {
        Self {
            download,
            sent: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
            persisted: AtomicUsize::new(0),
            ended: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TransportHandle for RecordingHandle {
    async fn send_text(&self, to: &str, text: &str) -> anyhow::Result<Option<String>> {
        if self.fail_sends.load(Ordering::SeqCst) {
            anyhow::bail!("socket write failed");
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((to.to_string(), text.to_string()));
        Ok(Some(format!("3EB0{}", sent.len())))
    }

    async fn download_media(&self, _event: &RawEvent) -> anyhow::Result<Vec<u8>> {
        self.download
            .clone()
            .ok_or_else(|| anyhow::anyhow!("media download failed"))
    }

    async fn persist_credentials(&self) -> anyhow::Result<()> {
        self.persisted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn end(&self) {
        self.ended.fetch_add(1, Ordering::SeqCst);
    }
}

/// One opened engine session: push events in, inspect the handle.
#[derive(Clone)]
pub struct OpenedSession {
    pub events: mpsc::Sender<TransportEvent>,
    pub handle: Arc<RecordingHandle>,
}

impl OpenedSession {
    pub async fn emit(&self, event: TransportEvent) {
        self.events.send(event).await.expect("dispatch loop alive");
    }
}

pub struct MockTransport {
    download: Option<Vec<u8>>,
    fail_opens: AtomicUsize,
    open_delay: Mutex<Option<Duration>>,
    attempts: AtomicUsize,
    opened: Mutex<Vec<OpenedSession>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::with_download(Some(vec![0x89, 0x50, 0x4E, 0x47]))
    }

    pub fn with_download(download: Option<Vec<u8>>) -> Self {
        Self {
            download,
            fail_opens: AtomicUsize::new(0),
            open_delay: Mutex::new(None),
            attempts: AtomicUsize::new(0),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Make the next `n` opens fail.
    pub fn fail_next_opens(&self, n: usize) {
        self.fail_opens.store(n, Ordering::SeqCst);
    }

    /// Make every later open take `delay` before it resolves.
    pub fn set_open_delay(&self, delay: Duration) {
        *self.open_delay.lock().unwrap() = Some(delay);
    }

    /// Opens started, failed ones included.
    pub fn open_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Sessions successfully opened.
    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    pub fn session(&self, index: usize) -> OpenedSession {
        self.opened.lock().unwrap()[index].clone()
    }

    pub fn latest(&self) -> OpenedSession {
        self.opened
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("at least one session opened")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, _auth_dir: &Path) -> anyhow::Result<TransportSession> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let delay = *self.open_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self
            .fail_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            anyhow::bail!("connection refused");
        }
        let (tx, rx) = mpsc::channel(32);
        let handle = Arc::new(RecordingHandle::new(self.download.clone()));
        self.opened.lock().unwrap().push(OpenedSession {
            events: tx,
            handle: handle.clone(),
        });
        Ok(TransportSession {
            handle,
            events: rx,
        })
    }
}

// --- Session harness ---

pub struct Harness {
    pub session: SessionManager,
    pub transport: Arc<MockTransport>,
    pub notifications: mpsc::Receiver<SessionNotification>,
    pub tmp: TempDir,
}

pub fn harness(transport: MockTransport) -> Harness {
    let tmp = TempDir::new().expect("create temp dir");
    let config = BridgeConfig {
        auth_dir: Some(tmp.path().join("auth")),
        media_dir: Some(tmp.path().join("media")),
        ..Default::default()
    };
    let transport = Arc::new(transport);
    let (tx, rx) = mpsc::channel(64);
    let session = SessionManager::new(
        &config,
        transport.clone(),
        Arc::new(BusListener::new(tx)),
    );
    Harness {
        session,
        transport,
        notifications: rx,
        tmp,
    }
}

impl Harness {
    pub async fn next(&mut self) -> SessionNotification {
        tokio::time::timeout(Duration::from_secs(30), self.notifications.recv())
            .await
            .expect("notification in time")
            .expect("listener alive")
    }
}

/// Poll until `cond` holds, giving spawned tasks time to run.
pub async fn wait_for(cond: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition reached in time");
}

// --- Event builders ---

pub fn opened() -> TransportEvent {
    TransportEvent::ConnectionUpdate(ConnectionUpdate {
        connection: Some(ConnectionPhase::Open),
        ..Default::default()
    })
}

pub fn closed(status_code: Option<u16>) -> TransportEvent {
    TransportEvent::ConnectionUpdate(ConnectionUpdate {
        connection: Some(ConnectionPhase::Close),
        last_disconnect: status_code.map(CloseReason::new),
        ..Default::default()
    })
}

pub fn qr(code: &str) -> TransportEvent {
    TransportEvent::ConnectionUpdate(ConnectionUpdate {
        qr: Some(code.to_string()),
        ..Default::default()
    })
}

pub fn batch(kind: UpsertKind, payloads: Vec<Value>) -> TransportEvent {
    TransportEvent::MessagesUpsert(MessageBatch {
        kind,
        messages: payloads
            .into_iter()
            .map(|p| RawEvent::from_json(p).expect("valid payload"))
            .collect(),
    })
}

pub fn notify(payloads: Vec<Value>) -> TransportEvent {
    batch(UpsertKind::Notify, payloads)
}

pub fn text_payload(id: &str, from: &str, text: &str) -> Value {
    serde_json::json!({
        "key": {"id": id, "remoteJid": from, "fromMe": false},
        "message": {"conversation": text},
        "messageTimestamp": 1_700_000_000
    })
}
