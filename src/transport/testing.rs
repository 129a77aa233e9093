use super::{RawEvent, TransportHandle};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory engine handle for unit tests.
pub(crate) struct MockHandle {
    /// `None` makes every download fail.
    pub download: Mutex<Option<Vec<u8>>>,
    pub downloads: AtomicUsize,
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail_sends: AtomicBool,
    pub persisted: AtomicUsize,
    pub ended: AtomicUsize,
}

impl MockHandle {
    pub fn with_download(bytes: Option<Vec<u8>>) -> Self {
        Self {
            download: Mutex::new(bytes),
            downloads: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
            persisted: AtomicUsize::new(0),
            ended: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TransportHandle for MockHandle {
    async fn send_text(&self, to: &str, text: &str) -> Result<Option<String>> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(anyhow!("mock send failure"));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((to.to_string(), text.to_string()));
        Ok(Some(format!("OUT{}", sent.len())))
    }

    async fn download_media(&self, _event: &RawEvent) -> Result<Vec<u8>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.download
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("mock download failure"))
    }

    async fn persist_credentials(&self) -> Result<()> {
        self.persisted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn end(&self) {
        self.ended.fetch_add(1, Ordering::SeqCst);
    }
}
