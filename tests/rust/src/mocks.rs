//! Scriptable host window for bridge tests
//!
//! Records every popup, notice, confirmation and redirect so tests can
//! assert on what the user would have seen.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

use postingexpert_connect::{
    ConnectHost, MessageChannel, Notice, NoticeLevel, PopupGeometry, PopupWindow,
};

/// A popup the host was asked to open
#[derive(Debug, Clone)]
pub struct OpenedPopup {
    pub url: Url,
    pub name: String,
    pub geometry: PopupGeometry,
}

struct FakePopup {
    closed: Arc<AtomicBool>,
}

impl PopupWindow for FakePopup {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub struct FakeHost {
    confirm_answer: AtomicBool,
    block_popups: AtomicBool,
    close_on_open: AtomicBool,
    popup_closed: Arc<AtomicBool>,
    post_on_open: Mutex<Vec<(MessageChannel, Value)>>,
    opened: Mutex<Vec<OpenedPopup>>,
    notices: Mutex<Vec<Notice>>,
    confirmations: Mutex<Vec<String>>,
    redirects: Mutex<Vec<String>>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            confirm_answer: AtomicBool::new(true),
            block_popups: AtomicBool::new(false),
            close_on_open: AtomicBool::new(false),
            popup_closed: Arc::new(AtomicBool::new(false)),
            post_on_open: Mutex::new(Vec::new()),
            opened: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
            confirmations: Mutex::new(Vec::new()),
            redirects: Mutex::new(Vec::new()),
        }
    }
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every confirmation with "cancel"
    pub fn declining(self) -> Self {
        self.confirm_answer.store(false, Ordering::SeqCst);
        self
    }

    /// Refuse to open popups
    pub fn blocking_popups(self) -> Self {
        self.block_popups.store(true, Ordering::SeqCst);
        self
    }

    /// The user closes the popup right after it opens
    pub fn closing_on_open(self) -> Self {
        self.close_on_open.store(true, Ordering::SeqCst);
        self
    }

    /// Post `payload` on `channel` as soon as a popup opens
    pub fn post_on_open(&self, channel: MessageChannel, payload: Value) {
        self.post_on_open.lock().push((channel, payload));
    }

    pub fn close_popup(&self) {
        self.popup_closed.store(true, Ordering::SeqCst);
    }

    pub fn popup_is_closed(&self) -> bool {
        self.popup_closed.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> Vec<OpenedPopup> {
        self.opened.lock().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn notices_at(&self, level: NoticeLevel) -> Vec<String> {
        self.notices
            .lock()
            .iter()
            .filter(|n| n.level == level)
            .map(|n| n.message.clone())
            .collect()
    }

    pub fn confirmations(&self) -> Vec<String> {
        self.confirmations.lock().clone()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().clone()
    }
}

#[async_trait]
impl ConnectHost for FakeHost {
    fn open_popup(
        &self,
        url: &Url,
        name: &str,
        geometry: PopupGeometry,
    ) -> Option<Box<dyn PopupWindow>> {
        if self.block_popups.load(Ordering::SeqCst) {
            return None;
        }

        self.opened.lock().push(OpenedPopup {
            url: url.clone(),
            name: name.to_string(),
            geometry,
        });
        self.popup_closed
            .store(self.close_on_open.load(Ordering::SeqCst), Ordering::SeqCst);
        for (channel, payload) in self.post_on_open.lock().drain(..) {
            channel.post(payload);
        }

        Some(Box::new(FakePopup {
            closed: self.popup_closed.clone(),
        }))
    }

    async fn confirm(&self, message: &str) -> bool {
        self.confirmations.lock().push(message.to_string());
        self.confirm_answer.load(Ordering::SeqCst)
    }

    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }

    fn redirect(&self, path: &str) {
        self.redirects.lock().push(path.to_string());
    }
}
