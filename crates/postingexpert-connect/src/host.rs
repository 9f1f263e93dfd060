//! Host window abstraction
//!
//! The bridge never touches a browser directly. Whatever embeds it (a web
//! view, a test harness) implements [`ConnectHost`] to open popups, ask for
//! confirmation, show notices and navigate.

use async_trait::async_trait;
use url::Url;

/// Position and size of the window the popup is centered on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenMetrics {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Default for ScreenMetrics {
    fn default() -> Self {
        Self {
            left: 0,
            top: 0,
            width: 1280,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupGeometry {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl PopupGeometry {
    /// Center a `width` x `height` popup on the host window.
    ///
    /// A popup larger than the host is pinned to the host's top-left corner.
    pub fn centered(width: u32, height: u32, screen: ScreenMetrics) -> Self {
        let offset = |outer: u32, inner: u32| (outer.saturating_sub(inner) / 2) as i32;
        Self {
            left: screen.left + offset(screen.width, width),
            top: screen.top + offset(screen.height, height),
            width,
            height,
        }
    }

    /// `window.open` feature string
    pub fn features(&self) -> String {
        format!(
            "width={},height={},left={},top={},scrollbars=yes,resizable=yes",
            self.width, self.height, self.left, self.top
        )
    }
}

/// An opened authorization popup
pub trait PopupWindow: Send + Sync {
    fn is_closed(&self) -> bool;

    fn close(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// User-visible message (the web app used `alert`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait ConnectHost: Send + Sync {
    /// Metrics of the host window
    fn screen(&self) -> ScreenMetrics {
        ScreenMetrics::default()
    }

    /// Open a popup; `None` when the host blocked it
    fn open_popup(
        &self,
        url: &Url,
        name: &str,
        geometry: PopupGeometry,
    ) -> Option<Box<dyn PopupWindow>>;

    /// Ask the user a yes/no question
    async fn confirm(&self, message: &str) -> bool;

    fn notify(&self, notice: Notice);

    /// Navigate the host to an app path (`/login`, `/connect`)
    fn redirect(&self, path: &str);
}
