// SPDX-License-Identifier: GPL-3.0-only

//! System clipboard access

use std::sync::Mutex;
use tracing::debug;

/// Plain-text clipboard sink
pub trait ClipboardWriter: Send + Sync {
    fn set_text(&self, text: &str) -> Result<(), String>;
}

/// Clipboard of the desktop session
///
/// On X11 and Wayland the clipboard content is served by the process that
/// set it, so the `arboard` handle is created once and kept for the whole
/// run instead of being dropped after each copy.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Mutex<Option<arboard::Clipboard>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardWriter for SystemClipboard {
    fn set_text(&self, text: &str) -> Result<(), String> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| "clipboard lock poisoned".to_string())?;

        if guard.is_none() {
            *guard = Some(arboard::Clipboard::new().map_err(|e| e.to_string())?);
            debug!("Clipboard handle opened");
        }

        match guard.as_mut() {
            Some(clipboard) => clipboard.set_text(text).map_err(|e| e.to_string()),
            None => Err("clipboard unavailable".to_string()),
        }
    }
}

impl std::fmt::Debug for SystemClipboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let open = self.inner.lock().map(|g| g.is_some()).unwrap_or(false);
        f.debug_struct("SystemClipboard").field("open", &open).finish()
    }
}
