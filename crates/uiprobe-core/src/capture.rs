//! Frame capture: a last-write-wins slot fed by a one-time repaint hook
//!
//! The render loop overwrites the slot with every completed frame; request
//! code polls it at a fixed interval. There is no history: if several
//! repaints land between two polls, only the latest frame is ever visible.
//! Change detection is by identity (`Arc::ptr_eq`), never by pixel
//! comparison, and the whole `(width, height, format, bytes)` record is
//! swapped in one step so readers can't observe a torn update.

use crate::error::ProbeError;
use crate::host::HostWindow;
use parking_lot::Mutex;
use std::sync::{Arc, Once};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// One captured frame, exactly as the host read it back.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

/// The shared "latest frame" cell. Cloning shares the underlying slot.
#[derive(Clone, Default)]
pub struct CaptureSlot {
    latest: Arc<Mutex<Option<Arc<Frame>>>>,
}

impl CaptureSlot {
    /// Overwrite the slot. Called from the render-thread repaint hook.
    pub fn store(&self, frame: Frame) {
        *self.latest.lock() = Some(Arc::new(frame));
    }

    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.latest.lock().clone()
    }

    /// The current frame, unless it is identical (by identity) to
    /// `baseline`.
    pub fn changed_since(&self, baseline: Option<&Arc<Frame>>) -> Option<Arc<Frame>> {
        let current = self.latest()?;
        match baseline {
            Some(b) if Arc::ptr_eq(b, &current) => None,
            _ => Some(current),
        }
    }
}

/// Owns the slot and the install-once state machine for the repaint hook.
pub struct CaptureController {
    slot: CaptureSlot,
    install: Once,
}

impl Default for CaptureController {
    fn default() -> Self {
        Self {
            slot: CaptureSlot::default(),
            install: Once::new(),
        }
    }
}

impl CaptureController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self) -> CaptureSlot {
        self.slot.clone()
    }

    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.slot.latest()
    }

    /// Install the repaint hook on the window. One-way: once installed it
    /// stays for the life of the context, whatever format is served.
    pub fn ensure_installed(&self, window: &Arc<dyn HostWindow>) {
        self.install.call_once(|| {
            let slot = self.slot.clone();
            window.install_frame_hook(Box::new(move |frame| slot.store(frame)));
            tracing::debug!("frame capture hook installed");
        });
    }

    /// Poll until the slot holds a frame newer (by identity) than
    /// `baseline`, sleeping `poll` between checks, for at most `timeout`.
    pub async fn next_frame(
        &self,
        baseline: Option<Arc<Frame>>,
        poll: Duration,
        timeout: Duration,
    ) -> Result<Arc<Frame>, ProbeError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(frame) = self.slot.changed_since(baseline.as_ref()) {
                return Ok(frame);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ProbeError::Timeout("a fresh frame"));
            }
            tokio::time::sleep(poll).await;
        }
    }
}
