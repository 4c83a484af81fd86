//! Collaborator interfaces implemented by the host toolkit
//!
//! The probe never talks to a rendering backend directly. Hosts hand it a
//! window handle and an event-loop handle implementing these traits; the
//! demo application carries the reference implementation.

use crate::capture::Frame;
use crate::input::{InputQueue, KeyChord};
use std::sync::Arc;

/// Callback invoked by the host after every completed render.
pub type FrameHook = Box<dyn Fn(Frame) + Send + Sync>;

/// The application's main window, as seen by the probe.
pub trait HostWindow: Send + Sync {
    /// Current window size in pixels.
    fn size(&self) -> (u32, u32);

    /// Ask the render loop for a repaint at its next opportunity.
    fn request_redraw(&self);

    /// Register a hook to run after every completed render with the frame
    /// just produced. The capture controller installs exactly one.
    fn install_frame_hook(&self, hook: FrameHook);

    /// Primary key-down dispatch; `true` when a handler claimed the event.
    fn dispatch_key_down(&self, chord: &KeyChord) -> bool;

    /// Secondary keyboard hook, tried when key-down goes unclaimed.
    fn dispatch_keyboard(&self, _chord: &KeyChord) {}

    fn dispatch_key_up(&self, key: u32, scancode: u32);
}

/// The host's event loop, as seen by the probe.
pub trait EventLoopHandle: Send + Sync {
    /// Register a provider whose queued synthetic events the loop consumes
    /// during its normal input-polling step.
    fn add_input_provider(&self, provider: Arc<InputQueue>);
}
