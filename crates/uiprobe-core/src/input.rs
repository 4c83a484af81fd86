//! Synthetic input injection
//!
//! Pointer gestures are queued as window-coordinate begin/end pairs and
//! normalized to `[0, 1]` only when the event loop drains the queue, so a
//! late-dispatched click lands correctly even if the window was resized
//! after the request. Keyboard chords are parsed from `+`-joined token
//! strings and delivered as a key-down/key-up pair on the owner thread.
//! A parse failure aborts the whole gesture; nothing is partially sent.

use crate::error::ProbeError;
use crate::host::HostWindow;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fixed modifier vocabulary; every other alphabetic token is a primary key.
pub const MODIFIER_KEYS: &[&str] = &["ctrl", "alt", "shift", "meta"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Begin,
    End,
}

/// A queued synthetic pointer event, in window coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub id: u64,
    pub phase: PointerPhase,
    pub x: f32,
    pub y: f32,
}

/// A pointer event as handed to the event loop: coordinates normalized by
/// the window size current at dispatch time.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPointer {
    pub id: u64,
    pub phase: PointerPhase,
    pub sx: f32,
    pub sy: f32,
}

/// Provider queue feeding synthetic pointer events into the event loop's
/// normal input-polling step. Each event is consumed exactly once.
#[derive(Default)]
pub struct InputQueue {
    events: Mutex<VecDeque<PointerEvent>>,
    next_id: AtomicU64,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a click gesture at a window coordinate: touch down, touch up.
    /// Returns the gesture id shared by both events.
    pub fn push_click(&self, x: f32, y: f32) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut events = self.events.lock();
        events.push_back(PointerEvent {
            id,
            phase: PointerPhase::Begin,
            x,
            y,
        });
        events.push_back(PointerEvent {
            id,
            phase: PointerPhase::End,
            x,
            y,
        });
        id
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Pop and dispatch every queued event, normalizing against the window
    /// size as of now. The queue lock is not held across `dispatch` calls.
    pub fn drain(&self, window_size: (u32, u32), mut dispatch: impl FnMut(NormalizedPointer)) {
        let w = window_size.0.max(1) as f32;
        let h = window_size.1.max(1) as f32;
        loop {
            let ev = self.events.lock().pop_front();
            let Some(ev) = ev else {
                break;
            };
            dispatch(NormalizedPointer {
                id: ev.id,
                phase: ev.phase,
                sx: ev.x / w,
                sy: ev.y / h,
            });
        }
    }
}

/// A parsed keyboard gesture: one primary key plus modifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyChord {
    pub key: u32,
    pub scancode: u32,
    pub sym: String,
    pub modifiers: Vec<String>,
}

/// Parse a `+`-joined key token string, left to right.
///
/// Tokens in the modifier vocabulary accumulate; an integer token is a raw
/// key code; any other token must name a known key and becomes the primary
/// key (last one wins). Anything unrecognized fails the whole gesture.
pub fn parse_keycodes(keycodes: &str) -> Result<KeyChord, ProbeError> {
    if keycodes.is_empty() {
        return Err(ProbeError::dispatch("empty keycode string"));
    }
    let mut modifiers = Vec::new();
    let mut key = None;
    let mut sym = String::new();
    for token in keycodes.split('+') {
        if token.is_empty() {
            return Err(ProbeError::dispatch(format!(
                "empty token in `{}`",
                keycodes
            )));
        }
        let lower = token.to_ascii_lowercase();
        if MODIFIER_KEYS.contains(&lower.as_str()) {
            modifiers.push(lower);
            continue;
        }
        if let Ok(code) = token.parse::<u32>() {
            sym = char::from_u32(code).map(String::from).unwrap_or_default();
            key = Some(code);
            continue;
        }
        match key_code(&lower) {
            Some(code) => {
                sym = lower;
                key = Some(code);
            }
            None => {
                return Err(ProbeError::dispatch(format!(
                    "unknown key token `{}`",
                    token
                )));
            }
        }
    }
    let Some(key) = key else {
        return Err(ProbeError::dispatch(format!(
            "no primary key in `{}`",
            keycodes
        )));
    };
    Ok(KeyChord {
        key,
        scancode: 0,
        sym,
        modifiers,
    })
}

/// Key code for a lowercase key name.
pub fn key_code(name: &str) -> Option<u32> {
    match name {
        "backspace" => Some(8),
        "tab" => Some(9),
        "enter" => Some(13),
        "escape" => Some(27),
        "space" => Some(32),
        "delete" => Some(127),
        "up" => Some(273),
        "down" => Some(274),
        "right" => Some(275),
        "left" => Some(276),
        "insert" => Some(277),
        "home" => Some(278),
        "end" => Some(279),
        "pageup" => Some(280),
        "pagedown" => Some(281),
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_lowercase() || c.is_ascii_digit() => Some(c as u32),
                _ => name
                    .strip_prefix('f')
                    .and_then(|n| n.parse::<u32>().ok())
                    .filter(|n| (1..=12).contains(n))
                    .map(|n| 281 + n),
            }
        }
    }
}

/// Deliver a chord through the window's native key pipeline as a
/// down/up pair. When the primary key-down handler does not claim the
/// event, the secondary keyboard hook gets it. Owner thread only.
pub fn dispatch_chord(window: &dyn HostWindow, chord: &KeyChord) -> bool {
    tracing::debug!(
        key = chord.key,
        sym = %chord.sym,
        modifiers = ?chord.modifiers,
        "dispatching synthetic key chord"
    );
    if !window.dispatch_key_down(chord) {
        window.dispatch_keyboard(chord);
    }
    window.dispatch_key_up(chord.key, chord.scancode);
    true
}
