//! Remote query-and-control engine for live scene graphs
//!
//! This crate is the core of an introspection-and-automation endpoint that
//! embeds inside a running graphical application: enumerate the scene
//! graph, resolve path selectors, read and mutate node attributes, inject
//! synthetic input, and capture the rendered frame.
//!
//! The host's render/event loop owns all scene state. It binds a
//! [`ProbeHost`] to the [`LoopBridge`] and services the bridge once per
//! iteration; request handlers call the entry points on [`ProbeContext`]
//! from any thread and the bridge marshals the work across.

pub mod bridge;
pub mod capture;
pub mod encode;
pub mod error;
pub mod host;
pub mod input;
pub mod pick;
pub mod registry;
pub mod scene;
pub mod selector;
pub mod walk;

pub use bridge::{HostCell, LoopBridge};
pub use capture::{CaptureController, CaptureSlot, Frame, PixelFormat};
pub use encode::{EncoderRegistry, FrameEncoder, ImageFormat, UnknownFormat};
pub use error::ProbeError;
pub use host::{EventLoopHandle, FrameHook, HostWindow};
pub use input::{InputQueue, KeyChord};
pub use registry::NodeRegistry;
pub use scene::{AttributeSpec, NodeId, NodeTypeId, Rect, Scene, Value};
pub use selector::Selector;

use pick::PointerWaiter;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc;
use std::sync::{Arc, Once};
use std::time::Duration;
use uiprobe_protocol::{PropertyInfo, PropertyMap, SelectMatch, TreeEntry};

/// Endpoint configuration.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Interval between polls of the frame slot; also the cadence of the
    /// screen stream.
    pub poll_interval: Duration,
    /// Upper bound on waits for a repaint or a physical pointer event.
    pub capture_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(16),
            capture_timeout: Duration::from_secs(5),
        }
    }
}

/// Event-loop-owned state: the scene graph and the exposure registry.
/// Lives on the owner thread; reachable from elsewhere only through the
/// bridge.
pub struct ProbeHost {
    pub scene: Scene,
    pub registry: NodeRegistry,
}

impl ProbeHost {
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            registry: NodeRegistry::new(),
        }
    }

    /// Wrap the host for binding to a [`LoopBridge`].
    pub fn into_cell(self) -> HostCell {
        Rc::new(RefCell::new(self))
    }
}

/// Shared, thread-safe handle to the whole endpoint. Request handlers clone
/// this freely; all install-once state lives here rather than in globals,
/// so a fresh context starts from a clean slate.
#[derive(Clone)]
pub struct ProbeContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    bridge: LoopBridge,
    capture: CaptureController,
    encoders: EncoderRegistry,
    input: Arc<InputQueue>,
    input_installed: Once,
    window: Option<Arc<dyn HostWindow>>,
    event_loop: Arc<dyn EventLoopHandle>,
    pointer: PointerWaiter,
    config: ProbeConfig,
}

impl ProbeContext {
    pub fn new(
        window: Option<Arc<dyn HostWindow>>,
        event_loop: Arc<dyn EventLoopHandle>,
        encoders: EncoderRegistry,
        config: ProbeConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                bridge: LoopBridge::new(),
                capture: CaptureController::new(),
                encoders,
                input: Arc::new(InputQueue::new()),
                input_installed: Once::new(),
                window,
                event_loop,
                pointer: PointerWaiter::default(),
                config,
            }),
        }
    }

    pub fn bridge(&self) -> &LoopBridge {
        &self.inner.bridge
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.inner.config
    }

    pub fn input_queue(&self) -> &Arc<InputQueue> {
        &self.inner.input
    }

    fn window(&self) -> Result<&Arc<dyn HostWindow>, ProbeError> {
        self.inner
            .window
            .as_ref()
            .ok_or(ProbeError::CaptureUnavailable("no window attached"))
    }

    /// Report a physical pointer-down in window coordinates. The host's
    /// event loop calls this for every real touch/click it handles.
    pub fn notify_pointer_down(&self, x: f32, y: f32) {
        self.inner.pointer.notify(x, y);
    }

    fn ensure_input_provider(&self) {
        self.inner.input_installed.call_once(|| {
            self.inner
                .event_loop
                .add_input_provider(self.inner.input.clone());
            tracing::debug!("synthetic input provider installed");
        });
    }

    // --- entry points -----------------------------------------------------

    /// Endpoint version string.
    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Dump the scene graph below the root, exposing every enumerated node
    /// to the registry.
    pub fn tree(&self) -> Vec<TreeEntry> {
        let (tx, rx) = mpsc::channel();
        self.inner.bridge.run(move |host| {
            let entries = match host.scene.root() {
                Some(root) => dump_subtree(host, root),
                None => Vec::new(),
            };
            tx.send(entries).is_ok()
        });
        rx.try_recv().unwrap_or_default()
    }

    /// Full property map of a previously exposed node, or `None` when the
    /// id no longer resolves.
    pub fn inspect(&self, public_id: u64) -> Option<PropertyMap> {
        let (tx, rx) = mpsc::channel();
        self.inner.bridge.run(move |host| {
            let result = host.registry.resolve(&host.scene, public_id).map(|id| {
                host.scene
                    .list_properties(id)
                    .into_iter()
                    .filter_map(|name| {
                        let value = host.scene.get_property(id, &name)?.to_json();
                        Some((name, PropertyInfo { value }))
                    })
                    .collect::<PropertyMap>()
            });
            tx.send(result).is_ok()
        });
        rx.try_recv().ok().flatten()
    }

    /// Evaluate a selector, returning the matches' structural paths, with
    /// window-space bounds when asked for.
    pub fn select(&self, selector: &str, with_bounds: bool) -> Result<Vec<SelectMatch>, ProbeError> {
        let parsed = Selector::parse(selector)?;
        let (tx, rx) = mpsc::channel();
        self.inner.bridge.run(move |host| {
            let matches = match host.scene.root() {
                Some(root) => parsed.evaluate(&host.scene, root),
                None => Vec::new(),
            };
            let results: Vec<SelectMatch> = matches
                .into_iter()
                .filter_map(|id| {
                    let path = walk::path_of(&host.scene, id)?;
                    Some(if with_bounds {
                        match host.scene.window_bounds(id) {
                            Some(bounds) => SelectMatch::Bounded(path, bounds),
                            None => SelectMatch::Path(path),
                        }
                    } else {
                        SelectMatch::Path(path)
                    })
                })
                .collect();
            tx.send(results).is_ok()
        });
        Ok(rx.try_recv().unwrap_or_default())
    }

    /// Whether a selector matches at least one node.
    pub fn exists(&self, selector: &str) -> Result<bool, ProbeError> {
        let parsed = Selector::parse(selector)?;
        let (tx, rx) = mpsc::channel();
        self.inner.bridge.run(move |host| {
            let found = host
                .scene
                .root()
                .map(|root| !parsed.evaluate(&host.scene, root).is_empty())
                .unwrap_or(false);
            tx.send(found).is_ok()
        });
        Ok(rx.try_recv().unwrap_or(false))
    }

    /// Set an attribute on every node a selector matches. Returns how many
    /// nodes were actually updated; unknown and read-only properties fail
    /// closed per node.
    pub fn set_attr(
        &self,
        selector: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<usize, ProbeError> {
        let parsed = Selector::parse(selector)?;
        let key = key.to_string();
        let value = value.clone();
        let (tx, rx) = mpsc::channel();
        self.inner.bridge.run(move |host| {
            let matches = match host.scene.root() {
                Some(root) => parsed.evaluate(&host.scene, root),
                None => Vec::new(),
            };
            let mut updated = 0;
            for id in matches {
                if host.scene.set_property(id, &key, &value) {
                    updated += 1;
                }
            }
            tx.send(updated).is_ok()
        });
        Ok(rx.try_recv().unwrap_or(0))
    }

    /// Click the first node a selector matches: a begin/end synthetic
    /// pointer pair aimed at the node's window-space center, delivered
    /// through the event loop's own input pipeline.
    pub fn click(&self, selector: &str) -> Result<(), ProbeError> {
        let parsed = Selector::parse(selector)?;
        self.ensure_input_provider();
        let queue = self.inner.input.clone();
        let (tx, rx) = mpsc::channel();
        self.inner.bridge.run(move |host| {
            let target = host
                .scene
                .root()
                .and_then(|root| parsed.evaluate(&host.scene, root).into_iter().next());
            let queued = match target.and_then(|id| host.scene.window_center(id)) {
                Some((cx, cy)) => {
                    queue.push_click(cx, cy);
                    true
                }
                None => false,
            };
            let _ = tx.send(queued);
            queued
        });
        match rx.try_recv() {
            Ok(true) => Ok(()),
            _ => Err(ProbeError::NoMatch(selector.to_string())),
        }
    }

    /// Resolve a point to node path(s). Without explicit coordinates this
    /// blocks until the host reports the next real pointer-down.
    pub fn pick(&self, x: Option<f32>, y: Option<f32>, all: bool) -> Result<Vec<String>, ProbeError> {
        let (px, py) = match (x, y) {
            (Some(x), Some(y)) => (x, y),
            _ => {
                let rx = self.inner.pointer.subscribe();
                rx.recv_timeout(self.inner.config.capture_timeout)
                    .map_err(|_| ProbeError::Timeout("a pointer event"))?
            }
        };
        let (tx, rx) = mpsc::channel();
        self.inner.bridge.run(move |host| {
            let paths: Vec<String> = match host.scene.root() {
                Some(root) => {
                    if all {
                        pick::pick_all(&host.scene, root, px, py)
                            .filter_map(|id| walk::path_of(&host.scene, id))
                            .collect()
                    } else {
                        pick::pick_top(&host.scene, root, px, py)
                            .and_then(|id| walk::path_of(&host.scene, id))
                            .into_iter()
                            .collect()
                    }
                }
                None => Vec::new(),
            };
            tx.send(paths).is_ok()
        });
        Ok(rx.try_recv().unwrap_or_default())
    }

    /// Compose and dispatch a keyboard gesture from a `+`-joined token
    /// string. Any parse failure aborts before anything is sent.
    pub fn send_keycodes(&self, keycodes: &str) -> Result<(), ProbeError> {
        let chord = input::parse_keycodes(keycodes)?;
        let window = self
            .window()
            .map_err(|_| ProbeError::DispatchFailure("no window to receive key events".into()))?
            .clone();
        let delivered = self
            .inner
            .bridge
            .run(move |_host| input::dispatch_chord(window.as_ref(), &chord));
        if delivered {
            Ok(())
        } else {
            Err(ProbeError::DispatchFailure(
                "owner loop rejected the key gesture".into(),
            ))
        }
    }

    /// One-shot screenshot: install the capture hook if needed, request a
    /// repaint, wait for the slot to change, encode.
    pub async fn screenshot(&self, format: ImageFormat) -> Result<(Vec<u8>, &'static str), ProbeError> {
        if self.inner.encoders.find(format).is_none() {
            return Err(ProbeError::EncoderUnavailable(format));
        }
        let window = self.window()?;
        self.inner.capture.ensure_installed(window);
        let baseline = self.inner.capture.latest();
        window.request_redraw();
        let frame = self
            .inner
            .capture
            .next_frame(
                baseline,
                self.inner.config.poll_interval,
                self.inner.config.capture_timeout,
            )
            .await?;
        let bytes = self.encode_frame(format, &frame)?;
        Ok((bytes, format.content_type()))
    }

    /// Prepare for streaming: validate the encoder, install the capture
    /// hook, kick off a first repaint. Returns the shared frame slot the
    /// stream loop polls.
    pub fn capture_stream_setup(&self, format: ImageFormat) -> Result<CaptureSlot, ProbeError> {
        if self.inner.encoders.find(format).is_none() {
            return Err(ProbeError::EncoderUnavailable(format));
        }
        let window = self.window()?;
        self.inner.capture.ensure_installed(window);
        window.request_redraw();
        Ok(self.inner.capture.slot())
    }

    /// Encode one captured frame for the wire. Frames arrive bottom-up from
    /// GL-style readback, so encoders are asked to flip.
    pub fn encode_frame(&self, format: ImageFormat, frame: &Frame) -> Result<Vec<u8>, ProbeError> {
        let encoder = self
            .inner
            .encoders
            .find(format)
            .ok_or(ProbeError::EncoderUnavailable(format))?;
        let bytes = encoder.encode(frame, true, format)?;
        if bytes.is_empty() {
            return Err(ProbeError::CaptureUnavailable("encoder produced no bytes"));
        }
        Ok(bytes)
    }
}

fn dump_subtree(host: &mut ProbeHost, id: NodeId) -> Vec<TreeEntry> {
    let children: Vec<NodeId> = host.scene.children(id).to_vec();
    let mut entries = Vec::with_capacity(children.len());
    for child in children {
        let public = host.registry.expose(child);
        let kind = host
            .scene
            .type_name_of(child)
            .unwrap_or_default()
            .to_string();
        let nested = dump_subtree(host, child);
        entries.push(TreeEntry {
            id: public,
            kind,
            children: nested,
        });
    }
    entries
}
