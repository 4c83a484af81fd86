//! Demo host application for the uiprobe endpoint
//!
//! A toy single-threaded render/event loop owning a small scene graph. The
//! HTTP endpoint runs on a background runtime; the loop services the bridge,
//! consumes synthetic input, and repaints into a software framebuffer.
//!
//! Try it:
//!
//! ```sh
//! cargo run -p demo-app
//! curl localhost:8765/tree
//! curl -X POST localhost:8765/click \
//!     -H 'content-type: application/json' -d '{"selector": "Button[text=+1]"}'
//! curl localhost:8765/screenshot/png > shot.png
//! ```

use anyhow::Result;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use uiprobe_core::input::{NormalizedPointer, PointerPhase};
use uiprobe_core::{
    AttributeSpec, EncoderRegistry, EventLoopHandle, Frame, FrameHook, HostWindow, InputQueue,
    KeyChord, NodeId, PixelFormat, ProbeConfig, ProbeContext, ProbeHost, Rect, Scene, Value, pick,
    walk,
};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

#[derive(Default)]
struct DemoWindow {
    dirty: AtomicBool,
    hooks: Mutex<Vec<FrameHook>>,
}

impl DemoWindow {
    fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::SeqCst)
    }

    fn emit(&self, frame: &Frame) {
        for hook in self.hooks.lock().iter() {
            hook(frame.clone());
        }
    }
}

impl HostWindow for DemoWindow {
    fn size(&self) -> (u32, u32) {
        (WIDTH, HEIGHT)
    }

    fn request_redraw(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    fn install_frame_hook(&self, hook: FrameHook) {
        self.hooks.lock().push(hook);
    }

    fn dispatch_key_down(&self, chord: &KeyChord) -> bool {
        tracing::info!(key = chord.key, modifiers = ?chord.modifiers, "key down");
        true
    }

    fn dispatch_key_up(&self, key: u32, _scancode: u32) {
        tracing::debug!(key, "key up");
    }
}

#[derive(Default)]
struct DemoLoop {
    providers: Mutex<Vec<Arc<InputQueue>>>,
}

impl DemoLoop {
    fn poll_input(&self, size: (u32, u32), out: &mut Vec<NormalizedPointer>) {
        for provider in self.providers.lock().iter() {
            provider.drain(size, |ev| out.push(ev));
        }
    }
}

impl EventLoopHandle for DemoLoop {
    fn add_input_provider(&self, provider: Arc<InputQueue>) {
        self.providers.lock().push(provider);
    }
}

struct DemoIds {
    counter: NodeId,
}

fn build_scene() -> (Scene, DemoIds) {
    let mut scene = Scene::new();
    let window_ty = scene.register_type("Window", vec![]);
    let panel_ty = scene.register_type("Panel", vec![]);
    let button_ty = scene.register_type("Button", vec![AttributeSpec::new("text", "")]);
    let label_ty = scene.register_type("Label", vec![AttributeSpec::new("text", "")]);

    let root = scene.spawn_root(window_ty, Rect::new(0.0, 0.0, WIDTH as f32, HEIGHT as f32));
    let panel = scene
        .spawn(root, panel_ty, Rect::new(20.0, 20.0, 760.0, 560.0))
        .expect("root is live");
    let plus = scene
        .spawn(panel, button_ty, Rect::new(40.0, 60.0, 120.0, 40.0))
        .expect("panel is live");
    scene.set_property(plus, "text", &serde_json::json!("+1"));
    let minus = scene
        .spawn(panel, button_ty, Rect::new(180.0, 60.0, 120.0, 40.0))
        .expect("panel is live");
    scene.set_property(minus, "text", &serde_json::json!("-1"));
    let counter = scene
        .spawn(panel, label_ty, Rect::new(40.0, 140.0, 260.0, 30.0))
        .expect("panel is live");
    scene.set_property(counter, "text", &serde_json::json!("count: 0"));

    (scene, DemoIds { counter })
}

fn fill_rect(pixels: &mut [u8], l: f32, b: f32, r: f32, t: f32, color: [u8; 3]) {
    let x0 = l.max(0.0) as usize;
    let x1 = (r.min(WIDTH as f32)).max(0.0) as usize;
    let y0 = b.max(0.0) as usize;
    let y1 = (t.min(HEIGHT as f32)).max(0.0) as usize;
    for y in y0..y1 {
        let row = y * WIDTH as usize * 3;
        for x in x0..x1 {
            let px = row + x * 3;
            pixels[px..px + 3].copy_from_slice(&color);
        }
    }
}

/// Flat-color software renderer. Row 0 is the bottom of the window, the
/// same bottom-up layout a GL readback produces.
fn render_scene(scene: &Scene) -> Frame {
    let mut pixels = vec![30u8; (WIDTH * HEIGHT * 3) as usize];
    if let Some(root) = scene.root() {
        for node in walk::walk(scene, root).skip(1) {
            if scene.get_property(node, "visible") == Some(Value::Bool(false)) {
                continue;
            }
            let Some((l, b, r, t)) = scene.window_bounds(node) else {
                continue;
            };
            let color = match scene.type_name_of(node) {
                Some("Panel") => [55, 58, 64],
                Some("Button") => [66, 135, 245],
                Some("Label") => [220, 220, 200],
                _ => [90, 90, 90],
            };
            fill_rect(&mut pixels, l, b, r, t, color);
        }
    }
    Frame {
        width: WIDTH,
        height: HEIGHT,
        format: PixelFormat::Rgb,
        pixels,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let window = Arc::new(DemoWindow::default());
    let event_loop = Arc::new(DemoLoop::default());
    let win_dyn: Arc<dyn HostWindow> = window.clone();
    let ctx = ProbeContext::new(
        Some(win_dyn),
        event_loop.clone(),
        EncoderRegistry::with_defaults(),
        ProbeConfig::default(),
    );

    let addr: SocketAddr = "127.0.0.1:8765".parse()?;
    let server_ctx = ctx.clone();
    thread::spawn(move || match tokio::runtime::Runtime::new() {
        Ok(runtime) => {
            if let Err(err) = runtime.block_on(uiprobe_server::serve(addr, server_ctx)) {
                tracing::error!("endpoint exited: {}", err);
            }
        }
        Err(err) => tracing::error!("failed to start endpoint runtime: {}", err),
    });

    let (scene, ids) = build_scene();
    let bridge = ctx.bridge().clone();
    let host = ProbeHost::new(scene).into_cell();
    bridge.bind(host.clone());
    window.request_redraw();

    let mut count: i64 = 0;
    let mut events: Vec<NormalizedPointer> = Vec::new();
    loop {
        bridge.drain();

        events.clear();
        event_loop.poll_input(window.size(), &mut events);
        for ev in &events {
            if ev.phase != PointerPhase::Begin {
                continue;
            }
            let (x, y) = (ev.sx * WIDTH as f32, ev.sy * HEIGHT as f32);
            let mut host_ref = host.borrow_mut();
            let host_state = &mut *host_ref;
            let Some(root) = host_state.scene.root() else {
                continue;
            };
            if let Some(hit) = pick::pick_top(&host_state.scene, root, x, y) {
                let path = walk::path_of(&host_state.scene, hit).unwrap_or_default();
                tracing::info!("synthetic touch on {}", path);
                match host_state.scene.get_property(hit, "text") {
                    Some(v) if v.to_string() == "+1" => count += 1,
                    Some(v) if v.to_string() == "-1" => count -= 1,
                    _ => {}
                }
                host_state.scene.set_property(
                    ids.counter,
                    "text",
                    &serde_json::json!(format!("count: {}", count)),
                );
            }
            window.request_redraw();
        }

        if window.take_dirty() {
            let frame = {
                let host_ref = host.borrow();
                render_scene(&host_ref.scene)
            };
            window.emit(&frame);
        }
        thread::sleep(Duration::from_millis(16));
    }
}
