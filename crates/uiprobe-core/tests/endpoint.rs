//! End-to-end exercises of the context entry points against a running
//! owner loop, with a fake window and event loop standing in for the host
//! toolkit.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use uiprobe_core::input::NormalizedPointer;
use uiprobe_core::{
    AttributeSpec, EncoderRegistry, EventLoopHandle, Frame, FrameHook, HostWindow, ImageFormat,
    InputQueue, KeyChord, PixelFormat, ProbeConfig, ProbeContext, ProbeError, ProbeHost, Rect,
    Scene,
};
use uiprobe_protocol::SelectMatch;

#[derive(Default)]
struct TestWindow {
    redraws: AtomicUsize,
    hooks: Mutex<Vec<FrameHook>>,
    keys: Mutex<Vec<KeyChord>>,
}

impl TestWindow {
    /// Simulate one completed render: feed every installed hook a frame.
    fn render(&self, tag: u8) {
        for hook in self.hooks.lock().iter() {
            hook(Frame {
                width: 2,
                height: 2,
                format: PixelFormat::Rgb,
                pixels: vec![tag; 12],
            });
        }
    }
}

impl HostWindow for TestWindow {
    fn size(&self) -> (u32, u32) {
        (800, 600)
    }

    fn request_redraw(&self) {
        self.redraws.fetch_add(1, Ordering::SeqCst);
    }

    fn install_frame_hook(&self, hook: FrameHook) {
        self.hooks.lock().push(hook);
    }

    fn dispatch_key_down(&self, chord: &KeyChord) -> bool {
        self.keys.lock().push(chord.clone());
        true
    }

    fn dispatch_key_up(&self, _key: u32, _scancode: u32) {}
}

#[derive(Default)]
struct TestLoop {
    providers: Mutex<Vec<Arc<InputQueue>>>,
}

impl EventLoopHandle for TestLoop {
    fn add_input_provider(&self, provider: Arc<InputQueue>) {
        self.providers.lock().push(provider);
    }
}

/// A Window root holding a Panel with two Buttons; the OK button carries a
/// Label child.
fn demo_scene() -> Scene {
    let mut scene = Scene::new();
    let window_ty = scene.register_type("Window", vec![]);
    let panel_ty = scene.register_type("Panel", vec![]);
    let button_ty = scene.register_type("Button", vec![AttributeSpec::new("text", "")]);
    let label_ty = scene.register_type("Label", vec![AttributeSpec::new("text", "")]);

    let root = scene.spawn_root(window_ty, Rect::new(0.0, 0.0, 800.0, 600.0));
    let panel = scene
        .spawn(root, panel_ty, Rect::new(0.0, 0.0, 800.0, 600.0))
        .unwrap();
    let ok = scene
        .spawn(panel, button_ty, Rect::new(100.0, 100.0, 200.0, 50.0))
        .unwrap();
    scene.set_property(ok, "text", &serde_json::json!("OK"));
    let label = scene
        .spawn(ok, label_ty, Rect::new(10.0, 10.0, 50.0, 20.0))
        .unwrap();
    scene.set_property(label, "text", &serde_json::json!("OK"));
    let cancel = scene
        .spawn(panel, button_ty, Rect::new(400.0, 100.0, 200.0, 50.0))
        .unwrap();
    scene.set_property(cancel, "text", &serde_json::json!("Cancel"));
    scene
}

struct Harness {
    ctx: ProbeContext,
    window: Arc<TestWindow>,
    event_loop: Arc<TestLoop>,
    stop: Arc<AtomicBool>,
    owner: Option<thread::JoinHandle<()>>,
}

impl Harness {
    fn start() -> Self {
        let window = Arc::new(TestWindow::default());
        let event_loop = Arc::new(TestLoop::default());
        let win_dyn: Arc<dyn HostWindow> = window.clone();
        let ctx = ProbeContext::new(
            Some(win_dyn),
            event_loop.clone(),
            EncoderRegistry::with_defaults(),
            ProbeConfig {
                poll_interval: Duration::from_millis(1),
                capture_timeout: Duration::from_millis(500),
            },
        );
        let stop = Arc::new(AtomicBool::new(false));
        let bridge = ctx.bridge().clone();
        let stop2 = stop.clone();
        let owner = thread::spawn(move || {
            let host = ProbeHost::new(demo_scene()).into_cell();
            bridge.bind(host);
            while !stop2.load(Ordering::SeqCst) {
                bridge.drain();
                thread::sleep(Duration::from_millis(1));
            }
        });
        Self {
            ctx,
            window,
            event_loop,
            stop,
            owner: Some(owner),
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(owner) = self.owner.take() {
            let _ = owner.join();
        }
    }
}

#[test]
fn test_tree_exposes_ids_that_inspect_resolves() {
    let h = Harness::start();
    let tree = h.ctx.tree();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].kind, "Panel");
    assert_eq!(tree[0].children.len(), 2);
    assert_eq!(tree[0].children[0].kind, "Button");

    let ok_button = &tree[0].children[0];
    let props = h.ctx.inspect(ok_button.id).unwrap();
    assert_eq!(props["text"].value, serde_json::json!("OK"));
    assert_eq!(props["visible"].value, serde_json::json!(true));
    assert!(props.contains_key("width"));

    // Dumping again hands out the same ids.
    let again = h.ctx.tree();
    assert_eq!(again[0].children[0].id, ok_button.id);

    // Unknown ids resolve to nothing.
    assert!(h.ctx.inspect(99_999).is_none());
}

#[test]
fn test_select_paths_and_bounds() {
    let h = Harness::start();
    let paths = h.ctx.select("Button[text=OK]/Label", false).unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].path(), "/Panel/Button[0]/Label[0]");

    let bounded = h.ctx.select("Button[text=OK]", true).unwrap();
    match &bounded[0] {
        SelectMatch::Bounded(path, bounds) => {
            assert_eq!(path, "/Panel/Button[0]");
            assert_eq!(*bounds, (100.0, 100.0, 300.0, 150.0));
        }
        other => panic!("expected bounds, got {:?}", other),
    }

    let err = h.ctx.select("Button[", false).unwrap_err();
    assert!(matches!(err, ProbeError::Selector(_)));
}

#[test]
fn test_exists_and_setattr() {
    let h = Harness::start();
    assert!(h.ctx.exists("Button[text=Cancel]").unwrap());
    assert!(!h.ctx.exists("Button[text=Apply]").unwrap());

    let updated = h
        .ctx
        .set_attr("//Button", "text", &serde_json::json!("Apply"))
        .unwrap();
    assert_eq!(updated, 2);
    assert!(h.ctx.exists("Button[text=Apply]").unwrap());
    assert!(!h.ctx.exists("Button[text=OK]").unwrap());

    // Unknown keys fail closed: nothing updated, no error.
    let updated = h
        .ctx
        .set_attr("//Button", "no_such_key", &serde_json::json!(1))
        .unwrap();
    assert_eq!(updated, 0);
}

#[test]
fn test_click_queues_gesture_through_provider() {
    let h = Harness::start();
    h.ctx.click("Button[text=OK]").unwrap();

    // The provider was installed into the event loop exactly once.
    let providers = h.event_loop.providers.lock();
    assert_eq!(providers.len(), 1);

    // Begin/end pair aimed at the button center, normalized at drain time.
    let mut seen: Vec<NormalizedPointer> = Vec::new();
    providers[0].drain(h.window.size(), |ev| seen.push(ev));
    assert_eq!(seen.len(), 2);
    assert_eq!((seen[0].sx, seen[0].sy), (200.0 / 800.0, 125.0 / 600.0));
    drop(providers);

    // A second click does not install a second provider.
    h.ctx.click("Button[text=Cancel]").unwrap();
    assert_eq!(h.event_loop.providers.lock().len(), 1);

    let err = h.ctx.click("Button[text=Missing]").unwrap_err();
    assert!(matches!(err, ProbeError::NoMatch(_)));
}

#[test]
fn test_pick_with_explicit_point() {
    let h = Harness::start();
    let top = h.ctx.pick(Some(150.0), Some(115.0), false).unwrap();
    assert_eq!(top, vec!["/Panel/Button[0]/Label[0]".to_string()]);

    let stack = h.ctx.pick(Some(150.0), Some(140.0), true).unwrap();
    assert_eq!(stack, vec!["/Panel/Button[0]".to_string()]);

    let miss = h.ctx.pick(Some(-10.0), Some(-10.0), false).unwrap();
    assert!(miss.is_empty());
}

#[test]
fn test_pick_waits_for_real_pointer_down() {
    let h = Harness::start();
    let ctx = h.ctx.clone();
    let notifier = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        ctx.notify_pointer_down(450.0, 120.0);
    });
    let picked = h.ctx.pick(None, None, false).unwrap();
    assert_eq!(picked, vec!["/Panel/Button[1]".to_string()]);
    notifier.join().unwrap();
}

#[test]
fn test_pick_times_out_without_pointer() {
    let h = Harness::start();
    let err = h.ctx.pick(None, None, false).unwrap_err();
    assert!(matches!(err, ProbeError::Timeout(_)));
}

#[test]
fn test_send_keycodes_dispatches_chord_on_owner_thread() {
    let h = Harness::start();
    h.ctx.send_keycodes("ctrl+shift+a").unwrap();

    let keys = h.window.keys.lock();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].key, 'a' as u32);
    assert_eq!(keys[0].modifiers, vec!["ctrl", "shift"]);
    drop(keys);

    // Parse failures abort with nothing dispatched.
    let err = h.ctx.send_keycodes("ctrl+wat_key").unwrap_err();
    assert!(matches!(err, ProbeError::DispatchFailure(_)));
    assert_eq!(h.window.keys.lock().len(), 1);
}

#[tokio::test]
async fn test_screenshot_waits_for_fresh_frame() {
    let h = Harness::start();
    let ctx = h.ctx.clone();
    let window = h.window.clone();

    let shot = ctx.screenshot(ImageFormat::Png);
    let render = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        window.render(5);
    };
    let (result, _) = tokio::join!(shot, render);
    let (bytes, content_type) = result.unwrap();
    assert_eq!(content_type, "image/png");
    assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    assert!(h.window.redraws.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_screenshot_times_out_without_repaint() {
    let h = Harness::start();
    let err = h.ctx.screenshot(ImageFormat::Jpg).await.unwrap_err();
    assert!(matches!(err, ProbeError::Timeout(_)));
}
