//! Hit-testing: map a point in root space to the node(s) rendered there
//!
//! Children are drawn in declared order, so the last child of a node sits on
//! top. [`pick_top`] returns the deepest visible node containing the point,
//! later siblings winning ties. [`pick_all`] yields the full front-to-back
//! collision stack: only leaf-most matches along each branch are reported,
//! topmost first, with no visibility filtering.
//!
//! Every descent converts the point into the child's local space through the
//! node's own transform; geometry is never assumed untransformed.

use crate::scene::{NodeId, Scene, Value};
use parking_lot::Mutex;
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

fn is_visible(scene: &Scene, id: NodeId) -> bool {
    match scene.get_property(id, "visible") {
        Some(Value::Bool(v)) => v,
        _ => true,
    }
}

/// The topmost visible node under `(x, y)`, a point in `root`'s frame space.
pub fn pick_top(scene: &Scene, root: NodeId, x: f32, y: f32) -> Option<NodeId> {
    if !is_visible(scene, root) || !scene.contains_point(root, x, y) {
        return None;
    }
    let (lx, ly) = scene.to_local(root, x, y);
    let mut hit = Some(root);
    for &child in scene.children(root) {
        // Later children render on top; the last match wins.
        if let Some(deeper) = pick_top(scene, child, lx, ly) {
            hit = Some(deeper);
        }
    }
    hit
}

/// Iterator over the full front-to-back collision stack under a point.
pub struct CollisionStack<'a> {
    scene: &'a Scene,
    stack: Vec<Frame>,
}

struct Frame {
    id: NodeId,
    /// The probe point in this node's content space.
    lx: f32,
    ly: f32,
    /// Children not yet visited; popped from the end, so topmost first.
    remaining: Vec<NodeId>,
    /// Whether anything below this node has been yielded.
    yielded: bool,
}

impl<'a> CollisionStack<'a> {
    fn new(scene: &'a Scene, root: NodeId, x: f32, y: f32) -> Self {
        let mut stack = Vec::new();
        if scene.contains_point(root, x, y) {
            let (lx, ly) = scene.to_local(root, x, y);
            stack.push(Frame {
                id: root,
                lx,
                ly,
                remaining: scene.children(root).to_vec(),
                yielded: false,
            });
        }
        Self { scene, stack }
    }
}

impl Iterator for CollisionStack<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        loop {
            let top = self.stack.last_mut()?;
            if let Some(child) = top.remaining.pop() {
                let (px, py) = (top.lx, top.ly);
                if self.scene.contains_point(child, px, py) {
                    let (lx, ly) = self.scene.to_local(child, px, py);
                    self.stack.push(Frame {
                        id: child,
                        lx,
                        ly,
                        remaining: self.scene.children(child).to_vec(),
                        yielded: false,
                    });
                }
                continue;
            }
            // Children exhausted. A colliding node always produces at least
            // one result beneath it (possibly itself), so the parent's
            // subtree is no longer leaf-most.
            let frame = self.stack.pop()?;
            if let Some(parent) = self.stack.last_mut() {
                parent.yielded = true;
            }
            if !frame.yielded {
                return Some(frame.id);
            }
        }
    }
}

/// All leaf-most nodes colliding with `(x, y)`, front to back.
pub fn pick_all<'a>(scene: &'a Scene, root: NodeId, x: f32, y: f32) -> CollisionStack<'a> {
    CollisionStack::new(scene, root, x, y)
}

/// One-shot subscription point for the next real pointer-down.
///
/// The host's event loop reports every physical pointer-down through
/// [`PointerWaiter::notify`]; a pick request with no explicit coordinates
/// subscribes and blocks until one arrives.
#[derive(Default)]
pub struct PointerWaiter {
    pending: Mutex<Vec<SyncSender<(f32, f32)>>>,
}

impl PointerWaiter {
    /// Subscribe to the next pointer-down. The returned receiver yields at
    /// most one coordinate pair.
    pub fn subscribe(&self) -> Receiver<(f32, f32)> {
        let (tx, rx) = sync_channel(1);
        self.pending.lock().push(tx);
        rx
    }

    /// Deliver a pointer-down to every waiting subscriber.
    pub fn notify(&self, x: f32, y: f32) {
        for tx in self.pending.lock().drain(..) {
            let _ = tx.try_send((x, y));
        }
    }
}
