//! Tree traversal and structural path naming
//!
//! [`Walker`] is an explicit-stack pre-order iterator over a subtree: parent
//! before children, siblings in declared order (document order). It is the
//! traversal primitive behind tree dumps and descendant selector steps.
//!
//! [`path_of`] renders a node's canonical structural path: `/Type` for a
//! top-level node, `<parent>/Type[index]` below, where `index` is the node's
//! position among its parent's children. Re-resolving the path against an
//! unchanged tree identifies the same node.

use crate::scene::{NodeId, Scene};

/// Pre-order iterator over the subtree rooted at a node (inclusive).
pub struct Walker<'a> {
    scene: &'a Scene,
    stack: Vec<NodeId>,
}

impl<'a> Walker<'a> {
    pub fn new(scene: &'a Scene, start: NodeId) -> Self {
        let stack = if scene.contains(start) {
            vec![start]
        } else {
            Vec::new()
        };
        Self { scene, stack }
    }
}

impl Iterator for Walker<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        // Push in reverse so the first child is popped first.
        for child in self.scene.children(id).iter().rev() {
            self.stack.push(*child);
        }
        Some(id)
    }
}

/// Walk the subtree rooted at `start` in pre-order, `start` included.
pub fn walk(scene: &Scene, start: NodeId) -> Walker<'_> {
    Walker::new(scene, start)
}

/// Whether a node sits directly under the scene root (or has no parent at
/// all). Such nodes get a single-segment path.
fn is_top_level(scene: &Scene, id: NodeId) -> bool {
    match scene.parent(id) {
        None => true,
        Some(parent) => parent == id || Some(parent) == scene.root(),
    }
}

/// Canonical structural path of a node, or `None` for a stale handle.
pub fn path_of(scene: &Scene, id: NodeId) -> Option<String> {
    if !scene.contains(id) {
        return None;
    }
    let mut segments = Vec::new();
    let mut cur = id;
    loop {
        let kind = scene.type_name_of(cur)?;
        if is_top_level(scene, cur) {
            segments.push(format!("/{}", kind));
            break;
        }
        let index = scene.child_index(cur)?;
        segments.push(format!("/{}[{}]", kind, index));
        cur = scene.parent(cur)?;
    }
    segments.reverse();
    Some(segments.concat())
}
