//! Scene model: a generational arena of nodes plus per-type property tables.
//!
//! The scene graph is owned by the host application's render/event loop; the
//! probe only observes and mutates it through the handles defined here. A
//! [`NodeId`] carries a generation counter, so a handle to a despawned node
//! resolves to "absent" instead of a recycled stranger.
//!
//! Property access goes through a table built once per node type at
//! registration time. Lookups of names the type never declared fail closed:
//! they return `None` / update nothing, they never error.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Properties every node carries regardless of type.
const BUILTIN_PROPERTIES: &[&str] = &["x", "y", "width", "height", "visible"];

/// An axis-aligned rectangle in parent-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Point-containment test, edges inclusive.
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// A typed attribute value.
///
/// The canonical string form (`Display`) is what selector attribute
/// predicates compare against.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl Value {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Float(n) => serde_json::Value::from(*n),
            Value::Bool(b) => serde_json::Value::Bool(*b),
        }
    }

    /// Coerce an incoming JSON value to this value's kind. Returns `None`
    /// when no sensible conversion exists; the caller skips the update.
    pub fn coerce_like(&self, raw: &serde_json::Value) -> Option<Value> {
        match self {
            Value::Str(_) => match raw {
                serde_json::Value::String(s) => Some(Value::Str(s.clone())),
                serde_json::Value::Number(n) => Some(Value::Str(n.to_string())),
                serde_json::Value::Bool(b) => Some(Value::Str(b.to_string())),
                _ => None,
            },
            Value::Int(_) => raw
                .as_i64()
                .or_else(|| raw.as_str().and_then(|s| s.parse().ok()))
                .map(Value::Int),
            Value::Float(_) => raw
                .as_f64()
                .or_else(|| raw.as_str().and_then(|s| s.parse().ok()))
                .map(Value::Float),
            Value::Bool(_) => match raw {
                serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
                serde_json::Value::String(s) => match s.as_str() {
                    "true" | "1" => Some(Value::Bool(true)),
                    "false" | "0" => Some(Value::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Generation-qualified handle to a node in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Handle to a registered node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeTypeId(u32);

/// Declaration of one typed attribute in a node type's property table.
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    pub name: String,
    pub default: Value,
    pub writable: bool,
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
            writable: true,
        }
    }

    pub fn read_only(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            writable: false,
            ..Self::new(name, default)
        }
    }
}

struct NodeType {
    name: String,
    attributes: Vec<AttributeSpec>,
}

impl NodeType {
    fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Table of node types and their property declarations.
#[derive(Default)]
pub struct TypeRegistry {
    types: Vec<NodeType>,
    by_name: HashMap<String, NodeTypeId>,
}

impl TypeRegistry {
    /// Register a node type. Registering an already-known name returns the
    /// existing id; the first registration's attribute table wins.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        attributes: Vec<AttributeSpec>,
    ) -> NodeTypeId {
        let name = name.into();
        if let Some(id) = self.by_name.get(&name) {
            return *id;
        }
        let id = NodeTypeId(self.types.len() as u32);
        self.by_name.insert(name.clone(), id);
        self.types.push(NodeType { name, attributes });
        id
    }

    pub fn lookup(&self, name: &str) -> Option<NodeTypeId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: NodeTypeId) -> &str {
        &self.types[id.0 as usize].name
    }

    fn get(&self, id: NodeTypeId) -> &NodeType {
        &self.types[id.0 as usize]
    }
}

/// One live element of the scene graph.
pub struct Node {
    type_tag: NodeTypeId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Geometry in the parent's content space.
    pub frame: Rect,
    /// Content offset applied when mapping a point into this node's
    /// children's space (scroll views and the like).
    pub scroll: (f32, f32),
    pub visible: bool,
    attrs: BTreeMap<String, Value>,
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// The scene graph: node arena plus the type registry it draws from.
#[derive(Default)]
pub struct Scene {
    types: TypeRegistry,
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: Option<NodeId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_type(
        &mut self,
        name: impl Into<String>,
        attributes: Vec<AttributeSpec>,
    ) -> NodeTypeId {
        self.types.register(name, attributes)
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// The declared scene root (the "window" node), if any.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Spawn the root node. Replaces any previously declared root.
    pub fn spawn_root(&mut self, ty: NodeTypeId, frame: Rect) -> NodeId {
        let id = self.alloc(ty, None, frame);
        self.root = Some(id);
        id
    }

    /// Spawn a node as the last child of `parent`. Returns `None` when the
    /// parent handle is stale.
    pub fn spawn(&mut self, parent: NodeId, ty: NodeTypeId, frame: Rect) -> Option<NodeId> {
        if !self.contains(parent) {
            return None;
        }
        let id = self.alloc(ty, Some(parent), frame);
        if let Some(p) = self.node_mut(parent) {
            p.children.push(id);
        }
        Some(id)
    }

    fn alloc(&mut self, ty: NodeTypeId, parent: Option<NodeId>, frame: Rect) -> NodeId {
        let attrs = self
            .types
            .get(ty)
            .attributes
            .iter()
            .map(|a| (a.name.clone(), a.default.clone()))
            .collect();
        let node = Node {
            type_tag: ty,
            parent,
            children: Vec::new(),
            frame,
            scroll: (0.0, 0.0),
            visible: true,
            attrs,
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    /// Despawn a node and its whole subtree. Stale handles are a no-op.
    pub fn despawn(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        if let Some(parent) = self.parent(id) {
            if let Some(p) = self.node_mut(parent) {
                p.children.retain(|c| *c != id);
            }
        }
        if self.root == Some(id) {
            self.root = None;
        }
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let slot = &mut self.slots[cur.index as usize];
            if slot.generation != cur.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(cur.index);
                stack.extend(node.children);
            }
        }
    }

    /// Whether `id` still refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.slots
            .get(id.index as usize)
            .is_some_and(|s| s.generation == id.generation && s.node.is_some())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn type_name_of(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| self.types.name(n.type_tag))
    }

    /// Position of `id` among its parent's children.
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// All property names visible on `id`: the builtins, then the node
    /// type's declared attributes.
    pub fn list_properties(&self, id: NodeId) -> Vec<String> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        let mut names: Vec<String> = BUILTIN_PROPERTIES.iter().map(|s| s.to_string()).collect();
        names.extend(node.attrs.keys().cloned());
        names
    }

    /// Look up a property value. Unknown names fail closed with `None`.
    pub fn get_property(&self, id: NodeId, name: &str) -> Option<Value> {
        let node = self.node(id)?;
        match name {
            "x" => Some(Value::Float(node.frame.x as f64)),
            "y" => Some(Value::Float(node.frame.y as f64)),
            "width" => Some(Value::Float(node.frame.width as f64)),
            "height" => Some(Value::Float(node.frame.height as f64)),
            "visible" => Some(Value::Bool(node.visible)),
            _ => node.attrs.get(name).cloned(),
        }
    }

    /// Set a property from an incoming JSON value, coercing to the declared
    /// kind. Returns `true` only when the node was actually updated; unknown
    /// names, read-only attributes, and failed coercions all fail closed.
    pub fn set_property(&mut self, id: NodeId, name: &str, raw: &serde_json::Value) -> bool {
        match name {
            "x" | "y" | "width" | "height" => {
                let Some(Value::Float(v)) = Value::Float(0.0).coerce_like(raw) else {
                    return false;
                };
                let Some(node) = self.node_mut(id) else {
                    return false;
                };
                match name {
                    "x" => node.frame.x = v as f32,
                    "y" => node.frame.y = v as f32,
                    "width" => node.frame.width = v as f32,
                    _ => node.frame.height = v as f32,
                }
                true
            }
            "visible" => {
                let Some(Value::Bool(v)) = Value::Bool(false).coerce_like(raw) else {
                    return false;
                };
                match self.node_mut(id) {
                    Some(node) => {
                        node.visible = v;
                        true
                    }
                    None => false,
                }
            }
            _ => {
                let Some(tag) = self.node(id).map(|n| n.type_tag) else {
                    return false;
                };
                if !self.types.get(tag).attribute(name).is_some_and(|a| a.writable) {
                    return false;
                }
                let Some(coerced) = self
                    .node(id)
                    .and_then(|n| n.attrs.get(name))
                    .and_then(|current| current.coerce_like(raw))
                else {
                    return false;
                };
                match self.node_mut(id) {
                    Some(node) => {
                        node.attrs.insert(name.to_string(), coerced);
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Point containment in the space the node's frame is expressed in.
    pub fn contains_point(&self, id: NodeId, x: f32, y: f32) -> bool {
        self.node(id).is_some_and(|n| n.frame.contains(x, y))
    }

    /// Map a point from the node's frame space into the space its children
    /// live in (the node's content space).
    pub fn to_local(&self, id: NodeId, x: f32, y: f32) -> (f32, f32) {
        match self.node(id) {
            Some(n) => (x - n.frame.x + n.scroll.0, y - n.frame.y + n.scroll.1),
            None => (x, y),
        }
    }

    /// Map a point expressed in the same space as `id`'s frame (its parent's
    /// content space) into window coordinates.
    pub fn to_window(&self, id: NodeId, x: f32, y: f32) -> Option<(f32, f32)> {
        if !self.contains(id) {
            return None;
        }
        let (mut px, mut py) = (x, y);
        let mut cur = self.parent(id);
        while let Some(anc) = cur {
            let node = self.node(anc)?;
            px += node.frame.x - node.scroll.0;
            py += node.frame.y - node.scroll.1;
            cur = node.parent;
        }
        Some((px, py))
    }

    /// Window-space bounds `(left, bottom, right, top)` of a node's frame.
    pub fn window_bounds(&self, id: NodeId) -> Option<(f32, f32, f32, f32)> {
        let frame = self.node(id)?.frame;
        let (l, b) = self.to_window(id, frame.x, frame.y)?;
        let (r, t) = self.to_window(id, frame.x + frame.width, frame.y + frame.height)?;
        Some((l, b, r, t))
    }

    /// Window-space center of a node's frame.
    pub fn window_center(&self, id: NodeId) -> Option<(f32, f32)> {
        let (cx, cy) = self.node(id)?.frame.center();
        self.to_window(id, cx, cy)
    }
}

impl Node {
    pub fn type_tag(&self) -> NodeTypeId {
        self.type_tag
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scene_with_button() -> (Scene, NodeId, NodeId) {
        let mut scene = Scene::new();
        let root_ty = scene.register_type("Window", vec![]);
        let button_ty = scene.register_type(
            "Button",
            vec![
                AttributeSpec::new("text", "OK"),
                AttributeSpec::read_only("pressed", false),
            ],
        );
        let root = scene.spawn_root(root_ty, Rect::new(0.0, 0.0, 800.0, 600.0));
        let button = scene
            .spawn(root, button_ty, Rect::new(10.0, 20.0, 100.0, 40.0))
            .unwrap();
        (scene, root, button)
    }

    #[test]
    fn test_register_type_idempotent() {
        let mut types = TypeRegistry::default();
        let a = types.register("Button", vec![AttributeSpec::new("text", "")]);
        let b = types.register("Button", vec![]);
        assert_eq!(a, b);
        assert_eq!(types.name(a), "Button");
    }

    #[test]
    fn test_despawn_invalidates_handles() {
        let (mut scene, root, button) = scene_with_button();
        assert!(scene.contains(button));
        scene.despawn(button);
        assert!(!scene.contains(button));
        assert!(scene.node(button).is_none());
        assert!(scene.children(root).is_empty());

        // A slot reuse must not resurrect the old handle.
        let ty = scene.types().lookup("Button").unwrap();
        let fresh = scene.spawn(root, ty, Rect::default()).unwrap();
        assert!(scene.contains(fresh));
        assert!(!scene.contains(button));
    }

    #[test]
    fn test_despawn_removes_subtree() {
        let (mut scene, root, button) = scene_with_button();
        let label_ty = scene.register_type("Label", vec![]);
        let label = scene.spawn(button, label_ty, Rect::default()).unwrap();
        scene.despawn(button);
        assert!(!scene.contains(label));
        assert!(scene.contains(root));
    }

    #[test]
    fn test_property_lookup_fails_closed() {
        let (scene, _root, button) = scene_with_button();
        assert_eq!(
            scene.get_property(button, "text"),
            Some(Value::Str("OK".into()))
        );
        assert_eq!(scene.get_property(button, "no_such_prop"), None);
    }

    #[test]
    fn test_set_property_coerces_and_respects_writability() {
        let (mut scene, _root, button) = scene_with_button();
        assert!(scene.set_property(button, "text", &json!("Cancel")));
        assert_eq!(
            scene.get_property(button, "text"),
            Some(Value::Str("Cancel".into()))
        );

        // read-only attribute
        assert!(!scene.set_property(button, "pressed", &json!(true)));
        // unknown attribute
        assert!(!scene.set_property(button, "nope", &json!(1)));
        // builtin, coerced from string
        assert!(scene.set_property(button, "x", &json!("42.5")));
        assert_eq!(
            scene.get_property(button, "x"),
            Some(Value::Float(42.5))
        );
    }

    #[test]
    fn test_list_properties_builtins_first() {
        let (scene, _root, button) = scene_with_button();
        let props = scene.list_properties(button);
        assert_eq!(&props[..5], &["x", "y", "width", "height", "visible"]);
        assert!(props.contains(&"text".to_string()));
    }

    #[test]
    fn test_to_window_composes_offsets_and_scroll() {
        let mut scene = Scene::new();
        let ty = scene.register_type("Panel", vec![]);
        let root = scene.spawn_root(ty, Rect::new(0.0, 0.0, 800.0, 600.0));
        let outer = scene
            .spawn(root, ty, Rect::new(100.0, 50.0, 400.0, 400.0))
            .unwrap();
        let inner = scene
            .spawn(outer, ty, Rect::new(10.0, 10.0, 50.0, 50.0))
            .unwrap();
        assert_eq!(scene.to_window(inner, 10.0, 10.0), Some((110.0, 60.0)));

        scene.node_mut(outer).unwrap().scroll = (5.0, 0.0);
        assert_eq!(scene.to_window(inner, 10.0, 10.0), Some((105.0, 60.0)));
    }

    #[test]
    fn test_value_canonical_form() {
        assert_eq!(Value::Float(200.0).to_string(), "200");
        assert_eq!(Value::Str("OK".into()).to_string(), "OK");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Int(-3).to_string(), "-3");
    }
}
