//! Path-like selector language over the scene graph
//!
//! Grammar, informally:
//!
//! ```text
//! selector  :=  step ( sep step )*
//! sep       :=  "/"          child axis
//!           |   "//"         descendant axis
//! step      :=  ( TypeName | "*" ) predicate*
//! predicate :=  "[" INTEGER "]"          position among the parent's children
//!           |   "[" key "=" value "]"    attribute equality (canonical string form)
//! ```
//!
//! A selector with no leading separator starts on the descendant axis, so
//! `Button[text=OK]/Label` finds any matching button; `/Panel/Button[1]`
//! walks child steps from the root, which is exactly the shape
//! [`crate::walk::path_of`] produces.
//!
//! Matching is case-sensitive on type names. Attribute predicates compare
//! the property's canonical string form and fail closed when the node lacks
//! the property. The evaluator never mutates the tree and never returns
//! duplicates; results are in document order.

use crate::scene::{NodeId, Scene};
use crate::walk::walk;
use std::collections::HashSet;
use thiserror::Error;

/// Malformed selector text, with the offending token and byte position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unexpected token `{token}` at position {position}")]
pub struct ParseError {
    pub token: String,
    pub position: usize,
}

impl ParseError {
    fn at(token: impl Into<String>, position: usize) -> Self {
        Self {
            token: token.into(),
            position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TypePred {
    Any,
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    /// 0-based position among the parent's children.
    ChildIndex(usize),
    /// Attribute equality against the canonical string form.
    Attr { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    type_pred: TypePred,
    predicates: Vec<Predicate>,
}

/// A parsed selector: an executable query plan over a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    steps: Vec<Step>,
}

impl Selector {
    /// Parse selector text into a query plan.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError::at(text, 0));
        }
        let bytes = text.as_bytes();
        let mut pos = 0;
        let mut steps = Vec::new();

        while pos < bytes.len() {
            let axis = if text[pos..].starts_with("//") {
                pos += 2;
                Axis::Descendant
            } else if bytes[pos] == b'/' {
                pos += 1;
                Axis::Child
            } else if pos == 0 {
                // No leading separator: search anywhere below the root.
                Axis::Descendant
            } else {
                let token = text[pos..].chars().next().map(String::from).unwrap_or_default();
                return Err(ParseError::at(token, pos));
            };

            let type_pred = if pos < bytes.len() && bytes[pos] == b'*' {
                pos += 1;
                TypePred::Any
            } else {
                let start = pos;
                while pos < bytes.len()
                    && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                if pos == start {
                    let token = text[pos..].chars().next().map(String::from).unwrap_or_default();
                    return Err(ParseError::at(token, pos));
                }
                TypePred::Name(text[start..pos].to_string())
            };

            let mut predicates = Vec::new();
            while pos < bytes.len() && bytes[pos] == b'[' {
                let open = pos;
                pos += 1;
                let Some(close) = text[pos..].find(']') else {
                    return Err(ParseError::at("[", open));
                };
                let content = &text[pos..pos + close];
                pos += close + 1;

                if content.is_empty() {
                    return Err(ParseError::at("[]", open));
                }
                if let Ok(index) = content.parse::<usize>() {
                    predicates.push(Predicate::ChildIndex(index));
                } else if let Some(eq) = content.find('=') {
                    let (key, value) = (&content[..eq], &content[eq + 1..]);
                    if key.is_empty() {
                        return Err(ParseError::at(content, open));
                    }
                    predicates.push(Predicate::Attr {
                        key: key.to_string(),
                        value: value.to_string(),
                    });
                } else {
                    return Err(ParseError::at(content, open));
                }
            }

            steps.push(Step {
                axis,
                type_pred,
                predicates,
            });
        }

        Ok(Selector { steps })
    }

    /// Evaluate the plan against a scene, starting below `root`.
    ///
    /// Results are in document order and duplicate-free; an empty plan or a
    /// stale root matches nothing.
    pub fn evaluate(&self, scene: &Scene, root: NodeId) -> Vec<NodeId> {
        if self.steps.is_empty() || !scene.contains(root) {
            return Vec::new();
        }
        let mut frontier = vec![root];
        for step in &self.steps {
            let mut next = Vec::new();
            let mut seen = HashSet::new();
            for &base in &frontier {
                match step.axis {
                    Axis::Child => {
                        for &child in scene.children(base) {
                            if step_matches(scene, step, child) && seen.insert(child) {
                                next.push(child);
                            }
                        }
                    }
                    Axis::Descendant => {
                        for node in walk(scene, base).skip(1) {
                            if step_matches(scene, step, node) && seen.insert(node) {
                                next.push(node);
                            }
                        }
                    }
                }
            }
            frontier = next;
            if frontier.is_empty() {
                break;
            }
        }
        frontier
    }
}

fn step_matches(scene: &Scene, step: &Step, id: NodeId) -> bool {
    match &step.type_pred {
        TypePred::Any => {}
        TypePred::Name(name) => {
            if scene.type_name_of(id) != Some(name.as_str()) {
                return false;
            }
        }
    }
    step.predicates.iter().all(|pred| match pred {
        Predicate::ChildIndex(index) => scene.child_index(id) == Some(*index),
        Predicate::Attr { key, value } => scene
            .get_property(id, key)
            .is_some_and(|v| v.to_string() == *value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{AttributeSpec, Rect};
    use crate::walk::path_of;

    fn sample_scene() -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let window = scene.register_type("Window", vec![]);
        let panel = scene.register_type("Panel", vec![]);
        let button = scene.register_type("Button", vec![AttributeSpec::new("text", "")]);
        let label = scene.register_type("Label", vec![AttributeSpec::new("text", "")]);

        let root = scene.spawn_root(window, Rect::new(0.0, 0.0, 800.0, 600.0));
        let p = scene.spawn(root, panel, Rect::default()).unwrap();
        let ok = scene.spawn(p, button, Rect::default()).unwrap();
        scene.set_property(ok, "text", &serde_json::json!("OK"));
        scene.spawn(ok, label, Rect::default()).unwrap();
        scene.spawn(ok, label, Rect::default()).unwrap();
        let cancel = scene.spawn(p, button, Rect::default()).unwrap();
        scene.set_property(cancel, "text", &serde_json::json!("Cancel"));
        (scene, root)
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("   ").is_err());
        assert!(Selector::parse("/").is_err());
        assert!(Selector::parse("/Button/").is_err());
        assert!(Selector::parse("Button[").is_err());
        assert!(Selector::parse("Button[]").is_err());
        assert!(Selector::parse("Button[=x]").is_err());
        assert!(Selector::parse("Button[foo]").is_err());
        assert!(Selector::parse("Button]x").is_err());

        let err = Selector::parse("/Panel/[0]").unwrap_err();
        assert_eq!(err.position, 7);
        assert_eq!(err.token, "[");
    }

    #[test]
    fn test_parse_error_reports_position() {
        let err = Selector::parse("Button[text").unwrap_err();
        assert_eq!(err.token, "[");
        assert_eq!(err.position, 6);
    }

    #[test]
    fn test_attribute_selector_matches_in_child_order() {
        let (scene, root) = sample_scene();
        let sel = Selector::parse("Button[text=OK]/Label").unwrap();
        let matches = sel.evaluate(&scene, root);
        assert_eq!(matches.len(), 2);
        assert_eq!(path_of(&scene, matches[0]).as_deref(), Some("/Panel/Button[0]/Label[0]"));
        assert_eq!(path_of(&scene, matches[1]).as_deref(), Some("/Panel/Button[0]/Label[1]"));
    }

    #[test]
    fn test_attribute_selector_no_match() {
        let (scene, root) = sample_scene();
        let sel = Selector::parse("Button[text=Nope]/Label").unwrap();
        assert!(sel.evaluate(&scene, root).is_empty());
    }

    #[test]
    fn test_attribute_predicate_fails_closed_on_missing_property() {
        let (scene, root) = sample_scene();
        // Panels declare no `text` attribute; this must not error.
        let sel = Selector::parse("Panel[text=OK]").unwrap();
        assert!(sel.evaluate(&scene, root).is_empty());
    }

    #[test]
    fn test_wildcard_and_index() {
        let (scene, root) = sample_scene();
        let sel = Selector::parse("/Panel/*[1]").unwrap();
        let matches = sel.evaluate(&scene, root);
        assert_eq!(matches.len(), 1);
        assert_eq!(path_of(&scene, matches[0]).as_deref(), Some("/Panel/Button[1]"));
    }

    #[test]
    fn test_descendant_axis_dedups() {
        let (scene, root) = sample_scene();
        // Every Label, reachable through both the root and the panel.
        let sel = Selector::parse("//*//Label").unwrap();
        let matches = sel.evaluate(&scene, root);
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_type_names_are_case_sensitive() {
        let (scene, root) = sample_scene();
        let sel = Selector::parse("button").unwrap();
        assert!(sel.evaluate(&scene, root).is_empty());
    }

    #[test]
    fn test_generated_paths_round_trip() {
        let (scene, root) = sample_scene();
        for node in walk(&scene, root).skip(1) {
            let path = path_of(&scene, node).unwrap();
            let sel = Selector::parse(&path).unwrap();
            let matches = sel.evaluate(&scene, root);
            assert_eq!(matches, vec![node], "path `{}` must resolve to its node", path);
        }
    }

    #[test]
    fn test_stale_root_matches_nothing() {
        let (mut scene, root) = sample_scene();
        let sel = Selector::parse("//Label").unwrap();
        scene.despawn(root);
        assert!(sel.evaluate(&scene, root).is_empty());
    }
}
