//! Wire types for the uiprobe remote-inspection endpoint
//!
//! This crate defines the request and response payloads exchanged between
//! the HTTP surface and clients. It carries no behavior beyond
//! (de)serialization.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Response payload for `GET /version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
}

/// One node in a tree dump. Nodes are exposed to the registry as they are
/// enumerated, so `id` can be fed back into `GET /inspect/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeEntry {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub children: Vec<TreeEntry>,
}

/// Response payload for `GET /tree`: `("root", nested children)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeDump {
    pub tree: (String, Vec<TreeEntry>),
}

/// A single property in an inspect response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyInfo {
    pub value: serde_json::Value,
}

/// Full property map returned by `GET /inspect/{id}`.
pub type PropertyMap = BTreeMap<String, PropertyInfo>;

/// Axis-aligned bounds in window coordinates: `(left, bottom, right, top)`.
pub type Bounds = (f32, f32, f32, f32);

/// Request payload for `POST /select`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectRequest {
    pub selector: String,
    #[serde(default)]
    pub with_bounds: bool,
}

/// One match in a select response: a bare path, or `(path, bounds)` when
/// `with_bounds` was requested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SelectMatch {
    Path(String),
    Bounded(String, Bounds),
}

impl SelectMatch {
    pub fn path(&self) -> &str {
        match self {
            SelectMatch::Path(p) => p,
            SelectMatch::Bounded(p, _) => p,
        }
    }
}

/// Response payload for `POST /select`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectResponse {
    pub selector: String,
    pub with_bounds: bool,
    pub results: Vec<SelectMatch>,
}

/// Request payload for `POST /exists`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistsRequest {
    pub selector: String,
}

/// Response payload for `POST /exists`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistsResponse {
    pub result: bool,
}

/// Request payload for `POST /setattr`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAttrRequest {
    pub selector: String,
    pub key: String,
    pub value: serde_json::Value,
}

/// Response payload for `POST /setattr`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAttrResponse {
    pub updated: usize,
}

/// Request payload for `POST /click`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickRequest {
    pub selector: String,
}

/// Request payload for `POST /sendkeycodes`: a `+`-joined token string,
/// e.g. `"ctrl+shift+a"` or `"13"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeycodesRequest {
    pub keycodes: String,
}

/// Query parameters for `GET /pick`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PickParams {
    #[serde(default)]
    pub all: bool,
    pub x: Option<f32>,
    pub y: Option<f32>,
}

/// Result of a pick: a single path, or the full collision stack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PickResult {
    Path(String),
    Paths(Vec<String>),
}

/// Response payload for `GET /pick`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickResponse {
    pub results: PickResult,
}

/// Error envelope used by every route on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}
