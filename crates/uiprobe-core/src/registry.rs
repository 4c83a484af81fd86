//! Registry of nodes exposed to clients
//!
//! Clients never hold [`NodeId`]s directly; they see opaque integer ids
//! handed out the first time a node appears in a response (a tree dump, a
//! select result). The registry does not keep nodes alive: resolving an id
//! whose node has since been despawned yields `None`, never a recycled
//! stranger, because the underlying handle is generation-qualified.

use crate::scene::{NodeId, Scene};
use std::collections::HashMap;

#[derive(Default)]
pub struct NodeRegistry {
    forward: HashMap<u64, NodeId>,
    reverse: HashMap<NodeId, u64>,
    next_id: u64,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose a node to clients, returning its public id. Exposing the same
    /// live node twice returns the same id; ids are never reused.
    pub fn expose(&mut self, id: NodeId) -> u64 {
        if let Some(existing) = self.reverse.get(&id) {
            return *existing;
        }
        self.next_id += 1;
        let public = self.next_id;
        self.forward.insert(public, id);
        self.reverse.insert(id, public);
        public
    }

    /// Resolve a public id back to a live node handle. Returns `None` for
    /// unknown ids and for nodes that have been despawned since exposure.
    pub fn resolve(&self, scene: &Scene, public: u64) -> Option<NodeId> {
        let id = *self.forward.get(&public)?;
        scene.contains(id).then_some(id)
    }

    /// Drop entries whose nodes are gone. Purely a space optimization; stale
    /// entries already resolve to `None`.
    pub fn prune(&mut self, scene: &Scene) {
        self.forward.retain(|_, id| scene.contains(*id));
        self.reverse.retain(|id, _| scene.contains(*id));
    }
}
