//! Reversible wireframe mirroring of physics and hit-zone state

use crate::physics::{BodyId, PhysicsBody};
use log::debug;
use shared::PlayerId;
use std::collections::HashMap;

pub type DebugMeshId = u64;

/// Side tables mapping simulation ids to diagnostic mesh ids.
///
/// The tables are strictly one-directional (body -> mesh, player ->
/// outline), so the simulation side never holds references into the debug
/// side and either can be torn down without dangling the other.
pub struct DebugView {
    enabled: bool,
    meshes: HashMap<BodyId, DebugMeshId>,
    outlines: HashMap<PlayerId, DebugMeshId>,
    next_mesh_id: DebugMeshId,
}

impl DebugView {
    pub fn new() -> Self {
        Self {
            enabled: false,
            meshes: HashMap::new(),
            outlines: HashMap::new(),
            next_mesh_id: 1,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Builds one wireframe mesh per existing body.
    pub fn enable<'a>(&mut self, bodies: impl Iterator<Item = &'a PhysicsBody>) {
        self.enabled = true;
        for body in bodies {
            self.add_mesh(body.id);
        }
    }

    /// Discards every mesh. Hit-zone outlines are dependent visualizers and
    /// tear down with the rest.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.meshes.clear();
        self.outlines.clear();
    }

    /// Keeps the mirror in sync while enabled; no-op otherwise.
    pub fn on_body_added(&mut self, body: &PhysicsBody) {
        if self.enabled {
            self.add_mesh(body.id);
        }
    }

    pub fn on_body_removed(&mut self, body_id: BodyId) {
        if self.meshes.remove(&body_id).is_some() {
            debug!("Disposed debug mesh for body {}", body_id);
        }
    }

    pub fn add_outline(&mut self, player_id: PlayerId) {
        if self.enabled && !self.outlines.contains_key(&player_id) {
            let mesh_id = self.alloc_mesh_id();
            self.outlines.insert(player_id, mesh_id);
        }
    }

    pub fn remove_outline(&mut self, player_id: PlayerId) {
        self.outlines.remove(&player_id);
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn outline_count(&self) -> usize {
        self.outlines.len()
    }

    fn add_mesh(&mut self, body_id: BodyId) {
        let mesh_id = self.alloc_mesh_id();
        self.meshes.insert(body_id, mesh_id);
    }

    fn alloc_mesh_id(&mut self) -> DebugMeshId {
        let id = self.next_mesh_id;
        self.next_mesh_id += 1;
        id
    }
}

impl Default for DebugView {
    fn default() -> Self {
        Self::new()
    }
}
