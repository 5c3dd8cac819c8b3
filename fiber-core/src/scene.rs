//! Host scene abstraction
//!
//! The core only needs a handful of node operations from the host: spawn,
//! liveness, persistence across scene loads and destruction. [`SceneGraph`]
//! is the in-memory host used by the CLI and the tests.

use fiber_types::NodeId;
use std::collections::BTreeMap;

/// Node operations the core needs from the host scene system
pub trait Scene {
    /// Create a node in the active scene
    fn spawn(&mut self, name: &str) -> NodeId;

    fn is_alive(&self, node: NodeId) -> bool;

    fn name_of(&self, node: NodeId) -> Option<String>;

    /// First live node with the given name, in spawn order
    fn find(&self, name: &str) -> Option<NodeId>;

    /// Mark a node to survive (or not) the next scene load
    fn set_persistent(&mut self, node: NodeId, persistent: bool);

    fn is_persistent(&self, node: NodeId) -> bool;

    /// Move a node back into the active scene, dropping persistence
    fn move_to_active_scene(&mut self, node: NodeId);

    /// Destroy a node. Returns `false` if it was already gone.
    fn destroy(&mut self, node: NodeId) -> bool;

    /// Switch the active scene, destroying every non-persistent node.
    /// Returns the destroyed nodes.
    fn load(&mut self, scene: &str) -> Vec<NodeId>;

    fn active_scene(&self) -> &str;
}

#[derive(Debug, Clone)]
struct NodeRecord {
    name: String,
    scene: String,
    persistent: bool,
}

/// In-memory scene graph
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: BTreeMap<NodeId, NodeRecord>,
    next_id: u64,
    active: String,
}

/// Pseudo-scene that holds persistent nodes
pub const PERSISTENT_SCENE: &str = "persistent";

impl SceneGraph {
    pub fn new(active: impl Into<String>) -> Self {
        Self {
            nodes: BTreeMap::new(),
            next_id: 1,
            active: active.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Scene a node currently belongs to
    pub fn scene_of(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|record| record.scene.as_str())
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new("main")
    }
}

impl Scene for SceneGraph {
    fn spawn(&mut self, name: &str) -> NodeId {
        let node = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            node,
            NodeRecord {
                name: name.to_string(),
                scene: self.active.clone(),
                persistent: false,
            },
        );
        node
    }

    fn is_alive(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn name_of(&self, node: NodeId) -> Option<String> {
        self.nodes.get(&node).map(|record| record.name.clone())
    }

    fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, record)| record.name == name)
            .map(|(node, _)| *node)
    }

    fn set_persistent(&mut self, node: NodeId, persistent: bool) {
        if let Some(record) = self.nodes.get_mut(&node) {
            record.persistent = persistent;
            if persistent {
                record.scene = PERSISTENT_SCENE.to_string();
            }
        }
    }

    fn is_persistent(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|record| record.persistent)
    }

    fn move_to_active_scene(&mut self, node: NodeId) {
        if let Some(record) = self.nodes.get_mut(&node) {
            record.persistent = false;
            record.scene = self.active.clone();
        }
    }

    fn destroy(&mut self, node: NodeId) -> bool {
        self.nodes.remove(&node).is_some()
    }

    fn load(&mut self, scene: &str) -> Vec<NodeId> {
        let doomed: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, record)| !record.persistent)
            .map(|(node, _)| *node)
            .collect();

        for node in &doomed {
            self.nodes.remove(node);
        }

        self.active = scene.to_string();
        doomed
    }

    fn active_scene(&self) -> &str {
        &self.active
    }
}
