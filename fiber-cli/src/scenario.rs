//! Scenario files: a scripted frame loop for the reference host

use anyhow::{Context, Result};
use fiber_core::{Channel, Event, FiberConfig, NodeId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A scripted run
///
/// ```yaml
/// fiber:
///   strict_parts: false
/// frames: 4
/// nodes:
///   - name: wheel
///     controller: Spinner
/// events:
///   - frame: 2
///     node: wheel
///     channel: became_visible
/// actions:
///   - frame: 3
///     node: wheel
///     action: refresh_model
/// scenes:
///   - frame: 4
///     load: level-2
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scenario {
    #[serde(default)]
    pub fiber: FiberConfig,

    #[serde(default = "default_frames")]
    pub frames: u32,

    #[serde(default)]
    pub nodes: Vec<NodeSpec>,

    #[serde(default)]
    pub events: Vec<EventSpec>,

    #[serde(default)]
    pub actions: Vec<ActionSpec>,

    #[serde(default)]
    pub scenes: Vec<SceneLoad>,
}

fn default_frames() -> u32 {
    1
}

/// A scene node spawned before the first frame
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeSpec {
    pub name: String,

    /// Controller type to construct on the node's root, by type or display name
    #[serde(default)]
    pub controller: Option<String>,
}

/// A node-scoped event delivered during a frame
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventSpec {
    pub frame: u32,
    pub node: String,
    pub channel: Channel,

    /// The other party, for trigger and collision channels
    #[serde(default)]
    pub other: Option<String>,
}

/// Something done to a composition root during a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Construct,
    Reset,
    RefreshModel,
    RefreshView,
    RefreshConfiguration,
    Detach,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionSpec {
    pub frame: u32,
    pub node: String,
    pub action: Action,

    /// Controller type for `construct`
    #[serde(default)]
    pub controller: Option<String>,
}

/// A scene transition at the end of a frame
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SceneLoad {
    pub frame: u32,
    pub load: String,
}

impl Scenario {
    /// Load a scenario from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }
}

impl EventSpec {
    /// Build the host event, resolving `other` through `lookup`
    pub fn to_event(&self, lookup: impl Fn(&str) -> Option<NodeId>) -> Result<Event> {
        if !self.channel.has_payload() {
            return Event::bare(self.channel)
                .with_context(|| format!("channel {} cannot be scripted", self.channel));
        }

        let name = self
            .other
            .as_deref()
            .with_context(|| format!("channel {} needs an `other` node", self.channel))?;
        let other = lookup(name).with_context(|| format!("unknown node: {name}"))?;
        Event::with_other(self.channel, other)
            .with_context(|| format!("channel {} cannot be scripted", self.channel))
    }
}
