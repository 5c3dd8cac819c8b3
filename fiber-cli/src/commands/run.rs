//! Drive a scripted scenario through the frame loop.

use crate::demo;
use crate::scenario::{Action, ActionSpec, Scenario};
use anyhow::{bail, Context, Result};
use fiber_core::{CompositionRoot, Fiber, MetricsSnapshot, NodeId, RootPhase};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Serialize)]
pub struct RunSummary {
    pub frames: u32,
    pub active_scene: String,
    pub controllers: Vec<ControllerCount>,
    pub roots: Vec<RootSummary>,
    pub metrics: Vec<MetricsSnapshot>,
}

#[derive(Serialize)]
pub struct ControllerCount {
    pub controller: &'static str,
    pub count: usize,
}

#[derive(Serialize)]
pub struct RootSummary {
    pub name: String,
    pub node: NodeId,
    pub alive: bool,
    pub phase: RootPhase,
    pub controller: Option<&'static str>,
    pub model: Option<serde_json::Value>,
}

/// The nodes spawned for a scenario, in declaration order
struct Stage {
    fiber: Fiber,
    roots: Vec<(String, CompositionRoot)>,
    by_name: HashMap<String, usize>,
}

impl Stage {
    fn build(scenario: &Scenario) -> Result<Self> {
        let fiber = demo::fiber(scenario.fiber.clone());
        fiber.init();

        let mut stage = Self {
            fiber,
            roots: Vec::new(),
            by_name: HashMap::new(),
        };
        for spec in &scenario.nodes {
            if stage.by_name.contains_key(&spec.name) {
                bail!("duplicate node name: {}", spec.name);
            }
            let node = stage.fiber.spawn(&spec.name);
            let root = CompositionRoot::new(&stage.fiber, node);
            if let Some(controller) = &spec.controller {
                root.construct_named(controller)
                    .with_context(|| format!("Failed to construct {} on {}", controller, spec.name))?;
            }
            stage.by_name.insert(spec.name.clone(), stage.roots.len());
            stage.roots.push((spec.name.clone(), root));
        }
        Ok(stage)
    }

    fn root(&self, name: &str) -> Result<&CompositionRoot> {
        let index = self
            .by_name
            .get(name)
            .with_context(|| format!("unknown node: {name}"))?;
        Ok(&self.roots[*index].1)
    }

    fn node(&self, name: &str) -> Option<NodeId> {
        let index = self.by_name.get(name)?;
        Some(self.roots[*index].1.node())
    }

    fn apply(&self, spec: &ActionSpec) -> Result<()> {
        let root = self.root(&spec.node)?;
        tracing::debug!(node = %spec.node, action = ?spec.action, "action");
        match spec.action {
            Action::Construct => {
                let controller = spec
                    .controller
                    .as_deref()
                    .with_context(|| format!("construct on {} needs a controller", spec.node))?;
                root.construct_named(controller)?;
            }
            Action::Reset => root.reset()?,
            Action::RefreshModel => root.refresh_model()?,
            Action::RefreshView => root.refresh_view()?,
            Action::RefreshConfiguration => root.refresh_configuration()?,
            Action::Detach => root.detach()?,
        }
        Ok(())
    }

    fn summary(&self, frames: u32) -> RunSummary {
        let controllers = self
            .fiber
            .registry()
            .counts()
            .into_iter()
            .map(|(controller, count)| ControllerCount { controller, count })
            .collect();

        let roots = self
            .roots
            .iter()
            .map(|(name, root)| RootSummary {
                name: name.clone(),
                node: root.node(),
                alive: self.fiber.with_scene(|scene| scene.is_alive(root.node())),
                phase: root.phase(),
                controller: root.controller_type_name(),
                model: root.model_fields(),
            })
            .collect();

        RunSummary {
            frames,
            active_scene: self.fiber.with_scene(|scene| scene.active_scene().to_string()),
            controllers,
            roots,
            metrics: self.fiber.metrics(),
        }
    }
}

/// Run `scenario` for its frame count (or `frames`, when given) and print a
/// summary of what is left alive.
pub fn run_scenario(path: &Path, frames: Option<u32>, json: bool) -> Result<()> {
    let scenario = Scenario::from_file(path)?;
    let frames = frames.unwrap_or(scenario.frames);
    let stage = Stage::build(&scenario)?;
    let fiber = &stage.fiber;
    tracing::info!(nodes = stage.roots.len(), frames, "running scenario");

    for frame in 1..=frames {
        for root in fiber.roots() {
            root.on_ready();
        }

        for action in scenario.actions.iter().filter(|a| a.frame == frame) {
            stage.apply(action)?;
        }

        for spec in scenario.events.iter().filter(|e| e.frame == frame) {
            let node = stage
                .node(&spec.node)
                .with_context(|| format!("unknown node: {}", spec.node))?;
            let event = spec.to_event(|name| stage.node(name))?;
            fiber.deliver(node, &event);
        }

        fiber.fixed_tick();
        fiber.tick();
        fiber.late_tick();

        for load in scenario.scenes.iter().filter(|s| s.frame == frame) {
            let destroyed = fiber.with_scene(|scene| scene.load(&load.load));
            tracing::info!(scene = %load.load, destroyed = destroyed.len(), "scene loaded");
            for node in destroyed {
                if let Some(root) = fiber.root_of(node) {
                    root.detach()?;
                }
            }
        }
    }

    let summary = stage.summary(frames);
    fiber.shutdown();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "Ran {} frames (active scene: {})",
        summary.frames, summary.active_scene
    );
    println!("Controllers:");
    for count in &summary.controllers {
        println!("  {:<12} {}", count.controller, count.count);
    }
    println!("Roots:");
    for root in &summary.roots {
        println!(
            "  {:<12} {:<8} {:<8} {}{}",
            root.name,
            root.node.to_string(),
            root.phase.to_string(),
            root.controller.unwrap_or("-"),
            if root.alive { "" } else { " (destroyed)" }
        );
    }
    println!("Dispatch:");
    for metrics in &summary.metrics {
        println!("  {}", metrics);
    }

    Ok(())
}
