//! Inspect one controller type: channels per part and default model fields.

use crate::demo;
use anyhow::{Context, Result};
use fiber_core::{CatalogEntry, Channel, CompositionRoot, FiberConfig, FiberError};
use serde::Serialize;

#[derive(Serialize)]
struct Inspection {
    #[serde(flatten)]
    entry: CatalogEntry,
    model_fields: Option<serde_json::Value>,
}

pub fn inspect_type(name: &str, json: bool) -> Result<()> {
    let fiber = demo::fiber(FiberConfig::default());
    let ty = fiber
        .find_type(name)
        .ok_or_else(|| FiberError::UnknownController(name.to_string()))?;
    let entry = fiber
        .catalog()
        .entry(ty.type_name())
        .context("Catalog entry vanished")?;

    // Build a throwaway triad to read the model's default fields
    let root = CompositionRoot::new(&fiber, fiber.spawn("inspect"));
    root.construct_type(&ty)
        .with_context(|| format!("Failed to construct {}", ty.type_name()))?;
    let model_fields = root.model_fields();
    fiber.shutdown();

    let inspection = Inspection {
        entry,
        model_fields,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&inspection)?);
        return Ok(());
    }

    let entry = &inspection.entry;
    println!("{} ({})", entry.display_name, entry.type_name);
    if let Some(description) = &entry.description {
        println!("  {}", description);
    }
    println!("  controller: {}", channel_list(&entry.channels));
    match entry.model {
        Some(model) => println!("  model: {} [{}]", model, channel_list(&entry.model_channels)),
        None => println!("  model: none"),
    }
    match entry.view {
        Some(view) => println!("  view: {} [{}]", view, channel_list(&entry.view_channels)),
        None => println!("  view: none"),
    }
    println!("  persistent: {}", entry.persistent);
    if entry.hidden {
        println!("  hidden");
    }
    if let Some(fields) = &inspection.model_fields {
        println!("  model fields: {}", fields);
    }

    Ok(())
}

fn channel_list(channels: &[Channel]) -> String {
    if channels.is_empty() {
        return "-".to_string();
    }
    channels
        .iter()
        .map(Channel::name)
        .collect::<Vec<_>>()
        .join(", ")
}
