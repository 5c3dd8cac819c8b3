//! List the controller types known to the host.

use crate::demo;
use anyhow::Result;
use fiber_core::FiberConfig;

pub fn list_types(include_hidden: bool, json: bool) -> Result<()> {
    let fiber = demo::fiber(FiberConfig::default());
    let catalog = fiber.catalog();

    if json {
        let entries = catalog.entries(include_hidden);
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print!("{}", catalog.render_listing(include_hidden));
    }

    Ok(())
}
