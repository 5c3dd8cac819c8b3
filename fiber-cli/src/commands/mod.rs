//! CLI command implementations.

pub mod inspect;
pub mod list;
pub mod run;

pub use inspect::inspect_type;
pub use list::list_types;
pub use run::run_scenario;
