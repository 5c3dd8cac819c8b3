//! Fiber core: controller/model/view composition under a host frame loop
//!
//! This crate binds a controller, a data model and a view into one managed
//! triad per scene node, and routes per-frame and one-shot notifications only
//! to the objects that declare interest in them.
//!
//! # Architecture
//!
//! ```text
//! host event ─▶ Fiber::pump / deliver ─▶ Dispatcher snapshot ─▶ handlers
//!                                                                  │
//!        CompositionRoot::construct / reset ◀──────────────────────┘
//!                       │
//!                       ▼
//!        TypeRegistry (per-type InstanceContainer) + Dispatcher store/purge
//! ```
//!
//! - **Capabilities**: single-method traits, one per [`Channel`]. A type
//!   lists the channels it wants in [`Component::capabilities`].
//! - **TypeRegistry**: one ordered, duplicate-free [`InstanceContainer`] per
//!   concrete controller type; exact-type `first`/`last`/`all` queries.
//! - **Dispatcher**: per-channel subscriber lists, pumped over a snapshot so
//!   handlers may register or reset triads mid-pump.
//! - **CompositionRoot**: owns one triad and drives construct, refresh,
//!   reset, attach and detach.
//! - **Fiber**: the process-scoped context tying the above together with the
//!   host [`Scene`].
//!
//! # Example
//!
//! ```
//! use fiber_core::prelude::*;
//!
//! #[derive(Default)]
//! struct Clock {
//!     frames: u32,
//! }
//!
//! impl Tick for Clock {
//!     fn on_tick(&mut self) {
//!         self.frames += 1;
//!     }
//! }
//!
//! impl Component for Clock {
//!     fn capabilities(caps: Capabilities<Self>) -> Capabilities<Self> {
//!         caps.tick()
//!     }
//! }
//!
//! impl Controller for Clock {
//!     type Model = NoModel;
//!     type View = NoView;
//! }
//!
//! let fiber = Fiber::new(SceneGraph::default());
//! fiber.define(ControllerType::new::<Clock>());
//!
//! let root = CompositionRoot::new(&fiber, fiber.spawn("clock"));
//! root.construct::<Clock>().unwrap();
//!
//! fiber.tick();
//! assert_eq!(fiber.get_first::<Clock>().unwrap().borrow().frames, 1);
//!
//! root.reset().unwrap();
//! assert!(fiber.get_all::<Clock>().is_none());
//! ```

pub mod capability;
pub mod catalog;
pub mod component;
pub mod config;
pub mod container;
pub mod context;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod registry;
pub mod root;
pub mod scene;
pub mod view;

// Re-export main types
pub use capability::*;
pub use catalog::{nicify, Catalog, CatalogEntry};
pub use component::{Controller, Model, NoModel, NoView, Parts, View};
pub use config::{ConfigError, Configuration, FiberConfig};
pub use container::{InstanceContainer, Triad};
pub use context::{Fiber, WeakFiber};
pub use descriptor::{ControllerMetadata, ControllerType, ControllerTypeBuilder, PartInfo};
pub use dispatcher::{Batch, Dispatcher};
pub use error::{FiberError, PartSlot, Result};
pub use fiber_types::{Channel, Collider, Collider2d, Collision, Collision2d, Event, NodeId};
pub use handle::{shared, Handle, ObjectId, Shared};
pub use metrics::{ChannelMetrics, MetricsSnapshot};
pub use registry::TypeRegistry;
pub use root::{CompositionRoot, RootPhase, RootRef};
pub use scene::{Scene, SceneGraph};
pub use view::{ViewLink, ViewRef};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::capability::*;
    pub use crate::component::{Controller, Model, NoModel, NoView, Parts, View};
    pub use crate::config::Configuration;
    pub use crate::context::Fiber;
    pub use crate::descriptor::ControllerType;
    pub use crate::handle::Shared;
    pub use crate::root::CompositionRoot;
    pub use crate::scene::{Scene, SceneGraph};
    pub use crate::view::ViewRef;
    pub use fiber_types::{Channel, Event, NodeId};
}
