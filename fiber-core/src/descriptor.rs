//! Controller type descriptors
//!
//! A [`ControllerType`] bundles everything needed to build a triad for one
//! controller type at runtime: zero-argument factories for the controller,
//! its model and its view, the default [`Configuration`], tooling metadata,
//! and the typed hooks the composition root calls through erased handles.
//!
//! # Example
//!
//! ```
//! use fiber_core::{Component, Controller, ControllerType, Model, NoView};
//!
//! #[derive(Default)]
//! struct Score(u32);
//! impl Component for Score {}
//! impl Model for Score {}
//!
//! #[derive(Default)]
//! struct Scoreboard;
//! impl Component for Scoreboard {}
//! impl Controller for Scoreboard {
//!     type Model = Score;
//!     type View = NoView;
//! }
//!
//! let ty = ControllerType::builder::<Scoreboard>()
//!     .constructor(Scoreboard::default)
//!     .model(Score::default)
//!     .description("Keeps the score")
//!     .build();
//!
//! assert_eq!(ty.display_name(), "Scoreboard");
//! assert!(ty.has_constructor());
//! assert!(ty.model().declared);
//! assert!(!ty.view().declared);
//! ```

use crate::capability::{CapabilityTable, Component};
use crate::catalog::nicify;
use crate::component::{declares_model, declares_view, Controller};
use crate::config::Configuration;
use crate::container;
use crate::error::PartSlot;
use crate::handle::{short_type_name, Handle};
use crate::root::{self, CompositionRoot};
use fiber_types::Channel;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::fmt;

/// Tooling metadata: display name override, description, visibility
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControllerMetadata {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub hidden: bool,
}

/// What a controller declares for one of its sub-object slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartInfo {
    pub type_name: &'static str,
    /// `false` for the `NoModel` / `NoView` variants
    pub declared: bool,
    /// Whether a zero-argument factory was registered
    pub constructible: bool,
    pub channels: Vec<Channel>,
}

impl PartInfo {
    fn of<T: Component>(declared: bool, constructible: bool) -> Self {
        Self {
            type_name: short_type_name::<T>(),
            declared,
            constructible,
            channels: CapabilityTable::of::<T>().channels().collect(),
        }
    }
}

/// Outcome of building one sub-object
pub(crate) enum Part {
    /// The controller declares no such slot
    Undeclared,
    /// Declared, but no factory was registered
    Missing,
    Built(Handle),
}

struct Factories<C: Controller> {
    controller: Option<Box<dyn Fn() -> C>>,
    model: Option<Box<dyn Fn() -> C::Model>>,
    view: Option<Box<dyn Fn() -> C::View>>,
}

/// Typed operations, instantiated per controller type
pub(crate) struct Hooks {
    pub make_controller: fn(&ControllerType) -> Option<Handle>,
    pub make_model: fn(&ControllerType) -> Part,
    pub make_view: fn(&ControllerType) -> Part,
    pub initialize: fn(&CompositionRoot),
    pub rewire: fn(&CompositionRoot, PartSlot),
    pub rewire_controller: fn(&CompositionRoot, PartSlot) -> bool,
    pub set_ready: fn(&Handle),
    pub teardown: fn(&Handle),
    pub serialize_model: Option<fn(&Handle) -> Option<serde_json::Value>>,
}

/// Runtime descriptor for one controller type
pub struct ControllerType {
    type_id: TypeId,
    type_name: &'static str,
    metadata: ControllerMetadata,
    channels: Vec<Channel>,
    model: PartInfo,
    view: PartInfo,
    configuration: Configuration,
    constructible: bool,
    factories: Box<dyn Any>,
    pub(crate) hooks: Hooks,
}

impl ControllerType {
    pub fn builder<C: Controller>() -> ControllerTypeBuilder<C> {
        ControllerTypeBuilder::new()
    }

    /// Descriptor whose controller, model and view are built with `Default`
    pub fn new<C>() -> Self
    where
        C: Controller + Default,
        C::Model: Default,
        C::View: Default,
    {
        Self::builder::<C>()
            .constructor(C::default)
            .model(C::Model::default)
            .view(C::View::default)
            .build()
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Override from metadata, or the nicified type name
    pub fn display_name(&self) -> String {
        match &self.metadata.display_name {
            Some(name) => name.clone(),
            None => nicify(self.type_name),
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.metadata.description.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.metadata.hidden
    }

    pub fn metadata(&self) -> &ControllerMetadata {
        &self.metadata
    }

    /// Channels the controller itself subscribes to
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn model(&self) -> &PartInfo {
        &self.model
    }

    pub fn view(&self) -> &PartInfo {
        &self.view
    }

    /// Default configuration for freshly built triads
    pub fn configuration(&self) -> Configuration {
        self.configuration
    }

    pub fn has_constructor(&self) -> bool {
        self.constructible
    }

    /// Whether a live model of this type can be rendered as JSON
    pub fn can_serialize_model(&self) -> bool {
        self.hooks.serialize_model.is_some()
    }

    fn factories<C: Controller>(&self) -> Option<&Factories<C>> {
        self.factories.downcast_ref::<Factories<C>>()
    }
}

impl fmt::Debug for ControllerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerType")
            .field("type_name", &self.type_name)
            .field("metadata", &self.metadata)
            .field("model", &self.model.type_name)
            .field("view", &self.view.type_name)
            .field("configuration", &self.configuration)
            .finish()
    }
}

/// Builder for [`ControllerType`]
pub struct ControllerTypeBuilder<C: Controller> {
    factories: Factories<C>,
    metadata: ControllerMetadata,
    configuration: Configuration,
    serialize_model: Option<fn(&Handle) -> Option<serde_json::Value>>,
}

impl<C: Controller> ControllerTypeBuilder<C> {
    fn new() -> Self {
        Self {
            factories: Factories {
                controller: None,
                model: None,
                view: None,
            },
            metadata: ControllerMetadata::default(),
            configuration: Configuration::default(),
            serialize_model: None,
        }
    }

    /// Zero-argument constructor for the controller
    pub fn constructor(mut self, make: impl Fn() -> C + 'static) -> Self {
        self.factories.controller = Some(Box::new(make));
        self
    }

    /// Zero-argument constructor for the declared model
    pub fn model(mut self, make: impl Fn() -> C::Model + 'static) -> Self {
        self.factories.model = Some(Box::new(make));
        self
    }

    /// Zero-argument constructor for the declared view
    pub fn view(mut self, make: impl Fn() -> C::View + 'static) -> Self {
        self.factories.view = Some(Box::new(make));
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.display_name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    /// Keep the type out of tooling listings
    pub fn hidden(mut self) -> Self {
        self.metadata.hidden = true;
        self
    }

    pub fn configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = configuration;
        self
    }

    /// Allow tooling to render a live model as JSON
    pub fn serialize_model(mut self) -> Self
    where
        C::Model: Serialize,
    {
        self.serialize_model = Some(model_json::<C>);
        self
    }

    pub fn build(self) -> ControllerType {
        let model_declared = declares_model::<C>();
        let view_declared = declares_view::<C>();

        ControllerType {
            type_id: TypeId::of::<C>(),
            type_name: short_type_name::<C>(),
            metadata: self.metadata,
            channels: CapabilityTable::of::<C>().channels().collect(),
            model: PartInfo::of::<C::Model>(model_declared, self.factories.model.is_some()),
            view: PartInfo::of::<C::View>(view_declared, self.factories.view.is_some()),
            configuration: self.configuration,
            constructible: self.factories.controller.is_some(),
            factories: Box::new(self.factories),
            hooks: Hooks {
                make_controller: make_controller::<C>,
                make_model: make_model::<C>,
                make_view: make_view::<C>,
                initialize: root::initialize_parts::<C>,
                rewire: root::rewire_parts::<C>,
                rewire_controller: root::rewire_controller::<C>,
                set_ready: set_ready::<C>,
                teardown: container::teardown::<C>,
                serialize_model: self.serialize_model,
            },
        }
    }
}

fn make_controller<C: Controller>(ty: &ControllerType) -> Option<Handle> {
    let make = ty.factories::<C>()?.controller.as_ref()?;
    Some(Handle::new(make()))
}

fn make_model<C: Controller>(ty: &ControllerType) -> Part {
    if !declares_model::<C>() {
        return Part::Undeclared;
    }
    match ty.factories::<C>().and_then(|f| f.model.as_ref()) {
        Some(make) => Part::Built(Handle::new(make())),
        None => Part::Missing,
    }
}

fn make_view<C: Controller>(ty: &ControllerType) -> Part {
    if !declares_view::<C>() {
        return Part::Undeclared;
    }
    match ty.factories::<C>().and_then(|f| f.view.as_ref()) {
        Some(make) => Part::Built(Handle::new(make())),
        None => Part::Missing,
    }
}

fn set_ready<C: Controller>(handle: &Handle) {
    if let Some(controller) = handle.downcast::<C>() {
        match controller.try_borrow_mut() {
            Ok(mut controller) => controller.set_ready(),
            Err(_) => tracing::warn!(
                controller = handle.type_name(),
                "controller busy; set_ready skipped"
            ),
        }
    }
}

fn model_json<C: Controller>(handle: &Handle) -> Option<serde_json::Value>
where
    C::Model: Serialize,
{
    let model = handle.downcast::<C::Model>()?;
    let model = model.try_borrow().ok()?;
    serde_json::to_value(&*model).ok()
}
