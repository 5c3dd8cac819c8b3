//! Triad roles: controller, model and view

use crate::capability::Component;
use crate::config::Configuration;
use crate::handle::Shared;
use crate::root::RootRef;
use crate::view::ViewRef;
use std::any::TypeId;

/// Plain data owned by a controller
pub trait Model: Component {
    /// Runs once, before the controller is initialized
    fn on_initialize(&mut self) {}
}

/// Presentation surface bound to one scene node
pub trait View: Component {
    /// Runs once the view is bound to its node
    fn on_initialized(&mut self) {}
}

/// Behaviour of a triad, and the registry's unit of identity
///
/// `Model` and `View` name the declared sub-object types; use [`NoModel`] or
/// [`NoView`] for controllers without one.
pub trait Controller: Component {
    type Model: Model;
    type View: View;

    /// Receives the freshly built parts once, before registration
    fn initialize(&mut self, parts: Parts<Self>) {
        let _ = parts;
    }

    /// Receives the current parts after a model, view or configuration refresh
    fn rewire(&mut self, parts: Parts<Self>) {
        let _ = parts;
    }

    /// Runs once, on the first ready tick after the triad went live
    fn set_ready(&mut self) {}

    /// Teardown used when the context shuts down
    fn destroy(&mut self) {}
}

/// Marker for controllers without a model. Never instantiated.
#[derive(Debug, Default)]
pub struct NoModel;

impl Component for NoModel {}
impl Model for NoModel {}

/// Marker for controllers without a view. Never instantiated.
#[derive(Debug, Default)]
pub struct NoView;

impl Component for NoView {}
impl View for NoView {}

/// The sub-objects handed to a controller
pub struct Parts<C: Controller> {
    pub model: Option<Shared<C::Model>>,
    pub view: Option<ViewRef<C::View>>,
    pub configuration: Configuration,
    /// The composition root that owns this triad
    pub root: RootRef,
}

impl<C: Controller> Parts<C> {
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn has_view(&self) -> bool {
        self.view.is_some()
    }
}

pub(crate) fn declares_model<C: Controller>() -> bool {
    TypeId::of::<C::Model>() != TypeId::of::<NoModel>()
}

pub(crate) fn declares_view<C: Controller>() -> bool {
    TypeId::of::<C::View>() != TypeId::of::<NoView>()
}
