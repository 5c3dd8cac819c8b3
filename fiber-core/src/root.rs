//! Composition roots
//!
//! A [`CompositionRoot`] sits on one scene node and owns at most one
//! controller/model/view triad at a time. It drives the triad through
//!
//! ```text
//! Empty ──construct──▶ Constructing ──initialize──▶ Live
//!   ▲                                                 │
//!   └──────────────────────── reset ──────────────────┘
//! ```
//!
//! `reset` returns to `Empty` from any phase and is idempotent. Registration
//! with the context (and the cascading capability subscriptions) happens only
//! on entering `Live`; `reset` removes both, so no subscription outlives its
//! triad.

use crate::component::{Controller, Model, Parts, View};
use crate::config::Configuration;
use crate::container::Triad;
use crate::context::{Fiber, WeakFiber};
use crate::descriptor::{ControllerType, Part};
use crate::error::{FiberError, PartSlot, Result};
use crate::handle::{short_type_name, Handle, Shared};
use crate::view::{ViewLink, ViewRef};
use fiber_types::{Event, NodeId};
use serde::Serialize;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

/// Lifecycle phase of a composition root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RootPhase {
    Empty,
    /// Parts are built and wired but the triad is not registered yet
    Constructing,
    Live,
}

impl fmt::Display for RootPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootPhase::Empty => write!(f, "empty"),
            RootPhase::Constructing => write!(f, "constructing"),
            RootPhase::Live => write!(f, "live"),
        }
    }
}

pub(crate) struct RootState {
    node: NodeId,
    phase: RootPhase,
    descriptor: Option<Rc<ControllerType>>,
    controller: Option<Handle>,
    model: Option<Handle>,
    view: Option<Handle>,
    link: Option<Rc<ViewLink>>,
    configuration: Option<Configuration>,
    ready: bool,
}

impl RootState {
    fn new(node: NodeId) -> Self {
        Self {
            node,
            phase: RootPhase::Empty,
            descriptor: None,
            controller: None,
            model: None,
            view: None,
            link: None,
            configuration: None,
            ready: false,
        }
    }

    /// Clear every reference, returning the controller and view link
    fn clear(&mut self) -> (Option<Handle>, Option<Rc<ViewLink>>) {
        self.phase = RootPhase::Empty;
        self.descriptor = None;
        self.model = None;
        self.view = None;
        self.configuration = None;
        self.ready = false;
        (self.controller.take(), self.link.take())
    }
}

/// Owner of one controller/model/view triad, bound to a scene node
#[derive(Clone)]
pub struct CompositionRoot {
    state: Rc<RefCell<RootState>>,
    fiber: Fiber,
}

/// Non-owning reference to a composition root
///
/// Handed to controllers so they can reset or rebuild their own root from a
/// handler without creating a reference cycle.
#[derive(Clone, Default)]
pub struct RootRef {
    state: Weak<RefCell<RootState>>,
    fiber: WeakFiber,
}

impl RootRef {
    pub fn upgrade(&self) -> Option<CompositionRoot> {
        Some(CompositionRoot {
            state: self.state.upgrade()?,
            fiber: self.fiber.upgrade()?,
        })
    }

    /// Reset the root if it is still alive
    pub fn reset(&self) -> Result<()> {
        match self.upgrade() {
            Some(root) => root.reset(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for RootRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootRef")
            .field("alive", &(self.state.strong_count() > 0))
            .finish()
    }
}

impl CompositionRoot {
    /// Create an empty root on `node` and make it discoverable through
    /// [`Fiber::root_of`]
    pub fn new(fiber: &Fiber, node: NodeId) -> Self {
        let state = Rc::new(RefCell::new(RootState::new(node)));
        fiber.track_root(node, Rc::downgrade(&state));
        Self {
            state,
            fiber: fiber.clone(),
        }
    }

    pub(crate) fn from_parts(state: Rc<RefCell<RootState>>, fiber: Fiber) -> Self {
        Self { state, fiber }
    }

    /// Build a root around an already assembled triad (for example one
    /// restored from a saved scene). The root is left `Constructing` until
    /// [`attach`](Self::attach) runs the initialization hooks.
    pub fn assemble<C: Controller>(
        fiber: &Fiber,
        node: NodeId,
        controller: C,
        model: Option<C::Model>,
        view: Option<C::View>,
        configuration: Configuration,
    ) -> Self {
        let root = Self::new(fiber, node);
        let descriptor = fiber
            .controller_type(TypeId::of::<C>())
            .unwrap_or_else(|| Rc::new(ControllerType::builder::<C>().build()));

        {
            let mut state = root.state.borrow_mut();
            state.phase = RootPhase::Constructing;
            state.descriptor = Some(descriptor);
            state.controller = Some(Handle::new(controller));
            state.model = model.map(Handle::new);
            state.configuration = Some(configuration);
        }
        if let Some(view) = view {
            root.bind_view(Handle::new(view));
        }
        root
    }

    pub fn downgrade(&self) -> RootRef {
        RootRef {
            state: Rc::downgrade(&self.state),
            fiber: self.fiber.downgrade(),
        }
    }

    pub fn fiber(&self) -> &Fiber {
        &self.fiber
    }

    pub fn node(&self) -> NodeId {
        self.state.borrow().node
    }

    pub fn phase(&self) -> RootPhase {
        self.state.borrow().phase
    }

    pub fn is_live(&self) -> bool {
        self.phase() == RootPhase::Live
    }

    pub fn has_controller(&self) -> bool {
        self.state.borrow().controller.is_some()
    }

    pub fn has_model(&self) -> bool {
        self.state.borrow().model.is_some()
    }

    pub fn has_view(&self) -> bool {
        self.state.borrow().view.is_some()
    }

    pub fn configuration(&self) -> Option<Configuration> {
        self.state.borrow().configuration
    }

    pub fn controller_type(&self) -> Option<Rc<ControllerType>> {
        self.state.borrow().descriptor.clone()
    }

    pub fn controller_type_name(&self) -> Option<&'static str> {
        self.state
            .borrow()
            .controller
            .as_ref()
            .map(Handle::type_name)
    }

    pub fn controller_handle(&self) -> Option<Handle> {
        self.state.borrow().controller.clone()
    }

    pub fn model_handle(&self) -> Option<Handle> {
        self.state.borrow().model.clone()
    }

    pub fn view_handle(&self) -> Option<Handle> {
        self.state.borrow().view.clone()
    }

    pub fn view_link(&self) -> Option<Rc<ViewLink>> {
        self.state.borrow().link.clone()
    }

    /// The controller, if there is one and it is a `C`
    pub fn try_get_controller<C: Any>(&self) -> Option<Shared<C>> {
        self.state.borrow().controller.as_ref()?.downcast::<C>()
    }

    /// The model, if there is one and it is an `M`
    pub fn try_get_model<M: Any>(&self) -> Option<Shared<M>> {
        self.state.borrow().model.as_ref()?.downcast::<M>()
    }

    /// The view, if there is one and it is a `V`
    pub fn try_get_view<V: Any>(&self) -> Option<ViewRef<V>> {
        let state = self.state.borrow();
        let view = state.view.as_ref()?.downcast::<V>()?;
        let link = state.link.clone()?;
        Some(ViewRef::new(view, link, self.fiber.downgrade()))
    }

    /// JSON rendering of the live model, when its type allows it
    pub fn model_fields(&self) -> Option<serde_json::Value> {
        let state = self.state.borrow();
        let serialize = state.descriptor.as_ref()?.hooks.serialize_model?;
        let model = state.model.clone()?;
        drop(state);
        serialize(&model)
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Construct a triad for `C`, which must have been defined on the context
    pub fn construct<C: Controller>(&self) -> Result<()> {
        let ty = self
            .fiber
            .controller_type(TypeId::of::<C>())
            .ok_or(FiberError::Instantiation {
                type_name: short_type_name::<C>(),
            })?;
        self.construct_type(&ty)
    }

    /// Construct a triad for the controller type registered under `name`
    pub fn construct_named(&self, name: &str) -> Result<()> {
        let ty = self
            .fiber
            .find_type(name)
            .ok_or_else(|| FiberError::UnknownController(name.to_string()))?;
        self.construct_type(&ty)
    }

    /// Replace whatever this root holds with a fresh triad built from `ty`
    pub fn construct_type(&self, ty: &Rc<ControllerType>) -> Result<()> {
        self.reset()?;

        let controller = (ty.hooks.make_controller)(ty).ok_or(FiberError::Instantiation {
            type_name: ty.type_name(),
        })?;
        let model = self.resolve_part(ty, PartSlot::Model, (ty.hooks.make_model)(ty))?;
        let view = self.resolve_part(ty, PartSlot::View, (ty.hooks.make_view)(ty))?;

        let node = {
            let mut state = self.state.borrow_mut();
            state.phase = RootPhase::Constructing;
            state.descriptor = Some(ty.clone());
            state.controller = Some(controller);
            state.model = model;
            state.configuration = Some(ty.configuration());
            state.node
        };
        if let Some(view) = view {
            self.bind_view(view);
        }

        debug!(%node, controller = ty.type_name(), "constructed");
        self.initialize()
    }

    fn resolve_part(&self, ty: &ControllerType, slot: PartSlot, part: Part) -> Result<Option<Handle>> {
        match part {
            Part::Built(handle) => Ok(Some(handle)),
            Part::Undeclared => Ok(None),
            Part::Missing if self.fiber.config().strict_parts => Err(FiberError::MissingPart {
                type_name: ty.type_name(),
                slot,
            }),
            Part::Missing => {
                warn!(
                    controller = ty.type_name(),
                    %slot,
                    "no zero-argument constructor registered; slot left empty"
                );
                Ok(None)
            }
        }
    }

    /// Bind a view to this root's node. The root's own destroy observer is
    /// always the first one on the link; the node itself goes only after
    /// every observer has fired.
    fn bind_view(&self, view: Handle) {
        let node = self.node();
        let link = ViewLink::new(node);
        let root = self.downgrade();
        link.on_destroy(move || {
            if let Some(root) = root.upgrade() {
                root.on_view_destroyed();
            }
        });
        let fiber = self.fiber.downgrade();
        link.set_finalizer(move || {
            if let Some(fiber) = fiber.upgrade() {
                fiber.with_scene(|scene| scene.destroy(node));
                debug!(%node, "view node destroyed");
            }
        });

        {
            let mut state = self.state.borrow_mut();
            state.view = Some(view);
            state.link = Some(link);
        }
        self.apply_persistence();
    }

    fn apply_persistence(&self) {
        let (node, persistent) = {
            let state = self.state.borrow();
            let persistent = state.view.is_some()
                && state.configuration.is_some_and(|c| c.persists_across_scenes());
            (state.node, persistent)
        };
        if persistent {
            self.fiber.with_scene(|scene| scene.set_persistent(node, true));
        }
    }

    fn triad(&self) -> Option<Triad> {
        let state = self.state.borrow();
        let descriptor = state.descriptor.as_ref()?;
        let controller = state.controller.clone()?;

        let mut triad = Triad::with_teardown(controller, descriptor.hooks.teardown).at(state.node);
        if let Some(model) = &state.model {
            triad = triad.with_model(model.clone());
        }
        if let (Some(view), Some(link)) = (&state.view, &state.link) {
            triad = triad.with_view(view.clone(), link.clone());
        }
        Some(triad)
    }

    /// Run the initialization hooks, register, and go live
    fn initialize(&self) -> Result<()> {
        let Some(descriptor) = self.controller_type() else {
            return Ok(());
        };
        (descriptor.hooks.initialize)(self);

        // A hook may have reset the root
        let Some(triad) = self.triad() else {
            return Ok(());
        };
        self.fiber.register(&triad)?;
        self.state.borrow_mut().phase = RootPhase::Live;
        Ok(())
    }

    /// Host attach callback: initialize and register an assembled triad
    pub fn attach(&self) -> Result<()> {
        let pending = {
            let state = self.state.borrow();
            state.controller.is_some() && state.phase != RootPhase::Live
        };
        if pending {
            self.initialize()?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------

    /// Rebuild the model from the controller's declared type
    pub fn refresh_model(&self) -> Result<()> {
        self.refresh(PartSlot::Model)
    }

    /// Rebuild the view from the controller's declared type
    pub fn refresh_view(&self) -> Result<()> {
        self.refresh(PartSlot::View)
    }

    /// Restore the configuration to the controller type's default
    pub fn refresh_configuration(&self) -> Result<()> {
        self.refresh(PartSlot::Configuration)
    }

    fn refresh(&self, slot: PartSlot) -> Result<()> {
        let Some(descriptor) = self.controller_type() else {
            return Ok(());
        };

        match slot {
            PartSlot::Model => {
                let model =
                    self.resolve_part(&descriptor, slot, (descriptor.hooks.make_model)(&descriptor))?;
                let old = std::mem::replace(&mut self.state.borrow_mut().model, model);
                if let Some(old) = old {
                    self.fiber.purge(&old);
                }
            }
            PartSlot::View => {
                let view =
                    self.resolve_part(&descriptor, slot, (descriptor.hooks.make_view)(&descriptor))?;
                let (old, link) = {
                    let mut state = self.state.borrow_mut();
                    (state.view.take(), state.link.take())
                };
                if let Some(link) = link {
                    link.disconnect();
                }
                if let Some(old) = old {
                    self.fiber.purge(&old);
                }
                if let Some(view) = view {
                    self.bind_view(view);
                }
            }
            PartSlot::Configuration => {
                self.state.borrow_mut().configuration = Some(descriptor.configuration());
                self.apply_persistence();
            }
        }

        (descriptor.hooks.rewire)(self, slot);

        if let Some(triad) = self.triad() {
            self.fiber.refresh(&triad);
        }
        debug!(node = %self.node(), controller = descriptor.type_name(), %slot, "refreshed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Unregister the triad and clear every reference. Idempotent.
    ///
    /// The bound node is left alone; only the triad goes away.
    pub fn reset(&self) -> Result<()> {
        let (node, controller, link) = {
            let mut state = self.state.borrow_mut();
            if state.phase == RootPhase::Empty && state.controller.is_none() {
                return Ok(());
            }
            let (controller, link) = state.clear();
            (state.node, controller, link)
        };

        if let Some(link) = link {
            link.disconnect();
        }
        if let Some(controller) = &controller {
            self.fiber.unregister(controller)?;
        }
        debug!(%node, "reset");
        Ok(())
    }

    /// Host ready callback: runs `set_ready` once, then delivers `Start`
    /// to the node. Returns `false` if the root was not live or already
    /// ready.
    pub fn on_ready(&self) -> bool {
        let (node, controller, descriptor) = {
            let mut state = self.state.borrow_mut();
            if state.phase != RootPhase::Live || state.ready {
                return false;
            }
            let (Some(controller), Some(descriptor)) =
                (state.controller.clone(), state.descriptor.clone())
            else {
                return false;
            };
            state.ready = true;
            (state.node, controller, descriptor)
        };

        (descriptor.hooks.set_ready)(&controller);
        self.fiber.deliver(node, &Event::Start);
        true
    }

    /// Host detach callback.
    ///
    /// Delivers `Destroy` to the node, purges every subscription of the
    /// triad and fires the view's destroy signal. The root's observer
    /// unregisters the controller, the remaining observers run against a
    /// live node, and the node is destroyed last. Without a view the
    /// controller is unregistered directly.
    pub fn detach(&self) -> Result<()> {
        let node = self.node();
        self.fiber.deliver(node, &Event::Destroy);

        let (members, link) = {
            let state = self.state.borrow();
            let members: Vec<Handle> = [&state.controller, &state.model, &state.view]
                .into_iter()
                .flatten()
                .cloned()
                .collect();
            (members, state.link.clone())
        };
        for member in &members {
            self.fiber.purge(member);
        }

        match link {
            Some(link) => {
                link.destroy();
            }
            None => self.reset()?,
        }

        self.fiber.forget_root(node);
        debug!(%node, "detached");
        Ok(())
    }

    /// First destroy observer of the bound view. The node is left to the
    /// link's finalizer.
    fn on_view_destroyed(&self) {
        let (node, controller) = {
            let mut state = self.state.borrow_mut();
            let (controller, _) = state.clear();
            (state.node, controller)
        };

        if let Some(controller) = &controller {
            if let Err(err) = self.fiber.unregister(controller) {
                warn!(%node, error = %err, "failed to unregister after view destroy");
            }
        }
        debug!(%node, "view destroyed");
    }

    /// Run a rewire that was deferred while the controller was busy.
    /// Returns `false` if it had to be deferred again.
    pub(crate) fn rewire_controller(&self, slot: PartSlot) -> bool {
        match self.controller_type() {
            Some(descriptor) => (descriptor.hooks.rewire_controller)(self, slot),
            None => true,
        }
    }

    /// Drop every reference without touching the registry or dispatcher
    pub(crate) fn forget(&self) {
        let (_, link) = self.state.borrow_mut().clear();
        if let Some(link) = link {
            link.disconnect();
        }
    }

    /// Typed controller and parts, built from the current state
    fn parts<C: Controller>(&self) -> Option<(Shared<C>, Parts<C>)> {
        let state = self.state.borrow();
        let controller = state.controller.as_ref()?.downcast::<C>()?;
        let model = state.model.as_ref().and_then(|m| m.downcast::<C::Model>());
        let view = match (&state.view, &state.link) {
            (Some(view), Some(link)) => view
                .downcast::<C::View>()
                .map(|view| ViewRef::new(view, link.clone(), self.fiber.downgrade())),
            _ => None,
        };
        let configuration = state.configuration.unwrap_or_default();
        drop(state);

        Some((
            controller,
            Parts {
                model,
                view,
                configuration,
                root: self.downgrade(),
            },
        ))
    }
}

impl fmt::Debug for CompositionRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("CompositionRoot")
            .field("node", &state.node)
            .field("phase", &state.phase)
            .field("controller", &state.controller)
            .field("model", &state.model)
            .field("view", &state.view)
            .finish()
    }
}

/// View hook, then model hook, then `Controller::initialize`
pub(crate) fn initialize_parts<C: Controller>(root: &CompositionRoot) {
    let Some((controller, parts)) = root.parts::<C>() else {
        return;
    };
    if let Some(view) = &parts.view {
        view.borrow_mut().on_initialized();
    }
    if let Some(model) = &parts.model {
        model.borrow_mut().on_initialize();
    }
    match controller.try_borrow_mut() {
        Ok(mut controller) => controller.initialize(parts),
        Err(_) => warn!(
            controller = short_type_name::<C>(),
            "controller busy; initialize skipped"
        ),
    };
}

/// Hook of the rebuilt part, then `Controller::rewire`
pub(crate) fn rewire_parts<C: Controller>(root: &CompositionRoot, slot: PartSlot) {
    let Some((_, parts)) = root.parts::<C>() else {
        return;
    };
    match slot {
        PartSlot::Model => {
            if let Some(model) = &parts.model {
                model.borrow_mut().on_initialize();
            }
        }
        PartSlot::View => {
            if let Some(view) = &parts.view {
                view.borrow_mut().on_initialized();
            }
        }
        PartSlot::Configuration => {}
    }
    rewire_controller::<C>(root, slot);
}

/// `Controller::rewire` with the root's current parts.
///
/// A controller refreshing its own root from a handler is still borrowed;
/// the rewire is queued on the context and runs once the handler returns.
pub(crate) fn rewire_controller<C: Controller>(root: &CompositionRoot, slot: PartSlot) -> bool {
    let Some((controller, parts)) = root.parts::<C>() else {
        return true;
    };
    let Ok(mut borrowed) = controller.try_borrow_mut() else {
        debug!(
            controller = short_type_name::<C>(),
            %slot,
            "controller busy; rewire deferred"
        );
        if let Some(handle) = root.controller_handle() {
            root.fiber.defer_rewire(root.downgrade(), handle.id(), slot);
        }
        return false;
    };
    borrowed.rewire(parts);
    true
}
