//! The process-scoped fiber context
//!
//! [`Fiber`] owns the type registry, the capability dispatcher, the catalog
//! of controller types and the host scene. There is exactly one per host
//! process; it is cheap to clone and is passed explicitly to every
//! composition root.
//!
//! No `RefCell` borrow of the registry or dispatcher is held while a handler
//! runs, so handlers may construct, reset or detach roots mid-pump. A handler
//! that refreshes its own root cannot be rewired while it runs; the rewire is
//! queued and applied as soon as the handler returns.

use crate::catalog::Catalog;
use crate::config::FiberConfig;
use crate::container::Triad;
use crate::descriptor::ControllerType;
use crate::dispatcher::{Batch, Dispatcher};
use crate::error::{PartSlot, Result};
use crate::handle::{Handle, ObjectId, Shared};
use crate::metrics::MetricsSnapshot;
use crate::registry::TypeRegistry;
use crate::root::{CompositionRoot, RootRef, RootState};
use crate::scene::Scene;
use fiber_types::{Channel, Event, NodeId};
use hashbrown::HashMap;
use std::any::{Any, TypeId};
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, info};

struct FiberState {
    initialized: Cell<bool>,
    config: FiberConfig,
    registry: RefCell<TypeRegistry>,
    dispatcher: RefCell<Dispatcher>,
    catalog: RefCell<Catalog>,
    scene: RefCell<Box<dyn Scene>>,
    roots: RefCell<HashMap<NodeId, Weak<RefCell<RootState>>>>,
    pending: RefCell<Vec<PendingRewire>>,
}

/// A rewire that found its controller mid-handler
struct PendingRewire {
    root: RootRef,
    controller: ObjectId,
    slot: PartSlot,
}

/// Shared handle to the fiber context
#[derive(Clone)]
pub struct Fiber {
    inner: Rc<FiberState>,
}

/// Non-owning handle to the fiber context
#[derive(Clone, Default)]
pub struct WeakFiber {
    inner: Weak<FiberState>,
}

impl WeakFiber {
    pub fn upgrade(&self) -> Option<Fiber> {
        self.inner.upgrade().map(|inner| Fiber { inner })
    }
}

impl fmt::Debug for WeakFiber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakFiber")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl Fiber {
    pub fn new(scene: impl Scene + 'static) -> Self {
        Self::with_config(scene, FiberConfig::default())
    }

    pub fn with_config(scene: impl Scene + 'static, config: FiberConfig) -> Self {
        Self {
            inner: Rc::new(FiberState {
                initialized: Cell::new(false),
                config,
                registry: RefCell::new(TypeRegistry::new()),
                dispatcher: RefCell::new(Dispatcher::new()),
                catalog: RefCell::new(Catalog::new()),
                scene: RefCell::new(Box::new(scene)),
                roots: RefCell::new(HashMap::new()),
                pending: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakFiber {
        WeakFiber {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn config(&self) -> &FiberConfig {
        &self.inner.config
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Host "before first use" hook. Returns `false` if already initialized.
    pub fn init(&self) -> bool {
        if self.inner.initialized.replace(true) {
            return false;
        }
        debug!("fiber initialized");
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.get()
    }

    /// Host "process quitting" hook.
    ///
    /// Forgets every composition root, runs each registered controller's
    /// `destroy` hook and drops all subscriptions. View destroy signals do
    /// not fire and scene nodes are left to the host. Calling `init`
    /// afterwards starts from a clean state.
    pub fn shutdown(&self) {
        if !self.inner.initialized.replace(false) {
            return;
        }

        let roots: Vec<_> = self.inner.roots.borrow_mut().drain().collect();
        for (_, state) in roots {
            if let Some(state) = state.upgrade() {
                CompositionRoot::from_parts(state, self.clone()).forget();
            }
        }
        self.inner.pending.borrow_mut().clear();

        let containers = self.inner.registry.borrow_mut().take_all();
        self.inner.dispatcher.borrow_mut().clear();

        let count: usize = containers.iter().map(|c| c.len()).sum();
        for mut container in containers {
            container.dispose_all();
        }

        self.inner.dispatcher.borrow_mut().clear();
        info!(disposed = count, "fiber shut down");
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    /// Make a controller type constructible by type and by name
    pub fn define(&self, ty: ControllerType) -> Rc<ControllerType> {
        debug!(controller = ty.type_name(), "defined controller type");
        self.inner.catalog.borrow_mut().register(ty)
    }

    pub fn controller_type(&self, type_id: TypeId) -> Option<Rc<ControllerType>> {
        self.inner.catalog.borrow().get(type_id)
    }

    pub fn find_type(&self, name: &str) -> Option<Rc<ControllerType>> {
        self.inner.catalog.borrow().find(name)
    }

    pub fn catalog(&self) -> Ref<'_, Catalog> {
        self.inner.catalog.borrow()
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a triad and subscribe its controller, model and view.
    /// No-op (returns `false`) if the controller is already registered.
    pub fn register(&self, triad: &Triad) -> Result<bool> {
        self.init();
        let added = self.inner.registry.borrow_mut().register(triad)?;
        if added {
            let mut dispatcher = self.inner.dispatcher.borrow_mut();
            for member in triad.members() {
                dispatcher.store(member, triad.node());
            }
            debug!(
                controller = triad.controller.type_name(),
                object = %triad.id(),
                node = ?triad.node(),
                "registered"
            );
        }
        Ok(added)
    }

    /// Unregister a controller and purge its triad from every channel.
    /// No-op (returns `None`) if it is not registered.
    pub fn unregister(&self, controller: &Handle) -> Result<Option<Triad>> {
        let removed = self.inner.registry.borrow_mut().unregister(controller)?;
        if let Some(triad) = &removed {
            let mut dispatcher = self.inner.dispatcher.borrow_mut();
            for member in triad.members() {
                dispatcher.purge(member);
            }
            debug!(
                controller = controller.type_name(),
                object = %controller.id(),
                "unregistered"
            );
        }
        Ok(removed)
    }

    /// Replace a registered triad after one of its parts was rebuilt and
    /// subscribe the new part. Returns `false` if the controller is not
    /// registered.
    pub(crate) fn refresh(&self, triad: &Triad) -> bool {
        if self.inner.registry.borrow_mut().refresh(triad).is_none() {
            return false;
        }
        let mut dispatcher = self.inner.dispatcher.borrow_mut();
        for member in triad.members() {
            dispatcher.store(member, triad.node());
        }
        true
    }

    pub(crate) fn purge(&self, handle: &Handle) {
        self.inner.dispatcher.borrow_mut().purge(handle);
    }

    pub(crate) fn defer_rewire(&self, root: RootRef, controller: ObjectId, slot: PartSlot) {
        let mut pending = self.inner.pending.borrow_mut();
        if !pending
            .iter()
            .any(|p| p.controller == controller && p.slot == slot)
        {
            pending.push(PendingRewire {
                root,
                controller,
                slot,
            });
        }
    }

    /// Apply rewires deferred while their controller was mid-handler.
    ///
    /// Entries whose root has since been reset or rebuilt are dropped; a
    /// controller that is still busy stays queued. Returns the number of
    /// rewires that ran.
    pub fn settle(&self) -> usize {
        let pending = std::mem::take(&mut *self.inner.pending.borrow_mut());
        let mut ran = 0;
        for entry in pending {
            let Some(root) = entry.root.upgrade() else {
                continue;
            };
            if root.controller_handle().map(|h| h.id()) != Some(entry.controller) {
                continue;
            }
            if root.rewire_controller(entry.slot) {
                ran += 1;
            }
        }
        ran
    }

    pub fn pending_rewires(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    pub fn is_registered(&self, controller: &Handle) -> bool {
        self.inner.registry.borrow().contains(controller)
    }

    pub fn registry(&self) -> Ref<'_, TypeRegistry> {
        self.inner.registry.borrow()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// First live controller of exactly type `T`
    pub fn get_first<T: Any>(&self) -> Option<Shared<T>> {
        self.inner.registry.borrow().first::<T>()
    }

    /// Last live controller of exactly type `T`
    pub fn get_last<T: Any>(&self) -> Option<Shared<T>> {
        self.inner.registry.borrow().last::<T>()
    }

    /// Every live controller of exactly type `T`, in registration order
    pub fn get_all<T: Any>(&self) -> Option<Vec<Shared<T>>> {
        self.inner.registry.borrow().all::<T>()
    }

    pub fn count<T: Any>(&self) -> usize {
        self.inner.registry.borrow().count::<T>()
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Deliver an event to every subscriber of its channel
    pub fn pump(&self, event: &Event) -> usize {
        let batch = self.inner.dispatcher.borrow().batch(event.channel(), None);
        self.run(&batch, event)
    }

    /// Deliver an event to the subscribers bound to one node
    pub fn deliver(&self, node: NodeId, event: &Event) -> usize {
        let batch = self
            .inner
            .dispatcher
            .borrow()
            .batch(event.channel(), Some(node));
        self.run(&batch, event)
    }

    fn run(&self, batch: &Batch, event: &Event) -> usize {
        batch.run_then(event, self.inner.config.warn_on_busy, || {
            if !self.inner.pending.borrow().is_empty() {
                self.settle();
            }
        })
    }

    pub fn tick(&self) -> usize {
        self.pump(&Event::Tick)
    }

    pub fn fixed_tick(&self) -> usize {
        self.pump(&Event::FixedTick)
    }

    pub fn late_tick(&self) -> usize {
        self.pump(&Event::LateTick)
    }

    pub fn is_subscribed(&self, handle: &Handle, channel: Channel) -> bool {
        self.inner.dispatcher.borrow().is_subscribed(handle, channel)
    }

    /// Whether the object is subscribed to any channel
    pub fn is_stored(&self, handle: &Handle) -> bool {
        self.inner.dispatcher.borrow().contains(handle.id())
    }

    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.inner.dispatcher.borrow().subscriber_count(channel)
    }

    pub fn metrics(&self) -> Vec<MetricsSnapshot> {
        self.inner.dispatcher.borrow().metrics()
    }

    // ------------------------------------------------------------------
    // Scene and roots
    // ------------------------------------------------------------------

    /// Run `f` against the host scene
    pub fn with_scene<R>(&self, f: impl FnOnce(&mut dyn Scene) -> R) -> R {
        let mut scene = self.inner.scene.borrow_mut();
        f(&mut **scene)
    }

    pub fn spawn(&self, name: &str) -> NodeId {
        self.with_scene(|scene| scene.spawn(name))
    }

    /// The composition root on `node`, if there is one
    pub fn root_of(&self, node: NodeId) -> Option<CompositionRoot> {
        let state = self.inner.roots.borrow().get(&node)?.upgrade()?;
        Some(CompositionRoot::from_parts(state, self.clone()))
    }

    /// Every live composition root, by node
    pub fn roots(&self) -> Vec<CompositionRoot> {
        let mut roots: Vec<_> = self
            .inner
            .roots
            .borrow()
            .iter()
            .filter_map(|(node, state)| state.upgrade().map(|s| (*node, s)))
            .collect();
        roots.sort_by_key(|(node, _)| *node);
        roots
            .into_iter()
            .map(|(_, state)| CompositionRoot::from_parts(state, self.clone()))
            .collect()
    }

    pub(crate) fn track_root(&self, node: NodeId, state: Weak<RefCell<RootState>>) {
        let mut roots = self.inner.roots.borrow_mut();
        roots.retain(|_, state| state.strong_count() > 0);
        roots.insert(node, state);
    }

    pub(crate) fn forget_root(&self, node: NodeId) {
        self.inner.roots.borrow_mut().remove(&node);
    }
}

impl fmt::Debug for Fiber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber")
            .field("initialized", &self.is_initialized())
            .field("registry", &self.inner.registry)
            .field("dispatcher", &self.inner.dispatcher)
            .finish()
    }
}
