//! View binding: the link between a view and its scene node
//!
//! A [`ViewLink`] records the node a view is bound to and carries its
//! single-shot destroy channel. Observers fire once, in subscription order,
//! and the finalizer (if any) runs after the last of them.

use crate::context::WeakFiber;
use crate::handle::Shared;
use fiber_types::NodeId;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

type Observer = Box<dyn FnOnce()>;

/// A view's node binding and destroy channel
pub struct ViewLink {
    node: NodeId,
    observers: RefCell<Vec<Observer>>,
    finalizer: RefCell<Option<Observer>>,
    destroyed: Cell<bool>,
}

impl ViewLink {
    pub fn new(node: NodeId) -> Rc<Self> {
        Rc::new(Self {
            node,
            observers: RefCell::new(Vec::new()),
            finalizer: RefCell::new(None),
            destroyed: Cell::new(false),
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Subscribe to the destroy signal. Ignored once the link has fired.
    pub fn on_destroy(&self, observer: impl FnOnce() + 'static) {
        if !self.destroyed.get() {
            self.observers.borrow_mut().push(Box::new(observer));
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Action run once every observer has fired. Replaces any previous one.
    pub(crate) fn set_finalizer(&self, finalizer: impl FnOnce() + 'static) {
        if !self.destroyed.get() {
            *self.finalizer.borrow_mut() = Some(Box::new(finalizer));
        }
    }

    /// Fire the destroy signal. Returns `false` if it already fired.
    pub fn destroy(&self) -> bool {
        if self.destroyed.replace(true) {
            return false;
        }
        let observers = std::mem::take(&mut *self.observers.borrow_mut());
        for observer in observers {
            observer();
        }
        let finalizer = self.finalizer.borrow_mut().take();
        if let Some(finalizer) = finalizer {
            finalizer();
        }
        true
    }

    /// Drop every observer and the finalizer without firing
    pub(crate) fn disconnect(&self) {
        self.observers.borrow_mut().clear();
        self.finalizer.borrow_mut().take();
    }
}

impl fmt::Debug for ViewLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewLink")
            .field("node", &self.node)
            .field("observers", &self.observer_count())
            .field("destroyed", &self.destroyed.get())
            .finish()
    }
}

/// Typed access to a bound view
///
/// Handed to controllers in [`crate::Parts`]. Holds the view state, its link,
/// and a weak reference to the context for scene operations.
pub struct ViewRef<V> {
    view: Shared<V>,
    link: Rc<ViewLink>,
    fiber: WeakFiber,
}

impl<V> ViewRef<V> {
    pub(crate) fn new(view: Shared<V>, link: Rc<ViewLink>, fiber: WeakFiber) -> Self {
        Self { view, link, fiber }
    }

    pub fn borrow(&self) -> Ref<'_, V> {
        self.view.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, V> {
        self.view.borrow_mut()
    }

    pub fn shared(&self) -> &Shared<V> {
        &self.view
    }

    /// Scene node this view is bound to
    pub fn node(&self) -> NodeId {
        self.link.node()
    }

    pub fn link(&self) -> &Rc<ViewLink> {
        &self.link
    }

    pub fn on_destroy(&self, observer: impl FnOnce() + 'static) {
        self.link.on_destroy(observer);
    }

    /// Fire the view's destroy signal
    pub fn destroy(&self) -> bool {
        self.link.destroy()
    }

    /// Keep the bound node alive across scene loads
    pub fn keep_across_scenes(&self) {
        if let Some(fiber) = self.fiber.upgrade() {
            fiber.with_scene(|scene| scene.set_persistent(self.node(), true));
        }
    }

    /// Hand the bound node back to the active scene
    pub fn release_to_active_scene(&self) {
        if let Some(fiber) = self.fiber.upgrade() {
            fiber.with_scene(|scene| scene.move_to_active_scene(self.node()));
        }
    }
}

impl<V> Clone for ViewRef<V> {
    fn clone(&self) -> Self {
        Self {
            view: self.view.clone(),
            link: self.link.clone(),
            fiber: self.fiber.clone(),
        }
    }
}

impl<V> fmt::Debug for ViewRef<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewRef").field("link", &self.link).finish()
    }
}
