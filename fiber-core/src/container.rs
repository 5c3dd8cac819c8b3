//! Ordered, duplicate-free storage of controller instances of one type

use crate::component::Controller;
use crate::error::{FiberError, Result};
use crate::handle::{Handle, ObjectId};
use crate::view::ViewLink;
use fiber_types::NodeId;
use std::rc::Rc;

/// A registered controller together with its model and view
#[derive(Clone)]
pub struct Triad {
    pub controller: Handle,
    pub model: Option<Handle>,
    pub view: Option<Handle>,
    pub link: Option<Rc<ViewLink>>,
    node: Option<NodeId>,
    teardown: fn(&Handle),
}

impl Triad {
    /// A triad whose teardown runs `C::destroy`
    pub fn of<C: Controller>(controller: Handle) -> Self {
        Self {
            controller,
            model: None,
            view: None,
            link: None,
            node: None,
            teardown: teardown::<C>,
        }
    }

    pub(crate) fn with_teardown(controller: Handle, teardown: fn(&Handle)) -> Self {
        Self {
            controller,
            model: None,
            view: None,
            link: None,
            node: None,
            teardown,
        }
    }

    pub fn with_model(mut self, model: Handle) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_view(mut self, view: Handle, link: Rc<ViewLink>) -> Self {
        self.view = Some(view);
        self.link = Some(link);
        self
    }

    /// Bind the triad to a node; node-scoped events reach its members
    pub fn at(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    pub fn id(&self) -> ObjectId {
        self.controller.id()
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Controller, model and view, in that order
    pub fn members(&self) -> impl Iterator<Item = &Handle> {
        std::iter::once(&self.controller)
            .chain(self.model.as_ref())
            .chain(self.view.as_ref())
    }

    /// Run the controller's teardown. The view's destroy signal is not
    /// fired; shutdown leaves scene nodes to the host.
    pub fn dispose(&self) {
        (self.teardown)(&self.controller);
    }
}

impl std::fmt::Debug for Triad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Triad")
            .field("controller", &self.controller)
            .field("model", &self.model)
            .field("view", &self.view)
            .field("node", &self.node())
            .finish()
    }
}

pub(crate) fn teardown<C: Controller>(handle: &Handle) {
    if let Some(controller) = handle.downcast::<C>() {
        match controller.try_borrow_mut() {
            Ok(mut controller) => controller.destroy(),
            Err(_) => tracing::warn!(
                controller = handle.type_name(),
                "controller busy during teardown; destroy hook skipped"
            ),
        }
    }
}

/// Container of live controller instances of one concrete type
#[derive(Debug)]
pub struct InstanceContainer {
    type_name: &'static str,
    members: Vec<Triad>,
}

impl InstanceContainer {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            members: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Append a triad. Fails if its controller is already a member.
    pub fn add(&mut self, triad: Triad) -> Result<()> {
        if self.contains(triad.id()) {
            return Err(FiberError::DuplicateMember {
                type_name: self.type_name,
                object: triad.id(),
            });
        }
        self.members.push(triad);
        Ok(())
    }

    /// Remove the triad whose controller is `id`, keeping the order of the rest
    pub fn remove(&mut self, id: ObjectId) -> Result<Triad> {
        let index = self
            .members
            .iter()
            .position(|triad| triad.id() == id)
            .ok_or(FiberError::MissingMember {
                type_name: self.type_name,
                object: id,
            })?;
        Ok(self.members.remove(index))
    }

    /// Swap in an updated triad for the same controller, in place
    pub fn replace(&mut self, triad: Triad) -> bool {
        match self.members.iter_mut().find(|m| m.id() == triad.id()) {
            Some(slot) => {
                *slot = triad;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.members.iter().any(|triad| triad.id() == id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&Triad> {
        self.members.iter().find(|triad| triad.id() == id)
    }

    pub fn first(&self) -> Option<&Triad> {
        self.members.first()
    }

    pub fn last(&self) -> Option<&Triad> {
        self.members.last()
    }

    /// Every member in insertion order, or `None` when empty
    pub fn all(&self) -> Option<&[Triad]> {
        if self.members.is_empty() {
            None
        } else {
            Some(&self.members)
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Tear down every member and clear the container
    pub fn dispose_all(&mut self) {
        let members = std::mem::take(&mut self.members);
        tracing::debug!(
            controller = self.type_name,
            count = members.len(),
            "disposing container"
        );
        for triad in &members {
            triad.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Component;
    use crate::component::{NoModel, NoView};
    use std::cell::Cell;

    thread_local! {
        static DESTROYED: Cell<u32> = const { Cell::new(0) };
    }

    struct Door;

    impl Component for Door {}

    impl Controller for Door {
        type Model = NoModel;
        type View = NoView;

        fn destroy(&mut self) {
            DESTROYED.with(|d| d.set(d.get() + 1));
        }
    }

    fn door() -> Triad {
        Triad::of::<Door>(Handle::new(Door))
    }

    #[test]
    fn test_insertion_order() {
        let mut container = InstanceContainer::new("Door");
        let (a, b, c) = (door(), door(), door());
        container.add(a.clone()).unwrap();
        container.add(b.clone()).unwrap();
        container.add(c.clone()).unwrap();

        assert_eq!(container.first().unwrap().id(), a.id());
        assert_eq!(container.last().unwrap().id(), c.id());
        let ids: Vec<_> = container.all().unwrap().iter().map(Triad::id).collect();
        assert_eq!(ids, vec![a.id(), b.id(), c.id()]);
    }

    #[test]
    fn test_duplicate_member() {
        let mut container = InstanceContainer::new("Door");
        let a = door();
        container.add(a.clone()).unwrap();

        let err = container.add(a).unwrap_err();
        assert!(matches!(err, FiberError::DuplicateMember { .. }));
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_missing_member() {
        let mut container = InstanceContainer::new("Door");
        let err = container.remove(door().id()).unwrap_err();
        assert!(matches!(err, FiberError::MissingMember { .. }));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut container = InstanceContainer::new("Door");
        let (a, b, c) = (door(), door(), door());
        for t in [&a, &b, &c] {
            container.add(t.clone()).unwrap();
        }

        container.remove(b.id()).unwrap();
        let ids: Vec<_> = container.all().unwrap().iter().map(Triad::id).collect();
        assert_eq!(ids, vec![a.id(), c.id()]);
    }

    #[test]
    fn test_empty_queries_report_absence() {
        let container = InstanceContainer::new("Door");
        assert!(container.first().is_none());
        assert!(container.last().is_none());
        assert!(container.all().is_none());
    }

    #[test]
    fn test_dispose_all_runs_teardown() {
        DESTROYED.with(|d| d.set(0));
        let mut container = InstanceContainer::new("Door");
        container.add(door()).unwrap();
        container.add(door()).unwrap();

        container.dispose_all();

        assert!(container.is_empty());
        assert_eq!(DESTROYED.with(|d| d.get()), 2);
    }

    #[test]
    fn test_dispose_leaves_the_view_link_alone() {
        DESTROYED.with(|d| d.set(0));
        let link = ViewLink::new(NodeId(4));
        let mut container = InstanceContainer::new("Door");
        container
            .add(door().with_view(Handle::new(Door), link.clone()))
            .unwrap();

        container.dispose_all();

        assert_eq!(DESTROYED.with(|d| d.get()), 1);
        assert!(!link.is_destroyed());
    }
}
