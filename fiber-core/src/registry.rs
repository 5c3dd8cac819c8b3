//! Type-indexed registry of live controllers
//!
//! One [`InstanceContainer`] per concrete controller type, keyed by `TypeId`.
//! Lookups use the exact static type; there is no lookup across "subtypes".

use crate::container::{InstanceContainer, Triad};
use crate::error::Result;
use crate::handle::{Handle, Shared};
use hashbrown::HashMap;
use std::any::{Any, TypeId};

#[derive(Debug, Default)]
pub struct TypeRegistry {
    containers: HashMap<TypeId, InstanceContainer>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a triad to its controller's container.
    ///
    /// Returns `Ok(false)` without touching anything if the controller is
    /// already registered.
    pub fn register(&mut self, triad: &Triad) -> Result<bool> {
        let controller = &triad.controller;
        let container = self
            .containers
            .entry(controller.type_id())
            .or_insert_with(|| InstanceContainer::new(controller.type_name()));

        if container.contains(controller.id()) {
            return Ok(false);
        }
        container.add(triad.clone())?;
        Ok(true)
    }

    /// Remove a controller. Returns the removed triad, or `None` if it was
    /// not registered. Empty containers are dropped.
    pub fn unregister(&mut self, controller: &Handle) -> Result<Option<Triad>> {
        let type_id = controller.type_id();
        let Some(container) = self.containers.get_mut(&type_id) else {
            return Ok(None);
        };
        if !container.contains(controller.id()) {
            return Ok(None);
        }

        let triad = container.remove(controller.id())?;
        if container.is_empty() {
            self.containers.remove(&type_id);
        }
        Ok(Some(triad))
    }

    /// Replace the stored triad of an already registered controller.
    /// Returns the previous triad.
    pub fn refresh(&mut self, triad: &Triad) -> Option<Triad> {
        let container = self.containers.get_mut(&triad.controller.type_id())?;
        let previous = container.get(triad.id()).cloned()?;
        container.replace(triad.clone());
        Some(previous)
    }

    pub fn contains(&self, controller: &Handle) -> bool {
        self.containers
            .get(&controller.type_id())
            .is_some_and(|container| container.contains(controller.id()))
    }

    pub fn triad(&self, controller: &Handle) -> Option<&Triad> {
        self.containers
            .get(&controller.type_id())?
            .get(controller.id())
    }

    pub fn container<T: Any>(&self) -> Option<&InstanceContainer> {
        self.containers.get(&TypeId::of::<T>())
    }

    /// First registered instance of exactly `T`
    pub fn first<T: Any>(&self) -> Option<Shared<T>> {
        self.container::<T>()?.first()?.controller.downcast::<T>()
    }

    /// Last registered instance of exactly `T`
    pub fn last<T: Any>(&self) -> Option<Shared<T>> {
        self.container::<T>()?.last()?.controller.downcast::<T>()
    }

    /// Every registered instance of exactly `T`, in registration order
    pub fn all<T: Any>(&self) -> Option<Vec<Shared<T>>> {
        let triads = self.container::<T>()?.all()?;
        Some(
            triads
                .iter()
                .filter_map(|triad| triad.controller.downcast::<T>())
                .collect(),
        )
    }

    pub fn count<T: Any>(&self) -> usize {
        self.container::<T>().map_or(0, InstanceContainer::len)
    }

    /// Number of registered controllers across all types
    pub fn len(&self) -> usize {
        self.containers.values().map(InstanceContainer::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Number of controller types with at least one live instance
    pub fn type_count(&self) -> usize {
        self.containers.len()
    }

    /// `(type name, live instances)` for every non-empty container, by name
    pub fn counts(&self) -> Vec<(&'static str, usize)> {
        let mut counts: Vec<_> = self
            .containers
            .values()
            .map(|container| (container.type_name(), container.len()))
            .collect();
        counts.sort();
        counts
    }

    /// Drain every container, leaving the registry empty
    pub fn take_all(&mut self) -> Vec<InstanceContainer> {
        self.containers.drain().map(|(_, container)| container).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Component;
    use crate::component::{Controller, NoModel, NoView};
    use crate::handle::shared;

    struct Turret(u32);
    impl Component for Turret {}
    impl Controller for Turret {
        type Model = NoModel;
        type View = NoView;
    }

    struct Radar;
    impl Component for Radar {}
    impl Controller for Radar {
        type Model = NoModel;
        type View = NoView;
    }

    fn turret(n: u32) -> (Shared<Turret>, Triad) {
        let cell = shared(Turret(n));
        let triad = Triad::of::<Turret>(Handle::from_shared(&cell));
        (cell, triad)
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = TypeRegistry::new();
        let (_, triad) = turret(1);

        assert!(registry.register(&triad).unwrap());
        assert!(!registry.register(&triad).unwrap());
        assert_eq!(registry.count::<Turret>(), 1);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut registry = TypeRegistry::new();
        let (_, triad) = turret(1);
        registry.register(&triad).unwrap();

        assert!(registry.unregister(&triad.controller).unwrap().is_some());
        assert!(registry.unregister(&triad.controller).unwrap().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_queries_follow_insertion_order() {
        let mut registry = TypeRegistry::new();
        let turrets: Vec<_> = (1..=3).map(turret).collect();
        for (_, triad) in &turrets {
            registry.register(triad).unwrap();
        }

        assert_eq!(registry.first::<Turret>().unwrap().borrow().0, 1);
        assert_eq!(registry.last::<Turret>().unwrap().borrow().0, 3);
        let all: Vec<u32> = registry
            .all::<Turret>()
            .unwrap()
            .iter()
            .map(|t| t.borrow().0)
            .collect();
        assert_eq!(all, vec![1, 2, 3]);
    }

    #[test]
    fn test_queries_use_the_exact_type() {
        let mut registry = TypeRegistry::new();
        let (_, triad) = turret(1);
        registry.register(&triad).unwrap();

        assert!(registry.first::<Radar>().is_none());
        assert!(registry.all::<Radar>().is_none());
        assert_eq!(registry.counts(), vec![("Turret", 1)]);
    }

    #[test]
    fn test_container_is_dropped_when_last_member_leaves() {
        let mut registry = TypeRegistry::new();
        let (_, a) = turret(1);
        let (_, b) = turret(2);
        registry.register(&a).unwrap();
        registry.register(&b).unwrap();

        registry.unregister(&a.controller).unwrap();
        assert_eq!(registry.type_count(), 1);
        registry.unregister(&b.controller).unwrap();
        assert_eq!(registry.type_count(), 0);
        assert!(registry.container::<Turret>().is_none());
    }

    #[test]
    fn test_refresh_replaces_in_place() {
        let mut registry = TypeRegistry::new();
        let (_, a) = turret(1);
        let (_, b) = turret(2);
        registry.register(&a).unwrap();
        registry.register(&b).unwrap();

        let radar = Handle::new(Radar);
        let updated = a.clone().with_model(radar.clone());
        let previous = registry.refresh(&updated).unwrap();

        assert!(previous.model.is_none());
        assert_eq!(registry.triad(&a.controller).unwrap().model, Some(radar));
        assert_eq!(registry.first::<Turret>().unwrap().borrow().0, 1);
    }
}
