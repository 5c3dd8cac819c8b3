//! Type-erased object handles
//!
//! Controllers, models and views live in `Rc<RefCell<T>>` cells. A [`Handle`]
//! erases the concrete type while keeping what the registry and dispatcher need:
//! a stable identity, the `TypeId` used as registry key, and the type's
//! capability table.

use crate::capability::{CapabilityTable, Component};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared, single-threaded mutable cell
pub type Shared<T> = Rc<RefCell<T>>;

/// Wrap a value in a fresh [`Shared`] cell
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Identity of a managed object (the address of its cell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object@{:#x}", self.0)
    }
}

/// Type-erased, reference-counted handle to a managed object
#[derive(Clone)]
pub struct Handle {
    cell: Rc<dyn Any>,
    id: ObjectId,
    type_id: TypeId,
    type_name: &'static str,
    table: fn() -> CapabilityTable,
}

impl Handle {
    pub fn new<T: Component>(value: T) -> Self {
        Self::from_shared(&shared(value))
    }

    pub fn from_shared<T: Component>(cell: &Shared<T>) -> Self {
        let cell: Rc<dyn Any> = cell.clone();
        let id = ObjectId(Rc::as_ptr(&cell) as *const () as usize);
        Self {
            cell,
            id,
            type_id: TypeId::of::<T>(),
            type_name: short_type_name::<T>(),
            table: CapabilityTable::of::<T>,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// `TypeId` of the concrete component type
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Short (path-less) name of the concrete component type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Recover the typed cell, or `None` if the handle holds another type
    pub fn downcast<T: Any>(&self) -> Option<Shared<T>> {
        self.cell.clone().downcast::<RefCell<T>>().ok()
    }

    pub(crate) fn cell(&self) -> &dyn Any {
        &*self.cell
    }

    pub(crate) fn capability_table(&self) -> CapabilityTable {
        (self.table)()
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Handle {}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("type", &self.type_name)
            .field("id", &self.id)
            .finish()
    }
}

/// Last path segment of a type name, generics excluded
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Lamp {
        lit: bool,
    }

    impl Component for Lamp {}

    struct Switch;

    impl Component for Switch {}

    #[test]
    fn test_handles_to_the_same_cell_are_equal() {
        let cell = shared(Lamp { lit: false });
        let a = Handle::from_shared(&cell);
        let b = Handle::from_shared(&cell);
        assert_eq!(a, b);
        assert_eq!(a.id(), b.id());

        let other = Handle::new(Lamp { lit: false });
        assert_ne!(a, other);
    }

    #[test]
    fn test_downcast_round_trips_to_the_same_cell() {
        let cell = shared(Lamp { lit: false });
        let handle = Handle::from_shared(&cell);

        let back = handle.downcast::<Lamp>().unwrap();
        back.borrow_mut().lit = true;
        assert!(cell.borrow().lit);
        assert!(handle.downcast::<Switch>().is_none());
    }

    #[test]
    fn test_type_identity() {
        let handle = Handle::new(Switch);
        assert!(handle.is::<Switch>());
        assert!(!handle.is::<Lamp>());
        assert_eq!(handle.type_name(), "Switch");
    }

    #[test]
    fn test_short_type_name_strips_paths_and_generics() {
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
        assert_eq!(short_type_name::<u32>(), "u32");
    }
}
