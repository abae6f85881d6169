use kin_ptr::{Ptr, PtrMut};

use crate::entity::Entity;
use crate::hierarchy::Polymorphic;
use crate::poly::{Every, EveryMut};
use crate::world::World;

impl World {
    /// The `T`-projection of a component the entity carries, if any.
    ///
    /// When the entity holds several `T`-ancestors this returns the one the
    /// cell tracks inline (its own value when present); use
    /// [`every`](Self::every) to see all of them.
    pub fn get<T: Polymorphic>(&self, entity: Entity) -> Option<&T> {
        let cell = self.storage::<T>()?.cell(entity)?;
        // SAFETY: the tracked component is alive for the borrow of `self`.
        let ptr: Ptr<'_> = unsafe { Ptr::new(cell.any_ptr()) };
        ptr.expect_aligned::<T>();
        // SAFETY: the cell guarantees a `T`-projected component.
        Some(unsafe { ptr.as_ref::<T>() })
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut<T: Polymorphic>(&mut self, entity: Entity) -> Option<&mut T> {
        let cell = self.storage::<T>()?.cell(entity)?;
        // SAFETY: the tracked component is alive for the borrow of `self`,
        // and the exclusive borrow makes this the only live access.
        let ptr: PtrMut<'_> = unsafe { PtrMut::new(cell.any_ptr()) };
        ptr.expect_aligned::<T>();
        // SAFETY: the cell guarantees a `T`-projected component.
        Some(unsafe { ptr.into_mut::<T>() })
    }

    /// Whether the entity carries any `T`-ancestor state, value or
    /// references.
    pub fn contains<T: Polymorphic>(&self, entity: Entity) -> bool {
        self.storage::<T>()
            .is_some_and(|storage| storage.contains(entity))
    }

    /// Whether the entity carries a value of exactly `T`.
    pub fn contains_value<T: Polymorphic>(&self, entity: Entity) -> bool {
        self.storage::<T>()
            .is_some_and(|storage| storage.contains_value(entity))
    }

    /// Iterates every `T`-ancestor component attached to `entity`.
    pub fn every<T: Polymorphic>(&self, entity: Entity) -> Every<'_, T> {
        Every::new(self.storage::<T>().and_then(|storage| storage.cell(entity)))
    }

    /// Mutable variant of [`every`](Self::every).
    pub fn every_mut<T: Polymorphic>(&mut self, entity: Entity) -> EveryMut<'_, T> {
        EveryMut::new(
            self.storage_mut::<T>()
                .and_then(|storage| storage.cell_mut(entity)),
        )
    }
}

// -----------------------------------------------------------------------------
// Tests
