use alloc::boxed::Box;
use core::fmt::Debug;

use kin_utils::TypeIdMap;

use crate::entity::Entities;
use crate::hierarchy::Polymorphic;
use crate::poly::{ErasedStorage, PolyStorage, RefListPool};
use crate::utils::DebugCheckedUnwrap;

// -----------------------------------------------------------------------------
// World

/// The registry of entities and their polymorphic components.
///
/// Owns one storage per concrete component type plus the slab pool backing
/// all reference lists. Dropping the world tears everything down: live
/// component values run their destructors in their owning storages, and the
/// pool releases its pages.
pub struct World {
    pub(crate) entities: Entities,
    pub(crate) storages: TypeIdMap<Box<dyn ErasedStorage>>,
    pub(crate) pool: RefListPool,
}

impl Debug for World {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entities)
            .field("storages", &self.storages.len())
            .field("pool", &self.pool)
            .finish()
    }
}

impl Default for World {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates an empty world.
    pub const fn new() -> Self {
        Self {
            entities: Entities::new(),
            storages: TypeIdMap::new(),
            pool: RefListPool::new(),
        }
    }

    /// The live entity table.
    #[inline]
    pub fn entities(&self) -> &Entities {
        &self.entities
    }

    /// Ensures the storage for `T` exists.
    pub(crate) fn assure<T: Polymorphic>(&mut self) {
        self.storages
            .register::<T>(|| Box::new(PolyStorage::<T>::new()));
    }

    /// The storage for `T`, if any component of `T` was ever touched.
    pub(crate) fn storage<T: Polymorphic>(&self) -> Option<&PolyStorage<T>> {
        self.storages.of::<T>()?.as_any().downcast_ref()
    }

    /// Mutable access to the storage for `T`.
    pub(crate) fn storage_mut<T: Polymorphic>(&mut self) -> Option<&mut PolyStorage<T>> {
        self.storages.of_mut::<T>()?.as_any_mut().downcast_mut()
    }

    /// The storage for `T` together with the list pool, split for
    /// simultaneous mutation.
    ///
    /// # Safety
    /// The storage for `T` must have been assured.
    pub(crate) unsafe fn storage_and_pool<T: Polymorphic>(
        &mut self,
    ) -> (&mut PolyStorage<T>, &mut RefListPool) {
        // SAFETY: assured per the contract; the downcast target is the type
        // the storage was registered under.
        let storage = unsafe {
            self.storages
                .of_mut::<T>()
                .debug_checked_unwrap()
                .as_any_mut()
                .downcast_mut::<PolyStorage<T>>()
                .debug_checked_unwrap()
        };
        (storage, &mut self.pool)
    }
}
