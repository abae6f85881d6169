use kin_ptr::Ptr;

use crate::entity::{Entity, EraseError};
use crate::hierarchy::Polymorphic;
use crate::poly::PolyCell;
use crate::utils::DebugCheckedUnwrap;
use crate::world::World;

impl World {
    /// Erases the value of exactly `T` from `entity`.
    ///
    /// The back-references in every ancestor storage are removed first, in a
    /// mirror of the emplace fan-out; by the time the value is destructed no
    /// storage can reach it anymore. References held by `T`'s own cell (to
    /// descendant components) survive the erase.
    pub fn erase<T: Polymorphic>(&mut self, entity: Entity) -> Result<(), EraseError> {
        let value_ptr = match self.storage::<T>().and_then(|storage| storage.cell(entity)) {
            Some(cell) if cell.holds_value() => cell.value_ptr(),
            _ => return Err(EraseError::NotPresent(entity)),
        };

        // SAFETY: the storage exists, it produced `value_ptr` above.
        let edges = unsafe { self.storage::<T>().debug_checked_unwrap() }.edges().len();
        for index in 0..edges {
            // SAFETY: as above; the edge list never changes.
            let edge = unsafe { self.storage::<T>().debug_checked_unwrap() }.edges()[index];
            // SAFETY: the projection stays inside the component value.
            let projected = unsafe { Ptr::new(value_ptr).byte_add(edge.offset) };
            (edge.erase_ref)(self, entity, projected);
        }

        // SAFETY: as above.
        let (storage, pool) = unsafe { self.storage_and_pool::<T>() };
        // SAFETY: the cell produced `value_ptr` above.
        let cell = unsafe { storage.cell_mut(entity).debug_checked_unwrap() };
        if cell.destroy_value(pool) {
            storage.remove_cell(entity);
        }
        Ok(())
    }

    /// Removes every `T`-typed state from `entity`: the value of exactly `T`
    /// if one is present, then every descendant component still referenced
    /// by the cell. Returns whether anything was removed.
    #[inline]
    pub fn remove<T: Polymorphic>(&mut self, entity: Entity) -> bool {
        remove_in::<T>(self, entity)
    }

    /// Removes a back-reference from `P`'s storage.
    ///
    /// Called from a descendant's erase path with the same projected pointer
    /// the emplace installed. The reference must be present.
    pub(crate) fn erase_ref<P: Polymorphic>(&mut self, entity: Entity, value: Ptr<'_>) {
        // SAFETY: the emplace path assured this storage and installed the
        // reference being removed.
        let (storage, pool) = unsafe { self.storage_and_pool::<P>() };
        // SAFETY: as above.
        let cell = unsafe { storage.cell_mut(entity).debug_checked_unwrap() };
        if cell.delete_ref(value.raw(), pool) {
            storage.remove_cell(entity);
        }
    }
}

/// Entity-teardown entry point for one storage.
///
/// Converges to cell removal: the owned value (if any) is erased first, then
/// every remaining reference is cascaded through its deleter, newest first.
/// Each deleter removes the back-reference it was reached through, so the
/// cell is re-read every round and strictly shrinks; no borrow of it survives
/// a cascade step.
pub(crate) fn remove_in<T: Polymorphic>(world: &mut World, entity: Entity) -> bool {
    let mut removed = false;

    if world
        .storage::<T>()
        .is_some_and(|storage| storage.contains_value(entity))
    {
        let erased = world.erase::<T>(entity);
        debug_assert!(erased.is_ok());
        let _ = erased;
        removed = true;
    }

    while let Some(reference) = world
        .storage::<T>()
        .and_then(|storage| storage.cell(entity))
        .and_then(PolyCell::last_foreign_ref)
    {
        reference.deleter.call(world, entity);
        removed = true;
    }

    removed
}

// -----------------------------------------------------------------------------
// Tests
