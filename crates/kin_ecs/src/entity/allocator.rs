use alloc::vec::Vec;
use core::fmt::Debug;

use super::{Entity, EntityGeneration, EntityId};

// -----------------------------------------------------------------------------
// Entities

/// The table of live entities.
///
/// Identifiers are handed out from a LIFO free list before new slots are
/// reserved. Freeing an entity advances the generation of its slot
/// immediately, so any handle to the previous occupant stops matching the
/// table and [`contains`](Self::contains) reports it dead.
pub struct Entities {
    /// Generation per table slot.
    generations: Vec<EntityGeneration>,
    free: Vec<EntityId>,
}

impl Debug for Entities {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Entities").field("alive", &self.len()).finish()
    }
}

impl Default for Entities {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Entities {
    /// Creates an empty entity table.
    #[inline]
    pub const fn new() -> Self {
        Self {
            generations: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Allocates a fresh entity.
    ///
    /// Reuses a freed slot (with its already-advanced generation) when one
    /// is available.
    pub fn spawn(&mut self) -> Entity {
        if let Some(id) = self.free.pop() {
            return Entity::new(id, self.generations[id.slot()]);
        }

        let slot = self.generations.len() as u32;
        let Some(id) = EntityId::from_slot(slot) else {
            panic!("entity table is full");
        };
        self.generations.push(EntityGeneration::FIRST);
        Entity::new(id, EntityGeneration::FIRST)
    }

    /// Returns whether the entity is alive.
    ///
    /// A freed slot carries an already-advanced generation that no
    /// handed-out handle matches, so the table lookup alone decides
    /// liveness.
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.generations.get(entity.slot()) == Some(&entity.generation())
    }

    /// Frees a live entity, advancing its slot generation.
    ///
    /// The caller must have validated liveness; freeing a dead entity is a
    /// logic error caught in debug builds.
    pub(crate) fn free(&mut self, entity: Entity) {
        debug_assert!(self.contains(entity));

        let slot = entity.slot();
        let (next, wrapped) = self.generations[slot].advance();
        if wrapped {
            log::warn!("Entity({}) generation wrapped on free, aliasing may occur.", entity.id());
        }
        self.generations[slot] = next;
        self.free.push(entity.id());
    }

    /// Returns the number of live entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.generations.len() - self.free.len()
    }

    /// Returns `true` if no entity is alive.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::Entities;

    #[test]
    fn spawn_free_reuse() {
        let mut entities = Entities::new();

        let a = entities.spawn();
        let b = entities.spawn();
        assert_ne!(a, b);
        assert_eq!(entities.len(), 2);
        assert!(entities.contains(a));

        entities.free(a);
        assert!(!entities.contains(a));
        assert!(entities.contains(b));

        // The slot comes back with a new generation.
        let c = entities.spawn();
        assert_eq!(c.id(), a.id());
        assert_ne!(c, a);
        assert!(entities.contains(c));
        assert!(!entities.contains(a));
    }

    #[test]
    fn slots_fill_from_zero() {
        let mut entities = Entities::new();
        assert_eq!(entities.spawn().slot(), 0);
        assert_eq!(entities.spawn().slot(), 1);
    }
}
