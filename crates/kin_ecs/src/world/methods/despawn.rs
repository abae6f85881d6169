use alloc::vec::Vec;

use crate::entity::{DespawnError, Entity};
use crate::world::World;

impl World {
    /// Destroys the entity and every component attached to it.
    ///
    /// Value-holding cells cascade into their ancestors, reference-holding
    /// cells cascade into the owning descendant storages; either way every
    /// involved storage converges to cell removal before the entity id is
    /// released. No dangling reference survives in any storage.
    pub fn despawn(&mut self, entity: Entity) -> Result<(), DespawnError> {
        if !self.entities.contains(entity) {
            return Err(DespawnError::NotAlive(entity));
        }

        // Entry points are snapshotted first: the cascades mutate storages,
        // and a cascade from one storage routinely empties this entity's
        // cell in another before its own entry point runs.
        let destroyers: Vec<_> = self
            .storages
            .values()
            .filter(|storage| storage.contains(entity))
            .map(|storage| storage.destroy_fn())
            .collect();
        for destroy in destroyers {
            destroy(self, entity);
        }

        self.entities.free(entity);
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicU32, Ordering};

    use crate::inherit;
    use crate::world::World;

    #[test]
    fn despawn_cascades_through_the_hierarchy() {
        static DROPPED: AtomicU32 = AtomicU32::new(0);

        inherit! {
            pub struct Base {
                pub x: i32,
            }

            pub struct Parent: (pub base: Base) {}

            pub struct Concrete: (pub parent: Parent) {}
        }

        impl Drop for Concrete {
            fn drop(&mut self) {
                DROPPED.fetch_add(1, Ordering::Relaxed);
            }
        }

        let mut world = World::new();
        let entity = world.spawn();

        world
            .emplace(
                entity,
                Concrete {
                    parent: Parent { base: Base { x: 1 } },
                },
            )
            .unwrap();
        assert_eq!(world.get::<Base>(entity).unwrap().x, 1);

        world.despawn(entity).unwrap();

        // Destroyed exactly once, nothing dangling anywhere.
        assert_eq!(DROPPED.load(Ordering::Relaxed), 1);
        assert!(!world.contains::<Concrete>(entity));
        assert!(!world.contains::<Parent>(entity));
        assert!(!world.contains::<Base>(entity));
        assert!(!world.is_alive(entity));
    }

    #[test]
    fn despawn_matches_erasing_every_value() {
        inherit! {
            pub struct Root {
                pub tag: u32,
            }

            pub struct Left: (pub root: Root) {}

            pub struct Right: (pub root: Root) {}
        }

        // One entity torn down wholesale...
        let mut destroyed = World::new();
        let entity = destroyed.spawn();
        destroyed.emplace(entity, Root { tag: 0 }).unwrap();
        destroyed.emplace(entity, Left { root: Root { tag: 1 } }).unwrap();
        destroyed.emplace(entity, Right { root: Root { tag: 2 } }).unwrap();
        let tags: u32 = destroyed.every::<Root>(entity).map(|r| r.tag).sum();
        assert_eq!(tags, 3);
        destroyed.despawn(entity).unwrap();

        // ...matches erasing each concrete value in an arbitrary order.
        let mut erased = World::new();
        let entity = erased.spawn();
        erased.emplace(entity, Root { tag: 0 }).unwrap();
        erased.emplace(entity, Left { root: Root { tag: 1 } }).unwrap();
        erased.emplace(entity, Right { root: Root { tag: 2 } }).unwrap();
        erased.erase::<Right>(entity).unwrap();
        erased.erase::<Root>(entity).unwrap();
        erased.erase::<Left>(entity).unwrap();

        for world in [&destroyed, &erased] {
            assert!(!world.contains::<Root>(entity));
            assert!(!world.contains::<Left>(entity));
            assert!(!world.contains::<Right>(entity));
        }
    }

    #[test]
    fn despawn_with_other_entities_untouched() {
        inherit! {
            pub struct Marker {
                pub id: u32,
            }
        }

        let mut world = World::new();
        let doomed = world.spawn();
        let survivor = world.spawn();

        world.emplace(doomed, Marker { id: 1 }).unwrap();
        world.emplace(survivor, Marker { id: 2 }).unwrap();

        world.despawn(doomed).unwrap();

        assert!(world.contains::<Marker>(survivor));
        assert_eq!(world.get::<Marker>(survivor).unwrap().id, 2);
    }

    #[test]
    fn world_drop_destroys_remaining_values() {
        static DROPPED: AtomicU32 = AtomicU32::new(0);

        inherit! {
            pub struct Owned {
                pub x: u32,
            }

            pub struct Derived: (pub owned: Owned) {}
        }

        impl Drop for Owned {
            fn drop(&mut self) {
                DROPPED.fetch_add(1, Ordering::Relaxed);
            }
        }

        {
            let mut world = World::new();
            let entity = world.spawn();
            world.emplace(entity, Owned { x: 1 }).unwrap();
            world.emplace(entity, Derived { owned: Owned { x: 2 } }).unwrap();
            assert_eq!(world.get::<Owned>(entity).unwrap().x, 1);
            // The world goes out of scope with live components.
        }

        // One drop per Owned subobject: the plain value and the embedded one.
        assert_eq!(DROPPED.load(Ordering::Relaxed), 2);
    }
}
