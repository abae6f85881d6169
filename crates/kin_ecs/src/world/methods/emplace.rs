use kin_ptr::Ptr;

use crate::entity::{EmplaceError, Entity};
use crate::hierarchy::{Deleter, Polymorphic};
use crate::poly::{PolyCell, Reference};
use crate::utils::DebugCheckedUnwrap;
use crate::world::World;

impl World {
    /// Inserts a value of exactly `T` on `entity` and returns it.
    ///
    /// The value is constructed first; then the hierarchy fan-out installs a
    /// back-reference into every transitive ancestor's storage, projected
    /// through the ancestor. By the time this returns, a query on any
    /// ancestor type observes the new component.
    ///
    /// If the entity already carries `T`-ancestor references, the new value
    /// joins them in the existing cell.
    pub fn emplace<T: Polymorphic>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<&mut T, EmplaceError> {
        if !self.entities.contains(entity) {
            return Err(EmplaceError::NotAlive(entity));
        }
        self.assure::<T>();

        let value_ptr = {
            // SAFETY: assured above.
            let (storage, pool) = unsafe { self.storage_and_pool::<T>() };
            match storage.cell_mut(entity) {
                Some(cell) if cell.holds_value() => {
                    return Err(EmplaceError::AlreadyPresent(entity));
                }
                Some(cell) => {
                    cell.construct_value(value, pool);
                    cell.value_ptr()
                }
                None => {
                    let slot = storage.insert_cell(entity, PolyCell::new_value(value));
                    // SAFETY: freshly installed at its final address.
                    unsafe { slot.as_ref() }.value_ptr()
                }
            }
        };

        // Hierarchy references are installed after the value exists; each
        // round re-fetches the storage because ancestor assurance may touch
        // the registry.
        let deleter = Deleter::of::<T>();
        // SAFETY: assured above.
        let edges = unsafe { self.storage::<T>().debug_checked_unwrap() }.edges().len();
        for index in 0..edges {
            // SAFETY: assured above; the edge list never changes.
            let edge = unsafe { self.storage::<T>().debug_checked_unwrap() }.edges()[index];
            // SAFETY: the projection stays inside the component value.
            let projected = unsafe { Ptr::new(value_ptr).byte_add(edge.offset) };
            (edge.emplace_ref)(self, entity, projected, deleter);
        }

        // SAFETY: the cell address is stable and the borrow of `self` keeps
        // every storage untouched while the reference lives.
        Ok(unsafe { &mut *value_ptr.cast::<T>().as_ptr() })
    }

    /// Installs a back-reference in `P`'s storage.
    ///
    /// Called from a descendant's emplace path; `value` is the descendant's
    /// value already projected to `P`. Callers guarantee pointer uniqueness;
    /// duplicate insertion is not guarded here.
    pub(crate) fn emplace_ref<P: Polymorphic>(
        &mut self,
        entity: Entity,
        value: Ptr<'_>,
        deleter: Deleter,
    ) {
        self.assure::<P>();
        let reference = Reference {
            ptr: value.raw(),
            deleter,
        };
        // SAFETY: assured above.
        let (storage, pool) = unsafe { self.storage_and_pool::<P>() };
        match storage.cell_mut(entity) {
            Some(cell) => cell.add_ref(reference, pool),
            None => {
                storage.insert_cell(entity, PolyCell::new_ref(reference));
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use core::ptr;

    use crate::entity::EmplaceError;
    use crate::inherit;
    use crate::world::World;

    inherit! {
        #[derive(Debug)]
        pub struct Base {
            pub x: i32,
        }

        #[derive(Debug)]
        pub struct Parent: (pub base: Base) {}

        #[derive(Debug)]
        pub struct Concrete: (pub parent: Parent) {}
    }

    fn concrete(x: i32) -> Concrete {
        Concrete {
            parent: Parent {
                base: Base { x },
            },
        }
    }

    #[test]
    fn emplace_reaches_every_ancestor() {
        let mut world = World::new();
        let entity = world.spawn();

        let emplaced = ptr::from_ref(world.emplace(entity, concrete(123)).unwrap());

        // Every level of the chain yields exactly the emplaced value.
        assert!(world.contains_value::<Concrete>(entity));
        assert!(world.contains::<Parent>(entity));
        assert!(world.contains::<Base>(entity));

        let via_parent = world.get::<Parent>(entity).unwrap();
        assert_eq!(via_parent.base.x, 123);
        assert!(ptr::from_ref(via_parent).cast::<Concrete>() == emplaced);

        let via_base = world.get::<Base>(entity).unwrap();
        assert_eq!(via_base.x, 123);

        for level in [
            world.every::<Concrete>(entity).count(),
            world.every::<Parent>(entity).count(),
            world.every::<Base>(entity).count(),
        ] {
            assert_eq!(level, 1);
        }
    }

    #[test]
    fn emplace_requires_a_live_entity() {
        let mut world = World::new();
        let entity = world.spawn();
        world.despawn(entity).unwrap();

        assert_eq!(
            world.emplace(entity, concrete(1)).unwrap_err(),
            EmplaceError::NotAlive(entity),
        );
    }

    #[test]
    fn double_emplace_is_rejected() {
        let mut world = World::new();
        let entity = world.spawn();

        world.emplace(entity, concrete(1)).unwrap();
        assert_eq!(
            world.emplace(entity, concrete(2)).unwrap_err(),
            EmplaceError::AlreadyPresent(entity),
        );

        // The original value is untouched.
        assert_eq!(world.get::<Concrete>(entity).unwrap().parent.base.x, 1);
    }

    #[test]
    fn ancestor_value_joins_descendant_references() {
        let mut world = World::new();
        let entity = world.spawn();

        world.emplace(entity, concrete(7)).unwrap();
        // The Parent storage currently holds only a reference; emplacing a
        // Parent value promotes that cell.
        world
            .emplace(entity, Parent { base: Base { x: 9 } })
            .unwrap();

        let xs: alloc::vec::Vec<i32> = world.every::<Base>(entity).map(|b| b.x).collect();
        assert_eq!(xs, [7, 9]);

        // Exactly Parent yields its own value through `get` on the value
        // path, and both components through iteration.
        assert!(world.contains_value::<Parent>(entity));
        assert_eq!(world.every::<Parent>(entity).count(), 2);
    }

    #[test]
    fn sibling_descendants_keep_insertion_order() {
        inherit! {
            pub struct Root {
                pub tag: u32,
            }

            pub struct Left: (pub root: Root) {}

            pub struct Right: (pub root: Root) {}
        }

        let mut world = World::new();
        let entity = world.spawn();

        world.emplace(entity, Left { root: Root { tag: 1 } }).unwrap();
        world.emplace(entity, Right { root: Root { tag: 2 } }).unwrap();

        let tags: alloc::vec::Vec<u32> = world.every::<Root>(entity).map(|r| r.tag).collect();
        assert_eq!(tags, [1, 2]);
    }

    #[test]
    fn diamond_ancestors_are_deduplicated() {
        inherit! {
            pub struct A {
                pub a: u32,
            }

            pub struct B: (pub a: A) {}

            pub struct C: (pub a: A) {}

            pub struct BC: (pub b: B, pub c: C) {}

            pub struct D: (pub a: A, pub bc: BC) {}
        }

        let mut world = World::new();
        let entity = world.spawn();

        world
            .emplace(
                entity,
                D {
                    a: A { a: 1 },
                    bc: BC {
                        b: B { a: A { a: 2 } },
                        c: C { a: A { a: 3 } },
                    },
                },
            )
            .unwrap();

        // A single D projects once through every ancestor, A included even
        // though it is reachable along three paths.
        assert_eq!(world.every::<A>(entity).count(), 1);
        assert_eq!(world.every::<B>(entity).count(), 1);
        assert_eq!(world.every::<C>(entity).count(), 1);
        assert_eq!(world.every::<BC>(entity).count(), 1);

        // The kept A edge is the first declaration path: the direct field.
        assert_eq!(world.get::<A>(entity).unwrap().a, 1);
    }
}
