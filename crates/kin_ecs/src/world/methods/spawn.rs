use crate::entity::Entity;
use crate::world::World;

impl World {
    /// Allocates a fresh entity.
    #[inline]
    pub fn spawn(&mut self) -> Entity {
        self.entities.spawn()
    }

    /// Whether `entity` is alive.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.contains(entity)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use crate::world::World;

    #[test]
    fn spawned_entities_are_alive() {
        let mut world = World::new();

        let a = world.spawn();
        let b = world.spawn();
        assert!(world.is_alive(a));
        assert!(world.is_alive(b));
        assert_ne!(a, b);

        world.despawn(a).unwrap();
        assert!(!world.is_alive(a));
        assert!(world.is_alive(b));
    }

    #[test]
    fn despawn_twice_is_an_error() {
        let mut world = World::new();

        let entity = world.spawn();
        world.despawn(entity).unwrap();
        assert!(world.despawn(entity).is_err());
    }
}
