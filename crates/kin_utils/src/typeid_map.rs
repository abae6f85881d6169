use core::any::TypeId;
use core::fmt::Debug;

use crate::hash::hashbrown::hash_map::Entry;
use crate::hash::{HashMap, PassThroughState};

// -----------------------------------------------------------------------------
// TypeIdMap

/// A registry of values keyed by compile-time types.
///
/// The interface takes the type as a parameter instead of a [`TypeId`]
/// argument, which is how every call site in the workspace reads anyway.
/// Since `TypeId` bits come pre-mixed from the compiler, the table hashes
/// with [`PassThroughState`] and skips mixing entirely.
///
/// # Examples
///
/// ```
/// use kin_utils::TypeIdMap;
///
/// struct Meshes;
///
/// let mut registry = TypeIdMap::new();
/// registry.register::<Meshes>(|| 3usize);
/// assert_eq!(registry.of::<Meshes>(), Some(&3));
/// ```
pub struct TypeIdMap<V> {
    entries: HashMap<TypeId, V, PassThroughState>,
}

impl<V> TypeIdMap<V> {
    /// An empty registry; allocates on first registration.
    #[inline]
    pub const fn new() -> Self {
        Self {
            entries: HashMap::with_hasher(PassThroughState),
        }
    }

    /// The value registered for `T`, if any.
    #[inline]
    pub fn of<T: ?Sized + 'static>(&self) -> Option<&V> {
        self.entries.get(&TypeId::of::<T>())
    }

    /// Mutable access to the value registered for `T`, if any.
    #[inline]
    pub fn of_mut<T: ?Sized + 'static>(&mut self) -> Option<&mut V> {
        self.entries.get_mut(&TypeId::of::<T>())
    }

    /// The value registered for `T`, created through `init` on first use.
    ///
    /// `init` only runs when `T` has no registration yet.
    pub fn register<T: ?Sized + 'static>(&mut self, init: impl FnOnce() -> V) -> &mut V {
        match self.entries.entry(TypeId::of::<T>()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => vacant.insert(init()),
        }
    }

    /// Drops the registration for `T`, returning its value.
    ///
    /// The table keeps its allocation for reuse.
    pub fn unregister<T: ?Sized + 'static>(&mut self) -> Option<V> {
        self.entries.remove(&TypeId::of::<T>())
    }

    /// Whether `T` has been registered.
    #[inline]
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered types.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The registered values, in no particular order.
    #[inline]
    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> {
        self.entries.values()
    }

    /// The registered values with mutable access, in no particular order.
    #[inline]
    pub fn values_mut(&mut self) -> impl ExactSizeIterator<Item = &mut V> {
        self.entries.values_mut()
    }
}

// -----------------------------------------------------------------------------
// Traits

impl<V> Default for TypeIdMap<V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Debug> Debug for TypeIdMap<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypeIdMap")
            .field("len", &self.len())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::TypeIdMap;

    struct Sprites;
    struct Sounds;

    #[test]
    fn register_is_lazy_and_idempotent() {
        let mut registry = TypeIdMap::<u32>::new();

        *registry.register::<Sprites>(|| 10) += 1;
        let sprites = registry.register::<Sprites>(|| unreachable!());
        assert_eq!(*sprites, 11);

        assert!(registry.contains::<Sprites>());
        assert!(!registry.contains::<Sounds>());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregister_forgets_the_type() {
        let mut registry = TypeIdMap::<&str>::new();

        registry.register::<Sounds>(|| "beep");
        assert_eq!(registry.of::<Sounds>(), Some(&"beep"));

        assert_eq!(registry.unregister::<Sounds>(), Some("beep"));
        assert_eq!(registry.of::<Sounds>(), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn values_visit_every_registration() {
        let mut registry = TypeIdMap::<u32>::new();
        registry.register::<Sprites>(|| 1);
        registry.register::<Sounds>(|| 2);

        let mut seen: alloc::vec::Vec<u32> = registry.values().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, [1, 2]);

        for value in registry.values_mut() {
            *value *= 10;
        }
        assert_eq!(registry.of::<Sprites>(), Some(&10));
        assert_eq!(registry.of_mut::<Sounds>(), Some(&mut 20));
    }
}
