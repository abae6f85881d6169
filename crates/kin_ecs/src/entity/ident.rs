use core::fmt::{self, Debug, Display};
use core::num::NonZeroU32;

// -----------------------------------------------------------------------------
// EntityId

/// The slot an entity occupies in the live-entity table.
///
/// Stored with a bias of one so `Option<EntityId>` costs nothing and the
/// all-zero bit pattern can never name a slot. An id alone does not identify
/// an entity over time — slots are recycled — only the pairing with an
/// [`EntityGeneration`] inside [`Entity`] is unique.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct EntityId(NonZeroU32);

impl EntityId {
    /// The id occupying table slot `slot`.
    ///
    /// Returns `None` for the one slot index whose biased value would wrap
    /// to zero; the table is full long before that.
    #[inline]
    pub const fn from_slot(slot: u32) -> Option<Self> {
        match NonZeroU32::new(slot.wrapping_add(1)) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    /// The table slot this id occupies.
    #[inline]
    pub const fn slot(self) -> usize {
        (self.0.get() - 1) as usize
    }

    /// The biased value, as packed into [`Entity::to_bits`].
    #[inline]
    const fn raw(self) -> u32 {
        self.0.get()
    }
}

impl Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.slot(), f)
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.slot(), f)
    }
}

// -----------------------------------------------------------------------------
// EntityGeneration

/// Counts how many times an entity slot has been recycled.
///
/// The counter is 32 bits and wraps. After a wrap, a stale handle can
/// compare equal to a newer occupant of the same slot ("aliasing"); the
/// allocator logs when that becomes possible. Holding an [`Entity`] across
/// very long stretches of churn is the one thing this scheme cannot protect.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct EntityGeneration(u32);

impl EntityGeneration {
    /// The generation of a slot that has never been recycled.
    pub(crate) const FIRST: Self = Self(0);

    /// The generation after one more recycling of the slot.
    ///
    /// The second value reports a wraparound, after which handles from
    /// before the wrap may alias new ones.
    #[inline]
    pub const fn advance(self) -> (Self, bool) {
        let (value, wrapped) = self.0.overflowing_add(1);
        (Self(value), wrapped)
    }
}

impl Debug for EntityGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for EntityGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

// -----------------------------------------------------------------------------
// Entity

/// A handle to one entity: a table slot plus its recycle count.
///
/// Handles are plain data. [`to_bits`](Self::to_bits) packs one into a
/// `u64` — biased id in the low half, generation in the high half — which is
/// also the wire and hash representation. Because the id half is never zero,
/// zero bits never decode to a handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    id: EntityId,
    generation: EntityGeneration,
}

impl Entity {
    /// A handle that names no entity; all bits set. Useful as an "unset"
    /// marker in component data.
    pub const PLACEHOLDER: Self = Self {
        id: EntityId(NonZeroU32::MAX),
        generation: EntityGeneration(u32::MAX),
    };

    /// Pairs an id with a generation.
    #[inline]
    pub const fn new(id: EntityId, generation: EntityGeneration) -> Self {
        Self { id, generation }
    }

    /// The table slot of this handle.
    #[inline]
    pub const fn slot(self) -> usize {
        self.id.slot()
    }

    /// The slot id of this handle.
    #[inline]
    pub const fn id(self) -> EntityId {
        self.id
    }

    /// The recycle count of this handle.
    #[inline]
    pub const fn generation(self) -> EntityGeneration {
        self.generation
    }

    /// Packs the handle into a `u64`: generation high, biased id low.
    #[inline]
    pub const fn to_bits(self) -> u64 {
        ((self.generation.0 as u64) << 32) | self.id.raw() as u64
    }

    /// Unpacks [`to_bits`](Self::to_bits) output, rejecting a zero id half.
    #[inline]
    pub const fn try_from_bits(bits: u64) -> Option<Self> {
        match NonZeroU32::new(bits as u32) {
            Some(raw) => Some(Self {
                id: EntityId(raw),
                generation: EntityGeneration((bits >> 32) as u32),
            }),
            None => None,
        }
    }

    /// Unpacks [`to_bits`](Self::to_bits) output.
    ///
    /// # Panics
    ///
    /// Panics when the id half is zero, which no packed handle produces.
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        match Self::try_from_bits(bits) {
            Some(entity) => entity,
            None => panic!("entity bits carry a zero id"),
        }
    }
}

impl Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::PLACEHOLDER {
            f.write_str("placeholder")
        } else {
            write!(f, "{}#{}", self.slot(), self.generation)
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Entity {
    #[inline]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.to_bits())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Entity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits: u64 = serde::Deserialize::deserialize(deserializer)?;
        Entity::try_from_bits(bits)
            .ok_or_else(|| serde::de::Error::custom("entity bits carry a zero id"))
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{Entity, EntityGeneration, EntityId};

    #[test]
    fn bits_pack_slot_and_generation() {
        let id = EntityId::from_slot(8).unwrap();
        let entity = Entity::new(id, EntityGeneration::FIRST.advance().0);

        let bits = entity.to_bits();
        // Biased id in the low half, generation in the high half.
        assert_eq!(bits & 0xFFFF_FFFF, 9);
        assert_eq!(bits >> 32, 1);

        assert_eq!(Entity::from_bits(bits), entity);
        assert_eq!(Entity::from_bits(bits).slot(), 8);
    }

    #[test]
    fn zero_id_bits_never_decode() {
        assert!(Entity::try_from_bits(0).is_none());
        // A generation alone is not a handle either.
        assert!(Entity::try_from_bits(6 << 32).is_none());
        assert!(Entity::try_from_bits(1).is_some());
    }

    #[test]
    fn recycled_slots_get_fresh_identities() {
        let id = EntityId::from_slot(0).unwrap();
        let first = Entity::new(id, EntityGeneration::FIRST);
        let second = Entity::new(id, EntityGeneration::FIRST.advance().0);

        assert_eq!(first.id(), second.id());
        assert_ne!(first, second);
    }

    #[test]
    fn generation_wrap_is_reported() {
        let (next, wrapped) = EntityGeneration(u32::MAX).advance();
        assert!(wrapped);
        assert_eq!(next, EntityGeneration::FIRST);

        let (next, wrapped) = EntityGeneration::FIRST.advance();
        assert!(!wrapped);
        assert_ne!(next, EntityGeneration::FIRST);
    }

    #[test]
    fn placeholder_is_all_bits_set() {
        assert_eq!(Entity::PLACEHOLDER.to_bits(), u64::MAX);
        assert_eq!(alloc::format!("{}", Entity::PLACEHOLDER), "placeholder");
    }
}
