//! Hashing building blocks for the workspace's containers.
//!
//! Everything funnels through two build-hashers: [`StableState`], a seeded
//! *foldhash* instance whose table layouts are reproducible between runs,
//! and [`PassThroughState`] for keys such as `TypeId` whose bits already
//! are a hash. The *hashbrown* crate is re-exported so downstream code names
//! one map type regardless of hasher.

use core::hash::{BuildHasher, Hasher};

use foldhash::fast::{FixedState, FoldHasher};

// -----------------------------------------------------------------------------
// Container aliases

/// The workspace's hash map: *hashbrown* with a [`StableState`] by default.
pub type HashMap<K, V, S = StableState> = hashbrown::HashMap<K, V, S>;

/// The workspace's hash set: *hashbrown* with a [`StableState`] by default.
pub type HashSet<T, S = StableState> = hashbrown::HashSet<T, S>;

// -----------------------------------------------------------------------------
// StableState

/// Arbitrary but fixed, so table layouts depend on the keys alone.
const STABLE_STATE: FixedState = FixedState::with_seed(0x51F0_3D1C_7A6B_29E5);

/// A [`BuildHasher`] with run-to-run stable output.
///
/// Storage bugs are far easier to chase when two runs of the same program
/// place the same entities in the same buckets, so the usual random
/// per-process seed is deliberately not used. What that trades away is
/// flood-resistance against attacker-chosen keys, which an in-process
/// component store never sees.
///
/// # Examples
///
/// ```
/// use core::hash::BuildHasher;
/// use kin_utils::hash::StableState;
///
/// let first = StableState.hash_one(42u64);
/// let again = StableState.hash_one(42u64);
/// assert_eq!(first, again);
/// ```
#[derive(Clone, Copy, Default, Debug)]
pub struct StableState;

/// The hasher produced by [`StableState`].
pub type StableHasher = FoldHasher;

impl BuildHasher for StableState {
    type Hasher = StableHasher;

    #[inline(always)]
    fn build_hasher(&self) -> StableHasher {
        STABLE_STATE.build_hasher()
    }
}

// -----------------------------------------------------------------------------
// PassThroughState

/// A [`BuildHasher`] that forwards the written value as the hash.
///
/// Only sensible for keys that are a single fixed-width write of already
/// well-mixed bits; `TypeId` is the motivating case. Keys that feed the
/// hasher byte-wise fall back to a crude fold and will bucket poorly.
///
/// # Examples
///
/// ```
/// use core::hash::{BuildHasher, Hash, Hasher};
/// use kin_utils::hash::PassThroughState;
///
/// let mut hasher = PassThroughState.build_hasher();
/// 0xAB_u64.hash(&mut hasher);
/// assert_eq!(hasher.finish(), 0xAB);
/// ```
#[derive(Clone, Copy, Default, Debug)]
pub struct PassThroughState;

/// The hasher produced by [`PassThroughState`].
#[derive(Clone, Copy, Default, Debug)]
pub struct PassThroughHasher {
    state: u64,
}

impl Hasher for PassThroughHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        // Fallback for keys that are not one fixed-width write.
        for &byte in bytes {
            self.state = (self.state << 8) ^ byte as u64;
        }
    }

    #[inline]
    fn write_u64(&mut self, value: u64) {
        self.state = value;
    }

    #[inline]
    fn write_u128(&mut self, value: u128) {
        self.state = (value as u64) ^ ((value >> 64) as u64);
    }
}

impl BuildHasher for PassThroughState {
    type Hasher = PassThroughHasher;

    #[inline(always)]
    fn build_hasher(&self) -> PassThroughHasher {
        PassThroughHasher::default()
    }
}

// -----------------------------------------------------------------------------
// Re-export crates

pub use foldhash;
pub use hashbrown;

// -----------------------------------------------------------------------------
// Tests
