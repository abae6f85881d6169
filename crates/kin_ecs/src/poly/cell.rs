use core::fmt::Debug;
use core::mem::ManuallyDrop;
use core::ptr::{self, NonNull};

use kin_ptr::TaggedPtr;

use crate::hierarchy::{Deleter, Polymorphic};

use super::pool::RefListPool;
use super::ref_list::{RefList, Reference};

// -----------------------------------------------------------------------------
// Tag bits

/// Set when the cell holds a reference in place of an inline value.
const REF_BIT: u8 = 1;

/// Set when the cell carries an associated reference list.
const LIST_BIT: u8 = 2;

// -----------------------------------------------------------------------------
// CellBuffer

/// The inline buffer of a cell: `max(size_of::<T>(), one pointer)` bytes,
/// aligned for both `T` and a pointer. Which lane is live depends on the
/// cell's tag word.
#[repr(C)]
union CellBuffer<T> {
    /// Live while the cell holds a value.
    value: ManuallyDrop<T>,
    /// Live in the single-reference state (the reference's pointer lives in
    /// the tag word).
    deleter: Deleter,
    /// Live in the reference-plus-list state (the tag word then carries a
    /// referenced component instead).
    list: NonNull<usize>,
}

// -----------------------------------------------------------------------------
// PolyCell

/// Storage for the polymorphic components of one (entity, concrete type)
/// pair.
///
/// A cell is always in exactly one of four states, encoded in the two low
/// bits of its tag word:
///
/// | state            | buffer     | tag word (high bits)            |
/// |------------------|------------|---------------------------------|
/// | only value       | value of T | null-list sentinel              |
/// | only reference   | deleter    | referenced component            |
/// | value + list     | value of T | list base                       |
/// | reference + list | list base  | any component from the list     |
///
/// One value-or-reference is always stored in the cell itself, so the
/// single-component case is served without touching the list. When a list
/// exists it holds at least two references, one of which duplicates the
/// cell's own value (if any), so iteration needs no special cases.
///
/// Cells are not movable once installed: sibling storages and the cell's own
/// list hold pointers into it. The storage arena never relocates them.
#[repr(C)]
pub(crate) struct PolyCell<T: Polymorphic> {
    buffer: CellBuffer<T>,
    tag: TaggedPtr,
}

impl<T: Polymorphic> PolyCell<T> {
    /// The tag encoding steals the two low pointer bits.
    const TAG_ALIGNED: () = assert!(
        align_of::<T>() >= 4,
        "polymorphic component types must be at least 4-byte aligned",
    );

    // -- construction ---------------------------------------------------------

    /// A cell holding only `value`.
    pub fn new_value(value: T) -> Self {
        let _ = Self::TAG_ALIGNED;
        Self {
            buffer: CellBuffer {
                value: ManuallyDrop::new(value),
            },
            // SAFETY: the sentinel is pointer-word aligned.
            tag: unsafe { TaggedPtr::new(RefList::null().base().cast(), 0) },
        }
    }

    /// A cell holding only `reference`.
    pub fn new_ref(reference: Reference) -> Self {
        let _ = Self::TAG_ALIGNED;
        Self {
            buffer: CellBuffer {
                deleter: reference.deleter,
            },
            // SAFETY: referenced components are at least 4-byte aligned.
            tag: unsafe { TaggedPtr::new(reference.ptr, REF_BIT) },
        }
    }

    // -- state ----------------------------------------------------------------

    #[inline]
    pub fn holds_value(&self) -> bool {
        !self.tag.has(REF_BIT)
    }

    #[inline]
    pub fn has_list(&self) -> bool {
        self.tag.has(LIST_BIT)
    }

    /// Address of the inline buffer.
    #[inline]
    pub fn value_ptr(&self) -> NonNull<u8> {
        NonNull::from_ref(&self.buffer).cast()
    }

    /// Address of the inline buffer, derived from exclusive access.
    #[inline]
    fn value_ptr_mut(&mut self) -> NonNull<u8> {
        NonNull::from_mut(&mut self.buffer).cast()
    }

    /// Address of whichever component the cell currently carries: the inline
    /// value, or the referenced descendant.
    ///
    /// The two-element table keeps this branchless; both lanes are plain
    /// address computations, so building the untaken one is free and safe.
    #[inline]
    pub fn any_ptr(&self) -> NonNull<u8> {
        // SAFETY: every state stores an aligned address in the tag word.
        let choice = [self.value_ptr(), unsafe { self.tag.addr() }];
        choice[self.tag.has(REF_BIT) as usize]
    }

    // -- raw state transitions ------------------------------------------------

    /// The associated list.
    ///
    /// Must only be called when [`has_list`](Self::has_list) holds; where the
    /// base lives depends on whether a value is present.
    fn list(&self) -> RefList {
        debug_assert!(self.has_list());
        let base = if self.tag.has(REF_BIT) {
            // SAFETY: reference + list keeps the base in the buffer.
            unsafe { self.buffer.list }
        } else {
            // SAFETY: value + list keeps the base in the tag word.
            unsafe { self.tag.addr().cast() }
        };
        RefList::from_base(base)
    }

    /// Stores `list` into whichever lane the current state assigns to it and
    /// raises the list bit.
    fn set_list(&mut self, list: RefList) {
        if self.tag.has(REF_BIT) {
            self.buffer.list = list.base();
        } else {
            // SAFETY: slot bases are pointer-word aligned.
            unsafe {
                self.tag.set_addr(list.base().cast());
            }
        }
        self.tag.set(LIST_BIT);
    }

    /// The full reference in the single-reference state.
    fn single_ref(&self) -> Reference {
        debug_assert!(self.tag.has(REF_BIT) && !self.has_list());
        Reference {
            // SAFETY: only reference stores the component in the tag word...
            ptr: unsafe { self.tag.addr() },
            // SAFETY: ...and its deleter in the buffer.
            deleter: unsafe { self.buffer.deleter },
        }
    }

    /// Rewrites the cell as a lone reference, dropping all other tag state.
    fn set_single_ref(&mut self, reference: Reference) {
        // SAFETY: referenced components are at least 4-byte aligned.
        self.tag = unsafe { TaggedPtr::new(reference.ptr, REF_BIT) };
        self.buffer.deleter = reference.deleter;
    }

    /// Rewrites the tag as "value present, no list".
    fn set_only_value(&mut self) {
        // SAFETY: the sentinel is pointer-word aligned.
        self.tag = unsafe { TaggedPtr::new(RefList::null().base().cast(), 0) };
    }

    /// In the reference-plus-list state, repoints the tagged reference.
    fn replace_listed_ref(&mut self, ptr: NonNull<u8>) {
        // SAFETY: referenced components are at least 4-byte aligned.
        self.tag = unsafe { TaggedPtr::new(ptr, REF_BIT | LIST_BIT) };
    }

    /// The self-reference: the inline value and the deleter of `T`.
    fn self_reference(&mut self) -> Reference {
        Reference {
            ptr: self.value_ptr_mut(),
            deleter: Deleter::of::<T>(),
        }
    }

    /// Creates the list, seeded with the cell's current value-or-reference.
    fn create_list(&mut self, pool: &mut RefListPool) -> RefList {
        let mut list = RefList::null();
        if self.tag.has(REF_BIT) {
            list.push(self.single_ref(), pool);
        } else {
            let seed = self.self_reference();
            list.push(seed, pool);
        }
        self.set_list(list);
        list
    }

    /// Folds a single surviving reference back into the cell after its list
    /// shrank to one entry.
    fn collapse_list(&mut self, survivor: Reference) {
        if self.tag.has(REF_BIT) {
            self.set_single_ref(survivor);
        } else {
            self.set_only_value();
        }
    }

    // -- operations -----------------------------------------------------------

    /// Adds a reference to a descendant's value.
    ///
    /// Callers must not insert the same pointer twice; the hierarchy dispatch
    /// never does, because the parent set is de-duplicated up front.
    pub fn add_ref(&mut self, reference: Reference, pool: &mut RefListPool) {
        debug_assert_ne!(
            reference.ptr,
            self.value_ptr(),
            "add_ref must not receive a reference to the cell's own value",
        );
        let mut list = if self.has_list() {
            self.list()
        } else {
            self.create_list(pool)
        };
        list.push(reference, pool);
        self.set_list(list);
    }

    /// Deletes the reference matching `ptr`.
    ///
    /// Returns whether the cell is now empty and must be removed from its
    /// storage. Deleting a pointer that is not referenced is a fault caught
    /// in debug builds.
    pub fn delete_ref(&mut self, ptr: NonNull<u8>, pool: &mut RefListPool) -> bool {
        debug_assert_ne!(
            ptr,
            self.value_ptr(),
            "delete_ref must not receive the cell's own value",
        );
        if self.has_list() {
            let deleted = self.delete_from_list(self.list(), ptr, pool);
            debug_assert!(deleted, "delete_ref got a pointer that is not referenced");
            let _ = deleted;
            false
        } else {
            debug_assert_eq!(
                self.any_ptr(),
                ptr,
                "delete_ref got a pointer that is not referenced",
            );
            // Empty iff the cell was a lone reference.
            self.tag.has(REF_BIT)
        }
    }

    /// Swap-and-pop removal from the list, collapsing back to a lone
    /// value-or-reference when one entry survives.
    fn delete_from_list(
        &mut self,
        mut list: RefList,
        ptr: NonNull<u8>,
        pool: &mut RefListPool,
    ) -> bool {
        let len = list.len();
        for index in 0..len {
            if list.get(index).ptr != ptr {
                continue;
            }

            list.swap(index, len - 1);
            list.pop(pool);

            if len == 2 {
                let survivor = list.get(0);
                self.collapse_list(survivor);
                // Emptying the list releases its slot.
                list.pop(pool);
            } else {
                self.set_list(list);
            }
            return true;
        }
        false
    }

    /// Constructs the concrete value inside a cell currently holding only
    /// references.
    ///
    /// The held reference moves to the list (created on demand) and the
    /// self-reference is appended behind it.
    pub fn construct_value(&mut self, value: T, pool: &mut RefListPool) {
        debug_assert!(
            !self.holds_value(),
            "construct_value called while already holding a value",
        );
        let mut list = if self.has_list() {
            self.list()
        } else {
            self.create_list(pool)
        };

        // The local copy of the list base is what keeps this sound: the
        // buffer lane it lived in is about to be overwritten by the value.
        // SAFETY: the buffer is sized and aligned for `T`.
        unsafe {
            ptr::write(self.value_ptr_mut().cast::<T>().as_ptr(), value);
        }
        self.tag.clear(REF_BIT);

        let own = self.self_reference();
        list.push(own, pool);
        self.set_list(list);
    }

    /// Destroys the held value.
    ///
    /// Back-references in ancestor storages must already have been erased.
    /// Returns whether the cell is now empty and must be removed.
    pub fn destroy_value(&mut self, pool: &mut RefListPool) -> bool {
        debug_assert!(
            self.holds_value(),
            "destroy_value called while not holding a value",
        );
        // SAFETY: the buffer holds an initialized value.
        unsafe {
            ptr::drop_in_place(self.value_ptr_mut().cast::<T>().as_ptr());
        }

        if self.has_list() {
            // The list holds the self-reference plus at least one other.
            let list = self.list();
            self.tag.set(REF_BIT);

            let own = self.value_ptr_mut();
            let deleted = self.delete_from_list(list, own, pool);
            debug_assert!(deleted, "self reference was not present inside the list");
            let _ = deleted;

            if self.has_list() {
                // Keep the tagged reference pointing at a live entry.
                let first = self.list().get(0).ptr;
                self.replace_listed_ref(first);
            }
            false
        } else {
            // No list, no references: flag the value gone so drop skips it.
            self.tag.set(REF_BIT);
            true
        }
    }

    /// The most recently added reference to another cell's value, if any.
    ///
    /// Entity teardown deletes these back to front; each deletion re-reads
    /// the cell, so no list borrow survives a cascade step.
    pub fn last_foreign_ref(&self) -> Option<Reference> {
        if self.has_list() {
            let list = self.list();
            for index in (0..list.len()).rev() {
                let reference = list.get(index);
                if reference.ptr != self.value_ptr() {
                    return Some(reference);
                }
            }
            None
        } else if self.tag.has(REF_BIT) {
            Some(self.single_ref())
        } else {
            None
        }
    }

    /// Iteration base pointer and half-open offset bounds.
    ///
    /// List states iterate the list; lone states use the reserved offset −1,
    /// meaning "the base pointer itself is the payload".
    pub fn iter_bounds(&self) -> (NonNull<u8>, isize, isize) {
        if self.has_list() {
            let list = self.list();
            (list.refs().cast(), 0, list.len() as isize)
        } else {
            (self.any_ptr(), -1, 0)
        }
    }

    /// The number of references the cell tracks.
    #[cfg(test)]
    pub fn ref_count(&self) -> usize {
        if self.has_list() { self.list().len() } else { 1 }
    }

    /// The associated list as a slice, if one exists.
    #[cfg(test)]
    pub fn list_slice(&self) -> Option<&[Reference]> {
        self.has_list().then(|| {
            let refs = self.list();
            // SAFETY: live for the borrow of self; nothing mutates the list
            // while the slice is held.
            unsafe { core::slice::from_raw_parts(refs.refs().as_ptr(), refs.len()) }
        })
    }
}

impl<T: Polymorphic> Drop for PolyCell<T> {
    fn drop(&mut self) {
        // Only a still-held value needs work, which happens when a whole
        // storage is torn down. Erase paths leave the cell in a reference
        // state before removing it, and any list slot is reclaimed wholesale
        // with the pool.
        if self.holds_value() {
            // SAFETY: the buffer holds an initialized value.
            unsafe {
                ptr::drop_in_place(self.value_ptr_mut().cast::<T>().as_ptr());
            }
        }
    }
}

impl<T: Polymorphic> Debug for PolyCell<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PolyCell")
            .field("holds_value", &self.holds_value())
            .field("has_list", &self.has_list())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests
