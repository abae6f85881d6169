use alloc::alloc::{alloc, dealloc, handle_alloc_error};
use alloc::vec::Vec;
use core::alloc::Layout;
use core::any::Any;
use core::fmt::Debug;
use core::ptr::{self, NonNull};

use kin_utils::hash::HashMap;

use crate::entity::Entity;
use crate::hierarchy::{ParentEdge, Polymorphic, parent_edges};
use crate::world::World;

use super::cell::PolyCell;

// -----------------------------------------------------------------------------
// PolyStorage

/// Cells per arena page.
///
/// Pages are raw fixed-size allocations that are never reallocated or moved,
/// which is what keeps cell addresses stable for the cell's whole lifetime.
const CELLS_PER_PAGE: usize = 64;

/// The polymorphic storage of one concrete component type.
///
/// Maps entities to [`PolyCell`]s held in a paged arena, with freed slots
/// recycled LIFO. The storage also caches the transitive parent set of its
/// type; the world fans out over those edges on emplace and erase.
pub(crate) struct PolyStorage<T: Polymorphic> {
    pages: Vec<NonNull<PolyCell<T>>>,
    mapper: HashMap<Entity, u32>,
    free: Vec<u32>,
    /// Transitive, de-duplicated ancestors with projection offsets.
    edges: Vec<ParentEdge>,
}

// SAFETY: the storage owns its cells and is only mutated through `&mut`;
// component types are `Send + Sync` by the `Component` bound.
unsafe impl<T: Polymorphic> Send for PolyStorage<T> {}
unsafe impl<T: Polymorphic> Sync for PolyStorage<T> {}

impl<T: Polymorphic> Debug for PolyStorage<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PolyStorage")
            .field("entities", &self.mapper.keys())
            .finish()
    }
}

impl<T: Polymorphic> Drop for PolyStorage<T> {
    fn drop(&mut self) {
        self.mapper.values().for_each(|&index| unsafe {
            ptr::drop_in_place(self.slot_ptr(index).as_ptr());
        });
        for page in &self.pages {
            // SAFETY: allocated in `reserve_slot` with the identical layout.
            unsafe {
                dealloc(page.as_ptr().cast(), Self::page_layout());
            }
        }
    }
}

impl<T: Polymorphic> PolyStorage<T> {
    fn page_layout() -> Layout {
        let Ok(layout) = Layout::array::<PolyCell<T>>(CELLS_PER_PAGE) else {
            panic!("component cell layout overflows the page size");
        };
        layout
    }

    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            mapper: HashMap::default(),
            free: Vec::new(),
            edges: parent_edges::<T>(),
        }
    }

    /// The transitive parent set of `T`.
    #[inline]
    pub fn edges(&self) -> &[ParentEdge] {
        &self.edges
    }

    /// Address of the slot at `index`.
    ///
    /// # Safety
    /// - `index` was handed out by [`grow`](Self::grow) or recycled through
    ///   the free list.
    #[inline]
    unsafe fn slot_ptr(&self, index: u32) -> NonNull<PolyCell<T>> {
        debug_assert!((index as usize) < self.pages.len() * CELLS_PER_PAGE);
        let page = index as usize / CELLS_PER_PAGE;
        let slot = index as usize % CELLS_PER_PAGE;
        // SAFETY: handed-out indices lie within an allocated page.
        unsafe { self.pages[page].add(slot) }
    }

    /// Whether the entity has a cell here, in any state.
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.mapper.contains_key(&entity)
    }

    /// Whether the entity's cell holds a value of exactly `T`.
    #[inline]
    pub fn contains_value(&self, entity: Entity) -> bool {
        self.cell(entity).is_some_and(PolyCell::holds_value)
    }

    #[inline]
    pub fn cell(&self, entity: Entity) -> Option<&PolyCell<T>> {
        let index = *self.mapper.get(&entity)?;
        // SAFETY: mapped indices point at initialized cells.
        Some(unsafe { self.slot_ptr(index).as_ref() })
    }

    #[inline]
    pub fn cell_mut(&mut self, entity: Entity) -> Option<&mut PolyCell<T>> {
        let index = *self.mapper.get(&entity)?;
        // SAFETY: mapped indices point at initialized cells; `&mut self`
        // makes the access exclusive.
        Some(unsafe { self.slot_ptr(index).as_mut() })
    }

    /// Installs `cell` for `entity` and returns its stable address.
    ///
    /// The entity must not already have a cell here.
    pub fn insert_cell(&mut self, entity: Entity, cell: PolyCell<T>) -> NonNull<PolyCell<T>> {
        debug_assert!(!self.mapper.contains_key(&entity));

        let index = self.free.pop().unwrap_or_else(|| self.grow());
        // SAFETY: the slot is unoccupied; the write installs the cell at its
        // final address.
        let slot = unsafe { self.slot_ptr(index) };
        unsafe {
            slot.write(cell);
        }
        self.mapper.insert(entity, index);
        slot
    }

    /// Grows the arena by one page and returns its first slot; the rest go
    /// onto the free list.
    #[cold]
    #[inline(never)]
    fn grow(&mut self) -> u32 {
        let layout = Self::page_layout();
        // SAFETY: cells are never zero-sized (two pointer words minimum).
        let base = unsafe { alloc(layout) };
        let Some(base) = NonNull::new(base.cast::<PolyCell<T>>()) else {
            handle_alloc_error(layout);
        };

        let first = (self.pages.len() * CELLS_PER_PAGE) as u32;
        self.pages.push(base);

        // Reverse order to keep smaller indices near
        // the end for better LIFO performance
        ((first + 1)..(first + CELLS_PER_PAGE as u32))
            .rev()
            .for_each(|index| {
                self.free.push(index);
            });
        first
    }

    /// Removes the cell for `entity`, recycling its slot.
    ///
    /// The cell must already be empty (no value, no references); remove paths
    /// drive it there before calling this.
    pub fn remove_cell(&mut self, entity: Entity) {
        let Some(index) = self.mapper.remove(&entity) else {
            debug_assert!(false, "remove_cell for an entity without a cell");
            return;
        };
        // SAFETY: the index was mapped, so the cell is initialized.
        unsafe {
            ptr::drop_in_place(self.slot_ptr(index).as_ptr());
        }
        self.free.push(index);
    }
}

// -----------------------------------------------------------------------------
// ErasedStorage

/// The type-erased face a [`PolyStorage`] presents to the world registry.
pub(crate) trait ErasedStorage: Any + Send + Sync {
    /// Whether the entity has a cell here, in any state.
    fn contains(&self, entity: Entity) -> bool;

    /// The monomorphized entity-teardown entry point for this storage's
    /// concrete type.
    fn destroy_fn(&self) -> fn(&mut World, Entity) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Polymorphic> ErasedStorage for PolyStorage<T> {
    #[inline]
    fn contains(&self, entity: Entity) -> bool {
        PolyStorage::contains(self, entity)
    }

    fn destroy_fn(&self) -> fn(&mut World, Entity) -> bool {
        crate::world::remove_in::<T>
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// -----------------------------------------------------------------------------
// Tests
