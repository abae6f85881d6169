use alloc::alloc::{alloc, dealloc, handle_alloc_error};
use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;
use core::ptr::NonNull;

use super::ref_list::Reference;

// -----------------------------------------------------------------------------
// Layout constants

/// Slots per page. Pages are never released back while the pool lives, so
/// retained memory is bounded by the high-water mark per size class.
const PAGE_SLOTS: usize = 1024;

/// Words of slot header: embedded length and capacity.
const HEADER_WORDS: usize = 2;

/// Pointer words per stored reference.
const WORDS_PER_REF: usize = size_of::<Reference>() / size_of::<usize>();

const _: () = assert!(size_of::<Reference>() == 2 * size_of::<usize>());

// -----------------------------------------------------------------------------
// Page

/// One fixed-stride arena page.
///
/// Every slot of a page holds a reference list of the same capacity
/// (`elem_size`). Free slots are threaded into a LIFO list through their
/// first word.
struct Page {
    base: NonNull<usize>,
    /// List capacity of every slot in this page, in references.
    elem_size: u32,
    /// Slots handed out from the tail of the page so far.
    elem_count: u32,
    /// Head of the free-slot list, `-1` when empty.
    free_list: i32,
}

impl Page {
    /// Slot stride in words for the given list capacity.
    #[inline]
    const fn stride(capacity: usize) -> usize {
        HEADER_WORDS + capacity * WORDS_PER_REF
    }

    fn layout(capacity: usize) -> Layout {
        let Ok(layout) = Layout::array::<usize>(Self::stride(capacity) * PAGE_SLOTS) else {
            panic!("reference list capacity overflows the page layout");
        };
        layout
    }

    fn new(capacity: usize) -> Self {
        let layout = Self::layout(capacity);
        // SAFETY: the layout is never zero-sized (HEADER_WORDS > 0).
        let base = unsafe { alloc(layout) };
        let Some(base) = NonNull::new(base.cast::<usize>()) else {
            handle_alloc_error(layout);
        };
        Self {
            base,
            elem_size: capacity as u32,
            elem_count: 0,
            free_list: -1,
        }
    }

    /// Pointer to the slot at `index`.
    ///
    /// # Safety
    /// - `index < PAGE_SLOTS`.
    #[inline]
    unsafe fn slot(&self, index: usize) -> NonNull<usize> {
        debug_assert!(index < PAGE_SLOTS);
        unsafe { self.base.add(index * Self::stride(self.elem_size as usize)) }
    }

    /// Whether `slot` points into this page.
    fn owns(&self, slot: NonNull<usize>) -> bool {
        let start = self.base.as_ptr().addr();
        let bytes = Self::stride(self.elem_size as usize) * PAGE_SLOTS * size_of::<usize>();
        let addr = slot.as_ptr().addr();
        start <= addr && addr < start + bytes
    }
}

// -----------------------------------------------------------------------------
// RefListPool

/// Slab allocator for reference list backing arrays.
///
/// Lists are bimodal (a couple of references per entity typically, dozens
/// rarely) and churn heavily, so each capacity class gets dense fixed-stride
/// pages with O(1) free-slot reuse instead of per-list allocator calls.
///
/// The pool is owned by the world; dropping the world releases the pages.
pub(crate) struct RefListPool {
    pages: Vec<Page>,
}

// SAFETY: the pool is plain memory plus bookkeeping; it is only ever mutated
// through `&mut` access.
unsafe impl Send for RefListPool {}
unsafe impl Sync for RefListPool {}

impl Debug for RefListPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RefListPool")
            .field("pages", &self.pages.len())
            .finish()
    }
}

impl Drop for RefListPool {
    fn drop(&mut self) {
        for page in &self.pages {
            // SAFETY: allocated in `Page::new` with the identical layout.
            unsafe {
                dealloc(
                    page.base.as_ptr().cast(),
                    Page::layout(page.elem_size as usize),
                );
            }
        }
    }
}

impl RefListPool {
    pub const fn new() -> Self {
        Self { pages: Vec::new() }
    }

    /// Hands out a slot able to hold `capacity` references.
    ///
    /// The slot's embedded length is zero and its embedded capacity is
    /// `capacity`. Free slots are preferred over growing a page; a new page
    /// is allocated only when every page of this capacity class is full.
    pub fn allocate(&mut self, capacity: usize) -> NonNull<usize> {
        let found = self.pages.iter_mut().position(|page| {
            page.elem_size as usize == capacity
                && ((page.elem_count as usize) < PAGE_SLOTS || page.free_list != -1)
        });

        let page = match found {
            Some(index) => &mut self.pages[index],
            None => {
                self.pages.push(Page::new(capacity));
                let last = self.pages.len() - 1;
                &mut self.pages[last]
            }
        };

        let index = if page.free_list != -1 {
            let index = page.free_list as usize;
            // SAFETY: indices on the free list were handed out before.
            page.free_list = unsafe { page.slot(index).read() } as i32;
            index
        } else {
            let index = page.elem_count as usize;
            page.elem_count += 1;
            index
        };

        // SAFETY: `index` is in bounds by either branch above.
        let slot = unsafe { page.slot(index) };
        unsafe {
            slot.write(0);
            slot.add(1).write(capacity);
        }
        slot
    }

    /// Returns a slot to its page's free list.
    ///
    /// # Panics
    ///
    /// Panics if `slot` does not belong to any page; a capacity mismatch
    /// between the slot and its page is a fault caught in debug builds.
    pub fn free(&mut self, slot: NonNull<usize>) {
        let Some(page) = self.pages.iter_mut().find(|page| page.owns(slot)) else {
            panic!("free received an address that does not belong to any page");
        };

        debug_assert_eq!(
            unsafe { slot.add(1).read() },
            page.elem_size as usize,
            "slot capacity does not match its page",
        );

        let stride_bytes = Page::stride(page.elem_size as usize) * size_of::<usize>();
        let index = (slot.as_ptr().addr() - page.base.as_ptr().addr()) / stride_bytes;

        // Thread the old head through the slot's first word. `-1` survives
        // the round trip via sign extension.
        unsafe {
            slot.write(page.free_list as usize);
        }
        page.free_list = index as i32;
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{PAGE_SLOTS, Page, RefListPool};

    #[test]
    fn allocate_initializes_header() {
        let mut pool = RefListPool::new();

        let slot = pool.allocate(4);
        unsafe {
            assert_eq!(slot.read(), 0);
            assert_eq!(slot.add(1).read(), 4);
        }
    }

    #[test]
    fn free_slots_are_reused_lifo() {
        let mut pool = RefListPool::new();

        let a = pool.allocate(4);
        let b = pool.allocate(4);
        assert_ne!(a, b);

        pool.free(a);
        pool.free(b);

        // Most recently freed first.
        assert_eq!(pool.allocate(4), b);
        assert_eq!(pool.allocate(4), a);
    }

    #[test]
    fn size_classes_use_distinct_pages() {
        let mut pool = RefListPool::new();

        let _ = pool.allocate(4);
        let _ = pool.allocate(8);
        assert_eq!(pool.pages.len(), 2);

        // Another small list fits the existing page.
        let _ = pool.allocate(4);
        assert_eq!(pool.pages.len(), 2);
    }

    #[test]
    fn full_page_grows_a_sibling() {
        let mut pool = RefListPool::new();

        for _ in 0..PAGE_SLOTS {
            let _ = pool.allocate(4);
        }
        assert_eq!(pool.pages.len(), 1);

        let _ = pool.allocate(4);
        assert_eq!(pool.pages.len(), 2);
    }

    #[test]
    fn slot_addresses_stay_within_the_page() {
        let mut pool = RefListPool::new();

        let slot = pool.allocate(4);
        assert!(pool.pages[0].owns(slot));

        let stride = Page::stride(4);
        let last = unsafe { pool.pages[0].slot(PAGE_SLOTS - 1) };
        assert!(pool.pages[0].owns(last));
        assert!(!pool.pages[0].owns(unsafe { last.add(stride) }));
    }

    #[test]
    #[should_panic(expected = "does not belong to any page")]
    fn foreign_address_is_rejected() {
        let mut pool = RefListPool::new();
        let _ = pool.allocate(4);

        let foreign = 0xF000usize;
        pool.free(core::ptr::NonNull::new(foreign as *mut usize).unwrap());
    }
}
