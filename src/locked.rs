use std::{
  alloc::{GlobalAlloc, Layout},
  ptr::{self, NonNull},
  sync::{Mutex, MutexGuard},
};

use crate::{heap::Heap, segment::SegmentProvider, tag::WORD_SIZE};

/// Largest alignment a [`LockedHeap`] can hand out. Payloads start one tag
/// past a block-aligned header, so only word alignment is guaranteed.
pub const MAX_ALIGN: usize = WORD_SIZE;

/// A [`Heap`] behind a [`Mutex`], so it can be shared between threads and
/// used through [`GlobalAlloc`].
///
/// Every operation takes the lock for its whole duration. A poisoned lock
/// makes allocations fail and frees leak.
///
/// Layouts aligned to more than [`MAX_ALIGN`] get a null pointer. Standard
/// library types such as `u128` or hash tables need 16 bytes on x86_64, so a
/// `LockedHeap` is not usable as a `#[global_allocator]` there. Use it for
/// explicit allocations whose alignment is known to be at most one word.
///
/// ```rust
/// use std::alloc::{GlobalAlloc, Layout};
///
/// use tagheap::{DataSegment, Heap, HeapConfig, LockedHeap};
///
/// let segment = DataSegment::with_capacity(1 << 20).unwrap();
/// let heap = LockedHeap::new(Heap::init(segment, HeapConfig::default()).unwrap());
///
/// unsafe {
///   let layout = Layout::array::<u64>(4).unwrap();
///   let address = heap.alloc(layout);
///   assert!(!address.is_null());
///   heap.dealloc(address, layout);
/// }
/// ```
pub struct LockedHeap<S: SegmentProvider> {
  heap: Mutex<Heap<S>>,
}

impl<S: SegmentProvider> LockedHeap<S> {
  pub fn new(heap: Heap<S>) -> Self {
    Self {
      heap: Mutex::new(heap),
    }
  }

  /// Locks the heap for direct use, for instance to [`Heap::check`] it.
  pub fn lock(&self) -> Option<MutexGuard<'_, Heap<S>>> {
    self.heap.lock().ok()
  }

  pub fn into_inner(self) -> Option<Heap<S>> {
    self.heap.into_inner().ok()
  }
}

#[inline]
fn as_raw(address: Option<NonNull<u8>>) -> *mut u8 {
  address.map_or(ptr::null_mut(), NonNull::as_ptr)
}

unsafe impl<S: SegmentProvider + Send> GlobalAlloc for LockedHeap<S> {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > MAX_ALIGN {
      return ptr::null_mut();
    }
    match self.heap.lock() {
      Ok(mut heap) => as_raw(heap.allocate(layout.size())),
      Err(_) => ptr::null_mut(),
    }
  }

  unsafe fn alloc_zeroed(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > MAX_ALIGN {
      return ptr::null_mut();
    }
    match self.heap.lock() {
      Ok(mut heap) => as_raw(heap.zeroed_allocate(1, layout.size())),
      Err(_) => ptr::null_mut(),
    }
  }

  unsafe fn dealloc(
    &self,
    address: *mut u8,
    _layout: Layout,
  ) {
    if let Ok(mut heap) = self.heap.lock() {
      unsafe { heap.free(NonNull::new(address)) }
    }
  }

  unsafe fn realloc(
    &self,
    address: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    if layout.align() > MAX_ALIGN {
      return ptr::null_mut();
    }
    match self.heap.lock() {
      Ok(mut heap) => as_raw(unsafe { heap.resize(NonNull::new(address), new_size) }),
      Err(_) => ptr::null_mut(),
    }
  }
}
