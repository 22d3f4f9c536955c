use std::ptr::{self, NonNull};

use crate::{
  Pointer,
  block::{Block, Chain},
  config::{DiagnosticLevel, HeapConfig},
  error::HeapError,
  search::{Placement, SearchMode},
  segment::SegmentProvider,
  tag::{BLOCK_UNIT, MIN_BLOCK_SIZE, Status, Tag, WORD_SIZE},
};

/// Block size needed to hand out `size` payload bytes, or `None` on overflow.
#[inline]
pub(crate) fn block_size_for(size: usize) -> Option<usize> {
  size
    .checked_add(2 * WORD_SIZE)?
    .checked_next_multiple_of(BLOCK_UNIT)
}

/// First block header at or after the physical start, leaving room for the
/// start sentinel right below it.
#[inline]
fn logical_start(physical_start: NonNull<u8>) -> NonNull<u8> {
  let addr = physical_start.as_ptr().addr();
  let aligned = align_down!(addr, BLOCK_UNIT) + BLOCK_UNIT;
  unsafe { physical_start.add(aligned - addr) }
}

/// Last block-aligned address that still has room for the end sentinel below
/// the physical end.
#[inline]
fn logical_end(physical_end: NonNull<u8>) -> NonNull<u8> {
  let addr = physical_end.as_ptr().addr();
  let aligned = align_down!(addr - WORD_SIZE, BLOCK_UNIT);
  unsafe { physical_end.sub(addr - aligned) }
}

#[inline]
fn distance(
  from: NonNull<u8>,
  to: NonNull<u8>,
) -> usize {
  to.as_ptr().addr() - from.as_ptr().addr()
}

/// A boundary-tagged heap living entirely inside one [`SegmentProvider`].
///
/// ```text
///         start sentinel                                        end sentinel
///               │                                                     │
///   physical    │  logical                                  logical   │   physical
///     start     │   start                                     end     │     end
///       │       │     │                                         │     │      │
///       ▼       ▼     ▼                                         ▼     ▼      ▼
///       ┌─────┬───┬───────────┬───────────┬─────────────────────┬───┬──────┐
///       │ ??? │ A │ H  ... F  │ h  ...  f │ H       ...       F │ A │ ???  │
///       └─────┴───┴───────────┴───────────┴─────────────────────┴───┴──────┘
///                  allocated      free          allocated
/// ```
///
/// Header and footer of a block hold the same [`Tag`]. Free neighbours are
/// merged as soon as a block is freed, so no two free blocks are ever
/// adjacent. The only state outside the segment is the logical bounds, the
/// configuration and the next-fit cursor.
///
/// The heap is single-threaded. Wrap it in [`crate::LockedHeap`] (or any
/// other lock) to share it.
pub struct Heap<S: SegmentProvider> {
  segment: S,
  placement: Placement,
  pub(crate) diagnostics: DiagnosticLevel,
  chunk_size: usize,
  shrink_threshold: usize,
  page_size: usize,
  start: NonNull<u8>,
  end: NonNull<u8>,
  /// Logical end right after initialization. Trimming never goes below it.
  floor: NonNull<u8>,
}

// All pointers point into the segment, which the heap owns.
unsafe impl<S: SegmentProvider + Send> Send for Heap<S> {}

impl<S: SegmentProvider> Heap<S> {
  /// Takes ownership of a fresh segment and lays out an empty heap in it: one
  /// chunk worth of memory, a single free block and the two sentinels.
  pub fn init(
    mut segment: S,
    config: HeapConfig,
  ) -> Result<Self, HeapError> {
    config.validate()?;

    let page_size = segment.page_size();
    if page_size == 0 {
      return Err(HeapError::ZeroPageSize);
    }

    let committed = segment.committed();
    if committed != 0 {
      return Err(HeapError::SegmentNotClean { committed });
    }

    segment.grow(config.chunk_size)?;

    let (physical_start, physical_end) = segment.current_bounds();
    let start = logical_start(physical_start);
    let end = logical_end(physical_end);
    if end <= start || distance(start, end) < MIN_BLOCK_SIZE {
      return Err(HeapError::SegmentTooSmall {
        committed: segment.committed(),
      });
    }

    unsafe {
      Tag::SENTINEL.store(start.sub(WORD_SIZE));
      Block::at(start).write(distance(start, end), Status::Free);
      Tag::SENTINEL.store(end);
    }

    let heap = Self {
      segment,
      placement: Placement::new(config.search_mode),
      diagnostics: config.diagnostics,
      chunk_size: config.chunk_size,
      shrink_threshold: config.shrink_threshold,
      page_size,
      start,
      end,
      floor: end,
    };

    diag!(
      heap,
      Info,
      "init: {} heap, {:#x} bytes at {:?}, page size {}",
      heap.placement.mode(),
      distance(start, end),
      start,
      page_size
    );

    Ok(heap)
  }

  /// Allocates at least `size` bytes and returns the payload address.
  ///
  /// Returns `None` if `size` is zero or if the segment refuses to grow. In
  /// the latter case the heap is left exactly as it was.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Pointer<u8> {
    diag!(self, Info, "allocate({size:#x})");

    if size == 0 {
      return None;
    }

    let blocksize = block_size_for(size)?;
    let chain = self.chain();
    let block = match self.placement.find(&chain, blocksize) {
      Some(block) => block,
      None => self.extend(blocksize)?,
    };

    unsafe { self.place(block, blocksize) };

    diag!(self, Verbose, "  -> block {:?} of {:#x} bytes", block.address(), block.size());

    Some(block.payload())
  }

  /// Allocates `count * size` zeroed bytes. `None` if the product overflows
  /// or the allocation fails.
  pub fn zeroed_allocate(
    &mut self,
    count: usize,
    size: usize,
  ) -> Pointer<u8> {
    diag!(self, Info, "zeroed_allocate({count:#x}, {size:#x})");

    let total = count.checked_mul(size)?;
    let payload = self.allocate(total)?;
    unsafe { ptr::write_bytes(payload.as_ptr(), 0, total) };

    Some(payload)
  }

  /// Returns the block owning `payload` to the heap.
  ///
  /// `None` and pointers to blocks that are already free are ignored.
  ///
  /// # Safety
  ///
  /// `payload` must be `None` or a pointer returned by this heap that was not
  /// reused by a later allocation since it was freed.
  pub unsafe fn free(
    &mut self,
    payload: Pointer<u8>,
  ) {
    diag!(self, Info, "free({payload:?})");

    let Some(payload) = payload else {
      return;
    };

    let block = unsafe { Block::from_payload(payload) };
    if block.is_free() {
      log::warn!("free of already free block at {payload:?} ignored");
      return;
    }

    unsafe { self.release(block) };
  }

  /// Changes the size of the allocation at `payload` to `size`, keeping the
  /// contents up to the lesser of the old and new sizes.
  ///
  /// - `None` behaves as [`Heap::allocate`].
  /// - A `size` of zero behaves as [`Heap::free`] and returns `None`.
  /// - Shrinking and growing into a free neighbour happen in place.
  /// - Otherwise the contents move to a new block. If that allocation fails
  ///   the original block is left untouched and `None` is returned.
  ///
  /// # Safety
  ///
  /// Same as [`Heap::free`]. On success, the old pointer must no longer be
  /// used unless it was returned again.
  pub unsafe fn resize(
    &mut self,
    payload: Pointer<u8>,
    size: usize,
  ) -> Pointer<u8> {
    diag!(self, Info, "resize({payload:?}, {size:#x})");

    let Some(address) = payload else {
      return self.allocate(size);
    };

    if size == 0 {
      unsafe { self.free(payload) };
      return None;
    }

    let block = unsafe { Block::from_payload(address) };
    let old_size = block.size();
    let new_size = block_size_for(size)?;

    if new_size == old_size {
      return payload;
    }

    if new_size < old_size {
      diag!(self, Verbose, "  shrinking {:?} in place to {new_size:#x}", block.address());
      unsafe {
        block.write(new_size, Status::Allocated);
        let rest = block.offset(new_size);
        rest.write(old_size - new_size, Status::Allocated);
        self.release(rest);
      }
      return payload;
    }

    let next = block.next();
    let available = old_size + next.size();
    if next.is_free() && available >= new_size {
      diag!(self, Verbose, "  growing {:?} in place to {new_size:#x}", block.address());
      unsafe {
        block.write(available, Status::Allocated);
        self.placement.absorb(block, available);
        self.place(block, new_size);
      }
      return payload;
    }

    let moved = self.allocate(size)?;
    let count = (old_size - 2 * WORD_SIZE).min(size);
    unsafe {
      ptr::copy_nonoverlapping(address.as_ptr(), moved.as_ptr(), count);
      self.free(payload);
    }

    Some(moved)
  }

  pub fn set_diagnostic_level(
    &mut self,
    level: DiagnosticLevel,
  ) {
    self.diagnostics = level;
  }

  pub fn diagnostic_level(&self) -> DiagnosticLevel {
    self.diagnostics
  }

  pub fn search_mode(&self) -> SearchMode {
    self.placement.mode()
  }

  pub fn page_size(&self) -> usize {
    self.page_size
  }

  pub fn segment(&self) -> &S {
    &self.segment
  }

  /// Number of bytes between the logical start and the logical end.
  pub fn capacity(&self) -> usize {
    distance(self.start, self.end)
  }

  pub(crate) fn chain(&self) -> Chain {
    unsafe { Chain::new(Block::at(self.start), self.end) }
  }

  pub(crate) fn logical_bounds(&self) -> (NonNull<u8>, NonNull<u8>) {
    (self.start, self.end)
  }

  pub(crate) fn next_fit_cursor(&self) -> Option<NonNull<u8>> {
    self.placement.cursor().map(Block::address)
  }

  /// Turns `block` into an allocated block of `size` bytes, splitting off
  /// the rest as a free block if it can stand on its own.
  ///
  /// # Safety
  ///
  /// `block` must be a block of this heap at least `size` bytes large whose
  /// next block is not free.
  unsafe fn place(
    &mut self,
    block: Block,
    size: usize,
  ) {
    let total = block.size();

    if total >= size + MIN_BLOCK_SIZE {
      diag!(self, Verbose, "  split {:?}: {size:#x} + {:#x}", block.address(), total - size);
      unsafe {
        block.write(size, Status::Allocated);
        block.offset(size).write(total - size, Status::Free);
      }
    } else {
      unsafe { block.write(total, Status::Allocated) };
    }
  }

  /// Marks `block` free, merges it with free neighbours and trims the heap
  /// if the result is a large enough trailing block.
  ///
  /// # Safety
  ///
  /// `block` must be an allocated block of this heap.
  unsafe fn release(
    &mut self,
    mut block: Block,
  ) {
    let mut size = block.size();
    unsafe { block.write(size, Status::Free) };

    // Backwards first, so the forward merge below already starts from the
    // merged block.
    let prev = block.prev_tag();
    if prev.is_free() {
      block = block.prev();
      size += prev.size();
      diag!(self, Verbose, "  coalesce with previous block {:?}", block.address());
      unsafe { block.write(size, Status::Free) };
    }

    let next = block.next();
    if next.is_free() {
      size += next.size();
      diag!(self, Verbose, "  coalesce with next block {:?}", next.address());
      unsafe { block.write(size, Status::Free) };
    }

    self.placement.absorb(block, size);
    self.trim(block, size);
  }

  /// Gives the trailing free `block` back to the segment once it reaches the
  /// shrink threshold, keeping everything below the floor.
  fn trim(
    &mut self,
    block: Block,
    size: usize,
  ) {
    if block.addr() + size != self.end.as_ptr().addr() || size < self.shrink_threshold {
      return;
    }

    let keep = self.floor.as_ptr().addr().saturating_sub(block.addr());
    let release = size - keep;
    if release == 0 {
      return;
    }

    if let Err(err) = self.segment.shrink(release) {
      log::warn!("could not return {release:#x} bytes to the segment: {err}");
      return;
    }

    diag!(self, Verbose, "  shrink heap by {release:#x} bytes");

    unsafe {
      self.end = self.end.sub(release);
      if keep > 0 {
        block.write(keep, Status::Free);
      }
      Tag::SENTINEL.store(self.end);
    }
    self.placement.truncate(self.end);
  }

  /// Grows the segment until the trailing free block can hold `size` bytes
  /// and returns that block.
  fn extend(
    &mut self,
    size: usize,
  ) -> Option<Block> {
    loop {
      let grow_by = self.chunk_size.max(size);
      if let Err(err) = self.segment.grow(grow_by) {
        log::warn!("heap exhausted, could not grow by {grow_by:#x} bytes: {err}");
        return None;
      }

      let (_, physical_end) = self.segment.current_bounds();
      let old_end = self.end;
      let new_end = logical_end(physical_end);

      let mut block = unsafe { Block::at(old_end) };
      let mut total = distance(old_end, new_end);

      let prev = block.prev_tag();
      if prev.is_free() {
        block = block.prev();
        total += prev.size();
      }

      unsafe {
        block.write(total, Status::Free);
        Tag::SENTINEL.store(new_end);
      }
      self.end = new_end;

      diag!(
        self,
        Verbose,
        "  grew heap by {grow_by:#x} bytes, trailing free block {:?} of {total:#x} bytes",
        block.address()
      );

      if total >= size {
        return Some(block);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{check::HeapReport, dataseg::DataSegment};

  fn heap(config: HeapConfig) -> Heap<DataSegment> {
    Heap::init(DataSegment::with_capacity(1 << 20).unwrap(), config).unwrap()
  }

  fn report(heap: &Heap<DataSegment>) -> HeapReport {
    let report = heap.check().unwrap();
    assert!(report.is_consistent(), "{report}");
    report
  }

  #[test]
  fn block_sizes() {
    assert_eq!(block_size_for(1), Some(32));
    assert_eq!(block_size_for(16), Some(32));
    assert_eq!(block_size_for(17), Some(64));
    assert_eq!(block_size_for(48), Some(64));
    assert_eq!(block_size_for(usize::MAX - 8), None);
  }

  #[test]
  fn init_lays_out_one_free_block() {
    let heap = heap(HeapConfig::default());
    let report = report(&heap);

    assert_eq!(report.blocks.len(), 1);
    assert_eq!(report.free_bytes, heap.capacity());
    assert_eq!(heap.segment().committed(), 1024);

    let (start, end) = heap.logical_bounds();
    assert_eq!(start.as_ptr().addr() % BLOCK_UNIT, 0);
    assert_eq!(end.as_ptr().addr() % BLOCK_UNIT, 0);
  }

  #[test]
  fn init_rejects_used_segment() {
    let mut segment = DataSegment::with_capacity(1 << 16).unwrap();
    segment.grow(64).unwrap();

    assert!(matches!(
      Heap::init(segment, HeapConfig::default()),
      Err(HeapError::SegmentNotClean { committed: 64 })
    ));
  }

  #[test]
  fn init_rejects_bad_config() {
    let segment = DataSegment::with_capacity(1 << 16).unwrap();
    let config = HeapConfig::default().with_chunk_size(100);

    assert!(matches!(Heap::init(segment, config), Err(HeapError::InvalidConfig(_))));
  }

  #[test]
  fn init_fails_when_segment_cannot_grow() {
    let segment = DataSegment::with_capacity(4096).unwrap();
    let config = HeapConfig::default().with_chunk_size(1 << 16);

    assert!(matches!(Heap::init(segment, config), Err(HeapError::Segment(_))));
  }

  #[test]
  fn allocate_zero_returns_none() {
    let mut heap = heap(HeapConfig::default());
    assert!(heap.allocate(0).is_none());
    assert_eq!(report(&heap).blocks.len(), 1);
  }

  #[test]
  fn allocate_splits_free_block() {
    let mut heap = heap(HeapConfig::default());
    let capacity = heap.capacity();

    let p = heap.allocate(8).unwrap();
    let report = report(&heap);

    assert_eq!(report.blocks.len(), 2);
    assert_eq!(report.blocks[0].size, 32);
    assert_eq!(report.blocks[0].status, Status::Allocated);
    assert_eq!(report.blocks[1].size, capacity - 32);
    assert_eq!(p.as_ptr().addr(), heap.logical_bounds().0.as_ptr().addr() + WORD_SIZE);
  }

  #[test]
  fn exact_fit_takes_whole_block() {
    let mut heap = heap(HeapConfig::default());
    let capacity = heap.capacity();

    heap.allocate(capacity - 2 * WORD_SIZE - 8).unwrap();
    let report = report(&heap);

    assert_eq!(report.blocks.len(), 1);
    assert_eq!(report.blocks[0].size, capacity);
    assert_eq!(report.blocks[0].status, Status::Allocated);
  }

  #[test]
  fn free_coalesces_both_sides() {
    let mut heap = heap(HeapConfig::default());

    let a = heap.allocate(8).unwrap();
    let b = heap.allocate(8).unwrap();
    let c = heap.allocate(8).unwrap();
    let _guard = heap.allocate(8).unwrap();

    unsafe {
      heap.free(Some(a));
      heap.free(Some(c));
    }
    assert_eq!(report(&heap).free_blocks(), 3);

    unsafe { heap.free(Some(b)) };
    let report = report(&heap);
    assert_eq!(report.free_blocks(), 2);
    assert_eq!(report.blocks[0].size, 96);
    assert_eq!(report.blocks[0].status, Status::Free);
  }

  #[test]
  fn double_free_is_ignored() {
    let mut heap = heap(HeapConfig::default());

    let a = heap.allocate(8).unwrap();
    let _b = heap.allocate(8).unwrap();
    unsafe {
      heap.free(Some(a));
      heap.free(Some(a));
      heap.free(None);
    }

    let report = report(&heap);
    assert_eq!(report.blocks.len(), 3);
    assert_eq!(report.blocks[0].status, Status::Free);
  }

  #[test]
  fn grows_and_merges_with_trailing_free_block() {
    let mut heap = heap(HeapConfig::default());
    let before = heap.capacity();

    let p = heap.allocate(before * 2).unwrap();
    let report = report(&heap);

    assert!(heap.capacity() > before);
    assert_eq!(report.blocks[0].address, p.as_ptr().addr() - WORD_SIZE);
    assert_eq!(report.blocks[0].status, Status::Allocated);
    assert!(report.blocks[0].size >= before * 2);
  }

  #[test]
  fn grows_after_allocated_tail() {
    let mut heap = heap(HeapConfig::default());
    let capacity = heap.capacity();

    heap.allocate(capacity - 2 * WORD_SIZE).unwrap();
    let p = heap.allocate(100).unwrap();
    let report = report(&heap);

    assert_eq!(report.blocks[1].address, p.as_ptr().addr() - WORD_SIZE);
    assert_eq!(heap.capacity(), capacity + 1024);
  }

  #[test]
  fn exhaustion_leaves_heap_untouched() {
    let segment = DataSegment::with_capacity(8192).unwrap();
    let capacity = segment.capacity();
    let mut heap = Heap::init(segment, HeapConfig::default()).unwrap();
    let before = report(&heap);

    assert!(heap.allocate(capacity * 2).is_none());
    let after = report(&heap);

    assert_eq!(before.blocks, after.blocks);
    assert_eq!(heap.segment().committed(), 1024);
  }

  #[test]
  fn trailing_free_block_is_trimmed_to_floor() {
    let mut heap = heap(HeapConfig::default());
    let floor = heap.capacity();

    let small = heap.allocate(8).unwrap();
    let big = heap.allocate(16 * 1024).unwrap();
    assert!(heap.capacity() > floor);

    unsafe { heap.free(Some(big)) };
    assert_eq!(heap.capacity(), floor);
    assert_eq!(report(&heap).blocks.len(), 2);

    unsafe { heap.free(Some(small)) };
    let report = report(&heap);
    assert_eq!(report.blocks.len(), 1);
    assert_eq!(report.free_bytes, floor);
  }

  #[test]
  fn small_trailing_block_is_kept() {
    let config = HeapConfig::default().with_shrink_threshold(1 << 16);
    let mut heap = heap(config);

    let big = heap.allocate(8 * 1024).unwrap();
    let grown = heap.capacity();
    unsafe { heap.free(Some(big)) };

    assert_eq!(heap.capacity(), grown);
  }

  #[test]
  fn zeroed_allocate_clears_memory() {
    let mut heap = heap(HeapConfig::default());

    let p = heap.allocate(64).unwrap();
    unsafe {
      ptr::write_bytes(p.as_ptr(), 0xFF, 64);
      heap.free(Some(p));
    }

    let q = heap.zeroed_allocate(8, 8).unwrap();
    assert_eq!(p, q);
    let bytes = unsafe { std::slice::from_raw_parts(q.as_ptr(), 64) };
    assert!(bytes.iter().all(|&byte| byte == 0));
  }

  #[test]
  fn zeroed_allocate_overflow() {
    let mut heap = heap(HeapConfig::default());
    assert!(heap.zeroed_allocate(usize::MAX, 2).is_none());
    assert!(heap.zeroed_allocate(0, 8).is_none());
    assert_eq!(report(&heap).blocks.len(), 1);
  }

  #[test]
  fn resize_edge_cases() {
    let mut heap = heap(HeapConfig::default());

    unsafe {
      let p = heap.resize(None, 40).unwrap();
      assert_eq!(report(&heap).blocks[0].size, 64);

      // Same block size, nothing to do.
      assert_eq!(heap.resize(Some(p), 48), Some(p));

      assert!(heap.resize(Some(p), 0).is_none());
      assert_eq!(report(&heap).blocks.len(), 1);
    }
  }

  #[test]
  fn resize_shrinks_in_place() {
    let mut heap = heap(HeapConfig::default());

    unsafe {
      let p = heap.allocate(200).unwrap();
      let _guard = heap.allocate(8).unwrap();
      ptr::write_bytes(p.as_ptr(), 0x42, 200);

      assert_eq!(heap.resize(Some(p), 20), Some(p));
      let report = report(&heap);
      assert_eq!(report.blocks[0].size, 64);
      assert_eq!(report.blocks[1].status, Status::Free);
      assert_eq!(report.blocks[1].size, 224 - 64);

      let bytes = std::slice::from_raw_parts(p.as_ptr(), 20);
      assert!(bytes.iter().all(|&byte| byte == 0x42));
    }
  }

  #[test]
  fn resize_shrink_merges_with_free_neighbour() {
    let mut heap = heap(HeapConfig::default());

    unsafe {
      let p = heap.allocate(200).unwrap();
      heap.resize(Some(p), 20).unwrap();
    }

    let report = report(&heap);
    assert_eq!(report.blocks.len(), 2);
    assert_eq!(report.blocks[1].size, heap.capacity() - 64);
  }

  #[test]
  fn resize_grows_into_free_neighbour() {
    let mut heap = heap(HeapConfig::default());

    unsafe {
      let p = heap.allocate(8).unwrap();
      ptr::write_bytes(p.as_ptr(), 0x17, 8);

      let q = heap.resize(Some(p), 100).unwrap();
      assert_eq!(p, q);

      let report = report(&heap);
      assert_eq!(report.blocks[0].size, 128);
      assert_eq!(report.blocks.len(), 2);

      let bytes = std::slice::from_raw_parts(q.as_ptr(), 8);
      assert!(bytes.iter().all(|&byte| byte == 0x17));
    }
  }

  #[test]
  fn resize_absorbs_exactly_fitting_neighbour() {
    let mut heap = heap(HeapConfig::default());

    unsafe {
      let p = heap.allocate(8).unwrap();
      let hole = heap.allocate(8).unwrap();
      let _guard = heap.allocate(8).unwrap();
      heap.free(Some(hole));

      assert_eq!(heap.resize(Some(p), 40), Some(p));
      let report = report(&heap);
      assert_eq!(report.blocks[0].size, 64);
      assert_eq!(report.blocks[1].status, Status::Allocated);
    }
  }

  #[test]
  fn resize_moves_when_neighbour_is_taken() {
    let mut heap = heap(HeapConfig::default());

    unsafe {
      let p = heap.allocate(16).unwrap();
      let _guard = heap.allocate(16).unwrap();
      for i in 0..16 {
        p.add(i).write(i as u8);
      }

      let q = heap.resize(Some(p), 64).unwrap();
      assert_ne!(p, q);
      for i in 0..16 {
        assert_eq!(q.add(i).read(), i as u8);
      }

      let report = report(&heap);
      assert_eq!(report.blocks[0].status, Status::Free);
    }
  }

  #[test]
  fn resize_failure_keeps_original() {
    let segment = DataSegment::with_capacity(4096).unwrap();
    let capacity = segment.capacity();
    let mut heap = Heap::init(segment, HeapConfig::default()).unwrap();

    unsafe {
      let p = heap.allocate(8).unwrap();
      let _guard = heap.allocate(8).unwrap();
      p.write(0x99);

      assert!(heap.resize(Some(p), capacity * 2).is_none());
      assert_eq!(p.read(), 0x99);
      assert_eq!(report(&heap).blocks[0].status, Status::Allocated);
    }
  }

  #[test]
  fn next_fit_cursor_survives_coalescing() {
    let mut heap = heap(HeapConfig::new(SearchMode::NextFit));

    let a = heap.allocate(8).unwrap();
    let b = heap.allocate(8).unwrap();
    let _c = heap.allocate(8).unwrap();
    // Takes the rest of the heap, so the search below has to wrap around.
    let _rest = heap.allocate(heap.capacity() - 96 - 2 * WORD_SIZE).unwrap();

    unsafe {
      heap.free(Some(b));
      // Wraps around, lands on b and leaves the cursor there.
      let b2 = heap.allocate(8).unwrap();
      assert_eq!(b, b2);
      heap.free(Some(b2));
      heap.free(Some(a));
    }

    // a and b merged; the cursor must name the merged header.
    let (start, _) = heap.logical_bounds();
    assert_eq!(heap.next_fit_cursor(), Some(start));
    assert_eq!(heap.allocate(40), Some(a));
    report(&heap);
  }

  #[test]
  fn diagnostic_level_can_change() {
    let mut heap = heap(HeapConfig::default().with_diagnostics(DiagnosticLevel::Info));
    assert_eq!(heap.diagnostic_level(), DiagnosticLevel::Info);

    heap.set_diagnostic_level(DiagnosticLevel::Verbose);
    assert_eq!(heap.diagnostic_level(), DiagnosticLevel::Verbose);
    assert!(heap.allocate(8).is_some());
  }
}
