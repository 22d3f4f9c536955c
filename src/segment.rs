use std::ptr::NonNull;

use crate::error::SegmentError;

/// Where the heap gets its memory from.
///
/// A segment is one contiguous region whose start never moves and whose end
/// (the break) moves up with [`SegmentProvider::grow`] and down with
/// [`SegmentProvider::shrink`], much like `sbrk(2)` moves the program break.
///
/// # Safety
///
/// Implementors guarantee that every byte in `[start, end)` as reported by
/// [`SegmentProvider::current_bounds`] is readable and writable, that the
/// start never changes, and that nobody else touches that memory while the
/// provider is owned by a heap. Memory between the old and the new end after
/// a grow may hold anything.
pub unsafe trait SegmentProvider {
  /// Physical start and end of the committed region.
  fn current_bounds(&self) -> (NonNull<u8>, NonNull<u8>);

  /// Page size of the memory system backing the segment.
  fn page_size(&self) -> usize;

  /// Moves the end up by exactly `bytes`.
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Result<(), SegmentError>;

  /// Moves the end down by exactly `bytes`.
  fn shrink(
    &mut self,
    bytes: usize,
  ) -> Result<(), SegmentError>;

  /// Number of committed bytes.
  fn committed(&self) -> usize {
    let (start, end) = self.current_bounds();
    end.as_ptr().addr() - start.as_ptr().addr()
  }
}
