use std::{io, ptr::NonNull};

use crate::{error::SegmentError, segment::SegmentProvider};

/// Capacity of [`DataSegment::new`].
pub const DEFAULT_CAPACITY: usize = 64 << 20;

/// A data segment with a movable break, backed by an anonymous mapping.
///
/// ```text
///   base                       break                              base + capacity
///    │                           │                                      │
///    ▼                           ▼                                      ▼
///    ┌───────────────────────────┬──────────────────────────────────────┐
///    │         committed         │              reserved                │
///    └───────────────────────────┴──────────────────────────────────────┘
///                                 ──── grow ───▶
///                                 ◀── shrink ───
/// ```
///
/// The whole capacity is reserved up front with `MAP_NORESERVE`, so the
/// kernel only backs the pages that actually get touched. Pages released by
/// [`SegmentProvider::shrink`] are handed back with `MADV_DONTNEED`.
#[derive(Debug)]
pub struct DataSegment {
  base: NonNull<u8>,
  capacity: usize,
  brk: usize,
  page_size: usize,
}

// The mapping is owned exclusively by the segment.
unsafe impl Send for DataSegment {}

impl DataSegment {
  /// Reserves [`DEFAULT_CAPACITY`] bytes.
  pub fn new() -> Result<Self, SegmentError> {
    Self::with_capacity(DEFAULT_CAPACITY)
  }

  /// Reserves at least `capacity` bytes, rounded up to whole pages.
  pub fn with_capacity(capacity: usize) -> Result<Self, SegmentError> {
    let page_size = system_page_size()?;
    let capacity = align_up!(capacity.max(1), page_size);

    let protection = libc::PROT_READ | libc::PROT_WRITE;
    let flags = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE;

    let address = unsafe { libc::mmap(std::ptr::null_mut(), capacity, protection, flags, -1, 0) };
    if address == libc::MAP_FAILED {
      return Err(io::Error::last_os_error().into());
    }

    let base = NonNull::new(address.cast::<u8>())
      .ok_or_else(|| io::Error::other("mmap returned null"))?;

    Ok(Self {
      base,
      capacity,
      brk: 0,
      page_size,
    })
  }

  /// Total number of bytes the break can move up to.
  pub fn capacity(&self) -> usize {
    self.capacity
  }
}

unsafe impl SegmentProvider for DataSegment {
  fn current_bounds(&self) -> (NonNull<u8>, NonNull<u8>) {
    (self.base, unsafe { self.base.add(self.brk) })
  }

  fn page_size(&self) -> usize {
    self.page_size
  }

  fn grow(
    &mut self,
    bytes: usize,
  ) -> Result<(), SegmentError> {
    let available = self.capacity - self.brk;
    if bytes > available {
      return Err(SegmentError::Exhausted {
        requested: bytes,
        available,
      });
    }
    self.brk += bytes;
    Ok(())
  }

  fn shrink(
    &mut self,
    bytes: usize,
  ) -> Result<(), SegmentError> {
    if bytes > self.brk {
      return Err(SegmentError::Underflow {
        requested: bytes,
        committed: self.brk,
      });
    }

    let old_brk = self.brk;
    self.brk -= bytes;

    // Only pages lying entirely above the new break can go back.
    let from = align_up!(self.brk, self.page_size);
    let to = align_up!(old_brk, self.page_size);
    if from < to {
      unsafe {
        let address = self.base.add(from).as_ptr().cast::<libc::c_void>();
        if libc::madvise(address, to - from, libc::MADV_DONTNEED) != 0 {
          log::warn!(
            "madvise on {} released bytes failed: {}",
            to - from,
            io::Error::last_os_error()
          );
        }
      }
    }

    Ok(())
  }
}

impl Drop for DataSegment {
  fn drop(&mut self) {
    unsafe {
      if libc::munmap(self.base.as_ptr().cast(), self.capacity) != 0 {
        log::warn!("munmap of data segment failed: {}", io::Error::last_os_error());
      }
    }
  }
}

fn system_page_size() -> Result<usize, SegmentError> {
  match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
    size if size > 0 => Ok(size as usize),
    _ => Err(io::Error::last_os_error().into()),
  }
}
