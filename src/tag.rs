//! Boundary tags.
//!
//! Every block starts and ends with one machine word holding its total size
//! and its status:
//!
//! ```text
//!   63                                        5 4       0
//!   ┌──────────────────────────────────────────┬─────────┐
//!   │   block size (multiple of BLOCK_UNIT)    │ status  │
//!   └──────────────────────────────────────────┴─────────┘
//! ```
//!
//! Block sizes are always multiples of [`BLOCK_UNIT`], so the low bits of the
//! size are zero and can carry the status instead.

use std::{fmt, mem, ptr::NonNull};

/// Width of a single boundary tag in bytes.
pub const WORD_SIZE: usize = mem::size_of::<usize>();

/// Every block size and every block header address is a multiple of this.
pub const BLOCK_UNIT: usize = 32;

/// Header, footer and at least one unit of payload, rounded to the block unit.
pub const MIN_BLOCK_SIZE: usize = align_up!(2 * WORD_SIZE + 1, BLOCK_UNIT);

const STATUS_MASK: usize = BLOCK_UNIT - 1;
const SIZE_MASK: usize = !STATUS_MASK;

/// Allocation status stored in the low bits of a tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
  Free = 0,
  Allocated = 1,
}

impl fmt::Display for Status {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Status::Free => f.write_str("free"),
      Status::Allocated => f.write_str("allocated"),
    }
  }
}

/// A packed `(size, status)` boundary tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Tag(usize);

impl Tag {
  /// The zero-size, permanently allocated half-block that bounds the heap on
  /// both sides.
  pub const SENTINEL: Tag = Tag(Status::Allocated as usize);

  /// Packs `size` and `status` into a tag.
  ///
  /// # Panics
  ///
  /// If `size` is not a multiple of [`BLOCK_UNIT`].
  pub fn pack(
    size: usize,
    status: Status,
  ) -> Self {
    assert!(
      size & STATUS_MASK == 0,
      "block size {size:#x} is not a multiple of the {BLOCK_UNIT}-byte block unit"
    );
    Tag(size | status as usize)
  }

  /// Reinterprets a raw word as a tag without validating it.
  pub const fn from_bits(bits: usize) -> Self {
    Tag(bits)
  }

  pub const fn bits(self) -> usize {
    self.0
  }

  pub const fn size(self) -> usize {
    self.0 & SIZE_MASK
  }

  /// Decodes the status bits, or `None` if they hold neither status.
  pub const fn try_status(self) -> Option<Status> {
    match self.0 & STATUS_MASK {
      0 => Some(Status::Free),
      1 => Some(Status::Allocated),
      _ => None,
    }
  }

  /// Decodes the status bits.
  ///
  /// # Panics
  ///
  /// If the status bits were damaged. The heap is corrupt at that point and
  /// there is nothing sensible left to do.
  pub fn status(self) -> Status {
    match self.try_status() {
      Some(status) => status,
      None => panic!("corrupt boundary tag {:#x}", self.0),
    }
  }

  pub fn is_free(self) -> bool {
    self.status() == Status::Free
  }

  /// Reads the tag stored at `at`.
  ///
  /// # Safety
  ///
  /// `at` must be word aligned and point to committed heap memory.
  #[inline]
  pub(crate) unsafe fn load(at: NonNull<u8>) -> Self {
    unsafe { Tag(at.cast::<usize>().read()) }
  }

  /// Writes the tag to `at`.
  ///
  /// # Safety
  ///
  /// Same as [`Tag::load`], and nothing else may be using that word.
  #[inline]
  pub(crate) unsafe fn store(
    self,
    at: NonNull<u8>,
  ) {
    unsafe { at.cast::<usize>().write(self.0) }
  }
}

impl fmt::Debug for Tag {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self.try_status() {
      Some(status) => write!(f, "Tag({:#x}, {status})", self.size()),
      None => write!(f, "Tag(<corrupt {:#x}>)", self.0),
    }
  }
}

impl fmt::Display for Tag {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    fmt::Debug::fmt(self, f)
  }
}
