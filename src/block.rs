//! Block navigation.
//!
//! ```text
//!            previous block                      this block                    next block
//!   ... ─────────────────┬───┬───┬──────────────────────────────┬───┬───┬───────── ...
//!                        │ F │ H │          payload             │ F │ H │
//!   ... ─────────────────┴───┴───┴──────────────────────────────┴───┴───┴───────── ...
//!                              ▲   ▲                              ▲     ▲
//!                              │   └── payload()                  │     └── next()
//!                    address() ┘                         footer() ┘
//! ```
//!
//! A [`Block`] is just the address of a header. All address arithmetic of the
//! crate lives here; everything else moves through the heap with
//! [`Block::next`], [`Block::prev`] and [`Chain`].

use std::ptr::NonNull;

use crate::tag::{Status, Tag, WORD_SIZE};

/// Handle to the header of a block inside a live heap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Block {
  header: NonNull<u8>,
}

impl Block {
  /// # Safety
  ///
  /// `header` must point to a block header (or the end sentinel) of a heap
  /// that outlives the handle.
  #[inline]
  pub unsafe fn at(header: NonNull<u8>) -> Self {
    Self { header }
  }

  /// Returns the block owning the payload at `payload`.
  ///
  /// # Safety
  ///
  /// `payload` must have been returned by the heap that owns this block.
  #[inline]
  pub unsafe fn from_payload(payload: NonNull<u8>) -> Self {
    unsafe { Self::at(payload.sub(WORD_SIZE)) }
  }

  /// Returns the block whose footer is at `footer`.
  ///
  /// # Safety
  ///
  /// `footer` must point to the footer of a block in a live heap.
  #[inline]
  pub unsafe fn from_footer(footer: NonNull<u8>) -> Self {
    unsafe {
      let size = Tag::load(footer).size();
      Self::at(footer.add(WORD_SIZE).sub(size))
    }
  }

  #[inline]
  pub fn address(self) -> NonNull<u8> {
    self.header
  }

  #[inline]
  pub fn addr(self) -> usize {
    self.header.as_ptr().addr()
  }

  /// Address handed out to callers: one tag past the header.
  #[inline]
  pub fn payload(self) -> NonNull<u8> {
    unsafe { self.header.add(WORD_SIZE) }
  }

  #[inline]
  pub fn tag(self) -> Tag {
    unsafe { Tag::load(self.header) }
  }

  #[inline]
  pub fn size(self) -> usize {
    self.tag().size()
  }

  #[inline]
  pub fn is_free(self) -> bool {
    self.tag().is_free()
  }

  /// Address of the footer as described by the header.
  #[inline]
  pub fn footer(self) -> NonNull<u8> {
    unsafe { self.header.add(self.size()).sub(WORD_SIZE) }
  }

  #[inline]
  pub fn footer_tag(self) -> Tag {
    unsafe { Tag::load(self.footer()) }
  }

  /// Block that starts right after this one ends. For the last block this
  /// is the end sentinel.
  #[inline]
  pub fn next(self) -> Block {
    unsafe { Block::at(self.header.add(self.size())) }
  }

  /// The footer of the previous block, or the start sentinel.
  #[inline]
  pub fn prev_tag(self) -> Tag {
    unsafe { Tag::load(self.header.sub(WORD_SIZE)) }
  }

  /// Block that ends right before this one starts. For the first block the
  /// start sentinel has size zero and this returns `self`.
  #[inline]
  pub fn prev(self) -> Block {
    unsafe { Block::from_footer(self.header.sub(WORD_SIZE)) }
  }

  /// Block that starts `offset` bytes after this one.
  ///
  /// # Safety
  ///
  /// The resulting address must stay inside the heap.
  #[inline]
  pub unsafe fn offset(
    self,
    offset: usize,
  ) -> Block {
    unsafe { Block::at(self.header.add(offset)) }
  }

  /// Rewrites header and footer so the block spans `size` bytes.
  ///
  /// # Safety
  ///
  /// `size` bytes starting at the header must belong to the heap and must not
  /// overlap any block that is still referenced as a separate block.
  #[inline]
  pub unsafe fn write(
    self,
    size: usize,
    status: Status,
  ) {
    let tag = Tag::pack(size, status);
    unsafe {
      tag.store(self.header);
      tag.store(self.header.add(size).sub(WORD_SIZE));
    }
  }
}

/// The blocks between the logical start and the logical end of a heap.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Chain {
  first: Block,
  end: NonNull<u8>,
}

impl Chain {
  /// # Safety
  ///
  /// `first` must be the first block of a consistent heap whose end sentinel
  /// is at `end`.
  #[inline]
  pub unsafe fn new(
    first: Block,
    end: NonNull<u8>,
  ) -> Self {
    Self { first, end }
  }

  #[inline]
  pub fn first(&self) -> Block {
    self.first
  }

  #[inline]
  pub fn end(&self) -> NonNull<u8> {
    self.end
  }

  /// Whether `block` lies between the logical start and the logical end.
  #[inline]
  pub fn contains(
    &self,
    block: Block,
  ) -> bool {
    self.first.address() <= block.address() && block.address() < self.end
  }

  pub fn blocks(&self) -> Blocks {
    Blocks {
      cursor: Some(self.first),
      end: self.end,
    }
  }
}

/// Iterator over the blocks of a [`Chain`], in address order.
pub(crate) struct Blocks {
  cursor: Option<Block>,
  end: NonNull<u8>,
}

impl Iterator for Blocks {
  type Item = Block;

  fn next(&mut self) -> Option<Block> {
    let block = self.cursor.take()?;
    if block.address() >= self.end {
      return None;
    }
    // A zero-size block would loop forever; stop after yielding it.
    if block.size() != 0 {
      self.cursor = Some(block.next());
    }
    Some(block)
  }
}


#[cfg(test)]
mod tests {
  use super::{fixture::Layout, *};

  use crate::tag::Status::{Allocated as A, Free as F};

  #[test]
  fn header_footer_mappings() {
    let layout = Layout::new(&[(64, A), (96, F)]);
    let first = layout.first();

    assert_eq!(first.size(), 64);
    assert_eq!(first.tag(), first.footer_tag());
    assert_eq!(first.footer().as_ptr().addr(), first.addr() + 64 - WORD_SIZE);
    assert_eq!(unsafe { Block::from_footer(first.footer()) }, first);
    assert_eq!(first.payload().as_ptr().addr(), first.addr() + WORD_SIZE);
    assert_eq!(unsafe { Block::from_payload(first.payload()) }, first);
  }

  #[test]
  fn next_and_prev() {
    let layout = Layout::new(&[(32, A), (64, F), (128, A)]);
    let first = layout.first();

    let second = first.next();
    let third = second.next();
    assert_eq!(second.addr(), first.addr() + 32);
    assert_eq!(third.addr(), second.addr() + 64);
    assert_eq!(unsafe { first.offset(96) }, third);
    assert_eq!(third.next().address(), layout.chain.end());
    assert_eq!(third.next().tag(), Tag::SENTINEL);

    assert_eq!(third.prev(), second);
    assert_eq!(second.prev(), first);
    assert_eq!(first.prev_tag(), Tag::SENTINEL);
    assert_eq!(first.prev(), first);
  }

  #[test]
  fn write_moves_the_footer() {
    let layout = Layout::new(&[(128, F), (32, A)]);
    let first = layout.first();

    unsafe { first.write(64, A) };
    assert_eq!(first.footer_tag(), Tag::pack(64, A));
    assert_eq!(first.next().addr(), first.addr() + 64);
  }

  #[test]
  fn chain_walks_every_block() {
    let layout = Layout::new(&[(32, F), (64, A), (32, F)]);
    let chain = layout.chain;

    let sizes: Vec<_> = chain.blocks().map(Block::size).collect();
    assert_eq!(sizes, [32, 64, 32]);
    assert!(chain.contains(chain.first().next()));
    assert!(!chain.contains(unsafe { Block::at(chain.end()) }));
  }

  #[test]
  fn chain_stops_on_zero_size() {
    let layout = Layout::new(&[(32, F), (64, A)]);
    unsafe { Tag::from_bits(0).store(layout.first().next().address()) };

    assert_eq!(layout.chain.blocks().count(), 2);
  }
}
