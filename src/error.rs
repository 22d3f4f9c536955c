use std::io;

use thiserror::Error;

use crate::tag::Tag;

/// Refusals reported by a [`crate::SegmentProvider`].
#[derive(Debug, Error)]
pub enum SegmentError {
  #[error("segment exhausted: {requested} bytes requested, {available} available")]
  Exhausted { requested: usize, available: usize },
  #[error("cannot release {requested} bytes, only {committed} committed")]
  Underflow { requested: usize, committed: usize },
  #[error("failed to reserve the segment")]
  Map(#[from] io::Error),
}

/// Errors reported by [`crate::Heap`].
///
/// Everything from [`HeapError::TagMismatch`] down is a corruption finding of
/// [`crate::Heap::check`]. The heap must not be used any further once one of
/// those is reported.
#[derive(Debug, Error)]
pub enum HeapError {
  #[error("segment already has {committed} committed bytes, expected a fresh segment")]
  SegmentNotClean { committed: usize },
  #[error("segment reported a page size of 0")]
  ZeroPageSize,
  #[error("invalid heap configuration: {0}")]
  InvalidConfig(&'static str),
  #[error("segment of {committed} bytes cannot hold a single block")]
  SegmentTooSmall { committed: usize },
  #[error(transparent)]
  Segment(#[from] SegmentError),
  #[error("block at offset {offset:#x}: header {header} does not match footer {footer}")]
  TagMismatch { offset: usize, header: Tag, footer: Tag },
  #[error("block at offset {offset:#x} has size 0, traversal aborted")]
  ZeroSizeBlock { offset: usize },
  #[error("block at offset {offset:#x} with size {size:#x} runs past the logical end")]
  ChainOverrun { offset: usize, size: usize },
  #[error("block at offset {offset:#x} has a damaged tag {tag}")]
  DamagedTag { offset: usize, tag: Tag },
  #[error("{which} sentinel is {tag}, expected an allocated half-block of size 0")]
  BadSentinel { which: &'static str, tag: Tag },
}
