//! Placement policies.
//!
//! All three walk the block chain from the logical start and accept a block
//! iff it is free and at least as large as the request. They differ only in
//! where they start and when they stop:
//!
//! ```text
//!   request: 64            ┌────┐ ┌──────┐ ┌────┐ ┌──────────┐ ┌──────┐
//!                          │ A  │ │  f96 │ │ A  │ │   f256   │ │  f64 │
//!                          └────┘ └──────┘ └────┘ └──────────┘ └──────┘
//!   first fit  ───────────────────▶   ✓
//!   best fit   ─────────────────────────────────────────────────────▶ ✓
//!   next fit             (from last hit) ─────────────────▶ ✓ ──wrap──▶
//! ```

use std::fmt;

use crate::block::{Block, Chain};

/// Which placement policy a heap uses. Fixed at initialization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SearchMode {
  /// Lowest-addressed free block that fits.
  #[default]
  FirstFit,
  /// Like first fit, but resumes where the previous successful search
  /// stopped and wraps around once.
  NextFit,
  /// Free block with the least slack, earliest on ties.
  BestFit,
}

impl fmt::Display for SearchMode {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      SearchMode::FirstFit => f.write_str("first fit"),
      SearchMode::NextFit => f.write_str("next fit"),
      SearchMode::BestFit => f.write_str("best fit"),
    }
  }
}

/// A [`SearchMode`] together with whatever state it needs between searches.
#[derive(Debug)]
pub(crate) enum Placement {
  FirstFit,
  NextFit { cursor: Option<Block> },
  BestFit,
}

impl Placement {
  pub fn new(mode: SearchMode) -> Self {
    match mode {
      SearchMode::FirstFit => Placement::FirstFit,
      SearchMode::NextFit => Placement::NextFit { cursor: None },
      SearchMode::BestFit => Placement::BestFit,
    }
  }

  pub fn mode(&self) -> SearchMode {
    match self {
      Placement::FirstFit => SearchMode::FirstFit,
      Placement::NextFit { .. } => SearchMode::NextFit,
      Placement::BestFit => SearchMode::BestFit,
    }
  }

  /// Where the next next-fit search will start, if a previous one hit.
  pub fn cursor(&self) -> Option<Block> {
    match self {
      Placement::NextFit { cursor } => *cursor,
      _ => None,
    }
  }

  /// Finds a free block of at least `size` bytes.
  pub fn find(
    &mut self,
    chain: &Chain,
    size: usize,
  ) -> Option<Block> {
    match self {
      Placement::FirstFit => first_fit(chain, size),
      Placement::NextFit { cursor } => next_fit(chain, cursor, size),
      Placement::BestFit => best_fit(chain, size),
    }
  }

  /// Drops a cursor at or above `end` after the heap shrank.
  pub fn truncate(
    &mut self,
    end: std::ptr::NonNull<u8>,
  ) {
    if let Placement::NextFit { cursor } = self {
      if cursor.is_some_and(|block| block.address() >= end) {
        *cursor = None;
      }
    }
  }

  /// Called after the block at `merged` absorbed `size` bytes worth of
  /// neighbours. A cursor that pointed at one of the absorbed headers would
  /// now point into the middle of a block.
  pub fn absorb(
    &mut self,
    merged: Block,
    size: usize,
  ) {
    if let Placement::NextFit { cursor: Some(cursor) } = self {
      if merged.addr() < cursor.addr() && cursor.addr() < merged.addr() + size {
        *cursor = merged;
      }
    }
  }
}

#[inline]
fn fits(
  block: Block,
  size: usize,
) -> bool {
  let tag = block.tag();
  tag.is_free() && tag.size() >= size
}

fn first_fit(
  chain: &Chain,
  size: usize,
) -> Option<Block> {
  chain.blocks().find(|&block| fits(block, size))
}

fn next_fit(
  chain: &Chain,
  cursor: &mut Option<Block>,
  size: usize,
) -> Option<Block> {
  // The cursor is dropped lazily when the heap shrank below it.
  let mut current = match *cursor {
    Some(block) if chain.contains(block) => block,
    _ => chain.first(),
  };
  let origin = current;

  loop {
    if fits(current, size) {
      *cursor = Some(current);
      return Some(current);
    }

    current = current.next();
    if current.address() >= chain.end() {
      current = chain.first();
    }

    if current == origin {
      *cursor = Some(origin);
      return None;
    }
  }
}

fn best_fit(
  chain: &Chain,
  size: usize,
) -> Option<Block> {
  let mut best: Option<(Block, usize)> = None;

  for block in chain.blocks() {
    if !fits(block, size) {
      continue;
    }

    let slack = block.size() - size;
    if slack == 0 {
      return Some(block);
    }
    if best.is_none_or(|(_, least)| slack < least) {
      best = Some((block, slack));
    }
  }

  best.map(|(block, _)| block)
}
