//! Heap consistency checks.
//!
//! [`Heap::check`] walks the whole block chain without touching it and either
//! returns a [`HeapReport`] or the first structural corruption it runs into.

use std::fmt;

use crate::{
  error::HeapError,
  heap::Heap,
  search::SearchMode,
  segment::SegmentProvider,
  tag::{Status, Tag, WORD_SIZE},
};

/// One block as seen by the checker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockEntry {
  /// Address of the header.
  pub address: usize,
  /// Offset of the header from the logical start.
  pub offset: usize,
  pub size: usize,
  pub status: Status,
}

impl BlockEntry {
  /// Bytes usable by the caller.
  pub fn payload(&self) -> usize {
    self.size - 2 * WORD_SIZE
  }
}

/// Result of a successful [`Heap::check`].
#[derive(Clone, Debug)]
pub struct HeapReport {
  pub search_mode: SearchMode,
  pub physical_start: usize,
  pub physical_end: usize,
  pub logical_start: usize,
  pub logical_end: usize,
  /// Offset of the block where the next next-fit search starts.
  pub next_fit_cursor: Option<usize>,
  pub blocks: Vec<BlockEntry>,
  pub free_bytes: usize,
  pub allocated_bytes: usize,
  /// Offsets of free blocks directly followed by another free block.
  pub adjacent_free: Vec<usize>,
}

impl HeapReport {
  pub fn free_blocks(&self) -> usize {
    self.count(Status::Free)
  }

  pub fn allocated_blocks(&self) -> usize {
    self.count(Status::Allocated)
  }

  /// `true` if no two free blocks are adjacent. Header/footer disagreement
  /// and broken chains never make it into a report.
  pub fn is_consistent(&self) -> bool {
    self.adjacent_free.is_empty()
  }

  fn count(
    &self,
    status: Status,
  ) -> usize {
    self.blocks.iter().filter(|block| block.status == status).count()
  }
}

impl<S: SegmentProvider> Heap<S> {
  /// Walks every block from the logical start to the logical end and checks
  /// that headers match footers, that the chain lands exactly on the logical
  /// end and that both sentinels are intact.
  ///
  /// Never mutates the heap, so it can run between any two operations. An
  /// `Err` means the heap is corrupt and must not be used any further.
  pub fn check(&self) -> Result<HeapReport, HeapError> {
    let (start, end) = self.logical_bounds();
    let (physical_start, physical_end) = self.segment().current_bounds();
    let (start, end) = (start.as_ptr().addr(), end.as_ptr().addr());

    let chain = self.chain();
    check_sentinel("start", chain.first().prev_tag())?;

    let mut report = HeapReport {
      search_mode: self.search_mode(),
      physical_start: physical_start.as_ptr().addr(),
      physical_end: physical_end.as_ptr().addr(),
      logical_start: start,
      logical_end: end,
      next_fit_cursor: self.next_fit_cursor().map(|cursor| cursor.as_ptr().addr() - start),
      blocks: Vec::new(),
      free_bytes: 0,
      allocated_bytes: 0,
      adjacent_free: Vec::new(),
    };

    let mut block = chain.first();
    let mut previous_free = false;

    while block.addr() < end {
      let offset = block.addr() - start;
      let header = block.tag();
      let size = header.size();

      if size == 0 {
        return Err(HeapError::ZeroSizeBlock { offset });
      }
      if block.addr() + size > end {
        return Err(HeapError::ChainOverrun { offset, size });
      }

      let Some(status) = header.try_status() else {
        return Err(HeapError::DamagedTag { offset, tag: header });
      };

      let footer = block.footer_tag();
      if footer != header {
        return Err(HeapError::TagMismatch { offset, header, footer });
      }

      match status {
        Status::Free => {
          if previous_free {
            report.adjacent_free.push(offset);
          }
          report.free_bytes += size;
        }
        Status::Allocated => report.allocated_bytes += size,
      }
      previous_free = status == Status::Free;

      report.blocks.push(BlockEntry {
        address: block.addr(),
        offset,
        size,
        status,
      });

      block = block.next();
    }

    check_sentinel("end", block.tag())?;

    Ok(report)
  }
}

fn check_sentinel(
  which: &'static str,
  tag: Tag,
) -> Result<(), HeapError> {
  if tag == Tag::SENTINEL {
    Ok(())
  } else {
    Err(HeapError::BadSentinel { which, tag })
  }
}

impl fmt::Display for HeapReport {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    writeln!(f, "  physical start:     {:#x}", self.physical_start)?;
    writeln!(f, "  physical end:       {:#x}", self.physical_end)?;
    writeln!(f, "  logical start:      {:#x}", self.logical_start)?;
    writeln!(f, "  logical end:        {:#x}", self.logical_end)?;
    writeln!(f, "  search mode:        {}", self.search_mode)?;
    match self.next_fit_cursor {
      Some(offset) => writeln!(f, "  next fit cursor:    {offset:#x}")?,
      None => writeln!(f, "  next fit cursor:    -")?,
    }
    writeln!(f)?;
    writeln!(
      f,
      "    {:<14}  {:>8}  {:>10}  {:>10}  {:>8}  status",
      "address", "offset", "size (hex)", "size (dec)", "payload"
    )?;

    for block in &self.blocks {
      writeln!(
        f,
        "    {:<#14x}  {:>8}  {:>10}  {:>10}  {:>8}  {}",
        block.address,
        format!("{:#x}", block.offset),
        format!("{:#x}", block.size),
        block.size,
        block.payload(),
        block.status
      )?;
    }

    writeln!(f)?;
    writeln!(
      f,
      "  {} blocks: {} free ({} bytes), {} allocated ({} bytes)",
      self.blocks.len(),
      self.free_blocks(),
      self.free_bytes,
      self.allocated_blocks(),
      self.allocated_bytes
    )?;

    for offset in &self.adjacent_free {
      writeln!(f, "  --> free block at {offset:#x} follows another free block")?;
    }
    if self.is_consistent() {
      writeln!(f, "  Block structure coherent.")?;
    }

    Ok(())
  }
}
