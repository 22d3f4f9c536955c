//! # tagheap - A Boundary-Tagged Heap Allocator
//!
//! This crate implements a general purpose heap (`allocate`, `free`,
//! `resize`, `zeroed_allocate`) on top of a single growable memory segment,
//! using an **implicit free list with boundary tags**.
//!
//! ## Overview
//!
//! Every block carries its size and status twice, once in a header word and
//! once in a footer word. Walking forwards means adding the size found in a
//! header, walking backwards means subtracting the size found in the footer
//! right before a header:
//!
//! ```text
//!   Implicit Free List:
//!
//!   ┌───┬─────────────┬─────────────────────┬─────────┬──────────────────────┬───┐
//!   │ S │ H  A1     F │ h       free      f │ H A2  F │ h       free       f │ S │
//!   └───┴─────────────┴─────────────────────┴─────────┴──────────────────────┴───┘
//!     ▲   │                                 ▲ ▲                                 ▲
//!     │   └──────── header + size ──────────┘ └── footer - size (backwards)     │
//!     │                                                                         │
//!     └──────────── sentinels: size 0, always allocated ───────────────────────┘
//! ```
//!
//! - **Allocation** asks the configured [`SearchMode`] (first, next or best
//!   fit) for a free block, splits off whatever is left over and grows the
//!   segment when nothing fits.
//! - **Freeing** merges the block with free neighbours right away, so there
//!   are never two free blocks next to each other, and returns a large enough
//!   trailing free block to the segment.
//! - **Resizing** shrinks in place, grows into a free neighbour when it can
//!   and moves the contents otherwise.
//!
//! ## Crate Structure
//!
//! ```text
//!   tagheap
//!   ├── align      - Alignment macros (align_up!, align_down!)
//!   ├── tag        - Boundary tag encoding
//!   ├── block      - Block navigation (internal)
//!   ├── search     - Placement policies
//!   ├── heap       - Heap implementation
//!   ├── check      - Consistency checker
//!   ├── segment    - SegmentProvider trait
//!   ├── dataseg    - mmap-backed DataSegment
//!   ├── config     - HeapConfig and DiagnosticLevel
//!   ├── error      - HeapError and SegmentError
//!   └── locked     - LockedHeap, a GlobalAlloc wrapper
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use tagheap::{DataSegment, Heap, HeapConfig, SearchMode};
//!
//! let segment = DataSegment::with_capacity(1 << 20).unwrap();
//! let mut heap = Heap::init(segment, HeapConfig::new(SearchMode::BestFit)).unwrap();
//!
//! let first = heap.allocate(8).unwrap();
//! let second = heap.allocate(8).unwrap();
//! assert_ne!(first, second);
//!
//! unsafe {
//!   heap.free(Some(first));
//!   // The freed block is reused.
//!   assert_eq!(heap.allocate(8), Some(first));
//! }
//!
//! let report = heap.check().unwrap();
//! assert!(report.is_consistent());
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded**: [`Heap`] has no internal locking, use [`LockedHeap`]
//!   to share one.
//! - **Word alignment only**: payloads are aligned to [`WORD_SIZE`].
//! - **Unix-only**: [`DataSegment`] requires `libc` and `mmap(2)`.
//!
//! ## Safety
//!
//! The tags live inside the memory handed out to callers' neighbours, so a
//! write past the end of an allocation corrupts the heap. Freeing and
//! resizing take raw payload pointers and are therefore `unsafe`.
//! [`Heap::check`] detects most corruption after the fact.

use std::ptr::NonNull;

#[macro_use]
pub mod align;
#[macro_use]
mod macros;

mod block;
mod check;
mod config;
mod dataseg;
mod error;
mod heap;
mod locked;
mod search;
mod segment;
mod tag;

/// Non-null pointer to `T`, or nothing. Allocation results and the pointers
/// accepted by [`Heap::free`] and [`Heap::resize`] use this.
pub type Pointer<T> = Option<NonNull<T>>;

pub use check::{BlockEntry, HeapReport};
pub use config::{DEFAULT_CHUNK_SIZE, DEFAULT_SHRINK_THRESHOLD, DiagnosticLevel, HeapConfig};
pub use dataseg::{DEFAULT_CAPACITY, DataSegment};
pub use error::{HeapError, SegmentError};
pub use heap::Heap;
pub use locked::{LockedHeap, MAX_ALIGN};
pub use search::SearchMode;
pub use segment::SegmentProvider;
pub use tag::{BLOCK_UNIT, MIN_BLOCK_SIZE, Status, Tag, WORD_SIZE};
