use std::{io::Read, ptr};

use tagheap::{DataSegment, Heap, HeapConfig, SearchMode, SegmentProvider};

/// Waits until the user presses ENTER, but only when the demo was started
/// with `--step`. Useful to inspect the mapping with `pmap` or `gdb` while
/// the heap grows and shrinks.
fn pause(step: bool) {
  if step {
    println!("\n>>> Press ENTER to continue...");
    let _ = std::io::stdin().bytes().next();
  }
}

/// Prints the segment break and the block table of `heap`.
fn print_heap(
  label: &str,
  heap: &Heap<DataSegment>,
) {
  let (_, brk) = heap.segment().current_bounds();
  println!(
    "\n[{label}] PID = {}, break = {brk:?}, committed = {:#x}",
    std::process::id(),
    heap.segment().committed()
  );

  match heap.check() {
    Ok(report) => print!("{report}"),
    Err(err) => println!("heap is corrupt: {err}"),
  }
}

fn main() {
  let step = std::env::args().any(|arg| arg == "--step");

  let mode = std::env::args().find_map(|arg| arg.strip_prefix("--mode=").map(str::to_owned));
  let mode = match mode.as_deref() {
    Some("next") => SearchMode::NextFit,
    Some("best") => SearchMode::BestFit,
    _ => SearchMode::FirstFit,
  };

  let segment = match DataSegment::with_capacity(1 << 20) {
    Ok(segment) => segment,
    Err(err) => {
      eprintln!("cannot map segment: {err}");
      return;
    }
  };
  let mut heap = match Heap::init(segment, HeapConfig::new(mode)) {
    Ok(heap) => heap,
    Err(err) => {
      eprintln!("cannot initialize heap: {err}");
      return;
    }
  };

  print_heap("init", &heap);
  pause(step);

  unsafe {
    // --------------------------------------------------------------------
    // 1) A few small allocations carve the initial free block.
    // --------------------------------------------------------------------
    let a = heap.allocate(8);
    let b = heap.allocate(100);
    let c = heap.allocate(40);
    if let Some(b) = b {
      ptr::write_bytes(b.as_ptr(), 0xAB, 100);
    }
    print_heap("1: allocate 8, 100, 40", &heap);
    pause(step);

    // --------------------------------------------------------------------
    // 2) Freeing the middle block leaves a hole, freeing its neighbour
    //    merges the two.
    // --------------------------------------------------------------------
    heap.free(b);
    print_heap("2a: free the 100 byte block", &heap);
    heap.free(a);
    print_heap("2b: free the 8 byte block", &heap);
    pause(step);

    // --------------------------------------------------------------------
    // 3) Growing in place into the free neighbour that follows.
    // --------------------------------------------------------------------
    let c = heap.resize(c, 400);
    print_heap("3: resize 40 -> 400", &heap);
    pause(step);

    // --------------------------------------------------------------------
    // 4) A request larger than everything free grows the segment.
    // --------------------------------------------------------------------
    let big = heap.allocate(64 << 10);
    print_heap("4: allocate 64 KiB", &heap);
    pause(step);

    // --------------------------------------------------------------------
    // 5) Freeing the trailing block hands the memory back.
    // --------------------------------------------------------------------
    heap.free(big);
    heap.free(c);
    print_heap("5: free everything", &heap);
  }
}
