//! Allocation tracking for memory leak detection.
//!
//! This module provides a custom global allocator that tracks allocation
//! counts and bytes allocated. It's designed for use in tests to verify
//! that every node and every iterator frame is released once the tree or
//! iterator owning it is dropped.
//!
//! # Usage
//!
//! In test binaries that want to track allocations, use:
//!
//! ```ignore
//! use ordtree::alloc::TrackingAllocator;
//!
//! #[global_allocator]
//! static ALLOC: TrackingAllocator = TrackingAllocator;
//!
//! #[test]
//! fn test_no_leaks() {
//!     ordtree::alloc::reset_counters();
//!
//!     // ... test code ...
//!
//!     drop(tree);
//!
//!     ordtree::alloc::check_no_leaks();
//! }
//! ```
//!
//! # Caveats
//!
//! - The tracking allocator adds overhead to every allocation
//! - Counters are kept per thread, so tests running in parallel on other
//!   threads do not disturb each other, but memory allocated on one thread
//!   and freed on another shows up as a leak on the first and a surplus on
//!   the second
//! - Lazily initialised statics (e.g. logging callsites) allocate once and
//!   are never freed; warm them up before calling [`reset_counters`]

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

thread_local! {
	/// Number of allocations made by this thread since the last reset.
	static ALLOC_COUNT: Cell<usize> = const { Cell::new(0) };
	/// Number of deallocations made by this thread since the last reset.
	static DEALLOC_COUNT: Cell<usize> = const { Cell::new(0) };
	/// Bytes allocated by this thread and not yet freed.
	static BYTES_ALLOCATED: Cell<isize> = const { Cell::new(0) };
	/// Peak of `BYTES_ALLOCATED` since the last reset.
	static PEAK_BYTES: Cell<isize> = const { Cell::new(0) };
}

/// Adjusts the calling thread's byte counter and peak.
///
/// Uses `try_with` because the allocator is also invoked while thread-local
/// storage is being torn down.
fn record_bytes(diff: isize) {
	let _ = BYTES_ALLOCATED.try_with(|bytes| {
		let current = bytes.get() + diff;
		bytes.set(current);
		let _ = PEAK_BYTES.try_with(|peak| {
			if current > peak.get() {
				peak.set(current);
			}
		});
	});
}

fn bump(counter: &'static std::thread::LocalKey<Cell<usize>>) {
	let _ = counter.try_with(|count| count.set(count.get() + 1));
}

/// A tracking allocator that counts allocations and deallocations.
///
/// This wraps the system allocator and increments/decrements counters
/// on each allocation operation.
pub struct TrackingAllocator;

unsafe impl GlobalAlloc for TrackingAllocator {
	unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
		bump(&ALLOC_COUNT);
		record_bytes(layout.size() as isize);
		System.alloc(layout)
	}

	unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
		bump(&DEALLOC_COUNT);
		record_bytes(-(layout.size() as isize));
		System.dealloc(ptr, layout)
	}

	unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
		bump(&ALLOC_COUNT);
		record_bytes(layout.size() as isize);
		System.alloc_zeroed(layout)
	}

	unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
		record_bytes(new_size as isize - layout.size() as isize);
		System.realloc(ptr, layout, new_size)
	}
}

/// Resets the calling thread's counters to zero.
///
/// Call this at the beginning of a test to start fresh counting.
pub fn reset_counters() {
	ALLOC_COUNT.with(|c| c.set(0));
	DEALLOC_COUNT.with(|c| c.set(0));
	BYTES_ALLOCATED.with(|c| c.set(0));
	PEAK_BYTES.with(|c| c.set(0));
}

/// Returns the calling thread's allocation statistics.
pub fn get_stats() -> AllocationStats {
	AllocationStats {
		alloc_count: ALLOC_COUNT.with(Cell::get),
		dealloc_count: DEALLOC_COUNT.with(Cell::get),
		bytes_allocated: BYTES_ALLOCATED.with(Cell::get),
		peak_bytes: PEAK_BYTES.with(Cell::get),
	}
}

/// Allocation statistics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationStats {
	/// Total number of allocations since reset.
	pub alloc_count: usize,
	/// Total number of deallocations since reset.
	pub dealloc_count: usize,
	/// Current bytes allocated and not yet freed.
	pub bytes_allocated: isize,
	/// Peak bytes allocated since reset.
	pub peak_bytes: isize,
}

/// Checks that no memory has been leaked on the calling thread.
///
/// This asserts that the number of allocations equals the number of
/// deallocations and that no bytes are currently allocated.
///
/// # Panics
///
/// Panics if there are unmatched allocations or bytes still allocated.
pub fn check_no_leaks() {
	let stats = get_stats();
	let diff = stats.alloc_count as isize - stats.dealloc_count as isize;

	if diff != 0 {
		panic!(
			"Memory leak detected!\n\
             Allocations: {}\n\
             Deallocations: {}\n\
             Difference: {}\n\
             Bytes still allocated: {}",
			stats.alloc_count, stats.dealloc_count, diff, stats.bytes_allocated
		);
	}

	if stats.bytes_allocated != 0 {
		panic!(
			"Memory leak detected!\n\
             Bytes still allocated: {}\n\
             (alloc_count == dealloc_count but bytes != 0, possible size mismatch)",
			stats.bytes_allocated
		);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	// The unit test binary uses the system allocator, so counters only move
	// when this module's functions are called directly.

	#[test]
	fn reset_counters_zeroes_stats() {
		record_bytes(64);
		bump(&ALLOC_COUNT);

		reset_counters();

		assert_eq!(
			get_stats(),
			AllocationStats {
				alloc_count: 0,
				dealloc_count: 0,
				bytes_allocated: 0,
				peak_bytes: 0,
			}
		);
	}

	#[test]
	fn peak_tracks_high_water_mark() {
		reset_counters();

		record_bytes(100);
		record_bytes(50);
		record_bytes(-120);

		let stats = get_stats();
		assert_eq!(stats.bytes_allocated, 30);
		assert_eq!(stats.peak_bytes, 150);
	}

	#[test]
	#[should_panic(expected = "Memory leak detected")]
	fn check_no_leaks_reports_unbalanced_counts() {
		reset_counters();
		bump(&ALLOC_COUNT);
		record_bytes(16);

		check_no_leaks();
	}
}
