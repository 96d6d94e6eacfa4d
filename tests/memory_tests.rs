//! Memory leak detection tests for ordtree.
//!
//! These tests install the crate's tracking allocator and verify that every
//! byte allocated for nodes and iterator frames is released once the owning
//! tree or iterator is dropped, including on the split and merge paths.
//!
//! # Test Design
//!
//! Each test follows this pattern:
//! 1. Warm up lazily initialised statics by running the workload once
//! 2. Reset the calling thread's counters
//! 3. Perform tree operations that allocate memory
//! 4. Drop the tree and verify the counters balance

use ordtree::alloc::{self, TrackingAllocator};
use ordtree::Tree;

#[global_allocator]
static ALLOC: TrackingAllocator = TrackingAllocator;

// ===========================================================================
// Helper Functions
// ===========================================================================

/// Runs `workload` once untracked, then again with fresh counters, and
/// asserts that the second run released everything it allocated.
fn assert_no_leak<F: Fn()>(workload: F) {
	workload();

	alloc::reset_counters();
	workload();
	let stats = alloc::get_stats();

	assert!(stats.alloc_count > 0, "Workload did not allocate at all");
	alloc::check_no_leaks();
}

// ===========================================================================
// Basic Memory Tests
// ===========================================================================

/// An empty tree allocates nothing.
#[test]
fn empty_tree_does_not_allocate() {
	let tree = Tree::with_order(2).unwrap();
	drop(tree);

	alloc::reset_counters();
	let tree = Tree::with_order(2).unwrap();
	assert!(tree.is_empty());
	drop(tree);

	assert_eq!(alloc::get_stats().alloc_count, 0);
}

/// Dropping a populated multi-level tree releases every node.
#[test]
fn no_leak_after_drop() {
	assert_no_leak(|| {
		let mut tree = Tree::with_order(2).unwrap();
		for i in 0..1_000 {
			tree.insert(i);
		}
		assert!(tree.height() > 3);
		drop(tree);
	});
}

/// Removing every key releases nodes emptied by merges and root collapses.
#[test]
fn no_leak_after_insert_remove_all() {
	assert_no_leak(|| {
		let mut tree = Tree::with_order(3).unwrap();
		for i in 0..1_000 {
			tree.insert(i);
		}
		for i in (0..1_000).rev() {
			tree.remove(&i);
		}
		assert!(tree.is_empty());
		drop(tree);
	});
}

/// Nodes released during removal are freed immediately, not at drop time.
#[test]
fn removal_releases_memory_eagerly() {
	let mut tree = Tree::with_order(2).unwrap();
	tree.extend(0..2_000);
	let populated = alloc::get_stats().bytes_allocated;

	for i in 0..2_000 {
		tree.remove(&i);
	}

	assert!(
		alloc::get_stats().bytes_allocated < populated,
		"Emptying the tree should give memory back before it is dropped"
	);
	assert!(tree.is_empty());
}

/// clear() frees the whole node structure.
#[test]
fn no_leak_after_clear() {
	assert_no_leak(|| {
		let mut tree = Tree::with_order(2).unwrap();
		tree.extend(0..1_000);
		tree.clear();
		assert!(tree.is_empty());
		tree.extend(0..10);
		drop(tree);
	});
}

// ===========================================================================
// Iterator Memory Tests
// ===========================================================================

/// Iterating does not allocate while the frame stack fits inline, and
/// abandoning an iterator part way leaves nothing behind.
#[test]
fn iteration_does_not_allocate() {
	let mut tree = Tree::with_order(2).unwrap();
	tree.extend(0..50_000);
	assert!(tree.height() < 24);

	alloc::reset_counters();

	let mut iter = tree.iter();
	for _ in 0..1_000 {
		iter.next();
	}
	drop(iter);

	let total: i64 = tree.iter().sum();
	assert_eq!(total, (0..50_000).sum::<i64>());

	assert_eq!(alloc::get_stats().alloc_count, 0);
	alloc::check_no_leaks();
}

/// Iterators over many short-lived trees never outlive their frames.
#[test]
fn no_leak_iterating_fresh_trees() {
	assert_no_leak(|| {
		for n in [0, 1, 10, 100, 1_000] {
			let tree: Tree = (0..n).collect();
			assert_eq!(tree.iter().count(), n as usize);
		}
	});
}

// ===========================================================================
// Stress Memory Tests
// ===========================================================================

/// Interleaved inserts and removes keep splitting and merging nodes.
#[test]
fn no_leak_under_churn() {
	assert_no_leak(|| {
		let mut tree = Tree::with_order(2).unwrap();
		for round in 0..20 {
			for i in 0..200 {
				tree.insert(round * 7 + i);
			}
			for i in (0..200).step_by(2) {
				tree.remove(&(round * 7 + i));
			}
		}
		drop(tree);
	});
}
