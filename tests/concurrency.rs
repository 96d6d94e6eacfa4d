//! # Shared-Access Tests for the Ordered Index
//!
//! The tree performs no synchronisation of its own. These tests check that
//! it can be shared across threads behind an external lock, which is the
//! supported way to use it concurrently, and that it is `Send` and `Sync`.

use ordtree::{GenericTree, Tree};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn tree_and_iterator_are_send_and_sync() {
	assert_send_sync::<Tree>();
	assert_send_sync::<GenericTree<String>>();
	assert_send_sync::<ordtree::iter::Iter<'static, i64>>();
}

#[test]
fn tree_moves_between_threads() {
	let mut tree = Tree::with_order(2).unwrap();
	tree.extend(0..1_000);

	let tree = thread::spawn(move || {
		for i in (0..1_000).step_by(2) {
			tree.remove(&i);
		}
		tree
	})
	.join()
	.unwrap();

	tree.assert_invariants();
	assert_eq!(tree.len(), 500);
}

#[test]
fn concurrent_writers_behind_rwlock() {
	let tree = Arc::new(RwLock::new(Tree::with_order(3).unwrap()));
	let num_threads = 4;
	let entries_per_thread = 500;

	let handles: Vec<_> = (0..num_threads)
		.map(|t| {
			let tree = Arc::clone(&tree);
			thread::spawn(move || {
				for i in 0..entries_per_thread {
					let key = t * entries_per_thread + i;
					tree.write().insert(key);
				}
			})
		})
		.collect();

	for h in handles {
		h.join().unwrap();
	}

	let tree = tree.read();
	tree.assert_invariants();
	assert_eq!(tree.len(), (num_threads * entries_per_thread) as usize);
	assert!(tree.iter().copied().eq(0..num_threads * entries_per_thread));
}

#[test]
fn readers_see_consistent_snapshots_under_writer() {
	let tree = Arc::new(RwLock::new(Tree::with_order(2).unwrap()));
	let scans = Arc::new(AtomicUsize::new(0));

	let writer = {
		let tree = Arc::clone(&tree);
		thread::spawn(move || {
			for i in 0..2_000 {
				let mut guard = tree.write();
				guard.insert(i);
				if i % 4 == 0 {
					guard.remove(&(i / 2));
				}
			}
		})
	};

	let readers: Vec<_> = (0..3)
		.map(|_| {
			let tree = Arc::clone(&tree);
			let scans = Arc::clone(&scans);
			thread::spawn(move || {
				for _ in 0..50 {
					let guard = tree.read();
					let keys: Vec<i64> = guard.iter().copied().collect();
					assert_eq!(keys.len(), guard.len());
					assert!(keys.windows(2).all(|w| w[0] < w[1]), "Scan saw unsorted keys");
					scans.fetch_add(1, Ordering::Relaxed);
				}
			})
		})
		.collect();

	writer.join().unwrap();
	for r in readers {
		r.join().unwrap();
	}

	assert_eq!(scans.load(Ordering::Relaxed), 150);
	tree.read().assert_invariants();
}
