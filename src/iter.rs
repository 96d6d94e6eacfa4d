//! In-order iteration over the keys of a `GenericTree`.
//!
//! The iterator does not recurse. It keeps an explicit stack of frames, one
//! per node on the path from the root to the node currently being visited,
//! each recording the next key index to hand out from that node.
//!
//! ```text
//! stack (bottom → top):
//!   (root,  idx=1) ─► (inner, idx=0) ─► (leaf, idx=2)
//!                                         ▲
//!                                         └── next key comes from here
//! ```
//!
//! Every node is pushed exactly once and popped exactly once, so a full pass
//! costs O(n) and each call to `next` is amortized O(1).
use crate::{GenericTree, Node};
use smallvec::SmallVec;
use std::iter::FusedIterator;

/// Frames kept inline before the stack spills to the heap.
///
/// An order-2 tree of height 24 already holds millions of keys.
const INLINE_FRAMES: usize = 24;

/// One entry of the traversal stack.
#[derive(Debug)]
struct Frame<'t, K> {
	/// The node this frame walks over. Owned by the tree, not the frame.
	node: &'t Node<K>,
	/// Index of the next key of `node` to yield.
	idx: usize,
}

impl<K> Clone for Frame<'_, K> {
	fn clone(&self) -> Self {
		Frame {
			node: self.node,
			idx: self.idx,
		}
	}
}

/// An iterator over the keys of a tree, in ascending order.
///
/// Created by [`GenericTree::iter`]. The iterator borrows the tree, which
/// therefore cannot be mutated while the iterator is alive. It is forward
/// only and single pass; call [`GenericTree::iter`] again to restart.
pub struct Iter<'t, K> {
	stack: SmallVec<[Frame<'t, K>; INLINE_FRAMES]>,
	remaining: usize,
}

impl<'t, K> Iter<'t, K> {
	pub(crate) fn new(tree: &'t GenericTree<K>) -> Iter<'t, K> {
		let mut iter = Iter {
			stack: SmallVec::new(),
			remaining: tree.len,
		};
		if let Some(root) = tree.root.as_deref() {
			iter.descend_leftmost(root);
		}
		iter
	}

	/// Pushes a frame for `node` and for each of its leftmost descendants.
	fn descend_leftmost(&mut self, mut node: &'t Node<K>) {
		loop {
			self.stack.push(Frame {
				node,
				idx: 0,
			});
			match node {
				Node::Internal(internal) => node = &*internal.edges[0],
				Node::Leaf(_) => return,
			}
		}
	}
}

impl<'t, K> Iterator for Iter<'t, K> {
	type Item = &'t K;

	fn next(&mut self) -> Option<&'t K> {
		// Drop frames whose node has handed out all of its keys
		while let Some(frame) = self.stack.last() {
			if frame.idx < frame.node.len() {
				break;
			}
			self.stack.pop();
		}

		let frame = self.stack.last_mut()?;
		let node = frame.node;
		let idx = frame.idx;
		frame.idx += 1;
		self.remaining -= 1;

		// After an internal key comes the subtree to its right
		if let Node::Internal(internal) = node {
			self.descend_leftmost(&internal.edges[idx + 1]);
		}

		node.keys().get(idx)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(self.remaining, Some(self.remaining))
	}
}

impl<K> ExactSizeIterator for Iter<'_, K> {}

impl<K> FusedIterator for Iter<'_, K> {}

impl<K> Clone for Iter<'_, K> {
	fn clone(&self) -> Self {
		Iter {
			stack: self.stack.clone(),
			remaining: self.remaining,
		}
	}
}

impl<K> std::fmt::Debug for Iter<'_, K> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Iter")
			.field("depth", &self.stack.len())
			.field("leaf", &self.stack.last().is_some_and(|frame| frame.node.is_leaf()))
			.field("remaining", &self.remaining)
			.finish()
	}
}
