//! # Ordtree: An In-Memory Ordered Index
//!
//! This crate provides a balanced multiway search tree (a classic B-tree) that
//! keeps a set of distinct keys in ascending order. It supports insertion,
//! removal, membership tests and in-order iteration.
//!
//! ## Design Overview
//!
//! The tree is parameterised by a **tree-order** `L` (at least 2), fixed when
//! the tree is created:
//!
//! - every node except the root holds between `L - 1` and `2L - 1` keys
//! - the root holds between 1 and `2L - 1` keys, or is absent when the tree
//!   is empty
//! - an internal node with `n` keys owns exactly `n + 1` children
//! - all leaves sit at the same depth
//!
//! A node is **full** when it holds `2L - 1` keys and **minimal** when it holds
//! `L - 1` keys.
//!
//! ### Top-down maintenance
//!
//! Both mutating operations repair the tree on the way *down*, so no
//! operation ever has to walk back up to fix a node it already visited:
//!
//! - **Insertion** splits every full node it is about to enter. The median
//!   key moves up into the parent, which is known to have room because it
//!   was split on the previous step if it was full.
//! - **Removal** tops up every minimal node it is about to enter, first by
//!   borrowing a key from the left sibling, then from the right sibling, and
//!   finally by merging with a sibling around the separating parent key.
//!
//! ```text
//!                    ┌─────────────────┐
//!                    │      Root       │  <- Option<Box<Node>>, absent when empty
//!                    │    keys: [K]    │
//!                    │  edges: [Box]   │
//!                    └────────┬────────┘
//!                             │
//!              ┌──────────────┼──────────────┐
//!              ▼              ▼              ▼
//!        ┌──────────┐  ┌──────────┐  ┌──────────┐
//!        │   Leaf   │  │   Leaf   │  │   Leaf   │  <- Keys only, no edges
//!        │ keys:[K] │  │ keys:[K] │  │ keys:[K] │
//!        └──────────┘  └──────────┘  └──────────┘
//! ```
//!
//! Unlike a B+ tree, separator keys in internal nodes are real members of the
//! set: every key is stored exactly once, in whichever node it currently
//! lives in.
//!
//! ## Basic Usage
//!
//! ```
//! use ordtree::Tree;
//!
//! let mut tree = Tree::with_order(2).unwrap();
//!
//! for key in [10, 20, 5, 6, 12, 30, 7, 17] {
//!     tree.insert(key);
//! }
//!
//! assert!(tree.contains(&6));
//! assert!(!tree.contains(&99));
//!
//! let keys: Vec<i64> = tree.iter().copied().collect();
//! assert_eq!(keys, vec![5, 6, 7, 10, 12, 17, 20, 30]);
//!
//! tree.remove(&6);
//! assert!(!tree.contains(&6));
//! ```
//!
//! ## Thread Safety
//!
//! The tree performs no synchronisation of its own. Every mutating operation
//! takes `&mut self` and iterators borrow the tree, so the borrow checker
//! already rules out mutation during iteration. To share a tree between
//! threads, wrap it in an external lock such as `parking_lot::RwLock`.

use tracing::{debug, trace};

use std::borrow::Borrow;
use std::fmt;

pub mod alloc;
pub mod error;
pub mod iter;

#[cfg(test)]
mod util;

// ---------------------------------------------------------------------------
// Configuration Constants
// ---------------------------------------------------------------------------

/// The smallest tree-order that forms a valid B-tree (a 2-3-4 tree).
pub const MIN_ORDER: usize = 2;

/// Tree-order used by [`GenericTree::new`] and [`Default`].
///
/// Nodes hold between 15 and 31 keys. Larger orders reduce tree height at
/// the cost of longer key shifts inside each node.
pub const DEFAULT_ORDER: usize = 16;

/// The largest accepted tree-order.
///
/// A node of order `L` owns up to `2L` children, so `2L` must fit in a
/// `usize`.
pub const MAX_ORDER: usize = usize::MAX / 2;

/// Upper bound on the keys reserved up front for each new node. Nodes of a
/// larger order grow their storage on demand past this point.
const RESERVED_KEYS_LIMIT: usize = 1024;

// ---------------------------------------------------------------------------
// Public Type Aliases
// ---------------------------------------------------------------------------

/// An ordered index over signed integer keys.
pub type Tree = GenericTree<i64>;

// ---------------------------------------------------------------------------
// Core Tree Structure
// ---------------------------------------------------------------------------

/// An in-memory B-tree holding a set of distinct, ordered keys.
///
/// # Type Parameters
///
/// - `K`: The key type. Must implement `Ord`. Keys are moved into the tree
///   and never cloned.
///
/// # Internal Structure
///
/// The tree owns its root exclusively, and every internal node owns its
/// children exclusively, so the whole structure is a strict ownership tree.
/// Dropping the tree releases every node, children before their parent.
pub struct GenericTree<K> {
	/// The root node, `None` while the tree holds no keys.
	pub(crate) root: Option<Box<Node<K>>>,
	/// The tree-order `L`.
	pub(crate) order: usize,
	/// Number of keys currently stored.
	pub(crate) len: usize,
}

impl<K: Ord> Default for GenericTree<K> {
	fn default() -> Self {
		Self::new()
	}
}

// ---------------------------------------------------------------------------
// GenericTree Implementation
// ---------------------------------------------------------------------------

impl<K> GenericTree<K> {
	// -----------------------------------------------------------------------
	// Construction
	// -----------------------------------------------------------------------

	/// Creates a new, empty tree with the [`DEFAULT_ORDER`].
	///
	/// No node is allocated until the first key is inserted.
	///
	/// # Example
	///
	/// ```
	/// use ordtree::Tree;
	///
	/// let tree = Tree::new();
	/// assert!(tree.is_empty());
	/// assert_eq!(tree.height(), 0);
	/// ```
	pub fn new() -> Self {
		debug!(order = DEFAULT_ORDER, "creating ordered index");
		GenericTree {
			root: None,
			order: DEFAULT_ORDER,
			len: 0,
		}
	}

	/// Creates a new, empty tree with the given tree-order `L`.
	///
	/// # Errors
	///
	/// Returns [`error::Error::InvalidOrder`] if `order < 2`, and
	/// [`error::Error::OrderTooLarge`] if `order > MAX_ORDER`.
	///
	/// # Example
	///
	/// ```
	/// use ordtree::Tree;
	///
	/// let tree = Tree::with_order(3).unwrap();
	/// assert_eq!(tree.order(), 3);
	///
	/// assert!(Tree::with_order(1).is_err());
	/// assert!(Tree::with_order(usize::MAX).is_err());
	/// ```
	pub fn with_order(order: usize) -> error::Result<Self> {
		if order < MIN_ORDER {
			return Err(error::Error::InvalidOrder {
				order,
				min: MIN_ORDER,
			});
		}
		if order > MAX_ORDER {
			return Err(error::Error::OrderTooLarge {
				order,
				max: MAX_ORDER,
			});
		}
		debug!(order, "creating ordered index");
		Ok(GenericTree {
			root: None,
			order,
			len: 0,
		})
	}

	// -----------------------------------------------------------------------
	// Tree Metadata
	// -----------------------------------------------------------------------

	/// Returns the tree-order `L` this tree was created with.
	#[inline]
	pub fn order(&self) -> usize {
		self.order
	}

	/// Returns the number of keys in the tree.
	#[inline]
	pub fn len(&self) -> usize {
		self.len
	}

	/// Returns `true` if the tree contains no keys.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Returns the current height of the tree.
	///
	/// - Height 0: The tree is empty and has no root
	/// - Height 1: The root is a single leaf
	/// - Height N: N-1 levels of internal nodes plus one level of leaves
	pub fn height(&self) -> usize {
		let mut height = 0;
		let mut node = self.root.as_deref();
		while let Some(current) = node {
			height += 1;
			node = match current {
				Node::Internal(internal) => Some(&*internal.edges[0]),
				Node::Leaf(_) => None,
			};
		}
		height
	}

	/// Returns the smallest key in the tree, or `None` if it is empty.
	///
	/// # Example
	///
	/// ```
	/// use ordtree::Tree;
	///
	/// let tree: Tree = [3, 1, 2].into_iter().collect();
	/// assert_eq!(tree.first(), Some(&1));
	/// ```
	pub fn first(&self) -> Option<&K> {
		let mut node = self.root.as_deref()?;
		loop {
			match node {
				Node::Internal(internal) => node = &*internal.edges[0],
				Node::Leaf(leaf) => return leaf.keys.first(),
			}
		}
	}

	/// Returns the largest key in the tree, or `None` if it is empty.
	///
	/// # Example
	///
	/// ```
	/// use ordtree::Tree;
	///
	/// let tree: Tree = [3, 1, 2].into_iter().collect();
	/// assert_eq!(tree.last(), Some(&3));
	/// ```
	pub fn last(&self) -> Option<&K> {
		let mut node = self.root.as_deref()?;
		loop {
			match node {
				Node::Internal(internal) => node = internal.last_edge(),
				Node::Leaf(leaf) => return leaf.keys.last(),
			}
		}
	}

	// -----------------------------------------------------------------------
	// Public API: Read Operations
	// -----------------------------------------------------------------------

	/// Returns `true` if the tree contains the specified key.
	///
	/// This is a plain top-down search. It never allocates or mutates.
	///
	/// # Example
	///
	/// ```
	/// use ordtree::Tree;
	///
	/// let mut tree = Tree::new();
	/// tree.insert(1);
	///
	/// assert!(tree.contains(&1));
	/// assert!(!tree.contains(&2));
	/// ```
	pub fn contains<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q> + Ord,
		Q: ?Sized + Ord,
	{
		let Some(mut node) = self.root.as_deref() else {
			return false;
		};

		loop {
			let (pos, exact) = node.lower_bound(key);
			if exact {
				return true;
			}
			match node {
				Node::Internal(internal) => node = &*internal.edges[pos],
				Node::Leaf(_) => return false,
			}
		}
	}

	/// Returns an iterator over the keys of the tree, in ascending order.
	///
	/// The iterator holds a shared borrow of the tree, so the tree cannot be
	/// mutated until the iterator is dropped.
	///
	/// # Example
	///
	/// ```
	/// use ordtree::Tree;
	///
	/// let tree: Tree = [30, 10, 20].into_iter().collect();
	///
	/// let mut iter = tree.iter();
	/// assert_eq!(iter.next(), Some(&10));
	/// assert_eq!(iter.next(), Some(&20));
	/// assert_eq!(iter.next(), Some(&30));
	/// assert_eq!(iter.next(), None);
	/// ```
	pub fn iter(&self) -> iter::Iter<'_, K> {
		iter::Iter::new(self)
	}

	// -----------------------------------------------------------------------
	// Public API: Write Operations
	// -----------------------------------------------------------------------

	/// Inserts a key into the tree.
	///
	/// Returns `true` if the key was newly inserted. If the key is already
	/// present the tree is left untouched and `false` is returned.
	///
	/// # Algorithm
	///
	/// 1. If the root is full, grow the tree: a new empty root adopts the old
	///    one as its only child, which is then split.
	/// 2. Descend towards the leaf that should hold the key, splitting every
	///    full child before entering it.
	/// 3. Insert the key into the leaf at its sorted position.
	///
	/// # Example
	///
	/// ```
	/// use ordtree::Tree;
	///
	/// let mut tree = Tree::new();
	///
	/// assert!(tree.insert(1));  // New key
	/// assert!(!tree.insert(1)); // Already present
	/// assert_eq!(tree.len(), 1);
	/// ```
	pub fn insert(&mut self, key: K) -> bool
	where
		K: Ord,
	{
		// Splitting on the way down would reshape the tree even for a
		// duplicate, so rule duplicates out before touching any node.
		if self.contains(&key) {
			return false;
		}

		let order = self.order;
		let root = match self.root.take() {
			None => {
				let mut leaf = LeafNode::with_order(order);
				leaf.keys.push(key);
				self.root = Some(Box::new(Node::Leaf(leaf)));
				self.len = 1;
				return true;
			}
			Some(root) if root.is_full(order) => {
				let mut new_root = InternalNode::with_order(order);
				new_root.edges.push(root);
				new_root.split_child(0, order);
				trace!(order, len = self.len, "root split, tree height grows");
				self.root.insert(Box::new(Node::Internal(new_root)))
			}
			Some(root) => self.root.insert(root),
		};

		root.insert_non_full(key, order);
		self.len += 1;
		true
	}

	/// Removes a key from the tree.
	///
	/// Returns `true` if the key was present. Removing an absent key is a
	/// no-op as far as the set of keys is concerned, although nodes along the
	/// search path may still have been rebalanced.
	///
	/// # Algorithm
	///
	/// Descending from the root, every child is topped up to at least `L`
	/// keys before it is entered (borrow left, else borrow right, else
	/// merge). When the key is found in an internal node it is replaced by
	/// its predecessor if the left child can spare a key, else by its
	/// successor if the right child can, else both children are merged
	/// around it and the removal continues in the merged node.
	///
	/// If the root ends up with no keys, it is replaced by its only child
	/// (or dropped entirely when it was a leaf).
	///
	/// # Example
	///
	/// ```
	/// use ordtree::Tree;
	///
	/// let mut tree = Tree::new();
	/// tree.insert(1);
	///
	/// assert!(tree.remove(&1));
	/// assert!(!tree.remove(&1)); // Already removed
	/// assert!(tree.is_empty());
	/// ```
	pub fn remove<Q>(&mut self, key: &Q) -> bool
	where
		K: Borrow<Q> + Ord,
		Q: ?Sized + Ord,
	{
		let order = self.order;
		let Some(root) = self.root.as_mut() else {
			return false;
		};

		let removed = root.remove(key, order);

		if root.len() == 0 {
			self.root = match self.root.take().map(|root| *root) {
				Some(Node::Internal(mut internal)) => {
					trace!(order, len = self.len, "root emptied, tree height shrinks");
					internal.edges.pop()
				}
				Some(Node::Leaf(_)) | None => None,
			};
		}

		if removed {
			self.len -= 1;
		}
		removed
	}

	/// Removes every key from the tree.
	///
	/// All nodes are released and the tree returns to its initial, rootless
	/// state. The tree-order is kept.
	///
	/// # Example
	///
	/// ```
	/// use ordtree::Tree;
	///
	/// let mut tree: Tree = (0..100).collect();
	/// assert_eq!(tree.len(), 100);
	///
	/// tree.clear();
	/// assert!(tree.is_empty());
	/// assert_eq!(tree.height(), 0);
	/// ```
	pub fn clear(&mut self) {
		trace!(len = self.len, "clearing ordered index");
		self.root = None;
		self.len = 0;
	}
}

impl<K: fmt::Debug> fmt::Debug for GenericTree<K> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.iter()).finish()
	}
}

impl<K: Ord> FromIterator<K> for GenericTree<K> {
	fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
		let mut tree = GenericTree::new();
		tree.extend(iter);
		tree
	}
}

impl<K: Ord> Extend<K> for GenericTree<K> {
	fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
		for key in iter {
			self.insert(key);
		}
	}
}

impl<'t, K> IntoIterator for &'t GenericTree<K> {
	type Item = &'t K;
	type IntoIter = iter::Iter<'t, K>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

// ===========================================================================
// Node Types
// ===========================================================================

/// A node in the tree, either internal or leaf.
///
/// Both variants store their keys in ascending order. Only internal nodes
/// own children, always exactly one more than they have keys.
pub(crate) enum Node<K> {
	/// An internal node containing keys and child pointers.
	Internal(InternalNode<K>),
	/// A leaf node containing only keys.
	Leaf(LeafNode<K>),
}

impl<K: fmt::Debug> fmt::Debug for Node<K> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Node::Internal(ref internal) => f.debug_tuple("Internal").field(internal).finish(),
			Node::Leaf(ref leaf) => f.debug_tuple("Leaf").field(leaf).finish(),
		}
	}
}

impl<K> Node<K> {
	/// Returns `true` if this is a leaf node.
	#[inline]
	pub(crate) fn is_leaf(&self) -> bool {
		matches!(self, Node::Leaf(_))
	}

	/// Returns the keys stored in this node.
	#[inline]
	pub(crate) fn keys(&self) -> &[K] {
		match self {
			Node::Internal(ref internal) => &internal.keys,
			Node::Leaf(ref leaf) => &leaf.keys,
		}
	}

	/// Returns the number of keys stored in this node.
	#[inline]
	pub(crate) fn len(&self) -> usize {
		self.keys().len()
	}

	/// Returns `true` if the node holds the maximum of `2L - 1` keys.
	#[inline]
	pub(crate) fn is_full(&self, order: usize) -> bool {
		self.len() >= max_keys(order)
	}

	/// Returns `true` if the node can give up a key and stay at or above the
	/// `L - 1` minimum.
	#[inline]
	pub(crate) fn can_spare(&self, order: usize) -> bool {
		self.len() > min_keys(order)
	}

	/// Binary search for a key, returning position and whether it's an exact match.
	///
	/// # Returns
	///
	/// `(position, exact_match)` where:
	/// - `position`: Index of the key if found, otherwise the index of the
	///   child (or leaf slot) that would hold it
	/// - `exact_match`: `true` if `keys[position] == key`
	#[inline]
	pub(crate) fn lower_bound<Q>(&self, key: &Q) -> (usize, bool)
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		search_keys(self.keys(), key)
	}

	/// Splits this full node around the key at `median`.
	///
	/// After split:
	/// - `self` (left) keeps keys `[0, median)` and, if internal, edges
	///   `[0, median]`
	/// - the returned right node takes keys `(median, len)` and, if internal,
	///   edges `(median, len]`
	/// - the key at `median` is returned to be promoted into the parent
	fn split(&mut self, median: usize, order: usize) -> (K, Node<K>) {
		match self {
			Node::Internal(internal) => {
				let (key, right) = internal.split(median, order);
				(key, Node::Internal(right))
			}
			Node::Leaf(leaf) => {
				let (key, right) = leaf.split(median, order);
				(key, Node::Leaf(right))
			}
		}
	}

	/// Appends the separator and every key (and edge) of `right` to `self`.
	///
	/// `right` is consumed; its allocation is released when this returns.
	fn merge(&mut self, separator: K, right: Node<K>) {
		match (self, right) {
			(Node::Internal(left), Node::Internal(right)) => left.merge(separator, right),
			(Node::Leaf(left), Node::Leaf(right)) => left.merge(separator, right),
			_ => unreachable!("merge between a leaf and an internal node - sibling depth mismatch"),
		}
	}

	/// Removes the largest key (and, if internal, the rightmost edge).
	fn pop_back(&mut self) -> (K, Option<Box<Node<K>>>) {
		match self {
			Node::Internal(internal) => {
				let key = internal.keys.pop().expect("donor sibling must have keys");
				(key, internal.edges.pop())
			}
			Node::Leaf(leaf) => (leaf.keys.pop().expect("donor sibling must have keys"), None),
		}
	}

	/// Removes the smallest key (and, if internal, the leftmost edge).
	fn pop_front(&mut self) -> (K, Option<Box<Node<K>>>) {
		match self {
			Node::Internal(internal) => (internal.keys.remove(0), Some(internal.edges.remove(0))),
			Node::Leaf(leaf) => (leaf.keys.remove(0), None),
		}
	}

	/// Prepends a key (and, if internal, an edge) rotated in from the left.
	fn push_front(&mut self, key: K, edge: Option<Box<Node<K>>>) {
		match (self, edge) {
			(Node::Internal(internal), Some(edge)) => {
				internal.keys.insert(0, key);
				internal.edges.insert(0, edge);
			}
			(Node::Leaf(leaf), None) => leaf.keys.insert(0, key),
			_ => unreachable!("rotation between a leaf and an internal node - sibling depth mismatch"),
		}
	}

	/// Appends a key (and, if internal, an edge) rotated in from the right.
	fn push_back(&mut self, key: K, edge: Option<Box<Node<K>>>) {
		match (self, edge) {
			(Node::Internal(internal), Some(edge)) => {
				internal.keys.push(key);
				internal.edges.push(edge);
			}
			(Node::Leaf(leaf), None) => leaf.keys.push(key),
			_ => unreachable!("rotation between a leaf and an internal node - sibling depth mismatch"),
		}
	}
}

impl<K: Ord> Node<K> {
	/// Inserts `key` into the subtree rooted at this node.
	///
	/// The caller guarantees that this node is not full and that `key` is
	/// not already present anywhere in the tree.
	fn insert_non_full(&mut self, key: K, order: usize) {
		match self {
			Node::Leaf(leaf) => {
				let (pos, _) = leaf.lower_bound(&key);
				leaf.keys.insert(pos, key);
			}
			Node::Internal(internal) => {
				let (mut pos, _) = internal.lower_bound(&key);
				if internal.edges[pos].is_full(order) {
					internal.split_child(pos, order);
					// The promoted median now separates the two halves
					if key > internal.keys[pos] {
						pos += 1;
					}
				}
				internal.edges[pos].insert_non_full(key, order);
			}
		}
	}

	/// Removes `key` from the subtree rooted at this node.
	///
	/// The caller guarantees that this node is either the root or holds at
	/// least `L` keys, so it can lose one without underflowing.
	fn remove<Q>(&mut self, key: &Q, order: usize) -> bool
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		match self {
			Node::Leaf(leaf) => match leaf.lower_bound(key) {
				(pos, true) => {
					leaf.keys.remove(pos);
					true
				}
				(_, false) => false,
			},
			Node::Internal(internal) => internal.remove(key, order),
		}
	}

	/// Removes and returns the largest key of this subtree.
	///
	/// Same precondition as [`Node::remove`].
	fn remove_last(&mut self, order: usize) -> K {
		match self {
			Node::Leaf(leaf) => leaf.keys.pop().expect("subtree must not be empty"),
			Node::Internal(internal) => {
				let pos = internal.fill_child(internal.edges.len() - 1, order);
				internal.edges[pos].remove_last(order)
			}
		}
	}

	/// Removes and returns the smallest key of this subtree.
	///
	/// Same precondition as [`Node::remove`].
	fn remove_first(&mut self, order: usize) -> K {
		match self {
			Node::Leaf(leaf) => leaf.keys.remove(0),
			Node::Internal(internal) => {
				let pos = internal.fill_child(0, order);
				internal.edges[pos].remove_first(order)
			}
		}
	}
}

/// Binary search over a sorted key slice. See [`Node::lower_bound`].
#[inline]
fn search_keys<K, Q>(keys: &[K], key: &Q) -> (usize, bool)
where
	K: Borrow<Q>,
	Q: ?Sized + Ord,
{
	match keys.binary_search_by(|probe| probe.borrow().cmp(key)) {
		Ok(pos) => (pos, true),
		Err(pos) => (pos, false),
	}
}

/// Maximum number of keys in a node of the given order.
#[inline]
pub(crate) const fn max_keys(order: usize) -> usize {
	2 * order - 1
}

/// Minimum number of keys in a non-root node of the given order.
#[inline]
pub(crate) const fn min_keys(order: usize) -> usize {
	order - 1
}

/// Number of keys to reserve when a node is created.
#[inline]
const fn reserved_keys(order: usize) -> usize {
	let max = max_keys(order);
	if max < RESERVED_KEYS_LIMIT {
		max
	} else {
		RESERVED_KEYS_LIMIT
	}
}

// ===========================================================================
// Leaf Node
// ===========================================================================

/// A leaf node, holding up to `2L - 1` sorted keys and no children.
pub(crate) struct LeafNode<K> {
	/// Sorted array of keys.
	pub(crate) keys: Vec<K>,
}

impl<K: fmt::Debug> fmt::Debug for LeafNode<K> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LeafNode").field("keys", &self.keys).finish()
	}
}

impl<K> LeafNode<K> {
	/// Creates a new, empty leaf with room for a full node's worth of keys.
	pub(crate) fn with_order(order: usize) -> LeafNode<K> {
		LeafNode {
			keys: Vec::with_capacity(reserved_keys(order)),
		}
	}

	/// Binary search over the leaf's keys. See [`Node::lower_bound`].
	#[inline]
	pub(crate) fn lower_bound<Q>(&self, key: &Q) -> (usize, bool)
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		search_keys(&self.keys, key)
	}

	/// Splits this leaf, moving keys after `median` to a new right leaf.
	///
	/// Returns the median key and the right leaf.
	pub(crate) fn split(&mut self, median: usize, order: usize) -> (K, LeafNode<K>) {
		let mut right = LeafNode::with_order(order);
		right.keys.extend(self.keys.drain(median + 1..));
		let key = self.keys.pop().expect("split position must be within node bounds");
		(key, right)
	}

	/// Merges `separator` and all of `right`'s keys into `self`.
	pub(crate) fn merge(&mut self, separator: K, right: LeafNode<K>) {
		self.keys.push(separator);
		self.keys.extend(right.keys);
	}
}

// ===========================================================================
// Internal Node
// ===========================================================================

/// An internal node, storing keys and owning one more child than it has keys.
///
/// # Structure
///
/// ```text
/// keys:       [K0,    K1,    K2,   ...   K(n-1)]
/// edges:   [E0,   E1,    E2,    ...   E(n-1),  E(n)]
///
/// Navigation: every key in E(i) is < K(i), and every key in E(i+1) is > K(i)
/// ```
///
/// # Invariants
///
/// - `edges.len() == keys.len() + 1`
/// - Keys are sorted in ascending order
/// - All edges lead to nodes of the same kind (leaf or internal)
pub(crate) struct InternalNode<K> {
	/// Keys, sorted in ascending order.
	pub(crate) keys: Vec<K>,
	/// Owned child nodes.
	pub(crate) edges: Vec<Box<Node<K>>>,
}

impl<K: fmt::Debug> fmt::Debug for InternalNode<K> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("InternalNode").field("keys", &self.keys).field("edges", &self.edges).finish()
	}
}

impl<K> InternalNode<K> {
	/// Creates a new internal node with no keys and no edges.
	///
	/// Capacity is reserved for a full node, so later splits and merges
	/// never reallocate.
	pub(crate) fn with_order(order: usize) -> InternalNode<K> {
		InternalNode {
			keys: Vec::with_capacity(reserved_keys(order)),
			edges: Vec::with_capacity(reserved_keys(order) + 1),
		}
	}

	/// Binary search over the node's keys. See [`Node::lower_bound`].
	#[inline]
	pub(crate) fn lower_bound<Q>(&self, key: &Q) -> (usize, bool)
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		search_keys(&self.keys, key)
	}

	/// Returns the rightmost child.
	#[inline]
	pub(crate) fn last_edge(&self) -> &Node<K> {
		self.edges.last().expect("internal node must have edges")
	}

	/// Splits this internal node, moving keys and edges after `median` to a
	/// new right node.
	///
	/// Returns the median key and the right node.
	pub(crate) fn split(&mut self, median: usize, order: usize) -> (K, InternalNode<K>) {
		let mut right = InternalNode::with_order(order);
		right.keys.extend(self.keys.drain(median + 1..));
		right.edges.extend(self.edges.drain(median + 1..));
		let key = self.keys.pop().expect("split position must be within node bounds");
		(key, right)
	}

	/// Merges `separator` and all of `right`'s keys and edges into `self`.
	pub(crate) fn merge(&mut self, separator: K, right: InternalNode<K>) {
		self.keys.push(separator);
		self.keys.extend(right.keys);
		self.edges.extend(right.edges);
	}

	// -----------------------------------------------------------------------
	// Structural operations on children
	// -----------------------------------------------------------------------

	/// Splits the full child at `pos`, promoting its median key into this
	/// node at `pos` and inserting the new right half at `pos + 1`.
	///
	/// The caller guarantees this node is not full.
	pub(crate) fn split_child(&mut self, pos: usize, order: usize) {
		let (median, right) = self.edges[pos].split(min_keys(order), order);
		self.keys.insert(pos, median);
		self.edges.insert(pos + 1, Box::new(right));
	}

	/// Merges the child at `pos + 1` into the child at `pos`, pulling the
	/// separator `keys[pos]` down between them.
	///
	/// This node loses one key and one edge; the right child is released.
	pub(crate) fn merge_children(&mut self, pos: usize) {
		let separator = self.keys.remove(pos);
		let right = self.edges.remove(pos + 1);
		self.edges[pos].merge(separator, *right);
	}

	/// Rotates the largest key of the child at `pos - 1` up into this node,
	/// and the old separator down into the front of the child at `pos`.
	pub(crate) fn borrow_from_left(&mut self, pos: usize) {
		let (key, edge) = self.edges[pos - 1].pop_back();
		let separator = std::mem::replace(&mut self.keys[pos - 1], key);
		self.edges[pos].push_front(separator, edge);
	}

	/// Rotates the smallest key of the child at `pos + 1` up into this node,
	/// and the old separator down onto the back of the child at `pos`.
	pub(crate) fn borrow_from_right(&mut self, pos: usize) {
		let (key, edge) = self.edges[pos + 1].pop_front();
		let separator = std::mem::replace(&mut self.keys[pos], key);
		self.edges[pos].push_back(separator, edge);
	}

	/// Makes sure the child at `pos` holds at least `L` keys before a removal
	/// descends into it.
	///
	/// Tries, in order: borrowing from the left sibling, borrowing from the
	/// right sibling, merging with the left sibling, merging with the right
	/// sibling. Returns the index of the child that now covers the original
	/// child's key range, which moves one to the left after a left merge.
	pub(crate) fn fill_child(&mut self, pos: usize, order: usize) -> usize {
		if self.edges[pos].can_spare(order) {
			return pos;
		}

		if pos > 0 && self.edges[pos - 1].can_spare(order) {
			self.borrow_from_left(pos);
			pos
		} else if pos < self.keys.len() && self.edges[pos + 1].can_spare(order) {
			self.borrow_from_right(pos);
			pos
		} else if pos > 0 {
			self.merge_children(pos - 1);
			pos - 1
		} else {
			self.merge_children(pos);
			pos
		}
	}
}

impl<K: Ord> InternalNode<K> {
	/// Removes `key` from the subtree rooted at this internal node.
	fn remove<Q>(&mut self, key: &Q, order: usize) -> bool
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		let (pos, exact) = self.lower_bound(key);

		if !exact {
			let pos = self.fill_child(pos, order);
			return self.edges[pos].remove(key, order);
		}

		if self.edges[pos].can_spare(order) {
			// Replace with the predecessor
			self.keys[pos] = self.edges[pos].remove_last(order);
		} else if self.edges[pos + 1].can_spare(order) {
			// Replace with the successor
			self.keys[pos] = self.edges[pos + 1].remove_first(order);
		} else {
			// Both neighbours are minimal: fold the key into the merged child
			self.merge_children(pos);
			return self.edges[pos].remove(key, order);
		}
		true
	}
}

// ===========================================================================
// Invariant Validation
// ===========================================================================

impl<K: Ord + fmt::Debug> GenericTree<K> {
	/// Validates all tree invariants. Panics with diagnostic info if any invariant is violated.
	///
	/// This is a full O(n) walk intended for tests and debugging.
	///
	/// # Invariants Checked
	///
	/// 1. Root presence: a present root holds at least one key
	/// 2. Occupancy: every non-root node holds between `L - 1` and `2L - 1` keys
	/// 3. Key ordering: keys strictly ascend within each node and lie strictly
	///    between the separators bounding their subtree
	/// 4. Fan-out: internal nodes own exactly `keys + 1` children
	/// 5. Height consistency: all leaves at the same depth
	/// 6. Length consistency: the key counter matches the keys stored
	pub fn assert_invariants(&self) {
		let Some(root) = self.root.as_deref() else {
			assert_eq!(self.len, 0, "Rootless tree reports {} keys", self.len);
			return;
		};

		// Invariant 1: Root presence
		assert!(root.len() > 0, "Root is present but holds no keys: {:?}", root.keys());

		let height = self.height();
		let count = self.validate_node_recursive(root, 1, height, None, None);

		// Invariant 6: Length consistency
		assert_eq!(count, self.len, "Tree holds {} keys but len() is {}", count, self.len);
	}

	/// Recursively validates a node and its subtree, returning its key count.
	///
	/// # Arguments
	/// * `node` - The node to validate
	/// * `depth` - Depth of the node (1 = root)
	/// * `height` - Total tree height
	/// * `lower` - Exclusive lower bound from the parent, None if leftmost
	/// * `upper` - Exclusive upper bound from the parent, None if rightmost
	fn validate_node_recursive(
		&self,
		node: &Node<K>,
		depth: usize,
		height: usize,
		lower: Option<&K>,
		upper: Option<&K>,
	) -> usize {
		let keys = node.keys();

		// Invariant 2: Occupancy
		assert!(
			keys.len() <= max_keys(self.order),
			"Node at depth {} holds {} keys, above the maximum of {}",
			depth,
			keys.len(),
			max_keys(self.order)
		);
		if depth > 1 {
			assert!(
				keys.len() >= min_keys(self.order),
				"Node at depth {} holds {} keys, below the minimum of {}: {:?}",
				depth,
				keys.len(),
				min_keys(self.order),
				keys
			);
		}

		// Invariant 3: Key ordering
		for i in 1..keys.len() {
			assert!(
				keys[i - 1] < keys[i],
				"Keys not sorted at positions {} and {}: {:?} >= {:?}",
				i - 1,
				i,
				keys[i - 1],
				keys[i]
			);
		}
		if let (Some(lower), Some(first)) = (lower, keys.first()) {
			assert!(first > lower, "Key {:?} not greater than parent bound {:?}", first, lower);
		}
		if let (Some(upper), Some(last)) = (upper, keys.last()) {
			assert!(last < upper, "Key {:?} not less than parent bound {:?}", last, upper);
		}

		match node {
			Node::Leaf(leaf) => {
				// Invariant 5: Height consistency
				assert_eq!(depth, height, "Found leaf at depth {} but height is {}", depth, height);
				leaf.keys.len()
			}
			Node::Internal(internal) => {
				assert!(depth < height, "Found internal node at leaf depth {}", depth);

				// Invariant 4: Fan-out
				assert_eq!(
					internal.edges.len(),
					internal.keys.len() + 1,
					"Internal node at depth {} has {} keys but {} edges",
					depth,
					internal.keys.len(),
					internal.edges.len()
				);

				let mut count = internal.keys.len();
				for (i, edge) in internal.edges.iter().enumerate() {
					let child_lower = if i == 0 {
						lower
					} else {
						Some(&internal.keys[i - 1])
					};
					let child_upper = internal.keys.get(i).or(upper);
					count +=
						self.validate_node_recursive(edge, depth + 1, height, child_lower, child_upper);
				}
				count
			}
		}
	}
}
