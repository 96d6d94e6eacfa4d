//! # Error Types for the Ordered Index
//!
//! The tree has very few ways to fail. Logical misuse is not an error:
//!
//! - inserting a key that is already present is a no-op (`insert` returns `false`)
//! - removing a key that is absent is a no-op (`remove` returns `false`)
//!
//! The only fallible call is construction, which rejects a tree-order that
//! cannot form a valid B-tree or whose node sizes would overflow. Allocation
//! failure is not reported through this type; it aborts the process through
//! the global allocation error handler, like every other collection in `std`.

use thiserror::Error;

/// Errors that can occur while configuring a tree.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
	/// The requested tree-order is below the minimum of 2.
	///
	/// With an order `L`, every non-root node holds between `L - 1` and
	/// `2L - 1` keys. An order of 0 or 1 would allow empty non-root nodes
	/// and splits that produce nothing to promote.
	#[error("tree-order must be at least {min}, got {order}")]
	InvalidOrder {
		/// The rejected order.
		order: usize,
		/// The smallest accepted order.
		min: usize,
	},

	/// The requested tree-order is too large for node sizes to be
	/// represented.
	#[error("tree-order must be at most {max}, got {order}")]
	OrderTooLarge {
		/// The rejected order.
		order: usize,
		/// The largest accepted order.
		max: usize,
	},
}

/// A Result type alias using our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;
