//! Test utilities for building exact tree shapes from JSON fixtures
//!
//! Fixtures describe nodes as `{ "keys": [...], "children": [...] }`; a node
//! without `children` is a leaf. Trees are assembled directly, bypassing
//! insertion, so tests can start from a shape that exercises one specific
//! rebalancing path.
use crate::{GenericTree, InternalNode, LeafNode, Node, Tree};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug)]
struct TreeNode {
	keys: Vec<i64>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	children: Vec<TreeNode>,
}

#[derive(Deserialize, Debug)]
struct SampleTree {
	order: usize,
	root: Option<TreeNode>,
}

fn translate_node(tree_node: TreeNode, order: usize) -> (Box<Node<i64>>, usize) {
	let mut count = tree_node.keys.len();

	let node = if tree_node.children.is_empty() {
		let mut leaf = LeafNode::with_order(order);
		leaf.keys.extend(tree_node.keys);
		Node::Leaf(leaf)
	} else {
		let mut internal = InternalNode::with_order(order);
		internal.keys.extend(tree_node.keys);
		for child in tree_node.children {
			let (edge, child_count) = translate_node(child, order);
			internal.edges.push(edge);
			count += child_count;
		}
		Node::Internal(internal)
	};

	(Box::new(node), count)
}

/// Builds a tree from a JSON fixture, validating its invariants.
pub fn sample_tree(json: &str) -> Tree {
	let sample: SampleTree = serde_json::from_str(json).expect("malformed tree fixture");
	let mut tree = Tree::with_order(sample.order).expect("fixture order must be valid");

	if let Some(root) = sample.root {
		let (root, len) = translate_node(root, sample.order);
		tree.root = Some(root);
		tree.len = len;
	}

	tree.assert_invariants();
	tree
}

fn dump_node(node: &Node<i64>) -> TreeNode {
	TreeNode {
		keys: node.keys().to_vec(),
		children: match node {
			Node::Internal(internal) => internal.edges.iter().map(|edge| dump_node(edge)).collect(),
			Node::Leaf(_) => Vec::new(),
		},
	}
}

/// Renders the tree's node layout in the fixture format, `null` when empty.
pub fn shape(tree: &GenericTree<i64>) -> serde_json::Value {
	let root = tree.root.as_deref().map(dump_node);
	serde_json::to_value(root).expect("tree shape is always serializable")
}
