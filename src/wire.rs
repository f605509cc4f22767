//! Wires: what a template instance materializes to.

use crate::{
	diff::Directive,
	dom::{DomNode, NodeKind},
};
use core::{
	fmt::{self, Debug, Formatter},
	hash::{Hash, Hasher},
};
use std::rc::Rc;
use tracing::error;

/// A single node, or a persistent group of sibling nodes that moves as one block.
///
/// Wires compare by identity.
pub enum Wire<N: DomNode> {
	Node(N),
	Group(Rc<Group<N>>),
}

/// The top-level nodes of a multi-node template instance, plus the fragment they return to while detached.
pub struct Group<N> {
	fragment: N,
	nodes: Vec<N>,
}

impl<N: DomNode> Wire<N> {
	/// A template instance with exactly one top-level node is that node, anything else is a [`Group`].
	#[must_use]
	pub fn from_fragment(fragment: N) -> Self {
		if fragment.child_count() == 1 {
			if let Some(only_child) = fragment.first_child() {
				return Self::Node(only_child);
			}
		}
		let nodes = (0..fragment.child_count()).filter_map(|i| fragment.child_at(i)).collect();
		Self::Group(Rc::new(Group { fragment, nodes }))
	}

	/// The node to operate on for `directive`.
	///
	/// For groups, [`Directive::Remove`] collects all but the first node back into the group's fragment
	/// and returns the first one, which the caller then removes (or uses as position reference).
	/// [`Directive::Insert`] gathers everything into the fragment, so that inserting it moves the whole block.
	pub fn get(&self, directive: Directive) -> N {
		match self {
			Self::Node(node) => node.clone(),
			Self::Group(group) => match directive {
				Directive::First => group.first(),
				Directive::Last => group.last(),
				Directive::Remove => group.detach_tail(),
				Directive::Insert => group.gather(),
			},
		}
	}

	/// The node to insert to attach the whole wire.
	pub fn materialize(&self) -> N {
		self.get(Directive::Insert)
	}
}

impl<N: DomNode> Group<N> {
	pub fn nodes(&self) -> &[N] {
		&self.nodes
	}

	fn first(&self) -> N {
		self.nodes.first().unwrap_or(&self.fragment).clone()
	}

	fn last(&self) -> N {
		self.nodes.last().unwrap_or(&self.fragment).clone()
	}

	/// Moves the live range after the first node (up to and including the last one) into the fragment.
	fn detach_tail(&self) -> N {
		let first = self.first();
		if self.nodes.len() < 2 {
			return first;
		}
		if first.parent_node().as_ref() == Some(&self.fragment) {
			error!("Tried to detach a group that isn't attached.");
			return first;
		}
		let last = self.last();
		if last.parent_node() != first.parent_node() {
			// Tail already detached.
			return first;
		}
		let mut cursor = first.next_sibling();
		while let Some(node) = cursor {
			cursor = node.next_sibling();
			let done = node == last;
			self.fragment.append_child(&node);
			if done {
				break;
			}
		}
		first
	}

	/// Moves all live nodes of the group (including nodes inserted between its boundaries) into the fragment.
	fn gather(&self) -> N {
		if self.nodes.is_empty() {
			return self.fragment.clone();
		}
		let first = self.first();
		let last = self.last();
		let mut collected = Vec::new();
		match first.parent_node() {
			Some(parent) if parent == self.fragment => (),
			Some(live_parent) if last.parent_node().as_ref() != Some(&live_parent) => collected.push(first),
			Some(_) => {
				let mut cursor = Some(first);
				while let Some(node) = cursor {
					cursor = node.next_sibling();
					let done = node == last;
					collected.push(node);
					if done {
						break;
					}
				}
			}
			None => collected.push(first),
		}
		let anchor = self.fragment.first_child();
		for node in &collected {
			self.fragment.insert_before(node, anchor.as_ref());
		}
		debug_assert_eq!(self.fragment.node_kind(), NodeKind::Fragment);
		self.fragment.clone()
	}
}

impl<N: DomNode> Clone for Wire<N> {
	fn clone(&self) -> Self {
		match self {
			Self::Node(node) => Self::Node(node.clone()),
			Self::Group(group) => Self::Group(group.clone()),
		}
	}
}
impl<N: DomNode> PartialEq for Wire<N> {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Node(a), Self::Node(b)) => a == b,
			(Self::Group(a), Self::Group(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}
}
impl<N: DomNode> Eq for Wire<N> {}
impl<N: DomNode> Hash for Wire<N> {
	fn hash<H: Hasher>(&self, state: &mut H) {
		match self {
			Self::Node(node) => node.hash(state),
			Self::Group(group) => Rc::as_ptr(group).hash(state),
		}
	}
}
impl<N: DomNode> Debug for Wire<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Node(node) => f.debug_tuple("Wire::Node").field(node).finish(),
			Self::Group(group) => f.debug_struct("Wire::Group").field("nodes.len()", &group.nodes.len()).finish(),
		}
	}
}
