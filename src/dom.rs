//! The document tree seam.
//!
//! Everything the engine does to a live tree goes through [`DomNode`].
//! [`native::Node`](`crate::native::Node`) implements it for an in-memory tree,
//! and with the `"web"` feature [`web::WebNode`](`crate::web::WebNode`) implements it for
//! [***Node***](https://developer.mozilla.org/en-US/docs/Web/API/Node)s of the current browser document.

use crate::value::{TemplateKind, Value};
use core::{any::Any, fmt::Debug, hash::Hash};
use std::rc::Rc;

/// The kinds of node the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
	Element,
	Text,
	Comment,
	Fragment,
	Other,
}

/// A handle to one node of a live, mutable document tree.
///
/// Handles are cheap to clone and compare by **identity**:
/// two handles are equal iff they refer to the same node, and [`Hash`] must agree with that.
///
/// Mutating methods never fail from the engine's point of view.
/// Implementations log failures (with [`tracing::error!`]) instead of surfacing them,
/// since none of them are recoverable during a render.
pub trait DomNode: Clone + Eq + Hash + Debug + 'static {
	/// A detachable attribute object, so that an attribute can be removed and re-added without re-parsing its name.
	type Attribute: Clone + Debug;
	/// An event handler that can be subscribed and unsubscribed by identity.
	type Listener: Clone + PartialEq + Debug;

	/// Parses `markup` into a fresh document fragment.
	///
	/// [`TemplateKind::Svg`] parses the content as if it was the child content of an `<svg>` element.
	fn parse_markup(markup: &str, kind: TemplateKind) -> Self;

	/// Creates a detached text node.
	fn create_text_node(data: &str) -> Self;

	/// Deep clone that preserves document order and attribute values exactly.
	#[must_use]
	fn clone_subtree(&self) -> Self;

	fn node_kind(&self) -> NodeKind;

	fn parent_node(&self) -> Option<Self>;
	fn first_child(&self) -> Option<Self>;
	fn last_child(&self) -> Option<Self>;
	fn next_sibling(&self) -> Option<Self>;
	fn child_count(&self) -> usize;
	fn child_at(&self, index: usize) -> Option<Self>;

	/// Inserts `node` before `reference`, or appends it if `reference` is [`None`].
	///
	/// Inserting a fragment moves all of its children instead, leaving it empty.
	fn insert_before(&self, node: &Self, reference: Option<&Self>);
	fn append_child(&self, node: &Self) {
		self.insert_before(node, None)
	}
	fn remove_child(&self, child: &Self);
	fn replace_child(&self, node: &Self, child: &Self);

	/// Concatenated data of all descendant text nodes, or the node's own data for text and comments.
	fn text_content(&self) -> String;
	/// Replaces all children with a single text node (or with nothing, for `""`).
	fn set_text_content(&self, text: &str);

	/// The element's tag name. Case is backend-specific, so compare case-insensitively.
	fn tag_name(&self) -> String;

	fn has_attribute(&self, name: &str) -> bool;
	fn get_attribute(&self, name: &str) -> Option<String>;
	fn remove_attribute(&self, name: &str);

	/// Creates a detached attribute object named `name` in this node's document.
	fn create_attribute(&self, name: &str) -> Self::Attribute;
	fn set_attribute_value(attribute: &Self::Attribute, value: &str);
	fn set_attribute_node(&self, attribute: &Self::Attribute);
	fn remove_attribute_node(&self, attribute: &Self::Attribute);

	/// Assigns a property directly, bypassing attributes.
	fn set_property(&self, name: &str, value: &Value<Self>);

	/// Whether the node exposes an event handler property called `name` (for example `"onclick"`).
	fn has_event_property(&self, name: &str) -> bool;
	fn add_event_listener(&self, event_type: &str, listener: &Self::Listener);
	fn remove_event_listener(&self, event_type: &str, listener: &Self::Listener);

	/// The render cache slot of a mount container.
	///
	/// The slot belongs to the node: once the node is gone, so is the cache.
	fn render_info(&self) -> Option<Rc<dyn Any>>;
	fn set_render_info(&self, info: Rc<dyn Any>);
}

/// Child-index path from `root` down to `node`.
///
/// `node` must be a descendant of `root`.
pub fn path_of<N: DomNode>(root: &N, node: &N) -> Vec<usize> {
	let mut path = Vec::new();
	let mut node = node.clone();
	while &node != root {
		let parent = match node.parent_node() {
			Some(parent) => parent,
			None => break,
		};
		let mut index = 0;
		let mut sibling = parent.first_child();
		while let Some(current) = sibling {
			if current == node {
				break;
			}
			index += 1;
			sibling = current.next_sibling();
		}
		path.push(index);
		node = parent;
	}
	path.reverse();
	path
}

/// Inverse of [`path_of`].
pub fn child_at_path<N: DomNode>(root: &N, path: &[usize]) -> Option<N> {
	path.iter().try_fold(root.clone(), |node, &index| node.child_at(index))
}

/// The next element or comment after `node` in document order, without leaving `root`.
pub(crate) fn next_element_or_comment<N: DomNode>(root: &N, node: &N) -> Option<N> {
	let mut current = node.clone();
	loop {
		current = next_in_document_order(root, &current)?;
		if let NodeKind::Element | NodeKind::Comment = current.node_kind() {
			return Some(current);
		}
	}
}

fn next_in_document_order<N: DomNode>(root: &N, node: &N) -> Option<N> {
	if let Some(first_child) = node.first_child() {
		return Some(first_child);
	}
	let mut node = node.clone();
	loop {
		if &node == root {
			return None;
		}
		if let Some(next_sibling) = node.next_sibling() {
			return Some(next_sibling);
		}
		node = node.parent_node()?;
	}
}
