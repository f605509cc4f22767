//! The hole binder: one updater per hole of a fresh template clone.

use crate::{
	compile::{HoleDescriptor, HoleKind},
	diff::reconcile,
	dom::{self, DomNode, NodeKind},
	value::Value,
	wire::Wire,
};
use core::fmt::{self, Debug, Formatter};
use tracing::{error, trace, warn};

/// Applies new values to one hole of one template instance.
///
/// Updaters remember what they last applied, so repeating a value is (mostly) free.
pub(crate) enum Updater<N: DomNode> {
	/// Child content in front of a placeholder comment.
	Node(NodeUpdater<N>),
	/// `ref=${…}`: receives the element on every update.
	Ref { node: N },
	/// `.name=${…}`: direct property assignment.
	Property { node: N, name: String, previous: Option<Value<N>> },
	/// `onname=${…}`: one event subscription.
	Event { node: N, event_type: String, previous: Option<N::Listener> },
	/// Any other attribute, through one persistent attribute object.
	Attribute {
		node: N,
		attribute: N::Attribute,
		attached: bool,
		previous: Option<Value<N>>,
	},
	/// The whole text content of a `<style>` or `<textarea>`.
	Text { node: N, previous: Option<Value<N>> },
}

pub(crate) struct NodeUpdater<N: DomNode> {
	anchor: N,
	text: N,
	/// The primitive the text node currently shows, if it's mounted.
	previous: Option<Value<N>>,
	entries: Vec<Wire<N>>,
}

/// Creates the updater for `hole` in `fragment`, a fresh clone of the template content the hole was found in.
///
/// Returns [`None`] iff the hole's path doesn't exist in `fragment`.
pub(crate) fn bind<N: DomNode>(fragment: &N, hole: &HoleDescriptor) -> Option<Updater<N>> {
	let node = match dom::child_at_path(fragment, &hole.path) {
		Some(node) => node,
		None => {
			error!("Hole path {:?} not found in template clone.", hole.path);
			return None;
		}
	};
	Some(match &hole.kind {
		HoleKind::Node => Updater::Node(NodeUpdater {
			anchor: node,
			text: N::create_text_node(""),
			previous: None,
			entries: Vec::new(),
		}),
		HoleKind::Text => Updater::Text { node, previous: None },
		HoleKind::Attribute(name) if name == "ref" => Updater::Ref { node },
		HoleKind::Attribute(name) if name.starts_with('.') => Updater::Property {
			node,
			name: name[1..].to_owned(),
			previous: None,
		},
		HoleKind::Attribute(name) if name.starts_with("on") => {
			let lowercase = name.to_lowercase();
			let event_type = if node.has_event_property(&lowercase) { lowercase[2..].to_owned() } else { name[2..].to_owned() };
			Updater::Event {
				node,
				event_type,
				previous: None,
			}
		}
		HoleKind::Attribute(name) => Updater::Attribute {
			attribute: node.create_attribute(name),
			node,
			attached: false,
			previous: None,
		},
	})
}

impl<N: DomNode> Updater<N> {
	pub(crate) fn update(&mut self, value: Value<N>) {
		match self {
			Self::Node(updater) => updater.update(value),

			Self::Ref { node } => match value {
				Value::Ref(node_ref) => node_ref.set_current(node.clone()),
				Value::Null => trace!("No ref to set."),
				other => warn!("Expected a `NodeRef` for `ref`, found {}.", other.shape()),
			},

			Self::Property { node, name, previous } => {
				if previous.as_ref().map_or(false, |previous| previous.strict_eq(&value)) {
					return;
				}
				node.set_property(name, &value);
				*previous = Some(value);
			}

			Self::Event { node, event_type, previous } => {
				let listener = match value {
					Value::Listener(listener) => Some(listener),
					Value::Null => None,
					other => {
						warn!("Expected a listener for `on{}`, found {}. Keeping the current one.", event_type, other.shape());
						return;
					}
				};
				if *previous == listener {
					return;
				}
				if let Some(previous) = previous.take() {
					node.remove_event_listener(event_type, &previous);
				}
				if let Some(listener) = &listener {
					node.add_event_listener(event_type, listener);
				}
				*previous = listener;
			}

			Self::Attribute {
				node,
				attribute,
				attached,
				previous,
			} => {
				if previous.as_ref().map_or(false, |previous| previous.strict_eq(&value)) {
					return;
				}
				if value.is_null() {
					if *attached {
						node.remove_attribute_node(attribute);
						*attached = false;
					}
				} else {
					match value.to_text() {
						Some(text) => N::set_attribute_value(attribute, &text),
						None => return warn!("Can't use {} as attribute value.", value.shape()),
					}
					if !*attached {
						node.set_attribute_node(attribute);
						*attached = true;
					}
				}
				*previous = Some(value);
			}

			Self::Text { node, previous } => {
				if previous.as_ref().map_or(false, |previous| previous.strict_eq(&value)) {
					return;
				}
				match value.to_text() {
					Some(text) => node.set_text_content(&text),
					None => return warn!("Can't use {} as text content.", value.shape()),
				}
				*previous = Some(value);
			}
		}
	}
}

impl<N: DomNode> NodeUpdater<N> {
	fn update(&mut self, value: Value<N>) {
		match value {
			value if value.is_primitive() => self.primitive(value),
			Value::Null => {
				self.previous = None;
				self.install(Vec::new())
			}
			Value::List(items) => {
				if items.is_empty() {
					self.previous = None;
					return self.install(Vec::new());
				}
				if items[0].is_primitive() {
					let joined = match Value::List(items).to_text() {
						Some(joined) => joined.into_owned(),
						None => return warn!("Can't join a list that starts with a primitive but contains non-primitives."),
					};
					return self.primitive(Value::from(joined));
				}
				self.previous = None;
				let mut entries = Vec::with_capacity(items.len());
				for item in items {
					match item {
						Value::Wire(wire) => entries.push(wire),
						Value::Node(node) => push_node(&mut entries, node),
						other => warn!("Skipping list item of shape {} in child content.", other.shape()),
					}
				}
				self.install(entries)
			}
			Value::Node(node) => {
				self.previous = None;
				let mut entries = Vec::new();
				push_node(&mut entries, node);
				self.install(entries)
			}
			Value::Wire(wire) => {
				self.previous = None;
				self.install(vec![wire])
			}
			other => trace!("Ignoring {} in child content.", other.shape()),
		}
	}

	fn primitive(&mut self, value: Value<N>) {
		if self.previous.as_ref().map_or(false, |previous| previous.strict_eq(&value)) {
			return;
		}
		self.text.set_text_content(&value.to_text().unwrap_or_default());
		self.previous = Some(value);
		self.install(vec![Wire::Node(self.text.clone())])
	}

	fn install(&mut self, entries: Vec<Wire<N>>) {
		let parent = match self.anchor.parent_node() {
			Some(parent) => parent,
			None => return error!("Placeholder of a child content hole is detached."),
		};
		let previous = core::mem::take(&mut self.entries);
		self.entries = reconcile(&parent, previous, entries, |wire: &Wire<N>, directive| wire.get(directive), Some(&self.anchor));
	}
}

fn push_node<N: DomNode>(entries: &mut Vec<Wire<N>>, node: N) {
	if node.node_kind() == NodeKind::Fragment {
		entries.extend((0..node.child_count()).filter_map(|i| node.child_at(i)).map(Wire::Node))
	} else {
		entries.push(Wire::Node(node))
	}
}

impl<N: DomNode> Debug for Updater<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Node(updater) => f.debug_struct("Updater::Node").field("anchor", &updater.anchor).field("entries.len()", &updater.entries.len()).finish(),
			Self::Ref { node } => f.debug_struct("Updater::Ref").field("node", node).finish(),
			Self::Property { node, name, .. } => f.debug_struct("Updater::Property").field("node", node).field("name", name).finish(),
			Self::Event { node, event_type, previous } => f
				.debug_struct("Updater::Event")
				.field("node", node)
				.field("event_type", event_type)
				.field("subscribed", &previous.is_some())
				.finish(),
			Self::Attribute { node, attribute, attached, .. } => f
				.debug_struct("Updater::Attribute")
				.field("node", node)
				.field("attribute", attribute)
				.field("attached", attached)
				.finish(),
			Self::Text { node, .. } => f.debug_struct("Updater::Text").field("node", node).finish(),
		}
	}
}
