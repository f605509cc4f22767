use super::{count_mutation, parse, serialize};
use crate::{
	dom::{DomNode, NodeKind},
	value::{TemplateKind, Value},
};
use core::{
	any::Any,
	cell::RefCell,
	fmt::{self, Debug, Formatter},
	hash::{Hash, Hasher},
};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::{error, trace};

/// Element namespaces the native tree knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
	Html,
	Svg,
}

/// Lower-case names of the event handler properties elements expose.
const EVENT_HANDLER_PROPERTIES: &[&str] = &[
	"onabort", "onblur", "onchange", "onclick", "oncontextmenu", "ondblclick", "ondrag", "ondragend", "ondragenter", "ondragleave", "ondragover", "ondragstart", "ondrop",
	"onerror", "onfocus", "onfocusin", "onfocusout", "oninput", "oninvalid", "onkeydown", "onkeypress", "onkeyup", "onload", "onmousedown", "onmouseenter", "onmouseleave",
	"onmousemove", "onmouseout", "onmouseover", "onmouseup", "onpointercancel", "onpointerdown", "onpointerenter", "onpointerleave", "onpointermove", "onpointerout",
	"onpointerover", "onpointerup", "onreset", "onresize", "onscroll", "onselect", "onsubmit", "ontouchcancel", "ontouchend", "ontouchmove", "ontouchstart", "onwheel",
];

/// A node of the in-memory document tree.
///
/// Handles are reference-counted and compare by identity.
/// Children are owned by their parent, parents are only weakly referenced.
#[derive(Clone)]
pub struct Node(Rc<RefCell<NodeData>>);

struct NodeData {
	kind: NodeKind,
	name: String,
	namespace: Namespace,
	data: String,
	parent: Weak<RefCell<NodeData>>,
	children: Vec<Node>,
	attributes: Vec<Attr>,
	properties: HashMap<String, Value<Node>>,
	listeners: Vec<(String, Listener)>,
	render_info: Option<Rc<dyn Any>>,
}

impl NodeData {
	fn new(kind: NodeKind, name: String, namespace: Namespace, data: String) -> Self {
		Self {
			kind,
			name,
			namespace,
			data,
			parent: Weak::new(),
			children: Vec::new(),
			attributes: Vec::new(),
			properties: HashMap::new(),
			listeners: Vec::new(),
			render_info: None,
		}
	}
}

/// A detachable attribute, which keeps its identity while moving on and off its element.
#[derive(Clone)]
pub struct Attr(Rc<RefCell<AttrData>>);

struct AttrData {
	name: String,
	value: String,
	owner: Weak<RefCell<NodeData>>,
}

impl Attr {
	#[must_use]
	pub fn new(name: &str) -> Self {
		Self(Rc::new(RefCell::new(AttrData {
			name: name.to_owned(),
			value: String::new(),
			owner: Weak::new(),
		})))
	}

	#[must_use]
	pub fn name(&self) -> String {
		self.0.borrow().name.clone()
	}

	#[must_use]
	pub fn value(&self) -> String {
		self.0.borrow().value.clone()
	}

	pub fn set_value(&self, value: &str) {
		count_mutation();
		self.0.borrow_mut().value = value.to_owned()
	}

	#[must_use]
	pub fn owner_element(&self) -> Option<Node> {
		self.0.borrow().owner.upgrade().map(Node)
	}
}
impl PartialEq for Attr {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Debug for Attr {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let data = self.0.borrow();
		let mut debug = f.debug_struct("Attr");
		debug.field("name", &data.name);
		if cfg!(feature = "dangerous-logging") {
			debug.field("value", &data.value);
		}
		debug.field("attached", &(data.owner.strong_count() > 0)).finish()
	}
}

/// An event handler. Subscriptions are matched by handler identity.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&Event)>);
impl Listener {
	pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
		Self(Rc::new(handler))
	}

	pub fn call(&self, event: &Event) {
		(self.0)(event)
	}
}
impl PartialEq for Listener {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Debug for Listener {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Listener").field(&Rc::as_ptr(&self.0).cast::<()>()).finish()
	}
}

/// What [`Node::dispatch`] passes to listeners.
#[derive(Debug, Clone)]
pub struct Event {
	event_type: String,
	target: Node,
}
impl Event {
	#[must_use]
	pub fn event_type(&self) -> &str {
		&self.event_type
	}

	#[must_use]
	pub fn target(&self) -> &Node {
		&self.target
	}
}

impl Node {
	fn new(data: NodeData) -> Self {
		Self(Rc::new(RefCell::new(data)))
	}

	/// An HTML element. The name is lower-cased.
	#[must_use]
	pub fn element(name: &str) -> Self {
		Self::element_ns(&name.to_ascii_lowercase(), Namespace::Html)
	}

	#[must_use]
	pub fn element_ns(name: &str, namespace: Namespace) -> Self {
		Self::new(NodeData::new(NodeKind::Element, name.to_owned(), namespace, String::new()))
	}

	#[must_use]
	pub fn text(data: &str) -> Self {
		Self::new(NodeData::new(NodeKind::Text, String::new(), Namespace::Html, data.to_owned()))
	}

	#[must_use]
	pub fn comment(data: &str) -> Self {
		Self::new(NodeData::new(NodeKind::Comment, String::new(), Namespace::Html, data.to_owned()))
	}

	#[must_use]
	pub fn fragment() -> Self {
		Self::new(NodeData::new(NodeKind::Fragment, String::new(), Namespace::Html, String::new()))
	}

	/// Parses HTML into a fragment. See [`DomNode::parse_markup`].
	#[must_use]
	pub fn parse(markup: &str) -> Self {
		parse::parse_fragment(markup, Namespace::Html)
	}

	#[must_use]
	pub fn kind(&self) -> NodeKind {
		self.0.borrow().kind
	}

	#[must_use]
	pub fn namespace(&self) -> Namespace {
		self.0.borrow().namespace
	}

	/// Text or comment data.
	#[must_use]
	pub fn data(&self) -> String {
		self.0.borrow().data.clone()
	}

	pub fn set_data(&self, data: &str) {
		count_mutation();
		self.0.borrow_mut().data = data.to_owned()
	}

	#[must_use]
	pub fn children(&self) -> Vec<Node> {
		self.0.borrow().children.clone()
	}

	#[must_use]
	pub fn attributes(&self) -> Vec<(String, String)> {
		self.0.borrow().attributes.iter().map(|attribute| (attribute.name(), attribute.value())).collect()
	}

	#[must_use]
	pub fn attribute_node(&self, name: &str) -> Option<Attr> {
		let name = self.normalize_attribute_name(name);
		self.0.borrow().attributes.iter().find(|attribute| attribute.0.borrow().name == name).cloned()
	}

	pub fn set_attribute(&self, name: &str, value: &str) {
		match self.attribute_node(name) {
			Some(attribute) => attribute.set_value(value),
			None => {
				let attribute = self.create_attribute(name);
				attribute.set_value(value);
				self.set_attribute_node(&attribute);
			}
		}
	}

	#[must_use]
	pub fn property(&self, name: &str) -> Option<Value<Node>> {
		self.0.borrow().properties.get(name).cloned()
	}

	#[must_use]
	pub fn listener_count(&self, event_type: &str) -> usize {
		self.0.borrow().listeners.iter().filter(|(t, _)| t == event_type).count()
	}

	/// Calls the listeners currently subscribed to `event_type` on this node, in subscription order.
	///
	/// Returns the number of listeners called.
	pub fn dispatch(&self, event_type: &str) -> usize {
		let listeners: Vec<Listener> = self.0.borrow().listeners.iter().filter(|(t, _)| t == event_type).map(|(_, listener)| listener.clone()).collect();
		let event = Event {
			event_type: event_type.to_owned(),
			target: self.clone(),
		};
		for listener in &listeners {
			listener.call(&event)
		}
		listeners.len()
	}

	#[must_use]
	pub fn outer_html(&self) -> String {
		serialize::outer_html(self)
	}

	#[must_use]
	pub fn inner_html(&self) -> String {
		serialize::inner_html(self)
	}

	/// Whether `other` is this node or one of its descendants.
	#[must_use]
	pub fn contains(&self, other: &Node) -> bool {
		let mut current = Some(other.clone());
		while let Some(node) = current {
			if &node == self {
				return true;
			}
			current = node.parent_node();
		}
		false
	}

	/// Appends without bookkeeping. Only for building trees during parsing and cloning.
	pub(super) fn push_child(&self, child: Node) {
		child.0.borrow_mut().parent = Rc::downgrade(&self.0);
		self.0.borrow_mut().children.push(child)
	}

	pub(super) fn push_attribute(&self, name: &str, value: &str) {
		let attribute = Attr(Rc::new(RefCell::new(AttrData {
			name: name.to_owned(),
			value: value.to_owned(),
			owner: Rc::downgrade(&self.0),
		})));
		self.0.borrow_mut().attributes.push(attribute)
	}

	pub(super) fn replace_data_quietly(&self, data: String) {
		self.0.borrow_mut().data = data
	}

	pub(super) fn name(&self) -> String {
		self.0.borrow().name.clone()
	}

	fn normalize_attribute_name(&self, name: &str) -> String {
		match self.namespace() {
			Namespace::Html => name.to_ascii_lowercase(),
			Namespace::Svg => name.to_owned(),
		}
	}

	fn detach(&self) {
		let parent = self.0.borrow().parent.upgrade();
		if let Some(parent) = parent {
			parent.borrow_mut().children.retain(|child| !Rc::ptr_eq(&child.0, &self.0));
		}
		self.0.borrow_mut().parent = Weak::new();
	}

	fn can_have_children(&self) -> bool {
		matches!(self.kind(), NodeKind::Element | NodeKind::Fragment)
	}

	fn insert_one(&self, node: &Node, reference: Option<&Node>) {
		if !self.can_have_children() {
			return error!("Tried to insert into a {:?} node.", self.kind());
		}
		if node.contains(self) {
			return error!("Inserting {:?} into {:?} would create a cycle.", node, self);
		}
		let reference = match reference {
			Some(reference) if reference == node => node.next_sibling(),
			reference => reference.cloned(),
		};
		if let Some(reference) = &reference {
			if reference.parent_node().as_ref() != Some(self) {
				return error!("Insertion reference {:?} isn't a child of {:?}.", reference, self);
			}
		}
		node.detach();
		let mut data = self.0.borrow_mut();
		let index = reference
			.and_then(|reference| data.children.iter().position(|child| child == &reference))
			.unwrap_or(data.children.len());
		data.children.insert(index, node.clone());
		drop(data);
		node.0.borrow_mut().parent = Rc::downgrade(&self.0);
	}

	fn deep_clone(&self) -> Node {
		let data = self.0.borrow();
		let clone = Node::new(NodeData::new(data.kind, data.name.clone(), data.namespace, data.data.clone()));
		for attribute in &data.attributes {
			let attribute = attribute.0.borrow();
			clone.push_attribute(&attribute.name, &attribute.value);
		}
		for child in &data.children {
			clone.push_child(child.deep_clone());
		}
		clone
	}
}

impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Eq for Node {}
impl Hash for Node {
	fn hash<H: Hasher>(&self, state: &mut H) {
		Rc::as_ptr(&self.0).hash(state)
	}
}
impl Debug for Node {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let data = match self.0.try_borrow() {
			Ok(data) => data,
			Err(_) => return f.write_str("Node(<borrowed>)"),
		};
		match data.kind {
			NodeKind::Element => write!(f, "<{}> ({} child(ren))", data.name, data.children.len()),
			NodeKind::Text | NodeKind::Comment if cfg!(feature = "dangerous-logging") => write!(f, "{:?}({:?})", data.kind, data.data),
			NodeKind::Text | NodeKind::Comment => write!(f, "{:?}(<{} byte(s)>)", data.kind, data.data.len()),
			NodeKind::Fragment => write!(f, "Fragment ({} child(ren))", data.children.len()),
			NodeKind::Other => f.write_str("Other"),
		}
	}
}

impl DomNode for Node {
	type Attribute = Attr;
	type Listener = Listener;

	fn parse_markup(markup: &str, kind: TemplateKind) -> Self {
		parse::parse_fragment(
			markup,
			match kind {
				TemplateKind::Html => Namespace::Html,
				TemplateKind::Svg => Namespace::Svg,
			},
		)
	}

	fn create_text_node(data: &str) -> Self {
		Node::text(data)
	}

	fn clone_subtree(&self) -> Self {
		self.deep_clone()
	}

	fn node_kind(&self) -> NodeKind {
		self.kind()
	}

	fn parent_node(&self) -> Option<Self> {
		self.0.borrow().parent.upgrade().map(Node)
	}

	fn first_child(&self) -> Option<Self> {
		self.0.borrow().children.first().cloned()
	}

	fn last_child(&self) -> Option<Self> {
		self.0.borrow().children.last().cloned()
	}

	fn next_sibling(&self) -> Option<Self> {
		let parent = self.parent_node()?;
		let data = parent.0.borrow();
		let index = data.children.iter().position(|child| child == self)?;
		data.children.get(index + 1).cloned()
	}

	fn child_count(&self) -> usize {
		self.0.borrow().children.len()
	}

	fn child_at(&self, index: usize) -> Option<Self> {
		self.0.borrow().children.get(index).cloned()
	}

	fn insert_before(&self, node: &Self, reference: Option<&Self>) {
		count_mutation();
		if node.kind() == NodeKind::Fragment {
			for child in node.children() {
				self.insert_one(&child, reference)
			}
		} else {
			self.insert_one(node, reference)
		}
	}

	fn remove_child(&self, child: &Self) {
		if child.parent_node().as_ref() != Some(self) {
			return error!("{:?} isn't a child of {:?}.", child, self);
		}
		count_mutation();
		child.detach()
	}

	fn replace_child(&self, node: &Self, child: &Self) {
		if child.parent_node().as_ref() != Some(self) {
			return error!("Replaced {:?} isn't a child of {:?}.", child, self);
		}
		if node == child {
			return;
		}
		count_mutation();
		if node.kind() == NodeKind::Fragment {
			for new_child in node.children() {
				self.insert_one(&new_child, Some(child))
			}
			return child.detach();
		}
		if node.contains(self) {
			return error!("Replacing with {:?} would create a cycle.", node);
		}
		node.detach();
		let mut data = self.0.borrow_mut();
		match data.children.iter().position(|current| current == child) {
			Some(index) => data.children[index] = node.clone(),
			None => return error!("Replaced child vanished."),
		}
		drop(data);
		node.0.borrow_mut().parent = Rc::downgrade(&self.0);
		child.0.borrow_mut().parent = Weak::new();
	}

	fn text_content(&self) -> String {
		fn collect(node: &Node, text: &mut String) {
			let data = node.0.borrow();
			match data.kind {
				NodeKind::Text => text.push_str(&data.data),
				NodeKind::Element | NodeKind::Fragment => {
					for child in &data.children {
						collect(child, text)
					}
				}
				NodeKind::Comment | NodeKind::Other => (),
			}
		}

		match self.kind() {
			NodeKind::Text | NodeKind::Comment => self.data(),
			_ => {
				let mut text = String::new();
				collect(self, &mut text);
				text
			}
		}
	}

	fn set_text_content(&self, text: &str) {
		match self.kind() {
			NodeKind::Text | NodeKind::Comment => self.set_data(text),
			NodeKind::Element | NodeKind::Fragment => {
				count_mutation();
				for child in self.children() {
					child.detach()
				}
				if !text.is_empty() {
					self.insert_one(&Node::text(text), None)
				}
			}
			NodeKind::Other => (),
		}
	}

	fn tag_name(&self) -> String {
		self.name()
	}

	fn has_attribute(&self, name: &str) -> bool {
		self.attribute_node(name).is_some()
	}

	fn get_attribute(&self, name: &str) -> Option<String> {
		self.attribute_node(name).map(|attribute| attribute.value())
	}

	fn remove_attribute(&self, name: &str) {
		if let Some(attribute) = self.attribute_node(name) {
			self.remove_attribute_node(&attribute)
		}
	}

	fn create_attribute(&self, name: &str) -> Self::Attribute {
		Attr::new(&self.normalize_attribute_name(name))
	}

	fn set_attribute_value(attribute: &Self::Attribute, value: &str) {
		attribute.set_value(value)
	}

	fn set_attribute_node(&self, attribute: &Self::Attribute) {
		if self.kind() != NodeKind::Element {
			return error!("Tried to set an attribute on {:?}.", self);
		}
		if let Some(owner) = attribute.owner_element() {
			if &owner == self {
				return;
			}
			return error!("{:?} is already in use on {:?}.", attribute, owner);
		}
		count_mutation();
		let name = attribute.name();
		let mut data = self.0.borrow_mut();
		match data.attributes.iter().position(|existing| existing.0.borrow().name == name) {
			Some(index) => {
				let replaced = core::mem::replace(&mut data.attributes[index], attribute.clone());
				replaced.0.borrow_mut().owner = Weak::new();
			}
			None => data.attributes.push(attribute.clone()),
		}
		attribute.0.borrow_mut().owner = Rc::downgrade(&self.0);
	}

	fn remove_attribute_node(&self, attribute: &Self::Attribute) {
		let mut data = self.0.borrow_mut();
		match data.attributes.iter().position(|existing| existing == attribute) {
			Some(index) => {
				count_mutation();
				data.attributes.remove(index);
				attribute.0.borrow_mut().owner = Weak::new();
			}
			None => error!("{:?} isn't set on this element.", attribute),
		}
	}

	fn set_property(&self, name: &str, value: &Value<Self>) {
		count_mutation();
		trace!("Setting property {:?}.", name);
		self.0.borrow_mut().properties.insert(name.to_owned(), value.clone());
	}

	fn has_event_property(&self, name: &str) -> bool {
		self.kind() == NodeKind::Element && EVENT_HANDLER_PROPERTIES.contains(&name)
	}

	fn add_event_listener(&self, event_type: &str, listener: &Self::Listener) {
		let mut data = self.0.borrow_mut();
		if data.listeners.iter().any(|(t, l)| t == event_type && l == listener) {
			return;
		}
		count_mutation();
		data.listeners.push((event_type.to_owned(), listener.clone()))
	}

	fn remove_event_listener(&self, event_type: &str, listener: &Self::Listener) {
		let mut data = self.0.borrow_mut();
		if let Some(index) = data.listeners.iter().position(|(t, l)| t == event_type && l == listener) {
			count_mutation();
			data.listeners.remove(index);
		}
	}

	fn render_info(&self) -> Option<Rc<dyn Any>> {
		self.0.borrow().render_info.clone()
	}

	fn set_render_info(&self, info: Rc<dyn Any>) {
		self.0.borrow_mut().render_info = Some(info)
	}
}
