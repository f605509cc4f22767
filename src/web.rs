//! The browser backend, on top of [`web_sys`].
//!
//! Failed DOM operations are logged with [`tracing::error!`] and otherwise ignored.

use crate::{
	dom::{DomNode, NodeKind},
	value::{TemplateKind, Value},
	wire::Wire,
};
use core::{
	any::Any,
	cell::{Cell, RefCell},
	convert::TryFrom,
	fmt::{self, Debug, Formatter},
	hash::{Hash, Hasher},
};
use hashbrown::HashMap;
use js_sys::{Array, Function, Object, Reflect, WeakMap};
use std::rc::Rc;
use tracing::{error, trace, warn};
use wasm_bindgen::{closure::Closure, prelude::wasm_bindgen, JsCast, JsValue, UnwrapThrowExt};
use web_sys::{Attr, Document, Element, HtmlTemplateElement, Node};

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

#[wasm_bindgen]
extern "C" {
	type FinalizationRegistry;

	#[wasm_bindgen(constructor)]
	fn new(cleanup: &Function) -> FinalizationRegistry;

	#[wasm_bindgen(method)]
	fn register(this: &FinalizationRegistry, target: &Object, held_value: &JsValue);
}

/// Drops render infos once their container is collected.
struct Releaser {
	registry: FinalizationRegistry,
	_cleanup: Closure<dyn Fn(JsValue)>,
}
impl Releaser {
	fn new() -> Self {
		let cleanup = Closure::wrap(Box::new(|held: JsValue| match held.as_f64() {
			#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
			Some(id) => release_render_info(id as u32),
			None => error!("Unexpected held value in render info registry."),
		}) as Box<dyn Fn(JsValue)>);
		let registry = FinalizationRegistry::new(cleanup.as_ref().unchecked_ref());
		Self { registry, _cleanup: cleanup }
	}
}

thread_local! {
	static IDS: WeakMap = WeakMap::new();
	static NEXT_ID: Cell<u32> = Cell::new(0);
	/// Render infos by container ID.
	///
	/// Cached nodes are held through `wasm-bindgen`'s handle table, so a container stays reachable
	/// (and its entry alive) while any of them is still its child.
	static RENDER_INFOS: RefCell<HashMap<u32, Rc<dyn Any>>> = RefCell::new(HashMap::new());
	static RELEASER: Releaser = Releaser::new();
}

fn release_render_info(id: u32) {
	let released = RENDER_INFOS.with(|infos| infos.borrow_mut().remove(&id));
	if released.is_some() {
		trace!("Released render info of collected container {}.", id);
	}
}

fn document() -> Document {
	web_sys::window()
		.expect_throw("wired-dom: No `window` found.")
		.document()
		.expect_throw("wired-dom: No `document` found.")
}

/// A [`web_sys::Node`] as [`DomNode`].
///
/// Handles compare by node identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebNode(Node);

impl WebNode {
	#[must_use]
	pub fn node(&self) -> &Node {
		&self.0
	}

	#[must_use]
	pub fn into_node(self) -> Node {
		self.0
	}

	fn element(&self) -> Option<&Element> {
		self.0.dyn_ref()
	}

	/// A per-node ID, assigned on first use, to make the node hashable.
	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	fn id(&self) -> u32 {
		let object: &Object = self.0.as_ref();
		IDS.with(|ids| {
			match ids.get(object).as_f64() {
				Some(id) => id as u32,
				None => {
					let id = NEXT_ID.with(|next_id| {
						let id = next_id.get();
						next_id.set(id.wrapping_add(1));
						id
					});
					ids.set(object, &JsValue::from(id));
					id
				}
			}
		})
	}
}

impl From<Node> for WebNode {
	fn from(node: Node) -> Self {
		Self(node)
	}
}
impl From<Element> for WebNode {
	fn from(element: Element) -> Self {
		Self(element.into())
	}
}
impl AsRef<Node> for WebNode {
	fn as_ref(&self) -> &Node {
		&self.0
	}
}
impl Hash for WebNode {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id().hash(state)
	}
}

/// An event listener as JavaScript function.
///
/// The function throws once the last clone of its [`Listener`] is dropped, so keep one around for as long as it's subscribed.
/// Rendered templates do this for the listeners they subscribed.
#[derive(Clone)]
pub struct Listener(Rc<Closure<dyn Fn(web_sys::Event)>>);
impl Listener {
	pub fn new(handler: impl Fn(web_sys::Event) + 'static) -> Self {
		Self(Rc::new(Closure::wrap(Box::new(handler) as Box<dyn Fn(web_sys::Event)>)))
	}

	#[must_use]
	pub fn function(&self) -> &Function {
		let function: &JsValue = (*self.0).as_ref();
		function.unchecked_ref()
	}
}
impl PartialEq for Listener {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Debug for Listener {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Listener").field(&Rc::as_ptr(&self.0)).finish()
	}
}

/// Converts `value` for property assignment. [`Value::Opaque`] passes a wrapped [`JsValue`] through.
fn to_js(value: &Value<WebNode>) -> JsValue {
	match value {
		Value::Null => JsValue::NULL,
		Value::Bool(value) => JsValue::from_bool(*value),
		Value::Number(value) => JsValue::from_f64(*value),
		Value::Str(value) => JsValue::from_str(value),
		Value::Node(node) | Value::Wire(Wire::Node(node)) => node.0.clone().into(),
		Value::List(items) => items.iter().map(to_js).collect::<Array>().into(),
		Value::Listener(listener) => listener.function().clone().into(),
		Value::Opaque(opaque) => match opaque.downcast_ref::<JsValue>() {
			Some(value) => value.clone(),
			None => {
				warn!("Opaque value isn't a `JsValue`, assigning `undefined`.");
				JsValue::UNDEFINED
			}
		},
		other @ (Value::Wire(Wire::Group(_)) | Value::Hole(_) | Value::Ref(_)) => {
			warn!("Can't assign {} as property, assigning `undefined`.", other.shape());
			JsValue::UNDEFINED
		}
	}
}

impl DomNode for WebNode {
	/// [`None`] iff the attribute name was rejected by the browser.
	type Attribute = Option<Attr>;
	type Listener = Listener;

	fn parse_markup(markup: &str, kind: TemplateKind) -> Self {
		let document = document();
		match kind {
			TemplateKind::Html => {
				let template: HtmlTemplateElement = document
					.create_element("template")
					.expect_throw("wired-dom: Failed to create `<template>`.")
					.unchecked_into();
				template.set_inner_html(markup);
				Self(template.content().into())
			}
			TemplateKind::Svg => {
				let fragment = document.create_document_fragment();
				let wrapper = document.create_element("div").expect_throw("wired-dom: Failed to create `<div>`.");
				wrapper.set_inner_html(&format!("<svg xmlns=\"{}\">{}</svg>", SVG_NAMESPACE, markup));
				if let Some(svg) = wrapper.first_child() {
					while let Some(child) = svg.first_child() {
						if let Err(error) = fragment.append_child(&child) {
							error!("Failed to move parsed SVG content: {:?}", error);
							break;
						}
					}
				}
				Self(fragment.into())
			}
		}
	}

	fn create_text_node(data: &str) -> Self {
		Self(document().create_text_node(data).into())
	}

	fn clone_subtree(&self) -> Self {
		Self(document().import_node_with_deep(&self.0, true).expect_throw("wired-dom: Failed to clone template content."))
	}

	fn node_kind(&self) -> NodeKind {
		match self.0.node_type() {
			Node::ELEMENT_NODE => NodeKind::Element,
			Node::TEXT_NODE => NodeKind::Text,
			Node::COMMENT_NODE => NodeKind::Comment,
			Node::DOCUMENT_FRAGMENT_NODE => NodeKind::Fragment,
			_ => NodeKind::Other,
		}
	}

	fn parent_node(&self) -> Option<Self> {
		self.0.parent_node().map(Self)
	}

	fn first_child(&self) -> Option<Self> {
		self.0.first_child().map(Self)
	}

	fn last_child(&self) -> Option<Self> {
		self.0.last_child().map(Self)
	}

	fn next_sibling(&self) -> Option<Self> {
		self.0.next_sibling().map(Self)
	}

	fn child_count(&self) -> usize {
		self.0.child_nodes().length() as usize
	}

	fn child_at(&self, index: usize) -> Option<Self> {
		self.0.child_nodes().item(u32::try_from(index).ok()?).map(Self)
	}

	fn insert_before(&self, node: &Self, reference: Option<&Self>) {
		if let Err(error) = self.0.insert_before(&node.0, reference.map(|reference| &reference.0)) {
			error!("Failed to insert node: {:?}", error);
		}
	}

	fn remove_child(&self, child: &Self) {
		if let Err(error) = self.0.remove_child(&child.0) {
			error!("Failed to remove node: {:?}", error);
		}
	}

	fn replace_child(&self, node: &Self, child: &Self) {
		if let Err(error) = self.0.replace_child(&node.0, &child.0) {
			error!("Failed to replace node: {:?}", error);
		}
	}

	fn text_content(&self) -> String {
		self.0.text_content().unwrap_or_default()
	}

	fn set_text_content(&self, text: &str) {
		self.0.set_text_content(Some(text))
	}

	fn tag_name(&self) -> String {
		self.element().map(Element::tag_name).unwrap_or_default()
	}

	fn has_attribute(&self, name: &str) -> bool {
		self.element().map_or(false, |element| element.has_attribute(name))
	}

	fn get_attribute(&self, name: &str) -> Option<String> {
		self.element()?.get_attribute(name)
	}

	fn remove_attribute(&self, name: &str) {
		match self.element() {
			Some(element) => {
				if let Err(error) = element.remove_attribute(name) {
					error!("Failed to remove attribute: {:?}", error);
				}
			}
			None => error!("Tried to remove an attribute from a non-element."),
		}
	}

	fn create_attribute(&self, name: &str) -> Self::Attribute {
		let document = document();
		// `createAttribute` lower-cases the name in HTML documents.
		let attribute = if self.element().and_then(Element::namespace_uri).as_deref() == Some(SVG_NAMESPACE) {
			document.create_attribute_ns(None, name)
		} else {
			document.create_attribute(name)
		};
		match attribute {
			Ok(attribute) => Some(attribute),
			Err(error) => {
				if cfg!(feature = "dangerous-logging") {
					error!("Failed to create attribute {:?}: {:?}", name, error);
				} else {
					error!("Failed to create attribute: {:?}", error);
				}
				None
			}
		}
	}

	fn set_attribute_value(attribute: &Self::Attribute, value: &str) {
		if let Some(attribute) = attribute {
			attribute.set_value(value)
		}
	}

	fn set_attribute_node(&self, attribute: &Self::Attribute) {
		if let (Some(element), Some(attribute)) = (self.element(), attribute) {
			if let Err(error) = element.set_attribute_node(attribute) {
				error!("Failed to set attribute node: {:?}", error);
			}
		}
	}

	fn remove_attribute_node(&self, attribute: &Self::Attribute) {
		if let (Some(element), Some(attribute)) = (self.element(), attribute) {
			if let Err(error) = element.remove_attribute_node(attribute) {
				error!("Failed to remove attribute node: {:?}", error);
			}
		}
	}

	fn set_property(&self, name: &str, value: &Value<Self>) {
		trace!("Setting property {:?}.", name);
		if let Err(error) = Reflect::set(&self.0, &JsValue::from_str(name), &to_js(value)) {
			error!("Failed to set property: {:?}", error);
		}
	}

	fn has_event_property(&self, name: &str) -> bool {
		Reflect::has(&self.0, &JsValue::from_str(name)).unwrap_or(false)
	}

	fn add_event_listener(&self, event_type: &str, listener: &Self::Listener) {
		if let Err(error) = self.0.add_event_listener_with_callback(event_type, listener.function()) {
			error!("Failed to add event listener: {:?}", error);
		}
	}

	fn remove_event_listener(&self, event_type: &str, listener: &Self::Listener) {
		if let Err(error) = self.0.remove_event_listener_with_callback(event_type, listener.function()) {
			error!("Failed to remove event listener: {:?}", error);
		}
	}

	fn render_info(&self) -> Option<Rc<dyn Any>> {
		let id = self.id();
		RENDER_INFOS.with(|infos| infos.borrow().get(&id).cloned())
	}

	fn set_render_info(&self, info: Rc<dyn Any>) {
		let id = self.id();
		let replaced = RENDER_INFOS.with(|infos| infos.borrow_mut().insert(id, info));
		if replaced.is_none() {
			RELEASER.with(|releaser| releaser.registry.register(self.0.as_ref(), &JsValue::from(id)));
		}
	}
}
