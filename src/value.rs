//! Templates, their invocations ([`Hole`]s), and interpolated [`Value`]s.

use crate::{dom::DomNode, wire::Wire};
use core::{
	any::Any,
	cell::RefCell,
	fmt::{self, Debug, Formatter},
	ptr,
};
use std::{borrow::Cow, rc::Rc};

/// Whether a template's markup is parsed as HTML or as SVG content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
	Html,
	Svg,
}

/// The static text segments of one template call site.
///
/// A template is identified by the address of the `static` it lives in,
/// **not** by its text: two separately declared statics with identical segments are distinct templates.
/// [`html!`](`crate::html!`) and [`svg!`](`crate::svg!`) declare one such `static` per call site.
///
/// There is always exactly one more segment than there are holes.
pub struct Template {
	segments: &'static [&'static str],
}
impl Template {
	#[must_use]
	pub const fn new(segments: &'static [&'static str]) -> Self {
		Self { segments }
	}

	#[must_use]
	pub fn segments(&self) -> &'static [&'static str] {
		self.segments
	}

	pub(crate) fn identity(&'static self) -> usize {
		self as *const Self as usize
	}

	#[must_use]
	pub fn same(a: &'static Self, b: &'static Self) -> bool {
		ptr::eq(a, b)
	}
}
impl Debug for Template {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("Template");
		debug.field("address", &(self as *const Self));
		if cfg!(feature = "dangerous-logging") {
			debug.field("segments", &self.segments);
		} else {
			debug.field("segments.len()", &self.segments.len());
		}
		debug.finish()
	}
}

/// One invocation of a [`Template`] with values, not yet bound to anything.
pub struct Hole<N: DomNode> {
	pub kind: TemplateKind,
	pub template: &'static Template,
	pub values: Vec<Value<N>>,
}
impl<N: DomNode> Hole<N> {
	#[must_use]
	pub fn new(kind: TemplateKind, template: &'static Template, values: Vec<Value<N>>) -> Self {
		Self { kind, template, values }
	}
}
impl<N: DomNode> Clone for Hole<N> {
	fn clone(&self) -> Self {
		Self {
			kind: self.kind,
			template: self.template,
			values: self.values.clone(),
		}
	}
}
impl<N: DomNode> Debug for Hole<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Hole")
			.field("kind", &self.kind)
			.field("template", &self.template)
			.field("values", &self.values)
			.finish()
	}
}

/// Target of a `ref` attribute hole, which receives the element it is placed on.
pub struct NodeRef<N>(Rc<RefCell<Option<N>>>);
impl<N: Clone> NodeRef<N> {
	#[must_use]
	pub fn new() -> Self {
		Self(Rc::new(RefCell::new(None)))
	}

	#[must_use]
	pub fn current(&self) -> Option<N> {
		self.0.borrow().clone()
	}

	pub fn set_current(&self, node: N) {
		*self.0.borrow_mut() = Some(node)
	}
}
impl<N: Clone> Default for NodeRef<N> {
	fn default() -> Self {
		Self::new()
	}
}
impl<N> Clone for NodeRef<N> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}
impl<N> PartialEq for NodeRef<N> {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl<N: Debug> Debug for NodeRef<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("NodeRef").field(&self.0.borrow()).finish()
	}
}

/// An interpolated value.
///
/// Primitives compare by value, everything that's an object in the browser compares by identity.
/// [`Value::List`] and [`Value::Hole`] are rebuilt on each render, so they are never equal to a previous value.
pub enum Value<N: DomNode> {
	/// `null` or `undefined`.
	Null,
	Bool(bool),
	Number(f64),
	Str(Cow<'static, str>),
	/// A concrete node. Fragments contribute their child nodes.
	Node(N),
	/// A materialized template instance.
	Wire(Wire<N>),
	List(Vec<Value<N>>),
	/// A nested template invocation, resolved to a [`Value::Wire`] before the updaters run.
	Hole(Hole<N>),
	Listener(N::Listener),
	Ref(NodeRef<N>),
	/// A host value the engine doesn't understand. Node holes ignore it.
	Opaque(Rc<dyn Any>),
}
impl<N: DomNode> Value<N> {
	#[must_use]
	pub fn node(node: N) -> Self {
		Self::Node(node)
	}

	#[must_use]
	pub fn listener(listener: N::Listener) -> Self {
		Self::Listener(listener)
	}

	#[must_use]
	pub fn opaque(value: impl Any) -> Self {
		Self::Opaque(Rc::new(value))
	}

	#[must_use]
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	#[must_use]
	pub fn is_primitive(&self) -> bool {
		matches!(self, Self::Bool(_) | Self::Number(_) | Self::Str(_))
	}

	/// `===` as far as it is meaningful here.
	#[must_use]
	pub fn strict_eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Null, Self::Null) => true,
			(Self::Bool(a), Self::Bool(b)) => a == b,
			#[allow(clippy::float_cmp)]
			(Self::Number(a), Self::Number(b)) => a == b,
			(Self::Str(a), Self::Str(b)) => a == b,
			(Self::Node(a), Self::Node(b)) => a == b,
			(Self::Wire(a), Self::Wire(b)) => a == b,
			(Self::Listener(a), Self::Listener(b)) => a == b,
			(Self::Ref(a), Self::Ref(b)) => a == b,
			(Self::Opaque(a), Self::Opaque(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}

	/// The value's string form as an attribute or text would receive it.
	///
	/// Lists join their items with `,` (with `null` items as empty strings), like `Array.prototype.toString`.
	/// Returns [`None`] for values that have no meaningful string form.
	#[must_use]
	pub fn to_text(&self) -> Option<Cow<'_, str>> {
		Some(match self {
			Self::Null => Cow::Borrowed(""),
			Self::Bool(true) => Cow::Borrowed("true"),
			Self::Bool(false) => Cow::Borrowed("false"),
			Self::Number(number) => Cow::Owned(number_to_string(*number)),
			Self::Str(string) => Cow::Borrowed(string.as_ref()),
			Self::List(items) => {
				let mut joined = String::new();
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						joined.push(',');
					}
					joined.push_str(&item.to_text()?);
				}
				Cow::Owned(joined)
			}
			Self::Node(_) | Self::Wire(_) | Self::Hole(_) | Self::Listener(_) | Self::Ref(_) | Self::Opaque(_) => return None,
		})
	}

	pub(crate) fn shape(&self) -> &'static str {
		match self {
			Self::Null => "null",
			Self::Bool(_) => "bool",
			Self::Number(_) => "number",
			Self::Str(_) => "string",
			Self::Node(_) => "node",
			Self::Wire(_) => "wire",
			Self::List(_) => "list",
			Self::Hole(_) => "hole",
			Self::Listener(_) => "listener",
			Self::Ref(_) => "ref",
			Self::Opaque(_) => "opaque",
		}
	}
}

/// Formats like JavaScript's `Number.prototype.toString`.
///
/// Magnitudes from `1e21` up and below `1e-6` use the exponent form, with an explicit `+` for positive exponents.
fn number_to_string(number: f64) -> String {
	if number.is_nan() {
		"NaN".to_owned()
	} else if number.is_infinite() {
		if number > 0.0 { "Infinity" } else { "-Infinity" }.to_owned()
	} else if number == 0.0 {
		"0".to_owned()
	} else if number.abs() >= 1e21 || number.abs() < 1e-6 {
		let formatted = format!("{:e}", number);
		match formatted.split_once('e') {
			Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{}e+{}", mantissa, exponent),
			_ => formatted,
		}
	} else {
		number.to_string()
	}
}

impl<N: DomNode> Clone for Value<N> {
	fn clone(&self) -> Self {
		match self {
			Self::Null => Self::Null,
			Self::Bool(value) => Self::Bool(*value),
			Self::Number(value) => Self::Number(*value),
			Self::Str(value) => Self::Str(value.clone()),
			Self::Node(node) => Self::Node(node.clone()),
			Self::Wire(wire) => Self::Wire(wire.clone()),
			Self::List(items) => Self::List(items.clone()),
			Self::Hole(hole) => Self::Hole(hole.clone()),
			Self::Listener(listener) => Self::Listener(listener.clone()),
			Self::Ref(node_ref) => Self::Ref(node_ref.clone()),
			Self::Opaque(value) => Self::Opaque(value.clone()),
		}
	}
}

impl<N: DomNode> Debug for Value<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		if !cfg!(feature = "dangerous-logging") {
			if let Self::Str(string) = self {
				return f.debug_tuple("Str").field(&format_args!("<{} byte(s)>", string.len())).finish();
			}
		}
		match self {
			Self::Null => f.write_str("Null"),
			Self::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
			Self::Number(value) => f.debug_tuple("Number").field(value).finish(),
			Self::Str(value) => f.debug_tuple("Str").field(value).finish(),
			Self::Node(node) => f.debug_tuple("Node").field(node).finish(),
			Self::Wire(wire) => f.debug_tuple("Wire").field(wire).finish(),
			Self::List(items) => f.debug_tuple("List").field(items).finish(),
			Self::Hole(hole) => f.debug_tuple("Hole").field(hole).finish(),
			Self::Listener(listener) => f.debug_tuple("Listener").field(listener).finish(),
			Self::Ref(node_ref) => f.debug_tuple("Ref").field(node_ref).finish(),
			Self::Opaque(_) => f.write_str("Opaque(..)"),
		}
	}
}

impl<N: DomNode> From<bool> for Value<N> {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}
impl<N: DomNode> From<f64> for Value<N> {
	fn from(value: f64) -> Self {
		Self::Number(value)
	}
}
macro_rules! from_lossless_number {
	($($type:ty),*$(,)?) => {$(
		impl<N: DomNode> From<$type> for Value<N> {
			fn from(value: $type) -> Self {
				Self::Number(value.into())
			}
		}
	)*};
}
from_lossless_number!(f32, i8, i16, i32, u8, u16, u32);
macro_rules! from_wide_number {
	($($type:ty),*$(,)?) => {$(
		impl<N: DomNode> From<$type> for Value<N> {
			#[allow(clippy::cast_precision_loss)]
			fn from(value: $type) -> Self {
				Self::Number(value as f64)
			}
		}
	)*};
}
from_wide_number!(i64, u64, isize, usize);
impl<N: DomNode> From<&'static str> for Value<N> {
	fn from(value: &'static str) -> Self {
		Self::Str(Cow::Borrowed(value))
	}
}
impl<N: DomNode> From<String> for Value<N> {
	fn from(value: String) -> Self {
		Self::Str(Cow::Owned(value))
	}
}
impl<N: DomNode> From<Cow<'static, str>> for Value<N> {
	fn from(value: Cow<'static, str>) -> Self {
		Self::Str(value)
	}
}
impl<N: DomNode> From<Hole<N>> for Value<N> {
	fn from(hole: Hole<N>) -> Self {
		Self::Hole(hole)
	}
}
impl<N: DomNode> From<Wire<N>> for Value<N> {
	fn from(wire: Wire<N>) -> Self {
		Self::Wire(wire)
	}
}
impl<N: DomNode> From<NodeRef<N>> for Value<N> {
	fn from(node_ref: NodeRef<N>) -> Self {
		Self::Ref(node_ref)
	}
}
impl<N: DomNode> From<&NodeRef<N>> for Value<N> {
	fn from(node_ref: &NodeRef<N>) -> Self {
		Self::Ref(node_ref.clone())
	}
}
impl<N: DomNode, T: Into<Value<N>>> From<Option<T>> for Value<N> {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}
impl<N: DomNode, T: Into<Value<N>>> From<Vec<T>> for Value<N> {
	fn from(items: Vec<T>) -> Self {
		Self::List(items.into_iter().map(Into::into).collect())
	}
}
impl<N: DomNode> From<()> for Value<N> {
	fn from((): ()) -> Self {
		Self::Null
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::native::Node;

	#[test]
	fn numbers_format_like_javascript() {
		assert_eq!(Value::<Node>::from(3).to_text().unwrap(), "3");
		assert_eq!(Value::<Node>::from(0.5).to_text().unwrap(), "0.5");
		assert_eq!(Value::<Node>::from(-0.0).to_text().unwrap(), "0");
		assert_eq!(Value::<Node>::from(f64::NAN).to_text().unwrap(), "NaN");
		assert_eq!(Value::<Node>::from(f64::NEG_INFINITY).to_text().unwrap(), "-Infinity");
	}

	#[test]
	fn extreme_magnitudes_use_exponents() {
		assert_eq!(Value::<Node>::from(1e20).to_text().unwrap(), "100000000000000000000");
		assert_eq!(Value::<Node>::from(1e21).to_text().unwrap(), "1e+21");
		assert_eq!(Value::<Node>::from(1.5e300).to_text().unwrap(), "1.5e+300");
		assert_eq!(Value::<Node>::from(0.000_001).to_text().unwrap(), "0.000001");
		assert_eq!(Value::<Node>::from(1e-7).to_text().unwrap(), "1e-7");
		assert_eq!(Value::<Node>::from(-2.5e-9).to_text().unwrap(), "-2.5e-9");
	}

	#[test]
	fn lists_join_with_commas() {
		let list: Value<Node> = Value::List(vec![1.into(), "a".into(), Value::Null, true.into()]);
		assert_eq!(list.to_text().unwrap(), "1,a,,true");
		assert!(Value::<Node>::node(Node::text("x")).to_text().is_none());
	}

	#[test]
	fn strict_equality() {
		let node = Node::text("x");
		assert!(Value::<Node>::from("a").strict_eq(&"a".to_owned().into()));
		assert!(!Value::<Node>::from(1).strict_eq(&"1".into()));
		assert!(!Value::<Node>::from(f64::NAN).strict_eq(&f64::NAN.into()));
		assert!(Value::node(node.clone()).strict_eq(&Value::node(node)));
		assert!(!Value::<Node>::node(Node::text("x")).strict_eq(&Value::node(Node::text("x"))));
		assert!(!Value::<Node>::List(vec![]).strict_eq(&Value::List(vec![])));
		assert!(Value::<Node>::Null.strict_eq(&None::<i32>.into()));
	}
}
