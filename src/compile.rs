//! The template compiler: instrumented markup in, cloneable content plus hole descriptors out.
//!
//! Each hole of a template is marked in its markup before parsing,
//! either as a comment `<!--isµ𝑖-->` (child content) or as an attribute `isµ𝑖="name"` (attribute values).
//! The parsed tree is then walked once to find the markers again, which yields the location and kind of every hole.

use crate::{
	dom::{self, DomNode, NodeKind},
	error::{Error, Result},
	value::{Template, TemplateKind},
};
use core::{
	any::{Any, TypeId},
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use regex::{Captures, Regex};
use std::{rc::Rc, sync::OnceLock};
use tracing::{instrument, trace, trace_span};

/// Prefix of the hole markers inserted during instrumentation.
#[allow(clippy::non_ascii_literal)]
pub const MARKER_PREFIX: &str = "isµ";

const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "menuitem", "meta", "param", "source", "track", "wbr",
];

/// What a hole stands for, as found in its template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoleKind {
	/// Child content, located at its placeholder comment.
	Node,
	/// The value of the named attribute of an element.
	Attribute(String),
	/// The whole text content of a `<style>` or `<textarea>` element.
	Text,
}

/// Location and kind of one hole, in template order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoleDescriptor {
	pub kind: HoleKind,
	/// Child indices from the template content's root down to the hole's node.
	pub path: Vec<usize>,
}

/// A parsed template, ready to be cloned for each new instance.
pub struct CompiledTemplate<N> {
	content: N,
	holes: Vec<HoleDescriptor>,
}
impl<N: DomNode> CompiledTemplate<N> {
	/// The pristine content fragment. Clone it with [`DomNode::clone_subtree`], don't mutate it.
	pub fn content(&self) -> &N {
		&self.content
	}

	pub fn holes(&self) -> &[HoleDescriptor] {
		&self.holes
	}
}
impl<N: DomNode> Debug for CompiledTemplate<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("CompiledTemplate").field("content", &self.content).field("holes", &self.holes).finish()
	}
}

thread_local! {
	/// Compiled templates by backend, kind and template address. Templates are `'static`, so this is never pruned.
	static TEMPLATES: RefCell<HashMap<(TypeId, TemplateKind, usize), Rc<dyn Any>>> = RefCell::new(HashMap::new());
}

/// Returns the compiled form of `template`, compiling it on first use.
///
/// The result is shared: compiling the same `static` again returns the same [`Rc`].
///
/// # Errors
///
/// Iff the instrumented markup doesn't contain all hole markers after parsing, see [`Error::Compile`].
/// Failures aren't cached.
pub fn compile<N: DomNode>(kind: TemplateKind, template: &'static Template) -> Result<Rc<CompiledTemplate<N>>> {
	let key = (TypeId::of::<N>(), kind, template.identity());
	let cached = TEMPLATES.with(|templates| templates.borrow().get(&key).cloned());
	if let Some(compiled) = cached.and_then(|cached| cached.downcast::<CompiledTemplate<N>>().ok()) {
		return Ok(compiled);
	}

	let compiled = Rc::new(compile_uncached::<N>(kind, template)?);
	TEMPLATES.with(|templates| templates.borrow_mut().insert(key, compiled.clone() as Rc<dyn Any>));
	Ok(compiled)
}

#[instrument]
fn compile_uncached<N: DomNode>(kind: TemplateKind, template: &'static Template) -> Result<CompiledTemplate<N>> {
	let markup = instrument(template.segments());
	if cfg!(feature = "dangerous-logging") {
		trace!("Instrumented markup: {:?}", markup);
	}
	let content = N::parse_markup(&markup, kind);

	let span = trace_span!("walk");
	let _enter = span.enter();

	let expected = template.segments().len().saturating_sub(1);
	let mut holes = Vec::with_capacity(expected);
	let mut search = marker(0);
	let mut node = content.clone();
	while holes.len() < expected {
		node = match dom::next_element_or_comment(&content, &node) {
			Some(next) => next,
			None => {
				return Err(Error::Compile {
					markup,
					expected,
					found: holes.len(),
				})
			}
		};
		match node.node_kind() {
			NodeKind::Comment => {
				if node.text_content() == search {
					holes.push(HoleDescriptor {
						kind: HoleKind::Node,
						path: dom::path_of(&content, &node),
					});
					search = marker(holes.len());
				}
			}
			NodeKind::Element => {
				while node.has_attribute(&search) {
					let name = node.get_attribute(&search).unwrap_or_default();
					node.remove_attribute(&search);
					holes.push(HoleDescriptor {
						kind: HoleKind::Attribute(name),
						path: dom::path_of(&content, &node),
					});
					search = marker(holes.len());
				}
				let tag_name = node.tag_name();
				if (tag_name.eq_ignore_ascii_case("style") || tag_name.eq_ignore_ascii_case("textarea")) && node.text_content().trim() == format!("<!--{}-->", search) {
					holes.push(HoleDescriptor {
						kind: HoleKind::Text,
						path: dom::path_of(&content, &node),
					});
					search = marker(holes.len());
				}
			}
			NodeKind::Text | NodeKind::Fragment | NodeKind::Other => (),
		}
	}

	trace!("Found {} hole(s).", holes.len());
	Ok(CompiledTemplate { content, holes })
}

fn marker(index: usize) -> String {
	format!("{}{}", MARKER_PREFIX, index)
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
	cell.get_or_init(|| Regex::new(pattern).unwrap_or_else(|error| unreachable!("Invalid built-in pattern {:?}: {}", pattern, error)))
}

/// A trailing `name=`, optionally followed by an opening quote.
fn attribute_tail() -> &'static Regex {
	static CELL: OnceLock<Regex> = OnceLock::new();
	regex(&CELL, r#"([^\s\\>"'=]+)\s*=\s*(['"]?)$"#)
}

fn open_start_tag() -> &'static Regex {
	static CELL: OnceLock<Regex> = OnceLock::new();
	regex(&CELL, r"<[A-Za-z][^>]+$")
}

fn child_content() -> &'static Regex {
	static CELL: OnceLock<Regex> = OnceLock::new();
	regex(&CELL, r">[^<>]*$")
}

fn self_closing_tag() -> &'static Regex {
	static CELL: OnceLock<Regex> = OnceLock::new();
	regex(&CELL, r"<([A-Za-z]+[A-Za-z0-9:._-]*)([^>]*?)(/>)")
}

/// Whether the text right after `segments[..end]` is inside a start tag.
fn in_start_tag(segments: &[&str], end: usize) -> bool {
	for segment in segments[..end].iter().rev() {
		if open_start_tag().is_match(segment) {
			return true;
		}
		if child_content().is_match(segment) {
			return false;
		}
	}
	false
}

/// Joins `segments` with hole markers into parseable markup.
///
/// Self-closing tags of non-void elements are expanded into start and end tag pairs,
/// since HTML content would otherwise swallow their siblings.
#[must_use]
pub fn instrument(segments: &[&str]) -> String {
	let mut text = String::new();
	for (i, segment) in segments.iter().enumerate() {
		if attribute_tail().is_match(segment) && in_start_tag(segments, i + 1) {
			text.push_str(&attribute_tail().replace(segment, |captures: &Captures<'_>| {
				let quote = &captures[2];
				format!("{}{}={}{}{}", MARKER_PREFIX, i, if quote.is_empty() { "\"" } else { quote }, &captures[1], if quote.is_empty() { "\"" } else { "" })
			}));
		} else if i + 1 < segments.len() {
			text.push_str(segment);
			text.push_str("<!--");
			text.push_str(&marker(i));
			text.push_str("-->");
		} else {
			text.push_str(segment);
		}
	}

	self_closing_tag()
		.replace_all(text.trim(), |captures: &Captures<'_>| {
			let name = &captures[1];
			if VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(name)) {
				captures[0].to_owned()
			} else {
				format!("<{}{}></{}>", name, &captures[2], name)
			}
		})
		.into_owned()
}
