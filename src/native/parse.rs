use super::{Namespace, Node};
use crate::dom::{DomNode, NodeKind};
use std::borrow::Cow;
use tracing::trace;

pub(super) const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "menuitem", "meta", "param", "source", "track", "wbr",
];

/// Elements whose content isn't parsed as markup, and whether entities are decoded in them.
const RAW_TEXT_ELEMENTS: &[(&str, bool)] = &[("script", false), ("style", false), ("xmp", false), ("textarea", true), ("title", true)];

/// Parses `markup` into a new fragment, as child content of an element in `namespace`.
pub(super) fn parse_fragment(markup: &str, namespace: Namespace) -> Node {
	let fragment = Node::fragment();
	let mut parser = Parser {
		input: markup,
		position: 0,
		open: vec![(fragment.clone(), namespace)],
	};
	parser.run();
	trace!("Parsed {} byte(s) into {} top-level node(s).", markup.len(), fragment.child_count());
	fragment
}

struct Parser<'a> {
	input: &'a str,
	position: usize,
	/// Open elements with the namespace of their content, innermost last. Index 0 is the fragment.
	open: Vec<(Node, Namespace)>,
}

impl<'a> Parser<'a> {
	fn rest(&self) -> &'a str {
		&self.input[self.position..]
	}

	fn current(&self) -> &(Node, Namespace) {
		self.open.last().unwrap_or_else(|| unreachable!("The fragment is never closed."))
	}

	fn run(&mut self) {
		while self.position < self.input.len() {
			let rest = self.rest();
			if rest.starts_with("<!--") {
				self.comment();
			} else if rest.starts_with("</") && rest[2..].starts_with(|c: char| c.is_ascii_alphabetic()) {
				self.end_tag();
			} else if rest.starts_with("<!") || rest.starts_with("<?") || rest.starts_with("</") {
				self.bogus_comment();
			} else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
				self.start_tag();
			} else {
				self.text();
			}
		}
	}

	fn append(&mut self, node: Node) {
		self.current().0.push_child(node)
	}

	fn append_text(&mut self, text: &str) {
		if text.is_empty() {
			return;
		}
		let parent = self.current().0.clone();
		match parent.last_child() {
			Some(last) if last.kind() == NodeKind::Text => {
				let mut data = last.data();
				data.push_str(text);
				// Not a mutation of a live tree.
				last.replace_data_quietly(data);
			}
			_ => parent.push_child(Node::text(text)),
		}
	}

	fn comment(&mut self) {
		let body = &self.rest()[4..];
		let (data, consumed) = match body.find("-->") {
			Some(end) => (&body[..end], 4 + end + 3),
			None => (body, 4 + body.len()),
		};
		self.position += consumed;
		self.append(Node::comment(data));
	}

	fn bogus_comment(&mut self) {
		let body = &self.rest()[2..];
		let (data, consumed) = match body.find('>') {
			Some(end) => (&body[..end], 2 + end + 1),
			None => (body, 2 + body.len()),
		};
		self.position += consumed;
		self.append(Node::comment(data));
	}

	fn text(&mut self) {
		let rest = self.rest();
		let first = rest.chars().next().map_or(1, char::len_utf8);
		let end = rest[first..].find('<').map_or(rest.len(), |i| i + first);
		self.position += end;
		self.append_text(&decode_entities(&rest[..end]));
	}

	fn tag_name(&mut self) -> &'a str {
		let rest = self.rest();
		let end = rest.find(|c: char| c.is_whitespace() || c == '/' || c == '>').unwrap_or(rest.len());
		self.position += end;
		&rest[..end]
	}

	fn skip_whitespace(&mut self) {
		let rest = self.rest();
		self.position += rest.len() - rest.trim_start().len();
	}

	fn end_tag(&mut self) {
		self.position += 2;
		let name = self.tag_name();
		match self.rest().find('>') {
			Some(end) => self.position += end + 1,
			None => self.position = self.input.len(),
		}
		if let Some(index) = self.open.iter().rposition(|(element, _)| element.kind() == NodeKind::Element && element.name().eq_ignore_ascii_case(name)) {
			self.open.truncate(index.max(1));
		}
	}

	fn start_tag(&mut self) {
		self.position += 1;
		let name = self.tag_name();
		let parent_namespace = self.current().1;
		let namespace = if name.eq_ignore_ascii_case("svg") { Namespace::Svg } else { parent_namespace };
		let name = match namespace {
			Namespace::Html => name.to_ascii_lowercase(),
			Namespace::Svg => name.to_owned(),
		};
		let element = Node::element_ns(&name, namespace);

		let mut self_closing = false;
		loop {
			self.skip_whitespace();
			let rest = self.rest();
			if rest.is_empty() {
				break;
			} else if rest.starts_with("/>") {
				self.position += 2;
				self_closing = true;
				break;
			} else if rest.starts_with('>') {
				self.position += 1;
				break;
			} else if rest.starts_with('/') {
				self.position += 1;
				continue;
			}

			let name_end = match rest.find(|c: char| c.is_whitespace() || c == '/' || c == '>' || c == '=') {
				Some(0) => rest.chars().next().map_or(1, char::len_utf8),
				Some(end) => end,
				None => rest.len(),
			};
			let attribute_name = &rest[..name_end];
			self.position += name_end;
			self.skip_whitespace();

			let mut value = Cow::Borrowed("");
			if self.rest().starts_with('=') {
				self.position += 1;
				self.skip_whitespace();
				let rest = self.rest();
				match rest.chars().next() {
					Some(quote @ ('"' | '\'')) => {
						let body = &rest[1..];
						let end = body.find(quote).unwrap_or(body.len());
						value = decode_entities(&body[..end]);
						self.position += 1 + end + usize::from(end < body.len());
					}
					_ => {
						let end = rest.find(|c: char| c.is_whitespace() || c == '>').unwrap_or(rest.len());
						value = decode_entities(&rest[..end]);
						self.position += end;
					}
				}
			}

			let attribute_name = match namespace {
				Namespace::Html => Cow::Owned(attribute_name.to_ascii_lowercase()),
				Namespace::Svg => Cow::Borrowed(attribute_name),
			};
			if !element.has_attribute(&attribute_name) {
				element.push_attribute(&attribute_name, &value);
			}
		}

		self.append(element.clone());

		if namespace == Namespace::Html && VOID_ELEMENTS.contains(&name.as_str()) {
			return;
		}
		if namespace == Namespace::Svg && self_closing {
			return;
		}

		let content_namespace = if namespace == Namespace::Svg && name == "foreignObject" { Namespace::Html } else { namespace };
		if namespace == Namespace::Html {
			if let Some(&(_, decode)) = RAW_TEXT_ELEMENTS.iter().find(|(raw, _)| *raw == name) {
				let rest = self.rest();
				let end = find_end_tag(rest, &name).unwrap_or(rest.len());
				let text = &rest[..end];
				self.position += end;
				if !text.is_empty() {
					element.push_child(Node::text(&if decode { decode_entities(text) } else { Cow::Borrowed(text) }));
				}
				self.open.push((element, content_namespace));
				return;
			}
		}
		self.open.push((element, content_namespace));
	}
}

/// Byte offset of the first `</name` (ASCII case-insensitive) in `text`.
fn find_end_tag(text: &str, name: &str) -> Option<usize> {
	let bytes = text.as_bytes();
	let name = name.as_bytes();
	(0..bytes.len()).find(|&i| {
		bytes[i..].starts_with(b"</") && bytes.len() >= i + 2 + name.len() && bytes[i + 2..i + 2 + name.len()].eq_ignore_ascii_case(name)
	})
}

/// Decodes the character references templates commonly contain. Unknown ones are left as they are.
pub(super) fn decode_entities(text: &str) -> Cow<'_, str> {
	if !text.contains('&') {
		return Cow::Borrowed(text);
	}
	let mut decoded = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(start) = rest.find('&') {
		decoded.push_str(&rest[..start]);
		rest = &rest[start..];
		let reference = rest.find(';').filter(|&end| end <= 12).map(|end| (&rest[1..end], end));
		match reference.and_then(|(name, end)| decode_reference(name).map(|c| (c, end))) {
			Some((c, end)) => {
				decoded.push(c);
				rest = &rest[end + 1..];
			}
			None => {
				decoded.push('&');
				rest = &rest[1..];
			}
		}
	}
	decoded.push_str(rest);
	Cow::Owned(decoded)
}

fn decode_reference(name: &str) -> Option<char> {
	Some(match name {
		"amp" => '&',
		"lt" => '<',
		"gt" => '>',
		"quot" => '"',
		"apos" => '\'',
		"nbsp" => '\u{a0}',
		_ => {
			let number = name.strip_prefix('#')?;
			let code = match number.strip_prefix(|c| c == 'x' || c == 'X') {
				Some(hex) => u32::from_str_radix(hex, 16).ok()?,
				None => number.parse().ok()?,
			};
			char::from_u32(code)?
		}
	})
}
