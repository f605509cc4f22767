use super::{parse::VOID_ELEMENTS, Namespace, Node};
use crate::dom::{DomNode, NodeKind};

/// Elements whose text content is serialized verbatim.
const RAW_TEXT_PARENTS: &[&str] = &["script", "style", "xmp"];

pub(super) fn outer_html(node: &Node) -> String {
	let mut html = String::new();
	write_node(node, &mut html);
	html
}

pub(super) fn inner_html(node: &Node) -> String {
	let mut html = String::new();
	for child in node.children() {
		write_node(&child, &mut html)
	}
	html
}

fn write_node(node: &Node, html: &mut String) {
	match node.kind() {
		NodeKind::Element => {
			let name = node.name();
			html.push('<');
			html.push_str(&name);
			for (attribute, value) in node.attributes() {
				html.push(' ');
				html.push_str(&attribute);
				html.push_str("=\"");
				escape(&value, true, html);
				html.push('"');
			}
			html.push('>');
			if node.namespace() == Namespace::Html && VOID_ELEMENTS.contains(&name.as_str()) {
				return;
			}
			for child in node.children() {
				write_node(&child, html)
			}
			html.push_str("</");
			html.push_str(&name);
			html.push('>');
		}
		NodeKind::Text => {
			let raw = node
				.parent_node()
				.map_or(false, |parent| parent.kind() == NodeKind::Element && parent.namespace() == Namespace::Html && RAW_TEXT_PARENTS.contains(&parent.name().as_str()));
			if raw {
				html.push_str(&node.data())
			} else {
				escape(&node.data(), false, html)
			}
		}
		NodeKind::Comment => {
			html.push_str("<!--");
			html.push_str(&node.data());
			html.push_str("-->");
		}
		NodeKind::Fragment => {
			for child in node.children() {
				write_node(&child, html)
			}
		}
		NodeKind::Other => (),
	}
}

fn escape(text: &str, attribute: bool, html: &mut String) {
	for c in text.chars() {
		match c {
			'&' => html.push_str("&amp;"),
			'\u{a0}' => html.push_str("&nbsp;"),
			'"' if attribute => html.push_str("&quot;"),
			'<' if !attribute => html.push_str("&lt;"),
			'>' if !attribute => html.push_str("&gt;"),
			c => html.push(c),
		}
	}
}
