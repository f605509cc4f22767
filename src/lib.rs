#![doc(html_root_url = "https://docs.rs/wired-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Template-literal style rendering into a live document tree.
//!
//! A template is a `static` list of markup segments with holes between them.
//! It's parsed once, after which each render clones the parsed content (the first time a position is rendered)
//! or only updates the holes whose values changed (every time after that).
//! Lists of child content are patched with a keyed reconciler in the manner of `udomdiff`.
//!
//! ```
//! use wired_dom::{html, native::Node, render};
//!
//! let container = Node::element("main");
//! for name in ["World", "again"] {
//! 	render(&container, html!(["<p>Hello, ", "!</p>"], name)).unwrap();
//! }
//! assert_eq!(container.inner_html(), "<p>Hello, again<!--isµ0-->!</p>");
//! ```
//!
//! # Features
//!
//! - `"web"`: The browser backend [`web::WebNode`], using `web-sys`.
//! - `"dangerous-logging"`: Log messages may contain template markup and interpolated values.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

mod bind;
mod cache;
pub mod compile;
pub mod diff;
pub mod dom;
mod error;
pub mod native;
mod render;
mod value;
#[cfg(feature = "web")]
pub mod web;
mod wire;

pub use crate::{
	dom::{DomNode, NodeKind},
	error::{Error, Result},
	render::{for_ref, node, render, render_with, Fixed},
	value::{Hole, NodeRef, Template, TemplateKind, Value},
	wire::{Group, Wire},
};

/// Invokes an HTML template with values.
///
/// The first argument is the bracketed list of string literal segments, the rest are the interpolated values,
/// one fewer than there are segments. Each value is converted with [`Value::from`].
///
/// Every expansion declares its own `static` [`Template`], so each call site is one template.
///
/// ```
/// use wired_dom::{html, native::Node, Hole};
///
/// let item: Hole<Node> = html!(["<li class=", ">", "</li>"], "done", 5);
/// assert_eq!(item.values.len(), 2);
/// ```
#[macro_export]
macro_rules! html {
	([$($segment:literal),+ $(,)?] $(, $value:expr)* $(,)?) => {{
		static TEMPLATE: $crate::Template = $crate::Template::new(&[$($segment),+]);
		$crate::Hole::new($crate::TemplateKind::Html, &TEMPLATE, ::std::vec![$($crate::Value::from($value)),*])
	}};
}

/// Like [`html!`], but the markup is parsed as SVG content.
///
/// ```
/// use wired_dom::{native::Node, render, svg};
///
/// let group = Node::element_ns("g", wired_dom::native::Namespace::Svg);
/// render(&group, svg!([r#"<circle r=""#, r#""/>"#], 4)).unwrap();
/// assert_eq!(group.inner_html(), r#"<circle r="4"></circle>"#);
/// ```
#[macro_export]
macro_rules! svg {
	([$($segment:literal),+ $(,)?] $(, $value:expr)* $(,)?) => {{
		static TEMPLATE: $crate::Template = $crate::Template::new(&[$($segment),+]);
		$crate::Hole::new($crate::TemplateKind::Svg, &TEMPLATE, ::std::vec![$($crate::Value::from($value)),*])
	}};
}
