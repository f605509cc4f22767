//! An in-memory document tree.
//!
//! This backend is always available. It is what the crate's own tests render into,
//! and it can be used to drive templates outside of a browser, for example to inspect
//! how a render would mutate a tree.
//!
//! The parser is deliberately small: it handles elements, attributes, comments, text,
//! void elements, raw text elements and SVG content, but none of HTML's implied-tag rules.
//! Templates are expected to spell out their tags.

use core::cell::Cell;

mod node;
mod parse;
mod serialize;

pub use node::{Attr, Event, Listener, Namespace, Node};

thread_local! {
	static MUTATIONS: Cell<usize> = Cell::new(0);
}

fn count_mutation() {
	MUTATIONS.with(|mutations| mutations.set(mutations.get() + 1))
}

/// The number of tree, attribute, property and listener mutations performed on this thread so far.
///
/// Only differences between two readings are meaningful.
#[must_use]
pub fn mutation_count() -> usize {
	MUTATIONS.with(Cell::get)
}
