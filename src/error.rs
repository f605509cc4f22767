use thiserror::Error;

/// Everything that can go wrong during a render.
///
/// DOM-level failures aren't part of this: backends log them instead (see [`DomNode`](`crate::DomNode`)).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
	/// The instrumented markup of a template didn't parse into the expected hole markers.
	///
	/// This usually means a hole was placed somewhere the parser drops content, like inside a tag name.
	#[error("bad template, expected {expected} hole(s) but found {found}: {markup}")]
	Compile { markup: String, expected: usize, found: usize },

	/// A template was invoked with a different number of values than it has holes.
	#[error("template has {expected} hole(s) but was given {found} value(s)")]
	Usage { expected: usize, found: usize },

	/// [`render`](`crate::render`) got a value that is neither a template invocation, a node nor a wire.
	#[error("only template invocations, nodes and wires can be rendered into a container, not {0}")]
	NotRenderable(&'static str),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
