//! The render-tree cache: positional memoization of template instances.
//!
//! Each render position keeps a stack of the instances it bound on the previous pass,
//! in the order their invocations were encountered, plus one sub-cache per list item that was a template invocation.
//! Positions are matched up again purely by order, the way a hook list would be.

use crate::{
	bind::{bind, Updater},
	compile::{compile, instrument},
	dom::DomNode,
	error::{Error, Result},
	value::{Hole, Template, TemplateKind, Value},
	wire::Wire,
};
use core::{
	fmt::{self, Debug, Formatter},
	mem,
};
use tracing::{trace, trace_span};

/// The cached state of one render position.
pub(crate) struct RenderInfo<N: DomNode> {
	stack: Vec<Instance<N>>,
	sub: Vec<RenderInfo<N>>,
	/// What was last mounted at this position, if it is a mount root.
	pub(crate) wire: Option<Wire<N>>,
}

struct Instance<N: DomNode> {
	kind: TemplateKind,
	template: &'static Template,
	wire: Wire<N>,
	updaters: Vec<Updater<N>>,
}

#[derive(Debug, Default)]
struct Counter {
	/// Next list slot.
	a: usize,
	/// Next stack position.
	i: usize,
}

impl<N: DomNode> RenderInfo<N> {
	pub(crate) fn new() -> Self {
		Self {
			stack: Vec::new(),
			sub: Vec::new(),
			wire: None,
		}
	}
}
impl<N: DomNode> Default for RenderInfo<N> {
	fn default() -> Self {
		Self::new()
	}
}
impl<N: DomNode> Debug for RenderInfo<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("RenderInfo")
			.field("stack.len()", &self.stack.len())
			.field("sub.len()", &self.sub.len())
			.field("wire", &self.wire)
			.finish()
	}
}

/// Resolves `hole` against `info`, reusing, replacing or creating instances as needed, and returns the resulting wire.
///
/// # Errors
///
/// If any template in `hole` fails to compile or is invoked with the wrong number of values.
/// These are detected before any instance is bound or updated.
pub(crate) fn retrieve<N: DomNode>(info: &mut RenderInfo<N>, hole: Hole<N>) -> Result<Wire<N>> {
	validate(&hole)?;
	retrieve_validated(info, hole)
}

fn validate<N: DomNode>(hole: &Hole<N>) -> Result<()> {
	let compiled = compile::<N>(hole.kind, hole.template)?;
	if compiled.holes().len() != hole.values.len() {
		return Err(Error::Usage {
			expected: compiled.holes().len(),
			found: hole.values.len(),
		});
	}
	for value in &hole.values {
		match value {
			Value::Hole(nested) => validate(nested)?,
			Value::List(items) => {
				for item in items {
					if let Value::Hole(nested) = item {
						validate(nested)?
					}
				}
			}
			_ => (),
		}
	}
	Ok(())
}

fn retrieve_validated<N: DomNode>(info: &mut RenderInfo<N>, hole: Hole<N>) -> Result<Wire<N>> {
	let mut counter = Counter::default();
	let wire = unroll(info, hole, &mut counter)?;
	if counter.a < info.sub.len() {
		trace!("Pruning {} list slot(s).", info.sub.len() - counter.a);
		info.sub.truncate(counter.a);
	}
	if counter.i < info.stack.len() {
		trace!("Pruning {} instance(s).", info.stack.len() - counter.i);
		info.stack.truncate(counter.i);
	}
	Ok(wire)
}

fn unroll<N: DomNode>(info: &mut RenderInfo<N>, hole: Hole<N>, counter: &mut Counter) -> Result<Wire<N>> {
	let Hole { kind, template, mut values } = hole;
	let i = counter.i;
	let span = trace_span!("unroll", i);
	let _enter = span.enter();

	let unknown = i >= info.stack.len();
	if unknown {
		trace!("New instance.");
		info.stack.push(create_instance(kind, template)?);
	}
	counter.i += 1;

	unroll_values(info, &mut values, counter)?;

	let instance = &mut info.stack[i];
	if !unknown && (!Template::same(instance.template, template) || instance.kind != kind) {
		trace!("Template changed, replacing instance.");
		*instance = create_instance(kind, template)?;
	}
	for (updater, value) in instance.updaters.iter_mut().zip(values) {
		updater.update(value);
	}
	Ok(instance.wire.clone())
}

/// Resolves nested invocations in `values` to their wires, in place.
///
/// Direct invocations continue on this level's stack.
/// Invocations directly inside a list each get a list slot, numbered across all lists of this level.
fn unroll_values<N: DomNode>(info: &mut RenderInfo<N>, values: &mut [Value<N>], counter: &mut Counter) -> Result<()> {
	for value in values {
		match value {
			Value::Hole(_) => {
				if let Value::Hole(hole) = mem::replace(value, Value::Null) {
					*value = Value::Wire(unroll(info, hole, counter)?);
				}
			}
			Value::List(items) => {
				for item in items {
					if !matches!(item, Value::Hole(_)) {
						continue;
					}
					let a = counter.a;
					if a >= info.sub.len() {
						trace!("New list slot {}.", a);
						info.sub.push(RenderInfo::new());
					}
					counter.a += 1;
					if let Value::Hole(hole) = mem::replace(item, Value::Null) {
						*item = Value::Wire(retrieve_validated(&mut info.sub[a], hole)?);
					}
				}
			}
			_ => (),
		}
	}
	Ok(())
}

fn create_instance<N: DomNode>(kind: TemplateKind, template: &'static Template) -> Result<Instance<N>> {
	let compiled = compile::<N>(kind, template)?;
	let fragment = compiled.content().clone_subtree();
	let updaters = match compiled.holes().iter().map(|hole| bind(&fragment, hole)).collect::<Option<Vec<_>>>() {
		Some(updaters) => updaters,
		None => {
			return Err(Error::Compile {
				markup: instrument(template.segments()),
				expected: compiled.holes().len(),
				found: 0,
			})
		}
	};
	Ok(Instance {
		kind,
		template,
		wire: Wire::from_fragment(fragment),
		updaters,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::native::Node;

	static ITEM: Template = Template::new(&["<li>", "</li>"]);
	static LIST: Template = Template::new(&["<ul>", "</ul>"]);
	static OTHER: Template = Template::new(&["<ol>", "</ol>"]);

	fn list(count: usize) -> Hole<Node> {
		let items = (0..count).map(|i| Value::Hole(Hole::new(TemplateKind::Html, &ITEM, vec![i.into()]))).collect();
		Hole::new(TemplateKind::Html, &LIST, vec![Value::List(items)])
	}

	#[test]
	fn list_slots_are_pruned_from_the_tail() {
		let mut info = RenderInfo::<Node>::new();
		retrieve(&mut info, list(5)).unwrap();
		assert_eq!((info.stack.len(), info.sub.len()), (1, 5));
		retrieve(&mut info, list(3)).unwrap();
		assert_eq!((info.stack.len(), info.sub.len()), (1, 3));
		retrieve(&mut info, list(5)).unwrap();
		assert_eq!((info.stack.len(), info.sub.len()), (1, 5));
	}

	#[test]
	fn nested_invocations_share_the_stack() {
		let mut info = RenderInfo::<Node>::new();
		let inner = Hole::new(TemplateKind::Html, &ITEM, vec!["x".into()]);
		let wire = retrieve(&mut info, Hole::new(TemplateKind::Html, &OTHER, vec![inner.into()])).unwrap();
		assert_eq!(info.stack.len(), 2);
		assert_eq!(wire.materialize().outer_html(), "<ol><li>x<!--isµ0--></li><!--isµ0--></ol>");

		// Changing the outer template keeps the nested instance.
		let nested_wire = info.stack[1].wire.clone();
		let inner = Hole::new(TemplateKind::Html, &ITEM, vec!["y".into()]);
		retrieve(&mut info, Hole::new(TemplateKind::Html, &LIST, vec![inner.into()])).unwrap();
		assert_eq!(info.stack[1].wire, nested_wire);
		assert!(Template::same(info.stack[0].template, &LIST));
	}

	#[test]
	fn usage_errors_precede_binding() {
		let mut info = RenderInfo::<Node>::new();
		let bad = Hole::new(TemplateKind::Html, &ITEM, vec![]);
		let result = retrieve(&mut info, Hole::new(TemplateKind::Html, &LIST, vec![Value::List(vec![bad.into()])]));
		assert_eq!(result.unwrap_err(), Error::Usage { expected: 1, found: 0 });
		assert_eq!((info.stack.len(), info.sub.len()), (0, 0));
	}
}
