//! Reconciliation of one container's ordered child entries, in the manner of `udomdiff`.

use crate::dom::DomNode;
use core::hash::Hash;
use hashbrown::HashMap;
use tracing::{instrument, trace};

/// What the node returned by a reconciler accessor will be used for.
///
/// For single nodes all directives resolve to the node itself.
/// Multi-node entries resolve [`First`](`Directive::First`) and [`Last`](`Directive::Last`) to their boundaries,
/// collapse on [`Remove`](`Directive::Remove`) and expand on [`Insert`](`Directive::Insert`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
	/// Resolve the node to insert before.
	First,
	/// Resolve the node whose next sibling is the insertion point.
	Last,
	/// Materialize the entry for insertion.
	Insert,
	/// Detach the entry for removal.
	Remove,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DiffStats {
	pub index_built: bool,
	pub reverse_swaps: usize,
}

/// Mutates `parent`'s children so that the live entries `a` are replaced by `b`, in `b`'s order.
///
/// `before` is the node trailing appends land in front of ([`None`] appends at the end of `parent`).
/// Entries are matched by equality, so they should compare by identity.
///
/// This is a heuristic: it finds a cheap edit script for appends, removals, swaps and
/// reorders that leave long runs untouched, and degrades to about one DOM operation per
/// mismatched entry otherwise. It doesn't look for a minimal one.
///
/// Returns `b`.
pub fn reconcile<N, E, G>(parent: &N, a: Vec<E>, b: Vec<E>, get: G, before: Option<&N>) -> Vec<E>
where
	N: DomNode,
	E: Clone + Eq + Hash,
	G: FnMut(&E, Directive) -> N,
{
	reconcile_with_stats(parent, a, b, get, before).0
}

#[allow(clippy::too_many_lines)]
#[instrument(skip(parent, a, b, get, before), fields(a.len = a.len(), b.len = b.len()))]
pub(crate) fn reconcile_with_stats<N, E, G>(parent: &N, mut a: Vec<E>, b: Vec<E>, mut get: G, before: Option<&N>) -> (Vec<E>, DiffStats)
where
	N: DomNode,
	E: Clone + Eq + Hash,
	G: FnMut(&E, Directive) -> N,
{
	let mut stats = DiffStats::default();
	let b_length = b.len();
	let mut a_end = a.len();
	let mut b_end = b_length;
	let mut a_start = 0;
	let mut b_start = 0;
	let mut map: Option<HashMap<E, usize>> = None;

	while a_start < a_end || b_start < b_end {
		// Same head.
		if a_start < a_end && b_start < b_end && a[a_start] == b[b_start] {
			a_start += 1;
			b_start += 1;
		}
		// Same tail.
		else if a_start < a_end && b_start < b_end && a[a_end - 1] == b[b_end - 1] {
			a_end -= 1;
			b_end -= 1;
		}
		// Append head, tail or entries in between.
		else if a_end == a_start {
			let node = if b_end < b_length {
				if b_start > 0 {
					get(&b[b_start - 1], Directive::Last).next_sibling()
				} else {
					Some(get(&b[b_end], Directive::First))
				}
			} else {
				before.cloned()
			};
			while b_start < b_end {
				parent.insert_before(&get(&b[b_start], Directive::Insert), node.as_ref());
				b_start += 1;
			}
		}
		// Remove head or tail.
		else if b_end == b_start {
			while a_start < a_end {
				parent.remove_child(&get(&a[a_start], Directive::Remove));
				a_start += 1;
			}
		}
		// One left on each side.
		else if a_end - a_start == 1 && b_end - b_start == 1 {
			// The source entry is either unknown (replace it), or it was seen in the target list and still has to end up somewhere.
			if map.as_ref().map_or(false, |map| map.contains_key(&a[a_start])) {
				let reference = if b_end < b_length { Some(get(&b[b_end], Directive::First)) } else { before.cloned() };
				parent.insert_before(&get(&b[b_start], Directive::Insert), reference.as_ref());
			} else {
				parent.replace_child(&get(&b[b_start], Directive::Insert), &get(&a[a_start], Directive::Remove));
			}
			a_start += 1;
			b_start += 1;
		}
		// Ends swapped.
		else if a[a_start] == b[b_end - 1] && b[b_start] == a[a_end - 1] {
			stats.reverse_swaps += 1;
			a_end -= 1;
			let node = get(&a[a_end], Directive::Remove).next_sibling();
			// Gather first: for adjacent entries the reference would otherwise be a node of the moved entry.
			let moved = get(&b[b_start], Directive::Insert);
			let reference = get(&a[a_start], Directive::Remove).next_sibling();
			a_start += 1;
			parent.insert_before(&moved, reference.as_ref());
			b_start += 1;
			b_end -= 1;
			parent.insert_before(&get(&b[b_end], Directive::Insert), node.as_ref());
			// The entry now at `a[a_end]` is in place, which makes it match the tail fast path if it's reached again.
			a[a_end] = b[b_end].clone();
		}
		// Index based fallback.
		else {
			let map = map.get_or_insert_with(|| {
				stats.index_built = true;
				trace!("Indexing {} target entries.", b_end - b_start);
				(b_start..b_end).map(|i| (b[i].clone(), i)).collect()
			});

			match map.get(&a[a_start]).copied() {
				Some(index) => {
					if b_start < index && index < b_end {
						let mut i = a_start;
						let mut sequence = 1;
						while {
							i += 1;
							i < a_end
						} {
							match map.get(&a[i]) {
								Some(&next) if next == index + sequence => sequence += 1,
								_ => break,
							}
						}

						// Prepending the difference is worth it if it brings the following run back onto the head fast path.
						if sequence > index - b_start {
							let node = get(&a[a_start], Directive::First);
							while b_start < index {
								parent.insert_before(&get(&b[b_start], Directive::Insert), Some(&node));
								b_start += 1;
							}
						} else {
							parent.replace_child(&get(&b[b_start], Directive::Insert), &get(&a[a_start], Directive::Remove));
							a_start += 1;
							b_start += 1;
						}
					} else {
						// Already placed.
						a_start += 1;
					}
				}
				None => {
					parent.remove_child(&get(&a[a_start], Directive::Remove));
					a_start += 1;
				}
			}
		}
	}

	(b, stats)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		native::{mutation_count, Node},
		value::TemplateKind,
		wire::Wire,
	};

	fn container_with(items: &[&str]) -> (Node, Vec<Node>) {
		let container = Node::element("ul");
		let nodes: Vec<Node> = items.iter().map(|item| Node::text(item)).collect();
		for node in &nodes {
			container.append_child(node);
		}
		(container, nodes)
	}

	fn text_of(container: &Node) -> String {
		container.text_content()
	}

	fn identity(node: &Node, _: Directive) -> Node {
		node.clone()
	}

	#[test]
	fn identical_lists_touch_nothing() {
		let (container, nodes) = container_with(&["1", "2", "3", "4", "5"]);
		let before = mutation_count();
		let (result, stats) = reconcile_with_stats(&container, nodes.clone(), nodes.clone(), identity, None);
		assert_eq!(mutation_count(), before);
		assert_eq!(result, nodes);
		assert!(!stats.index_built);
	}

	#[test]
	fn reverse_uses_the_swap_path() {
		let (container, nodes) = container_with(&["1", "2", "3", "4", "5"]);
		let reversed: Vec<Node> = nodes.iter().rev().cloned().collect();
		let (result, stats) = reconcile_with_stats(&container, nodes, reversed.clone(), identity, None);
		assert_eq!(text_of(&container), "54321");
		assert_eq!(result, reversed);
		assert!(!stats.index_built);
		assert_eq!(stats.reverse_swaps, 2);
	}

	#[test]
	fn appends_after_existing_children() {
		let (container, nodes) = container_with(&["1", "2", "3"]);
		let mut target = nodes.clone();
		target.push(Node::text("4"));
		target.push(Node::text("5"));
		let before = mutation_count();
		reconcile(&container, nodes.clone(), target.clone(), identity, None);
		assert_eq!(mutation_count() - before, 2);
		assert_eq!(text_of(&container), "12345");
		for (i, node) in nodes.iter().enumerate() {
			assert_eq!(&container.child_at(i).unwrap(), node);
		}
	}

	#[test]
	fn appends_land_before_the_anchor() {
		let container = Node::element("div");
		let anchor = Node::comment("anchor");
		container.append_child(&anchor);
		let target = vec![Node::text("a"), Node::text("b")];
		reconcile(&container, vec![], target, identity, Some(&anchor));
		assert_eq!(container.inner_html(), "ab<!--anchor-->");
	}

	#[test]
	fn removes_from_the_middle() {
		let (container, nodes) = container_with(&["1", "2", "3"]);
		let target = vec![nodes[0].clone(), nodes[2].clone()];
		let before = mutation_count();
		reconcile(&container, nodes.clone(), target, identity, None);
		assert_eq!(mutation_count() - before, 1);
		assert_eq!(text_of(&container), "13");
		assert!(nodes[1].parent_node().is_none());
	}

	#[test]
	fn single_replacement() {
		let (container, nodes) = container_with(&["1", "2", "3"]);
		let target = vec![nodes[0].clone(), Node::text("x"), nodes[2].clone()];
		reconcile(&container, nodes, target, identity, None);
		assert_eq!(text_of(&container), "1x3");
	}

	#[test]
	fn prepends_before_a_long_run() {
		let (container, nodes) = container_with(&["1", "2", "3", "4"]);
		let target = vec![Node::text("7"), nodes[0].clone(), nodes[1].clone(), nodes[2].clone(), Node::text("6")];
		let (_, stats) = reconcile_with_stats(&container, nodes.clone(), target, identity, None);
		assert_eq!(text_of(&container), "71236");
		assert!(stats.index_built);
		assert_eq!(&container.child_at(1).unwrap(), &nodes[0]);
	}

	#[test]
	fn scrambled_lists_end_up_in_order() {
		let (container, nodes) = container_with(&["a", "b", "c", "d", "e", "f"]);
		let order = [3, 0, 5, 1, 4];
		let mut target: Vec<Node> = order.iter().map(|&i| nodes[i].clone()).collect();
		target.insert(2, Node::text("x"));
		reconcile(&container, nodes, target.clone(), identity, None);
		for (i, node) in target.iter().enumerate() {
			assert_eq!(&container.child_at(i).unwrap(), node);
		}
		assert_eq!(container.child_count(), target.len());
	}

	#[test]
	fn clears_everything() {
		let (container, nodes) = container_with(&["1", "2", "3"]);
		reconcile(&container, nodes, vec![], identity, None);
		assert_eq!(container.child_count(), 0);
	}

	fn group(label: &str) -> Wire<Node> {
		Wire::from_fragment(Node::parse_markup(&format!("<dt>{}</dt><dd>-</dd>", label), TemplateKind::Html))
	}

	fn container_with_groups(labels: &[&str]) -> (Node, Vec<Wire<Node>>) {
		let container = Node::element("dl");
		let wires: Vec<Wire<Node>> = labels.iter().map(|label| group(label)).collect();
		for wire in &wires {
			container.append_child(&wire.materialize());
		}
		(container, wires)
	}

	fn reconcile_groups(container: &Node, a: Vec<Wire<Node>>, b: Vec<Wire<Node>>) -> DiffStats {
		reconcile_with_stats(container, a, b, |wire: &Wire<Node>, directive| wire.get(directive), None).1
	}

	#[test]
	fn adjacent_groups_swap() {
		let (container, wires) = container_with_groups(&["A", "B"]);
		let swapped = vec![wires[1].clone(), wires[0].clone()];
		let stats = reconcile_groups(&container, wires, swapped);
		assert_eq!(stats.reverse_swaps, 1);
		assert_eq!(text_of(&container), "B-A-");
		assert_eq!(container.child_count(), 4);
	}

	#[test]
	fn reversed_groups() {
		let (container, wires) = container_with_groups(&["A", "B", "C"]);
		let reversed: Vec<Wire<Node>> = wires.iter().rev().cloned().collect();
		let stats = reconcile_groups(&container, wires, reversed);
		assert!(!stats.index_built);
		assert_eq!(text_of(&container), "C-B-A-");
		assert_eq!(container.child_count(), 6);
	}

	#[test]
	fn scrambled_groups() {
		let (container, wires) = container_with_groups(&["A", "B", "C", "D"]);
		let target: Vec<Wire<Node>> = [2, 0, 3, 1].iter().map(|&i| wires[i].clone()).collect();
		let stats = reconcile_groups(&container, wires, target);
		assert!(stats.index_built);
		assert_eq!(text_of(&container), "C-A-D-B-");
		assert_eq!(container.child_count(), 8);
	}

	#[test]
	fn replaced_group() {
		let (container, wires) = container_with_groups(&["A", "B", "C"]);
		let replaced = wires[1].clone();
		let target = vec![wires[0].clone(), group("X"), wires[2].clone()];
		reconcile_groups(&container, wires, target);
		assert_eq!(text_of(&container), "A-X-C-");
		assert_eq!(container.child_count(), 6);
		match replaced {
			Wire::Group(group) => assert!(group.nodes().iter().all(|node| node.parent_node().as_ref() != Some(&container))),
			Wire::Node(_) => panic!("expected a group"),
		}
	}
}
