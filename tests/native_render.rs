#![allow(clippy::non_ascii_literal)]

use std::{cell::Cell, rc::Rc};
use wired_dom::{
	compile::compile,
	html,
	native::{mutation_count, Listener, Node},
	node, render, svg, DomNode, Error, Hole, NodeRef, Template, TemplateKind, Value,
};

fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).with_test_writer().try_init();
}

fn paragraph(text: &'static str) -> Hole<Node> {
	html!(["<p>", "</p>"], text)
}

#[test]
fn static_templates_keep_their_root() {
	init_tracing();
	let container = Node::element("div");
	let render_static = || render(&container, html!(["<header><h1>Title</h1></header>"])).unwrap();

	render_static();
	let header = container.first_child().unwrap();
	let before = mutation_count();
	render_static();
	assert_eq!(mutation_count(), before);
	assert_eq!(container.first_child(), Some(header));
	assert_eq!(container.inner_html(), "<header><h1>Title</h1></header>");
}

#[test]
fn text_updates_keep_the_element() {
	init_tracing();
	let container = Node::element("div");
	render(&container, paragraph("hi")).unwrap();
	let p = container.first_child().unwrap();
	let text = p.first_child().unwrap();
	assert_eq!(container.inner_html(), "<p>hi<!--isµ0--></p>");

	render(&container, paragraph("there")).unwrap();
	assert_eq!(container.first_child(), Some(p.clone()));
	assert_eq!(p.first_child(), Some(text));
	assert_eq!(container.inner_html(), "<p>there<!--isµ0--></p>");
}

#[test]
fn same_static_same_compilation() {
	static TEMPLATE: Template = Template::new(&["<p>", "</p>"]);
	static LOOKALIKE: Template = Template::new(&["<p>", "</p>"]);
	let first = compile::<Node>(TemplateKind::Html, &TEMPLATE).unwrap();
	let second = compile::<Node>(TemplateKind::Html, &TEMPLATE).unwrap();
	let other = compile::<Node>(TemplateKind::Html, &LOOKALIKE).unwrap();
	assert!(Rc::ptr_eq(&first, &second));
	assert!(!Rc::ptr_eq(&first, &other));
	assert!(!Template::same(&TEMPLATE, &LOOKALIKE));
}

#[test]
fn attributes_toggle_on_null() {
	init_tracing();
	let container = Node::element("div");
	let link = |class: Option<&'static str>| render(&container, html!(["<a class=", ">x</a>"], class)).unwrap();

	link(Some("on"));
	assert_eq!(container.inner_html(), r#"<a class="on">x</a>"#);
	link(None);
	assert_eq!(container.inner_html(), "<a>x</a>");
	link(Some("on"));
	assert_eq!(container.inner_html(), r#"<a class="on">x</a>"#);

	let before = mutation_count();
	link(Some("on"));
	assert_eq!(mutation_count(), before);
}

#[test]
fn shrinking_lists_prune_their_slots() {
	init_tracing();
	let container = Node::element("div");
	let list = |count: usize| {
		let items: Vec<Value<Node>> = (0..count).map(|i| html!(["<li>", "</li>"], i).into()).collect();
		render(&container, html!(["<ul>", "</ul>"], items)).unwrap();
		let ul = container.first_child().unwrap();
		(0..count).map(|i| ul.child_at(i).unwrap()).collect::<Vec<_>>()
	};

	let five = list(5);
	assert_eq!(container.first_child().unwrap().text_content(), "01234");
	let three = list(3);
	assert_eq!(&three[..], &five[..3]);
	assert_eq!(container.first_child().unwrap().child_count(), 4);

	let five_again = list(5);
	assert_eq!(&five_again[..3], &five[..3]);
	assert_ne!(five_again[3], five[3]);
	assert_ne!(five_again[4], five[4]);
	assert_eq!(container.first_child().unwrap().text_content(), "01234");
}

#[test]
fn usage_errors_leave_the_container_alone() {
	init_tracing();
	let container = Node::element("div");
	render(&container, paragraph("kept")).unwrap();
	let before = mutation_count();

	static TWO_HOLES: Template = Template::new(&["<b>", "</b><i>", "</i>"]);
	let short = Hole::<Node>::new(TemplateKind::Html, &TWO_HOLES, vec!["one".into()]);
	assert_eq!(render(&container, short), Err(Error::Usage { expected: 2, found: 1 }));
	assert_eq!(mutation_count(), before);
	assert_eq!(container.inner_html(), "<p>kept<!--isµ0--></p>");

	// Also when the bad invocation is nested in one that would have been fine.
	let nested = html!(["<section>", "</section>"], vec![Value::from(Hole::new(TemplateKind::Html, &TWO_HOLES, vec![]))]);
	assert_eq!(render(&container, nested), Err(Error::Usage { expected: 2, found: 0 }));
	assert_eq!(mutation_count(), before);
}

#[test]
fn switching_templates_remounts() {
	init_tracing();
	let container = Node::element("div");
	let view = |logged_in: bool| {
		let hole = if logged_in { html!(["<button>Log out</button>"]) } else { html!(["<form>", "</form>"], "Log in") };
		render(&container, hole).unwrap();
		container.first_child().unwrap()
	};

	let form = view(false);
	let button = view(true);
	assert_ne!(form, button);
	assert_eq!(container.inner_html(), "<button>Log out</button>");
	let form_again = view(false);
	assert_ne!(form_again, form);
	assert_eq!(container.inner_html(), "<form>Log in<!--isµ0--></form>");
}

#[test]
fn event_listeners_follow_the_value() {
	init_tracing();
	let container = Node::element("div");
	let clicks = Rc::new(Cell::new(0));
	let listener = {
		let clicks = clicks.clone();
		Listener::new(move |event| {
			assert_eq!(event.event_type(), "click");
			clicks.set(clicks.get() + 1)
		})
	};
	let button = |handler: Value<Node>| {
		render(&container, html!(["<button onclick=", ">+</button>"], handler)).unwrap();
		container.first_child().unwrap()
	};

	let element = button(Value::listener(listener.clone()));
	assert_eq!(element.dispatch("click"), 1);
	button(Value::listener(listener.clone()));
	assert_eq!(element.listener_count("click"), 1);
	assert_eq!(element.dispatch("click"), 1);
	assert_eq!(clicks.get(), 2);

	button(Value::listener(Listener::new(|_| ())));
	assert_eq!(element.listener_count("click"), 1);
	button(Value::opaque(1_u8));
	assert_eq!(element.listener_count("click"), 1);
	button(Value::Null);
	assert_eq!(element.listener_count("click"), 0);
	assert_eq!(clicks.get(), 2);
	assert!(!element.has_attribute("onclick"));
}

#[test]
fn refs_and_properties() {
	init_tracing();
	let container = Node::element("div");
	let input_ref = NodeRef::new();
	render(&container, html!(["<input ref=", " .value=", " type=text>"], &input_ref, "typed")).unwrap();

	let input = input_ref.current().unwrap();
	assert_eq!(container.first_child(), Some(input.clone()));
	assert!(input.property("value").unwrap().strict_eq(&"typed".into()));
	assert_eq!(container.inner_html(), r#"<input type="text">"#);
}

#[test]
fn text_holes_in_textareas() {
	init_tracing();
	let container = Node::element("div");
	let editor = |text: Value<Node>| render(&container, html!(["<textarea>", "</textarea>"], text)).unwrap();

	editor("<b>not bold</b>".into());
	let textarea = container.first_child().unwrap();
	assert_eq!(textarea.text_content(), "<b>not bold</b>");
	assert_eq!(textarea.child_count(), 1);
	editor(Value::Null);
	assert_eq!(textarea.text_content(), "");
	editor(42.into());
	assert_eq!(container.inner_html(), "<textarea>42</textarea>");
}

#[test]
fn multi_node_templates_stay_together() {
	init_tracing();
	let container = Node::element("ul");
	let rows = |order: &[&'static str]| {
		let rows: Vec<Value<Node>> = order.iter().map(|label| html!(["<dt>", "</dt><dd>-</dd>"], *label).into()).collect();
		render(&container, html!(["<dl>", "</dl>"], rows)).unwrap();
		container.first_child().unwrap().text_content()
	};

	assert_eq!(rows(&["a", "b", "c"]), "a-b-c-");
	assert_eq!(rows(&["a", "b", "c"]), "a-b-c-");
	assert_eq!(rows(&["a", "c"]), "a-c-");
	assert_eq!(rows(&["a", "c", "d"]), "a-c-d-");
}

#[test]
fn multi_node_wires_reorder() {
	init_tracing();
	let container = Node::element("div");
	let entry = |label: &'static str| node(html!(["<dt>", "</dt><dd>-</dd>"], label)).unwrap();
	let entries = [entry("A"), entry("B"), entry("C")];
	let show = |order: &[usize]| {
		let list: Vec<Value<Node>> = order.iter().map(|&i| entries[i].clone().into()).collect();
		render(&container, html!(["<dl>", "</dl>"], list)).unwrap();
		container.first_child().unwrap().text_content()
	};

	assert_eq!(show(&[0, 1]), "A-B-");
	assert_eq!(show(&[1, 0]), "B-A-");
	assert_eq!(show(&[0, 1, 2]), "A-B-C-");
	assert_eq!(show(&[2, 1, 0]), "C-B-A-");
	assert_eq!(show(&[1, 2, 0]), "B-C-A-");
	assert_eq!(show(&[2]), "C-");
	assert_eq!(container.first_child().unwrap().child_count(), 3);
}

#[test]
fn keyed_reorders_move_nodes() {
	init_tracing();
	let container = Node::element("div");
	let items: Vec<Node> = ["a", "b", "c", "d"].iter().map(|label| Node::text(label)).collect();
	let show = |order: &[usize]| {
		let list: Vec<Value<Node>> = order.iter().map(|&i| Value::node(items[i].clone())).collect();
		render(&container, html!(["<div>", "</div>"], list)).unwrap();
		container.first_child().unwrap().text_content()
	};

	assert_eq!(show(&[0, 1, 2, 3]), "abcd");
	assert_eq!(show(&[3, 2, 1, 0]), "dcba");
	assert_eq!(show(&[1, 3]), "bd");
	assert_eq!(show(&[]), "");
	assert_eq!(show(&[2, 0]), "ca");
	assert_eq!(container.first_child().unwrap().first_child(), Some(items[2].clone()));
}

#[test]
fn primitive_lists_join() {
	init_tracing();
	let container = Node::element("div");
	render(&container, html!(["<span>", "</span>"], vec![1, 2, 3])).unwrap();
	assert_eq!(container.inner_html(), "<span>1,2,3<!--isµ0--></span>");
}

#[test]
fn svg_content_lands_in_the_svg_namespace() {
	init_tracing();
	let container = Node::element("div");
	let icon = html!([r#"<svg viewBox="0 0 10 10">"#, "</svg>"], svg!(["<circle r=", "/>"], 5));
	render(&container, icon).unwrap();
	let svg = container.first_child().unwrap();
	assert_eq!(svg.get_attribute("viewBox").as_deref(), Some("0 0 10 10"));
	let circle = svg.first_child().unwrap();
	assert_eq!(circle.namespace(), wired_dom::native::Namespace::Svg);
	assert_eq!(circle.get_attribute("r").as_deref(), Some("5"));
}

#[test]
fn one_shot_nodes() {
	init_tracing();
	let wire = node(html!(["<em>", "</em>"], "loose")).unwrap();
	let em: Node = wire.materialize();
	assert_eq!(em.outer_html(), "<em>loose<!--isµ0--></em>");
	assert_eq!(wire.materialize(), em);
}

#[test]
fn non_renderable_values() {
	let container = Node::element("div");
	assert_eq!(render(&container, "text"), Err(Error::NotRenderable("string")));
	assert_eq!(container.child_count(), 0);
}
