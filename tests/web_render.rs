#![cfg(all(target_arch = "wasm32", feature = "web"))]

use std::{cell::Cell, rc::Rc, sync::Once};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlBodyElement, HtmlElement};
use wired_dom::{
	html, render, svg,
	web::{Listener, WebNode},
	DomNode, Value,
};

wasm_bindgen_test_configure!(run_in_browser);

static LOG_INITIALIZED: Once = Once::new();

fn container() -> WebNode {
	LOG_INITIALIZED.call_once(tracing_wasm::set_as_global_default);

	let document = window().unwrap().document().unwrap();
	let body = document.body().unwrap().dyn_into::<HtmlBodyElement>().unwrap();
	let container = document.create_element("div").unwrap();
	body.append_child(&container).unwrap();
	container.into()
}

#[wasm_bindgen_test]
fn click() {
	let container = container();
	let click_count = Rc::new(Cell::new(0));
	let listener = {
		let click_count = click_count.clone();
		Listener::new(move |event| {
			assert_eq!(event.type_(), "click");
			click_count.set(click_count.get() + 1)
		})
	};

	let button = |handler: Value<WebNode>| render(&container, html!(["<button onclick=", ">+</button>"], handler)).unwrap();

	button(Value::listener(listener.clone()));
	let button_element: HtmlElement = container.first_child().unwrap().into_node().dyn_into().unwrap();
	assert_eq!(click_count.get(), 0);
	button_element.click();
	assert_eq!(click_count.get(), 1);

	button(Value::Null);
	assert_eq!(container.first_child().unwrap().into_node(), web_sys::Node::from(button_element.clone()));
	button_element.click();
	assert_eq!(click_count.get(), 1);
}

#[wasm_bindgen_test]
fn text_updates_keep_the_element() {
	let container = container();
	let greet = |name: &'static str| render(&container, html!(["<p>Hello, ", "!</p>"], name)).unwrap();

	greet("World");
	let p = container.first_child().unwrap();
	greet("again");
	assert_eq!(container.first_child(), Some(p.clone()));
	assert_eq!(p.text_content(), "Hello, again!");
}

#[wasm_bindgen_test]
fn attributes_toggle_on_null() {
	let container = container();
	let link = |href: Option<&'static str>| render(&container, html!(["<a href=", ">x</a>"], href)).unwrap();

	link(Some("#top"));
	let a = container.first_child().unwrap();
	assert_eq!(a.get_attribute("href").as_deref(), Some("#top"));
	link(None);
	assert!(!a.has_attribute("href"));
	link(Some("#bottom"));
	assert_eq!(a.get_attribute("href").as_deref(), Some("#bottom"));
}

#[wasm_bindgen_test]
fn lists() {
	let container = container();
	let list = |items: &[&'static str]| {
		let items: Vec<Value<WebNode>> = items.iter().map(|item| html!(["<li>", "</li>"], *item).into()).collect();
		render(&container, html!(["<ul>", "</ul>"], items)).unwrap();
		container.first_child().unwrap().text_content()
	};

	assert_eq!(list(&["a", "b", "c"]), "abc");
	assert_eq!(list(&["a", "b"]), "ab");
	assert_eq!(list(&[]), "");
	assert_eq!(list(&["x", "y", "z"]), "xyz");
}

#[wasm_bindgen_test]
fn svg_keeps_its_namespace() {
	let container = container();
	render(&container, html!([r#"<svg viewBox="0 0 10 10">"#, "</svg>"], svg!(["<circle r=", "></circle>"], 5))).unwrap();
	let circle = container.first_child().unwrap().first_child().unwrap();
	let element: &web_sys::Element = circle.node().dyn_ref().unwrap();
	assert_eq!(element.namespace_uri().as_deref(), Some("http://www.w3.org/2000/svg"));
	assert_eq!(element.get_attribute("r").as_deref(), Some("5"));
}
