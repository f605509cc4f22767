//! Mounting: the entry points that turn values into attached (or attachable) content.

use crate::{
	cache::{self, RenderInfo},
	dom::DomNode,
	error::{Error, Result},
	value::{Hole, Value},
	wire::Wire,
};
use core::{
	any::{Any, TypeId},
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::{instrument, trace};

/// Renders `value` into `container`, replacing its content only if the resulting root wire changed.
///
/// Template invocations ([`Hole`]s) are resolved against the cache owned by `container`,
/// so rendering the same template into the same container again only updates the holes whose values changed.
/// A [`Value::Node`] or [`Value::Wire`] is mounted as it is.
///
/// Returns `container`.
///
/// # Errors
///
/// [`Error::NotRenderable`] for other values, and otherwise see [`Error`].
/// The container is left untouched on error.
///
/// # Panics
///
/// Iff called re-entrantly for the same `container`, for example from an event handler that's invoked synchronously during the render.
#[instrument(skip(value))]
pub fn render<N: DomNode>(container: &N, value: impl Into<Value<N>>) -> Result<N> {
	let info = container_info(container);
	let mut info = info.borrow_mut();
	let wire = match value.into() {
		Value::Hole(hole) => cache::retrieve(&mut info, hole)?,
		Value::Node(node) => Wire::Node(node),
		Value::Wire(wire) => wire,
		other => return Err(Error::NotRenderable(other.shape())),
	};
	if info.wire.as_ref() == Some(&wire) {
		trace!("Same root wire, nothing to mount.");
	} else {
		trace!("Mounting new root wire.");
		container.set_text_content("");
		container.append_child(&wire.materialize());
		info.wire = Some(wire);
	}
	Ok(container.clone())
}

/// Like [`render`], but the value is produced by `what`, which is called exactly once before anything is rendered.
///
/// # Errors
///
/// See [`render`].
///
/// # Panics
///
/// See [`render`].
pub fn render_with<N: DomNode, V: Into<Value<N>>>(container: &N, what: impl FnOnce() -> V) -> Result<N> {
	render(container, what())
}

fn container_info<N: DomNode>(container: &N) -> Rc<RefCell<RenderInfo<N>>> {
	if let Some(info) = container.render_info().and_then(|info| info.downcast::<RefCell<RenderInfo<N>>>().ok()) {
		return info;
	}
	let info = Rc::new(RefCell::new(RenderInfo::new()));
	container.set_render_info(info.clone());
	info
}

/// Materializes `hole` once, with a cache of its own, and returns the resulting wire without mounting it.
///
/// # Errors
///
/// See [`Error`].
#[instrument]
pub fn node<N: DomNode>(hole: Hole<N>) -> Result<Wire<N>> {
	cache::retrieve(&mut RenderInfo::new(), hole)
}

/// A render cache that isn't attached to a container, see [`for_ref`].
pub struct Fixed<N: DomNode>(Rc<RefCell<RenderInfo<N>>>);
impl<N: DomNode> Fixed<N> {
	/// Resolves `hole` against this cache. The returned wire is stable as long as the template stays the same.
	///
	/// # Errors
	///
	/// See [`Error`].
	///
	/// # Panics
	///
	/// Iff called re-entrantly on the same cache.
	pub fn render(&self, hole: Hole<N>) -> Result<Wire<N>> {
		cache::retrieve(&mut self.0.borrow_mut(), hole)
	}
}
impl<N: DomNode> Clone for Fixed<N> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}
impl<N: DomNode> Debug for Fixed<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self.0.try_borrow() {
			Ok(info) => f.debug_tuple("Fixed").field(&*info).finish(),
			Err(_) => f.write_str("Fixed(<rendering>)"),
		}
	}
}

struct KeyedEntry {
	key: Weak<dyn Any>,
	infos: HashMap<(TypeId, String), Rc<dyn Any>>,
}

thread_local! {
	/// Caches by key address. Entries are only valid while their key is alive.
	static KEYED: RefCell<HashMap<usize, KeyedEntry>> = RefCell::new(HashMap::new());
}

/// Returns the render cache associated with `key` and `id`, creating it on first use.
///
/// This is for content that isn't rendered into a container directly, like a component's output that's
/// interpolated elsewhere: Rendering through the same [`Fixed`] again reuses the previous instance.
///
/// `key` is only referenced weakly. All caches associated with it are discarded by the next call after it's dropped.
pub fn for_ref<N: DomNode, K: Any>(key: &Rc<K>, id: &str) -> Fixed<N> {
	let address = Rc::as_ptr(key).cast::<()>() as usize;
	KEYED.with(|keyed| {
		let mut keyed = keyed.borrow_mut();
		let before = keyed.len();
		keyed.retain(|_, entry| entry.key.strong_count() > 0);
		if keyed.len() < before {
			trace!("Dropped {} stale keyed cache(s).", before - keyed.len());
		}

		// A dead key's allocation is kept while its `Weak` is stored, so after the sweep an entry at `address` belongs to `key`.
		let entry = keyed.entry(address).or_insert_with(|| KeyedEntry {
			key: Rc::downgrade(key) as Weak<dyn Any>,
			infos: HashMap::new(),
		});
		let info = entry
			.infos
			.entry((TypeId::of::<N>(), id.to_owned()))
			.or_insert_with(|| Rc::new(RefCell::new(RenderInfo::<N>::new())) as Rc<dyn Any>)
			.clone();
		match info.downcast::<RefCell<RenderInfo<N>>>() {
			Ok(info) => Fixed(info),
			Err(_) => unreachable!("Keyed caches are separated by node type."),
		}
	})
}
