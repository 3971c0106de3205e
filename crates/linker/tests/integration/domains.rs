use std::sync::Arc;

use ferry_linker::{Interpreter, LinkError, Linker, LinkerConfig, Linkage, MethodBody};
use ferry_primitives::{DomainId, Instance, Markers, MethodDef, TypeDef, TypeRef, Value};
use ferry_registry::{BindingRegistry, RegistryError};
use pretty_assertions::assert_eq;

use crate::common::{World, call, world};

fn clock_world() -> World {
	let mut w = world();
	let (api, desktop) = (w.api, w.desktop);
	w.define(TypeDef::interface("api.Clock", api).method(MethodDef::new("now", [], TypeRef::LONG)))
		.define(
			TypeDef::class("desk.ClockImpl", desktop)
				.method(MethodDef::native("now", [], TypeRef::LONG, |_| Ok(Value::Int(1234))))
				.factory(|_| Ok(Instance::value("desk.ClockImpl", ()))),
		);
	w
}

fn desktop_registry(desktop: DomainId) -> BindingRegistry {
	let mut registry = BindingRegistry::new();
	registry
		.register_module(desktop)
		.unwrap()
		.service("api.Clock", &["desk.ClockImpl"])
		.unwrap();
	registry
}

#[test]
fn test_sibling_domain_calls_are_bridged() {
	let w = clock_world();
	let registry = desktop_registry(w.desktop);
	let engine = Arc::new(Interpreter::new());
	let linker = Linker::builder(Arc::new(w.universe), Arc::new(registry))
		.domain(w.api)
		.engine(engine.clone())
		.build();

	let clock = linker.get_service("api.Clock").unwrap().expect("clock service");
	assert!(engine.bridged_slots() >= 1);
	assert_eq!(call(&linker, &clock, "now", &[]).unwrap().as_int(), Some(1234));

	let desc = linker.proxy("api.Clock").unwrap().description().unwrap();
	assert_eq!(desc.domain, w.api);
	let now = desc.method("now", 0).unwrap();
	assert!(matches!(
		now.body,
		MethodBody::Delegate {
			linkage: Linkage::Bridged(_),
			..
		}
	));
}

#[test]
fn test_unrelated_domains_cannot_share_a_registry() {
	let w = clock_world();
	let registry = Arc::new(BindingRegistry::from_text("TYPE api.Clock desk.ClockImpl SERVICE").unwrap());
	let universe = Arc::new(w.universe);
	let from_api = Linker::builder(universe.clone(), registry.clone()).domain(w.api).build();
	let from_desktop = Linker::builder(universe, registry).domain(w.desktop).build();

	assert!(from_api.get_service("api.Clock").unwrap().is_none());
	let Err(err) = from_desktop.get_service("api.Clock") else {
		panic!("unrelated domain should be rejected");
	};
	assert!(matches!(
		err,
		LinkError::Registry(RegistryError::IncompatibleDomain { .. })
	));
}

#[test]
fn test_root_linker_widens_to_descendant() {
	let w = clock_world();
	let registry = Arc::new(desktop_registry(w.desktop));
	let universe = Arc::new(w.universe);
	let root = Linker::builder(universe.clone(), registry.clone()).build();
	assert!(root.get_service("api.Nothing").unwrap().is_none());
	let api = Linker::builder(universe, registry).domain(w.api).build();
	assert!(api.get_service("api.Clock").unwrap().is_some());
}

fn marked_world(markers: Markers) -> World {
	let mut w = world();
	let api = w.api;
	w.universe.domains_mut().set_requires_markers(api, true);
	w.define(
		TypeDef::interface("api.Clock", api)
			.markers(markers)
			.method(MethodDef::new("now", [], TypeRef::LONG)),
	)
	.define(
		TypeDef::class("impl.ClockImpl", DomainId::ROOT)
			.method(MethodDef::native("now", [], TypeRef::LONG, |_| Ok(Value::Int(7))))
			.factory(|_| Ok(Instance::value("impl.ClockImpl", ()))),
	);
	w
}

#[test]
fn test_marked_domains_require_markers() {
	let records = "TYPE api.Clock impl.ClockImpl SERVICE";
	let unmarked = marked_world(Markers::PROVIDED).link(records);
	assert!(unmarked.get_service("api.Clock").unwrap().is_none());
	assert!(unmarked.proxy("api.Clock").unwrap().is_invalid());

	let marked = marked_world(Markers::PROVIDED | Markers::SERVICE).link_with(
		BindingRegistry::from_text(records).unwrap(),
		LinkerConfig::default(),
	);
	let clock = marked.get_service("api.Clock").unwrap().unwrap();
	assert_eq!(call(&marked, &clock, "now", &[]).unwrap().as_int(), Some(7));
}
