use std::sync::Arc;

use ferry_linker::{LinkError, LinkerConfig, Stage};
use ferry_primitives::{DomainId, Fault, Instance, MethodDef, TypeDef, TypeRef, Value};
use ferry_registry::BindingRegistry;
use pretty_assertions::assert_eq;

use crate::common::{call, world};

/// `api.Shape` with `area()`, backed by a provider square of side 3.
fn shapes(implement_area: bool) -> crate::common::World {
	let mut w = world();
	let api = w.api;
	w.define(
		TypeDef::interface("api.Shape", api)
			.method(MethodDef::new("area", [], TypeRef::DOUBLE))
			.method(MethodDef::new("sides", [], TypeRef::INT)),
	);
	let mut provider = TypeDef::class("impl.ShapeImpl", DomainId::ROOT)
		.method(MethodDef::native("sides", [], TypeRef::INT, |_| Ok(Value::Int(4))))
		.factory(|_| Ok(Instance::value("impl.ShapeImpl", 3.0_f64)));
	if implement_area {
		provider = provider.method(MethodDef::native("area", [], TypeRef::DOUBLE, |args| {
			let side = args[0].state::<f64>().copied().unwrap_or_default();
			Ok(Value::Double(side * side))
		}));
	}
	w.define(provider);
	w
}

#[test]
fn test_full_service() {
	let linker = shapes(true).link("VERSION 1.4\nTYPE api.Shape impl.ShapeImpl SERVICE");
	let shape = linker.get_service("api.Shape").unwrap().expect("service");
	assert_eq!(call(&linker, &shape, "area", &[]).unwrap().as_double(), Some(9.0));
	assert_eq!(call(&linker, &shape, "sides", &[]).unwrap().as_int(), Some(4));
	assert!(linker.is_supported("api.Shape").unwrap());

	let deps = linker.dependencies("api.Shape");
	assert_eq!(deps.len(), 1);
	assert!(deps.contains("api.Shape"));
	assert_eq!(linker.version(), Some("1.4"));

	let again = linker.get_service("api.Shape").unwrap().unwrap();
	assert!(Arc::ptr_eq(&shape, &again));
	assert_eq!(linker.proxy("api.Shape").unwrap().stage(), Stage::Instantiated);
}

#[test]
fn test_partial_service_is_returned_but_unsupported() {
	let linker = shapes(false).link("TYPE api.Shape impl.ShapeImpl SERVICE");
	let shape = linker.get_service("api.Shape").unwrap().expect("partial service still returned");
	assert_eq!(
		call(&linker, &shape, "area", &[]),
		Err(Fault::Unimplemented {
			interface: "api.Shape".into(),
			method: "area".into(),
		})
	);
	assert_eq!(call(&linker, &shape, "sides", &[]).unwrap().as_int(), Some(4));

	let proxy = linker.proxy("api.Shape").unwrap();
	assert!(!proxy.all_methods_implemented());
	assert!(!proxy.is_supported());
	assert!(!proxy.is_supported());
	assert!(linker.get_supported_service("api.Shape").unwrap().is_none());
}

#[test]
fn test_unknown_and_invalid_lookups() {
	let linker = shapes(true).link(
		"TYPE api.Shape impl.ShapeImpl SERVICE
		 TYPE api.Ghost impl.ShapeImpl SERVICE",
	);
	assert!(linker.get_service("api.Nothing").unwrap().is_none());
	assert!(linker.get_service("api.Ghost").unwrap().is_none());
	assert!(linker.proxy("api.Ghost").unwrap().is_invalid());
	assert!(!linker.is_supported("api.Ghost").unwrap());
}

#[test]
fn test_internal_services_stay_internal() {
	let linker = shapes(true).link("TYPE api.Shape impl.ShapeImpl INTERNAL_SERVICE");
	assert!(linker.get_service("api.Shape").unwrap().is_none());
	assert!(linker.get_service_with_extensions("api.Shape", &[]).unwrap().is_none());
	let shape = linker.internal_service("api.Shape").unwrap().expect("internal lookup");
	assert_eq!(call(&linker, &shape, "area", &[]).unwrap().as_double(), Some(9.0));
}

fn refusing(fault: Fault) -> crate::common::World {
	let mut w = shapes(true);
	w.define(
		TypeDef::class("impl.Refusing", DomainId::ROOT)
			.method(MethodDef::static_native("create", [], TypeRef::class("impl.Refusing"), move |_| Err(fault.clone()))),
	);
	w
}

#[test]
fn test_service_not_available_yields_none() {
	let linker = refusing(Fault::service_not_available("no display"))
		.link("TYPE api.Shape impl.Refusing SERVICE");
	assert!(linker.get_service("api.Shape").unwrap().is_none());
	assert!(linker.get_service("api.Shape").unwrap().is_none());
}

#[test]
fn test_other_construction_faults_are_errors() {
	let linker = refusing(Fault::raised("boom")).link("TYPE api.Shape impl.Refusing SERVICE");
	let Err(err) = linker.get_service("api.Shape") else {
		panic!("construction fault should surface as an error");
	};
	assert!(matches!(err, LinkError::Instantiation { ref fault, .. } if *fault == Fault::raised("boom")));
}

#[test]
fn test_create_function_wins_over_factory() {
	let mut w = shapes(true);
	w.define(
		TypeDef::class("impl.Sized", DomainId::ROOT)
			.method(MethodDef::native("area", [], TypeRef::DOUBLE, |args| {
				Ok(Value::Double(*args[0].state::<f64>().unwrap_or(&0.0)))
			}))
			.method(MethodDef::native("sides", [], TypeRef::INT, |_| Ok(Value::Int(0))))
			.method(MethodDef::static_native("create", [], TypeRef::class("impl.Sized"), |_| {
				Ok(Instance::value("impl.Sized", 42.0_f64))
			}))
			.factory(|_| Ok(Instance::value("impl.Sized", 1.0_f64))),
	);
	let linker = w.link("TYPE api.Shape impl.Sized SERVICE");
	let shape = linker.get_service("api.Shape").unwrap().unwrap();
	assert_eq!(call(&linker, &shape, "area", &[]).unwrap().as_double(), Some(42.0));
}

fn geometry() -> TypeDef {
	TypeDef::class("impl.Geometry", DomainId::ROOT)
		.method(MethodDef::static_native("area", [], TypeRef::DOUBLE, |_| Ok(Value::Double(-1.0))))
		.method(MethodDef::static_native("sides", [], TypeRef::INT, |_| Ok(Value::Int(3))))
}

#[test]
fn test_static_only_service() {
	let mut w = shapes(false);
	w.define(geometry());
	let linker = w.link(
		"TYPE api.Shape - SERVICE
		 STATIC impl.Geometry area ()double api.Shape area
		 STATIC impl.Geometry sides ()int api.Shape sides",
	);
	let shape = linker.get_service("api.Shape").unwrap().expect("static-only service");
	assert_eq!(call(&linker, &shape, "area", &[]).unwrap().as_double(), Some(-1.0));
	assert!(linker.is_supported("api.Shape").unwrap());
	assert_eq!(linker.proxy("api.Shape").unwrap().target(), None);
}

#[test]
fn test_instance_delegation_wins_over_static_override() {
	let mut w = shapes(true);
	w.define(geometry());
	let mut registry = BindingRegistry::from_text("TYPE api.Shape impl.ShapeImpl SERVICE").unwrap();
	registry
		.add_static_override("api.Shape", "area", "impl.Geometry", "area")
		.unwrap();
	registry
		.add_static_override("api.Shape", "sides", "impl.Geometry", "sides")
		.unwrap();
	let linker = w.link_with(registry, LinkerConfig::default());
	let shape = linker.get_service("api.Shape").unwrap().unwrap();
	assert_eq!(call(&linker, &shape, "area", &[]).unwrap().as_double(), Some(9.0));
	assert_eq!(call(&linker, &shape, "sides", &[]).unwrap().as_int(), Some(4));
}

#[test]
fn test_static_override_fills_gap() {
	let mut w = shapes(false);
	w.define(geometry());
	let mut registry = BindingRegistry::from_text("TYPE api.Shape impl.ShapeImpl SERVICE").unwrap();
	registry
		.add_static_override("api.Shape", "area", "impl.Geometry", "area")
		.unwrap();
	let linker = w.link_with(registry, LinkerConfig::default());
	assert!(linker.is_supported("api.Shape").unwrap());
	let shape = linker.get_supported_service("api.Shape").unwrap().unwrap();
	assert_eq!(call(&linker, &shape, "area", &[]).unwrap().as_double(), Some(-1.0));
	assert_eq!(call(&linker, &shape, "sides", &[]).unwrap().as_int(), Some(4));
}

#[test]
fn test_stderr_subscriber_installs_once() {
	let _ = ferry_linker::diagnostics::install_stderr_subscriber(true);
	assert!(!ferry_linker::diagnostics::install_stderr_subscriber(true));
}
