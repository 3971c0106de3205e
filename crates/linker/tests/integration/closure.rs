use std::sync::Arc;

use ferry_linker::{LinkError, LinkerConfig};
use ferry_primitives::{DomainId, Instance, MethodDef, TypeDef, TypeRef};
use ferry_registry::BindingRegistry;
use pretty_assertions::assert_eq;

use crate::common::{World, label, labelled, string, world};

/// `api.A -> api.B -> api.C -> api.A`, each bound to an `impl` twin.
fn ring(complete: bool) -> ferry_linker::Linker {
	let mut w = world();
	let api = w.api;
	for (name, next) in [("A", "B"), ("B", "C"), ("C", "A")] {
		w.define(
			TypeDef::interface(format!("api.{name}"), api)
				.method(MethodDef::new("next", [], TypeRef::class(format!("api.{next}"))))
				.method(MethodDef::new("label", [], string())),
		);
		let mut provider = labelled(&format!("impl.{name}"), DomainId::ROOT);
		if complete || name != "C" {
			let next_class = format!("impl.{next}");
			provider = provider.method(MethodDef::native(
				"next",
				[],
				TypeRef::class(next_class.as_str()),
				move |_| Ok(label(&next_class, "next")),
			));
		}
		w.define(provider);
	}
	w.link(
		"TYPE api.A impl.A PROXY
		 TYPE api.B impl.B PROXY
		 TYPE api.C impl.C PROXY",
	)
}

#[test]
fn test_cycle_members_share_dependencies() {
	let linker = ring(true);
	let from_b = linker.dependencies("api.B");
	let from_c = linker.dependencies("api.C");
	let from_a = linker.dependencies("api.A");
	assert!(Arc::ptr_eq(&from_b, &from_c));
	assert!(Arc::ptr_eq(&from_c, &from_a));
	let mut names: Vec<_> = from_a.iter().map(|n| n.as_str()).collect();
	names.sort_unstable();
	assert_eq!(names, ["api.A", "api.B", "api.C"]);
	assert!(linker.is_supported("api.A").unwrap());
}

#[test]
fn test_unimplemented_dependency_is_unsupported() {
	let linker = ring(false);
	let a = linker.proxy("api.A").unwrap();
	assert!(a.all_methods_implemented());
	assert!(!a.is_supported());
	assert!(!linker.proxy("api.C").unwrap().all_methods_implemented());
	assert!(!linker.is_supported("api.B").unwrap());
}

fn hidden_base() -> World {
	let mut w = world();
	let api = w.api;
	w.define(TypeDef::interface("ext.Thing", DomainId::ROOT).method(MethodDef::new("label", [], string())))
		.define(
			TypeDef::interface("other.Base", DomainId::ROOT)
				.method(MethodDef::new("get", [], TypeRef::class("ext.Thing"))),
		)
		.define(TypeDef::interface("api.Sub", api).extends(TypeRef::class("other.Base")))
		.define(labelled("impl.Thing", DomainId::ROOT))
		.define(
			TypeDef::class("impl.SubImpl", DomainId::ROOT)
				.method(MethodDef::native("get", [], TypeRef::class("impl.Thing"), |_| {
					Ok(label("impl.Thing", "hidden"))
				}))
				.factory(|_| Ok(Instance::value("impl.SubImpl", ()))),
		);
	w
}

const HIDDEN: &str = "
	TYPE ext.Thing impl.Thing PROXY
	TYPE api.Sub impl.SubImpl SERVICE
";

#[test]
fn test_proxy_outside_closure_is_fatal() {
	let linker = hidden_base().link(HIDDEN);
	assert!(!linker.dependencies("api.Sub").contains("ext.Thing"));
	for _ in 0..2 {
		let Err(err) = linker.get_service("api.Sub") else {
			panic!("undeclared dependency should fail the lookup");
		};
		let LinkError::UndeclaredDependency { interface, undeclared } = err else {
			panic!("unexpected error: {err}");
		};
		assert_eq!(interface.as_str(), "api.Sub");
		assert_eq!(undeclared.len(), 1);
		assert_eq!(undeclared[0].as_str(), "ext.Thing");
	}
}

#[test]
fn test_known_interface_extends_closure_but_is_unsupported() {
	let mut registry = BindingRegistry::from_text(HIDDEN).unwrap();
	registry.add_known_interfaces(["other.Base"]);
	let linker = hidden_base().link_with(registry, LinkerConfig::default());
	let deps = linker.dependencies("api.Sub");
	assert!(deps.contains("other.Base"));
	assert!(deps.contains("ext.Thing"));

	assert!(linker.proxy("other.Base").unwrap().is_invalid());
	assert!(linker.proxy("api.Sub").unwrap().all_methods_implemented());
	assert!(!linker.is_supported("api.Sub").unwrap());
	assert!(linker.get_service("api.Sub").unwrap().is_none());
}
