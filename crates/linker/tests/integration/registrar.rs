use std::sync::Arc;

use ferry_linker::Linker;
use ferry_primitives::{DomainId, DomainTree, Instance, MethodDef, TypeDef, TypeRef, TypeUniverse, Value};
use ferry_registry::{BindingRegistry, ModuleRegistrar};
use pretty_assertions::assert_eq;

use crate::common::call;

inventory::submit! {
	ModuleRegistrar {
		module: "plugins",
		register: |m| {
			m.service("api.Greeter", &["plug.Greeter"])?
				.with_static("shout", "shout", &["plug.Loud"])?;
			Ok(())
		},
	}
}

#[test]
fn test_inventory_registrars_bind_plugin_services() {
	let mut domains = DomainTree::new("runtime");
	let api = domains.add("api", DomainId::ROOT);
	let plugins = domains.add("plugins", DomainId::ROOT);
	let mut universe = TypeUniverse::new(domains);
	universe
		.define(
			TypeDef::interface("api.Greeter", api)
				.method(MethodDef::new("greet", [], TypeRef::class("std.String")))
				.method(MethodDef::new("shout", [], TypeRef::class("std.String"))),
		)
		.unwrap();
	universe
		.define(
			TypeDef::class("plug.Greeter", plugins)
				.method(MethodDef::native("greet", [], TypeRef::class("std.String"), |_| {
					Ok(Value::str("hello"))
				}))
				.factory(|_| Ok(Instance::value("plug.Greeter", ()))),
		)
		.unwrap();
	universe
		.define(
			TypeDef::class("plug.Loud", plugins).method(MethodDef::static_native(
				"shout",
				[],
				TypeRef::class("std.String"),
				|_| Ok(Value::str("HELLO")),
			)),
		)
		.unwrap();

	let mut registry = BindingRegistry::new();
	assert_eq!(registry.register_inventory(universe.domains()).unwrap(), 1);
	let linker = Linker::builder(Arc::new(universe), Arc::new(registry))
		.domain(api)
		.build();

	let greeter = linker.get_supported_service("api.Greeter").unwrap().unwrap();
	assert_eq!(call(&linker, &greeter, "greet", &[]).unwrap().as_str(), Some("hello"));
	assert_eq!(call(&linker, &greeter, "shout", &[]).unwrap().as_str(), Some("HELLO"));
}
