//! Fixtures shared by the integration tests.

use std::sync::Arc;

use ferry_linker::{Linker, LinkerConfig};
use ferry_primitives::{DomainId, DomainTree, Fault, Instance, MethodDef, ObjectRef, TypeDef, TypeRef, TypeUniverse, Value};
use ferry_registry::BindingRegistry;

pub struct World {
	pub universe: TypeUniverse,
	pub api: DomainId,
	pub desktop: DomainId,
}

/// Domains `runtime` (root) with children `api` and `desktop`.
pub fn world() -> World {
	let mut domains = DomainTree::new("runtime");
	let api = domains.add("api", DomainId::ROOT);
	let desktop = domains.add("desktop", DomainId::ROOT);
	World {
		universe: TypeUniverse::new(domains),
		api,
		desktop,
	}
}

impl World {
	pub fn define(&mut self, def: TypeDef) -> &mut Self {
		self.universe.define(def).unwrap();
		self
	}

	pub fn link(self, records: &str) -> Linker {
		self.link_with(BindingRegistry::from_text(records).unwrap(), LinkerConfig::default())
	}

	pub fn link_with(self, registry: BindingRegistry, config: LinkerConfig) -> Linker {
		Linker::builder(Arc::new(self.universe), Arc::new(registry))
			.config(config)
			.domain(self.api)
			.build()
	}
}

pub fn string() -> TypeRef {
	TypeRef::class("std.String")
}

/// Provider class whose state is a label, answering `label()`.
pub fn labelled(name: &str, domain: DomainId) -> TypeDef {
	TypeDef::class(name, domain).method(MethodDef::native("label", [], string(), |args| {
		args[0]
			.state::<String>()
			.map(|s| Value::str(s))
			.ok_or_else(|| Fault::class_cast("labelled", &args[0]))
	}))
}

pub fn label(class: &str, text: &str) -> Value {
	Instance::value(class, text.to_string())
}

pub fn call(linker: &Linker, receiver: &ObjectRef, method: &str, args: &[Value]) -> Result<Value, Fault> {
	linker.invoke(&Value::Object(receiver.clone()), method, args)
}

/// Invokes `method` on an object from inside a native body, where only
/// adapter dispatch is available.
pub fn dispatch(receiver: &Value, method: &str, args: &[Value]) -> Result<Value, Fault> {
	let obj = receiver
		.as_object()
		.ok_or_else(|| Fault::NullPointer(method.to_string()))?;
	obj.dispatch(obj, method, args)
		.unwrap_or_else(|| Err(Fault::raised(format!("{} is not an adapter", obj.class()))))
}
