//! Small shapes world shared by unit tests.

use std::sync::Arc;

use ferry_primitives::{DomainId, DomainTree, Fault, Instance, MethodDef, TypeDef, TypeRef, TypeUniverse, Value};
use ferry_registry::BindingRegistry;

use crate::{Linker, LinkerConfig};

pub(crate) struct Square(pub f64);

fn side(args: &[Value]) -> Result<f64, Fault> {
	args[0]
		.state::<Square>()
		.map(|s| s.0)
		.ok_or_else(|| Fault::class_cast("impl.Square", &args[0]))
}

/// Domains `runtime` (root) and `api`; provider types live in the root.
pub(crate) fn universe() -> (TypeUniverse, DomainId) {
	let mut domains = DomainTree::new("runtime");
	let api = domains.add("api", DomainId::ROOT);
	let mut u = TypeUniverse::new(domains);

	u.define(
		TypeDef::interface("api.Shape", api)
			.method(MethodDef::new("area", [], TypeRef::DOUBLE))
			.method(MethodDef::new("scaled", [TypeRef::DOUBLE], TypeRef::class("api.Shape")))
			.method(MethodDef::native("name", [], TypeRef::class("std.String"), |_| Ok(Value::str("shape")))),
	)
	.unwrap();
	u.define(
		TypeDef::interface("api.Canvas", api)
			.method(MethodDef::new("largest", [TypeRef::array(TypeRef::class("api.Shape"))], TypeRef::class("api.Shape")))
			.method(MethodDef::new("count", [], TypeRef::INT)),
	)
	.unwrap();
	let boxed = TypeDef::interface("api.Box", api).type_param("T");
	let t = boxed.var("T");
	u.define(boxed.method(MethodDef::new("get", [], t))).unwrap();

	u.define(
		TypeDef::class("impl.Square", DomainId::ROOT)
			.method(MethodDef::native("area", [], TypeRef::DOUBLE, |args| {
				let s = side(args)?;
				Ok(Value::Double(s * s))
			}))
			.method(MethodDef::native(
				"scaled",
				[TypeRef::DOUBLE],
				TypeRef::class("impl.Square"),
				|args| {
					let s = side(args)?;
					let k = args[1].as_double().unwrap_or(1.0);
					Ok(Instance::value("impl.Square", Square(s * k)))
				},
			)),
	)
	.unwrap();
	u.define(
		TypeDef::class("impl.CanvasImpl", DomainId::ROOT)
			.method(MethodDef::native(
				"largest",
				[TypeRef::array(TypeRef::class("impl.Square"))],
				TypeRef::class("impl.Square"),
				|args| {
					let Value::Array(items) = &args[1] else {
						return Err(Fault::class_cast("impl.Square[]", &args[1]));
					};
					let mut best: Option<(f64, Value)> = None;
					for item in items.iter() {
						let s = side(std::slice::from_ref(item))?;
						if best.as_ref().is_none_or(|(b, _)| s > *b) {
							best = Some((s, item.clone()));
						}
					}
					Ok(best.map(|(_, v)| v).unwrap_or_default())
				},
			))
			.factory(|_| Ok(Instance::value("impl.CanvasImpl", ()))),
	)
	.unwrap();
	u.define(
		TypeDef::class("impl.CanvasTools", DomainId::ROOT)
			.method(MethodDef::static_native("count", [], TypeRef::INT, |_| Ok(Value::Int(7)))),
	)
	.unwrap();
	(u, api)
}

pub(crate) const BINDINGS: &str = "
	TYPE api.Shape impl.Square PROXY
	TYPE api.Canvas impl.CanvasImpl SERVICE
";

pub(crate) fn linker(records: &str, config: LinkerConfig) -> (Linker, Arc<TypeUniverse>) {
	let (universe, api) = universe();
	let universe = Arc::new(universe);
	let registry = Arc::new(BindingRegistry::from_text(records).unwrap());
	let linker = Linker::builder(universe.clone(), registry)
		.config(config)
		.domain(api)
		.build();
	(linker, universe)
}
