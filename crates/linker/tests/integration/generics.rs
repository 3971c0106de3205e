use ferry_primitives::{DomainId, Fault, Instance, MethodDef, OBJECT, TypeDef, TypeRef, Value};
use pretty_assertions::assert_eq;

use crate::common::{call, label, labelled, string, world};

const RECORDS: &str = "
	TYPE api.Item impl.Item PROXY
	TYPE api.Inventory impl.InventoryImpl SERVICE
";

fn items() -> Vec<Value> {
	vec![label("impl.Item", "bolt"), label("impl.Item", "nut")]
}

fn list_state(args: &[Value]) -> Result<&Vec<Value>, Fault> {
	args[0]
		.state::<Vec<Value>>()
		.ok_or_else(|| Fault::class_cast("impl.ListImpl", &args[0]))
}

fn inventory() -> ferry_linker::Linker {
	let mut w = world();
	let api = w.api;
	let item = || TypeRef::class("api.Item");
	let provided = || TypeRef::class("impl.Item");

	let list = TypeDef::interface("api.List", api).type_param("T");
	let t = list.var("T");
	w.define(
		list.method(MethodDef::new("get", [TypeRef::INT], t))
			.method(MethodDef::new("size", [], TypeRef::INT)),
	)
	.define(TypeDef::interface("api.Item", api).method(MethodDef::new("label", [], string())))
	.define(
		TypeDef::interface("api.Inventory", api)
			.method(MethodDef::new("items", [], TypeRef::generic("api.List", [item()])))
			.method(MethodDef::new("names", [], TypeRef::generic("api.List", [string()])))
			.method(MethodDef::new("first", [], TypeRef::optional(item())))
			.method(MethodDef::new("all", [], TypeRef::array(item()))),
	)
	.define(labelled("impl.Item", DomainId::ROOT))
	.define(
		TypeDef::class("impl.ListImpl", DomainId::ROOT)
			.extends(TypeRef::generic("api.List", [provided()]))
			.method(MethodDef::native("get", [TypeRef::INT], TypeRef::object(), |args| {
				let index = args[1].as_int().unwrap_or_default() as usize;
				Ok(list_state(args)?.get(index).cloned().unwrap_or_default())
			}))
			.method(MethodDef::native("size", [], TypeRef::INT, |args| {
				Ok(Value::Int(list_state(args)?.len() as i64))
			})),
	)
	.define(
		TypeDef::class("impl.InventoryImpl", DomainId::ROOT)
			.method(MethodDef::native("items", [], TypeRef::class("api.List"), |_| {
				Ok(Instance::value("impl.ListImpl", items()))
			}))
			.method(MethodDef::native("names", [], TypeRef::class("api.List"), |_| {
				Ok(Instance::value("impl.ListImpl", vec![Value::str("bolt")]))
			}))
			.method(MethodDef::native("first", [], TypeRef::optional(provided()), |_| {
				Ok(Value::Optional(items().into_iter().next().map(Box::new)))
			}))
			.method(MethodDef::native("all", [], TypeRef::array(provided()), |_| Ok(Value::array(items()))))
			.factory(|_| Ok(Instance::value("impl.InventoryImpl", ()))),
	);
	w.link(RECORDS)
}

#[test]
fn test_generic_container_converts_elements() {
	let linker = inventory();
	let inv = linker.get_service("api.Inventory").unwrap().unwrap();
	let list = call(&linker, &inv, "items", &[]).unwrap();
	assert_eq!(list.as_object().unwrap().class().as_str(), "api.List");
	assert_eq!(linker.invoke(&list, "size", &[]).unwrap().as_int(), Some(2));

	let second = linker.invoke(&list, "get", &[Value::Int(1)]).unwrap();
	assert_eq!(second.as_object().unwrap().class().as_str(), "api.Item");
	assert_eq!(linker.invoke(&second, "label", &[]).unwrap().as_str(), Some("nut"));
}

#[test]
fn test_identity_specialization_passes_through() {
	let linker = inventory();
	let inv = linker.get_service("api.Inventory").unwrap().unwrap();
	let names = call(&linker, &inv, "names", &[]).unwrap();
	assert_eq!(names.as_object().unwrap().class().as_str(), "impl.ListImpl");
	assert_eq!(linker.invoke(&names, "get", &[Value::Int(0)]).unwrap().as_str(), Some("bolt"));
}

#[test]
fn test_optional_and_array_results() {
	let linker = inventory();
	let inv = linker.get_service("api.Inventory").unwrap().unwrap();

	let Value::Optional(Some(first)) = call(&linker, &inv, "first", &[]).unwrap() else {
		panic!("expected a present optional");
	};
	assert_eq!(linker.invoke(&first, "label", &[]).unwrap().as_str(), Some("bolt"));

	let Value::Array(all) = call(&linker, &inv, "all", &[]).unwrap() else {
		panic!("expected an array");
	};
	let labels: Vec<_> = all
		.iter()
		.map(|item| linker.invoke(item, "label", &[]).unwrap())
		.collect();
	assert_eq!(labels[0].as_str(), Some("bolt"));
	assert_eq!(labels[1].as_str(), Some("nut"));
}

#[test]
fn test_implicit_generic_proxies_stay_out_of_closure() {
	let linker = inventory();
	let deps = linker.dependencies("api.Inventory");
	assert!(deps.contains("api.Item"));
	assert!(!deps.contains("api.List"));
	assert!(!deps.contains(OBJECT));
	assert!(linker.is_supported("api.Inventory").unwrap());
	assert!(linker.proxy("api.List").unwrap().id().is_sentinel());
}
