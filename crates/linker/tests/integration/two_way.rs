use ferry_primitives::{DomainId, Instance, MethodDef, TypeDef, TypeRef, Value};
use pretty_assertions::assert_eq;

use crate::common::{call, dispatch, label, labelled, string, world};

const RECORDS: &str = "
	TYPE api.Widget impl.Widget TWO_WAY
	TYPE api.Factory impl.FactoryImpl SERVICE
";

fn widgets() -> ferry_linker::Linker {
	let mut w = world();
	let api = w.api;
	let widget = || TypeRef::class("api.Widget");
	let provided = || TypeRef::class("impl.Widget");
	w.define(TypeDef::interface("api.Widget", api).method(MethodDef::new("label", [], string())))
		.define(
			TypeDef::interface("api.Factory", api)
				.method(MethodDef::new("make", [string()], widget()))
				.method(MethodDef::new("echo", [widget()], widget()))
				.method(MethodDef::new("describe", [widget()], string())),
		)
		.define(labelled("impl.Widget", DomainId::ROOT))
		.define(labelled("app.Mine", api).extends(widget()))
		.define(
			TypeDef::class("impl.FactoryImpl", DomainId::ROOT)
				.method(MethodDef::native("make", [string()], provided(), |args| {
					let text = args[1].as_str().unwrap_or_default();
					Ok(label("impl.Widget", text))
				}))
				.method(MethodDef::native("echo", [provided()], provided(), |args| Ok(args[1].clone())))
				.method(MethodDef::native("describe", [provided()], string(), |args| {
					let inner = dispatch(&args[1], "label", &[])?;
					Ok(Value::str(&format!("<{}>", inner.as_str().unwrap_or_default())))
				}))
				.factory(|_| Ok(Instance::value("impl.FactoryImpl", ()))),
		);
	w.link(RECORDS)
}

#[test]
fn test_directions_are_inverse() {
	let linker = widgets();
	let forward = linker.proxy("api.Widget").unwrap();
	let backward = linker.proxy("impl.Widget").unwrap();
	assert_eq!(forward.inverse(), backward.id());
	assert_eq!(backward.inverse(), forward.id());
	assert_eq!(backward.target().map(|t| t.as_str()), Some("api.Widget"));
}

#[test]
fn test_provider_objects_come_back_wrapped() {
	let linker = widgets();
	let factory = linker.get_service("api.Factory").unwrap().unwrap();
	let made = call(&linker, &factory, "make", &[Value::str("knob")]).unwrap();
	let made_obj = made.as_object().unwrap();
	assert_eq!(made_obj.class().as_str(), "api.Widget");
	assert_eq!(linker.invoke(&made, "label", &[]).unwrap().as_str(), Some("knob"));

	// a provider object handed back is unwrapped, not wrapped twice
	let echoed = call(&linker, &factory, "echo", &[made.clone()]).unwrap();
	assert_eq!(echoed.as_object().unwrap().class().as_str(), "api.Widget");
	assert_eq!(linker.invoke(&echoed, "label", &[]).unwrap().as_str(), Some("knob"));

	let proxy = linker.proxy("api.Widget").unwrap();
	let original = proxy.extract(made_obj).unwrap().unwrap();
	let returned = proxy.extract(echoed.as_object().unwrap()).unwrap().unwrap();
	assert!(returned.same(&original));
}

#[test]
fn test_client_objects_round_trip_by_identity() {
	let linker = widgets();
	let factory = linker.get_service("api.Factory").unwrap().unwrap();
	let mine = label("app.Mine", "dial");

	let echoed = call(&linker, &factory, "echo", &[mine.clone()]).unwrap();
	assert!(echoed.same(&mine));

	let described = call(&linker, &factory, "describe", &[mine]).unwrap();
	assert_eq!(described.as_str(), Some("<dial>"));
	assert!(call(&linker, &factory, "echo", &[Value::Null]).unwrap().is_null());
}

#[test]
fn test_wrap_then_extract() {
	let linker = widgets();
	let proxy = linker.proxy("api.Widget").unwrap();
	let target = label("impl.Widget", "raw");
	let adapter = proxy.wrap(target.clone()).unwrap();
	assert!(proxy.extract(&adapter).unwrap().unwrap().same(&target));
}

#[test]
fn test_two_way_closure_is_supported() {
	let linker = widgets();
	let deps = linker.dependencies("api.Factory");
	for name in ["api.Factory", "api.Widget", "impl.Widget"] {
		assert!(deps.contains(name), "missing {name}");
	}
	assert!(linker.is_supported("api.Factory").unwrap());
	assert!(linker.get_supported_service("api.Factory").unwrap().is_some());
}
