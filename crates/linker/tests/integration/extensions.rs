use ferry_linker::LinkerConfig;
use ferry_primitives::{DomainId, Extension, Fault, Instance, MethodDef, Modifiers, TypeDef, TypeRef, Value};
use ferry_registry::BindingRegistry;
use pretty_assertions::assert_eq;

use crate::common::{call, string, world};

const FILL: Extension = Extension(1);
const FILTERS: Extension = Extension(2);

fn pen(config: LinkerConfig) -> ferry_linker::Linker {
	let mut w = world();
	let api = w.api;
	w.define(
		TypeDef::interface("api.Pen", api)
			.method(MethodDef::new("draw", [], string()))
			.method(MethodDef::new("fill", [], string()).extension(FILL))
			.method(MethodDef::new("sharpen", [], string()).extension(FILTERS))
			.method(MethodDef::new("blur", [], string()).extension(FILTERS)),
	)
	.define(
		TypeDef::class("impl.Pen", DomainId::ROOT)
			.method(MethodDef::native("draw", [], string(), |_| Ok(Value::str("drawn"))))
			.method(MethodDef::native("fill", [], string(), |_| Ok(Value::str("filled"))))
			.method(MethodDef::native("sharpen", [], string(), |_| Ok(Value::str("sharp"))))
			.factory(|_| Ok(Instance::value("impl.Pen", ()))),
	);
	w.link_with(
		BindingRegistry::from_text("TYPE api.Pen impl.Pen SERVICE").unwrap(),
		config,
	)
}

fn with_extensions() -> LinkerConfig {
	LinkerConfig::from_toml_str("extensions = true\nlog-deprecated = true").unwrap()
}

#[test]
fn test_missing_extension_method_only_disables_that_extension() {
	let linker = pen(with_extensions());
	let proxy = linker.proxy("api.Pen").unwrap();
	assert!(proxy.all_methods_implemented());
	assert!(proxy.is_supported());
	assert!(proxy.is_extension_supported(FILL));
	assert!(!proxy.is_extension_supported(FILTERS));
	assert!(!proxy.is_extension_supported(Extension(9)));
}

#[test]
fn test_extension_methods_need_an_enabled_instance() {
	let linker = pen(with_extensions());
	let plain = linker.get_service("api.Pen").unwrap().unwrap();
	assert_eq!(call(&linker, &plain, "draw", &[]).unwrap().as_str(), Some("drawn"));
	assert!(matches!(call(&linker, &plain, "fill", &[]), Err(Fault::Unsupported(_))));

	let filling = linker
		.get_service_with_extensions("api.Pen", &[FILL])
		.unwrap()
		.expect("fill is supported");
	assert_eq!(call(&linker, &filling, "fill", &[]).unwrap().as_str(), Some("filled"));
	assert!(matches!(call(&linker, &filling, "sharpen", &[]), Err(Fault::Unsupported(_))));

	assert!(linker.get_service_with_extensions("api.Pen", &[FILL, FILTERS]).unwrap().is_none());
}

#[test]
fn test_extensions_off_counts_every_method() {
	let linker = pen(LinkerConfig::default());
	let proxy = linker.proxy("api.Pen").unwrap();
	assert!(!proxy.all_methods_implemented());
	assert!(!proxy.is_extension_supported(FILL));
	assert!(linker.get_supported_service("api.Pen").unwrap().is_none());

	let plain = linker.get_service("api.Pen").unwrap().unwrap();
	assert_eq!(call(&linker, &plain, "fill", &[]).unwrap().as_str(), Some("filled"));
	assert!(matches!(call(&linker, &plain, "blur", &[]), Err(Fault::Unimplemented { .. })));
}

#[test]
fn test_deprecated_methods_still_dispatch() {
	let mut w = world();
	let api = w.api;
	w.define(
		TypeDef::interface("api.Old", api)
			.modifiers(Modifiers::DEPRECATED)
			.method(MethodDef::new("legacy", [], TypeRef::INT).deprecated()),
	)
	.define(
		TypeDef::class("impl.Old", DomainId::ROOT)
			.method(MethodDef::native("legacy", [], TypeRef::INT, |_| Ok(Value::Int(1))))
			.factory(|_| Ok(Instance::value("impl.Old", ()))),
	);
	let linker = w.link("TYPE api.Old impl.Old SERVICE");
	let old = linker.get_service("api.Old").unwrap().unwrap();
	for _ in 0..3 {
		assert_eq!(call(&linker, &old, "legacy", &[]).unwrap().as_int(), Some(1));
	}
	assert!(linker.proxy("api.Old").unwrap().description().unwrap().deprecated);
}
