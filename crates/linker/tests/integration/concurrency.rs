use std::sync::Arc;
use std::thread;

use ferry_primitives::{DomainId, Instance, MethodDef, TypeDef, TypeRef, Value};
use pretty_assertions::assert_eq;

use crate::common::{call, world};

const THREADS: usize = 8;

#[test]
fn test_service_is_a_singleton_across_threads() {
	let mut w = world();
	let api = w.api;
	w.define(
		TypeDef::interface("api.Counter", api)
			.method(MethodDef::new("peek", [], TypeRef::INT)),
	)
	.define(
		TypeDef::class("impl.Counter", DomainId::ROOT)
			.method(MethodDef::native("peek", [], TypeRef::INT, |_| Ok(Value::Int(5))))
			.factory(|_| Ok(Instance::value("impl.Counter", ()))),
	);
	let linker = w.link("TYPE api.Counter impl.Counter SERVICE");

	let services: Vec<_> = thread::scope(|s| {
		let handles: Vec<_> = (0..THREADS)
			.map(|_| {
				s.spawn(|| {
					let deps = linker.dependencies("api.Counter");
					assert!(deps.contains("api.Counter"));
					let service = linker.get_service("api.Counter").unwrap().unwrap();
					assert_eq!(call(&linker, &service, "peek", &[]).unwrap().as_int(), Some(5));
					service
				})
			})
			.collect();
		handles.into_iter().map(|h| h.join().unwrap()).collect()
	});

	for service in &services[1..] {
		assert!(Arc::ptr_eq(&services[0], service));
	}
	assert!(linker.is_supported("api.Counter").unwrap());
}
