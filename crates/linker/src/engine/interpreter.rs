use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use ferry_primitives::{Fault, Object, ObjectRef, TypeName, Value};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::{AdapterRuntime, Constructor, Materialized, Materializer, TargetExtractor};
use crate::error::LinkError;
use crate::extensions::ExtensionSet;
use crate::generator::{AdapterDescription, AdapterMethod, BridgeKey, CallTarget, Linkage, MethodBody};

/// Call into provider code: `(runtime, target, converted arguments)`.
type Handle = Arc<dyn Fn(&dyn AdapterRuntime, &Value, &[Value]) -> Result<Value, Fault> + Send + Sync>;

/// Runs adapters by interpreting their descriptions.
#[derive(Default)]
pub struct Interpreter {
	bridges: Arc<BridgeTable>,
}

impl Interpreter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of registered late-bound call slots.
	pub fn bridged_slots(&self) -> usize {
		self.bridges.slots.read().len()
	}
}

/// Late-bound calls into domains the adapter cannot name directly.
#[derive(Default)]
struct BridgeTable {
	slots: RwLock<FxHashMap<BridgeKey, Handle>>,
}

impl Materializer for Interpreter {
	fn materialize(
		&self,
		description: Arc<AdapterDescription>,
		runtime: Weak<dyn AdapterRuntime>,
	) -> Result<Materialized, LinkError> {
		let methods = description
			.methods
			.iter()
			.map(|m| CompiledMethod {
				call: self.compile(m),
				warned: AtomicBool::new(false),
			})
			.collect();
		let has_target = description.target.is_some();
		let class = Arc::new(AdapterClass {
			description,
			methods,
			bridges: self.bridges.clone(),
			runtime,
			warned: AtomicBool::new(false),
		});

		let constructor: Constructor = Arc::new(move |target: Option<Value>, extensions: ExtensionSet| {
			class.warn_deprecated_interface();
			Arc::new(Adapter {
				class: class.clone(),
				target,
				extensions,
			}) as ObjectRef
		});
		let target_extractor: Option<TargetExtractor> =
			has_target.then(|| Arc::new(|adapter: &ObjectRef| adapter.proxy_target()) as TargetExtractor);
		Ok(Materialized {
			constructor,
			target_extractor,
		})
	}
}

impl Interpreter {
	fn compile(&self, method: &AdapterMethod) -> Compiled {
		match &method.body {
			MethodBody::Unimplemented => Compiled::Unimplemented,
			MethodBody::Default(body) => Compiled::Default(body.clone()),
			MethodBody::Delegate { call, linkage } => {
				let handle = handle(call);
				match linkage {
					Linkage::Direct => Compiled::Direct(handle),
					Linkage::Bridged(key) => {
						self.bridges.slots.write().entry(*key).or_insert(handle);
						Compiled::Bridged {
							key: *key,
							resolved: OnceLock::new(),
						}
					}
				}
			}
		}
	}
}

fn handle(call: &CallTarget) -> Handle {
	match call.clone() {
		CallTarget::Instance { name, ty, .. } => {
			Arc::new(move |rt: &dyn AdapterRuntime, target: &Value, args: &[Value]| {
				rt.universe().invoke_exact(target, &name, &ty, args)
			})
		}
		CallTarget::Static { declaring, function } => match function.body {
			Some(body) => Arc::new(move |_: &dyn AdapterRuntime, _: &Value, args: &[Value]| body(args)),
			None => Arc::new(move |_: &dyn AdapterRuntime, _: &Value, _: &[Value]| {
				Err(Fault::Unimplemented {
					interface: declaring.clone(),
					method: function.name.to_string(),
				})
			}),
		},
	}
}

enum Compiled {
	Direct(Handle),
	Bridged { key: BridgeKey, resolved: OnceLock<Handle> },
	Default(ferry_primitives::NativeFn),
	Unimplemented,
}

struct CompiledMethod {
	call: Compiled,
	warned: AtomicBool,
}

/// Shared per-proxy state of all adapters of one description.
struct AdapterClass {
	description: Arc<AdapterDescription>,
	methods: Vec<CompiledMethod>,
	bridges: Arc<BridgeTable>,
	runtime: Weak<dyn AdapterRuntime>,
	warned: AtomicBool,
}

impl AdapterClass {
	fn logs_deprecated(&self) -> bool {
		self.runtime.upgrade().is_some_and(|rt| rt.log_deprecated())
	}

	fn warn_deprecated_interface(&self) {
		if self.description.deprecated && !self.warned.swap(true, Ordering::Relaxed) && self.logs_deprecated() {
			tracing::warn!(interface = %self.description.interface, "deprecated interface in use");
		}
	}

	fn bridged(&self, key: BridgeKey, resolved: &OnceLock<Handle>) -> Result<Handle, Fault> {
		if let Some(h) = resolved.get() {
			return Ok(h.clone());
		}
		let h = self
			.bridges
			.slots
			.read()
			.get(&key)
			.cloned()
			.ok_or_else(|| Fault::Unsupported(format!("bridge slot {} of {} is not linked", key.slot, key.proxy)))?;
		Ok(resolved.get_or_init(|| h).clone())
	}
}

/// A generated adapter: implements the interface by calling into its target.
pub(crate) struct Adapter {
	class: Arc<AdapterClass>,
	target: Option<Value>,
	extensions: ExtensionSet,
}

impl Adapter {
	fn call(&self, this: &ObjectRef, index: usize, args: &[Value]) -> Result<Value, Fault> {
		let desc = &self.class.description;
		let method = &desc.methods[index];
		let compiled = &self.class.methods[index];

		if let Some(ext) = method.extension
			&& !self.extensions.contains(ext)
		{
			return Err(Fault::Unsupported(format!(
				"{}.{} requires {ext}, which this instance does not enable",
				desc.interface, method.name
			)));
		}
		if method.deprecated && !compiled.warned.swap(true, Ordering::Relaxed) && self.class.logs_deprecated() {
			tracing::warn!(interface = %desc.interface, method = &*method.name, "deprecated method in use");
		}

		match &compiled.call {
			Compiled::Unimplemented => Err(Fault::Unimplemented {
				interface: desc.interface.clone(),
				method: method.name.to_string(),
			}),
			Compiled::Default(body) => {
				let mut full = Vec::with_capacity(args.len() + 1);
				full.push(Value::Object(this.clone()));
				full.extend_from_slice(args);
				body(&full)
			}
			Compiled::Direct(handle) => self.delegate(method, handle, args),
			Compiled::Bridged { key, resolved } => {
				let handle = self.class.bridged(*key, resolved)?;
				self.delegate(method, &handle, args)
			}
		}
	}

	fn delegate(&self, method: &AdapterMethod, handle: &Handle, args: &[Value]) -> Result<Value, Fault> {
		let rt = self.class.runtime.upgrade().ok_or(Fault::Detached)?;
		let none = ExtensionSet::new();
		let extensions = if method.mapping.query.needs_extensions {
			&self.extensions
		} else {
			&none
		};
		let converted = method
			.mapping
			.params
			.iter()
			.zip(args)
			.map(|(c, arg)| c.convert(arg.clone(), &*rt, extensions))
			.collect::<Result<Vec<_>, _>>()?;
		let target = self.target.clone().unwrap_or_default();
		let ret = handle(&*rt, &target, &converted)?;
		method.mapping.ret.convert(ret, &*rt, extensions)
	}
}

impl Object for Adapter {
	fn class(&self) -> &TypeName {
		&self.class.description.interface
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn proxy_target(&self) -> Option<Value> {
		Some(self.target.clone().unwrap_or_default())
	}

	fn dispatch(&self, this: &ObjectRef, method: &str, args: &[Value]) -> Option<Result<Value, Fault>> {
		let index = self
			.class
			.description
			.methods
			.iter()
			.position(|m| &*m.name == method && m.client_type.arity() == args.len())?;
		Some(self.call(this, index, args))
	}
}
