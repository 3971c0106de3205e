use std::sync::{Arc, Weak};

use ferry_primitives::{DomainId, Extension, Fault, ObjectRef, TypeName, TypeUniverse, Value};
use ferry_registry::BindingRegistry;

use crate::closure::{ClosureEnv, DependencyClosure, TypeSet};
use crate::config::LinkerConfig;
use crate::conversion::{ConversionRuntime, ProxyLookup, ProxyView};
use crate::engine::{AdapterRuntime, Interpreter, Materializer};
use crate::error::LinkError;
use crate::extensions::ExtensionSet;
use crate::generator::{AdapterDescription, AdapterGenerator};
use crate::proxy::{ProxyDescriptor, ProxyId, Stage};
use crate::repository::{ProxyRepository, Specialization};

/// State shared by the linker and every adapter it creates.
pub(crate) struct Shared {
	pub universe: Arc<TypeUniverse>,
	pub registry: Arc<BindingRegistry>,
	pub config: LinkerConfig,
	/// Domain the linker resolves from.
	pub domain: DomainId,
	pub repository: ProxyRepository,
	pub closure: DependencyClosure,
	pub engine: Arc<dyn Materializer>,
	this: Weak<Shared>,
}

impl Shared {
	pub fn runtime(&self) -> Weak<dyn AdapterRuntime> {
		self.this.clone()
	}

	pub fn generator(&self) -> AdapterGenerator<'_> {
		AdapterGenerator::new(self, &self.universe, self.config.extensions, self.config.verbose)
	}

	pub fn proxy_id(&self, name: &TypeName, specialization: Option<Specialization>) -> Result<ProxyId, LinkError> {
		self.repository
			.get(&self.universe, &self.registry, self.domain, name, specialization)
	}

	pub fn descriptor_for(&self, name: &TypeName) -> Result<Arc<ProxyDescriptor>, LinkError> {
		self.repository.descriptor(self.proxy_id(name, None)?)
	}

	pub fn dependencies(&self, name: &TypeName) -> Arc<TypeSet> {
		self.closure.dependencies(name, self)
	}
}

impl ProxyLookup for Shared {
	fn proxy_for(&self, name: &TypeName, specialization: Option<Specialization>) -> Result<ProxyId, LinkError> {
		self.proxy_id(name, specialization)
	}

	fn view(&self, id: ProxyId) -> ProxyView {
		self.repository
			.descriptor(id)
			.map_or_else(|_| ProxyView::unknown(id), |d| d.view())
	}
}

impl ClosureEnv for Shared {
	fn is_relevant(&self, name: &TypeName) -> bool {
		name.in_namespace(&self.config.api_namespace)
			|| self.registry.is_known_interface(name.as_str())
			|| self.registry.interface_by_target(name.as_str()).is_some()
	}

	fn is_known_interface(&self, name: &TypeName) -> bool {
		self.registry.is_known_interface(name.as_str())
	}

	fn usages(&self, name: &TypeName) -> Vec<TypeName> {
		let Some(def) = self.universe.get(name.as_str()) else {
			return Vec::new();
		};
		let mut out = Vec::new();
		for sup in &def.supertypes {
			TypeUniverse::mentioned_types(sup, &mut out);
		}
		for field in &def.fields {
			TypeUniverse::mentioned_types(&field.ty, &mut out);
		}
		for method in &def.methods {
			TypeUniverse::mentioned_types(&method.ret, &mut out);
			for ty in method.params.iter().chain(&method.throws) {
				TypeUniverse::mentioned_types(ty, &mut out);
			}
		}
		let mut seen = rustc_hash::FxHashSet::default();
		out.retain(|n| seen.insert(n.clone()));
		out
	}

	fn interface_by_target(&self, name: &TypeName) -> Option<TypeName> {
		self.registry.interface_by_target(name.as_str()).cloned()
	}
}

impl ConversionRuntime for Shared {
	fn wrap(&self, proxy: ProxyId, target: Value, extensions: &ExtensionSet) -> Result<Value, Fault> {
		let descriptor = self
			.repository
			.descriptor(proxy)
			.map_err(|err| Fault::Unsupported(err.to_string()))?;
		let materialized = descriptor
			.materialize(self)
			.map_err(|err| Fault::Unsupported(err.to_string()))?;
		Ok(Value::Object((materialized.constructor)(Some(target), extensions.clone())))
	}
}

impl AdapterRuntime for Shared {
	fn universe(&self) -> &TypeUniverse {
		&self.universe
	}

	fn log_deprecated(&self) -> bool {
		self.config.log_deprecated
	}
}

/// Looks up capabilities across the boundary.
///
/// Cheap to share between threads; every lookup is idempotent.
pub struct Linker {
	pub(crate) shared: Arc<Shared>,
}

pub struct LinkerBuilder {
	universe: Arc<TypeUniverse>,
	registry: Arc<BindingRegistry>,
	config: LinkerConfig,
	domain: DomainId,
	engine: Option<Arc<dyn Materializer>>,
}

impl LinkerBuilder {
	pub fn config(mut self, config: LinkerConfig) -> Self {
		self.config = config;
		self
	}

	/// Domain the linker resolves names from. Defaults to the root domain.
	pub fn domain(mut self, domain: DomainId) -> Self {
		self.domain = domain;
		self
	}

	/// Replaces the default [`Interpreter`] backend.
	pub fn engine(mut self, engine: Arc<dyn Materializer>) -> Self {
		self.engine = Some(engine);
		self
	}

	pub fn build(self) -> Linker {
		self.registry.set_verbose(self.config.verbose);
		if self.config.verbose {
			tracing::debug!(
				domain = self.universe.domains().name(self.domain),
				bindings = self.registry.len(),
				version = ?self.registry.version(),
				extensions = self.config.extensions,
				"linker initialized"
			);
		}
		let engine = self.engine.unwrap_or_else(|| Arc::new(Interpreter::new()));
		let shared = Arc::new_cyclic(|this| Shared {
			universe: self.universe,
			registry: self.registry,
			config: self.config,
			domain: self.domain,
			repository: ProxyRepository::new(),
			closure: DependencyClosure::new(),
			engine,
			this: this.clone(),
		});
		Linker { shared }
	}
}

impl Linker {
	pub fn builder(universe: Arc<TypeUniverse>, registry: Arc<BindingRegistry>) -> LinkerBuilder {
		LinkerBuilder {
			universe,
			registry,
			config: LinkerConfig::default(),
			domain: DomainId::ROOT,
			engine: None,
		}
	}

	pub fn config(&self) -> &LinkerConfig {
		&self.shared.config
	}

	pub fn universe(&self) -> &TypeUniverse {
		&self.shared.universe
	}

	/// Version string from the registry's `VERSION` record.
	pub fn version(&self) -> Option<&str> {
		self.shared.registry.version()
	}

	/// The public service implementing `interface`.
	///
	/// `None` if no public service is bound, the binding or a dependency is
	/// invalid, or the target refused construction. A partially implemented
	/// service is still returned; its missing methods fail when called.
	pub fn get_service(&self, interface: &str) -> Result<Option<ObjectRef>, LinkError> {
		let descriptor = self.shared.descriptor_for(&TypeName::from(interface))?;
		if descriptor.is_internal() {
			return Ok(None);
		}
		descriptor.instance(&self.shared)
	}

	/// Like [`get_service`](Self::get_service), but only for fully supported
	/// services.
	pub fn get_supported_service(&self, interface: &str) -> Result<Option<ObjectRef>, LinkError> {
		let descriptor = self.shared.descriptor_for(&TypeName::from(interface))?;
		if descriptor.is_internal() || !descriptor.is_supported(&self.shared) {
			return Ok(None);
		}
		descriptor.instance(&self.shared)
	}

	/// Service lookup for the linker's own collaborators; internal services
	/// included.
	pub fn internal_service(&self, interface: &str) -> Result<Option<ObjectRef>, LinkError> {
		self.shared
			.descriptor_for(&TypeName::from(interface))?
			.instance(&self.shared)
	}

	/// A fresh public service adapter with `extensions` enabled. `None` if the
	/// service is unavailable or any extension is unsupported.
	pub fn get_service_with_extensions(
		&self,
		interface: &str,
		extensions: &[Extension],
	) -> Result<Option<ObjectRef>, LinkError> {
		let descriptor = self.shared.descriptor_for(&TypeName::from(interface))?;
		if descriptor.is_internal() {
			return Ok(None);
		}
		descriptor.instance_with_extensions(&self.shared, extensions)
	}

	pub fn is_supported(&self, interface: &str) -> Result<bool, LinkError> {
		Ok(self.proxy(interface)?.is_supported())
	}

	/// Introspection handle for the descriptor of `interface`.
	pub fn proxy(&self, interface: &str) -> Result<Proxy<'_>, LinkError> {
		let descriptor = self.shared.descriptor_for(&TypeName::from(interface))?;
		Ok(Proxy {
			shared: &self.shared,
			descriptor,
		})
	}

	/// Known interfaces `interface` transitively depends on.
	pub fn dependencies(&self, interface: &str) -> Arc<TypeSet> {
		self.shared.dependencies(&TypeName::from(interface))
	}

	/// Calls `method` on `receiver`, dispatching through adapters.
	pub fn invoke(&self, receiver: &Value, method: &str, args: &[Value]) -> Result<Value, Fault> {
		self.shared.universe.invoke(receiver, method, args)
	}
}

/// Read-only view of one proxy descriptor.
pub struct Proxy<'a> {
	shared: &'a Shared,
	descriptor: Arc<ProxyDescriptor>,
}

impl Proxy<'_> {
	pub fn id(&self) -> ProxyId {
		self.descriptor.id
	}

	pub fn inverse(&self) -> ProxyId {
		self.descriptor.inverse
	}

	pub fn interface(&self) -> Option<&TypeName> {
		self.descriptor.interface()
	}

	pub fn target(&self) -> Option<&TypeName> {
		self.descriptor.target()
	}

	pub fn is_service(&self) -> bool {
		self.descriptor.is_service()
	}

	pub fn is_invalid(&self) -> bool {
		self.descriptor.is_invalid()
	}

	pub fn stage(&self) -> Stage {
		self.descriptor.stage()
	}

	pub fn all_methods_implemented(&self) -> bool {
		self.descriptor.all_methods_implemented(self.shared)
	}

	pub fn is_supported(&self) -> bool {
		self.descriptor.is_supported(self.shared)
	}

	pub fn is_extension_supported(&self, ext: Extension) -> bool {
		self.descriptor.is_extension_supported(self.shared, ext)
	}

	pub fn description(&self) -> Result<Arc<AdapterDescription>, LinkError> {
		self.descriptor.generate(self.shared)
	}

	/// The service singleton, for service descriptors.
	pub fn instance(&self) -> Result<Option<ObjectRef>, LinkError> {
		self.descriptor.instance(self.shared)
	}

	/// Wraps `target` in a new adapter of this proxy.
	pub fn wrap(&self, target: Value) -> Result<ObjectRef, LinkError> {
		let materialized = self.descriptor.materialize(self.shared)?;
		Ok((materialized.constructor)(Some(target), ExtensionSet::new()))
	}

	/// Reads the target back out of an adapter of this proxy.
	pub fn extract(&self, adapter: &ObjectRef) -> Result<Option<Value>, LinkError> {
		let materialized = self.descriptor.materialize(self.shared)?;
		Ok(materialized.target_extractor.and_then(|extract| extract(adapter)))
	}
}
