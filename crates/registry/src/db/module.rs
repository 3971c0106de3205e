use ferry_primitives::{DomainId, TypeName};
use smallvec::SmallVec;

use super::BindingRegistry;
use crate::binding::{Binding, BindingFlags, BindingKind, StaticOverride};
use crate::error::RegistryError;

/// Registration handle for one provider module.
///
/// Bindings registered here load their targets from the module's domain.
/// [`with_static`](Self::with_static) attaches to the most recent binding.
#[derive(Debug)]
pub struct ModuleRegistration<'a> {
	registry: &'a mut BindingRegistry,
	module: DomainId,
	last: Option<TypeName>,
}

impl BindingRegistry {
	/// Opens registration for `module`. Each module registers once.
	pub fn register_module(
		&mut self,
		module: DomainId,
	) -> Result<ModuleRegistration<'_>, RegistryError> {
		if !self.modules.insert(module) {
			return Err(RegistryError::DuplicateModule(module.to_string()));
		}
		Ok(ModuleRegistration {
			registry: self,
			module,
			last: None,
		})
	}
}

impl ModuleRegistration<'_> {
	pub fn module(&self) -> DomainId {
		self.module
	}

	/// Adapter implementing `interface` over the first resolvable target.
	pub fn proxy(&mut self, interface: &str, targets: &[&str]) -> Result<&mut Self, RegistryError> {
		if targets.is_empty() {
			return Err(RegistryError::TargetCount {
				kind: "PROXY",
				interface: interface.to_string(),
				expected: "at least one target",
			});
		}
		self.add(interface, targets, BindingKind::Proxy, BindingFlags::empty())
	}

	/// Singleton service; `targets` may be empty for static-only services.
	pub fn service(&mut self, interface: &str, targets: &[&str]) -> Result<&mut Self, RegistryError> {
		self.add(interface, targets, BindingKind::Service, BindingFlags::empty())
	}

	/// Service reachable only from provider code.
	pub fn internal_service(
		&mut self,
		interface: &str,
		targets: &[&str],
	) -> Result<&mut Self, RegistryError> {
		self.add(
			interface,
			targets,
			BindingKind::InternalService,
			BindingFlags::INTERNAL,
		)
	}

	/// Adapter implementing provider-side `interface` over a client object.
	pub fn client_proxy(&mut self, interface: &str, target: &str) -> Result<&mut Self, RegistryError> {
		self.add(interface, &[target], BindingKind::ClientProxy, BindingFlags::empty())
	}

	/// Both directions at once: `api` over `implementation` and back.
	pub fn two_way_proxy(&mut self, api: &str, implementation: &str) -> Result<&mut Self, RegistryError> {
		let module = self.module;
		let half = |interface: &str, target: &str, kind| {
			Binding::new(interface, [TypeName::from(target)], kind)
				.with_flags(BindingFlags::TWO_WAY)
				.in_module(module)
		};
		self.registry.insert_all([
			half(implementation, api, BindingKind::ClientProxy),
			half(api, implementation, BindingKind::Proxy),
		])?;
		self.last = Some(TypeName::from(api));
		Ok(self)
	}

	/// Routes `method` of the last binding to static `function` on the first
	/// candidate type that declares it.
	pub fn with_static(
		&mut self,
		method: &str,
		function: &str,
		candidates: &[&str],
	) -> Result<&mut Self, RegistryError> {
		let dangling = || RegistryError::DanglingStatic {
			method: method.to_string(),
			function: function.to_string(),
		};
		if candidates.is_empty() {
			return Err(dangling());
		}
		let key = self.last.clone().ok_or_else(dangling)?;
		let binding = self
			.registry
			.tables
			.bindings
			.get_mut(&key)
			.ok_or_else(dangling)?;
		super::merge_static(
			binding,
			StaticOverride {
				method: method.into(),
				function: function.into(),
				candidates: candidates.iter().map(|c| TypeName::from(*c)).collect(),
				descriptor: None,
			},
		)?;
		self.registry.resolved.get_mut().remove(&key);
		Ok(self)
	}

	fn add(
		&mut self,
		interface: &str,
		targets: &[&str],
		kind: BindingKind,
		flags: BindingFlags,
	) -> Result<&mut Self, RegistryError> {
		let targets: SmallVec<[TypeName; 1]> = targets.iter().map(|t| TypeName::from(*t)).collect();
		let binding = Binding::new(interface, targets, kind)
			.with_flags(flags)
			.in_module(self.module);
		self.registry.insert(binding)?;
		self.last = Some(TypeName::from(interface));
		Ok(self)
	}
}
