//! Per-type proxy descriptors and their lazy lifecycle.
//!
//! ```text
//! New -> GeneratorBuilt -> Materialized -> Validated -> Instantiated (services)
//! ```
//!
//! Each transition runs at most once and stages never regress. A descriptor
//! only locks itself, and never while calling into another descriptor.

use std::fmt;
use std::sync::{Arc, OnceLock};

use ferry_primitives::{Extension, Fault, ObjectRef, TypeName, Value};
use ferry_registry::ResolvedBinding;
use parking_lot::Mutex;

use crate::conversion::ProxyView;
use crate::engine::Materialized;
use crate::error::LinkError;
use crate::extensions::ExtensionSet;
use crate::generator::AdapterDescription;
use crate::linker::Shared;
use crate::repository::Specialization;

/// Index of a descriptor in the repository arena.
///
/// Two ids are reserved: [`ProxyId::NONE`] for types that need no adapter
/// and [`ProxyId::INVALID`] for types that cannot cross the boundary. Each is
/// its own inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyId(u32);

impl ProxyId {
	pub const NONE: Self = Self(0);
	pub const INVALID: Self = Self(1);

	pub(crate) fn from_index(index: usize) -> Self {
		Self(index as u32)
	}

	#[inline]
	pub fn index(self) -> usize {
		self.0 as usize
	}

	#[inline]
	pub fn is_sentinel(self) -> bool {
		self.0 <= Self::INVALID.0
	}
}

impl fmt::Display for ProxyId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match *self {
			Self::NONE => f.write_str("proxy#none"),
			Self::INVALID => f.write_str("proxy#invalid"),
			Self(n) => write!(f, "proxy#{n}"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
	New,
	/// Adapter description known, including `all_implemented`.
	GeneratorBuilt,
	/// Constructor and extractor available.
	Materialized,
	/// Dependency closure materialized and checked.
	Validated,
	/// Service instance created.
	Instantiated,
}

pub(crate) struct ProxyDescriptor {
	pub id: ProxyId,
	pub inverse: ProxyId,
	binding: Option<Arc<ResolvedBinding>>,
	specialization: Option<Specialization>,
	/// Implicit descriptor for a generic type adapting itself.
	pub mirrored: bool,
	invalid: bool,
	stage: Mutex<Stage>,
	generated: OnceLock<Result<Arc<AdapterDescription>, LinkError>>,
	materialized: OnceLock<Result<Materialized, LinkError>>,
	supported: OnceLock<bool>,
	usable: OnceLock<Result<bool, LinkError>>,
	service_target: OnceLock<Option<Value>>,
	instance: OnceLock<Option<ObjectRef>>,
}

impl ProxyDescriptor {
	fn empty(id: ProxyId, inverse: ProxyId, binding: Option<Arc<ResolvedBinding>>) -> Self {
		Self {
			id,
			inverse,
			binding,
			specialization: None,
			mirrored: false,
			invalid: false,
			stage: Mutex::new(Stage::New),
			generated: OnceLock::new(),
			materialized: OnceLock::new(),
			supported: OnceLock::new(),
			usable: OnceLock::new(),
			service_target: OnceLock::new(),
			instance: OnceLock::new(),
		}
	}

	pub fn sentinel(id: ProxyId) -> Self {
		Self {
			invalid: id == ProxyId::INVALID,
			..Self::empty(id, id, None)
		}
	}

	pub fn new(
		id: ProxyId,
		inverse: ProxyId,
		binding: Option<Arc<ResolvedBinding>>,
		specialization: Option<Specialization>,
		mirrored: bool,
	) -> Self {
		Self {
			specialization,
			mirrored,
			..Self::empty(id, inverse, binding)
		}
	}

	pub fn interface(&self) -> Option<&TypeName> {
		self.binding.as_ref().map(|b| &b.interface.name)
	}

	pub fn target(&self) -> Option<&TypeName> {
		self.binding.as_ref()?.target.as_ref().map(|t| &t.name)
	}

	pub fn is_service(&self) -> bool {
		self.binding.as_ref().is_some_and(|b| b.is_service())
	}

	pub fn is_internal(&self) -> bool {
		self.binding.as_ref().is_some_and(|b| b.is_internal())
	}

	pub fn is_invalid(&self) -> bool {
		self.invalid
	}

	pub fn stage(&self) -> Stage {
		*self.stage.lock()
	}

	pub fn view(&self) -> ProxyView {
		ProxyView {
			interface: self.interface().cloned(),
			target: self.target().cloned(),
			service: self.is_service(),
			invalid: self.invalid,
			unsupported: self.supported.get() == Some(&false),
			inverse: self.inverse,
		}
	}

	fn advance(stage: &mut Stage, to: Stage) {
		*stage = (*stage).max(to);
	}

	pub fn generate(&self, shared: &Shared) -> Result<Arc<AdapterDescription>, LinkError> {
		if let Some(done) = self.generated.get() {
			return done.clone();
		}
		let mut stage = self.stage.lock();
		self.generate_locked(shared, &mut stage)
	}

	fn generate_locked(&self, shared: &Shared, stage: &mut Stage) -> Result<Arc<AdapterDescription>, LinkError> {
		let done = self.generated.get_or_init(|| {
			let binding = self.binding.as_ref().ok_or(LinkError::Unbound(self.id))?;
			shared
				.generator()
				.generate(self.id, binding, self.specialization.as_deref())
				.map(Arc::new)
		});
		if done.is_ok() {
			Self::advance(stage, Stage::GeneratorBuilt);
		}
		done.clone()
	}

	pub fn materialize(&self, shared: &Shared) -> Result<Materialized, LinkError> {
		if let Some(done) = self.materialized.get() {
			return done.clone();
		}
		let mut stage = self.stage.lock();
		self.materialize_locked(shared, &mut stage)
	}

	fn materialize_locked(&self, shared: &Shared, stage: &mut Stage) -> Result<Materialized, LinkError> {
		if let Some(done) = self.materialized.get() {
			return done.clone();
		}
		let result = self
			.generate_locked(shared, stage)
			.and_then(|desc| shared.engine.materialize(desc, shared.runtime()));
		let done = self.materialized.get_or_init(|| result);
		if done.is_ok() {
			Self::advance(stage, Stage::Materialized);
		}
		done.clone()
	}

	/// True if the adapter implements every non-extension method.
	pub fn all_methods_implemented(&self, shared: &Shared) -> bool {
		if self.binding.is_none() {
			return false;
		}
		match self.generate(shared) {
			Ok(desc) => desc.all_implemented,
			Err(err) => {
				tracing::warn!(proxy = %self.id, %err, "adapter generation failed");
				false
			}
		}
	}

	/// True if this adapter and every known interface in its dependency
	/// closure are fully implemented. Computed once.
	pub fn is_supported(&self, shared: &Shared) -> bool {
		if let Some(supported) = self.supported.get() {
			return *supported;
		}
		let computed = self.compute_supported(shared);
		*self.supported.get_or_init(|| computed)
	}

	fn compute_supported(&self, shared: &Shared) -> bool {
		if !self.all_methods_implemented(shared) {
			return false;
		}
		let Some(interface) = self.interface() else {
			return false;
		};
		for dep in shared.dependencies(interface).iter().filter(|d| *d != interface) {
			let implemented = shared
				.descriptor_for(dep)
				.is_ok_and(|d| d.interface().is_some() && d.all_methods_implemented(shared));
			if !implemented {
				if shared.config.verbose {
					tracing::debug!(interface = %interface, dependency = %dep, "unsupported dependency");
				}
				return false;
			}
		}
		true
	}

	pub fn is_extension_supported(&self, shared: &Shared, ext: Extension) -> bool {
		self.generate(shared)
			.is_ok_and(|desc| desc.is_extension_supported(ext))
	}

	/// Materializes the whole dependency closure and checks that every proxy
	/// an adapter in it uses is part of it. `Ok(false)` if some dependency is
	/// invalid.
	pub fn validate(&self, shared: &Shared) -> Result<bool, LinkError> {
		if let Some(done) = self.usable.get() {
			return done.clone();
		}
		let result = self.compute_usable(shared);
		let done = self.usable.get_or_init(|| result).clone();
		if matches!(done, Ok(true)) {
			Self::advance(&mut self.stage.lock(), Stage::Validated);
		}
		done
	}

	fn compute_usable(&self, shared: &Shared) -> Result<bool, LinkError> {
		let Some(interface) = self.interface() else {
			return Ok(false);
		};
		self.materialize(shared)?;
		let closure = shared.dependencies(interface);

		let mut members = vec![shared.repository.descriptor(self.id)?];
		for dep in closure.iter().filter(|d| *d != interface) {
			let d = shared.descriptor_for(dep)?;
			if d.invalid {
				if shared.config.verbose {
					tracing::debug!(interface = %interface, dependency = %dep, "invalid dependency");
				}
				return Ok(false);
			}
			if d.binding.is_some() {
				d.materialize(shared)?;
				members.push(d);
			}
		}
		if self.mirrored {
			return Ok(true);
		}

		let mut undeclared: Vec<TypeName> = Vec::new();
		for member in &members {
			let desc = member.generate(shared)?;
			for used in desc.dependencies.keys() {
				let used = shared.repository.descriptor(*used)?;
				if used.mirrored {
					continue;
				}
				if let Some(name) = used.interface()
					&& !closure.contains(name)
					&& !undeclared.contains(name)
				{
					undeclared.push(name.clone());
				}
			}
		}
		if !undeclared.is_empty() {
			undeclared.sort();
			tracing::error!(interface = %interface, ?undeclared, "proxies used outside the dependency closure");
			return Err(LinkError::UndeclaredDependency {
				interface: interface.clone(),
				undeclared,
			});
		}
		Ok(true)
	}

	/// The service singleton. `None` for non-services, unusable services and
	/// services whose target refused construction.
	pub fn instance(&self, shared: &Shared) -> Result<Option<ObjectRef>, LinkError> {
		if let Some(done) = self.instance.get() {
			return Ok(done.clone());
		}
		if !self.is_service() {
			return Ok(None);
		}
		let usable = self.validate(shared)?;
		let mut stage = self.stage.lock();
		if let Some(done) = self.instance.get() {
			return Ok(done.clone());
		}
		let created = if usable {
			self.create_instance(shared, &mut stage)?
		} else {
			None
		};
		if created.is_some() {
			Self::advance(&mut stage, Stage::Instantiated);
		}
		Ok(self.instance.get_or_init(|| created).clone())
	}

	fn create_instance(&self, shared: &Shared, stage: &mut Stage) -> Result<Option<ObjectRef>, LinkError> {
		let materialized = self.materialize_locked(shared, stage)?;
		let Some(target) = self.service_target(shared)? else {
			return Ok(None);
		};
		Ok(Some((materialized.constructor)(target, ExtensionSet::new())))
	}

	/// `Some(None)` for target-less services, `None` if the target refused.
	fn service_target(&self, shared: &Shared) -> Result<Option<Option<Value>>, LinkError> {
		if let Some(done) = self.service_target.get() {
			return Ok(Some(done.clone()));
		}
		let Some(binding) = &self.binding else {
			return Ok(None);
		};
		let Some(target) = &binding.target else {
			return Ok(Some(self.service_target.get_or_init(|| None).clone()));
		};

		let universe = &shared.universe;
		let create = universe
			.static_functions(&target.name, "create")
			.into_iter()
			.find(|m| m.params.is_empty())
			.and_then(|m| m.body);
		let created = match create {
			Some(create) => create(&[]),
			None => universe.instantiate(&target.name).unwrap_or_else(|| {
				Err(Fault::service_not_available(format!(
					"{} has neither a create function nor a factory",
					target.name
				)))
			}),
		};
		match created {
			Ok(value) => Ok(Some(self.service_target.get_or_init(|| Some(value)).clone())),
			Err(Fault::ServiceNotAvailable(reason)) => {
				tracing::info!(interface = %binding.interface.name, %reason, "service not available");
				Ok(None)
			}
			Err(fault) => Err(LinkError::Instantiation {
				interface: binding.interface.name.clone(),
				fault,
			}),
		}
	}

	/// A fresh service adapter enabling `extensions`, sharing the singleton's
	/// target. `None` if any requested extension is unsupported.
	pub fn instance_with_extensions(
		&self,
		shared: &Shared,
		extensions: &[Extension],
	) -> Result<Option<ObjectRef>, LinkError> {
		if self.instance(shared)?.is_none() {
			return Ok(None);
		}
		let desc = self.generate(shared)?;
		if let Some(missing) = extensions.iter().find(|e| !desc.is_extension_supported(**e)) {
			if shared.config.verbose {
				tracing::debug!(interface = %desc.interface, extension = %missing, "extension not supported");
			}
			return Ok(None);
		}
		let materialized = self.materialize(shared)?;
		let target = self.service_target.get().cloned().flatten();
		let set: ExtensionSet = extensions.iter().copied().collect();
		Ok(Some((materialized.constructor)(target, set)))
	}
}

impl fmt::Debug for ProxyDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProxyDescriptor")
			.field("id", &self.id)
			.field("inverse", &self.inverse)
			.field("interface", &self.interface())
			.field("target", &self.target())
			.field("specialization", &self.specialization)
			.field("mirrored", &self.mirrored)
			.field("stage", &self.stage())
			.finish()
	}
}
