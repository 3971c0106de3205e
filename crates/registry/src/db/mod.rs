use std::sync::atomic::{AtomicBool, Ordering};

use ferry_primitives::{DomainId, TypeName};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::smallvec;

use crate::binding::{Binding, BindingFlags, BindingKind, Resolution, StaticOverride};
use crate::error::RegistryError;
use crate::parse::{Record, RecordKind, parse};

pub mod module;
pub mod plugin;
mod resolve;


/// Declarative binding tables. Cloned to stage all-or-nothing loads.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
	pub bindings: FxHashMap<TypeName, Binding>,
	/// Target name to the interface it stands behind.
	pub by_target: FxHashMap<TypeName, TypeName>,
	/// Client-declared interfaces with no binding.
	pub known: FxHashSet<TypeName>,
	pub version: Option<String>,
}

/// Registry of interface bindings.
///
/// Mutation happens during setup through `&mut self`; once shared, the
/// registry only resolves. Resolutions are memoized per interface name.
#[derive(Debug, Default)]
pub struct BindingRegistry {
	pub(crate) tables: Tables,
	pub(crate) modules: FxHashSet<DomainId>,
	verbose: AtomicBool,
	pub(crate) active_domain: Mutex<Option<DomainId>>,
	pub(crate) resolved: Mutex<FxHashMap<TypeName, Resolution>>,
}

impl BindingRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a registry from the line-oriented text format.
	pub fn from_text(text: &str) -> Result<Self, RegistryError> {
		let mut registry = Self::new();
		registry.load_text(text)?;
		Ok(registry)
	}

	/// Applies every record in `text`, or none of them.
	///
	/// Returns the number of records applied.
	pub fn load_text(&mut self, text: &str) -> Result<usize, RegistryError> {
		let records = parse(text)?;
		let mut staged = self.tables.clone();
		for record in &records {
			staged
				.apply(record)
				.map_err(|source| RegistryError::AtLine {
					line: record.line(),
					source: Box::new(source),
				})?;
		}
		self.tables = staged;
		self.resolved.get_mut().clear();
		if self.verbose() {
			tracing::debug!(
				records = records.len(),
				bindings = self.tables.bindings.len(),
				version = self.tables.version.as_deref().unwrap_or("-"),
				"registry text loaded"
			);
		}
		Ok(records.len())
	}

	/// Adds one binding, rejecting conflicts with what is already registered.
	pub fn insert(&mut self, binding: Binding) -> Result<(), RegistryError> {
		self.resolved.get_mut().remove(&binding.interface);
		self.tables.insert(binding)
	}

	/// Adds `bindings` as one unit: all of them, or none on error.
	pub fn insert_all<I>(&mut self, bindings: I) -> Result<(), RegistryError>
	where
		I: IntoIterator<Item = Binding>,
	{
		let mut staged = self.tables.clone();
		for binding in bindings {
			self.resolved.get_mut().remove(&binding.interface);
			staged.insert(binding)?;
		}
		self.tables = staged;
		Ok(())
	}

	/// Maps `method` of the binding keyed by `key` onto a static function.
	pub fn add_static_override(
		&mut self,
		key: &str,
		method: &str,
		target: &str,
		function: &str,
	) -> Result<(), RegistryError> {
		let binding = self
			.tables
			.bindings
			.get_mut(key)
			.ok_or_else(|| RegistryError::UnknownBinding(key.to_string()))?;
		merge_static(
			binding,
			StaticOverride {
				method: method.into(),
				function: function.into(),
				candidates: smallvec![TypeName::from(target)],
				descriptor: None,
			},
		)?;
		self.resolved.get_mut().remove(key);
		Ok(())
	}

	/// Records interfaces the client side declares even without a binding.
	pub fn add_known_interfaces<I, N>(&mut self, names: I)
	where
		I: IntoIterator<Item = N>,
		N: Into<TypeName>,
	{
		self.tables.known.extend(names.into_iter().map(Into::into));
	}

	pub fn binding(&self, interface: &str) -> Option<&Binding> {
		self.tables.bindings.get(interface)
	}

	pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
		self.tables.bindings.values()
	}

	pub fn len(&self) -> usize {
		self.tables.bindings.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tables.bindings.is_empty()
	}

	/// Interface a target type stands behind, if any.
	pub fn interface_by_target(&self, target: &str) -> Option<&TypeName> {
		self.tables.by_target.get(target)
	}

	/// Whether `name` is a registered or declared interface.
	pub fn is_known_interface(&self, name: &str) -> bool {
		self.tables.bindings.contains_key(name) || self.tables.known.contains(name)
	}

	pub fn version(&self) -> Option<&str> {
		self.tables.version.as_deref()
	}

	pub fn set_verbose(&self, verbose: bool) {
		self.verbose.store(verbose, Ordering::Relaxed);
	}

	#[inline]
	pub fn verbose(&self) -> bool {
		self.verbose.load(Ordering::Relaxed)
	}

	/// Isolation domain resolutions currently happen in.
	pub fn active_domain(&self) -> Option<DomainId> {
		*self.active_domain.lock()
	}
}

impl Tables {
	fn apply(&mut self, record: &Record) -> Result<(), RegistryError> {
		match record {
			Record::Version { version, .. } => {
				if let Some(prev) = &self.version
					&& prev != version
				{
					return Err(RegistryError::Conflict {
						key: "VERSION".into(),
						existing: prev.clone(),
						new: version.clone(),
					});
				}
				self.version = Some(version.clone());
				Ok(())
			}
			Record::Type {
				interface,
				target,
				kind,
				internal,
				..
			} => {
				let flags = if *internal {
					BindingFlags::INTERNAL
				} else {
					BindingFlags::empty()
				};
				let targets = target.iter().cloned();
				let binding_kind = match kind {
					RecordKind::Proxy => BindingKind::Proxy,
					RecordKind::Service => BindingKind::Service,
					RecordKind::ClientProxy => BindingKind::ClientProxy,
					RecordKind::InternalService => BindingKind::InternalService,
					RecordKind::TwoWay => {
						let Some(target) = target else {
							return Err(RegistryError::TargetCount {
								kind: "TWO_WAY",
								interface: interface.to_string(),
								expected: "exactly one target",
							});
						};
						let flags = flags | BindingFlags::TWO_WAY;
						self.insert(
							Binding::new(target.clone(), [interface.clone()], BindingKind::ClientProxy)
								.with_flags(flags),
						)?;
						return self.insert(
							Binding::new(interface.clone(), [target.clone()], BindingKind::Proxy)
								.with_flags(flags),
						);
					}
				};
				self.insert(Binding::new(interface.clone(), targets, binding_kind).with_flags(flags))
			}
			Record::Static {
				target,
				function,
				descriptor,
				interface,
				method,
				internal,
				..
			} => {
				if !self.bindings.contains_key(interface) {
					let kind = if *internal {
						BindingKind::InternalService
					} else {
						BindingKind::Service
					};
					self.insert(
						Binding::new(interface.clone(), [], kind).with_flags(BindingFlags::IMPLICIT),
					)?;
				}
				let Some(binding) = self.bindings.get_mut(interface) else {
					return Err(RegistryError::UnknownBinding(interface.to_string()));
				};
				merge_static(
					binding,
					StaticOverride {
						method: method.as_str().into(),
						function: function.as_str().into(),
						candidates: smallvec![target.clone()],
						descriptor: Some(descriptor.clone()),
					},
				)
			}
		}
	}

	pub(crate) fn insert(&mut self, mut binding: Binding) -> Result<(), RegistryError> {
		let takes_over = self.check(&binding)?;
		if !takes_over && let Some(existing) = self.bindings.get_mut(&binding.interface) {
			for s in binding.statics {
				merge_static(existing, s)?;
			}
			return Ok(());
		}

		let mut statics = Vec::new();
		if takes_over && let Some(implicit) = self.bindings.remove(&binding.interface) {
			statics = implicit.statics;
		}
		statics.append(&mut binding.statics);
		if binding.has_inverse() {
			for target in &binding.targets {
				self.by_target
					.insert(target.clone(), binding.interface.clone());
			}
		}
		let key = binding.interface.clone();
		let slot = self.bindings.entry(key).or_insert(binding);
		for s in statics {
			merge_static(slot, s)?;
		}
		Ok(())
	}

	/// Validates `binding` against the tables without changing them.
	///
	/// Returns whether it replaces an implicit binding opened by a STATIC
	/// record. An identical binding that is already present passes.
	fn check(&self, binding: &Binding) -> Result<bool, RegistryError> {
		if matches!(binding.kind, BindingKind::Proxy | BindingKind::ClientProxy)
			&& binding.targets.is_empty()
		{
			return Err(RegistryError::TargetCount {
				kind: binding.kind.as_str(),
				interface: binding.interface.to_string(),
				expected: "at least one target",
			});
		}

		let mut takes_over = false;
		if let Some(existing) = self.bindings.get(&binding.interface) {
			takes_over = existing.is_implicit() && !binding.is_implicit();
			if !takes_over {
				if !existing.same_mapping(binding) {
					return Err(RegistryError::Conflict {
						key: binding.interface.to_string(),
						existing: existing.describe(),
						new: binding.describe(),
					});
				}
				return Ok(false);
			}
		}
		if binding.is_implicit() {
			return Ok(false);
		}

		if binding.has_inverse() {
			for target in &binding.targets {
				if let Some(owner) = self.by_target.get(target)
					&& owner != &binding.interface
				{
					return Err(RegistryError::Conflict {
						key: target.to_string(),
						existing: owner.to_string(),
						new: binding.interface.to_string(),
					});
				}
			}
		}
		if let Some(owner) = self.owner_of(&binding.interface)
			&& binding.targets.as_slice() != std::slice::from_ref(&owner.interface)
		{
			return Err(RegistryError::Conflict {
				key: binding.interface.to_string(),
				existing: owner.describe(),
				new: binding.describe(),
			});
		}
		self.check_reverse(binding)?;
		Ok(takes_over)
	}

	/// Binding that already lists `name` as one of its targets.
	fn owner_of(&self, name: &TypeName) -> Option<&Binding> {
		self.bindings
			.values()
			.find(|b| &b.interface != name && b.targets.contains(name))
	}

	/// A binding and the binding keyed by its sole target must mirror each
	/// other consistently.
	fn check_reverse(&self, binding: &Binding) -> Result<(), RegistryError> {
		let [target] = binding.targets.as_slice() else {
			return Ok(());
		};
		let Some(reverse) = self.bindings.get(target) else {
			return Ok(());
		};
		if reverse.is_implicit() {
			return Ok(());
		}
		let maps_back = reverse.targets.len() == 1 && reverse.targets[0] == binding.interface;
		let two_way = binding.flags.contains(BindingFlags::TWO_WAY);
		if two_way || reverse.flags.contains(BindingFlags::TWO_WAY) {
			if !maps_back || !two_way || !reverse.flags.contains(BindingFlags::TWO_WAY) {
				let actual: Vec<_> = reverse.targets.iter().map(TypeName::as_str).collect();
				return Err(RegistryError::InvalidTwoWay {
					interface: binding.interface.to_string(),
					target: target.to_string(),
					actual: format!("[{}]", actual.join(", ")),
				});
			}
			return Ok(());
		}
		if !maps_back && !reverse.targets.is_empty() {
			return Err(RegistryError::Conflict {
				key: target.to_string(),
				existing: reverse.describe(),
				new: binding.describe(),
			});
		}
		if maps_back && reverse.kind != binding.kind {
			return Err(RegistryError::KindMismatch {
				interface: binding.interface.to_string(),
				kind: binding.kind.as_str(),
				reverse: reverse.interface.to_string(),
				reverse_kind: reverse.kind.as_str(),
			});
		}
		Ok(())
	}
}

/// Adds `s` to the overrides of `binding`.
///
/// Records pin a descriptor and may not remap a slot. Unpinned overrides for
/// the same method stack up as fallbacks, tried in registration order.
pub(crate) fn merge_static(binding: &mut Binding, s: StaticOverride) -> Result<(), RegistryError> {
	if let Some(prev) = binding.statics.iter_mut().find(|p| p.same_slot(&s)) {
		if *prev == s {
			return Ok(());
		}
		if s.descriptor.is_some() {
			return Err(RegistryError::Conflict {
				key: format!("{}.{}", binding.interface, s.method),
				existing: prev.describe(),
				new: s.describe(),
			});
		}
		if prev.function == s.function {
			for candidate in s.candidates {
				if !prev.candidates.contains(&candidate) {
					prev.candidates.push(candidate);
				}
			}
			return Ok(());
		}
	}
	binding.statics.push(s);
	Ok(())
}
