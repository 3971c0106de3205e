use std::sync::Arc;

use ferry_primitives::{DomainId, DomainTree, Markers, Modifiers, TypeDef, TypeKind, TypeUniverse};

use super::BindingRegistry;
use crate::binding::{Binding, Resolution, ResolvedBinding, StaticOverride};
use crate::error::RegistryError;

impl BindingRegistry {
	/// Resolves the binding keyed by `interface` as seen from `context`.
	///
	/// Names that are declared but unbound resolve to [`Resolution::Invalid`].
	/// The first resolution of a key is memoized.
	pub fn resolve(
		&self,
		universe: &TypeUniverse,
		interface: &str,
		context: DomainId,
	) -> Result<Resolution, RegistryError> {
		self.enter_domain(universe.domains(), context)?;
		let Some(binding) = self.tables.bindings.get(interface) else {
			return Ok(if self.tables.known.contains(interface) {
				Resolution::Invalid
			} else {
				Resolution::Absent
			});
		};
		if let Some(done) = self.resolved.lock().get(interface) {
			return Ok(done.clone());
		}
		let resolution = self.resolve_binding(universe, binding, context);
		Ok(self
			.resolved
			.lock()
			.entry(binding.interface.clone())
			.or_insert(resolution)
			.clone())
	}

	/// Resolves the binding whose target is `target`.
	pub fn resolve_by_target(
		&self,
		universe: &TypeUniverse,
		target: &str,
		context: DomainId,
	) -> Result<Resolution, RegistryError> {
		match self.tables.by_target.get(target) {
			Some(interface) => self.resolve(universe, interface.as_str(), context),
			None => {
				self.enter_domain(universe.domains(), context)?;
				Ok(Resolution::Absent)
			}
		}
	}

	/// Tracks the isolation domain resolutions happen in.
	///
	/// A descendant of the active domain widens it; an ancestor is already
	/// covered; an unrelated domain is a configuration error.
	pub(crate) fn enter_domain(
		&self,
		domains: &DomainTree,
		domain: DomainId,
	) -> Result<(), RegistryError> {
		let mut active = self.active_domain.lock();
		match *active {
			None => *active = Some(domain),
			Some(current) if domains.is_ancestor_or_self(domain, current) => {}
			Some(current) if domains.is_ancestor_or_self(current, domain) => {
				if self.verbose() {
					tracing::debug!(
						from = domains.name(current),
						to = domains.name(domain),
						"widening registry domain"
					);
				}
				*active = Some(domain);
			}
			Some(current) => {
				return Err(RegistryError::IncompatibleDomain {
					requested: domains.name(domain).to_string(),
					active: domains.name(current).to_string(),
				});
			}
		}
		Ok(())
	}

	fn resolve_binding(
		&self,
		universe: &TypeUniverse,
		binding: &Binding,
		context: DomainId,
	) -> Resolution {
		let verbose = self.verbose();
		let load_from = binding.module.unwrap_or(context);
		let name = binding.interface.as_str();

		let Some(interface) = universe
			.load(name, context)
			.or_else(|| universe.load(name, load_from))
		else {
			if verbose {
				tracing::debug!(interface = name, "interface not found");
			}
			return Resolution::Invalid;
		};
		if let Err(reason) = check_interface(universe.domains(), &interface, binding) {
			if verbose {
				tracing::debug!(interface = name, reason, "interface not eligible");
			}
			return Resolution::Invalid;
		}

		let target = if binding.targets.is_empty() {
			None
		} else {
			let Some(target) = binding
				.targets
				.iter()
				.find_map(|t| universe.load(t.as_str(), load_from))
			else {
				if verbose {
					tracing::debug!(interface = name, targets = ?binding.targets, "no target resolvable");
				}
				return Resolution::Invalid;
			};
			if universe.domains().requires_markers(target.domain)
				&& !target.markers.contains(Markers::PROVIDES)
			{
				if verbose {
					tracing::debug!(interface = name, target = %target.name, "target lacks PROVIDES marker");
				}
				return Resolution::Invalid;
			}
			Some(target)
		};

		let mut resolved =
			ResolvedBinding::new(interface, target, binding.kind, binding.flags, load_from);
		for s in &binding.statics {
			resolve_static(universe, &mut resolved, s, load_from, verbose);
		}
		if verbose {
			tracing::debug!(
				interface = name,
				target = ?resolved.target.as_ref().map(|t| &t.name),
				kind = %binding.kind,
				statics = resolved.static_count(),
				"binding resolved"
			);
		}
		Resolution::Resolved(Arc::new(resolved))
	}
}

/// Interfaces must be implementable and, in marked domains, carry markers.
fn check_interface(
	domains: &DomainTree,
	def: &TypeDef,
	binding: &Binding,
) -> Result<(), &'static str> {
	match def.kind {
		TypeKind::Enum => return Err("enum"),
		TypeKind::Record => return Err("record"),
		TypeKind::Annotation => return Err("annotation"),
		TypeKind::Interface | TypeKind::Class => {}
	}
	if def.modifiers.contains(Modifiers::FINAL) {
		return Err("final");
	}
	if def.modifiers.contains(Modifiers::SEALED) {
		return Err("sealed");
	}
	if domains.requires_markers(def.domain) {
		if !def.markers.contains(Markers::PROVIDED) {
			return Err("missing PROVIDED marker");
		}
		if binding.kind.is_service() && !def.markers.contains(Markers::SERVICE) {
			return Err("missing SERVICE marker");
		}
	}
	Ok(())
}

/// The first candidate type declaring a matching static function wins.
fn resolve_static(
	universe: &TypeUniverse,
	resolved: &mut ResolvedBinding,
	s: &StaticOverride,
	load_from: DomainId,
	verbose: bool,
) {
	for candidate in &s.candidates {
		let Some(def) = universe.load(candidate.as_str(), load_from) else {
			continue;
		};
		let functions: Vec<_> = def
			.declared_methods(&s.function)
			.filter(|m| m.is_static())
			.filter(|m| s.descriptor.as_ref().is_none_or(|d| &m.erased() == d))
			.cloned()
			.collect();
		if functions.is_empty() {
			continue;
		}
		for function in functions {
			resolved.add_static(s.method.clone(), def.name.clone(), function);
		}
		return;
	}
	if verbose {
		tracing::debug!(
			interface = %resolved.interface.name,
			method = %s.method,
			function = %s.function,
			candidates = ?s.candidates,
			"static override not resolvable, skipped"
		);
	}
}
