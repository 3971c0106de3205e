//! Adapter descriptions.
//!
//! For every instance method of a proxy interface the generator decides how
//! the adapter answers it: delegate to the target instance, delegate to a
//! static override, run the interface's default body, or fail with
//! [`Fault::Unimplemented`](ferry_primitives::Fault::Unimplemented).
//! Instance delegation wins over static overrides.

use std::sync::Arc;

use ferry_primitives::{DomainId, Extension, MethodDef, MethodType, NativeFn, TypeDef, TypeName, TypeUniverse};
use ferry_registry::ResolvedBinding;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::conversion::{Conversion, MappingContext, MethodMapping, ProxyLookup};
use crate::error::LinkError;
use crate::proxy::ProxyId;


/// Everything needed to materialize one adapter class.
#[derive(Debug)]
pub struct AdapterDescription {
	pub proxy: ProxyId,
	pub interface: TypeName,
	pub target: Option<TypeName>,
	pub service: bool,
	pub deprecated: bool,
	/// Domain the adapter is generated into.
	pub domain: DomainId,
	pub methods: Vec<AdapterMethod>,
	/// False if some non-extension method has no implementation.
	pub all_implemented: bool,
	/// Proxies used by conversions, with whether a non-extension method
	/// needs them.
	pub dependencies: FxHashMap<ProxyId, bool>,
	/// Extensions seen on interface methods and whether all of their methods
	/// are implemented.
	pub extensions: FxHashMap<Extension, bool>,
}

impl AdapterDescription {
	pub fn method(&self, name: &str, arity: usize) -> Option<&AdapterMethod> {
		self.methods
			.iter()
			.find(|m| &*m.name == name && m.client_type.arity() == arity)
	}

	pub fn is_extension_supported(&self, ext: Extension) -> bool {
		self.extensions.get(&ext).copied().unwrap_or(false)
	}

	/// Count of methods answered by delegation.
	pub fn delegated(&self) -> usize {
		self.methods
			.iter()
			.filter(|m| matches!(m.body, MethodBody::Delegate { .. }))
			.count()
	}
}

#[derive(Debug)]
pub struct AdapterMethod {
	pub name: Arc<str>,
	/// Erased signature as declared on the interface.
	pub client_type: MethodType,
	pub mapping: MethodMapping,
	pub body: MethodBody,
	pub extension: Option<Extension>,
	pub deprecated: bool,
}

pub enum MethodBody {
	Delegate { call: CallTarget, linkage: Linkage },
	/// The interface's own default body, called with the adapter as receiver.
	Default(NativeFn),
	Unimplemented,
}

impl std::fmt::Debug for MethodBody {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Delegate { call, linkage } => f
				.debug_struct("Delegate")
				.field("call", call)
				.field("linkage", linkage)
				.finish(),
			Self::Default(_) => f.write_str("Default"),
			Self::Unimplemented => f.write_str("Unimplemented"),
		}
	}
}

#[derive(Debug, Clone)]
pub enum CallTarget {
	/// Virtual call on the adapter's target.
	Instance {
		declaring: TypeName,
		name: Arc<str>,
		ty: MethodType,
	},
	/// Static override, called with the converted arguments and no receiver.
	Static { declaring: TypeName, function: MethodDef },
}

impl CallTarget {
	pub fn declaring(&self) -> &TypeName {
		match self {
			Self::Instance { declaring, .. } | Self::Static { declaring, .. } => declaring,
		}
	}
}

/// How a delegated call reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
	/// The declaring type is visible from the adapter's domain.
	Direct,
	/// Late-bound through the bridge table.
	Bridged(BridgeKey),
}

/// Slot of a late-bound call in the bridge table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BridgeKey {
	pub proxy: ProxyId,
	pub slot: u32,
}

pub(crate) struct AdapterGenerator<'a> {
	lookup: &'a dyn ProxyLookup,
	universe: &'a TypeUniverse,
	extensions: bool,
	verbose: bool,
}

impl<'a> AdapterGenerator<'a> {
	pub fn new(lookup: &'a dyn ProxyLookup, universe: &'a TypeUniverse, extensions: bool, verbose: bool) -> Self {
		Self {
			lookup,
			universe,
			extensions,
			verbose,
		}
	}

	pub fn generate(
		&self,
		proxy: ProxyId,
		binding: &ResolvedBinding,
		specialization: Option<&[Conversion]>,
	) -> Result<AdapterDescription, LinkError> {
		let interface = &binding.interface;
		let target = binding.target.as_deref();
		let domain = match target {
			Some(t) if self.universe.can_access_type(t.domain, &interface.name) => t.domain,
			_ => interface.domain,
		};

		let mut ctx = MappingContext::new(self.lookup, self.universe, self.extensions);
		ctx.init_type_parameters(interface, specialization)?;

		let mut desc = AdapterDescription {
			proxy,
			interface: interface.name.clone(),
			target: target.map(|t| t.name.clone()),
			service: binding.is_service(),
			deprecated: interface.is_deprecated(),
			domain,
			methods: Vec::new(),
			all_implemented: true,
			dependencies: FxHashMap::default(),
			extensions: FxHashMap::default(),
		};
		let mut slot = 0;

		for method in self.interface_methods(interface) {
			let mapping = ctx.method_mapping(&method)?;
			let extension = method.extension.filter(|_| self.extensions);
			let call = if mapping.query.valid {
				self.find_call(binding, target, &method, &mapping)
			} else {
				if self.verbose {
					tracing::debug!(
						interface = %interface.name,
						method = &*method.name,
						%mapping,
						"method cannot cross the boundary"
					);
				}
				None
			};

			let body = match call {
				Some(call) => {
					let linkage = if self.universe.can_access_type(domain, call.declaring()) {
						Linkage::Direct
					} else {
						let key = BridgeKey { proxy, slot };
						slot += 1;
						Linkage::Bridged(key)
					};
					if let Some(ext) = extension {
						desc.extensions.entry(ext).or_insert(true);
					}
					for used in mapping.proxies() {
						let required = desc.dependencies.entry(used).or_insert(false);
						*required |= extension.is_none();
					}
					MethodBody::Delegate { call, linkage }
				}
				None => match (&method.body, extension) {
					(Some(body), _) if !method.is_abstract() => MethodBody::Default(body.clone()),
					(_, Some(ext)) => {
						desc.extensions.insert(ext, false);
						MethodBody::Unimplemented
					}
					(_, None) => {
						desc.all_implemented = false;
						if self.verbose {
							tracing::debug!(
								interface = %interface.name,
								method = &*method.name,
								signature = %mapping.ty,
								"no implementation found"
							);
						}
						MethodBody::Unimplemented
					}
				},
			};

			desc.methods.push(AdapterMethod {
				name: method.name.clone(),
				client_type: method.erased(),
				mapping,
				body,
				extension,
				deprecated: method.is_deprecated(),
			});
		}

		if self.verbose {
			tracing::debug!(
				interface = %desc.interface,
				target = ?desc.target.as_ref().map(TypeName::as_str),
				methods = desc.methods.len(),
				delegated = desc.delegated(),
				bridged = slot,
				all_implemented = desc.all_implemented,
				"adapter generated"
			);
		}
		Ok(desc)
	}

	/// Instance methods of `interface` and its supertypes, each signature once.
	fn interface_methods(&self, interface: &TypeDef) -> Vec<MethodDef> {
		let mut seen = FxHashSet::default();
		let mut out = Vec::new();
		for def in self.universe.hierarchy(&interface.name) {
			for m in def.methods.iter().filter(|m| !m.is_static()) {
				if seen.insert((m.name.clone(), m.erased())) {
					out.push(m.clone());
				}
			}
		}
		out
	}

	fn find_call(
		&self,
		binding: &ResolvedBinding,
		target: Option<&TypeDef>,
		method: &MethodDef,
		mapping: &MethodMapping,
	) -> Option<CallTarget> {
		if let Some(target) = target {
			// a type adapting itself keeps the signature it declares
			let ty = if target.name == binding.interface.name {
				method.erased()
			} else {
				mapping.ty.clone()
			};
			if let Some((declaring, _)) = self.universe.find_method(&target.name, &method.name, &ty, false) {
				return Some(CallTarget::Instance {
					declaring,
					name: method.name.clone(),
					ty,
				});
			}
		}
		let found = binding.static_override(&method.name, &mapping.ty)?;
		Some(CallTarget::Static {
			declaring: found.declaring.clone(),
			function: found.function.clone(),
		})
	}
}
