use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use ferry_primitives::{DomainId, MethodDef, MethodType, TypeDef, TypeName};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// How a binding participates at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
	/// Adapter implements the interface over a provider target.
	Proxy,
	/// Singleton adapter handed out by service lookup.
	Service,
	/// Adapter implements a provider-side interface over a client object.
	ClientProxy,
	/// Service only reachable from provider code.
	InternalService,
}

impl BindingKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Proxy => "PROXY",
			Self::Service => "SERVICE",
			Self::ClientProxy => "CLIENT_PROXY",
			Self::InternalService => "INTERNAL_SERVICE",
		}
	}

	#[inline]
	pub fn is_service(self) -> bool {
		matches!(self, Self::Service | Self::InternalService)
	}
}

impl fmt::Display for BindingKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct BindingFlags: u8 {
		/// Not reachable through public service lookup.
		const INTERNAL = 1 << 0;
		/// One half of a dedicated two-way pair.
		const TWO_WAY = 1 << 1;
		/// Opened by a STATIC record; the first TYPE record takes it over.
		const IMPLICIT = 1 << 2;
	}
}

/// An explicit mapping of an interface method onto a static function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticOverride {
	/// Interface method being overridden.
	pub method: Arc<str>,
	/// Name of the static function on the provider side.
	pub function: Arc<str>,
	/// Types that may declare the function; the first one that resolves wins.
	pub candidates: SmallVec<[TypeName; 1]>,
	/// Exact signature, when the record pins one.
	pub descriptor: Option<MethodType>,
}

impl StaticOverride {
	/// Whether two overrides claim the same interface method slot.
	pub(crate) fn same_slot(&self, other: &StaticOverride) -> bool {
		self.method == other.method && self.descriptor == other.descriptor
	}

	pub(crate) fn describe(&self) -> String {
		let candidates: Vec<_> = self.candidates.iter().map(TypeName::as_str).collect();
		format!("[{}]::{}", candidates.join(", "), self.function)
	}
}

/// Declarative mapping of one interface to its provider targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
	pub interface: TypeName,
	pub targets: SmallVec<[TypeName; 1]>,
	pub kind: BindingKind,
	pub flags: BindingFlags,
	pub statics: Vec<StaticOverride>,
	/// Module that registered the binding; targets are loaded from it.
	pub module: Option<DomainId>,
}

impl Binding {
	pub fn new(
		interface: impl Into<TypeName>,
		targets: impl IntoIterator<Item = TypeName>,
		kind: BindingKind,
	) -> Self {
		Self {
			interface: interface.into(),
			targets: targets.into_iter().collect(),
			kind,
			flags: BindingFlags::empty(),
			statics: Vec::new(),
			module: None,
		}
	}

	pub fn with_flags(mut self, flags: BindingFlags) -> Self {
		self.flags |= flags;
		self
	}

	pub fn in_module(mut self, module: DomainId) -> Self {
		self.module = Some(module);
		self
	}

	#[inline]
	pub fn is_implicit(&self) -> bool {
		self.flags.contains(BindingFlags::IMPLICIT)
	}

	/// Whether targets of this binding map back to its interface.
	///
	/// Service targets are never seen as values, so they have no inverse.
	#[inline]
	pub fn has_inverse(&self) -> bool {
		!self.kind.is_service()
	}

	/// Same mapping, ignoring static overrides.
	pub(crate) fn same_mapping(&self, other: &Binding) -> bool {
		self.interface == other.interface
			&& self.targets == other.targets
			&& self.kind == other.kind
			&& self.flags == other.flags
			&& self.module == other.module
	}

	pub(crate) fn describe(&self) -> String {
		let targets: Vec<_> = self.targets.iter().map(TypeName::as_str).collect();
		format!("{} -> [{}] {}", self.interface, targets.join(", "), self.kind)
	}
}

/// A static function selected for an interface method.
#[derive(Debug, Clone)]
pub struct ResolvedStatic {
	pub declaring: TypeName,
	pub function: MethodDef,
}

/// A binding whose names have been resolved to declared types.
#[derive(Debug)]
pub struct ResolvedBinding {
	pub interface: Arc<TypeDef>,
	pub target: Option<Arc<TypeDef>>,
	pub kind: BindingKind,
	pub flags: BindingFlags,
	/// Domain the targets were resolved from.
	pub domain: DomainId,
	statics: FxHashMap<(Arc<str>, MethodType), ResolvedStatic>,
}

impl ResolvedBinding {
	pub fn new(
		interface: Arc<TypeDef>,
		target: Option<Arc<TypeDef>>,
		kind: BindingKind,
		flags: BindingFlags,
		domain: DomainId,
	) -> Self {
		Self {
			interface,
			target,
			kind,
			flags,
			domain,
			statics: FxHashMap::default(),
		}
	}

	/// A type standing in as both interface and target of itself.
	pub fn mirrored(def: Arc<TypeDef>) -> Self {
		let domain = def.domain;
		Self::new(def.clone(), Some(def), BindingKind::Proxy, BindingFlags::empty(), domain)
	}

	pub(crate) fn add_static(&mut self, method: Arc<str>, declaring: TypeName, function: MethodDef) {
		let key = (method, function.erased());
		self.statics
			.entry(key)
			.or_insert(ResolvedStatic { declaring, function });
	}

	#[inline]
	pub fn is_service(&self) -> bool {
		self.kind.is_service()
	}

	#[inline]
	pub fn is_internal(&self) -> bool {
		self.flags.contains(BindingFlags::INTERNAL) || self.kind == BindingKind::InternalService
	}

	/// Static override for `method` whose provider-side signature is `mt`.
	pub fn static_override(&self, method: &str, mt: &MethodType) -> Option<&ResolvedStatic> {
		self.statics.get(&(Arc::from(method), mt.clone()))
	}

	pub fn static_count(&self) -> usize {
		self.statics.len()
	}
}

/// Outcome of resolving a registry key.
#[derive(Debug, Clone)]
pub enum Resolution {
	/// Nothing is registered under the key.
	Absent,
	/// Registered, but unusable: unresolvable, ineligible, or unmarked.
	Invalid,
	Resolved(Arc<ResolvedBinding>),
}

impl Resolution {
	pub fn resolved(&self) -> Option<&Arc<ResolvedBinding>> {
		match self {
			Self::Resolved(r) => Some(r),
			_ => None,
		}
	}

	#[inline]
	pub fn is_invalid(&self) -> bool {
		matches!(self, Self::Invalid)
	}

	#[inline]
	pub fn is_absent(&self) -> bool {
		matches!(self, Self::Absent)
	}
}
