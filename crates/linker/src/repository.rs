//! Canonical descriptors per `(type name, specialization)`.
//!
//! Descriptors are created in inverse pairs and never replaced: once a key
//! maps to an id, every later lookup of that key sees the same id.

use std::sync::Arc;

use ferry_primitives::{DomainId, TypeName, TypeUniverse};
use ferry_registry::{BindingRegistry, Resolution, ResolvedBinding};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::conversion::Conversion;
use crate::error::LinkError;
use crate::proxy::{ProxyDescriptor, ProxyId};

/// Per-type-argument conversions of a generic proxy. Absent when every
/// argument maps to identity.
pub type Specialization = Arc<[Conversion]>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyKey {
	pub name: TypeName,
	pub specialization: Option<Specialization>,
}

impl ProxyKey {
	pub fn new(name: TypeName, specialization: Option<Specialization>) -> Self {
		Self { name, specialization }
	}
}

struct State {
	keys: FxHashMap<ProxyKey, ProxyId>,
	arena: Vec<Arc<ProxyDescriptor>>,
}

impl State {
	fn push_pair(
		&mut self,
		forward: (Option<Arc<ResolvedBinding>>, Option<Specialization>),
		backward: (Option<Arc<ResolvedBinding>>, Option<Specialization>),
		mirrored: bool,
	) -> (ProxyId, ProxyId) {
		let id = ProxyId::from_index(self.arena.len());
		let inverse = ProxyId::from_index(self.arena.len() + 1);
		self.arena
			.push(Arc::new(ProxyDescriptor::new(id, inverse, forward.0, forward.1, mirrored)));
		self.arena
			.push(Arc::new(ProxyDescriptor::new(inverse, id, backward.0, backward.1, mirrored)));
		(id, inverse)
	}
}

pub struct ProxyRepository {
	state: RwLock<State>,
}

impl Default for ProxyRepository {
	fn default() -> Self {
		Self::new()
	}
}

impl ProxyRepository {
	pub fn new() -> Self {
		let arena = vec![
			Arc::new(ProxyDescriptor::sentinel(ProxyId::NONE)),
			Arc::new(ProxyDescriptor::sentinel(ProxyId::INVALID)),
		];
		Self {
			state: RwLock::new(State {
				keys: FxHashMap::default(),
				arena,
			}),
		}
	}

	/// Number of descriptors, sentinels included.
	pub fn len(&self) -> usize {
		self.state.read().arena.len()
	}

	pub fn is_empty(&self) -> bool {
		self.state.read().arena.is_empty()
	}

	pub(crate) fn descriptor(&self, id: ProxyId) -> Result<Arc<ProxyDescriptor>, LinkError> {
		self.state
			.read()
			.arena
			.get(id.index())
			.cloned()
			.ok_or(LinkError::UnknownProxy(id))
	}

	/// Id of the descriptor for `name` under `specialization`, creating the
	/// descriptor pair on first lookup.
	pub(crate) fn get(
		&self,
		universe: &TypeUniverse,
		registry: &BindingRegistry,
		context: DomainId,
		name: &TypeName,
		specialization: Option<Specialization>,
	) -> Result<ProxyId, LinkError> {
		let key = ProxyKey::new(name.clone(), specialization);
		if let Some(id) = self.state.read().keys.get(&key) {
			return Ok(*id);
		}

		let by_interface = registry.resolve(universe, name.as_str(), context)?;
		let by_target = registry.resolve_by_target(universe, name.as_str(), context)?;
		let inverse_spec = key
			.specialization
			.as_ref()
			.map(|spec| spec.iter().map(Conversion::inverse).collect::<Specialization>());

		let mut state = self.state.write();
		if let Some(id) = state.keys.get(&key) {
			return Ok(*id);
		}
		let id = match (&by_interface, &by_target) {
			(Resolution::Invalid, _) | (_, Resolution::Invalid) => ProxyId::INVALID,
			(Resolution::Absent, Resolution::Absent) => {
				let mirrored = key.specialization != inverse_spec;
				match universe.load(name.as_str(), context) {
					Some(def) if mirrored => {
						let binding = Arc::new(ResolvedBinding::mirrored(def));
						let (id, inverse) = state.push_pair(
							(Some(binding.clone()), key.specialization.clone()),
							(Some(binding), inverse_spec.clone()),
							true,
						);
						state
							.keys
							.insert(ProxyKey::new(name.clone(), inverse_spec), inverse);
						tracing::debug!(name = %name, %id, "implicit generic proxy");
						id
					}
					_ => ProxyId::NONE,
				}
			}
			_ => {
				let forward = by_interface.resolved().cloned();
				let backward = by_target.resolved().cloned();
				let inverse_name = backward.as_ref().map(|b| b.interface.name.clone()).or_else(|| {
					forward
						.as_ref()
						.filter(|b| !b.is_service())
						.and_then(|b| b.target.as_ref())
						.map(|t| t.name.clone())
				});
				let inverse_key = inverse_name.map(|n| ProxyKey::new(n, inverse_spec.clone()));
				match inverse_key.as_ref().and_then(|k| state.keys.get(k)) {
					// the pair already exists from the other side
					Some(inverse) => state.arena[inverse.index()].inverse,
					None => {
						let (id, inverse) = state.push_pair(
							(forward, key.specialization.clone()),
							(backward, inverse_spec),
							false,
						);
						if let Some(inverse_key) = inverse_key {
							state.keys.insert(inverse_key, inverse);
						}
						id
					}
				}
			}
		};
		state.keys.insert(key, id);
		Ok(id)
	}
}
