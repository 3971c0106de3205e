//! Transitive boundary-relevant dependencies of a type.
//!
//! A type's dependencies are the known interfaces reachable from it through
//! supertypes, field types, method signatures and target-to-interface hops.
//! Only relevant types (inside the API namespace, or known interfaces) are
//! walked. Strongly connected types share one published set.

use std::sync::Arc;

use ferry_primitives::TypeName;
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};


pub type TypeSet = FxHashSet<TypeName>;

/// The type graph the closure walks.
pub trait ClosureEnv {
	fn is_relevant(&self, name: &TypeName) -> bool;
	fn is_known_interface(&self, name: &TypeName) -> bool;
	/// Types mentioned by the declaration of `name`.
	fn usages(&self, name: &TypeName) -> Vec<TypeName>;
	/// Interface bound to `name` when `name` is a proxy target.
	fn interface_by_target(&self, name: &TypeName) -> Option<TypeName>;
}

/// Memoizing closure engine.
///
/// Published sets are immutable. Walks are serialized; lookups of published
/// sets are not.
#[derive(Default)]
pub struct DependencyClosure {
	published: RwLock<FxHashMap<TypeName, Arc<TypeSet>>>,
	walk: Mutex<()>,
}

impl DependencyClosure {
	pub fn new() -> Self {
		Self::default()
	}

	/// Dependencies of `root`, computing and publishing them on first use.
	///
	/// Irrelevant roots have no dependencies.
	pub fn dependencies(&self, root: &TypeName, env: &dyn ClosureEnv) -> Arc<TypeSet> {
		if let Some(set) = self.published.read().get(root) {
			return set.clone();
		}
		let _walk = self.walk.lock();
		if let Some(set) = self.published.read().get(root) {
			return set.clone();
		}
		let mut walk = Walk {
			env,
			published: &self.published,
			nodes: Vec::new(),
			cycles: Vec::new(),
		};
		walk.step(None, root);
		tracing::debug!(root = %root, visited = walk.nodes.len(), "dependency closure computed");
		self.published.read().get(root).cloned().unwrap_or_default()
	}

	/// Published set for `name`, without computing anything.
	pub fn published(&self, name: &TypeName) -> Option<Arc<TypeSet>> {
		self.published.read().get(name).cloned()
	}
}

struct Node {
	ty: TypeName,
	parent: Option<usize>,
	cycle: usize,
}

/// A group of mutually reachable types, published together by its origin.
struct Cycle {
	origin: TypeName,
	members: TypeSet,
	deps: TypeSet,
}

struct Walk<'a> {
	env: &'a dyn ClosureEnv,
	published: &'a RwLock<FxHashMap<TypeName, Arc<TypeSet>>>,
	nodes: Vec<Node>,
	cycles: Vec<Cycle>,
}

impl Walk<'_> {
	fn step(&mut self, parent: Option<usize>, ty: &TypeName) {
		if !self.env.is_relevant(ty) {
			return;
		}
		if let Some(parent) = parent
			&& self.merge_cycle(parent, ty).is_some()
		{
			return;
		}
		let cached = self.published.read().get(ty).cloned();
		if let Some(deps) = cached {
			if let Some(parent) = parent {
				let cycle = self.nodes[parent].cycle;
				self.cycles[cycle].deps.extend(deps.iter().cloned());
			}
			return;
		}

		let cycle = self.cycles.len();
		let mut fresh = Cycle {
			origin: ty.clone(),
			members: TypeSet::default(),
			deps: TypeSet::default(),
		};
		fresh.members.insert(ty.clone());
		if self.env.is_known_interface(ty) {
			fresh.deps.insert(ty.clone());
		}
		self.cycles.push(fresh);
		let node = self.nodes.len();
		self.nodes.push(Node {
			ty: ty.clone(),
			parent,
			cycle,
		});

		for usage in self.env.usages(ty) {
			self.step(Some(node), &usage);
		}
		if let Some(interface) = self.env.interface_by_target(ty) {
			self.step(Some(node), &interface);
		}

		let own = self.nodes[node].cycle;
		if let Some(parent) = parent {
			let parent_cycle = self.nodes[parent].cycle;
			if parent_cycle != own {
				let deps: Vec<_> = self.cycles[own].deps.iter().cloned().collect();
				self.cycles[parent_cycle].deps.extend(deps);
			}
		}
		if &self.cycles[own].origin == ty {
			let done = &self.cycles[own];
			let set = Arc::new(done.deps.clone());
			let mut published = self.published.write();
			for member in &done.members {
				published.insert(member.clone(), set.clone());
			}
		}
	}

	/// If `ty` is on the path ending at `node`, merges every cycle along the
	/// way into the one of the matching ancestor and returns it.
	fn merge_cycle(&mut self, node: usize, ty: &TypeName) -> Option<usize> {
		if &self.nodes[node].ty == ty {
			return Some(self.nodes[node].cycle);
		}
		let parent = self.nodes[node].parent?;
		let target = self.merge_cycle(parent, ty)?;
		let own = self.nodes[node].cycle;
		if own != target {
			let members = std::mem::take(&mut self.cycles[own].members);
			let deps = std::mem::take(&mut self.cycles[own].deps);
			let merged = &mut self.cycles[target];
			merged.members.extend(members);
			merged.deps.extend(deps);
			self.nodes[node].cycle = target;
		}
		Some(target)
	}
}
