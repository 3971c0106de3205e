use std::fmt;
use std::sync::Arc;

/// Identifier of an isolation domain inside a [`DomainTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainId(u32);

impl DomainId {
	/// The root domain every tree starts with.
	pub const ROOT: DomainId = DomainId(0);

	#[inline]
	pub fn as_u32(self) -> u32 {
		self.0
	}
}

impl fmt::Display for DomainId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "DomainId({})", self.0)
	}
}

#[derive(Debug, Clone)]
struct DomainNode {
	name: Arc<str>,
	parent: Option<DomainId>,
	requires_markers: bool,
}

/// Tree of isolation domains.
///
/// A type defined in domain `D` is visible from domain `E` when `D` is `E` or
/// one of its ancestors. Siblings never see each other's types.
#[derive(Debug, Clone)]
pub struct DomainTree {
	nodes: Vec<DomainNode>,
}

impl Default for DomainTree {
	fn default() -> Self {
		Self::new("root")
	}
}

impl DomainTree {
	pub fn new(root_name: &str) -> Self {
		Self {
			nodes: vec![DomainNode {
				name: root_name.into(),
				parent: None,
				requires_markers: false,
			}],
		}
	}

	/// Adds a child domain of `parent`.
	///
	/// # Panics
	///
	/// Panics if `parent` does not belong to this tree.
	pub fn add(&mut self, name: &str, parent: DomainId) -> DomainId {
		assert!(
			(parent.0 as usize) < self.nodes.len(),
			"unknown parent domain {parent}"
		);
		let id = DomainId(self.nodes.len() as u32);
		self.nodes.push(DomainNode {
			name: name.into(),
			parent: Some(parent),
			requires_markers: false,
		});
		id
	}

	/// Types defined in `domain` must carry capability markers to be bound.
	pub fn set_requires_markers(&mut self, domain: DomainId, required: bool) {
		if let Some(node) = self.nodes.get_mut(domain.0 as usize) {
			node.requires_markers = required;
		}
	}

	pub fn requires_markers(&self, domain: DomainId) -> bool {
		self.nodes
			.get(domain.0 as usize)
			.is_some_and(|n| n.requires_markers)
	}

	pub fn name(&self, domain: DomainId) -> &str {
		self.nodes.get(domain.0 as usize).map_or("?", |n| &n.name)
	}

	pub fn parent(&self, domain: DomainId) -> Option<DomainId> {
		self.nodes.get(domain.0 as usize).and_then(|n| n.parent)
	}

	pub fn find(&self, name: &str) -> Option<DomainId> {
		self.nodes
			.iter()
			.position(|n| &*n.name == name)
			.map(|i| DomainId(i as u32))
	}

	pub fn contains(&self, domain: DomainId) -> bool {
		(domain.0 as usize) < self.nodes.len()
	}

	/// Returns true if `ancestor` is `domain` or one of its ancestors.
	pub fn is_ancestor_or_self(&self, ancestor: DomainId, domain: DomainId) -> bool {
		let mut cur = Some(domain);
		while let Some(d) = cur {
			if d == ancestor {
				return true;
			}
			cur = self.parent(d);
		}
		false
	}

	/// Returns true if types defined in `defined_in` are visible from `from`.
	#[inline]
	pub fn can_see(&self, from: DomainId, defined_in: DomainId) -> bool {
		self.is_ancestor_or_self(defined_in, from)
	}

	/// Returns true if one domain contains the other.
	pub fn related(&self, a: DomainId, b: DomainId) -> bool {
		self.is_ancestor_or_self(a, b) || self.is_ancestor_or_self(b, a)
	}
}
