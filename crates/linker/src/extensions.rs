use ferry_primitives::Extension;
use smallvec::SmallVec;

/// Bit set of enabled extensions carried by every adapter instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ExtensionSet(SmallVec<[u64; 1]>);

impl ExtensionSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, ext: Extension) {
		let (word, bit) = Self::position(ext);
		if self.0.len() <= word {
			self.0.resize(word + 1, 0);
		}
		self.0[word] |= bit;
	}

	pub fn contains(&self, ext: Extension) -> bool {
		let (word, bit) = Self::position(ext);
		self.0.get(word).is_some_and(|w| w & bit != 0)
	}

	pub fn is_empty(&self) -> bool {
		self.0.iter().all(|w| *w == 0)
	}

	fn position(ext: Extension) -> (usize, u64) {
		let idx = ext.0 as usize;
		(idx / 64, 1 << (idx % 64))
	}
}

impl FromIterator<Extension> for ExtensionSet {
	fn from_iter<I: IntoIterator<Item = Extension>>(iter: I) -> Self {
		let mut set = Self::new();
		for ext in iter {
			set.insert(ext);
		}
		set
	}
}
