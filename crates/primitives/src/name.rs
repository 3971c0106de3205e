use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Fully-qualified, dot-separated type name such as `api.Shape`.
///
/// Cloning is a reference-count bump; names are compared and hashed by value.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName(Arc<str>);

impl TypeName {
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self(name.into())
	}

	#[inline]
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Everything before the last `.`, or the empty string.
	pub fn package(&self) -> &str {
		self.0.rsplit_once('.').map_or("", |(pkg, _)| pkg)
	}

	/// Everything after the last `.`.
	pub fn simple_name(&self) -> &str {
		self.0.rsplit_once('.').map_or(&self.0, |(_, simple)| simple)
	}

	/// Returns true if the name starts with `prefix`.
	pub fn in_namespace(&self, prefix: &str) -> bool {
		!prefix.is_empty() && self.0.starts_with(prefix)
	}

	/// Alternative spellings under which a nested type may be defined.
	///
	/// `a.b.C.D` yields `a$b$C$D`, `a.b$C$D`, then `a.b.C$D`: each candidate keeps
	/// one more leading dot, so the last one is the most likely spelling.
	pub fn nested_candidates(&self) -> Vec<TypeName> {
		let dollars = self.0.replace('.', "$");
		self.0
			.match_indices('.')
			.map(|(i, _)| TypeName::new(format!("{}{}", &self.0[..i], &dollars[i..])))
			.collect()
	}
}

impl fmt::Display for TypeName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl fmt::Debug for TypeName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&*self.0, f)
	}
}

impl Borrow<str> for TypeName {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl AsRef<str> for TypeName {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl From<&str> for TypeName {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

impl From<String> for TypeName {
	fn from(name: String) -> Self {
		Self::new(name)
	}
}

impl From<&TypeName> for TypeName {
	fn from(name: &TypeName) -> Self {
		name.clone()
	}
}
