use std::fmt;
use std::str::FromStr;

use crate::desc::Primitive;
use crate::name::TypeName;

/// A type after generic erasure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErasedType {
	Void,
	Primitive(Primitive),
	Object(TypeName),
	Array(Box<ErasedType>),
}

impl ErasedType {
	pub fn object(name: impl Into<TypeName>) -> Self {
		Self::Object(name.into())
	}

	pub fn array_of(component: ErasedType) -> Self {
		Self::Array(Box::new(component))
	}

	/// The class name behind an object type, if any.
	pub fn class_name(&self) -> Option<&TypeName> {
		match self {
			Self::Object(name) => Some(name),
			_ => None,
		}
	}

	/// Strips all array dimensions.
	pub fn element(&self) -> &ErasedType {
		match self {
			Self::Array(inner) => inner.element(),
			other => other,
		}
	}
}

impl fmt::Display for ErasedType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Void => f.write_str("void"),
			Self::Primitive(p) => f.write_str(p.keyword()),
			Self::Object(name) => f.write_str(name.as_str()),
			Self::Array(inner) => write!(f, "{inner}[]"),
		}
	}
}

/// Erased method signature: return type and parameter types.
///
/// The textual form `(int,api.Shape[])double` is the descriptor syntax of the
/// registry's `STATIC` records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodType {
	pub ret: ErasedType,
	pub params: Vec<ErasedType>,
}

impl MethodType {
	pub fn new(ret: ErasedType, params: impl IntoIterator<Item = ErasedType>) -> Self {
		Self {
			ret,
			params: params.into_iter().collect(),
		}
	}

	#[inline]
	pub fn arity(&self) -> usize {
		self.params.len()
	}
}

impl fmt::Display for MethodType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("(")?;
		for (i, p) in self.params.iter().enumerate() {
			if i > 0 {
				f.write_str(",")?;
			}
			write!(f, "{p}")?;
		}
		write!(f, "){}", self.ret)
	}
}

/// Malformed method descriptor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
	#[error("descriptor must start with '(': {0}")]
	MissingOpen(String),
	#[error("descriptor has no closing ')': {0}")]
	MissingClose(String),
	#[error("empty type in descriptor: {0}")]
	EmptyType(String),
	#[error("void is only valid as a return type: {0}")]
	VoidParameter(String),
}

impl FromStr for MethodType {
	type Err = DescriptorError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let rest = s
			.strip_prefix('(')
			.ok_or_else(|| DescriptorError::MissingOpen(s.to_string()))?;
		let (params, ret) = rest
			.split_once(')')
			.ok_or_else(|| DescriptorError::MissingClose(s.to_string()))?;

		let params = if params.trim().is_empty() {
			Vec::new()
		} else {
			params
				.split(',')
				.map(|p| {
					let ty = parse_erased(p, s)?;
					if ty == ErasedType::Void {
						return Err(DescriptorError::VoidParameter(s.to_string()));
					}
					Ok(ty)
				})
				.collect::<Result<Vec<_>, _>>()?
		};

		Ok(Self {
			ret: parse_erased(ret, s)?,
			params,
		})
	}
}

fn parse_erased(token: &str, whole: &str) -> Result<ErasedType, DescriptorError> {
	let mut token = token.trim();
	let mut dims = 0;
	while let Some(stripped) = token.strip_suffix("[]") {
		token = stripped.trim_end();
		dims += 1;
	}
	if token.is_empty() {
		return Err(DescriptorError::EmptyType(whole.to_string()));
	}

	let mut ty = match token {
		"void" => ErasedType::Void,
		other => match Primitive::from_keyword(other) {
			Some(p) => ErasedType::Primitive(p),
			None => ErasedType::Object(TypeName::from(other)),
		},
	};
	for _ in 0..dims {
		ty = ErasedType::array_of(ty);
	}
	Ok(ty)
}
