//! Conversion algebra between interface-side and target-side values.
//!
//! A [`Conversion`] turns a value of its `from` type into a value of its `to`
//! type. Every conversion has an exact [`inverse`](Conversion::inverse):
//! `c.inverse().inverse() == c`. Wrapping creates an adapter through a proxy
//! whose interface is the `to` type; extraction unwraps an adapter of the
//! `from` type back to its target.

mod context;

use std::fmt;

use ferry_primitives::{ErasedType, Fault, MethodType, Value};

pub(crate) use self::context::{MappingContext, ProxyLookup, ProxyView};
use crate::extensions::ExtensionSet;
use crate::proxy::ProxyId;

/// Creates adapters on behalf of wrapping conversions.
pub trait ConversionRuntime {
	/// Wraps `target` in a fresh adapter for `proxy`.
	fn wrap(&self, proxy: ProxyId, target: Value, extensions: &ExtensionSet) -> Result<Value, Fault>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Conversion {
	/// Passes values through unchanged.
	Identity(ErasedType),
	/// The type cannot cross the boundary.
	Invalid(ErasedType),
	Array(Box<Conversion>),
	/// Converts the content of an optional container.
	Optional(Box<Conversion>),
	/// Wraps a `from` value in an adapter implementing `to`.
	Wrap {
		from: ErasedType,
		to: ErasedType,
		proxy: ProxyId,
	},
	/// Unwraps an adapter implementing `from` to its `to` target.
	Extract {
		from: ErasedType,
		to: ErasedType,
		proxy: ProxyId,
	},
	/// Extracts if the value is an adapter of `from_proxy`, wraps through
	/// `to_proxy` otherwise.
	DynamicEitherWay {
		from: ErasedType,
		to: ErasedType,
		from_proxy: ProxyId,
		to_proxy: ProxyId,
	},
}

/// Accumulated validity of a group of conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query {
	pub valid: bool,
	/// Some conversion creates adapters, so the caller's extension set has to
	/// be forwarded.
	pub needs_extensions: bool,
}

impl Default for Query {
	fn default() -> Self {
		Self {
			valid: true,
			needs_extensions: false,
		}
	}
}

impl Conversion {
	/// Array conversion, collapsing to identity for identity components.
	pub fn array(component: Conversion) -> Self {
		match component {
			Self::Identity(t) => Self::Identity(ErasedType::array_of(t)),
			other => Self::Array(Box::new(other)),
		}
	}

	/// Optional conversion, collapsing to identity on the optional type for
	/// identity contents.
	pub fn optional(content: Conversion) -> Self {
		match content {
			Self::Identity(_) => Self::Identity(ErasedType::object(ferry_primitives::OPTIONAL)),
			other => Self::Optional(Box::new(other)),
		}
	}

	pub fn is_identity(&self) -> bool {
		matches!(self, Self::Identity(_))
	}

	pub fn from(&self) -> ErasedType {
		match self {
			Self::Identity(t) | Self::Invalid(t) => t.clone(),
			Self::Array(c) => ErasedType::array_of(c.from()),
			Self::Optional(_) => ErasedType::object(ferry_primitives::OPTIONAL),
			Self::Wrap { from, .. } | Self::Extract { from, .. } | Self::DynamicEitherWay { from, .. } => {
				from.clone()
			}
		}
	}

	pub fn to(&self) -> ErasedType {
		match self {
			Self::Identity(t) | Self::Invalid(t) => t.clone(),
			Self::Array(c) => ErasedType::array_of(c.to()),
			Self::Optional(_) => ErasedType::object(ferry_primitives::OPTIONAL),
			Self::Wrap { to, .. } | Self::Extract { to, .. } | Self::DynamicEitherWay { to, .. } => {
				to.clone()
			}
		}
	}

	pub fn inverse(&self) -> Self {
		match self {
			Self::Identity(_) | Self::Invalid(_) => self.clone(),
			Self::Array(c) => Self::Array(Box::new(c.inverse())),
			Self::Optional(c) => Self::Optional(Box::new(c.inverse())),
			Self::Wrap { from, to, proxy } => Self::Extract {
				from: to.clone(),
				to: from.clone(),
				proxy: *proxy,
			},
			Self::Extract { from, to, proxy } => Self::Wrap {
				from: to.clone(),
				to: from.clone(),
				proxy: *proxy,
			},
			Self::DynamicEitherWay {
				from,
				to,
				from_proxy,
				to_proxy,
			} => Self::DynamicEitherWay {
				from: to.clone(),
				to: from.clone(),
				from_proxy: *to_proxy,
				to_proxy: *from_proxy,
			},
		}
	}

	/// Folds this conversion into `query`.
	pub fn query(&self, query: &mut Query, extensions_enabled: bool) {
		match self {
			Self::Identity(_) | Self::Extract { .. } => {}
			Self::Invalid(_) => query.valid = false,
			Self::Array(c) | Self::Optional(c) => c.query(query, extensions_enabled),
			Self::Wrap { .. } | Self::DynamicEitherWay { .. } => {
				query.needs_extensions |= extensions_enabled;
			}
		}
	}

	/// Proxies this conversion creates or unwraps adapters of.
	pub fn proxies(&self, out: &mut Vec<ProxyId>) {
		match self {
			Self::Identity(_) | Self::Invalid(_) => {}
			Self::Array(c) | Self::Optional(c) => c.proxies(out),
			Self::Wrap { proxy, .. } | Self::Extract { proxy, .. } => out.push(*proxy),
			Self::DynamicEitherWay {
				from_proxy,
				to_proxy,
				..
			} => {
				out.push(*from_proxy);
				out.push(*to_proxy);
			}
		}
	}

	/// Converts `value`. Null converts to null except under identity.
	pub fn convert<R: ConversionRuntime + ?Sized>(
		&self,
		value: Value,
		runtime: &R,
		extensions: &ExtensionSet,
	) -> Result<Value, Fault> {
		if value.is_null() && !self.is_identity() {
			return Ok(Value::Null);
		}
		match self {
			Self::Identity(_) => Ok(value),
			Self::Invalid(ty) => Err(Fault::Unsupported(format!("{ty} cannot cross the boundary"))),
			Self::Array(component) => match value {
				Value::Array(items) => items
					.iter()
					.map(|item| component.convert(item.clone(), runtime, extensions))
					.collect::<Result<Vec<_>, _>>()
					.map(Value::array),
				other => Err(Fault::class_cast(self.from(), &other)),
			},
			Self::Optional(content) => match value {
				Value::Optional(None) => Ok(Value::Optional(None)),
				Value::Optional(Some(inner)) => {
					let converted = content.convert(*inner, runtime, extensions)?;
					Ok(Value::Optional(Some(Box::new(converted))))
				}
				other => Err(Fault::class_cast(self.from(), &other)),
			},
			Self::Wrap { proxy, .. } => runtime.wrap(*proxy, value, extensions),
			Self::Extract { from, .. } => extract(from, &value).ok_or_else(|| Fault::class_cast(from, &value)),
			Self::DynamicEitherWay { from, to_proxy, .. } => match extract(from, &value) {
				Some(target) => Ok(target),
				None => runtime.wrap(*to_proxy, value, extensions),
			},
		}
	}
}

/// The target of `value` if it is an adapter implementing `interface`.
fn extract(interface: &ErasedType, value: &Value) -> Option<Value> {
	let object = value.as_object()?;
	if Some(object.class()) != interface.class_name() {
		return None;
	}
	object.proxy_target()
}

impl fmt::Display for Conversion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Identity(t) => write!(f, "{t}"),
			Self::Invalid(t) => write!(f, "invalid({t})"),
			Self::Array(c) => write!(f, "array({c})"),
			Self::Optional(c) => write!(f, "optional({c})"),
			Self::Wrap { from, to, proxy } => write!(f, "wrap({from} -> {to} via {proxy})"),
			Self::Extract { from, to, proxy } => write!(f, "extract({from} -> {to} via {proxy})"),
			Self::DynamicEitherWay { from, to, .. } => write!(f, "dynamic({from} <-> {to})"),
		}
	}
}

/// Conversions for one interface method, seen from the adapter.
///
/// `params` convert client arguments to provider arguments; `ret` converts
/// the provider result back. `ty` is the provider-side erased signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMapping {
	pub ty: MethodType,
	pub ret: Conversion,
	pub params: Vec<Conversion>,
	pub query: Query,
}

impl MethodMapping {
	pub fn proxies(&self) -> Vec<ProxyId> {
		let mut out = Vec::new();
		self.ret.proxies(&mut out);
		for p in &self.params {
			p.proxies(&mut out);
		}
		out
	}
}

impl fmt::Display for MethodMapping {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("(")?;
		for (i, p) in self.params.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{p}")?;
		}
		write!(f, ") {}", self.ret)
	}
}
