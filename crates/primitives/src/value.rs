use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::name::TypeName;

/// Shared handle to a runtime object on either side of the boundary.
pub type ObjectRef = Arc<dyn Object>;

/// A runtime object.
///
/// Plain provider and client objects are usually [`Instance`]s whose methods
/// are looked up in the [`TypeUniverse`](crate::TypeUniverse). Generated
/// adapters override the two hooks.
pub trait Object: Any + Send + Sync {
	/// Runtime class of the object.
	fn class(&self) -> &TypeName;

	fn as_any(&self) -> &dyn Any;

	/// For adapters: the wrapped target (`Some(Value::Null)` when there is
	/// none). `None` means the object is not an adapter.
	fn proxy_target(&self) -> Option<Value> {
		None
	}

	/// For adapters: handles a call by name and arity. `None` falls back to
	/// the class declared in the universe.
	fn dispatch(
		&self,
		this: &ObjectRef,
		method: &str,
		args: &[Value],
	) -> Option<Result<Value, Fault>> {
		let _ = (this, method, args);
		None
	}
}

/// Plain object carrying native state of type `T`.
pub struct Instance<T> {
	class: TypeName,
	state: T,
}

impl<T: Send + Sync + 'static> Instance<T> {
	pub fn new(class: impl Into<TypeName>, state: T) -> ObjectRef {
		Arc::new(Self {
			class: class.into(),
			state,
		})
	}

	/// Wraps a new instance in a [`Value`].
	pub fn value(class: impl Into<TypeName>, state: T) -> Value {
		Value::Object(Self::new(class, state))
	}

	pub fn state(&self) -> &T {
		&self.state
	}
}

impl<T: Send + Sync + 'static> Object for Instance<T> {
	fn class(&self) -> &TypeName {
		&self.class
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

/// A value crossing the boundary.
#[derive(Clone, Default)]
pub enum Value {
	#[default]
	Null,
	Bool(bool),
	Int(i64),
	Double(f64),
	Str(Arc<str>),
	Array(Arc<[Value]>),
	/// The optional container; `Optional(None)` is the empty optional.
	Optional(Option<Box<Value>>),
	Object(ObjectRef),
}

impl Value {
	#[inline]
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	pub fn str(s: &str) -> Self {
		Self::Str(s.into())
	}

	pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
		Self::Array(items.into_iter().collect())
	}

	pub fn as_object(&self) -> Option<&ObjectRef> {
		match self {
			Self::Object(o) => Some(o),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Self::Int(i) => Some(*i),
			_ => None,
		}
	}

	pub fn as_double(&self) -> Option<f64> {
		match self {
			Self::Double(d) => Some(*d),
			Self::Int(i) => Some(*i as f64),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Str(s) => Some(s),
			_ => None,
		}
	}

	/// Native state of an [`Instance<T>`] receiver.
	pub fn state<T: Send + Sync + 'static>(&self) -> Option<&T> {
		self.as_object()?
			.as_any()
			.downcast_ref::<Instance<T>>()
			.map(Instance::state)
	}

	/// Pointer identity for objects, value equality otherwise.
	pub fn same(&self, other: &Value) -> bool {
		match (self, other) {
			(Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
			_ => self == other,
		}
	}

	/// Runtime class name for diagnostics.
	pub fn type_label(&self) -> &str {
		match self {
			Self::Null => "null",
			Self::Bool(_) => "boolean",
			Self::Int(_) => "int",
			Self::Double(_) => "double",
			Self::Str(_) => "string",
			Self::Array(_) => "array",
			Self::Optional(_) => crate::OPTIONAL,
			Self::Object(o) => o.class().as_str(),
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Null, Self::Null) => true,
			(Self::Bool(a), Self::Bool(b)) => a == b,
			(Self::Int(a), Self::Int(b)) => a == b,
			(Self::Double(a), Self::Double(b)) => a == b,
			(Self::Str(a), Self::Str(b)) => a == b,
			(Self::Array(a), Self::Array(b)) => a == b,
			(Self::Optional(a), Self::Optional(b)) => a == b,
			(Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
			_ => false,
		}
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Null => f.write_str("null"),
			Self::Bool(b) => write!(f, "{b}"),
			Self::Int(i) => write!(f, "{i}"),
			Self::Double(d) => write!(f, "{d:?}"),
			Self::Str(s) => write!(f, "{s:?}"),
			Self::Array(items) => f.debug_list().entries(items.iter()).finish(),
			Self::Optional(None) => f.write_str("Optional.empty"),
			Self::Optional(Some(v)) => write!(f, "Optional[{v:?}]"),
			Self::Object(o) => write!(f, "{}@{:p}", o.class(), Arc::as_ptr(o) as *const ()),
		}
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Self::Bool(b)
	}
}

impl From<i64> for Value {
	fn from(i: i64) -> Self {
		Self::Int(i)
	}
}

impl From<f64> for Value {
	fn from(d: f64) -> Self {
		Self::Double(d)
	}
}

impl From<ObjectRef> for Value {
	fn from(o: ObjectRef) -> Self {
		Self::Object(o)
	}
}

/// Signal raised by a single call across the boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Fault {
	/// The adapter has no implementation for this method.
	#[error("no implementation found for {interface}.{method}")]
	Unimplemented { interface: TypeName, method: String },
	/// Raised by provider code to refuse service construction.
	#[error("service not available: {0}")]
	ServiceNotAvailable(String),
	#[error("{found} cannot be converted to {expected}")]
	ClassCast { expected: String, found: String },
	#[error("null receiver for {0}")]
	NullPointer(String),
	#[error("no method {method}/{arity} on {class}")]
	NoSuchMethod {
		class: TypeName,
		method: String,
		arity: usize,
	},
	#[error("unsupported: {0}")]
	Unsupported(String),
	/// The linker that generated the adapter has been dropped.
	#[error("linker is gone")]
	Detached,
	/// Error raised by provider or client code.
	#[error("{0}")]
	Raised(String),
}

impl Fault {
	pub fn service_not_available(reason: impl Into<String>) -> Self {
		Self::ServiceNotAvailable(reason.into())
	}

	pub fn raised(msg: impl Into<String>) -> Self {
		Self::Raised(msg.into())
	}

	pub fn class_cast(expected: impl fmt::Display, found: &Value) -> Self {
		Self::ClassCast {
			expected: expected.to_string(),
			found: found.type_label().to_string(),
		}
	}
}
