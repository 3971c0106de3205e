//! Shared vocabulary of the capability bridge.
//!
//! The linker never reflects over live code. Everything it knows about the two
//! sides of the boundary is declared up front in a [`TypeUniverse`]:
//! - [`TypeName`]: fully-qualified type names with nested-name fallbacks
//! - [`DomainTree`]: isolation domains and their visibility rules
//! - [`TypeDef`] / [`TypeRef`]: declared types and generic type references
//! - [`MethodType`]: erased signatures, also the textual descriptor syntax
//! - [`Value`] / [`Object`]: runtime values crossing the boundary
//! - [`Fault`]: per-call signals raised while invoking across the boundary

/// Declared type descriptors.
pub mod desc;
/// Isolation domains.
pub mod domain;
/// Fully-qualified type names.
pub mod name;
/// Erased signatures and the descriptor syntax.
pub mod signature;
/// The set of declared types and dynamic dispatch over them.
pub mod universe;
/// Runtime values and per-call faults.
pub mod value;

pub use desc::{
	Extension, FieldDef, Markers, MethodDef, MethodFlags, Modifiers, NativeFn, Primitive, TypeDef,
	TypeKind, TypeRef, TypeVar,
};
pub use domain::{DomainId, DomainTree};
pub use name::TypeName;
pub use signature::{DescriptorError, ErasedType, MethodType};
pub use universe::{TypeUniverse, UniverseError};
pub use value::{Fault, Instance, Object, ObjectRef, Value};

/// Name of the root of every class hierarchy.
pub const OBJECT: &str = "std.Object";

/// Name of the optional-value container that conversions map element-wise.
pub const OPTIONAL: &str = "std.Optional";
