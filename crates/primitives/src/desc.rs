use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::domain::DomainId;
use crate::name::TypeName;
use crate::signature::{ErasedType, MethodType};
use crate::value::{Fault, Value};
use crate::{OBJECT, OPTIONAL};

/// Native implementation of a method, factory, or static function.
///
/// Instance methods receive their receiver as argument 0.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value, Fault> + Send + Sync>;

/// Primitive value types. They never need conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
	Boolean,
	Int,
	Long,
	Double,
}

impl Primitive {
	pub fn keyword(self) -> &'static str {
		match self {
			Self::Boolean => "boolean",
			Self::Int => "int",
			Self::Long => "long",
			Self::Double => "double",
		}
	}

	pub fn from_keyword(s: &str) -> Option<Self> {
		Some(match s {
			"boolean" => Self::Boolean,
			"int" => Self::Int,
			"long" => Self::Long,
			"double" => Self::Double,
			_ => return None,
		})
	}
}

/// What sort of type a [`TypeDef`] declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
	Interface,
	Class,
	Enum,
	Record,
	Annotation,
}

bitflags! {
	/// Declaration modifiers.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct Modifiers: u8 {
		const FINAL = 1 << 0;
		const SEALED = 1 << 1;
		const ABSTRACT = 1 << 2;
		const DEPRECATED = 1 << 3;
	}
}

bitflags! {
	/// Capability markers a type declares about its role at the boundary.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct Markers: u8 {
		/// Implemented by the provider side; clients only consume it.
		const PROVIDED = 1 << 0;
		/// Implemented by clients and handed to the provider.
		const PROVIDES = 1 << 1;
		/// A singleton service interface.
		const SERVICE = 1 << 2;
	}
}

bitflags! {
	/// Method-level flags.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct MethodFlags: u8 {
		const STATIC = 1 << 0;
		const ABSTRACT = 1 << 1;
		const DEPRECATED = 1 << 2;
	}
}

/// Tag of an optional extension a method belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Extension(pub u16);

impl fmt::Display for Extension {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ext#{}", self.0)
	}
}

/// A declared type variable, identified by its owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeVar {
	pub owner: TypeName,
	pub name: Arc<str>,
}

/// Reference to a type as written in a declaration, generics included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
	Void,
	Primitive(Primitive),
	Class(TypeName),
	Array(Box<TypeRef>),
	Parameterized {
		raw: TypeName,
		args: Vec<TypeRef>,
		owner: Option<Box<TypeRef>>,
	},
	Var {
		var: TypeVar,
		bound: Option<Box<TypeRef>>,
	},
	Wildcard {
		upper: Option<Box<TypeRef>>,
		lower: Option<Box<TypeRef>>,
	},
}

impl TypeRef {
	pub const VOID: TypeRef = TypeRef::Void;
	pub const BOOLEAN: TypeRef = TypeRef::Primitive(Primitive::Boolean);
	pub const INT: TypeRef = TypeRef::Primitive(Primitive::Int);
	pub const LONG: TypeRef = TypeRef::Primitive(Primitive::Long);
	pub const DOUBLE: TypeRef = TypeRef::Primitive(Primitive::Double);

	pub fn class(name: impl Into<TypeName>) -> Self {
		Self::Class(name.into())
	}

	pub fn object() -> Self {
		Self::class(OBJECT)
	}

	pub fn array(component: TypeRef) -> Self {
		Self::Array(Box::new(component))
	}

	pub fn generic(raw: impl Into<TypeName>, args: impl IntoIterator<Item = TypeRef>) -> Self {
		Self::Parameterized {
			raw: raw.into(),
			args: args.into_iter().collect(),
			owner: None,
		}
	}

	pub fn optional(element: TypeRef) -> Self {
		Self::generic(OPTIONAL, [element])
	}

	pub fn var(owner: impl Into<TypeName>, name: &str) -> Self {
		Self::Var {
			var: TypeVar {
				owner: owner.into(),
				name: name.into(),
			},
			bound: None,
		}
	}

	pub fn bounded_var(owner: impl Into<TypeName>, name: &str, bound: TypeRef) -> Self {
		Self::Var {
			var: TypeVar {
				owner: owner.into(),
				name: name.into(),
			},
			bound: Some(Box::new(bound)),
		}
	}

	pub fn wildcard() -> Self {
		Self::Wildcard {
			upper: None,
			lower: None,
		}
	}

	pub fn wildcard_extends(upper: TypeRef) -> Self {
		Self::Wildcard {
			upper: Some(Box::new(upper)),
			lower: None,
		}
	}

	pub fn wildcard_super(lower: TypeRef) -> Self {
		Self::Wildcard {
			upper: None,
			lower: Some(Box::new(lower)),
		}
	}

	/// Erases generics: variables and wildcards collapse to their upper bound.
	pub fn erasure(&self) -> ErasedType {
		match self {
			Self::Void => ErasedType::Void,
			Self::Primitive(p) => ErasedType::Primitive(*p),
			Self::Class(name) => ErasedType::Object(name.clone()),
			Self::Array(component) => ErasedType::array_of(component.erasure()),
			Self::Parameterized { raw, .. } => ErasedType::Object(raw.clone()),
			Self::Var { bound, .. } | Self::Wildcard { upper: bound, .. } => bound
				.as_deref()
				.map_or_else(|| ErasedType::object(OBJECT), TypeRef::erasure),
		}
	}
}

/// A declared field. Only its type matters to the linker.
#[derive(Debug, Clone)]
pub struct FieldDef {
	pub name: Arc<str>,
	pub ty: TypeRef,
}

/// A declared method.
#[derive(Clone)]
pub struct MethodDef {
	pub name: Arc<str>,
	pub params: Vec<TypeRef>,
	pub ret: TypeRef,
	pub throws: Vec<TypeRef>,
	pub flags: MethodFlags,
	pub extension: Option<Extension>,
	pub body: Option<NativeFn>,
}

impl MethodDef {
	/// An abstract method without a body.
	pub fn new(name: &str, params: impl IntoIterator<Item = TypeRef>, ret: TypeRef) -> Self {
		Self {
			name: name.into(),
			params: params.into_iter().collect(),
			ret,
			throws: Vec::new(),
			flags: MethodFlags::ABSTRACT,
			extension: None,
			body: None,
		}
	}

	/// A concrete instance method.
	pub fn native(
		name: &str,
		params: impl IntoIterator<Item = TypeRef>,
		ret: TypeRef,
		body: impl Fn(&[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
	) -> Self {
		Self::new(name, params, ret).with_body(body)
	}

	/// A static function.
	pub fn static_native(
		name: &str,
		params: impl IntoIterator<Item = TypeRef>,
		ret: TypeRef,
		body: impl Fn(&[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
	) -> Self {
		let mut m = Self::native(name, params, ret, body);
		m.flags |= MethodFlags::STATIC;
		m
	}

	pub fn with_body(
		mut self,
		body: impl Fn(&[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
	) -> Self {
		self.flags.remove(MethodFlags::ABSTRACT);
		self.body = Some(Arc::new(body));
		self
	}

	pub fn throws(mut self, ty: TypeRef) -> Self {
		self.throws.push(ty);
		self
	}

	pub fn extension(mut self, ext: Extension) -> Self {
		self.extension = Some(ext);
		self
	}

	pub fn deprecated(mut self) -> Self {
		self.flags |= MethodFlags::DEPRECATED;
		self
	}

	#[inline]
	pub fn is_static(&self) -> bool {
		self.flags.contains(MethodFlags::STATIC)
	}

	#[inline]
	pub fn is_abstract(&self) -> bool {
		self.flags.contains(MethodFlags::ABSTRACT)
	}

	#[inline]
	pub fn is_deprecated(&self) -> bool {
		self.flags.contains(MethodFlags::DEPRECATED)
	}

	pub fn erased(&self) -> MethodType {
		MethodType::new(self.ret.erasure(), self.params.iter().map(TypeRef::erasure))
	}
}

impl fmt::Debug for MethodDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MethodDef")
			.field("name", &self.name)
			.field("signature", &self.erased().to_string())
			.field("flags", &self.flags)
			.field("extension", &self.extension)
			.field("native", &self.body.is_some())
			.finish()
	}
}

/// A declared type.
#[derive(Clone)]
pub struct TypeDef {
	pub name: TypeName,
	pub kind: TypeKind,
	pub modifiers: Modifiers,
	pub markers: Markers,
	pub domain: DomainId,
	pub type_params: Vec<TypeVar>,
	pub supertypes: Vec<TypeRef>,
	pub fields: Vec<FieldDef>,
	pub methods: Vec<MethodDef>,
	/// No-argument constructor.
	pub factory: Option<NativeFn>,
}

impl TypeDef {
	pub fn new(name: impl Into<TypeName>, kind: TypeKind, domain: DomainId) -> Self {
		Self {
			name: name.into(),
			kind,
			modifiers: Modifiers::empty(),
			markers: Markers::empty(),
			domain,
			type_params: Vec::new(),
			supertypes: Vec::new(),
			fields: Vec::new(),
			methods: Vec::new(),
			factory: None,
		}
	}

	pub fn interface(name: impl Into<TypeName>, domain: DomainId) -> Self {
		Self::new(name, TypeKind::Interface, domain)
	}

	pub fn class(name: impl Into<TypeName>, domain: DomainId) -> Self {
		Self::new(name, TypeKind::Class, domain)
	}

	pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
		self.modifiers |= modifiers;
		self
	}

	pub fn markers(mut self, markers: Markers) -> Self {
		self.markers |= markers;
		self
	}

	pub fn type_param(mut self, name: &str) -> Self {
		self.type_params.push(TypeVar {
			owner: self.name.clone(),
			name: name.into(),
		});
		self
	}

	pub fn extends(mut self, supertype: TypeRef) -> Self {
		self.supertypes.push(supertype);
		self
	}

	pub fn field(mut self, name: &str, ty: TypeRef) -> Self {
		self.fields.push(FieldDef {
			name: name.into(),
			ty,
		});
		self
	}

	pub fn method(mut self, method: MethodDef) -> Self {
		self.methods.push(method);
		self
	}

	pub fn factory(
		mut self,
		factory: impl Fn(&[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
	) -> Self {
		self.factory = Some(Arc::new(factory));
		self
	}

	/// Reference to one of this type's own type variables.
	pub fn var(&self, name: &str) -> TypeRef {
		TypeRef::var(self.name.clone(), name)
	}

	#[inline]
	pub fn is_interface(&self) -> bool {
		self.kind == TypeKind::Interface
	}

	#[inline]
	pub fn is_deprecated(&self) -> bool {
		self.modifiers.contains(Modifiers::DEPRECATED)
	}

	/// Declared (not inherited) methods named `name`.
	pub fn declared_methods<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodDef> {
		self.methods.iter().filter(move |m| &*m.name == name)
	}
}

impl fmt::Debug for TypeDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TypeDef")
			.field("name", &self.name)
			.field("kind", &self.kind)
			.field("modifiers", &self.modifiers)
			.field("markers", &self.markers)
			.field("domain", &self.domain)
			.field("type_params", &self.type_params)
			.field("supertypes", &self.supertypes)
			.field("methods", &self.methods)
			.finish_non_exhaustive()
	}
}
