use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::desc::{MethodDef, NativeFn, TypeDef, TypeRef};
use crate::domain::{DomainId, DomainTree};
use crate::name::TypeName;
use crate::signature::{ErasedType, MethodType};
use crate::value::{Fault, ObjectRef, Value};
use crate::{OBJECT, OPTIONAL};


/// Errors raised while declaring types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
	#[error("type {0} is already defined")]
	Duplicate(TypeName),
	#[error("type {ty} is defined in unknown domain {domain}")]
	UnknownDomain { ty: TypeName, domain: DomainId },
}

/// Every type the linker may see, grouped into isolation domains.
///
/// Built once by the host and then shared read-only. `std.Object` and
/// `std.Optional` are predefined in the root domain.
pub struct TypeUniverse {
	domains: DomainTree,
	types: FxHashMap<TypeName, Arc<TypeDef>>,
}

impl Default for TypeUniverse {
	fn default() -> Self {
		Self::new(DomainTree::default())
	}
}

impl TypeUniverse {
	pub fn new(domains: DomainTree) -> Self {
		let mut types = FxHashMap::default();
		for builtin in [
			TypeDef::class(OBJECT, DomainId::ROOT),
			TypeDef::class(OPTIONAL, DomainId::ROOT)
				.type_param("T")
				.modifiers(crate::Modifiers::FINAL),
		] {
			types.insert(builtin.name.clone(), Arc::new(builtin));
		}
		Self { domains, types }
	}

	pub fn domains(&self) -> &DomainTree {
		&self.domains
	}

	pub fn domains_mut(&mut self) -> &mut DomainTree {
		&mut self.domains
	}

	/// Declares a type.
	pub fn define(&mut self, def: TypeDef) -> Result<Arc<TypeDef>, UniverseError> {
		if !self.domains.contains(def.domain) {
			return Err(UniverseError::UnknownDomain {
				ty: def.name,
				domain: def.domain,
			});
		}
		if self.types.contains_key(&def.name) {
			return Err(UniverseError::Duplicate(def.name));
		}
		let def = Arc::new(def);
		self.types.insert(def.name.clone(), def.clone());
		Ok(def)
	}

	/// Looks a type up regardless of visibility.
	pub fn get(&self, name: &str) -> Option<&Arc<TypeDef>> {
		self.types.get(name)
	}

	pub fn len(&self) -> usize {
		self.types.len()
	}

	pub fn is_empty(&self) -> bool {
		self.types.is_empty()
	}

	/// Resolves `name` as seen from domain `from`.
	///
	/// Falls back to nested-type spellings (`a.B$C` for `a.B.C`) when the
	/// literal name is not visible.
	pub fn load(&self, name: &str, from: DomainId) -> Option<Arc<TypeDef>> {
		let visible = |def: &Arc<TypeDef>| self.domains.can_see(from, def.domain);
		if let Some(def) = self.types.get(name).filter(|d| visible(d)) {
			return Some(def.clone());
		}
		TypeName::from(name)
			.nested_candidates()
			.iter()
			.rev()
			.find_map(|candidate| self.types.get(candidate.as_str()).filter(|d| visible(d)))
			.cloned()
	}

	/// Returns true if code in domain `from` may name `ty` directly.
	pub fn can_access(&self, from: DomainId, ty: &ErasedType) -> bool {
		match ty {
			ErasedType::Void | ErasedType::Primitive(_) => true,
			ErasedType::Array(component) => self.can_access(from, component),
			ErasedType::Object(name) => self
				.types
				.get(name.as_str())
				.is_some_and(|def| self.domains.can_see(from, def.domain)),
		}
	}

	/// Returns true if `name` is visible from `from`.
	pub fn can_access_type(&self, from: DomainId, name: &TypeName) -> bool {
		self.can_access(from, &ErasedType::Object(name.clone()))
	}

	/// `class` followed by all of its transitive supertypes, each once.
	pub fn hierarchy(&self, class: &TypeName) -> Vec<Arc<TypeDef>> {
		let mut out = Vec::new();
		let mut seen = FxHashSet::default();
		let mut stack: SmallVec<[TypeName; 8]> = SmallVec::new();
		stack.push(class.clone());
		while let Some(name) = stack.pop() {
			if !seen.insert(name.clone()) {
				continue;
			}
			let Some(def) = self.types.get(name.as_str()) else {
				continue;
			};
			for sup in def.supertypes.iter().rev() {
				if let Some(sup) = sup.erasure().class_name() {
					stack.push(sup.clone());
				}
			}
			out.push(def.clone());
		}
		out
	}

	/// Returns true if `sub` is `sup` or inherits from it.
	pub fn is_subtype(&self, sub: &TypeName, sup: &TypeName) -> bool {
		sup.as_str() == OBJECT || self.hierarchy(sub).iter().any(|d| &d.name == sup)
	}

	/// Finds a method by name and erased signature, searching supertypes.
	///
	/// Returns the declaring type together with the method.
	pub fn find_method(
		&self,
		class: &TypeName,
		name: &str,
		mt: &MethodType,
		is_static: bool,
	) -> Option<(TypeName, MethodDef)> {
		let matching = |def: &Arc<TypeDef>| {
			def.declared_methods(name)
				.find(|m| m.is_static() == is_static && &m.erased() == mt)
				.map(|m| (def.name.clone(), m.clone()))
		};
		if is_static {
			return self.types.get(class.as_str()).and_then(matching);
		}
		self.hierarchy(class).iter().find_map(matching)
	}

	/// Static functions named `name` declared directly on `class`.
	pub fn static_functions(&self, class: &TypeName, name: &str) -> Vec<MethodDef> {
		self.types.get(class.as_str()).map_or_else(Vec::new, |def| {
			def.declared_methods(name)
				.filter(|m| m.is_static())
				.cloned()
				.collect()
		})
	}

	fn find_concrete_by_arity(&self, class: &TypeName, name: &str, arity: usize) -> Option<NativeFn> {
		self.hierarchy(class).iter().find_map(|def| {
			def.declared_methods(name)
				.filter(|m| !m.is_static() && m.params.len() == arity)
				.find_map(|m| m.body.clone())
		})
	}

	/// Calls `method` on `receiver`, selecting the overload by arity.
	pub fn invoke(&self, receiver: &Value, method: &str, args: &[Value]) -> Result<Value, Fault> {
		let obj = receiver_object(receiver, method)?;
		if let Some(result) = obj.dispatch(obj, method, args) {
			return result;
		}
		let body = self
			.find_concrete_by_arity(obj.class(), method, args.len())
			.ok_or_else(|| Fault::NoSuchMethod {
				class: obj.class().clone(),
				method: method.to_string(),
				arity: args.len(),
			})?;
		call_body(&body, receiver, args)
	}

	/// Calls the override of `method` with exactly signature `mt` selected by
	/// the receiver's runtime class.
	pub fn invoke_exact(
		&self,
		receiver: &Value,
		method: &str,
		mt: &MethodType,
		args: &[Value],
	) -> Result<Value, Fault> {
		let obj = receiver_object(receiver, method)?;
		if let Some(result) = obj.dispatch(obj, method, args) {
			return result;
		}
		let class = obj.class();
		match self.find_method(class, method, mt, false) {
			Some((_, MethodDef { body: Some(body), .. })) => call_body(&body, receiver, args),
			Some(_) => Err(Fault::Unimplemented {
				interface: class.clone(),
				method: method.to_string(),
			}),
			None => Err(Fault::NoSuchMethod {
				class: class.clone(),
				method: method.to_string(),
				arity: args.len(),
			}),
		}
	}

	/// Calls a static function by name and arity.
	pub fn invoke_static(&self, class: &TypeName, method: &str, args: &[Value]) -> Result<Value, Fault> {
		let body = self
			.static_functions(class, method)
			.into_iter()
			.filter(|m| m.params.len() == args.len())
			.find_map(|m| m.body)
			.ok_or_else(|| Fault::NoSuchMethod {
				class: class.clone(),
				method: method.to_string(),
				arity: args.len(),
			})?;
		body(args)
	}

	/// Runs the factory of `class`, if it declares one.
	pub fn instantiate(&self, class: &TypeName) -> Option<Result<Value, Fault>> {
		let factory = self.types.get(class.as_str())?.factory.clone()?;
		Some(factory(&[]))
	}

	/// Collects every class name mentioned by `ty`, generic arguments and
	/// bounds included. Primitives contribute nothing.
	pub fn mentioned_types(ty: &TypeRef, out: &mut Vec<TypeName>) {
		match ty {
			TypeRef::Void | TypeRef::Primitive(_) => {}
			TypeRef::Class(name) => out.push(name.clone()),
			TypeRef::Array(component) => Self::mentioned_types(component, out),
			TypeRef::Parameterized { raw, args, owner } => {
				for arg in args {
					Self::mentioned_types(arg, out);
				}
				out.push(raw.clone());
				if let Some(owner) = owner {
					Self::mentioned_types(owner, out);
				}
			}
			TypeRef::Var { bound, .. } => {
				if let Some(bound) = bound {
					Self::mentioned_types(bound, out);
				}
			}
			TypeRef::Wildcard { upper, lower } => {
				for b in [upper, lower].into_iter().flatten() {
					Self::mentioned_types(b, out);
				}
			}
		}
	}
}

fn receiver_object<'a>(receiver: &'a Value, method: &str) -> Result<&'a ObjectRef, Fault> {
	match receiver {
		Value::Object(obj) => Ok(obj),
		Value::Null => Err(Fault::NullPointer(method.to_string())),
		other => Err(Fault::NoSuchMethod {
			class: TypeName::from(other.type_label()),
			method: method.to_string(),
			arity: 0,
		}),
	}
}

fn call_body(body: &NativeFn, receiver: &Value, args: &[Value]) -> Result<Value, Fault> {
	let mut full = Vec::with_capacity(args.len() + 1);
	full.push(receiver.clone());
	full.extend_from_slice(args);
	body(&full)
}
