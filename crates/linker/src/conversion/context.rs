use ferry_primitives::{ErasedType, MethodDef, MethodType, TypeDef, TypeName, TypeRef, TypeUniverse, TypeVar};
use rustc_hash::FxHashMap;

use super::{Conversion, MethodMapping, Query};
use crate::error::LinkError;
use crate::proxy::ProxyId;
use crate::repository::Specialization;

/// Read access to proxy descriptors while mapping.
pub(crate) trait ProxyLookup {
	fn proxy_for(&self, name: &TypeName, specialization: Option<Specialization>) -> Result<ProxyId, LinkError>;
	fn view(&self, id: ProxyId) -> ProxyView;
}

/// What mapping needs to know about one descriptor.
#[derive(Debug, Clone)]
pub(crate) struct ProxyView {
	pub interface: Option<TypeName>,
	pub target: Option<TypeName>,
	pub service: bool,
	pub invalid: bool,
	/// Support already computed and found lacking. Never forces the check.
	pub unsupported: bool,
	pub inverse: ProxyId,
}

impl ProxyView {
	pub fn unknown(id: ProxyId) -> Self {
		Self {
			interface: None,
			target: None,
			service: false,
			invalid: true,
			unsupported: false,
			inverse: id,
		}
	}
}

/// Maps declared types to conversions for one generated adapter.
///
/// Holds the type-variable bindings collected from the adapter's interface
/// and its generic supertypes.
pub(crate) struct MappingContext<'a> {
	lookup: &'a dyn ProxyLookup,
	universe: &'a TypeUniverse,
	extensions: bool,
	vars: FxHashMap<TypeVar, Conversion>,
}

impl<'a> MappingContext<'a> {
	pub fn new(lookup: &'a dyn ProxyLookup, universe: &'a TypeUniverse, extensions: bool) -> Self {
		Self {
			lookup,
			universe,
			extensions,
			vars: FxHashMap::default(),
		}
	}

	/// Binds the type parameters of `def` to `specialization`, then walks its
	/// generic supertypes.
	pub fn init_type_parameters(&mut self, def: &TypeDef, specialization: Option<&[Conversion]>) -> Result<(), LinkError> {
		if let Some(spec) = specialization {
			if spec.len() != def.type_params.len() {
				return Err(LinkError::Specialization {
					ty: def.name.clone(),
					expected: def.type_params.len(),
					found: spec.len(),
				});
			}
			for (var, conversion) in def.type_params.iter().zip(spec) {
				self.vars.insert(var.clone(), conversion.clone());
			}
		}
		for sup in &def.supertypes {
			match sup {
				TypeRef::Parameterized { raw, args, .. } => {
					let Some(sup_def) = self.universe.get(raw.as_str()).cloned() else {
						continue;
					};
					let spec = args.iter().map(|a| self.mapping(a)).collect::<Result<Vec<_>, _>>()?;
					self.init_type_parameters(&sup_def, Some(&spec))?;
				}
				TypeRef::Class(name) => {
					if let Some(sup_def) = self.universe.get(name.as_str()).cloned() {
						self.init_type_parameters(&sup_def, None)?;
					}
				}
				_ => {}
			}
		}
		Ok(())
	}

	pub fn mapping(&mut self, ty: &TypeRef) -> Result<Conversion, LinkError> {
		match ty {
			TypeRef::Void | TypeRef::Primitive(_) => Ok(Conversion::Identity(ty.erasure())),
			TypeRef::Class(name) => self.class_mapping(name, None),
			TypeRef::Array(component) => Ok(Conversion::array(self.mapping(component)?)),
			TypeRef::Parameterized { raw, args, .. } => {
				let spec = self.specialization(args)?;
				self.class_mapping(raw, spec)
			}
			TypeRef::Var { var, bound } => match self.vars.get(var) {
				Some(c) => Ok(c.clone()),
				None => self.bound_mapping(bound.as_deref()),
			},
			TypeRef::Wildcard { upper, .. } => self.bound_mapping(upper.as_deref()),
		}
	}

	fn bound_mapping(&mut self, bound: Option<&TypeRef>) -> Result<Conversion, LinkError> {
		match bound {
			Some(b) => self.mapping(b),
			None => Ok(Conversion::Identity(ErasedType::object(ferry_primitives::OBJECT))),
		}
	}

	/// `None` when every argument maps to identity.
	fn specialization(&mut self, args: &[TypeRef]) -> Result<Option<Specialization>, LinkError> {
		let spec = args.iter().map(|a| self.mapping(a)).collect::<Result<Vec<_>, _>>()?;
		if spec.iter().all(Conversion::is_identity) {
			return Ok(None);
		}
		Ok(Some(spec.into()))
	}

	fn class_mapping(&mut self, name: &TypeName, spec: Option<Specialization>) -> Result<Conversion, LinkError> {
		if name.as_str() == ferry_primitives::OPTIONAL
			&& let Some(spec) = &spec
			&& let [content] = &spec[..]
		{
			return Ok(Conversion::optional(content.clone()));
		}

		let ty = ErasedType::Object(name.clone());
		let id = self.lookup.proxy_for(name, spec)?;
		let proxy = self.lookup.view(id);
		let inverse = self.lookup.view(proxy.inverse);
		let unusable = |v: &ProxyView| v.invalid || v.service || v.unsupported;
		if unusable(&proxy) || unusable(&inverse) {
			return Ok(Conversion::Invalid(ty));
		}
		Ok(match (proxy.interface, inverse.interface) {
			(Some(_), Some(to)) => Conversion::DynamicEitherWay {
				from: ty,
				to: ErasedType::Object(to),
				from_proxy: id,
				to_proxy: proxy.inverse,
			},
			(Some(_), None) => match proxy.target {
				Some(target) => Conversion::Extract {
					from: ty,
					to: ErasedType::Object(target),
					proxy: id,
				},
				None => Conversion::Invalid(ty),
			},
			(None, Some(to)) => Conversion::Wrap {
				from: ty,
				to: ErasedType::Object(to),
				proxy: proxy.inverse,
			},
			(None, None) => Conversion::Identity(ty),
		})
	}

	/// Maps one interface method.
	///
	/// The return mapping is inverted so both directions read "as the adapter
	/// applies them": parameters client to provider, result provider to client.
	pub fn method_mapping(&mut self, method: &MethodDef) -> Result<MethodMapping, LinkError> {
		let ret = self.mapping(&method.ret)?.inverse();
		let params = method.params.iter().map(|p| self.mapping(p)).collect::<Result<Vec<_>, _>>()?;
		let mut query = Query::default();
		ret.query(&mut query, self.extensions);
		for p in &params {
			p.query(&mut query, self.extensions);
		}
		Ok(MethodMapping {
			ty: MethodType::new(ret.from(), params.iter().map(Conversion::to)),
			ret,
			params,
			query,
		})
	}
}
