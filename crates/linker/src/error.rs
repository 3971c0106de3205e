use ferry_primitives::{Fault, TypeName};
use ferry_registry::RegistryError;
use thiserror::Error;

use crate::proxy::ProxyId;

/// Errors surfaced while linking.
///
/// Unsupported features are not errors: lookups answer `None` or `false`.
/// These are configuration mistakes and internal invariant violations.
#[derive(Error, Debug, Clone)]
pub enum LinkError {
	#[error(transparent)]
	Registry(#[from] RegistryError),
	#[error("{ty} declares {expected} type parameters, specialization has {found}")]
	Specialization {
		ty: TypeName,
		expected: usize,
		found: usize,
	},
	#[error("some proxies are not in dependencies of {interface}, but are actually used by it: {undeclared:?}")]
	UndeclaredDependency {
		interface: TypeName,
		undeclared: Vec<TypeName>,
	},
	#[error("failed to instantiate {interface}: {fault}")]
	Instantiation { interface: TypeName, fault: Fault },
	#[error("{0} has no binding to generate from")]
	Unbound(ProxyId),
	#[error("unknown proxy {0}")]
	UnknownProxy(ProxyId),
}
