//! Materialization of adapter descriptions.
//!
//! A [`Materializer`] turns an [`AdapterDescription`] into callables: a
//! constructor binding an adapter to its target, and an extractor reading the
//! target back. [`Interpreter`] is the default backend; it dispatches calls
//! through the description at runtime.

mod interpreter;

use std::sync::{Arc, Weak};

use ferry_primitives::{ObjectRef, TypeUniverse, Value};

pub use self::interpreter::Interpreter;
use crate::conversion::ConversionRuntime;
use crate::error::LinkError;
use crate::extensions::ExtensionSet;
use crate::generator::AdapterDescription;


/// Services adapters need while running calls.
pub trait AdapterRuntime: ConversionRuntime + Send + Sync {
	fn universe(&self) -> &TypeUniverse;
	/// Warn on first use of deprecated interfaces and methods.
	fn log_deprecated(&self) -> bool;
}

/// Binds a new adapter to its target (`None` for target-less services).
pub type Constructor = Arc<dyn Fn(Option<Value>, ExtensionSet) -> ObjectRef + Send + Sync>;

/// Reads the target back out of an adapter.
pub type TargetExtractor = Arc<dyn Fn(&ObjectRef) -> Option<Value> + Send + Sync>;

#[derive(Clone)]
pub struct Materialized {
	pub constructor: Constructor,
	/// Present when the adapter wraps a target.
	pub target_extractor: Option<TargetExtractor>,
}

impl std::fmt::Debug for Materialized {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Materialized")
			.field("target_extractor", &self.target_extractor.is_some())
			.finish_non_exhaustive()
	}
}

pub trait Materializer: Send + Sync {
	/// Materializes `description`. Bridged calls are registered here and
	/// resolved on first use.
	fn materialize(
		&self,
		description: Arc<AdapterDescription>,
		runtime: Weak<dyn AdapterRuntime>,
	) -> Result<Materialized, LinkError>;
}
