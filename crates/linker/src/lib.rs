//! Cross-boundary capability linker.
//!
//! Client code consumes interfaces; provider code lives in another isolation
//! domain and never implements them directly. The linker closes that gap:
//!
//! - [`conversion`]: the value-conversion algebra between interface-side and
//!   target-side types, and method signature mapping
//! - [`closure`]: transitive boundary-relevant dependencies of a type
//! - [`generator`]: adapter descriptions, one delegated call per method
//! - [`engine`]: turns descriptions into invocable adapter objects
//! - [`proxy`] / [`repository`]: per-type descriptors and their lazy lifecycle
//! - [`Linker`]: the facade clients use to look services up
//!
//! ```ignore
//! let registry = Arc::new(BindingRegistry::from_text("TYPE api.Shape impl.ShapeImpl SERVICE")?);
//! let linker = Linker::builder(universe, registry).domain(api).build();
//! let shape = linker.get_service("api.Shape")?.expect("service available");
//! let area = linker.invoke(&shape.into(), "area", &[])?;
//! ```

pub mod closure;
pub mod config;
pub mod conversion;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod extensions;
pub mod generator;
mod linker;
pub mod proxy;
pub mod repository;
#[cfg(test)]
mod test_world;

pub use closure::{ClosureEnv, DependencyClosure, TypeSet};
pub use config::{ConfigError, LinkerConfig};
pub use conversion::{Conversion, ConversionRuntime, MethodMapping, Query};
pub use engine::{AdapterRuntime, Interpreter, Materialized, Materializer};
pub use error::LinkError;
pub use extensions::ExtensionSet;
pub use generator::{AdapterDescription, AdapterMethod, CallTarget, Linkage, MethodBody};
pub use linker::{Linker, LinkerBuilder, Proxy};
pub use proxy::{ProxyId, Stage};
pub use repository::{ProxyKey, Specialization};
