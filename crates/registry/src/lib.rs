//! Binding registry for the capability bridge.
//!
//! Bindings map a consumer-facing interface to one or more provider targets,
//! optionally with per-method static overrides. They arrive either from the
//! line-oriented text format ([`parse`]) or from provider modules through
//! [`ModuleRegistration`], and are resolved lazily against a
//! [`TypeUniverse`](ferry_primitives::TypeUniverse) on first use.

/// Binding records and their resolved form.
pub mod binding;
/// The registry itself: insertion, resolution, module registration.
pub mod db;
/// Registry error types.
pub mod error;
/// Parser for the line-oriented registry format.
pub mod parse;

pub use binding::{
	Binding, BindingFlags, BindingKind, Resolution, ResolvedBinding, ResolvedStatic, StaticOverride,
};
pub use db::BindingRegistry;
pub use db::module::ModuleRegistration;
pub use db::plugin::ModuleRegistrar;
pub use error::{ParseError, ParseErrorKind, RegistryError};
pub use parse::{Record, RecordKind, parse};
