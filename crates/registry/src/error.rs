use ferry_primitives::DescriptorError;
use thiserror::Error;

/// A malformed line in the registry text format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct ParseError {
	/// 1-based line number.
	pub line: usize,
	pub kind: ParseErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
	#[error("unknown record '{found}'{}", suggestion_suffix(.suggestion))]
	UnknownRecord {
		found: String,
		suggestion: Option<&'static str>,
	},
	#[error("unknown binding kind '{found}'{}", suggestion_suffix(.suggestion))]
	UnknownKind {
		found: String,
		suggestion: Option<&'static str>,
	},
	#[error("{record} expects {expected} fields, found {found}")]
	Arity {
		record: &'static str,
		expected: &'static str,
		found: usize,
	},
	#[error("unexpected token '{0}', only INTERNAL may follow")]
	UnexpectedToken(String),
	#[error(transparent)]
	Descriptor(#[from] DescriptorError),
}

fn suggestion_suffix(suggestion: &Option<&'static str>) -> String {
	suggestion.map_or_else(String::new, |s| format!(", did you mean '{s}'?"))
}

/// Errors raised while building or resolving the registry.
///
/// All of them are configuration errors: the offending input is rejected as a
/// whole and nothing is partially applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
	#[error(transparent)]
	Parse(#[from] ParseError),
	#[error("line {line}: {source}")]
	AtLine {
		line: usize,
		#[source]
		source: Box<RegistryError>,
	},
	#[error("conflicting mapping for {key}: {existing} vs {new}")]
	Conflict {
		key: String,
		existing: String,
		new: String,
	},
	#[error("{kind} binding for {interface} needs {expected}")]
	TargetCount {
		kind: &'static str,
		interface: String,
		expected: &'static str,
	},
	#[error("invalid 2-way proxy mapping: {interface} -> {target}, but {target} -> {actual}")]
	InvalidTwoWay {
		interface: String,
		target: String,
		actual: String,
	},
	#[error("kind mismatch: {interface} is {kind}, its reverse {reverse} is {reverse_kind}")]
	KindMismatch {
		interface: String,
		kind: &'static str,
		reverse: String,
		reverse_kind: &'static str,
	},
	#[error("module {0} is already registered")]
	DuplicateModule(String),
	#[error("unknown module domain {0}")]
	UnknownModule(String),
	#[error("no binding for {0}")]
	UnknownBinding(String),
	#[error("static override {method} -> {function} has no preceding binding")]
	DanglingStatic { method: String, function: String },
	#[error("isolation domain {requested} is incompatible with active domain {active}")]
	IncompatibleDomain { requested: String, active: String },
}
