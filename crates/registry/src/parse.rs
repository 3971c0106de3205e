use ferry_primitives::{MethodType, TypeName};

use crate::error::{ParseError, ParseErrorKind};

/// Kind token of a `TYPE` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
	Proxy,
	Service,
	ClientProxy,
	InternalService,
	/// Expands to a proxy and a client proxy mapping back.
	TwoWay,
}

const KIND_TOKENS: &[(&str, RecordKind)] = &[
	("PROXY", RecordKind::Proxy),
	("SERVICE", RecordKind::Service),
	("CLIENT_PROXY", RecordKind::ClientProxy),
	("INTERNAL_SERVICE", RecordKind::InternalService),
	("TWO_WAY", RecordKind::TwoWay),
];

const RECORD_TOKENS: &[&str] = &["TYPE", "STATIC", "VERSION"];

const INTERNAL: &str = "INTERNAL";

/// One line of the registry text format.
///
/// ```text
/// VERSION 1.2
/// TYPE api.Shape impl.ShapeImpl SERVICE
/// STATIC impl.Geometry unit ()api.Shape api.Shapes unit INTERNAL
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
	Type {
		line: usize,
		interface: TypeName,
		/// `None` when written as `-`.
		target: Option<TypeName>,
		kind: RecordKind,
		internal: bool,
	},
	Static {
		line: usize,
		target: TypeName,
		function: String,
		descriptor: MethodType,
		interface: TypeName,
		method: String,
		internal: bool,
	},
	Version {
		line: usize,
		version: String,
	},
}

impl Record {
	pub fn line(&self) -> usize {
		match self {
			Self::Type { line, .. } | Self::Static { line, .. } | Self::Version { line, .. } => *line,
		}
	}
}

/// Parses the whole text; the first malformed line fails everything.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse(text: &str) -> Result<Vec<Record>, ParseError> {
	let mut records = Vec::new();
	for (idx, raw) in text.lines().enumerate() {
		let line = idx + 1;
		let trimmed = raw.trim();
		if trimmed.is_empty() || trimmed.starts_with('#') {
			continue;
		}
		let tokens: Vec<&str> = trimmed.split_whitespace().collect();
		records.push(parse_record(line, &tokens).map_err(|kind| ParseError { line, kind })?);
	}
	Ok(records)
}

fn parse_record(line: usize, tokens: &[&str]) -> Result<Record, ParseErrorKind> {
	match tokens[0] {
		"TYPE" => {
			let internal = trailing_internal(tokens, 4, "TYPE", "3 or 4")?;
			let kind = parse_kind(tokens[3])?;
			Ok(Record::Type {
				line,
				interface: TypeName::from(tokens[1]),
				target: (tokens[2] != "-").then(|| TypeName::from(tokens[2])),
				kind,
				internal,
			})
		}
		"STATIC" => {
			let internal = trailing_internal(tokens, 6, "STATIC", "5 or 6")?;
			Ok(Record::Static {
				line,
				target: TypeName::from(tokens[1]),
				function: tokens[2].to_string(),
				descriptor: tokens[3].parse()?,
				interface: TypeName::from(tokens[4]),
				method: tokens[5].to_string(),
				internal,
			})
		}
		"VERSION" => {
			if tokens.len() != 2 {
				return Err(ParseErrorKind::Arity {
					record: "VERSION",
					expected: "1",
					found: tokens.len() - 1,
				});
			}
			Ok(Record::Version {
				line,
				version: tokens[1].to_string(),
			})
		}
		other => Err(ParseErrorKind::UnknownRecord {
			found: other.to_string(),
			suggestion: suggest(other, RECORD_TOKENS.iter().copied()),
		}),
	}
}

/// Checks the token count and reads the optional trailing `INTERNAL`.
fn trailing_internal(
	tokens: &[&str],
	required: usize,
	record: &'static str,
	expected: &'static str,
) -> Result<bool, ParseErrorKind> {
	match tokens.len() {
		n if n == required => Ok(false),
		n if n == required + 1 => {
			if tokens[required] == INTERNAL {
				Ok(true)
			} else {
				Err(ParseErrorKind::UnexpectedToken(tokens[required].to_string()))
			}
		}
		n => Err(ParseErrorKind::Arity {
			record,
			expected,
			found: n - 1,
		}),
	}
}

fn parse_kind(token: &str) -> Result<RecordKind, ParseErrorKind> {
	KIND_TOKENS
		.iter()
		.find(|(t, _)| *t == token)
		.map(|(_, k)| *k)
		.ok_or_else(|| ParseErrorKind::UnknownKind {
			found: token.to_string(),
			suggestion: suggest(token, KIND_TOKENS.iter().map(|(t, _)| *t)),
		})
}

fn suggest(found: &str, candidates: impl Iterator<Item = &'static str>) -> Option<&'static str> {
	let upper = found.to_ascii_uppercase();
	candidates
		.min_by_key(|c| strsim::levenshtein(&upper, c))
		.filter(|c| strsim::levenshtein(&upper, c) <= 3)
}
