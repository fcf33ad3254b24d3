//! String grammar of backend results.
//!
//! - relation: `"[A1] → [A2]"`, `"{a} → {b,c}"`
//! - argument: `"[A8]={c,a} ⊢ s"`, or a raw term such as `"p"`
//! - assumption set: `"{c,a}"`, optionally prefixed by a bracketed id

use std::collections::BTreeSet;
use std::fmt;

use crate::error::GraphError;

/// The relation arrow emitted by the backend.
pub const ARROW: char = '→';

/// The turnstile separating an argument's support from its claim.
pub const TURNSTILE: char = '⊢';

/// An assumption set compared by membership, ignoring order and spacing.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssumptionSet(BTreeSet<String>);

impl AssumptionSet {
	/// Parses the first `{...}` group in `text`.
	pub fn find_in(text: &str) -> Option<(Self, &str)> {
		let open = text.find('{')?;
		let close = open + text[open..].find('}')?;
		let inner = &text[open + 1..close];
		let members = inner
			.split(',')
			.map(str::trim)
			.filter(|m| !m.is_empty())
			.map(str::to_string)
			.collect();
		Some((Self(members), &text[open..=close]))
	}

	/// Number of distinct members.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Whether the set is `{}`.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Display for AssumptionSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let members: Vec<&str> = self.0.iter().map(String::as_str).collect();
		write!(f, "{{{}}}", members.join(","))
	}
}

/// Removes a surrounding `[...]` decoration: `"[A7]"` becomes `"A7"`.
pub fn strip_brackets(token: &str) -> &str {
	let token = token.trim();
	match (token.strip_prefix('['), token.find(']')) {
		(Some(_), Some(close)) => token[1..close].trim(),
		_ => token,
	}
}

/// One side of a relation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
	/// A node id such as `A7`.
	Id(String),
	/// An assumption set, to be matched against set-labelled nodes.
	Set(AssumptionSet),
}

impl Endpoint {
	fn classify(token: &str) -> Option<Self> {
		let token = token.trim();
		if token.contains('{') {
			return AssumptionSet::find_in(token).map(|(set, _)| Endpoint::Set(set));
		}
		let id = strip_brackets(token);
		if id.is_empty() || id.contains(ARROW) {
			return None;
		}
		Some(Endpoint::Id(id.to_string()))
	}
}

/// Splits `"<source> → <target>"` into canonical endpoints.
///
/// Strings without an arrow but with two brace groups (`"({a}, {b})"`) are
/// read as a set pair in source, target order.
pub fn parse_relation(entry: &str, expected: &'static str) -> Result<(Endpoint, Endpoint), GraphError> {
	let mismatch = || GraphError::mismatch(entry, expected);

	if entry.contains(ARROW) {
		let mut parts = entry.split(ARROW);
		let (Some(src), Some(tgt), None) = (parts.next(), parts.next(), parts.next()) else {
			return Err(mismatch());
		};
		let src = Endpoint::classify(src).ok_or_else(mismatch)?;
		let tgt = Endpoint::classify(tgt).ok_or_else(mismatch)?;
		return Ok((src, tgt));
	}

	let (first, matched) = AssumptionSet::find_in(entry).ok_or_else(mismatch)?;
	let rest_start = entry.find(matched).map(|i| i + matched.len()).ok_or_else(mismatch)?;
	let (second, _) = AssumptionSet::find_in(&entry[rest_start..]).ok_or_else(mismatch)?;
	Ok((Endpoint::Set(first), Endpoint::Set(second)))
}

/// A parsed argument or assumption-set entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentRepr {
	/// Node id: the bracketed id, or the raw term / set text when undecorated.
	pub id: String,
	/// Brace-delimited support exactly as written (`"{c,a}"`).
	pub set_text: Option<String>,
	/// Parsed support.
	pub set: Option<AssumptionSet>,
	/// Text after the turnstile.
	pub claim: Option<String>,
}

impl ArgumentRepr {
	/// Display label in ABA+ views: the support set when present.
	pub fn plus_label(&self) -> &str {
		self.set_text.as_deref().unwrap_or(&self.id)
	}
}

/// Parses `"[A8]={c,a} ⊢ s"`, `"{c,a}"`, `"[S1]={a}"` or a raw term.
pub fn parse_argument(entry: &str) -> Result<ArgumentRepr, GraphError> {
	let trimmed = entry.trim();
	let mismatch = || GraphError::mismatch(entry, "argument");
	if trimmed.is_empty() || trimmed.contains(ARROW) {
		return Err(mismatch());
	}

	let (id, rest) = if let Some(inner) = trimmed.strip_prefix('[') {
		let close = inner.find(']').ok_or_else(mismatch)?;
		let id = inner[..close].trim();
		if id.is_empty() {
			return Err(mismatch());
		}
		(Some(id.to_string()), inner[close + 1..].trim_start())
	} else {
		(None, trimmed)
	};

	let (set, set_text) = match AssumptionSet::find_in(rest) {
		Some((set, text)) => (Some(set), Some(text.to_string())),
		None if rest.contains('{') => return Err(mismatch()),
		None => (None, None),
	};

	let claim = rest
		.split_once(TURNSTILE)
		.map(|(_, c)| c.trim().to_string())
		.filter(|c| !c.is_empty());

	let id = match (id, &set_text) {
		(Some(id), _) => id,
		(None, Some(text)) => text.clone(),
		(None, None) => trimmed.to_string(),
	};

	Ok(ArgumentRepr {
		id,
		set_text,
		set,
		claim,
	})
}
