//! Failure taxonomy for the visualization core.
//!
//! None of these are fatal. The mapper turns parse failures into skipped
//! entries, the controller turns engine failures into a placeholder, and a
//! payload nobody recognises becomes an empty graph.

/// Every locally-recovered failure the core can observe.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
	/// The payload matches none of the known result schemas.
	#[error("payload matches no known result schema: {0}")]
	MalformedPayload(String),

	/// A single relation or argument string did not match its expected pattern.
	#[error("skipping {expected} entry {entry:?}")]
	ParseMismatch {
		/// The offending entry, verbatim.
		entry: String,
		/// What kind of entry was expected (e.g. "attack", "reverse attack").
		expected: &'static str,
	},

	/// The render engine's underlying capability failed to initialise.
	#[error("render engine unavailable: {reason}")]
	EngineUnavailable {
		/// Human readable cause, logged once.
		reason: String,
	},

	/// A link endpoint does not exist in the produced node set.
	#[error("dropping link {source_id} -> {target_id}: endpoint not in node set")]
	DanglingReference {
		/// Source node id.
		source_id: String,
		/// Target node id.
		target_id: String,
	},
}

impl GraphError {
	pub(crate) fn mismatch(entry: &str, expected: &'static str) -> Self {
		Self::ParseMismatch {
			entry: entry.to_string(),
			expected,
		}
	}
}
