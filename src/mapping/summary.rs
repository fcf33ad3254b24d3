//! Text summaries shown next to the graph.

use std::collections::BTreeMap;
use std::fmt;

use super::parse::{ARROW, Endpoint, parse_argument, parse_relation, strip_brackets};
use super::payload::{FrameworkSnapshot, Rule, TransformationStep};

/// `{a, b, c}`
pub fn format_set<S: AsRef<str>>(items: &[S]) -> String {
	let items: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
	format!("{{{}}}", items.join(", "))
}

/// `r1: p ← a, b`, or `r1: p ← ∅` for a fact.
pub fn format_rule(rule: &Rule) -> String {
	let body = if rule.body.is_empty() {
		"∅".to_string()
	} else {
		rule.body.join(", ")
	};
	format!("{}: {} ← {}", rule.id, rule.head, body)
}

/// `a̅ = b`
pub fn format_contrary(assumption: &str, contrary: &str) -> String {
	format!("{assumption}\u{0305} = {contrary}")
}

/// `a > b, c`
pub fn format_preference(preferred: &str, over: &[String]) -> String {
	format!("{preferred} > {}", over.join(", "))
}

/// A framework snapshot as display lines.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameworkSummary {
	/// `{a, b, c}`
	pub language: String,
	/// `{a, b}`
	pub assumptions: String,
	/// One line per rule.
	pub rules: Vec<String>,
	/// One line per contrary.
	pub contraries: Vec<String>,
	/// One line per non-empty preference.
	pub preferences: Vec<String>,
}

impl From<&FrameworkSnapshot> for FrameworkSummary {
	fn from(fw: &FrameworkSnapshot) -> Self {
		let preferences = fw
			.preferences
			.as_ref()
			.map(|p: &BTreeMap<String, Vec<String>>| {
				p.iter()
					.filter(|(_, over)| !over.is_empty())
					.map(|(k, over)| format_preference(k, over))
					.collect()
			})
			.unwrap_or_default();

		Self {
			language: format_set(&fw.language),
			assumptions: format_set(&fw.assumptions),
			rules: fw.rules.iter().map(format_rule).collect(),
			contraries: fw.contraries.iter().map(|(a, c)| format_contrary(a, c)).collect(),
			preferences,
		}
	}
}

/// Heading for a transformation step.
pub fn step_title(step: &str) -> &'static str {
	match step {
		"non_circular" => "Circular → Non-Circular",
		"atomic" => "Non-Atomic → Atomic",
		_ => "No Transformation",
	}
}

/// One applied or skipped transformation step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepOutline {
	/// Heading from [`step_title`].
	pub title: &'static str,
	/// Backend explanation, shown under the heading.
	pub reason: Option<String>,
	/// Language after the step, when the backend sent a snapshot.
	pub new_language: Option<String>,
}

/// What the transformation history amounts to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransformationOutline {
	/// The backend sent no history.
	Missing,
	/// Every step was skipped.
	Unchanged,
	/// At least one step applied.
	Steps(Vec<StepOutline>),
}

impl TransformationOutline {
	/// Summarises a backend transformation history.
	pub fn new(steps: &[TransformationStep]) -> Self {
		if steps.is_empty() {
			return Self::Missing;
		}
		if steps.iter().all(|s| !s.applied) {
			return Self::Unchanged;
		}
		Self::Steps(
			steps
				.iter()
				.map(|s| StepOutline {
					title: step_title(&s.step),
					reason: s.reason.clone(),
					new_language: s.result_snapshot.as_ref().map(|fw| format_set(&fw.language)),
				})
				.collect(),
		)
	}
}

impl fmt::Display for TransformationOutline {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Missing => f.write_str("No transformation data available."),
			Self::Unchanged => f.write_str("The framework is already non-circular and atomic."),
			Self::Steps(steps) => {
				for (i, step) in steps.iter().enumerate() {
					if i > 0 {
						writeln!(f)?;
					}
					f.write_str(step.title)?;
					if let Some(reason) = &step.reason {
						write!(f, "\n  {reason}")?;
					}
					if let Some(language) = &step.new_language {
						write!(f, "\n  New language: {language}")?;
					}
				}
				Ok(())
			}
		}
	}
}

fn argument_number(entry: &str) -> Option<u64> {
	let id = strip_brackets(entry.split('=').next()?);
	id.strip_prefix('A')?.parse().ok()
}

/// Orders arguments by their `A<n>` number; unnumbered entries follow in text order.
pub fn sort_arguments(arguments: &mut [String]) {
	arguments.sort_by_cached_key(|a| {
		let n = argument_number(a);
		(n.is_none(), n, a.clone())
	});
}

/// Rewrites argument-level strings in terms of assumption sets for ABA+ views.
#[derive(Clone, Debug, Default)]
pub struct PlusFormatter {
	sets: BTreeMap<String, String>,
}

impl PlusFormatter {
	/// Indexes the assumption set of every parseable argument.
	pub fn new<S: AsRef<str>>(arguments: &[S]) -> Self {
		let sets = arguments
			.iter()
			.filter_map(|a| parse_argument(a.as_ref()).ok())
			.filter_map(|a| Some((a.id, a.set_text?)))
			.collect();
		Self { sets }
	}

	/// `[A8]={c,a} ⊢ s` becomes `{c,a} ⊢ s`.
	pub fn argument(&self, entry: &str) -> String {
		match parse_argument(entry) {
			Ok(arg) => match (arg.set_text, arg.claim) {
				(Some(set), Some(claim)) => format!("{set} ⊢ {claim}"),
				_ => entry.to_string(),
			},
			Err(_) => entry.to_string(),
		}
	}

	/// `[A1] → [A2]` becomes `{a} → {b}` when both ids have known sets.
	pub fn attack(&self, entry: &str) -> String {
		let Ok((src, tgt)) = parse_relation(entry, "attack") else {
			return entry.to_string();
		};
		format!("{} {ARROW} {}", self.side(&src), self.side(&tgt))
	}

	/// Normalises a reverse attack to `{a} → {b}`.
	pub fn reverse_attack(&self, entry: &str) -> String {
		match parse_relation(entry, "reverse attack") {
			Ok((Endpoint::Set(a), Endpoint::Set(b))) => format!("{a} {ARROW} {b}"),
			_ => entry.to_string(),
		}
	}

	fn side(&self, endpoint: &Endpoint) -> String {
		match endpoint {
			Endpoint::Id(id) => self.sets.get(id).cloned().unwrap_or_else(|| format!("[{id}]")),
			Endpoint::Set(set) => set.to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn formats_framework_snapshot() {
		let fw = FrameworkSnapshot {
			language: vec!["a".into(), "b".into(), "p".into()],
			assumptions: vec!["a".into(), "b".into()],
			rules: vec![
				Rule {
					id: "r1".into(),
					head: "p".into(),
					body: vec!["a".into(), "b".into()],
				},
				Rule {
					id: "r2".into(),
					head: "q".into(),
					body: vec![],
				},
			],
			contraries: vec![("a".into(), "q".into())],
			preferences: Some(BTreeMap::from([
				("a".to_string(), vec!["b".to_string(), "c".to_string()]),
				("b".to_string(), vec![]),
			])),
		};
		let s = FrameworkSummary::from(&fw);
		assert_eq!(s.language, "{a, b, p}");
		assert_eq!(s.assumptions, "{a, b}");
		assert_eq!(s.rules, vec!["r1: p ← a, b", "r2: q ← ∅"]);
		assert_eq!(s.contraries, vec!["a\u{0305} = q"]);
		assert_eq!(s.preferences, vec!["a > b, c"]);
	}

	#[test]
	fn outlines_transformations() {
		assert_eq!(TransformationOutline::new(&[]), TransformationOutline::Missing);

		let skipped = vec![TransformationStep {
			step: "atomic".into(),
			..Default::default()
		}];
		assert_eq!(
			TransformationOutline::new(&skipped).to_string(),
			"The framework is already non-circular and atomic."
		);

		let applied = vec![TransformationStep {
			step: "non_circular".into(),
			applied: true,
			reason: Some("cycle through p".into()),
			result_snapshot: Some(FrameworkSnapshot {
				language: vec!["p".into(), "p1".into()],
				..Default::default()
			}),
		}];
		assert_eq!(
			TransformationOutline::new(&applied).to_string(),
			"Circular → Non-Circular\n  cycle through p\n  New language: {p, p1}"
		);
	}

	#[test]
	fn sorts_arguments_numerically() {
		let mut args = vec!["[A10]={a} ⊢ x".to_string(), "[A2]={b} ⊢ y".into(), "p".into()];
		sort_arguments(&mut args);
		assert_eq!(args[0], "[A2]={b} ⊢ y");
		assert_eq!(args[1], "[A10]={a} ⊢ x");
	}

	#[test]
	fn plus_formatter_substitutes_sets() {
		let args = ["[A1]={a,b} ⊢ p", "[A2]={c} ⊢ q"];
		let f = PlusFormatter::new(&args);
		assert_eq!(f.argument(args[0]), "{a,b} ⊢ p");
		assert_eq!(f.attack("[A1] → [A2]"), "{a,b} → {c}");
		assert_eq!(f.attack("[A1] → [A9]"), "{a,b} → [A9]");
		assert_eq!(f.attack("garbage"), "garbage");
		assert_eq!(f.reverse_attack("({b,a}, {c})"), "{a,b} → {c}");
	}
}
