//! Backend results to [`GraphModel`].
//!
//! Mapping never fails as a whole. A payload of unknown shape becomes an empty
//! model; an entry that does not parse is skipped, logged and recorded in the
//! [`MappingReport`] while the rest of the payload is still mapped. Node and
//! link order is first-seen order in the payload.

/// Relation and argument string parsing.
pub mod parse;
/// Backend result schemas.
pub mod payload;
/// Streamed relation predictions.
pub mod relations;
/// Framework and transformation display text.
pub mod summary;

use std::collections::BTreeMap;

use log::{info, warn};

use crate::components::force_graph::types::{GraphLink, GraphModel, GraphNode, LinkKind};
use crate::error::GraphError;

use parse::{AssumptionSet, Endpoint, parse_argument, parse_relation};
use payload::{FrameworkState, LegacyResult, NestedPlusResult, Payload, StructuredResult};

/// How a result is interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
	/// Arguments attacking arguments.
	#[default]
	Classical,
	/// ABA+: assumption sets with normal and reverse attacks.
	Plus,
}

/// Which side of a framework transformation to show.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum View {
	/// The framework as submitted.
	Before,
	/// The framework after transformation.
	#[default]
	After,
}

/// The mapped model plus every entry that was dropped on the way.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MappingReport {
	/// The graph to draw.
	pub model: GraphModel,
	/// Interpretation used for the mapping.
	pub mode: Mode,
	/// Entries skipped or dropped, in input order.
	pub issues: Vec<GraphError>,
}

impl MappingReport {
	fn rejected(err: GraphError) -> Self {
		warn!("{err}");
		Self {
			issues: vec![err],
			..Self::default()
		}
	}
}

fn any_non_empty(lists: &[&Vec<String>]) -> bool {
	lists.iter().any(|l| !l.is_empty())
}

fn state(result: &StructuredResult, view: View) -> &FrameworkState {
	match view {
		View::Before => &result.before_transformation,
		View::After => &result.after_transformation,
	}
}

/// Picks classical or ABA+ from what the payload contains.
pub fn detect_mode(payload: &Payload, view: View) -> Mode {
	let plus = match payload {
		Payload::Legacy(r) => !r.reverse_attacks.is_empty(),
		Payload::NestedPlus(r) => any_non_empty(&[&r.aba_plus.normal_attacks, &r.aba_plus.reverse_attacks]),
		Payload::Structured(r) => {
			let s = state(r, view);
			any_non_empty(&[&s.assumption_set_attacks, &s.reverse_attacks])
		}
		Payload::Gradual(_) => false,
	};
	if plus { Mode::Plus } else { Mode::Classical }
}

/// Maps a payload with the mode it asks for.
pub fn map_payload(payload: &Payload, view: View) -> MappingReport {
	map_payload_with_mode(payload, detect_mode(payload, view), view)
}

/// Maps a payload under an explicit interpretation.
pub fn map_payload_with_mode(payload: &Payload, mode: Mode, view: View) -> MappingReport {
	let mut builder = ModelBuilder::default();
	match payload {
		Payload::Legacy(r) => builder.legacy(r, mode),
		Payload::NestedPlus(r) => builder.nested(r, mode),
		Payload::Structured(r) => builder.structured(state(r, view), mode),
		Payload::Gradual(r) => {
			info!("gradual result over {} arguments has no graph", r.num_args);
		}
	}
	let report = builder.finish(mode);
	info!(
		"mapped {} result ({:?}): {} nodes, {} links, {} skipped",
		payload.shape(),
		mode,
		report.model.nodes.len(),
		report.model.links.len(),
		report.issues.len()
	);
	report
}

/// Parses, tags and maps a JSON document. Unknown shapes map to an empty model.
pub fn map_json(text: &str, view: View) -> MappingReport {
	match Payload::from_json(text) {
		Ok(payload) => map_payload(&payload, view),
		Err(err) => MappingReport::rejected(err),
	}
}

/// Appends one relation to an existing model.
///
/// Missing endpoints become new nodes after the existing ones, source first.
/// Nothing already in the model is removed or reordered.
pub fn append_relation(
	model: &mut GraphModel,
	source: &str,
	target: &str,
	kind: LinkKind,
	label: Option<String>,
) -> Result<(), GraphError> {
	let (source, target) = (source.trim(), target.trim());
	if source.is_empty() || target.is_empty() {
		return Err(GraphError::mismatch(&format!("{source} → {target}"), "relation"));
	}
	model.add_node(GraphNode::plain(source));
	model.add_node(GraphNode::plain(target));
	model.add_link(GraphLink {
		label,
		..GraphLink::new(source, target, kind)
	})
}

/// What to do with an assumption-set endpoint no node carries.
#[derive(Clone, Copy, PartialEq, Eq)]
enum UnknownSet {
	/// The relation lives in set space: the set becomes a node.
	Create,
	/// The relation must land on existing argument nodes: skip it.
	Skip,
}

#[derive(Default)]
struct ModelBuilder {
	model: GraphModel,
	/// Node id for every assumption set seen on a node, first registration wins.
	sets: BTreeMap<AssumptionSet, String>,
	issues: Vec<GraphError>,
}

impl ModelBuilder {
	fn skip(&mut self, err: GraphError) {
		warn!("{err}");
		self.issues.push(err);
	}

	fn register(&mut self, set: Option<AssumptionSet>, id: &str) {
		if let Some(set) = set {
			self.sets.entry(set).or_insert_with(|| id.to_string());
		}
	}

	fn argument(&mut self, entry: &str, mode: Mode) {
		match parse_argument(entry) {
			Ok(arg) => {
				let label = match mode {
					Mode::Plus => arg.plus_label().to_string(),
					Mode::Classical => arg.id.clone(),
				};
				self.model.add_node(GraphNode {
					id: arg.id.clone(),
					label,
				});
				self.register(arg.set, &arg.id);
			}
			Err(err) => self.skip(err),
		}
	}

	fn endpoint(&mut self, endpoint: Endpoint, unknown: UnknownSet) -> Option<String> {
		match endpoint {
			Endpoint::Id(id) => {
				self.model.add_node(GraphNode::plain(id.as_str()));
				Some(id)
			}
			Endpoint::Set(set) => {
				if let Some(id) = self.sets.get(&set) {
					return Some(id.clone());
				}
				if unknown == UnknownSet::Skip {
					return None;
				}
				let id = set.to_string();
				self.model.add_node(GraphNode::plain(id.as_str()));
				self.sets.insert(set, id.clone());
				Some(id)
			}
		}
	}

	fn relation(&mut self, entry: &str, kind: LinkKind, expected: &'static str, unknown: UnknownSet) {
		let (src, tgt) = match parse_relation(entry, expected) {
			Ok(pair) => pair,
			Err(err) => return self.skip(err),
		};
		let src_text = endpoint_text(&src);
		let tgt_text = endpoint_text(&tgt);
		// Resolve both before creating anything so a half-resolved entry adds no nodes.
		if unknown == UnknownSet::Skip && (self.unresolved(&src) || self.unresolved(&tgt)) {
			return self.skip(GraphError::DanglingReference {
				source_id: src_text,
				target_id: tgt_text,
			});
		}
		let (Some(source), Some(target)) = (self.endpoint(src, unknown), self.endpoint(tgt, unknown)) else {
			return self.skip(GraphError::DanglingReference {
				source_id: src_text,
				target_id: tgt_text,
			});
		};
		if let Err(err) = self.model.add_link(GraphLink::new(source, target, kind)) {
			self.skip(err);
		}
	}

	fn unresolved(&self, endpoint: &Endpoint) -> bool {
		matches!(endpoint, Endpoint::Set(set) if !self.sets.contains_key(set))
	}

	fn relations(&mut self, entries: &[String], kind: LinkKind, expected: &'static str, unknown: UnknownSet) {
		for entry in entries {
			self.relation(entry, kind, expected, unknown);
		}
	}

	fn legacy(&mut self, r: &LegacyResult, mode: Mode) {
		for arg in &r.arguments {
			self.argument(arg, mode);
		}
		match mode {
			Mode::Classical => {
				self.relations(&r.attacks, LinkKind::Attack, "attack", UnknownSet::Skip);
			}
			Mode::Plus => {
				self.relations(&r.attacks, LinkKind::NormalAttack, "attack", UnknownSet::Skip);
				self.relations(
					&r.reverse_attacks,
					LinkKind::ReverseAttack,
					"reverse attack",
					UnknownSet::Skip,
				);
			}
		}
	}

	fn nested(&mut self, r: &NestedPlusResult, mode: Mode) {
		match mode {
			Mode::Classical => {
				for arg in &r.arguments {
					self.argument(arg, mode);
				}
				self.relations(&r.attacks, LinkKind::Attack, "attack", UnknownSet::Skip);
			}
			Mode::Plus => {
				for set in &r.aba_plus.assumption_combinations {
					self.argument(set, mode);
				}
				let plus = &r.aba_plus;
				self.relations(&plus.normal_attacks, LinkKind::NormalAttack, "normal attack", UnknownSet::Create);
				self.relations(&plus.reverse_attacks, LinkKind::ReverseAttack, "reverse attack", UnknownSet::Create);
			}
		}
	}

	fn structured(&mut self, s: &FrameworkState, mode: Mode) {
		match mode {
			Mode::Classical => {
				for arg in &s.arguments {
					self.argument(arg, mode);
				}
				self.relations(&s.arguments_attacks, LinkKind::Attack, "attack", UnknownSet::Skip);
			}
			Mode::Plus => {
				let nodes = if s.assumption_sets.is_empty() {
					&s.arguments
				} else {
					&s.assumption_sets
				};
				for entry in nodes {
					self.argument(entry, mode);
				}
				self.relations(
					&s.assumption_set_attacks,
					LinkKind::NormalAttack,
					"assumption set attack",
					UnknownSet::Create,
				);
				self.relations(&s.reverse_attacks, LinkKind::ReverseAttack, "reverse attack", UnknownSet::Create);
			}
		}
	}

	fn finish(self, mode: Mode) -> MappingReport {
		MappingReport {
			model: self.model.sanitized(),
			mode,
			issues: self.issues,
		}
	}
}

fn endpoint_text(endpoint: &Endpoint) -> String {
	match endpoint {
		Endpoint::Id(id) => id.clone(),
		Endpoint::Set(set) => set.to_string(),
	}
}
