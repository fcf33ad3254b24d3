//! Viewer session state as one value with pure transitions.
//!
//! Every user or network event is an [`Action`]; [`ViewerSession::reduce`]
//! returns the next session without touching the previous one. Requests are
//! numbered as they are issued and only the latest one may change the graph,
//! so a slow response can never overwrite a newer one.

use std::fmt;

use log::{info, warn};

use crate::components::force_graph::engine::RenderMode;
use crate::components::force_graph::types::{GraphModel, LinkKind};
use crate::mapping::payload::{FrameworkSnapshot, Payload};
use crate::mapping::relations::PredictedRelation;
use crate::mapping::summary::{PlusFormatter, TransformationOutline, sort_arguments};
use crate::mapping::{Mode, View, append_relation, map_payload};

/// What the next computation will run on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum InputSource {
	/// Nothing chosen yet.
	#[default]
	Empty,
	/// An uploaded framework file.
	File {
		/// File name as shown to the user.
		name: String,
		/// File text.
		content: String,
	},
	/// A bundled example, by name.
	Example(String),
}

/// Sequence number of an issued request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Everything that can change a [`ViewerSession`].
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
	/// The user picked a file.
	SelectFile {
		/// File name.
		name: String,
		/// File text.
		content: String,
	},
	/// The user picked a bundled example.
	SelectExample(String),
	/// Drops the input and outdates any request in flight.
	ClearInput,
	/// Switches between 2D and 3D.
	ToggleRenderMode,
	/// Shows the other side of a transformation and remaps the model.
	SetView(View),
	/// A computation was sent. The new id is [`ViewerSession::latest`].
	RequestIssued,
	/// A response came back. Ignored unless `id` is the latest request.
	ResponseArrived {
		/// Request the response answers.
		id: RequestId,
		/// Decoded result, `None` when the body was unusable.
		payload: Option<Payload>,
	},
	/// A request failed. Ignored unless `id` is the latest request.
	RequestFailed {
		/// Request that failed.
		id: RequestId,
		/// Message shown to the user.
		message: String,
	},
	/// Appends one link to the current model.
	AddRelation {
		/// Source node id.
		source: String,
		/// Target node id.
		target: String,
		/// Link kind.
		kind: LinkKind,
		/// Hover text.
		label: Option<String>,
	},
	/// A streamed prediction arrived; its parent node is added before the link.
	RelationPredicted(PredictedRelation),
}

/// The viewer's whole state. Changed only through [`ViewerSession::reduce`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewerSession {
	/// Selected input.
	pub input: InputSource,
	/// Requested engine.
	pub render_mode: RenderMode,
	/// Transformation side on screen.
	pub view: View,
	/// Interpretation the current model was mapped with.
	pub mode: Mode,
	/// What the canvas draws.
	pub model: GraphModel,
	/// Result the model was mapped from.
	pub payload: Option<Payload>,
	/// Last failure message, cleared by the next success.
	pub error: Option<String>,
	/// Id of the most recently issued request, while it is outstanding.
	pub latest: Option<RequestId>,
	issued: u64,
}

impl ViewerSession {
	/// Empty session.
	pub fn new() -> Self {
		Self::default()
	}

	/// Whether a request is outstanding.
	pub fn is_loading(&self) -> bool {
		self.latest.is_some()
	}

	/// Whether there is an input to compute on.
	pub fn can_submit(&self) -> bool {
		self.input != InputSource::Empty
	}

	/// Whether the current result has separate before and after views.
	pub fn has_views(&self) -> bool {
		self.payload.as_ref().is_some_and(Payload::has_views)
	}

	/// Framework snapshot matching the current view, when the result has one.
	pub fn framework(&self) -> Option<&FrameworkSnapshot> {
		match (self.payload.as_ref()?, self.view) {
			(Payload::Structured(r), View::Before) => Some(&r.before_transformation.framework),
			(Payload::Structured(r), View::After) => Some(&r.after_transformation.framework),
			(Payload::NestedPlus(r), View::Before) => r.original_framework.as_ref(),
			(Payload::NestedPlus(r), View::After) => r.final_framework.as_ref().or(r.original_framework.as_ref()),
			_ => None,
		}
	}

	/// Transformation history of the current result, when it reports one.
	pub fn transformation_outline(&self) -> Option<TransformationOutline> {
		match self.payload.as_ref()? {
			Payload::Structured(r) => Some(TransformationOutline::new(&r.transformations)),
			Payload::NestedPlus(r) => Some(TransformationOutline::new(&r.transformations)),
			_ => None,
		}
	}

	/// Arguments of the current view in `A<n>` order, over assumption sets in ABA+ mode.
	pub fn argument_lines(&self) -> Vec<String> {
		let mut arguments = match self.payload.as_ref() {
			Some(Payload::Legacy(r)) => r.arguments.clone(),
			Some(Payload::NestedPlus(r)) => r.arguments.clone(),
			Some(Payload::Structured(r)) => match self.view {
				View::Before => r.before_transformation.arguments.clone(),
				View::After => r.after_transformation.arguments.clone(),
			},
			Some(Payload::Gradual(_)) | None => return Vec::new(),
		};
		sort_arguments(&mut arguments);
		if self.mode == Mode::Plus {
			let plus = PlusFormatter::new(&arguments);
			arguments.iter().map(|a| plus.argument(a)).collect()
		} else {
			arguments
		}
	}

	/// Applies one action and returns the next state.
	pub fn reduce(self, action: Action) -> Self {
		match action {
			Action::SelectFile { name, content } => Self {
				input: InputSource::File { name, content },
				error: None,
				..self
			},
			Action::SelectExample(name) => Self {
				input: InputSource::Example(name),
				error: None,
				..self
			},
			Action::ClearInput => Self {
				render_mode: self.render_mode,
				issued: self.issued,
				..Self::default()
			},
			Action::ToggleRenderMode => Self {
				render_mode: self.render_mode.toggled(),
				..self
			},
			Action::SetView(view) => self.with_view(view),
			Action::RequestIssued => {
				let issued = self.issued + 1;
				Self {
					issued,
					latest: Some(RequestId(issued)),
					error: None,
					..self
				}
			}
			Action::ResponseArrived { id, payload } => {
				if !self.is_current(id) {
					return self;
				}
				let (model, mode) = payload
					.as_ref()
					.map(|p| {
						let report = map_payload(p, self.view);
						(report.model, report.mode)
					})
					.unwrap_or_default();
				Self {
					model,
					mode,
					payload,
					latest: None,
					..self
				}
			}
			Action::RequestFailed { id, message } => {
				if !self.is_current(id) {
					return self;
				}
				warn!("request {id} failed: {message}");
				Self {
					model: GraphModel::default(),
					payload: None,
					error: Some(message),
					latest: None,
					..self
				}
			}
			Action::AddRelation {
				source,
				target,
				kind,
				label,
			} => {
				let mut model = self.model.clone();
				match append_relation(&mut model, &source, &target, kind, label) {
					Ok(()) => Self { model, ..self },
					Err(e) => {
						warn!("relation not added: {e}");
						self
					}
				}
			}
			Action::RelationPredicted(relation) => {
				let mut model = self.model.clone();
				match relation.append_to(&mut model) {
					Ok(()) => Self { model, ..self },
					Err(e) => {
						warn!("prediction not added: {e}");
						self
					}
				}
			}
		}
	}

	fn is_current(&self, id: RequestId) -> bool {
		if self.latest == Some(id) {
			return true;
		}
		info!("dropping stale response {id}");
		false
	}

	fn with_view(self, view: View) -> Self {
		if view == self.view {
			return self;
		}
		let Some(payload) = self.payload.as_ref().filter(|p| p.has_views()) else {
			return Self { view, ..self };
		};
		let report = map_payload(payload, view);
		Self {
			view,
			model: report.model,
			mode: report.mode,
			..self
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::mapping::relations::SseDecoder;

	fn payload(value: serde_json::Value) -> Payload {
		Payload::classify(value).unwrap()
	}

	fn attacks(list: &[&str]) -> Payload {
		payload(json!({"arguments": [], "attacks": list}))
	}

	fn issue(session: ViewerSession) -> (ViewerSession, RequestId) {
		let session = session.reduce(Action::RequestIssued);
		let id = session.latest.unwrap();
		(session, id)
	}

	#[test]
	fn latest_request_wins() {
		let (s, first) = issue(ViewerSession::new());
		let (s, second) = issue(s);
		assert!(second > first);

		let s = s.reduce(Action::ResponseArrived {
			id: second,
			payload: Some(attacks(&["[A1] → [A2]"])),
		});
		let s = s.reduce(Action::ResponseArrived {
			id: first,
			payload: Some(attacks(&["[B1] → [B2]", "[B2] → [B3]"])),
		});
		let ids: Vec<_> = s.model.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, ["A1", "A2"]);
		assert!(!s.is_loading());
	}

	#[test]
	fn stale_failure_is_ignored() {
		let (s, first) = issue(ViewerSession::new());
		let (s, second) = issue(s);
		let s = s.reduce(Action::RequestFailed {
			id: first,
			message: "timeout".into(),
		});
		assert_eq!(s.error, None);
		assert_eq!(s.latest, Some(second));

		let s = s.reduce(Action::RequestFailed {
			id: second,
			message: "500".into(),
		});
		assert_eq!(s.error.as_deref(), Some("500"));
		assert!(s.model.is_empty());
	}

	#[test]
	fn absent_result_renders_empty() {
		let (s, id) = issue(ViewerSession::new());
		let s = s.reduce(Action::ResponseArrived { id, payload: None });
		assert!(s.model.is_empty());
		assert!(!s.is_loading());
	}

	#[test]
	fn selecting_input_replaces_previous_choice() {
		let s = ViewerSession::new()
			.reduce(Action::SelectFile {
				name: "fw.txt".into(),
				content: "a".into(),
			})
			.reduce(Action::SelectExample("simple".into()));
		assert_eq!(s.input, InputSource::Example("simple".into()));
		assert!(s.can_submit());
		assert!(!s.reduce(Action::ClearInput).can_submit());
	}

	#[test]
	fn clear_input_keeps_render_mode_and_outdates_requests() {
		let s = ViewerSession::new().reduce(Action::ToggleRenderMode);
		let (s, id) = issue(s);
		let s = s.reduce(Action::ClearInput);
		assert_eq!(s.render_mode, RenderMode::ThreeD);
		let s = s.reduce(Action::ResponseArrived {
			id,
			payload: Some(attacks(&["[A1] → [A2]"])),
		});
		assert!(s.model.is_empty());

		let (_, next) = issue(s);
		assert!(next > id);
	}

	#[test]
	fn set_view_remaps_structured_results() {
		let state = |attacks: &[&str]| {
			json!({
				"arguments": ["[A1]={a} ⊢ p", "[A2]={b} ⊢ q", "[A3]={c} ⊢ r"],
				"arguments_attacks": attacks,
			})
		};
		let structured = payload(json!({
			"meta": {"transformed": true, "transformations_applied": ["atomic"]},
			"before_transformation": state(&["[A1] → [A2]"]),
			"after_transformation": state(&["[A1] → [A2]", "[A2] → [A3]"]),
		}));
		let (s, id) = issue(ViewerSession::new());
		let s = s.reduce(Action::ResponseArrived {
			id,
			payload: Some(structured),
		});
		assert!(s.has_views());
		assert_eq!(s.model.links.len(), 2);

		let s = s.reduce(Action::SetView(View::Before));
		assert_eq!(s.view, View::Before);
		assert_eq!(s.model.links.len(), 1);
	}

	#[test]
	fn framework_and_arguments_follow_view() {
		let state = |lang: &[&str], args: &[&str]| {
			json!({
				"framework": {"language": lang, "assumptions": ["a"]},
				"arguments": args,
				"assumption_set_attacks": ["{a} → {b}"],
			})
		};
		let structured = payload(json!({
			"before_transformation": state(&["a", "p"], &["[A2]={b} ⊢ q", "[A1]={a} ⊢ p"]),
			"after_transformation": state(&["a", "b", "p"], &["[A1]={a} ⊢ p"]),
			"transformations": [{"step": "atomic", "applied": false}],
		}));
		let (s, id) = issue(ViewerSession::new());
		let s = s
			.reduce(Action::ResponseArrived {
				id,
				payload: Some(structured),
			})
			.reduce(Action::SetView(View::Before));
		assert_eq!(s.mode, Mode::Plus);
		assert_eq!(s.framework().unwrap().language, ["a", "p"]);
		assert_eq!(s.argument_lines(), ["{a} ⊢ p", "{b} ⊢ q"]);
		assert_eq!(s.transformation_outline(), Some(TransformationOutline::Unchanged));
		assert_eq!(ViewerSession::new().framework(), None);
	}

	#[test]
	fn add_relation_appends_without_reordering() {
		let (s, id) = issue(ViewerSession::new());
		let s = s.reduce(Action::ResponseArrived {
			id,
			payload: Some(attacks(&["[A1] → [A2]"])),
		});
		let s = s.reduce(Action::AddRelation {
			source: "A3".into(),
			target: "A1".into(),
			kind: LinkKind::Support,
			label: None,
		});
		let ids: Vec<_> = s.model.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, ["A1", "A2", "A3"]);
		assert_eq!(s.model.links.len(), 2);

		let unchanged = s.clone().reduce(Action::AddRelation {
			source: " ".into(),
			target: "A1".into(),
			kind: LinkKind::Attack,
			label: None,
		});
		assert_eq!(unchanged, s);
	}

	#[test]
	fn streamed_predictions_grow_the_model() {
		let mut decoder = SseDecoder::default();
		let frame = r#"data: {"parent": "P", "child": "C", "relation": {"predicted_label": "Attack", "probability": 0.5}}"#;
		let s = decoder
			.push(&format!("{frame}\n\n"))
			.into_iter()
			.fold(ViewerSession::new(), |s, r| s.reduce(Action::RelationPredicted(r)));

		let ids: Vec<_> = s.model.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, ["P", "C"]);
		assert_eq!(s.model.links[0].label.as_deref(), Some("Attack (50.0%)"));
	}
}
