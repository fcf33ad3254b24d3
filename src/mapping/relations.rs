//! Streamed relation predictions.
//!
//! The prediction service answers with server-sent events, one relation per
//! frame: `data: {"parent": .., "child": .., "relation": {"predicted_label": .., "probability": ..}}`.
//! Frames are separated by a blank line and may be split across network chunks.
//! Lines may end in LF, CRLF or CR; `event:`, `id:` and comment lines are ignored.

use log::warn;
use serde::Deserialize;

use crate::components::force_graph::types::{GraphModel, GraphNode, LinkKind};
use crate::error::GraphError;

use super::append_relation;

const FRAME_SEPARATOR: &str = "\n\n";
const DATA_FIELD: &str = "data:";

#[derive(Debug, Deserialize)]
struct Prediction {
	predicted_label: String,
	probability: f64,
}

#[derive(Debug, Deserialize)]
struct RelationEvent {
	#[serde(default)]
	parent: Option<String>,
	#[serde(default)]
	child: Option<String>,
	relation: Prediction,
	#[serde(default)]
	progress: Option<f64>,
}

/// One predicted relation, oriented child → parent.
#[derive(Clone, Debug, PartialEq)]
pub struct PredictedRelation {
	/// Node the relation points at.
	pub parent: String,
	/// Node the relation starts from.
	pub child: String,
	/// `Support` when the predicted label says so, otherwise `Attack`.
	pub kind: LinkKind,
	/// `"<label> (<probability>%)"`
	pub label: String,
	/// Fraction of the input processed so far, when the service reports it.
	pub progress: Option<f64>,
}

impl PredictedRelation {
	/// Adds the relation to `model`, parent node first.
	pub fn append_to(&self, model: &mut GraphModel) -> Result<(), GraphError> {
		model.add_node(GraphNode::plain(self.parent.as_str()));
		append_relation(model, &self.child, &self.parent, self.kind, Some(self.label.clone()))
	}
}

/// Joined value of every `data:` line in `frame`, or `None` when there is none.
fn frame_data(frame: &str) -> Option<String> {
	let mut data: Option<String> = None;
	for line in frame.lines() {
		let Some(value) = line.strip_prefix(DATA_FIELD) else {
			continue;
		};
		let value = value.strip_prefix(' ').unwrap_or(value);
		match &mut data {
			Some(joined) => {
				joined.push('\n');
				joined.push_str(value);
			}
			None => data = Some(value.to_owned()),
		}
	}
	data
}

/// Decodes one frame. `None` for frames that carry no data line.
pub fn decode_frame(frame: &str) -> Option<Result<PredictedRelation, GraphError>> {
	let body = frame_data(frame)?;
	let mismatch = || GraphError::mismatch(&body, "relation event");

	let event: RelationEvent = match serde_json::from_str(body.trim()) {
		Ok(event) => event,
		Err(_) => return Some(Err(mismatch())),
	};
	let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
	let (Some(parent), Some(child)) = (non_empty(event.parent), non_empty(event.child)) else {
		return Some(Err(mismatch()));
	};

	let p = event.relation;
	let kind = if p.predicted_label.contains("Support") {
		LinkKind::Support
	} else {
		LinkKind::Attack
	};
	Some(Ok(PredictedRelation {
		parent,
		child,
		kind,
		label: format!("{} ({:.1}%)", p.predicted_label, p.probability * 100.0),
		progress: event.progress,
	}))
}

/// Reassembles frames from arbitrary chunks of the event stream.
#[derive(Debug, Default)]
pub struct SseDecoder {
	buffer: String,
}

impl SseDecoder {
	/// Feeds a chunk and returns every relation completed by it. Bad frames are logged and dropped.
	pub fn push(&mut self, chunk: &str) -> Vec<PredictedRelation> {
		self.buffer.push_str(chunk);
		self.normalize_line_endings();
		let Some(end) = self.buffer.rfind(FRAME_SEPARATOR) else {
			return Vec::new();
		};
		let complete: String = self.buffer.drain(..end + FRAME_SEPARATOR.len()).collect();
		complete
			.split(FRAME_SEPARATOR)
			.filter_map(decode_frame)
			.filter_map(|r| r.map_err(|e| warn!("{e}")).ok())
			.collect()
	}

	/// Decodes whatever is left once the stream has ended, as a final frame.
	pub fn finish(&mut self) -> Vec<PredictedRelation> {
		let mut rest = std::mem::take(&mut self.buffer);
		if rest.ends_with('\r') {
			rest.pop();
		}
		decode_frame(&rest)
			.and_then(|r| r.map_err(|e| warn!("{e}")).ok())
			.into_iter()
			.collect()
	}

	/// Rewrites CRLF and lone CR as LF. A trailing CR is kept until the next
	/// chunk shows whether an LF follows it.
	fn normalize_line_endings(&mut self) {
		if !self.buffer.contains('\r') {
			return;
		}
		let trailing_cr = self.buffer.ends_with('\r');
		if trailing_cr {
			self.buffer.pop();
		}
		self.buffer = self.buffer.replace("\r\n", "\n").replace('\r', "\n");
		if trailing_cr {
			self.buffer.push('\r');
		}
	}

	/// Bytes held back waiting for the rest of a frame.
	pub fn pending(&self) -> usize {
		self.buffer.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const SUPPORT: &str =
		r#"data: {"parent": "P", "child": "C", "relation": {"predicted_label": "Support", "probability": 0.875}}"#;

	#[test]
	fn decodes_support_frame() {
		let r = decode_frame(SUPPORT).unwrap().unwrap();
		assert_eq!(r.kind, LinkKind::Support);
		assert_eq!(r.label, "Support (87.5%)");
		assert_eq!((r.parent.as_str(), r.child.as_str()), ("P", "C"));
	}

	#[test]
	fn other_labels_are_attacks() {
		let frame = r#"data: {"parent": "P", "child": "C", "relation": {"predicted_label": "Attack", "probability": 0.5}, "progress": 0.25}"#;
		let r = decode_frame(frame).unwrap().unwrap();
		assert_eq!(r.kind, LinkKind::Attack);
		assert_eq!(r.label, "Attack (50.0%)");
		assert_eq!(r.progress, Some(0.25));
	}

	#[test]
	fn skips_frames_without_data_or_endpoints() {
		assert!(decode_frame(": keep-alive").is_none());
		let missing = r#"data: {"parent": "", "relation": {"predicted_label": "Support", "probability": 1.0}}"#;
		assert!(decode_frame(missing).unwrap().is_err());
		assert!(decode_frame("data: {oops").unwrap().is_err());
	}

	#[test]
	fn reassembles_frames_split_across_chunks() {
		let stream = format!("{SUPPORT}\n\n: ping\n\ndata: {{broken}}\n\n{SUPPORT}\n\n");
		let (a, b) = stream.split_at(40);

		let mut decoder = SseDecoder::default();
		assert!(decoder.push(a).is_empty());
		assert!(decoder.pending() > 0);
		let got = decoder.push(b);
		assert_eq!(got.len(), 2);
		assert_eq!(decoder.pending(), 0);
	}

	#[test]
	fn decodes_crlf_frames() {
		let stream = format!("{SUPPORT}\r\n\r\n{SUPPORT}\r\n\r\n");
		let (a, b) = stream.split_at(stream.len() - 3);

		let mut decoder = SseDecoder::default();
		assert_eq!(decoder.push(a).len(), 1);
		assert_eq!(decoder.push(b).len(), 1);
		assert_eq!(decoder.pending(), 0);
	}

	#[test]
	fn reads_data_after_event_and_id_lines() {
		let frame = format!("event: relation\nid: 7\n{SUPPORT}");
		let r = decode_frame(&frame).unwrap().unwrap();
		assert_eq!(r.label, "Support (87.5%)");

		let split = "event: relation\ndata: {\"parent\": \"P\", \"child\": \"C\",\ndata:\"relation\": {\"predicted_label\": \"Attack\", \"probability\": 0.5}}";
		assert_eq!(decode_frame(split).unwrap().unwrap().kind, LinkKind::Attack);
	}

	#[test]
	fn finish_flushes_an_unterminated_frame() {
		let mut decoder = SseDecoder::default();
		assert!(decoder.push(SUPPORT).is_empty());
		assert_eq!(decoder.finish().len(), 1);
		assert_eq!(decoder.pending(), 0);
		assert!(decoder.finish().is_empty());
	}

	#[test]
	fn appends_parent_before_child() {
		let mut model = GraphModel::default();
		let r = decode_frame(SUPPORT).unwrap().unwrap();
		r.append_to(&mut model).unwrap();
		r.append_to(&mut model).unwrap();

		let ids: Vec<&str> = model.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, vec!["P", "C"]);
		assert_eq!(model.links.len(), 2);
		assert_eq!((model.links[0].source.as_str(), model.links[0].target.as_str()), ("C", "P"));
	}
}
