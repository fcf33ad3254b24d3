//! Backend result schemas as one closed, tagged union.
//!
//! Each shape has its own discriminator over the raw JSON object; the first
//! one that matches decides how the whole payload is decoded. Nothing
//! downstream sniffs optional fields to guess which shape it was handed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GraphError;

/// An inference rule of the framework.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
	/// Rule name.
	pub id: String,
	/// Conclusion.
	pub head: String,
	/// Premises; empty for facts.
	#[serde(default)]
	pub body: Vec<String>,
}

/// Read-only description of a framework at one point in its transformation history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkSnapshot {
	/// Every sentence.
	pub language: Vec<String>,
	/// Assumable sentences.
	pub assumptions: Vec<String>,
	/// Inference rules.
	pub rules: Vec<Rule>,
	/// `(assumption, contrary)` pairs.
	pub contraries: Vec<(String, String)>,
	/// ABA+ preferences: each key is preferred over its list.
	pub preferences: Option<BTreeMap<String, Vec<String>>>,
}

/// One normalisation step reported by the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationStep {
	/// Step name, e.g. `non_circular`.
	pub step: String,
	/// Whether the step changed the framework.
	#[serde(default)]
	pub applied: bool,
	/// Backend explanation.
	#[serde(default)]
	pub reason: Option<String>,
	/// Framework after the step.
	#[serde(default)]
	pub result_snapshot: Option<FrameworkSnapshot>,
}

/// `{assumptions, arguments, attacks, reverse_attacks}`, each a list of strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyResult {
	/// Bare assumption names.
	pub assumptions: Vec<String>,
	/// Arguments as `[A1]={a,b} ⊢ s`.
	pub arguments: Vec<String>,
	/// `[A1] → [A2]` attacks.
	pub attacks: Vec<String>,
	/// `{a} → {b}` set attacks.
	pub reverse_attacks: Vec<String>,
}

/// The `aba_plus` section of a nested ABA+ result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbaPlusSection {
	/// Assumption sets, the node space of the ABA+ view.
	pub assumption_combinations: Vec<String>,
	/// Set attacks that follow the contrary relation.
	pub normal_attacks: Vec<String>,
	/// Set attacks reversed by preferences.
	pub reverse_attacks: Vec<String>,
}

/// Classical results at the top level, ABA+ results nested under `aba_plus`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NestedPlusResult {
	/// Classical arguments.
	pub arguments: Vec<String>,
	/// Classical argument attacks.
	pub attacks: Vec<String>,
	/// The ABA+ part of the result.
	pub aba_plus: AbaPlusSection,
	/// Transformation history.
	pub transformations: Vec<TransformationStep>,
	/// Framework as submitted.
	pub original_framework: Option<FrameworkSnapshot>,
	/// Framework after transformation.
	pub final_framework: Option<FrameworkSnapshot>,
}

/// Result summary flags of a dual-view payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultMeta {
	/// Whether any transformation changed the framework.
	pub transformed: bool,
	/// Names of the applied transformations.
	pub transformations_applied: Vec<String>,
}

/// Everything computed for one framework state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkState {
	/// The framework itself.
	pub framework: FrameworkSnapshot,
	/// Arguments built from it.
	pub arguments: Vec<String>,
	/// Argument attacks.
	pub arguments_attacks: Vec<String>,
	/// Assumption sets.
	pub assumption_sets: Vec<String>,
	/// Normal set attacks.
	pub assumption_set_attacks: Vec<String>,
	/// Reverse set attacks.
	pub reverse_attacks: Vec<String>,
}

/// Results before and after the backend's framework transformation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredResult {
	/// Summary flags.
	pub meta: ResultMeta,
	/// State as submitted.
	pub before_transformation: FrameworkState,
	/// State after transformation.
	pub after_transformation: FrameworkState,
	/// Transformation history.
	pub transformations: Vec<TransformationStep>,
}

/// Gradual-semantics sampling result. Not graphed; recognised so it maps to "no data".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradualResult {
	/// Number of arguments sampled.
	pub num_args: usize,
	/// Volume of the acceptability hull, when three-dimensional.
	pub hull_volume: Option<f64>,
	/// Area of the acceptability hull, when two-dimensional.
	pub hull_area: Option<f64>,
	/// Hull vertices.
	pub hull_points: Vec<Vec<f64>>,
	/// Sampled strength vectors.
	pub samples: Vec<Vec<f64>>,
}

/// Every backend result shape the viewer knows about.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
	/// Flat classical result.
	Legacy(LegacyResult),
	/// Classical result with an `aba_plus` section.
	NestedPlus(NestedPlusResult),
	/// Before and after views of a transformed framework.
	Structured(Box<StructuredResult>),
	/// Gradual semantics; never graphed.
	Gradual(GradualResult),
}

fn has_object(obj: &Map<String, Value>, key: &str) -> bool {
	obj.get(key).is_some_and(Value::is_object)
}

fn has_array(obj: &Map<String, Value>, key: &str) -> bool {
	obj.get(key).is_some_and(Value::is_array)
}

fn is_structured(obj: &Map<String, Value>) -> bool {
	has_object(obj, "before_transformation") && has_object(obj, "after_transformation")
}

fn is_nested_plus(obj: &Map<String, Value>) -> bool {
	has_object(obj, "aba_plus")
}

fn is_gradual(obj: &Map<String, Value>) -> bool {
	obj.contains_key("num_args") && (has_array(obj, "samples") || has_array(obj, "hull_points"))
}

fn is_legacy(obj: &Map<String, Value>) -> bool {
	["assumptions", "arguments", "attacks", "reverse_attacks"]
		.iter()
		.any(|k| has_array(obj, k))
}

impl Payload {
	/// Tags a decoded JSON value.
	pub fn classify(value: Value) -> Result<Self, GraphError> {
		let Value::Object(obj) = &value else {
			return Err(GraphError::MalformedPayload(format!(
				"expected an object, got {}",
				kind_of(&value)
			)));
		};

		let decoded = if is_structured(obj) {
			serde_json::from_value(value).map(|r| Payload::Structured(Box::new(r)))
		} else if is_nested_plus(obj) {
			serde_json::from_value(value).map(Payload::NestedPlus)
		} else if is_gradual(obj) {
			serde_json::from_value(value).map(Payload::Gradual)
		} else if is_legacy(obj) {
			serde_json::from_value(value).map(Payload::Legacy)
		} else {
			let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
			return Err(GraphError::MalformedPayload(format!(
				"unrecognised keys [{}]",
				keys.join(", ")
			)));
		};
		decoded.map_err(|e| GraphError::MalformedPayload(e.to_string()))
	}

	/// Parses and tags a JSON document.
	pub fn from_json(text: &str) -> Result<Self, GraphError> {
		let value: Value =
			serde_json::from_str(text).map_err(|e| GraphError::MalformedPayload(e.to_string()))?;
		Self::classify(value)
	}

	/// Whether the payload carries separate before/after states.
	pub fn has_views(&self) -> bool {
		matches!(self, Payload::Structured(_))
	}

	/// Short name for logs.
	pub fn shape(&self) -> &'static str {
		match self {
			Payload::Legacy(_) => "legacy",
			Payload::NestedPlus(_) => "nested-plus",
			Payload::Structured(_) => "structured",
			Payload::Gradual(_) => "gradual",
		}
	}
}

fn kind_of(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn classifies_legacy() {
		let p = Payload::classify(json!({"arguments": [], "attacks": ["[A1] → [A2]"]})).unwrap();
		let Payload::Legacy(r) = p else {
			panic!("expected legacy");
		};
		assert_eq!(r.attacks.len(), 1);
		assert!(r.reverse_attacks.is_empty());
	}

	#[test]
	fn classifies_nested_plus() {
		let p = Payload::classify(json!({
			"arguments": ["[A1]={a} ⊢ x"],
			"attacks": [],
			"aba_plus": {"assumption_combinations": ["{a}"], "reverse_attacks": ["{a} → {a}"]}
		}))
		.unwrap();
		assert_eq!(p.shape(), "nested-plus");
	}

	#[test]
	fn classifies_structured_before_anything_else() {
		let p = Payload::classify(json!({
			"meta": {"transformed": true, "transformations_applied": ["atomic"]},
			"before_transformation": {"arguments": ["[A1]={a} ⊢ x"]},
			"after_transformation": {
				"framework": {
					"language": ["a", "x"],
					"assumptions": ["a"],
					"rules": [{"id": "r1", "head": "x", "body": ["a"]}],
					"contraries": [["a", "x"]],
					"preferences": {"a": ["b"]}
				},
				"arguments": []
			},
			"transformations": [{"step": "atomic", "applied": true}],
			"attacks": []
		}))
		.unwrap();
		let Payload::Structured(r) = p else {
			panic!("expected structured");
		};
		assert!(r.meta.transformed);
		assert_eq!(r.after_transformation.framework.contraries[0].1, "x");
		assert!(r.transformations[0].applied);
	}

	#[test]
	fn classifies_gradual() {
		let p = Payload::classify(json!({
			"num_args": 3, "hull_volume": null, "hull_area": 1.5,
			"hull_points": [[0.0, 1.0]], "samples": []
		}))
		.unwrap();
		assert_eq!(p.shape(), "gradual");
		assert!(!p.has_views());
	}

	#[test]
	fn rejects_unknown_shapes() {
		for value in [json!(null), json!([1, 2]), json!({"nodes": []}), json!("text")] {
			assert!(matches!(
				Payload::classify(value),
				Err(GraphError::MalformedPayload(_))
			));
		}
		assert!(Payload::from_json("{not json").is_err());
	}

	#[test]
	fn wrong_field_types_are_malformed() {
		let err = Payload::classify(json!({"arguments": [], "attacks": [1, 2]})).unwrap_err();
		assert!(matches!(err, GraphError::MalformedPayload(_)));
	}
}
