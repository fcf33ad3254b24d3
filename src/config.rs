//! Viewer configuration.
//!
//! Every field has a default, so a host page may override any subset by
//! embedding `<script id="graph-config" type="application/json">` with a partial
//! document. A missing or unreadable element yields the defaults.

use log::{info, warn};
use serde::Deserialize;
use wasm_bindgen::JsCast;
use web_sys::HtmlScriptElement;

use crate::components::force_graph::physics::{LayoutConfig, SettleConfig};
use crate::components::force_graph::scale::LabelConfig;

/// Element id the host page uses for configuration.
pub const CONFIG_ELEMENT_ID: &str = "graph-config";

/// Camera fit applied after new data or a mode switch.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ZoomConfig {
	/// Camera animation length.
	pub duration_ms: f64,
	/// Screen margin kept around the graph.
	pub padding_px: f64,
}

impl Default for ZoomConfig {
	fn default() -> Self {
		Self {
			duration_ms: 400.0,
			padding_px: 50.0,
		}
	}
}

/// Everything a host page can tune, all optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
	/// Automatic and button-driven fit.
	pub zoom: ZoomConfig,
	/// When the layout counts as settled.
	pub settle: SettleConfig,
	/// Force parameters.
	pub layout: LayoutConfig,
	/// 2D label sizing.
	pub labels: LabelConfig,
}

impl ViewerConfig {
	/// Parses a config document; missing fields take defaults.
	pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(text)
	}

	/// Reads the host page's config element, falling back to defaults.
	pub fn load_from_dom() -> Self {
		if !cfg!(target_arch = "wasm32") {
			return Self::default();
		}
		let Some(text) = config_text() else {
			return Self::default();
		};
		match Self::from_json(&text) {
			Ok(config) => {
				info!("viewer config loaded from #{CONFIG_ELEMENT_ID}");
				config
			}
			Err(e) => {
				warn!("ignoring #{CONFIG_ELEMENT_ID}: {e}");
				Self::default()
			}
		}
	}
}

fn config_text() -> Option<String> {
	let document = web_sys::window()?.document()?;
	let script: HtmlScriptElement = document.get_element_by_id(CONFIG_ELEMENT_ID)?.dyn_into().ok()?;
	script.text().ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_documented_values() {
		let c = ViewerConfig::default();
		assert_eq!(c.zoom, ZoomConfig {
			duration_ms: 400.0,
			padding_px: 50.0
		});
		assert_eq!(c.layout.link_distance, 50.0);
		assert_eq!(c.layout.collision_strength, 0.5);
		assert_eq!(c.labels.max_width, 120.0);
		assert_eq!(c.settle.step_budget, 24);
	}

	#[test]
	fn partial_documents_keep_other_defaults() {
		let c = ViewerConfig::from_json(r#"{"zoom": {"padding_px": 20}, "labels": {"max_width": 80}}"#).unwrap();
		assert_eq!(c.zoom.duration_ms, 400.0);
		assert_eq!(c.zoom.padding_px, 20.0);
		assert_eq!(c.labels.max_width, 80.0);
		assert_eq!(c.labels.padding, 6.0);
	}

	#[test]
	fn rejects_wrong_types() {
		assert!(ViewerConfig::from_json(r#"{"zoom": {"duration_ms": "slow"}}"#).is_err());
	}

	#[test]
	fn loads_defaults_off_the_web() {
		assert_eq!(ViewerConfig::load_from_dom().zoom, ZoomConfig::default());
	}
}
