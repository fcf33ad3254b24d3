//! Zoom-dependent scaling configuration for graph visuals.
//!
//! # Coordinate Spaces
//!
//! - **World-space**: The coordinate system of the layout. Values in world-space
//!   scale proportionally with zoom (appear larger when zoomed in).
//! - **Screen-space**: Pixel coordinates on the canvas. Values in screen-space
//!   remain constant regardless of zoom level.
//!
//! Label text is the one element that mixes the two: its font shrinks in world
//! units as the view zooms in, but never below [`LabelConfig::min_font`], so
//! the wrapped box (and therefore the collision footprint) depends on `k`.

use serde::Deserialize;

/// Defines how a visual property scales with zoom level.
#[derive(Clone, Debug)]
pub enum ScaleBehavior {
	/// Constant world-space size. Appears larger when zoomed in.
	World,
	/// Constant screen-space size (pixels). Unaffected by zoom.
	Screen,
	/// Screen-space size, but never smaller than `min_world` world units.
	AtLeast { min_world: f64 },
}

impl ScaleBehavior {
	/// Compute the world-space value for a given base value and zoom level.
	pub fn apply(&self, base: f64, k: f64) -> f64 {
		match self {
			ScaleBehavior::World => base,
			ScaleBehavior::Screen => base / k,
			ScaleBehavior::AtLeast { min_world } => (base / k).max(*min_world),
		}
	}
}

/// Wrapped node label geometry, in pixels at zoom 1.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
	/// Maximum text line width before wrapping.
	pub max_width: f64,
	/// Padding between text and the rounded background.
	pub padding: f64,
	/// Font size at zoom 1.
	pub base_font: f64,
	/// Smallest font size in world units.
	pub min_font: f64,
	/// Corner radius of the label background.
	pub corner_radius: f64,
	/// CSS font family.
	pub font_family: String,
}

impl Default for LabelConfig {
	fn default() -> Self {
		Self {
			max_width: 120.0,
			padding: 6.0,
			base_font: 12.0,
			min_font: 8.0,
			corner_radius: 4.0,
			font_family: "sans-serif".into(),
		}
	}
}

/// Complete scale configuration for all graph elements.
#[derive(Clone, Debug)]
pub struct ScaleConfig {
	/// Label sizing.
	pub label: LabelConfig,
	/// How link stroke widths scale.
	pub edge_behavior: ScaleBehavior,
	/// How arrow heads scale.
	pub arrow_behavior: ScaleBehavior,
	/// Dash pattern (dash, gap) in screen pixels for dashed links.
	pub dash_pattern: (f64, f64),
}

impl Default for ScaleConfig {
	fn default() -> Self {
		Self::with_labels(LabelConfig::default())
	}
}

impl ScaleConfig {
	/// Default scaling around the given label config.
	pub fn with_labels(label: LabelConfig) -> Self {
		Self {
			label,
			edge_behavior: ScaleBehavior::Screen,
			arrow_behavior: ScaleBehavior::World,
			dash_pattern: (4.0, 3.0),
		}
	}
}

/// Pre-computed scale values for a specific zoom level.
///
/// Create this once per frame and pass it to rendering functions.
#[derive(Clone, Debug)]
pub struct ScaledValues {
	/// Current zoom level.
	pub k: f64,
	/// Label font size in world-space.
	pub font_size: f64,
	/// CSS font string (e.g., "12px sans-serif").
	pub label_font: String,
	/// Dash pattern in world-space.
	pub dash_pattern: (f64, f64),
	edge_behavior: ScaleBehavior,
	arrow_behavior: ScaleBehavior,
}

impl ScaledValues {
	/// Compute scaled values from configuration and current zoom level.
	pub fn new(config: &ScaleConfig, k: f64) -> Self {
		let k = k.max(f64::EPSILON);
		let font_size = ScaleBehavior::AtLeast {
			min_world: config.label.min_font,
		}
		.apply(config.label.base_font, k);

		Self {
			k,
			font_size,
			label_font: format!("{}px {}", font_size, config.label.font_family),
			dash_pattern: (config.dash_pattern.0 / k, config.dash_pattern.1 / k),
			edge_behavior: config.edge_behavior.clone(),
			arrow_behavior: config.arrow_behavior.clone(),
		}
	}

	/// World-space stroke width for a style width given in pixels.
	pub fn edge_width(&self, base: f64) -> f64 {
		self.edge_behavior.apply(base, self.k)
	}

	/// World-space arrow length for a style arrow length.
	pub fn arrow_length(&self, base: f64) -> f64 {
		self.arrow_behavior.apply(base, self.k)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn font_shrinks_with_zoom_until_the_floor() {
		let config = ScaleConfig::default();
		assert_eq!(ScaledValues::new(&config, 1.0).font_size, 12.0);
		assert_eq!(ScaledValues::new(&config, 0.5).font_size, 24.0);
		assert_eq!(ScaledValues::new(&config, 3.0).font_size, 8.0);
	}

	#[test]
	fn edges_keep_screen_width() {
		let scale = ScaledValues::new(&ScaleConfig::default(), 2.0);
		assert_eq!(scale.edge_width(1.0), 0.5);
		assert_eq!(scale.arrow_length(6.0), 6.0);
	}
}
