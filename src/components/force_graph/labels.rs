//! Word-wrapped node labels for the 2D engine.
//!
//! The label box computed here is the node's footprint: the renderer draws it,
//! the collision force keeps boxes apart and hit-testing uses it for clicks.

use web_sys::CanvasRenderingContext2d;

use super::scale::{LabelConfig, ScaledValues};

/// Measures rendered text width.
pub trait TextMeasure {
	/// Width of `text` at `font` (a CSS font string) whose size is `font_size`.
	fn measure(&self, text: &str, font: &str, font_size: f64) -> f64;
}

impl TextMeasure for CanvasRenderingContext2d {
	fn measure(&self, text: &str, font: &str, font_size: f64) -> f64 {
		self.set_font(font);
		self.measure_text(text)
			.map(|m| m.width())
			.unwrap_or_else(|_| ApproxMeasure::default().measure(text, font, font_size))
	}
}

/// Fixed per-character advance, for headless layout.
#[derive(Clone, Copy, Debug)]
pub struct ApproxMeasure {
	/// Advance per character as a fraction of the font size.
	pub advance: f64,
}

impl Default for ApproxMeasure {
	fn default() -> Self {
		Self { advance: 0.6 }
	}
}

impl TextMeasure for ApproxMeasure {
	fn measure(&self, text: &str, _font: &str, font_size: f64) -> f64 {
		text.chars().count() as f64 * font_size * self.advance
	}
}

/// A wrapped label and the size of its background box, in world units.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelBox {
	/// Wrapped lines, top to bottom.
	pub lines: Vec<String>,
	/// Font size the lines were measured at.
	pub font_size: f64,
	/// Box width including padding.
	pub width: f64,
	/// Box height including padding.
	pub height: f64,
}

impl LabelBox {
	/// Wraps `text` and sizes the background to the widest line plus padding.
	pub fn layout(
		text: &str,
		config: &LabelConfig,
		scale: &ScaledValues,
		measure: &impl TextMeasure,
	) -> Self {
		let lines = wrap_words(text, config.max_width, |s| {
			measure.measure(s, &scale.label_font, scale.font_size)
		});
		let text_width = lines
			.iter()
			.map(|l| measure.measure(l, &scale.label_font, scale.font_size))
			.fold(0.0, f64::max);

		Self {
			width: text_width + config.padding * 2.0,
			height: lines.len() as f64 * scale.font_size + config.padding * 2.0,
			font_size: scale.font_size,
			lines,
		}
	}

	/// Half extents of the box, used by collision and hit-testing.
	pub fn half_extents(&self) -> [f64; 2] {
		[self.width / 2.0, self.height / 2.0]
	}

	/// Whether a point given relative to the box center is inside the box.
	pub fn contains(&self, dx: f64, dy: f64) -> bool {
		dx.abs() <= self.width / 2.0 && dy.abs() <= self.height / 2.0
	}
}

/// Greedy word wrap: each line takes as many words as fit in `max_width`.
/// A single word wider than `max_width` gets a line of its own.
pub fn wrap_words(text: &str, max_width: f64, width_of: impl Fn(&str) -> f64) -> Vec<String> {
	let mut lines = Vec::new();
	let mut line = String::new();

	for word in text.split_whitespace() {
		let candidate = if line.is_empty() {
			word.to_string()
		} else {
			format!("{line} {word}")
		};
		if !line.is_empty() && width_of(&candidate) > max_width {
			lines.push(std::mem::replace(&mut line, word.to_string()));
		} else {
			line = candidate;
		}
	}
	lines.push(line);
	lines
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::scale::ScaleConfig;

	fn chars(s: &str) -> f64 {
		s.chars().count() as f64
	}

	#[test]
	fn wraps_greedily_at_max_width() {
		let lines = wrap_words("aa bb cc dd", 5.0, chars);
		assert_eq!(lines, vec!["aa bb", "cc dd"]);
	}

	#[test]
	fn long_word_gets_its_own_line() {
		let lines = wrap_words("a verylongword b", 4.0, chars);
		assert_eq!(lines, vec!["a", "verylongword", "b"]);
	}

	#[test]
	fn empty_label_is_one_empty_line() {
		assert_eq!(wrap_words("", 10.0, chars), vec![String::new()]);
	}

	#[test]
	fn box_is_sized_to_text_plus_padding() {
		let config = ScaleConfig::default();
		let scale = ScaledValues::new(&config, 1.0);
		let measure = ApproxMeasure { advance: 0.5 };

		// 5 chars * 12px * 0.5 = 30px of text
		let b = LabelBox::layout("{a,c}", &config.label, &scale, &measure);
		assert_eq!(b.lines.len(), 1);
		assert_eq!(b.width, 5.0 * 6.0 + 12.0);
		assert_eq!(b.height, 12.0 + 12.0);
		assert!(b.contains(20.0, 11.0));
		assert!(!b.contains(22.0, 0.0));
	}

	#[test]
	fn long_labels_wrap_into_taller_boxes() {
		let config = ScaleConfig::default();
		let scale = ScaledValues::new(&config, 1.0);
		let text = "the quick brown fox jumps over the lazy dog again and again";
		let b = LabelBox::layout(text, &config.label, &scale, &ApproxMeasure::default());
		assert!(b.lines.len() > 1);
		assert!(b.width <= config.label.max_width + config.label.padding * 2.0);
		assert_eq!(b.height, b.lines.len() as f64 * 12.0 + 12.0);
	}
}
