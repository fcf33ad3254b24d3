//! Visual theming for the force graph.
//!
//! A [`Theme`] carries the three abstract color roles (background, foreground,
//! accent) plus the node palette. Engines never read the page directly: they
//! are handed a [`ThemeResolver`] at construction and call it when they mount.

use log::debug;

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	/// Red channel.
	pub r: u8,
	/// Green channel.
	pub g: u8,
	/// Blue channel.
	pub b: u8,
	/// Opacity in 0..1.
	pub a: f64,
}

impl Color {
	/// Opaque color.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	/// Color with explicit opacity.
	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	/// Same color at opacity `a`.
	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Perceived brightness in 0..1.
	pub fn luminance(self) -> f64 {
		(0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64) / 255.0
	}

	/// Black or white, whichever reads better on top of `self`.
	pub fn readable_ink(self) -> Self {
		if self.luminance() > 0.5 {
			Self::rgb(0, 0, 0)
		} else {
			Self::rgb(255, 255, 255)
		}
	}

	/// Hex form when opaque, `rgba()` otherwise.
	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}

	/// Parses a CSS color string.
	/// Supports hex (`#RGB`, `#RRGGBB`), `rgb()`/`rgba()` functional notation and
	/// the few named colors the host stylesheet is known to use.
	pub fn parse(color_str: &str) -> Option<Color> {
		let s = color_str.trim();
		if let Some(hex) = s.strip_prefix('#') {
			if !hex.is_ascii() {
				return None;
			}
			return match hex.len() {
				3 => {
					let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
					Some(Color::rgb(digit(0)?, digit(1)?, digit(2)?))
				}
				6 => Some(Color::rgb(
					u8::from_str_radix(&hex[0..2], 16).ok()?,
					u8::from_str_radix(&hex[2..4], 16).ok()?,
					u8::from_str_radix(&hex[4..6], 16).ok()?,
				)),
				_ => None,
			};
		}
		if s.starts_with("rgb") {
			let nums: Vec<&str> = s
				.trim_start_matches("rgba(")
				.trim_start_matches("rgb(")
				.trim_end_matches(')')
				.split(',')
				.collect();
			let r = nums.first()?.trim().parse().ok()?;
			let g = nums.get(1)?.trim().parse().ok()?;
			let b = nums.get(2)?.trim().parse().ok()?;
			let a = nums
				.get(3)
				.and_then(|s| s.trim().parse().ok())
				.unwrap_or(1.0);
			return Some(Color::rgba(r, g, b, a));
		}
		match s {
			"white" => Some(Color::rgb(255, 255, 255)),
			"black" => Some(Color::rgb(0, 0, 0)),
			"dodgerblue" => Some(Color::rgb(30, 144, 255)),
			_ => None,
		}
	}
}

/// A curated color palette for nodes.
#[derive(Clone, Debug)]
pub struct NodePalette {
	/// Colors in assignment order.
	pub colors: Vec<Color>,
}

impl NodePalette {
	/// Brighter categorical palette, closer to auto-coloring by id.
	pub fn vivid() -> Self {
		Self {
			colors: vec![
				Color::rgb(31, 119, 180),
				Color::rgb(255, 127, 14),
				Color::rgb(44, 160, 44),
				Color::rgb(214, 39, 40),
				Color::rgb(148, 103, 189),
				Color::rgb(140, 86, 75),
				Color::rgb(227, 119, 194),
				Color::rgb(188, 189, 34),
				Color::rgb(23, 190, 207),
			],
		}
	}

	/// Color for the `index`th node, cycling through the palette.
	pub fn get(&self, index: usize) -> Color {
		self.colors[index % self.colors.len()]
	}
}

/// Concrete paint values for one mounted engine.
#[derive(Clone, Debug)]
pub struct Theme {
	/// Canvas clear color.
	pub background: Color,
	/// Text and 3D label color.
	pub foreground: Color,
	/// Highlight color.
	pub accent: Color,
	/// Fill behind 2D node labels.
	pub label_fill: Color,
	/// Ink for 2D node labels.
	pub label_ink: Color,
	/// 3D node colors, assigned by node index.
	pub palette: NodePalette,
}

impl Theme {
	/// The documented fallback used when no presentation environment exists.
	///
	/// background `#111111`, foreground `#ffffff`, accent `dodgerblue`.
	pub fn fallback() -> Self {
		Self {
			background: Color::rgb(17, 17, 17),
			foreground: Color::rgb(255, 255, 255),
			accent: Color::rgb(30, 144, 255),
			label_fill: Color::rgba(255, 255, 255, 0.85),
			label_ink: Color::rgba(255, 255, 255, 0.85).readable_ink(),
			palette: NodePalette::vivid(),
		}
	}

	/// Replaces the three abstract roles, keeping the rest of the style.
	pub fn with_roles(self, background: Color, foreground: Color, accent: Color) -> Self {
		Self {
			background,
			foreground,
			accent,
			..self
		}
	}

	/// Replaces the label box fill and picks ink that stays legible on it.
	pub fn with_label_fill(self, label_fill: Color) -> Self {
		Self {
			label_fill,
			label_ink: label_fill.readable_ink(),
			..self
		}
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self::fallback()
	}
}

/// Resolves abstract color roles to concrete paint at mount time.
pub trait ThemeResolver {
	/// Never fails: implementations return [`Theme::fallback`] values for any
	/// role they cannot read.
	fn resolve(&self) -> Theme;
}

/// Always returns the same theme. Used headless and in tests.
#[derive(Clone, Debug, Default)]
pub struct FixedTheme(pub Theme);

impl ThemeResolver for FixedTheme {
	fn resolve(&self) -> Theme {
		self.0.clone()
	}
}

/// Reads `--background`, `--foreground`, `--accent` and `--label-fill` from the
/// document root's computed style.
#[derive(Clone, Copy, Debug, Default)]
pub struct CssThemeResolver;

impl CssThemeResolver {
	fn read_var(style: &web_sys::CssStyleDeclaration, name: &str) -> Option<Color> {
		let value = style.get_property_value(name).ok()?;
		if value.trim().is_empty() {
			return None;
		}
		Color::parse(&value)
	}
}

impl ThemeResolver for CssThemeResolver {
	fn resolve(&self) -> Theme {
		let fallback = Theme::fallback();
		if !cfg!(target_arch = "wasm32") {
			return fallback;
		}
		let style = web_sys::window().and_then(|window| {
			let root = window.document()?.document_element()?;
			window.get_computed_style(&root).ok().flatten()
		});
		let Some(style) = style else {
			debug!("theme: no document, using fallback palette");
			return fallback;
		};

		let background =
			Self::read_var(&style, "--background").unwrap_or(fallback.background);
		let foreground =
			Self::read_var(&style, "--foreground").unwrap_or(fallback.foreground);
		let accent = Self::read_var(&style, "--accent").unwrap_or(fallback.accent);
		let label_fill = Self::read_var(&style, "--label-fill").unwrap_or(fallback.label_fill);
		fallback
			.with_roles(background, foreground, accent)
			.with_label_fill(label_fill)
	}
}
