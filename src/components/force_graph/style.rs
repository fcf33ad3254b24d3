//! Per-link visual attributes as functions of the link kind.
//!
//! Engines call into a [`LinkStyle`] for every link on every frame rather than
//! caching colors or widths, so one engine can draw ABA graphs and prediction
//! graphs by swapping the style.

use std::rc::Rc;

use super::theme::Color;
use super::types::{GraphLink, LinkKind};

/// Curvature used for a self-loop when a style asks for a straight one.
pub const SELF_LOOP_CURVATURE: f64 = 0.5;

const ATTACK_RED: Color = Color::rgb(248, 113, 113);
const REVERSE_BLUE: Color = Color::rgb(96, 165, 250);
const SUPPORT_GREEN: Color = Color::rgb(52, 211, 153);

/// Visual attribute functions for links.
pub trait LinkStyle {
	/// Stroke and arrow color.
	fn color(&self, link: &GraphLink) -> Color;
	/// Bend as a fraction of the chord length; 0 is straight.
	fn curvature(&self, link: &GraphLink) -> f64;
	/// Arrow head length in pixels; 0 draws none.
	fn arrow_length(&self, link: &GraphLink) -> f64;
	/// Stroke width in pixels.
	fn width(&self, link: &GraphLink) -> f64;

	/// Whether the link is stroked with a dash pattern.
	fn dashed(&self, _link: &GraphLink) -> bool {
		false
	}

	/// Curvature actually used for drawing. Self-loops are never straight.
	fn effective_curvature(&self, link: &GraphLink) -> f64 {
		let c = self.curvature(link);
		if link.is_self_loop() && c <= 0.0 {
			SELF_LOOP_CURVATURE
		} else {
			c
		}
	}
}

/// Styling for ABA and ABA+ result graphs.
#[derive(Clone, Copy, Debug, Default)]
pub struct AbaLinkStyle;

impl LinkStyle for AbaLinkStyle {
	fn color(&self, link: &GraphLink) -> Color {
		match link.kind {
			LinkKind::Attack | LinkKind::NormalAttack => ATTACK_RED,
			LinkKind::ReverseAttack => REVERSE_BLUE,
			LinkKind::Support => SUPPORT_GREEN,
		}
	}

	fn curvature(&self, link: &GraphLink) -> f64 {
		if link.is_self_loop() { SELF_LOOP_CURVATURE } else { 0.2 }
	}

	fn arrow_length(&self, link: &GraphLink) -> f64 {
		if link.kind.is_attack() { 6.0 } else { 0.0 }
	}

	fn width(&self, link: &GraphLink) -> f64 {
		match link.kind {
			LinkKind::ReverseAttack => 0.5,
			LinkKind::Attack | LinkKind::NormalAttack => 1.0,
			LinkKind::Support => 1.5,
		}
	}

	fn dashed(&self, link: &GraphLink) -> bool {
		link.kind == LinkKind::ReverseAttack
	}
}

/// Styling for predicted support/attack relations between free-text arguments.
#[derive(Clone, Copy, Debug, Default)]
pub struct RelationLinkStyle;

impl LinkStyle for RelationLinkStyle {
	fn color(&self, link: &GraphLink) -> Color {
		if link.kind == LinkKind::Support {
			SUPPORT_GREEN
		} else {
			ATTACK_RED
		}
	}

	fn curvature(&self, _link: &GraphLink) -> f64 {
		0.15
	}

	fn arrow_length(&self, _link: &GraphLink) -> f64 {
		4.0
	}

	fn width(&self, _link: &GraphLink) -> f64 {
		1.0
	}
}

/// Which built-in style a graph view uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkDomain {
	/// Attack, normal attack and reverse attack links.
	#[default]
	Aba,
	/// Predicted support and attack links.
	Relations,
}

impl LinkDomain {
	/// The style object for this domain.
	pub fn style(self) -> Rc<dyn LinkStyle> {
		match self {
			Self::Aba => Rc::new(AbaLinkStyle),
			Self::Relations => Rc::new(RelationLinkStyle),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Straight;

	impl LinkStyle for Straight {
		fn color(&self, _: &GraphLink) -> Color {
			Color::rgb(0, 0, 0)
		}
		fn curvature(&self, _: &GraphLink) -> f64 {
			0.0
		}
		fn arrow_length(&self, _: &GraphLink) -> f64 {
			0.0
		}
		fn width(&self, _: &GraphLink) -> f64 {
			1.0
		}
	}

	#[test]
	fn self_loops_always_curve() {
		let lp = GraphLink::new("A1", "A1", LinkKind::Attack);
		assert!(AbaLinkStyle.effective_curvature(&lp) > 0.0);
		assert!(RelationLinkStyle.effective_curvature(&lp) > 0.0);
		assert!(Straight.effective_curvature(&lp) > 0.0);

		let straight = GraphLink::new("A1", "A2", LinkKind::Attack);
		assert_eq!(Straight.effective_curvature(&straight), 0.0);
	}

	#[test]
	fn aba_attributes_follow_kind() {
		let attack = GraphLink::new("A1", "A2", LinkKind::Attack);
		let reverse = GraphLink::new("A1", "A2", LinkKind::ReverseAttack);
		let support = GraphLink::new("A1", "A2", LinkKind::Support);

		assert_eq!(AbaLinkStyle.color(&attack), ATTACK_RED);
		assert_eq!(AbaLinkStyle.color(&reverse), REVERSE_BLUE);
		assert_eq!(AbaLinkStyle.arrow_length(&support), 0.0);
		assert_eq!(AbaLinkStyle.arrow_length(&reverse), 6.0);
		assert_eq!(AbaLinkStyle.width(&reverse), 0.5);
		assert!(AbaLinkStyle.dashed(&reverse));
		assert_eq!(AbaLinkStyle.curvature(&attack), 0.2);
	}

	#[test]
	fn relation_style_colors_support_green() {
		let support = GraphLink::new("x", "y", LinkKind::Support);
		let attack = GraphLink::new("x", "y", LinkKind::Attack);
		assert_eq!(RelationLinkStyle.color(&support), SUPPORT_GREEN);
		assert_eq!(RelationLinkStyle.color(&attack), ATTACK_RED);
	}
}
