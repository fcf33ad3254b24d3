//! Canvas rendering for the 2D engine.
//!
//! Rendering uses two world-space passes for correct z-ordering:
//! 1. Links (curves, dashes, arrow heads), clipped to the label boxes
//! 2. Label boxes with their wrapped text on top

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::engine2d::Engine2D;
use super::labels::LabelBox;
use super::scale::ScaledValues;
use super::style::LinkStyle;
use super::theme::{Color, Theme};
use super::types::GraphLink;

/// Renders the complete graph to the canvas.
pub fn render(engine: &Engine2D, ctx: &CanvasRenderingContext2d) {
	let scale = engine.scaled();

	draw_background(ctx, engine.width, engine.height, &engine.theme);

	ctx.save();
	let t = engine.transform;
	let _ = ctx.translate(t.x, t.y);
	let _ = ctx.scale(t.k, t.k);

	draw_links(engine, ctx, &scale);
	draw_labels(engine, ctx, &scale);

	ctx.restore();
}

pub(super) fn draw_background(ctx: &CanvasRenderingContext2d, width: f64, height: f64, theme: &Theme) {
	ctx.set_fill_style_str(&theme.background.to_css());
	ctx.fill_rect(0.0, 0.0, width, height);
}

/// Where a ray from a box center along `dir` leaves the box.
pub fn box_exit(center: [f64; 2], half: [f64; 2], dir: [f64; 2]) -> [f64; 2] {
	let len = dir[0].hypot(dir[1]);
	if len < 1e-9 {
		return center;
	}
	let (ux, uy) = (dir[0] / len, dir[1] / len);
	let tx = if ux.abs() > 1e-12 { half[0] / ux.abs() } else { f64::INFINITY };
	let ty = if uy.abs() > 1e-12 { half[1] / uy.abs() } else { f64::INFINITY };
	let t = tx.min(ty);
	[center[0] + ux * t, center[1] + uy * t]
}

fn set_dash(ctx: &CanvasRenderingContext2d, dash: Option<(f64, f64)>) {
	let pattern = match dash {
		Some((on, off)) => js_sys::Array::of2(&JsValue::from_f64(on), &JsValue::from_f64(off)),
		None => js_sys::Array::new(),
	};
	let _ = ctx.set_line_dash(&pattern);
}

fn draw_links(engine: &Engine2D, ctx: &CanvasRenderingContext2d, scale: &ScaledValues) {
	let style = engine.style();
	for (link, &(s, t)) in engine.links.iter().zip(&engine.link_index) {
		let (Some(p1), Some(p2)) = (engine.positions.get(s), engine.positions.get(t)) else {
			continue;
		};
		let half = |i: usize| engine.boxes.get(i).map(LabelBox::half_extents).unwrap_or([0.0; 2]);

		let color = style.color(link);
		ctx.set_stroke_style_str(&color.to_css());
		ctx.set_line_width(scale.edge_width(style.width(link)));
		set_dash(ctx, style.dashed(link).then_some(scale.dash_pattern));

		if link.is_self_loop() {
			draw_self_loop(ctx, style, link, scale, *p1, half(s), color);
		} else {
			draw_link(ctx, style, link, scale, (*p1, half(s)), (*p2, half(t)), color);
		}
	}
	set_dash(ctx, None);
}

fn draw_link(
	ctx: &CanvasRenderingContext2d,
	style: &dyn LinkStyle,
	link: &GraphLink,
	scale: &ScaledValues,
	(p1, half1): ([f64; 2], [f64; 2]),
	(p2, half2): ([f64; 2], [f64; 2]),
	color: Color,
) {
	let (dx, dy) = (p2[0] - p1[0], p2[1] - p1[1]);
	let dist = dx.hypot(dy);
	if dist < 1e-3 {
		return;
	}

	let bend = style.effective_curvature(link) * dist;
	let control = [
		(p1[0] + p2[0]) / 2.0 - dy / dist * bend,
		(p1[1] + p2[1]) / 2.0 + dx / dist * bend,
	];
	let start = box_exit(p1, half1, [control[0] - p1[0], control[1] - p1[1]]);
	let end = box_exit(p2, half2, [control[0] - p2[0], control[1] - p2[1]]);

	ctx.begin_path();
	ctx.move_to(start[0], start[1]);
	ctx.quadratic_curve_to(control[0], control[1], end[0], end[1]);
	ctx.stroke();

	let arrow = scale.arrow_length(style.arrow_length(link));
	if arrow > 0.0 {
		draw_arrow(ctx, end, [end[0] - control[0], end[1] - control[1]], arrow, color);
	}
}

fn draw_self_loop(
	ctx: &CanvasRenderingContext2d,
	style: &dyn LinkStyle,
	link: &GraphLink,
	scale: &ScaledValues,
	p: [f64; 2],
	half: [f64; 2],
	color: Color,
) {
	let r = 40.0 * style.effective_curvature(link);
	let top = p[1] - half[1];
	let (left, right) = (p[0] - half[0] * 0.4, p[0] + half[0] * 0.4);
	let c1 = [left - r, top - 2.0 * r];
	let c2 = [right + r, top - 2.0 * r];

	ctx.begin_path();
	ctx.move_to(left, top);
	ctx.bezier_curve_to(c1[0], c1[1], c2[0], c2[1], right, top);
	ctx.stroke();

	let arrow = scale.arrow_length(style.arrow_length(link));
	if arrow > 0.0 {
		draw_arrow(ctx, [right, top], [right - c2[0], top - c2[1]], arrow, color);
	}
}

fn draw_arrow(ctx: &CanvasRenderingContext2d, tip: [f64; 2], dir: [f64; 2], length: f64, color: Color) {
	let len = dir[0].hypot(dir[1]);
	if len < 1e-9 {
		return;
	}
	let (ux, uy) = (dir[0] / len, dir[1] / len);
	let (back_x, back_y) = (tip[0] - ux * length, tip[1] - uy * length);
	let (px, py) = (-uy * length * 0.5, ux * length * 0.5);

	set_dash(ctx, None);
	ctx.set_fill_style_str(&color.to_css());
	ctx.begin_path();
	ctx.move_to(tip[0], tip[1]);
	ctx.line_to(back_x + px, back_y + py);
	ctx.line_to(back_x - px, back_y - py);
	ctx.close_path();
	ctx.fill();
}

fn rounded_rect(ctx: &CanvasRenderingContext2d, x: f64, y: f64, w: f64, h: f64, radius: f64) {
	let r = radius.min(w / 2.0).min(h / 2.0).max(0.0);
	ctx.begin_path();
	ctx.move_to(x + r, y);
	let _ = ctx.arc_to(x + w, y, x + w, y + h, r);
	let _ = ctx.arc_to(x + w, y + h, x, y + h, r);
	let _ = ctx.arc_to(x, y + h, x, y, r);
	let _ = ctx.arc_to(x, y, x + w, y, r);
	ctx.close_path();
}

fn draw_labels(engine: &Engine2D, ctx: &CanvasRenderingContext2d, scale: &ScaledValues) {
	let label = &engine.scale_config().label;
	let theme = &engine.theme;

	ctx.set_font(&scale.label_font);
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");

	for (p, b) in engine.positions.iter().zip(&engine.boxes) {
		let (x, y) = (p[0] - b.width / 2.0, p[1] - b.height / 2.0);

		rounded_rect(ctx, x, y, b.width, b.height, label.corner_radius);
		ctx.set_fill_style_str(&theme.label_fill.to_css());
		ctx.fill();
		ctx.set_stroke_style_str(&theme.accent.to_css());
		ctx.set_line_width(1.0 / scale.k);
		ctx.stroke();

		ctx.set_fill_style_str(&theme.label_ink.to_css());
		for (i, line) in b.lines.iter().enumerate() {
			let ly = y + label.padding + b.font_size * (i as f64 + 0.5);
			let _ = ctx.fill_text(line, p[0], ly);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn exits_through_the_nearest_side() {
		assert_eq!(box_exit([0.0, 0.0], [20.0, 10.0], [1.0, 0.0]), [20.0, 0.0]);
		assert_eq!(box_exit([0.0, 0.0], [20.0, 10.0], [0.0, -5.0]), [0.0, -10.0]);
		let corner = box_exit([0.0, 0.0], [20.0, 10.0], [1.0, 1.0]);
		assert!((corner[0] - 10.0).abs() < 1e-9 && (corner[1] - 10.0).abs() < 1e-9);
	}

	#[test]
	fn zero_direction_stays_at_center() {
		assert_eq!(box_exit([3.0, 4.0], [20.0, 10.0], [0.0, 0.0]), [3.0, 4.0]);
	}
}
