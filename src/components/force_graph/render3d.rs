//! Canvas rendering for the 3D engine.
//!
//! Links are drawn first, then nodes back to front so nearer spheres cover
//! farther ones. Sizes shrink with depth through [`Projected::scale`].

use glam::DVec2;
use web_sys::CanvasRenderingContext2d;

use super::engine3d::{Engine3D, Projected, quadratic_point};
use super::render::draw_background;
use super::theme::Color;

const LABEL_FONT: &str = "11px sans-serif";

/// Paints one frame of `engine` onto `ctx`.
pub fn render(engine: &Engine3D, ctx: &CanvasRenderingContext2d) {
	draw_background(ctx, engine.width, engine.height, &engine.theme);

	let projected = engine.projected();

	draw_links(engine, ctx, &projected);
	draw_nodes(engine, ctx, &projected);
	draw_hover_label(engine, ctx, &projected);
}

fn draw_links(engine: &Engine3D, ctx: &CanvasRenderingContext2d, projected: &[Option<Projected>]) {
	let style = engine.style();
	let radius = engine.node_radius();

	for (i, (link, &(s, t))) in engine.links.iter().zip(&engine.link_index).enumerate() {
		let (Some(Some(a)), Some(Some(b))) = (projected.get(s), projected.get(t)) else {
			continue;
		};
		let color = style.color(link);
		ctx.set_stroke_style_str(&color.to_css());
		ctx.set_line_width(style.width(link));

		if s == t {
			let r = a.scale * radius;
			let loop_r = r * (1.0 + 2.0 * style.effective_curvature(link));
			ctx.begin_path();
			let _ = ctx.arc(a.x, a.y - r - loop_r, loop_r, 0.0, std::f64::consts::TAU);
			ctx.stroke();
			continue;
		}

		let Some((start, control, tip)) = engine.link_curve(i, projected) else {
			continue;
		};
		// Stop at the target sphere's silhouette.
		let dir = (tip - control).normalize_or_zero();
		let end = tip - dir * b.scale * radius;

		ctx.begin_path();
		ctx.move_to(start.x, start.y);
		ctx.quadratic_curve_to(control.x, control.y, end.x, end.y);
		ctx.stroke();

		let arrow = style.arrow_length(link) * b.scale.min(2.0);
		if arrow > 0.0 {
			draw_arrow(ctx, end, dir, arrow, color);
		}
	}
}

fn draw_arrow(ctx: &CanvasRenderingContext2d, tip: DVec2, dir: DVec2, length: f64, color: Color) {
	let back = tip - dir * length;
	let side = dir.perp() * length * 0.5;
	ctx.set_fill_style_str(&color.to_css());
	ctx.begin_path();
	ctx.move_to(tip.x, tip.y);
	ctx.line_to(back.x + side.x, back.y + side.y);
	ctx.line_to(back.x - side.x, back.y - side.y);
	ctx.close_path();
	ctx.fill();
}

fn draw_nodes(engine: &Engine3D, ctx: &CanvasRenderingContext2d, projected: &[Option<Projected>]) {
	let theme = &engine.theme;
	let radius = engine.node_radius();

	let mut order: Vec<(usize, Projected)> = projected
		.iter()
		.enumerate()
		.filter_map(|(i, p)| p.map(|p| (i, p)))
		.collect();
	order.sort_by(|a, b| b.1.depth.total_cmp(&a.1.depth));

	ctx.set_font(LABEL_FONT);
	ctx.set_text_align("left");
	ctx.set_text_baseline("middle");

	for (i, p) in order {
		let r = (radius * p.scale).max(1.0);
		ctx.begin_path();
		let _ = ctx.arc(p.x, p.y, r, 0.0, std::f64::consts::TAU);
		ctx.set_fill_style_str(&theme.palette.get(i).to_css());
		ctx.fill();
		ctx.set_stroke_style_str(&theme.background.to_css());
		ctx.set_line_width(1.0);
		ctx.stroke();

		if let Some(node) = engine.nodes.get(i) {
			ctx.set_fill_style_str(&theme.foreground.to_css());
			let _ = ctx.fill_text(&node.label, p.x + r + 3.0, p.y);
		}
	}
}

fn draw_hover_label(engine: &Engine3D, ctx: &CanvasRenderingContext2d, projected: &[Option<Projected>]) {
	let Some(i) = engine.hovered_link else {
		return;
	};
	let (Some(link), Some((a, c, b))) = (engine.links.get(i), engine.link_curve(i, projected)) else {
		return;
	};
	let text = link.label.as_deref().unwrap_or(link.kind.legend());
	let DVec2 { x, y } = quadratic_point(a, c, b, 0.5);

	ctx.set_font(LABEL_FONT);
	ctx.set_text_align("center");
	ctx.set_text_baseline("bottom");
	let width = ctx.measure_text(text).map(|m| m.width()).unwrap_or(0.0);
	ctx.set_fill_style_str(&engine.theme.background.with_alpha(0.8).to_css());
	ctx.fill_rect(x - width / 2.0 - 4.0, y - 18.0, width + 8.0, 16.0);
	ctx.set_fill_style_str(&engine.theme.foreground.to_css());
	let _ = ctx.fill_text(text, x, y - 4.0);
}
