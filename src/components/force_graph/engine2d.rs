//! 2D engine: `force_graph` charge plus label-box collision.
//!
//! Each node's footprint is its wrapped label box, recomputed whenever the zoom
//! level changes the label font. The same boxes drive the collision pass,
//! hit-testing and zoom-to-fit.

use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;
use std::rc::Rc;

use force_graph::{EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::{debug, warn};
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::engine::{DrawSurface, NodeClickHandler, PointerGesture, RenderEngine, Tween};
use super::labels::{ApproxMeasure, LabelBox, TextMeasure};
use super::physics::{LayoutConfig, SettleTracker, center, collide, mean_square_displacement, relax_links};
use super::render;
use super::scale::{ScaleConfig, ScaledValues};
use super::style::LinkStyle;
use super::theme::{Theme, ThemeResolver};
use super::types::{GraphLink, GraphModel, GraphNode};
use crate::config::ViewerConfig;
use crate::error::GraphError;

/// Zoom limits shared by wheel zoom and zoom-to-fit.
pub const MIN_ZOOM: f64 = 0.1;
/// Largest zoom factor.
pub const MAX_ZOOM: f64 = 10.0;

/// Per-node data attached to each simulation node.
#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	/// Position of the node in the model.
	pub order: usize,
}

/// Pan and zoom transform applied to the entire graph view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	/// Horizontal offset in pixels.
	pub x: f64,
	/// Vertical offset in pixels.
	pub y: f64,
	/// Zoom factor (1.0 = 100%, clamped to 0.1..10.0).
	pub k: f64,
}

impl ViewTransform {
	fn centered(width: f64, height: f64) -> Self {
		Self {
			x: width / 2.0,
			y: height / 2.0,
			k: 1.0,
		}
	}

	fn to_array(self) -> [f64; 3] {
		[self.x, self.y, self.k]
	}

	fn from_array([x, y, k]: [f64; 3]) -> Self {
		Self { x, y, k }
	}

	/// Screen pixels to world coordinates.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	/// World coordinates to screen pixels.
	pub fn graph_to_screen(&self, gx: f64, gy: f64) -> (f64, f64) {
		(gx * self.k + self.x, gy * self.k + self.y)
	}
}

/// Transform that fits every label box into the viewport with `padding` to spare.
pub fn fit_transform(
	positions: &[[f64; 2]],
	boxes: &[LabelBox],
	width: f64,
	height: f64,
	padding: f64,
) -> Option<ViewTransform> {
	if positions.is_empty() {
		return None;
	}
	let (mut min, mut max) = ([f64::INFINITY; 2], [f64::NEG_INFINITY; 2]);
	for (i, p) in positions.iter().enumerate() {
		let half = boxes.get(i).map(LabelBox::half_extents).unwrap_or([0.0; 2]);
		for a in 0..2 {
			min[a] = min[a].min(p[a] - half[a]);
			max[a] = max[a].max(p[a] + half[a]);
		}
	}
	let span_w = (max[0] - min[0]).max(1.0);
	let span_h = (max[1] - min[1]).max(1.0);
	let avail_w = (width - 2.0 * padding).max(1.0);
	let avail_h = (height - 2.0 * padding).max(1.0);
	let k = (avail_w / span_w).min(avail_h / span_h).clamp(MIN_ZOOM, MAX_ZOOM);
	let (cx, cy) = ((min[0] + max[0]) / 2.0, (min[1] + max[1]) / 2.0);
	Some(ViewTransform {
		x: width / 2.0 - cx * k,
		y: height / 2.0 - cy * k,
		k,
	})
}

enum Surface2D {
	Canvas {
		canvas: HtmlCanvasElement,
		ctx: CanvasRenderingContext2d,
	},
	Headless,
}

fn simulation(layout: &LayoutConfig) -> ForceGraph<NodeInfo, ()> {
	ForceGraph::new(SimulationParameters {
		force_charge: (-layout.charge_strength / 2.0) as f32,
		force_spring: 0.05,
		force_max: 100.0,
		node_speed: 3000.0,
		damping_factor: 0.9,
	})
}

fn layout_labels(
	nodes: &[GraphNode],
	config: &ScaleConfig,
	scale: &ScaledValues,
	measure: &impl TextMeasure,
) -> Vec<LabelBox> {
	nodes
		.iter()
		.map(|n| LabelBox::layout(&n.label, &config.label, scale, measure))
		.collect()
}

/// Engine state, created unmounted and mutated each frame by the controller.
pub struct Engine2D {
	resolver: Rc<dyn ThemeResolver>,
	style: Rc<dyn LinkStyle>,
	scale_config: ScaleConfig,
	layout: LayoutConfig,
	settle: SettleTracker,
	surface: Option<Surface2D>,
	graph: ForceGraph<NodeInfo, ()>,
	pub(super) link_index: Vec<(usize, usize)>,
	alpha: f64,
	boxes_k: f64,
	camera: Option<Tween<3>>,
	gesture: PointerGesture,
	on_click: Option<NodeClickHandler>,
	pub(super) theme: Theme,
	pub(super) nodes: Vec<GraphNode>,
	pub(super) links: Vec<GraphLink>,
	pub(super) positions: Vec<[f64; 2]>,
	pub(super) boxes: Vec<LabelBox>,
	pub(super) transform: ViewTransform,
	pub(super) width: f64,
	pub(super) height: f64,
}

impl Engine2D {
	/// Unmounted engine; nothing is drawn until [`RenderEngine::mount`].
	pub fn new(resolver: Rc<dyn ThemeResolver>, style: Rc<dyn LinkStyle>, config: &ViewerConfig) -> Self {
		Self {
			resolver,
			style,
			scale_config: ScaleConfig::with_labels(config.labels.clone()),
			graph: simulation(&config.layout),
			layout: config.layout.clone(),
			settle: SettleTracker::new(config.settle.clone()),
			surface: None,
			link_index: Vec::new(),
			alpha: 1.0,
			boxes_k: 1.0,
			camera: None,
			gesture: PointerGesture::default(),
			on_click: None,
			theme: Theme::fallback(),
			nodes: Vec::new(),
			links: Vec::new(),
			positions: Vec::new(),
			boxes: Vec::new(),
			transform: ViewTransform::centered(0.0, 0.0),
			width: 0.0,
			height: 0.0,
		}
	}

	pub(super) fn style(&self) -> &dyn LinkStyle {
		self.style.as_ref()
	}

	pub(super) fn scaled(&self) -> ScaledValues {
		ScaledValues::new(&self.scale_config, self.transform.k)
	}

	pub(super) fn scale_config(&self) -> &ScaleConfig {
		&self.scale_config
	}

	fn refresh_boxes(&mut self) {
		let scale = self.scaled();
		self.boxes = match &self.surface {
			Some(Surface2D::Canvas { ctx, .. }) => layout_labels(&self.nodes, &self.scale_config, &scale, ctx),
			_ => layout_labels(&self.nodes, &self.scale_config, &scale, &ApproxMeasure::default()),
		};
		self.boxes_k = self.transform.k;
	}

	fn read_positions(&self) -> Vec<[f64; 2]> {
		let mut out = vec![[0.0; 2]; self.nodes.len()];
		self.graph.visit_nodes(|node| {
			if let Some(p) = out.get_mut(node.data.user_data.order) {
				*p = [node.x() as f64, node.y() as f64];
			}
		});
		out
	}

	fn write_positions(&mut self, positions: &[[f64; 2]]) {
		self.graph.visit_nodes_mut(|node| {
			if let Some(p) = positions.get(node.data.user_data.order) {
				node.data.x = p[0] as f32;
				node.data.y = p[1] as f32;
			}
		});
	}

	fn advance_camera(&mut self, dt: f64) {
		if let Some(tween) = &mut self.camera {
			let (value, done) = tween.advance(dt);
			self.transform = ViewTransform::from_array(value);
			if done {
				self.camera = None;
			}
		}
	}
}

impl RenderEngine for Engine2D {
	fn mount(&mut self, surface: DrawSurface, width: f64, height: f64) -> Result<(), GraphError> {
		let surface = match surface {
			DrawSurface::Canvas(canvas) => {
				let unavailable = |reason: &str| GraphError::EngineUnavailable {
					reason: format!("2d context: {reason}"),
				};
				let ctx = canvas
					.get_context("2d")
					.map_err(|_| unavailable("getContext threw"))?
					.ok_or_else(|| unavailable("not supported"))?
					.dyn_into::<CanvasRenderingContext2d>()
					.map_err(|_| unavailable("unexpected context type"))?;
				Surface2D::Canvas { canvas, ctx }
			}
			DrawSurface::Headless => Surface2D::Headless,
		};
		self.surface = Some(surface);
		self.theme = self.resolver.resolve();
		self.transform = ViewTransform::centered(width, height);
		self.resize(width, height);
		self.refresh_boxes();
		Ok(())
	}

	fn set_data(&mut self, model: &GraphModel) {
		self.graph = simulation(&self.layout);
		self.nodes = model.nodes.clone();
		self.links.clear();
		self.link_index.clear();

		let n = self.nodes.len();
		let mut seeds: Vec<[f64; 2]> = (0..n)
			.map(|i| {
				let angle = (i as f64) * 2.0 * PI / n as f64;
				[100.0 * angle.cos(), 100.0 * angle.sin()]
			})
			.collect();
		center(&mut seeds, [0.0, 0.0]);

		let mut ids = Vec::with_capacity(n);
		for (order, p) in seeds.iter().enumerate() {
			ids.push(self.graph.add_node(NodeData {
				x: p[0] as f32,
				y: p[1] as f32,
				mass: 10.0,
				is_anchor: false,
				user_data: NodeInfo { order },
			}));
		}

		let order: HashMap<&str, usize> = self.nodes.iter().enumerate().map(|(i, n)| (n.id.as_str(), i)).collect();
		let mut springs = HashSet::new();
		let mut links = Vec::with_capacity(model.links.len());
		let mut link_index = Vec::with_capacity(model.links.len());
		for link in &model.links {
			let (Some(&s), Some(&t)) = (order.get(link.source.as_str()), order.get(link.target.as_str())) else {
				warn!(
					"{}",
					GraphError::DanglingReference {
						source_id: link.source.clone(),
						target_id: link.target.clone(),
					}
				);
				continue;
			};
			// One spring per unordered pair; self-loops get none.
			if s != t && springs.insert((s.min(t), s.max(t))) {
				self.graph.add_edge(ids[s], ids[t], EdgeData::default());
			}
			links.push(link.clone());
			link_index.push((s, t));
		}
		self.links = links;
		self.link_index = link_index;
		self.positions = seeds;
		self.alpha = 1.0;
		self.camera = None;
		self.settle.reset();
		self.refresh_boxes();
		debug!("2d: {} nodes, {} links", self.nodes.len(), self.links.len());
	}

	fn set_node_click_handler(&mut self, handler: NodeClickHandler) {
		self.on_click = Some(handler);
	}

	fn request_zoom_to_fit(&mut self, duration_ms: f64, padding_px: f64) {
		let Some(target) = fit_transform(&self.positions, &self.boxes, self.width, self.height, padding_px) else {
			return;
		};
		self.camera = Some(Tween::new(self.transform.to_array(), target.to_array(), duration_ms / 1000.0));
	}

	fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		if let Some(Surface2D::Canvas { canvas, .. }) = &self.surface {
			canvas.set_width(width as u32);
			canvas.set_height(height as u32);
		}
	}

	fn tick(&mut self, dt: f64) -> bool {
		if self.surface.is_none() {
			return false;
		}
		self.advance_camera(dt);
		if self.nodes.is_empty() {
			return self.settle.observe(0.0);
		}
		if (self.transform.k - self.boxes_k).abs() > 1e-3 {
			self.refresh_boxes();
		}

		let before = std::mem::take(&mut self.positions);
		self.graph.update(dt as f32);
		let mut positions = self.read_positions();

		self.alpha *= 1.0 - self.layout.alpha_decay;
		relax_links(
			&mut positions,
			&self.link_index,
			self.layout.link_distance,
			self.layout.link_strength * self.alpha,
		);
		center(&mut positions, [0.0, 0.0]);
		let half: Vec<[f64; 2]> = self.boxes.iter().map(LabelBox::half_extents).collect();
		collide(
			&mut positions,
			&half,
			self.layout.collision_padding,
			self.layout.collision_strength,
		);
		self.write_positions(&positions);

		let energy = mean_square_displacement(&before, &positions);
		self.positions = positions;
		self.settle.observe(energy)
	}

	fn render(&self) {
		if let Some(Surface2D::Canvas { ctx, .. }) = &self.surface {
			render::render(self, ctx);
		}
	}

	fn pointer_down(&mut self, x: f64, y: f64) {
		self.gesture.press(x, y);
		self.camera = None;
	}

	fn pointer_move(&mut self, x: f64, y: f64) {
		if let Some((dx, dy)) = self.gesture.drag(x, y) {
			self.transform.x += dx;
			self.transform.y += dy;
		}
	}

	fn pointer_up(&mut self, x: f64, y: f64) {
		if !self.gesture.release(x, y) {
			return;
		}
		if let (Some(i), Some(handler)) = (self.node_at(x, y), &self.on_click) {
			handler(&self.nodes[i]);
		}
	}

	fn pointer_leave(&mut self) {
		self.gesture.cancel();
	}

	fn wheel(&mut self, x: f64, y: f64, delta_y: f64) {
		self.camera = None;
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		let new_k = (self.transform.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = new_k / self.transform.k;
		self.transform.x = x - (x - self.transform.x) * ratio;
		self.transform.y = y - (y - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	fn node_at(&self, x: f64, y: f64) -> Option<usize> {
		let (gx, gy) = self.transform.screen_to_graph(x, y);
		// Topmost first: later nodes are drawn over earlier ones.
		self.positions
			.iter()
			.zip(&self.boxes)
			.enumerate()
			.rev()
			.find(|(_, (p, b))| b.contains(gx - p[0], gy - p[1]))
			.map(|(i, _)| i)
	}

	fn node_count(&self) -> usize {
		self.nodes.len()
	}

	fn link_count(&self) -> usize {
		self.links.len()
	}

	fn is_mounted(&self) -> bool {
		self.surface.is_some()
	}

	fn dispose(&mut self) {
		if self.surface.take().is_none() {
			return;
		}
		self.graph = simulation(&self.layout);
		self.nodes.clear();
		self.links.clear();
		self.link_index.clear();
		self.positions.clear();
		self.boxes.clear();
		self.camera = None;
		self.on_click = None;
		self.gesture.cancel();
		self.settle.reset();
		debug!("2d: disposed");
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;

	use super::*;
	use crate::components::force_graph::physics::SettleConfig;
	use crate::components::force_graph::style::AbaLinkStyle;
	use crate::components::force_graph::theme::FixedTheme;
	use crate::components::force_graph::types::LinkKind;

	fn engine() -> Engine2D {
		let mut e = Engine2D::new(
			Rc::new(FixedTheme::default()),
			Rc::new(AbaLinkStyle),
			&ViewerConfig::default(),
		);
		e.mount(DrawSurface::Headless, 800.0, 600.0).unwrap();
		e
	}

	fn model() -> GraphModel {
		let mut m = GraphModel::default();
		for id in ["A1", "A2", "A3"] {
			m.add_node(GraphNode::plain(id));
		}
		for (s, t) in [("A1", "A2"), ("A2", "A1"), ("A3", "A3")] {
			m.add_link(GraphLink::new(s, t, LinkKind::Attack)).unwrap();
		}
		m
	}

	#[test]
	fn set_data_twice_keeps_counts() {
		let mut e = engine();
		e.set_data(&model());
		e.set_data(&model());
		assert_eq!((e.node_count(), e.link_count()), (3, 3));
		assert_eq!(e.boxes.len(), 3);
	}

	#[test]
	fn settles_exactly_once_within_budget() {
		let mut e = engine();
		e.set_data(&model());
		let fired: Vec<bool> = (0..60).map(|_| e.tick(0.016)).collect();
		assert_eq!(fired.iter().filter(|f| **f).count(), 1);
		let at = fired.iter().position(|f| *f).unwrap();
		assert!(at < SettleConfig::default().step_budget as usize);
		assert!(e.positions.iter().flatten().all(|v| v.is_finite()));

		e.set_data(&model());
		assert!((0..60).any(|_| e.tick(0.016)));
	}

	#[test]
	fn click_hits_label_box() {
		let mut e = engine();
		let mut m = GraphModel::default();
		m.add_node(GraphNode::plain("only"));
		e.set_data(&m);

		let clicked = Rc::new(RefCell::new(Vec::new()));
		let sink = clicked.clone();
		e.set_node_click_handler(Rc::new(move |n: &GraphNode| sink.borrow_mut().push(n.id.clone())));

		// A lone node sits at the origin, which the initial transform centers.
		e.pointer_down(401.0, 300.0);
		e.pointer_up(402.0, 301.0);
		e.pointer_down(10.0, 10.0);
		e.pointer_up(10.0, 10.0);
		assert_eq!(*clicked.borrow(), vec!["only".to_string()]);
	}

	#[test]
	fn background_drag_pans_instead_of_clicking() {
		let mut e = engine();
		e.set_data(&model());
		e.pointer_down(0.0, 0.0);
		e.pointer_move(30.0, 20.0);
		e.pointer_up(30.0, 20.0);
		assert_eq!((e.transform.x, e.transform.y), (430.0, 320.0));
	}

	#[test]
	fn wheel_zooms_about_cursor() {
		let mut e = engine();
		let before = e.transform.screen_to_graph(100.0, 100.0);
		e.wheel(100.0, 100.0, -1.0);
		let after = e.transform.screen_to_graph(100.0, 100.0);
		assert!((before.0 - after.0).abs() < 1e-9 && (before.1 - after.1).abs() < 1e-9);
		assert!((e.transform.k - 1.1).abs() < 1e-9);
	}

	#[test]
	fn fit_contains_every_box() {
		let positions = vec![[-300.0, 0.0], [500.0, 40.0]];
		let b = LabelBox {
			width: 40.0,
			height: 20.0,
			..Default::default()
		};
		let boxes = vec![b.clone(), b];
		let t = fit_transform(&positions, &boxes, 800.0, 600.0, 50.0).unwrap();
		for (p, b) in positions.iter().zip(&boxes) {
			let [hw, hh] = b.half_extents();
			let (x0, y0) = t.graph_to_screen(p[0] - hw, p[1] - hh);
			let (x1, y1) = t.graph_to_screen(p[0] + hw, p[1] + hh);
			assert!(x0 >= 50.0 - 1e-9 && x1 <= 750.0 + 1e-9);
			assert!(y0 >= 50.0 - 1e-9 && y1 <= 550.0 + 1e-9);
		}
		assert!(fit_transform(&[], &[], 800.0, 600.0, 50.0).is_none());
	}

	#[test]
	fn zoom_to_fit_animates_to_target() {
		let mut e = engine();
		e.set_data(&model());
		e.request_zoom_to_fit(400.0, 50.0);
		let target = e.camera.as_ref().unwrap().target();
		e.advance_camera(0.2);
		assert!(e.camera.is_some());
		e.advance_camera(0.3);
		assert!(e.camera.is_none());
		assert_eq!(e.transform.to_array(), target);
	}

	#[test]
	fn dispose_is_idempotent() {
		let mut e = engine();
		e.set_data(&model());
		e.dispose();
		e.dispose();
		assert!(!e.is_mounted());
		assert_eq!(e.node_count(), 0);
		assert!(!e.tick(0.016));
	}
}
