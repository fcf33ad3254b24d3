//! 3D engine: [`Layout3`] physics seen through an orbiting perspective camera.
//!
//! Drawing goes through a 2D canvas context; depth only affects projection,
//! paint order and size. Link attributes come from the injected [`LinkStyle`]
//! at draw time, so the same engine serves ABA graphs and prediction graphs.

use std::collections::HashMap;
use std::rc::Rc;

use glam::{DMat4, DVec2, DVec3};
use log::debug;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::engine::{DrawSurface, NodeClickHandler, PointerGesture, RenderEngine, Tween};
use super::physics::{Layout3, LayoutConfig, SettleTracker};
use super::render3d;
use super::style::LinkStyle;
use super::theme::{Theme, ThemeResolver};
use super::types::{GraphLink, GraphModel, GraphNode};
use crate::config::ViewerConfig;
use crate::error::GraphError;

/// Vertical field of view.
pub const FOV_Y: f64 = 40.0 * std::f64::consts::PI / 180.0;
const NEAR: f64 = 1.0;
const MIN_DISTANCE: f64 = 10.0;
const MAX_DISTANCE: f64 = 20_000.0;
/// Screen distance within which the pointer hovers a link.
const LINK_HOVER_PX: f64 = 4.0;
const CURVE_SAMPLES: usize = 16;

/// A point on screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projected {
	/// Horizontal pixel position.
	pub x: f64,
	/// Vertical pixel position, growing downward.
	pub y: f64,
	/// Distance along the view direction.
	pub depth: f64,
	/// Pixels per world unit at this depth.
	pub scale: f64,
}

/// Orbit camera looking at `target` from `distance` away.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera3 {
	/// Rotation about the vertical axis, in radians.
	pub yaw: f64,
	/// Elevation above the horizontal plane, in radians.
	pub pitch: f64,
	/// Eye distance from `target`.
	pub distance: f64,
	/// Point the camera orbits and looks at.
	pub target: DVec3,
}

impl Default for Camera3 {
	fn default() -> Self {
		Self {
			yaw: 0.0,
			pitch: 0.0,
			distance: 400.0,
			target: DVec3::ZERO,
		}
	}
}

impl Camera3 {
	/// World-space eye position.
	pub fn eye(&self) -> DVec3 {
		let (cp, sp) = (self.pitch.cos(), self.pitch.sin());
		self.target + DVec3::new(cp * self.yaw.sin(), sp, cp * self.yaw.cos()) * self.distance
	}

	fn focal(height: f64) -> f64 {
		(height / 2.0) / (FOV_Y / 2.0).tan()
	}

	/// View and projection for a `width` x `height` viewport, built once per frame.
	pub fn projector(&self, width: f64, height: f64) -> Projector {
		let aspect = if width > 0.0 && height > 0.0 { width / height } else { 1.0 };
		Projector {
			view: DMat4::look_at_rh(self.eye(), self.target, DVec3::Y),
			projection: DMat4::perspective_rh(FOV_Y, aspect, NEAR, MAX_DISTANCE * 2.0),
			focal: Self::focal(height),
			width,
			height,
		}
	}

	/// Screen position of `p`, or `None` when it is behind the camera.
	pub fn project(&self, p: DVec3, width: f64, height: f64) -> Option<Projected> {
		self.projector(width, height).project(p)
	}

	/// Target and distance that keep a bounding sphere of every point in view.
	pub fn fit(points: &[DVec3], radius: f64, width: f64, height: f64, padding: f64) -> Option<(DVec3, f64)> {
		if points.is_empty() {
			return None;
		}
		let center = points.iter().sum::<DVec3>() / points.len() as f64;
		let r = points.iter().map(|p| p.distance(center)).fold(0.0, f64::max) + radius;
		let half = (width.min(height) / 2.0 - padding).max(1.0);
		// Half-angle the sphere may subtend: vertical extent scaled to the smaller side.
		let angle = (half / Self::focal(height)).atan();
		let distance = (r / angle.sin()).clamp(MIN_DISTANCE, MAX_DISTANCE);
		Some((center, distance))
	}
}

/// Camera matrices for one frame.
#[derive(Clone, Copy, Debug)]
pub struct Projector {
	view: DMat4,
	projection: DMat4,
	focal: f64,
	width: f64,
	height: f64,
}

impl Projector {
	/// Screen position of `p`, or `None` when it is behind the near plane.
	pub fn project(&self, p: DVec3) -> Option<Projected> {
		let eye_space = self.view.transform_point3(p);
		let depth = -eye_space.z;
		if depth < NEAR {
			return None;
		}
		let ndc = self.projection.project_point3(eye_space);
		Some(Projected {
			x: (ndc.x + 1.0) * self.width / 2.0,
			y: (1.0 - ndc.y) * self.height / 2.0,
			depth,
			scale: self.focal / depth,
		})
	}
}

/// Distance from `p` to the segment `a`..`b`, in screen pixels.
pub fn distance_to_segment(p: DVec2, a: DVec2, b: DVec2) -> f64 {
	let ab = b - a;
	let len2 = ab.length_squared();
	let t = if len2 < 1e-12 {
		0.0
	} else {
		((p - a).dot(ab) / len2).clamp(0.0, 1.0)
	};
	p.distance(a + ab * t)
}

/// Control point of the quadratic curve drawn from `a` to `b`, bent by `curvature`
/// times the chord length. `None` when the endpoints coincide on screen.
pub fn link_control(a: DVec2, b: DVec2, curvature: f64) -> Option<DVec2> {
	let chord = b - a;
	let dist = chord.length();
	if dist < 1e-3 {
		return None;
	}
	Some((a + b) / 2.0 + chord.perp() * curvature)
}

/// Point at `t` on the quadratic curve `a`, `c`, `b`.
pub fn quadratic_point(a: DVec2, c: DVec2, b: DVec2, t: f64) -> DVec2 {
	let u = 1.0 - t;
	a * (u * u) + c * (2.0 * u * t) + b * (t * t)
}

/// Distance from `p` to the quadratic curve `a`, `c`, `b`, sampled as a polyline.
pub fn distance_to_curve(p: DVec2, a: DVec2, c: DVec2, b: DVec2) -> f64 {
	(0..CURVE_SAMPLES)
		.map(|i| {
			let t0 = i as f64 / CURVE_SAMPLES as f64;
			let t1 = (i + 1) as f64 / CURVE_SAMPLES as f64;
			distance_to_segment(p, quadratic_point(a, c, b, t0), quadratic_point(a, c, b, t1))
		})
		.fold(f64::INFINITY, f64::min)
}

enum Surface3D {
	Canvas {
		canvas: HtmlCanvasElement,
		ctx: CanvasRenderingContext2d,
	},
	Headless,
}

/// Perspective engine over [`Layout3`], orbited by pointer drags.
pub struct Engine3D {
	resolver: Rc<dyn ThemeResolver>,
	style: Rc<dyn LinkStyle>,
	layout_config: LayoutConfig,
	settle: SettleTracker,
	surface: Option<Surface3D>,
	layout: Layout3,
	camera_tween: Option<Tween<4>>,
	gesture: PointerGesture,
	on_click: Option<NodeClickHandler>,
	pub(super) theme: Theme,
	pub(super) nodes: Vec<GraphNode>,
	pub(super) links: Vec<GraphLink>,
	pub(super) link_index: Vec<(usize, usize)>,
	pub(super) camera: Camera3,
	pub(super) hovered_link: Option<usize>,
	pub(super) width: f64,
	pub(super) height: f64,
}

impl Engine3D {
	/// Unmounted engine; nothing is drawn until [`RenderEngine::mount`].
	pub fn new(resolver: Rc<dyn ThemeResolver>, style: Rc<dyn LinkStyle>, config: &ViewerConfig) -> Self {
		Self {
			resolver,
			style,
			layout: Layout3::new(0, Vec::new(), config.layout.clone()),
			layout_config: config.layout.clone(),
			settle: SettleTracker::new(config.settle.clone()),
			surface: None,
			camera_tween: None,
			gesture: PointerGesture::default(),
			on_click: None,
			theme: Theme::fallback(),
			nodes: Vec::new(),
			links: Vec::new(),
			link_index: Vec::new(),
			camera: Camera3::default(),
			hovered_link: None,
			width: 0.0,
			height: 0.0,
		}
	}

	pub(super) fn style(&self) -> &dyn LinkStyle {
		self.style.as_ref()
	}

	pub(super) fn node_radius(&self) -> f64 {
		self.layout_config.node_radius_3d
	}

	pub(super) fn positions(&self) -> Vec<DVec3> {
		self.layout.positions()
	}

	fn projector(&self) -> Projector {
		self.camera.projector(self.width, self.height)
	}

	/// Screen positions of every body for the current camera.
	pub(super) fn projected(&self) -> Vec<Option<Projected>> {
		let projector = self.projector();
		self.layout.positions().into_iter().map(|p| projector.project(p)).collect()
	}

	/// Screen-space curve of link `i`: start, control and end points.
	pub(super) fn link_curve(&self, i: usize, projected: &[Option<Projected>]) -> Option<(DVec2, DVec2, DVec2)> {
		let (link, &(s, t)) = (self.links.get(i)?, self.link_index.get(i)?);
		if s == t {
			return None;
		}
		let (Some(a), Some(b)) = (projected.get(s).copied().flatten(), projected.get(t).copied().flatten()) else {
			return None;
		};
		let (a, b) = (DVec2::new(a.x, a.y), DVec2::new(b.x, b.y));
		let c = link_control(a, b, self.style.effective_curvature(link))?;
		Some((a, c, b))
	}

	fn advance_camera(&mut self, dt: f64) {
		if let Some(tween) = &mut self.camera_tween {
			let ([x, y, z, distance], done) = tween.advance(dt);
			self.camera.target = DVec3::new(x, y, z);
			self.camera.distance = distance;
			if done {
				self.camera_tween = None;
			}
		}
	}

	fn link_at(&self, x: f64, y: f64) -> Option<usize> {
		let projected = self.projected();
		let pointer = DVec2::new(x, y);
		(0..self.links.len()).find(|&i| {
			self.link_curve(i, &projected)
				.is_some_and(|(a, c, b)| distance_to_curve(pointer, a, c, b) <= LINK_HOVER_PX)
		})
	}
}

impl RenderEngine for Engine3D {
	fn mount(&mut self, surface: DrawSurface, width: f64, height: f64) -> Result<(), GraphError> {
		let surface = match surface {
			DrawSurface::Canvas(canvas) => {
				let ctx = canvas
					.get_context("2d")
					.ok()
					.flatten()
					.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
					.ok_or_else(|| GraphError::EngineUnavailable {
						reason: "3d view needs a canvas drawing context".into(),
					})?;
				Surface3D::Canvas { canvas, ctx }
			}
			DrawSurface::Headless => Surface3D::Headless,
		};
		self.surface = Some(surface);
		self.theme = self.resolver.resolve();
		self.camera = Camera3::default();
		self.resize(width, height);
		Ok(())
	}

	fn set_data(&mut self, model: &GraphModel) {
		self.nodes = model.nodes.clone();
		self.links.clear();
		self.link_index.clear();
		let order: HashMap<&str, usize> = self.nodes.iter().enumerate().map(|(i, n)| (n.id.as_str(), i)).collect();
		for link in &model.links {
			if let (Some(&s), Some(&t)) = (order.get(link.source.as_str()), order.get(link.target.as_str())) {
				self.links.push(link.clone());
				self.link_index.push((s, t));
			}
		}
		self.layout = Layout3::new(self.nodes.len(), self.link_index.clone(), self.layout_config.clone());
		self.camera_tween = None;
		self.hovered_link = None;
		self.settle.reset();
		debug!("3d: {} nodes, {} links", self.nodes.len(), self.links.len());
	}

	fn set_node_click_handler(&mut self, handler: NodeClickHandler) {
		self.on_click = Some(handler);
	}

	fn request_zoom_to_fit(&mut self, duration_ms: f64, padding_px: f64) {
		let Some((target, distance)) =
			Camera3::fit(&self.positions(), self.node_radius(), self.width, self.height, padding_px)
		else {
			return;
		};
		let c = self.camera;
		self.camera_tween = Some(Tween::new(
			[c.target.x, c.target.y, c.target.z, c.distance],
			[target.x, target.y, target.z, distance],
			duration_ms / 1000.0,
		));
	}

	fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		if let Some(Surface3D::Canvas { canvas, .. }) = &self.surface {
			canvas.set_width(width as u32);
			canvas.set_height(height as u32);
		}
	}

	fn tick(&mut self, dt: f64) -> bool {
		if self.surface.is_none() {
			return false;
		}
		self.advance_camera(dt);
		let energy = self.layout.step();
		self.settle.observe(energy)
	}

	fn render(&self) {
		if let Some(Surface3D::Canvas { ctx, .. }) = &self.surface {
			render3d::render(self, ctx);
		}
	}

	fn pointer_down(&mut self, x: f64, y: f64) {
		self.gesture.press(x, y);
		self.camera_tween = None;
	}

	fn pointer_move(&mut self, x: f64, y: f64) {
		match self.gesture.drag(x, y) {
			Some((dx, dy)) => {
				self.camera.yaw -= dx * 0.01;
				self.camera.pitch = (self.camera.pitch + dy * 0.01).clamp(-1.5, 1.5);
			}
			None => self.hovered_link = self.link_at(x, y),
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
		self.hovered_link = None;
	}

	fn wheel(&mut self, _x: f64, _y: f64, delta_y: f64) {
		self.camera_tween = None;
		let factor = if delta_y > 0.0 { 1.1 } else { 1.0 / 1.1 };
		self.camera.distance = (self.camera.distance * factor).clamp(MIN_DISTANCE, MAX_DISTANCE);
	}

	fn node_at(&self, x: f64, y: f64) -> Option<usize> {
		let radius = self.node_radius();
		self.projected()
			.into_iter()
			.enumerate()
			.filter_map(|(i, q)| q.map(|q| (i, q)))
			.filter(|(_, q)| (q.x - x).hypot(q.y - y) <= radius * q.scale)
			.min_by(|a, b| a.1.depth.total_cmp(&b.1.depth))
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
		self.layout = Layout3::new(0, Vec::new(), self.layout_config.clone());
		self.nodes.clear();
		self.links.clear();
		self.link_index.clear();
		self.camera_tween = None;
		self.hovered_link = None;
		self.on_click = None;
		self.gesture.cancel();
		self.settle.reset();
		debug!("3d: disposed");
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;

	use super::*;
	use crate::components::force_graph::style::{AbaLinkStyle, RelationLinkStyle};
	use crate::components::force_graph::theme::FixedTheme;
	use crate::components::force_graph::types::LinkKind;

	fn engine() -> Engine3D {
		let mut e = Engine3D::new(
			Rc::new(FixedTheme::default()),
			Rc::new(RelationLinkStyle),
			&ViewerConfig::default(),
		);
		e.mount(DrawSurface::Headless, 800.0, 600.0).unwrap();
		e
	}

	fn model(n: usize) -> GraphModel {
		let mut m = GraphModel::default();
		for i in 0..n {
			m.add_node(GraphNode::plain(format!("n{i}")));
		}
		for i in 1..n {
			m.add_link(GraphLink::new(format!("n{i}"), "n0", LinkKind::Support)).unwrap();
		}
		m
	}

	#[test]
	fn projects_target_to_screen_center() {
		let cam = Camera3::default();
		let q = cam.project(DVec3::ZERO, 800.0, 600.0).unwrap();
		assert!((q.x - 400.0).abs() < 1e-9 && (q.y - 300.0).abs() < 1e-9);
		assert!((q.depth - 400.0).abs() < 1e-9);

		let behind = cam.eye() + DVec3::Z * 10.0;
		assert!(cam.project(behind, 800.0, 600.0).is_none());
	}

	#[test]
	fn projection_matches_pinhole_model() {
		let cam = Camera3::default();
		let q = cam.project(DVec3::new(10.0, 5.0, 0.0), 800.0, 600.0).unwrap();
		let scale = 300.0 / (FOV_Y / 2.0).tan() / 400.0;
		assert!((q.scale - scale).abs() < 1e-9);
		assert!((q.x - (400.0 + 10.0 * scale)).abs() < 1e-6, "{q:?}");
		assert!((q.y - (300.0 - 5.0 * scale)).abs() < 1e-6, "{q:?}");
	}

	#[test]
	fn fit_keeps_points_inside_padding() {
		let points = vec![
			DVec3::new(-200.0, 0.0, 0.0),
			DVec3::new(200.0, 50.0, 0.0),
			DVec3::new(0.0, -80.0, 100.0),
		];
		let (target, distance) = Camera3::fit(&points, 6.0, 800.0, 600.0, 50.0).unwrap();
		let cam = Camera3 {
			target,
			distance,
			..Camera3::default()
		};
		for p in &points {
			let q = cam.project(*p, 800.0, 600.0).unwrap();
			assert!(q.x >= 50.0 && q.x <= 750.0, "{q:?}");
			assert!(q.y >= 50.0 && q.y <= 550.0, "{q:?}");
		}
	}

	#[test]
	fn settles_once_and_keeps_counts() {
		let mut e = engine();
		e.set_data(&model(6));
		e.set_data(&model(6));
		assert_eq!((e.node_count(), e.link_count()), (6, 5));
		let fired = (0..60).filter(|_| e.tick(0.016)).count();
		assert_eq!(fired, 1);
	}

	#[test]
	fn click_picks_nearest_node() {
		let mut e = engine();
		e.set_data(&model(1));
		let clicked = Rc::new(RefCell::new(None));
		let sink = clicked.clone();
		e.set_node_click_handler(Rc::new(move |n: &GraphNode| *sink.borrow_mut() = Some(n.id.clone())));

		let q = e.projected()[0].unwrap();
		e.pointer_down(q.x, q.y);
		e.pointer_up(q.x, q.y);
		assert_eq!(clicked.borrow().as_deref(), Some("n0"));
	}

	#[test]
	fn drag_orbits_and_wheel_dollies() {
		let mut e = engine();
		e.pointer_down(100.0, 100.0);
		e.pointer_move(150.0, 100.0);
		e.pointer_up(150.0, 100.0);
		assert!((e.camera.yaw + 0.5).abs() < 1e-9);

		let d = e.camera.distance;
		e.wheel(0.0, 0.0, 1.0);
		assert!(e.camera.distance > d);
	}

	fn curve_midpoint(e: &Engine3D) -> (DVec2, DVec2) {
		let (a, c, b) = e.link_curve(0, &e.projected()).unwrap();
		(quadratic_point(a, c, b, 0.5), (a + b) / 2.0)
	}

	#[test]
	fn hovering_a_link_selects_it() {
		let mut e = engine();
		e.set_data(&model(2));
		let (on_curve, _) = curve_midpoint(&e);
		e.pointer_move(on_curve.x, on_curve.y);
		assert_eq!(e.hovered_link, Some(0));
		e.pointer_leave();
		assert_eq!(e.hovered_link, None);
	}

	#[test]
	fn hover_follows_the_drawn_curve() {
		let mut e = Engine3D::new(Rc::new(FixedTheme::default()), Rc::new(AbaLinkStyle), &ViewerConfig::default());
		e.mount(DrawSurface::Headless, 800.0, 600.0).unwrap();
		let mut m = GraphModel::default();
		m.add_node(GraphNode::plain("a"));
		m.add_node(GraphNode::plain("b"));
		m.add_link(GraphLink::new("a", "b", LinkKind::Attack)).unwrap();
		e.set_data(&m);

		let (on_curve, chord_mid) = curve_midpoint(&e);
		assert!(on_curve.distance(chord_mid) > LINK_HOVER_PX * 2.0);
		e.pointer_move(chord_mid.x, chord_mid.y);
		assert_eq!(e.hovered_link, None);
		e.pointer_move(on_curve.x, on_curve.y);
		assert_eq!(e.hovered_link, Some(0));
	}

	#[test]
	fn segment_distance() {
		let (a, b) = (DVec2::ZERO, DVec2::new(10.0, 0.0));
		assert_eq!(distance_to_segment(DVec2::new(5.0, 3.0), a, b), 3.0);
		assert_eq!(distance_to_segment(DVec2::new(-4.0, 3.0), a, b), 5.0);
	}

	#[test]
	fn control_point_bends_left_of_the_chord() {
		let (a, b) = (DVec2::ZERO, DVec2::new(100.0, 0.0));
		assert_eq!(link_control(a, b, 0.2), Some(DVec2::new(50.0, 20.0)));
		assert_eq!(link_control(a, a, 0.2), None);
		let c = DVec2::new(50.0, 20.0);
		assert!(distance_to_curve(quadratic_point(a, c, b, 0.3), a, c, b) < 0.5);
	}

	#[test]
	fn dispose_twice_is_harmless() {
		let mut e = engine();
		e.set_data(&model(3));
		e.dispose();
		e.dispose();
		assert_eq!(e.node_count(), 0);
		assert!(!e.tick(0.016));
	}
}
