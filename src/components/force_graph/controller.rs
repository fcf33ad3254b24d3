//! Owns the one mounted engine and its lifecycle.
//!
//! The controller keeps the current [`GraphModel`] so data survives engine
//! swaps, forwards size and pointer input to whichever engine is mounted, and
//! fits the camera exactly once after every data change or mode switch, on the
//! frame the layout reports itself settled.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::{debug, info, warn};

use super::engine::{DrawSurface, NodeClickHandler, RenderEngine, RenderMode};
use super::engine2d::Engine2D;
use super::engine3d::Engine3D;
use super::style::LinkStyle;
use super::theme::ThemeResolver;
use super::types::GraphModel;
use crate::config::{ViewerConfig, ZoomConfig};
use crate::error::GraphError;

/// Builds an unmounted engine for a mode.
pub type EngineFactory = Box<dyn Fn(RenderMode) -> Box<dyn RenderEngine>>;

/// Factory for the two built-in engines, sharing one theme source and link style.
pub fn engine_factory(
	resolver: Rc<dyn ThemeResolver>,
	style: Rc<dyn LinkStyle>,
	config: ViewerConfig,
) -> EngineFactory {
	Box::new(move |mode| -> Box<dyn RenderEngine> {
		match mode {
			RenderMode::TwoD => Box::new(Engine2D::new(resolver.clone(), style.clone(), &config)),
			RenderMode::ThreeD => Box::new(Engine3D::new(resolver.clone(), style.clone(), &config)),
		}
	})
}

/// Whether the requested mode is actually on screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EngineStatus {
	/// The requested engine is mounted.
	#[default]
	Ready,
	/// The requested engine failed to mount; the previous one is still mounted.
	Unavailable,
}

/// Owns the one mounted engine and keeps it in step with the model, the
/// requested mode and the container size.
pub struct GraphController {
	factory: EngineFactory,
	zoom: ZoomConfig,
	mode: RenderMode,
	engine_mode: RenderMode,
	engine: Box<dyn RenderEngine>,
	status: EngineStatus,
	model: GraphModel,
	surface: Option<DrawSurface>,
	size: (f64, f64),
	pending_zoom: bool,
	on_click: Option<NodeClickHandler>,
}

impl GraphController {
	/// Starts detached with an empty model and a 2D engine.
	pub fn new(factory: EngineFactory, zoom: ZoomConfig) -> Self {
		let engine = factory(RenderMode::TwoD);
		Self {
			factory,
			zoom,
			mode: RenderMode::TwoD,
			engine_mode: RenderMode::TwoD,
			engine,
			status: EngineStatus::Ready,
			model: GraphModel::default(),
			surface: None,
			size: (0.0, 0.0),
			pending_zoom: false,
			on_click: None,
		}
	}

	/// The mode last asked for, which may differ from what is mounted.
	pub fn mode(&self) -> RenderMode {
		self.mode
	}

	/// The mode of the engine actually mounted.
	pub fn engine_mode(&self) -> RenderMode {
		self.engine_mode
	}

	/// Whether the last mode switch succeeded.
	pub fn status(&self) -> EngineStatus {
		self.status
	}

	/// The model last handed to [`Self::set_model`].
	pub fn model(&self) -> &GraphModel {
		&self.model
	}

	/// Nodes held by the mounted engine.
	pub fn node_count(&self) -> usize {
		self.engine.node_count()
	}

	/// Links held by the mounted engine.
	pub fn link_count(&self) -> usize {
		self.engine.link_count()
	}

	/// Whether a drawing surface is bound.
	pub fn is_attached(&self) -> bool {
		self.surface.is_some()
	}

	/// Binds to a drawing surface and mounts the engine for the requested mode.
	pub fn attach(&mut self, surface: DrawSurface, width: f64, height: f64) {
		self.surface = Some(surface);
		self.size = (width, height);
		let wanted = self.mode;
		if wanted != RenderMode::TwoD {
			// The fallback needs a 2D engine in place before the first swap.
			self.apply(RenderMode::TwoD);
		}
		self.apply(wanted);
	}

	/// Replaces the shown data. The layout restarts and one zoom is scheduled.
	pub fn set_model(&mut self, model: GraphModel) {
		self.model = model.sanitized();
		info!(
			"graph model: {} nodes, {} links",
			self.model.nodes.len(),
			self.model.links.len()
		);
		if self.engine.is_mounted() {
			self.engine.set_data(&self.model);
		}
		self.pending_zoom = true;
	}

	/// Swaps engines. The new one is mounted before the old one is disposed, so
	/// a failed mount leaves the current engine on screen.
	pub fn set_mode(&mut self, mode: RenderMode) {
		if mode == self.mode {
			return;
		}
		self.mode = mode;
		if self.surface.is_some() {
			self.apply(mode);
		}
	}

	fn apply(&mut self, mode: RenderMode) {
		if mode == self.engine_mode && self.engine.is_mounted() {
			self.status = EngineStatus::Ready;
			return;
		}
		match self.install(mode) {
			Ok(()) => {
				self.status = EngineStatus::Ready;
				info!("render mode: {mode:?}");
			}
			Err(e) => {
				self.status = EngineStatus::Unavailable;
				warn!("{e}; keeping {:?} engine", self.engine_mode);
			}
		}
	}

	/// Mounts a fresh engine and only then disposes the old one.
	fn install(&mut self, mode: RenderMode) -> Result<(), GraphError> {
		let Some(surface) = self.surface.clone() else {
			return Ok(());
		};
		let mut next = (self.factory)(mode);
		next.mount(surface, self.size.0, self.size.1)?;
		if let Some(handler) = &self.on_click {
			next.set_node_click_handler(handler.clone());
		}
		next.set_data(&self.model);

		let mut previous = std::mem::replace(&mut self.engine, next);
		previous.dispose();
		self.engine_mode = mode;
		self.pending_zoom = true;
		Ok(())
	}

	/// Installs the click callback on this and every later engine.
	pub fn set_node_click_handler(&mut self, handler: NodeClickHandler) {
		self.on_click = Some(handler.clone());
		self.engine.set_node_click_handler(handler);
	}

	/// Forwards a container size change. Repeated sizes are ignored.
	pub fn resize(&mut self, width: f64, height: f64) {
		if self.size == (width, height) {
			return;
		}
		self.size = (width, height);
		if self.engine.is_mounted() {
			self.engine.resize(width, height);
		}
	}

	/// Last known container size.
	pub fn size(&self) -> (f64, f64) {
		self.size
	}

	/// Advances the mounted engine one frame. Returns true when this frame
	/// issued the scheduled zoom-to-fit.
	pub fn tick(&mut self, dt: f64) -> bool {
		if !self.engine.is_mounted() {
			return false;
		}
		let settled = self.engine.tick(dt);
		if !(settled && self.pending_zoom) {
			return false;
		}
		self.pending_zoom = false;
		if self.model.is_empty() {
			return false;
		}
		debug!("layout settled, fitting {} nodes", self.model.nodes.len());
		self.zoom_to_fit(self.zoom.duration_ms, self.zoom.padding_px);
		true
	}

	/// Draws the current frame.
	pub fn render(&self) {
		if self.engine.is_mounted() {
			self.engine.render();
		}
	}

	/// Fits the camera now. Does nothing for an empty model.
	pub fn zoom_to_fit(&mut self, duration_ms: f64, padding_px: f64) {
		if self.engine.is_mounted() {
			self.engine.request_zoom_to_fit(duration_ms, padding_px);
		}
	}

	/// Pointer pressed at a container position.
	pub fn pointer_down(&mut self, x: f64, y: f64) {
		self.engine.pointer_down(x, y);
	}

	/// Pointer moved, pressed or not.
	pub fn pointer_move(&mut self, x: f64, y: f64) {
		self.engine.pointer_move(x, y);
	}

	/// Pointer released.
	pub fn pointer_up(&mut self, x: f64, y: f64) {
		self.engine.pointer_up(x, y);
	}

	/// Pointer left the container.
	pub fn pointer_leave(&mut self) {
		self.engine.pointer_leave();
	}

	/// Wheel zoom around a container position.
	pub fn wheel(&mut self, x: f64, y: f64, delta_y: f64) {
		self.engine.wheel(x, y, delta_y);
	}

	/// Tears the engine down and detaches from the surface.
	pub fn dispose(&mut self) {
		self.engine.dispose();
		self.surface = None;
		self.pending_zoom = false;
	}
}

/// The host's only way to move the camera.
///
/// Cloneable and cheap. Calls made before the graph is mounted, or after it
/// was torn down, do nothing.
#[derive(Clone, Default)]
pub struct ZoomHandle(Rc<RefCell<Weak<RefCell<GraphController>>>>);

impl ZoomHandle {
	/// Handle bound to nothing yet.
	pub fn new() -> Self {
		Self::default()
	}

	pub(crate) fn bind(&self, controller: &Rc<RefCell<GraphController>>) {
		*self.0.borrow_mut() = Rc::downgrade(controller);
	}

	/// Returns false when nothing is mounted to zoom.
	pub fn zoom_to_fit(&self, duration_ms: f64, padding_px: f64) -> bool {
		let Some(controller) = self.0.borrow().upgrade() else {
			return false;
		};
		let Ok(mut controller) = controller.try_borrow_mut() else {
			return false;
		};
		if !controller.is_attached() {
			return false;
		}
		controller.zoom_to_fit(duration_ms, padding_px);
		true
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;

	use super::*;
	use crate::components::force_graph::style::AbaLinkStyle;
	use crate::components::force_graph::theme::FixedTheme;
	use crate::components::force_graph::types::{GraphLink, GraphNode, LinkKind};

	/// A 3D engine whose runtime never comes up.
	struct NoRuntime;

	impl RenderEngine for NoRuntime {
		fn mount(&mut self, _: DrawSurface, _: f64, _: f64) -> Result<(), GraphError> {
			Err(GraphError::EngineUnavailable {
				reason: "no runtime".into(),
			})
		}
		fn set_data(&mut self, _: &GraphModel) {}
		fn set_node_click_handler(&mut self, _: NodeClickHandler) {}
		fn request_zoom_to_fit(&mut self, _: f64, _: f64) {}
		fn resize(&mut self, _: f64, _: f64) {}
		fn tick(&mut self, _: f64) -> bool {
			false
		}
		fn render(&self) {}
		fn pointer_down(&mut self, _: f64, _: f64) {}
		fn pointer_move(&mut self, _: f64, _: f64) {}
		fn pointer_up(&mut self, _: f64, _: f64) {}
		fn pointer_leave(&mut self) {}
		fn wheel(&mut self, _: f64, _: f64, _: f64) {}
		fn node_at(&self, _: f64, _: f64) -> Option<usize> {
			None
		}
		fn node_count(&self) -> usize {
			0
		}
		fn link_count(&self) -> usize {
			0
		}
		fn is_mounted(&self) -> bool {
			false
		}
		fn dispose(&mut self) {}
	}

	fn factory() -> EngineFactory {
		engine_factory(
			Rc::new(FixedTheme::default()),
			Rc::new(AbaLinkStyle),
			ViewerConfig::default(),
		)
	}

	fn without_3d() -> EngineFactory {
		let real = factory();
		Box::new(move |mode| -> Box<dyn RenderEngine> {
			match mode {
				RenderMode::TwoD => real(mode),
				RenderMode::ThreeD => Box::new(NoRuntime),
			}
		})
	}

	fn model() -> GraphModel {
		let mut m = GraphModel::default();
		for id in ["A1", "A2", "A3", "A4"] {
			m.add_node(GraphNode::plain(id));
		}
		for (s, t) in [("A1", "A2"), ("A2", "A1"), ("A3", "A3"), ("A4", "A1"), ("A4", "A2")] {
			m.add_link(GraphLink::new(s, t, LinkKind::Attack)).unwrap();
		}
		m
	}

	fn attached(factory: EngineFactory) -> GraphController {
		let mut c = GraphController::new(factory, ZoomConfig::default());
		c.attach(DrawSurface::Headless, 800.0, 600.0);
		c.set_model(model());
		c
	}

	fn zooms(c: &mut GraphController, frames: usize) -> usize {
		(0..frames).filter(|_| c.tick(0.016)).count()
	}

	#[test]
	fn mode_round_trip_keeps_counts() {
		let mut c = attached(factory());
		assert_eq!((c.node_count(), c.link_count()), (4, 5));

		c.set_mode(RenderMode::ThreeD);
		assert_eq!(c.engine_mode(), RenderMode::ThreeD);
		assert_eq!((c.node_count(), c.link_count()), (4, 5));

		c.set_mode(RenderMode::TwoD);
		assert_eq!(c.engine_mode(), RenderMode::TwoD);
		assert_eq!((c.node_count(), c.link_count()), (4, 5));
		assert_eq!(c.model(), &model());
	}

	#[test]
	fn unavailable_3d_leaves_2d_mounted() {
		let mut c = attached(without_3d());
		c.set_mode(RenderMode::ThreeD);
		assert_eq!(c.status(), EngineStatus::Unavailable);
		assert_eq!(c.mode(), RenderMode::ThreeD);
		assert_eq!(c.engine_mode(), RenderMode::TwoD);
		assert_eq!((c.node_count(), c.link_count()), (4, 5));

		c.set_mode(RenderMode::TwoD);
		assert_eq!(c.status(), EngineStatus::Ready);
		assert_eq!(c.node_count(), 4);
	}

	#[test]
	fn one_zoom_per_change() {
		let mut c = attached(factory());
		assert_eq!(zooms(&mut c, 80), 1);
		assert_eq!(zooms(&mut c, 80), 0);

		c.set_mode(RenderMode::ThreeD);
		assert_eq!(zooms(&mut c, 80), 1);

		c.set_model(model());
		assert_eq!(zooms(&mut c, 80), 1);
	}

	#[test]
	fn empty_model_never_zooms() {
		let mut c = GraphController::new(factory(), ZoomConfig::default());
		c.attach(DrawSurface::Headless, 800.0, 600.0);
		c.set_model(GraphModel::default());
		assert_eq!(zooms(&mut c, 80), 0);
	}

	#[test]
	fn model_set_before_attach_is_shown_on_attach() {
		let mut c = GraphController::new(factory(), ZoomConfig::default());
		c.set_mode(RenderMode::ThreeD);
		c.set_model(model());
		assert_eq!(c.node_count(), 0);

		c.attach(DrawSurface::Headless, 800.0, 600.0);
		assert_eq!(c.engine_mode(), RenderMode::ThreeD);
		assert_eq!(c.node_count(), 4);
	}

	#[test]
	fn zoom_handle_follows_controller_lifetime() {
		let handle = ZoomHandle::new();
		assert!(!handle.zoom_to_fit(400.0, 50.0));

		let controller = Rc::new(RefCell::new(attached(factory())));
		handle.bind(&controller);
		assert!(handle.clone().zoom_to_fit(400.0, 50.0));

		controller.borrow_mut().dispose();
		assert!(!handle.zoom_to_fit(400.0, 50.0));
		drop(controller);
		assert!(!handle.zoom_to_fit(400.0, 50.0));
	}

	#[test]
	fn click_handler_survives_engine_swap() {
		let hits = Rc::new(Cell::new(0));
		let sink = hits.clone();
		let mut c = GraphController::new(factory(), ZoomConfig::default());
		c.set_node_click_handler(Rc::new(move |_: &GraphNode| sink.set(sink.get() + 1)));
		c.attach(DrawSurface::Headless, 800.0, 600.0);
		let mut lone = GraphModel::default();
		lone.add_node(GraphNode::plain("only"));
		c.set_model(lone);

		c.set_mode(RenderMode::ThreeD);
		c.set_mode(RenderMode::TwoD);
		c.pointer_down(400.0, 300.0);
		c.pointer_up(400.0, 300.0);
		assert_eq!(hits.get(), 1);
	}
}
