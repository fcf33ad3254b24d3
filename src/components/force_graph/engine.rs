//! Capability interface shared by the 2D and 3D engines.
//!
//! An engine is created unmounted, mounted once onto a [`DrawSurface`], fed a
//! [`GraphModel`] and then driven frame by frame through [`RenderEngine::tick`]
//! and [`RenderEngine::render`]. The controller owns exactly one mounted engine
//! at a time and is the only caller of these methods.

use std::rc::Rc;

use web_sys::HtmlCanvasElement;

use super::types::{GraphModel, GraphNode};
use crate::error::GraphError;

/// Which engine variant is shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderMode {
	/// Flat canvas with boxed labels.
	#[default]
	TwoD,
	/// Perspective view with an orbit camera.
	ThreeD,
}

impl RenderMode {
	/// The other mode.
	pub fn toggled(self) -> Self {
		match self {
			Self::TwoD => Self::ThreeD,
			Self::ThreeD => Self::TwoD,
		}
	}

	/// Button text for switching to the other mode.
	pub fn switch_label(self) -> &'static str {
		match self {
			Self::TwoD => "Switch to 3D",
			Self::ThreeD => "Switch to 2D",
		}
	}
}

/// Where an engine draws.
#[derive(Clone, Debug)]
pub enum DrawSurface {
	/// A page canvas.
	Canvas(HtmlCanvasElement),
	/// No pixels: physics, label measurement and hit-testing only.
	Headless,
}

/// Called with the node under the pointer when it is clicked.
pub type NodeClickHandler = Rc<dyn Fn(&GraphNode)>;

/// Pointer travel, in pixels, below which a press and release count as a click.
pub const CLICK_SLOP: f64 = 4.0;

/// A force-directed view the controller can mount, feed and drive.
pub trait RenderEngine {
	/// Binds the engine to a surface. Fails with [`GraphError::EngineUnavailable`]
	/// when the surface cannot be drawn on by this engine.
	fn mount(&mut self, surface: DrawSurface, width: f64, height: f64) -> Result<(), GraphError>;

	/// Replaces everything shown. Layout restarts from scratch.
	fn set_data(&mut self, model: &GraphModel);

	/// Replaces the node click callback.
	fn set_node_click_handler(&mut self, handler: NodeClickHandler);

	/// Animates the camera so every node is visible with `padding_px` to spare.
	fn request_zoom_to_fit(&mut self, duration_ms: f64, padding_px: f64);

	/// Adopts a new viewport size in pixels.
	fn resize(&mut self, width: f64, height: f64);

	/// Advances physics and camera by `dt` seconds. Returns true on the one
	/// step where the layout settles after the last `set_data`.
	fn tick(&mut self, dt: f64) -> bool;

	/// Draws one frame. Headless engines draw nothing.
	fn render(&self);

	/// Starts a drag or click.
	fn pointer_down(&mut self, x: f64, y: f64);
	/// Drags while pressed, hovers otherwise.
	fn pointer_move(&mut self, x: f64, y: f64);
	/// Ends a drag. A release close to the press point is a click.
	fn pointer_up(&mut self, x: f64, y: f64);
	/// Cancels the gesture and any hover.
	fn pointer_leave(&mut self);
	/// Zooms toward `(x, y)`; positive `delta_y` zooms out.
	fn wheel(&mut self, x: f64, y: f64, delta_y: f64);

	/// Index, in model order, of the node drawn at a screen position.
	fn node_at(&self, x: f64, y: f64) -> Option<usize>;

	/// Nodes currently laid out.
	fn node_count(&self) -> usize;
	/// Links currently laid out.
	fn link_count(&self) -> usize;
	/// Whether a surface is bound.
	fn is_mounted(&self) -> bool;

	/// Releases the surface and all layout state. Safe to call more than once.
	fn dispose(&mut self);
}

/// Ease-in-out curve on 0..1.
pub fn smooth_step(t: f64) -> f64 {
	let t = t.clamp(0.0, 1.0);
	t * t * (3.0 - 2.0 * t)
}

/// Eased interpolation between two camera states.
#[derive(Clone, Debug, PartialEq)]
pub struct Tween<const N: usize> {
	from: [f64; N],
	to: [f64; N],
	elapsed: f64,
	duration: f64,
}

impl<const N: usize> Tween<N> {
	/// `duration` in seconds. Zero jumps on the first advance.
	pub fn new(from: [f64; N], to: [f64; N], duration: f64) -> Self {
		Self {
			from,
			to,
			elapsed: 0.0,
			duration: duration.max(0.0),
		}
	}

	/// Moves the tween forward. Returns the current value and whether it finished.
	pub fn advance(&mut self, dt: f64) -> ([f64; N], bool) {
		self.elapsed += dt;
		if self.duration <= 0.0 || self.elapsed >= self.duration {
			return (self.to, true);
		}
		let t = smooth_step(self.elapsed / self.duration);
		let mut out = [0.0; N];
		for i in 0..N {
			out[i] = self.from[i] + (self.to[i] - self.from[i]) * t;
		}
		(out, false)
	}

	/// End state of the tween.
	pub fn target(&self) -> [f64; N] {
		self.to
	}
}

/// Press position of a pointer gesture, used to tell clicks from drags.
#[derive(Clone, Copy, Debug, Default)]
pub struct PointerGesture {
	/// Where the pointer went down, while pressed.
	pub start: Option<(f64, f64)>,
	/// Position seen by the previous `drag`.
	pub last: (f64, f64),
}

impl PointerGesture {
	/// Starts a gesture.
	pub fn press(&mut self, x: f64, y: f64) {
		self.start = Some((x, y));
		self.last = (x, y);
	}

	/// Movement since the previous call, while pressed.
	pub fn drag(&mut self, x: f64, y: f64) -> Option<(f64, f64)> {
		self.start?;
		let delta = (x - self.last.0, y - self.last.1);
		self.last = (x, y);
		Some(delta)
	}

	/// Ends the gesture. Returns true when it was a click.
	pub fn release(&mut self, x: f64, y: f64) -> bool {
		match self.start.take() {
			Some((sx, sy)) => (x - sx).hypot(y - sy) <= CLICK_SLOP,
			None => false,
		}
	}

	/// Forgets the gesture without a click.
	pub fn cancel(&mut self) {
		self.start = None;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tween_eases_and_lands_on_target() {
		let mut t = Tween::new([0.0, 10.0], [10.0, 0.0], 1.0);
		let (mid, done) = t.advance(0.5);
		assert!(!done);
		assert!((mid[0] - 5.0).abs() < 1e-9);
		let (end, done) = t.advance(0.6);
		assert!(done);
		assert_eq!(end, [10.0, 0.0]);
	}

	#[test]
	fn zero_duration_jumps() {
		let mut t = Tween::new([1.0], [2.0], 0.0);
		assert_eq!(t.advance(0.0), ([2.0], true));
	}

	#[test]
	fn short_gestures_are_clicks() {
		let mut g = PointerGesture::default();
		g.press(10.0, 10.0);
		assert_eq!(g.drag(12.0, 11.0), Some((2.0, 1.0)));
		assert!(g.release(12.0, 11.0));

		g.press(0.0, 0.0);
		assert!(!g.release(30.0, 0.0));
		assert!(!g.release(0.0, 0.0));
		assert_eq!(g.drag(1.0, 1.0), None);
	}

	#[test]
	fn mode_toggles() {
		assert_eq!(RenderMode::TwoD.toggled(), RenderMode::ThreeD);
		assert_eq!(RenderMode::ThreeD.toggled().switch_label(), "Switch to 3D");
	}
}
