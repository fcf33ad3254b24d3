//! Leptos component hosting a [`GraphController`] on a canvas.
//!
//! The component wires mouse and wheel events to the controller and drives it
//! from a `requestAnimationFrame` loop. The container size is polled every
//! frame as well as on window resize, so the graph follows layouts that grow
//! after first mount (a side panel expanding, for instance).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use send_wrapper::SendWrapper;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlCanvasElement, MouseEvent, WheelEvent};

use super::controller::{EngineStatus, GraphController, ZoomHandle, engine_factory};
use super::engine::{DrawSurface, RenderMode};
use super::style::LinkDomain;
use super::theme::CssThemeResolver;
use super::types::{GraphModel, GraphNode};
use crate::config::ViewerConfig;

/// Fixed physics step per animation frame, in seconds.
const FRAME_DT: f64 = 0.016;

type FrameClosure = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

fn container_size(canvas: &HtmlCanvasElement) -> (f64, f64) {
	let (w, h) = canvas
		.parent_element()
		.map(|p| (p.client_width() as f64, p.client_height() as f64))
		.unwrap_or((0.0, 0.0));
	(
		if w > 0.0 { w } else { 800.0 },
		if h > 0.0 { h } else { 600.0 },
	)
}

fn local_position(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Renders a [`GraphModel`] in 2D or 3D.
///
/// `model` and `mode` are reactive; changing either restarts the layout and
/// fits the camera once it settles. Pass a [`ZoomHandle`] to refit from
/// outside. Node clicks are reported through `on_node_selected`.
#[component]
pub fn GraphCanvas(
	#[prop(into)] model: Signal<GraphModel>,
	#[prop(into)] mode: Signal<RenderMode>,
	#[prop(optional, into)] on_node_selected: Option<Callback<GraphNode>>,
	#[prop(into, default = Signal::stored(false))] loading: Signal<bool>,
	#[prop(optional)] handle: Option<ZoomHandle>,
	#[prop(optional)] links: LinkDomain,
	#[prop(optional)] config: Option<ViewerConfig>,
) -> impl IntoView {
	let config = config.unwrap_or_else(ViewerConfig::load_from_dom);
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let status = RwSignal::new(EngineStatus::Ready);

	let controller = Rc::new(RefCell::new(GraphController::new(
		engine_factory(Rc::new(CssThemeResolver), links.style(), config.clone()),
		config.zoom.clone(),
	)));
	if let Some(handle) = &handle {
		handle.bind(&controller);
	}
	if let Some(callback) = on_node_selected {
		controller
			.borrow_mut()
			.set_node_click_handler(Rc::new(move |node: &GraphNode| callback.run(node.clone())));
	}

	let animate: FrameClosure = Rc::new(RefCell::new(None));
	let resize_cb: FrameClosure = Rc::new(RefCell::new(None));
	let frame_id: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));

	let controller_data = controller.clone();
	Effect::new(move |_| {
		let next = model.get();
		controller_data.borrow_mut().set_model(next);
	});

	let controller_mode = controller.clone();
	Effect::new(move |_| {
		let next = mode.get();
		let mut c = controller_mode.borrow_mut();
		c.set_mode(next);
		status.set(c.status());
	});

	let (controller_init, animate_init, resize_init, frame_init) =
		(controller.clone(), animate.clone(), resize_cb.clone(), frame_id.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		{
			let mut c = controller_init.borrow_mut();
			if c.is_attached() {
				return;
			}
			let (w, h) = container_size(&canvas);
			c.attach(DrawSurface::Canvas(canvas.clone()), w, h);
			status.set(c.status());
		}

		let (controller_resize, canvas_resize) = (controller_init.clone(), canvas.clone());
		*resize_init.borrow_mut() = Some(Closure::new(move || {
			let (w, h) = container_size(&canvas_resize);
			controller_resize.borrow_mut().resize(w, h);
		}));
		if let Some(ref cb) = *resize_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (controller_anim, animate_inner, frame_inner) =
			(controller_init.clone(), animate_init.clone(), frame_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			{
				let mut c = controller_anim.borrow_mut();
				if !c.is_attached() {
					return;
				}
				let (w, h) = container_size(&canvas);
				c.resize(w, h);
				c.tick(FRAME_DT);
				c.render();
			}
			if let (Some(cb), Some(win)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				frame_inner.set(win.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			frame_init.set(window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
		}
	});

	let teardown = SendWrapper::new((controller.clone(), animate, resize_cb, frame_id));
	on_cleanup(move || {
		let (controller, animate, resize_cb, frame_id) = teardown.take();
		if let Some(window) = web_sys::window() {
			if let Some(id) = frame_id.take() {
				let _ = window.cancel_animation_frame(id);
			}
			if let Some(ref cb) = *resize_cb.borrow() {
				let _ = window.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}
		controller.borrow_mut().dispose();
		animate.borrow_mut().take();
		resize_cb.borrow_mut().take();
	});

	let controller_md = controller.clone();
	let on_mousedown = move |ev: MouseEvent| {
		if let Some((x, y)) = local_position(canvas_ref, &ev) {
			controller_md.borrow_mut().pointer_down(x, y);
		}
	};

	let controller_mm = controller.clone();
	let on_mousemove = move |ev: MouseEvent| {
		if let Some((x, y)) = local_position(canvas_ref, &ev) {
			controller_mm.borrow_mut().pointer_move(x, y);
		}
	};

	let controller_mu = controller.clone();
	let on_mouseup = move |ev: MouseEvent| {
		if let Some((x, y)) = local_position(canvas_ref, &ev) {
			controller_mu.borrow_mut().pointer_up(x, y);
		}
	};

	let controller_ml = controller.clone();
	let on_mouseleave = move |_: MouseEvent| {
		controller_ml.borrow_mut().pointer_leave();
	};

	let controller_wh = controller;
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		if let Some((x, y)) = local_position(canvas_ref, &ev) {
			controller_wh.borrow_mut().wheel(x, y, ev.delta_y());
		}
	};

	view! {
		<div class="graph-canvas" style="position: relative; width: 100%; height: 100%;">
			<canvas
				node_ref=canvas_ref
				class="force-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				style="display: block; cursor: grab;"
			/>
			<Show when=move || model.with(GraphModel::is_empty)>
				<div class="graph-placeholder">
					<p class="graph-placeholder-title">"No data yet"</p>
					<p>"Upload or generate a dataset to visualize it here."</p>
				</div>
			</Show>
			<Show when=move || status.get() == EngineStatus::Unavailable>
				<div class="graph-placeholder">"Loading 3D engine..."</div>
			</Show>
			<Show when=move || loading.get()>
				<div class="graph-loading">"Loading graph data…"</div>
			</Show>
		</div>
	}
}
