//! aba-graph: interactive 2D/3D visualization of ABA and ABA+ argumentation results.
//!
//! Backend results are mapped to one graph model ([`mapping`]) and drawn by a
//! force-directed canvas component ([`components::force_graph`]) that can swap
//! between a 2D and a 3D engine without losing data.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

/// UI components.
pub mod components;
/// Host-provided tuning.
pub mod config;
/// Recoverable failures.
pub mod error;
/// Backend results to graph models.
pub mod mapping;
/// Viewer state and its reducer.
pub mod session;

pub use components::force_graph::{GraphCanvas, GraphLink, GraphModel, GraphNode, RenderMode, ZoomHandle};
pub use error::GraphError;
pub use session::{Action, ViewerSession};

use components::force_graph::{AbaLinkStyle, LinkDomain, LinkKind, LinkStyle};
use mapping::payload::Payload;
use mapping::relations::{PredictedRelation, SseDecoder};
use mapping::summary::FrameworkSummary;
use mapping::{Mode, View};

/// Element id the host page embeds a computed result under.
pub const RESULT_ELEMENT_ID: &str = "aba-result";

/// Element id holding a recorded relation-prediction event stream.
pub const RELATIONS_ELEMENT_ID: &str = "aba-relations";

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("aba-graph: logging initialized");
}

fn script_text(id: &str) -> Option<String> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id(id)?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	script.text().ok()
}

/// Load a backend result from a script element with id="aba-result".
fn load_result() -> Option<Payload> {
	let json_text = script_text(RESULT_ELEMENT_ID)?;

	match Payload::from_json(&json_text) {
		Ok(payload) => {
			info!("aba-graph: loaded {} result", payload.shape());
			Some(payload)
		}
		Err(e) => {
			warn!("aba-graph: {e}");
			None
		}
	}
}

/// Decode predicted relations from a script element with id="aba-relations".
fn load_relations() -> Vec<PredictedRelation> {
	let Some(stream) = script_text(RELATIONS_ELEMENT_ID) else {
		return Vec::new();
	};
	let mut decoder = SseDecoder::default();
	let mut relations = decoder.push(&stream);
	relations.extend(decoder.finish());
	info!("aba-graph: {} predicted relations", relations.len());
	relations
}

#[component]
fn Legend(#[prop(into)] mode: Signal<Mode>) -> impl IntoView {
	let style = AbaLinkStyle;
	let kinds = move || -> &'static [LinkKind] {
		match mode.get() {
			Mode::Classical => &[LinkKind::Attack],
			Mode::Plus => &[LinkKind::NormalAttack, LinkKind::ReverseAttack],
		}
	};

	view! {
		<ul class="graph-legend">
			{move || {
				kinds()
					.iter()
					.map(|&kind| {
						let color = style.color(&GraphLink::new("", "", kind)).to_css();
						view! {
							<li>
								<span class="legend-swatch" style=format!("background: {color};")></span>
								{kind.legend()}
							</li>
						}
					})
					.collect_view()
			}}
		</ul>
	}
}

#[component]
fn FrameworkPanel(session: RwSignal<ViewerSession>) -> impl IntoView {
	let summary = move || session.with(|s| s.framework().map(FrameworkSummary::from));
	let outline = move || session.with(|s| s.transformation_outline().map(|o| o.to_string()));
	let arguments = move || session.with(ViewerSession::argument_lines);
	let lines = |items: Vec<String>| items.into_iter().map(|item| view! { <li>{item}</li> }).collect_view();

	view! {
		<aside class="framework-panel">
			{move || {
				summary()
					.map(|fw| {
						view! {
							<section>
								<h2>"Framework"</h2>
								<p>"Language: " {fw.language}</p>
								<p>"Assumptions: " {fw.assumptions}</p>
								<ul class="rules">{lines(fw.rules)}</ul>
								<ul class="contraries">{lines(fw.contraries)}</ul>
								<ul class="preferences">{lines(fw.preferences)}</ul>
							</section>
						}
					})
			}}
			{move || {
				outline()
					.map(|text| {
						view! {
							<section>
								<h2>"Transformations"</h2>
								<pre>{text}</pre>
							</section>
						}
					})
			}}
			<Show when=move || !arguments().is_empty()>
				<section>
					<h2>"Arguments"</h2>
					<ul>{move || lines(arguments())}</ul>
				</section>
			</Show>
		</aside>
	}
}

/// Main application component.
/// Loads a result from the DOM and renders it with mode and view toggles.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let issued = ViewerSession::new().reduce(Action::RequestIssued);
	let initial = match issued.latest {
		Some(id) => issued.reduce(Action::ResponseArrived {
			id,
			payload: load_result(),
		}),
		None => issued,
	};
	let predictions = load_relations();
	let links = if predictions.is_empty() {
		LinkDomain::Aba
	} else {
		LinkDomain::Relations
	};
	let initial = predictions
		.into_iter()
		.fold(initial, |s, relation| s.reduce(Action::RelationPredicted(relation)));
	let session = RwSignal::new(initial);
	let dispatch = move |action: Action| session.update(|s| *s = std::mem::take(s).reduce(action));

	let model = Signal::derive(move || session.with(|s| s.model.clone()));
	let render_mode = Signal::derive(move || session.with(|s| s.render_mode));
	let loading = Signal::derive(move || session.with(ViewerSession::is_loading));
	let mapping_mode = Signal::derive(move || session.with(|s| s.mode));
	let selected = RwSignal::new(None::<GraphNode>);
	let on_node_selected = Callback::new(move |node: GraphNode| selected.set(Some(node)));

	let handle = ZoomHandle::new();
	let fit = handle.clone();
	let view_button = move |view: View, text: &'static str| {
		view! {
			<button
				class:active=move || session.with(|s| s.view == view)
				on:click=move |_| dispatch(Action::SetView(view))
			>
				{text}
			</button>
		}
	};

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text="ABA Graph Viewer" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph">
			<GraphCanvas model=model mode=render_mode loading=loading handle=handle links=links on_node_selected=on_node_selected />
			<div class="graph-overlay">
				<h1>"ABA Graph"</h1>
				<p class="subtitle">"Click a node to inspect it. Scroll to zoom. Drag the background to pan or orbit."</p>
				<div class="graph-controls">
					<button on:click=move |_| dispatch(Action::ToggleRenderMode)>
						{move || session.with(|s| s.render_mode.switch_label())}
					</button>
					<button on:click=move |_| {
						fit.zoom_to_fit(400.0, 50.0);
					}>"Fit"</button>
					<Show when=move || session.with(ViewerSession::has_views)>
						{view_button(View::Before, "Before")}
						{view_button(View::After, "After")}
					</Show>
				</div>
				<Legend mode=mapping_mode />
				{move || {
					selected
						.get()
						.map(|node| view! { <p class="selected-node">"Selected: " {node.label}</p> })
				}}
				{move || {
					session.with(|s| s.error.clone()).map(|e| view! { <p class="error">{e}</p> })
				}}
				<FrameworkPanel session=session />
			</div>
		</div>
	}
}
