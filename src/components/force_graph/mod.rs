//! Force-directed argumentation graph visualization.
//!
//! Renders a [`GraphModel`] on an HTML canvas with one of two engines:
//! - 2D: physics via `force_graph`, nodes drawn as word-wrapped label boxes
//!   that also serve as collision footprints and click targets
//! - 3D: an orbiting perspective camera over a 3D relaxation solver
//!
//! A [`GraphController`] owns whichever engine is mounted, keeps the model
//! across mode switches and fits the camera once the layout settles.
//!
//! # Example
//!
//! ```ignore
//! use aba_graph::components::force_graph::{GraphCanvas, RenderMode, ZoomHandle};
//! use aba_graph::mapping::{View, map_json};
//!
//! let report = map_json(&payload_text, View::After);
//! let handle = ZoomHandle::new();
//!
//! view! {
//!     <GraphCanvas
//!         model=Signal::stored(report.model)
//!         mode=Signal::stored(RenderMode::TwoD)
//!         handle=handle.clone()
//!     />
//! }
//! ```

mod component;
/// Engine ownership, mode switching and scheduled zoom.
pub mod controller;
/// The engine capability trait and shared interaction helpers.
pub mod engine;
/// Flat engine over `force_graph`.
pub mod engine2d;
/// Perspective engine and camera.
pub mod engine3d;
/// Label wrapping and measurement.
pub mod labels;
/// Layout forces and settle detection.
pub mod physics;
mod render;
mod render3d;
/// Zoom-dependent sizes.
pub mod scale;
/// Per-link drawing attributes.
pub mod style;
/// Colors and theme resolution.
pub mod theme;
/// Graph data model.
pub mod types;

pub use component::GraphCanvas;
pub use controller::{EngineStatus, GraphController, ZoomHandle};
pub use engine::{DrawSurface, RenderEngine, RenderMode};
pub use style::{AbaLinkStyle, LinkDomain, LinkStyle, RelationLinkStyle};
pub use theme::{CssThemeResolver, FixedTheme, Theme, ThemeResolver};
pub use types::{GraphLink, GraphModel, GraphNode, LinkKind};
