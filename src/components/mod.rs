//! UI components.

/// The graph canvas and its engines.
pub mod force_graph;
