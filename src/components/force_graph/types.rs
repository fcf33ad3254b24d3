//! Canonical graph model consumed by the render engines.
//!
//! A [`GraphModel`] is produced by the mapping layer and handed to the
//! controller as a whole. Layout state (positions, velocities, label boxes)
//! is not stored here: it belongs to whichever engine currently renders the
//! model and is rebuilt from scratch on every `set_data`.

use std::collections::HashSet;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// A node in the graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
	/// Unique identifier, assigned once by the mapper. Used to reference nodes in links.
	pub id: String,
	/// Display label drawn on the node.
	pub label: String,
}

impl GraphNode {
	/// A node whose label is its id.
	pub fn plain(id: impl Into<String>) -> Self {
		let id = id.into();
		Self {
			label: id.clone(),
			id,
		}
	}
}

/// The relation a link represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkKind {
	/// Classical ABA attack between arguments.
	Attack,
	/// ABA+ attack that survives preference checking.
	NormalAttack,
	/// ABA+ attack whose direction was inverted by preferences.
	ReverseAttack,
	/// Support relation (prediction graphs).
	Support,
}

impl LinkKind {
	/// Whether this kind is drawn with a direction arrow in ABA views.
	pub fn is_attack(self) -> bool {
		matches!(self, Self::Attack | Self::NormalAttack | Self::ReverseAttack)
	}

	/// Legend text for the kind.
	pub fn legend(self) -> &'static str {
		match self {
			Self::Attack => "Attack",
			Self::NormalAttack => "Normal Attack",
			Self::ReverseAttack => "Reverse Attack",
			Self::Support => "Support",
		}
	}
}

/// A directed edge between two nodes.
///
/// Visual attributes (color, curvature, arrow length, width) are not stored:
/// they are computed from `kind` by a [`LinkStyle`](super::style::LinkStyle)
/// at draw time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLink {
	/// Source node ID.
	pub source: String,
	/// Target node ID.
	pub target: String,
	/// Relation kind.
	pub kind: LinkKind,
	/// Optional hover text (e.g. "Support (87.5%)").
	#[serde(default)]
	pub label: Option<String>,
}

impl GraphLink {
	/// A link without hover text.
	pub fn new(source: impl Into<String>, target: impl Into<String>, kind: LinkKind) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			kind,
			label: None,
		}
	}

	/// Whether the link starts and ends on the same node.
	pub fn is_self_loop(&self) -> bool {
		self.source == self.target
	}
}

/// Complete graph data: nodes in first-seen order, links in first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphModel {
	/// Nodes, unique by id.
	pub nodes: Vec<GraphNode>,
	/// Links whose endpoints are all in `nodes`.
	pub links: Vec<GraphLink>,
}

impl GraphModel {
	/// Returns true when there is nothing to draw.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Whether a node with `id` exists.
	pub fn contains(&self, id: &str) -> bool {
		self.nodes.iter().any(|n| n.id == id)
	}

	/// The node with `id`.
	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	/// Appends `node` unless a node with the same id exists. Returns whether it was added.
	pub fn add_node(&mut self, node: GraphNode) -> bool {
		if self.contains(&node.id) {
			return false;
		}
		self.nodes.push(node);
		true
	}

	/// Appends `link` if both endpoints exist, otherwise drops it.
	pub fn add_link(&mut self, link: GraphLink) -> Result<(), GraphError> {
		if !self.contains(&link.source) || !self.contains(&link.target) {
			return Err(GraphError::DanglingReference {
				source_id: link.source,
				target_id: link.target,
			});
		}
		self.links.push(link);
		Ok(())
	}

	/// Drops every link whose endpoints are missing and every duplicate node id.
	///
	/// The mapper never produces such a model; this is the last line before a
	/// model reaches an engine.
	pub fn sanitized(mut self) -> Self {
		let mut seen = HashSet::new();
		self.nodes.retain(|n| seen.insert(n.id.clone()));
		self.links.retain(|l| {
			let ok = seen.contains(&l.source) && seen.contains(&l.target);
			if !ok {
				warn!(
					"{}",
					GraphError::DanglingReference {
						source_id: l.source.clone(),
						target_id: l.target.clone(),
					}
				);
			}
			ok
		});
		self
	}
}
