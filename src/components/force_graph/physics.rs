//! Force-directed relaxation shared by both engines.
//!
//! The layout is driven by four forces: link distance, charge (pairwise
//! repulsion), centering and collision. The 2D engine delegates charge to the
//! `force_graph` simulation and applies link distance, centering and collision
//! from this module after each step; the 3D engine runs [`Layout3`], which
//! integrates charge itself and uses the same three positional passes. Both
//! feed per-step displacement into a [`SettleTracker`] that reports when the
//! layout has come to rest.

use glam::DVec3;
use serde::Deserialize;

/// Physics tuning. Field defaults mirror d3-force conventions.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
	/// Target separation of linked nodes.
	pub link_distance: f64,
	/// How strongly links pull toward `link_distance` (0..1).
	pub link_strength: f64,
	/// Pairwise charge. Negative values repel.
	pub charge_strength: f64,
	/// Extra clearance kept between node footprints.
	pub collision_padding: f64,
	/// Fraction of an overlap resolved per step (0..1).
	pub collision_strength: f64,
	/// Fraction of velocity lost per step (3D solver).
	pub velocity_decay: f64,
	/// Per-step cooling of the 3D solver.
	pub alpha_decay: f64,
	/// Sphere radius used as the 3D collision footprint.
	pub node_radius_3d: f64,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			link_distance: 50.0,
			link_strength: 1.0,
			charge_strength: -300.0,
			collision_padding: 10.0,
			collision_strength: 0.5,
			velocity_decay: 0.4,
			alpha_decay: 0.02,
			node_radius_3d: 6.0,
		}
	}
}

/// When the layout counts as settled.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SettleConfig {
	/// Steps that always run before energy is considered.
	pub min_steps: u32,
	/// Steps after which the layout is settled regardless of energy.
	pub step_budget: u32,
	/// Mean squared displacement per node per step below which motion has stopped.
	pub energy_threshold: f64,
}

impl Default for SettleConfig {
	fn default() -> Self {
		Self {
			min_steps: 6,
			step_budget: 24,
			energy_threshold: 0.25,
		}
	}
}

/// Turns per-step energy readings into a single "settled" event.
#[derive(Clone, Debug, Default)]
pub struct SettleTracker {
	config: SettleConfig,
	steps: u32,
	settled: bool,
}

impl SettleTracker {
	/// Unsettled tracker with no steps seen.
	pub fn new(config: SettleConfig) -> Self {
		Self {
			config,
			steps: 0,
			settled: false,
		}
	}

	/// Records one step. Returns true on the one step where the layout becomes settled.
	pub fn observe(&mut self, energy: f64) -> bool {
		if self.settled {
			return false;
		}
		self.steps += 1;
		let quiet = self.steps >= self.config.min_steps && energy < self.config.energy_threshold;
		if quiet || self.steps >= self.config.step_budget {
			self.settled = true;
			return true;
		}
		false
	}

	/// Whether the tracker already fired.
	pub fn is_settled(&self) -> bool {
		self.settled
	}

	/// Steps observed since the last reset.
	pub fn steps(&self) -> u32 {
		self.steps
	}

	/// Arms the tracker again for new data.
	pub fn reset(&mut self) {
		self.steps = 0;
		self.settled = false;
	}
}

/// Translates all points so their mean sits on `target`.
pub fn center<const D: usize>(positions: &mut [[f64; D]], target: [f64; D]) {
	if positions.is_empty() {
		return;
	}
	let n = positions.len() as f64;
	let mut mean = [0.0; D];
	for p in positions.iter() {
		for a in 0..D {
			mean[a] += p[a] / n;
		}
	}
	for p in positions.iter_mut() {
		for a in 0..D {
			p[a] += target[a] - mean[a];
		}
	}
}

/// Pushes overlapping axis-aligned footprints apart.
///
/// `half` holds each node's half extents. Overlaps are resolved along the axis
/// of least penetration, `strength` of the overlap per call, split evenly.
pub fn collide<const D: usize>(
	positions: &mut [[f64; D]],
	half: &[[f64; D]],
	padding: f64,
	strength: f64,
) {
	let n = positions.len().min(half.len());
	for i in 0..n {
		for j in (i + 1)..n {
			let mut axis = 0;
			let mut least = f64::INFINITY;
			let mut separated = false;
			for a in 0..D {
				let gap = (positions[j][a] - positions[i][a]).abs();
				let overlap = half[i][a] + half[j][a] + padding - gap;
				if overlap <= 0.0 {
					separated = true;
					break;
				}
				if overlap < least {
					least = overlap;
					axis = a;
				}
			}
			if separated {
				continue;
			}
			let delta = positions[j][axis] - positions[i][axis];
			// Coincident nodes split by index so the result stays deterministic.
			let dir = if delta == 0.0 { 1.0 } else { delta.signum() };
			let push = least * strength / 2.0 * dir;
			positions[i][axis] -= push;
			positions[j][axis] += push;
		}
	}
}

/// Moves each linked pair toward `distance` apart by `strength` of the error.
/// Self-loops and out-of-range indices are ignored.
pub fn relax_links<const D: usize>(
	positions: &mut [[f64; D]],
	links: &[(usize, usize)],
	distance: f64,
	strength: f64,
) {
	for &(s, t) in links {
		if s == t || s >= positions.len() || t >= positions.len() {
			continue;
		}
		let mut d = [0.0; D];
		for a in 0..D {
			d[a] = positions[t][a] - positions[s][a];
		}
		let len = d.iter().map(|v| v * v).sum::<f64>().sqrt().max(1e-6);
		let k = (len - distance) / len * strength * 0.5;
		for a in 0..D {
			positions[s][a] += d[a] * k;
			positions[t][a] -= d[a] * k;
		}
	}
}

/// Mean squared per-node displacement between two snapshots.
pub fn mean_square_displacement<const D: usize>(before: &[[f64; D]], after: &[[f64; D]]) -> f64 {
	let n = before.len().min(after.len());
	if n == 0 {
		return 0.0;
	}
	let total: f64 = before
		.iter()
		.zip(after)
		.map(|(b, a)| (0..D).map(|i| (a[i] - b[i]).powi(2)).sum::<f64>())
		.sum();
	total / n as f64
}

/// One body in the 3D solver.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Body3 {
	/// World-space position.
	pub pos: DVec3,
	/// Displacement applied on the next integration step.
	pub vel: DVec3,
}

/// 3D relaxation: charge moves velocities, the shared passes correct positions.
#[derive(Clone, Debug)]
pub struct Layout3 {
	/// One body per node, in model order.
	pub bodies: Vec<Body3>,
	links: Vec<(usize, usize)>,
	alpha: f64,
	config: LayoutConfig,
}

impl Layout3 {
	/// Seeds `count` bodies on a Fibonacci sphere so no two start coincident.
	pub fn new(count: usize, links: Vec<(usize, usize)>, config: LayoutConfig) -> Self {
		let radius = 30.0 + 10.0 * (count as f64).sqrt();
		let golden = std::f64::consts::PI * (3.0 - 5f64.sqrt());
		let bodies = (0..count)
			.map(|i| {
				let y = if count > 1 {
					1.0 - 2.0 * i as f64 / (count - 1) as f64
				} else {
					0.0
				};
				let r = (1.0 - y * y).sqrt();
				let theta = golden * i as f64;
				Body3 {
					pos: DVec3::new(r * theta.cos(), y, r * theta.sin()) * radius,
					vel: DVec3::ZERO,
				}
			})
			.collect();
		Self {
			bodies,
			links: links.into_iter().filter(|(s, t)| s != t).collect(),
			alpha: 1.0,
			config,
		}
	}

	/// Current body positions in model order.
	pub fn positions(&self) -> Vec<DVec3> {
		self.bodies.iter().map(|b| b.pos).collect()
	}

	fn arrays(&self) -> Vec<[f64; 3]> {
		self.bodies.iter().map(|b| b.pos.to_array()).collect()
	}

	/// Advances the simulation one step and returns the step's energy.
	pub fn step(&mut self) -> f64 {
		if self.bodies.is_empty() {
			return 0.0;
		}
		let before = self.arrays();
		self.alpha *= 1.0 - self.config.alpha_decay;
		self.apply_charge();

		let keep = 1.0 - self.config.velocity_decay;
		for b in &mut self.bodies {
			b.vel *= keep;
			b.pos += b.vel;
		}

		let mut positions = self.arrays();
		relax_links(
			&mut positions,
			&self.links,
			self.config.link_distance,
			self.config.link_strength * self.alpha,
		);
		center(&mut positions, [0.0; 3]);
		let r = self.config.node_radius_3d;
		let half = vec![[r; 3]; positions.len()];
		collide(
			&mut positions,
			&half,
			self.config.collision_padding,
			self.config.collision_strength,
		);
		for (b, p) in self.bodies.iter_mut().zip(&positions) {
			b.pos = DVec3::from_array(*p);
		}
		mean_square_displacement(&before, &positions)
	}

	fn apply_charge(&mut self) {
		let n = self.bodies.len();
		for i in 0..n {
			for j in (i + 1)..n {
				let d = self.bodies[j].pos - self.bodies[i].pos;
				let w = self.config.charge_strength * self.alpha / d.length_squared().max(1.0);
				self.bodies[i].vel += d * w;
				self.bodies[j].vel -= d * w;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn center_moves_mean_to_target() {
		let mut pts = vec![[10.0, 0.0], [20.0, 10.0]];
		center(&mut pts, [0.0, 0.0]);
		assert_eq!(pts, vec![[-5.0, -5.0], [5.0, 5.0]]);
	}

	#[test]
	fn collide_separates_overlapping_boxes() {
		let mut pts = vec![[0.0, 0.0], [4.0, 1.0]];
		let half = vec![[10.0, 5.0], [10.0, 5.0]];
		for _ in 0..40 {
			collide(&mut pts, &half, 0.0, 0.5);
		}
		let dx = (pts[1][0] - pts[0][0]).abs();
		let dy = (pts[1][1] - pts[0][1]).abs();
		assert!(dx >= 20.0 - 1e-3 || dy >= 10.0 - 1e-3);
	}

	#[test]
	fn collide_leaves_separated_boxes_alone() {
		let mut pts = vec![[0.0, 0.0], [100.0, 0.0]];
		collide(&mut pts, &[[10.0, 5.0], [10.0, 5.0]], 10.0, 0.5);
		assert_eq!(pts, vec![[0.0, 0.0], [100.0, 0.0]]);
	}

	#[test]
	fn relax_links_pulls_toward_distance() {
		let mut pts = vec![[0.0, 0.0], [100.0, 0.0], [5.0, 5.0]];
		relax_links(&mut pts, &[(0, 1), (2, 2)], 50.0, 1.0);
		assert!(((pts[1][0] - pts[0][0]) - 50.0).abs() < 1e-9);
		assert_eq!(pts[2], [5.0, 5.0]);
	}

	#[test]
	fn tracker_fires_once_at_budget() {
		let mut t = SettleTracker::new(SettleConfig {
			min_steps: 2,
			step_budget: 5,
			energy_threshold: 0.0,
		});
		let fired: Vec<bool> = (0..8).map(|_| t.observe(100.0)).collect();
		assert_eq!(fired, vec![false, false, false, false, true, false, false, false]);
		assert!(t.is_settled());
	}

	#[test]
	fn tracker_fires_early_when_quiet() {
		let mut t = SettleTracker::new(SettleConfig {
			min_steps: 3,
			step_budget: 100,
			energy_threshold: 1.0,
		});
		assert!(!t.observe(0.0));
		assert!(!t.observe(0.0));
		assert!(t.observe(0.0));
		t.reset();
		assert!(!t.is_settled());
		assert_eq!(t.steps(), 0);
	}

	#[test]
	fn layout3_keeps_bodies_finite_and_centered() {
		let mut layout = Layout3::new(5, vec![(0, 1), (1, 2), (2, 2), (3, 4)], LayoutConfig::default());
		for _ in 0..50 {
			layout.step();
		}
		let pts = layout.positions();
		assert!(pts.iter().all(|p| p.is_finite()));
		let mean = pts.iter().copied().sum::<DVec3>() / 5.0;
		assert!(mean.length() < 1e-6);
	}

	#[test]
	fn layout3_energy_decays() {
		let mut layout = Layout3::new(6, vec![(0, 1), (1, 2), (2, 3)], LayoutConfig::default());
		let first = layout.step();
		let mut last = first;
		for _ in 0..200 {
			last = layout.step();
		}
		assert!(last < first);
	}
}
