//! Pairwise adhesion/repulsion and position integration.
//!
//! A step runs in two phases. [`accumulate_forces`] reads positions only and
//! writes one force per arena slot. [`commit_motion`] then integrates every
//! agent in parallel and re-buckets the movers on a single thread, so the
//! container invariant holds again when it returns.

use crate::agent_container::{AgentContainer, BoundaryPolicy};
use crate::error::Result;
use crate::vector;
use cellfield_data::{Agent, Vec3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Distances below this are treated as this, so coincident centres still
/// push apart along some direction instead of dividing by zero.
const MIN_SEPARATION: f64 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MotionModel {
    /// Velocity equals the net force; position follows it.
    #[default]
    Overdamped,
    /// Velocity relaxes toward the force against linear drag.
    Inertial { drag: f64 },
    /// Overdamped velocity with a second-order position update.
    AdamsBashforth,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MechanicsSettings {
    pub motion: MotionModel,
    /// Upper bound on how far one agent may move in a single step.
    pub max_displacement: Option<f64>,
    /// Keep every agent in the z = const plane.
    pub planar: bool,
}

impl Default for MechanicsSettings {
    fn default() -> Self {
        Self {
            motion: MotionModel::Overdamped,
            max_displacement: None,
            planar: false,
        }
    }
}

/// Force exerted on `a` by `b`.
#[inline]
#[must_use]
pub fn pair_force(a: &Agent, b: &Agent) -> Vec3 {
    let displacement = vector::sub(a.position, b.position);
    let distance = vector::norm(displacement).max(MIN_SEPARATION);

    let mut magnitude = 0.0;
    let contact = a.geometry.radius + b.geometry.radius;
    if distance < contact {
        let overlap = 1.0 - distance / contact;
        magnitude += a.mechanics.cell_cell_repulsion_strength * overlap * overlap;
    }

    let reach = a.mechanics.relative_maximum_adhesion_distance * a.geometry.radius
        + b.mechanics.relative_maximum_adhesion_distance * b.geometry.radius;
    if distance < reach {
        let stretch = 1.0 - distance / reach;
        magnitude -= a.mechanics.cell_cell_adhesion_strength * stretch * stretch;
    }

    if magnitude == 0.0 {
        return [0.0; 3];
    }
    vector::scale(displacement, magnitude / distance)
}

/// Net force on every agent, indexed by arena slot. Empty slots get zero.
#[must_use]
pub fn accumulate_forces(container: &AgentContainer, planar: bool) -> Vec<Vec3> {
    container
        .agents()
        .par_slots()
        .enumerate()
        .map(|(slot, agent)| {
            let Some(agent) = agent else {
                return [0.0; 3];
            };
            let mut force = [0.0; 3];
            container.for_each_near(agent.bucket, |other_id, other| {
                if other_id.index as usize != slot {
                    let f = pair_force(agent, other);
                    force = vector::add(force, f);
                }
            });
            if planar {
                force[2] = 0.0;
            }
            force
        })
        .collect()
}

fn integrate(agent: &mut Agent, force: Vec3, dt: f64, settings: &MechanicsSettings) {
    let before = agent.position;
    match settings.motion {
        MotionModel::Overdamped => {
            agent.velocity = force;
            vector::axpy(&mut agent.position, dt, agent.velocity);
        }
        MotionModel::Inertial { drag } => {
            let accel = vector::sub(force, vector::scale(agent.velocity, drag));
            vector::axpy(&mut agent.velocity, dt, accel);
            vector::axpy(&mut agent.position, dt, agent.velocity);
        }
        MotionModel::AdamsBashforth => {
            agent.velocity = force;
            let step = vector::sub(
                vector::scale(agent.velocity, 1.5),
                vector::scale(agent.previous_velocity, 0.5),
            );
            vector::axpy(&mut agent.position, dt, step);
            agent.previous_velocity = agent.velocity;
        }
    }

    if let Some(limit) = settings.max_displacement {
        let moved = vector::sub(agent.position, before);
        let length = vector::norm(moved);
        if length > limit && length > 0.0 {
            agent.position = vector::add(before, vector::scale(moved, limit / length));
        }
    }
    if settings.planar {
        agent.position[2] = before[2];
        agent.velocity[2] = 0.0;
    }
}

/// Integrates every movable agent from its accumulated force and restores
/// the bucket invariant.
pub fn commit_motion(
    container: &mut AgentContainer,
    forces: &[Vec3],
    dt: f64,
    settings: &MechanicsSettings,
) -> Result<()> {
    let bounds = container.grid().bounds;
    let clamp = container.policy() == BoundaryPolicy::Clamp;

    container
        .agents_mut()
        .par_slots_mut()
        .zip(forces.par_iter())
        .for_each(|(agent, &force)| {
            let Some(agent) = agent else { return };
            if !agent.is_movable {
                agent.velocity = [0.0; 3];
                return;
            }
            integrate(agent, force, dt, settings);
            if clamp && !bounds.contains(agent.position) {
                agent.position = bounds.clamp(agent.position);
                agent.velocity = [0.0; 3];
            }
        });

    for id in container.agents().ids() {
        container.relocate(id)?;
    }
    Ok(())
}

/// One full mechanics step. Buckets are widened first if any agent can now
/// reach past its neighbourhood.
pub fn update_mechanics(
    container: &mut AgentContainer,
    dt: f64,
    settings: &MechanicsSettings,
) -> Result<()> {
    if container.is_empty() {
        return Ok(());
    }
    container.ensure_bucket_edge(container.max_interaction_distance())?;
    let forces = accumulate_forces(container, settings.planar);
    commit_motion(container, &forces, dt, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::default_agent;
    use crate::mesh::Bounds;

    fn container() -> AgentContainer {
        let bounds = Bounds::new(-100.0, 100.0, -100.0, 100.0, -100.0, 100.0);
        AgentContainer::new(bounds, 30.0, BoundaryPolicy::Clamp).unwrap()
    }

    #[test]
    fn test_overlapping_pair_repels() {
        let a = default_agent([0.0, 0.0, 0.0], 0);
        let b = default_agent([5.0, 0.0, 0.0], 0);
        let f = pair_force(&a, &b);
        assert!(f[0] < 0.0);
        assert_eq!(f[1], 0.0);
        let g = pair_force(&b, &a);
        assert!((f[0] + g[0]).abs() < 1e-12);
    }

    #[test]
    fn test_adhesion_only_pair_attracts() {
        let a = default_agent([0.0, 0.0, 0.0], 0);
        let r = a.geometry.radius;
        let b = default_agent([2.2 * r, 0.0, 0.0], 0);
        assert!(pair_force(&a, &b)[0] > 0.0);
        let far = default_agent([3.0 * r, 0.0, 0.0], 0);
        assert_eq!(pair_force(&a, &far), [0.0; 3]);
    }

    #[test]
    fn test_coincident_agents_do_not_produce_nan() {
        let a = default_agent([1.0, 1.0, 1.0], 0);
        let b = default_agent([1.0, 1.0, 1.0], 0);
        let f = pair_force(&a, &b);
        assert!(f.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_pair_separates_and_stays_bucketed() {
        let mut c = container();
        let a = c.register(default_agent([0.0, 0.0, 0.0], 0));
        let b = c.register(default_agent([4.0, 0.0, 0.0], 0));
        let settings = MechanicsSettings::default();
        let start = vector::distance(c.get(a).unwrap().position, c.get(b).unwrap().position);
        for _ in 0..50 {
            update_mechanics(&mut c, 0.1, &settings).unwrap();
            assert!(c.is_consistent());
        }
        let end = vector::distance(c.get(a).unwrap().position, c.get(b).unwrap().position);
        assert!(end > start);
    }

    #[test]
    fn test_immovable_agent_holds_position() {
        let mut c = container();
        let mut pinned = default_agent([0.0, 0.0, 0.0], 0);
        pinned.is_movable = false;
        let a = c.register(pinned);
        c.register(default_agent([3.0, 0.0, 0.0], 0));
        update_mechanics(&mut c, 0.1, &MechanicsSettings::default()).unwrap();
        assert_eq!(c.get(a).unwrap().position, [0.0; 3]);
    }

    #[test]
    fn test_clamp_keeps_agents_inside() {
        let mut c = container();
        let a = c.register(default_agent([99.9, 0.0, 0.0], 0));
        c.register(default_agent([95.0, 0.0, 0.0], 0));
        for _ in 0..20 {
            update_mechanics(&mut c, 0.5, &MechanicsSettings::default()).unwrap();
        }
        let p = c.get(a).unwrap().position;
        assert!(p[0] <= 100.0);
        assert!(c.is_consistent());
    }

    #[test]
    fn test_remove_policy_queues_escapees() {
        let bounds = Bounds::new(-100.0, 100.0, -100.0, 100.0, -100.0, 100.0);
        let mut c = AgentContainer::new(bounds, 30.0, BoundaryPolicy::Remove).unwrap();
        let a = c.register(default_agent([99.9, 0.0, 0.0], 0));
        c.register(default_agent([95.0, 0.0, 0.0], 0));
        for _ in 0..20 {
            update_mechanics(&mut c, 0.5, &MechanicsSettings::default()).unwrap();
        }
        assert!(c.pending_removals().contains(&a));
        let removed = c.flush_removals();
        assert!(removed.contains(&a));
        assert!(!c.contains(a));
    }

    #[test]
    fn test_displacement_limit_and_planar() {
        let mut c = container();
        let a = c.register(default_agent([0.0, 0.0, 0.0], 0));
        c.register(default_agent([0.5, 0.5, 0.5], 0));
        let settings = MechanicsSettings {
            max_displacement: Some(0.1),
            planar: true,
            ..MechanicsSettings::default()
        };
        update_mechanics(&mut c, 1.0, &settings).unwrap();
        let p = c.get(a).unwrap().position;
        assert!(vector::norm(p) <= 0.1 + 1e-12);
        assert_eq!(p[2], 0.0);
    }

    #[test]
    fn test_inertial_motion_decays_without_force() {
        let mut c = container();
        let mut moving = default_agent([0.0, 0.0, 0.0], 0);
        moving.velocity = [1.0, 0.0, 0.0];
        let a = c.register(moving);
        let settings = MechanicsSettings {
            motion: MotionModel::Inertial { drag: 1.0 },
            ..MechanicsSettings::default()
        };
        update_mechanics(&mut c, 0.1, &settings).unwrap();
        let agent = c.get(a).unwrap();
        assert!((agent.velocity[0] - 0.9).abs() < 1e-12);
        assert!((agent.position[0] - 0.09).abs() < 1e-12);
    }
}
