//! Agent secretion and uptake against the voxel each agent sits in.
//!
//! Agents are grouped by voxel in an offset table (`offsets[v]..offsets[v+1]`
//! into `members`), filled in slot order. Voxels are then updated in
//! parallel; inside one voxel the agents apply their implicit update one
//! after the other, lowest slot first.

use crate::agents::AgentArena;
use crate::microenvironment::Microenvironment;
use cellfield_data::{Agent, ExchangeCache};
use rayon::prelude::*;

/// Recomputes the cached coefficients if `dt`, the agent's volume or the
/// substrate count changed since they were built.
pub fn refresh_exchange(agent: &mut Agent, dt: f64, voxel_volume: f64, substrates: usize) {
    let cache = &agent.exchange;
    if cache.dt == dt && cache.volume == agent.volume.total && cache.numerators.len() == substrates
    {
        return;
    }

    let k = dt * agent.volume.total / voxel_volume;
    let rates = &agent.secretion;
    let rate = |v: &Vec<f64>, s: usize| v.get(s).copied().unwrap_or(0.0);

    let mut next = ExchangeCache {
        dt,
        volume: agent.volume.total,
        numerators: Vec::with_capacity(substrates),
        denominators: Vec::with_capacity(substrates),
        exports: Vec::with_capacity(substrates),
    };
    for s in 0..substrates {
        let secretion = rate(&rates.secretion_rates, s);
        let target = rate(&rates.saturation_densities, s);
        let uptake = rate(&rates.uptake_rates, s);
        next.numerators.push(k * secretion * target);
        next.denominators.push(1.0 + k * (secretion + uptake));
        next.exports.push(dt * rate(&rates.net_export_rates, s) / voxel_volume);
    }
    agent.exchange = next;
}

/// Slot lists per voxel in compressed-row form.
#[derive(Debug, Clone, Default)]
pub struct VoxelGroups {
    pub offsets: Vec<usize>,
    pub members: Vec<usize>,
}

impl VoxelGroups {
    /// Groups the live agents of `arena` by the voxel nearest to each.
    #[must_use]
    pub fn build(env: &Microenvironment, arena: &AgentArena) -> Self {
        let mesh = env.mesh();
        let voxel_of: Vec<Option<usize>> = arena
            .par_slots()
            .map(|a| a.map(|a| mesh.nearest_voxel_index(a.position)))
            .collect();

        let mut offsets = vec![0usize; mesh.voxel_count() + 1];
        for v in voxel_of.iter().flatten() {
            offsets[v + 1] += 1;
        }
        for i in 1..offsets.len() {
            offsets[i] += offsets[i - 1];
        }

        let mut cursor = offsets.clone();
        let mut members = vec![0usize; offsets[offsets.len() - 1]];
        for (slot, v) in voxel_of.into_iter().enumerate() {
            if let Some(v) = v {
                members[cursor[v]] = slot;
                cursor[v] += 1;
            }
        }
        Self { offsets, members }
    }

    #[inline]
    #[must_use]
    pub fn in_voxel(&self, voxel: usize) -> &[usize] {
        &self.members[self.offsets[voxel]..self.offsets[voxel + 1]]
    }
}

/// Amount of substrate an agent removed from (positive) or added to
/// (negative) its voxel during one exchange step.
type Credit = (usize, Vec<f64>);

impl Microenvironment {
    /// Applies every agent's secretion, uptake and net export for one step
    /// of length `dt`. With `track_internalized` each agent's `internalized`
    /// vector is credited with what it took from the field.
    pub fn simulate_cell_sources_and_sinks(
        &mut self,
        arena: &mut AgentArena,
        dt: f64,
        track_internalized: bool,
    ) {
        let ns = self.number_of_densities();
        if ns == 0 || arena.is_empty() {
            return;
        }
        let voxel_volume = self.mesh().voxel_volume;

        arena
            .par_iter_mut()
            .for_each(|(_, agent)| refresh_exchange(agent, dt, voxel_volume, ns));

        let groups = VoxelGroups::build(self, arena);
        let shared: &AgentArena = arena;

        let credits: Vec<Credit> = self
            .densities_mut()
            .par_chunks_mut(ns)
            .enumerate()
            .filter(|(v, _)| groups.offsets[*v] != groups.offsets[*v + 1])
            .flat_map_iter(|(v, rho)| {
                let mut credited = Vec::new();
                for &slot in groups.in_voxel(v) {
                    let Some(agent) = shared.by_slot(slot) else {
                        continue;
                    };
                    let cache = &agent.exchange;
                    let before = track_internalized.then(|| rho.to_vec());
                    for s in 0..ns {
                        rho[s] = (rho[s] + cache.numerators[s]) / cache.denominators[s]
                            + cache.exports[s];
                    }
                    if let Some(before) = before {
                        let taken = before
                            .iter()
                            .zip(rho.iter())
                            .map(|(b, a)| (b - a) * voxel_volume)
                            .collect();
                        credited.push((slot, taken));
                    }
                }
                credited
            })
            .collect();

        for (slot, taken) in credits {
            let Some(id) = arena.id_of_slot(slot) else {
                continue;
            };
            if let Some(agent) = arena.get_mut(id) {
                if agent.internalized.len() < ns {
                    agent.internalized.resize(ns, 0.0);
                }
                for (held, amount) in agent.internalized.iter_mut().zip(taken) {
                    *held += amount;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::default_agent;
    use crate::mesh::{Bounds, Mesh};
    use crate::microenvironment::SubstrateSpec;

    fn env() -> Microenvironment {
        let mesh = Mesh::new(Bounds::new(0.0, 60.0, 0.0, 60.0, 0.0, 20.0), 20.0, 20.0, 20.0).unwrap();
        let mut env = Microenvironment::new(mesh);
        env.add_substrate(SubstrateSpec::new("oxygen", "mmHg")).unwrap();
        env.fill_substrate(0, 10.0).unwrap();
        env
    }

    #[test]
    fn test_groups_preserve_slot_order() {
        let env = env();
        let mut arena = AgentArena::new();
        arena.insert(default_agent([5.0, 5.0, 5.0], 1));
        arena.insert(default_agent([50.0, 50.0, 5.0], 1));
        arena.insert(default_agent([6.0, 6.0, 6.0], 1));
        let groups = VoxelGroups::build(&env, &arena);
        assert_eq!(groups.in_voxel(0), &[0, 2]);
        assert_eq!(groups.in_voxel(8), &[1]);
        assert!(groups.in_voxel(4).is_empty());
    }

    #[test]
    fn test_uptake_matches_implicit_formula() {
        let mut env = env();
        let mut arena = AgentArena::new();
        let mut agent = default_agent([5.0, 5.0, 5.0], 1);
        agent.secretion.uptake_rates = vec![0.5];
        let volume = agent.volume.total;
        arena.insert(agent);

        let dt = 0.01;
        env.simulate_cell_sources_and_sinks(&mut arena, dt, false);
        let k = dt * volume / 8000.0;
        let expected = 10.0 / (1.0 + k * 0.5);
        assert!((env.density_vector(0).unwrap()[0] - expected).abs() < 1e-12);
        assert_eq!(env.density_vector(1).unwrap()[0], 10.0);
    }

    #[test]
    fn test_secretion_saturates_at_target() {
        let mut env = env();
        env.fill_substrate(0, 0.0).unwrap();
        let mut arena = AgentArena::new();
        let mut agent = default_agent([5.0, 5.0, 5.0], 1);
        agent.secretion.secretion_rates = vec![10.0];
        agent.secretion.saturation_densities = vec![3.0];
        arena.insert(agent);
        for _ in 0..10_000 {
            env.simulate_cell_sources_and_sinks(&mut arena, 1.0, false);
        }
        let rho = env.density_vector(0).unwrap()[0];
        assert!((rho - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_shared_voxel_applies_sequentially() {
        let mut env = env();
        let mut arena = AgentArena::new();
        for _ in 0..2 {
            let mut agent = default_agent([5.0, 5.0, 5.0], 1);
            agent.secretion.uptake_rates = vec![1.0];
            arena.insert(agent);
        }
        let dt = 0.1;
        let k = dt * cellfield_data::Volume::default().total / 8000.0;
        env.simulate_cell_sources_and_sinks(&mut arena, dt, false);
        let expected = 10.0 / (1.0 + k) / (1.0 + k);
        assert!((env.density_vector(0).unwrap()[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_internalized_balances_field() {
        let mut env = env();
        let mut arena = AgentArena::new();
        let mut agent = default_agent([5.0, 5.0, 5.0], 1);
        agent.secretion.uptake_rates = vec![2.0];
        agent.secretion.net_export_rates = vec![1.0];
        let id = arena.insert(agent);
        let before = env.total_mass(0).unwrap();
        for _ in 0..5 {
            env.simulate_cell_sources_and_sinks(&mut arena, 0.1, true);
        }
        let after = env.total_mass(0).unwrap();
        let held = arena.get(id).unwrap().internalized[0];
        assert!((before - after - held).abs() < 1e-9 * before);
    }

    #[test]
    fn test_cache_refreshes_on_volume_change() {
        let mut agent = default_agent([0.0; 3], 1);
        agent.secretion.uptake_rates = vec![1.0];
        refresh_exchange(&mut agent, 0.1, 1000.0, 1);
        let first = agent.exchange.denominators[0];
        agent.volume.total *= 2.0;
        refresh_exchange(&mut agent, 0.1, 1000.0, 1);
        assert!(agent.exchange.denominators[0] > first);
    }
}
