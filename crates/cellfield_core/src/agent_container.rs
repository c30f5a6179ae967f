//! Bucketed spatial index over the live agents.
//!
//! The container owns the [`AgentArena`] and partitions the domain into cubic
//! mechanics buckets at least as wide as the longest interaction distance, so
//! a neighbour search only visits the 27 buckets around an agent.
//!
//! # Invariant
//! Outside of a mechanics commit, every live agent is listed in exactly one
//! bucket, and that bucket is the one computed from its current position.

use crate::agents::AgentArena;
use crate::error::{FieldError, Result};
use crate::mesh::Bounds;
use cellfield_data::{Agent, AgentId, Vec3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// What happens to an agent whose position leaves the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Keep it in the nearest boundary bucket.
    #[default]
    Clamp,
    /// Queue it for removal at the next barrier.
    Remove,
}

/// Geometry of the bucket partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketGrid {
    pub bounds: Bounds,
    pub edge: f64,
    pub dims: [usize; 3],
}

impl BucketGrid {
    pub fn new(bounds: Bounds, edge: f64) -> Result<Self> {
        if !(edge > 0.0) {
            return Err(FieldError::invalid_config(format!(
                "mechanics bucket edge must be positive, got {edge}"
            )));
        }
        let mut dims = [1usize; 3];
        for (axis, dim) in dims.iter_mut().enumerate() {
            *dim = ((bounds.extent(axis) / edge).ceil() as usize).max(1);
        }
        Ok(Self { bounds, edge, dims })
    }

    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Bucket holding `p`, clamped to the boundary layer, and whether `p` lies
    /// inside the domain.
    #[inline]
    #[must_use]
    pub fn locate(&self, p: Vec3) -> (usize, bool) {
        let inside = self.bounds.contains(p);
        let mut idx = [0usize; 3];
        for axis in 0..3 {
            let offset = ((p[axis] - self.bounds.min[axis]) / self.edge).floor();
            idx[axis] = (offset.max(0.0) as usize).min(self.dims[axis] - 1);
        }
        let bucket = (idx[2] * self.dims[1] + idx[1]) * self.dims[0] + idx[0];
        (bucket, inside)
    }

    #[inline]
    #[must_use]
    pub fn cartesian(&self, bucket: usize) -> [usize; 3] {
        let [nx, ny, _] = self.dims;
        [bucket % nx, (bucket / nx) % ny, bucket / (nx * ny)]
    }

    /// The bucket itself and its (up to 26) face, edge and corner neighbours.
    pub fn neighbourhood(&self, bucket: usize) -> impl Iterator<Item = usize> + '_ {
        let [i, j, k] = self.cartesian(bucket);
        let range = |c: usize, n: usize| c.saturating_sub(1)..=(c + 1).min(n - 1);
        let (ri, rj, rk) = (
            range(i, self.dims[0]),
            range(j, self.dims[1]),
            range(k, self.dims[2]),
        );
        rk.flat_map(move |kk| {
            let ri = ri.clone();
            rj.clone().flat_map(move |jj| {
                ri.clone()
                    .map(move |ii| (kk * self.dims[1] + jj) * self.dims[0] + ii)
            })
        })
    }
}

pub struct AgentContainer {
    grid: BucketGrid,
    buckets: Vec<Vec<AgentId>>,
    agents: AgentArena,
    policy: BoundaryPolicy,
    pending_removal: Vec<AgentId>,
    /// Generation queued in `pending_removal`, by slot.
    pending_slots: Vec<Option<u32>>,
}

impl AgentContainer {
    pub fn new(bounds: Bounds, edge: f64, policy: BoundaryPolicy) -> Result<Self> {
        let grid = BucketGrid::new(bounds, edge)?;
        Ok(Self {
            buckets: vec![Vec::new(); grid.count()],
            grid,
            agents: AgentArena::new(),
            policy,
            pending_removal: Vec::new(),
            pending_slots: Vec::new(),
        })
    }

    #[must_use]
    pub fn grid(&self) -> &BucketGrid {
        &self.grid
    }

    #[must_use]
    pub fn policy(&self) -> BoundaryPolicy {
        self.policy
    }

    #[must_use]
    pub fn agents(&self) -> &AgentArena {
        &self.agents
    }

    /// Mutable access to agent state. Callers that move an agent must follow
    /// up with [`AgentContainer::relocate`].
    pub fn agents_mut(&mut self) -> &mut AgentArena {
        &mut self.agents
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(id)
    }

    #[must_use]
    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains(id)
    }

    #[must_use]
    pub fn bucket_members(&self, bucket: usize) -> &[AgentId] {
        self.buckets.get(bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn pending_removals(&self) -> &[AgentId] {
        &self.pending_removal
    }

    /// Inserts `agent` into the arena and its bucket. An out-of-domain
    /// position lands in the nearest boundary bucket; under
    /// [`BoundaryPolicy::Remove`] it is also queued for removal.
    pub fn register(&mut self, mut agent: Agent) -> AgentId {
        let (bucket, inside) = self.grid.locate(agent.position);
        agent.bucket = bucket;
        let id = self.agents.insert(agent);
        self.buckets[bucket].push(id);
        if !inside && self.policy == BoundaryPolicy::Remove {
            self.mark_for_removal(id);
        }
        id
    }

    /// Moves `id` to the bucket matching its current position. Returns whether
    /// the bucket changed.
    pub fn relocate(&mut self, id: AgentId) -> Result<bool> {
        let grid = &self.grid;
        let agent = self.agents.get_mut(id).ok_or(FieldError::StaleAgent(id))?;
        let (bucket, inside) = grid.locate(agent.position);
        let old = agent.bucket;
        agent.bucket = bucket;
        if !inside && self.policy == BoundaryPolicy::Remove {
            self.mark_for_removal(id);
        }
        if old == bucket {
            return Ok(false);
        }
        detach(&mut self.buckets[old], id);
        self.buckets[bucket].push(id);
        Ok(true)
    }

    /// Removes `id` from its bucket and the arena. The slot is not reused
    /// until [`AgentContainer::end_step`].
    pub fn remove(&mut self, id: AgentId) -> Result<Agent> {
        let agent = self.agents.remove(id)?;
        detach(&mut self.buckets[agent.bucket], id);
        Ok(agent)
    }

    /// Queues `id` for the next [`AgentContainer::flush_removals`]. Queuing
    /// an agent twice is a no-op.
    pub fn mark_for_removal(&mut self, id: AgentId) {
        let slot = id.index as usize;
        if slot >= self.pending_slots.len() {
            self.pending_slots.resize(slot + 1, None);
        }
        if self.pending_slots[slot] != Some(id.generation) {
            self.pending_slots[slot] = Some(id.generation);
            self.pending_removal.push(id);
        }
    }

    #[must_use]
    pub fn is_pending_removal(&self, id: AgentId) -> bool {
        self.pending_slots.get(id.index as usize).copied().flatten() == Some(id.generation)
    }

    /// Removes every queued agent that is still live.
    pub fn flush_removals(&mut self) -> Vec<AgentId> {
        let pending = std::mem::take(&mut self.pending_removal);
        for id in &pending {
            self.pending_slots[id.index as usize] = None;
        }
        pending
            .into_iter()
            .filter(|&id| self.remove(id).is_ok())
            .collect()
    }

    /// Step barrier: slots freed during the step become reusable.
    pub fn end_step(&mut self) {
        self.agents.release_retired();
    }

    /// Visits every agent in the 27-bucket neighbourhood of `bucket`.
    #[inline]
    pub fn for_each_near<F>(&self, bucket: usize, mut f: F)
    where
        F: FnMut(AgentId, &Agent),
    {
        for b in self.grid.neighbourhood(bucket) {
            for &other in &self.buckets[b] {
                if let Some(agent) = self.agents.get(other) {
                    f(other, agent);
                }
            }
        }
    }

    /// Agents in the same and adjacent buckets, excluding `id` itself.
    pub fn neighbors_of(&self, id: AgentId) -> Result<Vec<AgentId>> {
        let mut out = Vec::new();
        self.neighbors_into(id, &mut out)?;
        Ok(out)
    }

    pub fn neighbors_into(&self, id: AgentId, out: &mut Vec<AgentId>) -> Result<()> {
        let agent = self.agents.get(id).ok_or(FieldError::StaleAgent(id))?;
        out.clear();
        self.for_each_near(agent.bucket, |other, _| {
            if other != id {
                out.push(other);
            }
        });
        Ok(())
    }

    /// Longest pairwise interaction reach among live agents.
    #[must_use]
    pub fn max_interaction_distance(&self) -> f64 {
        let reach = self
            .agents
            .par_slots()
            .filter_map(|a| a)
            .map(|a| a.mechanics.relative_maximum_adhesion_distance.max(1.0) * a.geometry.radius)
            .reduce(|| 0.0, f64::max);
        2.0 * reach
    }

    /// Widens the buckets when `distance` exceeds the current edge.
    pub fn ensure_bucket_edge(&mut self, distance: f64) -> Result<bool> {
        if distance <= self.grid.edge {
            return Ok(false);
        }
        tracing::warn!(
            old_edge = self.grid.edge,
            new_edge = distance,
            "Mechanics buckets narrower than interaction distance; rebuilding"
        );
        self.rebuild(distance)?;
        Ok(true)
    }

    /// Re-partitions with a new bucket edge and re-buckets every agent.
    pub fn rebuild(&mut self, edge: f64) -> Result<()> {
        let grid = BucketGrid::new(self.grid.bounds, edge)?;
        let located: Vec<Option<usize>> = self
            .agents
            .par_slots()
            .map(|a| a.map(|a| grid.locate(a.position).0))
            .collect();

        let mut buckets = vec![Vec::new(); grid.count()];
        for (slot, bucket) in located.into_iter().enumerate() {
            if let (Some(bucket), Some(id)) = (bucket, self.agents.id_of_slot(slot)) {
                buckets[bucket].push(id);
                if let Some(agent) = self.agents.get_mut(id) {
                    agent.bucket = bucket;
                }
            }
        }
        self.grid = grid;
        self.buckets = buckets;
        Ok(())
    }

    /// Bucket computed fresh from the agent's position.
    #[must_use]
    pub fn expected_bucket(&self, id: AgentId) -> Option<usize> {
        self.agents.get(id).map(|a| self.grid.locate(a.position).0)
    }

    /// Checks the membership invariant for every live agent.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let listed: usize = self.buckets.iter().map(Vec::len).sum();
        listed == self.agents.len()
            && self.agents.iter().all(|(id, a)| {
                self.grid.locate(a.position).0 == a.bucket
                    && self.buckets[a.bucket].iter().filter(|&&m| m == id).count() == 1
            })
    }
}

fn detach(bucket: &mut Vec<AgentId>, id: AgentId) {
    if let Some(pos) = bucket.iter().position(|&m| m == id) {
        bucket.swap_remove(pos);
    }
}
