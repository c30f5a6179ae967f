//! Generational arena owning every live agent.
//!
//! Slots are addressed by [`AgentId`]. Removing an agent bumps its slot's
//! generation and parks the slot until [`AgentArena::release_retired`] runs at
//! the end of the step, so handles collected earlier in the same step can
//! never alias a newly created agent.

use crate::error::{FieldError, Result};
use cellfield_data::{Agent, AgentId};
use rayon::prelude::*;

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    agent: Option<Agent>,
}

#[derive(Debug, Clone, Default)]
pub struct AgentArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    retired: Vec<u32>,
    live: usize,
}

impl AgentArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ever allocated, live or not.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn insert(&mut self, agent: Agent) -> AgentId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.agent = Some(agent);
            return AgentId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            agent: Some(agent),
        });
        AgentId {
            index,
            generation: 0,
        }
    }

    pub fn remove(&mut self, id: AgentId) -> Result<Agent> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .ok_or(FieldError::StaleAgent(id))?;
        let agent = slot.agent.take().ok_or(FieldError::StaleAgent(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.retired.push(id.index);
        self.live -= 1;
        Ok(agent)
    }

    /// Makes slots vacated during this step available for reuse.
    pub fn release_retired(&mut self) {
        // reverse so the lowest retired index is handed out first
        self.retired.sort_unstable_by(|a, b| b.cmp(a));
        self.free.append(&mut self.retired);
    }

    #[must_use]
    pub fn contains(&self, id: AgentId) -> bool {
        self.get(id).is_some()
    }

    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.agent.as_ref())
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.agent.as_mut())
    }

    /// Live agent in slot `index`, ignoring generations.
    #[inline]
    #[must_use]
    pub fn by_slot(&self, index: usize) -> Option<&Agent> {
        self.slots.get(index).and_then(|s| s.agent.as_ref())
    }

    #[must_use]
    pub fn id_of_slot(&self, index: usize) -> Option<AgentId> {
        self.slots.get(index).and_then(|s| {
            s.agent.as_ref().map(|_| AgentId {
                index: index as u32,
                generation: s.generation,
            })
        })
    }

    /// Live handles in ascending slot order.
    #[must_use]
    pub fn ids(&self) -> Vec<AgentId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &Agent)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.agent.as_ref().map(|a| {
                (
                    AgentId {
                        index: i as u32,
                        generation: s.generation,
                    },
                    a,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (AgentId, &mut Agent)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, s)| {
            let generation = s.generation;
            s.agent.as_mut().map(|a| {
                (
                    AgentId {
                        index: i as u32,
                        generation,
                    },
                    a,
                )
            })
        })
    }

    /// Parallel mutable pass over live agents.
    pub fn par_iter_mut(&mut self) -> impl ParallelIterator<Item = (AgentId, &mut Agent)> {
        self.slots.par_iter_mut().enumerate().filter_map(|(i, s)| {
            let generation = s.generation;
            s.agent.as_mut().map(|a| {
                (
                    AgentId {
                        index: i as u32,
                        generation,
                    },
                    a,
                )
            })
        })
    }

    /// Parallel pass over every slot, live or not, in slot order. Used when a
    /// result vector must stay aligned with slot indices.
    pub fn par_slots_mut(&mut self) -> impl IndexedParallelIterator<Item = Option<&mut Agent>> {
        self.slots.par_iter_mut().map(|s| s.agent.as_mut())
    }

    pub fn par_slots(&self) -> impl IndexedParallelIterator<Item = Option<&Agent>> {
        self.slots.par_iter().map(|s| s.agent.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::default_agent;

    #[test]
    fn test_insert_remove_generations() {
        let mut arena = AgentArena::new();
        let a = arena.insert(default_agent([0.0; 3], 0));
        let b = arena.insert(default_agent([1.0; 3], 0));
        assert_eq!(arena.len(), 2);
        arena.remove(a).unwrap();
        assert!(!arena.contains(a));
        assert!(arena.contains(b));
        assert_eq!(arena.remove(a).unwrap_err(), FieldError::StaleAgent(a));
    }

    #[test]
    fn test_slot_not_reused_before_release() {
        let mut arena = AgentArena::new();
        let a = arena.insert(default_agent([0.0; 3], 0));
        arena.remove(a).unwrap();
        let b = arena.insert(default_agent([0.0; 3], 0));
        assert_ne!(a.index, b.index);

        arena.release_retired();
        let c = arena.insert(default_agent([0.0; 3], 0));
        assert_eq!(c.index, a.index);
        assert_ne!(c.generation, a.generation);
        assert!(arena.get(a).is_none());
        assert!(arena.get(c).is_some());
    }

    #[test]
    fn test_release_hands_out_lowest_first() {
        let mut arena = AgentArena::new();
        let ids: Vec<_> = (0..4)
            .map(|i| arena.insert(default_agent([i as f64; 3], 0)))
            .collect();
        arena.remove(ids[3]).unwrap();
        arena.remove(ids[1]).unwrap();
        arena.release_retired();
        assert_eq!(arena.insert(default_agent([0.0; 3], 0)).index, 1);
        assert_eq!(arena.insert(default_agent([0.0; 3], 0)).index, 3);
    }

    #[test]
    fn test_iteration_in_slot_order() {
        let mut arena = AgentArena::new();
        for i in 0..5 {
            arena.insert(default_agent([i as f64, 0.0, 0.0], 0));
        }
        let xs: Vec<f64> = arena.iter().map(|(_, a)| a.position[0]).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        let visited = arena.par_iter_mut().count();
        assert_eq!(visited, 5);
    }
}
