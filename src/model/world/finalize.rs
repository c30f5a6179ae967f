use crate::model::lifecycle;
use crate::model::phenotype::{update_phenotype, PhenotypeOutcome};
use crate::model::world::{agent_seed, Stream, World};
use crate::model::FieldError;
use cellfield_data::AgentId;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Births and removals applied at one barrier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BarrierReport {
    pub divisions: usize,
    pub births: usize,
    pub removals: usize,
}

impl World {
    /// Runs the phenotype of every live agent in parallel, then applies the
    /// requested divisions and removals from this thread in slot order.
    pub fn pass_phenotype(&mut self, dt: f64) -> anyhow::Result<BarrierReport> {
        let env = &self.env;
        let models = &self.models;
        let (seed, step) = (self.seed, self.step);

        let pending: Vec<(AgentId, PhenotypeOutcome)> = self
            .container
            .agents_mut()
            .par_iter_mut()
            .map(|(id, agent)| {
                let mut rng =
                    ChaCha8Rng::seed_from_u64(agent_seed(seed, step, id, Stream::Phenotype));
                let oxygen = agent.oxygen_response.and_then(|r| {
                    env.nearest_density_vector(agent.position)
                        .get(r.substrate)
                        .copied()
                });
                update_phenotype(agent, models, oxygen, dt, &mut rng).map(|o| (id, o))
            })
            .filter(|r| r.as_ref().map_or(true, |(_, o)| o.divide || o.remove))
            .collect::<Result<_, FieldError>>()?;

        Ok(self.apply_outcomes(pending))
    }

    fn apply_outcomes(&mut self, pending: Vec<(AgentId, PhenotypeOutcome)>) -> BarrierReport {
        let mut report = BarrierReport::default();
        let planar = self.mechanics.planar;

        for (id, outcome) in pending {
            if outcome.remove {
                if self.container.remove(id).is_ok() {
                    report.removals += 1;
                }
                continue;
            }
            if !outcome.divide {
                continue;
            }
            let Ok(parent) = self.container.remove(id) else {
                continue;
            };
            let mut rng =
                ChaCha8Rng::seed_from_u64(agent_seed(self.seed, self.step, id, Stream::Division));
            let (first, second) = lifecycle::divide(&parent, id, planar, &mut rng);
            let a = self.container.register(first);
            let b = self.container.register(second);
            tracing::trace!(parent = %id, %a, %b, "agent divided");
            report.divisions += 1;
            report.births += 2;
        }

        if report.divisions > 0 || report.removals > 0 {
            tracing::debug!(
                step = self.step,
                divisions = report.divisions,
                removals = report.removals,
                "applied phenotype barrier"
            );
        }
        self.metrics.record_births(report.births);
        self.metrics.record_removals(report.removals);
        for _ in 0..report.divisions {
            self.metrics.increment_counter("divisions");
        }
        report
    }
}
