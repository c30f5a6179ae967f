use crate::model::mechanics::update_mechanics;
use crate::model::world::World;
use std::time::Instant;

impl World {
    /// Advances the simulation by one diffusion step.
    pub fn step(&mut self) -> anyhow::Result<()> {
        self.advance(self.config.time.diffusion_dt)
    }

    /// Advances every process by `dt`, in fixed order: bulk sources and sinks,
    /// diffusion-decay, agent sources and sinks, then the agent update.
    pub fn advance(&mut self, dt: f64) -> anyhow::Result<()> {
        anyhow::ensure!(dt > 0.0, "Time step must be positive, got {dt}");
        let started = Instant::now();

        self.env
            .simulate_bulk_sources_and_sinks(dt, &*self.bulk, self.config.solver.bulk_scheme);
        self.env.simulate_diffusion_decay(dt);
        self.env.simulate_cell_sources_and_sinks(
            self.container.agents_mut(),
            dt,
            self.config.solver.track_internalized,
        );
        self.update_all_cells(dt)?;

        self.time += dt;
        self.step += 1;
        self.metrics
            .record_step(started.elapsed(), self.time, self.container.len());
        Ok(())
    }

    /// Agent half of a step. Phenotype and mechanics each run only when their
    /// own interval has accumulated; queued removals are flushed and freed
    /// slots released at the end.
    pub fn update_all_cells(&mut self, dt: f64) -> anyhow::Result<()> {
        let tolerance = self.config.solver.tolerance;

        if let Some(phenotype_dt) =
            self.phenotype_clock
                .tick(dt, self.config.time.phenotype_dt, tolerance)
        {
            self.pass_phenotype(phenotype_dt)?;
        }

        if let Some(mechanics_dt) =
            self.mechanics_clock
                .tick(dt, self.config.time.mechanics_dt, tolerance)
        {
            update_mechanics(&mut self.container, mechanics_dt, &self.mechanics)?;
        }

        let removed = self.container.flush_removals();
        if !removed.is_empty() {
            tracing::debug!(count = removed.len(), "removed agents outside the domain");
            self.metrics.record_removals(removed.len());
        }
        self.container.end_step();
        Ok(())
    }

    /// Steps until `t_end` is reached and returns the number of steps taken.
    pub fn run_until(&mut self, t_end: f64) -> anyhow::Result<u64> {
        let tolerance = self.config.solver.tolerance;
        let dt = self.config.time.diffusion_dt;
        let start = self.step;
        while self.time < t_end - tolerance {
            self.advance(dt)?;
        }
        Ok(self.step - start)
    }
}
