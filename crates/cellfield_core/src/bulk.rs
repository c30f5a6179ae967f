//! Bulk (tissue-level) sources and sinks.
//!
//! User model code supplies per-voxel supply rates, target densities and
//! uptake rates. All three are sampled for every voxel against the current
//! field first, then applied in one pass.

use crate::microenvironment::Microenvironment;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Discretisation of the bulk update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceSinkScheme {
    /// `C += dt * (S * (T - C) - U * C)`
    #[default]
    Explicit,
    /// `C = (C + dt * S * T) / (1 + dt * (S + U))`, never negative.
    SemiImplicit,
}

/// Per-voxel rate functions. Each method fills `out` with one value per
/// substrate for `voxel`.
pub trait BulkSourceSink: Send + Sync {
    fn supply_rates(&self, env: &Microenvironment, voxel: usize, out: &mut [f64]);
    fn target_densities(&self, env: &Microenvironment, voxel: usize, out: &mut [f64]);
    fn uptake_rates(&self, env: &Microenvironment, voxel: usize, out: &mut [f64]);
}

/// No bulk exchange anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBulk;

impl BulkSourceSink for NoBulk {
    fn supply_rates(&self, _: &Microenvironment, _: usize, out: &mut [f64]) {
        out.fill(0.0);
    }

    fn target_densities(&self, _: &Microenvironment, _: usize, out: &mut [f64]) {
        out.fill(0.0);
    }

    fn uptake_rates(&self, _: &Microenvironment, _: usize, out: &mut [f64]) {
        out.fill(0.0);
    }
}

type RateFn = Box<dyn Fn(&Microenvironment, usize, &mut [f64]) + Send + Sync>;

fn zero_rates(_: &Microenvironment, _: usize, out: &mut [f64]) {
    out.fill(0.0);
}

/// Closure-backed [`BulkSourceSink`]. Unset functions report zero.
pub struct BulkFunctions {
    supply: RateFn,
    target: RateFn,
    uptake: RateFn,
}

impl Default for BulkFunctions {
    fn default() -> Self {
        Self {
            supply: Box::new(zero_rates),
            target: Box::new(zero_rates),
            uptake: Box::new(zero_rates),
        }
    }
}

impl BulkFunctions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_supply<F>(mut self, f: F) -> Self
    where
        F: Fn(&Microenvironment, usize, &mut [f64]) + Send + Sync + 'static,
    {
        self.supply = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_target<F>(mut self, f: F) -> Self
    where
        F: Fn(&Microenvironment, usize, &mut [f64]) + Send + Sync + 'static,
    {
        self.target = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_uptake<F>(mut self, f: F) -> Self
    where
        F: Fn(&Microenvironment, usize, &mut [f64]) + Send + Sync + 'static,
    {
        self.uptake = Box::new(f);
        self
    }
}

impl BulkSourceSink for BulkFunctions {
    fn supply_rates(&self, env: &Microenvironment, voxel: usize, out: &mut [f64]) {
        (self.supply)(env, voxel, out);
    }

    fn target_densities(&self, env: &Microenvironment, voxel: usize, out: &mut [f64]) {
        (self.target)(env, voxel, out);
    }

    fn uptake_rates(&self, env: &Microenvironment, voxel: usize, out: &mut [f64]) {
        (self.uptake)(env, voxel, out);
    }
}

impl Microenvironment {
    /// Applies `bulk` to every voxel for one step of length `dt`.
    pub fn simulate_bulk_sources_and_sinks(
        &mut self,
        dt: f64,
        bulk: &dyn BulkSourceSink,
        scheme: SourceSinkScheme,
    ) {
        let ns = self.number_of_densities();
        if ns == 0 {
            return;
        }
        let len = self.number_of_voxels() * ns;
        let mut supply = vec![0.0; len];
        let mut target = vec![0.0; len];
        let mut uptake = vec![0.0; len];

        {
            let env = &*self;
            supply
                .par_chunks_mut(ns)
                .zip(target.par_chunks_mut(ns))
                .zip(uptake.par_chunks_mut(ns))
                .enumerate()
                .for_each(|(voxel, ((s, t), u))| {
                    bulk.supply_rates(env, voxel, s);
                    bulk.target_densities(env, voxel, t);
                    bulk.uptake_rates(env, voxel, u);
                });
        }

        self.densities_mut()
            .par_iter_mut()
            .zip(supply.par_iter())
            .zip(target.par_iter())
            .zip(uptake.par_iter())
            .for_each(|(((c, &s), &t), &u)| {
                *c = match scheme {
                    SourceSinkScheme::Explicit => *c + dt * (s * (t - *c) - u * *c),
                    SourceSinkScheme::SemiImplicit => (*c + dt * s * t) / (1.0 + dt * (s + u)),
                };
            });
    }
}
