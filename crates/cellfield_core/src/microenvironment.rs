//! Dense substrate table over a [`Mesh`].
//!
//! Concentrations are stored voxel-major: the row for voxel `v` is
//! `densities[v * n_substrates..(v + 1) * n_substrates]`.

use crate::diffusion::LodSolver;
use crate::error::{FieldError, Result};
use crate::mesh::{Bounds, Face, Mesh};
use cellfield_data::Vec3;
use serde::{Deserialize, Serialize};

/// Definition of one diffusing substrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstrateSpec {
    pub name: String,
    pub units: String,
    /// Diffusion coefficient, micron^2 / min.
    pub diffusion_coefficient: f64,
    /// First-order decay rate, 1 / min.
    pub decay_rate: f64,
}

impl SubstrateSpec {
    #[must_use]
    pub fn new(name: &str, units: &str) -> Self {
        Self {
            name: name.to_string(),
            units: units.to_string(),
            diffusion_coefficient: 0.0,
            decay_rate: 0.0,
        }
    }

    #[must_use]
    pub fn with_coefficients(mut self, diffusion_coefficient: f64, decay_rate: f64) -> Self {
        self.diffusion_coefficient = diffusion_coefficient;
        self.decay_rate = decay_rate;
        self
    }
}

/// Fixed-value voxels. Each (voxel, substrate) pair carries its own value and
/// activation flag, so a voxel can pin one substrate and leave the others free.
#[derive(Debug, Clone, Default)]
pub struct DirichletNodes {
    voxels: Vec<usize>,
    is_node: Vec<bool>,
    values: Vec<f64>,
    active: Vec<bool>,
    substrates: usize,
}

impl DirichletNodes {
    fn new(voxel_count: usize, substrates: usize) -> Self {
        Self {
            voxels: Vec::new(),
            is_node: vec![false; voxel_count],
            values: vec![0.0; voxel_count * substrates],
            active: vec![false; voxel_count * substrates],
            substrates,
        }
    }

    fn widen(&mut self, voxel_count: usize, substrates: usize) {
        self.values = relayout(&self.values, voxel_count, self.substrates, substrates, 0.0);
        self.active = relayout(&self.active, voxel_count, self.substrates, substrates, false);
        self.substrates = substrates;
    }

    fn mark(&mut self, voxel: usize) {
        if !self.is_node[voxel] {
            self.is_node[voxel] = true;
            if let Err(pos) = self.voxels.binary_search(&voxel) {
                self.voxels.insert(pos, voxel);
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    #[must_use]
    pub fn voxels(&self) -> &[usize] {
        &self.voxels
    }

    /// Overwrites every active (voxel, substrate) pair with its fixed value.
    pub fn apply(&self, densities: &mut [f64]) {
        let n = self.substrates;
        for &voxel in &self.voxels {
            let row = voxel * n;
            for s in 0..n {
                if self.active[row + s] {
                    densities[row + s] = self.values[row + s];
                }
            }
        }
    }
}

/// Copies a voxel-major table into a wider (or equal) row layout.
fn relayout<T: Copy>(old: &[T], rows: usize, old_width: usize, new_width: usize, fill: T) -> Vec<T> {
    let mut out = vec![fill; rows * new_width];
    if old_width > 0 {
        for (dst, src) in out.chunks_mut(new_width).zip(old.chunks(old_width)) {
            dst[..old_width].copy_from_slice(src);
        }
    }
    out
}

pub struct Microenvironment {
    pub name: String,
    mesh: Mesh,
    substrates: Vec<SubstrateSpec>,
    densities: Vec<f64>,
    dirichlet: DirichletNodes,
    solver: LodSolver,
    locked: bool,
}

impl Microenvironment {
    /// An empty environment over `mesh`, with no substrates.
    #[must_use]
    pub fn new(mesh: Mesh) -> Self {
        let voxels = mesh.voxel_count();
        Self {
            name: "microenvironment".to_string(),
            mesh,
            substrates: Vec::new(),
            densities: Vec::new(),
            dirichlet: DirichletNodes::new(voxels, 0),
            solver: LodSolver::default(),
            locked: false,
        }
    }

    /// Rebuilds the lattice. Field values and Dirichlet nodes are discarded;
    /// substrate definitions are kept.
    #[allow(clippy::too_many_arguments)]
    pub fn resize_space(
        &mut self,
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
        z_min: f64,
        z_max: f64,
        dx: f64,
        dy: f64,
        dz: f64,
    ) -> Result<()> {
        let bounds = Bounds::new(x_min, x_max, y_min, y_max, z_min, z_max);
        let mesh = Mesh::new(bounds, dx, dy, dz)?;
        let voxels = mesh.voxel_count();
        tracing::info!(
            nx = mesh.dims[0],
            ny = mesh.dims[1],
            nz = mesh.dims[2],
            voxels,
            "Resized microenvironment mesh"
        );
        self.mesh = mesh;
        self.densities = vec![0.0; voxels * self.substrates.len()];
        self.dirichlet = DirichletNodes::new(voxels, self.substrates.len());
        self.solver.invalidate();
        Ok(())
    }

    #[must_use]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    #[inline]
    #[must_use]
    pub fn number_of_voxels(&self) -> usize {
        self.mesh.voxel_count()
    }

    #[inline]
    #[must_use]
    pub fn number_of_densities(&self) -> usize {
        self.substrates.len()
    }

    #[must_use]
    pub fn substrates(&self) -> &[SubstrateSpec] {
        &self.substrates
    }

    #[must_use]
    pub fn substrate(&self, index: usize) -> Option<&SubstrateSpec> {
        self.substrates.get(index)
    }

    #[must_use]
    pub fn find_density_index(&self, name: &str) -> Option<usize> {
        self.substrates.iter().position(|s| s.name == name)
    }

    pub fn substrate_index(&self, name: &str) -> Result<usize> {
        self.find_density_index(name)
            .ok_or_else(|| FieldError::unknown_substrate(name))
    }

    /// True once the solver has run and the substrate count is frozen.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Defines substrate `index`. Indices must be introduced in order starting
    /// at zero.
    pub fn set_density(&mut self, index: usize, name: &str, units: &str) -> Result<()> {
        let expected = self.substrates.len();
        if index < expected {
            return Err(FieldError::DuplicateSubstrate(index));
        }
        if index > expected {
            return Err(FieldError::NonContiguousSubstrate { index, expected });
        }
        self.add_substrate(SubstrateSpec::new(name, units)).map(|_| ())
    }

    pub fn add_density(&mut self, name: &str, units: &str) -> Result<usize> {
        self.add_substrate(SubstrateSpec::new(name, units))
    }

    /// Appends a substrate with its coefficients and returns its index.
    pub fn add_substrate(&mut self, spec: SubstrateSpec) -> Result<usize> {
        if self.locked {
            return Err(FieldError::SubstrateCountLocked(self.substrates.len()));
        }
        let voxels = self.mesh.voxel_count();
        let old = self.substrates.len();
        let index = old;
        tracing::debug!(index, name = %spec.name, units = %spec.units, "Defined substrate");
        self.substrates.push(spec);

        self.densities = relayout(&self.densities, voxels, old, old + 1, 0.0);
        self.dirichlet.widen(voxels, old + 1);
        self.solver.invalidate();
        Ok(index)
    }

    pub fn set_substrate_coefficients(
        &mut self,
        index: usize,
        diffusion_coefficient: f64,
        decay_rate: f64,
    ) -> Result<()> {
        let len = self.substrates.len();
        let spec = self
            .substrates
            .get_mut(index)
            .ok_or(FieldError::substrate_out_of_range(index, len))?;
        spec.diffusion_coefficient = diffusion_coefficient;
        spec.decay_rate = decay_rate;
        self.solver.invalidate();
        Ok(())
    }

    fn check_voxel(&self, voxel: usize) -> Result<()> {
        let len = self.mesh.voxel_count();
        if voxel >= len {
            return Err(FieldError::voxel_out_of_range(voxel, len));
        }
        Ok(())
    }

    fn check_substrate(&self, substrate: usize) -> Result<()> {
        let len = self.substrates.len();
        if substrate >= len {
            return Err(FieldError::substrate_out_of_range(substrate, len));
        }
        Ok(())
    }

    pub fn density_vector(&self, voxel: usize) -> Result<&[f64]> {
        self.check_voxel(voxel)?;
        let n = self.substrates.len();
        Ok(&self.densities[voxel * n..(voxel + 1) * n])
    }

    pub fn density_vector_mut(&mut self, voxel: usize) -> Result<&mut [f64]> {
        self.check_voxel(voxel)?;
        let n = self.substrates.len();
        Ok(&mut self.densities[voxel * n..(voxel + 1) * n])
    }

    /// Row of the voxel nearest to `position`; out-of-domain positions use the
    /// nearest boundary voxel.
    #[must_use]
    pub fn nearest_density_vector(&self, position: Vec3) -> &[f64] {
        let voxel = self.mesh.nearest_voxel_index(position);
        let n = self.substrates.len();
        &self.densities[voxel * n..(voxel + 1) * n]
    }

    #[must_use]
    pub fn densities(&self) -> &[f64] {
        &self.densities
    }

    pub fn densities_mut(&mut self) -> &mut [f64] {
        &mut self.densities
    }

    pub fn fill_substrate(&mut self, substrate: usize, value: f64) -> Result<()> {
        self.check_substrate(substrate)?;
        let n = self.substrates.len();
        for row in self.densities.chunks_mut(n) {
            row[substrate] = value;
        }
        Ok(())
    }

    /// Sum of concentration times voxel volume.
    pub fn total_mass(&self, substrate: usize) -> Result<f64> {
        self.check_substrate(substrate)?;
        let n = self.substrates.len();
        let sum: f64 = self.densities.chunks(n).map(|row| row[substrate]).sum();
        Ok(sum * self.mesh.voxel_volume)
    }

    /// Pins every substrate of `voxel` to `values`.
    pub fn add_dirichlet_node(&mut self, voxel: usize, values: &[f64]) -> Result<()> {
        self.check_voxel(voxel)?;
        let n = self.substrates.len();
        if values.len() != n {
            return Err(FieldError::BufferLength {
                expected: n,
                got: values.len(),
            });
        }
        self.dirichlet.mark(voxel);
        let row = voxel * n;
        self.dirichlet.values[row..row + n].copy_from_slice(values);
        self.dirichlet.active[row..row + n].fill(true);
        Ok(())
    }

    /// Pins a single substrate of `voxel`.
    pub fn set_dirichlet_value(&mut self, voxel: usize, substrate: usize, value: f64) -> Result<()> {
        self.check_voxel(voxel)?;
        self.check_substrate(substrate)?;
        self.dirichlet.mark(voxel);
        let idx = voxel * self.substrates.len() + substrate;
        self.dirichlet.values[idx] = value;
        self.dirichlet.active[idx] = true;
        Ok(())
    }

    /// Enables or disables a substrate's Dirichlet values at every node.
    pub fn set_dirichlet_activation(&mut self, substrate: usize, active: bool) -> Result<()> {
        self.check_substrate(substrate)?;
        let n = self.substrates.len();
        let voxels = self.dirichlet.voxels.clone();
        for voxel in voxels {
            self.dirichlet.active[voxel * n + substrate] = active;
        }
        Ok(())
    }

    pub fn remove_dirichlet_node(&mut self, voxel: usize) -> Result<()> {
        self.check_voxel(voxel)?;
        if self.dirichlet.is_node[voxel] {
            self.dirichlet.is_node[voxel] = false;
            self.dirichlet.voxels.retain(|&v| v != voxel);
            let n = self.substrates.len();
            self.dirichlet.active[voxel * n..(voxel + 1) * n].fill(false);
        }
        Ok(())
    }

    #[must_use]
    pub fn is_dirichlet_node(&self, voxel: usize) -> bool {
        self.dirichlet.is_node.get(voxel).copied().unwrap_or(false)
    }

    /// Pins `substrate` to `value` on every voxel of `face`. Returns the number
    /// of voxels marked; z faces are skipped on a single-layer mesh.
    pub fn set_dirichlet_face(&mut self, face: Face, substrate: usize, value: f64) -> Result<usize> {
        self.check_substrate(substrate)?;
        if face.axis() == 2 && self.mesh.is_2d() {
            tracing::debug!(?face, "Skipping z face on single-layer mesh");
            return Ok(0);
        }
        let voxels = self.mesh.face_voxels(face);
        for &voxel in &voxels {
            self.set_dirichlet_value(voxel, substrate, value)?;
        }
        Ok(voxels.len())
    }

    pub fn apply_dirichlet_conditions(&mut self) {
        self.dirichlet.apply(&mut self.densities);
    }

    /// Advances diffusion and decay of every substrate by `dt`.
    ///
    /// The first call freezes the substrate count.
    pub fn simulate_diffusion_decay(&mut self, dt: f64) {
        self.locked = true;
        self.solver.solve(
            &self.mesh,
            &self.substrates,
            &mut self.densities,
            &self.dirichlet,
            dt,
        );
    }
}
