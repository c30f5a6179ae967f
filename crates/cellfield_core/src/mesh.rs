//! Structured Cartesian mesh.
//!
//! Voxels are addressed row-major with x varying fastest:
//! `index = (k * ny + j) * nx + i`.

use crate::error::{FieldError, Result};
use cellfield_data::Vec3;
use serde::{Deserialize, Serialize};

const AXES: [char; 3] = ['x', 'y', 'z'];

/// Axis-aligned domain bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    #[must_use]
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64, z_min: f64, z_max: f64) -> Self {
        Self {
            min: [x_min, y_min, z_min],
            max: [x_max, y_max, z_max],
        }
    }

    #[must_use]
    pub fn contains(&self, p: Vec3) -> bool {
        (0..3).all(|a| p[a] >= self.min[a] && p[a] <= self.max[a])
    }

    /// Clamps `p` into the closed box.
    #[must_use]
    pub fn clamp(&self, p: Vec3) -> Vec3 {
        [
            p[0].clamp(self.min[0], self.max[0]),
            p[1].clamp(self.min[1], self.max[1]),
            p[2].clamp(self.min[2], self.max[2]),
        ]
    }

    #[must_use]
    pub fn extent(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }
}

/// A single volume element. Immutable once the mesh is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Voxel {
    pub index: usize,
    pub center: Vec3,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Bounding box of the voxel lattice (the requested bounds rounded up to
    /// a whole number of voxels).
    pub bounds: Bounds,
    pub spacing: Vec3,
    pub dims: [usize; 3],
    pub voxel_volume: f64,
    coordinates: [Vec<f64>; 3],
}

impl Mesh {
    /// Builds a lattice covering `bounds` with the given spacing. Each axis
    /// holds at least one voxel; a degenerate axis (min == max) is a single
    /// layer of thickness equal to its spacing.
    pub fn new(bounds: Bounds, dx: f64, dy: f64, dz: f64) -> Result<Self> {
        let spacing = [dx, dy, dz];
        for axis in 0..3 {
            // NaN fails this check as well
            if !(spacing[axis] > 0.0) {
                return Err(FieldError::NonPositiveSpacing {
                    axis: AXES[axis],
                    value: spacing[axis],
                });
            }
            if !(bounds.max[axis] >= bounds.min[axis]) {
                return Err(FieldError::InvertedBounds {
                    axis: AXES[axis],
                    min: bounds.min[axis],
                    max: bounds.max[axis],
                });
            }
        }

        let mut dims = [1usize; 3];
        let mut lattice = bounds;
        let mut coordinates: [Vec<f64>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        for axis in 0..3 {
            let n = (bounds.extent(axis) / spacing[axis]).ceil() as usize;
            dims[axis] = n.max(1);
            lattice.max[axis] = bounds.min[axis] + dims[axis] as f64 * spacing[axis];
            coordinates[axis] = (0..dims[axis])
                .map(|i| bounds.min[axis] + (i as f64 + 0.5) * spacing[axis])
                .collect();
        }

        Ok(Self {
            bounds: lattice,
            spacing,
            dims,
            voxel_volume: dx * dy * dz,
            coordinates,
        })
    }

    #[inline]
    #[must_use]
    pub fn voxel_count(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    #[must_use]
    pub fn is_2d(&self) -> bool {
        self.dims[2] == 1
    }

    #[inline]
    #[must_use]
    pub fn linear_index(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.dims[1] + j) * self.dims[0] + i
    }

    #[inline]
    #[must_use]
    pub fn cartesian_indices(&self, index: usize) -> [usize; 3] {
        let nx = self.dims[0];
        let ny = self.dims[1];
        [index % nx, (index / nx) % ny, index / (nx * ny)]
    }

    pub fn voxel(&self, index: usize) -> Result<Voxel> {
        if index >= self.voxel_count() {
            return Err(FieldError::voxel_out_of_range(index, self.voxel_count()));
        }
        Ok(Voxel {
            index,
            center: self.voxel_center(index),
            volume: self.voxel_volume,
        })
    }

    /// Center of voxel `index`. The caller guarantees the index is in range.
    #[inline]
    #[must_use]
    pub fn voxel_center(&self, index: usize) -> Vec3 {
        let [i, j, k] = self.cartesian_indices(index);
        [
            self.coordinates[0][i],
            self.coordinates[1][j],
            self.coordinates[2][k],
        ]
    }

    #[must_use]
    pub fn axis_coordinates(&self, axis: usize) -> &[f64] {
        &self.coordinates[axis]
    }

    #[must_use]
    pub fn is_position_valid(&self, p: Vec3) -> bool {
        self.bounds.contains(p)
    }

    /// Per-axis voxel indices of the voxel nearest to `p`, clamped to the
    /// boundary layer for positions outside the domain.
    #[inline]
    #[must_use]
    pub fn nearest_cartesian_indices(&self, p: Vec3) -> [usize; 3] {
        let mut out = [0usize; 3];
        for axis in 0..3 {
            let offset = ((p[axis] - self.bounds.min[axis]) / self.spacing[axis]).floor();
            // `as` saturates and maps NaN to 0
            let idx = offset.max(0.0) as usize;
            out[axis] = idx.min(self.dims[axis] - 1);
        }
        out
    }

    #[inline]
    #[must_use]
    pub fn nearest_voxel_index(&self, p: Vec3) -> usize {
        let [i, j, k] = self.nearest_cartesian_indices(p);
        self.linear_index(i, j, k)
    }

    /// Voxels lying on one face of the lattice.
    #[must_use]
    pub fn face_voxels(&self, face: Face) -> Vec<usize> {
        let [nx, ny, nz] = self.dims;
        let (axis, layer) = face.axis_and_layer(self.dims);
        let mut out = Vec::new();
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let on_face = match axis {
                        0 => i == layer,
                        1 => j == layer,
                        _ => k == layer,
                    };
                    if on_face {
                        out.push(self.linear_index(i, j, k));
                    }
                }
            }
        }
        out
    }
}

/// One of the six faces of the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Face {
    XMin,
    XMax,
    YMin,
    YMax,
    ZMin,
    ZMax,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::XMin,
        Face::XMax,
        Face::YMin,
        Face::YMax,
        Face::ZMin,
        Face::ZMax,
    ];

    #[must_use]
    pub fn axis(self) -> usize {
        match self {
            Face::XMin | Face::XMax => 0,
            Face::YMin | Face::YMax => 1,
            Face::ZMin | Face::ZMax => 2,
        }
    }

    fn axis_and_layer(self, dims: [usize; 3]) -> (usize, usize) {
        let axis = self.axis();
        let layer = match self {
            Face::XMin | Face::YMin | Face::ZMin => 0,
            _ => dims[axis] - 1,
        };
        (axis, layer)
    }
}
