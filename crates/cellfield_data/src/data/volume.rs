use serde::{Deserialize, Serialize};

/// Volume decomposition of a cell, in cubic microns.
///
/// The nucleus and the cytoplasm each split into a fluid and a solid part;
/// `total`, `fluid`, `solid`, `nuclear` and `cytoplasmic` are derived sums kept
/// in sync by the volume update in `cellfield_core::phenotype::volume`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub total: f64,
    pub solid: f64,
    pub fluid: f64,
    pub fluid_fraction: f64,

    pub nuclear: f64,
    pub nuclear_fluid: f64,
    pub nuclear_solid: f64,

    pub cytoplasmic: f64,
    pub cytoplasmic_fluid: f64,
    pub cytoplasmic_solid: f64,

    pub cytoplasmic_to_nuclear_ratio: f64,

    pub target_solid_cytoplasmic: f64,
    pub target_solid_nuclear: f64,
    pub target_fluid_fraction: f64,
    pub target_cytoplasmic_to_nuclear_ratio: f64,

    pub relative_rupture_volume: f64,
    pub rupture_volume: f64,

    /// Relaxation rates, per minute.
    pub cytoplasmic_biomass_change_rate: f64,
    pub nuclear_biomass_change_rate: f64,
    pub fluid_change_rate: f64,
}

impl Default for Volume {
    /// MCF-7 style reference cell.
    fn default() -> Self {
        let total = 2494.0;
        let fluid_fraction = 0.75;
        let nuclear = 540.0;
        let cytoplasmic = total - nuclear;

        let nuclear_fluid = fluid_fraction * nuclear;
        let cytoplasmic_fluid = fluid_fraction * cytoplasmic;
        let nuclear_solid = nuclear - nuclear_fluid;
        let cytoplasmic_solid = cytoplasmic - cytoplasmic_fluid;

        Self {
            total,
            solid: nuclear_solid + cytoplasmic_solid,
            fluid: nuclear_fluid + cytoplasmic_fluid,
            fluid_fraction,
            nuclear,
            nuclear_fluid,
            nuclear_solid,
            cytoplasmic,
            cytoplasmic_fluid,
            cytoplasmic_solid,
            cytoplasmic_to_nuclear_ratio: cytoplasmic / nuclear,
            target_solid_cytoplasmic: cytoplasmic_solid,
            target_solid_nuclear: nuclear_solid,
            target_fluid_fraction: fluid_fraction,
            target_cytoplasmic_to_nuclear_ratio: cytoplasmic / nuclear,
            relative_rupture_volume: 2.0,
            rupture_volume: 2.0 * total,
            cytoplasmic_biomass_change_rate: 0.27 / 60.0,
            nuclear_biomass_change_rate: 0.33 / 60.0,
            fluid_change_rate: 3.0 / 60.0,
        }
    }
}

/// Shape quantities derived from [`Volume`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub radius: f64,
    pub nuclear_radius: f64,
    pub surface_area: f64,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            radius: 8.412710547954228,
            nuclear_radius: 5.051670902881889,
            surface_area: 889.3685284,
        }
    }
}
