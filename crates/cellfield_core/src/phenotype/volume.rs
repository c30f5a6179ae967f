//! Volume relaxation and derived geometry.

use cellfield_data::{Geometry, PhaseEntry, SecretionParams, Volume};

const FOUR_THIRDS_PI: f64 = 4.188_790_204_786_391;

/// Apoptotic shrinkage rates, per minute.
const APOPTOTIC_CYTOPLASMIC_RATE: f64 = 1.0 / 60.0;
const APOPTOTIC_NUCLEAR_RATE: f64 = 0.35 / 60.0;
const APOPTOTIC_FLUID_RATE: f64 = 3.0 / 60.0;

/// Necrotic rates, per minute.
const NECROTIC_CYTOPLASMIC_RATE: f64 = 0.0032 / 60.0;
const NECROTIC_NUCLEAR_RATE: f64 = 0.013 / 60.0;
const NECROTIC_UNLYSED_FLUID_RATE: f64 = 0.67 / 60.0;
const NECROTIC_LYSED_FLUID_RATE: f64 = 0.05 / 60.0;

/// Necrotic cells keep a tenth of their exchange activity.
const NECROTIC_REACTION_FACTOR: f64 = 0.1;

pub trait VolumeLogic {
    /// Relaxes each compartment toward its target for `dt` minutes.
    fn relax(&mut self, dt: f64);
    fn multiply_by_ratio(&mut self, ratio: f64);
    /// Halves every compartment and target.
    fn divide(&mut self);
    fn geometry(&self) -> Geometry;
    /// Applies the volume side of a phase entry; see [`adjust_secretion`]
    /// for the exchange side.
    fn enter_phase(&mut self, entry: PhaseEntry);
}

impl VolumeLogic for Volume {
    fn relax(&mut self, dt: f64) {
        self.fluid += dt * self.fluid_change_rate * (self.target_fluid_fraction * self.total - self.fluid);
        self.fluid = self.fluid.max(0.0);

        self.nuclear_fluid = if self.total > 0.0 {
            (self.nuclear / self.total) * self.fluid
        } else {
            0.0
        };
        self.cytoplasmic_fluid = self.fluid - self.nuclear_fluid;

        self.nuclear_solid +=
            dt * self.nuclear_biomass_change_rate * (self.target_solid_nuclear - self.nuclear_solid);
        self.nuclear_solid = self.nuclear_solid.max(0.0);

        self.target_solid_cytoplasmic =
            self.target_cytoplasmic_to_nuclear_ratio * self.target_solid_nuclear;
        self.cytoplasmic_solid += dt
            * self.cytoplasmic_biomass_change_rate
            * (self.target_solid_cytoplasmic - self.cytoplasmic_solid);
        self.cytoplasmic_solid = self.cytoplasmic_solid.max(0.0);

        self.solid = self.nuclear_solid + self.cytoplasmic_solid;
        self.nuclear = self.nuclear_solid + self.nuclear_fluid;
        self.cytoplasmic = self.cytoplasmic_solid + self.cytoplasmic_fluid;
        self.total = self.nuclear + self.cytoplasmic;
        self.fluid_fraction = self.fluid / (1e-16 + self.total);
        self.cytoplasmic_to_nuclear_ratio = self.cytoplasmic / (1e-16 + self.nuclear);
    }

    fn multiply_by_ratio(&mut self, ratio: f64) {
        self.total *= ratio;
        self.solid *= ratio;
        self.fluid *= ratio;

        self.nuclear *= ratio;
        self.nuclear_fluid *= ratio;
        self.nuclear_solid *= ratio;

        self.cytoplasmic *= ratio;
        self.cytoplasmic_fluid *= ratio;
        self.cytoplasmic_solid *= ratio;

        self.rupture_volume *= ratio;

        self.target_solid_nuclear *= ratio;
        self.target_solid_cytoplasmic *= ratio;
    }

    fn divide(&mut self) {
        self.multiply_by_ratio(0.5);
    }

    fn geometry(&self) -> Geometry {
        let radius = (self.total / FOUR_THIRDS_PI).cbrt();
        Geometry {
            radius,
            nuclear_radius: (self.nuclear / FOUR_THIRDS_PI).cbrt(),
            surface_area: 4.0 * std::f64::consts::PI * radius * radius,
        }
    }

    fn enter_phase(&mut self, entry: PhaseEntry) {
        match entry {
            PhaseEntry::None => {}
            PhaseEntry::DoubleVolumeTargets => {
                self.target_solid_nuclear *= 2.0;
                self.target_solid_cytoplasmic *= 2.0;
            }
            PhaseEntry::Apoptotic => {
                self.target_fluid_fraction = 0.0;
                self.target_solid_nuclear = 0.0;
                self.target_solid_cytoplasmic = 0.0;
                self.target_cytoplasmic_to_nuclear_ratio = 0.0;
                self.cytoplasmic_biomass_change_rate = APOPTOTIC_CYTOPLASMIC_RATE;
                self.nuclear_biomass_change_rate = APOPTOTIC_NUCLEAR_RATE;
                self.fluid_change_rate = APOPTOTIC_FLUID_RATE;
            }
            PhaseEntry::NecroticSwelling => {
                self.target_fluid_fraction = 1.0;
                self.target_solid_nuclear = 0.0;
                self.target_solid_cytoplasmic = 0.0;
                self.target_cytoplasmic_to_nuclear_ratio = 0.0;
                self.cytoplasmic_biomass_change_rate = NECROTIC_CYTOPLASMIC_RATE;
                self.nuclear_biomass_change_rate = NECROTIC_NUCLEAR_RATE;
                self.fluid_change_rate = NECROTIC_UNLYSED_FLUID_RATE;
                self.rupture_volume = self.relative_rupture_volume * self.total;
            }
            PhaseEntry::NecroticLysed => {
                self.target_fluid_fraction = 0.0;
                self.fluid_change_rate = NECROTIC_LYSED_FLUID_RATE;
            }
        }
    }
}

/// Exchange-rate side of a phase entry.
pub fn adjust_secretion(secretion: &mut SecretionParams, entry: PhaseEntry) {
    match entry {
        PhaseEntry::Apoptotic => {
            secretion.secretion_rates.fill(0.0);
            secretion.uptake_rates.fill(0.0);
            secretion.net_export_rates.fill(0.0);
        }
        PhaseEntry::NecroticSwelling => {
            for rate in secretion
                .secretion_rates
                .iter_mut()
                .chain(secretion.uptake_rates.iter_mut())
            {
                *rate *= NECROTIC_REACTION_FACTOR;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_at_equilibrium() {
        let mut v = Volume::default();
        let before = v.total;
        for _ in 0..100 {
            v.relax(6.0);
        }
        assert!((v.total - before).abs() < 1e-9);
    }

    #[test]
    fn test_default_geometry_matches_reference() {
        let g = Volume::default().geometry();
        let reference = Geometry::default();
        assert!((g.radius - reference.radius).abs() < 1e-9);
        assert!((g.nuclear_radius - reference.nuclear_radius).abs() < 1e-9);
        assert!((g.surface_area - reference.surface_area).abs() < 1e-6);
    }

    #[test]
    fn test_doubled_targets_grow_toward_twice_volume() {
        let mut v = Volume::default();
        let start = v.total;
        v.enter_phase(PhaseEntry::DoubleVolumeTargets);
        for _ in 0..20_000 {
            v.relax(1.0);
        }
        assert!((v.total / start - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_divide_halves_all_compartments() {
        let mut v = Volume::default();
        let before = v;
        v.divide();
        assert_eq!(v.total, before.total * 0.5);
        assert_eq!(v.nuclear_solid, before.nuclear_solid * 0.5);
        assert_eq!(v.target_solid_nuclear, before.target_solid_nuclear * 0.5);
        assert_eq!(v.rupture_volume, before.rupture_volume * 0.5);
    }

    #[test]
    fn test_apoptotic_shrinks() {
        let mut v = Volume::default();
        v.enter_phase(PhaseEntry::Apoptotic);
        for _ in 0..600 {
            v.relax(1.0);
        }
        assert!(v.total < 0.05 * Volume::default().total);
    }

    #[test]
    fn test_necrotic_swelling_reaches_rupture() {
        let mut v = Volume::default();
        v.enter_phase(PhaseEntry::NecroticSwelling);
        assert_eq!(v.rupture_volume, 2.0 * v.total);
        let mut minutes = 0;
        while v.total < v.rupture_volume && minutes < 100_000 {
            v.relax(1.0);
            minutes += 1;
        }
        assert!(v.total >= v.rupture_volume);
    }

    #[test]
    fn test_necrotic_entry_turns_reactions_down() {
        let mut s = SecretionParams::zeroed(2);
        s.secretion_rates = vec![10.0, 0.0];
        s.uptake_rates = vec![0.0, 5.0];
        adjust_secretion(&mut s, PhaseEntry::NecroticSwelling);
        assert_eq!(s.secretion_rates, vec![1.0, 0.0]);
        assert_eq!(s.uptake_rates, vec![0.0, 0.5]);
        adjust_secretion(&mut s, PhaseEntry::Apoptotic);
        assert_eq!(s.uptake_rates, vec![0.0, 0.0]);
    }
}
