//! Phase graphs for the standard cycle and death programs, plus the stepping
//! rule shared by both.

use crate::error::{FieldError, Result};
use cellfield_data::{
    ArrestCondition, CycleModel, CycleModelKind, Phase, PhaseCode, PhaseEntry, PhaseLink, Volume,
};
use rand::Rng;

/// What happened while advancing an agent through its phase graph.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transition {
    pub divide: bool,
    pub remove: bool,
    /// Entry action of the phase just entered.
    pub entry: Option<PhaseEntry>,
}

fn link(from: usize, to: usize, rate: f64, fixed_duration: bool) -> PhaseLink {
    PhaseLink {
        from,
        to,
        rate,
        fixed_duration,
        arrest: None,
    }
}

fn dividing(code: PhaseCode, name: &str) -> Phase {
    Phase {
        division_at_exit: true,
        entry: PhaseEntry::DoubleVolumeTargets,
        ..Phase::new(code, name)
    }
}

fn growing(code: PhaseCode, name: &str) -> Phase {
    Phase {
        entry: PhaseEntry::DoubleVolumeTargets,
        ..Phase::new(code, name)
    }
}

/// Built-in model for `kind`; `None` for custom slots.
#[must_use]
pub fn standard_cycle_model(kind: CycleModelKind) -> Option<CycleModel> {
    let model = match kind {
        CycleModelKind::AdvancedKi67 => CycleModel {
            name: "Ki67 (advanced)".into(),
            phases: vec![
                Phase::new(PhaseCode::Ki67Negative, "Ki67-"),
                dividing(PhaseCode::Ki67PositivePremitotic, "Ki67+ (premitotic)"),
                Phase::new(PhaseCode::Ki67PositivePostmitotic, "Ki67+ (postmitotic)"),
            ],
            links: vec![
                link(0, 1, 1.0 / (3.62 * 60.0), false),
                link(1, 2, 1.0 / (13.0 * 60.0), true),
                link(2, 0, 1.0 / (2.5 * 60.0), true),
            ],
        },
        CycleModelKind::BasicKi67 => CycleModel {
            name: "Ki67 (basic)".into(),
            phases: vec![
                Phase::new(PhaseCode::Ki67Negative, "Ki67-"),
                dividing(PhaseCode::Ki67Positive, "Ki67+"),
            ],
            links: vec![
                link(0, 1, 1.0 / (4.59 * 60.0), false),
                link(1, 0, 1.0 / (15.5 * 60.0), true),
            ],
        },
        CycleModelKind::FlowCytometry => CycleModel {
            name: "Flow cytometry model (basic)".into(),
            phases: vec![
                Phase::new(PhaseCode::G0G1, "G0/G1"),
                growing(PhaseCode::S, "S"),
                Phase {
                    division_at_exit: true,
                    ..Phase::new(PhaseCode::G2M, "G2/M")
                },
            ],
            links: vec![
                link(0, 1, 0.00324, false),
                link(1, 2, 0.00208, false),
                link(2, 0, 0.00333, false),
            ],
        },
        CycleModelKind::FlowCytometrySeparated => CycleModel {
            name: "Flow cytometry model (separated)".into(),
            phases: vec![
                Phase::new(PhaseCode::G0G1, "G0/G1"),
                growing(PhaseCode::S, "S"),
                Phase::new(PhaseCode::G2, "G2"),
                Phase {
                    division_at_exit: true,
                    ..Phase::new(PhaseCode::M, "M")
                },
            ],
            links: vec![
                link(0, 1, 0.00335, false),
                link(1, 2, 0.00208, false),
                link(2, 3, 0.00417, false),
                link(3, 0, 0.0167, false),
            ],
        },
        CycleModelKind::Live => CycleModel {
            name: "Live".into(),
            phases: vec![dividing(PhaseCode::Live, "Live")],
            links: vec![link(0, 0, 0.0432 / 60.0, false)],
        },
        CycleModelKind::CyclingQuiescent => CycleModel {
            name: "Cycling-Quiescent model".into(),
            phases: vec![
                Phase::new(PhaseCode::Quiescent, "Quiescent"),
                dividing(PhaseCode::Cycling, "Cycling"),
            ],
            links: vec![
                link(0, 1, 1.0 / (4.59 * 60.0), false),
                link(1, 0, 1.0 / (15.5 * 60.0), true),
            ],
        },
        CycleModelKind::Custom(_) => return None,
    };
    Some(model)
}

/// Apoptosis: a fixed-duration shrinking phase, then removal.
#[must_use]
pub fn apoptosis_model() -> CycleModel {
    CycleModel {
        name: "Apoptosis".into(),
        phases: vec![
            Phase {
                removal_at_exit: true,
                entry: PhaseEntry::Apoptotic,
                ..Phase::new(PhaseCode::Apoptotic, "Apoptotic")
            },
            Phase::new(PhaseCode::Debris, "Debris"),
        ],
        links: vec![link(0, 1, 1.0 / (8.6 * 60.0), true)],
    }
}

/// Necrosis: swell until rupture, lyse, then clear once small enough or
/// after sixty days.
#[must_use]
pub fn necrosis_model() -> CycleModel {
    CycleModel {
        name: "Necrosis".into(),
        phases: vec![
            Phase {
                entry: PhaseEntry::NecroticSwelling,
                ..Phase::new(PhaseCode::NecroticSwelling, "Necrotic (swelling)")
            },
            Phase {
                removal_at_exit: true,
                entry: PhaseEntry::NecroticLysed,
                ..Phase::new(PhaseCode::NecroticLysed, "Necrotic (lysed)")
            },
            Phase::new(PhaseCode::Debris, "Debris"),
        ],
        links: vec![
            PhaseLink {
                arrest: Some(ArrestCondition::BelowRuptureVolume),
                ..link(0, 1, 9e9, false)
            },
            link(1, 2, 1.0 / (60.0 * 24.0 * 60.0), true),
            PhaseLink {
                arrest: Some(ArrestCondition::AboveVolume(20.0)),
                ..link(1, 2, 9e9, false)
            },
        ],
    }
}

/// Rejects graphs with dangling links or unusable rates.
pub fn validate_model(model: &CycleModel) -> Result<()> {
    if model.phases.is_empty() {
        return Err(FieldError::InvalidConfig(format!(
            "model '{}' has no phases",
            model.name
        )));
    }
    for (i, l) in model.links.iter().enumerate() {
        if l.from >= model.phases.len() || l.to >= model.phases.len() {
            return Err(FieldError::InvalidConfig(format!(
                "model '{}': link {i} connects {} -> {} but there are {} phases",
                model.name,
                l.from,
                l.to,
                model.phases.len()
            )));
        }
        if l.rate.is_nan() || l.rate < 0.0 {
            return Err(FieldError::InvalidConfig(format!(
                "model '{}': link {i} has rate {}",
                model.name, l.rate
            )));
        }
    }
    Ok(())
}

fn is_arrested(arrest: Option<ArrestCondition>, volume: &Volume) -> bool {
    match arrest {
        None => false,
        Some(ArrestCondition::BelowRuptureVolume) => volume.total < volume.rupture_volume,
        Some(ArrestCondition::AboveVolume(limit)) => volume.total > limit,
    }
}

/// Advances one agent through `model` by `dt` minutes.
///
/// `rates` overrides link rates by link index; links past its end use the
/// model's own rate. At most one transition fires per call, taken from the
/// first eligible link out of the current phase in declaration order.
pub fn advance<R: Rng>(
    model: &CycleModel,
    phase: &mut usize,
    elapsed: &mut f64,
    rates: &[f64],
    volume: &Volume,
    dt: f64,
    rng: &mut R,
) -> Transition {
    *elapsed += dt;
    let current = *phase;
    let mut transition = Transition::default();

    for (i, l) in model.links.iter().enumerate() {
        if l.from != current || is_arrested(l.arrest, volume) {
            continue;
        }
        let rate = rates.get(i).copied().unwrap_or(l.rate);
        let fires = if l.fixed_duration {
            rate > 0.0 && *elapsed > 1.0 / rate - 0.5 * dt
        } else {
            rng.gen::<f64>() < rate * dt
        };
        if !fires {
            continue;
        }

        if let Some(exiting) = model.phases.get(current) {
            transition.divide = exiting.division_at_exit;
            transition.remove = exiting.removal_at_exit;
        }
        *phase = l.to;
        *elapsed = 0.0;
        transition.entry = model.phases.get(l.to).map(|p| p.entry);
        break;
    }
    transition
}
