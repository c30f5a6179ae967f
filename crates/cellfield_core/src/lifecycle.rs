use crate::phenotype::{standard_cycle_model, VolumeLogic};
use crate::vector;
use cellfield_data::{
    Agent, AgentId, CycleModelKind, CycleState, DeathState, ExchangeCache, MechanicsParams,
    SecretionParams, Vec3, Volume,
};
use rand::Rng;

/// A reference cell following the live cycle model, with no exchange and no
/// death rates.
#[must_use]
pub fn default_agent(position: Vec3, substrates: usize) -> Agent {
    let rates = standard_cycle_model(CycleModelKind::Live)
        .map(|m| m.links.iter().map(|l| l.rate).collect())
        .unwrap_or_default();
    let volume = Volume::default();
    Agent {
        position,
        velocity: [0.0; 3],
        previous_velocity: [0.0; 3],
        geometry: volume.geometry(),
        volume,
        mechanics: MechanicsParams::default(),
        secretion: SecretionParams::zeroed(substrates),
        internalized: vec![0.0; substrates],
        cycle: CycleState {
            kind: CycleModelKind::Live,
            phase: 0,
            elapsed_time_in_phase: 0.0,
            rates,
        },
        death: DeathState {
            rates: vec![0.0; 2],
            ..DeathState::default()
        },
        oxygen_response: None,
        is_movable: true,
        parent: None,
        lineage: 0,
        generation: 0,
        bucket: 0,
        exchange: ExchangeCache::default(),
    }
}

/// Uniform direction on the unit sphere, or on the unit circle in the
/// xy-plane when `planar`.
pub fn random_unit_vector<R: Rng>(planar: bool, rng: &mut R) -> Vec3 {
    let theta = rng.gen_range(0.0..std::f64::consts::TAU);
    if planar {
        return [theta.cos(), theta.sin(), 0.0];
    }
    let z: f64 = rng.gen_range(-1.0..=1.0);
    let r = (1.0 - z * z).max(0.0).sqrt();
    [r * theta.cos(), r * theta.sin(), z]
}

/// Splits `parent` into two daughters sitting half a radius either side of
/// the parent's centre. Each daughter gets half the parent's volume.
pub fn divide<R: Rng>(
    parent: &Agent,
    parent_id: AgentId,
    planar: bool,
    rng: &mut R,
) -> (Agent, Agent) {
    let direction = random_unit_vector(planar, rng);
    let offset = vector::scale(direction, 0.5 * parent.geometry.radius);

    let mut first = parent.clone();
    first.volume.divide();
    first.geometry = first.volume.geometry();
    first.parent = Some(parent_id);
    first.generation = parent.generation + 1;
    first.velocity = [0.0; 3];
    first.previous_velocity = [0.0; 3];
    first.cycle.elapsed_time_in_phase = 0.0;
    first.internalized.iter_mut().for_each(|v| *v *= 0.5);
    first.exchange = ExchangeCache::default();

    let mut second = first.clone();
    first.position = vector::add(parent.position, offset);
    second.position = vector::sub(parent.position, offset);
    (first, second)
}
