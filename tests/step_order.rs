mod common;
use cellfield_lib::model::bulk::BulkFunctions;
use cellfield_lib::model::config::SubstrateConfig;
use common::WorldBuilder;

#[test]
fn test_bulk_runs_before_agent_uptake() {
    let (mut world, ids) = WorldBuilder::new()
        .with_config(|c| {
            c.substrates = vec![SubstrateConfig {
                diffusion_coefficient: 0.0,
                decay_rate: 0.0,
                initial_condition: 10.0,
                ..SubstrateConfig::default()
            }];
        })
        .with_bulk(
            BulkFunctions::new()
                .with_supply(|_, _, out| out.fill(1.0))
                .with_target(|_, _, out| out.fill(20.0)),
        )
        .with_agent([50.0, 50.0, 50.0], |a| a.secretion.uptake_rates = vec![5.0])
        .build();
    let dt = 0.1;

    world.advance(dt).unwrap();

    let agent = world.agent(ids[0]).unwrap();
    let after_bulk = 10.0 + dt * (20.0 - 10.0);
    let k = dt * agent.volume.total / world.env.mesh().voxel_volume;
    let expected = after_bulk / (1.0 + k * 5.0);
    assert_close!(world.env.nearest_density_vector(agent.position)[0], expected, 1e-12);
    // Voxels without agents only see the bulk term.
    assert_close!(world.env.density_vector(0).unwrap()[0], after_bulk, 1e-12);
}

#[test]
fn test_mechanics_subcycles_on_its_own_interval() {
    let (mut world, ids) = WorldBuilder::new()
        .with_config(|c| {
            c.time.diffusion_dt = 0.01;
            c.time.mechanics_dt = 0.1;
        })
        .with_agent([48.0, 50.0, 50.0], |_| {})
        .with_agent([52.0, 50.0, 50.0], |_| {})
        .build();
    let position = |w: &cellfield_lib::model::world::World| w.agent(ids[0]).unwrap().position;

    let start = position(&world);
    world.step().unwrap();
    let after_first = position(&world);
    assert_ne!(start, after_first, "mechanics runs on the first step");

    for _ in 0..9 {
        world.step().unwrap();
        assert_eq!(position(&world), after_first, "mechanics ran before its interval");
    }
    world.step().unwrap();
    assert_ne!(position(&world), after_first, "mechanics missed its interval");
    assert_eq!(world.metrics.step_count(), 11);
    assert_close!(world.time, 0.11, 1e-12);
}

#[test]
fn test_run_until_counts_steps() {
    let (mut world, _) = WorldBuilder::new()
        .with_config(|c| c.time.diffusion_dt = 0.5)
        .build();

    let steps = world.run_until(10.0).unwrap();

    assert_eq!(steps, 20);
    assert_eq!(world.step, 20);
    assert_close!(world.time, 10.0, 1e-9);
    assert!(world.env.is_locked());
}
