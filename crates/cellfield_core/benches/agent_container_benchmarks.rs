use cellfield_core::agent_container::{AgentContainer, BoundaryPolicy};
use cellfield_core::lifecycle::default_agent;
use cellfield_core::mechanics::{update_mechanics, MechanicsSettings};
use cellfield_core::mesh::{Bounds, Mesh};
use cellfield_core::microenvironment::{Microenvironment, SubstrateSpec};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn lattice(n: usize, spacing: f64) -> Vec<[f64; 3]> {
    (0..n * n * n)
        .map(|i| {
            let x = (i % n) as f64 * spacing - 250.0;
            let y = ((i / n) % n) as f64 * spacing - 250.0;
            let z = (i / (n * n)) as f64 * spacing - 250.0;
            [x, y, z]
        })
        .collect()
}

fn populated(n: usize) -> AgentContainer {
    let bounds = Bounds::new(-500.0, 500.0, -500.0, 500.0, -500.0, 500.0);
    let mut container = AgentContainer::new(bounds, 30.0, BoundaryPolicy::Clamp).unwrap();
    for p in lattice(n, 15.0) {
        container.register(default_agent(p, 1));
    }
    container
}

fn bench_register(c: &mut Criterion) {
    let positions = lattice(20, 15.0);
    let bounds = Bounds::new(-500.0, 500.0, -500.0, 500.0, -500.0, 500.0);

    c.bench_function("container_register_8000", |b| {
        b.iter(|| {
            let mut container = AgentContainer::new(bounds, 30.0, BoundaryPolicy::Clamp).unwrap();
            for &p in &positions {
                container.register(default_agent(p, 1));
            }
            black_box(container.len())
        })
    });
}

fn bench_neighbors(c: &mut Criterion) {
    let container = populated(20);
    let ids = container.agents().ids();

    c.bench_function("container_neighbors_8000", |b| {
        let mut out = Vec::new();
        b.iter(|| {
            let mut total = 0;
            for &id in &ids {
                container.neighbors_into(id, &mut out).unwrap();
                total += out.len();
            }
            black_box(total)
        })
    });
}

fn bench_mechanics_step(c: &mut Criterion) {
    let mut container = populated(20);
    let settings = MechanicsSettings::default();

    c.bench_function("mechanics_step_8000", |b| {
        b.iter(|| {
            update_mechanics(&mut container, black_box(0.1), &settings).unwrap();
        })
    });
}

fn bench_secretion(c: &mut Criterion) {
    let mut container = populated(20);
    for (_, agent) in container.agents_mut().iter_mut() {
        agent.secretion.uptake_rates = vec![10.0];
    }
    let mesh = Mesh::new(
        Bounds::new(-500.0, 500.0, -500.0, 500.0, -500.0, 500.0),
        20.0,
        20.0,
        20.0,
    )
    .unwrap();
    let mut env = Microenvironment::new(mesh);
    env.add_substrate(SubstrateSpec::new("oxygen", "mmHg")).unwrap();
    env.fill_substrate(0, 38.0).unwrap();

    c.bench_function("cell_sources_sinks_8000", |b| {
        b.iter(|| {
            env.simulate_cell_sources_and_sinks(container.agents_mut(), black_box(0.01), false);
        })
    });
}

criterion_group!(
    benches,
    bench_register,
    bench_neighbors,
    bench_mechanics_step,
    bench_secretion
);
criterion_main!(benches);
