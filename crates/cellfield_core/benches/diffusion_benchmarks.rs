use cellfield_core::bulk::{BulkFunctions, SourceSinkScheme};
use cellfield_core::mesh::{Bounds, Mesh};
use cellfield_core::microenvironment::{Microenvironment, SubstrateSpec};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn environment(n: usize, substrates: usize) -> Microenvironment {
    let extent = n as f64 * 20.0;
    let mesh = Mesh::new(
        Bounds::new(0.0, extent, 0.0, extent, 0.0, extent),
        20.0,
        20.0,
        20.0,
    )
    .unwrap();
    let mut env = Microenvironment::new(mesh);
    for s in 0..substrates {
        let spec = SubstrateSpec::new(&format!("s{s}"), "dimensionless")
            .with_coefficients(1000.0 * (s + 1) as f64, 0.1);
        env.add_substrate(spec).unwrap();
        env.fill_substrate(s, 1.0).unwrap();
    }
    env
}

fn bench_lod_step_single(c: &mut Criterion) {
    let mut env = environment(50, 1);
    env.simulate_diffusion_decay(0.01);

    c.bench_function("lod_step_50cubed_1_substrate", |b| {
        b.iter(|| {
            env.simulate_diffusion_decay(black_box(0.01));
        })
    });
}

fn bench_lod_step_multi(c: &mut Criterion) {
    let mut env = environment(50, 4);
    env.simulate_diffusion_decay(0.01);

    c.bench_function("lod_step_50cubed_4_substrates", |b| {
        b.iter(|| {
            env.simulate_diffusion_decay(black_box(0.01));
        })
    });
}

fn bench_lod_step_planar(c: &mut Criterion) {
    let mesh = Mesh::new(Bounds::new(0.0, 4000.0, 0.0, 4000.0, -10.0, 10.0), 20.0, 20.0, 20.0)
        .unwrap();
    let mut env = Microenvironment::new(mesh);
    env.add_substrate(SubstrateSpec::new("oxygen", "mmHg").with_coefficients(100_000.0, 0.1))
        .unwrap();
    env.fill_substrate(0, 38.0).unwrap();

    c.bench_function("lod_step_200x200_planar", |b| {
        b.iter(|| {
            env.simulate_diffusion_decay(black_box(0.01));
        })
    });
}

fn bench_bulk_sources(c: &mut Criterion) {
    let mut env = environment(50, 2);
    let bulk = BulkFunctions::new()
        .with_supply(|_, _, out| out.fill(0.1))
        .with_target(|_, _, out| out.fill(2.0))
        .with_uptake(|_, _, out| out.fill(0.05));

    c.bench_function("bulk_explicit_50cubed", |b| {
        b.iter(|| {
            env.simulate_bulk_sources_and_sinks(black_box(0.01), &bulk, SourceSinkScheme::Explicit);
        })
    });
}

criterion_group!(
    benches,
    bench_lod_step_single,
    bench_lod_step_multi,
    bench_lod_step_planar,
    bench_bulk_sources
);
criterion_main!(benches);
