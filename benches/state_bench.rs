use criterion::*;
use std::hint::black_box;

use ecm_framework::prelude::*;

type Pose = Data<[f64; 3], 1>;
type Twist = Data<[f64; 3], 2>;

fn populate(count: u64) -> EntityComponentManager {
    let mut ecm = EntityComponentManager::new();
    for i in 0..count {
        let entity = ecm.create_entity();
        ecm.create_component(entity, Pose::new([i as f64, 0.0, 0.0]));
        ecm.create_component(entity, Twist::new([0.0, i as f64, 0.0]));
    }
    ecm
}

fn populate_benchmark(c: &mut Criterion) {
    register_component::<Pose>().unwrap();
    register_component::<Twist>().unwrap();

    let mut group = c.benchmark_group("populate");

    for &(label, n) in &[("populate_1k", 1_000u64), ("populate_10k", 10_000u64)] {
        group.bench_function(label, |b| {
            b.iter(|| black_box(populate(n)));
        });
    }

    group.finish();
}

fn state_benchmark(c: &mut Criterion) {
    register_component::<Pose>().unwrap();
    register_component::<Twist>().unwrap();

    let mut group = c.benchmark_group("state");

    for &(label, n) in &[("state_map_1k", 1_000u64), ("state_map_10k", 10_000u64)] {
        let ecm = populate(n);
        group.bench_function(label, |b| {
            b.iter(|| {
                let mut msg = SerializedStateMap::default();
                ecm.state_map(&mut msg, &[], &[], true);
                black_box(msg);
            });
        });
    }

    for &(label, n) in &[("changed_state_1k", 1_000u64), ("changed_state_10k", 10_000u64)] {
        let ecm = populate(n);
        group.bench_function(label, |b| {
            b.iter(|| black_box(ecm.changed_state()));
        });
    }

    group.finish();
}

criterion_group!(benches, populate_benchmark, state_benchmark);
criterion_main!(benches);
