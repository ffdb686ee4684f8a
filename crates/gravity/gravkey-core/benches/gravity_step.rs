use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gravkey_core::{
    data::{PointState, RiderSnapshot, Vec2},
    effects::{kramual, pulse, set_gravity},
    rider::{generate_rider_array, Rider, RiderModifiers},
    time::Timestamp,
    timeline::{Choreography, Interval},
    Engine, PointSet, SimulationHost,
};

struct StaticHost {
    frame: i64,
    snapshots: Vec<RiderSnapshot>,
}

impl SimulationHost for StaticHost {
    fn frame_index(&self) -> i64 {
        self.frame
    }

    fn rider_count(&self) -> usize {
        self.snapshots.len()
    }

    fn rider_snapshot(&self, _frame: i64, rider: usize) -> Option<RiderSnapshot> {
        self.snapshots.get(rider).cloned()
    }
}

fn choreography(riders: usize) -> Choreography {
    let mut c = Choreography::default();
    let base = Rider::new("bench");
    c.add_riders(generate_rider_array(&base, riders, &RiderModifiers::default()).expect("riders"));
    let all = c.targets(None, PointSet::ALL);
    let stagger = Interval::Stagger { frames: 3.0 };
    c.apply_gravity(&all, Timestamp::new(0, 0, 10), &set_gravity(0.0, 0.2), &stagger)
        .expect("set");
    c.apply_gravity(&all, Timestamp::new(0, 1, 0), &pulse(Vec2::new(0.5, 0.0), 10), &stagger)
        .expect("pulse");
    c.apply_gravity(&all, Timestamp::new(0, 2, 0), &kramual(30.0), &stagger)
        .expect("kramual");
    c
}

fn bench_gravity_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("gravity_step");
    for riders in [1usize, 10, 100] {
        let choreo = choreography(riders);
        let snapshot = RiderSnapshot::new(vec![PointState::new(Vec2::new(1.0, 2.0), Vec2::new(0.5, 0.0)); 17]);
        group.bench_with_input(BenchmarkId::from_parameter(riders), &riders, |b, &riders| {
            let mut engine = Engine::default();
            engine.setup(choreo.keyframe_stream());
            let mut host = StaticHost {
                frame: 0,
                snapshots: vec![snapshot.clone(); riders],
            };
            b.iter(|| {
                host.frame = (host.frame + 1) % 200;
                for _ in 0..riders * 17 {
                    black_box(engine.next_gravity(&host));
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_gravity_step);
criterion_main!(benches);
