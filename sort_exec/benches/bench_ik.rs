//! # Inverse Kinematics Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use sort_lib::{
    ik::{solve_pose, CcdParams, CcdSolver, LocalParams, LocalSolver},
    kin::{JointConfig, KinChain},
    traj::{generate, TrajKind},
};

fn ik_benchmark(c: &mut Criterion) {
    let chain = KinChain::default();
    let ccd = CcdSolver::new(CcdParams::default());
    let local = LocalSolver::new(LocalParams::default());

    // ---- Targets reachable by construction ----

    let mut rng = StdRng::seed_from_u64(42);
    let configs: Vec<JointConfig> = (0..16)
        .map(|_| {
            let mut q = [90.0; 5];
            for j in q.iter_mut() {
                *j += rng.gen_range(-20.0..20.0);
            }
            q
        })
        .collect();
    let targets: Vec<_> = configs.iter().map(|q| chain.compute_pose(q)).collect();

    c.bench_function("forward kinematics", |b| {
        b.iter(|| chain.compute_pose(black_box(&configs[0])))
    });

    c.bench_function("ccd from home", |b| {
        b.iter(|| {
            for t in targets.iter() {
                black_box(ccd.solve_ccd(&chain, t));
            }
        })
    });

    c.bench_function("local refinement from nearby seed", |b| {
        b.iter(|| {
            for (q, t) in configs.iter().zip(targets.iter()) {
                let seed = [q[0] + 3.0, q[1] - 3.0, q[2] + 3.0, q[3], q[4] - 3.0];
                black_box(local.solve_local(&chain, t, &seed));
            }
        })
    });

    c.bench_function("solve pose", |b| {
        b.iter(|| black_box(solve_pose(&chain, &targets[0], &ccd, &local)))
    });

    let waypoints = [targets[0], targets[1], targets[2]];
    c.bench_function("spline 50 steps", |b| {
        b.iter(|| black_box(generate(TrajKind::Spline, &waypoints, 50)))
    });
}

criterion_group!(benches, ik_benchmark);
criterion_main!(benches);
