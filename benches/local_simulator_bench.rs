//! Local simulator and prompt builder throughput.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use calcio::config::MatchRules;
use calcio::simulation::{build_prompt, rng, LocalSimulator, Player, Tactic, Team};

fn squad(name: &str, size: usize) -> Team {
    let roster = (0..size)
        .map(|i| Player::new(format!("{name} Giocatore {i}"), "Centrocampista"))
        .collect();
    Team::new(name, roster)
}

fn bench_local_simulator(c: &mut Criterion) {
    let simulator = LocalSimulator::default();
    let attack = Tactic::new("attacco");
    let defence = Tactic::new("difesa");

    let mut group = c.benchmark_group("local_simulator");
    group.sample_size(100);
    group.throughput(Throughput::Elements(1));

    for size in [0usize, 11, 25] {
        group.bench_with_input(format!("match_roster_{size}"), &size, |b, &size| {
            let home = squad("Leoni", size);
            let away = squad("Falchi", size);
            b.iter_batched(
                || rng::seeded(7),
                |mut rng| black_box(simulator.simulate(&home, &away, &attack, &defence, &mut rng)),
                BatchSize::SmallInput,
            );
        });
    }

    group.bench_function("prompt_roster_25", |b| {
        let home = squad("Leoni", 25);
        let away = squad("Falchi", 25);
        let rules = MatchRules::default();
        b.iter_batched(
            || rng::seeded(7),
            |mut rng| black_box(build_prompt(&home, &away, &attack, &defence, &rules, &mut rng)),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_local_simulator);
criterion_main!(benches);
