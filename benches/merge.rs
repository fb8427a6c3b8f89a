//! Merge loop benchmark
//! Four sorted inputs of 50k lines each, drawn from an overlapping key range

use std::io::{self, Cursor};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nmatch::{MatchOptions, NamedInput, Session};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const LINES_PER_INPUT: usize = 50_000;

fn create_inputs(count: usize) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|_| {
            let mut keys: Vec<u64> = (0..LINES_PER_INPUT).map(|_| rng.gen_range(0..200_000)).collect();
            keys.sort_unstable();
            // Zero padded so numeric order equals byte order
            keys.iter().flat_map(|k| format!("key{k:08}\n").into_bytes()).collect()
        })
        .collect()
}

fn benchmark_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for count in [2usize, 4] {
        let data = create_inputs(count);
        group.throughput(Throughput::Elements((count * LINES_PER_INPUT) as u64));

        for dedup in [false, true] {
            let id = BenchmarkId::new(if dedup { "dedup" } else { "plain" }, count);
            group.bench_with_input(id, &data, |b, data| {
                b.iter(|| {
                    let inputs = data
                        .iter()
                        .enumerate()
                        .map(|(i, bytes)| NamedInput::new(i.to_string(), Cursor::new(bytes.as_slice())))
                        .collect();
                    let options = MatchOptions { dedup, ..Default::default() };
                    let outcome = Session::new(inputs, &options, |_| Ok(io::sink())).unwrap().run().unwrap();
                    black_box(outcome.summary.steps);
                })
            });
        }
    }

    group.finish();
}

criterion_group!(benches, benchmark_merge);
criterion_main!(benches);
