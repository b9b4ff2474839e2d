use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use handle_btree::native::{NativeTree, Pos};
use handle_btree::NaturalOrder;
use std::time::Duration;

type Tree = NativeTree<String, u64, NaturalOrder>;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn bench_insert_unique_100k(c: &mut Criterion) {
    c.bench_function("native::insert_unique_100k", |b| {
        b.iter_batched(
            Tree::new,
            |mut t| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    t.insert_unique(key(x), i as u64);
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_multi_100k(c: &mut Criterion) {
    c.bench_function("native::insert_multi_100k_of_1k_keys", |b| {
        b.iter_batched(
            Tree::new,
            |mut t| {
                for (i, x) in lcg(2).take(100_000).enumerate() {
                    t.insert_multi(key(x % 1_000), i as u64);
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_remove_random_10k(c: &mut Criterion) {
    c.bench_function("native::remove_random_10k_of_110k", |b| {
        b.iter_batched(
            || {
                let mut t = Tree::new();
                let positions: Vec<Pos> = lcg(5)
                    .take(110_000)
                    .enumerate()
                    .map(|(i, x)| t.insert_unique(key(x), i as u64).0)
                    .collect();
                // Precompute 10k unique indices via LCG
                let n = positions.len();
                let mut sel = std::collections::HashSet::with_capacity(10_000);
                let mut s = 0x9e3779b97f4a7c15u64;
                while sel.len() < 10_000 {
                    s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
                    sel.insert((s as usize) % n);
                }
                let to_remove: Vec<Pos> = sel.into_iter().map(|i| positions[i]).collect();
                (t, to_remove)
            },
            |(mut t, to_remove)| {
                for p in to_remove {
                    let _ = t.remove(p);
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_find_hit(c: &mut Criterion) {
    c.bench_function("native::find_hit", |b| {
        let mut t = Tree::new();
        let keys: Vec<_> = lcg(7).take(100_000).map(key).collect();
        for (i, k) in keys.iter().cloned().enumerate() {
            t.insert_unique(k, i as u64);
        }
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(t.find(k));
        })
    });
}

fn bench_walk(c: &mut Criterion) {
    c.bench_function("native::walk_next_100k", |b| {
        let mut t = Tree::new();
        for (i, x) in lcg(9).take(100_000).enumerate() {
            t.insert_unique(key(x), i as u64);
        }
        b.iter(|| {
            let mut at = t.begin();
            let mut n = 0usize;
            while let Some(next) = t.next(at) {
                at = next;
                n += 1;
            }
            black_box(n)
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(40)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_insert_unique_100k, bench_insert_multi_100k,
        bench_remove_random_10k, bench_find_hit, bench_walk
}
criterion_main!(benches);
