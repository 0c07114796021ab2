use blockstream_core::task::TaskRuntime;
use blockstream_merkle::{ConcurrentStreamingTreeHasher, NaiveStreamingTreeHasher, StreamingTreeHasher};
use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

fn leaves(count: usize) -> Vec<Bytes> {
    (0..count).map(|i| Bytes::from(vec![(i % 251) as u8; 256])).collect()
}

pub fn bench_tree_hashers(c: &mut Criterion) {
    let runtime = TaskRuntime::with_available_cores().unwrap();
    let executor = runtime.executor();
    let mut group = c.benchmark_group("streaming tree hasher");
    for count in [1_000, 10_000, 100_000] {
        let leaves = leaves(count);
        group.bench_with_input(BenchmarkId::new("naive", count), &leaves, |b, leaves| {
            b.iter(|| {
                let mut hasher = NaiveStreamingTreeHasher::new();
                for leaf in leaves {
                    hasher.add_leaf(leaf.clone()).unwrap();
                }
                black_box(hasher.finalize().unwrap())
            })
        });
        group.bench_with_input(BenchmarkId::new("concurrent", count), &leaves, |b, leaves| {
            b.iter(|| {
                let mut hasher = ConcurrentStreamingTreeHasher::new(executor.clone());
                for leaf in leaves {
                    hasher.add_leaf(leaf.clone()).unwrap();
                }
                black_box(executor.block_on(hasher.root_hash().unwrap()).unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tree_hashers);
criterion_main!(benches);
