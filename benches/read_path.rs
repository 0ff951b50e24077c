use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;

// Import our RCU implementation
use rcu_domain::{RcuCell, RcuDomain};

// Benchmark 1: Single-threaded read_lock/unlock overhead
fn bench_single_thread_lock_unlock(c: &mut Criterion) {
    c.bench_function("rcu_domain_single_thread_lock_unlock", |b| {
        let domain = RcuDomain::new();
        let reader = domain.register_reader();

        b.iter(|| {
            let _guard = reader.read_lock();
            black_box(());
        });
    });

    c.bench_function("crossbeam_epoch_single_thread_pin_unpin", |b| {
        b.iter(|| {
            let _guard = crossbeam_epoch::pin();
            black_box(());
        });
    });
}

// Benchmark 2: Dereference inside an already-entered critical section
fn bench_dereference(c: &mut Criterion) {
    c.bench_function("rcu_domain_dereference", |b| {
        let domain = RcuDomain::new();
        let reader = domain.register_reader();
        let cell = RcuCell::new(0u64);

        let guard = reader.read_lock();
        b.iter(|| {
            black_box(cell.dereference(&guard));
        });
    });
}

// Benchmark 3: Full read-side critical section (lock, dereference, unlock)
fn bench_full_read_side(c: &mut Criterion) {
    c.bench_function("rcu_domain_full_read_side", |b| {
        let domain = RcuDomain::new();
        let reader = domain.register_reader();
        let cell = RcuCell::new(vec![0u8; 64]);

        b.iter(|| {
            let guard = reader.read_lock();
            black_box(cell.dereference(&guard)[0]);
        });
    });
}

// Benchmark 4: Multi-threaded reader registration
// 多线程读者注册
fn bench_reader_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("reader_registration");

    for num_readers in [2, 4, 8, 16].iter() {
        group.bench_with_input(
            BenchmarkId::new("rcu_domain", num_readers),
            num_readers,
            |b, &num_readers| {
                b.iter(|| {
                    let domain = RcuDomain::new();
                    let cell = Arc::new(RcuCell::new(0u64));

                    let handles: Vec<_> = (0..num_readers)
                        .map(|_| {
                            let d = domain.clone();
                            let cell = Arc::clone(&cell);
                            thread::spawn(move || {
                                let reader = d.register_reader();
                                let guard = reader.read_lock();
                                black_box(*cell.dereference(&guard));
                            })
                        })
                        .collect();

                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_thread_lock_unlock,
    bench_dereference,
    bench_full_read_side,
    bench_reader_registration
);
criterion_main!(benches);
