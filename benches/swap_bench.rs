use alloy_primitives::{I256, U256, address};
use clmm_replay::math::tick_math::get_sqrt_ratio_at_tick;
use clmm_replay::{CorePool, FeeAmount, PoolConfig};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn laddered_pool() -> CorePool {
    let config = PoolConfig::new(
        address!("0x0000000000000000000000000000000000000001"),
        address!("0x0000000000000000000000000000000000000002"),
        FeeAmount::Medium,
    );
    let mut pool = CorePool::new(
        address!("0x1000000000000000000000000000000000000000"),
        config,
    );
    pool.initialize(get_sqrt_ratio_at_tick(0).unwrap()).unwrap();

    // a ladder of overlapping ranges so swaps cross several ticks
    for (i, width) in (1..=16).zip(std::iter::repeat(60)) {
        let bound = i * width;
        pool.mint("bench", -bound, bound, 1e18 as u128).unwrap();
    }
    pool
}

fn bench_swaps(c: &mut Criterion) {
    let pool = laddered_pool();

    c.bench_function("static_swap_single_tick", |b| {
        let mut pool = pool.clone();
        let amount = I256::from_raw(U256::from(1e15 as u128));
        b.iter(|| black_box(pool.swap(true, black_box(amount), None, true).unwrap()))
    });

    c.bench_function("static_swap_multi_tick", |b| {
        let mut pool = pool.clone();
        let amount = I256::from_raw(U256::from(5e19 as u128));
        b.iter(|| black_box(pool.swap(true, black_box(amount), None, true).unwrap()))
    });

    c.bench_function("committed_swap_round_trip", |b| {
        let mut pool = pool.clone();
        let amount = I256::from_raw(U256::from(1e15 as u128));
        b.iter(|| {
            pool.swap(true, amount, None, false).unwrap();
            black_box(pool.swap(false, amount, None, false).unwrap())
        })
    });
}

criterion_group!(swap_benches, bench_swaps);
criterion_main!(swap_benches);
