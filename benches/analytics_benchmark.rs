use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use analytics_feeder::market::{Candle, Trade, TradeSide};
use analytics_feeder::order_flow::{OrderFlowCalculator, OrderFlowConfig};
use analytics_feeder::timeframe::aggregate;
use analytics_feeder::volume_profile::{compute_volume_profile, VolumeProfileConfig};

const BASE_TS: i64 = 1_736_985_600_000;

fn candles(count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let price = 42_000.0 + (i as f64 * 0.7).sin() * 150.0;
            Candle::new(
                "BTCUSDT",
                BASE_TS + i as i64 * 60_000,
                price,
                price + 25.0,
                price - 25.0,
                price + 5.0,
                100.0 + (i % 17) as f64,
                55.0,
            )
        })
        .collect()
}

fn trades(count: usize) -> Vec<Trade> {
    (0..count)
        .map(|i| {
            let side = if i % 3 == 0 { TradeSide::Sell } else { TradeSide::Buy };
            let quantity = if i % 41 == 0 { 12.0 } else { 0.5 + (i % 7) as f64 * 0.1 };
            Trade::new("BTCUSDT", BASE_TS + i as i64 * 250, 42_000.0 + (i % 11) as f64, quantity, side)
        })
        .collect()
}

fn bench_volume_profile(c: &mut Criterion) {
    let mut group = c.benchmark_group("volume_profile");
    let config = VolumeProfileConfig::default();

    for size in [50, 500, 1440] {
        let window = candles(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("compute", size), &window, |b, window| {
            b.iter(|| compute_volume_profile(black_box("BTCUSDT"), black_box(window), &config))
        });
    }

    group.finish();
}

fn bench_order_flow(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_flow");

    for window_size in [100, 1_000] {
        let window = trades(window_size);
        let config = OrderFlowConfig { window_size, ..Default::default() };
        let mut calculator = OrderFlowCalculator::new(config);
        group.throughput(Throughput::Elements(window_size as u64));
        group.bench_with_input(BenchmarkId::new("compute", window_size), &window, |b, window| {
            b.iter(|| calculator.compute(black_box("BTCUSDT"), black_box(window)))
        });
    }

    group.finish();
}

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");
    let day = candles(1440);
    group.throughput(Throughput::Elements(day.len() as u64));

    for bucket in [5, 60, 240] {
        group.bench_with_input(BenchmarkId::new("aggregate_day", bucket), &bucket, |b, &bucket| {
            b.iter(|| aggregate(black_box(&day), bucket))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_volume_profile, bench_order_flow, bench_aggregation);
criterion_main!(benches);
