//! Benchmarks for the ingestion and signal pipelines
//!
//! End-to-end feed throughput, one signal pipeline cycle over a settled
//! store, and snapshot cost while the feed is writing.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use cross_section_engine::core::{MarketUpdate, SectorIndex, UniverseStore};
use cross_section_engine::hot_path::{
    MomentumSignal, SectorNeutralSignal, SignalPipeline, StatsEngine, ZScoreSignal,
};
use cross_section_engine::infrastructure::config::FeedConfig;
use cross_section_engine::ingestion::{MarketFeed, ReplayTickSource, SyntheticTickSource, TickSource};
use std::sync::Arc;

const NUM_ASSETS: usize = 2048;

fn feed_config() -> FeedConfig {
    FeedConfig {
        seed: Some(42),
        ..FeedConfig::default()
    }
}

fn bench_feed_throughput(c: &mut Criterion) {
    const TICKS: usize = 100_000;
    let mut source = SyntheticTickSource::new(NUM_ASSETS, &feed_config());
    let ticks: Vec<MarketUpdate> = (0..TICKS).filter_map(|_| source.next_tick()).collect();

    let mut group = c.benchmark_group("feed");
    group.sample_size(10);
    group.throughput(Throughput::Elements(TICKS as u64));

    group.bench_function("replay_100k", |b| {
        b.iter_batched(
            || ReplayTickSource::new(ticks.clone()),
            |replay| {
                let store = Arc::new(UniverseStore::new(NUM_ASSETS));
                let mut feed = MarketFeed::new(store, 4096, replay).unwrap();
                feed.start().unwrap();
                while feed.updates_processed() < TICKS as u64 {
                    std::thread::yield_now();
                }
                feed.stop();
            },
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

fn bench_signal_pipeline(c: &mut Criterion) {
    let store = Arc::new(UniverseStore::new(NUM_ASSETS));
    let mut source = SyntheticTickSource::new(NUM_ASSETS, &feed_config());
    store.write(|w| {
        for _ in 0..NUM_ASSETS * 4 {
            if let Some(tick) = source.next_tick() {
                w.apply(&tick);
            }
        }
    });

    let assignments = SectorIndex::random_assignments(NUM_ASSETS, 10, 7);
    let index = Arc::new(SectorIndex::new(NUM_ASSETS, 10, &assignments).unwrap());

    let mut group = c.benchmark_group("signal_pipeline");
    group.throughput(Throughput::Elements(NUM_ASSETS as u64));

    group.bench_function("zscore", |b| {
        let mut engine = StatsEngine::new(Arc::clone(&store));
        let mut pipeline = SignalPipeline::new().with(ZScoreSignal);
        let mut z = vec![0.0f32; NUM_ASSETS];
        b.iter(|| engine.run_pipeline(&mut pipeline, &mut [&mut z[..]]))
    });

    group.bench_function("zscore_momentum_sector_neutral", |b| {
        let mut engine = StatsEngine::new(Arc::clone(&store));
        let mut pipeline = SignalPipeline::new()
            .with(ZScoreSignal)
            .with(MomentumSignal)
            .with(SectorNeutralSignal::new(Arc::clone(&index)));
        let mut z = vec![0.0f32; NUM_ASSETS];
        let mut m = vec![0.0f32; NUM_ASSETS];
        let mut s = vec![0.0f32; NUM_ASSETS];
        b.iter(|| engine.run_pipeline(&mut pipeline, &mut [&mut z[..], &mut m[..], &mut s[..]]))
    });
    group.finish();
}

fn bench_snapshot_under_writes(c: &mut Criterion) {
    let store = Arc::new(UniverseStore::new(NUM_ASSETS));
    let source = SyntheticTickSource::new(NUM_ASSETS, &feed_config());
    let mut feed = MarketFeed::new(Arc::clone(&store), 4096, source).unwrap();
    let mut engine = StatsEngine::new(Arc::clone(&store));
    let mut out = vec![0.0f32; NUM_ASSETS];

    feed.start().unwrap();
    c.bench_function("zscores_while_feeding", |b| b.iter(|| engine.zscores(&mut out)));
    feed.stop();
}

criterion_group!(
    benches,
    bench_feed_throughput,
    bench_signal_pipeline,
    bench_snapshot_under_writes
);
criterion_main!(benches);
