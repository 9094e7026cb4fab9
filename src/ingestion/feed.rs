//! Two-thread ingestion pipeline
//!
//! producer thread: TickSource -> ring buffer
//! consumer thread: ring buffer -> UniverseStore (sole store writer)
//!
//! `stop()` joins the producer first, then tells the consumer to drain
//! whatever is still queued and exit. When it returns, no further store
//! mutation can happen.

use super::source::TickSource;
use crate::core::{Consumer, MarketUpdate, Producer, QueueGauge, RingBuffer, UniverseStore};
use crate::infrastructure::config::{BackpressurePolicy, IdlePolicy};
use crate::infrastructure::metrics::MetricsCollector;
use crate::{log_feed, Result, XsError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::Level;

type BoxedSource = Box<dyn TickSource>;

/// Flags shared between the feed handle and its threads
struct Lifecycle {
    /// Producer keeps publishing while set
    running: AtomicBool,
    /// Set once the producer has been joined
    producer_done: AtomicBool,
}

/// Producer/consumer pipeline feeding one store
pub struct MarketFeed {
    store: Arc<UniverseStore>,
    metrics: Arc<MetricsCollector>,
    gauge: QueueGauge<MarketUpdate>,
    backpressure: BackpressurePolicy,
    idle: IdlePolicy,
    lifecycle: Arc<Lifecycle>,
    /// Queue ends and source while stopped; moved into the threads on start
    parked: Option<(Producer<MarketUpdate>, Consumer<MarketUpdate>, BoxedSource)>,
    producer_thread: Option<JoinHandle<(Producer<MarketUpdate>, BoxedSource)>>,
    consumer_thread: Option<JoinHandle<Consumer<MarketUpdate>>>,
}

impl MarketFeed {
    /// Build a stopped feed with a queue of `queue_capacity` ticks
    ///
    /// # Errors
    /// Returns `InvalidCapacity` when `queue_capacity` is zero.
    pub fn new(
        store: Arc<UniverseStore>,
        queue_capacity: usize,
        source: impl TickSource + 'static,
    ) -> Result<Self> {
        let (producer, consumer) = RingBuffer::with_capacity(queue_capacity)?;
        let gauge = producer.gauge();
        let metrics = Arc::new(MetricsCollector::new());
        metrics.attach_queue(gauge.clone());

        Ok(Self {
            store,
            metrics,
            gauge,
            backpressure: BackpressurePolicy::default(),
            idle: IdlePolicy::default(),
            lifecycle: Arc::new(Lifecycle {
                running: AtomicBool::new(false),
                producer_done: AtomicBool::new(false),
            }),
            parked: Some((producer, consumer, Box::new(source))),
            producer_thread: None,
            consumer_thread: None,
        })
    }

    /// Report into a shared collector instead of a private one
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        metrics.attach_queue(self.gauge.clone());
        self.metrics = metrics;
        self
    }

    pub fn with_backpressure(mut self, policy: BackpressurePolicy) -> Self {
        self.backpressure = policy;
        self
    }

    pub fn with_idle(mut self, policy: IdlePolicy) -> Self {
        self.idle = policy;
        self
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn is_running(&self) -> bool {
        self.producer_thread.is_some() || self.consumer_thread.is_some()
    }

    /// Spawn the producer and consumer threads
    ///
    /// No-op if already running.
    ///
    /// # Errors
    /// `Thread` if a thread cannot be spawned or a previous run panicked and
    /// lost the queue ends.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            log_feed!(Level::WARN, "Market feed already running");
            return Ok(());
        }

        let (producer, consumer, source) = self
            .parked
            .take()
            .ok_or_else(|| XsError::Thread("feed queue lost by a panicked thread".into()))?;

        self.lifecycle.running.store(true, Ordering::Release);
        self.lifecycle.producer_done.store(false, Ordering::Release);

        let producer_thread = {
            let lifecycle = Arc::clone(&self.lifecycle);
            let metrics = Arc::clone(&self.metrics);
            let policy = self.backpressure;
            thread::Builder::new()
                .name("feed-producer".into())
                .spawn(move || producer_loop(producer, source, &lifecycle, &metrics, policy))
                .map_err(|e| XsError::Thread(format!("spawn producer: {}", e)))?
        };

        let consumer_thread = {
            let lifecycle = Arc::clone(&self.lifecycle);
            let metrics = Arc::clone(&self.metrics);
            let store = Arc::clone(&self.store);
            let idle = self.idle;
            thread::Builder::new()
                .name("feed-consumer".into())
                .spawn(move || consumer_loop(consumer, &store, &lifecycle, &metrics, idle))
        };

        self.producer_thread = Some(producer_thread);
        match consumer_thread {
            Ok(handle) => self.consumer_thread = Some(handle),
            Err(e) => {
                // Nothing would ever drain the queue; take the producer down too.
                self.stop();
                return Err(XsError::Thread(format!("spawn consumer: {}", e)));
            }
        }

        log_feed!(
            Level::INFO,
            queue_capacity = self.gauge.capacity(),
            backpressure = ?self.backpressure,
            idle = ?self.idle,
            "Market feed started"
        );
        Ok(())
    }

    /// Stop both threads and wait for them to exit
    ///
    /// Idempotent. Ticks already queued are applied before the consumer
    /// exits.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }

        self.lifecycle.running.store(false, Ordering::Release);

        let producer_ends = self.producer_thread.take().and_then(|h| match h.join() {
            Ok(ends) => Some(ends),
            Err(_) => {
                log_feed!(Level::ERROR, "Producer thread panicked");
                None
            }
        });

        self.lifecycle.producer_done.store(true, Ordering::Release);

        let consumer = match self.consumer_thread.take().map(|h| h.join()) {
            Some(Ok(consumer)) => Some(consumer),
            Some(Err(_)) => {
                log_feed!(Level::ERROR, "Consumer thread panicked");
                None
            }
            None => None,
        };

        self.parked = match (producer_ends, consumer) {
            (Some((producer, source)), Some(consumer)) => Some((producer, consumer, source)),
            _ => {
                log_feed!(Level::ERROR, "Feed queue ends lost; restart disabled");
                None
            }
        };

        log_feed!(
            Level::INFO,
            updates_processed = self.metrics.updates_processed(),
            queue_depth = self.gauge.depth(),
            "Market feed stopped"
        );
    }

    /// Approximate number of queued ticks
    #[inline]
    pub fn queue_depth(&self) -> usize {
        self.gauge.depth()
    }

    #[inline]
    pub fn queue_capacity(&self) -> usize {
        self.gauge.capacity()
    }

    /// Ticks applied to the store so far
    #[inline]
    pub fn updates_processed(&self) -> u64 {
        self.metrics.updates_processed()
    }

    /// Read the queue depth and fold it into the max-depth gauge
    pub fn sample_queue_depth(&self) -> usize {
        let depth = self.gauge.depth();
        self.metrics.observe_queue_depth(depth);
        depth
    }
}

impl Drop for MarketFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for MarketFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketFeed")
            .field("running", &self.is_running())
            .field("queue_depth", &self.queue_depth())
            .field("queue_capacity", &self.queue_capacity())
            .field("backpressure", &self.backpressure)
            .field("idle", &self.idle)
            .finish()
    }
}

fn producer_loop(
    mut producer: Producer<MarketUpdate>,
    mut source: BoxedSource,
    lifecycle: &Lifecycle,
    metrics: &MetricsCollector,
    policy: BackpressurePolicy,
) -> (Producer<MarketUpdate>, BoxedSource) {
    'publish: while lifecycle.running.load(Ordering::Acquire) {
        let Some(update) = source.next_tick() else {
            log_feed!(Level::INFO, "Tick source exhausted");
            break;
        };

        match policy {
            BackpressurePolicy::SpinYield => {
                while !producer.push(update) {
                    if !lifecycle.running.load(Ordering::Acquire) {
                        break 'publish;
                    }
                    metrics.record_full_spin();
                    thread::yield_now();
                }
                metrics.record_published();
            }
            BackpressurePolicy::Drop => {
                if producer.push(update) {
                    metrics.record_published();
                } else {
                    metrics.record_dropped();
                }
            }
        }
    }
    (producer, source)
}

fn consumer_loop(
    mut consumer: Consumer<MarketUpdate>,
    store: &UniverseStore,
    lifecycle: &Lifecycle,
    metrics: &MetricsCollector,
    idle: IdlePolicy,
) -> Consumer<MarketUpdate> {
    loop {
        if let Some(update) = consumer.pop() {
            store.apply(&update);
            metrics.record_update();
            continue;
        }

        if lifecycle.producer_done.load(Ordering::Acquire) {
            // Everything the producer pushed is visible now.
            while let Some(update) = consumer.pop() {
                store.apply(&update);
                metrics.record_update();
            }
            break;
        }

        match idle {
            IdlePolicy::Yield => thread::yield_now(),
            IdlePolicy::BusySpin => std::hint::spin_loop(),
        }
    }
    consumer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Quote;
    use crate::ingestion::source::{ReplayTickSource, SyntheticTickSource};
    use crate::infrastructure::config::FeedConfig;
    use proptest::prelude::*;
    use std::time::{Duration, Instant};

    fn wait_for_updates(feed: &MarketFeed, count: u64) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while feed.updates_processed() < count {
            assert!(Instant::now() < deadline, "feed stalled");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_zero_queue_capacity_rejected() {
        let store = Arc::new(UniverseStore::new(4));
        let result = MarketFeed::new(store, 0, ReplayTickSource::new(Vec::new()));
        assert!(matches!(result, Err(XsError::InvalidCapacity { .. })));
    }

    #[test]
    fn test_last_write_wins() {
        let store = Arc::new(UniverseStore::new(4));
        let ticks = vec![
            MarketUpdate::new(2, 10.0, 1.0, 9.9, 10.1),
            MarketUpdate::new(0, 5.0, 3.0, 4.9, 5.1),
            MarketUpdate::new(2, 11.0, 2.0, 10.9, 11.1),
        ];
        let mut feed = MarketFeed::new(Arc::clone(&store), 2, ReplayTickSource::new(ticks)).unwrap();

        feed.start().unwrap();
        wait_for_updates(&feed, 3);
        feed.stop();

        assert_eq!(
            store.quote(2),
            Some(Quote {
                price: 11.0,
                volume: 2.0,
                bid: 10.9,
                ask: 11.1
            })
        );
        assert_eq!(store.quote(0).map(|q| q.price), Some(5.0));
        assert_eq!(store.quote(1).map(|q| q.price), Some(0.0));
    }

    #[test]
    fn test_out_of_range_ticks_leave_store_unchanged() {
        let store = Arc::new(UniverseStore::new(2));
        let ticks = vec![
            MarketUpdate::new(1, 7.0, 1.0, 6.9, 7.1),
            MarketUpdate::new(2, 99.0, 1.0, 98.9, 99.1),
            MarketUpdate::new(u32::MAX, 99.0, 1.0, 98.9, 99.1),
        ];
        let mut feed = MarketFeed::new(Arc::clone(&store), 8, ReplayTickSource::new(ticks)).unwrap();

        feed.start().unwrap();
        wait_for_updates(&feed, 3);
        feed.stop();

        let mut prices = [0.0f32; 2];
        store.copy_prices(&mut prices);
        assert_eq!(prices, [0.0, 7.0]);
    }

    #[test]
    fn test_stop_is_idempotent_and_restartable() {
        let store = Arc::new(UniverseStore::new(8));
        let config = FeedConfig {
            seed: Some(11),
            ..FeedConfig::default()
        };
        let mut feed =
            MarketFeed::new(Arc::clone(&store), 64, SyntheticTickSource::new(8, &config)).unwrap();

        feed.stop();
        feed.start().unwrap();
        feed.start().unwrap();
        wait_for_updates(&feed, 100);
        feed.stop();
        assert!(!feed.is_running());

        // No writer remains: the store is frozen
        let sequence = store.seqlock().sequence();
        let processed = feed.updates_processed();
        thread::sleep(Duration::from_millis(5));
        assert_eq!(store.seqlock().sequence(), sequence);
        assert_eq!(sequence % 2, 0);

        feed.start().unwrap();
        wait_for_updates(&feed, processed + 100);
        feed.stop();
    }

    #[test]
    fn test_drop_policy_counts_discarded_ticks() {
        let store = Arc::new(UniverseStore::new(4));
        let ticks: Vec<MarketUpdate> = (0..5_000)
            .map(|i| MarketUpdate::new(i % 4, i as f32, 1.0, 0.0, 0.0))
            .collect();
        let mut feed = MarketFeed::new(Arc::clone(&store), 1, ReplayTickSource::new(ticks))
            .unwrap()
            .with_backpressure(BackpressurePolicy::Drop)
            .with_idle(IdlePolicy::BusySpin);

        feed.start().unwrap();
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let snap = feed.metrics().snapshot();
            if snap.ticks_published + snap.ticks_dropped == 5_000 {
                break;
            }
            assert!(Instant::now() < deadline, "producer stalled");
            thread::sleep(Duration::from_millis(1));
        }
        feed.stop();

        let snap = feed.metrics().snapshot();
        assert_eq!(snap.updates_processed, snap.ticks_published);
        assert_eq!(feed.queue_depth(), 0);
    }

    #[test]
    fn test_shared_metrics_see_queue() {
        let store = Arc::new(UniverseStore::new(4));
        let metrics = Arc::new(MetricsCollector::new());
        let feed = MarketFeed::new(store, 16, ReplayTickSource::new(Vec::new()))
            .unwrap()
            .with_metrics(Arc::clone(&metrics));

        assert_eq!(feed.queue_capacity(), 16);
        assert_eq!(feed.sample_queue_depth(), 0);
        assert_eq!(metrics.snapshot().queue_capacity, 16);
    }

    const REPLAY_ASSETS: u32 = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_store_holds_last_tick_per_asset(
            raw in proptest::collection::vec(
                (0..REPLAY_ASSETS, 1.0f32..1000.0, 0.0f32..100.0),
                1..4000,
            ),
            queue_capacity in 1usize..=4,
        ) {
            let ticks: Vec<MarketUpdate> = raw
                .iter()
                .map(|&(id, price, volume)| {
                    MarketUpdate::new(id, price, volume, price - 0.5, price + 0.5)
                })
                .collect();

            let mut expected = [Quote::default(); REPLAY_ASSETS as usize];
            for tick in &ticks {
                expected[tick.asset_id as usize] = Quote {
                    price: tick.price,
                    volume: tick.volume,
                    bid: tick.bid,
                    ask: tick.ask,
                };
            }

            let store = Arc::new(UniverseStore::new(REPLAY_ASSETS as usize));
            let count = ticks.len() as u64;
            let mut feed = MarketFeed::new(
                Arc::clone(&store),
                queue_capacity,
                ReplayTickSource::new(ticks),
            )
            .unwrap();

            feed.start().unwrap();
            wait_for_updates(&feed, count);
            feed.stop();

            prop_assert_eq!(feed.updates_processed(), count);
            for (id, quote) in expected.iter().enumerate() {
                prop_assert_eq!(store.quote(id as u32), Some(*quote));
            }
        }
    }
}
