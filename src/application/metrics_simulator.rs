// Metrics simulator - synthetic bandwidth, latency and packet loss on a fixed period
use crate::domain::telemetry::{
    BandwidthSample, HistoryBuffer, LatencySummary, Metric, ScalarSample, Status,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Source of sample timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Drives the simulation loop. Returns `false` once no more ticks will come.
#[async_trait]
pub trait Ticker: Send {
    async fn tick(&mut self) -> bool;
}

/// Wall-clock ticker. The first tick fires one full period after creation.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

struct SimulatorState {
    rng: fastrand::Rng,
    bandwidth: HistoryBuffer<BandwidthSample>,
    latency: HistoryBuffer<ScalarSample>,
    packet_loss: HistoryBuffer<ScalarSample>,
    ticks: u64,
}

/// Consistent copy of the simulator state. Histories are oldest first.
#[derive(Debug, Clone)]
pub struct MetricsReading {
    pub ticks: u64,
    pub bandwidth: Vec<BandwidthSample>,
    pub latency: Vec<ScalarSample>,
    pub packet_loss: Vec<ScalarSample>,
    pub latency_summary: LatencySummary,
}

impl MetricsReading {
    /// Most recent value for `metric`, `None` before the first tick.
    pub fn current_value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::BandwidthUpload => self.bandwidth.last().map(|s| s.upload),
            Metric::BandwidthDownload => self.bandwidth.last().map(|s| s.download),
            Metric::Latency => self.latency.last().map(|s| s.value),
            Metric::PacketLoss => self.packet_loss.last().map(|s| s.value),
        }
    }

    pub fn status(&self, metric: Metric) -> Status {
        self.current_value(metric)
            .map(|value| Status::classify(metric, value))
            .unwrap_or(Status::Success)
    }
}

#[derive(Clone)]
pub struct MetricsSimulator {
    state: Arc<Mutex<SimulatorState>>,
    clock: Arc<dyn Clock>,
    tick_tx: Arc<watch::Sender<u64>>,
}

impl MetricsSimulator {
    pub fn new(history_cap: usize, clock: Arc<dyn Clock>, rng: fastrand::Rng) -> Self {
        let (tick_tx, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(SimulatorState {
                rng,
                bandwidth: HistoryBuffer::new(history_cap),
                latency: HistoryBuffer::new(history_cap),
                packet_loss: HistoryBuffer::new(history_cap),
                ticks: 0,
            })),
            clock,
            tick_tx: Arc::new(tick_tx),
        }
    }

    /// Generate one sample per metric and append it to its history.
    pub fn tick(&self) {
        let mut state = self.lock_state();
        self.tick_locked(&mut state);
    }

    fn tick_locked(&self, state: &mut SimulatorState) {
        let time = self.clock.now();
        let upload = state.rng.f64() * Metric::BandwidthUpload.max();
        let download = state.rng.f64() * Metric::BandwidthDownload.max();
        let latency = state.rng.f64() * Metric::Latency.max();
        let packet_loss = state.rng.f64() * Metric::PacketLoss.max();

        state.bandwidth.push(BandwidthSample::new(time, upload, download));
        state.latency.push(ScalarSample::new(time, latency));
        state.packet_loss.push(ScalarSample::new(time, packet_loss));
        state.ticks += 1;

        tracing::debug!(
            "Tick {}: up={:.1} down={:.1} latency={:.1} loss={:.2}",
            state.ticks, upload, download, latency, packet_loss
        );

        self.tick_tx.send_replace(state.ticks);
    }

    /// Histories, tick count and latency summary, all taken under one lock.
    pub fn reading(&self) -> MetricsReading {
        let state = self.lock_state();
        MetricsReading {
            ticks: state.ticks,
            bandwidth: state.bandwidth.to_vec(),
            latency: state.latency.to_vec(),
            packet_loss: state.packet_loss.to_vec(),
            latency_summary: LatencySummary::from_history(&state.latency),
        }
    }

    /// Receiver that observes the tick count after every tick.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tick_tx.subscribe()
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.tick_tx.receiver_count()
    }

    /// Spawn the periodic generation loop driven by `ticker`.
    pub fn start<T: Ticker + 'static>(&self, mut ticker: T) -> SimulationHandle {
        let running = Arc::new(AtomicBool::new(true));
        let simulator = self.clone();
        let task_running = running.clone();

        let task = tokio::spawn(async move {
            tracing::info!("Metrics simulation started");
            while ticker.tick().await {
                let mut state = simulator.lock_state();
                if !task_running.load(Ordering::Acquire) {
                    break;
                }
                simulator.tick_locked(&mut state);
            }
            tracing::debug!("Metrics simulation loop exited");
        });

        SimulationHandle {
            simulator: self.clone(),
            running,
            task,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SimulatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Running simulation. Stopping (or dropping) the handle ends generation.
pub struct SimulationHandle {
    simulator: MetricsSimulator,
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SimulationHandle {
    /// No tick is generated after this returns. Safe to call more than once.
    pub fn stop(&self) {
        // Ticks check the flag under the state lock, so flipping it under the
        // same lock rules out a tick that is already past the check.
        let _state = self.simulator.lock_state();
        if self.running.swap(false, Ordering::AcqRel) {
            tracing::info!("Metrics simulation stopped");
        }
        self.task.abort();
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::AtomicI64;
    use tokio::sync::mpsc;

    const SEED: u64 = 7;

    /// Advances one second per reading.
    #[derive(Default)]
    struct StepClock {
        secs: AtomicI64,
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let secs = self.secs.fetch_add(1, Ordering::SeqCst);
            Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
        }
    }

    struct ChannelTicker {
        rx: mpsc::Receiver<()>,
    }

    #[async_trait]
    impl Ticker for ChannelTicker {
        async fn tick(&mut self) -> bool {
            self.rx.recv().await.is_some()
        }
    }

    fn simulator() -> MetricsSimulator {
        MetricsSimulator::new(50, Arc::new(StepClock::default()), fastrand::Rng::with_seed(SEED))
    }

    /// Replays the draws the simulator makes for `n` ticks: upload, download, latency, loss.
    fn expected_draws(n: usize) -> Vec<[f64; 4]> {
        let mut rng = fastrand::Rng::with_seed(SEED);
        (0..n)
            .map(|_| {
                [
                    rng.f64() * 100.0,
                    rng.f64() * 200.0,
                    rng.f64() * 100.0,
                    rng.f64() * 2.0,
                ]
            })
            .collect()
    }

    #[test]
    fn test_history_holds_most_recent_ticks_in_order() {
        for n in [0usize, 1, 49, 50, 51, 137] {
            let simulator = simulator();
            for _ in 0..n {
                simulator.tick();
            }

            let expected: Vec<[f64; 4]> = expected_draws(n).into_iter().skip(n.saturating_sub(50)).collect();
            let MetricsReading {
                bandwidth,
                latency,
                packet_loss: loss,
                ..
            } = simulator.reading();

            assert_eq!(bandwidth.len(), n.min(50));
            assert_eq!(latency.len(), n.min(50));
            assert_eq!(loss.len(), n.min(50));

            for (i, draw) in expected.iter().enumerate() {
                assert_eq!(bandwidth[i].upload, draw[0]);
                assert_eq!(bandwidth[i].download, draw[1]);
                assert_eq!(latency[i].value, draw[2]);
                assert_eq!(loss[i].value, draw[3]);
            }
            assert!(latency.windows(2).all(|w| w[0].time < w[1].time));
        }
    }

    #[test]
    fn test_values_stay_in_range() {
        let simulator = MetricsSimulator::new(50, Arc::new(SystemClock), fastrand::Rng::new());
        for _ in 0..500 {
            simulator.tick();
            let reading = simulator.reading();
            for metric in Metric::ALL {
                let value = reading.current_value(metric).unwrap();
                assert!(value >= 0.0 && value < metric.max(), "{:?} out of range: {}", metric, value);
            }
        }
    }

    #[test]
    fn test_current_value_and_status_track_latest_sample() {
        let simulator = simulator();
        let reading = simulator.reading();
        assert_eq!(reading.current_value(Metric::Latency), None);
        assert_eq!(reading.status(Metric::Latency), Status::Success);

        simulator.tick();
        simulator.tick();

        let latest = expected_draws(2)[1];
        let reading = simulator.reading();
        assert_eq!(reading.current_value(Metric::BandwidthUpload), Some(latest[0]));
        assert_eq!(reading.current_value(Metric::PacketLoss), Some(latest[3]));
        assert_eq!(
            reading.status(Metric::PacketLoss),
            Status::classify(Metric::PacketLoss, latest[3])
        );
        // Simulated latency never exceeds 100 ms.
        assert_eq!(reading.status(Metric::Latency), Status::Success);
        assert_eq!(reading.latency_summary.current, latest[2]);
        assert_eq!(reading.ticks, 2);
    }

    #[tokio::test]
    async fn test_started_simulation_ticks_and_stops() {
        let simulator = simulator();
        let mut ticks = simulator.subscribe();
        let (tx, rx) = mpsc::channel(8);
        let handle = simulator.start(ChannelTicker { rx });

        for expected in 1..=3u64 {
            tx.send(()).await.unwrap();
            ticks.changed().await.unwrap();
            assert_eq!(*ticks.borrow_and_update(), expected);
        }

        handle.stop();
        handle.stop();

        let _ = tx.send(()).await;
        let _ = tx.send(()).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        let reading = simulator.reading();
        assert_eq!(reading.ticks, 3);
        assert_eq!(reading.latency.len(), 3);
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_simulation() {
        let simulator = simulator();
        let (tx, rx) = mpsc::channel(8);
        drop(simulator.start(ChannelTicker { rx }));

        let _ = tx.send(()).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(simulator.reading().ticks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticker_waits_one_period() {
        let mut ticker = IntervalTicker::new(Duration::from_millis(2000));
        let started = Instant::now();
        assert!(ticker.tick().await);
        assert!(started.elapsed() >= Duration::from_millis(2000));
    }
}
