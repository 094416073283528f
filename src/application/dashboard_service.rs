// Dashboard service - Use case for building the network snapshot
use crate::application::metrics_simulator::MetricsSimulator;
use crate::domain::dashboard::{BandwidthView, LatencyView, NetworkSnapshot, PacketLossView};
use crate::domain::telemetry::Metric;

#[derive(Clone)]
pub struct DashboardService {
    simulator: MetricsSimulator,
}

impl DashboardService {
    pub fn new(simulator: MetricsSimulator) -> Self {
        Self { simulator }
    }

    pub fn snapshot(&self) -> NetworkSnapshot {
        let reading = self.simulator.reading();
        let status = |metric| reading.status(metric);
        let current = |metric| reading.current_value(metric).unwrap_or_default();

        let bandwidth = BandwidthView {
            upload: current(Metric::BandwidthUpload),
            download: current(Metric::BandwidthDownload),
            status: status(Metric::BandwidthDownload),
            history: reading.bandwidth.clone(),
        };

        let latency = LatencyView {
            summary: reading.latency_summary,
            status: status(Metric::Latency),
            history: reading.latency.clone(),
        };

        let packet_loss = PacketLossView {
            current: current(Metric::PacketLoss),
            status: status(Metric::PacketLoss),
            history: reading.packet_loss.clone(),
        };

        NetworkSnapshot {
            ticks: reading.ticks,
            bandwidth,
            latency,
            packet_loss,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::metrics_simulator::SystemClock;
    use crate::domain::telemetry::Status;
    use std::sync::Arc;

    fn service() -> (MetricsSimulator, DashboardService) {
        let simulator = MetricsSimulator::new(50, Arc::new(SystemClock), fastrand::Rng::with_seed(3));
        (simulator.clone(), DashboardService::new(simulator))
    }

    #[test]
    fn test_snapshot_before_first_tick_is_empty() {
        let (_, service) = service();
        let snapshot = service.snapshot();

        assert_eq!(snapshot.ticks, 0);
        assert_eq!(snapshot.bandwidth.upload, 0.0);
        assert!(snapshot.latency.history.is_empty());
        assert_eq!(snapshot.packet_loss.status, Status::Success);
    }

    #[test]
    fn test_snapshot_reflects_simulator() {
        let (simulator, service) = service();
        for _ in 0..60 {
            simulator.tick();
        }

        let snapshot = service.snapshot();
        assert_eq!(snapshot.ticks, 60);
        assert_eq!(snapshot.bandwidth.history.len(), 50);
        assert_eq!(snapshot.latency.history.len(), 50);
        assert_eq!(
            Some(snapshot.packet_loss.current),
            simulator.reading().current_value(Metric::PacketLoss)
        );
        assert_eq!(
            snapshot.packet_loss.status,
            Status::classify(Metric::PacketLoss, snapshot.packet_loss.current)
        );
        assert!(snapshot.latency.summary.min <= snapshot.latency.summary.average);
        assert!(snapshot.latency.summary.average <= snapshot.latency.summary.max);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let (simulator, service) = service();
        simulator.tick();

        let json = serde_json::to_value(service.snapshot()).unwrap();
        assert!(json["bandwidth"]["history"][0]["upload"].is_f64());
        assert!(json["latency"]["average"].is_f64());
        assert!(json["packetLoss"]["history"][0]["value"].is_f64());
        assert_eq!(json["latency"]["status"], "success");
    }

    #[test]
    fn test_snapshot_is_consistent_while_ticking() {
        let (simulator, service) = service();
        let ticking = std::thread::spawn(move || {
            for _ in 0..2_000 {
                simulator.tick();
            }
        });

        loop {
            let done = ticking.is_finished();
            let snapshot = service.snapshot();
            let expected_len = (snapshot.ticks as usize).min(50);
            assert_eq!(snapshot.bandwidth.history.len(), expected_len);
            assert_eq!(snapshot.latency.history.len(), expected_len);
            assert_eq!(snapshot.packet_loss.history.len(), expected_len);

            if let Some(last) = snapshot.packet_loss.history.last() {
                assert_eq!(snapshot.packet_loss.current, last.value);
            }
            if let Some(last) = snapshot.latency.history.last() {
                assert_eq!(snapshot.latency.summary.current, last.value);
                assert_eq!(snapshot.latency.history[0].time, snapshot.bandwidth.history[0].time);
                assert_eq!(last.time, snapshot.packet_loss.history[expected_len - 1].time);
            }
            if let Some(last) = snapshot.bandwidth.history.last() {
                assert_eq!(snapshot.bandwidth.upload, last.upload);
                assert_eq!(snapshot.bandwidth.download, last.download);
            }

            if done {
                assert_eq!(snapshot.ticks, 2_000);
                break;
            }
        }
        ticking.join().unwrap();
    }
}
