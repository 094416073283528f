// Streaming dashboard service - pushes a fresh snapshot after every simulator tick
use crate::application::dashboard_service::DashboardService;
use crate::application::metrics_simulator::MetricsSimulator;
use crate::domain::dashboard::NetworkSnapshot;
use tokio::sync::mpsc;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

const STREAM_BUFFER: usize = 16;

#[derive(Clone)]
pub struct StreamingDashboardService {
    simulator: MetricsSimulator,
    dashboard: DashboardService,
}

impl StreamingDashboardService {
    pub fn new(simulator: MetricsSimulator, dashboard: DashboardService) -> Self {
        Self {
            simulator,
            dashboard,
        }
    }

    /// Current snapshot first, then one per tick until the receiver is dropped.
    pub fn stream_dashboard(&self) -> mpsc::Receiver<NetworkSnapshot> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let dashboard = self.dashboard.clone();
        let mut changes = WatchStream::from_changes(self.simulator.subscribe());

        tokio::spawn(async move {
            if tx.send(dashboard.snapshot()).await.is_err() {
                return;
            }

            loop {
                let tick = tokio::select! {
                    _ = tx.closed() => break,
                    next = changes.next() => match next {
                        Some(tick) => tick,
                        None => break,
                    },
                };

                tracing::debug!("Streaming snapshot for tick {}", tick);
                if tx.send(dashboard.snapshot()).await.is_err() {
                    break;
                }
            }
            tracing::debug!("Dashboard subscriber disconnected");
        });

        rx
    }
}
