// Telemetry domain models - samples, bounded histories and status
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Number of samples kept per metric unless configured otherwise.
pub const DEFAULT_HISTORY_CAP: usize = 50;

/// The metrics the dashboard tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    BandwidthUpload,
    BandwidthDownload,
    Latency,
    PacketLoss,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::BandwidthUpload,
        Metric::BandwidthDownload,
        Metric::Latency,
        Metric::PacketLoss,
    ];

    /// Exclusive upper bound of the uniform draw. Every range starts at zero.
    pub fn max(self) -> f64 {
        match self {
            Metric::BandwidthUpload => 100.0,
            Metric::BandwidthDownload => 200.0,
            Metric::Latency => 100.0,
            Metric::PacketLoss => 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Warning,
    Error,
}

impl Status {
    /// Latency above 100 ms is a warning, packet loss above 1 % an error.
    pub fn classify(metric: Metric, value: f64) -> Self {
        match metric {
            Metric::Latency if value > 100.0 => Status::Warning,
            Metric::PacketLoss if value > 1.0 => Status::Error,
            _ => Status::Success,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandwidthSample {
    pub time: DateTime<Utc>,
    pub upload: f64,
    pub download: f64,
}

impl BandwidthSample {
    pub fn new(time: DateTime<Utc>, upload: f64, download: f64) -> Self {
        Self {
            time,
            upload,
            download,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScalarSample {
    pub time: DateTime<Utc>,
    pub value: f64,
}

impl ScalarSample {
    pub fn new(time: DateTime<Utc>, value: f64) -> Self {
        Self { time, value }
    }
}

/// Fixed-capacity FIFO of samples, oldest first.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    samples: VecDeque<T>,
    cap: usize,
}

impl<T: Clone> HistoryBuffer<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(cap),
            cap,
        }
    }

    /// Append the newest sample, evicting from the front past the cap.
    pub fn push(&mut self, sample: T) {
        if self.cap == 0 {
            return;
        }
        while self.samples.len() >= self.cap {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn latest(&self) -> Option<&T> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.samples.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub current: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

impl LatencySummary {
    pub fn from_history(history: &HistoryBuffer<ScalarSample>) -> Self {
        if history.is_empty() {
            return Self::default();
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for sample in history.iter() {
            min = min.min(sample.value);
            max = max.max(sample.value);
            sum += sample.value;
        }

        Self {
            current: history.latest().map(|s| s.value).unwrap_or_default(),
            average: sum / history.len() as f64,
            min,
            max,
        }
    }
}
