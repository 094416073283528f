// Dashboard domain model - render-ready view of the simulated network
use super::telemetry::{BandwidthSample, LatencySummary, ScalarSample, Status};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandwidthView {
    pub upload: f64,
    pub download: f64,
    pub status: Status,
    pub history: Vec<BandwidthSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyView {
    #[serde(flatten)]
    pub summary: LatencySummary,
    pub status: Status,
    pub history: Vec<ScalarSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketLossView {
    pub current: f64,
    pub status: Status,
    pub history: Vec<ScalarSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSnapshot {
    pub ticks: u64,
    pub bandwidth: BandwidthView,
    pub latency: LatencyView,
    pub packet_loss: PacketLossView,
}
