// Domain layer - Core types with no I/O
pub mod chat;
pub mod dashboard;
pub mod enhancement;
pub mod telemetry;
