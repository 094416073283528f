// Application layer - Use cases over the domain
pub mod chat_session;
pub mod completion_service;
pub mod dashboard_service;
pub mod metrics_simulator;
pub mod streaming_service;
