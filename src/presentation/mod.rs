// Presentation layer - HTTP handlers for the rendering surface
pub mod app_state;
pub mod handlers;
