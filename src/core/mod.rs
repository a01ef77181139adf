pub mod config;
pub mod event;
pub mod event_source;
pub mod stream_bridge;
