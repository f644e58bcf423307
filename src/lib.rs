/// statewatch - Kubernetes state change notifications
///
/// This library turns observed resource state changes into notifications for
/// a single configured backend (Slack, MS Teams, CloudEvents, webhooks, ...).
pub mod app;
pub mod cli;
pub mod config;
pub mod event;
pub mod handlers;
pub mod message;
pub mod source;

// Re-export core types for convenience
pub use event::{StatemonitorEvent, Status};
pub use handlers::Handler;
