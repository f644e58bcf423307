#![allow(dead_code)]
use async_trait::async_trait;
use statewatch::config::Config;
use statewatch::handlers::{ConfigError, DeliveryError, Handler};
use statewatch::StatemonitorEvent;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A mock Handler that records the names of the events it receives.
///
/// Events whose name is listed in `fail_on` are recorded and then rejected.
#[derive(Clone, Debug, Default)]
pub struct RecordingHandler {
    pub seen: Arc<Mutex<Vec<String>>>,
    pub fail_on: Vec<String>,
    pub delay: Option<Duration>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(names: &[&str]) -> Self {
        Self {
            fail_on: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Handler for RecordingHandler {
    fn name(&self) -> &'static str {
        "recording_mock"
    }

    fn init(&mut self, _config: &Config) -> Result<(), ConfigError> {
        Ok(())
    }

    async fn deliver(&self, event: &StatemonitorEvent) -> Result<(), DeliveryError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.seen.lock().unwrap().push(event.name.clone());
        if self.fail_on.contains(&event.name) {
            return Err(DeliveryError::Rejected {
                reason: format!("refusing {}", event.name),
            });
        }
        Ok(())
    }
}

/// Builds a namespaced event named `name`.
pub fn event(name: &str) -> StatemonitorEvent {
    StatemonitorEvent {
        kind: "Pod".to_string(),
        name: name.to_string(),
        namespace: "default".to_string(),
        reason: "create".to_string(),
        status: "Normal".to_string(),
        diff_marshalled: String::new(),
    }
}
