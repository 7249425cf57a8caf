#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::SubscriberExt;

/// Collects tracing events emitted on the current thread.
///
/// Only the thread that called [`LogCapture::start`] is captured, so use it
/// from `#[test]` or a current-thread `#[tokio::test]`.
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
    _guard: tracing::subscriber::DefaultGuard,
}

#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: tracing::Level,
    pub target: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl LogCapture {
    pub fn start() -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(CaptureLayer {
            events: events.clone(),
        });
        let guard = tracing::subscriber::set_default(subscriber);

        Self {
            events,
            _guard: guard,
        }
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Events carrying `error_code = code`.
    pub fn with_code(&self, code: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.field("error_code") == Some(code))
            .collect()
    }

    pub fn assert_logged_at_level(&self, level: tracing::Level, needle: &str) {
        let events = self.events();
        assert!(
            events
                .iter()
                .any(|e| e.level == level && e.message.contains(needle)),
            "Expected {level} event containing '{needle}'. Captured: {events:#?}"
        );
    }

    pub fn assert_field_logged(&self, name: &str, value: &str) {
        let events = self.events();
        assert!(
            events
                .iter()
                .any(|e| e.field(name).is_some_and(|v| v.contains(value))),
            "Expected field {name}={value}. Captured: {events:#?}"
        );
    }

    pub fn assert_no_warnings(&self) {
        let events = self.events();
        let loud: Vec<_> = events
            .iter()
            .filter(|e| e.level <= tracing::Level::WARN)
            .collect();
        assert!(loud.is_empty(), "Unexpected warnings: {loud:#?}");
    }
}

struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl FieldVisitor {
    fn push(&mut self, name: &str, value: String) {
        if name == "message" {
            self.message = value;
        } else {
            self.fields.push((name.to_string(), value));
        }
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.push(field.name(), format!("{value:?}"));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.push(field.name(), value.to_string());
    }
}
