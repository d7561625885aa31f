#![allow(dead_code)]

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

use conform::{contract, subject};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

#[contract(bindings_only)]
pub trait Gauge {
    fn read(&self) -> u32;
    fn reset(&mut self);
}

/// Has `read` with a wider output and no `reset`.
pub struct Wide(pub u64);

#[subject]
impl Wide {
    pub fn read(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Captured {
    pub level: Level,
    pub target: String,
    pub message: String,
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Captured>>>);

#[derive(Default)]
struct Message(String);

impl Visit for Message {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for Recorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = Message::default();
        event.record(&mut message);
        let metadata = event.metadata();
        self.0.lock().unwrap().push(Captured {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: message.0,
        });
    }
}

/// Run `body` under a subscriber that records every event, at every level.
pub fn capture(body: impl FnOnce()) -> Vec<Captured> {
    let recorder = Recorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());
    tracing::subscriber::with_default(subscriber, body);
    let events = recorder.0.lock().unwrap().clone();
    events
}

pub fn with_message<'a>(events: &'a [Captured], message: &str) -> Vec<&'a Captured> {
    events.iter().filter(|event| event.message == message).collect()
}

pub fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}
