//! Ring Logger
//!
//! A `tracing` layer that keeps the most recent records in a fixed-size
//! circular buffer. Every accepted record is also mirrored to the browser
//! console (stderr when not running on wasm).
//!
//! ```ignore
//! let logs = ring_logger::init(LevelFilter::INFO, 256)?;
//! tracing::info!("ready");
//! assert_eq!(logs.len(), 1);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{registry, Layer};

// ========================
// Records
// ========================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub target: String,
    /// Message followed by any structured fields as `key=value`
    pub message: String,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.level,
            self.target,
            self.message
        )
    }
}

// ========================
// Buffer
// ========================

/// Shared handle onto the circular buffer. Clones see the same records.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    records: Arc<Mutex<VecDeque<LogRecord>>>,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a record, evicting the oldest when full
    pub fn push(&self, record: LogRecord) {
        let Ok(mut records) = self.records.lock() else {
            return;
        };
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Oldest first
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }

    /// Whether any record at `level` has a message containing `needle`
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records
            .lock()
            .map(|records| {
                records
                    .iter()
                    .any(|r| r.level == level && r.message.contains(needle))
            })
            .unwrap_or(false)
    }
}

// ========================
// Layer
// ========================

pub struct RingLayer {
    buffer: RingBuffer,
    max_level: LevelFilter,
    mirror: bool,
}

impl RingLayer {
    pub fn new(capacity: usize, max_level: LevelFilter) -> Self {
        Self {
            buffer: RingBuffer::new(capacity),
            max_level,
            mirror: true,
        }
    }

    /// Keep records in the buffer only, without console output
    pub fn silent(mut self) -> Self {
        self.mirror = false;
        self
    }

    pub fn buffer(&self) -> RingBuffer {
        self.buffer.clone()
    }
}

impl<S: Subscriber> Layer<S> for RingLayer {
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        *metadata.level() <= self.max_level
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > self.max_level {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let record = LogRecord {
            timestamp: Utc::now(),
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.finish(),
        };
        if self.mirror {
            mirror(&record);
        }
        self.buffer.push(record);
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            return self.message;
        }
        let fields = self.fields.join(" ");
        if self.message.is_empty() {
            fields
        } else {
            format!("{} {}", self.message, fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn mirror(record: &LogRecord) {
    use web_sys::console;

    let line = wasm_bindgen::JsValue::from_str(&record.to_string());
    match record.level {
        Level::ERROR => console::error_1(&line),
        Level::WARN => console::warn_1(&line),
        Level::INFO => console::info_1(&line),
        _ => console::debug_1(&line),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn mirror(record: &LogRecord) {
    eprintln!("{record}");
}

// ========================
// Setup
// ========================

/// Install the ring layer as the global subscriber and return its buffer
pub fn init(max_level: LevelFilter, capacity: usize) -> Result<RingBuffer, TryInitError> {
    let layer = RingLayer::new(capacity, max_level);
    let buffer = layer.buffer();
    registry().with(layer).try_init()?;
    Ok(buffer)
}
