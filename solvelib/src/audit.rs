use chrono::{SecondsFormat, Utc};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

/// Append-only sink for operational events.
///
/// The server hands one of these to the coordinator so every submission,
/// completion and poll leaves a trace. Injecting the sink keeps the core
/// testable without real file I/O.
pub trait EventLog: Send + Sync {
    fn append(&self, event: &str);
}

/// Event log backed by a flat file. Each event becomes one timestamped line,
/// mirrored to `tracing` for whoever is watching the process.
pub struct FileEventLog {
    file: Mutex<File>,
}

impl FileEventLog {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EventLog for FileEventLog {
    fn append(&self, event: &str) {
        tracing::info!("{event}");
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{stamp} {event}");
        }
    }
}

/// In-memory event log for tests.
#[derive(Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<String>>,
}

impl MemoryEventLog {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl EventLog for MemoryEventLog {
    fn append(&self, event: &str) {
        self.events.lock().unwrap().push(event.to_string());
    }
}
