//! Application log ring and the `log` backend that feeds it.
//!
//! Every record is kept in a fixed-size ring so a crash trace or a trace
//! dump can include the most recent output. Records are also forwarded to an
//! `env_logger` logger for the host console.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{LevelFilter, Log, Metadata, Record};
use pocket_types::error::{PocketError, Result};

/// Circular byte buffer of log text.
///
/// The byte at the cursor is always zero, so the oldest text starts right
/// after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRing {
    buffer: Vec<u8>,
    cursor: usize,
}

impl LogRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity.max(1)],
            cursor: 0,
        }
    }

    /// Rebuild a ring from its raw parts. An out-of-range cursor wraps.
    pub fn from_parts(buffer: Vec<u8>, cursor: usize) -> Self {
        if buffer.is_empty() {
            return Self::new(1);
        }
        let cursor = cursor % buffer.len();
        Self { buffer, cursor }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn print(&mut self, text: &str) {
        let len = self.buffer.len();
        for &b in text.as_bytes().iter().filter(|&&b| b != 0) {
            self.buffer[self.cursor] = b;
            self.cursor = (self.cursor + 1) % len;
        }
        self.buffer[self.cursor] = 0;
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0);
        self.cursor = 0;
    }

    /// The retained text, oldest first.
    pub fn contents(&self) -> String {
        let (older, newer) = self.buffer.split_at(self.cursor);
        let bytes: Vec<u8> = newer
            .iter()
            .chain(older)
            .copied()
            .filter(|&b| b != 0)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Log ring shared between the logger, the crash recorder and trace dumps.
pub type SharedLog = Arc<Mutex<LogRing>>;

pub fn shared_log(capacity: usize) -> SharedLog {
    Arc::new(Mutex::new(LogRing::new(capacity)))
}

pub(crate) fn lock_log(log: &SharedLog) -> MutexGuard<'_, LogRing> {
    log.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Format a record the way it is stored in the ring.
pub fn format_record(record: &Record<'_>) -> String {
    format!("[{}] {}: {}\n", record.level(), record.target(), record.args())
}

/// `log` backend writing into a [`SharedLog`].
pub struct RingLogger {
    ring: SharedLog,
    console: Option<env_logger::Logger>,
}

impl RingLogger {
    pub fn new(ring: SharedLog) -> Self {
        Self {
            ring,
            console: None,
        }
    }

    /// Also echo records accepted by `console`'s filter.
    pub fn with_console(mut self, console: env_logger::Logger) -> Self {
        self.console = Some(console);
        self
    }

    /// Install as the global logger. Fails if a logger is already set.
    pub fn install(self, level: LevelFilter) -> Result<()> {
        log::set_boxed_logger(Box::new(self))
            .map_err(|e| PocketError::Platform(format!("logger: {e}")))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for RingLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        let line = format_record(record);
        lock_log(&self.ring).print(&line);
        if let Some(console) = &self.console
            && console.matches(record)
        {
            console.log(record);
        }
    }

    fn flush(&self) {
        if let Some(console) = &self.console {
            console.flush();
        }
    }
}
