//! The panic trace record and the memory that keeps it across a reset.
//!
//! Record layout, all integers little-endian:
//!
//! | offset | size | field |
//! |---|---|---|
//! | 0 | 4 | magic `0x12345678` |
//! | 4 | 256 | message, NUL padded |
//! | 260 | 128 | context, NUL padded |
//! | 388 | 40 | statistics (5 x f32, 5 x u32) |
//! | 428 | 4 | log cursor |
//! | 432 | 4 | log length |
//! | 436 | n | log bytes |

use std::sync::{Arc, Mutex, PoisonError};

use crate::logger::LogRing;
use crate::stats::Statistics;

pub const TRACE_MAGIC: u32 = 0x1234_5678;
pub const MESSAGE_LEN: usize = 256;
pub const CONTEXT_LEN: usize = 128;

const STATS_LEN: usize = 40;
const HEADER_LEN: usize = 4 + MESSAGE_LEN + CONTEXT_LEN + STATS_LEN + 8;

/// Banner appended to the copied log when a trace begins.
pub const TRACE_BANNER: &str = "\n\n*** PANIC TRACE: ***\n\n";

/// Storage for one trace record that outlives a soft reset.
pub trait FaultMemory: Send {
    /// The stored bytes. May be garbage after a cold boot.
    fn read(&self) -> Vec<u8>;
    fn write(&mut self, record: &[u8]);
}

/// Fault memory backed by a heap buffer.
///
/// Clones share the buffer, so a second runtime built from a clone sees what
/// the first one stored, as it would after a reset.
#[derive(Debug, Clone, Default)]
pub struct RetainedRegion {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl RetainedRegion {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FaultMemory for RetainedRegion {
    fn read(&self) -> Vec<u8> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn write(&mut self, record: &[u8]) {
        let mut bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        bytes.clear();
        bytes.extend_from_slice(record);
    }
}

/// Crash diagnostics captured when a fatal error begins.
#[derive(Debug, Clone, PartialEq)]
pub struct PanicTrace {
    pub message: String,
    pub context: String,
    pub statistics: Statistics,
    pub log: LogRing,
}

impl PanicTrace {
    /// Start a trace from the current statistics and a copy of the app log.
    pub fn begin(statistics: Statistics, mut log: LogRing) -> Self {
        log.print(TRACE_BANNER);
        Self {
            message: String::new(),
            context: String::new(),
            statistics,
            log,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let log = self.log.as_bytes();
        let mut out = Vec::with_capacity(HEADER_LEN + log.len());
        out.extend_from_slice(&TRACE_MAGIC.to_le_bytes());
        put_field(&mut out, &self.message, MESSAGE_LEN);
        put_field(&mut out, &self.context, CONTEXT_LEN);

        let s = &self.statistics;
        for f in [
            s.battery_percent,
            s.battery_voltage,
            s.busy_percent,
            s.skipped_fps,
            s.total_fps,
        ] {
            out.extend_from_slice(&f.to_le_bytes());
        }
        for v in [
            s.free_memory_int,
            s.free_memory_ext,
            s.free_block_int,
            s.free_block_ext,
            s.free_stack_main,
        ] {
            out.extend_from_slice(&v.to_le_bytes());
        }

        out.extend_from_slice(&(self.log.cursor() as u32).to_le_bytes());
        out.extend_from_slice(&(log.len() as u32).to_le_bytes());
        out.extend_from_slice(log);
        out
    }

    /// `None` unless the record starts with the magic word and is complete.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN || read_u32(bytes, 0) != TRACE_MAGIC {
            return None;
        }
        let message = get_field(&bytes[4..4 + MESSAGE_LEN]);
        let context = get_field(&bytes[4 + MESSAGE_LEN..4 + MESSAGE_LEN + CONTEXT_LEN]);

        let base = 4 + MESSAGE_LEN + CONTEXT_LEN;
        let f = |i: usize| f32::from_bits(read_u32(bytes, base + i * 4));
        let u = |i: usize| read_u32(bytes, base + 20 + i * 4);
        let statistics = Statistics {
            battery_percent: f(0),
            battery_voltage: f(1),
            busy_percent: f(2),
            skipped_fps: f(3),
            total_fps: f(4),
            free_memory_int: u(0),
            free_memory_ext: u(1),
            free_block_int: u(2),
            free_block_ext: u(3),
            free_stack_main: u(4),
        };

        let cursor = read_u32(bytes, base + STATS_LEN) as usize;
        let len = read_u32(bytes, base + STATS_LEN + 4) as usize;
        let log = bytes.get(HEADER_LEN..HEADER_LEN.checked_add(len)?)?;

        Some(Self {
            message,
            context,
            statistics,
            log: LogRing::from_parts(log.to_vec(), cursor),
        })
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(word)
}

fn put_field(out: &mut Vec<u8>, text: &str, len: usize) {
    let text = truncate_str(text, len - 1);
    out.extend_from_slice(text.as_bytes());
    out.resize(out.len() + len - text.len(), 0);
}

fn get_field(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Longest prefix of `text` of at most `max` bytes ending on a char boundary.
pub fn truncate_str(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
