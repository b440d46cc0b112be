//! Capture of fatal errors into fault memory.
//!
//! The first write after a fault begins a new [`PanicTrace`] from the current
//! statistics and app log. Every later write appends to that trace and
//! rewrites the record, so whatever was captured survives an abrupt reset.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use crate::fault::{CONTEXT_LEN, FaultMemory, MESSAGE_LEN, PanicTrace, truncate_str};
use crate::logger::{LogRing, SharedLog};
use crate::stats::StatsHub;

/// Size of the trace log when the app log cannot be copied.
const FALLBACK_LOG_LEN: usize = 1024;

struct RecorderState {
    memory: Box<dyn FaultMemory>,
    active: Option<PanicTrace>,
}

pub struct CrashRecorder {
    state: Mutex<RecorderState>,
    log: SharedLog,
    stats: StatsHub,
}

impl CrashRecorder {
    pub fn new(memory: Box<dyn FaultMemory>, log: SharedLog, stats: StatsHub) -> Self {
        Self {
            state: Mutex::new(RecorderState {
                memory,
                active: None,
            }),
            log,
            stats,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_trace(&self, f: impl FnOnce(&mut PanicTrace)) {
        let mut state = self.lock();
        let RecorderState { memory, active } = &mut *state;
        let trace = active
            .get_or_insert_with(|| PanicTrace::begin(self.stats.snapshot(), self.log_snapshot()));
        f(trace);
        memory.write(&trace.encode());
    }

    /// Copy of the app log. A fault may hit while this thread holds the log,
    /// so a busy lock yields an empty ring instead of blocking.
    fn log_snapshot(&self) -> LogRing {
        match self.log.try_lock() {
            Ok(log) => log.clone(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().clone(),
            Err(TryLockError::WouldBlock) => LogRing::new(FALLBACK_LOG_LEN),
        }
    }

    /// Character output hook for the fault handler.
    pub fn putchar(&self, c: char) {
        let mut buf = [0u8; 4];
        self.write_str(c.encode_utf8(&mut buf));
    }

    pub fn write_str(&self, text: &str) {
        self.with_trace(|trace| trace.log.print(text));
    }

    /// Store a fatal error message. The caller terminates afterwards.
    pub fn record_panic(&self, message: &str, context: &str) {
        let message = truncate_str(message, MESSAGE_LEN - 1);
        let context = truncate_str(context, CONTEXT_LEN - 1);
        self.with_trace(|trace| {
            trace.message = message.to_string();
            trace.context = context.to_string();
            trace
                .log
                .print(&format!("*** PANIC  : {message}\n*** CONTEXT: {context}\n"));
        });
        log::error!("*** PANIC  : {message}");
        log::error!("*** CONTEXT: {context}");
    }

    /// True once a trace has begun in this run.
    pub fn is_active(&self) -> bool {
        self.lock().active.is_some()
    }

    /// Read the record left by the previous run and invalidate it.
    pub fn take_previous(&self) -> Option<PanicTrace> {
        let mut state = self.lock();
        let trace = PanicTrace::decode(&state.memory.read());
        state.memory.write(&[]);
        trace
    }

    /// Invalidate the stored record.
    pub fn invalidate(&self) {
        self.lock().memory.write(&[]);
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Route Rust panics into `recorder` before the previous hook runs.
pub fn install_panic_hook(recorder: Arc<CrashRecorder>) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let context = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        recorder.record_panic(&panic_message(info.payload()), &context);
        previous(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::{RetainedRegion, TRACE_BANNER};
    use crate::logger::{lock_log, shared_log};

    fn recorder(region: &RetainedRegion) -> CrashRecorder {
        let log = shared_log(256);
        lock_log(&log).print("[INFO] app: running\n");
        CrashRecorder::new(Box::new(region.clone()), log, StatsHub::new())
    }

    #[test]
    fn panic_message_survives_reset() {
        let region = RetainedRegion::new();
        recorder(&region).record_panic("Application unresponsive", "");

        let next_boot = recorder(&region);
        let trace = next_boot.take_previous().unwrap();
        assert_eq!(trace.message, "Application unresponsive");
        assert!(next_boot.take_previous().is_none());
    }

    #[test]
    fn trace_snapshots_app_log() {
        let region = RetainedRegion::new();
        let rec = recorder(&region);
        rec.record_panic("boom", "main.rs:10");
        let trace = PanicTrace::decode(&region.read()).unwrap();
        let text = trace.log.contents();
        assert!(text.starts_with("[INFO] app: running\n"));
        assert!(text.contains(TRACE_BANNER));
        assert!(text.contains("*** PANIC  : boom"));
        assert_eq!(trace.context, "main.rs:10");
    }

    #[test]
    fn putchar_begins_trace_lazily() {
        let region = RetainedRegion::new();
        let rec = recorder(&region);
        assert!(!rec.is_active());
        assert!(PanicTrace::decode(&region.read()).is_none());

        for c in "Guru Meditation".chars() {
            rec.putchar(c);
        }
        assert!(rec.is_active());
        let trace = PanicTrace::decode(&region.read()).unwrap();
        assert!(trace.message.is_empty());
        assert!(trace.log.contents().ends_with("Guru Meditation"));
        assert_eq!(trace.log.contents().matches("PANIC TRACE").count(), 1);
    }

    #[test]
    fn oversized_fields_are_truncated() {
        let region = RetainedRegion::new();
        recorder(&region).record_panic(&"m".repeat(1000), &"c".repeat(1000));
        let trace = recorder(&region).take_previous().unwrap();
        assert_eq!(trace.message.len(), MESSAGE_LEN - 1);
        assert_eq!(trace.context.len(), CONTEXT_LEN - 1);
    }

    #[test]
    fn invalidate_clears_record() {
        let region = RetainedRegion::new();
        let rec = recorder(&region);
        rec.record_panic("x", "");
        rec.invalidate();
        assert!(rec.take_previous().is_none());
    }

    #[test]
    fn statistics_are_snapshotted() {
        let region = RetainedRegion::new();
        let stats = StatsHub::new();
        stats.update(|s| s.busy_percent = 99.0);
        let rec = CrashRecorder::new(Box::new(region.clone()), shared_log(64), stats);
        rec.record_panic("slow", "");
        let trace = rec.take_previous().unwrap();
        assert_eq!(trace.statistics.busy_percent, 99.0);
    }

    #[test]
    fn panic_while_log_is_held_still_records() {
        let region = RetainedRegion::new();
        let log = shared_log(256);
        let rec = CrashRecorder::new(Box::new(region.clone()), Arc::clone(&log), StatsHub::new());
        let held = lock_log(&log);
        rec.record_panic("logger fault", "");
        drop(held);
        let trace = rec.take_previous().unwrap();
        assert_eq!(trace.message, "logger fault");
        assert!(trace.log.contents().contains("*** PANIC  : logger fault"));
    }

    #[test]
    fn payload_text() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "Box<dyn Any>");
    }
}
