//! Lightweight performance instrumentation.
//!
//! `--perf` prints scope timings to stderr; `--debug-log FILE` records
//! timestamped editor events for offline inspection.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex};
use std::time::Instant;

static TIMING: AtomicBool = AtomicBool::new(false);
static EVENT_LOG: LazyLock<Mutex<EventLog>> = LazyLock::new(|| Mutex::new(EventLog::new()));

/// Times a named region, reporting to stderr on drop when enabled.
#[derive(Debug)]
pub struct Scope {
    name: &'static str,
    start: Instant,
}

impl Drop for Scope {
    fn drop(&mut self) {
        if !is_enabled() {
            return;
        }
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        eprintln!("[perf] {}: {:.2} ms", self.name, elapsed_ms);
    }
}

#[derive(Debug)]
struct EventLog {
    start: Instant,
    writer: Option<BufWriter<File>>,
}

impl EventLog {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            writer: None,
        }
    }
}

/// Turn stderr scope timing on or off.
pub fn set_enabled(enabled: bool) {
    TIMING.store(enabled, Ordering::Relaxed);
}

/// Whether scope timing is active.
pub fn is_enabled() -> bool {
    TIMING.load(Ordering::Relaxed)
}

/// Start timing a named region.
pub fn scope(name: &'static str) -> Scope {
    Scope {
        name,
        start: Instant::now(),
    }
}

/// Open the editor event log at `path`, or close it with `None`.
pub fn set_event_log(path: Option<&Path>) -> std::io::Result<()> {
    let mut log = EVENT_LOG.lock().expect("event log lock poisoned");
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            writeln!(writer, "chiclet event log start")?;
            writer.flush()?;
            log.start = Instant::now();
            log.writer = Some(writer);
        }
        None => log.writer = None,
    }
    Ok(())
}

/// Whether an event log file is open.
pub fn is_event_log_enabled() -> bool {
    EVENT_LOG
        .lock()
        .expect("event log lock poisoned")
        .writer
        .is_some()
}

/// Record one timestamped event when the log is open.
pub fn log_event(name: &str, detail: impl AsRef<str>) {
    let mut log = EVENT_LOG.lock().expect("event log lock poisoned");
    let elapsed_ms = log.start.elapsed().as_secs_f64() * 1000.0;
    if let Some(writer) = log.writer.as_mut() {
        let _ = writeln!(
            writer,
            "[{elapsed_ms:>10.3} ms] {name}: {}",
            detail.as_ref()
        );
        let _ = writer.flush();
    }
}
