//! GC Logging and Tracing
//!
//! Structured events for collection cycles, useful for performance
//! analysis and debugging. Every event is:
//! - retained in the logger's event buffer
//! - forwarded to the `log` facade at the event's level
//! - optionally printed to the console (human-readable or JSON)
//!
//! Log Levels:
//! - ERROR: allocation failures that survive a collection
//! - INFO: cycle start/end, heap statistics
//! - DEBUG: phase boundaries
//! - TRACE: per-phase statistics

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Log level for GC operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// GC event types
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GcEvent {
    /// GC cycle started
    CycleStart { cycle: u64, reason: String },

    /// GC phase started
    PhaseStart { cycle: u64, phase: String },

    /// GC phase completed
    PhaseEnd {
        cycle: u64,
        phase: String,
        duration_ms: f64,
    },

    /// GC cycle completed
    CycleEnd {
        cycle: u64,
        duration_ms: f64,
        reclaimed_bytes: usize,
    },

    /// Heap statistics
    HeapStats {
        used_bytes: usize,
        total_bytes: usize,
        free_regions: usize,
        utilization: f64,
    },

    /// Allocation that failed even after a collection
    AllocationFailure {
        size: usize,
        heap_used: usize,
        largest_free: usize,
    },

    /// Marking statistics
    MarkStats {
        cycle: u64,
        roots_scanned: usize,
        marked_count: usize,
        marked_bytes: usize,
    },

    /// Sweeping statistics
    SweepStats {
        cycle: u64,
        swept_count: usize,
        reclaimed_bytes: usize,
        free_regions: usize,
    },

    /// Compaction statistics
    RelocateStats {
        cycle: u64,
        relocated_count: usize,
        bytes_moved: usize,
    },
}

impl GcEvent {
    /// Level the event is logged at
    pub fn level(&self) -> LogLevel {
        match self {
            GcEvent::AllocationFailure { .. } => LogLevel::Error,
            GcEvent::CycleStart { .. } | GcEvent::CycleEnd { .. } | GcEvent::HeapStats { .. } => {
                LogLevel::Info
            },
            GcEvent::PhaseStart { .. } | GcEvent::PhaseEnd { .. } => LogLevel::Debug,
            GcEvent::MarkStats { .. }
            | GcEvent::SweepStats { .. }
            | GcEvent::RelocateStats { .. } => LogLevel::Trace,
        }
    }
}

impl fmt::Display for GcEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GcEvent::CycleStart { cycle, reason } => {
                write!(f, "[GC] Cycle {} started (reason: {})", cycle, reason)
            },
            GcEvent::PhaseStart { cycle, phase } => {
                write!(f, "[GC] Cycle {}: {} phase started", cycle, phase)
            },
            GcEvent::PhaseEnd {
                cycle,
                phase,
                duration_ms,
            } => write!(
                f,
                "[GC] Cycle {}: {} phase completed ({:.3}ms)",
                cycle, phase, duration_ms
            ),
            GcEvent::CycleEnd {
                cycle,
                duration_ms,
                reclaimed_bytes,
            } => write!(
                f,
                "[GC] Cycle {} completed ({:.3}ms, reclaimed {} bytes)",
                cycle, duration_ms, reclaimed_bytes
            ),
            GcEvent::HeapStats {
                used_bytes,
                total_bytes,
                free_regions,
                utilization,
            } => write!(
                f,
                "[GC] Heap: {}/{} bytes ({:.1}% utilized, {} free regions)",
                used_bytes,
                total_bytes,
                utilization * 100.0,
                free_regions
            ),
            GcEvent::AllocationFailure {
                size,
                heap_used,
                largest_free,
            } => write!(
                f,
                "[GC] Allocation failure: {} bytes (heap used: {}, largest free: {})",
                size, heap_used, largest_free
            ),
            GcEvent::MarkStats {
                cycle,
                roots_scanned,
                marked_count,
                marked_bytes,
            } => write!(
                f,
                "[GC] Cycle {}: marked {} objects ({} bytes) from {} roots",
                cycle, marked_count, marked_bytes, roots_scanned
            ),
            GcEvent::SweepStats {
                cycle,
                swept_count,
                reclaimed_bytes,
                free_regions,
            } => write!(
                f,
                "[GC] Cycle {}: swept {} objects ({} bytes), {} free regions",
                cycle, swept_count, reclaimed_bytes, free_regions
            ),
            GcEvent::RelocateStats {
                cycle,
                relocated_count,
                bytes_moved,
            } => write!(
                f,
                "[GC] Cycle {}: relocated {} objects ({} bytes moved)",
                cycle, relocated_count, bytes_moved
            ),
        }
    }
}

/// GC Logger configuration
#[derive(Debug, Clone)]
pub struct GcLoggerConfig {
    /// Most verbose level recorded
    pub level: LogLevel,

    /// Print events to stdout/stderr
    pub console: bool,

    /// Print JSON instead of human-readable lines
    pub json: bool,

    /// Prefix console lines with a local timestamp
    pub timestamps: bool,

    /// Events retained in the buffer (oldest dropped first)
    pub max_events: usize,
}

impl Default for GcLoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            console: true,
            json: false,
            timestamps: true,
            max_events: 1024,
        }
    }
}

/// GC Logger - records and emits [`GcEvent`]s
pub struct GcLogger {
    config: GcLoggerConfig,
    events: Mutex<VecDeque<(Instant, GcEvent)>>,
    enabled: AtomicBool,
}

impl GcLogger {
    pub fn new(config: GcLoggerConfig) -> Self {
        Self {
            config,
            events: Mutex::new(VecDeque::new()),
            enabled: AtomicBool::new(true),
        }
    }

    /// Logger that records nothing until enabled
    pub fn disabled(config: GcLoggerConfig) -> Self {
        let logger = Self::new(config);
        logger.disable();
        logger
    }

    pub fn config(&self) -> &GcLoggerConfig {
        &self.config
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Log a GC event
    pub fn log(&self, event: GcEvent) {
        if !self.is_enabled() {
            return;
        }

        let level = event.level();
        if level > self.config.level {
            return;
        }

        log::log!(target: "rgc::gc", log::Level::from(level), "{}", event);

        if self.config.console {
            self.output_console(&event);
        }

        if self.config.max_events > 0 {
            let mut events = self.events.lock();
            if events.len() >= self.config.max_events {
                events.pop_front();
            }
            events.push_back((Instant::now(), event));
        }
    }

    fn output_console(&self, event: &GcEvent) {
        let line = if self.config.json {
            let mut value = match serde_json::to_value(event) {
                Ok(value) => value,
                Err(_) => return,
            };
            if self.config.timestamps {
                value["timestamp"] = serde_json::json!(chrono::Local::now().to_rfc3339());
            }
            value.to_string()
        } else if self.config.timestamps {
            format!(
                "[{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                event
            )
        } else {
            event.to_string()
        };

        if event.level() == LogLevel::Error {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }

    /// Get all retained events
    pub fn events(&self) -> Vec<(Instant, GcEvent)> {
        self.events.lock().iter().cloned().collect()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }
}

impl Default for GcLogger {
    fn default() -> Self {
        Self::new(GcLoggerConfig::default())
    }
}

impl fmt::Debug for GcLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcLogger")
            .field("config", &self.config)
            .field("enabled", &self.is_enabled())
            .field("events", &self.event_count())
            .finish()
    }
}

lazy_static::lazy_static! {
    static ref GLOBAL_LOGGER: Mutex<GcLogger> = Mutex::new(GcLogger::default());
}

/// Log a GC event to the global logger
pub fn log_event(event: GcEvent) {
    GLOBAL_LOGGER.lock().log(event);
}

/// Replace the global logger's configuration (clears its events)
pub fn configure_logger(config: GcLoggerConfig) {
    *GLOBAL_LOGGER.lock() = GcLogger::new(config);
}

/// Global logger event count
pub fn get_event_count() -> usize {
    GLOBAL_LOGGER.lock().event_count()
}
