//! Configuration Module - Collector Parameters
//!
//! Manages all configuration parameters for RGC.
//! The heap is a single bounded address range, so most of the tuning is
//! about its size and about how much checking and reporting a cycle does.

/// Main configuration for the collector
///
/// # Examples
///
/// ```rust
/// use rgc::GcConfig;
///
/// // Use default configuration
/// let config = GcConfig::default();
///
/// // Small heap with verification and event logging
/// let config = GcConfig {
///     heap_size: 64 * 1024,
///     verify_heap: true,
///     verbose: true,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Total size of the linear heap in bytes
    ///
    /// Default: 1MB
    pub heap_size: usize,

    /// Address of the first heap byte
    ///
    /// Must be non-zero so that no object ever sits at the null address.
    /// Default: 0x1000
    pub heap_base: usize,

    /// Pre-emptive collection trigger (0.0 - 1.0]
    ///
    /// If set, `allocate` runs a cycle first whenever heap utilization is
    /// above this ratio. If None, cycles only run on allocation failure or
    /// on an explicit `collect()`.
    ///
    /// Default: None
    pub gc_trigger_threshold: Option<f32>,

    /// Run the heap verifier after every cycle
    ///
    /// A failed verification is an invariant violation and panics.
    /// Default: enabled in debug builds
    pub verify_heap: bool,

    /// Enable verbose GC event logging
    ///
    /// Logs cycle start/end, phase timings, heap statistics.
    /// Default: false
    pub verbose: bool,

    /// Enable per-cycle statistics collection
    ///
    /// Default: true
    pub stats_enabled: bool,

    /// Number of cycles kept in the statistics history
    ///
    /// Default: 64
    pub history_limit: usize,
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfig {
            heap_size: MB,
            heap_base: DEFAULT_HEAP_BASE,
            gc_trigger_threshold: None,
            verify_heap: cfg!(debug_assertions),
            verbose: false,
            stats_enabled: true,
            history_limit: 64,
        }
    }
}

impl GcConfig {
    /// Configuration with the given heap size and defaults elsewhere
    pub fn with_heap_size(heap_size: usize) -> Self {
        Self {
            heap_size,
            ..Default::default()
        }
    }

    /// Validate configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rgc::GcConfig;
    ///
    /// let config = GcConfig {
    ///     heap_size: 0,  // Invalid!
    ///     ..Default::default()
    /// };
    ///
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heap_size == 0 {
            return Err(ConfigError::InvalidHeapSize(
                "heap_size must be > 0".to_string(),
            ));
        }

        if self.heap_base == 0 {
            return Err(ConfigError::InvalidHeapBase(
                "heap_base must be non-zero".to_string(),
            ));
        }

        if self.heap_base.checked_add(self.heap_size).is_none() {
            return Err(ConfigError::InvalidHeapBase(format!(
                "heap range {:#x} + {} overflows the address space",
                self.heap_base, self.heap_size
            )));
        }

        if let Some(threshold) = self.gc_trigger_threshold {
            if !(threshold > 0.0 && threshold <= 1.0) {
                return Err(ConfigError::InvalidThreshold(format!(
                    "gc_trigger_threshold must be in (0.0, 1.0], got {}",
                    threshold
                )));
            }
        }

        if self.stats_enabled && self.history_limit == 0 {
            return Err(ConfigError::InvalidHistoryLimit(
                "history_limit must be > 0 when stats are enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with environment variables:
    /// - RGC_HEAP_SIZE
    /// - RGC_HEAP_BASE (decimal or 0x-prefixed hex)
    /// - RGC_GC_THRESHOLD
    /// - RGC_VERIFY_HEAP
    /// - RGC_VERBOSE
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RGC_HEAP_SIZE") {
            match val.parse::<usize>() {
                Ok(size) => config.heap_size = size,
                Err(_) => log::warn!("ignoring RGC_HEAP_SIZE={:?}", val),
            }
        }

        if let Ok(val) = std::env::var("RGC_HEAP_BASE") {
            match parse_address(&val) {
                Some(base) => config.heap_base = base,
                None => log::warn!("ignoring RGC_HEAP_BASE={:?}", val),
            }
        }

        if let Ok(val) = std::env::var("RGC_GC_THRESHOLD") {
            match val.parse::<f32>() {
                Ok(ratio) => config.gc_trigger_threshold = Some(ratio),
                Err(_) => log::warn!("ignoring RGC_GC_THRESHOLD={:?}", val),
            }
        }

        if let Ok(val) = std::env::var("RGC_VERIFY_HEAP") {
            config.verify_heap = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("RGC_VERBOSE") {
            config.verbose = parse_flag(&val);
        }

        config
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid heap size: {0}")]
    InvalidHeapSize(String),

    #[error("Invalid heap base: {0}")]
    InvalidHeapBase(String),

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("Invalid history limit: {0}")]
    InvalidHistoryLimit(String),
}

// ============================================================================
// CONSTANTS & HELPERS
// ============================================================================

const KB: usize = 1024;
const MB: usize = 1024 * KB;

/// Default address of the first heap byte
pub const DEFAULT_HEAP_BASE: usize = 0x1000;

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

fn parse_address(val: &str) -> Option<usize> {
    match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse::<usize>().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GcConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.heap_size, MB);
        assert_eq!(config.heap_base, DEFAULT_HEAP_BASE);
        assert!(config.gc_trigger_threshold.is_none());
    }

    #[test]
    fn test_invalid_heap_size() {
        let config = GcConfig {
            heap_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidHeapSize(_))
        ));
    }

    #[test]
    fn test_null_base_rejected() {
        let config = GcConfig {
            heap_base: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidHeapBase(_))
        ));
    }

    #[test]
    fn test_overflowing_range_rejected() {
        let config = GcConfig {
            heap_base: usize::MAX - 10,
            heap_size: 64,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_threshold() {
        for ratio in [0.0, -0.5, 1.5] {
            let config = GcConfig {
                gc_trigger_threshold: Some(ratio),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "ratio {} accepted", ratio);
        }

        let config = GcConfig {
            gc_trigger_threshold: Some(1.0),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_history_only_matters_with_stats() {
        let config = GcConfig {
            history_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GcConfig {
            history_limit: 0,
            stats_enabled: false,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("4096"), Some(4096));
        assert_eq!(parse_address("0x1000"), Some(0x1000));
        assert_eq!(parse_address("nope"), None);
    }
}
