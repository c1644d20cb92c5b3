//! Pipeline configuration and duration parsing.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default overall budget for one collection run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default CPU sampling window.
pub const DEFAULT_CPU_WINDOW: Duration = Duration::from_secs(1);
/// Default filesystem path reported by the disk source.
pub const DEFAULT_DISK_PATH: &str = "/";

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A duration string could not be parsed.
    InvalidDuration(String),
    /// A value is out of range.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidDuration(msg) => write!(f, "invalid duration: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Settings shared by the registry and the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Overall deadline for a run.
    pub timeout: Duration,
    /// How long the CPU source samples utilisation.
    pub cpu_window: Duration,
    /// Path whose filesystem the disk source reports on.
    pub disk_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            cpu_window: DEFAULT_CPU_WINDOW,
            disk_path: PathBuf::from(DEFAULT_DISK_PATH),
        }
    }
}

impl PipelineConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cpu_window(mut self, window: Duration) -> Self {
        self.cpu_window = window;
        self
    }

    pub fn with_disk_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.disk_path = path.into();
        self
    }

    /// Rejects settings under which a CPU sample could never complete.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be positive".to_string()));
        }
        if self.cpu_window.is_zero() {
            return Err(ConfigError::Invalid(
                "CPU sampling window must be positive".to_string(),
            ));
        }
        if self.cpu_window >= self.timeout {
            return Err(ConfigError::Invalid(format!(
                "CPU sampling window ({:?}) must be shorter than the timeout ({:?})",
                self.cpu_window, self.timeout
            )));
        }
        Ok(())
    }
}

/// Parses a duration such as `"500ms"`, `"2s"`, `"1.5s"`, `"1m"` or `"3"` (seconds).
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ConfigError::InvalidDuration("empty string".to_string()));
    }

    // (number, multiplier, divisor) so that "500ms" stays exact.
    let (num_str, mul, div) = if let Some(num) = s.strip_suffix("ms") {
        (num, 1.0, 1000.0)
    } else if let Some(num) = s.strip_suffix('s') {
        (num, 1.0, 1.0)
    } else if let Some(num) = s.strip_suffix('m') {
        (num, 60.0, 1.0)
    } else {
        (s, 1.0, 1.0)
    };

    let value: f64 = num_str
        .trim()
        .parse()
        .map_err(|e| ConfigError::InvalidDuration(format!("'{}': {}", s, e)))?;
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidDuration(format!(
            "'{}': must be a non-negative number",
            s
        )));
    }

    Duration::try_from_secs_f64(value * mul / div)
        .map_err(|e| ConfigError::InvalidDuration(format!("'{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration(" 3 ").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn test_parse_duration_errors() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("1h").is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.cpu_window, Duration::from_secs(1));
        assert_eq!(config.disk_path, PathBuf::from("/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_window_longer_than_timeout() {
        let config = PipelineConfig::default()
            .with_timeout(Duration::from_millis(500))
            .with_cpu_window(Duration::from_secs(1));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = PipelineConfig::default().with_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
