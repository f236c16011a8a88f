//! Invoker configuration.
//!
//! Timing traces are off by default. [`InvokerConfig::from_env`] enables them
//! from `RSTEST_BDD_BINDINGS_TRACE_TIMINGS` and reads the minimum traced
//! duration, in milliseconds, from `RSTEST_BDD_BINDINGS_MIN_TRACED_MS`.

use std::time::Duration;

use thiserror::Error;

/// Environment variable enabling timing traces.
pub const TRACE_TIMINGS_ENV: &str = "RSTEST_BDD_BINDINGS_TRACE_TIMINGS";

/// Environment variable holding the minimum traced duration in milliseconds.
pub const MIN_TRACED_MS_ENV: &str = "RSTEST_BDD_BINDINGS_MIN_TRACED_MS";

/// Errors raised while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable held a value that could not be parsed.
    #[error("invalid value {value:?} for {variable}: expected {expected}")]
    InvalidValue {
        /// Variable name.
        variable: &'static str,
        /// Offending value.
        value: String,
        /// Description of accepted values.
        expected: &'static str,
    },
}

fn parse_env_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "TRUE" | "True" | "yes" | "YES" | "Yes" | "on" | "ON" | "On" => Some(true),
        "0" | "false" | "FALSE" | "False" | "no" | "NO" | "No" | "off" | "OFF" | "Off" => {
            Some(false)
        }
        _ => None,
    }
}

/// Settings controlling how the invoker traces durations.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use rstest_bdd_bindings::InvokerConfig;
///
/// let config = InvokerConfig::default()
///     .with_trace_timings(true)
///     .with_min_traced_duration(Duration::from_millis(50));
/// assert!(!config.should_trace(Duration::from_millis(49)));
/// assert!(config.should_trace(Duration::from_millis(50)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InvokerConfig {
    trace_timings: bool,
    min_traced_duration: Duration,
}

impl InvokerConfig {
    /// Enable or disable timing traces.
    #[must_use]
    pub const fn with_trace_timings(mut self, enabled: bool) -> Self {
        self.trace_timings = enabled;
        self
    }

    /// Only trace invocations lasting at least `threshold`.
    #[must_use]
    pub const fn with_min_traced_duration(mut self, threshold: Duration) -> Self {
        self.min_traced_duration = threshold;
        self
    }

    /// Whether timing traces are enabled.
    #[must_use]
    pub const fn trace_timings(&self) -> bool {
        self.trace_timings
    }

    /// Shortest duration that is traced.
    #[must_use]
    pub const fn min_traced_duration(&self) -> Duration {
        self.min_traced_duration
    }

    /// Whether an invocation lasting `duration` should be traced.
    #[must_use]
    pub fn should_trace(&self, duration: Duration) -> bool {
        self.trace_timings && duration >= self.min_traced_duration
    }

    /// Read the configuration from the process environment.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a variable is set to a value
    /// that cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`, which maps variable names to
    /// their values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(TRACE_TIMINGS_ENV) {
            let enabled = parse_env_bool(&value).ok_or_else(|| ConfigError::InvalidValue {
                variable: TRACE_TIMINGS_ENV,
                value: value.clone(),
                expected: "a boolean such as true, false, 1, 0, yes, no, on or off",
            })?;
            config = config.with_trace_timings(enabled);
        }
        if let Some(value) = lookup(MIN_TRACED_MS_ENV) {
            let millis =
                value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidValue {
                        variable: MIN_TRACED_MS_ENV,
                        value: value.clone(),
                        expected: "a whole number of milliseconds",
                    })?;
            config = config.with_min_traced_duration(Duration::from_millis(millis));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn lookup_from(
        pairs: &'static [(&'static str, &'static str)],
    ) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_owned())
        }
    }

    #[test]
    fn defaults_disable_tracing() {
        let config = InvokerConfig::default();
        assert!(!config.trace_timings());
        assert_eq!(config.min_traced_duration(), Duration::ZERO);
        assert!(!config.should_trace(Duration::from_secs(60)));
    }

    #[test]
    fn empty_environment_keeps_defaults() {
        let config = InvokerConfig::from_lookup(|_| None);
        assert_eq!(config, Ok(InvokerConfig::default()));
    }

    #[rstest]
    #[case("on", true)]
    #[case(" 1 ", true)]
    #[case("No", false)]
    fn trace_flag_is_read(#[case] raw: &'static str, #[case] expected: bool) {
        let lookup = move |name: &str| (name == TRACE_TIMINGS_ENV).then(|| raw.to_owned());
        let config = InvokerConfig::from_lookup(lookup);
        assert_eq!(config.map(|c| c.trace_timings()), Ok(expected));
    }

    #[test]
    fn threshold_is_read_in_milliseconds() {
        let config = InvokerConfig::from_lookup(lookup_from(&[
            (TRACE_TIMINGS_ENV, "true"),
            (MIN_TRACED_MS_ENV, "250"),
        ]));
        let Ok(config) = config else {
            panic!("valid configuration rejected: {config:?}");
        };
        assert!(config.trace_timings());
        assert_eq!(config.min_traced_duration(), Duration::from_millis(250));
    }

    #[rstest]
    #[case(TRACE_TIMINGS_ENV, "sometimes")]
    #[case(MIN_TRACED_MS_ENV, "-5")]
    #[case(MIN_TRACED_MS_ENV, "fast")]
    fn invalid_values_are_rejected(#[case] variable: &'static str, #[case] raw: &'static str) {
        let lookup = move |name: &str| (name == variable).then(|| raw.to_owned());
        let Err(ConfigError::InvalidValue { variable: reported, value, .. }) =
            InvokerConfig::from_lookup(lookup)
        else {
            panic!("{variable}={raw} should be rejected");
        };
        assert_eq!(reported, variable);
        assert_eq!(value, raw);
    }

    #[test]
    fn parse_env_bool_understands_common_values() {
        for truthy in ["1", "true", "TRUE", "True", "yes", "YES", "Yes", "on", "ON", "On"] {
            assert_eq!(parse_env_bool(truthy), Some(true), "expected {truthy} to be truthy");
        }
        for falsy in ["0", "false", "FALSE", "False", "no", "NO", "No", "off", "OFF", "Off"] {
            assert_eq!(parse_env_bool(falsy), Some(false), "expected {falsy} to be falsy");
        }
        assert_eq!(parse_env_bool("maybe"), None);
    }
}
