//! NODATA sentinel handling.
//!
//! The sentinel is configuration, never inferred from file content. Every
//! grid used together in one run must declare the same sentinel.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{ExchangeError, ExchangeResult};

/// Sentinel historically used by the MH tooling.
pub const DEFAULT_NODATA: f64 = 9999.0;

/// What to do when a grid declares a sentinel different from the configured one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodataMismatchPolicy {
    /// Refuse the input.
    #[default]
    Error,
    /// Log a warning and carry on with the configured sentinel.
    Warn,
}

impl NodataMismatchPolicy {
    /// Parse from string (case-insensitive). Unknown values fall back to `Error`.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "warn" | "warning" => Self::Warn,
            _ => Self::Error,
        }
    }
}

/// The sentinel value and its consistency policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodataConfig {
    /// External "no value" marker written to and read from files.
    pub value: f64,
    /// Policy for grids that declare another sentinel.
    #[serde(default)]
    pub mismatch_policy: NodataMismatchPolicy,
}

impl Default for NodataConfig {
    fn default() -> Self {
        Self {
            value: DEFAULT_NODATA,
            mismatch_policy: NodataMismatchPolicy::Error,
        }
    }
}

impl NodataConfig {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: NodataMismatchPolicy) -> Self {
        self.mismatch_policy = policy;
        self
    }

    /// True when `v` is the external sentinel.
    #[inline]
    pub fn is_sentinel(&self, v: f64) -> bool {
        v == self.value || (self.value.is_nan() && v.is_nan())
    }

    /// Check a sentinel declared by some input against the configured one.
    pub fn check_declared(&self, declared: f64, context: &str) -> ExchangeResult<()> {
        if self.is_sentinel(declared) {
            return Ok(());
        }

        let message = format!(
            "{} declares NODATA {} but the run is configured with {}",
            context, declared, self.value
        );
        match self.mismatch_policy {
            NodataMismatchPolicy::Error => Err(ExchangeError::ConfigurationInconsistency(message)),
            NodataMismatchPolicy::Warn => {
                warn!(declared, configured = self.value, context, "NODATA sentinel mismatch");
                Ok(())
            }
        }
    }
}
