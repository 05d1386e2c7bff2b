//! Configuration types for the DocumentMapper.

use std::env;

use esplus_shared::{IdType, DEFAULT_SIZE};
use tracing::warn;

/// Configuration for the DocumentMapper and its document codec.
///
/// Passed in explicitly at construction time; there is no process-wide
/// configuration state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperConfig {
    /// chrono format applied to date-time fields without their own format.
    ///
    /// `None` leaves dates in the default RFC 3339 encoding.
    pub date_format: Option<String>,

    /// Identifier mode for entity types that do not declare one.
    pub default_id_type: IdType,

    /// Log every compiled search body at info level.
    pub log_dsl: bool,

    /// Maximum number of operations allowed in a single batch.
    ///
    /// Set to `None` to disable the limit. Defaults to 1000.
    pub max_batch_size: Option<usize>,

    /// Page size for searches that do not set one, including the id lookup
    /// of condition-based updates and deletes.
    pub default_size: usize,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            date_format: None,
            default_id_type: IdType::Backend,
            log_dsl: false,
            max_batch_size: Some(1000),
            default_size: DEFAULT_SIZE,
        }
    }
}

impl MapperConfig {
    /// Load the configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ESPLUS_DATE_FORMAT`: chrono date format for date-time fields (default: unset)
    /// - `ESPLUS_ID_TYPE`: default id mode - "backend", "uuid" or "custom" (default: backend)
    /// - `ESPLUS_LOG_DSL`: "true" to log compiled search bodies (default: false)
    /// - `ESPLUS_MAX_BATCH_SIZE`: batch limit, "0" or "none" disables it (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let date_format = env::var("ESPLUS_DATE_FORMAT")
            .ok()
            .filter(|format| !format.trim().is_empty());

        let default_id_type = match env::var("ESPLUS_ID_TYPE") {
            Ok(raw) => raw.parse::<IdType>().unwrap_or_else(|e| {
                warn!(error = %e, "Invalid ESPLUS_ID_TYPE, defaulting to 'backend'");
                IdType::Backend
            }),
            Err(_) => defaults.default_id_type,
        };

        let log_dsl = env::var("ESPLUS_LOG_DSL")
            .map(|raw| matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.log_dsl);

        let max_batch_size = match env::var("ESPLUS_MAX_BATCH_SIZE") {
            Ok(raw) if raw.eq_ignore_ascii_case("none") || raw.trim() == "0" => None,
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(size) => Some(size),
                Err(_) => {
                    warn!(value = %raw, "Invalid ESPLUS_MAX_BATCH_SIZE, using default");
                    defaults.max_batch_size
                }
            },
            Err(_) => defaults.max_batch_size,
        };

        Self {
            date_format,
            default_id_type,
            log_dsl,
            max_batch_size,
            default_size: defaults.default_size,
        }
    }

    /// Create a config with no batch size limit.
    ///
    /// # Warning
    ///
    /// Use with caution. Very large batches can time out or exhaust memory on
    /// the backend.
    pub fn unlimited() -> Self {
        Self {
            max_batch_size: None,
            ..Self::default()
        }
    }

    /// Set a custom batch size limit.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = Some(max_batch_size);
        self
    }

    /// Set the configured date format.
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    /// Set the default identifier mode.
    pub fn with_default_id_type(mut self, id_type: IdType) -> Self {
        self.default_id_type = id_type;
        self
    }

    /// Turn search body logging on or off.
    pub fn with_log_dsl(mut self, enabled: bool) -> Self {
        self.log_dsl = enabled;
        self
    }
}
