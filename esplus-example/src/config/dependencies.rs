//! Dependency initialization and wiring for the example session.

use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::document::TestDocument;
use crate::session::Session;
use crate::ExampleError;
use esplus_repository::{DocumentMapper, MapperConfig, OpenSearchTransport, SearchTransport};

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Connection mode for OpenSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if the node is unreachable.
    FailFast,
    /// Retry until the node answers.
    Retry,
}

impl ConnectionMode {
    /// Parse the connection mode from `OPENSEARCH_CONNECTION_MODE`.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Defaults to "fail-fast", since the session is a one-shot run.
    fn from_env() -> Self {
        match env::var("OPENSEARCH_CONNECTION_MODE")
            .unwrap_or_else(|_| "fail-fast".to_string())
            .to_lowercase()
            .as_str()
        {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!("Invalid OPENSEARCH_CONNECTION_MODE, defaulting to 'fail-fast'");
                Self::FailFast
            }
        }
    }
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The session ready to run.
    pub session: Session,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `OPENSEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: fail-fast)
    /// - `OPENSEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `ESPLUS_*`: Mapper settings, see `MapperConfig::from_env`
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(ExampleError)` - If the node cannot be reached in fail-fast mode
    pub async fn new() -> Result<Self, ExampleError> {
        let opensearch_url =
            env::var("OPENSEARCH_URL").unwrap_or_else(|_| DEFAULT_OPENSEARCH_URL.to_string());
        let connection_mode = ConnectionMode::from_env();
        let retry_interval = env::var("OPENSEARCH_RETRY_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_INTERVAL_SECS);
        let mapper_config = MapperConfig::from_env();

        info!(
            opensearch_url = %opensearch_url,
            connection_mode = ?connection_mode,
            retry_interval_secs = retry_interval,
            max_batch_size = ?mapper_config.max_batch_size,
            log_dsl = mapper_config.log_dsl,
            "Initializing dependencies"
        );

        let transport = Self::connect_to_opensearch(
            &opensearch_url,
            connection_mode,
            Duration::from_secs(retry_interval),
        )
        .await?;

        info!("OpenSearch connection established");

        let mapper = DocumentMapper::<TestDocument>::new(transport, mapper_config)
            .map_err(|e| ExampleError::config(format!("Invalid document metadata: {}", e)))?;

        Ok(Self {
            session: Session::new(mapper),
        })
    }

    /// Connect to OpenSearch with retry logic based on connection mode.
    async fn connect_to_opensearch(
        url: &str,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<Arc<dyn SearchTransport>, ExampleError> {
        loop {
            match Self::try_connect_opensearch(url).await {
                Ok(transport) => return Ok(transport),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(ExampleError::config(format!(
                            "Failed to connect to OpenSearch: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            opensearch_url = %url,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to OpenSearch, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }

    /// Build a transport and check that the node answers.
    async fn try_connect_opensearch(url: &str) -> Result<Arc<dyn SearchTransport>, ExampleError> {
        let transport = OpenSearchTransport::new(url).await.map_err(|e| {
            ExampleError::config(format!("Failed to create OpenSearch transport: {}", e))
        })?;

        // Any answer proves the node is reachable.
        transport
            .index_exists(TestDocument::INDEX)
            .await
            .map_err(|e| ExampleError::config(format!("OpenSearch is not reachable: {}", e)))?;

        Ok(Arc::new(transport))
    }
}
