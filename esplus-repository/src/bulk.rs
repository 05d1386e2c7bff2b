//! Batched write execution.

use std::sync::Arc;

use tracing::{debug, error};

use crate::errors::MapperError;
use crate::interfaces::SearchTransport;
use crate::types::{
    BatchOperationResult, BatchOperationSummary, BatchPolicy, BulkOperation, BulkResponse,
};

/// Sends many document operations in one bulk call and reconciles the
/// per-item results.
pub struct BulkExecutor {
    transport: Arc<dyn SearchTransport>,
    max_batch_size: Option<usize>,
}

impl BulkExecutor {
    pub fn new(transport: Arc<dyn SearchTransport>, max_batch_size: Option<usize>) -> Self {
        Self {
            transport,
            max_batch_size,
        }
    }

    /// Check a batch size against the configured limit.
    pub fn validate_batch_size(&self, size: usize) -> Result<(), MapperError> {
        if let Some(max) = self.max_batch_size {
            if size > max {
                return Err(MapperError::validation(format!(
                    "Batch size {} exceeds maximum allowed size of {}",
                    size, max
                )));
            }
        }
        Ok(())
    }

    /// Execute a batch in a single bulk call.
    ///
    /// # Arguments
    ///
    /// * `index` - Target index
    /// * `operations` - Operations in batch order; an empty batch makes no call
    /// * `policy` - How partial failure is reported
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Item results matched to operations by position.
    ///   Under `FailFast`, `succeeded` counts created documents; under `Tally` it
    ///   counts any 2xx item.
    /// * `Err(MapperError::ValidationError)` - If the batch is larger than the limit
    /// * `Err(MapperError::BatchFailure)` - Under `FailFast`, if any item failed
    /// * `Err(MapperError)` - If the bulk call itself fails
    pub async fn execute(
        &self,
        index: &str,
        operations: Vec<BulkOperation>,
        policy: BatchPolicy,
    ) -> Result<BatchOperationSummary, MapperError> {
        if operations.is_empty() {
            return Ok(BatchOperationSummary::empty());
        }
        self.validate_batch_size(operations.len())?;

        debug!(index, operations = operations.len(), ?policy, "Sending bulk request");
        let response = self.transport.bulk(index, &operations).await?;

        Self::reconcile(&operations, response, policy)
    }

    fn reconcile(
        operations: &[BulkOperation],
        response: BulkResponse,
        policy: BatchPolicy,
    ) -> Result<BatchOperationSummary, MapperError> {
        let total = operations.len();
        if response.items.len() != total {
            return Err(MapperError::transport(format!(
                "Bulk response has {} items for {} operations",
                response.items.len(),
                total
            )));
        }

        let results: Vec<BatchOperationResult> = response
            .items
            .into_iter()
            .zip(operations)
            .enumerate()
            .map(|(position, (item, operation))| BatchOperationResult {
                position,
                id: item.id.clone().or_else(|| operation.id().map(str::to_string)),
                status: item.status,
                success: item.is_success(),
                created: item.is_created(),
                error: item.error,
            })
            .collect();

        let failed = results.iter().filter(|result| !result.success).count();

        let succeeded = match policy {
            BatchPolicy::FailFast => {
                if failed > 0 {
                    for result in results.iter().filter(|result| !result.success) {
                        error!(
                            position = result.position,
                            status = result.status,
                            error = ?result.error,
                            "Bulk item failed"
                        );
                    }
                    return Err(MapperError::batch_failure(total, failed));
                }
                results.iter().filter(|result| result.created).count()
            }
            BatchPolicy::Tally => results.iter().filter(|result| result.success).count(),
        };

        debug!(total, succeeded, failed, "Bulk request reconciled");

        Ok(BatchOperationSummary {
            total,
            succeeded,
            failed,
            results,
        })
    }
}
