//! Request and response types for mapper operations.

use serde_json::Value;

/// Kind of a single bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkAction {
    Index,
    Update,
    Delete,
}

impl BulkAction {
    /// The action name used in the bulk wire format.
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::Index => "index",
            BulkAction::Update => "update",
            BulkAction::Delete => "delete",
        }
    }

    /// Parse a bulk item key. `create` results are treated as index results.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "index" | "create" => Some(BulkAction::Index),
            "update" => Some(BulkAction::Update),
            "delete" => Some(BulkAction::Delete),
            _ => None,
        }
    }
}

/// One operation inside a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    /// Index a full document. `id` is `None` when the backend generates it.
    Index { id: Option<String>, document: Value },
    /// Merge a partial document into an existing one.
    Update { id: String, document: Value },
    Delete { id: String },
}

impl BulkOperation {
    pub fn action(&self) -> BulkAction {
        match self {
            BulkOperation::Index { .. } => BulkAction::Index,
            BulkOperation::Update { .. } => BulkAction::Update,
            BulkOperation::Delete { .. } => BulkAction::Delete,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            BulkOperation::Index { id, .. } => id.as_deref(),
            BulkOperation::Update { id, .. } | BulkOperation::Delete { id } => Some(id),
        }
    }
}

/// Response to a single-document write (index, update or delete).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResponse {
    /// HTTP status of the operation (201 created, 200 ok, 404 not found, ...).
    pub status: u16,
    /// Identifier of the affected document.
    pub id: String,
    /// Backend result word, e.g. `created`, `updated`, `deleted`, `not_found`.
    pub result: Option<String>,
}

/// Result of one item inside a bulk response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemResponse {
    pub action: BulkAction,
    pub id: Option<String>,
    pub status: u16,
    /// Backend failure reason, present when the item failed.
    pub error: Option<String>,
}

impl BulkItemResponse {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }

    pub fn is_created(&self) -> bool {
        self.error.is_none() && self.status == 201
    }
}

/// Response to a bulk request, items in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkResponse {
    pub took_ms: u64,
    /// True when at least one item failed.
    pub errors: bool,
    pub items: Vec<BulkItemResponse>,
}

impl BulkResponse {
    pub fn has_failures(&self) -> bool {
        self.errors || self.items.iter().any(|item| item.error.is_some())
    }

    pub fn failed_count(&self) -> usize {
        self.items.iter().filter(|item| !item.is_success()).count()
    }
}

/// How a bulk response is reconciled into an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Any failed item fails the whole call with zero reported successes.
    FailFast,
    /// Count the successful items and never fail on partial failure.
    Tally,
}

/// Result of a batch operation for a single item.
///
/// This struct represents the outcome of a single operation within a batch
/// (indexing, updating or deleting one document), matched to the request by
/// position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOperationResult {
    /// Position of the operation in the batch.
    pub position: usize,
    /// Identifier reported by the backend for this item.
    pub id: Option<String>,
    pub status: u16,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Whether the operation created a new document.
    pub created: bool,
    /// Backend failure reason if the operation failed.
    pub error: Option<String>,
}

/// Summary of a batch operation containing aggregate statistics and individual results.
///
/// This allows callers to inspect partial failures of update and delete
/// batches, and to pick up identifiers assigned to created documents.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchOperationSummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each item.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// Summary of a batch that had nothing to do.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Identifier per batch position for items that created a document.
    pub fn assigned_ids(&self) -> Vec<Option<String>> {
        self.results
            .iter()
            .map(|result| if result.created { result.id.clone() } else { None })
            .collect()
    }
}

/// Outcome of a single-document write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Number of documents affected (0 or 1).
    pub affected: usize,
    /// Identifier of the document, as assigned or confirmed by the backend.
    pub id: Option<String>,
}

impl WriteOutcome {
    pub fn none() -> Self {
        Self {
            affected: 0,
            id: None,
        }
    }
}

/// Payload of a condition-based update.
#[derive(Debug, Clone)]
pub enum UpdateSet<'a, T> {
    /// Write the entity's fields, filtered by each field's strategy.
    Entity(&'a T),
    /// Write exactly these fields. Null values are sent as nulls.
    Fields(Vec<(String, Value)>),
}
