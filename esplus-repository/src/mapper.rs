//! Document mapper implementation.
//!
//! This module provides the typed facade application code uses to insert,
//! update, delete and query the documents of one entity type.

use std::marker::PhantomData;
use std::sync::Arc;

use esplus_shared::{ConditionList, Document, DocumentMetadata, IdType, SearchQuery, SearchResponse};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::bulk::BulkExecutor;
use crate::codec::{validate_date_format, DocumentCodec};
use crate::config::MapperConfig;
use crate::errors::MapperError;
use crate::interfaces::SearchTransport;
use crate::metadata::MetadataRegistry;
use crate::opensearch::IndexDefinition;
use crate::query::SearchRequestBuilder;
use crate::types::{
    BatchOperationSummary, BatchPolicy, BulkOperation, UpdateSet, WriteOutcome,
};
use crate::utils::{generate_uuid, require_id, require_ids};

/// The typed mapper for one entity type.
///
/// This is the high-level API that application code should use. It compiles
/// conditions, encodes entities through the field strategies of `T`, and
/// delegates the wire calls to a shared `SearchTransport`. Every operation is
/// one round trip, except condition-based update and delete, which first
/// resolve the matching ids with a search and then send one bulk request.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use esplus_repository::{DocumentMapper, MapperConfig};
/// use esplus_repository::opensearch::OpenSearchTransport;
/// use esplus_shared::{ConditionList, Document, DocumentMetadata, FieldDescriptor, SearchQuery};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct User {
///     id: Option<String>,
///     name: Option<String>,
/// }
///
/// impl Document for User {
///     fn describe() -> DocumentMetadata {
///         DocumentMetadata::new("users")
///             .key_field_name("id")
///             .field(FieldDescriptor::new("name"))
///     }
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = Arc::new(OpenSearchTransport::new("http://localhost:9200").await?);
/// let mapper: DocumentMapper<User> = DocumentMapper::new(transport, MapperConfig::default())?;
///
/// let outcome = mapper.insert(&User { id: None, name: Some("ann".to_string()) }).await?;
/// let users = mapper
///     .select_list(&SearchQuery::new(ConditionList::new().eq("name", "ann")))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct DocumentMapper<T: Document> {
    transport: Arc<dyn SearchTransport>,
    config: MapperConfig,
    metadata: Arc<DocumentMetadata>,
    codec: DocumentCodec,
    bulk: BulkExecutor,
    requests: SearchRequestBuilder,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Document> DocumentMapper<T> {
    /// Create a mapper for `T`.
    ///
    /// # Arguments
    ///
    /// * `transport` - The shared transport (e.g., `OpenSearchTransport`)
    /// * `config` - Mapper configuration
    ///
    /// # Returns
    ///
    /// * `Ok(DocumentMapper)` - A mapper bound to `T`'s index
    /// * `Err(MapperError::ValidationError)` - If `T`'s metadata is invalid
    pub fn new(transport: Arc<dyn SearchTransport>, config: MapperConfig) -> Result<Self, MapperError> {
        if let Some(format) = &config.date_format {
            validate_date_format(format)?;
        }
        let metadata = MetadataRegistry::get::<T>()?;
        let codec = DocumentCodec::new(Arc::clone(&metadata), &config);
        let bulk = BulkExecutor::new(Arc::clone(&transport), config.max_batch_size);
        let requests = SearchRequestBuilder::new(config.default_size);

        Ok(Self {
            transport,
            config,
            metadata,
            codec,
            bulk,
            requests,
            _entity: PhantomData,
        })
    }

    /// The index every operation targets.
    pub fn index_name(&self) -> &str {
        self.metadata.index_name()
    }

    /// The codec used for `T`, e.g. to write assigned ids back into entities.
    pub fn codec(&self) -> &DocumentCodec {
        &self.codec
    }

    fn id_type(&self) -> IdType {
        self.metadata.id_type(self.config.default_id_type)
    }

    /// Pick the identifier an insert is sent with. `None` lets the backend assign one.
    fn insert_id(&self, entity: &T) -> Result<Option<String>, MapperError> {
        match self.id_type() {
            IdType::Backend => Ok(None),
            IdType::Uuid => Ok(Some(generate_uuid())),
            IdType::Custom => {
                let id = self.codec.identifier_of(entity)?.ok_or_else(|| {
                    MapperError::validation(format!(
                        "Custom id required for index '{}' but the key field is empty",
                        self.index_name()
                    ))
                })?;
                require_id(&id)?;
                Ok(Some(id))
            }
        }
    }

    /// Identifier of an entity that must already carry one.
    fn existing_id(&self, entity: &T) -> Result<String, MapperError> {
        let id = self.codec.identifier_of(entity)?.ok_or_else(|| {
            MapperError::validation(format!(
                "Entity for index '{}' has no id",
                self.index_name()
            ))
        })?;
        require_id(&id)?;
        Ok(id)
    }

    fn log_dsl(&self, body: &Value) {
        if self.config.log_dsl {
            info!(index = %self.index_name(), dsl = %body, "Search DSL");
        }
    }

    /// Insert one document.
    ///
    /// # Returns
    ///
    /// * `Ok(WriteOutcome)` - `affected` is 1 when a document was created, 0
    ///   when an existing one was replaced; `id` is the document's identifier
    /// * `Err(MapperError::ValidationError)` - If a custom id is required but missing
    /// * `Err(MapperError)` - If the round trip fails
    #[instrument(skip_all, fields(index = %self.metadata.index_name()))]
    pub async fn insert(&self, entity: &T) -> Result<WriteOutcome, MapperError> {
        let id = self.insert_id(entity)?;
        let document = self.codec.to_wire_document(entity)?;

        let response = self
            .transport
            .index_document(self.index_name(), id.as_deref(), &document)
            .await?;

        let affected = usize::from(response.status == 201);
        debug!(doc_id = %response.id, affected, "Inserted document");
        Ok(WriteOutcome {
            affected,
            id: Some(response.id),
        })
    }

    /// Insert many documents in one bulk request.
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - `succeeded` counts created documents;
    ///   `assigned_ids()` gives the identifier of each created document by position
    /// * `Err(MapperError::BatchFailure)` - If any item failed. Some documents
    ///   may still have been written.
    /// * `Err(MapperError::ValidationError)` - If the batch exceeds the size
    ///   limit or a custom id is missing
    #[instrument(skip_all, fields(index = %self.metadata.index_name(), count = entities.len()))]
    pub async fn insert_batch(&self, entities: &[T]) -> Result<BatchOperationSummary, MapperError> {
        if entities.is_empty() {
            return Ok(BatchOperationSummary::empty());
        }
        self.bulk.validate_batch_size(entities.len())?;

        let operations = entities
            .iter()
            .map(|entity| -> Result<BulkOperation, MapperError> {
                Ok(BulkOperation::Index {
                    id: self.insert_id(entity)?,
                    document: self.codec.to_wire_document(entity)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.bulk
            .execute(self.index_name(), operations, BatchPolicy::FailFast)
            .await
    }

    /// Update every document matching `conditions`.
    ///
    /// The matching ids are resolved first with a search that fetches no
    /// source and uses the default page size. The update itself is one bulk
    /// request and carries no conditions.
    ///
    /// # Arguments
    ///
    /// * `set` - The entity to write (through its field strategies) or explicit field values
    /// * `conditions` - Which documents to update
    #[instrument(skip_all, fields(index = %self.metadata.index_name()))]
    pub async fn update(
        &self,
        set: UpdateSet<'_, T>,
        conditions: &ConditionList,
    ) -> Result<BatchOperationSummary, MapperError> {
        let document = match set {
            UpdateSet::Entity(entity) => self.codec.to_wire_document(entity)?,
            UpdateSet::Fields(fields) => self.codec.fields_document(&fields)?,
        };

        let ids = self.matching_ids(conditions).await?;
        if ids.is_empty() {
            debug!("No documents match the update conditions");
            return Ok(BatchOperationSummary::empty());
        }

        let operations = ids
            .into_iter()
            .map(|id| BulkOperation::Update {
                id,
                document: document.clone(),
            })
            .collect();

        self.bulk
            .execute(self.index_name(), operations, BatchPolicy::Tally)
            .await
    }

    /// Update one document from an entity carrying its id.
    ///
    /// # Returns
    ///
    /// * `Ok(WriteOutcome)` - `affected` is 1 when the backend answered 200
    /// * `Err(MapperError::ValidationError)` - If the entity has no id
    #[instrument(skip_all, fields(index = %self.metadata.index_name()))]
    pub async fn update_by_id(&self, entity: &T) -> Result<WriteOutcome, MapperError> {
        let id = self.existing_id(entity)?;
        let document = self.codec.to_wire_document(entity)?;

        let response = self
            .transport
            .update_document(self.index_name(), &id, &document)
            .await?;

        Ok(WriteOutcome {
            affected: usize::from(response.status == 200),
            id: Some(id),
        })
    }

    /// Update many documents, each from an entity carrying its id.
    ///
    /// Partial failure is reported in the summary rather than as an error.
    #[instrument(skip_all, fields(index = %self.metadata.index_name(), count = entities.len()))]
    pub async fn update_batch_by_id(
        &self,
        entities: &[T],
    ) -> Result<BatchOperationSummary, MapperError> {
        if entities.is_empty() {
            return Ok(BatchOperationSummary::empty());
        }
        self.bulk.validate_batch_size(entities.len())?;

        let operations = entities
            .iter()
            .map(|entity| -> Result<BulkOperation, MapperError> {
                Ok(BulkOperation::Update {
                    id: self.existing_id(entity)?,
                    document: self.codec.to_wire_document(entity)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.bulk
            .execute(self.index_name(), operations, BatchPolicy::Tally)
            .await
    }

    /// Delete every document matching `conditions`.
    ///
    /// Two round trips, as for `update`.
    #[instrument(skip_all, fields(index = %self.metadata.index_name()))]
    pub async fn delete(
        &self,
        conditions: &ConditionList,
    ) -> Result<BatchOperationSummary, MapperError> {
        let ids = self.matching_ids(conditions).await?;
        if ids.is_empty() {
            debug!("No documents match the delete conditions");
            return Ok(BatchOperationSummary::empty());
        }

        let operations = ids
            .into_iter()
            .map(|id| BulkOperation::Delete { id })
            .collect();

        self.bulk
            .execute(self.index_name(), operations, BatchPolicy::Tally)
            .await
    }

    /// Delete one document.
    ///
    /// # Returns
    ///
    /// * `Ok(WriteOutcome)` - `affected` is 1 when deleted, 0 when there was no such document
    /// * `Err(MapperError::ValidationError)` - If the id is blank
    #[instrument(skip_all, fields(index = %self.metadata.index_name(), doc_id = %id))]
    pub async fn delete_by_id(&self, id: &str) -> Result<WriteOutcome, MapperError> {
        let id = require_id(id)?;
        let response = self.transport.delete_document(self.index_name(), id).await?;

        Ok(WriteOutcome {
            affected: usize::from(response.status == 200),
            id: Some(id.to_string()),
        })
    }

    /// Delete many documents by id in one bulk request.
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Per-id results; missing documents count as failed items
    /// * `Err(MapperError::ValidationError)` - If the list is empty or holds a blank id.
    ///   Nothing is sent in that case.
    #[instrument(skip_all, fields(index = %self.metadata.index_name(), count = ids.len()))]
    pub async fn delete_batch_by_ids<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> Result<BatchOperationSummary, MapperError> {
        require_ids(ids)?;

        let operations = ids
            .iter()
            .map(|id| BulkOperation::Delete {
                id: id.as_ref().to_string(),
            })
            .collect();

        self.bulk
            .execute(self.index_name(), operations, BatchPolicy::Tally)
            .await
    }

    /// Run a query and return the raw response.
    #[instrument(skip_all, fields(index = %self.metadata.index_name()))]
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, MapperError> {
        let body = self.requests.build(query)?;
        self.log_dsl(&body);
        self.transport.search(self.index_name(), &body).await
    }

    /// Run a query and decode the hits into entities.
    ///
    /// The key field of each entity is set to the hit's id unless the
    /// projection leaves the key field out.
    pub async fn select_list(&self, query: &SearchQuery) -> Result<Vec<T>, MapperError> {
        let response = self.search(query).await?;
        let include_id =
            DocumentCodec::include_identifier(self.metadata.key_field(), &query.include, &query.exclude);

        response
            .hits
            .iter()
            .map(|hit| self.codec.from_wire_hit(&hit.source, &hit.id, include_id))
            .collect()
    }

    /// Fetch one document by id.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(T))` - The document, with its key field set
    /// * `Ok(None)` - If there is no such document
    pub async fn select_by_id(&self, id: &str) -> Result<Option<T>, MapperError> {
        let id = require_id(id)?;
        let query = SearchQuery::new(ConditionList::new().eq("_id", id)).with_limit(1);
        Ok(self.select_list(&query).await?.into_iter().next())
    }

    /// Count the documents matching `conditions`.
    #[instrument(skip_all, fields(index = %self.metadata.index_name()))]
    pub async fn select_count(&self, conditions: &ConditionList) -> Result<u64, MapperError> {
        let body = self.requests.count(&SearchQuery::new(conditions.clone()))?;
        self.log_dsl(&body);
        Ok(self.transport.search(self.index_name(), &body).await?.total)
    }

    /// The search body a query compiles to, as pretty-printed JSON.
    pub fn get_source(&self, query: &SearchQuery) -> Result<String, MapperError> {
        let body = self.requests.build(query)?;
        Ok(serde_json::to_string_pretty(&body)?)
    }

    /// Check whether an index exists.
    pub async fn exists_index(&self, index: &str) -> Result<bool, MapperError> {
        self.transport.index_exists(index).await
    }

    /// Create an index from a settings/mappings/aliases body.
    ///
    /// See `opensearch::IndexDefinition` for a builder of such bodies.
    #[instrument(skip_all, fields(index = %index))]
    pub async fn create_index(&self, index: &str, body: &Value) -> Result<bool, MapperError> {
        self.transport.create_index(index, body).await
    }

    /// Settings and mappings for `T`'s index. Date fields without their own
    /// format are mapped with the configured one.
    pub fn index_definition(&self) -> IndexDefinition {
        IndexDefinition::from_metadata(&self.metadata, self.config.date_format.as_deref())
    }

    /// Delete an index.
    #[instrument(skip_all, fields(index = %index))]
    pub async fn delete_index(&self, index: &str) -> Result<bool, MapperError> {
        self.transport.delete_index(index).await
    }

    /// Resolve the ids of every document matching `conditions`, up to the
    /// default page size.
    async fn matching_ids(&self, conditions: &ConditionList) -> Result<Vec<String>, MapperError> {
        let body = self.requests.ids_only(&SearchQuery::new(conditions.clone()))?;
        self.log_dsl(&body);

        let response = self.transport.search(self.index_name(), &body).await?;
        debug!(matched = response.len(), total = response.total, "Resolved matching ids");
        Ok(response.ids())
    }
}
