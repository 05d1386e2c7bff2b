//! End-to-end tests of the document mapper against an in-memory transport.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use esplus_repository::{
    BulkAction, BulkItemResponse, BulkOperation, BulkResponse, DocumentMapper, MapperConfig,
    MapperError, SearchTransport, UpdateSet, WriteResponse,
};
use esplus_shared::{
    ConditionList, Document, DocumentMetadata, FieldDescriptor, FieldStrategy, IdType, SearchHit,
    SearchQuery, SearchResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

/// A wire call seen by the transport.
#[derive(Debug, Clone, PartialEq)]
enum Call {
    Index,
    Update,
    Delete,
    Bulk(Vec<BulkAction>),
    Search(Value),
}

/// In-memory transport holding one map of documents per index.
///
/// Search understands the subset of the query DSL the tests use: bool
/// queries with term, terms, match and range leaves.
#[derive(Default)]
struct InMemoryTransport {
    indices: Mutex<BTreeMap<String, BTreeMap<String, Value>>>,
    calls: Mutex<Vec<Call>>,
    failing_positions: Mutex<HashSet<usize>>,
    next_id: Mutex<u64>,
}

impl InMemoryTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn fail_bulk_positions(&self, positions: &[usize]) {
        *self.failing_positions.lock().await = positions.iter().copied().collect();
    }

    async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    async fn stored(&self, index: &str, id: &str) -> Option<Value> {
        self.indices
            .lock()
            .await
            .get(index)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    async fn generate_id(&self) -> String {
        let mut next = self.next_id.lock().await;
        *next += 1;
        format!("auto-{}", next)
    }

    /// Store a document, returning the write status (201 new, 200 replaced).
    async fn store(&self, index: &str, id: Option<&str>, document: &Value) -> WriteResponse {
        let id = match id {
            Some(id) => id.to_string(),
            None => self.generate_id().await,
        };
        let replaced = self
            .indices
            .lock()
            .await
            .entry(index.to_string())
            .or_default()
            .insert(id.clone(), document.clone())
            .is_some();
        WriteResponse {
            status: if replaced { 200 } else { 201 },
            id,
            result: Some(if replaced { "updated" } else { "created" }.to_string()),
        }
    }

    /// Merge a partial document into a stored one. `false` when it is missing.
    async fn merge(&self, index: &str, id: &str, patch: &Value) -> bool {
        let mut indices = self.indices.lock().await;
        let Some(Value::Object(target)) = indices.get_mut(index).and_then(|docs| docs.get_mut(id))
        else {
            return false;
        };
        if let Value::Object(patch) = patch {
            for (key, value) in patch {
                target.insert(key.clone(), value.clone());
            }
        }
        true
    }

    async fn remove(&self, index: &str, id: &str) -> WriteResponse {
        let removed = self
            .indices
            .lock()
            .await
            .get_mut(index)
            .and_then(|docs| docs.remove(id))
            .is_some();
        WriteResponse {
            status: if removed { 200 } else { 404 },
            id: id.to_string(),
            result: None,
        }
    }
}

fn compare(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn field_value(id: &str, source: &Value, field: &str) -> Option<Value> {
    if field == "_id" {
        return Some(Value::String(id.to_string()));
    }
    source.get(field).cloned()
}

/// Unwrap `{"f": v}` or `{"f": {"value": v}}`.
fn leaf(clause: &Value, value_key: &str) -> Option<(String, Value)> {
    let (field, spec) = clause.as_object()?.iter().find(|(key, _)| *key != "boost")?;
    let value = match spec {
        Value::Object(object) if object.contains_key(value_key) => object[value_key].clone(),
        other => other.clone(),
    };
    Some((field.clone(), value))
}

fn query_matches(query: &Value, id: &str, source: &Value) -> bool {
    let Some((kind, clause)) = query.as_object().and_then(|object| object.iter().next()) else {
        return true;
    };
    match kind.as_str() {
        "bool" => {
            let all = |slot: &str| {
                clause[slot]
                    .as_array()
                    .map_or(true, |clauses| clauses.iter().all(|c| query_matches(c, id, source)))
            };
            let none = clause["must_not"]
                .as_array()
                .map_or(true, |clauses| !clauses.iter().any(|c| query_matches(c, id, source)));
            let should = match clause["should"].as_array() {
                Some(clauses) if !clauses.is_empty() => {
                    let required = clause.get("must").is_none() && clause.get("filter").is_none();
                    !required || clauses.iter().any(|c| query_matches(c, id, source))
                }
                _ => true,
            };
            all("must") && all("filter") && none && should
        }
        "term" | "match" => {
            let key = if kind == "term" { "value" } else { "query" };
            leaf(clause, key).map_or(false, |(field, expected)| {
                field_value(id, source, &field) == Some(expected)
            })
        }
        "terms" => leaf(clause, "value").map_or(false, |(field, expected)| {
            let actual = field_value(id, source, &field);
            expected
                .as_array()
                .map_or(false, |values| values.iter().any(|v| Some(v) == actual.as_ref()))
        }),
        "range" => leaf(clause, "").map_or(false, |(field, bounds)| {
            let Some(actual) = field_value(id, source, &field) else {
                return false;
            };
            bounds.as_object().map_or(false, |bounds| {
                bounds.iter().all(|(op, bound)| {
                    use std::cmp::Ordering::*;
                    match (op.as_str(), compare(&actual, bound)) {
                        ("gt", Some(ord)) => ord == Greater,
                        ("gte", Some(ord)) => ord != Less,
                        ("lt", Some(ord)) => ord == Less,
                        ("lte", Some(ord)) => ord != Greater,
                        ("boost", _) => true,
                        _ => false,
                    }
                })
            })
        }),
        _ => false,
    }
}

fn project(source: &Value, spec: Option<&Value>) -> Value {
    match spec {
        Some(Value::Bool(false)) => Value::Null,
        Some(Value::Object(spec)) => {
            let names = |key: &str| -> Vec<String> {
                spec.get(key)
                    .and_then(Value::as_array)
                    .map(|names| names.iter().filter_map(|n| n.as_str().map(str::to_string)).collect())
                    .unwrap_or_default()
            };
            let (include, exclude) = (names("includes"), names("excludes"));
            let projected: Map<String, Value> = source
                .as_object()
                .map(|object| {
                    object
                        .iter()
                        .filter(|(key, _)| include.is_empty() || include.contains(key))
                        .filter(|(key, _)| !exclude.contains(key))
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect()
                })
                .unwrap_or_default();
            Value::Object(projected)
        }
        _ => source.clone(),
    }
}

#[async_trait]
impl SearchTransport for InMemoryTransport {
    async fn index_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: &Value,
    ) -> Result<WriteResponse, MapperError> {
        self.calls.lock().await.push(Call::Index);
        Ok(self.store(index, id, document).await)
    }

    async fn update_document(
        &self,
        index: &str,
        id: &str,
        document: &Value,
    ) -> Result<WriteResponse, MapperError> {
        self.calls.lock().await.push(Call::Update);
        if !self.merge(index, id, document).await {
            return Err(MapperError::transport("Update failed with status 404"));
        }
        Ok(WriteResponse {
            status: 200,
            id: id.to_string(),
            result: Some("updated".to_string()),
        })
    }

    async fn delete_document(&self, index: &str, id: &str) -> Result<WriteResponse, MapperError> {
        self.calls.lock().await.push(Call::Delete);
        Ok(self.remove(index, id).await)
    }

    async fn bulk(
        &self,
        index: &str,
        operations: &[BulkOperation],
    ) -> Result<BulkResponse, MapperError> {
        self.calls
            .lock()
            .await
            .push(Call::Bulk(operations.iter().map(BulkOperation::action).collect()));
        let failing = self.failing_positions.lock().await.clone();

        let mut items = Vec::with_capacity(operations.len());
        for (position, operation) in operations.iter().enumerate() {
            let (id, status, error) = if failing.contains(&position) {
                (
                    operation.id().map(str::to_string),
                    400,
                    Some("mapper_parsing_exception: simulated".to_string()),
                )
            } else {
                match operation {
                    BulkOperation::Index { id, document } => {
                        let response = self.store(index, id.as_deref(), document).await;
                        (Some(response.id), response.status, None)
                    }
                    BulkOperation::Update { id, document } => {
                        if self.merge(index, id, document).await {
                            (Some(id.clone()), 200, None)
                        } else {
                            (
                                Some(id.clone()),
                                404,
                                Some("document_missing_exception".to_string()),
                            )
                        }
                    }
                    BulkOperation::Delete { id } => {
                        let response = self.remove(index, id).await;
                        (Some(response.id), response.status, None)
                    }
                }
            };
            items.push(BulkItemResponse {
                action: operation.action(),
                id,
                status,
                error,
            });
        }

        Ok(BulkResponse {
            took_ms: 1,
            errors: items.iter().any(|item| item.error.is_some()),
            items,
        })
    }

    async fn search(&self, index: &str, body: &Value) -> Result<SearchResponse, MapperError> {
        self.calls.lock().await.push(Call::Search(body.clone()));
        let indices = self.indices.lock().await;
        let size = body["size"].as_u64().unwrap_or(10) as usize;

        let matched: Vec<(&String, &Value)> = indices
            .get(index)
            .map(|docs| {
                docs.iter()
                    .filter(|(id, source)| query_matches(&body["query"], id, source))
                    .collect()
            })
            .unwrap_or_default();

        let hits = matched
            .iter()
            .take(size)
            .map(|(id, source)| SearchHit {
                id: id.to_string(),
                score: Some(1.0),
                source: project(source, body.get("_source")),
                highlight: None,
            })
            .collect();

        Ok(SearchResponse::new(hits, matched.len() as u64, 1))
    }

    async fn index_exists(&self, index: &str) -> Result<bool, MapperError> {
        Ok(self.indices.lock().await.contains_key(index))
    }

    async fn create_index(&self, index: &str, _body: &Value) -> Result<bool, MapperError> {
        let mut indices = self.indices.lock().await;
        if indices.contains_key(index) {
            return Err(MapperError::transport("resource_already_exists_exception"));
        }
        indices.insert(index.to_string(), BTreeMap::new());
        Ok(true)
    }

    async fn delete_index(&self, index: &str) -> Result<bool, MapperError> {
        Ok(self.indices.lock().await.remove(index).is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TestDocument {
    id: Option<String>,
    title: Option<String>,
    creator: Option<String>,
    age: Option<u32>,
    gmt_create: Option<DateTime<Utc>>,
}

impl Document for TestDocument {
    fn describe() -> DocumentMetadata {
        DocumentMetadata::new("test_documents")
            .key_field_name("id")
            .id_type_mode(IdType::Custom)
            .field(FieldDescriptor::new("title"))
            .field(FieldDescriptor::new("creator").strategy(FieldStrategy::NotEmpty))
            .field(FieldDescriptor::new("age").strategy(FieldStrategy::NotNull))
            .field(FieldDescriptor::new("gmt_create").date_format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Same shape, backend-assigned ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Memo {
    id: Option<String>,
    body: Option<String>,
}

impl Document for Memo {
    fn describe() -> DocumentMetadata {
        DocumentMetadata::new("memos")
            .key_field_name("id")
            .field(FieldDescriptor::new("body"))
    }
}

fn doc(id: &str, title: &str, age: u32) -> TestDocument {
    TestDocument {
        id: Some(id.to_string()),
        title: Some(title.to_string()),
        creator: Some("ann".to_string()),
        age: Some(age),
        gmt_create: Some(Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()),
    }
}

fn mapper(transport: &Arc<InMemoryTransport>) -> DocumentMapper<TestDocument> {
    DocumentMapper::new(transport.clone(), MapperConfig::default()).unwrap()
}

#[tokio::test]
async fn test_custom_id_round_trip() {
    let transport = InMemoryTransport::new();
    let mapper = mapper(&transport);
    let original = doc("doc-1", "hello", 30);

    let outcome = mapper.insert(&original).await.unwrap();
    assert_eq!(outcome.affected, 1);
    assert_eq!(outcome.id.as_deref(), Some("doc-1"));

    let stored = transport.stored("test_documents", "doc-1").await.unwrap();
    assert!(stored.get("id").is_none());
    assert_eq!(stored["gmt_create"], json!("2024-05-06 07:08:09"));

    let fetched = mapper.select_by_id("doc-1").await.unwrap().unwrap();
    assert_eq!(fetched, original);
}

#[tokio::test]
async fn test_not_empty_field_is_omitted_and_reads_back_unset() {
    let transport = InMemoryTransport::new();
    let mapper = mapper(&transport);
    let mut entity = doc("doc-2", "t", 1);
    entity.creator = Some(String::new());

    mapper.insert(&entity).await.unwrap();

    let stored = transport.stored("test_documents", "doc-2").await.unwrap();
    assert!(stored.get("creator").is_none());

    let fetched = mapper.select_by_id("doc-2").await.unwrap().unwrap();
    assert_eq!(fetched.creator, None);
}

#[tokio::test]
async fn test_insert_batch_with_one_failure_reports_zero_successes() {
    let transport = InMemoryTransport::new();
    let mapper = mapper(&transport);
    let entities: Vec<TestDocument> = (0..10).map(|i| doc(&format!("d{}", i), "x", i)).collect();

    transport.fail_bulk_positions(&[4]).await;
    let result = mapper.insert_batch(&entities).await;

    assert!(matches!(
        result,
        Err(MapperError::BatchFailure {
            total: 10,
            failed: 1,
            succeeded: 0
        })
    ));
}

#[tokio::test]
async fn test_update_batch_by_id_tallies_partial_failure() {
    let transport = InMemoryTransport::new();
    let mapper = mapper(&transport);
    let entities: Vec<TestDocument> = (0..10).map(|i| doc(&format!("d{}", i), "x", i)).collect();
    let inserted = mapper.insert_batch(&entities).await.unwrap();
    assert_eq!(inserted.succeeded, 10);

    transport.fail_bulk_positions(&[4]).await;
    let summary = mapper.update_batch_by_id(&entities).await.unwrap();

    assert_eq!(summary.total, 10);
    assert_eq!(summary.succeeded, 9);
    assert_eq!(summary.failed, 1);
    assert!(!summary.results[4].success);
    assert_eq!(summary.results[4].id.as_deref(), Some("d4"));
}

#[tokio::test]
async fn test_delete_batch_of_no_ids_makes_no_wire_call() {
    let transport = InMemoryTransport::new();
    let mapper = mapper(&transport);

    let ids: Vec<String> = Vec::new();
    let result = mapper.delete_batch_by_ids(&ids).await;

    assert!(matches!(result, Err(MapperError::ValidationError(_))));
    assert!(transport.calls().await.is_empty());
}

#[tokio::test]
async fn test_backend_ids_are_returned_not_written() {
    let transport = InMemoryTransport::new();
    let mapper: DocumentMapper<Memo> =
        DocumentMapper::new(transport.clone(), MapperConfig::default()).unwrap();
    let mut memo = Memo {
        id: None,
        body: Some("remember".to_string()),
    };

    let outcome = mapper.insert(&memo).await.unwrap();
    let id = outcome.id.unwrap();
    assert!(id.starts_with("auto-"));
    assert!(memo.id.is_none());

    mapper.codec().assign_identifier(&mut memo, &id).unwrap();
    assert_eq!(memo.id.as_deref(), Some(id.as_str()));

    let batch = vec![memo.clone(), memo.clone()];
    let summary = mapper.insert_batch(&batch).await.unwrap();
    let assigned = summary.assigned_ids();
    assert_eq!(assigned.len(), 2);
    assert!(assigned.iter().all(|id| id.is_some()));
}

#[tokio::test]
async fn test_uuid_ids_from_config_default() {
    let transport = InMemoryTransport::new();
    #[derive(Debug, Serialize, Deserialize)]
    struct Tag {
        id: Option<String>,
        label: String,
    }
    impl Document for Tag {
        fn describe() -> DocumentMetadata {
            DocumentMetadata::new("tags")
                .key_field_name("id")
                .field(FieldDescriptor::new("label"))
        }
    }

    let config = MapperConfig::default().with_default_id_type(IdType::Uuid);
    let mapper: DocumentMapper<Tag> = DocumentMapper::new(transport.clone(), config).unwrap();
    let outcome = mapper
        .insert(&Tag {
            id: None,
            label: "rust".to_string(),
        })
        .await
        .unwrap();

    let id = outcome.id.unwrap();
    assert_eq!(id.len(), 36);
    assert!(transport.stored("tags", &id).await.is_some());
}

#[tokio::test]
async fn test_condition_update_resolves_ids_then_bulks() {
    let transport = InMemoryTransport::new();
    let mapper = mapper(&transport);
    for (i, age) in [20, 30, 40].iter().enumerate() {
        mapper.insert(&doc(&format!("u{}", i), "old", *age)).await.unwrap();
    }
    transport.calls.lock().await.clear();

    let summary = mapper
        .update(
            UpdateSet::Fields(vec![("title".to_string(), json!("new"))]),
            &ConditionList::new().ge("age", 30),
        )
        .await
        .unwrap();
    assert_eq!(summary.succeeded, 2);

    let calls = transport.calls().await;
    assert_eq!(calls.len(), 2);
    match &calls[0] {
        Call::Search(body) => {
            assert_eq!(body["_source"], json!(false));
            assert_eq!(body["size"], json!(10000));
            assert_eq!(body["query"], json!({"bool": {"must": [{"range": {"age": {"gte": 30}}}]}}));
        }
        other => panic!("expected a search first, got {:?}", other),
    }
    assert_eq!(calls[1], Call::Bulk(vec![BulkAction::Update, BulkAction::Update]));

    assert_eq!(transport.stored("test_documents", "u0").await.unwrap()["title"], "old");
    assert_eq!(transport.stored("test_documents", "u2").await.unwrap()["title"], "new");
}

#[tokio::test]
async fn test_condition_delete_and_count() {
    let transport = InMemoryTransport::new();
    let mapper = mapper(&transport);
    for i in 0..5 {
        mapper.insert(&doc(&format!("c{}", i), "x", i)).await.unwrap();
    }

    let conditions = ConditionList::new().in_values("age", [1, 3]);
    assert_eq!(mapper.select_count(&conditions).await.unwrap(), 2);

    let summary = mapper.delete(&conditions).await.unwrap();
    assert_eq!(summary.succeeded, 2);
    assert_eq!(mapper.select_count(&ConditionList::new()).await.unwrap(), 3);
}

#[tokio::test]
async fn test_delete_by_id_status() {
    let transport = InMemoryTransport::new();
    let mapper = mapper(&transport);
    mapper.insert(&doc("gone", "x", 1)).await.unwrap();

    assert_eq!(mapper.delete_by_id("gone").await.unwrap().affected, 1);
    assert_eq!(mapper.delete_by_id("gone").await.unwrap().affected, 0);
}

#[tokio::test]
async fn test_update_by_id_merges_document() {
    let transport = InMemoryTransport::new();
    let mapper = mapper(&transport);
    mapper.insert(&doc("m1", "first", 10)).await.unwrap();

    let mut changed = doc("m1", "second", 11);
    changed.age = None;
    let outcome = mapper.update_by_id(&changed).await.unwrap();
    assert_eq!(outcome.affected, 1);

    let stored = transport.stored("test_documents", "m1").await.unwrap();
    assert_eq!(stored["title"], "second");
    // NotNull field left untouched
    assert_eq!(stored["age"], 10);
}

#[tokio::test]
async fn test_projection_controls_identifier() {
    let transport = InMemoryTransport::new();
    let mapper = mapper(&transport);
    mapper.insert(&doc("p1", "projected", 5)).await.unwrap();

    let without_id = mapper
        .select_list(&SearchQuery::all().select(["title"]))
        .await
        .unwrap();
    assert_eq!(without_id[0].id, None);
    assert_eq!(without_id[0].title.as_deref(), Some("projected"));
    assert_eq!(without_id[0].age, None);

    let with_id = mapper
        .select_list(&SearchQuery::all().not_select(["age"]))
        .await
        .unwrap();
    assert_eq!(with_id[0].id.as_deref(), Some("p1"));
}

#[tokio::test]
async fn test_sticky_or_after_chain() {
    let transport = InMemoryTransport::new();
    let mapper = mapper(&transport);

    // a AND b OR c AND d compiles to must[a, b] + should[c, d]
    let query = SearchQuery::new(
        ConditionList::new()
            .eq("a", 1)
            .eq("b", 2)
            .or()
            .eq("c", 3)
            .eq("d", 4),
    );
    let body: Value = serde_json::from_str(&mapper.get_source(&query).unwrap()).unwrap();
    assert_eq!(
        body["query"],
        json!({"bool": {
            "must": [{"term": {"a": 1}}, {"term": {"b": 2}}],
            "should": [{"term": {"c": 3}}, {"term": {"d": 4}}]
        }})
    );
}

#[tokio::test]
async fn test_index_management() {
    let transport = InMemoryTransport::new();
    let mapper = mapper(&transport);

    assert!(!mapper.exists_index("scratch").await.unwrap());
    assert!(mapper.create_index("scratch", &json!({})).await.unwrap());
    assert!(mapper.exists_index("scratch").await.unwrap());
    assert!(mapper.create_index("scratch", &json!({})).await.is_err());
    assert!(mapper.delete_index("scratch").await.unwrap());
}
