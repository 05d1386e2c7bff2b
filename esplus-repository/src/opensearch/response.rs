//! Parsing of OpenSearch response bodies.

use esplus_shared::{SearchHit, SearchResponse};
use serde_json::Value;

use crate::errors::MapperError;
use crate::types::{BulkAction, BulkItemResponse, BulkResponse, WriteResponse};

/// Parse the body of an index, update or delete response.
pub fn parse_write_response(status: u16, body: &Value) -> Result<WriteResponse, MapperError> {
    let id = body
        .get("_id")
        .and_then(Value::as_str)
        .ok_or_else(|| MapperError::transport(format!("Write response without _id: {}", body)))?;

    Ok(WriteResponse {
        status,
        id: id.to_string(),
        result: body.get("result").and_then(Value::as_str).map(str::to_string),
    })
}

/// Parse a bulk response body. Items keep request order.
pub fn parse_bulk_response(body: &Value) -> Result<BulkResponse, MapperError> {
    let items = body
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| MapperError::transport("Bulk response without items"))?;

    let items = items
        .iter()
        .map(parse_bulk_item)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BulkResponse {
        took_ms: body.get("took").and_then(Value::as_u64).unwrap_or(0),
        errors: body.get("errors").and_then(Value::as_bool).unwrap_or(false),
        items,
    })
}

fn parse_bulk_item(item: &Value) -> Result<BulkItemResponse, MapperError> {
    let (name, result) = item
        .as_object()
        .and_then(|object| object.iter().next())
        .ok_or_else(|| MapperError::transport(format!("Malformed bulk item: {}", item)))?;

    let action = BulkAction::from_wire(name)
        .ok_or_else(|| MapperError::transport(format!("Unknown bulk action '{}'", name)))?;

    let status = result
        .get("status")
        .and_then(Value::as_u64)
        .and_then(|status| u16::try_from(status).ok())
        .ok_or_else(|| MapperError::transport(format!("Bulk item without status: {}", item)))?;

    Ok(BulkItemResponse {
        action,
        id: result.get("_id").and_then(Value::as_str).map(str::to_string),
        status,
        error: result.get("error").map(error_reason),
    })
}

fn error_reason(error: &Value) -> String {
    match (
        error.get("type").and_then(Value::as_str),
        error.get("reason").and_then(Value::as_str),
    ) {
        (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
        (None, Some(reason)) => reason.to_string(),
        _ => error.to_string(),
    }
}

/// Parse a search response body.
///
/// Accepts both the object (`{"value": n}`) and the legacy numeric form of
/// `hits.total`.
pub fn parse_search_response(body: &Value) -> Result<SearchResponse, MapperError> {
    let hits = body
        .get("hits")
        .ok_or_else(|| MapperError::transport("Search response without hits"))?;

    let total = match hits.get("total") {
        Some(Value::Number(total)) => total.as_u64().unwrap_or(0),
        Some(total) => total.get("value").and_then(Value::as_u64).unwrap_or(0),
        None => 0,
    };

    let hits = hits
        .get("hits")
        .and_then(Value::as_array)
        .map(|hits| hits.iter().map(parse_hit).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();

    let mut response = SearchResponse::new(
        hits,
        total,
        body.get("took").and_then(Value::as_u64).unwrap_or(0),
    );
    response.aggregations = body.get("aggregations").cloned();
    Ok(response)
}

fn parse_hit(hit: &Value) -> Result<SearchHit, MapperError> {
    let id = hit
        .get("_id")
        .and_then(Value::as_str)
        .ok_or_else(|| MapperError::transport(format!("Search hit without _id: {}", hit)))?;

    Ok(SearchHit {
        id: id.to_string(),
        score: hit.get("_score").and_then(Value::as_f64),
        source: hit.get("_source").cloned().unwrap_or(Value::Null),
        highlight: hit.get("highlight").cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_write_response() {
        let body = json!({"_index": "users", "_id": "abc", "result": "created", "_version": 1});
        let response = parse_write_response(201, &body).unwrap();
        assert_eq!(response.id, "abc");
        assert_eq!(response.status, 201);
        assert_eq!(response.result.as_deref(), Some("created"));

        assert!(parse_write_response(200, &json!({})).is_err());
    }

    #[test]
    fn test_parse_bulk_response() {
        let body = json!({
            "took": 30,
            "errors": true,
            "items": [
                {"index": {"_id": "1", "status": 201, "result": "created"}},
                {"create": {"_id": "2", "status": 409, "error": {
                    "type": "version_conflict_engine_exception",
                    "reason": "document already exists"
                }}},
                {"delete": {"_id": "3", "status": 404, "result": "not_found"}}
            ]
        });

        let response = parse_bulk_response(&body).unwrap();
        assert_eq!(response.took_ms, 30);
        assert!(response.errors);
        assert_eq!(response.items.len(), 3);
        assert!(response.items[0].is_created());
        assert_eq!(response.items[1].action, BulkAction::Index);
        assert_eq!(
            response.items[1].error.as_deref(),
            Some("version_conflict_engine_exception: document already exists")
        );
        assert_eq!(response.items[2].status, 404);
        assert!(response.items[2].error.is_none());
    }

    #[test]
    fn test_parse_bulk_response_rejects_unknown_action() {
        let body = json!({"items": [{"noop": {"_id": "1", "status": 200}}]});
        assert!(matches!(
            parse_bulk_response(&body),
            Err(MapperError::TransportError { .. })
        ));
    }

    #[test]
    fn test_parse_search_response() {
        let body = json!({
            "took": 4,
            "hits": {
                "total": {"value": 42, "relation": "eq"},
                "hits": [
                    {"_id": "a", "_score": 1.2, "_source": {"name": "x"}},
                    {"_id": "b", "_score": null, "highlight": {"name": ["<em>y</em>"]}}
                ]
            },
            "aggregations": {"avg_age": {"value": 30.5}}
        });

        let response = parse_search_response(&body).unwrap();
        assert_eq!(response.total, 42);
        assert_eq!(response.took_ms, 4);
        assert_eq!(response.ids(), vec!["a", "b"]);
        assert_eq!(response.hits[0].score, Some(1.2));
        assert_eq!(response.hits[1].source, Value::Null);
        assert!(response.hits[1].highlight.is_some());
        assert_eq!(response.aggregations, Some(json!({"avg_age": {"value": 30.5}})));
    }

    #[test]
    fn test_parse_search_response_legacy_total() {
        let body = json!({"took": 1, "hits": {"total": 7, "hits": []}});
        let response = parse_search_response(&body).unwrap();
        assert_eq!(response.total, 7);
        assert!(response.is_empty());
    }
}
