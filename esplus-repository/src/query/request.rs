//! Search request body assembly.

use esplus_shared::{AggregationKind, SearchQuery};
use serde_json::{json, Map, Value};

use super::compiler::QueryTreeCompiler;
use crate::errors::MapperError;

/// Assembles full search request bodies around a compiled query.
pub struct SearchRequestBuilder {
    default_size: usize,
}

impl SearchRequestBuilder {
    /// Create a builder that uses `default_size` for queries without a page size.
    pub fn new(default_size: usize) -> Self {
        Self { default_size }
    }

    /// Build the search body for a query.
    ///
    /// # Arguments
    ///
    /// * `query` - Conditions plus pagination, sort, projection, highlight and aggregations
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The request body
    /// * `Err(MapperError)` - If the conditions do not compile, or an
    ///   aggregation kind is not supported
    pub fn build(&self, query: &SearchQuery) -> Result<Value, MapperError> {
        let compiled = QueryTreeCompiler::compile_query(query)?;

        let mut body = Map::new();
        body.insert("query".to_string(), compiled.to_json());
        if let Some(from) = query.from {
            body.insert("from".to_string(), json!(from));
        }
        body.insert(
            "size".to_string(),
            json!(query.size.unwrap_or(self.default_size)),
        );

        if !query.sorts.is_empty() {
            let sort: Vec<Value> = query
                .sorts
                .iter()
                .flat_map(|directive| {
                    let order = if directive.asc { "asc" } else { "desc" };
                    directive
                        .fields
                        .iter()
                        .map(move |field| json!({ field: { "order": order } }))
                })
                .collect();
            body.insert("sort".to_string(), Value::Array(sort));
        }

        if query.has_projection() {
            let mut source = Map::new();
            if !query.include.is_empty() {
                source.insert("includes".to_string(), json!(query.include));
            }
            if !query.exclude.is_empty() {
                source.insert("excludes".to_string(), json!(query.exclude));
            }
            body.insert("_source".to_string(), Value::Object(source));
        }

        if !query.highlights.is_empty() {
            body.insert("highlight".to_string(), Self::highlight(query));
        }

        if !query.aggregations.is_empty() {
            let mut aggs = Map::new();
            for directive in &query.aggregations {
                let kind = match &directive.kind {
                    AggregationKind::Avg => "avg",
                    AggregationKind::Min => "min",
                    AggregationKind::Max => "max",
                    AggregationKind::Sum => "sum",
                    AggregationKind::Terms => "terms",
                    AggregationKind::Other(name) => {
                        return Err(MapperError::unsupported(format!(
                            "Aggregation kind '{}' for '{}' is not supported",
                            name, directive.name
                        )))
                    }
                };
                aggs.insert(
                    directive.name.clone(),
                    json!({ kind: { "field": directive.field } }),
                );
            }
            body.insert("aggs".to_string(), Value::Object(aggs));
        }

        Ok(Value::Object(body))
    }

    /// Body used to resolve the ids matching a query: source disabled,
    /// default page size.
    pub fn ids_only(&self, query: &SearchQuery) -> Result<Value, MapperError> {
        let compiled = QueryTreeCompiler::compile_query(query)?;
        Ok(json!({
            "query": compiled.to_json(),
            "size": self.default_size,
            "_source": false,
        }))
    }

    /// Body used to count the documents matching a query.
    pub fn count(&self, query: &SearchQuery) -> Result<Value, MapperError> {
        let compiled = QueryTreeCompiler::compile_query(query)?;
        Ok(json!({
            "query": compiled.to_json(),
            "size": 0,
            "track_total_hits": true,
        }))
    }

    /// Highlight directives share one tag pair per field; later directives
    /// win for the document-level tags.
    fn highlight(query: &SearchQuery) -> Value {
        let mut fields = Map::new();
        let mut pre_tags = Vec::new();
        let mut post_tags = Vec::new();
        for directive in &query.highlights {
            for field in &directive.fields {
                fields.insert(
                    field.clone(),
                    json!({
                        "pre_tags": [directive.pre_tag],
                        "post_tags": [directive.post_tag],
                    }),
                );
            }
            pre_tags = vec![directive.pre_tag.clone()];
            post_tags = vec![directive.post_tag.clone()];
        }
        json!({
            "pre_tags": pre_tags,
            "post_tags": post_tags,
            "fields": fields,
        })
    }
}

impl Default for SearchRequestBuilder {
    fn default() -> Self {
        Self::new(esplus_shared::DEFAULT_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esplus_shared::ConditionList;

    #[test]
    fn test_default_size_and_match_all() {
        let body = SearchRequestBuilder::default().build(&SearchQuery::all()).unwrap();
        assert_eq!(body, json!({"query": {"bool": {}}, "size": 10000}));
    }

    #[test]
    fn test_full_request() {
        let query = SearchQuery::new(ConditionList::new().eq("gender", "male"))
            .order_by_desc(["age"])
            .select(["name", "age"])
            .with_offset(20)
            .with_limit(10)
            .aggregate(AggregationKind::Avg, "avg_age", "age");

        let body = SearchRequestBuilder::new(100).build(&query).unwrap();
        assert_eq!(
            body,
            json!({
                "query": {"bool": {"must": [{"term": {"gender": "male"}}]}},
                "from": 20,
                "size": 10,
                "sort": [{"age": {"order": "desc"}}],
                "_source": {"includes": ["name", "age"]},
                "aggs": {"avg_age": {"avg": {"field": "age"}}}
            })
        );
    }

    #[test]
    fn test_highlight() {
        let query = SearchQuery::all().highlight(["title"], "<em>", "</em>");
        let body = SearchRequestBuilder::default().build(&query).unwrap();
        assert_eq!(
            body["highlight"]["fields"]["title"],
            json!({"pre_tags": ["<em>"], "post_tags": ["</em>"]})
        );
        assert_eq!(body["highlight"]["pre_tags"], json!(["<em>"]));
    }

    #[test]
    fn test_unknown_aggregation_is_unsupported() {
        let kind: AggregationKind = "percentiles".parse().unwrap();
        let query = SearchQuery::all().aggregate(kind, "p", "age");
        let result = SearchRequestBuilder::default().build(&query);
        assert!(matches!(result, Err(MapperError::UnsupportedOperation(_))));
    }

    #[test]
    fn test_ids_only_disables_source() {
        let query = SearchQuery::new(ConditionList::new().eq("a", 1));
        let body = SearchRequestBuilder::new(500).ids_only(&query).unwrap();
        assert_eq!(body["_source"], json!(false));
        assert_eq!(body["size"], json!(500));
    }
}
