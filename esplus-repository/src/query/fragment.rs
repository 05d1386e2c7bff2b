//! Query fragments and the boolean clause collector.

use esplus_shared::{GeoPoint, GeoShape, ShapeRelation};
use serde_json::{json, Map, Value};

/// Boolean occurrence slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occur {
    Must,
    Filter,
    Should,
    MustNot,
}

/// A single backend query fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFragment {
    Term {
        field: String,
        value: Value,
        boost: Option<f32>,
    },
    Terms {
        field: String,
        values: Vec<Value>,
        boost: Option<f32>,
    },
    Match {
        field: String,
        query: Value,
        boost: Option<f32>,
    },
    Prefix {
        field: String,
        value: Value,
        boost: Option<f32>,
    },
    Wildcard {
        field: String,
        pattern: String,
        boost: Option<f32>,
    },
    Range {
        field: String,
        gt: Option<Value>,
        gte: Option<Value>,
        lt: Option<Value>,
        lte: Option<Value>,
        boost: Option<f32>,
    },
    Exists {
        field: String,
        boost: Option<f32>,
    },
    /// Negation of the wrapped fragment.
    Not(Box<QueryFragment>),
    Bool(BoolQuery),
    GeoBoundingBox {
        field: String,
        top_left: GeoPoint,
        bottom_right: GeoPoint,
        boost: Option<f32>,
    },
    GeoDistance {
        field: String,
        center: GeoPoint,
        distance: String,
        boost: Option<f32>,
    },
    GeoPolygon {
        field: String,
        points: Vec<GeoPoint>,
        boost: Option<f32>,
    },
    GeoShape {
        field: String,
        shape: GeoShape,
        relation: Option<ShapeRelation>,
        boost: Option<f32>,
    },
}

fn point_json(point: &GeoPoint) -> Value {
    json!({ "lat": point.lat, "lon": point.lon })
}

fn with_boost(mut body: Map<String, Value>, boost: Option<f32>) -> Value {
    if let Some(boost) = boost {
        body.insert("boost".to_string(), json!(boost));
    }
    Value::Object(body)
}

/// `{kind: {field: value}}`, or `{kind: {field: {value_key: value, boost}}}` when boosted.
fn field_query(kind: &str, field: &str, value_key: &str, value: Value, boost: Option<f32>) -> Value {
    let inner = match boost {
        None => value,
        Some(boost) => json!({ value_key: value, "boost": boost }),
    };
    json!({ kind: { field: inner } })
}

impl QueryFragment {
    /// Wrap this fragment in a negation.
    pub fn negate(self) -> Self {
        QueryFragment::Not(Box::new(self))
    }

    /// Render the fragment in the backend query DSL.
    pub fn to_json(&self) -> Value {
        match self {
            QueryFragment::Term { field, value, boost } => {
                field_query("term", field, "value", value.clone(), *boost)
            }
            QueryFragment::Terms {
                field,
                values,
                boost,
            } => {
                let mut body = Map::new();
                body.insert(field.clone(), Value::Array(values.clone()));
                json!({ "terms": with_boost(body, *boost) })
            }
            QueryFragment::Match { field, query, boost } => {
                field_query("match", field, "query", query.clone(), *boost)
            }
            QueryFragment::Prefix { field, value, boost } => {
                field_query("prefix", field, "value", value.clone(), *boost)
            }
            QueryFragment::Wildcard {
                field,
                pattern,
                boost,
            } => field_query("wildcard", field, "value", json!(pattern), *boost),
            QueryFragment::Range {
                field,
                gt,
                gte,
                lt,
                lte,
                boost,
            } => {
                let mut bounds = Map::new();
                for (key, bound) in [("gt", gt), ("gte", gte), ("lt", lt), ("lte", lte)] {
                    if let Some(bound) = bound {
                        bounds.insert(key.to_string(), bound.clone());
                    }
                }
                json!({ "range": { field: with_boost(bounds, *boost) } })
            }
            QueryFragment::Exists { field, boost } => {
                let mut body = Map::new();
                body.insert("field".to_string(), json!(field));
                json!({ "exists": with_boost(body, *boost) })
            }
            QueryFragment::Not(inner) => json!({ "bool": { "must_not": [inner.to_json()] } }),
            QueryFragment::Bool(bool_query) => bool_query.to_json(),
            QueryFragment::GeoBoundingBox {
                field,
                top_left,
                bottom_right,
                boost,
            } => {
                let mut body = Map::new();
                body.insert(
                    field.clone(),
                    json!({
                        "top_left": point_json(top_left),
                        "bottom_right": point_json(bottom_right),
                    }),
                );
                json!({ "geo_bounding_box": with_boost(body, *boost) })
            }
            QueryFragment::GeoDistance {
                field,
                center,
                distance,
                boost,
            } => {
                let mut body = Map::new();
                body.insert("distance".to_string(), json!(distance));
                body.insert(field.clone(), point_json(center));
                json!({ "geo_distance": with_boost(body, *boost) })
            }
            QueryFragment::GeoPolygon {
                field,
                points,
                boost,
            } => {
                let mut body = Map::new();
                body.insert(
                    field.clone(),
                    json!({ "points": points.iter().map(point_json).collect::<Vec<_>>() }),
                );
                json!({ "geo_polygon": with_boost(body, *boost) })
            }
            QueryFragment::GeoShape {
                field,
                shape,
                relation,
                boost,
            } => {
                let mut spec = Map::new();
                match shape {
                    GeoShape::Geometry(geometry) => {
                        spec.insert("shape".to_string(), geometry.clone());
                    }
                    GeoShape::Indexed { id, index } => {
                        let mut indexed = Map::new();
                        indexed.insert("id".to_string(), json!(id));
                        if let Some(index) = index {
                            indexed.insert("index".to_string(), json!(index));
                        }
                        spec.insert("indexed_shape".to_string(), Value::Object(indexed));
                    }
                }
                if let Some(relation) = relation {
                    spec.insert("relation".to_string(), json!(relation));
                }
                let mut body = Map::new();
                body.insert(field.clone(), Value::Object(spec));
                json!({ "geo_shape": with_boost(body, *boost) })
            }
        }
    }
}

/// Boolean clause collector.
///
/// An empty collector renders as `{"bool": {}}`, which matches every document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoolQuery {
    pub must: Vec<QueryFragment>,
    pub filter: Vec<QueryFragment>,
    pub should: Vec<QueryFragment>,
    pub must_not: Vec<QueryFragment>,
}

impl BoolQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a fragment under the given slot.
    ///
    /// A negated fragment under `Must` or `Filter` is unwrapped into
    /// `must_not`; under `Should` it stays a nested negation so that it
    /// remains one alternative of the disjunction.
    pub fn add(&mut self, occur: Occur, fragment: QueryFragment) {
        match (occur, fragment) {
            (Occur::Must | Occur::Filter, QueryFragment::Not(inner)) => self.must_not.push(*inner),
            (Occur::Must, fragment) => self.must.push(fragment),
            (Occur::Filter, fragment) => self.filter.push(fragment),
            (Occur::Should, fragment) => self.should.push(fragment),
            (Occur::MustNot, fragment) => self.must_not.push(fragment),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
            && self.filter.is_empty()
            && self.should.is_empty()
            && self.must_not.is_empty()
    }

    /// Number of clauses across all slots.
    pub fn clause_count(&self) -> usize {
        self.must.len() + self.filter.len() + self.should.len() + self.must_not.len()
    }

    /// Render the query in the backend query DSL.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        for (key, clauses) in [
            ("must", &self.must),
            ("filter", &self.filter),
            ("should", &self.should),
            ("must_not", &self.must_not),
        ] {
            if !clauses.is_empty() {
                body.insert(
                    key.to_string(),
                    Value::Array(clauses.iter().map(QueryFragment::to_json).collect()),
                );
            }
        }
        json!({ "bool": body })
    }
}
