//! Search query types for the document mapper.
//!
//! A [`SearchQuery`] pairs a [`ConditionList`] with the request directives
//! layered on top of the compiled boolean query: a geo filter, sorting, source
//! projection, pagination, highlighting and aggregations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::condition::ConditionList;

/// Page size used when the caller does not set one.
pub const DEFAULT_SIZE: usize = 10_000;

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Spatial relation for shape queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShapeRelation {
    #[default]
    Intersects,
    Disjoint,
    Within,
    Contains,
}

/// The shape a geo-shape query is checked against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum GeoShape {
    /// An inline GeoJSON geometry.
    Geometry(Value),
    /// A shape already stored in an index.
    Indexed { id: String, index: Option<String> },
}

/// The single spatial filter a query may carry.
///
/// The variants are mutually exclusive; whichever is set is rendered as an
/// unconditional filter clause.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum GeoDirective {
    BoundingBox {
        field: String,
        top_left: GeoPoint,
        bottom_right: GeoPoint,
        boost: Option<f32>,
    },
    Distance {
        field: String,
        center: GeoPoint,
        /// Distance with unit, e.g. `"12km"`.
        distance: String,
        boost: Option<f32>,
    },
    Polygon {
        field: String,
        points: Vec<GeoPoint>,
        boost: Option<f32>,
    },
    Shape {
        field: String,
        shape: GeoShape,
        relation: Option<ShapeRelation>,
        boost: Option<f32>,
    },
}

impl GeoDirective {
    pub fn bounding_box(field: impl Into<String>, top_left: GeoPoint, bottom_right: GeoPoint) -> Self {
        Self::BoundingBox {
            field: field.into(),
            top_left,
            bottom_right,
            boost: None,
        }
    }

    pub fn distance(field: impl Into<String>, center: GeoPoint, distance: impl Into<String>) -> Self {
        Self::Distance {
            field: field.into(),
            center,
            distance: distance.into(),
            boost: None,
        }
    }

    pub fn polygon(field: impl Into<String>, points: Vec<GeoPoint>) -> Self {
        Self::Polygon {
            field: field.into(),
            points,
            boost: None,
        }
    }

    pub fn shape(field: impl Into<String>, shape: GeoShape, relation: Option<ShapeRelation>) -> Self {
        Self::Shape {
            field: field.into(),
            shape,
            relation,
            boost: None,
        }
    }

    pub fn with_boost(mut self, value: f32) -> Self {
        match &mut self {
            Self::BoundingBox { boost, .. }
            | Self::Distance { boost, .. }
            | Self::Polygon { boost, .. }
            | Self::Shape { boost, .. } => *boost = Some(value),
        }
        self
    }
}

/// Sort by one or more fields in one direction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortDirective {
    pub fields: Vec<String>,
    pub asc: bool,
}

/// Highlight the given fields with the given tags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HighlightDirective {
    pub fields: Vec<String>,
    pub pre_tag: String,
    pub post_tag: String,
}

/// Aggregation kinds understood by the request assembler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKind {
    Avg,
    Min,
    Max,
    Sum,
    Terms,
    /// A kind the assembler does not support. Rejected at request assembly.
    Other(String),
}

impl std::str::FromStr for AggregationKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "avg" => Self::Avg,
            "min" => Self::Min,
            "max" => Self::Max,
            "sum" => Self::Sum,
            "terms" => Self::Terms,
            _ => Self::Other(s.to_string()),
        })
    }
}

/// A named aggregation over one field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregationDirective {
    pub name: String,
    pub field: String,
    pub kind: AggregationKind,
}

/// Search query parameters.
///
/// # Example
///
/// ```
/// use esplus_shared::{ConditionList, SearchQuery};
///
/// let query = SearchQuery::new(ConditionList::new().eq("gender", "male"))
///     .order_by_desc(["age"])
///     .with_offset(20)
///     .with_limit(10);
/// assert_eq!(query.size(), 10);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchQuery {
    pub conditions: ConditionList,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoDirective>,

    #[serde(default)]
    pub sorts: Vec<SortDirective>,

    /// Source fields to return. Empty means no include filter.
    #[serde(default)]
    pub include: Vec<String>,

    /// Source fields to drop. Empty means no exclude filter.
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,

    /// Page size. Falls back to [`DEFAULT_SIZE`] when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,

    #[serde(default)]
    pub highlights: Vec<HighlightDirective>,

    #[serde(default)]
    pub aggregations: Vec<AggregationDirective>,
}

impl SearchQuery {
    pub fn new(conditions: ConditionList) -> Self {
        Self {
            conditions,
            ..Default::default()
        }
    }

    /// A query matching every document.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_geo(mut self, geo: GeoDirective) -> Self {
        self.geo = Some(geo);
        self
    }

    pub fn order_by_asc<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.sorts.push(SortDirective {
            fields: fields.into_iter().map(Into::into).collect(),
            asc: true,
        });
        self
    }

    pub fn order_by_desc<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.sorts.push(SortDirective {
            fields: fields.into_iter().map(Into::into).collect(),
            asc: false,
        });
        self
    }

    /// Only return these source fields.
    pub fn select<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.include = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Return every source field except these.
    pub fn not_select<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.exclude = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the page size.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.size = Some(limit);
        self
    }

    /// Set the offset for pagination.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.from = Some(offset);
        self
    }

    pub fn highlight<S: Into<String>>(
        mut self,
        fields: impl IntoIterator<Item = S>,
        pre_tag: impl Into<String>,
        post_tag: impl Into<String>,
    ) -> Self {
        self.highlights.push(HighlightDirective {
            fields: fields.into_iter().map(Into::into).collect(),
            pre_tag: pre_tag.into(),
            post_tag: post_tag.into(),
        });
        self
    }

    pub fn aggregate(
        mut self,
        kind: AggregationKind,
        name: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        self.aggregations.push(AggregationDirective {
            name: name.into(),
            field: field.into(),
            kind,
        });
        self
    }

    /// Effective page size.
    pub fn size(&self) -> usize {
        self.size.unwrap_or(DEFAULT_SIZE)
    }

    /// Returns true if the caller restricted the returned source fields.
    pub fn has_projection(&self) -> bool {
        !self.include.is_empty() || !self.exclude.is_empty()
    }
}
