//! The entity stored by the example session.

use chrono::{DateTime, Utc};
use esplus_shared::{Document, DocumentMetadata, FieldDescriptor, FieldStrategy, GeoPoint, IdType};
use serde::{Deserialize, Serialize};

/// A short text document with an author, a creation time and a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestDocument {
    pub id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    /// Omitted from the stored document when empty.
    pub creator: Option<String>,
    pub gmt_create: Option<DateTime<Utc>>,
    pub location: Option<GeoPoint>,
}

impl TestDocument {
    pub const INDEX: &'static str = "esplus_test_documents";

    /// Stored format of `gmt_create`.
    pub const DATE_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            title: Some(title.into()),
            content: None,
            creator: None,
            gmt_create: None,
            location: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.gmt_create = Some(at);
        self
    }

    pub fn located_at(mut self, lat: f64, lon: f64) -> Self {
        self.location = Some(GeoPoint::new(lat, lon));
        self
    }
}

impl Document for TestDocument {
    fn describe() -> DocumentMetadata {
        DocumentMetadata::new(Self::INDEX)
            .key_field_name("id")
            .id_type_mode(IdType::Custom)
            .field(FieldDescriptor::new("title"))
            .field(FieldDescriptor::new("content").strategy(FieldStrategy::NotNull))
            .field(FieldDescriptor::new("creator").strategy(FieldStrategy::NotEmpty))
            .field(FieldDescriptor::new("gmt_create").date_format(Self::DATE_FORMAT))
            .field(FieldDescriptor::new("location").strategy(FieldStrategy::NotNull))
    }
}
