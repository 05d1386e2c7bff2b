//! Index settings and mappings.
//!
//! A small builder for the body sent when creating an index. Callers that
//! already have a settings document can pass it to `create_index` directly.

use esplus_shared::{DocumentMetadata, FieldKind};
use serde_json::{json, Map, Value};

/// Settings, mappings and alias of an index to create.
#[derive(Debug, Clone)]
pub struct IndexDefinition {
    /// The concrete index name.
    pub name: String,
    /// Optional alias pointing at the index.
    pub alias: Option<String>,
    pub shards: u32,
    pub replicas: u32,
    /// Field mappings keyed by field name.
    pub properties: Map<String, Value>,
}

impl IndexDefinition {
    /// Create a definition with 1 shard and 1 replica and no mappings.
    ///
    /// # Arguments
    ///
    /// * `name` - The index name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            shards: 1,
            replicas: 1,
            properties: Map::new(),
        }
    }

    /// Derive mappings from entity metadata.
    ///
    /// Date-time fields map to `date`, using the field's format, else
    /// `default_format` (pass `MapperConfig::date_format` so the mapping
    /// accepts what the codec writes). Other fields are left to dynamic
    /// mapping.
    pub fn from_metadata(metadata: &DocumentMetadata, default_format: Option<&str>) -> Self {
        let mut definition = Self::new(metadata.index_name());
        for field in metadata.field_list() {
            if field.kind != FieldKind::DateTime {
                continue;
            }
            let mapping = match field.date_format.as_deref().or(default_format) {
                Some(format) => json!({ "type": "date", "format": to_backend_format(format) }),
                None => json!({ "type": "date" }),
            };
            definition.properties.insert(field.name.clone(), mapping);
        }
        definition
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_shards(mut self, shards: u32, replicas: u32) -> Self {
        self.shards = shards;
        self.replicas = replicas;
        self
    }

    /// Set the mapping of one field, replacing any previous mapping.
    pub fn with_property(mut self, field: impl Into<String>, mapping: Value) -> Self {
        self.properties.insert(field.into(), mapping);
        self
    }

    /// The create-index request body.
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "settings": {
                "number_of_shards": self.shards,
                "number_of_replicas": self.replicas
            },
            "mappings": {
                "properties": self.properties
            }
        });
        if let Some(alias) = &self.alias {
            body["aliases"] = json!({ alias: {} });
        }
        body
    }
}

/// Translate chrono specifiers into the backend's date pattern syntax.
///
/// Literal text holding letters is quoted, since bare letters are pattern
/// symbols on the backend side.
fn to_backend_format(format: &str) -> String {
    let mut pattern = String::new();
    let mut literal = String::new();
    let mut chars = format.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }
        let symbol = match chars.next() {
            Some('Y') => "yyyy",
            Some('y') => "yy",
            Some('m') => "MM",
            Some('b') => "MMM",
            Some('d') => "dd",
            Some('j') => "DDD",
            Some('H') => "HH",
            Some('M') => "mm",
            Some('S') => "ss",
            Some('f') => "SSSSSSSSS",
            Some('z') => "Z",
            Some(':') if chars.as_str().starts_with('z') => {
                chars.next();
                "XXX"
            }
            Some('%') => {
                literal.push('%');
                continue;
            }
            Some(other) => {
                literal.push('%');
                literal.push(other);
                continue;
            }
            None => {
                literal.push('%');
                continue;
            }
        };
        flush_literal(&mut pattern, &mut literal);
        pattern.push_str(symbol);
    }
    flush_literal(&mut pattern, &mut literal);
    pattern
}

fn flush_literal(pattern: &mut String, literal: &mut String) {
    if literal.chars().any(|c| c.is_ascii_alphabetic() || c == '\'') {
        pattern.push('\'');
        pattern.push_str(&literal.replace('\'', "''"));
        pattern.push('\'');
    } else {
        pattern.push_str(literal);
    }
    literal.clear();
}
