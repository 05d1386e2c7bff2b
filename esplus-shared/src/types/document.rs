//! Document metadata types.
//!
//! Every entity stored through the mapper describes itself once with a
//! [`DocumentMetadata`] record: the target index, the identifier field, how
//! identifiers are generated and a descriptor for every persisted field.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Write-inclusion policy for a single field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldStrategy {
    /// Always written.
    #[default]
    Default,
    /// Always written, regardless of value.
    Ignored,
    /// Written only when the value is non-null.
    NotNull,
    /// Written only when the value is non-null and, for text, non-empty.
    NotEmpty,
}

/// How document identifiers are produced on insert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdType {
    /// The backend assigns the identifier.
    #[default]
    Backend,
    /// A random UUID is generated client-side.
    Uuid,
    /// The identifier is read from the entity's key field.
    Custom,
}

impl std::str::FromStr for IdType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "backend" | "auto" | "none" => Ok(Self::Backend),
            "uuid" => Ok(Self::Uuid),
            "custom" | "customize" => Ok(Self::Custom),
            other => Err(format!("Unknown id type '{}'", other)),
        }
    }
}

/// Value kind of a field, as far as the codec cares.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Plain,
    /// A `chrono::DateTime<Utc>` field, subject to date formatting.
    DateTime,
}

/// Descriptor of one persisted entity field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name as it appears in the serialized entity.
    pub name: String,
    pub strategy: FieldStrategy,
    pub kind: FieldKind,
    /// chrono format string, e.g. `%Y-%m-%d %H:%M:%S`.
    pub date_format: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategy: FieldStrategy::Default,
            kind: FieldKind::Plain,
            date_format: None,
        }
    }

    pub fn strategy(mut self, strategy: FieldStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn date_time(mut self) -> Self {
        self.kind = FieldKind::DateTime;
        self
    }

    /// Give the field an explicit date format. Implies [`FieldKind::DateTime`].
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.kind = FieldKind::DateTime;
        self.date_format = Some(format.into());
        self
    }
}

/// Per-type metadata record, computed once and shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub index_name: String,
    /// Name of the identifier field, if the entity carries one.
    pub key_field: Option<String>,
    /// Identifier generation mode. `None` defers to the mapper configuration.
    pub id_type: Option<IdType>,
    pub fields: Vec<FieldDescriptor>,
}

impl DocumentMetadata {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            key_field: None,
            id_type: None,
            fields: Vec::new(),
        }
    }

    pub fn key_field_name(mut self, name: impl Into<String>) -> Self {
        self.key_field = Some(name.into());
        self
    }

    pub fn id_type_mode(mut self, id_type: IdType) -> Self {
        self.id_type = Some(id_type);
        self
    }

    pub fn field(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.push(descriptor);
        self
    }

    pub fn field_list(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn key_field(&self) -> Option<&str> {
        self.key_field.as_deref()
    }

    /// Resolve the id generation mode, falling back to `default` when the
    /// entity does not declare one.
    pub fn id_type(&self, default: IdType) -> IdType {
        self.id_type.unwrap_or(default)
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn descriptor(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// An entity type that can be stored and queried through the mapper.
///
/// # Example
///
/// ```
/// use esplus_shared::{Document, DocumentMetadata, FieldDescriptor, FieldStrategy, IdType};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Article {
///     id: Option<String>,
///     title: Option<String>,
/// }
///
/// impl Document for Article {
///     fn describe() -> DocumentMetadata {
///         DocumentMetadata::new("articles")
///             .key_field_name("id")
///             .id_type_mode(IdType::Uuid)
///             .field(FieldDescriptor::new("title").strategy(FieldStrategy::NotEmpty))
///     }
/// }
///
/// assert_eq!(Article::describe().index_name(), "articles");
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Describe the entity type. Called at most once per type by the
    /// metadata registry.
    fn describe() -> DocumentMetadata;
}
