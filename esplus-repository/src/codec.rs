//! Entity to wire document encoding.
//!
//! The codec applies each field's write strategy, keeps the identifier out of
//! the stored source, formats date-time fields and threads identifiers back
//! into decoded entities.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use esplus_shared::{DocumentMetadata, FieldDescriptor, FieldKind, FieldStrategy};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::MapperConfig;
use crate::errors::MapperError;
use crate::utils::value_to_id;

/// Encodes entities into wire documents and decodes hits back into entities.
#[derive(Debug, Clone)]
pub struct DocumentCodec {
    metadata: Arc<DocumentMetadata>,
    date_format: Option<String>,
}

impl DocumentCodec {
    pub fn new(metadata: Arc<DocumentMetadata>, config: &MapperConfig) -> Self {
        Self {
            metadata,
            date_format: config.date_format.clone(),
        }
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    /// Build the stored source of an entity.
    ///
    /// Only declared fields are written, the key field never is. `Default`
    /// and `Ignored` fields are always written, `NotNull` fields only when
    /// non-null, `NotEmpty` fields only when non-null and not an empty string.
    ///
    /// # Arguments
    ///
    /// * `entity` - The entity to encode
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - A JSON object holding the selected fields
    /// * `Err(MapperError)` - If the entity does not serialize to an object
    pub fn to_wire_document<T: Serialize>(&self, entity: &T) -> Result<Value, MapperError> {
        let mut serialized = self.to_map(entity)?;
        let mut document = Map::new();

        for descriptor in self.stored_fields() {
            let value = serialized.remove(&descriptor.name).unwrap_or(Value::Null);
            let value = self.format_date(descriptor, value)?;
            if should_write(descriptor.strategy, &value) {
                document.insert(descriptor.name.clone(), value);
            }
        }

        Ok(Value::Object(document))
    }

    /// Build a partial document from explicit field values.
    ///
    /// Null values are kept so the backend clears those fields. The key field
    /// is dropped.
    pub fn fields_document(&self, fields: &[(String, Value)]) -> Result<Value, MapperError> {
        let key = self.metadata.key_field();
        let document = fields
            .iter()
            .filter(|(name, _)| Some(name.as_str()) != key)
            .map(|(name, value)| {
                let value = match self.metadata.descriptor(name) {
                    Some(descriptor) => self.format_date(descriptor, value.clone())?,
                    None => value.clone(),
                };
                Ok((name.clone(), value))
            })
            .collect::<Result<Map<String, Value>, MapperError>>()?;
        Ok(Value::Object(document))
    }

    /// Decode a search hit into an entity.
    ///
    /// # Arguments
    ///
    /// * `source` - The hit's stored source
    /// * `id` - The hit's backend identifier
    /// * `include_identifier` - Whether to set the entity's key field to `id`
    pub fn from_wire_hit<T: DeserializeOwned>(
        &self,
        source: &Value,
        id: &str,
        include_identifier: bool,
    ) -> Result<T, MapperError> {
        let mut map = match source {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(MapperError::serialization(format!(
                    "Document source for '{}' is not an object: {}",
                    id, other
                )))
            }
        };

        for descriptor in self.stored_fields() {
            if let Some(value) = map.remove(&descriptor.name) {
                map.insert(descriptor.name.clone(), self.parse_date(descriptor, value));
            }
        }

        match (include_identifier, self.metadata.key_field()) {
            (true, Some(key)) => deserialize_with_id(map, key, id),
            _ => Ok(serde_json::from_value(Value::Object(map))?),
        }
    }

    /// Read the identifier held in the entity's key field.
    ///
    /// Returns `None` when the type has no key field or the field is null.
    pub fn identifier_of<T: Serialize>(&self, entity: &T) -> Result<Option<String>, MapperError> {
        let Some(key) = self.metadata.key_field() else {
            return Ok(None);
        };
        let map = self.to_map(entity)?;
        Ok(map.get(key).and_then(value_to_id))
    }

    /// Write an identifier into the entity's key field.
    ///
    /// Does nothing when the type has no key field.
    pub fn assign_identifier<T>(&self, entity: &mut T, id: &str) -> Result<(), MapperError>
    where
        T: Serialize + DeserializeOwned,
    {
        let Some(key) = self.metadata.key_field() else {
            return Ok(());
        };
        let map = self.to_map(entity)?;
        *entity = deserialize_with_id(map, key, id)?;
        Ok(())
    }

    /// Encode an entity's wire document as bytes.
    pub fn encode<T: Serialize>(&self, entity: &T) -> Result<Vec<u8>, MapperError> {
        Ok(serde_json::to_vec(&self.to_wire_document(entity)?)?)
    }

    /// Decide whether decoded hits carry their identifier.
    ///
    /// With no projection the identifier is always included. With an include
    /// list it is included when the list names the key field. Otherwise it is
    /// included when an exclude list is given and does not name the key field.
    pub fn include_identifier(key_field: Option<&str>, include: &[String], exclude: &[String]) -> bool {
        if include.is_empty() && exclude.is_empty() {
            return true;
        }
        let Some(key) = key_field else {
            return false;
        };
        if include.iter().any(|field| field == key) {
            return true;
        }
        !exclude.is_empty() && !exclude.iter().any(|field| field == key)
    }

    fn stored_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        let key = self.metadata.key_field();
        self.metadata
            .field_list()
            .iter()
            .filter(move |descriptor| Some(descriptor.name.as_str()) != key)
    }

    fn to_map<T: Serialize>(&self, entity: &T) -> Result<Map<String, Value>, MapperError> {
        match serde_json::to_value(entity)? {
            Value::Object(map) => Ok(map),
            other => Err(MapperError::serialization(format!(
                "Entity for index '{}' must serialize to an object, got {}",
                self.metadata.index_name(),
                other
            ))),
        }
    }

    fn field_format<'a>(&'a self, descriptor: &'a FieldDescriptor) -> Option<&'a str> {
        if descriptor.kind != FieldKind::DateTime {
            return None;
        }
        descriptor
            .date_format
            .as_deref()
            .or(self.date_format.as_deref())
    }

    /// RFC 3339 to the field's format. Values that do not parse are left alone.
    fn format_date(&self, descriptor: &FieldDescriptor, value: Value) -> Result<Value, MapperError> {
        let (Some(format), Value::String(raw)) = (self.field_format(descriptor), &value) else {
            return Ok(value);
        };
        let Ok(parsed) = DateTime::parse_from_rfc3339(raw) else {
            return Ok(value);
        };

        let mut formatted = String::new();
        write!(formatted, "{}", parsed.with_timezone(&Utc).format(format)).map_err(|_| {
            MapperError::serialization(format!(
                "Field '{}' cannot be rendered with date format '{}'",
                descriptor.name, format
            ))
        })?;
        Ok(Value::String(formatted))
    }

    /// The field's format back to RFC 3339. Values without an offset are read as UTC.
    fn parse_date(&self, descriptor: &FieldDescriptor, value: Value) -> Value {
        let (Some(format), Value::String(raw)) = (self.field_format(descriptor), &value) else {
            return value;
        };
        if let Ok(with_offset) = DateTime::parse_from_str(raw, format) {
            return Value::String(with_offset.with_timezone(&Utc).to_rfc3339());
        }
        let parsed = NaiveDateTime::parse_from_str(raw, format).ok().or_else(|| {
            NaiveDate::parse_from_str(raw, format)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        });
        match parsed {
            Some(naive) => Value::String(naive.and_utc().to_rfc3339()),
            None => value,
        }
    }
}

/// Reject date formats holding an unknown or malformed `%` directive.
///
/// # Returns
///
/// * `Ok(())` - If every directive of `format` is recognized
/// * `Err(MapperError::ValidationError)` - Otherwise
pub fn validate_date_format(format: &str) -> Result<(), MapperError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(MapperError::validation(format!(
            "Invalid date format '{}'",
            format
        )));
    }
    Ok(())
}

fn should_write(strategy: FieldStrategy, value: &Value) -> bool {
    match strategy {
        FieldStrategy::Default | FieldStrategy::Ignored => true,
        FieldStrategy::NotNull => !value.is_null(),
        FieldStrategy::NotEmpty => match value {
            Value::Null => false,
            Value::String(text) => !text.is_empty(),
            _ => true,
        },
    }
}

/// Deserialize with the key field set to `id`. A string key is tried first;
/// numeric keys fall back to the parsed number.
fn deserialize_with_id<T: DeserializeOwned>(
    mut map: Map<String, Value>,
    key: &str,
    id: &str,
) -> Result<T, MapperError> {
    map.insert(key.to_string(), Value::String(id.to_string()));
    match serde_json::from_value(Value::Object(map.clone())) {
        Ok(entity) => Ok(entity),
        Err(err) => {
            let number = id
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| id.parse::<u64>().map(Value::from))
                .map_err(|_| MapperError::from(err))?;
            map.insert(key.to_string(), number);
            Ok(serde_json::from_value(Value::Object(map))?)
        }
    }
}
