//! Process-wide cache of entity metadata.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use esplus_shared::{Document, DocumentMetadata, IdType};
use lazy_static::lazy_static;
use tracing::debug;

use crate::codec::validate_date_format;
use crate::errors::MapperError;

lazy_static! {
    static ref REGISTRY: RwLock<HashMap<TypeId, Arc<DocumentMetadata>>> =
        RwLock::new(HashMap::new());
}

/// Computes each entity type's metadata once and hands out shared copies.
pub struct MetadataRegistry;

impl MetadataRegistry {
    /// Metadata for `T`, computed and validated on first use.
    ///
    /// `T::describe` runs under the write lock, so it is called at most once
    /// per type even when the first uses race.
    ///
    /// # Returns
    ///
    /// * `Ok(Arc<DocumentMetadata>)` - The shared record
    /// * `Err(MapperError)` - If `T::describe` returns an invalid record
    pub fn get<T: Document>() -> Result<Arc<DocumentMetadata>, MapperError> {
        let type_id = TypeId::of::<T>();
        {
            let registry = REGISTRY.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(metadata) = registry.get(&type_id) {
                return Ok(Arc::clone(metadata));
            }
        }

        let mut registry = REGISTRY.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(metadata) = registry.get(&type_id) {
            return Ok(Arc::clone(metadata));
        }

        let described = T::describe();
        Self::validate(&described)?;
        debug!(
            index = %described.index_name,
            fields = described.fields.len(),
            "Registered document metadata"
        );
        let metadata = registry.entry(type_id).or_insert(Arc::new(described));
        Ok(Arc::clone(metadata))
    }

    fn validate(metadata: &DocumentMetadata) -> Result<(), MapperError> {
        if metadata.index_name().trim().is_empty() {
            return Err(MapperError::validation("Document index name cannot be blank"));
        }
        if metadata.id_type == Some(IdType::Custom) && metadata.key_field().is_none() {
            return Err(MapperError::validation(format!(
                "Index '{}' uses custom ids but declares no key field",
                metadata.index_name()
            )));
        }
        for field in metadata.field_list() {
            if let Some(format) = &field.date_format {
                validate_date_format(format)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esplus_shared::FieldDescriptor;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DESCRIBE_CALLS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Serialize, Deserialize)]
    struct Counted {
        id: Option<String>,
    }

    impl Document for Counted {
        fn describe() -> DocumentMetadata {
            DESCRIBE_CALLS.fetch_add(1, Ordering::SeqCst);
            DocumentMetadata::new("counted")
                .key_field_name("id")
                .field(FieldDescriptor::new("id"))
        }
    }

    #[derive(Serialize, Deserialize)]
    struct Broken {
        name: String,
    }

    impl Document for Broken {
        fn describe() -> DocumentMetadata {
            DocumentMetadata::new("broken").id_type_mode(IdType::Custom)
        }
    }

    #[derive(Serialize, Deserialize)]
    struct BadDate {
        at: Option<String>,
    }

    impl Document for BadDate {
        fn describe() -> DocumentMetadata {
            DocumentMetadata::new("bad_dates").field(FieldDescriptor::new("at").date_format("%Y-%Q"))
        }
    }

    #[test]
    fn test_metadata_is_shared() {
        let first = MetadataRegistry::get::<Counted>().unwrap();
        let second = MetadataRegistry::get::<Counted>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.index_name(), "counted");
        assert_eq!(DESCRIBE_CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_custom_ids_need_key_field() {
        let result = MetadataRegistry::get::<Broken>();
        assert!(matches!(result, Err(MapperError::ValidationError(_))));
    }

    #[test]
    fn test_invalid_field_date_format_is_rejected() {
        let result = MetadataRegistry::get::<BadDate>();
        assert!(matches!(result, Err(MapperError::ValidationError(_))));
    }
}
