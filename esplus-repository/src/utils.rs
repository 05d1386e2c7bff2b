//! Identifier helpers shared by the codec and the mapper.

use serde_json::Value;
use uuid::Uuid;

use crate::errors::MapperError;

/// Validate a caller-supplied document identifier.
///
/// # Arguments
///
/// * `id` - The identifier to check
///
/// # Returns
///
/// * `Ok(&str)` - The identifier, unchanged
/// * `Err(MapperError)` - If the identifier is empty or whitespace
///
/// # Example
///
/// ```
/// use esplus_repository::require_id;
///
/// assert!(require_id("42").is_ok());
/// assert!(require_id("  ").is_err());
/// ```
pub fn require_id(id: &str) -> Result<&str, MapperError> {
    if id.trim().is_empty() {
        return Err(MapperError::validation("Document id cannot be blank"));
    }
    Ok(id)
}

/// Validate every identifier of a batch. The batch itself must not be empty.
pub fn require_ids<S: AsRef<str>>(ids: &[S]) -> Result<(), MapperError> {
    if ids.is_empty() {
        return Err(MapperError::validation("Id list cannot be empty"));
    }
    for (position, id) in ids.iter().enumerate() {
        if id.as_ref().trim().is_empty() {
            return Err(MapperError::validation(format!(
                "Document id at position {} is blank",
                position
            )));
        }
    }
    Ok(())
}

/// Read a key field value as a document identifier.
///
/// Strings are taken as-is and numbers use their decimal text. Anything else,
/// including null, has no identifier.
pub fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Generate a client-side identifier.
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_require_id() {
        assert_eq!(require_id("abc").unwrap(), "abc");
        assert!(matches!(
            require_id(""),
            Err(MapperError::ValidationError(_))
        ));
    }

    #[test]
    fn test_require_ids() {
        assert!(require_ids(&["a", "b"]).is_ok());
        assert!(require_ids::<&str>(&[]).is_err());

        let result = require_ids(&["a", " "]);
        assert!(matches!(result, Err(MapperError::ValidationError(msg)) if msg.contains("position 1")));
    }

    #[test]
    fn test_value_to_id() {
        assert_eq!(value_to_id(&json!("x1")), Some("x1".to_string()));
        assert_eq!(value_to_id(&json!(42)), Some("42".to_string()));
        assert_eq!(value_to_id(&Value::Null), None);
        assert_eq!(value_to_id(&json!({"a": 1})), None);
    }

    #[test]
    fn test_generate_uuid() {
        let id = generate_uuid();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_ne!(id, generate_uuid());
    }
}
