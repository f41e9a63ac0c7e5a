use thiserror::Error;

/// Application-wide error types for sift.
#[derive(Error, Debug)]
pub enum AppError {
    /// Model file or schema reference could not be loaded.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// A field's declared cardinality does not match its type.
    #[error("Field {field} must be {expected}")]
    CardinalityMismatch {
        field: String,
        expected: &'static str,
    },

    /// A selector expression or URL glob failed to compile.
    #[error("Invalid selector '{expr}': {message}")]
    InvalidSelector { expr: String, message: String },

    /// The output record could not be instantiated.
    #[error("Record error: {0}")]
    RecordError(String),

    /// A field writer rejected the extracted value.
    #[error("Failed to write field {field}: {message}")]
    FieldWrite { field: String, message: String },

    /// The post-extraction hook failed.
    #[error("After-extract hook failed: {0}")]
    AfterExtract(String),

    /// HTTP request failed (fetching a page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Invalid configuration value.
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl AppError {
    pub(crate) fn invalid_selector(expr: &str, message: impl Into<String>) -> Self {
        AppError::InvalidSelector {
            expr: expr.to_string(),
            message: message.into(),
        }
    }

    /// Returns true if this error is raised while compiling a schema.
    ///
    /// These never occur per document; a schema that produces one yields
    /// no extractor at all.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            AppError::SchemaError(_)
                | AppError::CardinalityMismatch { .. }
                | AppError::InvalidSelector { .. }
        )
    }

    /// Returns true if this error is confined to a single document.
    pub fn is_document_fatal(&self) -> bool {
        matches!(
            self,
            AppError::RecordError(_) | AppError::FieldWrite { .. } | AppError::AfterExtract(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_errors() {
        assert!(AppError::SchemaError("bad".into()).is_schema_error());
        assert!(
            AppError::CardinalityMismatch {
                field: "tags".into(),
                expected: "list",
            }
            .is_schema_error()
        );
        assert!(AppError::invalid_selector("//[", "unexpected '['").is_schema_error());
        assert!(!AppError::RecordError("boom".into()).is_schema_error());
    }

    #[test]
    fn test_document_fatal_errors() {
        assert!(AppError::RecordError("boom".into()).is_document_fatal());
        assert!(AppError::AfterExtract("boom".into()).is_document_fatal());
        assert!(
            AppError::FieldWrite {
                field: "title".into(),
                message: "too long".into(),
            }
            .is_document_fatal()
        );
        assert!(!AppError::Timeout(30).is_document_fatal());
    }

    #[test]
    fn test_cardinality_message_names_field() {
        let err = AppError::CardinalityMismatch {
            field: "content".into(),
            expected: "string",
        };
        assert_eq!(err.to_string(), "Field content must be string");
    }
}
