//! Error types for report generation.

use crate::schema::SchemaValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("{0}")]
    SchemaValidation(#[from] SchemaValidationError),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Completion service error: {0}")]
    CompletionService(String),

    #[error("Response parse error: {0}")]
    ResponseParse(String),
}

impl ReportError {
    /// Stable identifier used in error response bodies
    pub fn kind(&self) -> &'static str {
        match self {
            ReportError::SchemaValidation(_) => "schema_validation",
            ReportError::PayloadTooLarge(_) => "payload_too_large",
            ReportError::Configuration(_) => "configuration",
            ReportError::CompletionService(_) => "completion_service",
            ReportError::ResponseParse(_) => "response_parse",
        }
    }

    /// HTTP status code for this error class
    pub fn http_status(&self) -> u16 {
        match self {
            ReportError::SchemaValidation(_) => 422,
            ReportError::PayloadTooLarge(_) => 413,
            ReportError::Configuration(_) => 500,
            ReportError::CompletionService(_) => 502,
            ReportError::ResponseParse(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ReportError::SchemaValidation(_) | ReportError::PayloadTooLarge(_)
        )
    }
}
