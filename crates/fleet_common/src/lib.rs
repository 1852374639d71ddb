//! Fleet Common - shared types for the fleet compliance report service.
//!
//! Request/response schemas, validation, the report prompt and configuration.

pub mod config;
pub mod error;
pub mod prompts;
pub mod schema;

pub use config::{GenerationMode, ReportConfig};
pub use error::ReportError;
pub use prompts::{build_report_prompt, Placeholder, REPORT_TEMPLATE};
pub use schema::*;
