//! Traits shared by report requests and generators.

use super::validator::ValidationErrors;
use super::{GeneratedReport, ReportError};

/// Trait for validating request objects before any work is done.
pub trait Validator {
    /// Validate the form-level state of the object.
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Trait for document generators.
pub trait Generator<Req> {
    /// Generate a document from the request.
    fn generate(&self, request: Req) -> Result<GeneratedReport, ReportError>;
}
