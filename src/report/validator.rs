//! Requirement validation for report generation.
//!
//! Provides clear, descriptive validation errors in Portuguese so the
//! technician knows which photo to add or rename.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

use super::registry::{ChecklistType, SlotRegistry};
use super::{ReportError, SlotMapping};

lazy_static! {
    static ref DIGIT_RUN: Regex = Regex::new(r"[0-9]+").expect("valid digit pattern");
}

/// Validation error with detailed, user-friendly messages.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field or requirement that failed validation
    pub field: String,
    /// Human-readable error message in Portuguese
    pub message: String,
    /// Suggestion for how to fix the error
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Create error for a ticket input without any digits
    pub fn ticket_without_digits(field: &str) -> Self {
        Self::new(field, "Não foi possível extrair um número do chamado informado")
            .with_suggestion("Digite o número do chamado, exemplo: 20250330762")
    }

    /// Create error for an unsatisfied requirement rule
    pub fn missing_photo(requirement: &str) -> Self {
        Self::new(requirement, format!("Foto obrigatória ausente: {}", requirement))
            .with_suggestion(format!(
                "Envie um arquivo cujo nome contenha '{}'",
                requirement
            ))
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, ". {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors with formatted output.
#[derive(Debug, Default)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get formatted error message suitable for the user
    pub fn to_message(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }

        let mut parts = vec![format!(
            "Validação falhou: {} pendência(s) encontrada(s)\n",
            self.errors.len()
        )];

        for (i, error) in self.errors.iter().enumerate() {
            parts.push(format!("{}. {}", i + 1, error));
        }

        parts.push(String::new());
        parts.push("Corrija os itens acima e tente novamente.".to_string());

        parts.join("\n")
    }

    /// Convert to Result - Ok if no errors, Err with the collection otherwise
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Outcome of checking a slot mapping against a requirement table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RequirementCheck {
    pub satisfied: bool,
    /// Unsatisfied rules in table order, alternatives joined with " ou ".
    pub missing: Vec<String>,
}

impl RequirementCheck {
    pub fn to_validation_errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for requirement in &self.missing {
            errors.add(ValidationError::missing_photo(requirement));
        }
        errors
    }

    /// Portuguese summary for the checklist type.
    pub fn to_message(&self, checklist_type: ChecklistType) -> String {
        if self.satisfied {
            return format!(
                "Todos os itens obrigatórios para checklist {} estão presentes.",
                checklist_type
            );
        }
        format!(
            "Faltam itens obrigatórios para checklist {}: {}",
            checklist_type,
            self.missing.join(", ")
        )
    }
}

/// Evaluate every requirement rule of `checklist_type`, in table order.
pub fn check_requirements(
    registry: &SlotRegistry,
    mapping: &SlotMapping,
    checklist_type: ChecklistType,
) -> RequirementCheck {
    let missing: Vec<String> = registry
        .requirements(checklist_type)
        .iter()
        .filter(|rule| !rule.is_satisfied_by(mapping))
        .map(|rule| rule.label())
        .collect();

    RequirementCheck {
        satisfied: missing.is_empty(),
        missing,
    }
}

/// Extract the first run of ASCII digits from free-form ticket input.
pub fn extract_ticket_number(raw: &str) -> Result<String, ReportError> {
    DIGIT_RUN
        .find(raw)
        .map(|m| m.as_str().to_string())
        .ok_or(ReportError::NoDigitsInTicket)
}

/// Validate that the ticket input carries a number
pub fn validate_ticket(value: &str, field: &str, errors: &mut ValidationErrors) {
    if extract_ticket_number(value).is_err() {
        errors.add(ValidationError::ticket_without_digits(field));
    }
}
