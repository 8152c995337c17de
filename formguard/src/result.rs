use crate::field::{FieldId, FieldValidator};

/// A single failing field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    /// Identity of the field's observable.
    pub field: FieldId,
    /// Sections the field was placed in directly.
    pub sections: Vec<String>,
    /// Message of the failing rule.
    pub message: String,
}

impl FieldError {
    pub(crate) fn from_field(field: &FieldValidator) -> Self {
        Self {
            field: field.id(),
            sections: field.sections(),
            message: field.error_message(),
        }
    }

    /// First section the field was placed in.
    pub fn section(&self) -> Option<&str> {
        self.sections.first().map(String::as_str)
    }
}

/// Result of validating one or more fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ValidationResult {
    /// All fields passed validation.
    #[default]
    Valid,
    /// One or more fields failed validation.
    Invalid(Vec<FieldError>),
}

impl ValidationResult {
    /// Collect the failing fields out of an evaluated field list.
    pub(crate) fn collect<'a>(fields: impl IntoIterator<Item = &'a FieldValidator>) -> Self {
        let errors: Vec<FieldError> = fields
            .into_iter()
            .filter(|field| field.has_error())
            .map(FieldError::from_field)
            .collect();
        if errors.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(errors)
        }
    }

    /// Check if all fields passed validation.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Check if any field failed validation.
    pub fn is_invalid(&self) -> bool {
        !self.is_valid()
    }

    /// Get all validation errors.
    pub fn errors(&self) -> &[FieldError] {
        match self {
            Self::Valid => &[],
            Self::Invalid(errors) => errors,
        }
    }

    /// Get the first validation error (if any).
    pub fn first_error(&self) -> Option<&FieldError> {
        self.errors().first()
    }

    /// Messages of every failing field, in resolution order.
    pub fn messages(&self) -> Vec<&str> {
        self.errors().iter().map(|e| e.message.as_str()).collect()
    }

    /// Errors for fields placed in `section`.
    pub fn in_section<'a>(&'a self, section: &'a str) -> impl Iterator<Item = &'a FieldError> {
        self.errors()
            .iter()
            .filter(move |e| e.sections.iter().any(|s| s == section))
    }
}
