//! # Validation
//!
//! Parsing and validation of user-submitted secret configurations, plus the conversion
//! from `validator`'s nested error tree to flat, field-attributed [`ValidationError`]s.

pub mod secret_config;

pub use secret_config::{parse_secret_configuration, validate_secret_configuration};

use crate::errors::ValidationError;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Flatten a `validator` error tree into one entry per violation.
///
/// Field paths are dotted and camelCased to match the document (`spec.displayName`), list
/// elements are indexed (`providers[1].keys`). The result is sorted by field; several
/// violations on the same field keep their declaration order.
pub fn flatten_validation_errors(errors: &ValidationErrors) -> Vec<ValidationError> {
    let mut flat = Vec::new();
    collect(errors, "", &mut flat);
    flat.sort_by(|a, b| a.field.cmp(&b.field));
    flat
}

fn collect(errors: &ValidationErrors, prefix: &str, out: &mut Vec<ValidationError>) {
    for (field, kind) in errors.errors() {
        let path = join_path(prefix, &to_camel_case(field));
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                out.extend(field_errors.iter().map(|error| {
                    let message = match &error.message {
                        Some(message) => message.to_string(),
                        None => format!("failed '{}' validation", error.code),
                    };
                    ValidationError::new(path.clone(), message)
                }));
            }
            ValidationErrorsKind::Struct(nested) => collect(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect(nested, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

fn to_camel_case(field: &str) -> String {
    let mut result = String::with_capacity(field.len());
    let mut upper_next = false;
    for ch in field.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            result.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            result.push(ch);
        }
    }
    result
}
