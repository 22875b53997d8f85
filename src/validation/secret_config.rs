//! Secret configuration documents: content-type aware parsing and field validation.

use super::flatten_validation_errors;
use crate::domain::secret::{
    SecretConfiguration, MAX_SECRET_VALUE_BYTES, SECRET_API_VERSION, SECRET_KIND,
};
use crate::errors::{FlowplaneError, Result, ValidationError};
use crate::secrets::SecretString;
use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;
use validator::Validate;

lazy_static! {
    static ref RESOURCE_NAME_REGEX: Regex = Regex::new(r"^[a-z0-9]([a-z0-9._-]*[a-z0-9])?$")
        .expect("RESOURCE_NAME_REGEX should be a valid regex pattern");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Json,
    Yaml,
}

fn document_format(content_type: &str) -> Option<DocumentFormat> {
    if content_type.trim().is_empty() {
        return Some(DocumentFormat::Yaml);
    }

    let mime: mime::Mime = content_type.trim().parse().ok()?;
    match (mime.type_().as_str(), mime.subtype().as_str()) {
        ("application", "json") => Some(DocumentFormat::Json),
        ("application", "yaml")
        | ("application", "x-yaml")
        | ("text", "yaml")
        | ("text", "x-yaml") => Some(DocumentFormat::Yaml),
        _ => None,
    }
}

/// Parse a secret configuration document.
///
/// `content_type` selects the decoder; parameters such as `charset` are ignored and an
/// empty content type is read as YAML. Unsupported content types and syntax errors are
/// reported as `InvalidConfiguration` on `contentType` and `body` respectively.
pub fn parse_secret_configuration(data: &[u8], content_type: &str) -> Result<SecretConfiguration> {
    let format = document_format(content_type).ok_or_else(|| {
        FlowplaneError::invalid_configuration(vec![ValidationError::new(
            "contentType",
            format!("unsupported content type '{}'", content_type),
        )])
    })?;

    let parsed = match format {
        DocumentFormat::Json => serde_json::from_slice(data).map_err(|e| e.to_string()),
        DocumentFormat::Yaml => serde_yaml::from_slice(data).map_err(|e| e.to_string()),
    };

    parsed.map_err(|message| {
        FlowplaneError::invalid_configuration(vec![ValidationError::new(
            "body",
            format!("malformed document: {}", message),
        )])
    })
}

/// Every violated field of a secret configuration, sorted by field. Empty when valid.
pub fn validate_secret_configuration(config: &SecretConfiguration) -> Vec<ValidationError> {
    match config.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => flatten_validation_errors(&errors),
    }
}

pub fn validate_api_version(api_version: &str) -> std::result::Result<(), validator::ValidationError> {
    if api_version == SECRET_API_VERSION {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_api_version")
            .with_message(Cow::from(format!("must be '{}'", SECRET_API_VERSION))))
    }
}

pub fn validate_secret_kind(kind: &str) -> std::result::Result<(), validator::ValidationError> {
    if kind == SECRET_KIND {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_kind")
            .with_message(Cow::from(format!("must be '{}'", SECRET_KIND))))
    }
}

/// Empty names are left to the length check.
pub fn validate_resource_name(name: &str) -> std::result::Result<(), validator::ValidationError> {
    if name.is_empty() || RESOURCE_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_resource_name").with_message(Cow::from(
            "must consist of lowercase alphanumerics, '-', '_' or '.', \
             and start and end with an alphanumeric",
        )))
    }
}

pub fn validate_secret_value(
    value: &SecretString,
) -> std::result::Result<(), validator::ValidationError> {
    if value.is_empty() {
        return Err(validator::ValidationError::new("required")
            .with_message(Cow::from("must not be empty")));
    }

    if value.len() > MAX_SECRET_VALUE_BYTES {
        return Err(validator::ValidationError::new("too_large").with_message(Cow::from(format!(
            "must be at most {} bytes",
            MAX_SECRET_VALUE_BYTES
        ))));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_YAML: &str = r#"
apiVersion: flowplane.io/v1alpha1
kind: Secret
metadata:
  name: payments-api-key
spec:
  displayName: Payments API key
  value: sk_live_123
"#;

    fn fields(errors: &[ValidationError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_parse_yaml() {
        let config = parse_secret_configuration(VALID_YAML.as_bytes(), "application/yaml").unwrap();
        assert_eq!(config.metadata.name, "payments-api-key");
        assert_eq!(config.spec.value.expose_secret(), "sk_live_123");
        assert!(validate_secret_configuration(&config).is_empty());
    }

    #[test]
    fn test_parse_json_with_charset() {
        let body = r#"{"apiVersion":"flowplane.io/v1alpha1","kind":"Secret",
            "metadata":{"name":"db-password"},"spec":{"value":"hunter2"}}"#;
        let config =
            parse_secret_configuration(body.as_bytes(), "application/json; charset=utf-8").unwrap();
        assert_eq!(config.metadata.name, "db-password");
    }

    #[test]
    fn test_yaml_content_type_aliases() {
        for content_type in ["application/x-yaml", "text/yaml", "text/x-yaml", ""] {
            assert!(
                parse_secret_configuration(VALID_YAML.as_bytes(), content_type).is_ok(),
                "{content_type} should parse"
            );
        }
    }

    #[test]
    fn test_unsupported_content_type() {
        let err = parse_secret_configuration(VALID_YAML.as_bytes(), "text/plain").unwrap_err();
        assert_eq!(fields(err.validation_errors().unwrap()), vec!["contentType"]);
    }

    #[test]
    fn test_syntax_error_is_reported_on_body() {
        let err = parse_secret_configuration(b"{\"kind\": ", "application/json").unwrap_err();
        assert_eq!(fields(err.validation_errors().unwrap()), vec!["body"]);
    }

    #[test]
    fn test_reports_every_violated_field() {
        let config = SecretConfiguration {
            api_version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            ..SecretConfiguration::default()
        };

        let errors = validate_secret_configuration(&config);
        assert_eq!(fields(&errors), vec!["apiVersion", "kind", "metadata.name", "spec.value"]);
    }

    #[test]
    fn test_name_format() {
        assert!(validate_resource_name("payments.api-key_2").is_ok());
        assert!(validate_resource_name("Payments").is_err());
        assert!(validate_resource_name("-leading").is_err());
        assert!(validate_resource_name("trailing.").is_err());
    }

    #[test]
    fn test_length_limits() {
        let mut config =
            parse_secret_configuration(VALID_YAML.as_bytes(), "application/yaml").unwrap();
        config.metadata.name = "a".repeat(254);
        config.spec.display_name = Some("d".repeat(254));
        config.spec.description = Some("x".repeat(1025));

        let errors = validate_secret_configuration(&config);
        assert_eq!(fields(&errors), vec!["metadata.name", "spec.description", "spec.displayName"]);
    }

    #[test]
    fn test_value_size_is_measured_in_bytes() {
        assert!(validate_secret_value(&SecretString::new("a".repeat(MAX_SECRET_VALUE_BYTES)))
            .is_ok());
        assert!(validate_secret_value(&SecretString::new("a".repeat(MAX_SECRET_VALUE_BYTES + 1)))
            .is_err());
        // 3 bytes per char: 3414 chars is 10242 bytes
        assert!(validate_secret_value(&SecretString::new("€".repeat(3414))).is_err());
    }
}
