//! Intermediary schema validation.
//!
//! Structural check of the serialized intermediary document against a
//! JSON Schema (Draft 7). The schema library does the checking; this
//! module decides what gets validated and collects every violation as a
//! (path, message) pair instead of failing on the first one. Validation
//! never repairs data.

use jsonschema::{Draft, JSONSchema, ValidationError};
use log::{error, info};

/// Errors surfaced by the validation gate
#[derive(Debug, thiserror::Error)]
pub enum ValidatorError {
    #[error("failed to compile intermediary schema: {0}")]
    InvalidSchema(String),
    #[error("intermediary document could not be converted for validation: {0}")]
    Conversion(#[from] serde_json::Error),
    #[error("intermediary validation failed at '{first_path}' ({count} violation(s) in total)")]
    Invalid {
        first_path: String,
        count: usize,
        errors: Vec<(String, String)>,
    },
}

/// Collect every schema violation in the document as (path, message),
/// sorted by path. An empty list means the document is valid.
pub fn iter_errors(
    document: &serde_json::Value,
    schema: &serde_json::Value,
) -> Result<Vec<(String, String)>, ValidatorError> {
    let compiled = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema)
        .map_err(|err| ValidatorError::InvalidSchema(err.to_string()))?;

    let mut errors: Vec<(String, String)> = Vec::new();
    if let Err(violations) = compiled.validate(document) {
        for violation in violations {
            let message = violation.to_string();
            errors.push((error_path(&violation), message));
        }
    }
    errors.sort();
    Ok(errors)
}

/// Validate the serialized document; every violation is logged, and the
/// returned error names the first failing path.
pub fn validate_intermediary(
    document: &serde_yaml::Value,
    schema: &serde_json::Value,
) -> Result<(), ValidatorError> {
    let document = serde_json::to_value(document)?;
    let errors = iter_errors(&document, schema)?;
    if errors.is_empty() {
        info!("Intermediary validation passed");
        return Ok(());
    }

    for (path, message) in &errors {
        error!("{}: {}", path, message);
    }
    Err(ValidatorError::Invalid {
        first_path: errors[0].0.clone(),
        count: errors.len(),
        errors,
    })
}

/// Dotted path to the offending value.
///
/// Missing-required-property violations point at the object that lacks
/// the property; the missing property name is appended so the path names
/// the field itself.
fn error_path(violation: &ValidationError) -> String {
    let pointer = violation.instance_path.to_string();
    let mut segments: Vec<String> = pointer
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();
    if let jsonschema::error::ValidationErrorKind::Required { property } = &violation.kind {
        match property.as_str() {
            Some(name) => segments.push(name.to_string()),
            None => segments.push(property.to_string()),
        }
    }
    segments.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["site_info"],
            "properties": {
                "site_info": {
                    "type": "object",
                    "required": ["name", "sitetype"],
                    "properties": {
                        "name": {"type": "string"},
                        "sitetype": {"type": "string"}
                    }
                }
            }
        })
    }

    #[test]
    fn test_valid_document_yields_no_errors() {
        let document = json!({"site_info": {"name": "test-site", "sitetype": "foundry"}});
        assert!(iter_errors(&document, &schema()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_required_field_paths_name_the_field() {
        let document = json!({"site_info": {"name": "test-site"}});
        let errors = iter_errors(&document, &schema()).unwrap();
        assert_eq!(1, errors.len());
        assert_eq!("site_info.sitetype", errors[0].0);
    }

    #[test]
    fn test_all_violations_collected() {
        let document = json!({"site_info": {"sitetype": 7}});
        let errors = iter_errors(&document, &schema()).unwrap();
        // Missing name and wrongly-typed sitetype both reported
        assert_eq!(2, errors.len());
        assert_eq!("site_info.name", errors[0].0);
        assert_eq!("site_info.sitetype", errors[1].0);
    }

    #[test]
    fn test_validate_intermediary_reports_first_path() {
        let document: serde_yaml::Value =
            serde_yaml::from_str("site_info:\n  name: test-site\n").unwrap();
        let err = validate_intermediary(&document, &schema()).unwrap_err();
        match err {
            ValidatorError::Invalid {
                first_path, count, ..
            } => {
                assert_eq!("site_info.sitetype", first_path);
                assert_eq!(1, count);
            }
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_schema_is_reported() {
        let document = json!({});
        let bad_schema = json!({"type": "no-such-type"});
        assert!(matches!(
            iter_errors(&document, &bad_schema),
            Err(ValidatorError::InvalidSchema(_))
        ));
    }
}
