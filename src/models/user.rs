// Start of file: /src/models/user.rs

/*
    * The user record, the payloads accepted for create/update,
    * list filters, and the validation rules applied to request bodies.
*/

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

pub type UserId = i64;

// ! Longest accepted value for any string field
pub const MAX_FIELD_LENGTH: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub city: Option<String>,
    pub language: Option<String>,
}

/// Body of a create request once it passed creation rules
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Partial update. Outer `None` leaves a column untouched; for the nullable
/// columns `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserChanges {
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub language: Option<Option<String>>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.firstname.is_none()
            && self.lastname.is_none()
            && self.email.is_none()
            && self.city.is_none()
            && self.language.is_none()
    }
}

// A key that is present (even as null) becomes Some(..)
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Query-string filters for listing. `?language=` with no value is no filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserFilters {
    #[serde(default, deserialize_with = "non_blank")]
    pub language: Option<String>,
}

fn non_blank<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v: &String| !v.trim().is_empty()))
}

// =============================================================================
// VALIDATION
// =============================================================================

/// One failed rule, shaped like `{ message, path, type, context }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationErrorDetail {
    pub message: String,
    pub path: Vec<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub context: Value,
}

impl ValidationErrorDetail {
    fn new(key: &str, kind: &str, message: String) -> Self {
        Self {
            message,
            path: vec![key.to_string()],
            kind: kind.to_string(),
            context: json!({ "key": key, "label": key }),
        }
    }

    // Failure of the body itself rather than one of its keys
    fn at_root(mut self) -> Self {
        self.path.clear();
        self
    }

    fn with_limit(mut self, limit: usize) -> Self {
        if let Value::Object(ref mut context) = self.context {
            context.insert("limit".to_string(), json!(limit));
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationErrors {
    pub details: Vec<ValidationErrorDetail>,
}

#[derive(Clone, Copy)]
enum FieldRule {
    // Must be a non-empty string; required on creation
    Required,
    // May be null or empty
    Nullable,
    // Required, non-empty and shaped like an address
    Email,
}

const FIELDS: [(&str, FieldRule); 5] = [
    ("email", FieldRule::Email),
    ("firstname", FieldRule::Required),
    ("lastname", FieldRule::Required),
    ("city", FieldRule::Nullable),
    ("language", FieldRule::Nullable),
];

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("email pattern is valid")
});

fn looks_like_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// Checks a request body against the user rules. With `for_creation` the
/// required fields must be present; otherwise only present keys are checked.
/// Returns every failure found, or `None` when the body is acceptable.
pub fn validate(body: &Value, for_creation: bool) -> Option<ValidationErrors> {
    let object: &Map<String, Value> = match body {
        Value::Object(object) => object,
        _ => {
            return Some(ValidationErrors {
                details: vec![ValidationErrorDetail::new(
                    "value",
                    "object.base",
                    "\"value\" must be of type object".to_string(),
                )
                .at_root()],
            });
        }
    };

    let mut details: Vec<ValidationErrorDetail> = Vec::new();

    for (key, rule) in FIELDS {
        match object.get(key) {
            None => {
                if for_creation && !matches!(rule, FieldRule::Nullable) {
                    details.push(ValidationErrorDetail::new(
                        key,
                        "any.required",
                        format!("\"{key}\" is required"),
                    ));
                }
            }
            Some(value) => {
                if let Some(detail) = check_field(key, rule, value) {
                    details.push(detail);
                }
            }
        }
    }

    for key in object.keys() {
        if !FIELDS.iter().any(|(known, _)| *known == key.as_str()) {
            details.push(ValidationErrorDetail::new(
                key,
                "object.unknown",
                format!("\"{key}\" is not allowed"),
            ));
        }
    }

    if details.is_empty() {
        None
    } else {
        Some(ValidationErrors { details })
    }
}

fn check_field(key: &str, rule: FieldRule, value: &Value) -> Option<ValidationErrorDetail> {
    let text: &str = match (value, rule) {
        (Value::Null, FieldRule::Nullable) => return None,
        (Value::String(text), _) => text,
        _ => {
            return Some(ValidationErrorDetail::new(
                key,
                "string.base",
                format!("\"{key}\" must be a string"),
            ));
        }
    };

    if text.is_empty() {
        return match rule {
            FieldRule::Nullable => None,
            _ => Some(ValidationErrorDetail::new(
                key,
                "string.empty",
                format!("\"{key}\" is not allowed to be empty"),
            )),
        };
    }

    if matches!(rule, FieldRule::Email) && !looks_like_email(text) {
        return Some(ValidationErrorDetail::new(
            key,
            "string.email",
            format!("\"{key}\" must be a valid email"),
        ));
    }

    if text.chars().count() > MAX_FIELD_LENGTH {
        return Some(
            ValidationErrorDetail::new(
                key,
                "string.max",
                format!("\"{key}\" length must be less than or equal to {MAX_FIELD_LENGTH} characters long"),
            )
            .with_limit(MAX_FIELD_LENGTH),
        );
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(errors: &ValidationErrors) -> Vec<&str> {
        errors.details.iter().map(|d| d.kind.as_str()).collect()
    }

    fn valid_body() -> Value {
        json!({
            "firstname": "Ada",
            "lastname": "Lovelace",
            "email": "ada@example.com",
            "city": "London",
            "language": "English"
        })
    }

    #[test]
    fn accepts_complete_body_on_creation() {
        assert_eq!(validate(&valid_body(), true), None);
    }

    #[test]
    fn creation_reports_every_missing_required_field() {
        let errors: ValidationErrors = validate(&json!({ "city": "Paris" }), true).unwrap();

        assert_eq!(kinds(&errors), vec!["any.required"; 3]);
        assert_eq!(errors.details[0].message, "\"email\" is required");
        assert_eq!(errors.details[0].path, vec!["email".to_string()]);
    }

    #[test]
    fn update_rules_only_check_present_keys() {
        assert_eq!(validate(&json!({ "city": "Lyon" }), false), None);
        assert_eq!(validate(&json!({}), false), None);
    }

    #[test]
    fn rejects_malformed_email() {
        let errors: ValidationErrors = validate(&json!({ "email": "not-an-email" }), false).unwrap();

        assert_eq!(kinds(&errors), vec!["string.email"]);
        assert_eq!(errors.details[0].message, "\"email\" must be a valid email");
    }

    #[test]
    fn rejects_values_longer_than_limit() {
        let long: String = "a".repeat(MAX_FIELD_LENGTH + 1);
        let errors: ValidationErrors = validate(&json!({ "lastname": long }), false).unwrap();

        assert_eq!(kinds(&errors), vec!["string.max"]);
        assert_eq!(errors.details[0].context["limit"], json!(MAX_FIELD_LENGTH));
    }

    #[test]
    fn nullable_fields_accept_null_and_empty() {
        let body: Value = json!({ "city": null, "language": "" });
        assert_eq!(validate(&body, false), None);
    }

    #[test]
    fn required_fields_reject_null_and_empty() {
        let errors: ValidationErrors =
            validate(&json!({ "firstname": null, "lastname": "" }), false).unwrap();

        assert_eq!(kinds(&errors), vec!["string.base", "string.empty"]);
    }

    #[test]
    fn unknown_keys_are_not_allowed() {
        let mut body: Value = valid_body();
        body["admin"] = json!(true);

        let errors: ValidationErrors = validate(&body, true).unwrap();
        assert_eq!(errors.details[0].message, "\"admin\" is not allowed");
        assert_eq!(kinds(&errors), vec!["object.unknown"]);
    }

    #[test]
    fn non_object_body_is_rejected() {
        let errors: ValidationErrors = validate(&json!([1, 2, 3]), false).unwrap();

        assert_eq!(kinds(&errors), vec!["object.base"]);
        assert!(errors.details[0].path.is_empty());
    }

    #[test]
    fn changes_distinguish_absent_from_null() {
        let changes: UserChanges =
            serde_json::from_value(json!({ "city": null, "email": "x@y.io" })).unwrap();

        assert_eq!(changes.city, Some(None));
        assert_eq!(changes.language, None);
        assert_eq!(changes.email.as_deref(), Some("x@y.io"));
        assert!(!changes.is_empty());
        assert!(UserChanges::default().is_empty());
    }

    #[test]
    fn blank_language_filter_means_no_filter() {
        let blank: UserFilters = serde_json::from_value(json!({ "language": "" })).unwrap();
        let spaces: UserFilters = serde_json::from_value(json!({ "language": "  " })).unwrap();
        let absent: UserFilters = serde_json::from_value(json!({})).unwrap();
        let french: UserFilters = serde_json::from_value(json!({ "language": "French" })).unwrap();

        assert_eq!(blank.language, None);
        assert_eq!(spaces.language, None);
        assert_eq!(absent.language, None);
        assert_eq!(french.language.as_deref(), Some("French"));
    }

    #[test]
    fn email_pattern_compiles_and_matches() {
        assert!(looks_like_email("ada@example.com"));
        assert!(!looks_like_email("ada@example"));
        assert!(!looks_like_email("not an email"));
    }
}

// End of file: /src/models/user.rs
