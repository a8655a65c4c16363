use std::fmt;

use serde_json::{Map, Value};

/// Field-level validation failures, in the order the checks ran.
/// Rendered as the `details` object of a 400 response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors {
    errors: Vec<(String, Vec<String>)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        let message = message.into();
        if let Some((_, messages)) = self.errors.iter_mut().find(|(f, _)| f == field) {
            messages.push(message);
        } else {
            self.errors.push((field.to_string(), vec![message]));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|(f, _)| f.as_str())
    }

    /// Ok when no check failed, otherwise the collected failures.
    pub fn finish(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn to_json(&self) -> Value {
        let mut details = Map::new();
        for (field, messages) in &self.errors {
            details.insert(
                field.clone(),
                Value::Array(messages.iter().map(|m| Value::String(m.clone())).collect()),
            );
        }
        Value::Object(details)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.fields().collect();
        write!(f, "validation failed: {}", fields.join(", "))
    }
}

/// Per-input validation. Every write DTO implements this; the request gate
/// calls it after identifier extraction and before any data access.
pub trait Validate {
    fn validate(&self) -> Result<(), FieldErrors>;
}

pub fn require_non_empty(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "must not be empty");
    }
}

pub fn require_max_len(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(field, format!("must be at most {} characters", max));
    }
}

pub fn require_one_of(errors: &mut FieldErrors, field: &str, value: &str, allowed: &[&str]) {
    if !allowed.contains(&value) {
        errors.add(field, format!("must be one of: {}", allowed.join(", ")));
    }
}

pub fn require_email(errors: &mut FieldErrors, field: &str, value: &str) {
    let ok = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };
    if !ok {
        errors.add(field, "must be a valid email address");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collects_multiple_messages_per_field() {
        let mut errors = FieldErrors::new();
        require_non_empty(&mut errors, "title", "  ");
        require_max_len(&mut errors, "title", &"x".repeat(300), 200);
        require_one_of(&mut errors, "severity", "cosmic", &["minor", "major"]);

        assert_eq!(
            errors.to_json(),
            json!({
                "title": ["must not be empty", "must be at most 200 characters"],
                "severity": ["must be one of: minor, major"],
            })
        );
    }

    #[test]
    fn finish_is_ok_when_nothing_failed() {
        let mut errors = FieldErrors::new();
        require_non_empty(&mut errors, "name", "Delta Hydro");
        require_email(&mut errors, "email", "ops@delta-hydro.example");
        assert!(errors.finish().is_ok());
    }

    #[test]
    fn email_shapes() {
        for bad in ["", "plain", "@nope.com", "user@", "user@nodot", "user@.com"] {
            let mut errors = FieldErrors::new();
            require_email(&mut errors, "email", bad);
            assert!(!errors.is_empty(), "accepted: {:?}", bad);
        }
        let mut errors = FieldErrors::new();
        require_email(&mut errors, "email", "auditor@site.example.org");
        assert!(errors.is_empty());
    }

    #[test]
    fn display_names_the_failing_fields() {
        let mut errors = FieldErrors::new();
        errors.add("slug", "already taken");
        errors.add("name", "must not be empty");
        assert_eq!(errors.to_string(), "validation failed: slug, name");
    }
}
