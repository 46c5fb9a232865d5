//! Reader-facing forms and their validation.
//!
//! Invalid input is not an error: callers hand the form back together with
//! its [`FormErrors`] so it can be shown again.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const REQUIRED: &str = "This field is required.";
const INVALID_EMAIL: &str = "Enter a valid email address.";

/// Field name → messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

/// Loose structural check: one `@`, a non-empty local part and a dotted
/// domain, no whitespace.
pub fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

fn clean_text(errors: &mut FormErrors, field: &str, value: &str, max: Option<usize>) -> String {
    let value = value.trim().to_string();
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return value;
    }
    if let Some(max) = max {
        let len = value.chars().count();
        if len > max {
            errors.add(
                field,
                format!("Ensure this value has at most {max} characters (it has {len})."),
            );
        }
    }
    value
}

fn clean_email(errors: &mut FormErrors, field: &str, value: &str) -> String {
    let value = value.trim().to_string();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else if !is_valid_email(&value) {
        errors.add(field, INVALID_EMAIL);
    }
    value
}

/// "Recommend this post" form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailPostForm {
    pub name: String,
    pub email: String,
    pub to: String,
    pub comments: String,
}

impl EmailPostForm {
    pub const NAME_MAX: usize = 25;

    pub fn clean(&self) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::default();
        let cleaned = Self {
            name: clean_text(&mut errors, "name", &self.name, Some(Self::NAME_MAX)),
            email: clean_email(&mut errors, "email", &self.email),
            to: clean_email(&mut errors, "to", &self.to),
            comments: self.comments.trim().to_string(),
        };
        errors.into_result(cleaned)
    }
}

/// New comment form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub name: String,
    pub email: String,
    pub body: String,
}

impl CommentForm {
    pub const NAME_MAX: usize = 80;

    pub fn clean(&self) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::default();
        let cleaned = Self {
            name: clean_text(&mut errors, "name", &self.name, Some(Self::NAME_MAX)),
            email: clean_email(&mut errors, "email", &self.email),
            body: clean_text(&mut errors, "body", &self.body, None),
        };
        errors.into_result(cleaned)
    }
}

/// Title search form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchForm {
    pub query: String,
}

impl SearchForm {
    pub fn clean(&self) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::default();
        let cleaned = Self {
            query: clean_text(&mut errors, "query", &self.query, None),
        };
        errors.into_result(cleaned)
    }
}
