//! Declarative schemas and the validation outcome they produce.
//!
//! Validation is a pure function over a candidate JSON document: it never
//! panics and never short-circuits, collecting every violation as one
//! `"<field-path>: <message>"` string.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Expected JSON type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    /// Any non-null value.
    Any,
}

impl FieldType {
    fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Resolve a dotted path (`"meta.owner"`) inside a JSON object.
pub(crate) fn lookup_path<'a>(candidate: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = candidate;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Constraints applied to a single (dotted) field path.
#[derive(Debug, Clone)]
pub struct FieldRule {
    path: String,
    field_type: FieldType,
    required: bool,
    min: Option<f64>,
    max: Option<f64>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    non_empty: bool,
    allowed: Option<Vec<Value>>,
}

impl FieldRule {
    pub fn new(path: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            path: path.into(),
            field_type,
            required: false,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            non_empty: false,
            allowed: None,
        }
    }

    /// The field must be present and non-null.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Numeric lower bound (inclusive).
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Numeric upper bound (inclusive).
    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Minimum length for strings (characters) or arrays (items).
    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    /// Maximum length for strings (characters) or arrays (items).
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Strings must contain at least one non-whitespace character.
    pub fn non_empty(mut self) -> Self {
        self.non_empty = true;
        self
    }

    /// The value must equal one of the listed options.
    pub fn one_of(mut self, allowed: Vec<Value>) -> Self {
        self.allowed = Some(allowed);
        self
    }

    fn check(&self, candidate: &Value, errors: &mut Vec<String>) {
        let Some(value) = lookup_path(candidate, &self.path) else {
            if self.required {
                errors.push(format!("{}: is required", self.path));
            }
            return;
        };

        if value.is_null() {
            if self.required {
                errors.push(format!("{}: must not be null", self.path));
            }
            return;
        }

        if !self.field_type.matches(value) {
            errors.push(format!(
                "{}: expected {}, got {}",
                self.path,
                self.field_type.name(),
                type_name(value)
            ));
            return;
        }

        if let Some(number) = value.as_f64() {
            if let Some(min) = self.min {
                if number < min {
                    errors.push(format!("{}: must be >= {min}", self.path));
                }
            }
            if let Some(max) = self.max {
                if number > max {
                    errors.push(format!("{}: must be <= {max}", self.path));
                }
            }
        }

        if let Some(text) = value.as_str() {
            if self.non_empty && text.trim().is_empty() {
                errors.push(format!("{}: must not be empty", self.path));
            }
            let length = text.chars().count();
            if let Some(min_length) = self.min_length {
                if length < min_length {
                    errors.push(format!(
                        "{}: must be at least {min_length} characters",
                        self.path
                    ));
                }
            }
            if let Some(max_length) = self.max_length {
                if length > max_length {
                    errors.push(format!(
                        "{}: must be at most {max_length} characters",
                        self.path
                    ));
                }
            }
        }

        if let Some(items) = value.as_array() {
            if let Some(min_length) = self.min_length {
                if items.len() < min_length {
                    errors.push(format!(
                        "{}: must contain at least {min_length} items",
                        self.path
                    ));
                }
            }
            if let Some(max_length) = self.max_length {
                if items.len() > max_length {
                    errors.push(format!(
                        "{}: must contain at most {max_length} items",
                        self.path
                    ));
                }
            }
        }

        if let Some(allowed) = &self.allowed {
            if !allowed.contains(value) {
                let options = allowed
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                errors.push(format!("{}: must be one of [{options}]", self.path));
            }
        }
    }
}

/// Cross-field predicate evaluated against the whole candidate.
#[derive(Clone)]
pub struct CheckRule {
    label: String,
    message: String,
    check: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl fmt::Debug for CheckRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckRule")
            .field("label", &self.label)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Outcome of validating one candidate document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(Vec<String>),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn into_errors(self) -> Vec<String> {
        match self {
            Self::Valid => Vec::new(),
            Self::Invalid(errors) => errors,
        }
    }
}

/// Declarative shape and constraint description for one entity type.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldRule>,
    checks: Vec<CheckRule>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, rule: FieldRule) -> Self {
        self.fields.push(rule);
        self
    }

    /// Add a cross-field check. `label` names the field (or fields) the
    /// violation message is reported under.
    pub fn check(
        mut self,
        label: impl Into<String>,
        message: impl Into<String>,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.checks.push(CheckRule {
            label: label.into(),
            message: message.into(),
            check: Arc::new(check),
        });
        self
    }

    /// Validate a candidate, collecting every violation.
    pub fn validate(&self, candidate: &Value) -> ValidationOutcome {
        if !candidate.is_object() {
            return ValidationOutcome::Invalid(vec![format!(
                "(root): expected object, got {}",
                type_name(candidate)
            )]);
        }

        let mut errors = Vec::new();
        for rule in &self.fields {
            rule.check(candidate, &mut errors);
        }
        for check in &self.checks {
            if !(check.check)(candidate) {
                errors.push(format!("{}: {}", check.label, check.message));
            }
        }

        if errors.is_empty() {
            ValidationOutcome::Valid
        } else {
            ValidationOutcome::Invalid(errors)
        }
    }
}
