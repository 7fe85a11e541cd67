//! Field allow-lists and write validation for stored documents.
//!
//! Every collection is described by a static [`ResourceSchema`]. The schema is
//! the only place that decides which fields a client may write, filter on or
//! sort by, and how loosely-typed JSON input is cast before it reaches a store.

use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// A stored record: a JSON object that always carries `id` and `createdAt`.
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    StringArray,
    /// Id of a document in another collection
    Reference,
    Timestamp,
}

#[derive(Debug, Clone, Copy)]
pub enum DefaultValue {
    Str(&'static str),
    Bool(bool),
}

impl DefaultValue {
    fn to_value(self) -> Value {
        match self {
            DefaultValue::Str(s) => Value::String(s.to_string()),
            DefaultValue::Bool(b) => Value::Bool(b),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: Option<&'static str>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub allowed: &'static [&'static str],
    pub unique: bool,
    /// Never returned to clients and never filterable
    pub hidden: bool,
    /// Set by the server, dropped from client input
    pub system: bool,
    pub default: Option<DefaultValue>,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: None,
            min_length: None,
            max_length: None,
            allowed: &[],
            unique: false,
            hidden: false,
            system: false,
            default: None,
        }
    }

    pub const fn required(self, message: &'static str) -> Self {
        Self { required: Some(message), ..self }
    }

    pub const fn min_length(self, n: usize) -> Self {
        Self { min_length: Some(n), ..self }
    }

    pub const fn max_length(self, n: usize) -> Self {
        Self { max_length: Some(n), ..self }
    }

    pub const fn one_of(self, allowed: &'static [&'static str]) -> Self {
        Self { allowed, ..self }
    }

    pub const fn unique(self) -> Self {
        Self { unique: true, ..self }
    }

    pub const fn hidden(self) -> Self {
        Self { hidden: true, ..self }
    }

    pub const fn system(self) -> Self {
        Self { system: true, ..self }
    }

    pub const fn default_str(self, value: &'static str) -> Self {
        Self { default: Some(DefaultValue::Str(value)), ..self }
    }

    pub const fn default_bool(self, value: bool) -> Self {
        Self { default: Some(DefaultValue::Bool(value)), ..self }
    }

    pub fn is_array(&self) -> bool {
        self.kind == FieldKind::StringArray
    }

    /// Cast a loosely-typed JSON value to this field's kind.
    pub fn cast(&self, value: &Value) -> Result<Value, String> {
        let fail = || format!("Invalid value {} for field '{}'", value, self.name);
        match self.kind {
            FieldKind::String => match value {
                Value::String(_) => Ok(value.clone()),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                _ => Err(fail()),
            },
            FieldKind::Number => match value {
                Value::Number(_) => Ok(value.clone()),
                Value::String(s) => parse_number(s.trim()).ok_or_else(fail),
                _ => Err(fail()),
            },
            FieldKind::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) if s == "true" => Ok(Value::Bool(true)),
                Value::String(s) if s == "false" => Ok(Value::Bool(false)),
                _ => Err(fail()),
            },
            FieldKind::StringArray => match value {
                Value::String(_) => Ok(Value::Array(vec![value.clone()])),
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(_) => Ok(item.clone()),
                        _ => Err(fail()),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                _ => Err(fail()),
            },
            FieldKind::Reference => match value {
                Value::String(s) if Uuid::parse_str(s).is_ok() => Ok(value.clone()),
                _ => Err(fail()),
            },
            FieldKind::Timestamp => match value {
                Value::String(s) if chrono::DateTime::parse_from_rfc3339(s).is_ok() => Ok(value.clone()),
                _ => Err(fail()),
            },
        }
    }

    /// Check an already-cast value against the field constraints.
    fn check(&self, value: &Value) -> Result<(), String> {
        match value {
            Value::String(s) => self.check_str(s),
            Value::Array(items) => {
                for item in items {
                    if let Value::String(s) = item {
                        self.check_str(s)?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn check_str(&self, s: &str) -> Result<(), String> {
        if let Some(message) = self.required {
            if s.trim().is_empty() && !self.is_array() {
                return Err(message.to_string());
            }
        }
        if let Some(max) = self.max_length {
            if s.chars().count() > max {
                return Err(format!("{} can not be more than {} characters", self.name, max));
            }
        }
        if let Some(min) = self.min_length {
            if s.chars().count() < min {
                return Err(format!("{} must be at least {} characters", self.name, min));
            }
        }
        if !self.allowed.is_empty() && !self.allowed.iter().any(|a| *a == s) {
            return Err(format!("'{}' is not a valid value for {}", s, self.name));
        }
        Ok(())
    }
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
}

static ID_SPEC: FieldSpec = FieldSpec::new(ID_FIELD, FieldKind::Reference).system();
static CREATED_AT_SPEC: FieldSpec = FieldSpec::new(CREATED_AT_FIELD, FieldKind::Timestamp).system();

/// Collected write-validation failures for one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    pub messages: Vec<String>,
    pub fields: HashMap<String, String>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        let message = message.into();
        self.fields.insert(field.to_string(), message.clone());
        self.messages.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn message(&self) -> String {
        self.messages.join(", ")
    }
}

#[derive(Debug)]
pub struct ResourceSchema {
    pub collection: &'static str,
    /// Singular name used in client-facing messages
    pub label: &'static str,
    pub fields: &'static [FieldSpec],
}

impl ResourceSchema {
    /// Declared field or one of the implicit `id` / `createdAt` fields.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        match name {
            ID_FIELD => Some(&ID_SPEC),
            CREATED_AT_FIELD => Some(&CREATED_AT_SPEC),
            _ => self.fields.iter().find(|f| f.name == name),
        }
    }

    /// Fields a client may filter or sort on.
    pub fn queryable_field(&self, name: &str) -> Option<&FieldSpec> {
        self.field(name).filter(|f| !f.hidden)
    }

    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.unique)
    }

    /// Build the client-controlled part of a new document.
    ///
    /// Unknown and system fields are dropped, values are cast, defaults applied,
    /// and every failed constraint is reported at once.
    pub fn prepare_create(&self, body: &Document) -> Result<Document, ValidationErrors> {
        let mut out = Document::new();
        let mut errors = ValidationErrors::default();

        for spec in self.fields.iter().filter(|f| !f.system) {
            match body.get(spec.name).filter(|v| !v.is_null()) {
                Some(raw) => match spec.cast(raw).and_then(|v| spec.check(&v).map(|_| v)) {
                    Ok(value) => {
                        out.insert(spec.name.to_string(), value);
                    }
                    Err(message) => errors.push(spec.name, message),
                },
                None => {
                    if let Some(default) = spec.default {
                        out.insert(spec.name.to_string(), default.to_value());
                    } else if let Some(message) = spec.required {
                        errors.push(spec.name, message);
                    }
                }
            }
        }

        if errors.is_empty() { Ok(out) } else { Err(errors) }
    }

    /// Validate a partial update; only the provided, writable fields survive.
    pub fn prepare_update(&self, body: &Document) -> Result<Document, ValidationErrors> {
        let mut out = Document::new();
        let mut errors = ValidationErrors::default();

        for (key, raw) in body {
            let Some(spec) = self.fields.iter().find(|f| f.name == key.as_str() && !f.system) else {
                continue;
            };
            if raw.is_null() {
                match spec.required {
                    Some(message) => errors.push(spec.name, message),
                    None => {
                        out.insert(key.clone(), Value::Null);
                    }
                }
                continue;
            }
            match spec.cast(raw).and_then(|v| spec.check(&v).map(|_| v)) {
                Ok(value) => {
                    out.insert(key.clone(), value);
                }
                Err(message) => errors.push(spec.name, message),
            }
        }

        if errors.is_empty() { Ok(out) } else { Err(errors) }
    }

    pub fn strip_hidden(&self, doc: &mut Document) {
        for spec in self.fields.iter().filter(|f| f.hidden) {
            doc.remove(spec.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static WIDGETS: ResourceSchema = ResourceSchema {
        collection: "widgets",
        label: "widget",
        fields: &[
            FieldSpec::new("name", FieldKind::String).required("Please add a name").max_length(5),
            FieldSpec::new("price", FieldKind::Number),
            FieldSpec::new("active", FieldKind::Boolean).default_bool(false),
            FieldSpec::new("tags", FieldKind::StringArray).one_of(&["a", "b"]),
            FieldSpec::new("owner", FieldKind::Reference).system(),
            FieldSpec::new("secret", FieldKind::String).hidden(),
        ],
    };

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn create_casts_and_applies_defaults() {
        let out = WIDGETS
            .prepare_create(&doc(json!({ "name": "box", "price": "12.5", "unknown": 1, "owner": "x" })))
            .unwrap();
        assert_eq!(out["name"], json!("box"));
        assert_eq!(out["price"], json!(12.5));
        assert_eq!(out["active"], json!(false));
        assert!(out.get("unknown").is_none());
        assert!(out.get("owner").is_none());
    }

    #[test]
    fn create_reports_every_failure() {
        let errors = WIDGETS
            .prepare_create(&doc(json!({ "price": "cheap", "tags": ["c"] })))
            .unwrap_err();
        assert_eq!(errors.messages.len(), 3);
        assert!(errors.message().contains("Please add a name"));
        assert!(errors.fields.contains_key("price"));
        assert!(errors.fields.contains_key("tags"));
    }

    #[test]
    fn update_keeps_only_provided_writable_fields() {
        let out = WIDGETS
            .prepare_update(&doc(json!({ "price": 3, "owner": "someone", "id": "x" })))
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out["price"], json!(3));

        let errors = WIDGETS.prepare_update(&doc(json!({ "name": "toolong" }))).unwrap_err();
        assert!(errors.message().contains("can not be more than 5"));
    }

    #[test]
    fn implicit_fields_are_queryable_but_hidden_ones_are_not() {
        assert!(WIDGETS.queryable_field("id").is_some());
        assert!(WIDGETS.queryable_field("createdAt").is_some());
        assert!(WIDGETS.queryable_field("secret").is_none());
        assert!(WIDGETS.queryable_field("nope").is_none());
    }

    #[test]
    fn string_array_accepts_single_string() {
        let spec = WIDGETS.field("tags").unwrap();
        assert_eq!(spec.cast(&json!("a")).unwrap(), json!(["a"]));
    }
}
