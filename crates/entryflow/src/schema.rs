//! Form schemas: typed field definitions, wire descriptors, and validation.
//!
//! A [`Schema`] describes the fields a wizard form expects. It serves two
//! masters: [`Schema::to_fields`] converts it into the ordered sequence of
//! [`FieldDescriptor`]s a transport serializes for the client, and
//! [`Schema::validate`] checks submitted input against it before a step
//! operation is allowed to run.
//!
//! Field order is significant — wizards present fields in author-declared
//! sequence — so a schema is a `Vec` of fields, never a map.
//!
//! # Example
//!
//! ```
//! use entryflow::{Field, FieldKind, Schema};
//!
//! let schema = Schema::new()
//!     .field(Field::required("username", FieldKind::String))
//!     .field(Field::required("password", FieldKind::String))
//!     .field(Field::optional("port", FieldKind::Int).with_default(8123));
//!
//! let fields = schema.to_fields();
//! assert_eq!(fields[0].name, "username");
//! assert_eq!(fields[2].default, Some(8123.into()));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The closed set of field types a form schema can express.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Free-form text.
    String,
    /// Whole number.
    Int,
    /// True/false toggle.
    Bool,
    /// One value out of a fixed option list.
    Enum {
        /// Accepted values, in presentation order.
        options: Vec<String>,
    },
    /// A nested group of fields validated as an object.
    Nested(Schema),
}

impl FieldKind {
    /// Wire name of this kind, as clients expect it in `data_schema`.
    fn wire_name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Int => "integer",
            FieldKind::Bool => "boolean",
            FieldKind::Enum { .. } => "select",
            FieldKind::Nested(_) => "object",
        }
    }

    /// Type-check a submitted value. Returns the accepted value or a
    /// human-readable rejection message.
    fn check(&self, value: &Value) -> std::result::Result<Value, String> {
        match self {
            FieldKind::String => match value.as_str() {
                Some(_) => Ok(value.clone()),
                None => Err("expected a string".to_owned()),
            },
            FieldKind::Int => {
                if value.is_i64() || value.is_u64() {
                    Ok(value.clone())
                } else {
                    Err("expected an integer".to_owned())
                }
            }
            FieldKind::Bool => match value.as_bool() {
                Some(_) => Ok(value.clone()),
                None => Err("expected a boolean".to_owned()),
            },
            FieldKind::Enum { options } => match value.as_str() {
                Some(chosen) if options.iter().any(|option| option == chosen) => {
                    Ok(value.clone())
                }
                _ => Err(format!("expected one of: {}", options.join(", "))),
            },
            FieldKind::Nested(schema) => match schema.validate(value) {
                Ok(normalized) => Ok(Value::Object(normalized)),
                Err(errors) => Err(errors.to_string()),
            },
        }
    }
}

/// One field of a form schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    kind: FieldKind,
    required: bool,
    default: Option<Value>,
}

impl Field {
    /// A field the caller must supply (unless a default is attached).
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            default: None,
        }
    }

    /// A field the caller may omit.
    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default: None,
        }
    }

    /// Attach a default, filled in when the field is absent from input.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// The field name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An ordered set of form fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. Declaration order is presentation order.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Whether the schema declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert into wire field descriptors, in declared order.
    ///
    /// Pure conversion: the schema is not consumed or mutated, and an empty
    /// schema yields an empty sequence.
    pub fn to_fields(&self) -> Vec<FieldDescriptor> {
        self.fields
            .iter()
            .map(|field| FieldDescriptor {
                name: field.name.clone(),
                kind: field.kind.wire_name().to_owned(),
                required: field.required,
                default: field.default.clone(),
                options: match &field.kind {
                    FieldKind::Enum { options } => Some(options.clone()),
                    _ => None,
                },
                fields: match &field.kind {
                    FieldKind::Nested(schema) => Some(schema.to_fields()),
                    _ => None,
                },
            })
            .collect()
    }

    /// Validate submitted input against this schema.
    ///
    /// Returns the normalized input on success: values in schema field
    /// order, defaults filled in for absent optional fields. On failure
    /// returns one message per offending field; required fields must be
    /// present, every value must match its declared kind, and keys the
    /// schema does not declare are rejected.
    pub fn validate(
        &self,
        input: &Value,
    ) -> std::result::Result<Map<String, Value>, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let Some(object) = input.as_object() else {
            errors.insert("*", "expected a mapping of field values");
            return Err(errors);
        };

        let mut normalized = Map::new();
        for field in &self.fields {
            match object.get(&field.name) {
                Some(value) => match field.kind.check(value) {
                    Ok(accepted) => {
                        normalized.insert(field.name.clone(), accepted);
                    }
                    Err(message) => errors.insert(&field.name, message),
                },
                None => {
                    if let Some(default) = &field.default {
                        normalized.insert(field.name.clone(), default.clone());
                    } else if field.required {
                        errors.insert(&field.name, "required field is missing");
                    }
                }
            }
        }

        for key in object.keys() {
            if !self.fields.iter().any(|field| field.name == *key) {
                errors.insert(key, "unknown field");
            }
        }

        if errors.is_empty() {
            Ok(normalized)
        } else {
            Err(errors)
        }
    }
}

/// Wire representation of one schema field.
///
/// This is what `data_schema` arrays are made of: `{name, type, required}`
/// plus `default` when one is declared, `options` for selects, and nested
/// `fields` for object groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldDescriptor>>,
}

/// Field-keyed validation failure messages.
///
/// Keys are field names; the pseudo-field `*` carries failures that are not
/// attributable to a single field (e.g. input that is not an object).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    /// A single-field failure.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.insert(field, message);
        errors
    }

    /// Record a failure message for a field.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    /// The message recorded for a field, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate failures in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(field, message)| (field.as_str(), message.as_str()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credentials_schema() -> Schema {
        Schema::new()
            .field(Field::required("username", FieldKind::String))
            .field(Field::required("password", FieldKind::String))
    }

    #[test]
    fn to_fields_preserves_declared_order() {
        let fields = credentials_schema().to_fields();

        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "username");
        assert_eq!(fields[0].kind, "string");
        assert!(fields[0].required);
        assert_eq!(fields[1].name, "password");
        assert_eq!(fields[1].kind, "string");
        assert!(fields[1].required);
    }

    #[test]
    fn empty_schema_yields_empty_descriptor_sequence() {
        assert!(Schema::new().to_fields().is_empty());
    }

    #[test]
    fn descriptor_wire_shape() {
        let schema = Schema::new()
            .field(Field::optional("port", FieldKind::Int).with_default(8123))
            .field(Field::required(
                "mode",
                FieldKind::Enum {
                    options: vec!["local".into(), "cloud".into()],
                },
            ));

        let rendered = serde_json::to_value(schema.to_fields()).unwrap();
        assert_eq!(
            rendered,
            json!([
                {"name": "port", "type": "integer", "required": false, "default": 8123},
                {"name": "mode", "type": "select", "required": true, "options": ["local", "cloud"]},
            ])
        );
    }

    #[test]
    fn validate_accepts_and_normalizes() {
        let schema = Schema::new()
            .field(Field::required("username", FieldKind::String))
            .field(Field::optional("port", FieldKind::Int).with_default(8123));

        let normalized = schema.validate(&json!({"username": "jane"})).unwrap();

        assert_eq!(normalized["username"], json!("jane"));
        assert_eq!(normalized["port"], json!(8123));
    }

    #[test]
    fn validate_rejects_missing_required_field() {
        let errors = credentials_schema()
            .validate(&json!({"username": "jane"}))
            .unwrap_err();

        assert_eq!(errors.get("password"), Some("required field is missing"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn validate_rejects_wrong_types() {
        let schema = Schema::new()
            .field(Field::required("port", FieldKind::Int))
            .field(Field::required("ssl", FieldKind::Bool));

        let errors = schema
            .validate(&json!({"port": "8123", "ssl": "yes"}))
            .unwrap_err();

        assert_eq!(errors.get("port"), Some("expected an integer"));
        assert_eq!(errors.get("ssl"), Some("expected a boolean"));
    }

    #[test]
    fn validate_rejects_unknown_fields() {
        let errors = credentials_schema()
            .validate(&json!({"username": "jane", "password": "pw", "extra": 1}))
            .unwrap_err();

        assert_eq!(errors.get("extra"), Some("unknown field"));
    }

    #[test]
    fn validate_rejects_non_object_input() {
        let errors = credentials_schema().validate(&json!("nope")).unwrap_err();

        assert_eq!(errors.get("*"), Some("expected a mapping of field values"));
    }

    #[test]
    fn validate_checks_enum_options() {
        let schema = Schema::new().field(Field::required(
            "mode",
            FieldKind::Enum {
                options: vec!["local".into(), "cloud".into()],
            },
        ));

        assert!(schema.validate(&json!({"mode": "local"})).is_ok());

        let errors = schema.validate(&json!({"mode": "hybrid"})).unwrap_err();
        assert_eq!(errors.get("mode"), Some("expected one of: local, cloud"));
    }

    #[test]
    fn validate_recurses_into_nested_groups() {
        let schema = Schema::new().field(Field::required(
            "proxy",
            FieldKind::Nested(
                Schema::new()
                    .field(Field::required("host", FieldKind::String))
                    .field(Field::optional("port", FieldKind::Int).with_default(3128)),
            ),
        ));

        let normalized = schema
            .validate(&json!({"proxy": {"host": "127.0.0.1"}}))
            .unwrap();
        assert_eq!(normalized["proxy"], json!({"host": "127.0.0.1", "port": 3128}));

        let errors = schema.validate(&json!({"proxy": {"port": 3128}})).unwrap_err();
        assert_eq!(errors.get("proxy"), Some("host: required field is missing"));
    }

    #[test]
    fn validate_does_not_mutate_input() {
        let schema = credentials_schema();
        let input = json!({"username": "jane", "password": "pw"});
        let snapshot = input.clone();

        let _ = schema.validate(&input);

        assert_eq!(input, snapshot);
    }
}
