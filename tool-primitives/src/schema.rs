//! Input schemas describing the named fields a tool accepts.
//!
//! A schema is an ordered list of [`FieldSpec`]s. On the wire it is rendered as
//! a JSON-Schema object (`{"type": "object", "properties": {...}, "required":
//! [...]}`) so calling agents can consume it directly.
//!
//! Keywords the field model does not interpret (`enum`, `default`, `items`,
//! nested `properties`, union `type` arrays, ...) are kept verbatim on the
//! field and rendered back unchanged, so a parsed schema is advertised as it
//! was written.
//!
//! The `required` flags are advisory. The argument binder uses the schema only
//! to decide which caller-supplied keys to keep; enforcing required fields is
//! left to the handler so optional arguments can default there.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Declared JSON type of a single input field.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FieldKind {
    /// JSON string.
    String,
    /// JSON number without a fractional part.
    Integer,
    /// Any JSON number.
    Number,
    /// JSON boolean.
    Boolean,
    /// JSON object.
    Object,
    /// JSON array.
    Array,
    /// No declared type; any JSON value is accepted.
    Any,
}

impl FieldKind {
    /// Returns the JSON-Schema type keyword, or `None` for [`FieldKind::Any`].
    #[must_use]
    pub const fn as_str(self) -> Option<&'static str> {
        match self {
            Self::String => Some("string"),
            Self::Integer => Some("integer"),
            Self::Number => Some("number"),
            Self::Boolean => Some("boolean"),
            Self::Object => Some("object"),
            Self::Array => Some("array"),
            Self::Any => None,
        }
    }

    fn parse(field: &str, value: Option<&Value>) -> Result<Self> {
        let Some(value) = value else {
            return Ok(Self::Any);
        };
        match value {
            Value::String(kind) => match kind.as_str() {
                "string" => Ok(Self::String),
                "integer" => Ok(Self::Integer),
                "number" => Ok(Self::Number),
                "boolean" => Ok(Self::Boolean),
                "object" => Ok(Self::Object),
                "array" => Ok(Self::Array),
                other => Err(Error::schema(format!(
                    "field `{field}` declares unsupported type `{other}`"
                ))),
            },
            // Union types such as ["string", "null"] stay `Any`; the original
            // array is kept as a keyword on the field.
            Value::Array(_) => Ok(Self::Any),
            _ => Err(Error::schema(format!(
                "field `{field}` has a non-string type declaration"
            ))),
        }
    }
}

/// A single named field of an [`InputSchema`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldSpec {
    name: String,
    kind: FieldKind,
    description: Option<String>,
    required: bool,
    keywords: Map<String, Value>,
}

impl FieldSpec {
    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared type.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Returns the optional human-readable description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns `true` when the field is declared as required.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the JSON-Schema keywords carried through without interpretation.
    #[must_use]
    pub fn keywords(&self) -> &Map<String, Value> {
        &self.keywords
    }

    fn to_property(&self) -> Value {
        let mut property = Map::new();
        if let Some(kind) = self.kind.as_str() {
            property.insert("type".into(), Value::String(kind.into()));
        }
        if let Some(description) = &self.description {
            property.insert("description".into(), Value::String(description.clone()));
        }
        for (key, value) in &self.keywords {
            property.insert(key.clone(), value.clone());
        }
        Value::Object(property)
    }
}

/// Ordered set of fields a tool accepts.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(into = "Value", try_from = "Value")]
pub struct InputSchema {
    fields: Vec<FieldSpec>,
}

impl InputSchema {
    /// Returns a schema that declares no fields.
    ///
    /// Binding against an empty schema drops every caller-supplied argument.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Starts building a schema.
    #[must_use]
    pub fn builder() -> InputSchemaBuilder {
        InputSchemaBuilder::default()
    }

    /// Returns the declared fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Returns `true` when the schema declares a field called `name`.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Iterates over the names of fields flagged as required.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|field| field.required)
            .map(|field| field.name.as_str())
    }

    /// Returns `true` when no fields are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Renders the schema as a JSON-Schema object.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|field| (field.name.clone(), field.to_property()))
            .collect();
        let required: Vec<Value> = self
            .required_fields()
            .map(|name| Value::String(name.to_owned()))
            .collect();

        let mut schema = Map::new();
        schema.insert("type".into(), Value::String("object".into()));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), Value::Array(required));
        }
        Value::Object(schema)
    }

    /// Parses a schema from its JSON representation.
    ///
    /// Two shapes are accepted: a JSON-Schema object with `properties` and an
    /// optional `required` array, and the flat legacy form that maps each field
    /// name directly to `{"type": ..., "required": bool}`. An empty object
    /// yields an empty schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSchema`] if the value is not an object, if a
    /// field definition is not an object, if a type keyword is unknown, or if a
    /// `required` entry names an undeclared field.
    pub fn from_json_schema(value: &Value) -> Result<Self> {
        let Value::Object(root) = value else {
            return Err(Error::schema("schema must be a JSON object"));
        };

        if let Some(properties) = root.get("properties") {
            return Self::from_properties(root, properties);
        }

        if matches!(root.get("type"), Some(Value::String(_))) {
            return Ok(Self::empty());
        }

        let mut builder = Self::builder();
        for (name, definition) in root {
            let Value::Object(definition) = definition else {
                return Err(Error::schema(format!(
                    "field `{name}` must be described by an object"
                )));
            };
            let required = definition
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            builder = builder.push(name, definition, required)?;
        }
        Ok(builder.build())
    }

    fn from_properties(root: &Map<String, Value>, properties: &Value) -> Result<Self> {
        let Value::Object(properties) = properties else {
            return Err(Error::schema("`properties` must be a JSON object"));
        };

        let required: BTreeSet<&str> = match root.get("required") {
            None => BTreeSet::new(),
            Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
            Some(_) => return Err(Error::schema("`required` must be an array of names")),
        };

        if let Some(unknown) = required.iter().find(|name| !properties.contains_key(**name)) {
            return Err(Error::schema(format!(
                "required field `{unknown}` is not declared in `properties`"
            )));
        }

        let mut builder = Self::builder();
        for (name, definition) in properties {
            let Value::Object(definition) = definition else {
                return Err(Error::schema(format!(
                    "property `{name}` must be described by an object"
                )));
            };
            builder = builder.push(name, definition, required.contains(name.as_str()))?;
        }
        Ok(builder.build())
    }
}

impl From<InputSchema> for Value {
    fn from(schema: InputSchema) -> Self {
        schema.to_json_schema()
    }
}

impl TryFrom<Value> for InputSchema {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_json_schema(&value)
    }
}

/// Builder for [`InputSchema`].
#[derive(Debug, Default)]
pub struct InputSchemaBuilder {
    fields: Vec<FieldSpec>,
}

impl InputSchemaBuilder {
    /// Declares a required field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSchema`] if the name is empty or already declared.
    pub fn required(
        self,
        name: impl Into<String>,
        kind: FieldKind,
        description: impl Into<String>,
    ) -> Result<Self> {
        self.insert(name.into(), kind, Some(description.into()), true)
    }

    /// Declares an optional field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSchema`] if the name is empty or already declared.
    pub fn optional(
        self,
        name: impl Into<String>,
        kind: FieldKind,
        description: impl Into<String>,
    ) -> Result<Self> {
        self.insert(name.into(), kind, Some(description.into()), false)
    }

    /// Attaches an uninterpreted JSON-Schema keyword (`enum`, `default`,
    /// `items`, ...) to an already declared field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSchema`] if `field` is not declared, or if
    /// `key` is `type` or `description`, which the field models directly.
    pub fn keyword(mut self, field: &str, key: impl Into<String>, value: Value) -> Result<Self> {
        let key = key.into();
        if key == "type" || key == "description" {
            return Err(Error::schema(format!(
                "`{key}` is set through the field declaration, not as a keyword"
            )));
        }
        let Some(spec) = self.fields.iter_mut().find(|spec| spec.name == field) else {
            return Err(Error::schema(format!("field `{field}` is not declared")));
        };
        spec.keywords.insert(key, value);
        Ok(self)
    }

    /// Finalises the schema.
    #[must_use]
    pub fn build(self) -> InputSchema {
        InputSchema {
            fields: self.fields,
        }
    }

    fn push(self, name: &str, definition: &Map<String, Value>, required: bool) -> Result<Self> {
        let kind = FieldKind::parse(name, definition.get("type"))?;
        let description = definition
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let keywords = definition
            .iter()
            .filter(|(key, value)| match key.as_str() {
                "type" => value.is_array(),
                "description" => !value.is_string(),
                "required" => !value.is_boolean(),
                _ => true,
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let mut builder = self.insert(name.to_owned(), kind, description, required)?;
        if let Some(field) = builder.fields.last_mut() {
            field.keywords = keywords;
        }
        Ok(builder)
    }

    fn insert(
        mut self,
        name: String,
        kind: FieldKind,
        description: Option<String>,
        required: bool,
    ) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(Error::schema("field name cannot be empty"));
        }
        if self.fields.iter().any(|field| field.name == name) {
            return Err(Error::schema(format!("field `{name}` declared twice")));
        }
        self.fields.push(FieldSpec {
            name,
            kind,
            description,
            required,
            keywords: Map::new(),
        });
        Ok(self)
    }
}
