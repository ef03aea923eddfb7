//! Closed data model of an OpenAPI contract, as seen by the validator.
//!
//! A [`Document`] is converted once from a parsed `oas3` spec (see [`load`])
//! and stays read-only afterwards.

pub mod load;

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub use load::{from_location, from_str, from_value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Path items in document declaration order
    pub paths: Vec<PathItem>,
    /// Base URLs without trailing slash
    pub servers: Vec<String>,
    /// `components.schemas`
    pub schemas: BTreeMap<String, Schema>,
}

impl Document {
    pub fn path(&self, template: &str) -> Option<&PathItem> {
        self.paths.iter().find(|item| item.template == template)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathItem {
    pub template: String,
    /// Keyed by lowercase HTTP method
    pub operations: BTreeMap<String, Operation>,
}

impl PathItem {
    pub fn operation(&self, method: &str) -> Option<&Operation> {
        self.operations.get(&method.to_ascii_lowercase())
    }

    pub fn is_templated(&self) -> bool {
        self.template.contains('{')
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Operation {
    /// Uppercase HTTP method
    pub method: String,
    pub template: String,
    pub operation_id: Option<String>,
    pub parameters: Vec<ParameterSpec>,
    pub request_body: Option<RequestBodySpec>,
    /// Keyed by status code string (`"200"`, `"4XX"`, `"default"`)
    pub responses: BTreeMap<String, ResponseSpec>,
    pub deprecated: bool,
}

impl Operation {
    /// `operationId`, or `METHOD template` for anonymous operations
    pub fn display_name(&self) -> String {
        match &self.operation_id {
            Some(id) => id.clone(),
            None => format!("{} {}", self.method, self.template),
        }
    }

    pub fn parameters_in(&self, location: Location) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters
            .iter()
            .filter(move |parameter| parameter.location == location)
    }

    /// Exact status code first, then its `NXX` class, then `default`
    pub fn response_for(&self, status: u16) -> Option<&ResponseSpec> {
        let exact = status.to_string();
        let class = format!("{}XX", status / 100);

        self.responses.get(&exact).or_else(|| {
            self.responses
                .iter()
                .find(|(code, _)| code.eq_ignore_ascii_case(&class))
                .map(|(_, response)| response)
                .or_else(|| self.responses.get("default"))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Header,
    Query,
    Path,
    Cookie,
}

impl Location {
    pub const ALL: [Location; 4] = [
        Location::Header,
        Location::Query,
        Location::Path,
        Location::Cookie,
    ];
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Location::Header => "header",
            Location::Query => "query",
            Location::Path => "path",
            Location::Cookie => "cookie",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub location: Location,
    pub required: bool,
    pub deprecated: bool,
    pub schema: Option<Schema>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestBodySpec {
    pub required: bool,
    pub content: Content,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseSpec {
    /// Declared headers, with `location == Location::Header`
    pub headers: Vec<ParameterSpec>,
    pub content: Content,
}

/// Media type to (optional) schema mapping of a body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Content(pub BTreeMap<String, Option<Schema>>);

impl Content {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The JSON media type entry: `application/json` exactly, otherwise any
    /// `application/json;...` or `*+json` type
    pub fn json(&self) -> Option<(&str, Option<&Schema>)> {
        let exact = self.0.get_key_value("application/json");
        exact
            .or_else(|| {
                self.0.iter().find(|(media_type, _)| {
                    let essence = media_type.split(';').next().unwrap_or_default().trim();
                    essence.eq_ignore_ascii_case("application/json") || essence.ends_with("+json")
                })
            })
            .map(|(media_type, schema)| (media_type.as_str(), schema.as_ref()))
    }

    pub fn media_types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Closed schema representation
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Scalar(ScalarSchema),
    Array(ArraySchema),
    Object(ObjectSchema),
    /// Key into `components.schemas`
    Reference(String),
    Composed(ComposedSchema),
    /// Neither typed, referenced nor composed; rejected on resolution
    Untyped,
}

impl Schema {
    pub fn scalar(kind: ScalarKind) -> Self {
        Schema::Scalar(ScalarSchema::new(kind))
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Schema::Reference(name.into())
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array(ArraySchema {
            items: Some(Box::new(items)),
            ..Default::default()
        })
    }

    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Schema::Object(ObjectSchema {
            properties: properties
                .into_iter()
                .map(|(name, schema)| (name.into(), schema))
                .collect(),
            ..Default::default()
        })
    }

    pub fn composed(kind: Composition, branches: Vec<Schema>) -> Self {
        Schema::Composed(ComposedSchema { kind, branches })
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            Schema::Scalar(scalar) => scalar.nullable,
            Schema::Array(array) => array.nullable,
            Schema::Object(object) => object.nullable,
            Schema::Reference(_) | Schema::Composed(_) | Schema::Untyped => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "integer",
            ScalarKind::Number => "number",
            ScalarKind::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarSchema {
    pub kind: ScalarKind,
    pub format: Option<String>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub enum_values: Vec<Value>,
    pub nullable: bool,
}

impl ScalarSchema {
    pub fn new(kind: ScalarKind) -> Self {
        Self {
            kind,
            format: None,
            min_length: None,
            max_length: None,
            enum_values: Vec::new(),
            nullable: false,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_enum<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_int64(&self) -> bool {
        self.format.as_deref() == Some("int64")
    }

    /// Allowed values rendered as `[a, b, c]`
    pub fn allowed_values(&self) -> String {
        let values: Vec<String> = self
            .enum_values
            .iter()
            .map(|value| match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect();
        format!("[{}]", values.join(", "))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArraySchema {
    /// `None` when the document leaves elements unconstrained
    pub items: Option<Box<Schema>>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub nullable: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    pub properties: Vec<(String, Schema)>,
    pub required: Vec<String>,
    pub nullable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Composition {
    AllOf,
    AnyOf,
    OneOf,
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Composition::AllOf => "allOf",
            Composition::AnyOf => "anyOf",
            Composition::OneOf => "oneOf",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedSchema {
    pub kind: Composition,
    pub branches: Vec<Schema>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operation_with(codes: &[&str]) -> Operation {
        Operation {
            method: "GET".to_string(),
            template: "/pets".to_string(),
            responses: codes
                .iter()
                .map(|code| (code.to_string(), ResponseSpec::default()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_response_lookup_precedence() {
        let operation = operation_with(&["200", "2xx", "default"]);
        assert!(std::ptr::eq(
            operation.response_for(200).unwrap(),
            &operation.responses["200"]
        ));
        assert!(std::ptr::eq(
            operation.response_for(201).unwrap(),
            &operation.responses["2xx"]
        ));
        assert!(std::ptr::eq(
            operation.response_for(500).unwrap(),
            &operation.responses["default"]
        ));

        assert!(operation_with(&["200"]).response_for(404).is_none());
    }

    #[test]
    fn test_json_content_selection() {
        let mut content = Content::default();
        content.0.insert("text/plain".to_string(), None);
        assert!(content.json().is_none());

        content.0.insert(
            "application/problem+json".to_string(),
            Some(Schema::scalar(ScalarKind::String)),
        );
        let (media_type, schema) = content.json().unwrap();
        assert_eq!(media_type, "application/problem+json");
        assert!(schema.is_some());

        content.0.insert("application/json".to_string(), None);
        assert_eq!(content.json().unwrap().0, "application/json");
    }

    #[test]
    fn test_allowed_values_rendering() {
        let schema = ScalarSchema::new(ScalarKind::String).with_enum(["placed", "approved"]);
        assert_eq!(schema.allowed_values(), "[placed, approved]");

        let schema = ScalarSchema::new(ScalarKind::Integer).with_enum([1, 2]);
        assert_eq!(schema.allowed_values(), "[1, 2]");
    }
}
