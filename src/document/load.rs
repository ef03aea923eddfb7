use crate::document::{
    ArraySchema, Composition, Content, Document, Location, ObjectSchema, Operation, ParameterSpec,
    PathItem, RequestBodySpec, ResponseSpec, ScalarKind, ScalarSchema, Schema,
};
use crate::error::LoadError;
use log::{debug, warn};
use oas3::spec::{self, ObjectOrReference, ParameterIn, SchemaType, SchemaTypeSet, Spec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

const SCHEMA_PREFIX: &str = "#/components/schemas/";
const PARAMETER_PREFIX: &str = "#/components/parameters/";
const REQUEST_BODY_PREFIX: &str = "#/components/requestBodies/";
const RESPONSE_PREFIX: &str = "#/components/responses/";
const HEADER_PREFIX: &str = "#/components/headers/";

/// Load a document from a file path or an http(s) URL
pub fn from_location(location: &str) -> Result<Document, LoadError> {
    let text = if is_remote(location) {
        debug!("Fetching schema from {location}");
        fetch(location)?
    } else {
        std::fs::read_to_string(location).map_err(|source| LoadError::Io {
            path: location.to_string(),
            source,
        })?
    };
    from_str(&text)
}

/// Parse a JSON or YAML document
pub fn from_str(text: &str) -> Result<Document, LoadError> {
    let value = if text.trim_start().starts_with('{') {
        serde_json::from_str(text)?
    } else {
        let yaml: serde_yaml::Value = serde_yaml::from_str(text)?;
        yaml_to_json(yaml)
    };
    from_value(value)
}

/// Convert an already parsed JSON document, keeping the declaration order
/// of `paths` and of every schema's `properties`
pub fn from_value(value: Value) -> Result<Document, LoadError> {
    let spec = Spec::deserialize(&value)?;
    Ok(Converter::new(&spec, Some(&value)).document())
}

impl Document {
    /// Convert a parsed `oas3` document. Paths and properties follow its map order.
    pub fn from_spec(spec: &Spec) -> Self {
        Converter::new(spec, None).document()
    }
}

fn is_remote(location: &str) -> bool {
    url::Url::parse(location)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

fn fetch(location: &str) -> Result<String, LoadError> {
    let to_error = |source| LoadError::Fetch {
        url: location.to_string(),
        source,
    };
    reqwest::blocking::Client::builder()
        .connect_timeout(Duration::from_secs(60))
        .build()
        .and_then(|client| client.get(location).send())
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(to_error)
}

/// YAML mappings may carry non-string keys (unquoted status codes)
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(flag) => Value::Bool(flag),
        serde_yaml::Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Value::from(int)
            } else if let Some(uint) = number.as_u64() {
                Value::from(uint)
            } else {
                number
                    .as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(text) => Value::String(text),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut object = serde_json::Map::new();
            for (key, value) in mapping {
                let key = match key {
                    serde_yaml::Value::String(text) => text,
                    serde_yaml::Value::Number(number) => number.to_string(),
                    serde_yaml::Value::Bool(flag) => flag.to_string(),
                    other => match yaml_to_json(other) {
                        Value::String(text) => text,
                        converted => converted.to_string(),
                    },
                };
                object.insert(key, yaml_to_json(value));
            }
            Value::Object(object)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

/// Strip a local component prefix, keeping foreign pointers intact
fn reference_name(ref_path: &str, prefix: &str) -> String {
    ref_path
        .strip_prefix(prefix)
        .unwrap_or(ref_path)
        .to_string()
}

/// JSON pointer from `base` and unescaped reference tokens
fn pointer(base: &str, tokens: &[&str]) -> String {
    let mut pointer = base.to_string();
    for token in tokens {
        pointer.push('/');
        pointer.push_str(&token.replace('~', "~0").replace('/', "~1"));
    }
    pointer
}

/// Walks an `oas3` spec once and produces the closed model.
///
/// Every node is converted together with its JSON pointer so key order can
/// be read back from the raw document, which `oas3` maps do not keep.
struct Converter<'a> {
    spec: &'a Spec,
    raw: Option<&'a Value>,
}

impl<'a> Converter<'a> {
    fn new(spec: &'a Spec, raw: Option<&'a Value>) -> Self {
        Self { spec, raw }
    }

    /// Keys of the raw object at `at`, in document order
    fn declared_keys(&self, at: &str) -> Vec<&'a str> {
        self.raw
            .and_then(|raw| raw.pointer(at))
            .and_then(Value::as_object)
            .map(|object| object.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn document(&self) -> Document {
        let servers = self
            .spec
            .servers
            .iter()
            .map(|server| server.url.trim_end_matches('/').to_string())
            .collect();

        let schemas = self
            .spec
            .components
            .as_ref()
            .map(|components| {
                components
                    .schemas
                    .iter()
                    .map(|(name, schema)| {
                        let at = pointer("", &["components", "schemas", name]);
                        (name.clone(), self.schema(schema, &at))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut paths = Vec::new();
        if let Some(items) = &self.spec.paths {
            let order = self.declared_keys("/paths");
            let declared = order
                .iter()
                .copied()
                .filter(|template| items.contains_key(*template));
            let remaining = items
                .keys()
                .map(String::as_str)
                .filter(|template| !order.contains(template));

            for template in declared.chain(remaining) {
                if let Some(item) = items.get(template) {
                    paths.push(PathItem {
                        template: template.to_string(),
                        operations: self.operations(template, item),
                    });
                }
            }
        }

        Document {
            paths,
            servers,
            schemas,
        }
    }

    fn operations(&self, template: &str, item: &spec::PathItem) -> BTreeMap<String, Operation> {
        let methods = [
            ("get", &item.get),
            ("put", &item.put),
            ("post", &item.post),
            ("delete", &item.delete),
            ("options", &item.options),
            ("head", &item.head),
            ("patch", &item.patch),
            ("trace", &item.trace),
        ];

        let at = pointer("", &["paths", template]);
        let shared = self.parameters(&item.parameters, &at);

        methods
            .into_iter()
            .filter_map(|(method, operation)| {
                operation.as_ref().map(|op| {
                    let at = pointer(&at, &[method]);
                    (method.to_string(), self.operation(template, method, op, &shared, &at))
                })
            })
            .collect()
    }

    fn parameters(
        &self,
        parameters: &[ObjectOrReference<spec::Parameter>],
        at: &str,
    ) -> Vec<ParameterSpec> {
        parameters
            .iter()
            .enumerate()
            .filter_map(|(index, parameter)| {
                self.parameter(parameter, &pointer(at, &["parameters", &index.to_string()]))
            })
            .collect()
    }

    fn operation(
        &self,
        template: &str,
        method: &str,
        op: &spec::Operation,
        shared: &[ParameterSpec],
        at: &str,
    ) -> Operation {
        let own = self.parameters(&op.parameters, at);

        // Path-level parameters apply unless the operation redeclares them
        let mut parameters: Vec<ParameterSpec> = shared
            .iter()
            .filter(|inherited| {
                !own.iter().any(|p| p.name == inherited.name && p.location == inherited.location)
            })
            .cloned()
            .collect();
        parameters.extend(own);

        let request_body = op
            .request_body
            .as_ref()
            .and_then(|body| self.request_body(body, &pointer(at, &["requestBody"])));

        let responses = op
            .responses
            .iter()
            .flatten()
            .filter_map(|(code, response)| {
                self.response(response, &pointer(at, &["responses", code]))
                    .map(|response| (code.clone(), response))
            })
            .collect();

        Operation {
            method: method.to_ascii_uppercase(),
            template: template.to_string(),
            operation_id: op.operation_id.clone(),
            parameters,
            request_body,
            responses,
            deprecated: op.deprecated.unwrap_or(false),
        }
    }

    fn parameter(
        &self,
        parameter: &ObjectOrReference<spec::Parameter>,
        at: &str,
    ) -> Option<ParameterSpec> {
        let (parameter, at) = match parameter {
            ObjectOrReference::Object(parameter) => (parameter, at.to_string()),
            ObjectOrReference::Ref { ref_path, .. } => {
                let name = reference_name(ref_path, PARAMETER_PREFIX);
                let at = pointer("", &["components", "parameters", &name]);
                let found = self
                    .spec
                    .components
                    .as_ref()
                    .and_then(|components| components.parameters.get(&name));
                match found {
                    Some(ObjectOrReference::Object(parameter)) => (parameter, at),
                    _ => {
                        warn!("Skipping unresolvable parameter reference {ref_path}");
                        return None;
                    }
                }
            }
        };

        let location = match parameter.location {
            ParameterIn::Header => Location::Header,
            ParameterIn::Query => Location::Query,
            ParameterIn::Path => Location::Path,
            ParameterIn::Cookie => Location::Cookie,
        };

        Some(ParameterSpec {
            name: parameter.name.clone(),
            location,
            required: parameter.required.unwrap_or(false),
            deprecated: parameter.deprecated.unwrap_or(false),
            schema: parameter
                .schema
                .as_ref()
                .map(|schema| self.schema(schema, &pointer(&at, &["schema"]))),
        })
    }

    fn request_body(
        &self,
        body: &ObjectOrReference<spec::RequestBody>,
        at: &str,
    ) -> Option<RequestBodySpec> {
        let (body, at) = match body {
            ObjectOrReference::Object(body) => (body, at.to_string()),
            ObjectOrReference::Ref { ref_path, .. } => {
                let name = reference_name(ref_path, REQUEST_BODY_PREFIX);
                let at = pointer("", &["components", "requestBodies", &name]);
                let found = self
                    .spec
                    .components
                    .as_ref()
                    .and_then(|components| components.request_bodies.get(&name));
                match found {
                    Some(ObjectOrReference::Object(body)) => (body, at),
                    _ => {
                        warn!("Skipping unresolvable request body reference {ref_path}");
                        return None;
                    }
                }
            }
        };

        Some(RequestBodySpec {
            required: body.required.unwrap_or(false),
            content: self.content(&body.content, &at),
        })
    }

    fn response(
        &self,
        response: &ObjectOrReference<spec::Response>,
        at: &str,
    ) -> Option<ResponseSpec> {
        let (response, at) = match response {
            ObjectOrReference::Object(response) => (response, at.to_string()),
            ObjectOrReference::Ref { ref_path, .. } => {
                let name = reference_name(ref_path, RESPONSE_PREFIX);
                let at = pointer("", &["components", "responses", &name]);
                let found = self
                    .spec
                    .components
                    .as_ref()
                    .and_then(|components| components.responses.get(&name));
                match found {
                    Some(ObjectOrReference::Object(response)) => (response, at),
                    _ => {
                        warn!("Skipping unresolvable response reference {ref_path}");
                        return None;
                    }
                }
            }
        };

        let headers = response
            .headers
            .iter()
            .filter_map(|(name, header)| self.header(name, header, &pointer(&at, &["headers", name])))
            .collect();

        Some(ResponseSpec {
            headers,
            content: self.content(&response.content, &at),
        })
    }

    /// Headers are read through their JSON form, which is the same for
    /// inline and component headers
    fn header(&self, name: &str, header: &impl Serialize, at: &str) -> Option<ParameterSpec> {
        let mut value = serde_json::to_value(header).ok()?;
        let mut at = at.to_string();

        if let Some(ref_path) = value.get("$ref").and_then(Value::as_str).map(str::to_owned) {
            let key = reference_name(&ref_path, HEADER_PREFIX);
            at = pointer("", &["components", "headers", &key]);
            let component = self
                .spec
                .components
                .as_ref()
                .and_then(|components| components.headers.get(&key));
            value = match component.and_then(|header| serde_json::to_value(header).ok()) {
                Some(resolved) if resolved.get("$ref").is_none() => resolved,
                _ => {
                    warn!("Skipping unresolvable header reference {ref_path}");
                    return None;
                }
            };
        }

        let flag = |key: &str| value.get(key).and_then(Value::as_bool).unwrap_or(false);
        let schema = value
            .get("schema")
            .cloned()
            .and_then(|schema| {
                serde_json::from_value::<ObjectOrReference<spec::ObjectSchema>>(schema).ok()
            })
            .map(|schema| self.schema(&schema, &pointer(&at, &["schema"])));

        Some(ParameterSpec {
            name: name.to_string(),
            location: Location::Header,
            required: flag("required"),
            deprecated: flag("deprecated"),
            schema,
        })
    }

    fn content(&self, content: &BTreeMap<String, spec::MediaType>, at: &str) -> Content {
        Content(
            content
                .iter()
                .map(|(media_type, media)| {
                    let at = pointer(at, &["content", media_type, "schema"]);
                    (
                        media_type.clone(),
                        media.schema.as_ref().map(|schema| self.schema(schema, &at)),
                    )
                })
                .collect(),
        )
    }

    fn schema(&self, schema: &ObjectOrReference<spec::ObjectSchema>, at: &str) -> Schema {
        match schema {
            ObjectOrReference::Ref { ref_path, .. } => {
                Schema::Reference(reference_name(ref_path, SCHEMA_PREFIX))
            }
            ObjectOrReference::Object(object) => self.object_schema(object, at),
        }
    }

    fn object_schema(&self, schema: &spec::ObjectSchema, at: &str) -> Schema {
        let compositions = [
            (Composition::AllOf, "allOf", &schema.all_of),
            (Composition::AnyOf, "anyOf", &schema.any_of),
            (Composition::OneOf, "oneOf", &schema.one_of),
        ];
        for (kind, key, branches) in compositions {
            if !branches.is_empty() {
                return Schema::composed(
                    kind,
                    branches
                        .iter()
                        .enumerate()
                        .map(|(index, branch)| {
                            self.schema(branch, &pointer(at, &[key, &index.to_string()]))
                        })
                        .collect(),
                );
            }
        }

        let nullable = schema.is_nullable().unwrap_or(false)
            || matches!(&schema.schema_type, Some(SchemaTypeSet::Multiple(types))
                if types.iter().any(|schema_type| matches!(schema_type, SchemaType::Null)));
        let declared = match &schema.schema_type {
            Some(SchemaTypeSet::Single(schema_type)) => Some(schema_type),
            Some(SchemaTypeSet::Multiple(types)) => types
                .iter()
                .find(|schema_type| !matches!(schema_type, SchemaType::Null)),
            None => None,
        };

        let scalar = |kind| {
            Schema::Scalar(ScalarSchema {
                kind,
                format: schema.format.clone(),
                min_length: schema.min_length,
                max_length: schema.max_length,
                enum_values: schema.enum_values.clone(),
                nullable,
            })
        };
        let array = || {
            Schema::Array(ArraySchema {
                items: self.items(schema, at).map(Box::new),
                min_items: schema.min_items,
                max_items: schema.max_items,
                nullable,
            })
        };
        let object = || {
            let mut properties: Vec<(String, Schema)> = schema
                .properties
                .iter()
                .map(|(name, property)| {
                    let at = pointer(at, &["properties", name]);
                    (name.clone(), self.schema(property, &at))
                })
                .collect();
            let order = self.declared_keys(&pointer(at, &["properties"]));
            properties.sort_by_key(|(name, _)| {
                order
                    .iter()
                    .position(|key| *key == name.as_str())
                    .unwrap_or(usize::MAX)
            });

            Schema::Object(ObjectSchema {
                properties,
                required: schema.required.clone(),
                nullable,
            })
        };

        match declared {
            Some(SchemaType::String) => scalar(ScalarKind::String),
            Some(SchemaType::Integer) => scalar(ScalarKind::Integer),
            Some(SchemaType::Number) => scalar(ScalarKind::Number),
            Some(SchemaType::Boolean) => scalar(ScalarKind::Boolean),
            Some(SchemaType::Array) => array(),
            Some(SchemaType::Object) => object(),
            Some(_) => Schema::Untyped,
            None if !schema.properties.is_empty() => object(),
            None if schema.items.is_some() => array(),
            None => Schema::Untyped,
        }
    }

    /// `items` may be a boolean schema; those leave elements unconstrained
    fn items(&self, schema: &spec::ObjectSchema, at: &str) -> Option<Schema> {
        let items = serde_json::to_value(schema.items.as_ref()?).ok()?;
        let items: ObjectOrReference<spec::ObjectSchema> = serde_json::from_value(items).ok()?;
        Some(self.schema(&items, &pointer(at, &["items"])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PETSTORE_YAML: &str = r#"
openapi: 3.0.3
info:
  title: Petstore
  version: 1.0.0
servers:
  - url: http://petstore.local/v1/
paths:
  /pets/{petId}:
    parameters:
      - name: petId
        in: path
        required: true
        schema:
          type: integer
          format: int64
    get:
      operationId: showPet
      responses:
        200:
          description: ok
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
  /pets:
    post:
      deprecated: true
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Pet'
      responses:
        default:
          description: error
components:
  schemas:
    Pet:
      required: [name]
      properties:
        name:
          type: string
        tags:
          type: array
          items:
            type: string
"#;

    #[test]
    fn test_yaml_document_conversion() {
        let document = from_str(PETSTORE_YAML).unwrap();

        assert_eq!(document.servers, vec!["http://petstore.local/v1".to_string()]);
        let templates: Vec<&str> = document.paths.iter().map(|p| p.template.as_str()).collect();
        assert_eq!(templates, vec!["/pets/{petId}", "/pets"]);

        let show = document.path("/pets/{petId}").unwrap().operation("GET").unwrap();
        assert_eq!(show.display_name(), "showPet");
        assert_eq!(show.parameters.len(), 1);
        assert_eq!(show.parameters[0].location, Location::Path);
        assert!(show.parameters[0].required);
        assert!(show.responses.contains_key("200"));

        let create = document.path("/pets").unwrap().operation("post").unwrap();
        assert!(create.deprecated);
        assert_eq!(create.display_name(), "POST /pets");
        let body = create.request_body.as_ref().unwrap();
        assert!(body.required);
        assert_eq!(
            body.content.json().unwrap().1,
            Some(&Schema::reference("Pet"))
        );
    }

    #[test]
    fn test_untyped_schema_with_properties_is_object() {
        let document = from_str(PETSTORE_YAML).unwrap();

        match &document.schemas["Pet"] {
            Schema::Object(object) => {
                assert_eq!(object.required, vec!["name".to_string()]);
                let names: Vec<&str> = object.properties.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["name", "tags"]);
                assert!(matches!(&object.properties[1].1, Schema::Array(array) if array.items.is_some()));
            }
            other => panic!("expected object schema, got {other:?}"),
        }
    }

    #[test]
    fn test_properties_keep_declaration_order() {
        let raw = serde_json::json!({
            "openapi": "3.0.3",
            "info": { "title": "Order", "version": "1.0.0" },
            "paths": {},
            "components": {
                "schemas": {
                    "Point": {
                        "type": "object",
                        "properties": {
                            "zeta": { "type": "integer" },
                            "mid/dle": { "type": "integer" },
                            "alpha": {
                                "type": "object",
                                "properties": {
                                    "y": { "type": "string" },
                                    "x": { "type": "string" }
                                }
                            }
                        }
                    }
                }
            }
        });
        let names = |schema: &Schema| -> Vec<String> {
            match schema {
                Schema::Object(object) => {
                    object.properties.iter().map(|(name, _)| name.clone()).collect()
                }
                other => panic!("expected object schema, got {other:?}"),
            }
        };

        let document = from_value(raw.clone()).unwrap();
        let point = &document.schemas["Point"];
        assert_eq!(names(point), vec!["zeta", "mid/dle", "alpha"]);
        match point {
            Schema::Object(object) => assert_eq!(names(&object.properties[2].1), vec!["y", "x"]),
            other => panic!("expected object schema, got {other:?}"),
        }

        // Without the raw text only the map order is known
        let spec: Spec = serde_json::from_value(raw).unwrap();
        let document = Document::from_spec(&spec);
        assert_eq!(names(&document.schemas["Point"]), vec!["alpha", "mid/dle", "zeta"]);
    }

    #[test]
    fn test_malformed_document_is_rejected() {
        assert!(matches!(from_str("{ not json"), Err(LoadError::Json(_))));
        assert!(matches!(
            from_location("/definitely/not/here.json"),
            Err(LoadError::Io { .. })
        ));
    }
}
