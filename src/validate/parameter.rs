use crate::diagnostics::Diagnostic;
use crate::document::{Location, ParameterSpec, ScalarKind, ScalarSchema, Schema};
use crate::http::Multimap;
use crate::resolver::SchemaResolver;
use serde_json::Value;

/// A parameter string coerced to its declared kind
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    Integer(i64),
    Number(f64),
    /// `format: double`, held and compared at single precision
    Single(f32),
    Boolean(bool),
    String(String),
}

impl Coerced {
    /// Parse `value` as the scalar's kind. `int64` integers are 64-bit,
    /// others 32-bit; `double` numbers are parsed single precision.
    pub fn parse(schema: &ScalarSchema, value: &str) -> Option<Self> {
        match schema.kind {
            ScalarKind::Integer if schema.is_int64() => value.parse::<i64>().ok().map(Coerced::Integer),
            ScalarKind::Integer => value
                .parse::<i32>()
                .ok()
                .map(|int| Coerced::Integer(i64::from(int))),
            ScalarKind::Number if schema.format.as_deref() == Some("double") => {
                value.parse::<f32>().ok().map(Coerced::Single)
            }
            ScalarKind::Number => value.parse::<f64>().ok().map(Coerced::Number),
            ScalarKind::Boolean => value.parse::<bool>().ok().map(Coerced::Boolean),
            ScalarKind::String => Some(Coerced::String(value.to_string())),
        }
    }

    /// Whether this value equals a declared enum member
    pub fn matches(&self, member: &Value) -> bool {
        match (self, member) {
            (Coerced::Integer(int), Value::Number(number)) => {
                number.as_i64() == Some(*int) || number.as_f64() == Some(*int as f64)
            }
            (Coerced::Number(float), Value::Number(number)) => number.as_f64() == Some(*float),
            (Coerced::Single(float), Value::Number(number)) => {
                number.as_f64().map(|member| member as f32) == Some(*float)
            }
            (Coerced::Boolean(flag), Value::Bool(member)) => flag == member,
            (Coerced::String(text), Value::String(member)) => text == member,
            _ => false,
        }
    }
}

/// Validates header/query/path/cookie values (always strings)
#[derive(Debug, Clone, Copy)]
pub struct ParameterValidator<'a> {
    resolver: SchemaResolver<'a>,
}

impl<'a> ParameterValidator<'a> {
    pub fn new(resolver: SchemaResolver<'a>) -> Self {
        Self { resolver }
    }

    /// Validate every given parameter against the values extracted for its location
    pub fn validate<'p>(
        &self,
        parameters: impl IntoIterator<Item = &'p ParameterSpec>,
        values: &Multimap,
        out: &mut Vec<Diagnostic>,
    ) {
        for parameter in parameters {
            let found = lookup(values, parameter.location, &parameter.name);
            self.validate_parameter(parameter, found, out);
        }
    }

    pub fn validate_parameter(
        &self,
        parameter: &ParameterSpec,
        values: Option<&[String]>,
        out: &mut Vec<Diagnostic>,
    ) {
        let values = values.unwrap_or_default();
        let name = &parameter.name;
        let location = parameter.location;

        if parameter.required && values.is_empty() {
            out.push(Diagnostic::error(format!("{name}: {location} is required")));
        }
        if parameter.deprecated {
            out.push(Diagnostic::warn(format!("{name}: {location} is deprecated")));
        }

        if let Some(schema) = &parameter.schema {
            if !values.is_empty() {
                self.validate_values(name, location, schema, values, out);
            }
        }
    }

    fn validate_values(
        &self,
        name: &str,
        location: Location,
        schema: &Schema,
        values: &[String],
        out: &mut Vec<Diagnostic>,
    ) {
        let schema = match self.resolver.resolve(schema) {
            Ok(schema) => schema,
            Err(err) => {
                out.push(Diagnostic::error(format!("{name}: {err}")));
                return;
            }
        };

        match schema {
            Schema::Array(array) => {
                let count = values.len() as u64;
                if let Some(min) = array.min_items.filter(|min| count < *min) {
                    out.push(Diagnostic::error(format!("{name} less than min-items: {min}")));
                }
                if let Some(max) = array.max_items.filter(|max| count > *max) {
                    out.push(Diagnostic::error(format!("{name} more than max-items: {max}")));
                }

                let Some(items) = &array.items else {
                    return;
                };
                match self.resolver.resolve(items) {
                    Ok(Schema::Scalar(scalar)) => {
                        for value in values {
                            validate_scalar(name, scalar, value, out);
                        }
                    }
                    Ok(_) => out.push(Diagnostic::ignored(format!(
                        "{name}: {location} items are not scalar and were not checked"
                    ))),
                    Err(err) => out.push(Diagnostic::error(format!("{name}: {err}"))),
                }
            }
            // Only the first occurrence is checked for scalar parameters
            Schema::Scalar(scalar) => validate_scalar(name, scalar, &values[0], out),
            Schema::Object(_) | Schema::Composed(_) | Schema::Reference(_) | Schema::Untyped => {
                out.push(Diagnostic::ignored(format!(
                    "{name}: {location} schema is not scalar and was not checked"
                )));
            }
        }
    }
}

/// Coerce a single value, then apply length and enum constraints
pub fn validate_scalar(name: &str, schema: &ScalarSchema, value: &str, out: &mut Vec<Diagnostic>) {
    let coerced = Coerced::parse(schema, value);
    if coerced.is_none() {
        out.push(Diagnostic::error(format!(
            "{name} | Expected Type: {}",
            schema.kind
        )));
    }

    if schema.kind == ScalarKind::String {
        check_length(name, schema, value, out);
    }

    if let Some(coerced) = coerced {
        if !schema.enum_values.is_empty()
            && !schema.enum_values.iter().any(|member| coerced.matches(member))
        {
            out.push(Diagnostic::error(format!(
                "{name} - Allowed Value : {}",
                schema.allowed_values()
            )));
        }
    }
}

/// `minLength`/`maxLength`, counted in characters
pub fn check_length(name: &str, schema: &ScalarSchema, value: &str, out: &mut Vec<Diagnostic>) {
    let length = value.chars().count() as u64;
    if let Some(min) = schema.min_length.filter(|min| length < *min) {
        out.push(Diagnostic::error(format!("{name} less than min-length: {min}")));
    }
    if let Some(max) = schema.max_length.filter(|max| length > *max) {
        out.push(Diagnostic::error(format!("{name} more than max-length: {max}")));
    }
}

/// Header names compare case-insensitively; other locations are exact
fn lookup<'m>(values: &'m Multimap, location: Location, name: &str) -> Option<&'m [String]> {
    let found = match location {
        Location::Header => values.get(&name.to_ascii_lowercase()),
        Location::Query | Location::Path | Location::Cookie => values.get(name),
    };
    found.map(Vec::as_slice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_width_follows_format() {
        let int32 = ScalarSchema::new(ScalarKind::Integer);
        let int64 = ScalarSchema::new(ScalarKind::Integer).with_format("int64");

        assert_eq!(Coerced::parse(&int32, "42"), Some(Coerced::Integer(42)));
        assert_eq!(Coerced::parse(&int32, "3000000000"), None);
        assert_eq!(
            Coerced::parse(&int64, "3000000000"),
            Some(Coerced::Integer(3_000_000_000))
        );
        assert_eq!(Coerced::parse(&int64, "4.5"), None);
    }

    #[test]
    fn test_boolean_and_number_coercion() {
        let boolean = ScalarSchema::new(ScalarKind::Boolean);
        assert_eq!(Coerced::parse(&boolean, "true"), Some(Coerced::Boolean(true)));
        assert_eq!(Coerced::parse(&boolean, "yes"), None);

        let number = ScalarSchema::new(ScalarKind::Number);
        assert_eq!(Coerced::parse(&number, "2.5"), Some(Coerced::Number(2.5)));
        assert_eq!(Coerced::parse(&number, "two"), None);

        let double = ScalarSchema::new(ScalarKind::Number).with_format("double");
        assert_eq!(Coerced::parse(&double, "0.5"), Some(Coerced::Single(0.5)));
    }

    #[test]
    fn test_double_enum_compares_at_single_precision() {
        let schema = ScalarSchema::new(ScalarKind::Number)
            .with_format("double")
            .with_enum([0.1, 0.25]);
        let mut out = Vec::new();

        validate_scalar("ratio", &schema, "0.1", &mut out);
        validate_scalar("ratio", &schema, "0.25", &mut out);
        assert!(out.is_empty());

        validate_scalar("ratio", &schema, "0.3", &mut out);
        assert_eq!(out, vec![Diagnostic::error("ratio - Allowed Value : [0.1, 0.25]")]);
    }

    #[test]
    fn test_coercion_failure_skips_enum_check() {
        let schema = ScalarSchema::new(ScalarKind::Integer).with_enum([1, 2]);
        let mut out = Vec::new();
        validate_scalar("limit", &schema, "ten", &mut out);

        assert_eq!(out, vec![Diagnostic::error("limit | Expected Type: integer")]);
    }

    #[test]
    fn test_enum_membership_on_coerced_value() {
        let schema = ScalarSchema::new(ScalarKind::Integer).with_enum([1, 2]);
        let mut out = Vec::new();
        validate_scalar("limit", &schema, "2", &mut out);
        assert!(out.is_empty());

        validate_scalar("limit", &schema, "3", &mut out);
        assert_eq!(out, vec![Diagnostic::error("limit - Allowed Value : [1, 2]")]);
    }

    #[test]
    fn test_string_length_bounds() {
        let mut schema = ScalarSchema::new(ScalarKind::String);
        schema.min_length = Some(2);
        schema.max_length = Some(3);
        let mut out = Vec::new();

        validate_scalar("code", &schema, "é", &mut out);
        validate_scalar("code", &schema, "abcd", &mut out);
        validate_scalar("code", &schema, "abc", &mut out);

        assert_eq!(
            out,
            vec![
                Diagnostic::error("code less than min-length: 2"),
                Diagnostic::error("code more than max-length: 3"),
            ]
        );
    }
}
