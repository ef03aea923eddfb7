use crate::diagnostics::{error_count, Diagnostic};
use crate::document::{
    ArraySchema, ComposedSchema, Composition, ObjectSchema, ScalarKind, ScalarSchema, Schema,
};
use crate::error::ResolveError;
use crate::resolver::SchemaResolver;
use crate::validate::parameter::check_length;
use serde_json::Value;

/// Recursive validator for JSON bodies.
///
/// `validate` is pure: it returns the diagnostics for one subtree, so
/// composition can evaluate branches independently and decide what to keep.
///
/// References entered since the last descent into a property or element
/// form a trail. Meeting a name already on the trail means the schema
/// loops without consuming any of the value, and is reported as a cycle.
#[derive(Debug, Clone, Copy)]
pub struct BodyValidator<'a> {
    resolver: SchemaResolver<'a>,
}

impl<'a> BodyValidator<'a> {
    pub fn new(resolver: SchemaResolver<'a>) -> Self {
        Self { resolver }
    }

    /// Validate `value` against `schema`. An absent value (`None`) is not
    /// checked; presence is enforced by the parent object's `required` list.
    pub fn validate(&self, path: &str, schema: &Schema, value: Option<&Value>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        if let Some(value) = value {
            self.check(path, schema, value, &[], &mut out);
        }
        out
    }

    fn check<'s>(
        &self,
        path: &str,
        schema: &'s Schema,
        value: &Value,
        trail: &[&'s str],
        out: &mut Vec<Diagnostic>,
    ) where
        'a: 's,
    {
        let mut trail = trail.to_vec();
        if let Schema::Reference(name) = schema {
            if trail.contains(&name.as_str()) {
                out.push(Diagnostic::error(format!(
                    "{path}: {}",
                    ResolveError::CyclicReference(name.clone())
                )));
                return;
            }
            trail.push(name.as_str());
        }

        let schema = match self.resolver.resolve(schema) {
            Ok(schema) => schema,
            Err(err) => {
                out.push(Diagnostic::error(format!("{path}: {err}")));
                return;
            }
        };

        if value.is_null() && schema.is_nullable() {
            return;
        }

        match schema {
            Schema::Composed(composed) => self.check_composed(path, composed, value, &trail, out),
            Schema::Array(array) => self.check_array(path, array, value, out),
            Schema::Object(object) => self.check_object(path, object, value, out),
            Schema::Scalar(scalar) => check_scalar(path, scalar, value, out),
            Schema::Reference(_) | Schema::Untyped => {
                out.push(Diagnostic::error(format!(
                    "{path}: {}",
                    ResolveError::InvalidSchema
                )));
            }
        }
    }

    fn check_composed<'s>(
        &self,
        path: &str,
        composed: &'s ComposedSchema,
        value: &Value,
        trail: &[&'s str],
        out: &mut Vec<Diagnostic>,
    ) where
        'a: 's,
    {
        match composed.kind {
            Composition::AllOf => {
                for branch in &composed.branches {
                    self.check(path, branch, value, trail, out);
                }
            }
            Composition::AnyOf => {
                let outcomes = self.branch_outcomes(path, composed, value, trail);
                if outcomes.iter().any(|diagnostics| error_count(diagnostics) == 0) {
                    return;
                }
                out.extend(outcomes.into_iter().flatten());
            }
            Composition::OneOf => {
                let outcomes = self.branch_outcomes(path, composed, value, trail);
                let matched = outcomes
                    .iter()
                    .filter(|diagnostics| error_count(diagnostics) == 0)
                    .count();
                if matched != 1 {
                    out.push(Diagnostic::error(format!(
                        "{path} matched {matched} of {} oneOf alternatives",
                        outcomes.len()
                    )));
                }
            }
        }
    }

    /// Evaluate every branch in isolation
    fn branch_outcomes<'s>(
        &self,
        path: &str,
        composed: &'s ComposedSchema,
        value: &Value,
        trail: &[&'s str],
    ) -> Vec<Vec<Diagnostic>>
    where
        'a: 's,
    {
        composed
            .branches
            .iter()
            .map(|branch| {
                let mut out = Vec::new();
                self.check(path, branch, value, trail, &mut out);
                out
            })
            .collect()
    }

    fn check_array(&self, path: &str, array: &ArraySchema, value: &Value, out: &mut Vec<Diagnostic>) {
        let Value::Array(elements) = value else {
            out.push(type_mismatch(path, "array", value));
            return;
        };

        let count = elements.len() as u64;
        if let Some(min) = array.min_items.filter(|min| count < *min) {
            out.push(Diagnostic::error(format!("{path} less than min-items: {min}")));
        }
        if let Some(max) = array.max_items.filter(|max| count > *max) {
            out.push(Diagnostic::error(format!("{path} more than max-items: {max}")));
        }

        if let Some(items) = &array.items {
            for (index, element) in elements.iter().enumerate() {
                self.check(&format!("{path}[{index}]"), items, element, &[], out);
            }
        }
    }

    fn check_object(&self, path: &str, object: &ObjectSchema, value: &Value, out: &mut Vec<Diagnostic>) {
        let Value::Object(fields) = value else {
            out.push(type_mismatch(path, "object", value));
            return;
        };

        for name in &object.required {
            if !fields.contains_key(name) {
                out.push(Diagnostic::error(format!("{path}.{name} is required")));
            }
        }

        for (name, property) in &object.properties {
            if let Some(field) = fields.get(name) {
                self.check(&format!("{path}.{name}"), property, field, &[], out);
            }
        }
    }
}

fn check_scalar(path: &str, scalar: &ScalarSchema, value: &Value, out: &mut Vec<Diagnostic>) {
    let valid = match scalar.kind {
        ScalarKind::Integer => is_integer(value, scalar.is_int64()),
        ScalarKind::Number => value.is_number(),
        ScalarKind::Boolean => value.is_boolean(),
        ScalarKind::String => value.is_string(),
    };
    if !valid {
        let expected = match scalar.kind {
            ScalarKind::Integer if scalar.is_int64() => "integer (int64)".to_string(),
            kind => kind.to_string(),
        };
        out.push(type_mismatch(path, &expected, value));
        return;
    }

    if let Value::String(text) = value {
        check_length(path, scalar, text, out);
    }

    if !scalar.enum_values.is_empty() && !scalar.enum_values.contains(value) {
        out.push(Diagnostic::error(format!(
            "{path} - Allowed Value : {}",
            scalar.allowed_values()
        )));
    }
}

/// Numeric with no fractional part, within 64 or 32 bits
fn is_integer(value: &Value, int64: bool) -> bool {
    let Value::Number(number) = value else {
        return false;
    };

    let whole = number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|float| float.fract() == 0.0 && *float >= i64::MIN as f64 && *float < i64::MAX as f64)
            .map(|float| float as i64)
    });

    match whole {
        Some(int) => int64 || i32::try_from(int).is_ok(),
        None => false,
    }
}

fn type_mismatch(path: &str, expected: &str, value: &Value) -> Diagnostic {
    Diagnostic::error(format!(
        "{path} expected [{expected}] but found : {}",
        type_name(value)
    ))
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_representation() {
        assert!(is_integer(&json!(7), false));
        assert!(is_integer(&json!(7.0), false));
        assert!(!is_integer(&json!(7.5), false));
        assert!(!is_integer(&json!(3_000_000_000_i64), false));
        assert!(is_integer(&json!(3_000_000_000_i64), true));
        assert!(!is_integer(&json!("7"), true));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(type_name(&json!(null)), "null");
        assert_eq!(type_name(&json!([1])), "array");
        assert_eq!(type_name(&json!({"a": 1})), "object");
    }
}
