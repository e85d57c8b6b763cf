use serde_json::{Map, Number, Value};

use super::{ArraySchema, NumberSchema, ObjectSchema, RecordSchema, Schema, StringSchema};
use crate::client::{Output, Violation};

/// Checks a response body against a [`Schema`].
///
/// Implementations report every violation they find, not only the first one.
/// On success they return the JSON value to decode, `Value::Null` standing for an empty body.
pub trait SchemaValidator: Send + Sync {
    /// Validates `output` against `schema`.
    ///
    /// # Errors
    ///
    /// Returns the violations, never an empty list.
    fn validate(&self, schema: &Schema, output: &Output) -> Result<Value, Vec<Violation>>;
}

/// The default [`SchemaValidator`]: walks the schema tree and the value side by side.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeValidator;

impl SchemaValidator for TreeValidator {
    fn validate(&self, schema: &Schema, output: &Output) -> Result<Value, Vec<Violation>> {
        let value = match output {
            Output::Empty if schema.accepts_empty() => return Ok(Value::Null),
            Output::Empty => {
                return Err(vec![Violation::new(
                    "",
                    format!("Expected {}, got no content", schema.describe()),
                )]);
            }
            Output::Json(value) => value,
        };

        let mut walker = Walker::default();
        walker.check(schema, value);
        if walker.violations.is_empty() {
            Ok(value.clone())
        } else {
            Err(walker.violations)
        }
    }
}

/// Escapes one JSON pointer reference token.
fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
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

fn is_integral(number: &Number) -> bool {
    number.is_i64() || number.is_u64() || number.as_f64().is_some_and(|it| it.fract() == 0.0)
}

#[derive(Debug, Default)]
struct Walker {
    path: Vec<String>,
    violations: Vec<Violation>,
}

impl Walker {
    fn pointer(&self) -> String {
        self.path
            .iter()
            .map(|token| format!("/{}", escape_token(token)))
            .collect()
    }

    fn report(&mut self, message: impl Into<String>) {
        let path = self.pointer();
        self.violations.push(Violation::new(path, message));
    }

    fn nested(&mut self, token: impl Into<String>, schema: &Schema, value: &Value) {
        self.path.push(token.into());
        self.check(schema, value);
        self.path.pop();
    }

    fn check(&mut self, schema: &Schema, value: &Value) {
        match (schema, value) {
            (Schema::Any, _)
            | (Schema::Null, Value::Null)
            | (Schema::Boolean, Value::Bool(_))
            | (Schema::Nullable(_), Value::Null) => {}
            (Schema::Empty, _) => {
                self.report(format!("Expected no content, got {}", type_name(value)));
            }
            (Schema::String(string), Value::String(text)) => self.check_string(string, text),
            (Schema::Number(number), Value::Number(actual)) => self.check_number(number, actual),
            (Schema::Enum(values), Value::String(text)) => {
                if !values.iter().any(|it| it == text) {
                    self.report(format!(
                        "Expected one of {}, got '{text}'",
                        values.join(", ")
                    ));
                }
            }
            (Schema::Literal(expected), _) => {
                if expected != value {
                    self.report(format!("Expected {expected}, got {value}"));
                }
            }
            (Schema::Array(array), Value::Array(items)) => self.check_array(array, items),
            (Schema::Object(object), Value::Object(map)) => self.check_object(object, map),
            (Schema::Record(record), Value::Object(map)) => self.check_record(record, map),
            (Schema::Union(variants), _) => self.check_union(schema, variants, value),
            (Schema::Nullable(inner), _) => self.check(inner, value),
            _ => {
                self.report(format!(
                    "Expected {}, got {}",
                    schema.describe(),
                    type_name(value)
                ));
            }
        }
    }

    fn check_string(&mut self, schema: &StringSchema, text: &str) {
        let length = text.chars().count();
        if let Some(min_length) = schema.min_length
            && length < min_length
        {
            self.report(format!(
                "Expected string length greater or equal to {min_length}"
            ));
        }
        if let Some(max_length) = schema.max_length
            && length > max_length
        {
            self.report(format!("Expected string length less or equal to {max_length}"));
        }
        if let Some(pattern) = &schema.pattern
            && !pattern.is_match(text)
        {
            self.report(format!("Expected string to match '{}'", pattern.as_str()));
        }
    }

    fn check_number(&mut self, schema: &NumberSchema, number: &Number) {
        if schema.integer && !is_integral(number) {
            self.report(format!("Expected integer, got {number}"));
            return;
        }
        let Some(actual) = number.as_f64() else {
            return;
        };
        if let Some(minimum) = schema.minimum {
            if schema.exclusive_minimum && actual <= minimum {
                self.report(format!("Expected number to be greater than {minimum}"));
            } else if actual < minimum {
                self.report(format!(
                    "Expected number to be greater or equal to {minimum}"
                ));
            }
        }
        if let Some(maximum) = schema.maximum {
            if schema.exclusive_maximum && actual >= maximum {
                self.report(format!("Expected number to be less than {maximum}"));
            } else if actual > maximum {
                self.report(format!("Expected number to be less or equal to {maximum}"));
            }
        }
    }

    fn check_array(&mut self, schema: &ArraySchema, items: &[Value]) {
        if let Some(min_items) = schema.min_items
            && items.len() < min_items
        {
            self.report(format!("Expected array length greater or equal to {min_items}"));
        }
        if let Some(max_items) = schema.max_items
            && items.len() > max_items
        {
            self.report(format!("Expected array length less or equal to {max_items}"));
        }
        for (index, item) in items.iter().enumerate() {
            self.nested(index.to_string(), &schema.items, item);
        }
    }

    fn check_object(&mut self, schema: &ObjectSchema, map: &Map<String, Value>) {
        for (name, field) in &schema.fields {
            match map.get(name) {
                Some(value) => self.nested(name.clone(), &field.schema, value),
                None if field.required => {
                    self.report(format!("Expected required property '{name}'"));
                }
                None => {}
            }
        }
        if !schema.additional_properties {
            for name in map.keys().filter(|it| !schema.fields.contains_key(*it)) {
                self.report(format!("Unexpected property '{name}'"));
            }
        }
    }

    fn check_record(&mut self, schema: &RecordSchema, map: &Map<String, Value>) {
        for (key, value) in map {
            self.path.push(key.clone());
            let mut keys = Self::default();
            keys.check(&schema.keys, &Value::String(key.clone()));
            if !keys.violations.is_empty() {
                self.report(format!("Unexpected key '{key}'"));
            }
            self.check(&schema.values, value);
            self.path.pop();
        }
    }

    fn check_union(&mut self, schema: &Schema, variants: &[Schema], value: &Value) {
        let matched = variants.iter().any(|variant| {
            let mut attempt = Self::default();
            attempt.check(variant, value);
            attempt.violations.is_empty()
        });
        if !matched {
            self.report(format!(
                "Expected {}, got {}",
                schema.describe(),
                type_name(value)
            ));
        }
    }
}
