//! Declarative description of the expected shape of a response body.
//!
//! A [`Schema`] is a closed tree of variants interpreted by a
//! [`SchemaValidator`](crate::SchemaValidator).
//!
//! ```rust
//! use cloudfetch_core::Schema;
//!
//! let bundle = Schema::object()
//!     .required("bundleId", Schema::string().min_length(1))
//!     .required("size", Schema::number().minimum(0.0))
//!     .required("type", Schema::enumeration(["APP", "MODEM", "BOOT"]))
//!     .required("filenames", Schema::array(Schema::string()))
//!     .optional("name", Schema::string());
//! ```

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

mod validator;

pub use self::validator::{SchemaValidator, TreeValidator};

/// The expected shape of a value.
#[derive(Debug, Clone)]
pub enum Schema {
    /// Accepts anything, including an empty body.
    Any,
    /// Accepts only an empty body.
    Empty,
    /// Accepts `null`.
    Null,
    /// Accepts a boolean.
    Boolean,
    /// Accepts a string.
    String(StringSchema),
    /// Accepts a number, or an integer.
    Number(NumberSchema),
    /// Accepts one of the listed strings.
    Enum(Vec<String>),
    /// Accepts exactly this value.
    Literal(Value),
    /// Accepts an array.
    Array(ArraySchema),
    /// Accepts an object with known fields.
    Object(ObjectSchema),
    /// Accepts an object with arbitrary keys.
    Record(RecordSchema),
    /// Accepts a value matching any of the schemas.
    Union(Vec<Schema>),
    /// Accepts `null` or a value matching the inner schema.
    Nullable(Box<Schema>),
}

impl Schema {
    /// A string schema without constraint.
    pub fn string() -> StringSchema {
        StringSchema::default()
    }

    /// A number schema without constraint.
    pub fn number() -> NumberSchema {
        NumberSchema::default()
    }

    /// A number schema that only accepts integral values.
    pub fn integer() -> NumberSchema {
        NumberSchema {
            integer: true,
            ..NumberSchema::default()
        }
    }

    /// An enumeration of strings.
    pub fn enumeration<S>(values: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<String>,
    {
        Self::Enum(values.into_iter().map(Into::into).collect())
    }

    /// Exactly this value.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// An array of `items`.
    pub fn array(items: impl Into<Self>) -> ArraySchema {
        ArraySchema {
            items: Box::new(items.into()),
            min_items: None,
            max_items: None,
        }
    }

    /// An object without declared field, accepting additional properties.
    pub fn object() -> ObjectSchema {
        ObjectSchema::default()
    }

    /// An object whose keys match `keys` and values match `values`.
    pub fn record(keys: impl Into<Self>, values: impl Into<Self>) -> Self {
        Self::Record(RecordSchema {
            keys: Box::new(keys.into()),
            values: Box::new(values.into()),
        })
    }

    /// A value matching any of the schemas.
    pub fn union(variants: impl IntoIterator<Item = Self>) -> Self {
        Self::Union(variants.into_iter().collect())
    }

    /// `null` or a value matching `inner`.
    pub fn nullable(inner: impl Into<Self>) -> Self {
        Self::Nullable(Box::new(inner.into()))
    }

    /// Whether an empty body satisfies this schema.
    pub fn accepts_empty(&self) -> bool {
        match self {
            Self::Any | Self::Empty => true,
            Self::Union(variants) => variants.iter().any(Self::accepts_empty),
            _ => false,
        }
    }

    /// A short human description, used in violation messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Any => "any value".to_string(),
            Self::Empty => "no content".to_string(),
            Self::Null => "null".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::String(_) => "string".to_string(),
            Self::Number(number) if number.integer => "integer".to_string(),
            Self::Number(_) => "number".to_string(),
            Self::Enum(values) => format!("one of {}", values.join(", ")),
            Self::Literal(value) => value.to_string(),
            Self::Array(_) => "array".to_string(),
            Self::Object(_) | Self::Record(_) => "object".to_string(),
            Self::Union(variants) => variants
                .iter()
                .map(Self::describe)
                .collect::<Vec<_>>()
                .join(" | "),
            Self::Nullable(inner) => format!("{} | null", inner.describe()),
        }
    }
}

/// String constraints.
#[derive(Debug, Clone, Default)]
pub struct StringSchema {
    /// Minimum length, in characters.
    pub min_length: Option<usize>,
    /// Maximum length, in characters.
    pub max_length: Option<usize>,
    /// A regex the value must match.
    pub pattern: Option<Regex>,
}

impl StringSchema {
    /// Sets the minimum length.
    #[must_use]
    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    /// Sets the maximum length.
    #[must_use]
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Sets the pattern.
    #[must_use]
    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }
}

/// Number constraints. Bounds are inclusive unless marked exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NumberSchema {
    /// Only accept integral values.
    pub integer: bool,
    /// Lower bound.
    pub minimum: Option<f64>,
    /// Whether the lower bound is excluded.
    pub exclusive_minimum: bool,
    /// Upper bound.
    pub maximum: Option<f64>,
    /// Whether the upper bound is excluded.
    pub exclusive_maximum: bool,
}

impl NumberSchema {
    /// Sets an inclusive lower bound.
    #[must_use]
    pub fn minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self.exclusive_minimum = false;
        self
    }

    /// Sets an exclusive lower bound.
    #[must_use]
    pub fn greater_than(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self.exclusive_minimum = true;
        self
    }

    /// Sets an inclusive upper bound.
    #[must_use]
    pub fn maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self.exclusive_maximum = false;
        self
    }

    /// Sets an exclusive upper bound.
    #[must_use]
    pub fn less_than(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self.exclusive_maximum = true;
        self
    }
}

/// Array constraints.
#[derive(Debug, Clone)]
pub struct ArraySchema {
    /// Schema of every item.
    pub items: Box<Schema>,
    /// Minimum number of items.
    pub min_items: Option<usize>,
    /// Maximum number of items.
    pub max_items: Option<usize>,
}

impl ArraySchema {
    /// Sets the minimum number of items.
    #[must_use]
    pub fn min_items(mut self, min_items: usize) -> Self {
        self.min_items = Some(min_items);
        self
    }

    /// Sets the maximum number of items.
    #[must_use]
    pub fn max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }
}

/// A declared object field.
#[derive(Debug, Clone)]
pub struct Field {
    /// The field schema.
    pub schema: Schema,
    /// Whether the field must be present.
    pub required: bool,
}

/// Object constraints.
///
/// Fields are checked in declaration order. Undeclared properties are accepted
/// unless [`ObjectSchema::deny_additional`] is called.
#[derive(Debug, Clone)]
pub struct ObjectSchema {
    /// The declared fields.
    pub fields: IndexMap<String, Field>,
    /// Whether undeclared properties are accepted.
    pub additional_properties: bool,
}

impl Default for ObjectSchema {
    fn default() -> Self {
        Self {
            fields: IndexMap::new(),
            additional_properties: true,
        }
    }
}

impl ObjectSchema {
    /// Declares a field that must be present.
    #[must_use]
    pub fn required(mut self, name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        let field = Field {
            schema: schema.into(),
            required: true,
        };
        self.fields.insert(name.into(), field);
        self
    }

    /// Declares a field that may be absent. When present it must match `schema`.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        let field = Field {
            schema: schema.into(),
            required: false,
        };
        self.fields.insert(name.into(), field);
        self
    }

    /// Rejects undeclared properties.
    #[must_use]
    pub fn deny_additional(mut self) -> Self {
        self.additional_properties = false;
        self
    }
}

/// Record constraints.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    /// Schema every key must match, as a string.
    pub keys: Box<Schema>,
    /// Schema every value must match.
    pub values: Box<Schema>,
}

impl From<StringSchema> for Schema {
    fn from(value: StringSchema) -> Self {
        Self::String(value)
    }
}

impl From<NumberSchema> for Schema {
    fn from(value: NumberSchema) -> Self {
        Self::Number(value)
    }
}

impl From<ArraySchema> for Schema {
    fn from(value: ArraySchema) -> Self {
        Self::Array(value)
    }
}

impl From<ObjectSchema> for Schema {
    fn from(value: ObjectSchema) -> Self {
        Self::Object(value)
    }
}

impl From<RecordSchema> for Schema {
    fn from(value: RecordSchema) -> Self {
        Self::Record(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_only_accept_empty_when_declared() {
        assert!(Schema::Any.accepts_empty());
        assert!(Schema::Empty.accepts_empty());
        assert!(Schema::union([Schema::Null, Schema::Empty]).accepts_empty());

        assert!(!Schema::Null.accepts_empty());
        assert!(!Schema::from(Schema::object()).accepts_empty());
        assert!(!Schema::nullable(Schema::object()).accepts_empty());
    }

    #[test]
    fn should_keep_field_declaration_order() {
        let schema = Schema::object()
            .required("size", Schema::integer())
            .optional("name", Schema::string())
            .required("bundleId", Schema::string());

        let names = schema.fields.keys().map(String::as_str).collect::<Vec<_>>();

        assert_eq!(names, ["size", "name", "bundleId"]);
    }

    #[test]
    fn should_describe_schemas() {
        let schema = Schema::nullable(Schema::union([
            Schema::integer().into(),
            Schema::enumeration(["A", "B"]),
        ]));

        insta::assert_snapshot!(schema.describe(), @"integer | one of A, B | null");
    }
}
