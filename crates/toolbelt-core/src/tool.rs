//! Tool schemas and the declarative schema builder.
//!
//! A [`ToolSchema`] is a tool's externally visible contract: its name, a
//! natural-language description, and a JSON-Schema-style input schema
//! whose root is always an object. Schemas are assembled with
//! [`ToolSchema::builder`] from typed property introducers and small
//! orthogonal decorators on [`Property`].

use crate::types::ToolName;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-Schema-like input schema with an object root.
///
/// Round-trips through JSON; property order is not significant and the
/// required set is carried separately from the property bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    /// Root type tag, always `"object"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Property name to property descriptor.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    /// Names of required properties. Always a subset of the property
    /// name set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl Default for InputSchema {
    fn default() -> Self {
        Self {
            kind: "object".to_string(),
            properties: Map::new(),
            required: Vec::new(),
        }
    }
}

/// A tool's externally visible contract.
///
/// # Examples
///
/// ```
/// use toolbelt_core::{Property, ToolSchema};
///
/// let tool = ToolSchema::builder("time_convert", "Convert a time string")
///     .string("time", Property::new().description("input time").required())
///     .string("target_format", Property::new().required())
///     .build();
///
/// assert_eq!(tool.input_schema.required, vec!["time", "target_format"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name, unique across the loaded set.
    pub name: ToolName,
    /// Natural-language description.
    pub description: String,
    /// Structured input schema.
    #[serde(default)]
    pub input_schema: InputSchema,
    /// Raw schema blob passed through verbatim instead of
    /// [`input_schema`](Self::input_schema) when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_schema: Option<Value>,
}

impl ToolSchema {
    /// Starts a builder for a tool schema.
    #[must_use]
    pub fn builder(name: impl Into<ToolName>, description: impl Into<String>) -> ToolBuilder {
        ToolBuilder {
            name: name.into(),
            description: description.into(),
            schema: InputSchema::default(),
            raw_schema: None,
        }
    }

    /// Returns the schema consumers should validate against: the raw
    /// blob when one was supplied, otherwise the structured schema.
    #[must_use]
    pub fn effective_schema(&self) -> Value {
        match &self.raw_schema {
            Some(raw) => raw.clone(),
            None => serde_json::to_value(&self.input_schema)
                .expect("object schema serializes to JSON"),
        }
    }
}

/// Builder for [`ToolSchema`].
///
/// Each typed introducer adds one property of the given kind, applying
/// the decorators accumulated on the supplied [`Property`].
#[derive(Debug, Clone)]
pub struct ToolBuilder {
    name: ToolName,
    description: String,
    schema: InputSchema,
    raw_schema: Option<Value>,
}

impl ToolBuilder {
    /// Adds a string property.
    #[must_use]
    pub fn string(self, name: impl Into<String>, property: Property) -> Self {
        self.typed_property("string", name, property)
    }

    /// Adds a number property.
    #[must_use]
    pub fn number(self, name: impl Into<String>, property: Property) -> Self {
        self.typed_property("number", name, property)
    }

    /// Adds an integer property.
    #[must_use]
    pub fn integer(self, name: impl Into<String>, property: Property) -> Self {
        self.typed_property("integer", name, property)
    }

    /// Adds a boolean property.
    #[must_use]
    pub fn boolean(self, name: impl Into<String>, property: Property) -> Self {
        self.typed_property("boolean", name, property)
    }

    /// Adds a nested object property.
    #[must_use]
    pub fn object(self, name: impl Into<String>, property: Property) -> Self {
        self.typed_property("object", name, property)
    }

    /// Adds an array property.
    #[must_use]
    pub fn array(self, name: impl Into<String>, property: Property) -> Self {
        self.typed_property("array", name, property)
    }

    /// Replaces the structured schema with a raw blob passed through
    /// verbatim.
    #[must_use]
    pub fn raw_schema(mut self, schema: Value) -> Self {
        self.raw_schema = Some(schema);
        self
    }

    /// Finishes the schema.
    #[must_use]
    pub fn build(self) -> ToolSchema {
        ToolSchema {
            name: self.name,
            description: self.description,
            input_schema: self.schema,
            raw_schema: self.raw_schema,
        }
    }

    fn typed_property(mut self, kind: &str, name: impl Into<String>, property: Property) -> Self {
        let name = name.into();
        let (mut body, required) = property.into_parts();
        body.insert("type".to_string(), Value::String(kind.to_string()));
        if kind == "object" && !body.contains_key("properties") {
            body.insert("properties".to_string(), Value::Object(Map::new()));
        }
        // The required flag lives in the schema's required set, never in
        // the property body.
        if required {
            self.schema.required.push(name.clone());
        }
        self.schema.properties.insert(name, Value::Object(body));
        self
    }
}

/// Decorator accumulator for a single property.
///
/// Decorators are orthogonal; applying one that does not match the
/// property's eventual type simply lands in the schema body and is
/// ignored by validators, mirroring JSON Schema's open vocabulary.
///
/// # Examples
///
/// ```
/// use toolbelt_core::{Property, ToolSchema};
///
/// let tool = ToolSchema::builder("resize", "Resize an image")
///     .integer(
///         "width",
///         Property::new().description("target width").minimum(1.0).required(),
///     )
///     .build();
///
/// let body = &tool.input_schema.properties["width"];
/// assert_eq!(body["minimum"], 1.0);
/// assert!(body.get("required").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Property {
    body: Map<String, Value>,
    required: bool,
}

impl Property {
    /// Creates an empty property descriptor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn set(mut self, key: &str, value: Value) -> Self {
        self.body.insert(key.to_string(), value);
        self
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn description(self, description: impl Into<String>) -> Self {
        self.set("description", Value::String(description.into()))
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(self, value: impl Into<Value>) -> Self {
        self.set("default", value.into())
    }

    /// Restricts the property to an enumeration of allowed values.
    #[must_use]
    pub fn enum_values<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.set("enum", Value::Array(values))
    }

    /// Marks the property as required. The flag is lifted into the
    /// schema's required set by the introducer and removed from the
    /// property body.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Minimum string length.
    #[must_use]
    pub fn min_length(self, min: u64) -> Self {
        self.set("minLength", min.into())
    }

    /// Maximum string length.
    #[must_use]
    pub fn max_length(self, max: u64) -> Self {
        self.set("maxLength", max.into())
    }

    /// Regex pattern the string must match.
    #[must_use]
    pub fn pattern(self, pattern: impl Into<String>) -> Self {
        self.set("pattern", Value::String(pattern.into()))
    }

    /// Format label such as `email` or `uri`.
    #[must_use]
    pub fn format(self, format: impl Into<String>) -> Self {
        self.set("format", Value::String(format.into()))
    }

    /// Inclusive numeric minimum.
    #[must_use]
    pub fn minimum(self, min: f64) -> Self {
        self.set("minimum", min.into())
    }

    /// Inclusive numeric maximum.
    #[must_use]
    pub fn maximum(self, max: f64) -> Self {
        self.set("maximum", max.into())
    }

    /// Exclusive numeric minimum.
    #[must_use]
    pub fn exclusive_minimum(self, min: f64) -> Self {
        self.set("exclusiveMinimum", min.into())
    }

    /// Exclusive numeric maximum.
    #[must_use]
    pub fn exclusive_maximum(self, max: f64) -> Self {
        self.set("exclusiveMaximum", max.into())
    }

    /// Requires the number to be a multiple of the given value.
    #[must_use]
    pub fn multiple_of(self, value: f64) -> Self {
        self.set("multipleOf", value.into())
    }

    /// Nested properties for an object property.
    #[must_use]
    pub fn properties(self, properties: Map<String, Value>) -> Self {
        self.set("properties", Value::Object(properties))
    }

    /// Additional-properties policy: a boolean or a schema.
    #[must_use]
    pub fn additional_properties(self, policy: impl Into<Value>) -> Self {
        self.set("additionalProperties", policy.into())
    }

    /// Minimum number of object properties.
    #[must_use]
    pub fn min_properties(self, min: u64) -> Self {
        self.set("minProperties", min.into())
    }

    /// Maximum number of object properties.
    #[must_use]
    pub fn max_properties(self, max: u64) -> Self {
        self.set("maxProperties", max.into())
    }

    /// Schema constraining property names of an object.
    #[must_use]
    pub fn property_names(self, schema: Value) -> Self {
        self.set("propertyNames", schema)
    }

    /// Item schema for an array property.
    #[must_use]
    pub fn items(self, schema: impl Into<Value>) -> Self {
        self.set("items", schema.into())
    }

    /// Array items are strings, described by the given decorators.
    #[must_use]
    pub fn string_items(self, item: Property) -> Self {
        let schema = item.into_item_schema("string");
        self.set("items", schema)
    }

    /// Array items are strings restricted to an enumeration.
    #[must_use]
    pub fn string_enum_items<S: Into<String>>(self, values: impl IntoIterator<Item = S>) -> Self {
        let values: Vec<Value> = values.into_iter().map(|s| Value::String(s.into())).collect();
        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String("string".to_string()));
        schema.insert("enum".to_string(), Value::Array(values));
        self.set("items", Value::Object(schema))
    }

    /// Array items are numbers.
    #[must_use]
    pub fn number_items(self, item: Property) -> Self {
        let schema = item.into_item_schema("number");
        self.set("items", schema)
    }

    /// Array items are integers.
    #[must_use]
    pub fn integer_items(self, item: Property) -> Self {
        let schema = item.into_item_schema("integer");
        self.set("items", schema)
    }

    /// Array items are booleans.
    #[must_use]
    pub fn boolean_items(self, item: Property) -> Self {
        let schema = item.into_item_schema("boolean");
        self.set("items", schema)
    }

    /// Array items are objects.
    #[must_use]
    pub fn object_items(self, item: Property) -> Self {
        let mut schema = item.into_item_schema("object");
        if let Value::Object(map) = &mut schema {
            map.entry("properties")
                .or_insert_with(|| Value::Object(Map::new()));
        }
        self.set("items", schema)
    }

    /// Minimum number of array items.
    #[must_use]
    pub fn min_items(self, min: u64) -> Self {
        self.set("minItems", min.into())
    }

    /// Maximum number of array items.
    #[must_use]
    pub fn max_items(self, max: u64) -> Self {
        self.set("maxItems", max.into())
    }

    /// Requires array items to be unique.
    #[must_use]
    pub fn unique_items(self, unique: bool) -> Self {
        self.set("uniqueItems", Value::Bool(unique))
    }

    /// Splits into the property body and the required flag. The required
    /// flag is intentionally absent from the body so the emitted schema
    /// stays JSON-Schema compatible.
    fn into_item_schema(self, kind: &str) -> Value {
        // Required has no meaning on item schemas and is dropped.
        let (mut body, _) = self.into_parts();
        body.insert("type".to_string(), Value::String(kind.to_string()));
        Value::Object(body)
    }

    fn into_parts(self) -> (Map<String, Value>, bool) {
        (self.body, self.required)
    }
}
