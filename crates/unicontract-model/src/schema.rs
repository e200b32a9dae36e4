use serde::{Deserialize, Serialize};
use serde_json::Value;
use indexmap::IndexMap;

/// Object members keyed by name, in source order.
pub type PropertyMap = IndexMap<String, SchemaProperty>;

/// Schema dialect a payload was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaFormat {
    /// JSON Schema (the default for both protocols).
    JsonSchema,
    /// Apache Avro records.
    Avro,
}

/// Which of the three mutually exclusive shapes a schema node has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaShape {
    Object,
    Array,
    Scalar,
}

/// Validation constraints that were present on the source schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
}

impl Validation {
    pub fn is_empty(&self) -> bool {
        self.minimum.is_none()
            && self.maximum.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.pattern.is_none()
            && self.min_items.is_none()
            && self.max_items.is_none()
    }

    /// `None` when no constraint is set.
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// Extra per-schema detail. Only the Avro namespace is carried today.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// A schema node at contract level: request body, response or message payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedDataSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Type discriminator ("object", "array", "string", ...). Not a closed set.
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<UnifiedDataSchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
    /// Response status code (request-style responses only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// The source schema with parser metadata stripped, for verbatim display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_format: Option<SchemaFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SchemaMetadata>,
}

impl UnifiedDataSchema {
    /// A bare node of the given type with every optional field unset.
    pub fn new(schema_type: impl Into<String>) -> Self {
        Self {
            name: None,
            description: None,
            schema_type: schema_type.into(),
            properties: None,
            items: None,
            required: None,
            example: None,
            enum_values: None,
            format: None,
            validation: None,
            status_code: None,
            content_type: None,
            original_schema: None,
            schema_format: None,
            metadata: None,
        }
    }

    pub fn shape(&self) -> SchemaShape {
        shape_of(self.properties.is_some(), self.items.is_some())
    }
}

/// A schema node nested inside an object's properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaProperty {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
}

impl SchemaProperty {
    pub fn new(schema_type: impl Into<String>) -> Self {
        Self {
            schema_type: schema_type.into(),
            description: None,
            example: None,
            enum_values: None,
            format: None,
            properties: None,
            items: None,
            required: None,
            validation: None,
        }
    }

    pub fn shape(&self) -> SchemaShape {
        shape_of(self.properties.is_some(), self.items.is_some())
    }
}

fn shape_of(has_properties: bool, has_items: bool) -> SchemaShape {
    match (has_properties, has_items) {
        (true, _) => SchemaShape::Object,
        (false, true) => SchemaShape::Array,
        (false, false) => SchemaShape::Scalar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_validation_collapses() {
        assert_eq!(Validation::default().non_empty(), None);
        let v = Validation {
            max_items: Some(3),
            ..Validation::default()
        };
        assert_eq!(v.clone().non_empty(), Some(v));
    }

    #[test]
    fn bare_schema_serializes_minimal() {
        let mut schema = UnifiedDataSchema::new("null");
        schema.status_code = Some("204".into());
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json, serde_json::json!({"type": "null", "statusCode": "204"}));
        assert_eq!(schema.shape(), SchemaShape::Scalar);
    }

    #[test]
    fn schema_format_wire_names() {
        assert_eq!(
            serde_json::to_value(SchemaFormat::JsonSchema).unwrap(),
            "json-schema"
        );
        assert_eq!(serde_json::to_value(SchemaFormat::Avro).unwrap(), "avro");
    }
}
