//! Recursive schema walking shared by both normalizers.
//!
//! [`SchemaWalker`] converts one schema node, in either access
//! representation, into [`UnifiedDataSchema`] / [`SchemaProperty`]. What
//! differs between the request-style and event-style sources is captured by
//! a [`SchemaDialect`].

use serde_json::{Map, Value};
use unicontract_model::{
    PropertyMap, SchemaFormat, SchemaMetadata, SchemaProperty, UnifiedDataSchema, Validation,
};
use unicontract_telemetry::log_extraction_failure;

use crate::access::{recover, FieldResolver, FieldResolverExt, Node};
use crate::formats::is_avro_marker;

/// Deepest nesting the walker follows. Deeper sub-trees are dropped.
pub const MAX_DEPTH: usize = 64;

/// Dialect-specific decisions made while walking a schema.
pub trait SchemaDialect {
    /// Format tag for the top-level node.
    fn schema_format(&self) -> SchemaFormat;

    /// Example used when a node carries no `example` of its own.
    fn fallback_example(&self, _node: &Node) -> Option<Value> {
        None
    }
}

/// Request-style schemas: plain JSON Schema, explicit `example` only.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaDialect;

impl SchemaDialect for JsonSchemaDialect {
    fn schema_format(&self) -> SchemaFormat {
        SchemaFormat::JsonSchema
    }
}

/// Event-style message payloads, tagged by the message's `schemaFormat`.
#[derive(Debug, Clone, Copy)]
pub struct MessageDialect {
    format: SchemaFormat,
}

impl MessageDialect {
    pub fn new(format: SchemaFormat) -> Self {
        Self { format }
    }

    /// Pick the dialect from a `schemaFormat` marker. No marker means JSON Schema.
    pub fn from_marker(marker: Option<&str>) -> Self {
        let format = match marker {
            Some(m) if is_avro_marker(m) => SchemaFormat::Avro,
            _ => SchemaFormat::JsonSchema,
        };
        Self::new(format)
    }
}

impl Default for MessageDialect {
    fn default() -> Self {
        Self::from_marker(None)
    }
}

impl SchemaDialect for MessageDialect {
    fn schema_format(&self) -> SchemaFormat {
        self.format
    }

    fn fallback_example(&self, node: &Node) -> Option<Value> {
        node.list_field("examples").first().map(Node::to_json)
    }
}

/// Walks schema nodes with one dialect.
#[derive(Debug, Clone)]
pub struct SchemaWalker<'a, D> {
    dialect: D,
    metadata_prefix: &'a str,
}

impl<'a, D: SchemaDialect> SchemaWalker<'a, D> {
    /// `metadata_prefix` marks parser-internal keys stripped from `originalSchema`.
    pub fn new(dialect: D, metadata_prefix: &'a str) -> Self {
        Self {
            dialect,
            metadata_prefix,
        }
    }

    /// Normalize a top-level schema. `originalSchema` is the node's own payload.
    pub fn schema(&self, node: &Node) -> UnifiedDataSchema {
        self.schema_with_original(node, node.to_json())
    }

    /// Normalize a top-level schema whose payload was converted from another
    /// dialect; `original` is kept as `originalSchema` instead of the node.
    pub fn schema_with_original(&self, node: &Node, original: Value) -> UnifiedDataSchema {
        let mut schema = self.schema_at(node, 0);
        let original = strip_parser_metadata(&original, self.metadata_prefix);

        let format = self.dialect.schema_format();
        if format == SchemaFormat::Avro {
            if let Some(namespace) = original.get("namespace").and_then(Value::as_str) {
                schema.metadata = Some(SchemaMetadata {
                    namespace: Some(namespace.to_string()),
                });
            }
        }
        schema.original_schema = Some(original);
        schema.schema_format = Some(format);
        schema
    }

    /// Normalize a nested object member.
    pub fn property(&self, node: &Node) -> SchemaProperty {
        self.property_at(node, 0)
    }

    fn schema_at(&self, node: &Node, depth: usize) -> UnifiedDataSchema {
        let properties = self.properties(node, depth);
        let items = if properties.is_none() {
            node.field_node("items")
                .and_then(|items| self.nested("items", depth, |d| self.schema_at(&items, d)))
                .map(Box::new)
        } else {
            None
        };

        let schema_type = schema_type(node, properties.is_some(), items.is_some(), "object");
        let required = required_names(node, properties.is_some());

        UnifiedDataSchema {
            name: node.str_field("title"),
            description: node.str_field("description"),
            properties,
            items,
            required,
            example: self.example(node),
            enum_values: enum_values(node),
            format: node.str_field("format"),
            validation: validation(node),
            original_schema: Some(strip_parser_metadata(&node.to_json(), self.metadata_prefix)),
            schema_format: Some(self.dialect.schema_format()),
            ..UnifiedDataSchema::new(schema_type)
        }
    }

    fn property_at(&self, node: &Node, depth: usize) -> SchemaProperty {
        let properties = self.properties(node, depth);
        let items = if properties.is_none() {
            node.field_node("items")
                .and_then(|items| self.nested("items", depth, |d| self.property_at(&items, d)))
                .map(Box::new)
        } else {
            None
        };

        let schema_type = schema_type(node, properties.is_some(), items.is_some(), "string");
        let required = required_names(node, properties.is_some());

        SchemaProperty {
            schema_type,
            description: node.str_field("description"),
            example: self.example(node),
            enum_values: enum_values(node),
            format: node.str_field("format"),
            properties,
            items,
            required,
            validation: validation(node),
        }
    }

    /// Run `walk` one level deeper, or drop the sub-tree past [`MAX_DEPTH`].
    fn nested<T>(&self, field: &str, depth: usize, walk: impl FnOnce(usize) -> T) -> Option<T> {
        if depth + 1 > MAX_DEPTH {
            log_extraction_failure!(
                field = field,
                depth = MAX_DEPTH,
                "schema nesting too deep, sub-tree dropped"
            );
            return None;
        }
        Some(walk(depth + 1))
    }

    /// Object members in source order, `None` when the map is empty or absent.
    fn properties(&self, node: &Node, depth: usize) -> Option<PropertyMap> {
        let members = property_members(node)?;
        let mut out = PropertyMap::new();
        for (name, member) in members {
            if let Some(prop) = self.nested(&name, depth, |d| self.property_at(&member, d)) {
                out.insert(name, prop);
            }
        }
        (!out.is_empty()).then_some(out)
    }

    fn example(&self, node: &Node) -> Option<Value> {
        node.json_field("example")
            .or_else(|| self.dialect.fallback_example(node))
    }
}

/// Read the `properties` map member by member, so one failing member only
/// loses itself.
fn property_members(node: &Node) -> Option<Vec<(String, Node)>> {
    let props = node.field_node("properties")?;
    let members = match &props {
        Node::Wrapped(w) if !w.member_names().is_empty() => {
            let mut members = Vec::new();
            for name in w.member_names() {
                match props.resolve(&name) {
                    Ok(Some(member)) => members.push((name, member)),
                    Ok(None) => {}
                    Err(err) => {
                        log_extraction_failure!(
                            field = %name,
                            error = %err,
                            "property unavailable, omitted"
                        );
                    }
                }
            }
            members
        }
        other => recover("properties", other.entries())?,
    };
    (!members.is_empty()).then_some(members)
}

/// The declared type, or one inferred from the node's shape.
fn schema_type(node: &Node, has_properties: bool, has_items: bool, fallback: &str) -> String {
    let declared = match node.resolve("type") {
        Ok(Some(n)) => match n.as_str() {
            Some(s) => Some(s.to_string()),
            None => recover("type", n.elements())
                .unwrap_or_default()
                .iter()
                .filter_map(|t| t.as_str())
                .find(|t| *t != "null")
                .map(str::to_string),
        },
        Ok(None) => None,
        Err(err) => {
            log_extraction_failure!(field = "type", error = %err, "type unavailable, inferring");
            None
        }
    };
    declared.unwrap_or_else(|| {
        if has_properties {
            "object".to_string()
        } else if has_items {
            "array".to_string()
        } else {
            fallback.to_string()
        }
    })
}

fn required_names(node: &Node, has_properties: bool) -> Option<Vec<String>> {
    if !has_properties {
        return None;
    }
    let names = node.string_list_field("required");
    (!names.is_empty()).then_some(names)
}

fn enum_values(node: &Node) -> Option<Vec<Value>> {
    match node.json_field("enum")? {
        Value::Array(values) => Some(values),
        _ => None,
    }
}

fn validation(node: &Node) -> Option<Validation> {
    Validation {
        minimum: node.f64_field("minimum"),
        maximum: node.f64_field("maximum"),
        min_length: node.u64_field("minLength"),
        max_length: node.u64_field("maxLength"),
        pattern: node.str_field("pattern"),
        min_items: node.u64_field("minItems"),
        max_items: node.u64_field("maxItems"),
    }
    .non_empty()
}

/// Copy `value`, dropping every object key that starts with `prefix`, at
/// every depth.
pub fn strip_parser_metadata(value: &Value, prefix: &str) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !key.starts_with(prefix))
                .map(|(key, child)| (key.clone(), strip_parser_metadata(child, prefix)))
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| strip_parser_metadata(item, prefix))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::WrappedObject;
    use crate::error::ExtractionError;
    use serde_json::json;
    use unicontract_model::SchemaShape;

    const PREFIX: &str = "x-parser-";

    fn json_walker() -> SchemaWalker<'static, JsonSchemaDialect> {
        SchemaWalker::new(JsonSchemaDialect, PREFIX)
    }

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).unwrap()
    }

    fn assert_exclusive(schema: &UnifiedDataSchema) {
        assert!(!(schema.properties.is_some() && schema.items.is_some()));
        if let Some(items) = &schema.items {
            assert_exclusive(items);
        }
        for prop in schema.properties.iter().flat_map(|p| p.values()) {
            assert_exclusive_prop(prop);
        }
    }

    fn assert_exclusive_prop(prop: &SchemaProperty) {
        assert!(!(prop.properties.is_some() && prop.items.is_some()));
        if let Some(items) = &prop.items {
            assert_exclusive_prop(items);
        }
        for child in prop.properties.iter().flat_map(|p| p.values()) {
            assert_exclusive_prop(child);
        }
    }

    #[test]
    fn original_schema_round_trips_without_parser_fields() {
        let raw = yaml(
            r##"
type: object
x-parser-schema-id: Order
properties:
  id:
    type: string
    x-parser-schema-id: "<anonymous-1>"
  lines:
    type: array
    items:
      type: object
      x-parser-circular: false
      properties:
        sku:
          type: string
"##,
        );
        let schema = json_walker().schema(&Node::Plain(raw.clone()));

        let mut expected = raw;
        expected.as_object_mut().unwrap().remove("x-parser-schema-id");
        expected["properties"]["id"]
            .as_object_mut()
            .unwrap()
            .remove("x-parser-schema-id");
        expected["properties"]["lines"]["items"]
            .as_object_mut()
            .unwrap()
            .remove("x-parser-circular");

        assert_eq!(schema.original_schema, Some(expected));
        assert_eq!(schema.schema_format, Some(SchemaFormat::JsonSchema));
    }

    #[test]
    fn properties_win_over_items() {
        let raw = json!({
            "properties": {"id": {"type": "string"}},
            "items": {"type": "string"}
        });
        let schema = json_walker().schema(&Node::Plain(raw));
        assert_eq!(schema.shape(), SchemaShape::Object);
        assert_eq!(schema.schema_type, "object");
        assert!(schema.items.is_none());
    }

    #[test]
    fn arrays_of_arrays_of_objects() {
        let raw = yaml(
            r##"
type: array
items:
  type: array
  items:
    type: object
    required: [x]
    properties:
      x: { type: integer, minimum: 0, maximum: 10 }
      tags:
        type: array
        items: { type: string }
"##,
        );
        let schema = json_walker().schema(&Node::Plain(raw));
        assert_exclusive(&schema);

        let inner = schema.items.as_ref().unwrap().items.as_ref().unwrap();
        assert_eq!(inner.schema_type, "object");
        assert_eq!(inner.required, Some(vec!["x".to_string()]));
        let props = inner.properties.as_ref().unwrap();
        let x = &props["x"];
        assert_eq!(x.schema_type, "integer");
        let validation = x.validation.as_ref().unwrap();
        assert_eq!(validation.minimum, Some(0.0));
        assert_eq!(validation.maximum, Some(10.0));
        assert_eq!(validation.pattern, None);
        assert_eq!(props["tags"].items.as_ref().unwrap().schema_type, "string");
    }

    #[test]
    fn nested_items_keep_their_own_payload() {
        let raw = yaml(
            r##"
type: array
x-parser-schema-id: list
items:
  type: object
  x-parser-id: 1
  properties:
    sku: { type: string }
"##,
        );
        let schema = json_walker().schema(&Node::Plain(raw));
        let items = schema.items.as_ref().unwrap();
        assert_eq!(
            items.original_schema,
            Some(json!({"type": "object", "properties": {"sku": {"type": "string"}}}))
        );
        assert_eq!(items.schema_format, Some(SchemaFormat::JsonSchema));
        assert_eq!(
            schema.original_schema.as_ref().unwrap()["items"],
            json!({"type": "object", "properties": {"sku": {"type": "string"}}})
        );
    }

    #[test]
    fn properties_keep_source_order() {
        let raw = yaml(
            r##"
type: object
properties:
  zeta: { type: string }
  alpha: { type: integer }
  mid: { type: boolean }
"##,
        );
        let schema = json_walker().schema(&Node::Plain(raw));
        let names: Vec<_> = schema.properties.as_ref().unwrap().keys().cloned().collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);

        let serialized = serde_json::to_value(&schema).unwrap();
        let keys: Vec<_> = serialized["properties"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn dual_access_equivalence() {
        let raw = json!({"type": "object", "properties": {"id": {"type": "string"}}});
        let plain = json_walker().schema(&Node::Plain(raw.clone()));

        let id = WrappedObject::new()
            .with_accessor("type", || Ok(Node::Plain(json!("string"))))
            .into_node();
        let properties = WrappedObject::new()
            .with_accessor("id", move || Ok(id.clone()))
            .into_node();
        let wrapped = WrappedObject::new()
            .with_accessor("type", || Ok(Node::Plain(json!("object"))))
            .with_accessor("properties", move || Ok(properties.clone()))
            .into_node();

        assert_eq!(json_walker().schema(&wrapped), plain);
        assert_eq!(json_walker().schema(&WrappedObject::mirror(&raw)), plain);
    }

    #[test]
    fn failing_property_is_omitted() {
        let properties = WrappedObject::new()
            .with_accessor("id", || Ok(Node::Plain(json!({"type": "string"}))))
            .with_accessor("broken", || Err(ExtractionError::accessor("broken", "boom")))
            .into_node();
        let node = WrappedObject::new()
            .with_accessor("properties", move || Ok(properties.clone()))
            .into_node();

        let schema = json_walker().schema(&node);
        let props = schema.properties.unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props["id"].schema_type, "string");
    }

    #[test]
    fn type_inference_and_lists() {
        let walker = json_walker();
        assert_eq!(walker.schema(&Node::Plain(json!({}))).schema_type, "object");
        assert_eq!(walker.property(&Node::Plain(json!({}))).schema_type, "string");
        assert_eq!(
            walker
                .schema(&Node::Plain(json!({"items": {"type": "string"}})))
                .schema_type,
            "array"
        );
        assert_eq!(
            walker
                .property(&Node::Plain(json!({"type": ["null", "integer"]})))
                .schema_type,
            "integer"
        );
    }

    #[test]
    fn scalar_without_constraints_has_no_validation() {
        let schema = json_walker().schema(&Node::Plain(json!({
            "type": "string",
            "format": "uuid",
            "enum": ["a", "b"],
            "example": "a"
        })));
        assert_eq!(schema.shape(), SchemaShape::Scalar);
        assert!(schema.validation.is_none());
        assert_eq!(schema.format.as_deref(), Some("uuid"));
        assert_eq!(schema.enum_values, Some(vec![json!("a"), json!("b")]));
        assert_eq!(schema.example, Some(json!("a")));
    }

    #[test]
    fn message_dialect_examples_fallback() {
        let walker = SchemaWalker::new(MessageDialect::default(), PREFIX);
        let prop = walker.property(&Node::Plain(json!({
            "type": "string",
            "examples": ["first", "second"]
        })));
        assert_eq!(prop.example, Some(json!("first")));

        let prop = json_walker().property(&Node::Plain(json!({
            "type": "string",
            "examples": ["first"]
        })));
        assert_eq!(prop.example, None);
    }

    #[test]
    fn avro_dialect_surfaces_namespace() {
        let walker = SchemaWalker::new(
            MessageDialect::from_marker(Some("application/vnd.apache.avro;version=1.9.0")),
            PREFIX,
        );
        let original = json!({"type": "record", "name": "User", "namespace": "com.acme", "fields": []});
        let converted = Node::Plain(json!({"type": "object", "title": "User"}));
        let schema = walker.schema_with_original(&converted, original.clone());

        assert_eq!(schema.schema_format, Some(SchemaFormat::Avro));
        assert_eq!(schema.name.as_deref(), Some("User"));
        assert_eq!(schema.original_schema, Some(original));
        assert_eq!(
            schema.metadata.and_then(|m| m.namespace).as_deref(),
            Some("com.acme")
        );
    }

    #[test]
    fn excessive_depth_is_truncated() {
        let mut raw = json!({"type": "string"});
        for _ in 0..(MAX_DEPTH + 5) {
            raw = json!({"type": "array", "items": raw});
        }
        let schema = json_walker().schema(&Node::Plain(raw));
        let mut depth = 0;
        let mut cursor = &schema;
        while let Some(next) = cursor.items.as_deref() {
            depth += 1;
            cursor = next;
        }
        assert_eq!(depth, MAX_DEPTH);
    }

    #[test]
    fn strip_reaches_into_arrays() {
        let value = json!({"allOf": [{"x-parser-id": 1, "type": "string"}], "x-parser-x": true});
        assert_eq!(
            strip_parser_metadata(&value, PREFIX),
            json!({"allOf": [{"type": "string"}]})
        );
    }
}
