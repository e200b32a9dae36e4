//! Schema-format handlers for message payloads.
//!
//! Event-style messages may declare their payload in a dialect other than
//! JSON Schema. Handlers convert such payloads into the JSON-Schema shape the
//! walker reads. The registry is configuration: it travels inside
//! [`NormalizeOptions`](crate::NormalizeOptions) and nothing is registered
//! process-wide.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use unicontract_model::SchemaFormat;

use crate::error::ExtractionError;

/// Converts payloads of one schema dialect into JSON Schema.
pub trait SchemaFormatHandler: Send + Sync {
    /// Short handler name, for diagnostics.
    fn name(&self) -> &'static str;

    /// The format tag stamped on nodes this handler converted.
    fn format(&self) -> SchemaFormat;

    /// Whether this handler owns the given `schemaFormat` marker.
    fn matches(&self, marker: &str) -> bool;

    /// Convert a payload to JSON Schema.
    fn to_json_schema(&self, schema: &Value) -> Result<Value, ExtractionError>;
}

/// The set of handlers available to one normalization call.
#[derive(Clone)]
pub struct FormatRegistry {
    handlers: Vec<Arc<dyn SchemaFormatHandler>>,
}

impl Default for FormatRegistry {
    /// A registry holding the Avro handler.
    fn default() -> Self {
        Self::empty().with_handler(AvroFormat)
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.name()))
            .finish()
    }
}

impl FormatRegistry {
    /// A registry without handlers.
    pub fn empty() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn with_handler(mut self, handler: impl SchemaFormatHandler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// The first handler matching `marker`.
    pub fn lookup(&self, marker: &str) -> Option<&dyn SchemaFormatHandler> {
        self.handlers
            .iter()
            .find(|h| h.matches(marker))
            .map(|h| h.as_ref())
    }
}

/// True when a `schemaFormat` marker names the Avro dialect.
pub fn is_avro_marker(marker: &str) -> bool {
    marker.to_ascii_lowercase().contains("avro")
}

/// Deepest Avro nesting converted.
const MAX_AVRO_DEPTH: usize = 64;

/// Apache Avro handler: records, enums, arrays, maps, fixed, unions, logical
/// types and named-type references.
#[derive(Debug, Clone, Copy, Default)]
pub struct AvroFormat;

impl SchemaFormatHandler for AvroFormat {
    fn name(&self) -> &'static str {
        "avro"
    }

    fn format(&self) -> SchemaFormat {
        SchemaFormat::Avro
    }

    fn matches(&self, marker: &str) -> bool {
        is_avro_marker(marker)
    }

    fn to_json_schema(&self, schema: &Value) -> Result<Value, ExtractionError> {
        AvroConverter::default().convert(schema, None, 0)
    }
}

#[derive(Default)]
struct AvroConverter {
    named: HashMap<String, Value>,
    in_progress: HashSet<String>,
}

fn conversion(reason: impl Into<String>) -> ExtractionError {
    ExtractionError::Conversion {
        format: "avro",
        reason: reason.into(),
    }
}

fn primitive(name: &str) -> Option<Value> {
    let schema = match name {
        "null" => json!({"type": "null"}),
        "boolean" => json!({"type": "boolean"}),
        "int" => json!({"type": "integer", "format": "int32"}),
        "long" => json!({"type": "integer", "format": "int64"}),
        "float" => json!({"type": "number", "format": "float"}),
        "double" => json!({"type": "number", "format": "double"}),
        "bytes" => json!({"type": "string", "format": "byte"}),
        "string" => json!({"type": "string"}),
        _ => return None,
    };
    Some(schema)
}

fn full_name(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !name.contains('.') && !ns.is_empty() => format!("{}.{}", ns, name),
        _ => name.to_string(),
    }
}

fn is_nullable_union(schema: &Value) -> bool {
    schema
        .as_array()
        .is_some_and(|members| members.iter().any(|m| m.as_str() == Some("null")))
}

impl AvroConverter {
    fn convert(
        &mut self,
        schema: &Value,
        namespace: Option<&str>,
        depth: usize,
    ) -> Result<Value, ExtractionError> {
        if depth > MAX_AVRO_DEPTH {
            return Err(ExtractionError::DepthExceeded(MAX_AVRO_DEPTH));
        }
        match schema {
            Value::String(name) => self.reference(name, namespace),
            Value::Array(members) => {
                let non_null: Vec<&Value> = members
                    .iter()
                    .filter(|m| m.as_str() != Some("null"))
                    .collect();
                match non_null.as_slice() {
                    [] => Ok(json!({"type": "null"})),
                    [single] => self.convert(single, namespace, depth + 1),
                    many => {
                        let converted = many
                            .iter()
                            .map(|m| self.convert(m, namespace, depth + 1))
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok(json!({ "oneOf": converted }))
                    }
                }
            }
            Value::Object(obj) => self.complex(obj, namespace, depth),
            other => Err(conversion(format!("unexpected schema value {}", other))),
        }
    }

    fn reference(&self, name: &str, namespace: Option<&str>) -> Result<Value, ExtractionError> {
        if let Some(schema) = primitive(name) {
            return Ok(schema);
        }
        let full = full_name(name, namespace);
        for key in [full.as_str(), name] {
            if let Some(schema) = self.named.get(key) {
                return Ok(schema.clone());
            }
            if self.in_progress.contains(key) {
                // Recursive reference: stop at a titled placeholder.
                return Ok(json!({"type": "object", "title": name}));
            }
        }
        Err(conversion(format!("unknown type '{}'", name)))
    }

    fn complex(
        &mut self,
        obj: &Map<String, Value>,
        namespace: Option<&str>,
        depth: usize,
    ) -> Result<Value, ExtractionError> {
        let type_value = obj
            .get("type")
            .ok_or_else(|| conversion("schema object without 'type'"))?;

        let type_name = match type_value {
            Value::String(s) => s.as_str(),
            nested => return self.convert(nested, namespace, depth + 1),
        };

        let own_namespace = obj
            .get("namespace")
            .and_then(Value::as_str)
            .or(namespace);
        let name = obj.get("name").and_then(Value::as_str);
        let doc = obj.get("doc").and_then(Value::as_str);

        let mut converted = match type_name {
            "record" | "error" => {
                let name = name.ok_or_else(|| conversion("record without 'name'"))?;
                let full = full_name(name, own_namespace);
                self.in_progress.insert(full.clone());
                let result = self.record(obj, name, own_namespace, depth);
                self.in_progress.remove(&full);
                let result = result?;
                self.register(&full, name, &result);
                result
            }
            "enum" => {
                let symbols = obj.get("symbols").cloned().unwrap_or_else(|| json!([]));
                let mut schema = json!({"type": "string", "enum": symbols});
                if let Some(name) = name {
                    schema["title"] = json!(name);
                    self.register(&full_name(name, own_namespace), name, &schema);
                }
                schema
            }
            "fixed" => {
                let mut schema = json!({"type": "string"});
                if let Some(size) = obj.get("size").and_then(Value::as_u64) {
                    schema["minLength"] = json!(size);
                    schema["maxLength"] = json!(size);
                }
                if let Some(name) = name {
                    schema["title"] = json!(name);
                    self.register(&full_name(name, own_namespace), name, &schema);
                }
                schema
            }
            "array" => {
                let items = obj
                    .get("items")
                    .ok_or_else(|| conversion("array without 'items'"))?;
                json!({"type": "array", "items": self.convert(items, own_namespace, depth + 1)?})
            }
            "map" => {
                let values = obj
                    .get("values")
                    .ok_or_else(|| conversion("map without 'values'"))?;
                json!({
                    "type": "object",
                    "additionalProperties": self.convert(values, own_namespace, depth + 1)?
                })
            }
            other => self.reference(other, own_namespace)?,
        };

        if let Some(logical) = obj.get("logicalType").and_then(Value::as_str) {
            apply_logical_type(&mut converted, logical);
        }
        if let (Some(doc), Some(target)) = (doc, converted.as_object_mut()) {
            target
                .entry("description")
                .or_insert_with(|| json!(doc));
        }
        Ok(converted)
    }

    fn record(
        &mut self,
        obj: &Map<String, Value>,
        name: &str,
        namespace: Option<&str>,
        depth: usize,
    ) -> Result<Value, ExtractionError> {
        let fields = obj
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| conversion(format!("record '{}' without 'fields'", name)))?;

        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in fields {
            let field_name = field
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| conversion(format!("field without 'name' in record '{}'", name)))?;
            let field_type = field
                .get("type")
                .ok_or_else(|| conversion(format!("field '{}' without 'type'", field_name)))?;

            let mut property = self.convert(field_type, namespace, depth + 1)?;
            if let Some(target) = property.as_object_mut() {
                if let Some(doc) = field.get("doc").and_then(Value::as_str) {
                    target.insert("description".into(), json!(doc));
                }
                if let Some(default) = field.get("default") {
                    target.insert("default".into(), default.clone());
                }
            }
            if field.get("default").is_none() && !is_nullable_union(field_type) {
                required.push(json!(field_name));
            }
            properties.insert(field_name.to_string(), property);
        }

        let mut schema = json!({"type": "object", "title": name, "properties": properties});
        if !required.is_empty() {
            schema["required"] = Value::Array(required);
        }
        Ok(schema)
    }

    fn register(&mut self, full: &str, name: &str, schema: &Value) {
        self.named.insert(full.to_string(), schema.clone());
        self.named.insert(name.to_string(), schema.clone());
    }
}

fn apply_logical_type(schema: &mut Value, logical: &str) {
    let Some(obj) = schema.as_object_mut() else {
        return;
    };
    match logical {
        "timestamp-millis" | "timestamp-micros" | "local-timestamp-millis"
        | "local-timestamp-micros" => {
            obj.insert("format".into(), json!("date-time"));
        }
        "date" => {
            obj.insert("format".into(), json!("date"));
        }
        "time-millis" | "time-micros" => {
            obj.insert("format".into(), json!("time"));
        }
        "uuid" => {
            obj.insert("format".into(), json!("uuid"));
        }
        "decimal" => {
            obj.insert("type".into(), json!("number"));
            obj.remove("format");
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avro_marker_detection() {
        assert!(is_avro_marker("application/vnd.apache.avro;version=1.9.0"));
        assert!(is_avro_marker("application/vnd.apache.AVRO+json"));
        assert!(!is_avro_marker("application/schema+json;version=draft-07"));
    }

    #[test]
    fn registry_lookup() {
        let registry = FormatRegistry::default();
        let handler = registry
            .lookup("application/vnd.apache.avro+yaml;version=1.9.0")
            .unwrap();
        assert_eq!(handler.name(), "avro");
        assert_eq!(handler.format(), SchemaFormat::Avro);
        assert!(registry.lookup("application/raml+yaml;version=1.0").is_none());
        assert!(FormatRegistry::empty().lookup("avro").is_none());
        assert_eq!(format!("{:?}", registry), "[\"avro\"]");
    }

    #[test]
    fn converts_record_with_nested_types() {
        let avro = json!({
            "type": "record",
            "name": "OrderCreated",
            "namespace": "com.shop.orders",
            "doc": "An order was placed",
            "fields": [
                {"name": "orderId", "type": "string", "doc": "Order identifier"},
                {"name": "amount", "type": "double"},
                {"name": "note", "type": ["null", "string"], "default": null},
                {"name": "placedAt", "type": {"type": "long", "logicalType": "timestamp-millis"}},
                {"name": "status", "type": {"type": "enum", "name": "Status", "symbols": ["NEW", "PAID"]}},
                {"name": "lines", "type": {"type": "array", "items": {
                    "type": "record", "name": "Line",
                    "fields": [{"name": "sku", "type": "string"}, {"name": "qty", "type": "int"}]
                }}},
                {"name": "previousStatus", "type": "Status"}
            ]
        });

        let schema = AvroFormat.to_json_schema(&avro).unwrap();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["title"], "OrderCreated");
        assert_eq!(schema["description"], "An order was placed");

        let props = &schema["properties"];
        assert_eq!(props["orderId"]["type"], "string");
        assert_eq!(props["orderId"]["description"], "Order identifier");
        assert_eq!(props["amount"]["type"], "number");
        assert_eq!(props["note"]["type"], "string");
        assert_eq!(props["placedAt"]["format"], "date-time");
        assert_eq!(props["status"]["enum"], json!(["NEW", "PAID"]));
        assert_eq!(props["lines"]["type"], "array");
        assert_eq!(props["lines"]["items"]["properties"]["qty"]["format"], "int32");
        assert_eq!(props["previousStatus"]["enum"], json!(["NEW", "PAID"]));

        assert_eq!(
            schema["required"],
            json!(["orderId", "amount", "placedAt", "status", "lines", "previousStatus"])
        );
    }

    #[test]
    fn recursive_record_stops_at_placeholder() {
        let avro = json!({
            "type": "record",
            "name": "Node",
            "fields": [
                {"name": "value", "type": "int"},
                {"name": "next", "type": ["null", "Node"]}
            ]
        });
        let schema = AvroFormat.to_json_schema(&avro).unwrap();
        assert_eq!(
            schema["properties"]["next"],
            json!({"type": "object", "title": "Node"})
        );
    }

    #[test]
    fn unknown_reference_is_an_error() {
        let err = AvroFormat.to_json_schema(&json!("com.example.Missing")).unwrap_err();
        assert!(matches!(err, ExtractionError::Conversion { format: "avro", .. }));
    }

    #[test]
    fn map_and_fixed() {
        let schema = AvroFormat
            .to_json_schema(&json!({"type": "map", "values": "long"}))
            .unwrap();
        assert_eq!(schema["additionalProperties"]["type"], "integer");

        let schema = AvroFormat
            .to_json_schema(&json!({"type": "fixed", "name": "Md5", "size": 16}))
            .unwrap();
        assert_eq!(schema["maxLength"], 16);
        assert_eq!(schema["title"], "Md5");
    }
}
