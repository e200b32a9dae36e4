//! Dual-access field resolution.
//!
//! Source documents reach the normalizers in one of two shapes: plain nested
//! data (the JSON/YAML path) or object graphs produced by a protocol library,
//! where fields sit behind zero-argument accessor methods. [`Node`] covers
//! both and [`FieldResolver`] reads a field from either without the caller
//! knowing which one it holds.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use unicontract_telemetry::log_extraction_failure;

use crate::error::ExtractionError;

/// A zero-argument accessor exposed by a wrapped object.
pub type AccessorFn = Arc<dyn Fn() -> Result<Node, ExtractionError> + Send + Sync>;

/// One member of a wrapped object.
#[derive(Clone)]
pub enum Member {
    /// Invoked on every read.
    Accessor(AccessorFn),
    /// Read as-is.
    Value(Node),
}

/// An object whose fields are reached through named members.
pub trait Accessor: Send + Sync {
    /// Look up a member by name. `None` when the object has no such member.
    fn member(&self, name: &str) -> Option<Member>;

    /// Names of all members, in declaration order. Used when the object is
    /// read as a map (e.g. a `properties` collection).
    fn member_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// The raw payload the wrapper was built from, if it keeps one.
    fn raw_json(&self) -> Option<&Value> {
        None
    }
}

/// A document node in either representation.
#[derive(Clone)]
pub enum Node {
    /// Plain nested data.
    Plain(Value),
    /// An accessor-backed object.
    Wrapped(Arc<dyn Accessor>),
    /// An ordered collection of nodes (e.g. a library's `messages()` result).
    List(Vec<Node>),
    /// A keyed collection of nodes, in source order.
    Map(Vec<(String, Node)>),
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(v) => f.debug_tuple("Plain").field(v).finish(),
            Self::Wrapped(w) => f
                .debug_struct("Wrapped")
                .field("members", &w.member_names())
                .finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Self::Plain(value)
    }
}

impl Node {
    pub fn wrapped(accessor: impl Accessor + 'static) -> Self {
        Self::Wrapped(Arc::new(accessor))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Plain(Value::Null))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Plain(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Strings as-is; numbers and booleans rendered. YAML reads `3.0` as a number.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Plain(Value::String(s)) => Some(s.clone()),
            Self::Plain(Value::Number(n)) => Some(n.to_string()),
            Self::Plain(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Plain(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Plain(Value::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Plain(Value::Number(n)) => n.as_u64(),
            _ => None,
        }
    }

    /// True for anything fields can be read from.
    pub fn is_object_like(&self) -> bool {
        matches!(
            self,
            Self::Plain(Value::Object(_)) | Self::Wrapped(_) | Self::Map(_)
        )
    }

    /// Read the node as a keyed collection.
    ///
    /// `Ok(None)` when the node is not map-like.
    pub fn entries(&self) -> Result<Option<Vec<(String, Node)>>, ExtractionError> {
        match self {
            Self::Plain(Value::Object(map)) => Ok(Some(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::Plain(v.clone())))
                    .collect(),
            )),
            Self::Map(entries) => Ok(Some(entries.clone())),
            Self::Wrapped(w) => {
                let names = w.member_names();
                if names.is_empty() {
                    return Ok(w.raw_json().and_then(|raw| Self::Plain(raw.clone()).entries().ok().flatten()));
                }
                let mut entries = Vec::with_capacity(names.len());
                for name in names {
                    if let Some(node) = self.resolve(&name)? {
                        entries.push((name, node));
                    }
                }
                Ok(Some(entries))
            }
            Self::Plain(_) | Self::List(_) => Ok(None),
        }
    }

    /// Read the node as an ordered collection.
    ///
    /// Keyed collections yield their values. `Ok(None)` when not list-like.
    pub fn elements(&self) -> Result<Option<Vec<Node>>, ExtractionError> {
        match self {
            Self::Plain(Value::Array(items)) => {
                Ok(Some(items.iter().cloned().map(Self::Plain).collect()))
            }
            Self::List(items) => Ok(Some(items.clone())),
            Self::Map(entries) => Ok(Some(entries.iter().map(|(_, n)| n.clone()).collect())),
            Self::Wrapped(w) => match w.raw_json() {
                Some(Value::Array(items)) => {
                    Ok(Some(items.iter().cloned().map(Self::Plain).collect()))
                }
                _ => Ok(None),
            },
            Self::Plain(_) => Ok(None),
        }
    }

    /// The raw payload behind the node: the value itself for plain data, the
    /// wrapper's raw JSON for accessor objects.
    pub fn raw(&self) -> Option<Value> {
        match self {
            Self::Plain(v) => Some(v.clone()),
            Self::Wrapped(w) => w.raw_json().cloned(),
            Self::List(_) | Self::Map(_) => Some(self.to_json()),
        }
    }

    /// Materialize the node as plain JSON.
    ///
    /// Wrapped objects without a raw payload are rebuilt from their members;
    /// members whose accessor fails are left out.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Plain(v) => v.clone(),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, n)| (k.clone(), n.to_json()))
                    .collect::<Map<_, _>>(),
            ),
            Self::Wrapped(w) => {
                if let Some(raw) = w.raw_json() {
                    return raw.clone();
                }
                let mut obj = Map::new();
                for name in w.member_names() {
                    if let Ok(Some(node)) = self.resolve(&name) {
                        obj.insert(name, node.to_json());
                    }
                }
                Value::Object(obj)
            }
        }
    }
}

/// Resolve a field by name.
///
/// `Ok(None)` means the field is absent. An error means the field exists
/// but could not be produced (a failing accessor).
pub trait FieldResolver {
    fn resolve(&self, name: &str) -> Result<Option<Node>, ExtractionError>;
}

impl FieldResolver for Node {
    fn resolve(&self, name: &str) -> Result<Option<Node>, ExtractionError> {
        match self {
            Self::Plain(Value::Object(map)) => Ok(map.get(name).cloned().map(Self::Plain)),
            Self::Map(entries) => Ok(entries
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, n)| n.clone())),
            Self::Wrapped(w) => match w.member(name) {
                Some(Member::Accessor(f)) => f().map(Some),
                Some(Member::Value(node)) => Ok(Some(node)),
                None => Ok(None),
            },
            Self::Plain(_) | Self::List(_) => Ok(None),
        }
    }
}

/// Outcome of [`resolve_or_default`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<T> {
    /// The field was present and had the expected shape.
    Found(T),
    /// The field was absent, mis-shaped or failed; the default stands in.
    Defaulted(T),
}

impl<T> Resolved<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Found(v) | Self::Defaulted(v) => v,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(v) => Some(v),
            Self::Defaulted(_) => None,
        }
    }
}

/// Read `field` from `source` and convert it with `extract`, falling back to
/// `T::default()` when the field is absent, null, mis-shaped or its accessor
/// fails. Failures are logged, never propagated.
pub fn resolve_or_default<R, T, F>(source: &R, field: &str, extract: F) -> Resolved<T>
where
    R: FieldResolver + ?Sized,
    T: Default,
    F: FnOnce(Node) -> Option<T>,
{
    match source.resolve(field) {
        Ok(Some(node)) if !node.is_null() => match extract(node) {
            Some(value) => Resolved::Found(value),
            None => Resolved::Defaulted(T::default()),
        },
        Ok(_) => Resolved::Defaulted(T::default()),
        Err(err) => {
            log_extraction_failure!(field = field, error = %err, "field unavailable, using default");
            Resolved::Defaulted(T::default())
        }
    }
}

/// Unwrap a collection read, logging and discarding a failure.
pub(crate) fn recover<T>(field: &str, result: Result<Option<T>, ExtractionError>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(err) => {
            log_extraction_failure!(field = field, error = %err, "collection unavailable");
            None
        }
    }
}

/// Typed reads on top of [`resolve_or_default`].
pub trait FieldResolverExt: FieldResolver {
    /// The field's node, when present and not null.
    fn field_node(&self, name: &str) -> Option<Node> {
        resolve_or_default(self, name, |n| Some(Some(n))).into_inner()
    }

    fn str_field(&self, name: &str) -> Option<String> {
        resolve_or_default(self, name, |n| n.as_str().map(str::to_string)).found()
    }

    /// Like [`str_field`](Self::str_field) but accepts numbers and booleans.
    fn text_field(&self, name: &str) -> Option<String> {
        resolve_or_default(self, name, |n| n.to_text()).found()
    }

    fn bool_field(&self, name: &str) -> Option<bool> {
        resolve_or_default(self, name, |n| n.as_bool()).found()
    }

    fn f64_field(&self, name: &str) -> Option<f64> {
        resolve_or_default(self, name, |n| n.as_f64()).found()
    }

    fn u64_field(&self, name: &str) -> Option<u64> {
        resolve_or_default(self, name, |n| n.as_u64()).found()
    }

    /// The field materialized as plain JSON.
    fn json_field(&self, name: &str) -> Option<Value> {
        resolve_or_default(self, name, |n| Some(n.to_json())).found()
    }

    fn list_field(&self, name: &str) -> Vec<Node> {
        resolve_or_default(self, name, |n| recover(name, n.elements())).into_inner()
    }

    fn entries_field(&self, name: &str) -> Vec<(String, Node)> {
        resolve_or_default(self, name, |n| recover(name, n.entries())).into_inner()
    }

    /// A list of strings; non-string entries are skipped.
    fn string_list_field(&self, name: &str) -> Vec<String> {
        self.list_field(name)
            .iter()
            .filter_map(|n| n.as_str().map(str::to_string))
            .collect()
    }
}

impl<R: FieldResolver + ?Sized> FieldResolverExt for R {}

/// A hand-assembled accessor object.
///
/// Protocol-library integrations build their object graphs from these;
/// [`WrappedObject::mirror`] turns plain data into the equivalent accessor
/// form.
#[derive(Clone, Default)]
pub struct WrappedObject {
    members: Vec<(String, Member)>,
    raw: Option<Value>,
}

impl WrappedObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the raw payload the object was built from.
    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Add a zero-argument accessor member.
    pub fn with_accessor<F>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn() -> Result<Node, ExtractionError> + Send + Sync + 'static,
    {
        self.members
            .push((name.into(), Member::Accessor(Arc::new(accessor))));
        self
    }

    /// Add a plain value member.
    pub fn with_value(mut self, name: impl Into<String>, node: impl Into<Node>) -> Self {
        self.members.push((name.into(), Member::Value(node.into())));
        self
    }

    pub fn into_node(self) -> Node {
        Node::wrapped(self)
    }

    /// Mirror plain data as accessor objects: every object becomes a wrapper
    /// whose fields are accessors, every array a [`Node::List`].
    pub fn mirror(value: &Value) -> Node {
        match value {
            Value::Object(map) => {
                let mut obj = Self::new().with_raw(value.clone());
                for (key, child) in map {
                    let mirrored = Self::mirror(child);
                    obj = obj.with_accessor(key.clone(), move || Ok(mirrored.clone()));
                }
                obj.into_node()
            }
            Value::Array(items) => Node::List(items.iter().map(Self::mirror).collect()),
            other => Node::Plain(other.clone()),
        }
    }
}

impl Accessor for WrappedObject {
    fn member(&self, name: &str) -> Option<Member> {
        self.members
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, m)| m.clone())
    }

    fn member_names(&self) -> Vec<String> {
        self.members.iter().map(|(n, _)| n.clone()).collect()
    }

    fn raw_json(&self) -> Option<&Value> {
        self.raw.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn failing(field: &'static str) -> impl Fn() -> Result<Node, ExtractionError> {
        move || Err(ExtractionError::accessor(field, "boom"))
    }

    #[test]
    fn plain_and_accessor_reads_agree() {
        let plain = Node::Plain(json!({"type": "string", "minLength": 2}));
        let wrapped = WrappedObject::new()
            .with_accessor("type", || Ok(Node::Plain(json!("string"))))
            .with_value("minLength", json!(2))
            .into_node();

        for node in [&plain, &wrapped] {
            assert_eq!(node.str_field("type").as_deref(), Some("string"));
            assert_eq!(node.u64_field("minLength"), Some(2));
            assert_eq!(node.str_field("format"), None);
        }
    }

    #[test]
    fn failing_accessor_defaults() {
        let node = WrappedObject::new()
            .with_accessor("headers", failing("headers"))
            .into_node();

        assert!(node.resolve("headers").is_err());
        let resolved = resolve_or_default(&node, "headers", |n| Some(vec![n]));
        assert!(!resolved.is_found());
        assert!(node.list_field("headers").is_empty());
        assert!(node.field_node("headers").is_none());
    }

    #[test]
    fn null_counts_as_absent_for_typed_reads() {
        let node = Node::Plain(json!({"example": null, "name": "x"}));
        assert!(node.json_field("example").is_none());
        assert!(node.resolve("example").unwrap().is_some());
        assert_eq!(node.str_field("name").as_deref(), Some("x"));
    }

    #[test]
    fn mismatched_shape_is_defaulted() {
        let node = Node::Plain(json!({"required": "id"}));
        assert!(node.string_list_field("required").is_empty());
        let resolved = resolve_or_default(&node, "required", |n| n.as_bool());
        assert_eq!(resolved, Resolved::Defaulted(false));
    }

    #[test]
    fn text_field_renders_numbers() {
        let node = Node::Plain(json!({"openapi": 3.0, "asyncapi": "2.6.0"}));
        assert_eq!(node.text_field("openapi").as_deref(), Some("3.0"));
        assert_eq!(node.text_field("asyncapi").as_deref(), Some("2.6.0"));
    }

    #[test]
    fn mirror_preserves_entries_order_and_raw() {
        let value = json!({"zeta": {"type": "string"}, "alpha": {"type": "integer"}});
        let mirrored = WrappedObject::mirror(&value);
        let keys: Vec<_> = mirrored
            .entries()
            .unwrap()
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(mirrored.raw(), Some(value.clone()));
        assert_eq!(mirrored.to_json(), value);
    }

    #[test]
    fn wrapped_without_raw_rebuilds_json_from_members() {
        let node = WrappedObject::new()
            .with_accessor("id", || Ok(Node::Plain(json!("p1"))))
            .with_accessor("broken", failing("broken"))
            .into_node();
        assert_eq!(node.to_json(), json!({"id": "p1"}));
        assert_eq!(node.raw(), None);
    }

    #[test]
    fn failing_member_poisons_entries_read() {
        let node = WrappedObject::new()
            .with_accessor("ok", || Ok(Node::Plain(json!(1))))
            .with_accessor("bad", failing("bad"))
            .into_node();
        assert!(node.entries().is_err());
    }

    #[test]
    fn collections_expose_elements() {
        let list = Node::List(vec![Node::Plain(json!(1)), Node::Plain(json!(2))]);
        assert_eq!(list.elements().unwrap().map(|v| v.len()), Some(2));
        let map = Node::Map(vec![("a".into(), Node::Plain(json!("x")))]);
        assert_eq!(map.str_field("a").as_deref(), Some("x"));
        assert_eq!(map.elements().unwrap().map(|v| v.len()), Some(1));
        assert_eq!(Node::Plain(json!("s")).elements().unwrap().map(|v| v.len()), None);
    }
}
