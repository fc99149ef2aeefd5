//! Binding request data onto model instances.
//!
//! Request values arrive in three buckets: `query`, `params` and `body`.  A
//! field with a fixed [`Source`] reads only that bucket.  Any other field
//! probes query, then params, then body, and takes the first bucket where its
//! key is present.  Presence wins even for empty strings, so a key in the
//! query string shadows the same key in the body.
//!
//! Values are coerced to the declared [`FieldType`].  A value that cannot be
//! coerced is kept as it arrived and a `cast` error is recorded against the
//! field; binding never fails on user input.
//!
//! ```rust
//! use eki::{FieldDescriptor, MetadataStore, RequestData, bind};
//! use serde_json::json;
//!
//! let store = MetadataStore::new();
//! store
//!     .model("Person")
//!     .field(FieldDescriptor::string("name"))
//!     .field(FieldDescriptor::int("age"))
//!     .register()
//!     .unwrap();
//! let data = RequestData::new().with_body("name", json!("Ada")).with_body("age", json!("37"));
//! let person = bind(&store, &"Person".into(), &data).unwrap();
//! assert_eq!(person.to_json(), json!({"name": "Ada", "age": 37}));
//! ```

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    ClassKey, DeclarationError, ErrorList, FieldType, FieldValue, MetadataStore, ModelInstance,
    ModelMetadata, ValidationError,
};

/// A request data bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// The query string.
    Query,
    /// Path parameters.
    Params,
    /// The parsed request body.
    Body,
}

impl Source {
    /// The order buckets are probed in when a field has no fixed source.
    pub const PROBE_ORDER: [Source; 3] = [Source::Query, Source::Params, Source::Body];

    /// The bucket name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Params => "params",
            Self::Body => "body",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unrecognized bucket name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown source {0:?}, expected query, params or body")]
pub struct UnknownSource(pub String);

impl FromStr for Source {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(Self::Query),
            "params" => Ok(Self::Params),
            "body" => Ok(Self::Body),
            _ => Err(UnknownSource(s.to_string())),
        }
    }
}

///////////////////////////////////////////// RequestData //////////////////////////////////////////////

/// The three buckets of request values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestData {
    /// Query string values.  Repeated keys become arrays.
    pub query: Map<String, Value>,
    /// Path parameters.
    pub params: Map<String, Value>,
    /// Body values.
    pub body: Map<String, Value>,
}

/// A body that claimed to be JSON or form data but did not parse.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// The body was not valid JSON.
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    /// The body exceeded the configured limit or could not be read.
    #[error("unreadable body: {0}")]
    Unreadable(String),
}

impl RequestData {
    /// Empty buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buckets with only a body.
    pub fn from_body(body: Map<String, Value>) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    /// Adds a query value.
    pub fn with_query(mut self, key: impl Into<String>, value: Value) -> Self {
        self.query.insert(key.into(), value);
        self
    }

    /// Adds a path parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Adds a body value.
    pub fn with_body(mut self, key: impl Into<String>, value: Value) -> Self {
        self.body.insert(key.into(), value);
        self
    }

    /// One bucket.
    pub fn bucket(&self, source: Source) -> &Map<String, Value> {
        match source {
            Source::Query => &self.query,
            Source::Params => &self.params,
            Source::Body => &self.body,
        }
    }

    /// Looks `key` up in `source`, or probes every bucket when `source` is
    /// `None`.
    pub fn lookup(&self, key: &str, source: Option<Source>) -> Option<&Value> {
        match source {
            Some(source) => self.bucket(source).get(key),
            None => Source::PROBE_ORDER
                .iter()
                .find_map(|source| self.bucket(*source).get(key)),
        }
    }

    /// Parses `application/x-www-form-urlencoded` text such as a query string.
    /// Repeated keys collect into an array.
    pub fn parse_form(input: &[u8]) -> Map<String, Value> {
        let mut map = Map::new();
        for (key, value) in url::form_urlencoded::parse(input) {
            let value = Value::String(value.into_owned());
            match map.get_mut(key.as_ref()) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    map.insert(key.into_owned(), value);
                }
            }
        }
        map
    }

    /// Parses a request body according to its content type.  JSON objects
    /// and form data fill the bucket; anything else leaves it empty.
    pub fn parse_body(content_type: Option<&str>, bytes: &[u8]) -> Result<Map<String, Value>, BodyError> {
        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();
        if bytes.is_empty() {
            return Ok(Map::new());
        }
        if mime == "application/json" || mime.ends_with("+json") {
            return match serde_json::from_slice::<Value>(bytes)? {
                Value::Object(map) => Ok(map),
                _ => Ok(Map::new()),
            };
        }
        if mime == "application/x-www-form-urlencoded" {
            return Ok(Self::parse_form(bytes));
        }
        Ok(Map::new())
    }
}

/////////////////////////////////////////////// binding ////////////////////////////////////////////////

/// Binds `data` onto a fresh instance of `class`.
pub fn bind(
    store: &MetadataStore,
    class: &ClassKey,
    data: &RequestData,
) -> Result<ModelInstance, DeclarationError> {
    let metadata = store.resolve_model(class)?;
    bind_metadata(store, metadata, data)
}

/// Binds `data` onto a fresh instance described by `metadata`.
pub fn bind_metadata(
    store: &MetadataStore,
    metadata: Arc<ModelMetadata>,
    data: &RequestData,
) -> Result<ModelInstance, DeclarationError> {
    let mut model = ModelInstance::new(Arc::clone(&metadata));
    for field in metadata.fields() {
        let Some(raw) = data.lookup(field.lookup_key(), field.source) else {
            continue;
        };
        if raw.is_null() {
            model.set(field.name.clone(), FieldValue::Null);
            continue;
        }
        let mut nested = ErrorList::new();
        match coerce(store, raw, &field.field_type, &field.name, &mut nested)? {
            Some(value) => model.set(field.name.clone(), value),
            None => {
                model.set(field.name.clone(), FieldValue::from_json(raw));
                model.record_binding_error(ValidationError::for_property(
                    "cast",
                    field.name.clone(),
                    format!("{} must be a valid {}", field.label, field.field_type),
                ));
            }
        }
        for error in nested.iter() {
            model.record_binding_error(error.clone());
        }
    }
    Ok(model)
}

/// Coerces `raw` to `ty`.  `Ok(None)` means the value does not fit.  Errors
/// from nested models land in `nested`, scoped under `path`.
fn coerce(
    store: &MetadataStore,
    raw: &Value,
    ty: &FieldType,
    path: &str,
    nested: &mut ErrorList,
) -> Result<Option<FieldValue>, DeclarationError> {
    let value = match ty {
        FieldType::String => raw.as_str().map(|s| FieldValue::String(s.to_string())),
        FieldType::Int => coerce_int(raw).map(FieldValue::Int),
        FieldType::Number => coerce_number(raw).map(FieldValue::Number),
        FieldType::Bool => coerce_bool(raw).map(FieldValue::Bool),
        FieldType::Date => raw.as_str().and_then(parse_date).map(FieldValue::Date),
        FieldType::Model(class) => {
            let metadata = store.resolve_model(class)?;
            let Value::Object(map) = raw else {
                return Ok(None);
            };
            let instance = bind_metadata(store, metadata, &RequestData::from_body(map.clone()))?;
            for error in instance.binding_errors().iter() {
                nested.add(error.clone().nested_under(path));
            }
            Some(FieldValue::Model(Box::new(instance)))
        }
        FieldType::Array(inner) => {
            let items = match raw {
                Value::Array(items) => items.as_slice(),
                single => std::slice::from_ref(single),
            };
            let mut values = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                if item.is_null() {
                    values.push(FieldValue::Null);
                    continue;
                }
                let item_path = format!("{path}[{idx}]");
                match coerce(store, item, inner, &item_path, nested)? {
                    Some(value) => values.push(value),
                    None => return Ok(None),
                }
            }
            Some(FieldValue::List(values))
        }
    };
    Ok(value)
}

fn coerce_int(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn coerce_bool(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s == "true" => Some(true),
        Value::String(s) if s == "false" => Some(false),
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}
