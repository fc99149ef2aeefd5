//! JSON Schema export for declared models.
//!
//! ```rust
//! use eki::{FieldDescriptor, MetadataStore};
//! use serde_json::json;
//!
//! let store = MetadataStore::new();
//! store
//!     .model("Login")
//!     .field(FieldDescriptor::string("user").required())
//!     .field(FieldDescriptor::int("attempts"))
//!     .register()
//!     .unwrap();
//! let schema = store.resolve_model(&"Login".into()).unwrap().json_schema();
//! assert_eq!(schema["properties"]["attempts"]["type"], json!("integer"));
//! assert_eq!(schema["required"], json!(["user"]));
//! ```

use std::collections::BTreeSet;

use serde_json::{Map, Value, json};

use crate::{ClassKey, DeclarationError, FieldType, MetadataStore, ModelMetadata};

impl ModelMetadata {
    /// An object schema for this model.  Nested models are `$ref`s into
    /// `#/definitions`.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in self.fields() {
            let mut schema = type_schema(&field.field_type);
            if let Value::Object(map) = &mut schema {
                map.insert("title".to_string(), Value::String(field.label.clone()));
            }
            properties.insert(field.name.clone(), schema);
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }
        json!({
            "type": "object",
            "title": self.class().name(),
            "properties": properties,
            "required": required,
        })
    }
}

impl MetadataStore {
    /// The schema of `class` with every model it refers to, transitively,
    /// under `definitions`.
    pub fn json_schema(&self, class: &ClassKey) -> Result<Value, DeclarationError> {
        let metadata = self.resolve_model(class)?;
        let mut schema = metadata.json_schema();
        let mut definitions = Map::new();
        let mut seen = BTreeSet::from([class.clone()]);
        let mut pending = nested_models(&metadata);
        while let Some(nested) = pending.pop() {
            if !seen.insert(nested.clone()) {
                continue;
            }
            let metadata = self.resolve_model(&nested)?;
            pending.extend(nested_models(&metadata));
            definitions.insert(nested.name().to_string(), metadata.json_schema());
        }
        if !definitions.is_empty()
            && let Value::Object(map) = &mut schema
        {
            map.insert("definitions".to_string(), Value::Object(definitions));
        }
        Ok(schema)
    }
}

fn type_schema(ty: &FieldType) -> Value {
    match ty {
        FieldType::String => json!({"type": "string"}),
        FieldType::Number => json!({"type": "number"}),
        FieldType::Int => json!({"type": "integer"}),
        FieldType::Bool => json!({"type": "boolean"}),
        FieldType::Date => json!({"type": "string", "format": "date-time"}),
        FieldType::Model(class) => json!({"$ref": format!("#/definitions/{}", class.name())}),
        FieldType::Array(inner) => json!({"type": "array", "items": type_schema(inner)}),
    }
}

fn nested_models(metadata: &ModelMetadata) -> Vec<ClassKey> {
    fn collect(ty: &FieldType, out: &mut Vec<ClassKey>) {
        match ty {
            FieldType::Model(class) => out.push(class.clone()),
            FieldType::Array(inner) => collect(inner, out),
            _ => {}
        }
    }
    let mut out = Vec::new();
    for field in metadata.fields() {
        collect(&field.field_type, &mut out);
    }
    out
}
