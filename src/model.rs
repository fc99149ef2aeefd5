//! Bound model instances.
//!
//! A [`ModelInstance`] holds the values bound for one model class, the errors
//! recorded while binding, and the outcome of the last validation run.
//! Validation is lazy: [`ModelInstance::is_valid`] validates on first use, and
//! the outcome sticks until [`ModelInstance::clear`] is called.
//!
//! ```rust
//! use eki::{FieldDescriptor, MetadataStore, ModelInstance};
//! use eki::validators::required;
//!
//! let store = MetadataStore::new();
//! store
//!     .model("Login")
//!     .field(FieldDescriptor::string("user").validate(required()))
//!     .register()
//!     .unwrap();
//! let mut login = ModelInstance::new(store.resolve_model(&"Login".into()).unwrap());
//! assert!(!login.is_valid().unwrap());
//! assert_eq!(login.errors().messages(), ["User is required"]);
//!
//! login.set("user", "ada");
//! login.clear();
//! assert!(login.is_valid().unwrap());
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde_json::{Map, Value};

use crate::{
    ClassKey, DeclarationError, ErrorList, FieldValue, HasClass, ModelError, ModelMetadata,
    ValidationError,
};

/// Values bound for one model class, plus their errors.
#[derive(Debug, Clone)]
pub struct ModelInstance {
    metadata: Arc<ModelMetadata>,
    values: BTreeMap<String, FieldValue>,
    binding_errors: ErrorList,
    errors: ErrorList,
    validated: bool,
}

impl ModelInstance {
    /// An empty instance: every field undefined.
    pub fn new(metadata: Arc<ModelMetadata>) -> Self {
        Self {
            metadata,
            values: BTreeMap::new(),
            binding_errors: ErrorList::new(),
            errors: ErrorList::new(),
            validated: false,
        }
    }

    /// The resolved metadata of this instance's class.
    pub fn metadata(&self) -> &Arc<ModelMetadata> {
        &self.metadata
    }

    /// The value of `property`, or `None` when it is undefined.
    pub fn get(&self, property: &str) -> Option<&FieldValue> {
        self.values.get(property)
    }

    /// Sets `property`.  Does not reset the validation outcome.
    pub fn set(&mut self, property: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(property.into(), value.into());
    }

    /// Makes `property` undefined again.
    pub fn unset(&mut self, property: &str) -> Option<FieldValue> {
        self.values.remove(property)
    }

    /// Defined values, ordered by field name.
    pub fn values(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The label of a declared field.
    pub fn label(&self, property: &str) -> Result<&str, ModelError> {
        self.metadata
            .field(property)
            .map(|field| field.label.as_str())
            .ok_or_else(|| {
                DeclarationError::MissingField {
                    class: self.metadata.class().clone(),
                    property: property.to_string(),
                }
                .into()
            })
    }

    /// Errors recorded while binding.  They are part of every validation
    /// outcome.
    pub fn binding_errors(&self) -> &ErrorList {
        &self.binding_errors
    }

    pub(crate) fn record_binding_error(&mut self, error: ValidationError) {
        self.binding_errors.add(error);
    }

    /// The errors of the last validation run.  Empty before validation.
    pub fn errors(&self) -> &ErrorList {
        &self.errors
    }

    /// True once [`validate`](Self::validate) has run and until
    /// [`clear`](Self::clear).
    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// Runs the class's validation schema.
    ///
    /// The error list is rebuilt from scratch on every call: binding errors
    /// first, then whatever the validators report.  Returns true when there
    /// are no errors.
    pub fn validate(&mut self) -> Result<bool, ModelError> {
        self.validated = false;
        self.errors.clear();
        let mut found = self.binding_errors.clone();
        let metadata = Arc::clone(&self.metadata);
        metadata.schema().run(self, &mut found)?;
        self.errors = found;
        self.validated = true;
        Ok(self.errors.is_empty())
    }

    /// Validates on first use, then reports the stored outcome.
    pub fn is_valid(&mut self) -> Result<bool, ModelError> {
        if !self.validated {
            return self.validate();
        }
        Ok(self.errors.is_empty())
    }

    /// The opposite of [`is_valid`](Self::is_valid).
    pub fn is_invalid(&mut self) -> Result<bool, ModelError> {
        self.is_valid().map(|valid| !valid)
    }

    /// Forgets the last validation outcome.  Binding errors remain.
    pub fn clear(&mut self) {
        self.validated = false;
        self.errors.clear();
    }

    /// Defined values as a JSON object.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(map)
    }

    /// Deserializes the defined values into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_json())
    }
}

impl HasClass for ModelInstance {
    fn class_key(&self) -> &ClassKey {
        self.metadata.class()
    }
}

impl PartialEq for ModelInstance {
    fn eq(&self, other: &Self) -> bool {
        self.metadata.class() == other.metadata.class() && self.values == other.values
    }
}

impl Serialize for ModelInstance {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (key, value) in self.values.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
