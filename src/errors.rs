//! Error types for eki.
//!
//! Two families live here.  [`ValidationError`] and [`ErrorList`] are data:
//! the outcome of binding and validating a model, never returned as `Err`.
//! The `*Error` enums are failures: declaration mistakes, validator misuse,
//! dispatch and rendering faults, and configuration problems.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ClassKey;

/////////////////////////////////////////// ValidationError ///////////////////////////////////////////

/// A single binding or validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// The validator kind that produced the error, e.g. `required` or `cast`.
    pub name: String,
    /// The field the error belongs to; `None` for model-level errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    /// Human readable message.
    pub message: String,
}

impl ValidationError {
    /// A model-level error.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property: None,
            message: message.into(),
        }
    }

    /// An error scoped to `property`.
    pub fn for_property(
        name: impl Into<String>,
        property: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            property: Some(property.into()),
            message: message.into(),
        }
    }

    /// Moves the error under `prefix`, turning `street` into `address.street`.
    /// Model-level errors land on `prefix` itself.
    pub fn nested_under(mut self, prefix: &str) -> Self {
        self.property = Some(match self.property.take() {
            Some(property) => format!("{prefix}.{property}"),
            None => prefix.to_string(),
        });
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

////////////////////////////////////////////// ErrorList //////////////////////////////////////////////

/// Model-level errors plus per-field errors, grouped by field.
///
/// Fields are kept in the order their first error arrived, so
/// [`ErrorList::messages`] reads the way the errors were reported.
///
/// ```rust
/// use eki::{ErrorList, ValidationError};
///
/// let mut errors = ErrorList::new();
/// errors.add(ValidationError::new("with", "account is locked"));
/// errors.add(ValidationError::for_property("required", "email", "Email is required"));
/// assert_eq!(errors.count(), 2);
/// assert!(!errors.valid(Some("email")));
/// assert!(errors.valid(Some("name")));
/// assert_eq!(errors.messages(), ["account is locked", "Email is required"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorList {
    model: Vec<ValidationError>,
    fields: Vec<(String, Vec<ValidationError>)>,
}

impl ErrorList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Files `error` under its property, or under the model when it has none.
    pub fn add(&mut self, error: ValidationError) {
        let Some(property) = error.property.as_deref() else {
            self.model.push(error);
            return;
        };
        match self.fields.iter_mut().find(|(name, _)| name == property) {
            Some((_, errors)) => errors.push(error),
            None => {
                let name = property.to_string();
                self.fields.push((name, vec![error]));
            }
        }
    }

    /// Folds every error of `other` into this list, keeping its grouping.
    pub fn merge(&mut self, other: &ErrorList) {
        self.model.extend(other.model.iter().cloned());
        for (_, errors) in other.fields.iter() {
            for error in errors {
                self.add(error.clone());
            }
        }
    }

    /// Every message: model-level first, then each field in order.
    pub fn messages(&self) -> Vec<&str> {
        self.model
            .iter()
            .chain(self.fields.iter().flat_map(|(_, errors)| errors.iter()))
            .map(|e| e.message.as_str())
            .collect()
    }

    /// Messages for one field, or for the model when `property` is `None`.
    pub fn messages_for(&self, property: Option<&str>) -> Vec<&str> {
        self.get(property).iter().map(|e| e.message.as_str()).collect()
    }

    /// Errors for one field, or for the model when `property` is `None`.
    pub fn get(&self, property: Option<&str>) -> &[ValidationError] {
        match property {
            None => &self.model,
            Some(property) => self
                .fields
                .iter()
                .find(|(name, _)| name == property)
                .map(|(_, errors)| errors.as_slice())
                .unwrap_or(&[]),
        }
    }

    /// True when the named bucket holds no errors.
    pub fn valid(&self, property: Option<&str>) -> bool {
        self.get(property).is_empty()
    }

    /// Model-level plus field errors.
    pub fn count(&self) -> usize {
        self.model.len() + self.fields.iter().map(|(_, e)| e.len()).sum::<usize>()
    }

    /// True when there are no errors at all.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Drops every error.
    pub fn clear(&mut self) {
        self.model.clear();
        self.fields.clear();
    }

    /// Fields with errors, in the order their first error arrived.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &[ValidationError])> {
        self.fields.iter().map(|(n, e)| (n.as_str(), e.as_slice()))
    }

    /// Every error, model-level first.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.model
            .iter()
            .chain(self.fields.iter().flat_map(|(_, errors)| errors.iter()))
    }

    /// A JSON rendering suitable for handing to a view:
    /// `{"model": [..messages], "fields": {"name": [..messages]}}`.
    pub fn to_json(&self) -> Value {
        let mut fields = Map::new();
        for (name, errors) in self.fields.iter() {
            let messages = errors.iter().map(|e| Value::from(e.message.clone())).collect();
            fields.insert(name.clone(), Value::Array(messages));
        }
        serde_json::json!({
            "model": self.messages_for(None),
            "fields": fields,
        })
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a ValidationError;
    type IntoIter = Box<dyn Iterator<Item = &'a ValidationError> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/////////////////////////////////////////////// failures ///////////////////////////////////////////////

/// Mistakes in declarations, reported when a class is declared, resolved or
/// registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeclarationError {
    /// No model declaration exists anywhere in the class chain.
    #[error("{class} is not a declared model")]
    MissingModel {
        /// The class that was looked up.
        class: ClassKey,
    },
    /// The controller was never declared.
    #[error("{class} is not a declared controller")]
    MissingController {
        /// The class that was looked up.
        class: ClassKey,
    },
    /// The model has no field with this name.
    #[error("{class} has no declared field {property}")]
    MissingField {
        /// The model class.
        class: ClassKey,
        /// The missing field.
        property: String,
    },
    /// The class metadata was already resolved and can no longer change.
    #[error("{class} was already resolved and is sealed against further declarations")]
    Sealed {
        /// The sealed class.
        class: ClassKey,
    },
    /// The class was declared twice with different parents.
    #[error("{class} extends {existing}, cannot also extend {requested}")]
    ParentConflict {
        /// The class being declared.
        class: ClassKey,
        /// The parent it was first declared with.
        existing: ClassKey,
        /// The parent requested now.
        requested: ClassKey,
    },
    /// The parent chain would loop back to the class.
    #[error("{class} would inherit from itself")]
    InheritanceCycle {
        /// The class being declared.
        class: ClassKey,
    },
    /// Two actions map onto the same method and path.
    #[error("{method} {path} is claimed by both {first} and {second}")]
    DuplicateRoute {
        /// The HTTP method.
        method: String,
        /// The normalized path.
        path: String,
        /// `Controller#action` registered first.
        first: String,
        /// `Controller#action` registered second.
        second: String,
    },
    /// A controller was declared twice.
    #[error("controller {class} is already declared")]
    DuplicateController {
        /// The controller class.
        class: ClassKey,
    },
    /// An action named twice on one controller.
    #[error("{class} declares action {action} twice")]
    DuplicateAction {
        /// The controller class.
        class: ClassKey,
        /// The action name.
        action: String,
    },
    /// A validation rule names a field the model does not declare.
    #[error("validation for {class} targets undeclared field {property}")]
    UnknownValidationTarget {
        /// The model class.
        class: ClassKey,
        /// The field named by the rule.
        property: String,
    },
}

/// Failures while validating a model instance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A validator was applied to a value it cannot handle.
    #[error("{validator} cannot validate {property}: {reason}")]
    ValidatorMisuse {
        /// Validator kind.
        validator: String,
        /// The field being validated.
        property: String,
        /// What was wrong.
        reason: String,
    },
    /// Metadata needed by a validator is missing.
    #[error(transparent)]
    Declaration(#[from] DeclarationError),
}

/// Failures while rendering a view.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No renderer knows the view.
    #[error("unknown view {0}")]
    UnknownView(String),
    /// No renderer is configured for the application.
    #[error("no view renderer configured (view {0})")]
    NotConfigured(String),
    /// The view data did not have the expected shape.
    #[error("invalid data for view {view}: {reason}")]
    InvalidData {
        /// The view name.
        view: String,
        /// What was wrong.
        reason: String,
    },
    /// Anything else the renderer reports.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures loading a [`FrameworkConfig`](crate::FrameworkConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// The configuration path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The YAML did not parse.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yml::Error),
    /// The values parsed but are unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
