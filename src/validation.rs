//! The validation engine.
//!
//! A [`ValidationSchema`] is the ordered list of validators that apply to a
//! model class.  Validators are bound either to one field or to the model as a
//! whole, carry the configuration they were registered with, and never mutate
//! the instance they inspect.
//!
//! Most validators are written as a [`Rule`]: a piece of configuration that
//! knows how to check one property.  [`ValidationBuilder::check`] binds a rule
//! to a field (or to every field with `"*"`), and [`FieldValidator`] is the
//! bound form stored in the schema.

use std::fmt;
use std::sync::Arc;

use crate::validators::{ModelWith, With};
use crate::{ClassKey, DeclarationError, ErrorList, ModelError, ModelInstance};

/// A bound unit of validation logic.
pub trait Validator: fmt::Debug + Send + Sync {
    /// The kind tag reported on errors, e.g. `required`.
    fn name(&self) -> &str;
    /// The field this validator is bound to, or `None` at model level.
    fn property(&self) -> Option<&str>;
    /// Inspects `model`, appending any failures to `errors`.
    fn validate(&self, model: &ModelInstance, errors: &mut ErrorList) -> Result<(), ModelError>;
}

/// Validator configuration that can be bound to a property.
pub trait Rule: fmt::Debug + Clone + Send + Sync + 'static {
    /// The kind tag of this rule.
    fn name(&self) -> &'static str;
    /// Checks `property` of `model`.
    fn check(
        &self,
        model: &ModelInstance,
        property: &str,
        errors: &mut ErrorList,
    ) -> Result<(), ModelError>;
}

/// A [`Rule`] bound to one property.
#[derive(Debug, Clone)]
pub struct FieldValidator<R> {
    property: String,
    rule: R,
}

impl<R: Rule> FieldValidator<R> {
    /// Binds `rule` to `property`.
    pub fn new(property: impl Into<String>, rule: R) -> Self {
        Self {
            property: property.into(),
            rule,
        }
    }

    /// The bound rule.
    pub fn rule(&self) -> &R {
        &self.rule
    }
}

impl<R: Rule> Validator for FieldValidator<R> {
    fn name(&self) -> &str {
        self.rule.name()
    }

    fn property(&self) -> Option<&str> {
        Some(&self.property)
    }

    fn validate(&self, model: &ModelInstance, errors: &mut ErrorList) -> Result<(), ModelError> {
        self.rule.check(model, &self.property, errors)
    }
}

/// Binds `rule` to `property` and erases its type.
pub fn bind_rule<R: Rule>(property: &str, rule: R) -> Arc<dyn Validator> {
    Arc::new(FieldValidator::new(property, rule))
}

/////////////////////////////////////////// ValidationSchema ///////////////////////////////////////////

/// The ordered validators of one model class.
#[derive(Debug, Clone, Default)]
pub struct ValidationSchema {
    validators: Vec<Arc<dyn Validator>>,
}

impl ValidationSchema {
    /// An empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one validator.
    pub fn push(&mut self, validator: Arc<dyn Validator>) {
        self.validators.push(validator);
    }

    /// Number of validators.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// True when there are no validators.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Validators in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Validator>> {
        self.validators.iter()
    }

    /// Validators bound to `property`.
    pub fn for_property<'a>(&'a self, property: &'a str) -> impl Iterator<Item = &'a Arc<dyn Validator>> {
        self.validators
            .iter()
            .filter(move |v| v.property() == Some(property))
    }

    /// Runs every validator in order.  Stops at the first [`ModelError`].
    pub fn run(&self, model: &ModelInstance, errors: &mut ErrorList) -> Result<(), ModelError> {
        for validator in self.validators.iter() {
            validator.validate(model, errors)?;
        }
        Ok(())
    }
}

impl Extend<Arc<dyn Validator>> for ValidationSchema {
    fn extend<T: IntoIterator<Item = Arc<dyn Validator>>>(&mut self, iter: T) {
        self.validators.extend(iter);
    }
}

/////////////////////////////////////////// ValidationBuilder //////////////////////////////////////////

/// Collects validators for a model class.
///
/// ```rust
/// use eki::{FieldDescriptor, MetadataStore};
/// use eki::validators::{Format, format_of, length_of, required};
///
/// let store = MetadataStore::new();
/// store
///     .model("SignUp")
///     .field(FieldDescriptor::string("email"))
///     .field(FieldDescriptor::string("name"))
///     .validation(|v| {
///         v.check("*", required());
///         v.check("email", format_of(Format::Email));
///         v.check("name", length_of().max(40));
///     })
///     .register()
///     .unwrap();
/// let metadata = store.resolve_model(&"SignUp".into()).unwrap();
/// assert_eq!(metadata.schema().len(), 4);
/// ```
pub struct ValidationBuilder {
    class: ClassKey,
    fields: Vec<String>,
    validators: Vec<Arc<dyn Validator>>,
    error: Option<DeclarationError>,
}

impl ValidationBuilder {
    pub(crate) fn new(class: ClassKey, fields: Vec<String>) -> Self {
        Self {
            class,
            fields,
            validators: Vec::new(),
            error: None,
        }
    }

    /// The fields visible to this model, inherited ones included.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Binds `rule` to `target`, a field name or `"*"` for every field.
    pub fn check<R: Rule>(&mut self, target: &str, rule: R) -> &mut Self {
        if target == "*" {
            for field in self.fields.iter() {
                self.validators.push(bind_rule(field, rule.clone()));
            }
        } else if self.fields.iter().any(|f| f == target) {
            self.validators.push(bind_rule(target, rule));
        } else if self.error.is_none() {
            self.error = Some(DeclarationError::UnknownValidationTarget {
                class: self.class.clone(),
                property: target.to_string(),
            });
        }
        self
    }

    /// Binds `rule` to each named field.
    pub fn check_each<R: Rule>(&mut self, targets: &[&str], rule: R) -> &mut Self {
        for target in targets {
            self.check(target, rule.clone());
        }
        self
    }

    /// Adds a model-level callback.
    pub fn check_model(&mut self, rule: With) -> &mut Self {
        self.validators.push(Arc::new(ModelWith::new(rule)));
        self
    }

    /// Adds an already bound validator.
    pub fn push(&mut self, validator: Arc<dyn Validator>) -> &mut Self {
        self.validators.push(validator);
        self
    }

    pub(crate) fn finish(self) -> Result<Vec<Arc<dyn Validator>>, DeclarationError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.validators),
        }
    }
}
