use std::fmt;
use std::sync::Arc;

use crate::{ErrorList, ModelError, ModelInstance, Rule, Validator};

/// The callback behind a [`With`] rule.  The property is `None` when the rule
/// runs at model level.
pub type WithCallback = Arc<dyn Fn(&ModelInstance, Option<&str>, &mut ErrorList) + Send + Sync>;

/// Runs a caller-supplied callback.
#[derive(Clone)]
pub struct With {
    callback: WithCallback,
}

/// A [`With`] rule around `callback`.
///
/// ```rust
/// use eki::ValidationError;
/// use eki::validators::with;
///
/// let not_admin = with(|model, property, errors| {
///     let property = property.unwrap_or("name");
///     if model.get(property).and_then(|v| v.as_str()) == Some("admin") {
///         errors.add(ValidationError::for_property("with", property, "reserved name"));
///     }
/// });
/// # let _ = not_admin;
/// ```
pub fn with<F>(callback: F) -> With
where
    F: Fn(&ModelInstance, Option<&str>, &mut ErrorList) + Send + Sync + 'static,
{
    With {
        callback: Arc::new(callback),
    }
}

impl With {
    pub(crate) fn call(&self, model: &ModelInstance, property: Option<&str>, errors: &mut ErrorList) {
        (self.callback)(model, property, errors)
    }
}

impl fmt::Debug for With {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("With").finish_non_exhaustive()
    }
}

impl Rule for With {
    fn name(&self) -> &'static str {
        "with"
    }

    fn check(
        &self,
        model: &ModelInstance,
        property: &str,
        errors: &mut ErrorList,
    ) -> Result<(), ModelError> {
        self.call(model, Some(property), errors);
        Ok(())
    }
}

/// A [`With`] rule bound to the model as a whole.
#[derive(Debug, Clone)]
pub(crate) struct ModelWith {
    rule: With,
}

impl ModelWith {
    pub(crate) fn new(rule: With) -> Self {
        Self { rule }
    }
}

impl Validator for ModelWith {
    fn name(&self) -> &str {
        self.rule.name()
    }

    fn property(&self) -> Option<&str> {
        None
    }

    fn validate(&self, model: &ModelInstance, errors: &mut ErrorList) -> Result<(), ModelError> {
        self.rule.call(model, None, errors);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValidationError;
    use crate::test_utils::test_helpers::instance_with;

    #[test]
    fn field_and_model_level_callbacks() {
        let seen = with(|model, property, errors| {
            let message = format!("{:?} {}", property, model.get("name").is_some());
            match property {
                Some(property) => errors.add(ValidationError::for_property("with", property, message)),
                None => errors.add(ValidationError::new("with", message)),
            }
        });
        let model = instance_with(&[("name", "a".into())]);
        let mut errors = ErrorList::new();
        seen.check(&model, "name", &mut errors).unwrap();
        ModelWith::new(seen).validate(&model, &mut errors).unwrap();
        assert_eq!(errors.messages(), ["None true", "Some(\"name\") true"]);
    }
}
