use crate::value::is_blank;
use crate::{ErrorList, FieldValue, ModelError, ModelInstance, Rule, ValidationError};

/// Fails when a field is undefined or null.
#[derive(Debug, Clone, Default)]
pub struct Required {
    reject_blank: bool,
}

/// A [`Required`] rule that accepts the empty string.
pub fn required() -> Required {
    Required::default()
}

/// A [`Required`] rule that also rejects the empty string.
pub fn presence() -> Required {
    required().reject_blank()
}

impl Required {
    /// Also fail on the empty string.
    pub fn reject_blank(mut self) -> Self {
        self.reject_blank = true;
        self
    }
}

impl Rule for Required {
    fn name(&self) -> &'static str {
        "required"
    }

    fn check(
        &self,
        model: &ModelInstance,
        property: &str,
        errors: &mut ErrorList,
    ) -> Result<(), ModelError> {
        let value = model.get(property);
        let missing = if self.reject_blank {
            is_blank(value)
        } else {
            matches!(value, None | Some(FieldValue::Null))
        };
        if missing {
            let label = model.label(property)?;
            errors.add(ValidationError::for_property(
                self.name(),
                property,
                format!("{label} is required"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::instance_with;

    #[test]
    fn undefined_and_null_fail() {
        let model = instance_with(&[("name", FieldValue::Null)]);
        let mut errors = ErrorList::new();
        required().check(&model, "name", &mut errors).unwrap();
        required().check(&model, "email", &mut errors).unwrap();
        assert_eq!(errors.messages(), ["Name is required", "Email is required"]);
        assert_eq!(errors.get(Some("name"))[0].name, "required");
    }

    #[test]
    fn empty_string_only_fails_presence() {
        let model = instance_with(&[("name", FieldValue::from(""))]);
        let mut errors = ErrorList::new();
        required().check(&model, "name", &mut errors).unwrap();
        assert!(errors.is_empty());
        presence().check(&model, "name", &mut errors).unwrap();
        assert_eq!(errors.count(), 1);
    }

    #[test]
    fn falsy_values_are_present() {
        let model = instance_with(&[("age", FieldValue::Int(0)), ("name", FieldValue::from(""))]);
        let mut errors = ErrorList::new();
        required().check(&model, "age", &mut errors).unwrap();
        required().check(&model, "name", &mut errors).unwrap();
        assert!(errors.is_empty());
    }
}
