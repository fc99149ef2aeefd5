use crate::value::is_blank;
use crate::{ErrorList, FieldValue, ModelError, ModelInstance, Rule, ValidationError};

/// Character-count limits on a string field.
///
/// Each configured limit reports under its own kind: `lengthMin`,
/// `lengthMax`, `lengthRange` and `lengthIs`.  Undefined, null and empty
/// values pass.  Any other non-string value is a [`ModelError`].
#[derive(Debug, Clone, Default)]
pub struct LengthOf {
    min: Option<usize>,
    max: Option<usize>,
    range: Option<(usize, usize)>,
    is: Option<usize>,
    message: Option<String>,
}

/// An unconfigured [`LengthOf`] rule.
pub fn length_of() -> LengthOf {
    LengthOf::default()
}

impl LengthOf {
    /// At least `min` characters.
    pub fn min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    /// At most `max` characters.
    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// Between `min` and `max` characters, inclusive.
    pub fn range(mut self, min: usize, max: usize) -> Self {
        self.range = Some((min, max));
        self
    }

    /// Exactly `len` characters.
    pub fn is(mut self, len: usize) -> Self {
        self.is = Some(len);
        self
    }

    /// Replaces every default message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn report(
        &self,
        errors: &mut ErrorList,
        name: &str,
        property: &str,
        default: impl FnOnce() -> String,
    ) {
        let message = self.message.clone().unwrap_or_else(default);
        errors.add(ValidationError::for_property(name, property, message));
    }
}

impl Rule for LengthOf {
    fn name(&self) -> &'static str {
        "length"
    }

    fn check(
        &self,
        model: &ModelInstance,
        property: &str,
        errors: &mut ErrorList,
    ) -> Result<(), ModelError> {
        let value = model.get(property);
        if is_blank(value) {
            return Ok(());
        }
        let Some(FieldValue::String(text)) = value else {
            return Err(ModelError::ValidatorMisuse {
                validator: self.name().to_string(),
                property: property.to_string(),
                reason: format!(
                    "value must be a string, got {}",
                    value.map(|v| v.to_json()).unwrap_or_default()
                ),
            });
        };
        let len = text.chars().count();
        let label = model.label(property)?;
        if let Some(min) = self.min.filter(|min| len < *min) {
            self.report(errors, "lengthMin", property, || {
                format!("{label} must be at least {min} characters")
            });
        }
        if let Some(max) = self.max.filter(|max| len > *max) {
            self.report(errors, "lengthMax", property, || {
                format!("{label} must be at most {max} characters")
            });
        }
        if let Some((min, max)) = self.range.filter(|(min, max)| len < *min || len > *max) {
            self.report(errors, "lengthRange", property, || {
                format!("{label} must be between {min} and {max} characters")
            });
        }
        if let Some(is) = self.is.filter(|is| len != *is) {
            self.report(errors, "lengthIs", property, || {
                format!("{label} must be {is} characters")
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::instance_with;

    fn run(rule: LengthOf, value: FieldValue) -> Result<ErrorList, ModelError> {
        let model = instance_with(&[("name", value)]);
        let mut errors = ErrorList::new();
        rule.check(&model, "name", &mut errors)?;
        Ok(errors)
    }

    #[test]
    fn each_limit_reports_its_own_kind() {
        let errors = run(length_of().min(5), "abc".into()).unwrap();
        assert_eq!(errors.get(Some("name"))[0].name, "lengthMin");
        assert_eq!(errors.messages(), ["Name must be at least 5 characters"]);

        let errors = run(length_of().max(2), "abc".into()).unwrap();
        assert_eq!(errors.get(Some("name"))[0].name, "lengthMax");
        assert_eq!(errors.messages(), ["Name must be at most 2 characters"]);

        let errors = run(length_of().range(4, 6), "abc".into()).unwrap();
        assert_eq!(errors.get(Some("name"))[0].name, "lengthRange");

        let errors = run(length_of().is(4), "abc".into()).unwrap();
        assert_eq!(errors.messages(), ["Name must be 4 characters"]);
    }

    #[test]
    fn range_is_inclusive_and_counts_characters() {
        assert!(run(length_of().range(3, 3), "abc".into()).unwrap().is_empty());
        assert!(run(length_of().max(3), "ééé".into()).unwrap().is_empty());
        assert!(run(length_of().min(0), "".into()).unwrap().is_empty());
    }

    #[test]
    fn blank_skips_and_non_strings_are_misuse() {
        assert!(run(length_of().min(3), FieldValue::Null).unwrap().is_empty());
        assert!(run(length_of().min(3), "".into()).unwrap().is_empty());
        let err = run(length_of().min(3), FieldValue::Int(12)).unwrap_err();
        assert!(matches!(err, ModelError::ValidatorMisuse { .. }));
    }

    #[test]
    fn override_applies_to_every_limit() {
        let errors = run(length_of().min(5).is(4).message("bad length"), "abc".into()).unwrap();
        assert_eq!(errors.messages(), ["bad length", "bad length"]);
    }
}
