use crate::value::is_blank;
use crate::{ErrorList, FieldValue, ModelError, ModelInstance, Rule, ValidationError};

/// Fails when a present, non-empty value is outside the allowed set.
#[derive(Debug, Clone)]
pub struct OneOf {
    values: Vec<FieldValue>,
}

/// A [`OneOf`] rule allowing `values`.
pub fn one_of<I, V>(values: I) -> OneOf
where
    I: IntoIterator<Item = V>,
    V: Into<FieldValue>,
{
    OneOf {
        values: values.into_iter().map(Into::into).collect(),
    }
}

impl OneOf {
    /// The allowed values.
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }
}

impl Rule for OneOf {
    fn name(&self) -> &'static str {
        "enum"
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
        if let Some(value) = value {
            if !self.values.contains(value) {
                let allowed = self
                    .values
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                let label = model.label(property)?;
                errors.add(ValidationError::for_property(
                    self.name(),
                    property,
                    format!("{label} must be one of {allowed}"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::instance_with;

    #[test]
    fn outside_the_set_fails() {
        let model = instance_with(&[("role", "root".into())]);
        let mut errors = ErrorList::new();
        one_of(["admin", "member"]).check(&model, "role", &mut errors).unwrap();
        assert_eq!(errors.messages(), ["Role must be one of admin, member"]);
        assert_eq!(errors.get(Some("role"))[0].name, "enum");
    }

    #[test]
    fn inside_the_set_or_blank_passes() {
        let model = instance_with(&[("role", "admin".into()), ("name", "".into())]);
        let mut errors = ErrorList::new();
        one_of(["admin", "member"]).check(&model, "role", &mut errors).unwrap();
        one_of(["admin", "member"]).check(&model, "name", &mut errors).unwrap();
        one_of(["admin", "member"]).check(&model, "email", &mut errors).unwrap();
        assert!(errors.is_empty());
    }

    #[test]
    fn values_compare_by_type() {
        let model = instance_with(&[("age", FieldValue::Int(3))]);
        let mut errors = ErrorList::new();
        one_of([1i64, 2, 3]).check(&model, "age", &mut errors).unwrap();
        one_of(["3"]).check(&model, "age", &mut errors).unwrap();
        assert_eq!(errors.count(), 1);
    }
}
