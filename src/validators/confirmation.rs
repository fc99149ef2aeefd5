use crate::value::is_blank;
use crate::{ErrorList, ModelError, ModelInstance, Rule, ValidationError};

fn confirmation_property(property: &str) -> String {
    format!("{property}Confirmation")
}

/// Fails when `<field>` differs from `<field>Confirmation`.
#[derive(Debug, Clone, Default)]
pub struct Confirmation;

/// A [`Confirmation`] rule.
pub fn confirmation() -> Confirmation {
    Confirmation
}

impl Rule for Confirmation {
    fn name(&self) -> &'static str {
        "confirmation"
    }

    fn check(
        &self,
        model: &ModelInstance,
        property: &str,
        errors: &mut ErrorList,
    ) -> Result<(), ModelError> {
        let confirm = confirmation_property(property);
        if model.get(property) != model.get(&confirm) {
            let label = model.label(property)?;
            errors.add(ValidationError::for_property(
                self.name(),
                property,
                format!("{label} must match confirmation"),
            ));
        }
        Ok(())
    }
}

/// Checks a password against `<field>Confirmation`.
///
/// Reports up to three `passwordConfirmation` errors: the password is empty,
/// the confirmation is empty (filed under the confirmation field), and the
/// two differ.  The confirmation field must be declared; its label is used in
/// the messages.
#[derive(Debug, Clone, Default)]
pub struct PasswordConfirmation;

/// A [`PasswordConfirmation`] rule.
pub fn password_confirmation() -> PasswordConfirmation {
    PasswordConfirmation
}

impl Rule for PasswordConfirmation {
    fn name(&self) -> &'static str {
        "passwordConfirmation"
    }

    fn check(
        &self,
        model: &ModelInstance,
        property: &str,
        errors: &mut ErrorList,
    ) -> Result<(), ModelError> {
        let confirm = confirmation_property(property);
        let label = model.label(property)?;
        let confirm_label = model.label(&confirm)?;
        let value = model.get(property);
        let confirm_value = model.get(&confirm);
        if is_blank(value) {
            errors.add(ValidationError::for_property(
                self.name(),
                property,
                format!("{label} is required"),
            ));
        }
        if is_blank(confirm_value) {
            errors.add(ValidationError::for_property(
                self.name(),
                confirm.as_str(),
                format!("{confirm_label} is required"),
            ));
        }
        if value != confirm_value {
            errors.add(ValidationError::for_property(
                self.name(),
                property,
                format!("{label} must match {confirm_label}"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::instance_with;
    use crate::{ClassKey, DeclarationError};

    #[test]
    fn confirmation_mismatch() {
        let model = instance_with(&[
            ("password", "a".into()),
            ("passwordConfirmation", "b".into()),
        ]);
        let mut errors = ErrorList::new();
        confirmation().check(&model, "password", &mut errors).unwrap();
        assert_eq!(errors.messages(), ["Password must match confirmation"]);
    }

    #[test]
    fn confirmation_match() {
        let model = instance_with(&[
            ("password", "a".into()),
            ("passwordConfirmation", "a".into()),
        ]);
        let mut errors = ErrorList::new();
        confirmation().check(&model, "password", &mut errors).unwrap();
        password_confirmation().check(&model, "password", &mut errors).unwrap();
        assert!(errors.is_empty());
    }

    #[test]
    fn password_mismatch() {
        let model = instance_with(&[
            ("password", "a".into()),
            ("passwordConfirmation", "b".into()),
        ]);
        let mut errors = ErrorList::new();
        password_confirmation().check(&model, "password", &mut errors).unwrap();
        assert_eq!(errors.count(), 1);
        let error = &errors.get(Some("password"))[0];
        assert_eq!(error.name, "passwordConfirmation");
        assert_eq!(error.message, "Password must match Password Confirmation");
    }

    #[test]
    fn password_both_missing() {
        let model = instance_with(&[]);
        let mut errors = ErrorList::new();
        password_confirmation().check(&model, "password", &mut errors).unwrap();
        assert_eq!(errors.messages(), ["Password is required", "Password Confirmation is required"]);
        assert!(!errors.valid(Some("passwordConfirmation")));
    }

    #[test]
    fn undeclared_confirmation_field_is_an_error() {
        let model = instance_with(&[("name", "a".into())]);
        let mut errors = ErrorList::new();
        let err = password_confirmation().check(&model, "name", &mut errors).unwrap_err();
        assert_eq!(
            err,
            ModelError::Declaration(DeclarationError::MissingField {
                class: ClassKey::new("Sample"),
                property: "nameConfirmation".into(),
            })
        );
    }
}
