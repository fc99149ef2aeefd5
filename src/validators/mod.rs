//! Built-in validators.
//!
//! Each validator is a [`Rule`](crate::Rule): configuration built with a small
//! constructor function and bound to fields through
//! [`ValidationBuilder::check`](crate::ValidationBuilder::check) or
//! [`FieldDescriptor::validate`](crate::FieldDescriptor::validate).
//!
//! | constructor | kind |
//! |---|---|
//! | [`required`], [`presence`] | `required` |
//! | [`format_of`] | `format` |
//! | [`length_of`] | `lengthMin`, `lengthMax`, `lengthRange`, `lengthIs` |
//! | [`one_of`] | `enum` |
//! | [`confirmation`] | `confirmation` |
//! | [`password_confirmation`] | `passwordConfirmation` |
//! | [`with`] | `with` |

mod confirmation;
mod enumeration;
mod format;
mod length;
mod required;
mod with;

pub use confirmation::{Confirmation, PasswordConfirmation, confirmation, password_confirmation};
pub use enumeration::{OneOf, one_of};
pub use format::{Format, FormatOf, format_of};
pub use length::{LengthOf, length_of};
pub use required::{Required, presence, required};
pub use with::{With, WithCallback, with};

pub(crate) use with::ModelWith;
