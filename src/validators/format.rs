use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

use crate::value::is_blank;
use crate::{ErrorList, FieldValue, ModelError, ModelInstance, Rule, ValidationError};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$")
        .expect("email pattern compiles")
});

// Private and loopback addresses are filtered after matching; the regex
// engine has no lookahead.
static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:https?|ftp)://(?:\S+(?::\S*)?@)?",
        r"(?P<host>",
        r"(?:[1-9]\d?|1\d\d|2[01]\d|22[0-3])(?:\.(?:1?\d{1,2}|2[0-4]\d|25[0-5])){2}\.(?:[1-9]\d?|1\d\d|2[0-4]\d|25[0-4])",
        r"|(?:(?:[a-z0-9\x{00a1}-\x{ffff}]+-)*[a-z0-9\x{00a1}-\x{ffff}]+)",
        r"(?:\.(?:[a-z0-9\x{00a1}-\x{ffff}]+-)*[a-z0-9\x{00a1}-\x{ffff}]+)*",
        r"\.[a-z\x{00a1}-\x{ffff}]{2,}",
        r")(?::\d{2,5})?(?:/\S*)?$",
    ))
    .expect("url pattern compiles")
});

static UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:urn:uuid:)?[0-9a-f]{8}-(?:[0-9a-f]{4}-){3}[0-9a-f]{12}$")
        .expect("uuid pattern compiles")
});

static ZIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(?:[-\s]\d{4})?$").expect("zip pattern compiles"));

/// A string format.
#[derive(Debug, Clone)]
pub enum Format {
    /// An email address.
    Email,
    /// An http, https or ftp URL on a public host.
    Url,
    /// A UUID, optionally prefixed with `urn:uuid:`.
    Uuid,
    /// A US zip code, `#####` or `#####-####`.
    Zip,
    /// A caller-supplied pattern.
    Pattern(Regex),
}

impl Format {
    /// True if `text` has this format.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Email => EMAIL.is_match(text),
            Self::Url => is_public_url(text),
            Self::Uuid => UUID.is_match(text),
            Self::Zip => ZIP.is_match(text),
            Self::Pattern(re) => re.is_match(text),
        }
    }

    fn default_message(&self, label: &str) -> String {
        match self {
            Self::Email => format!("{label} must be email address"),
            Self::Url => format!("{label} must be URL"),
            Self::Uuid => format!("{label} must be UUID"),
            Self::Zip => format!("{label} must be zipcode, format = #####"),
            Self::Pattern(_) => format!("{label} must match pattern"),
        }
    }
}

fn is_public_url(text: &str) -> bool {
    let Some(captures) = URL.captures(text) else {
        return false;
    };
    match captures.name("host").map(|h| h.as_str().parse::<Ipv4Addr>()) {
        Some(Ok(addr)) => !(addr.is_private() || addr.is_loopback() || addr.is_link_local()),
        _ => true,
    }
}

/// Checks a field against a [`Format`].  Undefined, null and empty values pass.
#[derive(Debug, Clone)]
pub struct FormatOf {
    format: Format,
    message: Option<String>,
}

/// A [`FormatOf`] rule.
pub fn format_of(format: Format) -> FormatOf {
    FormatOf {
        format,
        message: None,
    }
}

impl FormatOf {
    /// Replaces the default message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Rule for FormatOf {
    fn name(&self) -> &'static str {
        "format"
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
        let matched = match value {
            Some(FieldValue::String(text)) => self.format.matches(text),
            Some(other) => self.format.matches(&other.to_string()),
            None => true,
        };
        if !matched {
            let message = match &self.message {
                Some(message) => message.clone(),
                None => self.format.default_message(model.label(property)?),
            };
            errors.add(ValidationError::for_property(self.name(), property, message));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::instance_with;

    #[test]
    fn emails() {
        assert!(Format::Email.matches("ada@example.com"));
        assert!(Format::Email.matches("Ada.Lovelace+tag@Example.co.uk"));
        assert!(!Format::Email.matches("ada@"));
        assert!(!Format::Email.matches("ada example.com"));
    }

    #[test]
    fn urls_reject_private_hosts() {
        assert!(Format::Url.matches("https://example.com/path?q=1"));
        assert!(Format::Url.matches("http://user:pw@example.com:8080"));
        assert!(Format::Url.matches("http://8.8.8.8/"));
        assert!(!Format::Url.matches("http://127.0.0.1/"));
        assert!(!Format::Url.matches("http://10.1.2.3/"));
        assert!(!Format::Url.matches("http://192.168.0.1/"));
        assert!(!Format::Url.matches("http://172.16.0.1/"));
        assert!(!Format::Url.matches("http://169.254.1.1/"));
        assert!(!Format::Url.matches("mailto:ada@example.com"));
        assert!(!Format::Url.matches("http://localhost/"));
    }

    #[test]
    fn uuids_and_zips() {
        assert!(Format::Uuid.matches("123e4567-e89b-12d3-a456-426614174000"));
        assert!(Format::Uuid.matches("urn:uuid:123E4567-E89B-12D3-A456-426614174000"));
        assert!(!Format::Uuid.matches("123e4567"));
        assert!(Format::Zip.matches("12345"));
        assert!(Format::Zip.matches("12345-6789"));
        assert!(!Format::Zip.matches("1234"));
    }

    #[test]
    fn blank_values_are_skipped() {
        let model = instance_with(&[("email", FieldValue::from(""))]);
        let mut errors = ErrorList::new();
        format_of(Format::Email).check(&model, "email", &mut errors).unwrap();
        format_of(Format::Email).check(&model, "website", &mut errors).unwrap();
        assert!(errors.is_empty());
    }

    #[test]
    fn failures_use_label_or_override() {
        let model = instance_with(&[
            ("email", FieldValue::from("nope")),
            ("zip", FieldValue::from("abc")),
            ("code", FieldValue::from("abc")),
        ]);
        let mut errors = ErrorList::new();
        format_of(Format::Email).check(&model, "email", &mut errors).unwrap();
        format_of(Format::Zip)
            .message("bad zip")
            .check(&model, "zip", &mut errors)
            .unwrap();
        format_of(Format::Pattern(Regex::new("^[0-9]+$").unwrap()))
            .check(&model, "code", &mut errors)
            .unwrap();
        assert_eq!(
            errors.messages(),
            ["Email must be email address", "bad zip", "Code must match pattern"]
        );
    }
}
