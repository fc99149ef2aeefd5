//! Controller and action metadata.
//!
//! A controller is a named group of actions sharing a route prefix.  Unless
//! told otherwise, the prefix is the class name without its `Controller`
//! suffix, pluralized and kebab-cased, and each action's method and path come
//! from the RESTful convention table:
//!
//! | action | method | path |
//! |---|---|---|
//! | `index` | GET | `/` |
//! | `show` | GET | `/:id` |
//! | `create` | GET | `/create` |
//! | `doCreate` | POST | `/create` |
//! | `createDone` | GET | `/create/done` |
//! | `edit` | GET | `/:id/edit` |
//! | `doEdit` | PATCH | `/:id/edit` |
//! | `editDone` | GET | `/edit/done` |
//! | `delete` | GET | `/:id/delete` |
//! | `doDelete` | DELETE | `/:id/delete` |
//! | `deleteDone` | GET | `/delete/done` |
//!
//! Any other action is a GET at its kebab-cased name.

use std::fmt;

use axum::http::Method;
use axum::routing::MethodFilter;
use convert_case::{Case, Casing};
use serde::{Deserialize, Serialize};

use crate::{ClassKey, DeclarationError};

/// The HTTP methods an action can be mounted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

impl HttpMethod {
    /// The upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// The axum filter matching this method.
    pub fn method_filter(&self) -> MethodFilter {
        match self {
            Self::Get => MethodFilter::GET,
            Self::Post => MethodFilter::POST,
            Self::Put => MethodFilter::PUT,
            Self::Patch => MethodFilter::PATCH,
            Self::Delete => MethodFilter::DELETE,
            Self::Head => MethodFilter::HEAD,
            Self::Options => MethodFilter::OPTIONS,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Options => Method::OPTIONS,
        }
    }
}

/// The conventional method and path of a RESTful action name.
pub fn convention(action: &str) -> Option<(HttpMethod, &'static str)> {
    let found = match action {
        "index" => (HttpMethod::Get, "/"),
        "show" => (HttpMethod::Get, "/:id"),
        "create" => (HttpMethod::Get, "/create"),
        "doCreate" => (HttpMethod::Post, "/create"),
        "createDone" => (HttpMethod::Get, "/create/done"),
        "edit" => (HttpMethod::Get, "/:id/edit"),
        "doEdit" => (HttpMethod::Patch, "/:id/edit"),
        "editDone" => (HttpMethod::Get, "/edit/done"),
        "delete" => (HttpMethod::Get, "/:id/delete"),
        "doDelete" => (HttpMethod::Delete, "/:id/delete"),
        "deleteDone" => (HttpMethod::Get, "/delete/done"),
        _ => return None,
    };
    Some(found)
}

////////////////////////////////////////// ActionDescriptor ////////////////////////////////////////////

/// One action: its name and where it is mounted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// The action name.
    pub name: String,
    /// The HTTP method.
    pub method: HttpMethod,
    /// The path below the controller prefix.
    pub path: String,
}

impl ActionDescriptor {
    /// Resolves method and path for `name`.
    ///
    /// Explicit values win.  With neither, the convention table applies, and
    /// unknown names become a GET at the kebab-cased name.  An explicit method
    /// alone mounts at the kebab-cased name; an explicit path alone is a GET.
    pub fn resolve(name: impl Into<String>, method: Option<HttpMethod>, path: Option<&str>) -> Self {
        let name = name.into();
        let (method, path) = match (method, path) {
            (Some(method), Some(path)) => (method, path.to_string()),
            (Some(method), None) => (method, kebab_path(&name)),
            (None, Some(path)) => (HttpMethod::Get, path.to_string()),
            (None, None) => match convention(&name) {
                Some((method, path)) => (method, path.to_string()),
                None => (HttpMethod::Get, kebab_path(&name)),
            },
        };
        Self { name, method, path }
    }

    /// Resolves `name` purely by convention.
    pub fn conventional(name: impl Into<String>) -> Self {
        Self::resolve(name, None, None)
    }
}

fn kebab_path(name: &str) -> String {
    format!("/{}", name.to_case(Case::Kebab))
}

//////////////////////////////////////// ControllerDescriptor //////////////////////////////////////////

/// A controller: its name, route prefix and actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerDescriptor {
    /// The controller class.
    pub class: ClassKey,
    /// The class name without its `Controller` suffix.
    pub name: String,
    /// The route prefix.
    pub prefix: String,
    actions: Vec<ActionDescriptor>,
}

impl ControllerDescriptor {
    /// Builds a descriptor, deriving the prefix when none is given.
    pub fn new(
        class: ClassKey,
        prefix: Option<String>,
        actions: Vec<ActionDescriptor>,
    ) -> Result<Self, DeclarationError> {
        for (idx, action) in actions.iter().enumerate() {
            if actions[..idx].iter().any(|a| a.name == action.name) {
                return Err(DeclarationError::DuplicateAction {
                    class,
                    action: action.name.clone(),
                });
            }
        }
        let name = controller_name(class.name()).to_string();
        let prefix = prefix.unwrap_or_else(|| default_prefix(&name));
        Ok(Self {
            class,
            name,
            prefix,
            actions,
        })
    }

    /// Actions in declaration order.
    pub fn actions(&self) -> &[ActionDescriptor] {
        &self.actions
    }

    /// The action named `name`.
    pub fn action(&self, name: &str) -> Option<&ActionDescriptor> {
        self.actions.iter().find(|a| a.name == name)
    }
}

/// `UsersController` becomes `Users`.
pub fn controller_name(class: &str) -> &str {
    match class.strip_suffix("Controller") {
        Some(name) if !name.is_empty() => name,
        _ => class,
    }
}

/// `UserProfile` becomes `user-profiles`.
pub fn default_prefix(name: &str) -> String {
    pluralize(name).to_case(Case::Kebab)
}

const UNCOUNTABLE: &[&str] = &[
    "data",
    "equipment",
    "feedback",
    "fish",
    "information",
    "media",
    "news",
    "series",
    "sheep",
    "species",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("tooth", "teeth"),
    ("foot", "feet"),
];

/// English plural of the last word of `word`, preserving the case of the
/// replaced letters' first character.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_ascii_lowercase();
    if UNCOUNTABLE.iter().any(|u| lower.ends_with(u)) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULAR {
        if lower.ends_with(singular) {
            let stem = &word[..word.len() - singular.len()];
            let original = &word[word.len() - singular.len()..];
            let mut replaced = plural.to_string();
            if original.starts_with(|c: char| c.is_ascii_uppercase()) {
                replaced = replaced.to_case(Case::Pascal);
            }
            return format!("{stem}{replaced}");
        }
    }
    let already_plural = lower.ends_with('s')
        && !["ss", "us", "is"].iter().any(|s| lower.ends_with(s));
    if already_plural {
        return word.to_string();
    }
    let ends_consonant_y = lower.ends_with('y')
        && !lower[..lower.len() - 1].ends_with(['a', 'e', 'i', 'o', 'u']);
    if ends_consonant_y {
        return format!("{}ies", &word[..word.len() - 1]);
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        return format!("{word}es");
    }
    format!("{word}s")
}
