//! What actions return.
//!
//! An action produces an [`ActionOutput`]: zero or more optional
//! [`ActionResult`]s, interpreted in order once the action completes.  A
//! status code sets the response status, a view renders, a redirect answers
//! with `Location`, and `None` entries are skipped.
//!
//! Most outputs are built with the helpers in this module and converted with
//! `.into()`:
//!
//! ```rust
//! use eki::{ActionOutput, ActionResult, redirect, view_with};
//! use serde_json::json;
//!
//! let page: ActionOutput = view_with("users/show", json!({"name": "Ada"})).into();
//! let moved: ActionOutput = redirect("/users").into();
//! let created: ActionOutput =
//!     vec![ActionResult::from(201u16), view_with("users/show", json!({})).into()].into();
//! assert_eq!(created.len(), 2);
//! # let _ = (page, moved);
//! ```

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Render a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewResult {
    /// The view name handed to the renderer.
    pub name: String,
    /// The status used when none was set earlier.
    #[serde(default = "default_view_status")]
    pub status: u16,
    /// Props for the view.
    #[serde(default)]
    pub data: Value,
}

fn default_view_status() -> u16 {
    200
}

/// Redirect the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectResult {
    /// The status; the configured default (303) when `None`.
    #[serde(default)]
    pub status: Option<u16>,
    /// The `Location` to send.
    pub url: String,
}

/// One interpretable outcome of an action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    /// Set the response status.
    Status(u16),
    /// Render a view.
    View(ViewResult),
    /// Redirect.
    Redirect(RedirectResult),
    /// JSON interpreted by shape: a number is a status, `{"type": "view", ..}`
    /// a view, `{"type": "redirect", ..}` a redirect and null nothing.
    Json(Value),
}

impl ActionResult {
    /// Turns [`ActionResult::Json`] into a typed result.  `Ok(None)` for null,
    /// `Err` with a description for any other unrecognized shape.
    pub fn normalize(self) -> Result<Option<ActionResult>, String> {
        let Self::Json(value) = self else {
            return Ok(Some(self));
        };
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => match n.as_u64().and_then(|n| u16::try_from(n).ok()) {
                Some(status) => Ok(Some(Self::Status(status))),
                None => Err(format!("status {n} is not a valid status code")),
            },
            Value::Object(ref map) => {
                let kind = map.get("type").and_then(Value::as_str).unwrap_or_default();
                match kind {
                    "view" => serde_json::from_value::<ViewResult>(value.clone())
                        .map(|v| Some(Self::View(v)))
                        .map_err(|e| format!("malformed view result: {e}")),
                    "redirect" => serde_json::from_value::<RedirectResult>(value.clone())
                        .map(|r| Some(Self::Redirect(r)))
                        .map_err(|e| format!("malformed redirect result: {e}")),
                    _ => Err(format!("unrecognized result {value}")),
                }
            }
            other => Err(format!("unrecognized result {other}")),
        }
    }
}

impl From<u16> for ActionResult {
    fn from(status: u16) -> Self {
        Self::Status(status)
    }
}

impl From<StatusCode> for ActionResult {
    fn from(status: StatusCode) -> Self {
        Self::Status(status.as_u16())
    }
}

impl From<ViewResult> for ActionResult {
    fn from(view: ViewResult) -> Self {
        Self::View(view)
    }
}

impl From<RedirectResult> for ActionResult {
    fn from(redirect: RedirectResult) -> Self {
        Self::Redirect(redirect)
    }
}

impl From<Value> for ActionResult {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Everything an action returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutput {
    items: Vec<Option<ActionResult>>,
}

impl ActionOutput {
    /// No output at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Number of entries, `None` entries included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The entries in order.
    pub fn items(&self) -> &[Option<ActionResult>] {
        &self.items
    }

    /// Consumes the output.
    pub fn into_items(self) -> Vec<Option<ActionResult>> {
        self.items
    }
}

impl From<()> for ActionOutput {
    fn from(_: ()) -> Self {
        Self::none()
    }
}

impl From<ActionResult> for ActionOutput {
    fn from(result: ActionResult) -> Self {
        Self {
            items: vec![Some(result)],
        }
    }
}

impl From<Option<ActionResult>> for ActionOutput {
    fn from(result: Option<ActionResult>) -> Self {
        Self {
            items: vec![result],
        }
    }
}

impl From<Vec<ActionResult>> for ActionOutput {
    fn from(results: Vec<ActionResult>) -> Self {
        Self {
            items: results.into_iter().map(Some).collect(),
        }
    }
}

impl From<Vec<Option<ActionResult>>> for ActionOutput {
    fn from(items: Vec<Option<ActionResult>>) -> Self {
        Self { items }
    }
}

impl From<u16> for ActionOutput {
    fn from(status: u16) -> Self {
        ActionResult::from(status).into()
    }
}

impl From<StatusCode> for ActionOutput {
    fn from(status: StatusCode) -> Self {
        ActionResult::from(status).into()
    }
}

impl From<ViewResult> for ActionOutput {
    fn from(view: ViewResult) -> Self {
        ActionResult::from(view).into()
    }
}

impl From<RedirectResult> for ActionOutput {
    fn from(redirect: RedirectResult) -> Self {
        ActionResult::from(redirect).into()
    }
}

/// JSON arrays become one entry per element; anything else one entry.
impl From<Value> for ActionOutput {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Self {
                items: items.into_iter().map(|v| Some(ActionResult::Json(v))).collect(),
            },
            value => ActionResult::Json(value).into(),
        }
    }
}

/// Renders `name` with no data.
pub fn view(name: impl Into<String>) -> ViewResult {
    view_with(name, Value::Object(Default::default()))
}

/// Renders `name` with `data`.
pub fn view_with(name: impl Into<String>, data: Value) -> ViewResult {
    view_status(200, name, data)
}

/// Renders `name` with `data`, using `status` unless one was set earlier.
pub fn view_status(status: u16, name: impl Into<String>, data: Value) -> ViewResult {
    ViewResult {
        name: name.into(),
        status,
        data,
    }
}

/// Redirects to `url` with the configured default status.
pub fn redirect(url: impl Into<String>) -> RedirectResult {
    RedirectResult {
        status: None,
        url: url.into(),
    }
}

/// Redirects to `url` with `status`.
pub fn redirect_status(status: u16, url: impl Into<String>) -> RedirectResult {
    RedirectResult {
        status: Some(status),
        url: url.into(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn helpers() {
        assert_eq!(
            view("home"),
            ViewResult {
                name: "home".into(),
                status: 200,
                data: json!({}),
            }
        );
        assert_eq!(view_status(422, "form", json!({"a": 1})).status, 422);
        assert_eq!(redirect("/x").status, None);
        assert_eq!(redirect_status(301, "/x").status, Some(301));
    }

    #[test]
    fn json_shapes_normalize() {
        let status = ActionResult::Json(json!(204)).normalize().unwrap();
        assert_eq!(status, Some(ActionResult::Status(204)));
        let view = ActionResult::Json(json!({"type": "view", "name": "home"})).normalize().unwrap();
        assert_eq!(view, Some(ActionResult::View(view_status(200, "home", Value::Null))));
        let redirect = ActionResult::Json(json!({"type": "redirect", "url": "/x", "status": 302}))
            .normalize()
            .unwrap();
        assert_eq!(redirect, Some(ActionResult::Redirect(redirect_status(302, "/x"))));
        assert_eq!(ActionResult::Json(Value::Null).normalize(), Ok(None));
    }

    #[test]
    fn unrecognized_shapes_fail() {
        assert!(ActionResult::Json(json!("hello")).normalize().is_err());
        assert!(ActionResult::Json(json!({"type": "teapot"})).normalize().is_err());
        assert!(ActionResult::Json(json!(70000)).normalize().is_err());
        assert!(ActionResult::Json(json!({"type": "redirect"})).normalize().is_err());
    }

    #[test]
    fn outputs_from_values() {
        let output = ActionOutput::from(json!([200, null]));
        assert_eq!(output.len(), 2);
        let output = ActionOutput::from(vec![None::<ActionResult>, None]);
        assert_eq!(output.items(), &[None, None]);
        assert!(ActionOutput::from(()).is_empty());
    }
}
