//! Route planning.
//!
//! A controller's actions become routes at `prefix + action path`, normalized
//! by [`route_path`].  [`plan_routes`] applies [`ResourceOptions`] and
//! [`check_conflicts`] rejects two actions claiming the same method and path.
//! Mounting the planned routes on an axum router is done by
//! [`Application::into_router`](crate::Application::into_router).

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{ActionDescriptor, ControllerDescriptor, DeclarationError, HttpMethod};

/// Joins `prefix` and `path` into a normalized route path.
///
/// The result has one leading slash, no repeated slashes, and no trailing
/// slash unless it is the root.
///
/// ```rust
/// use eki::route_path;
///
/// assert_eq!(route_path("/", "/"), "/");
/// assert_eq!(route_path("user", "/create"), "/user/create");
/// assert_eq!(route_path("/user/", "//create/"), "/user/create");
/// ```
pub fn route_path(prefix: &str, path: &str) -> String {
    let segments: Vec<&str> = prefix
        .split('/')
        .chain(path.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

/// Options applied when a controller is mounted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOptions {
    /// Replaces the controller's prefix.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Mounts only the named actions.
    #[serde(default)]
    pub only: Option<Vec<String>>,
}

impl ResourceOptions {
    /// Mounts under `prefix` instead of the controller's own.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Mounts only `actions`.
    pub fn only<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = Some(actions.into_iter().map(Into::into).collect());
        self
    }

    fn includes(&self, action: &str) -> bool {
        match &self.only {
            Some(only) => only.iter().any(|a| a == action),
            None => true,
        }
    }
}

/// One mounted route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// The controller serving the route.
    pub controller: Arc<ControllerDescriptor>,
    /// The action serving the route.
    pub action: ActionDescriptor,
    /// The normalized path.
    pub path: String,
}

impl RouteInfo {
    /// The HTTP method.
    pub fn method(&self) -> HttpMethod {
        self.action.method
    }

    /// `Controller#action`, for logs and errors.
    pub fn endpoint(&self) -> String {
        format!("{}#{}", self.controller.class, self.action.name)
    }
}

/// The routes of one controller, in action order.
pub fn plan_routes(controller: &Arc<ControllerDescriptor>, options: &ResourceOptions) -> Vec<RouteInfo> {
    let prefix = options.prefix.as_deref().unwrap_or(&controller.prefix);
    controller
        .actions()
        .iter()
        .filter(|action| options.includes(&action.name))
        .map(|action| RouteInfo {
            controller: Arc::clone(controller),
            action: action.clone(),
            path: route_path(prefix, &action.path),
        })
        .collect()
}

/// Fails on the first method and path claimed twice.
pub fn check_conflicts(routes: &[RouteInfo]) -> Result<(), DeclarationError> {
    let mut seen: HashMap<(HttpMethod, &str), &RouteInfo> = HashMap::new();
    for route in routes {
        if let Some(first) = seen.insert((route.method(), route.path.as_str()), route) {
            return Err(DeclarationError::DuplicateRoute {
                method: route.method().to_string(),
                path: route.path.clone(),
                first: first.endpoint(),
                second: route.endpoint(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClassKey;

    #[test]
    fn normalization() {
        assert_eq!(route_path("/", "/"), "/");
        assert_eq!(route_path("", ""), "/");
        assert_eq!(route_path("/", "create"), "/create");
        assert_eq!(route_path("user", "/"), "/user");
        for prefix in ["user", "/user", "user/", "/user/", "//user//"] {
            for path in ["create", "/create", "create/", "/create/", "//create"] {
                assert_eq!(route_path(prefix, path), "/user/create", "{prefix} + {path}");
            }
        }
        assert_eq!(route_path("users", "/:id/edit"), "/users/:id/edit");
    }

    fn users() -> Arc<ControllerDescriptor> {
        Arc::new(
            ControllerDescriptor::new(
                ClassKey::new("UsersController"),
                None,
                ["index", "show", "create", "doCreate"]
                    .into_iter()
                    .map(ActionDescriptor::conventional)
                    .collect(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn plans_every_action() {
        let routes = plan_routes(&users(), &ResourceOptions::default());
        let planned: Vec<_> = routes
            .iter()
            .map(|r| (r.method(), r.path.as_str()))
            .collect();
        assert_eq!(
            planned,
            [
                (HttpMethod::Get, "/users"),
                (HttpMethod::Get, "/users/:id"),
                (HttpMethod::Get, "/users/create"),
                (HttpMethod::Post, "/users/create"),
            ]
        );
        assert!(check_conflicts(&routes).is_ok());
        assert_eq!(routes[0].endpoint(), "UsersController#index");
    }

    #[test]
    fn options_filter_and_reprefix() {
        let options = ResourceOptions::default().prefix("/admin/people").only(["index"]);
        let routes = plan_routes(&users(), &options);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/admin/people");
    }

    #[test]
    fn duplicate_routes_conflict() {
        let mut routes = plan_routes(&users(), &ResourceOptions::default());
        routes.extend(plan_routes(&users(), &ResourceOptions::default().only(["show"])));
        let err = check_conflicts(&routes).unwrap_err();
        assert!(matches!(err, DeclarationError::DuplicateRoute { ref path, .. } if path == "/users/:id"));
    }
}
