//! Wiring controllers into an axum router.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use eki::{Application, Container, MetadataStore, view};
//!
//! struct UsersController;
//!
//! let mut container = Container::new();
//! container.singleton("UsersController", UsersController);
//! let mut app = Application::new(Arc::new(MetadataStore::new()), Arc::new(container));
//! app.controller::<UsersController>("UsersController")
//!     .action("index", |_users, _cx| async move { Ok(view("users/index")) })
//!     .action("doCreate", |_users, _cx| async move { Ok(201u16) })
//!     .register()
//!     .unwrap();
//! let paths: Vec<_> = app.routes().into_iter().map(|r| (r.method().as_str(), r.path)).collect();
//! assert_eq!(paths, [("GET", "/users".to_string()), ("POST", "/users/create".to_string())]);
//! let router: axum::Router = app.into_router().unwrap();
//! # let _ = router;
//! ```

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use axum::Router;
use axum::extract::Request;
use axum::routing::MethodRouter;
use tracing::debug;

use crate::{
    ActionDescriptor, ActionFuture, ActionHandler, ActionOutput, ClassKey, ControllerDescriptor,
    DeclarationError, Dispatcher, FrameworkConfig, HttpMethod, Instance, MetadataStore,
    MissingRenderer, RequestContext, ResourceOptions, Resolver, RouteInfo, ViewRenderer,
    check_conflicts, plan_routes,
};

/// Controllers, their action handlers and the collaborators requests need.
pub struct Application {
    store: Arc<MetadataStore>,
    resolver: Arc<dyn Resolver>,
    renderer: Arc<dyn ViewRenderer>,
    config: FrameworkConfig,
    mounts: Vec<(Arc<ControllerDescriptor>, ResourceOptions)>,
    handlers: HashMap<ClassKey, HashMap<String, ActionHandler>>,
}

impl Application {
    /// An application with no controllers and no renderer.
    pub fn new(store: Arc<MetadataStore>, resolver: Arc<dyn Resolver>) -> Self {
        Self {
            store,
            resolver,
            renderer: Arc::new(MissingRenderer),
            config: FrameworkConfig::default(),
            mounts: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Renders views with `renderer`.
    pub fn with_renderer(mut self, renderer: Arc<dyn ViewRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Uses `config` for dispatch.
    pub fn with_config(mut self, config: FrameworkConfig) -> Self {
        self.config = config;
        self
    }

    /// The metadata store.
    pub fn store(&self) -> &Arc<MetadataStore> {
        &self.store
    }

    /// Starts declaring a controller whose instances, resolved under `class`,
    /// are of type `C`.
    pub fn controller<C: Any + Send + Sync>(&mut self, class: impl Into<ClassKey>) -> ControllerBuilder<'_, C> {
        ControllerBuilder {
            app: self,
            class: class.into(),
            prefix: None,
            options: ResourceOptions::default(),
            actions: Vec::new(),
            _controller: PhantomData,
        }
    }

    /// Every planned route, controllers in registration order.
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.mounts
            .iter()
            .flat_map(|(controller, options)| plan_routes(controller, options))
            .collect()
    }

    /// Mounts every route on a router.  Fails if two routes share a method
    /// and path.
    pub fn into_router(self) -> Result<Router, DeclarationError> {
        let routes = self.routes();
        check_conflicts(&routes)?;
        let dispatcher = Arc::new(Dispatcher::new(
            self.store,
            self.resolver,
            self.renderer,
            self.config,
            self.handlers,
        ));
        let mut by_path: BTreeMap<String, MethodRouter> = BTreeMap::new();
        for route in routes {
            debug!(method = %route.method(), path = %route.path, endpoint = %route.endpoint(), "mounting route");
            let filter = route.method().method_filter();
            let path = route.path.clone();
            let route = Arc::new(route);
            let dispatcher = Arc::clone(&dispatcher);
            let handler = move |request: Request| async move { dispatcher.dispatch(route, request).await };
            let method_router = match by_path.remove(&path) {
                Some(existing) => existing.on(filter, handler),
                None => axum::routing::on(filter, handler),
            };
            by_path.insert(path, method_router);
        }
        let mut router = Router::new();
        for (path, method_router) in by_path {
            router = router.route(&path, method_router);
        }
        Ok(router)
    }
}

/// Declares one controller's actions.  Nothing takes effect until
/// [`ControllerBuilder::register`].
pub struct ControllerBuilder<'a, C> {
    app: &'a mut Application,
    class: ClassKey,
    prefix: Option<String>,
    options: ResourceOptions,
    actions: Vec<(ActionDescriptor, ActionHandler)>,
    _controller: PhantomData<fn() -> C>,
}

impl<C: Any + Send + Sync> ControllerBuilder<'_, C> {
    /// Sets the controller's route prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Mount-time options: a prefix override and an `only` filter.
    pub fn options(mut self, options: ResourceOptions) -> Self {
        self.options = options;
        self
    }

    /// Mounts only `actions`.
    pub fn only<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = self.options.only(actions);
        self
    }

    /// Adds an action mounted by convention.
    pub fn action<F, Fut, R>(self, name: &str, action: F) -> Self
    where
        F: Fn(Arc<C>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Into<ActionOutput>,
    {
        self.action_with(name, None, None, action)
    }

    /// Adds an action with an explicit method and/or path.
    pub fn action_with<F, Fut, R>(
        mut self,
        name: &str,
        method: Option<HttpMethod>,
        path: Option<&str>,
        action: F,
    ) -> Self
    where
        F: Fn(Arc<C>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Into<ActionOutput>,
    {
        let descriptor = ActionDescriptor::resolve(name, method, path);
        let handler: ActionHandler = Arc::new(move |instance: Instance, cx: RequestContext| -> ActionFuture {
            match instance.downcast::<C>() {
                Ok(controller) => {
                    let output = action(controller, cx);
                    Box::pin(async move { output.await.map(Into::into) })
                }
                Err(_) => Box::pin(async move {
                    Err(anyhow::anyhow!(
                        "resolved controller is not a {}",
                        std::any::type_name::<C>()
                    ))
                }),
            }
        });
        self.actions.push((descriptor, handler));
        self
    }

    /// Records the controller in the metadata store and mounts it.
    pub fn register(self) -> Result<Arc<ControllerDescriptor>, DeclarationError> {
        let descriptors = self.actions.iter().map(|(d, _)| d.clone()).collect();
        let descriptor = ControllerDescriptor::new(self.class.clone(), self.prefix, descriptors)?;
        let descriptor = self.app.store.define_controller(descriptor)?;
        let handlers = self.app.handlers.entry(self.class).or_default();
        for (action, handler) in self.actions {
            handlers.insert(action.name, handler);
        }
        self.app.mounts.push((Arc::clone(&descriptor), self.options));
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Container, redirect};

    struct Users;

    fn app() -> Application {
        let mut container = Container::new();
        container.singleton("UsersController", Users);
        Application::new(Arc::new(MetadataStore::new()), Arc::new(container))
    }

    #[test]
    fn register_records_descriptor() {
        let mut app = app();
        let descriptor = app
            .controller::<Users>("UsersController")
            .action("index", |_, _| async move { Ok(()) })
            .action_with("archive", Some(HttpMethod::Post), None, |_, _| async move {
                Ok(redirect("/users"))
            })
            .register()
            .unwrap();
        assert_eq!(descriptor.prefix, "users");
        assert_eq!(
            app.store().action_names(&ClassKey::new("UsersController")),
            ["index", "archive"]
        );
        let routes: Vec<_> = app.routes().into_iter().map(|r| (r.method(), r.path)).collect();
        assert_eq!(
            routes,
            [
                (HttpMethod::Get, "/users".to_string()),
                (HttpMethod::Post, "/users/archive".to_string()),
            ]
        );
    }

    #[test]
    fn only_and_prefix() {
        let mut app = app();
        app.controller::<Users>("UsersController")
            .prefix("/people")
            .only(["show"])
            .action("index", |_, _| async move { Ok(()) })
            .action("show", |_, _| async move { Ok(()) })
            .register()
            .unwrap();
        let paths: Vec<_> = app.routes().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, ["/people/:id"]);
    }

    #[test]
    fn duplicate_controllers_and_routes_fail() {
        let mut app = app();
        app.controller::<Users>("UsersController")
            .action("index", |_, _| async move { Ok(()) })
            .register()
            .unwrap();
        let err = app
            .controller::<Users>("UsersController")
            .action("index", |_, _| async move { Ok(()) })
            .register()
            .unwrap_err();
        assert!(matches!(err, DeclarationError::DuplicateController { .. }));

        app.controller::<Users>("AccountsController")
            .prefix("users")
            .action("index", |_, _| async move { Ok(()) })
            .register()
            .unwrap();
        let err = app.into_router().unwrap_err();
        assert!(matches!(err, DeclarationError::DuplicateRoute { ref path, .. } if path == "/users"));
    }
}
