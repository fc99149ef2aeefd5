//! # eki: declarative request models and controllers for axum
//!
//! eki turns raw HTTP requests into typed, validated model instances and
//! dispatches them to controller actions whose results become responses.
//!
//! - **Models** are declared once, with a builder or `#[derive(Model)]`, and
//!   resolved lazily into merged [`ModelMetadata`] that follows inheritance.
//! - **Binding** pulls each field from the query string, path parameters or
//!   body, coerces it to the declared [`FieldType`], and records cast errors
//!   instead of failing.
//! - **Validation** runs the declared [`Validator`]s and collects a
//!   field-keyed [`ErrorList`].
//! - **Controllers** group actions under a route prefix.  Methods and paths
//!   follow a RESTful convention unless given explicitly.
//! - **Dispatch** runs every request through four stages: context, route,
//!   execution and result interpretation.
//!
//! ## Declaring and binding a model
//!
//! ```rust
//! use eki::{ClassKey, FieldDescriptor, FieldValue, MetadataStore, RequestData, bind};
//! use eki::validators::{format_of, Format, required};
//! use serde_json::json;
//!
//! let store = MetadataStore::new();
//! store
//!     .model("SignUp")
//!     .field(FieldDescriptor::string("email").required())
//!     .field(FieldDescriptor::int("age"))
//!     .validation(|v| {
//!         v.check("email", format_of(Format::Email));
//!     })
//!     .register()
//!     .unwrap();
//!
//! let data = RequestData::new()
//!     .with_body("email", json!("ada@example.com"))
//!     .with_body("age", json!("37"));
//! let mut sign_up = bind(&store, &ClassKey::new("SignUp"), &data).unwrap();
//! assert_eq!(sign_up.get("age"), Some(&FieldValue::Int(37)));
//! assert!(sign_up.is_valid().unwrap());
//! ```
//!
//! ## Serving controllers
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use eki::{Application, Container, MetadataStore, redirect};
//!
//! struct SessionsController;
//!
//! let mut container = Container::new();
//! container.singleton("SessionsController", SessionsController);
//! let mut app = Application::new(Arc::new(MetadataStore::new()), Arc::new(container));
//! app.controller::<SessionsController>("SessionsController")
//!     .action("doCreate", |_sessions, _cx| async move { Ok(redirect("/")) })
//!     .register()
//!     .unwrap();
//! let router: axum::Router = app.into_router().unwrap();
//! # let _ = router;
//! ```

#![warn(missing_docs)]
mod application;
mod binding;
mod config;
mod container;
mod context;
mod controller;
mod errors;
mod json_schema;
mod metadata;
mod model;
mod pipeline;
mod reflection;
mod render;
mod result;
mod routing;
mod test_utils;
mod validation;
mod value;

/// Built-in validation rules.
pub mod validators;

pub use application::{Application, ControllerBuilder};
pub use binding::{BodyError, RequestData, Source, UnknownSource, bind, bind_metadata};
pub use config::FrameworkConfig;
pub use container::{Container, Instance, Resolver};
pub use context::RequestContext;
pub use controller::{
    ActionDescriptor, ControllerDescriptor, HttpMethod, controller_name, convention,
    default_prefix, pluralize,
};
pub use errors::{
    ConfigError, DeclarationError, ErrorList, ModelError, RenderError, ValidationError,
};
pub use metadata::{Declarer, FieldDescriptor, MetadataStore, Model, ModelBuilder, ModelMetadata};
pub use model::ModelInstance;
pub use pipeline::{
    ActionFuture, ActionHandler, DispatchError, Dispatcher, Established, Executed, Routed,
};
pub use reflection::{ClassHierarchy, ClassKey, HasClass, PropertyKind, PropertyLists};
pub use render::{MissingRenderer, ResponseWriter, ViewContext, ViewRenderer};
pub use result::{
    ActionOutput, ActionResult, RedirectResult, ViewResult, redirect, redirect_status, view,
    view_status, view_with,
};
pub use routing::{ResourceOptions, RouteInfo, check_conflicts, plan_routes, route_path};
pub use validation::{FieldValidator, Rule, ValidationBuilder, ValidationSchema, Validator, bind_rule};
pub use value::{FieldType, FieldValue};

pub use eki_derive::Model;
