//! Request dispatch.
//!
//! Every request passes through four stages, each consuming the state the
//! previous one produced:
//!
//! 1. [`Dispatcher::establish`] reads the request into a [`RequestContext`].
//! 2. [`Dispatcher::bind_route`] resolves the controller through the container.
//! 3. [`Dispatcher::execute`] runs the action and awaits its output.
//! 4. [`Dispatcher::interpret`] turns the output into a response.
//!
//! [`Dispatcher::dispatch`] runs all four and converts any [`DispatchError`]
//! into an error response.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::{FromRequestParts, RawPathParams, Request};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::{
    ActionOutput, ActionResult, BodyError, ClassKey, DeclarationError, FrameworkConfig, Instance,
    MetadataStore, RenderError, RequestContext, RequestData, Resolver, ResponseWriter, RouteInfo,
    ViewContext, ViewRenderer,
};

/// The future an action handler returns.
pub type ActionFuture = Pin<Box<dyn Future<Output = anyhow::Result<ActionOutput>> + Send>>;

/// A type-erased action: the resolved controller instance and the request
/// context in, the action's output out.
pub type ActionHandler = Arc<dyn Fn(Instance, RequestContext) -> ActionFuture + Send + Sync>;

//////////////////////////////////////////// DispatchError /////////////////////////////////////////////

/// Failures while serving a request.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The request body could not be read or parsed.
    #[error(transparent)]
    Body(#[from] BodyError),
    /// The container had nothing for the controller.
    #[error("no instance of controller {controller} could be resolved")]
    ControllerUnresolved {
        /// The controller class.
        controller: ClassKey,
    },
    /// The route names an action with no handler.
    #[error("{controller} has no handler for action {action}")]
    MissingAction {
        /// The controller class.
        controller: ClassKey,
        /// The action name.
        action: String,
    },
    /// The action failed.
    #[error("action {controller}#{action} failed: {source}")]
    Action {
        /// The controller class.
        controller: ClassKey,
        /// The action name.
        action: String,
        /// What the action returned.
        #[source]
        source: anyhow::Error,
    },
    /// The action returned something that is not a result.
    #[error("invalid action result: {0}")]
    InvalidResult(String),
    /// The renderer failed.
    #[error("cannot render view {view}: {source}")]
    Render {
        /// The view name.
        view: String,
        /// What the renderer returned.
        #[source]
        source: RenderError,
    },
    /// Metadata needed while serving the request is missing.
    #[error(transparent)]
    Declaration(#[from] DeclarationError),
}

impl DispatchError {
    /// The response status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Body(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// An error response, with the error text in the body when `details` is
    /// set and the canonical reason otherwise.
    pub fn respond(&self, details: bool) -> Response {
        let status = self.status();
        let body = if details {
            self.to_string()
        } else {
            status.canonical_reason().unwrap_or("error").to_string()
        };
        (status, body).into_response()
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        self.respond(false)
    }
}

//////////////////////////////////////////////// stages ////////////////////////////////////////////////

/// Stage one: the request has been read.
#[derive(Debug)]
pub struct Established {
    context: RequestContext,
}

impl Established {
    /// The request context.
    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

/// Stage two: the controller instance is known.
#[derive(Debug)]
pub struct Routed {
    context: RequestContext,
    route: Arc<RouteInfo>,
    controller: Instance,
}

impl Routed {
    /// The route being served.
    pub fn route(&self) -> &RouteInfo {
        &self.route
    }
}

/// Stage three: the action has produced its output.
#[derive(Debug)]
pub struct Executed {
    context: RequestContext,
    route: Arc<RouteInfo>,
    output: ActionOutput,
}

impl Executed {
    /// The action's output.
    pub fn output(&self) -> &ActionOutput {
        &self.output
    }
}

////////////////////////////////////////////// Dispatcher //////////////////////////////////////////////

/// Serves requests for mounted routes.
pub struct Dispatcher {
    store: Arc<MetadataStore>,
    resolver: Arc<dyn Resolver>,
    renderer: Arc<dyn ViewRenderer>,
    config: FrameworkConfig,
    handlers: HashMap<ClassKey, HashMap<String, ActionHandler>>,
}

impl Dispatcher {
    /// A dispatcher over the given collaborators and action handlers.
    pub fn new(
        store: Arc<MetadataStore>,
        resolver: Arc<dyn Resolver>,
        renderer: Arc<dyn ViewRenderer>,
        config: FrameworkConfig,
        handlers: HashMap<ClassKey, HashMap<String, ActionHandler>>,
    ) -> Self {
        Self {
            store,
            resolver,
            renderer,
            config,
            handlers,
        }
    }

    /// The configuration in effect.
    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    /// Reads path parameters, the query string and the body.
    pub async fn establish(&self, request: Request) -> Result<Established, DispatchError> {
        let (mut parts, body) = request.into_parts();
        let mut params = Map::new();
        if let Ok(raw) = RawPathParams::from_request_parts(&mut parts, &()).await {
            for (key, value) in &raw {
                params.insert(key.to_string(), Value::String(value.to_string()));
            }
        }
        let query = parts
            .uri
            .query()
            .map(|q| RequestData::parse_form(q.as_bytes()))
            .unwrap_or_default();
        let bytes = axum::body::to_bytes(body, self.config.body_limit)
            .await
            .map_err(|e| BodyError::Unreadable(e.to_string()))?;
        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let body = RequestData::parse_body(content_type, &bytes)?;
        let data = RequestData {
            query,
            params,
            body,
        };
        let context = RequestContext::new(
            parts.method,
            parts.uri,
            parts.headers,
            data,
            Arc::clone(&self.store),
            Arc::clone(&self.resolver),
        );
        Ok(Established { context })
    }

    /// Resolves the controller serving `route`.
    pub fn bind_route(&self, established: Established, route: Arc<RouteInfo>) -> Result<Routed, DispatchError> {
        let class = &route.controller.class;
        let Some(controller) = self.resolver.resolve_any(class) else {
            return Err(DispatchError::ControllerUnresolved {
                controller: class.clone(),
            });
        };
        Ok(Routed {
            context: established.context,
            route,
            controller,
        })
    }

    /// Runs the action and awaits it.
    pub async fn execute(&self, routed: Routed) -> Result<Executed, DispatchError> {
        let Routed {
            context,
            route,
            controller,
        } = routed;
        let class = &route.controller.class;
        let action = &route.action.name;
        let handler = self
            .handlers
            .get(class)
            .and_then(|actions| actions.get(action))
            .ok_or_else(|| DispatchError::MissingAction {
                controller: class.clone(),
                action: action.clone(),
            })?;
        let output = match handler(controller, context.clone()).await {
            Ok(output) => output,
            Err(source) => {
                warn!(endpoint = %route.endpoint(), error = %source, "action failed");
                return Err(DispatchError::Action {
                    controller: class.clone(),
                    action: action.clone(),
                    source,
                });
            }
        };
        Ok(Executed {
            context,
            route,
            output,
        })
    }

    /// Applies each result in order; the status defaults to 200.
    pub async fn interpret(&self, executed: Executed) -> Result<Response, DispatchError> {
        let Executed {
            context,
            route,
            output,
        } = executed;
        let mut out = ResponseWriter::new();
        out.headers_mut().extend(context.take_response_headers());
        for item in output.into_items() {
            let Some(item) = item else {
                continue;
            };
            let Some(item) = item.normalize().map_err(DispatchError::InvalidResult)? else {
                continue;
            };
            match item {
                ActionResult::Status(code) => out.set_status(status_code(code)?),
                ActionResult::View(view) => {
                    if !out.status_is_set() {
                        out.set_status(status_code(view.status)?);
                    }
                    if self.config.emit_doctype {
                        out.default_content_type("text/html; charset=utf-8");
                        out.write("<!DOCTYPE html>");
                    }
                    let cx = ViewContext {
                        name: &view.name,
                        status: out.status().unwrap_or(StatusCode::OK),
                        data: &view.data,
                        route: &route,
                        request: &context,
                    };
                    self.renderer
                        .render(cx, &mut out)
                        .await
                        .map_err(|source| DispatchError::Render {
                            view: view.name.clone(),
                            source,
                        })?;
                }
                ActionResult::Redirect(redirect) => {
                    let code = redirect.status.unwrap_or(self.config.default_redirect_status);
                    out.set_status(status_code(code)?);
                    let location = HeaderValue::from_str(&redirect.url).map_err(|_| {
                        DispatchError::InvalidResult(format!("invalid redirect location {:?}", redirect.url))
                    })?;
                    out.headers_mut().insert(header::LOCATION, location);
                }
                ActionResult::Json(value) => {
                    return Err(DispatchError::InvalidResult(format!("unrecognized result {value}")));
                }
            }
        }
        Ok(out.into_response())
    }

    /// Serves `request` on `route`.
    pub async fn dispatch(&self, route: Arc<RouteInfo>, request: Request) -> Response {
        match self.run(Arc::clone(&route), request).await {
            Ok(response) => response,
            Err(err) => {
                if !matches!(err, DispatchError::Action { .. }) {
                    error!(endpoint = %route.endpoint(), error = %err, "dispatch failed");
                }
                err.respond(self.config.expose_error_details)
            }
        }
    }

    async fn run(&self, route: Arc<RouteInfo>, request: Request) -> Result<Response, DispatchError> {
        let established = self.establish(request).await?;
        let routed = self.bind_route(established, route)?;
        let executed = self.execute(routed).await?;
        self.interpret(executed).await
    }
}

fn status_code(code: u16) -> Result<StatusCode, DispatchError> {
    StatusCode::from_u16(code).map_err(|_| DispatchError::InvalidResult(format!("{code} is not a valid status code")))
}
