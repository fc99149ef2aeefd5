use std::path::PathBuf;
use std::sync::Arc;

use arrrg::CommandLine;
use arrrg_derive::CommandLine;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use eki::validators::{Format, format_of, length_of, password_confirmation};
use eki::{
    ActionOutput, Application, Container, FrameworkConfig, MetadataStore, Model, RenderError,
    ResponseWriter, ViewContext, ViewRenderer, redirect, view_status, view_with,
};

#[derive(CommandLine, Default, PartialEq, Eq)]
struct Args {
    #[arrrg(optional, "Path to a YAML framework configuration")]
    config: Option<String>,
    #[arrrg(optional, "Host to bind the HTTP server")]
    host: Option<String>,
    #[arrrg(optional, "Port to bind the HTTP server")]
    port: Option<u16>,
    #[arrrg(flag, "Enable verbose logging")]
    verbose: bool,
}

const HELP_TEXT: &str = r#"eki-demo - a small sign-up site built with eki

USAGE:
    eki-demo [OPTIONS]

OPTIONS:
    --config <PATH>    YAML framework configuration
    --host <HOST>      Host to bind the HTTP server [default: 127.0.0.1]
    --port <PORT>      Port to bind the HTTP server [default: 8080]
    --verbose          Enable debug logging

ROUTES:
    GET    /accounts          List accounts
    GET    /accounts/create   Show the sign-up form
    POST   /accounts/create   Create an account
    GET    /accounts/:id      Show one account

The server shuts down gracefully on Ctrl+C."#;

#[derive(Model, Deserialize)]
#[model(name = "SignUp")]
struct SignUp {
    #[field(label = "User name")]
    name: String,
    email: String,
    password: String,
    #[field(name = "passwordConfirmation", key = "password_confirmation", label = "Confirmation")]
    #[serde(rename = "passwordConfirmation")]
    #[allow(dead_code)]
    password_confirmation: Option<String>,
}

#[derive(Default)]
struct AccountsController {
    accounts: Mutex<Vec<(String, String)>>,
}

impl AccountsController {
    fn listing(&self) -> Value {
        let accounts = self.accounts.lock();
        accounts
            .iter()
            .enumerate()
            .map(|(id, (name, email))| json!({ "id": id, "name": name, "email": email }))
            .collect()
    }
}

/// Renders every view as a definition list of its data.
struct HtmlRenderer;

#[async_trait]
impl ViewRenderer for HtmlRenderer {
    async fn render(&self, view: ViewContext<'_>, out: &mut ResponseWriter) -> Result<(), RenderError> {
        out.write(format!("<html><head><title>{}</title></head><body>", escape(view.name)));
        out.write(format!("<h1>{}</h1>", escape(view.name)));
        render_value(view.data, out);
        out.write("</body></html>");
        Ok(())
    }
}

fn render_value(value: &Value, out: &mut ResponseWriter) {
    match value {
        Value::Object(map) => {
            out.write("<dl>");
            for (key, value) in map {
                out.write(format!("<dt>{}</dt><dd>", escape(key)));
                render_value(value, out);
                out.write("</dd>");
            }
            out.write("</dl>");
        }
        Value::Array(items) => {
            out.write("<ul>");
            for item in items {
                out.write("<li>");
                render_value(item, out);
                out.write("</li>");
            }
            out.write("</ul>");
        }
        Value::String(s) => out.write(escape(s)),
        Value::Null => {}
        other => out.write(other.to_string()),
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn application(config: FrameworkConfig) -> anyhow::Result<Application> {
    let store = Arc::new(MetadataStore::new());
    let class = store.declare::<SignUp>()?;
    store.validation(&class, |v| {
        v.check("name", length_of().min(2).max(40));
        v.check("email", format_of(Format::Email));
        v.check("password", length_of().min(8));
        v.check("password", password_confirmation());
    })?;

    let mut container = Container::new();
    container.singleton("AccountsController", AccountsController::default());
    let mut app = Application::new(Arc::clone(&store), Arc::new(container))
        .with_renderer(Arc::new(HtmlRenderer))
        .with_config(config);

    app.controller::<AccountsController>("AccountsController")
        .action("index", |accounts: Arc<AccountsController>, _| async move {
            Ok(view_with("accounts/index", json!({ "accounts": accounts.listing() })))
        })
        .action("show", |accounts: Arc<AccountsController>, cx| async move {
            let id = cx
                .data()
                .params
                .get("id")
                .and_then(Value::as_str)
                .and_then(|id| id.parse::<usize>().ok());
            let listing = accounts.listing();
            let output = match id.and_then(|id| listing.get(id)) {
                Some(account) => ActionOutput::from(view_with("accounts/show", account.clone())),
                None => ActionOutput::from(404u16),
            };
            Ok(output)
        })
        .action("create", |_, _| async move {
            Ok(view_with("accounts/create", json!({ "errors": {} })))
        })
        .action("doCreate", |accounts: Arc<AccountsController>, cx| async move {
            let mut sign_up = cx.bind::<SignUp>()?;
            if !sign_up.is_valid()? {
                let errors = sign_up.errors().to_json();
                info!(count = sign_up.errors().count(), "rejected sign-up");
                return Ok(ActionOutput::from(view_status(
                    422,
                    "accounts/create",
                    json!({ "errors": errors }),
                )));
            }
            let sign_up: SignUp = sign_up.deserialize()?;
            info!(name = %sign_up.name, "account created");
            accounts.accounts.lock().push((sign_up.name, sign_up.email));
            Ok::<ActionOutput, anyhow::Error>(redirect("/accounts").into())
        })
        .register()?;
    Ok(app)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (args, free) = Args::from_command_line("USAGE: eki-demo [OPTIONS]");

    if !free.is_empty() && free[0] == "help" {
        println!("{}", HELP_TEXT);
        return Ok(());
    }

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = match &args.config {
        Some(path) => FrameworkConfig::from_path(PathBuf::from(path))?,
        None => FrameworkConfig::default(),
    };
    config.validate()?;

    let router = application(config)?.into_router()?;

    let addr = format!(
        "{}:{}",
        args.host.as_deref().unwrap_or("127.0.0.1"),
        args.port.unwrap_or(8080)
    );
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind to {addr}: {e}"))?;
    info!(%addr, "eki demo listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(err) = signal::ctrl_c().await {
                tracing::error!(%err, "failed to install Ctrl+C handler");
            }
        })
        .await?;
    info!("eki demo stopped");
    Ok(())
}
