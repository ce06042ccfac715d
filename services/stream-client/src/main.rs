//! MagicStream command-line client
//!
//! Single-binary client that:
//! 1. Signs in to the MagicStream backend
//! 2. Issues the requested calls concurrently through one `AuthClient`
//! 3. Prints each outcome as a JSON line on stdout
//! 4. Signs out, exiting non-zero if the session ended underneath it

mod cli;
mod config;
mod error;
mod metrics;

use std::sync::Arc;

use anyhow::{Context, Result};
use auth_client::AuthClient;
use futures_util::future::join_all;
use session::CredentialStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::{ApiRequest, HttpTransport, RawResponse};

use crate::cli::Cli;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse(std::env::args().skip(1)).context("invalid arguments")?;
    let prometheus = if cli.metrics {
        Some(metrics::install_recorder().context("failed to install metrics recorder")?)
    } else {
        None
    };

    let config_path = Config::resolve_path(cli.config_path.as_deref());
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    info!(
        base_url = %config.api.base_url,
        timeout_secs = config.api.timeout_secs,
        headers = config.headers.len(),
        "configuration loaded"
    );

    let transport =
        HttpTransport::new(config.transport()).context("failed to build HTTP transport")?;
    let client = AuthClient::new(
        Arc::new(transport),
        Arc::new(CredentialStore::new()),
        config.endpoints(),
    );
    client.on_session_ended(|reason| {
        warn!(%reason, "session ended, sign in again to continue");
    });

    let password = config.password()?;
    let profile = client
        .login(&config.session.email, password)
        .await
        .context("login failed")?;
    info!(
        user_id = %profile.user_id,
        requests = cli.requests.len(),
        "signed in, issuing requests"
    );

    let outcomes = join_all(cli.requests.iter().map(|request| {
        let client = &client;
        async move { (request, client.call(request.clone()).await) }
    }))
    .await;

    let mut session_ended = false;
    for (request, outcome) in &outcomes {
        if let Err(e) = outcome {
            session_ended |= e.is_session_ended();
        }
        println!("{}", outcome_json(request, outcome));
    }

    if session_ended {
        client.end_session("session ended during run");
    } else if let Err(e) = client.logout().await {
        warn!(error = %e, "logout failed");
    }

    if let Some(handle) = prometheus {
        eprint!("{}", handle.render());
    }

    if session_ended {
        anyhow::bail!("session ended; sign in again");
    }
    Ok(())
}

/// One JSON line describing a call's outcome.
fn outcome_json(
    request: &ApiRequest,
    outcome: &auth_client::Result<RawResponse>,
) -> serde_json::Value {
    match outcome {
        Ok(response) => {
            let body = response
                .json::<serde_json::Value>()
                .unwrap_or_else(|_| serde_json::Value::String(response.text()));
            serde_json::json!({
                "method": request.method.as_str(),
                "path": request.path,
                "status": response.status,
                "body": body,
            })
        }
        Err(e) => serde_json::json!({
            "method": request.method.as_str(),
            "path": request.path,
            "error": e.label(),
            "message": e.to_string(),
            "retryable": e.is_retryable(),
        }),
    }
}
