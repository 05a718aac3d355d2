//! GreenWindow - greenest-moment device for the Vandebron energy API
//!
//! Loads configuration, pairs on first run (or re-authenticates), then keeps
//! the session and polling timers alive until Ctrl-C.

use anyhow::Context;
use greenwindow_app::utils::logging::init_tracing;
use greenwindow_app::AppContext;
use greenwindow_domain::Credentials;
use greenwindow_infra::config;
use tracing::{info, warn};

const USERNAME_VAR: &str = "GREENWINDOW_USERNAME";
const PASSWORD_VAR: &str = "GREENWINDOW_PASSWORD";

/// Credentials from the environment, when both variables are set.
fn env_credentials() -> Option<Credentials> {
    let username = std::env::var(USERNAME_VAR).ok().filter(|v| !v.trim().is_empty())?;
    let password = std::env::var(PASSWORD_VAR).ok().filter(|v| !v.is_empty())?;
    Some(Credentials::new(username, password))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load().context("failed to load configuration")?;
    init_tracing(&config.logging).context("failed to initialise logging")?;

    info!(version = env!("CARGO_PKG_VERSION"), "GreenWindow starting");

    let ctx = AppContext::new_with_config(config).await.context("failed to build application context")?;
    ctx.connect(env_credentials()).await.context("failed to connect to Vandebron")?;
    ctx.start().await.context("failed to start device timers")?;

    info!(display = %ctx.registry.greenest_moment_display(), "GreenWindow running; press Ctrl-C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C; shutting down");
    }

    ctx.shutdown().await.context("failed to shut down cleanly")?;
    info!("GreenWindow stopped");
    Ok(())
}
