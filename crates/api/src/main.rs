//! LessonHub - restores the stored session and reports its state.

use anyhow::Context;
use lessonhub_infra::{config, observability};
use lessonhub_lib::AppContext;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env must be read before the configuration; its outcome is logged once
    // tracing is up
    let dotenv = dotenvy::dotenv();

    let config = config::load().context("failed to load LessonHub configuration")?;
    observability::init_tracing(&config.logging)?;

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(e) => warn!(error = %e, "Could not load .env file"),
    }

    let ctx = AppContext::new(config)?;
    let session = ctx.session.init().await;

    info!(
        authenticated = session.is_authenticated,
        user = session.user.as_ref().and_then(|user| user.email()).unwrap_or("-"),
        "LessonHub session ready"
    );
    Ok(())
}
