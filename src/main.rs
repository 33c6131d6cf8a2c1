//! circled - invite-gated group backend.

use circled::auth::SessionIssuer;
use circled::http::{self, AppState};
use circled::{Config, Database};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "circled.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(server = %config.server.name, "Starting circled");

    // SECURITY: Refuse to start with a default/weak session secret.
    // Access tokens are signed with it; a predictable secret lets anyone
    // mint sessions for arbitrary users.
    if config.auth.is_default_secret() {
        if std::env::var("CIRCLED_ALLOW_INSECURE_SESSIONS").is_ok() {
            tracing::warn!(
                "INSECURE: Running with weak session_secret (allowed via CIRCLED_ALLOW_INSECURE_SESSIONS)"
            );
        } else {
            error!("FATAL: Insecure session_secret detected!");
            error!("  The session_secret signs user access tokens.");
            error!("  To fix, set a strong secret in circled.toml:");
            error!("    [auth]");
            error!("    session_secret = \"<random-32-char-string>\"");
            error!("  Generate one with: openssl rand -hex 32");
            error!("  For testing only, set CIRCLED_ALLOW_INSECURE_SESSIONS=1 to bypass.");
            return Err(anyhow::anyhow!(
                "Refusing to start with insecure session_secret. See error messages above."
            ));
        }
    }

    // Initialize database
    let db = Database::new(&config.database.path).await?;

    let sessions = SessionIssuer::from_config(&config.auth);
    let listen = config.server.listen;
    let state = AppState {
        db,
        sessions,
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(addr = %listen, "HTTP API listening");
    axum::serve(listener, http::router(state)).await?;

    Ok(())
}
