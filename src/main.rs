use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use upload_core::config::{
    filename_policy_from_env_value, max_upload_bytes_from_env_value, uploads_dir_from_env_value,
};
use upload_core::UploadConfig;

/// Main entry point for the EHR upload service
///
/// Resolves configuration from the environment (and `.env`), creates the uploads directory and
/// serves the REST API.
///
/// # Environment Variables
/// - `EHR_UPLOAD_ADDR`: server address (default: "0.0.0.0:5000")
/// - `UPLOADS_DIR`: directory for stored uploads and `logs.txt` (default: "uploads")
/// - `UPLOAD_FILENAME_POLICY`: `sanitise` (default) or `verbatim`
/// - `UPLOAD_MAX_BYTES`: request body limit in bytes (default: 100 MiB)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - a configuration value is invalid or the uploads directory cannot be created,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ehr_upload_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("upload_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("EHR_UPLOAD_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".into());

    let cfg = UploadConfig::new(
        uploads_dir_from_env_value(std::env::var("UPLOADS_DIR").ok()),
        filename_policy_from_env_value(std::env::var("UPLOAD_FILENAME_POLICY").ok())?,
        max_upload_bytes_from_env_value(std::env::var("UPLOAD_MAX_BYTES").ok())?,
    )?;
    cfg.ensure_uploads_dir()?;

    tracing::info!(
        "++ Storing uploads in {} ({:?} filenames)",
        cfg.uploads_dir().display(),
        cfg.filename_policy()
    );
    tracing::info!("++ Starting EHR upload service on {}", addr);

    let app = api_rest::router(Arc::new(cfg));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
