//! Web application serving the vocabulary database.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use clap::Parser;
use croco_core::YandexSpeller;
use croco_store::Store;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod auth;
mod config;
mod error;
mod html;
mod routes;
mod state;
mod upload;

use config::Config;
use state::AppState;

/// Uploaded archives can hold several decks; give them room.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Run the vocabulary web application.
#[derive(Parser, Debug)]
#[command(name = "croco-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bind host
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Bind port (overrides APP_PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let config = Config::load();

    let store = Store::open(&config.db_path)
        .with_context(|| format!("failed to open database at {}", config.db_path.display()))?;

    // Idempotent bootstrap: a concurrent start loses the insert race and
    // leaves the account as-is.
    {
        let store = store.clone();
        let (username, password) = (config.admin_user.clone(), config.admin_password.clone());
        tokio::task::spawn_blocking(move || store.ensure_admin_user(&username, &password))
            .await
            .context("bootstrap task failed")??;
    }

    let state = AppState {
        store,
        speller: Arc::new(YandexSpeller::new()),
    };

    let app = routes::router(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http());

    let port = args.port.unwrap_or(config.port);
    let address = format!("{}:{}", args.host, port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;

    info!("serving on {}", address);
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
