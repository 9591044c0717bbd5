//! Memory Match Back binary entrypoint wiring REST, SSE and the score store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "mongo-store")]
use memory_match_back::dao::score_store::mongodb::{MongoConfig, MongoScoreStore};
#[cfg(feature = "rest-store")]
use memory_match_back::dao::score_store::rest::{RestConfig, RestScoreStore};
use memory_match_back::{
    config::AppConfig,
    dao::{
        score_store::{MemoryScoreStore, ScoreStore},
        storage::StorageError,
    },
    routes,
    services::{session_sweeper, storage_supervisor},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let backend = StoreBackend::from_env()?;
    let app_state = AppState::new(AppConfig::load());

    spawn_storage_supervisor(app_state.clone(), backend);
    tokio::spawn(session_sweeper::run(app_state.clone()));
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Score store selected with the `SCORE_STORE` environment variable.
enum StoreBackend {
    Memory,
    #[cfg(feature = "mongo-store")]
    Mongo {
        uri: String,
        database: Option<String>,
    },
    #[cfg(feature = "rest-store")]
    Rest(RestConfig),
}

impl StoreBackend {
    fn from_env() -> anyhow::Result<Self> {
        let kind = env::var("SCORE_STORE").unwrap_or_else(|_| "memory".into());
        match kind.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            #[cfg(feature = "mongo-store")]
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo {
                uri: env::var("MONGO_URI")
                    .unwrap_or_else(|_| "mongodb://localhost:27017".into()),
                database: env::var("MONGO_DB").ok(),
            }),
            #[cfg(feature = "rest-store")]
            "rest" => Ok(StoreBackend::Rest(
                RestConfig::from_env().context("configuring REST score store")?,
            )),
            other => anyhow::bail!("unsupported SCORE_STORE `{other}`"),
        }
    }
}

/// Run the connection supervisor of the selected backend in the background.
fn spawn_storage_supervisor(state: SharedState, backend: StoreBackend) {
    match backend {
        StoreBackend::Memory => {
            info!("using in-memory score store");
            tokio::spawn(storage_supervisor::run(state, || async {
                Ok::<_, StorageError>(Arc::new(MemoryScoreStore::new()) as Arc<dyn ScoreStore>)
            }));
        }
        #[cfg(feature = "mongo-store")]
        StoreBackend::Mongo { uri, database } => {
            info!("using MongoDB score store");
            tokio::spawn(storage_supervisor::run(state, move || {
                let uri = uri.clone();
                let database = database.clone();
                async move {
                    let config = MongoConfig::from_uri(&uri, database.as_deref()).await?;
                    let store = MongoScoreStore::connect(config).await?;
                    Ok::<_, StorageError>(Arc::new(store) as Arc<dyn ScoreStore>)
                }
            }));
        }
        #[cfg(feature = "rest-store")]
        StoreBackend::Rest(config) => {
            info!(base_url = %config.base_url, "using REST score store");
            tokio::spawn(storage_supervisor::run(state, move || {
                let config = config.clone();
                async move {
                    let store = RestScoreStore::connect(config).await?;
                    Ok::<_, StorageError>(Arc::new(store) as Arc<dyn ScoreStore>)
                }
            }));
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
