mod error;
mod server;

use crate::error::{ErrorKind, Result};
use crate::server::{AppState, create_router};
use clap::{Parser, ValueEnum};
use exn::ResultExt;
use hepc_config::{Config, Overrides, StorageConfig};
use hepc_storage::{BackendHandle, LocalBackend, MetadataCache, RemoteBackend};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// Crates whose events are shown at `info` unless `RUST_LOG` says otherwise.
const LOG_DIRECTIVES: [&str; 4] = ["hepc=info", "hepc_config=info", "hepc_extract=info", "hepc_storage=info"];

#[derive(Clone, Copy, ValueEnum)]
enum StorageKind {
    Local,
    S3,
}
impl StorageKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::S3 => "s3",
        }
    }
}

/// Serves CodeQL databases, and a catalog describing them, over HTTP.
///
/// Flags override environment variables (`HEPC_*`), which override the
/// configuration file.
#[derive(Parser)]
#[command(name = "hepc", version, long_about = None)]
struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(long, env = "HEPC_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind to [default: 127.0.0.1]
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to [default: 8070]
    #[arg(long, short)]
    port: Option<u16>,

    /// Base URL used in catalog result URLs [default: http://<host>:<port>]
    #[arg(long)]
    endpoint_url: Option<String>,

    /// Storage backend type
    #[arg(long, value_enum)]
    storage: Option<StorageKind>,

    /// Directory containing CodeQL databases (local storage)
    #[arg(long)]
    db_dir: Option<PathBuf>,

    /// Bucket name (s3 storage)
    #[arg(long)]
    s3_bucket: Option<String>,

    /// Key prefix within the bucket (s3 storage)
    #[arg(long)]
    s3_prefix: Option<String>,

    /// Bucket region (s3 storage)
    #[arg(long)]
    s3_region: Option<String>,

    /// Endpoint for S3-compatible services (s3 storage)
    #[arg(long)]
    s3_endpoint: Option<String>,

    /// Seconds a scanned catalog is served before rescanning [default: 300]
    #[arg(long)]
    cache_ttl: Option<u64>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            port: self.port,
            endpoint_url: self.endpoint_url.clone(),
            storage_kind: self.storage.map(|kind| kind.as_str().to_string()),
            db_dir: self.db_dir.clone(),
            s3_bucket: self.s3_bucket.clone(),
            s3_prefix: self.s3_prefix.clone(),
            s3_region: self.s3_region.clone(),
            s3_endpoint: self.s3_endpoint.clone(),
            cache_ttl_seconds: self.cache_ttl,
        }
    }
}

fn init_logging() -> Result<()> {
    let mut filter = EnvFilter::from_default_env();
    for directive in LOG_DIRECTIVES {
        filter = filter.add_directive(directive.parse::<Directive>().or_raise(|| ErrorKind::Logging)?);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

/// Construct the backend named by the configuration.
fn init_storage(config: &Config) -> Result<BackendHandle> {
    let endpoint_url = config.server.effective_endpoint_url();
    let cache = MetadataCache::new(config.cache.ttl());
    let backend: BackendHandle = match &config.storage {
        StorageConfig::Local { root } => {
            let backend = LocalBackend::new(root, &endpoint_url).or_raise(|| ErrorKind::Storage)?;
            Arc::new(backend.with_cache(cache))
        },
        StorageConfig::S3 {
            bucket,
            prefix,
            region,
            endpoint,
            key_id,
            key_secret,
        } => {
            let backend = RemoteBackend::s3(
                bucket,
                prefix.as_deref(),
                region,
                endpoint.as_deref(),
                key_id,
                key_secret,
                &endpoint_url,
            )
            .or_raise(|| ErrorKind::Storage)?;
            Arc::new(backend.with_cache(cache))
        },
    };
    tracing::info!(
        storage = backend.kind(),
        endpoint = %endpoint_url,
        cache_ttl_seconds = config.cache.ttl_seconds,
        "Initialized storage"
    );
    Ok(backend)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    let config_file = cli.config.clone().or_else(hepc_config::default_config_file);
    let config = Config::load(config_file.as_deref(), &cli.overrides()).or_raise(|| ErrorKind::Config)?;
    let backend = init_storage(&config)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.or_raise(|| ErrorKind::Server)?;
    tracing::info!(%addr, "Starting server");

    let app = create_router(Arc::new(AppState {
        backend: backend.clone(),
    }));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .or_raise(|| ErrorKind::Server)?;

    backend.close().await.or_raise(|| ErrorKind::Storage)?;
    tracing::info!("Server stopped");
    Ok(())
}
