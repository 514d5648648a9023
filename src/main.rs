mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::{Config, DatabaseConfig, IngestConfig};
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware};
use crate::features::regions::models::LoadStatus;
use crate::features::regions::services::{
    import_jsonl, BulkLoader, ExportFormat, ExportOptions, Exporter, HierarchyAssembler,
    LoadOptions, SourceReader,
};
use crate::features::regions::{routes as regions_routes, RegionService};
use crate::modules::store::{MemoryRegionStore, PgRegionStore, RegionStore};
use axum::Router;
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Debug, Parser)]
#[command(name = "wilayah-core", version, about = "Indonesian administrative region hierarchy")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the read-only HTTP API
    Serve,
    /// Build a generation from the source tree and load it into the store
    Load(LoadArgs),
    /// Write the hierarchy to csv/jsonl/json artifacts
    Export(ExportArgs),
    /// Ping the store and print the stored count per level
    CheckConnection,
}

#[derive(Debug, Args)]
struct LoadArgs {
    /// Source tree root (defaults to WILAYAH_SOURCE_DIR)
    #[arg(long)]
    source_dir: Option<PathBuf>,
    /// Load a previously exported JSONL generation instead of the source tree
    #[arg(long, conflicts_with = "source_dir")]
    jsonl: Option<PathBuf>,
    /// Records per bulk insert (defaults to WILAYAH_BATCH_SIZE)
    #[arg(long)]
    batch_size: Option<usize>,
    /// Bulk inserts in flight (defaults to WILAYAH_LOAD_CONCURRENCY)
    #[arg(long)]
    concurrency: Option<usize>,
    /// Keep stored regions instead of replacing them
    #[arg(long)]
    no_clear: bool,
    /// Skip the orphan check after loading
    #[arg(long)]
    no_verify: bool,
    /// Load into an in-memory store; no database needed
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportFrom {
    /// Assemble straight from the source tree
    Source,
    /// Read the generation currently in the store
    Store,
}

#[derive(Debug, Args)]
struct ExportArgs {
    #[arg(long, value_enum, default_value_t = ExportFormat::Jsonl)]
    format: ExportFormat,
    /// Output directory (defaults to WILAYAH_EXPORT_DIR)
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = ExportFrom::Source)]
    from: ExportFrom,
    /// Source tree root when exporting from source
    #[arg(long)]
    source_dir: Option<PathBuf>,
    /// Skip the one-file-per-level artifacts
    #[arg(long)]
    no_per_kind: bool,
    /// Skip the combined artifact
    #[arg(long)]
    no_combined: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli, worker_threads))
}

async fn async_main(cli: Cli, worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::debug!(
        "System info: tokio_worker_threads={}, pid={}",
        worker_threads,
        std::process::id()
    );

    match cli.command {
        Command::Serve => serve().await,
        Command::Load(args) => load(args).await,
        Command::Export(args) => export(args).await,
        Command::CheckConnection => check_connection().await,
    }
}

// ==================== Store ====================

async fn connect(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let pool = database::create_pool(config).await?;
    tracing::info!(
        "Database connection pool created ({})",
        config.redacted_url()
    );
    database::run_migrations(&pool).await?;
    Ok(pool)
}

/// Cancels `token` on Ctrl-C (and SIGTERM on unix)
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    token.cancel();
}

// ==================== Commands ====================

async fn serve() -> anyhow::Result<()> {
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!("Configuration loaded successfully");

    let pool = connect(&config.database).await?;
    let store = Arc::new(PgRegionStore::new(pool.clone()));
    let region_service = Arc::new(RegionService::new(store));
    tracing::info!("Region service initialized");

    let shutdown = CancellationToken::new();

    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };
    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .merge(regions_routes::routes(region_service, shutdown.clone()))
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    let addr = config.app.server_address();
    let listener = bind(&addr)?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    database::close_pool(pool).await;
    Ok(())
}

fn bind(addr: &str) -> anyhow::Result<tokio::net::TcpListener> {
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    Ok(tokio::net::TcpListener::from_std(socket.into())?)
}

fn load_options(args: &LoadArgs, ingest: &IngestConfig) -> anyhow::Result<LoadOptions> {
    let mut options = LoadOptions::from(ingest);
    if let Some(batch_size) = args.batch_size {
        options.batch_size = batch_size;
    }
    if let Some(concurrency) = args.concurrency {
        options.concurrency = concurrency;
    }
    if options.batch_size == 0 || options.concurrency == 0 {
        anyhow::bail!("--batch-size and --concurrency must be greater than zero");
    }
    options.clear_existing = !args.no_clear;
    options.verify_references = !args.no_verify;
    Ok(options)
}

async fn load(args: LoadArgs) -> anyhow::Result<()> {
    let (pool, store, ingest) = if args.dry_run {
        let (_, ingest) = Config::without_database().map_err(|e| anyhow::anyhow!(e))?;
        tracing::info!("Dry run: loading into an in-memory store");
        let store: Arc<dyn RegionStore> = Arc::new(MemoryRegionStore::new());
        (None, store, ingest)
    } else {
        let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
        let pool = connect(&config.database).await?;
        let store: Arc<dyn RegionStore> = Arc::new(PgRegionStore::new(pool.clone()));
        (Some(pool), store, config.ingest)
    };

    let options = load_options(&args, &ingest)?;
    let cancel = CancellationToken::new();
    let signal = tokio::spawn(shutdown_signal(cancel.clone()));

    let loader = BulkLoader::new(store);
    let result = match args.jsonl {
        Some(path) => {
            tracing::info!("Loading generation from {}", path.display());
            let regions = import_jsonl(&path)?;
            loader
                .load_generation(regions.into_iter().map(Ok), &options, &cancel)
                .await
        }
        None => {
            let source_dir = args.source_dir.unwrap_or(ingest.source_dir);
            loader
                .load_source(SourceReader::new(source_dir), &options, &cancel)
                .await
        }
    };
    signal.abort();

    if let Some(pool) = pool {
        database::close_pool(pool).await;
    }

    let report = result;
    match report.status {
        LoadStatus::Complete => tracing::info!("Load complete: {} regions", report.inserted),
        LoadStatus::Partial => tracing::warn!(
            "Load partial: {} inserted, {} records in {} failed batches, {} skipped units, {} orphans",
            report.inserted,
            report.failed_records(),
            report.errors.len(),
            report.skipped,
            report.orphans.len()
        ),
        LoadStatus::Cancelled => tracing::warn!("Load cancelled after {} regions", report.inserted),
        LoadStatus::Aborted => tracing::error!(
            "Load aborted after {} regions: {}",
            report.inserted,
            report.fatal.as_deref().unwrap_or("unknown error")
        ),
    }
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.is_aborted() {
        anyhow::bail!(
            "Load aborted: {}",
            report.fatal.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    Ok(())
}

async fn export(args: ExportArgs) -> anyhow::Result<()> {
    let options = ExportOptions {
        format: args.format,
        per_kind: !args.no_per_kind,
        combined: !args.no_combined,
    };

    let report = match args.from {
        ExportFrom::Source => {
            let (_, ingest) = Config::without_database().map_err(|e| anyhow::anyhow!(e))?;
            let exporter = Exporter::new(args.output.unwrap_or(ingest.export_dir));
            tracing::info!("Exporting source tree to {}", exporter.output_dir().display());
            let reader = SourceReader::new(args.source_dir.unwrap_or(ingest.source_dir));

            let mut stream = HierarchyAssembler::new(reader, Utc::now()).assemble();
            let report = exporter.export(stream.by_ref(), &options)?;
            let summary = stream.into_summary();
            if !summary.skipped.is_empty() {
                tracing::warn!("{} source units were skipped", summary.skipped.len());
            }
            report
        }
        ExportFrom::Store => {
            let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
            let pool = connect(&config.database).await?;
            let store = PgRegionStore::new(pool.clone());
            let exporter = Exporter::new(args.output.unwrap_or(config.ingest.export_dir));
            let result = exporter.export_store(&store, &options).await;
            database::close_pool(pool).await;
            result?
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn check_connection() -> anyhow::Result<()> {
    let config = DatabaseConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!("Connecting to {}", config.redacted_url());

    let pool = database::create_pool(&config).await?;
    let store = PgRegionStore::new(pool.clone());

    let result = async {
        store.ping().await?;
        store.count_by_kind().await
    }
    .await;
    database::close_pool(pool).await;

    let counts = result?;
    tracing::info!("Connection OK");
    println!("{}", serde_json::to_string_pretty(&counts)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingest() -> IngestConfig {
        IngestConfig {
            source_dir: PathBuf::from("db/data_wilayah"),
            export_dir: PathBuf::from("export"),
            batch_size: 1000,
            load_concurrency: 4,
        }
    }

    #[test]
    fn test_load_flags_override_config() {
        let cli = Cli::parse_from([
            "wilayah-core",
            "load",
            "--batch-size",
            "250",
            "--no-verify",
            "--dry-run",
        ]);
        let Command::Load(args) = cli.command else {
            panic!("expected load");
        };

        let options = load_options(&args, &ingest()).unwrap();
        assert_eq!(options.batch_size, 250);
        assert_eq!(options.concurrency, 4);
        assert!(options.clear_existing);
        assert!(!options.verify_references);
        assert!(args.dry_run);
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let cli = Cli::parse_from(["wilayah-core", "load", "--batch-size", "0"]);
        let Command::Load(args) = cli.command else {
            panic!("expected load");
        };
        assert!(load_options(&args, &ingest()).is_err());
    }

    #[test]
    fn test_export_defaults() {
        let cli = Cli::parse_from(["wilayah-core", "export", "--format", "csv"]);
        let Command::Export(args) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(args.format, ExportFormat::Csv);
        assert_eq!(args.from, ExportFrom::Source);
        assert!(!args.no_per_kind && !args.no_combined);
    }

    #[test]
    fn test_jsonl_conflicts_with_source_dir() {
        let parsed = Cli::try_parse_from([
            "wilayah-core",
            "load",
            "--jsonl",
            "a.jsonl",
            "--source-dir",
            "src",
        ]);
        assert!(parsed.is_err());
    }
}
