use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use federated_search::config::Settings;
use federated_search::harvest::consumers::{IndexUpdateClient, IndexWriter};
use federated_search::harvest::dispatcher::HarvestWiring;
use federated_search::harvest::generator::RecordGenerator;
use federated_search::harvest::handlers::handle_harvest;
use federated_search::harvest::producer::RecordConsumer;
use federated_search::harvest::source::{ContentSource, UriSource};
use federated_search::publish::handlers::{
    handle_publish, handle_unpublish, handle_unpublish_ids,
};
use federated_search::publish::service::PublishingService;
use federated_search::search::engine::FederatedSearchEngine;
use federated_search::search::handlers::{handle_search, handle_shards};
use federated_search::search::monitor::ShardMonitor;
use federated_search::search::query::QueryBuilder;
use federated_search::search::registry::InMemoryShardRegistry;
use federated_search::search::transport::{ReqwestTransport, Transport};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut bind_addr: Option<SocketAddr> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                bind_addr = Some(value_of(&args, i)?.parse()?);
                i += 2;
            }
            "--config" => {
                config_path = Some(PathBuf::from(value_of(&args, i)?));
                i += 2;
            }
            "--help" | "-h" => {
                eprintln!("Usage: {} [--bind <addr:port>] [--config <file>]", args[0]);
                eprintln!("Example: {} --bind 127.0.0.1:8090", args[0]);
                eprintln!(
                    "Example: {} --config /etc/federation.toml",
                    args[0]
                );
                return Ok(());
            }
            other => {
                tracing::warn!("Ignoring unknown argument {}", other);
                i += 1;
            }
        }
    }

    let mut settings = Settings::load(config_path.as_deref())?;
    if let Some(bind_addr) = bind_addr {
        settings.server.bind = bind_addr;
    }

    tracing::info!("Index backend at {}", settings.backend.url);

    // 1. Harvesting and publishing:
    let source: Arc<dyn ContentSource> =
        Arc::new(UriSource::new(settings.harvest.http_timeout()));
    let generator = RecordGenerator::new(settings.harvest.generator_records);

    let index = Arc::new(IndexUpdateClient::new(
        &settings.backend.url,
        Duration::from_millis(settings.backend.update_timeout_ms),
    ));
    let writer: Arc<dyn RecordConsumer> = Arc::new(IndexWriter::new(index.clone()));

    let harvester = Arc::new(
        HarvestWiring::with_all_repositories(source.clone(), generator.clone())?
            .consumer(writer.clone())
            .build(),
    );
    let publishing = Arc::new(PublishingService::wire(source, generator, writer, index)?);

    // 2. Federated search:
    let timeouts = settings.timeouts.policy();
    let transport: Arc<dyn Transport> =
        Arc::new(ReqwestTransport::new(timeouts.connection_timeout())?);
    let monitor =
        ShardMonitor::new(transport.clone()).with_concurrency(settings.shards.probe_concurrency);

    let mut engine =
        FederatedSearchEngine::new(QueryBuilder::new(&settings.backend.url)?, transport, timeouts)
            .with_monitor(monitor);

    if settings.shards.registry_enabled {
        let registry = InMemoryShardRegistry::new(settings.shards.initial.clone());
        tracing::info!("Shard registry: {:?}", settings.shards.initial);
        engine = engine.with_registry(Arc::new(registry));
    } else {
        tracing::info!("Shard registry disabled, failed queries will not be pruned");
    }
    let engine = Arc::new(engine);

    // 3. HTTP Router:
    let app = Router::new()
        .route("/harvest", post(handle_harvest))
        .route("/publish", post(handle_publish))
        .route("/unpublish", post(handle_unpublish))
        .route("/unpublish/ids", post(handle_unpublish_ids))
        .route("/search", get(handle_search))
        .route("/shards", get(handle_shards))
        .layer(Extension(harvester))
        .layer(Extension(publishing))
        .layer(Extension(engine));

    // 4. Start HTTP server:
    tracing::info!("HTTP server listening on {}", settings.server.bind);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(settings.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn value_of(args: &[String], i: usize) -> anyhow::Result<&str> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("{} requires a value", args[i]))
}
