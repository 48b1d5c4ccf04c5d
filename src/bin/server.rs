//! pnr-aggregator server

use pnr_aggregator::aggregator::Aggregator;
use pnr_aggregator::broadcast_bridge::BroadcastBridge;
use pnr_aggregator::circuit_breaker::CircuitBreaker;
use pnr_aggregator::clock::SystemClock;
use pnr_aggregator::config::AppConfig;
use pnr_aggregator::event_bus::EventBus;
use pnr_aggregator::fallback_store::FallbackStore;
use pnr_aggregator::fetchers::{BaggageFetcher, TicketFetcher, TripFetcher};
use pnr_aggregator::http::{self, AppState};
use pnr_aggregator::store::DocumentStore;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Loads config synchronously (it has no async dependency) so
/// `worker_pool_size`/`event_loop_pool_size` can size the runtime itself,
/// rather than accepting `#[tokio::main]`'s fixed core-count default.
fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(std::env::var("PNRAGG_CONFIG_FILE").ok().as_deref())?;

    init_tracing(&config.logging.level, config.logging.json);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.event_loop_pool_size.max(1))
        .max_blocking_threads(config.worker_pool_size.max(1))
        .enable_all()
        .build()?;

    runtime.block_on(run(config))
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let store = build_document_store(&config).await?;
    let clock = Arc::new(SystemClock);
    let fallback = Arc::new(FallbackStore::new(10_000));

    let trip_breaker = CircuitBreaker::new("tripService", config.cb.trip_service.to_breaker_config(), clock.clone());
    let baggage_breaker =
        CircuitBreaker::new("baggageService", config.cb.baggage_service.to_breaker_config(), clock.clone());
    let ticket_breaker = CircuitBreaker::new("ticketService", config.cb.ticket_service.to_breaker_config(), clock);

    let breakers = vec![trip_breaker.clone(), baggage_breaker.clone(), ticket_breaker.clone()];

    let trip_fetcher = TripFetcher::new(
        store.clone(),
        trip_breaker,
        fallback.clone(),
        config.store.server_selection_timeout(),
        config.cache.ttl(),
    );
    let baggage_fetcher = BaggageFetcher::new(
        store.clone(),
        baggage_breaker,
        fallback,
        config.store.server_selection_timeout(),
        config.cache.ttl(),
    );
    let ticket_fetcher = TicketFetcher::new(store.clone(), ticket_breaker, config.store.server_selection_timeout());

    let event_bus = Arc::new(EventBus::new());
    let aggregator = Arc::new(Aggregator::new(
        store,
        trip_fetcher,
        baggage_fetcher,
        ticket_fetcher,
        event_bus.clone(),
    ));

    let broadcast_bridge = Arc::new(BroadcastBridge::new());
    tokio::spawn(broadcast_bridge.clone().run(event_bus, "pnr.fetched"));

    let state = AppState {
        aggregator,
        breakers,
        broadcast_bridge,
    };

    let addr = format!("0.0.0.0:{}", config.server.port);
    tracing::info!(%addr, "pnr_aggregator_listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, http::router(state)).await?;

    Ok(())
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[cfg(feature = "mongo")]
async fn build_document_store(config: &AppConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    use pnr_aggregator::store::mongo::{MongoConfig, MongoDocumentStore};

    let mongo_config = MongoConfig {
        host: config.store.host.clone(),
        port: config.store.port,
        database: config.store.database.clone(),
        connect_timeout: config.store.connect_timeout(),
        socket_timeout: config.store.socket_timeout(),
        server_selection_timeout: config.store.server_selection_timeout(),
    };
    let store = MongoDocumentStore::connect(&mongo_config).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "mongo"))]
async fn build_document_store(_config: &AppConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    use pnr_aggregator::store::InMemoryDocumentStore;
    tracing::warn!("mongo_feature_disabled_using_in_memory_store");
    Ok(Arc::new(InMemoryDocumentStore::new()))
}
