use std::error::Error;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eventcast::event::start_lane_sweeper;
use eventcast::websockets::router;
use eventcast::{
    default_registry, AppState, DispatchMetrics, EngineConfig, EventBus, FanoutDispatcher,
    TopicIndex,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventcast=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        queue_capacity = config.queue_capacity,
        overflow_policy = %config.overflow_policy,
        default_version = %config.default_version,
        "Starting eventcast server"
    );

    let registry = Arc::new(default_registry()?);
    let dispatcher = FanoutDispatcher::new(
        registry,
        TopicIndex::new(),
        Arc::new(DispatchMetrics::new()),
    );
    let bus = EventBus::new(dispatcher);

    tokio::spawn(start_lane_sweeper(bus.clone(), config.lane_sweep_interval));

    let bind_addr = config.bind_addr;
    let app = router(AppState::new(bus, config)).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Server running on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
