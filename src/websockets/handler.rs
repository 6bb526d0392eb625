use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::socket::Connection;
use crate::event::{DomainEvent, EventPayload, SubmitReceipt, TopicKey};
use crate::metrics::MetricsSnapshot;
use crate::schema::{PacketVersion, WireFormat};
use crate::shared::{AppError, AppState};
use crate::subscriber::Subscriber;

/// Query string of `GET /ws`
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub version: Option<String>,
    pub format: Option<WireFormat>,
}

impl ConnectParams {
    /// Negotiated version and format, falling back to the configured defaults
    pub fn negotiate(&self, state: &AppState) -> Result<(PacketVersion, WireFormat), AppError> {
        let version = match self.version.as_deref() {
            Some(raw) => raw
                .parse::<PacketVersion>()
                .map_err(|_| AppError::BadRequest(format!("Invalid packet version {raw:?}")))?,
            None => state.config.default_version,
        };
        let format = self.format.unwrap_or(state.config.default_format);
        Ok((version, format))
    }
}

/// Body of `POST /events`
#[derive(Debug, Deserialize)]
pub struct SubmitEventRequest {
    pub topic: String,
    pub payload: EventPayload,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TopicSummary {
    pub topic: TopicKey,
    pub subscribers: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/events", post(submit_event))
        .route("/metrics", get(metrics))
        .route("/topics", get(topics))
        .with_state(state)
}

/// GET /ws?version=1&format=json
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(app_state): State<AppState>,
) -> Result<Response, AppError> {
    let (version, format) = params.negotiate(&app_state)?;

    info!(
        version = %version,
        format = %format,
        "WebSocket connection requested"
    );

    Ok(ws.on_upgrade(move |socket| {
        handle_websocket_connection(socket, version, format, app_state)
    }))
}

/// Handle the upgraded WebSocket connection
async fn handle_websocket_connection(
    socket: axum::extract::ws::WebSocket,
    version: PacketVersion,
    format: WireFormat,
    app_state: AppState,
) {
    let (subscriber, outbound) = Subscriber::new(version, format, app_state.config.channel());
    let subscriber_id = subscriber.id();

    info!(
        subscriber = %subscriber_id,
        version = %version,
        format = %format,
        "WebSocket connection established"
    );

    let connection = Connection::new(
        subscriber,
        Box::new(socket),
        outbound,
        app_state.bus.topic_index().clone(),
    );

    match connection.run().await {
        Ok(()) => {
            info!(subscriber = %subscriber_id, "WebSocket connection closed cleanly");
        }
        Err(e) => {
            warn!(
                subscriber = %subscriber_id,
                error = %e,
                "WebSocket connection error"
            );
        }
    }
}

/// POST /events
pub async fn submit_event(
    State(app_state): State<AppState>,
    Json(request): Json<SubmitEventRequest>,
) -> Result<(StatusCode, Json<SubmitReceipt>), AppError> {
    let event = DomainEvent::new(request.topic, request.payload);
    let receipt = app_state.bus.submit(event).await?;

    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

/// GET /metrics
pub async fn metrics(State(app_state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(app_state.bus.metrics().snapshot())
}

/// GET /topics
pub async fn topics(State(app_state): State<AppState>) -> Json<Vec<TopicSummary>> {
    let index = app_state.bus.topic_index();
    let summaries = index
        .topics()
        .into_iter()
        .map(|topic| TopicSummary {
            subscribers: index.subscriber_count(topic.as_str()),
            topic,
        })
        .collect();

    Json(summaries)
}
