//! Server-Sent Events fan-out for browsers.
//!
//! Every [`FeedEvent`] becomes one SSE message named after the event
//! (`requestUpdate`) with an empty data field. Clients re-fetch from the
//! object store on receipt.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use futures::stream::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::CorsLayer;

use crate::publish::{FeedEvent, NotificationBroadcaster};

/// Routes: `GET /events` and `GET /health`.
pub fn router(broadcaster: Arc<NotificationBroadcaster>) -> Router {
    Router::new()
        .route("/events", get(event_stream))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(broadcaster)
}

/// Bind and serve until the task is dropped.
pub async fn serve(bind: &str, broadcaster: Arc<NotificationBroadcaster>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    crate::log_event!("live", "listening", "http://{bind}/events");

    axum::serve(listener, router(broadcaster)).await?;
    Ok(())
}

async fn health_check() -> &'static str {
    "ok"
}

async fn event_stream(
    State(broadcaster): State<Arc<NotificationBroadcaster>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(broadcaster.subscribe());
    crate::debug_event!(
        "live",
        "connected",
        "{} subscribers",
        broadcaster.subscriber_count()
    );

    let events = stream.filter_map(|received| async move {
        match received {
            Ok(event) => Some(Ok(to_sse(event))),
            Err(e) => {
                // Lagged: the next event still tells the client to refresh
                crate::debug_event!("live", "lagged", "{e}");
                None
            }
        }
    });

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}

fn to_sse(event: FeedEvent) -> Event {
    Event::default().event(event.name()).data("")
}
