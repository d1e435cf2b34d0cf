//! Streaming fetch proxy route — drives a relay channel and re-emits the
//! port events as SSE.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::routing::post;
use axum::{Json, Router};
use futures::Stream;
use tracing::debug;

use crate::state::AppState;
use tutor_relay::{relay_channel, serve_port, FetchDetails, PortEvent, PortRequest};

type SseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/proxy/stream", post(stream_fetch))
}

/// POST /api/proxy/stream — one outbound request per call. The relay's
/// metadata, chunk, and error messages become SSE events of the same name;
/// client disconnect drops the channel, which the relay treats as abort.
async fn stream_fetch(
    State(state): State<Arc<AppState>>,
    Json(details): Json<FetchDetails>,
) -> Sse<SseStream> {
    let (port, mut handle) = relay_channel();

    let client = state.http.clone();
    tokio::spawn(async move {
        serve_port(&client, port).await;
    });

    // The channel carries exactly one exchange; open it up front.
    let opened = handle
        .tx
        .send(PortRequest::Open { details })
        .await
        .is_ok();

    let stream: SseStream = Box::pin(async_stream::stream! {
        if !opened {
            yield Ok(Event::default()
                .event("error")
                .data(r#"{"error":{"name":"RelayError","message":"relay unavailable"}}"#));
            return;
        }

        while let Some(event) = handle.rx.recv().await {
            let name = match &event {
                PortEvent::Metadata(_) => "metadata",
                PortEvent::Chunk { .. } => "chunk",
                PortEvent::Error { .. } => "error",
            };
            match serde_json::to_string(&event) {
                Ok(data) => yield Ok(Event::default().event(name).data(data)),
                Err(e) => {
                    debug!("proxy stream: failed to encode event: {e}");
                    return;
                }
            }
        }
    });

    Sse::new(stream)
}
