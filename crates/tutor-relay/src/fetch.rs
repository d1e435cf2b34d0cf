//! Streaming fetch proxy over a relay channel.
//!
//! Channel state machine: Idle → Requesting → Streaming → Closed. One
//! request per channel; a second `open` is logged and ignored. An `abort`
//! at any point interrupts the request or the stream read and closes the
//! channel without further messages.

use std::collections::HashMap;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::port::{ErrorInfo, PortEvent, PortRequest, RelayPort, ResponseMetadata};

/// Request description carried by an `open` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchDetails {
    pub url: String,
    #[serde(default)]
    pub options: FetchOptions,
}

/// Subset of request options the relay honors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchOptions {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Drive one channel to completion: wait for `open`, issue the request,
/// forward metadata and body chunks, honor `abort` throughout.
pub async fn serve_port(client: &reqwest::Client, mut port: RelayPort) {
    // Idle: the only accepted transition is an open message.
    let details = loop {
        match port.inbound.recv().await {
            Some(PortRequest::Open { details }) => break details,
            Some(PortRequest::Abort) => {
                debug!("serve_port: aborted before open");
                return;
            }
            None => return,
        }
    };

    // Requesting: race the send against an abort.
    let request = match build_request(client, &details) {
        Ok(r) => r,
        Err(e) => {
            send_error(&port, "RequestError", &e).await;
            return;
        }
    };

    let response = tokio::select! {
        resp = request.send() => match resp {
            Ok(r) => r,
            Err(e) => {
                error!("serve_port: fetch failed: {}", e);
                send_error(&port, error_name(&e), &e.to_string()).await;
                return;
            }
        },
        _ = wait_for_abort(&mut port.inbound) => {
            debug!("serve_port: aborted while requesting");
            return;
        }
    };

    let meta = ResponseMetadata {
        ok: response.status().is_success(),
        status: response.status().as_u16(),
        status_text: response
            .status()
            .canonical_reason()
            .unwrap_or_default()
            .to_string(),
        redirected: was_redirected(&details.url, response.url()),
        url: response.url().to_string(),
    };

    let body = Box::pin(response.bytes_stream().map(|r| r.map(|b| b.to_vec())));
    stream_response(meta, body, &mut port).await;
}

/// Streaming phase: forward metadata, then one chunk message per body
/// chunk in read order. Factored out of [`serve_port`] so the protocol can
/// be exercised against a synthetic body.
pub async fn stream_response<S, E>(meta: ResponseMetadata, body: S, port: &mut RelayPort)
where
    S: Stream<Item = Result<Vec<u8>, E>> + Unpin,
    E: std::fmt::Display,
{
    if port.outbound.send(PortEvent::Metadata(meta.clone())).await.is_err() {
        return;
    }

    let mut body = body;
    loop {
        tokio::select! {
            _ = wait_for_abort(&mut port.inbound) => {
                debug!("stream_response: abort received mid-stream");
                return;
            }
            chunk = body.next() => match chunk {
                Some(Ok(bytes)) => {
                    let data = String::from_utf8_lossy(&bytes).into_owned();
                    let event = PortEvent::Chunk { meta: meta.clone(), data };
                    if port.outbound.send(event).await.is_err() {
                        return;
                    }
                }
                Some(Err(e)) => {
                    // Close without a completion marker; the consumer
                    // treats early closure as a stream read failure.
                    error!("stream_response: error reading response stream: {}", e);
                    return;
                }
                None => {
                    debug!("stream_response: body exhausted");
                    return;
                }
            }
        }
    }
}

/// Resolve the next inbound message to an abort. A duplicate `open` on a
/// live channel is undefined in the protocol; we guard by ignoring it.
/// Consumer-side channel closure counts as an abort.
async fn wait_for_abort(inbound: &mut tokio::sync::mpsc::Receiver<PortRequest>) {
    loop {
        match inbound.recv().await {
            Some(PortRequest::Abort) | None => return,
            Some(PortRequest::Open { details }) => {
                warn!("serve_port: duplicate open ignored (url={})", details.url);
            }
        }
    }
}

/// The client follows redirects internally, so the final URL is the only
/// trace left. Compare parsed URLs to ignore normalization differences.
fn was_redirected(requested: &str, finalized: &reqwest::Url) -> bool {
    match requested.parse::<reqwest::Url>() {
        Ok(requested) => requested != *finalized,
        Err(_) => false,
    }
}

fn build_request(
    client: &reqwest::Client,
    details: &FetchDetails,
) -> Result<reqwest::RequestBuilder, String> {
    let method = details.options.method.as_deref().unwrap_or("GET");
    let method = reqwest::Method::from_bytes(method.as_bytes())
        .map_err(|_| format!("invalid method: {method}"))?;

    let mut request = client.request(method, &details.url);
    for (name, value) in &details.options.headers {
        request = request.header(name, value);
    }
    if let Some(body) = &details.options.body {
        request = request.body(body.clone());
    }
    Ok(request)
}

fn error_name(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "TimeoutError"
    } else if e.is_connect() {
        "ConnectError"
    } else {
        "FetchError"
    }
}

async fn send_error(port: &RelayPort, name: &str, message: &str) {
    let _ = port
        .outbound
        .send(PortEvent::Error {
            error: ErrorInfo {
                name: name.to_string(),
                message: message.to_string(),
            },
        })
        .await;
}
