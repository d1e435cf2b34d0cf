//! Relay channel ("port") message shapes and construction.
//!
//! A port carries exactly one HTTP exchange. The consumer side sends
//! requests; the relay side answers with a metadata message, zero or more
//! chunk messages, and closes the channel by dropping its sender. Closure
//! without prior stream exhaustion is the mid-stream failure signal.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::fetch::FetchDetails;

/// Buffered messages per direction before backpressure kicks in.
const PORT_BUFFER: usize = 32;

/// Consumer-to-relay messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PortRequest {
    /// Start the single request this channel is for.
    Open { details: FetchDetails },
    /// Cancel the in-flight request or stream read.
    Abort,
}

/// Response metadata, forwarded once before any chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub ok: bool,
    pub status: u16,
    pub status_text: String,
    pub redirected: bool,
    pub url: String,
}

/// Relay-to-consumer messages.
///
/// The wire shapes mirror the port protocol: an error message is
/// `{"error": {...}}`, a chunk is the metadata fields plus `data`, and the
/// bare metadata message carries no `data` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortEvent {
    Error {
        error: ErrorInfo,
    },
    Chunk {
        #[serde(flatten)]
        meta: ResponseMetadata,
        data: String,
    },
    Metadata(ResponseMetadata),
}

/// Transport failure forwarded in-band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub name: String,
    pub message: String,
}

/// Relay-side endpoint of a channel.
pub struct RelayPort {
    pub(crate) inbound: mpsc::Receiver<PortRequest>,
    pub(crate) outbound: mpsc::Sender<PortEvent>,
}

/// Consumer-side endpoint of a channel.
pub struct RelayHandle {
    pub tx: mpsc::Sender<PortRequest>,
    pub rx: mpsc::Receiver<PortEvent>,
}

/// Create a connected relay/consumer endpoint pair.
pub fn relay_channel() -> (RelayPort, RelayHandle) {
    let (req_tx, req_rx) = mpsc::channel(PORT_BUFFER);
    let (event_tx, event_rx) = mpsc::channel(PORT_BUFFER);
    (
        RelayPort {
            inbound: req_rx,
            outbound: event_tx,
        },
        RelayHandle {
            tx: req_tx,
            rx: event_rx,
        },
    )
}
