//! Streaming API calls
//!
//! Posts a signed request to the gateway and relays decoded text deltas over
//! a channel until end-of-stream, a decode error, or cancellation.

use std::time::Instant;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::core::ChatClient;
use crate::ai::decoder::decode_stream;
use crate::ai::types::{ChatMessage, StreamPart};
use crate::error::ChatError;

/// Everything one streaming request needs
#[derive(Debug, Clone)]
pub struct ChatTurn {
    /// Full history; the client applies the window
    pub history: Vec<ChatMessage>,
    pub system_prompt: String,
    pub temperature: f32,
    pub password: Option<String>,
    /// Cancelling aborts the in-flight call; the channel then closes without `Finish`
    pub cancel: CancellationToken,
}

/// Anything that can stream a chat turn
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Start a request and return the delta channel
    ///
    /// Errors before the body starts (network, non-2xx) are returned directly;
    /// errors while reading the body arrive as [`StreamPart::Error`].
    async fn stream_chat(
        &self,
        turn: ChatTurn,
    ) -> Result<mpsc::UnboundedReceiver<StreamPart>, ChatError>;
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn stream_chat(
        &self,
        turn: ChatTurn,
    ) -> Result<mpsc::UnboundedReceiver<StreamPart>, ChatError> {
        let call_start = Instant::now();
        let now = chrono::Utc::now().timestamp_millis();
        let body = self.request_builder().build(
            &turn.history,
            &turn.system_prompt,
            turn.temperature,
            turn.password.as_deref(),
            now,
        );

        info!("=== CHAT REQUEST START ===");
        info!(
            "Endpoint: {}, Messages: {}, Temperature: {}, Protocol: {}",
            self.config().endpoint,
            body.messages.len(),
            body.temperature,
            self.config().protocol
        );

        let request = self.http_client().post(&self.config().endpoint).json(&body);

        let response = tokio::select! {
            biased;
            _ = turn.cancel.cancelled() => {
                info!("Request cancelled before response headers");
                let (_tx, rx) = mpsc::unbounded_channel();
                return Ok(rx);
            }
            result = request.send() => result?,
        };

        let status = response.status();
        info!("API response: {} in {:?}", status, call_start.elapsed());

        if !status.is_success() {
            return Err(self.handle_error_response(response).await);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let protocol = self.config().protocol;
        let cancel = turn.cancel.clone();

        info!("Starting {} stream processing task", protocol);
        let stream = response.bytes_stream();
        tokio::spawn(async move {
            let frames = decode_stream(protocol, stream);
            tokio::pin!(frames);
            let mut frame_count = 0;
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!("Stream cancelled after {} frames", frame_count);
                        break;
                    }
                    next = frames.next() => match next {
                        Some(Ok(frame)) => {
                            frame_count += 1;
                            if !frame.text_delta.is_empty() {
                                debug!("  -> TextDelta: {} chars", frame.text_delta.len());
                                if tx.send(StreamPart::TextDelta { delta: frame.text_delta }).is_err() {
                                    warn!("Receiver dropped, stopping stream");
                                    break;
                                }
                            }
                            if frame.is_final {
                                let _ = tx.send(StreamPart::Finish);
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            error!("Stream failed at frame #{}: {}", frame_count + 1, e);
                            let _ = tx.send(StreamPart::Error(e));
                            break;
                        }
                        None => {
                            info!("Byte stream ended without end-of-stream marker");
                            break;
                        }
                    }
                }
            }
            info!(
                "Stream ended after {} frames in {:?}",
                frame_count,
                call_start.elapsed()
            );
        });

        Ok(rx)
    }
}
