//! Stream decoding
//!
//! Turns a raw response body into [`StreamFrame`]s. Two wire variants share the
//! [`StreamDecoder`] capability set and are selected by [`Protocol`]:
//! - [`NdjsonDecoder`]: complete JSON objects back to back (Ollama)
//! - [`SseDecoder`]: `data: {...}` event frames (OpenAI)

mod ndjson;
mod sse;

pub use ndjson::NdjsonDecoder;
pub use sse::SseDecoder;

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::debug;

use crate::ai::types::{Protocol, StreamFrame};
use crate::error::ChatError;

/// Incremental decoder over a chunked byte stream
///
/// Partial input is buffered and never emitted. Once a final frame has been
/// produced, further input is ignored.
pub trait StreamDecoder: Send {
    /// Consume one network chunk
    fn feed(&mut self, chunk: &[u8]) -> Result<Vec<StreamFrame>, ChatError>;

    /// The byte stream ended; flush or reject whatever is still buffered
    fn finish(&mut self) -> Result<Vec<StreamFrame>, ChatError>;

    /// Whether the end-of-stream signal has been produced
    fn is_done(&self) -> bool;
}

/// Create the decoder for a protocol
pub fn decoder_for(protocol: Protocol) -> Box<dyn StreamDecoder> {
    match protocol {
        Protocol::Ollama => Box::new(NdjsonDecoder::new()),
        Protocol::OpenAi => Box::new(SseDecoder::new()),
    }
}

struct DecodeState<S> {
    bytes: Pin<Box<S>>,
    decoder: Box<dyn StreamDecoder>,
    pending: VecDeque<StreamFrame>,
    finished: bool,
    chunks: usize,
}

/// Lazily decode a byte stream into frames
///
/// The sequence is finite and not restartable. It ends after the first final
/// frame, after the first error, or when the byte stream ends.
pub fn decode_stream<S, E>(
    protocol: Protocol,
    bytes: S,
) -> impl Stream<Item = Result<StreamFrame, ChatError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display,
{
    let state = DecodeState {
        bytes: Box::pin(bytes),
        decoder: decoder_for(protocol),
        pending: VecDeque::new(),
        finished: false,
        chunks: 0,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(frame) = st.pending.pop_front() {
                if frame.is_final {
                    debug!("End-of-stream after {} chunks", st.chunks);
                    st.finished = true;
                    st.pending.clear();
                }
                return Some((Ok(frame), st));
            }
            if st.finished {
                return None;
            }

            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    st.chunks += 1;
                    match st.decoder.feed(&chunk) {
                        Ok(frames) => st.pending.extend(frames),
                        Err(e) => {
                            st.finished = true;
                            return Some((Err(e), st));
                        }
                    }
                }
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(ChatError::Network(e.to_string())), st));
                }
                None => {
                    st.finished = true;
                    match st.decoder.finish() {
                        Ok(frames) => st.pending.extend(frames),
                        Err(e) => return Some((Err(e), st)),
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send {
        let owned: Vec<Result<Bytes, std::io::Error>> = parts
            .iter()
            .map(|p| Ok(Bytes::from(p.to_string())))
            .collect();
        futures::stream::iter(owned)
    }

    async fn collect(
        protocol: Protocol,
        parts: &[&str],
    ) -> Vec<Result<StreamFrame, ChatError>> {
        decode_stream(protocol, chunks(parts)).collect().await
    }

    #[tokio::test]
    async fn test_ollama_stream_ends_at_done() {
        let frames = collect(
            Protocol::Ollama,
            &[
                r#"{"message":{"content":"4"},"done":false}"#,
                r#"{"done":true}"#,
                r#"{"message":{"content":"ignored"},"done":false}"#,
            ],
        )
        .await;
        assert_eq!(
            frames,
            vec![Ok(StreamFrame::delta("4")), Ok(StreamFrame::done())]
        );
    }

    #[tokio::test]
    async fn test_ollama_trailing_valid_json_emitted_before_close() {
        let frames = collect(
            Protocol::Ollama,
            &[
                r#"{"message":{"content":"a"}}"#,
                r#"{"message":{"content":"b"}"#,
                r#"}"#,
            ],
        )
        .await;
        assert_eq!(
            frames,
            vec![Ok(StreamFrame::delta("a")), Ok(StreamFrame::delta("b"))]
        );
    }

    #[tokio::test]
    async fn test_ollama_trailing_invalid_json_is_fatal() {
        let frames = collect(
            Protocol::Ollama,
            &[r#"{"message":{"content":"a"}}"#, r#"{"message":{"cont"#],
        )
        .await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], Ok(StreamFrame::delta("a")));
        assert!(matches!(frames[1], Err(ChatError::Decode(_))));
    }

    #[tokio::test]
    async fn test_openai_done_ignores_subsequent_bytes() {
        let frames = collect(
            Protocol::OpenAi,
            &[
                "data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\n\n",
                "data: [DONE]\n\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n",
            ],
        )
        .await;
        assert_eq!(
            frames,
            vec![Ok(StreamFrame::delta("hi")), Ok(StreamFrame::done())]
        );
    }

    #[tokio::test]
    async fn test_transport_error_surfaces_as_network_error() {
        let parts: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(br#"{"message":{"content":"x"}}"#)),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            )),
        ];
        let frames: Vec<_> = decode_stream(Protocol::Ollama, futures::stream::iter(parts))
            .collect()
            .await;
        assert_eq!(frames[0], Ok(StreamFrame::delta("x")));
        assert!(matches!(frames[1], Err(ChatError::Network(_))));
        assert_eq!(frames.len(), 2);
    }
}
