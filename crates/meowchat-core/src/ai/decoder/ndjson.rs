//! Variant A: complete JSON objects back to back
//!
//! Ollama's `/api/chat` writes one JSON object per line, but network chunking
//! gives no guarantee that a chunk holds exactly one object:
//!
//! ```text
//! {"model":"llama3","message":{"role":"assistant","content":"?"},"done":false}
//! {"model":"llama3","message":{"role":"assistant","content":""},"done_reason":"stop","done":true}
//! ```

use serde_json::Value;
use tracing::{debug, trace, warn};

use super::StreamDecoder;
use crate::ai::types::StreamFrame;
use crate::error::ChatError;

/// Buffers bytes until they parse as whole JSON values
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    /// Bytes not yet consumed by a complete value
    buffer: Vec<u8>,
    done: bool,
    values_decoded: usize,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every complete value at the front of the buffer.
    ///
    /// A truncated trailing value stays buffered unless `at_eof`, in which
    /// case it is a decode error.
    fn drain_values(&mut self, at_eof: bool) -> Result<Vec<StreamFrame>, ChatError> {
        let mut frames = Vec::new();
        let mut consumed = 0;

        {
            let mut values = serde_json::Deserializer::from_slice(&self.buffer).into_iter::<Value>();
            loop {
                match values.next() {
                    Some(Ok(value)) => {
                        consumed = values.byte_offset();
                        self.values_decoded += 1;
                        let (text, is_final) = parse_value(&value)?;
                        if !text.is_empty() {
                            frames.push(StreamFrame::delta(text));
                        }
                        if is_final {
                            debug!(
                                "Ollama stream done after {} values",
                                self.values_decoded
                            );
                            self.done = true;
                            frames.push(StreamFrame::done());
                            break;
                        }
                    }
                    Some(Err(e)) if e.is_eof() && !at_eof => {
                        trace!("Incomplete JSON buffered ({} bytes)", self.buffer.len() - consumed);
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("Malformed JSON in Ollama stream: {}", e);
                        return Err(ChatError::Decode(e.to_string()));
                    }
                    None => {
                        // Only whitespace remains
                        consumed = self.buffer.len();
                        break;
                    }
                }
            }
        }

        if self.done {
            self.buffer.clear();
        } else {
            self.buffer.drain(..consumed);
        }
        Ok(frames)
    }
}

/// Extract `(message.content, done)` from one server object
fn parse_value(value: &Value) -> Result<(String, bool), ChatError> {
    if let Some(err) = value.get("error") {
        let message = err
            .as_str()
            .map(str::to_string)
            .or_else(|| {
                err.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| err.to_string());
        return Err(ChatError::Upstream {
            status: 200,
            code: None,
            message,
        });
    }

    let text = value
        .pointer("/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let done = value.get("done").and_then(Value::as_bool).unwrap_or(false);
    Ok((text, done))
}

impl StreamDecoder for NdjsonDecoder {
    fn feed(&mut self, chunk: &[u8]) -> Result<Vec<StreamFrame>, ChatError> {
        if self.done {
            return Ok(Vec::new());
        }
        self.buffer.extend_from_slice(chunk);
        self.drain_values(false)
    }

    fn finish(&mut self) -> Result<Vec<StreamFrame>, ChatError> {
        if self.done || self.buffer.is_empty() {
            return Ok(Vec::new());
        }
        debug!(
            "Ollama stream closed with {} unparsed bytes, final attempt",
            self.buffer.len()
        );
        self.drain_values(true)
    }

    fn is_done(&self) -> bool {
        self.done
    }
}
