//! Variant B: server-sent event frames
//!
//! OpenAI-compatible chat/completions streams look like:
//!
//! ```text
//! data: {"id":"chatcmpl-1","choices":[{"index":0,"delta":{"content":"Hi"}}]}
//!
//! data: [DONE]
//! ```
//!
//! Lines may be split across chunks, and an event is only dispatched on the
//! blank line that terminates it.

use serde_json::Value;
use tracing::{debug, info, warn};

use super::StreamDecoder;
use crate::ai::types::StreamFrame;
use crate::error::ChatError;

/// End-of-stream sentinel payload
const DONE_SENTINEL: &str = "[DONE]";

/// Event-stream framer plus OpenAI delta extraction
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes of the current, not yet terminated line
    partial_line: Vec<u8>,
    /// Accumulated `data` field of the event being framed
    data: String,
    has_data: bool,
    /// Last line ended in `\r`; a leading `\n` belongs to that terminator
    skip_lf: bool,
    done: bool,
    event_count: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn process_line(&mut self, line: &str) -> Result<Option<StreamFrame>, ChatError> {
        if line.is_empty() {
            return self.dispatch();
        }

        // Comment
        if line.starts_with(':') {
            return Ok(None);
        }

        let (field, value) = match line.find(':') {
            Some(idx) => {
                let value = &line[idx + 1..];
                (&line[..idx], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        if field == "data" {
            self.data.push_str(value);
            self.data.push('\n');
            self.has_data = true;
        }
        // event / id / retry carry nothing we use

        Ok(None)
    }

    /// Pop the next complete line; `\n`, `\r\n` and bare `\r` all terminate
    fn next_line(&mut self) -> Option<String> {
        if self.skip_lf {
            match self.partial_line.first() {
                Some(b'\n') => {
                    self.partial_line.remove(0);
                    self.skip_lf = false;
                }
                Some(_) => self.skip_lf = false,
                None => return None,
            }
        }

        let pos = self
            .partial_line
            .iter()
            .position(|b| *b == b'\n' || *b == b'\r')?;
        let raw: Vec<u8> = self.partial_line.drain(..=pos).collect();
        self.skip_lf = raw[pos] == b'\r';
        Some(String::from_utf8_lossy(&raw[..pos]).into_owned())
    }

    /// Blank line: hand the framed event to the payload parser
    fn dispatch(&mut self) -> Result<Option<StreamFrame>, ChatError> {
        if !self.has_data {
            return Ok(None);
        }
        self.has_data = false;
        let mut payload = std::mem::take(&mut self.data);
        if payload.ends_with('\n') {
            payload.pop();
        }
        self.event_count += 1;

        if payload == DONE_SENTINEL {
            info!("SSE [DONE] marker received after {} events", self.event_count);
            self.done = true;
            return Ok(Some(StreamFrame::done()));
        }

        let json: Value = serde_json::from_str(&payload).map_err(|e| {
            warn!(
                "Failed to parse SSE JSON (event #{}): {}",
                self.event_count, payload
            );
            ChatError::Decode(e.to_string())
        })?;

        let text = json
            .pointer("/choices/0/delta/content")
            .and_then(Value::as_str)
            .unwrap_or_default();

        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(StreamFrame::delta(text)))
        }
    }
}

impl StreamDecoder for SseDecoder {
    fn feed(&mut self, chunk: &[u8]) -> Result<Vec<StreamFrame>, ChatError> {
        let mut frames = Vec::new();
        if self.done {
            return Ok(frames);
        }

        self.partial_line.extend_from_slice(chunk);

        while let Some(line) = self.next_line() {
            if let Some(frame) = self.process_line(&line)? {
                frames.push(frame);
                if self.done {
                    self.partial_line.clear();
                    break;
                }
            }
        }

        Ok(frames)
    }

    fn finish(&mut self) -> Result<Vec<StreamFrame>, ChatError> {
        let mut frames = Vec::new();
        if self.done {
            return Ok(frames);
        }

        if !self.partial_line.is_empty() {
            let raw = std::mem::take(&mut self.partial_line);
            let line = String::from_utf8_lossy(&raw).into_owned();
            let line = line.trim_end_matches('\r');
            if let Some(frame) = self.process_line(line)? {
                frames.push(frame);
            }
        }

        if self.has_data {
            debug!("Discarding unterminated SSE event at end of stream");
            self.data.clear();
            self.has_data = false;
        }
        Ok(frames)
    }

    fn is_done(&self) -> bool {
        self.done
    }
}
