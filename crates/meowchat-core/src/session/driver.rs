//! Drives one streaming turn from backend to session state

use tracing::{debug, info};

use super::state::ChatSession;
use crate::ai::client::{ChatBackend, ChatTurn};
use crate::ai::types::StreamPart;
use crate::error::ChatError;

/// How a turn ended
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Completed,
    Cancelled,
    Failed(ChatError),
}

impl ChatSession {
    /// Run `turn` against `backend` until the stream ends, fails or is cancelled
    ///
    /// Deltas are applied to the session in arrival order. The session is idle
    /// again when this returns.
    pub async fn run_turn(&mut self, backend: &dyn ChatBackend, turn: ChatTurn) -> TurnOutcome {
        let cancel = turn.cancel.clone();

        let mut rx = match backend.stream_chat(turn).await {
            Ok(rx) => rx,
            Err(e) if cancel.is_cancelled() => {
                debug!("Request aborted before streaming: {}", e);
                self.finish_cancelled();
                return TurnOutcome::Cancelled;
            }
            Err(e) => {
                self.fail(&e);
                return TurnOutcome::Failed(e);
            }
        };

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    self.finish_cancelled();
                    return TurnOutcome::Cancelled;
                }

                part = rx.recv() => match part {
                    Some(StreamPart::TextDelta { delta }) => self.push_delta(&delta),
                    Some(StreamPart::Finish) => {
                        self.complete();
                        return TurnOutcome::Completed;
                    }
                    Some(StreamPart::Error(e)) => {
                        self.fail(&e);
                        return TurnOutcome::Failed(e);
                    }
                    None => {
                        if cancel.is_cancelled() {
                            self.finish_cancelled();
                            return TurnOutcome::Cancelled;
                        }
                        // Body ended without an end marker
                        info!("Stream closed without end marker, archiving");
                        self.complete();
                        return TurnOutcome::Completed;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::ChatMessage;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Replays scripted parts, optionally cancelling the turn shortly after
    struct MockBackend {
        parts: Vec<StreamPart>,
        cancel_after: bool,
        reject: Option<ChatError>,
        seen: Mutex<Vec<ChatTurn>>,
        held: Mutex<Vec<mpsc::UnboundedSender<StreamPart>>>,
    }

    impl MockBackend {
        fn new(parts: Vec<StreamPart>) -> Self {
            Self {
                parts,
                cancel_after: false,
                reject: None,
                seen: Mutex::new(Vec::new()),
                held: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for MockBackend {
        async fn stream_chat(
            &self,
            turn: ChatTurn,
        ) -> Result<mpsc::UnboundedReceiver<StreamPart>, ChatError> {
            self.seen.lock().unwrap().push(turn.clone());
            if let Some(e) = &self.reject {
                return Err(e.clone());
            }
            let (tx, rx) = mpsc::unbounded_channel();
            for part in &self.parts {
                let _ = tx.send(part.clone());
            }
            if self.cancel_after {
                // Keep the sender open so only cancellation can end the turn
                self.held.lock().unwrap().push(tx);
                let cancel = turn.cancel.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    cancel.cancel();
                });
            }
            Ok(rx)
        }
    }

    fn delta(text: &str) -> StreamPart {
        StreamPart::TextDelta {
            delta: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_turn_completes() {
        let backend = MockBackend::new(vec![delta("4"), StreamPart::Finish]);
        let mut session = ChatSession::new();
        let turn = session.submit("2+2?").unwrap().unwrap();

        let outcome = session.run_turn(&backend, turn).await;
        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(
            session.history(),
            &[ChatMessage::user("2+2?"), ChatMessage::assistant("4")]
        );
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn test_closed_channel_without_finish_archives() {
        let backend = MockBackend::new(vec![delta("Mi"), delta("au")]);
        let mut session = ChatSession::new();
        let turn = session.submit("hi").unwrap().unwrap();

        assert_eq!(session.run_turn(&backend, turn).await, TurnOutcome::Completed);
        assert_eq!(
            session.history().last(),
            Some(&ChatMessage::assistant("Miau"))
        );
    }

    #[tokio::test]
    async fn test_cancelled_turn_keeps_partial() {
        let mut backend = MockBackend::new(vec![delta("par"), delta("tial")]);
        backend.cancel_after = true;
        let mut session = ChatSession::new();
        let turn = session.submit("story").unwrap().unwrap();

        let outcome = session.run_turn(&backend, turn).await;
        assert_eq!(outcome, TurnOutcome::Cancelled);
        assert!(!session.is_streaming());
        assert!(session.error().is_none());
        assert_eq!(
            session.history(),
            &[ChatMessage::user("story"), ChatMessage::assistant("partial")]
        );
    }

    #[tokio::test]
    async fn test_stream_error_fails_turn() {
        let backend = MockBackend::new(vec![
            delta("garbage"),
            StreamPart::Error(ChatError::Decode("expected value".to_string())),
        ]);
        let mut session = ChatSession::new();
        let turn = session.submit("hi").unwrap().unwrap();

        let outcome = session.run_turn(&backend, turn).await;
        assert!(matches!(outcome, TurnOutcome::Failed(ChatError::Decode(_))));
        assert_eq!(session.history(), &[ChatMessage::user("hi")]);
        assert_eq!(session.pending_text(), "");
        assert!(session.error().is_some());
    }

    #[tokio::test]
    async fn test_rejected_request_fails_turn() {
        let mut backend = MockBackend::new(Vec::new());
        backend.reject = Some(ChatError::Auth("Invalid password.".to_string()));
        let mut session = ChatSession::new();
        let turn = session.submit("hi").unwrap().unwrap();

        let outcome = session.run_turn(&backend, turn).await;
        assert_eq!(
            outcome,
            TurnOutcome::Failed(ChatError::Auth("Invalid password.".to_string()))
        );
        assert_eq!(
            session.error().map(|e| e.message.as_str()),
            Some("Invalid password.")
        );
    }

    #[tokio::test]
    async fn test_retry_sends_history_without_old_answer() {
        let backend = MockBackend::new(vec![delta("second"), StreamPart::Finish]);
        let mut session = ChatSession::new();
        session
            .restore(
                Some(vec![
                    ChatMessage::user("hi"),
                    ChatMessage::assistant("first"),
                ]),
                None,
                true,
            )
            .unwrap();

        let turn = session.retry().unwrap();
        session.run_turn(&backend, turn).await;

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].history, vec![ChatMessage::user("hi")]);
        assert_eq!(
            session.history(),
            &[ChatMessage::user("hi"), ChatMessage::assistant("second")]
        );
    }
}
