//! Session persistence
//!
//! History and system prompt live in the tab-scoped store; the
//! stick-to-bottom preference lives in the durable one.

use anyhow::Result;
use tracing::{debug, warn};

use super::kv::KeyValueStore;
use crate::ai::types::ChatMessage;
use crate::constants::storage::{
    MESSAGE_LIST_KEY, STICK_TO_BOTTOM_KEY, STICK_TO_BOTTOM_VALUE, SYSTEM_ROLE_KEY,
};
use crate::session::ChatSession;

pub struct PersistenceBridge<'a> {
    tab: &'a dyn KeyValueStore,
    durable: &'a dyn KeyValueStore,
}

impl<'a> PersistenceBridge<'a> {
    pub fn new(tab: &'a dyn KeyValueStore, durable: &'a dyn KeyValueStore) -> Self {
        Self { tab, durable }
    }

    /// Load persisted state into an idle session
    ///
    /// Malformed or unreadable entries are logged and skipped.
    pub fn restore(&self, session: &mut ChatSession) -> Result<()> {
        let history = match self.tab.get(MESSAGE_LIST_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<ChatMessage>>(&raw) {
                Ok(history) => Some(history),
                Err(e) => {
                    warn!("Ignoring malformed {}: {}", MESSAGE_LIST_KEY, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read {}: {}", MESSAGE_LIST_KEY, e);
                None
            }
        };

        // An empty stored prompt keeps the default
        let system_prompt = self
            .tab
            .get(SYSTEM_ROLE_KEY)
            .unwrap_or_else(|e| {
                warn!("Failed to read {}: {}", SYSTEM_ROLE_KEY, e);
                None
            })
            .filter(|prompt| !prompt.is_empty());

        let stick = match self.durable.get(STICK_TO_BOTTOM_KEY) {
            Ok(value) => value.as_deref() == Some(STICK_TO_BOTTOM_VALUE),
            Err(e) => {
                warn!("Failed to read {}: {}", STICK_TO_BOTTOM_KEY, e);
                false
            }
        };

        debug!(
            "Restoring session: {} messages, stick_to_bottom={}",
            history.as_ref().map_or(0, Vec::len),
            stick
        );
        session.restore(history, system_prompt, stick)?;
        Ok(())
    }

    /// Persist the session's current state
    pub fn snapshot(&self, session: &ChatSession) -> Result<()> {
        let state = session.state();
        self.tab
            .set(MESSAGE_LIST_KEY, &serde_json::to_string(&state.history)?)?;
        self.tab.set(SYSTEM_ROLE_KEY, &state.system_prompt)?;
        if state.stick_to_bottom {
            self.durable.set(STICK_TO_BOTTOM_KEY, STICK_TO_BOTTOM_VALUE)?;
        } else {
            self.durable.remove(STICK_TO_BOTTOM_KEY)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_snapshot_then_restore() {
        let tab = MemoryStore::new();
        let durable = MemoryStore::new();
        let bridge = PersistenceBridge::new(&tab, &durable);

        let mut session = ChatSession::new();
        session
            .restore(
                Some(vec![ChatMessage::user("hi"), ChatMessage::assistant("miau")]),
                Some("You are a dog.".to_string()),
                true,
            )
            .unwrap();
        bridge.snapshot(&session).unwrap();
        assert_eq!(
            durable.get(STICK_TO_BOTTOM_KEY).unwrap().as_deref(),
            Some("stick")
        );

        let mut fresh = ChatSession::new();
        bridge.restore(&mut fresh).unwrap();
        assert_eq!(fresh.history(), session.history());
        assert_eq!(fresh.state().system_prompt, "You are a dog.");
        assert!(fresh.state().stick_to_bottom);
    }

    #[test]
    fn test_stick_off_removes_key() {
        let tab = MemoryStore::new();
        let durable = MemoryStore::new();
        durable.set(STICK_TO_BOTTOM_KEY, "stick").unwrap();
        let bridge = PersistenceBridge::new(&tab, &durable);

        let mut session = ChatSession::new();
        session.set_stick_to_bottom(false);
        bridge.snapshot(&session).unwrap();
        assert_eq!(durable.get(STICK_TO_BOTTOM_KEY).unwrap(), None);
    }

    #[test]
    fn test_restore_with_nothing_stored() {
        let tab = MemoryStore::new();
        let durable = MemoryStore::new();
        let bridge = PersistenceBridge::new(&tab, &durable);

        let mut session = ChatSession::new();
        bridge.restore(&mut session).unwrap();
        assert!(session.history().is_empty());
        assert_eq!(
            session.state().system_prompt,
            crate::constants::chat::DEFAULT_SYSTEM_PROMPT
        );
        assert!(!session.state().stick_to_bottom);
    }

    #[test]
    fn test_malformed_history_skipped() {
        let tab = MemoryStore::new();
        let durable = MemoryStore::new();
        tab.set(MESSAGE_LIST_KEY, "[{\"role\":\"cat\"}]").unwrap();
        tab.set(SYSTEM_ROLE_KEY, "prompt").unwrap();
        let bridge = PersistenceBridge::new(&tab, &durable);

        let mut session = ChatSession::new();
        bridge.restore(&mut session).unwrap();
        assert!(session.history().is_empty());
        assert_eq!(session.state().system_prompt, "prompt");
    }

    #[test]
    fn test_empty_system_prompt_keeps_default() {
        let tab = MemoryStore::new();
        let durable = MemoryStore::new();
        tab.set(SYSTEM_ROLE_KEY, "").unwrap();
        let bridge = PersistenceBridge::new(&tab, &durable);

        let mut session = ChatSession::new();
        bridge.restore(&mut session).unwrap();
        assert_eq!(
            session.state().system_prompt,
            crate::constants::chat::DEFAULT_SYSTEM_PROMPT
        );
    }
}
