//! Chat session state machine
//!
//! `Idle → Streaming → Idle`. The session exclusively owns the history and the
//! pending assistant text; the client only produces deltas which the driver
//! applies here.

mod driver;
mod events;
mod state;

pub use driver::TurnOutcome;
pub use events::{SessionEvent, SessionObserver};
pub use state::{ChatSession, SessionState};
