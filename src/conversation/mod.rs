//! Multi-step conversations: per-user flow state, step validation and completion actions.

pub mod engine;
pub mod flow;
pub mod session;
pub mod validate;

pub use engine::{ConversationEngine, Outcome};
pub use flow::{FlowKind, Input, Scratch, Step};

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Periodically drop flows that have been idle past the timeout.
pub fn spawn_idle_sweeper(engine: Arc<ConversationEngine>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            engine.sweep_idle().await;
        }
    })
}
