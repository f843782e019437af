//! Outbound messages in a transport-neutral shape, and the `Notifier` seam used to reach
//! users other than the one whose event is being handled.

use crate::database::models::{AccountId, Media};
use crate::error::BotResult;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStyle {
    Primary,
    Success,
    Danger,
    Secondary,
}

/// An actionable control (rendered as a button) carrying an opaque token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub token: String,
    pub label: String,
    pub style: ControlStyle,
}

impl Control {
    pub fn new(token: impl Into<String>, label: impl Into<String>, style: ControlStyle) -> Self {
        Self {
            token: token.into(),
            label: label.into(),
            style,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Photo(String),
    Video(String),
    File(String),
}

impl From<Media> for Attachment {
    fn from(m: Media) -> Self {
        match m {
            Media::Photo(r) => Attachment::Photo(r),
            Media::Video(r) => Attachment::Video(r),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub controls: Vec<Control>,
    pub attachment: Option<Attachment>,
}

impl Notice {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn control(mut self, control: Control) -> Self {
        self.controls.push(control);
        self
    }

    pub fn controls(mut self, controls: impl IntoIterator<Item = Control>) -> Self {
        self.controls.extend(controls);
        self
    }

    pub fn attach(mut self, attachment: Option<Attachment>) -> Self {
        self.attachment = attachment;
        self
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a message to a user outside the current reply channel (usually a DM).
    async fn deliver(&self, to: AccountId, notice: Notice) -> BotResult<()>;
}

/// Delivery failures are logged and swallowed: the state change that triggered the message has
/// already been committed and must stand.
pub async fn notify_best_effort(
    notifier: &dyn Notifier,
    to: AccountId,
    notice: Notice,
    what: &str,
) -> bool {
    match notifier.deliver(to, notice).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(target = "notify", recipient = %to, what, error = %e, "Notification not delivered");
            false
        }
    }
}
