//! This module defines the shared state used throughout the application.
//! An `Arc<AppState>` is stored in Serenity's global context as a `TypeMapKey`; tests build one
//! directly around a `MemoryStore` and a `RecordingNotifier`.

use crate::conversation::ConversationEngine;
use crate::database::Store;
use crate::database::models::AccountId;
use crate::error::BotResult;
use crate::services::moderation::Moderation;
use crate::services::notify::Notifier;
use crate::services::pricing::PricingPolicy;
use crate::services::theme::Theme;
use serenity::prelude::TypeMapKey;
use std::sync::Arc;
use std::time::Duration;

/// The central, shared state of the application.
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Reaches users other than the sender of the current event (the admin, transfer recipients).
    pub notifier: Arc<dyn Notifier>,
    pub pricing: PricingPolicy,
    pub moderation: Moderation,
    pub engine: Arc<ConversationEngine>,
    pub admin_id: AccountId,
    pub prefix: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        admin_id: AccountId,
        prefix: impl Into<String>,
        idle_timeout: Duration,
    ) -> Self {
        let pricing = PricingPolicy::new(store.clone());
        let moderation = Moderation::new(store.clone(), notifier.clone(), admin_id);
        let engine = Arc::new(ConversationEngine::new(
            store.clone(),
            pricing.clone(),
            moderation.clone(),
            notifier.clone(),
            idle_timeout,
        ));
        Self {
            store,
            notifier,
            pricing,
            moderation,
            engine,
            admin_id,
            prefix: prefix.into(),
        }
    }

    pub fn is_admin(&self, id: AccountId) -> bool {
        id == self.admin_id
    }

    pub async fn theme(&self) -> BotResult<Theme> {
        Theme::load(self.store.as_ref()).await
    }
}

impl TypeMapKey for AppState {
    type Value = Arc<AppState>;
}
