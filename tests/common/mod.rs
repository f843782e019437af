//! Shared harness: an `AppState` over the in-memory store and a recording notifier.
#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use storefront_bot::AppState;
use storefront_bot::database::models::AccountId;
use storefront_bot::database::{LedgerStore, MemoryStore, Store};
use storefront_bot::error::{BotError, BotResult};
use storefront_bot::router::{Inbound, InboundKind, route};
use storefront_bot::services::notify::{Notice, Notifier};
use tokio::sync::Mutex;

pub const ADMIN: AccountId = AccountId(1);
pub const ALICE: AccountId = AccountId(100);
pub const BOB: AccountId = AccountId(200);

/// Notifier that records every delivery. Recipients can be marked unreachable to exercise the
/// failure path.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(AccountId, Notice)>>,
    unreachable: Mutex<HashSet<AccountId>>,
}

impl RecordingNotifier {
    pub async fn block(&self, id: AccountId) {
        self.unreachable.lock().await.insert(id);
    }

    pub async fn sent(&self) -> Vec<(AccountId, Notice)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, id: AccountId) -> Vec<Notice> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(to, _)| *to == id)
            .map(|(_, n)| n.clone())
            .collect()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, to: AccountId, notice: Notice) -> BotResult<()> {
        if self.unreachable.lock().await.contains(&to) {
            return Err(BotError::NotificationDelivery(format!("user {to} is unreachable")));
        }
        self.sent.lock().await.push((to, notice));
        Ok(())
    }
}

pub struct Harness {
    pub app: AppState,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness() -> Harness {
    harness_with_idle(Duration::from_secs(1800))
}

pub fn harness_with_idle(idle: Duration) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let app = AppState::new(
        store.clone() as Arc<dyn Store>,
        notifier.clone() as Arc<dyn Notifier>,
        ADMIN,
        "!",
        idle,
    );
    Harness {
        app,
        store,
        notifier,
    }
}

impl Harness {
    pub async fn say(&self, who: AccountId, text: &str) -> Vec<Notice> {
        route(&self.app, Inbound::text(who, text)).await
    }

    pub async fn press(&self, who: AccountId, token: &str) -> Vec<Notice> {
        route(&self.app, Inbound::button(who, token)).await
    }

    pub async fn send(&self, who: AccountId, kind: InboundKind) -> Vec<Notice> {
        route(&self.app, Inbound { account: who, kind }).await
    }

    /// Register `who` and credit `amount` (when positive).
    pub async fn funded(&self, who: AccountId, amount: Decimal) {
        self.store
            .register(who, None, Decimal::ZERO)
            .await
            .expect("register");
        if amount > Decimal::ZERO {
            self.store
                .credit(who, amount, "Seed funds")
                .await
                .expect("credit");
        }
    }

    pub async fn balance(&self, who: AccountId) -> Decimal {
        self.store
            .account(who)
            .await
            .expect("account")
            .map(|a| a.balance)
            .unwrap_or_default()
    }
}

pub fn texts(notices: &[Notice]) -> String {
    notices
        .iter()
        .map(|n| n.text.as_str())
        .collect::<Vec<_>>()
        .join("\n---\n")
}
