//! Conversation engine: installs flows, feeds input through the step validators and runs the
//! completion action once the last step is filled.

use super::flow::{Field, FlowKind, Input, MediaInput, Scratch, Setting, Step, UpgradeChoice, Value};
use super::session::{Session, SessionTable};
use super::validate::validate;
use crate::database::Store;
use crate::database::models::{
    Account, AccountId, CurrencyPackage, ModerationKind, NewGood, NewModeration, NewPackage,
};
use crate::error::{BotError, BotResult};
use crate::interactions::ids;
use crate::services::moderation::Moderation;
use crate::services::notify::{
    Attachment, Control, ControlStyle, Notice, Notifier, notify_best_effort,
};
use crate::services::pricing::{MAX_TIER, PricingPolicy, final_price};
use crate::services::theme::Theme;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// What happened to one piece of input.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// No flow is active; the input is for command handling.
    NoFlow,
    /// Accepted; the notice prompts for the next step.
    Prompt(Notice),
    /// Rejected by the step validator; the same step is asked again.
    Retry(Notice),
    Completed(Notice),
    /// The completion action failed; the flow is gone and nothing was half-applied.
    Aborted(Notice),
    Cancelled(Notice),
    Expired(Notice),
}

impl Outcome {
    pub fn into_notice(self) -> Option<Notice> {
        match self {
            Outcome::NoFlow => None,
            Outcome::Prompt(n)
            | Outcome::Retry(n)
            | Outcome::Completed(n)
            | Outcome::Aborted(n)
            | Outcome::Cancelled(n)
            | Outcome::Expired(n) => Some(n),
        }
    }
}

pub fn cancel_control() -> Control {
    Control::new(ids::CANCEL, "❌ Cancel", ControlStyle::Secondary)
}

fn cancelled_notice() -> Notice {
    Notice::text("❌ Operation cancelled.")
}

fn expired_notice() -> Notice {
    Notice::text("⌛ Your previous operation timed out. Please start again.")
}

fn missing(field: Field) -> BotError {
    BotError::invalid(format!("Missing {field:?}; please start again."))
}

pub struct ConversationEngine {
    sessions: SessionTable,
    store: Arc<dyn Store>,
    pricing: PricingPolicy,
    moderation: Moderation,
    notifier: Arc<dyn Notifier>,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<dyn Store>,
        pricing: PricingPolicy,
        moderation: Moderation,
        notifier: Arc<dyn Notifier>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            sessions: SessionTable::new(idle_timeout),
            store,
            pricing,
            moderation,
            notifier,
        }
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    /// Begin `kind` for `account`, replacing whatever flow was active. Preconditions that
    /// would make the flow pointless (unknown package, balance below the price) fail here and
    /// no session is installed.
    #[instrument(level = "debug", skip(self, seed))]
    pub async fn start(&self, account: AccountId, kind: FlowKind, seed: Scratch) -> BotResult<Notice> {
        if kind.admin_only() && account != self.moderation.admin() {
            return Err(BotError::Forbidden);
        }
        let theme = Theme::load(self.store.as_ref()).await?;
        let scratch = self
            .prepare(account, kind, seed.with(Field::Owner, Value::Account(account)))
            .await?;
        let session = Session::new(kind, scratch);
        let first = session
            .step()
            .ok_or_else(|| BotError::Config(format!("flow {} has no steps", kind.name())))?;
        let prompt = self.prompt(first, &session.scratch, &theme).await?;
        if let Some(previous) = self.sessions.install(account, session).await {
            debug!(target = "conversation", account = %account, superseded = previous.kind.name(), "Flow replaced");
        }
        info!(target = "conversation", account = %account, flow = kind.name(), "Flow started");
        Ok(prompt)
    }

    /// Discard the active flow, if any. Always answers with the cancellation notice.
    pub async fn cancel(&self, account: AccountId) -> Outcome {
        if let Some(session) = self.sessions.take(account).await {
            info!(target = "conversation", account = %account, flow = session.kind.name(), "Flow cancelled");
        }
        Outcome::Cancelled(cancelled_notice())
    }

    pub async fn current(&self, account: AccountId) -> Option<(FlowKind, Option<Step>)> {
        self.sessions.current(account).await
    }

    #[instrument(level = "debug", skip(self, input))]
    pub async fn submit(&self, account: AccountId, input: Input) -> BotResult<Outcome> {
        let theme = Theme::load(self.store.as_ref()).await?;
        let Some(mut session) = self.sessions.take(account).await else {
            return Ok(Outcome::NoFlow);
        };
        if session.is_idle(self.sessions.idle_timeout(), Instant::now()) {
            info!(target = "conversation", account = %account, flow = session.kind.name(), "Flow expired");
            return Ok(Outcome::Expired(expired_notice()));
        }
        let Some(step) = session.step() else {
            return Ok(Outcome::NoFlow);
        };

        let value = match validate(step, &input, &session.scratch) {
            Ok(v) => v,
            Err(e) => {
                session.touch();
                let again = self.prompt(step, &session.scratch, &theme).await?;
                self.sessions.restore(account, session).await;
                return Ok(Outcome::Retry(Notice {
                    text: format!("{}\n\n{}", e.user_message(&theme.currency), again.text),
                    ..again
                }));
            }
        };
        session.scratch.insert(step.field(), value);

        if step == Step::UpgradeConfirm && session.scratch.flag(Field::Confirmed) == Some(false) {
            return Ok(Outcome::Cancelled(cancelled_notice()));
        }

        if session.advance() {
            let Some(next) = session.step() else {
                return Ok(Outcome::NoFlow);
            };
            return match self.prompt(next, &session.scratch, &theme).await {
                Ok(prompt) => {
                    self.sessions.restore(account, session).await;
                    Ok(Outcome::Prompt(prompt))
                }
                Err(e) if e.is_recoverable() => {
                    Ok(Outcome::Aborted(Notice::text(e.user_message(&theme.currency))))
                }
                Err(e) => Err(e),
            };
        }

        let kind = session.kind;
        match self.complete(account, kind, session.scratch, &theme).await {
            Ok(notice) => {
                info!(target = "conversation", account = %account, flow = kind.name(), "Flow completed");
                Ok(Outcome::Completed(notice))
            }
            Err(e) if e.is_recoverable() => {
                info!(target = "conversation", account = %account, flow = kind.name(), error = %e, "Flow aborted");
                Ok(Outcome::Aborted(Notice::text(e.user_message(&theme.currency))))
            }
            Err(e) => Err(e),
        }
    }

    /// Drop idle sessions and tell their owners. Returns how many were dropped.
    pub async fn sweep_idle(&self) -> usize {
        let expired = self.sessions.sweep_idle().await;
        for account in &expired {
            notify_best_effort(self.notifier.as_ref(), *account, expired_notice(), "session_expired")
                .await;
        }
        if !expired.is_empty() {
            info!(target = "conversation", count = expired.len(), "Expired idle flows");
        }
        expired.len()
    }

    async fn account(&self, id: AccountId) -> BotResult<Account> {
        self.store
            .account(id)
            .await?
            .ok_or_else(|| BotError::not_found(format!("Account {id}")))
    }

    async fn prepare(&self, account: AccountId, kind: FlowKind, seed: Scratch) -> BotResult<Scratch> {
        match kind {
            FlowKind::PackagePurchase => {
                let id = seed
                    .id(Field::PackageId)
                    .ok_or_else(|| BotError::invalid("Choose a package first."))?;
                let (package, price) = self.quote_package(account, id).await?;
                let balance = self.account(account).await?.balance;
                if balance < price {
                    return Err(BotError::InsufficientFunds {
                        balance,
                        required: price,
                    });
                }
                Ok(seed
                    .with(Field::PackageTitle, Value::Text(package.title))
                    .with(Field::Price, Value::Money(price)))
            }
            FlowKind::Transfer => {
                let acct = self.account(account).await?;
                let policy = self.pricing.for_tier(acct.tier).await?;
                Ok(seed.with(Field::Limit, Value::Money(policy.transfer_limit)))
            }
            _ => Ok(seed),
        }
    }

    /// Current package and its price after the account's tier discount.
    async fn quote_package(
        &self,
        account: AccountId,
        id: i64,
    ) -> BotResult<(CurrencyPackage, rust_decimal::Decimal)> {
        let package = self
            .store
            .package(id)
            .await?
            .ok_or_else(|| BotError::not_found(format!("Package #{id}")))?;
        let acct = self.account(account).await?;
        let policy = self.pricing.for_tier(acct.tier).await?;
        let price = final_price(package.price, policy.discount);
        Ok((package, price))
    }

    async fn upgrade_cost(&self, choice: UpgradeChoice) -> BotResult<rust_decimal::Decimal> {
        match choice {
            UpgradeChoice::Tier(t) => self.pricing.status_cost(t).await,
            UpgradeChoice::Clicker => self.pricing.clicker_cost().await,
        }
    }

    async fn prompt(&self, step: Step, scratch: &Scratch, theme: &Theme) -> BotResult<Notice> {
        let text = match step {
            Step::GameId => format!(
                "🛒 {} for {}.\nSend your in-game player ID (digits only):",
                scratch.text(Field::PackageTitle).unwrap_or_default(),
                theme.money(scratch.money(Field::Price).unwrap_or_default())
            ),
            Step::TopUpAmount => {
                format!("💳 How much do you want to top up (in {})?", theme.currency)
            }
            Step::Receipt => format!(
                "Pay {} to the shop's card, then send a photo of the receipt.",
                theme.money(scratch.money(Field::Amount).unwrap_or_default())
            ),
            Step::Recipient => "💸 Send the account id of the recipient:".to_string(),
            Step::TransferAmount => format!(
                "How much do you want to send? Your limit is {}.",
                theme.money(scratch.money(Field::Limit).unwrap_or_default())
            ),
            Step::UpgradeChoice => {
                let mut lines = vec!["🎖 Upgrades:".to_string()];
                for t in 1..=MAX_TIER {
                    let cost = self.pricing.status_cost(t).await?;
                    lines.push(format!("`{t}` {} status: {}", Theme::tier_name(t), theme.money(cost)));
                }
                let days = self.pricing.status_duration().await?.num_days();
                lines.push(format!("Status lasts {days} days."));
                lines.push(format!(
                    "`clicker` Clicker: {}",
                    theme.money(self.pricing.clicker_cost().await?)
                ));
                lines.push(format!("Reply with 1-{MAX_TIER} or `clicker`."));
                lines.join("\n")
            }
            Step::UpgradeConfirm => {
                let choice = scratch.choice().ok_or_else(|| missing(Field::Choice))?;
                let cost = self.upgrade_cost(choice).await?;
                format!("Buy {choice} for {}? Reply `yes` or `no`.", theme.money(cost))
            }
            Step::GoodMedia => format!(
                "📦 Send a photo or video of the {}, or type `skip`.",
                theme.goods_noun
            ),
            Step::GoodName => "Send the name:".to_string(),
            Step::GoodDescription => "Send the description:".to_string(),
            Step::GoodPrice | Step::PackagePrice => {
                format!("Send the price in {}:", theme.currency)
            }
            Step::PackageAltPrice => format!("Send the price in {}:", theme.alt_currency),
            Step::GoodPayload => {
                "Send what the buyer receives: text (e.g. login details) or a file.".to_string()
            }
            Step::PackageKind => format!(
                "Package kind: `uc` ({}) or `pop` (popularity)?",
                theme.package_noun
            ),
            Step::PackageTitle => "Send the package title:".to_string(),
            Step::PackageQuantity => "Send the quantity:".to_string(),
            Step::PackageSelect => {
                let mut lines = vec!["Send the id of the package to edit:".to_string()];
                for p in self.store.list_packages(None).await? {
                    lines.push(format!(
                        "#{} {} | {} / {}",
                        p.id,
                        p.title,
                        theme.money(p.price),
                        theme.alt_money(p.alt_price)
                    ));
                }
                lines.join("\n")
            }
            Step::SettingKey => {
                let mut lines = vec!["Send the key of the setting to change:".to_string()];
                lines.extend(
                    crate::services::pricing::Rate::all()
                        .iter()
                        .map(|r| format!("`{}`", r.key())),
                );
                lines.extend(
                    crate::services::theme::ThemeKey::ALL
                        .iter()
                        .map(|k| format!("`{}`", k.key())),
                );
                lines.join("\n")
            }
            Step::SettingValue => {
                let setting = scratch.setting().ok_or_else(|| missing(Field::Setting))?;
                let current = match setting {
                    Setting::Rate(r) => self.pricing.rate(r).await?.to_string(),
                    Setting::Theme(k) => self.store.get_or_init(k.key(), k.default_value()).await?,
                };
                format!("`{}` is currently `{current}`. Send the new value:", setting.key())
            }
        };
        Ok(Notice::text(text).control(cancel_control()))
    }

    async fn complete(
        &self,
        account: AccountId,
        kind: FlowKind,
        mut scratch: Scratch,
        theme: &Theme,
    ) -> BotResult<Notice> {
        match kind {
            FlowKind::PackagePurchase => {
                // The catalog may have changed since the flow started; charge what it says now.
                let id = scratch.id(Field::PackageId).ok_or_else(|| missing(Field::PackageId))?;
                let (package, price) = self.quote_package(account, id).await?;
                let title = package.title;
                let game_id = scratch.text(Field::GameId).ok_or_else(|| missing(Field::GameId))?;
                let request = self
                    .moderation
                    .raise(
                        NewModeration {
                            requester: account,
                            kind: ModerationKind::PurchaseConfirmation,
                            amount: price,
                            context: format!("Package: {title}\nPlayer ID: {game_id}"),
                        },
                        &format!("Purchase: {title}"),
                        None,
                        theme,
                    )
                    .await?;
                Ok(Notice::text(format!(
                    "✅ Order #{} placed: {title} for {}.\nThe admin will confirm it shortly.",
                    request.id,
                    theme.money(price)
                )))
            }
            FlowKind::TopUp => {
                let amount = scratch.money(Field::Amount).ok_or_else(|| missing(Field::Amount))?;
                let receipt = match scratch.take(Field::Receipt) {
                    Some(Value::Media(MediaInput::Photo(r))) => r,
                    _ => return Err(missing(Field::Receipt)),
                };
                let request = self
                    .moderation
                    .raise(
                        NewModeration {
                            requester: account,
                            kind: ModerationKind::TopUpConfirmation,
                            amount,
                            context: format!("Receipt: {receipt}"),
                        },
                        "",
                        Some(Attachment::Photo(receipt)),
                        theme,
                    )
                    .await?;
                Ok(Notice::text(format!(
                    "📨 Top-up request #{} for {} sent. You will be notified once it is reviewed.",
                    request.id,
                    theme.money(amount)
                )))
            }
            FlowKind::Transfer => {
                let to = scratch
                    .account(Field::Recipient)
                    .ok_or_else(|| missing(Field::Recipient))?;
                let amount = scratch.money(Field::Amount).ok_or_else(|| missing(Field::Amount))?;
                let (balance, _) = self.store.transfer(account, to, amount).await?;
                info!(target = "ledger", from = %account, to = %to, amount = %amount, "Transfer completed");
                notify_best_effort(
                    self.notifier.as_ref(),
                    to,
                    Notice::text(format!("💸 You received {} from {account}.", theme.money(amount))),
                    "transfer",
                )
                .await;
                Ok(Notice::text(format!(
                    "✅ Sent {} to {to}. Your balance: {}.",
                    theme.money(amount),
                    theme.money(balance)
                )))
            }
            FlowKind::Upgrade => {
                let choice = scratch.choice().ok_or_else(|| missing(Field::Choice))?;
                self.complete_upgrade(account, choice, theme).await
            }
            FlowKind::AddGood => {
                let preview = match scratch.take(Field::Media) {
                    Some(Value::Media(m)) => m.into_media(),
                    _ => None,
                };
                let payload = match scratch.take(Field::Payload) {
                    Some(Value::Payload(p)) => p,
                    _ => return Err(missing(Field::Payload)),
                };
                let good = self
                    .store
                    .create_good(NewGood {
                        name: scratch.text(Field::Name).ok_or_else(|| missing(Field::Name))?.to_string(),
                        description: scratch
                            .text(Field::Description)
                            .ok_or_else(|| missing(Field::Description))?
                            .to_string(),
                        preview,
                        price: scratch.money(Field::Price).ok_or_else(|| missing(Field::Price))?,
                        payload,
                    })
                    .await?;
                info!(target = "catalog", good = good.id, "Digital good added");
                Ok(Notice::text(format!(
                    "✅ {} #{} «{}» added for {}.",
                    theme.goods_noun,
                    good.id,
                    good.name,
                    theme.money(good.price)
                )))
            }
            FlowKind::AddPackage => {
                let package = self
                    .store
                    .create_package(NewPackage {
                        kind: scratch.kind().ok_or_else(|| missing(Field::Kind))?,
                        title: scratch.text(Field::Title).ok_or_else(|| missing(Field::Title))?.to_string(),
                        quantity: scratch.id(Field::Quantity).ok_or_else(|| missing(Field::Quantity))?,
                        price: scratch.money(Field::Price).ok_or_else(|| missing(Field::Price))?,
                        alt_price: scratch.money(Field::AltPrice).ok_or_else(|| missing(Field::AltPrice))?,
                    })
                    .await?;
                info!(target = "catalog", package = package.id, "Package added");
                Ok(Notice::text(format!(
                    "✅ Package #{} {} added for {}.",
                    package.id,
                    package.title,
                    theme.money(package.price)
                )))
            }
            FlowKind::EditPackage => {
                let id = scratch.id(Field::PackageId).ok_or_else(|| missing(Field::PackageId))?;
                let package = self
                    .store
                    .update_package_price(
                        id,
                        scratch.money(Field::Price).ok_or_else(|| missing(Field::Price))?,
                        scratch.money(Field::AltPrice).ok_or_else(|| missing(Field::AltPrice))?,
                    )
                    .await?;
                info!(target = "catalog", package = package.id, price = %package.price, "Package price changed");
                Ok(Notice::text(format!(
                    "✅ {} now costs {} / {}.",
                    package.title,
                    theme.money(package.price),
                    theme.alt_money(package.alt_price)
                )))
            }
            FlowKind::SetRate => {
                let setting = scratch.setting().ok_or_else(|| missing(Field::Setting))?;
                let raw = scratch
                    .text(Field::SettingValue)
                    .ok_or_else(|| missing(Field::SettingValue))?;
                let stored = match setting {
                    Setting::Rate(rate) => self.pricing.set_rate(rate, raw).await?.to_string(),
                    Setting::Theme(key) => {
                        let value = key.validate(raw)?;
                        self.store.set(key.key(), &value).await?;
                        value
                    }
                };
                Ok(Notice::text(format!("✅ `{}` set to `{stored}`.", setting.key())))
            }
        }
    }

    async fn complete_upgrade(
        &self,
        account: AccountId,
        choice: UpgradeChoice,
        theme: &Theme,
    ) -> BotResult<Notice> {
        match choice {
            UpgradeChoice::Tier(tier) => {
                let acct = self.account(account).await?;
                if tier < acct.tier {
                    return Err(BotError::invalid(format!(
                        "You already have {} status.",
                        Theme::tier_name(acct.tier)
                    )));
                }
                let cost = self.pricing.status_cost(tier).await?;
                let duration = self.pricing.status_duration().await?;
                let now = Utc::now();
                // Buying the same tier again extends the running period.
                let base = match acct.tier_expires_at {
                    Some(at) if tier == acct.tier && at > now => at,
                    _ => now,
                };
                let expires_at = base
                    .checked_add_signed(duration)
                    .ok_or_else(|| BotError::invalid("That status period is too long."))?;
                let updated = self
                    .store
                    .purchase_tier(account, tier, expires_at, cost)
                    .await?;
                info!(target = "ledger", account = %account, tier, cost = %cost, "Status tier purchased");
                let until = updated
                    .tier_expires_at
                    .map(|at| at.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                Ok(Notice::text(format!(
                    "🎖 You now have {} status until {until}. Balance: {}.",
                    Theme::tier_name(updated.tier),
                    theme.money(updated.balance)
                )))
            }
            UpgradeChoice::Clicker => {
                let cost = self.pricing.clicker_cost().await?;
                let updated = self.store.unlock_clicker(account, cost).await?;
                info!(target = "ledger", account = %account, cost = %cost, "Clicker unlocked");
                Ok(Notice::text(format!(
                    "🖱 Clicker unlocked! Balance: {}.",
                    theme.money(updated.balance)
                ))
                .control(Control::new(ids::CLICK, "🖱 Click", ControlStyle::Primary)))
            }
        }
    }
}
