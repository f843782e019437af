//! Catalog browsing and purchases: currency/popularity packages go through admin moderation,
//! digital goods are delivered immediately.

use crate::AppState;
use crate::conversation::flow::{Field, Value};
use crate::conversation::{FlowKind, Scratch};
use crate::database::models::{AccountId, DigitalGood, PackageKind, Payload};
use crate::error::{BotError, BotResult};
use crate::interactions::ids;
use crate::services::notify::{Attachment, Control, ControlStyle, Notice, notify_best_effort};
use crate::services::pricing::final_price;
use rust_decimal::Decimal;
use tracing::info;

async fn discount_for(app: &AppState, account: AccountId) -> BotResult<Decimal> {
    let tier = app
        .store
        .account(account)
        .await?
        .map(|a| a.tier)
        .unwrap_or_default();
    Ok(app.pricing.for_tier(tier).await?.discount)
}

pub async fn packages(
    app: &AppState,
    account: AccountId,
    kind: PackageKind,
) -> BotResult<Vec<Notice>> {
    let theme = app.theme().await?;
    let discount = discount_for(app, account).await?;
    let packages = app.store.list_packages(Some(kind)).await?;
    let heading = match kind {
        PackageKind::Currency => format!("💎 {} packages", theme.package_noun),
        PackageKind::Popularity => "🔥 Popularity packages".to_string(),
    };
    if packages.is_empty() {
        return Ok(vec![Notice::text(format!("{heading}\n\nNothing on sale right now."))]);
    }
    let mut lines = vec![heading];
    if discount > Decimal::ZERO {
        lines.push(format!(
            "Your status discount: {}%",
            (discount * Decimal::ONE_HUNDRED).normalize()
        ));
    }
    let mut controls = Vec::with_capacity(packages.len());
    for p in &packages {
        let price = final_price(p.price, discount);
        lines.push(format!(
            "`#{}` {} | {} / {}",
            p.id,
            p.title,
            theme.money(price),
            theme.alt_money(p.alt_price)
        ));
        controls.push(Control::new(
            format!("{}{}", ids::BUY_PACKAGE_PREFIX, p.id),
            format!("{} · {}", p.title, theme.money(price)),
            ControlStyle::Primary,
        ));
    }
    Ok(vec![Notice::text(lines.join("\n")).controls(controls)])
}

pub async fn goods(app: &AppState, account: AccountId) -> BotResult<Vec<Notice>> {
    let theme = app.theme().await?;
    let discount = discount_for(app, account).await?;
    let goods = app.store.list_active_goods().await?;
    if goods.is_empty() {
        return Ok(vec![Notice::text(format!(
            "🎮 No {} for sale right now.",
            theme.goods_noun
        ))]);
    }
    let is_admin = app.is_admin(account);
    Ok(goods
        .into_iter()
        .map(|g| {
            let price = final_price(g.price, discount);
            let mut notice = Notice::text(format!(
                "🎮 **{}** `#{}`\n{}\nPrice: {}",
                g.name,
                g.id,
                g.description,
                theme.money(price)
            ))
            .attach(g.preview.map(Attachment::from))
            .control(Control::new(
                format!("{}{}", ids::BUY_GOOD_PREFIX, g.id),
                "🛒 Buy",
                ControlStyle::Success,
            ));
            if is_admin {
                notice = notice.control(Control::new(
                    format!("{}{}", ids::DELETE_GOOD_PREFIX, g.id),
                    "🗑 Delete",
                    ControlStyle::Danger,
                ));
            }
            notice
        })
        .collect())
}

/// Starts the purchase flow for a package. Fails without installing a flow when the balance
/// does not cover the discounted price.
pub async fn buy_package(app: &AppState, account: AccountId, package_id: i64) -> BotResult<Vec<Notice>> {
    let seed = Scratch::new().with(Field::PackageId, Value::Id(package_id));
    Ok(vec![
        app.engine
            .start(account, FlowKind::PackagePurchase, seed)
            .await?,
    ])
}

fn delivery(good: &DigitalGood, money: String) -> Notice {
    let header = format!("✅ You bought «{}» for {money}.", good.name);
    match &good.payload {
        Payload::Text(text) => Notice::text(format!("{header}\n\n{text}")),
        Payload::File(reference) => Notice::text(format!("{header}\nYour file is attached."))
            .attach(Some(Attachment::File(reference.clone()))),
    }
    .control(Control::new(ids::MENU_GOODS, "🎮 More", ControlStyle::Secondary))
}

pub async fn buy_good(app: &AppState, account: AccountId, good_id: i64) -> BotResult<Vec<Notice>> {
    let theme = app.theme().await?;
    let listed = app
        .store
        .good(good_id)
        .await?
        .ok_or_else(|| BotError::not_found(format!("Item #{good_id}")))?;
    let price = final_price(listed.price, discount_for(app, account).await?);
    let good = app.store.purchase_good(account, good_id, price).await?;
    info!(target = "catalog", good = good.id, buyer = %account, price = %price, "Digital good sold");
    notify_best_effort(
        app.notifier.as_ref(),
        app.admin_id,
        Notice::text(format!(
            "🛍 {} #{} «{}» sold to {account} for {}.",
            theme.goods_noun,
            good.id,
            good.name,
            theme.money(price)
        )),
        "good_sold",
    )
    .await;
    Ok(vec![delivery(&good, theme.money(price))])
}
