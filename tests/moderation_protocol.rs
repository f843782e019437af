//! Purchase and top-up requests through admin moderation, end to end via the router.
mod common;

use common::{ADMIN, ALICE, BOB, harness, texts};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use storefront_bot::database::models::{Decision, ModerationStatus, PackageKind};
use storefront_bot::database::{CatalogStore, LedgerStore, ModerationStore, seed_catalog};
use storefront_bot::error::BotError;
use storefront_bot::interactions::ids;
use storefront_bot::router::InboundKind;

async fn package_id(h: &common::Harness, title: &str) -> i64 {
    seed_catalog(h.store.as_ref()).await.unwrap();
    h.store
        .list_packages(Some(PackageKind::Currency))
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.title == title)
        .expect("seeded package")
        .id
}

/// Token of the admin's decision control on the latest request notice.
async fn admin_token(h: &common::Harness, decision: Decision) -> String {
    let notice = h
        .notifier
        .sent_to(ADMIN)
        .await
        .into_iter()
        .rev()
        .find(|n| !n.controls.is_empty())
        .expect("admin notice with controls");
    let index = match decision {
        Decision::Approve => 0,
        Decision::Decline => 1,
    };
    notice.controls[index].token.clone()
}

#[tokio::test]
async fn declined_purchase_is_refunded_exactly_once() {
    let h = harness();
    let pkg = package_id(&h, "325 UC").await;
    h.funded(ALICE, dec!(60000)).await;

    let prompt = h.press(ALICE, &format!("{}{pkg}", ids::BUY_PACKAGE_PREFIX)).await;
    assert!(texts(&prompt).contains("player ID"), "{}", texts(&prompt));
    let done = h.say(ALICE, "5123456789").await;
    assert!(texts(&done).contains("Order #"), "{}", texts(&done));
    assert_eq!(h.balance(ALICE).await, Decimal::ZERO);

    let pending = h.store.pending_requests().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].context.contains("5123456789"));

    let decline = admin_token(&h, Decision::Decline).await;
    assert!(decline.starts_with(ids::MODERATION_DECLINE_PREFIX));
    let reply = h.press(ADMIN, &decline).await;
    assert!(texts(&reply).contains("declined"), "{}", texts(&reply));
    assert_eq!(h.balance(ALICE).await, dec!(60000));

    let again = h.press(ADMIN, &decline).await;
    assert!(texts(&again).contains("already been handled"), "{}", texts(&again));
    let approve = admin_token(&h, Decision::Approve).await;
    h.press(ADMIN, &approve).await;
    assert_eq!(h.balance(ALICE).await, dec!(60000));

    let history = h.store.history(ALICE, 10).await.unwrap();
    assert_eq!(history.len(), 3, "seed, reservation, refund");
    assert_eq!(history[0].amount, dec!(60000));
    assert!(history[0].reason.contains("declined"));

    let told = texts(&h.notifier.sent_to(ALICE).await);
    assert!(told.contains("was declined"), "{told}");
}

#[tokio::test]
async fn approved_purchase_keeps_the_reservation() {
    let h = harness();
    let pkg = package_id(&h, "60 UC").await;
    h.funded(ALICE, dec!(20000)).await;
    h.press(ALICE, &format!("{}{pkg}", ids::BUY_PACKAGE_PREFIX)).await;
    h.say(ALICE, "777").await;
    assert_eq!(h.balance(ALICE).await, dec!(8000));

    h.press(ADMIN, &admin_token(&h, Decision::Approve).await).await;
    assert_eq!(h.balance(ALICE).await, dec!(8000));
    assert!(h.store.pending_requests().await.unwrap().is_empty());
    assert!(texts(&h.notifier.sent_to(ALICE).await).contains("has been completed"));
}

#[tokio::test]
async fn top_up_credits_only_on_approval() {
    let h = harness();
    h.funded(ALICE, Decimal::ZERO).await;

    let prompt = h.say(ALICE, "!topup").await;
    assert!(texts(&prompt).contains("top up"));
    h.say(ALICE, "15 000").await;
    let retry = h.say(ALICE, "here is my receipt").await;
    assert!(texts(&retry).contains("photo"), "{}", texts(&retry));
    let done = h
        .send(ALICE, InboundKind::Photo("https://cdn.example/receipt.png".into()))
        .await;
    assert!(texts(&done).contains("Top-up request #"), "{}", texts(&done));
    assert_eq!(h.balance(ALICE).await, Decimal::ZERO);

    let admin_view = h.notifier.sent_to(ADMIN).await;
    assert!(admin_view.last().unwrap().attachment.is_some());

    h.press(ADMIN, &admin_token(&h, Decision::Approve).await).await;
    assert_eq!(h.balance(ALICE).await, dec!(15000));
    assert!(texts(&h.notifier.sent_to(ALICE).await).contains("approved"));
}

#[tokio::test]
async fn only_the_admin_can_resolve() {
    let h = harness();
    h.funded(ALICE, Decimal::ZERO).await;
    h.say(ALICE, "!topup").await;
    h.say(ALICE, "500").await;
    h.send(ALICE, InboundKind::Photo("r".into())).await;

    let approve = admin_token(&h, Decision::Approve).await;
    let reply = h.press(BOB, &approve).await;
    assert!(texts(&reply).contains("not the admin"));
    let reply = h.press(ALICE, &approve).await;
    assert!(texts(&reply).contains("not the admin"));
    assert_eq!(h.balance(ALICE).await, Decimal::ZERO);
    assert_eq!(h.store.pending_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn tampered_token_is_rejected() {
    let h = harness();
    h.funded(ALICE, Decimal::ZERO).await;
    h.say(ALICE, "!topup").await;
    h.say(ALICE, "500").await;
    h.send(ALICE, InboundKind::Photo("r".into())).await;

    let approve = admin_token(&h, Decision::Approve).await;
    let forged = approve.replace("_500", "_5000000");
    let reply = h.press(ADMIN, &forged).await;
    assert!(texts(&reply).contains("no longer valid"), "{}", texts(&reply));
    assert_eq!(h.balance(ALICE).await, Decimal::ZERO);
    assert_eq!(h.store.pending_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_resolutions_settle_once() {
    let h = harness();
    let pkg = package_id(&h, "60 UC").await;
    h.funded(ALICE, dec!(12000)).await;
    h.press(ALICE, &format!("{}{pkg}", ids::BUY_PACKAGE_PREFIX)).await;
    h.say(ALICE, "42").await;

    let theme = h.app.theme().await.unwrap();
    let decline = admin_token(&h, Decision::Decline).await;
    let (a, b) = tokio::join!(
        h.app.moderation.resolve(ADMIN, &decline, &theme),
        h.app.moderation.resolve(ADMIN, &decline, &theme),
    );
    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(BotError::AlreadyResolved(_))))
    );
    assert_eq!(h.balance(ALICE).await, dec!(12000));
    let resolved = outcomes.into_iter().find_map(Result::ok).unwrap();
    assert_eq!(resolved.status, ModerationStatus::Declined);
    assert!(resolved.resolved_at.is_some());
}

#[tokio::test]
async fn unreachable_admin_does_not_lose_the_request() {
    let h = harness();
    h.notifier.block(ADMIN).await;
    h.funded(ALICE, Decimal::ZERO).await;
    h.say(ALICE, "!topup").await;
    h.say(ALICE, "500").await;
    let done = h.send(ALICE, InboundKind::Photo("r".into())).await;
    assert!(texts(&done).contains("Top-up request #"));
    assert_eq!(h.store.pending_requests().await.unwrap().len(), 1);

    let listed = h.say(ADMIN, "!pending").await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].controls.len(), 2);
}
