mod common;

use common::{ALICE, BOB, harness, texts};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use storefront_bot::database::LedgerStore;
use storefront_bot::database::models::AccountId;

#[tokio::test]
async fn invite_pays_the_referrer_once() {
    let h = harness();
    h.funded(BOB, Decimal::ZERO).await;

    let welcome = h.say(ALICE, &format!("!start {BOB}")).await;
    assert!(texts(&welcome).contains("Welcome to the shop"));
    assert_eq!(h.balance(BOB).await, dec!(500));
    assert!(texts(&h.notifier.sent_to(BOB).await).contains("You received 500"));

    let again = h.say(ALICE, &format!("!start {BOB}")).await;
    assert!(texts(&again).contains("Welcome back"));
    assert_eq!(h.balance(BOB).await, dec!(500));
    assert_eq!(h.notifier.sent_to(BOB).await.len(), 1);

    let acc = h.store.account(ALICE).await.unwrap().unwrap();
    assert_eq!(acc.referrer, Some(BOB));
}

#[tokio::test]
async fn reward_follows_the_referrer_tier() {
    let h = harness();
    h.funded(BOB, Decimal::ZERO).await;
    h.store.force_tier(BOB, 2, None).await;
    h.say(ALICE, &format!("!start {BOB}")).await;
    assert_eq!(h.balance(BOB).await, dec!(1000));
}

#[tokio::test]
async fn existing_account_cannot_claim_a_referrer_later() {
    let h = harness();
    h.funded(BOB, Decimal::ZERO).await;
    h.say(ALICE, "!cabinet").await;
    h.say(ALICE, &format!("!start {BOB}")).await;
    assert_eq!(h.balance(BOB).await, Decimal::ZERO);
    let acc = h.store.account(ALICE).await.unwrap().unwrap();
    assert_eq!(acc.referrer, None);
}

#[tokio::test]
async fn self_and_unknown_referrers_pay_nothing() {
    let h = harness();
    h.say(ALICE, &format!("!start {ALICE}")).await;
    assert_eq!(h.balance(ALICE).await, Decimal::ZERO);

    let stranger = AccountId(999);
    let h = harness();
    h.say(ALICE, &format!("!start {stranger}")).await;
    assert!(h.store.account(stranger).await.unwrap().is_none());
    assert!(h.notifier.sent().await.is_empty());
}

#[tokio::test]
async fn unreachable_referrer_still_gets_paid() {
    let h = harness();
    h.funded(BOB, Decimal::ZERO).await;
    h.notifier.block(BOB).await;
    let welcome = h.say(ALICE, &format!("!start {BOB}")).await;
    assert!(texts(&welcome).contains("Welcome"));
    assert_eq!(h.balance(BOB).await, dec!(500));
    assert!(h.notifier.sent_to(BOB).await.is_empty());
}
