//! Catalog purchases under the per-tier discount and the admin-editable rates.
mod common;

use common::{ADMIN, ALICE, BOB, harness, texts};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use storefront_bot::database::models::{GoodStatus, NewGood, Payload};
use storefront_bot::database::{CatalogStore, LedgerStore};
use storefront_bot::interactions::ids;
use storefront_bot::services::pricing::{Rate, final_price};

async fn listed_good(h: &common::Harness, price: Decimal) -> i64 {
    h.store
        .create_good(NewGood {
            name: "Conqueror account".into(),
            description: "Level 70, 12 skins".into(),
            preview: None,
            price,
            payload: Payload::Text("login: hero / pass: 1234".into()),
        })
        .await
        .unwrap()
        .id
}

#[test]
fn final_price_rounds_and_is_stable() {
    assert_eq!(final_price(dec!(12000), dec!(0.03)), dec!(11640));
    assert_eq!(final_price(dec!(99.99), dec!(0.05)), dec!(94.99));
    assert_eq!(final_price(dec!(100), Decimal::ONE), Decimal::ZERO);
    let once = final_price(dec!(333.33), dec!(0.10));
    assert_eq!(once, final_price(dec!(333.33), dec!(0.10)));
}

#[tokio::test]
async fn good_sells_once_with_the_tier_discount() {
    let h = harness();
    let id = listed_good(&h, dec!(10000)).await;
    h.funded(ALICE, dec!(20000)).await;
    h.funded(BOB, dec!(20000)).await;
    h.store.force_tier(ALICE, 3, None).await;

    let listing = h.press(ALICE, ids::MENU_GOODS).await;
    assert!(texts(&listing).contains("9000"), "{}", texts(&listing));
    assert!(listing[0].controls.iter().all(|c| !c.token.starts_with(ids::DELETE_GOOD_PREFIX)));

    let bought = h.press(ALICE, &format!("{}{id}", ids::BUY_GOOD_PREFIX)).await;
    assert!(texts(&bought).contains("login: hero"), "{}", texts(&bought));
    assert_eq!(h.balance(ALICE).await, dec!(11000));
    assert!(texts(&h.notifier.sent_to(ADMIN).await).contains("sold to 100"));

    let late = h.press(BOB, &format!("{}{id}", ids::BUY_GOOD_PREFIX)).await;
    assert!(texts(&late).contains("no longer exists"), "{}", texts(&late));
    assert_eq!(h.balance(BOB).await, dec!(20000));
    assert_eq!(h.store.good(id).await.unwrap().unwrap().status, GoodStatus::Sold);
    assert!(h.store.list_active_goods().await.unwrap().is_empty());
}

#[tokio::test]
async fn free_good_still_leaves_a_ledger_entry() {
    let h = harness();
    h.app.pricing.set_rate(Rate::Discount(0), "1").await.unwrap();
    let id = listed_good(&h, dec!(500)).await;
    h.funded(ALICE, Decimal::ZERO).await;
    let before = h.store.ledger_len().await;

    let bought = h.press(ALICE, &format!("{}{id}", ids::BUY_GOOD_PREFIX)).await;
    assert!(texts(&bought).contains("You bought"), "{}", texts(&bought));
    assert_eq!(h.balance(ALICE).await, Decimal::ZERO);
    assert_eq!(h.store.ledger_len().await, before + 1);
    let history = h.store.history(ALICE, 1).await.unwrap();
    assert_eq!(history[0].amount, Decimal::ZERO);
}

#[tokio::test]
async fn good_above_balance_is_refused() {
    let h = harness();
    let id = listed_good(&h, dec!(10000)).await;
    h.funded(ALICE, dec!(9999.99)).await;
    let reply = h.press(ALICE, &format!("{}{id}", ids::BUY_GOOD_PREFIX)).await;
    assert!(texts(&reply).contains("Insufficient funds"));
    assert_eq!(h.balance(ALICE).await, dec!(9999.99));
    assert_eq!(h.store.list_active_goods().await.unwrap().len(), 1);
}

#[tokio::test]
async fn admin_can_delete_a_listing() {
    let h = harness();
    let id = listed_good(&h, dec!(10)).await;
    h.funded(ADMIN, Decimal::ZERO).await;
    let listing = h.press(ADMIN, ids::MENU_GOODS).await;
    let delete = format!("{}{id}", ids::DELETE_GOOD_PREFIX);
    assert!(listing[0].controls.iter().any(|c| c.token == delete));

    let denied = h.press(ALICE, &delete).await;
    assert!(texts(&denied).contains("not the admin"));
    assert!(h.store.good(id).await.unwrap().is_some());

    h.press(ADMIN, &delete).await;
    assert!(h.store.good(id).await.unwrap().is_none());
}

#[tokio::test]
async fn set_rate_flow_changes_the_discount() {
    let h = harness();
    h.funded(ADMIN, Decimal::ZERO).await;
    h.say(ADMIN, "!setrate").await;
    let rejected = h.say(ADMIN, "discount.0").await;
    assert!(texts(&rejected).contains("currently `0`"), "{}", texts(&rejected));
    let retry = h.say(ADMIN, "1.5").await;
    assert!(texts(&retry).contains("between 0 and 1"), "{}", texts(&retry));
    let done = h.say(ADMIN, "0.25").await;
    assert!(texts(&done).contains("`discount.0` set to `0.25`"), "{}", texts(&done));
    assert_eq!(h.app.pricing.for_tier(0).await.unwrap().discount, dec!(0.25));

    let id = listed_good(&h, dec!(100)).await;
    h.funded(ALICE, dec!(100)).await;
    h.press(ALICE, &format!("{}{id}", ids::BUY_GOOD_PREFIX)).await;
    assert_eq!(h.balance(ALICE).await, dec!(25));
}

#[tokio::test]
async fn theme_setting_renames_the_currency() {
    let h = harness();
    h.funded(ADMIN, Decimal::ZERO).await;
    h.say(ADMIN, "!setrate").await;
    h.say(ADMIN, "theme.currency").await;
    h.say(ADMIN, "coins").await;
    h.funded(ALICE, dec!(5)).await;
    let cabinet = h.say(ALICE, "!cabinet").await;
    assert!(texts(&cabinet).contains("5 coins"), "{}", texts(&cabinet));
}

#[tokio::test]
async fn corrupt_stored_rate_falls_back_to_default() {
    use storefront_bot::database::ConfigStore;
    let h = harness();
    h.store.set("discount.1", "lots").await.unwrap();
    assert_eq!(h.app.pricing.rate(Rate::Discount(1)).await.unwrap(), dec!(0.03));
}
