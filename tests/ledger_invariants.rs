//! Balance and ledger invariants of the store, exercised through the in-memory implementation.
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use storefront_bot::database::models::AccountId;
use storefront_bot::database::{ConfigStore, LedgerStore, MemoryStore};
use storefront_bot::error::BotError;

async fn store_with(id: AccountId, amount: Decimal) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.register(id, None, Decimal::ZERO).await.unwrap();
    if amount > Decimal::ZERO {
        store.credit(id, amount, "Seed funds").await.unwrap();
    }
    store
}

#[tokio::test]
async fn concurrent_debits_never_overdraw() {
    let id = AccountId(10);
    let store = store_with(id, dec!(100)).await;
    let mut handles = Vec::new();
    for _ in 0..25 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.debit(id, dec!(10), "Burst").await
        }));
    }
    let mut ok = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(balance) => {
                assert!(balance >= Decimal::ZERO);
                ok += 1;
            }
            Err(BotError::InsufficientFunds { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(ok, 10);
    let acc = store.account(id).await.unwrap().unwrap();
    assert_eq!(acc.balance, Decimal::ZERO);
    // seed credit + ten successful debits
    assert_eq!(store.ledger_len().await, 11);
}

#[tokio::test]
async fn balance_equals_sum_of_entries() {
    let id = AccountId(11);
    let store = store_with(id, dec!(250.50)).await;
    store.debit(id, dec!(100.25), "Spend").await.unwrap();
    store.credit(id, dec!(9.75), "Bonus").await.unwrap();
    let history = store.history(id, 100).await.unwrap();
    let sum: Decimal = history.iter().map(|e| e.amount).sum();
    let acc = store.account(id).await.unwrap().unwrap();
    assert_eq!(acc.balance, sum);
    assert_eq!(acc.balance, dec!(160.00));
}

#[tokio::test]
async fn failed_debit_leaves_no_entry() {
    let id = AccountId(12);
    let store = store_with(id, dec!(5)).await;
    let before = store.ledger_len().await;
    let err = store.debit(id, dec!(6), "Too much").await.unwrap_err();
    assert!(matches!(
        err,
        BotError::InsufficientFunds { balance, required } if balance == dec!(5) && required == dec!(6)
    ));
    assert_eq!(store.ledger_len().await, before);
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let id = AccountId(13);
    let store = store_with(id, dec!(5)).await;
    assert!(matches!(
        store.credit(id, Decimal::ZERO, "x").await,
        Err(BotError::InvalidAmount(_))
    ));
    assert!(matches!(
        store.debit(id, dec!(-1), "x").await,
        Err(BotError::InvalidAmount(_))
    ));
    assert!(matches!(
        store.transfer(id, AccountId(14), dec!(0)).await,
        Err(BotError::InvalidAmount(_))
    ));
}

#[tokio::test]
async fn transfer_is_all_or_nothing() {
    let a = AccountId(20);
    let b = AccountId(21);
    let store = store_with(a, dec!(50)).await;
    store.register(b, None, Decimal::ZERO).await.unwrap();

    assert!(matches!(
        store.transfer(a, b, dec!(80)).await,
        Err(BotError::InsufficientFunds { .. })
    ));
    assert!(matches!(
        store.transfer(a, AccountId(999), dec!(10)).await,
        Err(BotError::NotFound(_))
    ));
    assert!(matches!(
        store.transfer(a, a, dec!(10)).await,
        Err(BotError::Validation(_))
    ));
    assert_eq!(store.account(a).await.unwrap().unwrap().balance, dec!(50));
    assert_eq!(store.account(b).await.unwrap().unwrap().balance, Decimal::ZERO);

    let (from, to) = store.transfer(a, b, dec!(20)).await.unwrap();
    assert_eq!((from, to), (dec!(30), dec!(20)));
    let last = &store.history(b, 1).await.unwrap()[0];
    assert_eq!(last.reason, format!("Transfer from {a}"));
}

#[tokio::test]
async fn referral_is_paid_once_and_never_to_self() {
    let referrer = AccountId(30);
    let newcomer = AccountId(31);
    let store = store_with(referrer, Decimal::ZERO).await;

    let first = store.register(newcomer, Some(referrer), dec!(500)).await.unwrap();
    assert!(first.created);
    assert_eq!(first.referral_paid, Some((referrer, dec!(500))));
    let again = store.register(newcomer, Some(referrer), dec!(500)).await.unwrap();
    assert!(!again.created);
    assert_eq!(again.referral_paid, None);
    assert_eq!(store.account(referrer).await.unwrap().unwrap().balance, dec!(500));

    let selfish = store.register(AccountId(32), Some(AccountId(32)), dec!(500)).await.unwrap();
    assert_eq!(selfish.referral_paid, None);
    assert_eq!(selfish.account.referrer, None);
}

#[tokio::test]
async fn expired_tier_reads_as_default() {
    let id = AccountId(40);
    let store = store_with(id, Decimal::ZERO).await;
    store
        .force_tier(id, 2, Some(Utc::now() - Duration::minutes(1)))
        .await;
    let acc = store.account(id).await.unwrap().unwrap();
    assert_eq!(acc.tier, 0);
    assert_eq!(acc.tier_expires_at, None);

    store
        .force_tier(id, 2, Some(Utc::now() + Duration::days(1)))
        .await;
    assert_eq!(store.account(id).await.unwrap().unwrap().tier, 2);
}

#[tokio::test]
async fn tier_purchase_charges_and_sets_expiry_together() {
    let id = AccountId(41);
    let store = store_with(id, dec!(100)).await;
    let until = Utc::now() + Duration::days(30);
    assert!(matches!(
        store.purchase_tier(id, 1, until, dec!(101)).await,
        Err(BotError::InsufficientFunds { .. })
    ));
    assert_eq!(store.account(id).await.unwrap().unwrap().tier, 0);

    let acc = store.purchase_tier(id, 1, until, dec!(60)).await.unwrap();
    assert_eq!(acc.tier, 1);
    assert_eq!(acc.tier_expires_at, Some(until));
    assert_eq!(acc.balance, dec!(40));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opposite_transfers_conserve_money() {
    let (a, b) = (AccountId(30), AccountId(31));
    let store = store_with(a, dec!(500)).await;
    store.register(b, None, Decimal::ZERO).await.unwrap();
    store.credit(b, dec!(500), "Seed funds").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..40 {
        let store = store.clone();
        let amount = Decimal::from(10 + i % 7 * 20);
        handles.push(tokio::spawn(async move {
            let forward = store.transfer(a, b, amount);
            let backward = store.transfer(b, a, amount + dec!(5));
            tokio::join!(forward, backward)
        }));
    }
    for h in handles {
        let (x, y) = h.await.unwrap();
        for result in [x, y] {
            match result {
                Ok((from, to)) => assert!(from >= Decimal::ZERO && to >= Decimal::ZERO),
                Err(BotError::InsufficientFunds { .. }) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
    }
    let total = store.account(a).await.unwrap().unwrap().balance
        + store.account(b).await.unwrap().unwrap().balance;
    assert_eq!(total, dec!(1000));
    for id in [a, b] {
        let sum: Decimal = store.history(id, 1000).await.unwrap().iter().map(|e| e.amount).sum();
        assert_eq!(sum, store.account(id).await.unwrap().unwrap().balance);
    }
}

#[tokio::test]
async fn balances_stop_at_the_storage_ceiling() {
    let id = AccountId(40);
    let store = store_with(id, dec!(999999999999999999.99)).await;
    let before = store.ledger_len().await;

    let err = store.credit(id, dec!(0.01), "Overflow").await.unwrap_err();
    assert!(matches!(err, BotError::InvalidAmount(_)));
    let err = store
        .credit(id, dec!(79228162514264337593543950335), "Overflow")
        .await
        .unwrap_err();
    assert!(matches!(err, BotError::InvalidAmount(_)));
    assert_eq!(store.ledger_len().await, before);

    // the receiving side is checked before the sender is debited
    let other = AccountId(41);
    store.register(other, None, Decimal::ZERO).await.unwrap();
    store.credit(other, dec!(10), "Seed funds").await.unwrap();
    let err = store.transfer(other, id, dec!(1)).await.unwrap_err();
    assert!(matches!(err, BotError::InvalidAmount(_)));
    assert_eq!(store.account(other).await.unwrap().unwrap().balance, dec!(10));
    assert_eq!(
        store.account(id).await.unwrap().unwrap().balance,
        dec!(999999999999999999.99)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_reads_agree_on_the_default() {
    let store = Arc::new(MemoryStore::new());
    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.get_or_init("clicker_cost", &format!("{}", 100 + i)).await
        }));
    }
    let mut seen = Vec::new();
    for h in handles {
        seen.push(h.await.unwrap().unwrap());
    }
    assert!(seen.iter().all(|v| *v == seen[0]));
    assert_eq!(store.get_or_init("clicker_cost", "1").await.unwrap(), seen[0]);
}
