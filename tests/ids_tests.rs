use chrono::Utc;
use rust_decimal_macros::dec;
use storefront_bot::database::models::{
    AccountId, Decision, ModerationKind, ModerationRequest, ModerationStatus,
};
use storefront_bot::interactions::ids::{
    BUY_GOOD_PREFIX, BUY_PACKAGE_PREFIX, moderation_token, parse_moderation_token,
    parse_prefixed_id,
};

fn request() -> ModerationRequest {
    ModerationRequest {
        id: 12,
        requester: AccountId(987654321),
        kind: ModerationKind::PurchaseConfirmation,
        amount: dec!(60000.00),
        context: "Package: 325 UC".into(),
        status: ModerationStatus::Pending,
        created_at: Utc::now(),
        resolved_at: None,
    }
}

#[test]
fn moderation_token_layout() {
    let token = moderation_token(Decision::Approve, &request());
    assert_eq!(token, "mod_approve_12_buy_987654321_60000");
    let token = moderation_token(Decision::Decline, &request());
    assert!(token.starts_with("mod_decline_12_buy_"));
}

#[test]
fn parse_moderation_ok() {
    let ticket = parse_moderation_token("mod_decline_12_buy_987654321_60000").expect("should parse");
    assert_eq!(ticket.decision, Decision::Decline);
    assert_eq!(ticket.request_id, 12);
    assert_eq!(ticket.kind, ModerationKind::PurchaseConfirmation);
    assert_eq!(ticket.requester, AccountId(987654321));
    assert_eq!(ticket.amount, dec!(60000));
    assert!(ticket.matches(&request()));
}

#[test]
fn parse_moderation_fractional_amount() {
    let ticket = parse_moderation_token("mod_approve_3_topup_5_12.50").expect("should parse");
    assert_eq!(ticket.kind, ModerationKind::TopUpConfirmation);
    assert_eq!(ticket.amount, dec!(12.5));
}

#[test]
fn parse_moderation_bad() {
    assert!(parse_moderation_token("mod_approve_").is_none());
    assert!(parse_moderation_token("mod_maybe_12_buy_5_100").is_none());
    assert!(parse_moderation_token("mod_approve_x_buy_5_100").is_none());
    assert!(parse_moderation_token("mod_approve_12_gift_5_100").is_none());
    assert!(parse_moderation_token("mod_approve_12_buy_0_100").is_none());
    assert!(parse_moderation_token("mod_approve_12_buy_5_-100").is_none());
    assert!(parse_moderation_token("mod_approve_12_buy_5").is_none());
}

#[test]
fn tampered_ticket_does_not_match() {
    let mut ticket = parse_moderation_token("mod_approve_12_buy_987654321_60000").unwrap();
    ticket.amount = dec!(1);
    assert!(!ticket.matches(&request()));
}

#[test]
fn prefixed_ids() {
    assert_eq!(parse_prefixed_id("buy_7", BUY_PACKAGE_PREFIX), Some(7));
    assert_eq!(parse_prefixed_id("buygood_7", BUY_GOOD_PREFIX), Some(7));
    assert_eq!(parse_prefixed_id("buygood_7", BUY_PACKAGE_PREFIX), None);
    assert_eq!(parse_prefixed_id("buy_0", BUY_PACKAGE_PREFIX), None);
    assert_eq!(parse_prefixed_id("buy_", BUY_PACKAGE_PREFIX), None);
}
