//! Ensures the help registry lists every command exactly once and hides admin entries.
use std::str::FromStr;
use storefront_bot::commands::Command;
use storefront_bot::commands::help::{all_command_names, help_text};

#[test]
fn help_command_names_unique_and_present() {
    let names = all_command_names();
    let mut sorted = names.clone();
    sorted.sort();
    for w in sorted.windows(2) {
        assert_ne!(w[0], w[1], "Duplicate help command name: {}", w[0]);
    }
    let expected = [
        "start", "menu", "help", "cabinet", "topup", "transfer", "upgrade", "click", "cancel",
        "uc", "popularity", "goods", "buy", "buygood", "admin", "pending", "addgood",
        "addpackage", "editprice", "delgood", "delpackage", "rates", "setrate",
    ];
    for e in expected {
        assert!(sorted.contains(&e), "Missing help entry for `{}`", e);
    }
}

#[test]
fn every_help_entry_parses_to_a_command() {
    for name in all_command_names() {
        assert_ne!(
            Command::from_str(name),
            Ok(Command::Unknown),
            "`{name}` is listed in help but not routed"
        );
    }
}

#[test]
fn admin_section_only_for_admin() {
    assert!(!help_text("!", false).contains("!addgood"));
    assert!(help_text("!", true).contains("!addgood"));
    assert!(help_text("?", false).contains("?cabinet"));
}
