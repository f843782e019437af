//! Static command registry used for the help text.

use crate::AppState;
use crate::database::models::AccountId;
use crate::services::notify::Notice;

#[derive(Clone, Copy, PartialEq, Eq)]
enum CommandCategory {
    Shop,
    Account,
    Admin,
}

impl CommandCategory {
    fn name(&self) -> &'static str {
        match self {
            Self::Shop => "🛒 Shop",
            Self::Account => "👤 Account",
            Self::Admin => "🛠 Admin",
        }
    }
}

struct CommandInfo {
    name: &'static str,
    usage: &'static str,
    description: &'static str,
    category: CommandCategory,
}

const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "start",
        usage: "start [invite code]",
        description: "Register, optionally with a friend's invite code.",
        category: CommandCategory::Account,
    },
    CommandInfo {
        name: "menu",
        usage: "menu",
        description: "Open the main menu.",
        category: CommandCategory::Account,
    },
    CommandInfo {
        name: "help",
        usage: "help",
        description: "Show this help.",
        category: CommandCategory::Account,
    },
    CommandInfo {
        name: "cabinet",
        usage: "cabinet",
        description: "Balance, status, invite code and recent activity.",
        category: CommandCategory::Account,
    },
    CommandInfo {
        name: "topup",
        usage: "topup",
        description: "Top up your balance with a payment receipt.",
        category: CommandCategory::Account,
    },
    CommandInfo {
        name: "transfer",
        usage: "transfer",
        description: "Send balance to another user.",
        category: CommandCategory::Account,
    },
    CommandInfo {
        name: "upgrade",
        usage: "upgrade",
        description: "Buy a status tier or unlock the clicker.",
        category: CommandCategory::Account,
    },
    CommandInfo {
        name: "click",
        usage: "click",
        description: "Earn a small reward per click once unlocked.",
        category: CommandCategory::Account,
    },
    CommandInfo {
        name: "cancel",
        usage: "cancel",
        description: "Cancel the current operation.",
        category: CommandCategory::Account,
    },
    CommandInfo {
        name: "uc",
        usage: "uc",
        description: "In-game currency packages.",
        category: CommandCategory::Shop,
    },
    CommandInfo {
        name: "popularity",
        usage: "popularity",
        description: "Popularity packages.",
        category: CommandCategory::Shop,
    },
    CommandInfo {
        name: "goods",
        usage: "goods",
        description: "Digital goods for sale.",
        category: CommandCategory::Shop,
    },
    CommandInfo {
        name: "buy",
        usage: "buy <package id>",
        description: "Order a package by id.",
        category: CommandCategory::Shop,
    },
    CommandInfo {
        name: "buygood",
        usage: "buygood <item id>",
        description: "Buy a digital good by id.",
        category: CommandCategory::Shop,
    },
    CommandInfo {
        name: "admin",
        usage: "admin",
        description: "Admin panel.",
        category: CommandCategory::Admin,
    },
    CommandInfo {
        name: "pending",
        usage: "pending",
        description: "Pending moderation requests.",
        category: CommandCategory::Admin,
    },
    CommandInfo {
        name: "addgood",
        usage: "addgood",
        description: "Add a digital good.",
        category: CommandCategory::Admin,
    },
    CommandInfo {
        name: "addpackage",
        usage: "addpackage",
        description: "Add a currency package.",
        category: CommandCategory::Admin,
    },
    CommandInfo {
        name: "editprice",
        usage: "editprice",
        description: "Change a package price.",
        category: CommandCategory::Admin,
    },
    CommandInfo {
        name: "delgood",
        usage: "delgood <id>",
        description: "Remove a digital good.",
        category: CommandCategory::Admin,
    },
    CommandInfo {
        name: "delpackage",
        usage: "delpackage <id>",
        description: "Remove a package.",
        category: CommandCategory::Admin,
    },
    CommandInfo {
        name: "rates",
        usage: "rates",
        description: "Show rates and display settings.",
        category: CommandCategory::Admin,
    },
    CommandInfo {
        name: "setrate",
        usage: "setrate",
        description: "Change a rate or display setting.",
        category: CommandCategory::Admin,
    },
];

pub fn all_command_names() -> Vec<&'static str> {
    COMMANDS.iter().map(|c| c.name).collect()
}

pub fn help_text(prefix: &str, is_admin: bool) -> String {
    let mut out = String::from("📖 **Commands**");
    for category in [
        CommandCategory::Shop,
        CommandCategory::Account,
        CommandCategory::Admin,
    ] {
        if category == CommandCategory::Admin && !is_admin {
            continue;
        }
        out.push_str(&format!("\n\n{}", category.name()));
        for c in COMMANDS.iter().filter(|c| c.category == category) {
            out.push_str(&format!("\n`{prefix}{}` {}", c.usage, c.description));
        }
    }
    out
}

pub fn run(app: &AppState, account: AccountId) -> Vec<Notice> {
    vec![Notice::text(help_text(&app.prefix, app.is_admin(account)))]
}
