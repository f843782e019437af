//! Main menu shown on `menu`, after `start` and for stray input outside a flow.

use crate::AppState;
use crate::database::models::AccountId;
use crate::error::BotResult;
use crate::interactions::ids;
use crate::services::notify::{Control, ControlStyle, Notice};
use crate::services::theme::Theme;

/// Main menu with one control per customer feature.
pub fn main_menu(theme: &Theme, header: &str, admin_prefix: Option<&str>) -> Notice {
    let mut text = format!("{header}\n\nChoose a section:");
    if let Some(prefix) = admin_prefix {
        text.push_str(&format!("\n\n🛠 Admin tools: `{prefix}admin`"));
    }
    Notice::text(text).controls([
        Control::new(ids::MENU_CURRENCY, format!("💎 Buy {}", theme.package_noun), ControlStyle::Primary),
        Control::new(ids::MENU_POPULARITY, "🔥 Popularity", ControlStyle::Primary),
        Control::new(ids::MENU_GOODS, format!("🎮 Buy {}", theme.goods_noun), ControlStyle::Primary),
        Control::new(ids::MENU_CABINET, "👤 Cabinet", ControlStyle::Secondary),
        Control::new(ids::MENU_TOPUP, "💳 Top up", ControlStyle::Success),
        Control::new(ids::MENU_TRANSFER, "💸 Transfer", ControlStyle::Secondary),
        Control::new(ids::MENU_UPGRADE, "🎖 Upgrade", ControlStyle::Secondary),
        Control::new(ids::MENU_CLICKER, "🖱 Clicker", ControlStyle::Secondary),
    ])
}

pub async fn run(app: &AppState, account: AccountId) -> BotResult<Vec<Notice>> {
    let theme = app.theme().await?;
    let admin = app.is_admin(account).then_some(app.prefix.as_str());
    Ok(vec![main_menu(&theme, "🏠 Main menu", admin)])
}
