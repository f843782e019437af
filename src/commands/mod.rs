//! Prefix command parsing and the per-feature command modules.

pub mod admin;
pub mod cabinet;
pub mod clicker;
pub mod help;
pub mod menu;
pub mod shop;
pub mod start;

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Menu,
    Help,
    Cabinet,
    Currency,
    Popularity,
    Goods,
    Buy,
    BuyGood,
    TopUp,
    Transfer,
    Upgrade,
    Click,
    Cancel,
    Admin,
    AddGood,
    AddPackage,
    EditPrice,
    SetRate,
    Rates,
    DelGood,
    DelPackage,
    Pending,
    Unknown,
}

impl FromStr for Command {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Command::Start),
            "menu" | "m" => Ok(Command::Menu),
            "help" | "h" => Ok(Command::Help),
            "cabinet" | "profile" | "me" => Ok(Command::Cabinet),
            "uc" => Ok(Command::Currency),
            "popularity" | "pop" => Ok(Command::Popularity),
            "goods" | "accounts" => Ok(Command::Goods),
            "buy" => Ok(Command::Buy),
            "buygood" => Ok(Command::BuyGood),
            "topup" => Ok(Command::TopUp),
            "transfer" | "send" => Ok(Command::Transfer),
            "upgrade" | "status" => Ok(Command::Upgrade),
            "click" => Ok(Command::Click),
            "cancel" => Ok(Command::Cancel),
            "admin" => Ok(Command::Admin),
            "addgood" => Ok(Command::AddGood),
            "addpackage" => Ok(Command::AddPackage),
            "editprice" => Ok(Command::EditPrice),
            "setrate" | "set" => Ok(Command::SetRate),
            "rates" => Ok(Command::Rates),
            "delgood" => Ok(Command::DelGood),
            "delpackage" => Ok(Command::DelPackage),
            "pending" => Ok(Command::Pending),
            _ => Ok(Command::Unknown),
        }
    }
}

/// First argument as a positive id.
pub fn id_arg(args: &[&str]) -> Option<i64> {
    args.first()
        .and_then(|a| a.trim_start_matches('#').parse::<i64>().ok())
        .filter(|v| *v > 0)
}
