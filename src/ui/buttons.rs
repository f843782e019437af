//! Central button construction helpers ensuring consistent padding and style.
use crate::services::notify::{Control, ControlStyle};
use crate::ui::style::{pad_primary, pad_std};
use serenity::builder::CreateButton;
use serenity::model::application::ButtonStyle;

pub struct Btn;
impl Btn {
    pub fn primary(id: &str, label: &str) -> CreateButton {
        CreateButton::new(id)
            .label(pad_primary(label))
            .style(ButtonStyle::Primary)
    }
    pub fn success(id: &str, label: &str) -> CreateButton {
        CreateButton::new(id)
            .label(pad_primary(label))
            .style(ButtonStyle::Success)
    }
    pub fn secondary(id: &str, label: &str) -> CreateButton {
        CreateButton::new(id)
            .label(pad_std(label))
            .style(ButtonStyle::Secondary)
    }
    pub fn danger(id: &str, label: &str) -> CreateButton {
        CreateButton::new(id)
            .label(pad_std(label))
            .style(ButtonStyle::Danger)
    }

    pub fn from_control(control: &Control) -> CreateButton {
        match control.style {
            ControlStyle::Primary => Self::primary(&control.token, &control.label),
            ControlStyle::Success => Self::success(&control.token, &control.label),
            ControlStyle::Secondary => Self::secondary(&control.token, &control.label),
            ControlStyle::Danger => Self::danger(&control.token, &control.label),
        }
    }
}
