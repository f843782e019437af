//! `Notice` to Serenity message builders.

use crate::constants::{MAX_CONTROL_ROWS, MAX_CONTROLS_PER_ROW};
use crate::services::notify::{Attachment, Control, Notice};
use crate::ui::buttons::Btn;
use crate::ui::style::COLOR_SHOP;
use serenity::builder::{CreateActionRow, CreateEmbed, CreateMessage};

/// Controls laid out five per row; anything past the row limit is dropped.
pub fn action_rows(controls: &[Control]) -> Vec<CreateActionRow> {
    controls
        .chunks(MAX_CONTROLS_PER_ROW)
        .take(MAX_CONTROL_ROWS)
        .map(|row| CreateActionRow::Buttons(row.iter().map(Btn::from_control).collect()))
        .collect()
}

pub fn message(notice: &Notice) -> CreateMessage {
    let mut content = notice.text.clone();
    let mut builder = CreateMessage::new();
    match &notice.attachment {
        Some(Attachment::Photo(url)) => {
            builder = builder.embed(CreateEmbed::new().image(url).color(COLOR_SHOP));
        }
        // Videos and files are links; Discord unfurls them inline.
        Some(Attachment::Video(url)) | Some(Attachment::File(url)) => {
            content.push_str(&format!("\n{url}"));
        }
        None => {}
    }
    builder = builder.content(content);
    if !notice.controls.is_empty() {
        builder = builder.components(action_rows(&notice.controls));
    }
    builder
}
