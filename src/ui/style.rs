//! Central UI style constants and helpers.
pub const COLOR_SHOP: u32 = 0x3498DB; // Blue

// Standard target widths for padded button labels (approx char counts before Discord trimming)
pub const BTN_W_STD: usize = 16;
pub const BTN_W_PRIMARY: usize = 22;
// Discord rejects button labels longer than this.
pub const BTN_LABEL_MAX: usize = 80;

/// Pads a label to a target visible width using spaces so multi-row action bars align better.
/// Discord strips excessive trailing spaces, so the pad is clamped to 2.
pub fn pad_label(label: &str, target_min: usize) -> String {
    let len = label.chars().count();
    if len >= BTN_LABEL_MAX {
        return label.chars().take(BTN_LABEL_MAX).collect();
    }
    if len >= target_min {
        return label.to_string();
    }
    format!("{label}{pad}", pad = " ".repeat((target_min - len).min(2)))
}

pub fn pad_primary(label: &str) -> String {
    pad_label(label, BTN_W_PRIMARY)
}
pub fn pad_std(label: &str) -> String {
    pad_label(label, BTN_W_STD)
}
