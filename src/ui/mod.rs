//! Discord rendering of transport-neutral notices.

pub mod buttons;
pub mod render;
pub mod style;
