//! Service layer: policies and protocols that sit between the chat routing and the store.

pub mod moderation;
pub mod notify;
pub mod pricing;
pub mod theme;
