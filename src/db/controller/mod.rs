//! Queries of the bot, grouped by entity.

pub mod canned;
pub mod category;
pub mod discord;
pub mod panel;
pub mod ticket;
