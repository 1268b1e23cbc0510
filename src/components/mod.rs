//! Components of the bot.

pub mod commands;
pub mod panels;
pub mod tickets;
pub mod transcript;
pub mod utils;

pub use commands::Commands;
pub use panels::Panels;
pub use tickets::Tickets;
pub use transcript::Transcript;
