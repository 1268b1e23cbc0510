//! # Core library of the ticket bot
//!
//! ## Components system
//!
//! The bot is split into components. Each component manages its own state and
//! reacts to the gateway events forwarded by the [`ComponentEventDispatcher`].
//!
//! Every component implements the [`Component`] trait. Components are registered
//! once, at process wiring time, into a [`ComponentContainer`] which starts them,
//! stops them and builds the dispatcher given to the serenity client.
//!
//! ## Bot events
//!
//! Serenity gateway events are large and hard to build outside of a live
//! connection. The dispatcher translates the few events the bot cares about into
//! [`BotEvent`], a small plain-data enum components can be tested against.
//!
//! [`ComponentEventDispatcher`]: event::ComponentEventDispatcher

pub mod container;
pub mod event;
pub mod message;

pub use container::ComponentContainer;
pub use event::{Author, BotEvent, Component, IncomingMessage, IncomingReaction};
