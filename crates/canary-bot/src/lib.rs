//! # Canary Bot
//!
//! Discord bot for university community servers: custom reactions, role
//! self-service, banner contests, quotes, reminders and member scores.
//!
//! This is the main binary crate that wires configuration, the database and
//! the Poise framework together and runs the gateway client.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod bot;
pub mod error;

pub use bot::*;
pub use error::*;
