//! # Canary DB
//!
//! SQLite persistence for Canary. Every table lives in a single database file
//! opened through [`Database`]; each module adds the queries for one part of
//! the bot as methods on it.
//!
//! ```rust,ignore
//! use canary_db::Database;
//!
//! let db = Database::open("data/canary.db").await?;
//! let id = db.add_quote(user, "bird", "tweet").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod banner;
pub mod connection;
pub mod custom_reactions;
pub mod error;
pub mod models;
pub mod quotes;
pub mod reminders;
pub mod roles;
pub mod schema;
pub mod score;
pub mod settings;

pub use connection::Database;
pub use error::{DbError, DbResult};
pub use models::*;
