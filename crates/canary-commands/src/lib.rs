//! # Canary Commands
//!
//! Discord command implementations using Poise framework for the Canary bot.
//!
//! Besides the commands themselves this crate holds the interactive menu
//! protocol ([`wizard`] and [`pages`]), the permission checks and the
//! gateway event routing that feeds custom reactions, scores and role
//! restoration.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod banner;
pub mod checks;
pub mod custom_reactions;
pub mod discord;
pub mod events;
pub mod framework;
pub mod games;
pub mod pages;
pub mod quotes;
pub mod reminders;
pub mod roles;
pub mod score;
pub mod wizard;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use checks::{Actor, Permission, Permissions};
pub use framework::*;
pub use pages::{PageControl, PageEvent, Pages, PagesOutcome};
pub use reminders::run_reminder_loop;
pub use wizard::{Conversation, Input, Screen, SessionRegistry, Wizard, WizardOutcome};
