//! Newtype wrappers for Discord snowflakes used outside the gateway layer.
//!
//! The persistence layer does not depend on serenity, so ids cross the
//! crate boundary as these plain wrappers.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Bit-casts the id for storage in a signed SQLite integer column.
            #[must_use]
            #[allow(clippy::cast_possible_wrap)]
            pub const fn as_i64(self) -> i64 {
                self.0 as i64
            }

            /// Restores an id read back from a signed SQLite integer column.
            #[must_use]
            #[allow(clippy::cast_sign_loss)]
            pub const fn from_i64(value: i64) -> Self {
                Self(value as u64)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

snowflake!(
    /// A Discord user ID.
    UserId
);
snowflake!(
    /// A Discord channel ID.
    ChannelId
);
snowflake!(
    /// A Discord role ID.
    RoleId
);
snowflake!(
    /// A Discord message ID.
    MessageId
);
snowflake!(
    /// A Discord guild ID.
    GuildId
);

impl UserId {
    /// Renders the id as a user mention.
    #[must_use]
    pub fn mention(self) -> String {
        format!("<@{}>", self.0)
    }
}

impl ChannelId {
    /// Renders the id as a channel mention.
    #[must_use]
    pub fn mention(self) -> String {
        format!("<#{}>", self.0)
    }
}
