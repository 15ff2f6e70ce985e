//! Permission system for Discord bot commands

use canary_common::UserId as StoredUserId;
use canary_config::Config;
use poise::serenity_prelude::UserId;
use std::collections::HashSet;
use tracing::debug;

use crate::framework::{Context, Error};

/// Permission levels for bot commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Permission {
    /// Any member can execute this command
    User = 0,
    /// Members holding the moderator role and above
    Moderator = 1,
    /// Only bot owners can execute this command
    Owner = 2,
}

impl Permission {
    /// Get the permission level name as a string
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Moderator => "Moderator",
            Self::Owner => "Owner",
        }
    }
}

/// Owner and moderator lookups built from the configuration.
#[derive(Debug, Clone)]
pub struct Permissions {
    owners: HashSet<UserId>,
    moderator_role: String,
}

impl Permissions {
    /// Create a new permissions manager from configuration
    pub fn new(config: &Config) -> Self {
        Self {
            owners: config
                .discord
                .owner_ids
                .iter()
                .map(|&id| UserId::new(id))
                .collect(),
            moderator_role: config.roles.moderator_role.clone(),
        }
    }

    /// Check if a user is a bot owner
    pub fn is_owner(&self, user_id: UserId) -> bool {
        self.owners.contains(&user_id)
    }

    /// Highest permission level granted to a user holding `role_names`.
    pub fn level<'a>(
        &self,
        user_id: UserId,
        role_names: impl IntoIterator<Item = &'a str>,
    ) -> Permission {
        if self.is_owner(user_id) {
            return Permission::Owner;
        }
        if role_names
            .into_iter()
            .any(|name| name.eq_ignore_ascii_case(&self.moderator_role))
        {
            return Permission::Moderator;
        }
        Permission::User
    }
}

/// Who is driving a menu, and whether they can act on other members' records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// Invoking user
    pub user_id: StoredUserId,
    /// Whether they hold the moderator role or own the bot
    pub moderator: bool,
}

impl Actor {
    /// A new actor.
    pub const fn new(user_id: StoredUserId, moderator: bool) -> Self {
        Self { user_id, moderator }
    }

    /// Whether the actor may change a record belonging to `owner`.
    pub fn can_edit(self, owner: StoredUserId) -> bool {
        self.moderator || self.user_id == owner
    }
}

/// The invoking user as an [`Actor`].
pub async fn actor(ctx: Context<'_>) -> Result<Actor, Error> {
    Ok(Actor::new(
        StoredUserId(ctx.author().id.get()),
        is_moderator(ctx).await?,
    ))
}

/// Permission level of the invoking user.
pub async fn permission_level(ctx: Context<'_>) -> Result<Permission, Error> {
    let permissions = &ctx.data().permissions;
    let user_id = ctx.author().id;
    if permissions.is_owner(user_id) {
        return Ok(Permission::Owner);
    }

    let (Some(guild_id), Some(member)) = (ctx.guild_id(), ctx.author_member().await) else {
        return Ok(Permission::User);
    };
    let roles = guild_id.roles(ctx.http()).await?;
    let names = member
        .roles
        .iter()
        .filter_map(|id| roles.get(id))
        .map(|role| role.name.as_str());

    let level = permissions.level(user_id, names);
    debug!("User {} has permission level {}", user_id, level.as_str());
    Ok(level)
}

/// Whether the invoking user is a moderator or owner.
pub async fn is_moderator(ctx: Context<'_>) -> Result<bool, Error> {
    Ok(permission_level(ctx).await? >= Permission::Moderator)
}

/// Poise check restricting a command to moderators.
pub async fn moderator_check(ctx: Context<'_>) -> Result<bool, Error> {
    is_moderator(ctx).await
}

/// Poise check restricting a command to bot owners.
pub async fn owner_check(ctx: Context<'_>) -> Result<bool, Error> {
    Ok(ctx.data().permissions.is_owner(ctx.author().id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permissions() -> Permissions {
        let mut config = Config::default();
        config.discord.owner_ids = vec![42];
        config.roles.moderator_role = "Discord Moderator".to_string();
        Permissions::new(&config)
    }

    #[test]
    fn test_owner_outranks_everything() {
        let p = permissions();
        assert_eq!(p.level(UserId::new(42), []), Permission::Owner);
        assert!(p.is_owner(UserId::new(42)));
        assert!(!p.is_owner(UserId::new(43)));
    }

    #[test]
    fn test_moderator_role_by_name() {
        let p = permissions();
        assert_eq!(
            p.level(UserId::new(7), ["U2", "discord moderator"]),
            Permission::Moderator
        );
        assert_eq!(p.level(UserId::new(7), ["U2", "Moderator"]), Permission::User);
    }

    #[test]
    fn test_actor_can_edit() {
        let moderator = Actor::new(StoredUserId(1), true);
        let member = Actor::new(StoredUserId(2), false);
        assert!(moderator.can_edit(StoredUserId(50)));
        assert!(member.can_edit(StoredUserId(2)));
        assert!(!member.can_edit(StoredUserId(50)));
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(Permission::Owner > Permission::Moderator);
        assert!(Permission::Moderator > Permission::User);
        assert_eq!(Permission::Moderator.as_str(), "Moderator");
    }
}
