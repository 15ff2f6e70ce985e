//! Self-assignable roles, muting and role restoration for returning members.

use async_trait::async_trait;
use canary_common::{RoleId, UserId};
use canary_config::RoleCategory;
use canary_db::Database;
use futures::StreamExt;
use poise::serenity_prelude as serenity;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use tracing::{debug, info, warn};

use crate::checks::moderator_check;
use crate::discord::paginate;
use crate::framework::{user_error, Context, Data, Error};

type RoleMap = HashMap<serenity::RoleId, serenity::Role>;

/// Roles of `category` the member holds, other than `target`.
pub fn exclusive_conflicts<'a, T: Copy + PartialEq>(
    category: &RoleCategory,
    held: impl IntoIterator<Item = (T, &'a str)>,
    target: T,
) -> Vec<T> {
    held.into_iter()
        .filter(|(id, name)| {
            *id != target && category.roles.iter().any(|r| r.eq_ignore_ascii_case(name))
        })
        .map(|(id, _)| id)
        .collect()
}

/// Roles that can be taken away and handed back later: everything except
/// @everyone, the muted role and roles managed by integrations.
pub fn removable_roles<T: Copy + Eq + Hash>(
    held: &[T],
    everyone: T,
    muted: Option<T>,
    managed: &HashSet<T>,
) -> Vec<T> {
    held.iter()
        .copied()
        .filter(|id| *id != everyone && Some(*id) != muted && !managed.contains(id))
        .collect()
}

/// Saved roles that can still be given back.
pub fn restorable<T: Copy + Eq + Hash>(saved: &[T], assignable: &HashSet<T>) -> Vec<T> {
    saved
        .iter()
        .copied()
        .filter(|id| assignable.contains(id))
        .collect()
}

fn find_role<'a>(roles: &'a RoleMap, name: &str) -> Option<&'a serenity::Role> {
    roles.values().find(|r| r.name.eq_ignore_ascii_case(name))
}

fn managed(roles: &RoleMap) -> HashSet<serenity::RoleId> {
    roles.values().filter(|r| r.managed).map(|r| r.id).collect()
}

fn to_stored(ids: &[serenity::RoleId]) -> Vec<RoleId> {
    ids.iter().map(|id| RoleId(id.get())).collect()
}

fn to_gateway(ids: &[RoleId]) -> Vec<serenity::RoleId> {
    ids.iter()
        .filter(|id| id.0 != 0)
        .map(|id| serenity::RoleId::new(id.0))
        .collect()
}

fn assignable(
    roles: &RoleMap,
    muted: Option<serenity::RoleId>,
    everyone: serenity::RoleId,
) -> HashSet<serenity::RoleId> {
    roles
        .values()
        .filter(|r| !r.managed && r.id != everyone && Some(r.id) != muted)
        .map(|r| r.id)
        .collect()
}

/// Role edits on one member.
#[async_trait]
pub trait MemberRoles: Send + Sync {
    /// Adds `roles`.
    async fn add_roles(&self, roles: &[serenity::RoleId]) -> Result<(), Error>;

    /// Removes `roles`.
    async fn remove_roles(&self, roles: &[serenity::RoleId]) -> Result<(), Error>;
}

/// [`MemberRoles`] through the Discord API.
pub struct GatewayMember<'a> {
    http: &'a serenity::Http,
    member: &'a serenity::Member,
}

impl<'a> GatewayMember<'a> {
    /// Wraps `member`.
    pub const fn new(http: &'a serenity::Http, member: &'a serenity::Member) -> Self {
        Self { http, member }
    }
}

#[async_trait]
impl MemberRoles for GatewayMember<'_> {
    async fn add_roles(&self, roles: &[serenity::RoleId]) -> Result<(), Error> {
        self.member.add_roles(self.http, roles).await?;
        Ok(())
    }

    async fn remove_roles(&self, roles: &[serenity::RoleId]) -> Result<(), Error> {
        self.member.remove_roles(self.http, roles).await?;
        Ok(())
    }
}

/// Saves the mute snapshot, then swaps `removable` for the muted role.
///
/// If Discord refuses an edit the snapshot is deleted and the removed roles
/// are handed back, so a failed mute leaves no row behind.
pub async fn apply_mute(
    db: &Database,
    member: &dyn MemberRoles,
    user: UserId,
    removable: &[serenity::RoleId],
    muted: serenity::RoleId,
) -> Result<(), Error> {
    db.save_mute(user, &to_stored(removable)).await?;

    let mut removed = false;
    let edits = async {
        if !removable.is_empty() {
            member.remove_roles(removable).await?;
            removed = true;
        }
        member.add_roles(&[muted]).await
    }
    .await;

    if let Err(e) = edits {
        warn!(user = %user, "Mute failed, rolling back: {e}");
        if let Err(cleanup) = db.delete_mute(user).await {
            warn!(user = %user, "Could not delete mute snapshot: {cleanup}");
        }
        if removed {
            if let Err(undo) = member.add_roles(removable).await {
                warn!(user = %user, "Could not give roles back: {undo}");
            }
        }
        return Err(e);
    }
    Ok(())
}

/// Give yourself a self-assignable role
#[poise::command(prefix_command, slash_command, guild_only, category = "Roles")]
pub async fn iam(
    ctx: Context<'_>,
    #[description = "Role to add"]
    #[rest]
    role: String,
) -> Result<(), Error> {
    let config = &ctx.data().config;
    let Some((_, category)) = config.category_of(role.trim()) else {
        return Err(user_error(format!("`{}` is not a self-assignable role.", role.trim())));
    };
    let guild_id = ctx.guild_id().ok_or_else(|| user_error("This only works in a server."))?;
    let roles = guild_id.roles(ctx.http()).await?;
    let target = find_role(&roles, role.trim())
        .ok_or_else(|| user_error("That role does not exist on this server."))?;
    let member = ctx
        .author_member()
        .await
        .ok_or_else(|| user_error("Could not look up your membership."))?;

    if member.roles.contains(&target.id) {
        ctx.say(format!("You already have **{}**.", target.name)).await?;
        return Ok(());
    }

    if category.exclusive {
        let held = member
            .roles
            .iter()
            .filter_map(|id| roles.get(id))
            .map(|r| (r.id, r.name.as_str()));
        let conflicts = exclusive_conflicts(category, held, target.id);
        if !conflicts.is_empty() {
            member.remove_roles(ctx.http(), &conflicts).await?;
        }
    }
    member.add_role(ctx.http(), target.id).await?;
    info!(user = %ctx.author().id, role = %target.name, "Self-assigned role");
    ctx.say(format!("You now have **{}**.", target.name)).await?;
    Ok(())
}

/// Remove a self-assignable role from yourself
#[poise::command(prefix_command, slash_command, guild_only, category = "Roles")]
pub async fn iamn(
    ctx: Context<'_>,
    #[description = "Role to remove"]
    #[rest]
    role: String,
) -> Result<(), Error> {
    if ctx.data().config.category_of(role.trim()).is_none() {
        return Err(user_error(format!("`{}` is not a self-assignable role.", role.trim())));
    }
    let guild_id = ctx.guild_id().ok_or_else(|| user_error("This only works in a server."))?;
    let roles = guild_id.roles(ctx.http()).await?;
    let target = find_role(&roles, role.trim())
        .ok_or_else(|| user_error("That role does not exist on this server."))?;
    let member = ctx
        .author_member()
        .await
        .ok_or_else(|| user_error("Could not look up your membership."))?;

    if !member.roles.contains(&target.id) {
        ctx.say(format!("You don't have **{}**.", target.name)).await?;
        return Ok(());
    }
    member.remove_role(ctx.http(), target.id).await?;
    info!(user = %ctx.author().id, role = %target.name, "Self-removed role");
    ctx.say(format!("You no longer have **{}**.", target.name)).await?;
    Ok(())
}

/// Lines listing the self-assignable roles, optionally of one category.
pub fn role_lines(
    categories: &std::collections::BTreeMap<String, RoleCategory>,
    only: Option<&str>,
) -> Option<Vec<String>> {
    let selected: Vec<(&String, &RoleCategory)> = categories
        .iter()
        .filter(|(name, _)| only.map_or(true, |o| name.eq_ignore_ascii_case(o)))
        .collect();
    if selected.is_empty() && only.is_some() {
        return None;
    }
    Some(
        selected
            .into_iter()
            .flat_map(|(name, category)| {
                let suffix = if category.exclusive { ", pick one" } else { "" };
                category
                    .roles
                    .iter()
                    .map(move |role| format!("**{role}** ({name}{suffix})"))
            })
            .collect(),
    )
}

/// List the self-assignable roles
#[poise::command(prefix_command, slash_command, guild_only, category = "Roles")]
pub async fn roles(
    ctx: Context<'_>,
    #[description = "Only show this category"]
    #[rest]
    category: Option<String>,
) -> Result<(), Error> {
    let only = category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let lines = role_lines(&ctx.data().config.roles.categories, only)
        .ok_or_else(|| user_error("There is no such role category."))?;
    paginate(ctx, "Self-assignable roles", lines).await
}

/// List the members holding a role
#[poise::command(prefix_command, slash_command, guild_only, category = "Roles")]
pub async fn inrole(
    ctx: Context<'_>,
    #[description = "Role name"]
    #[rest]
    role: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or_else(|| user_error("This only works in a server."))?;
    let roles = guild_id.roles(ctx.http()).await?;
    let target = find_role(&roles, role.trim())
        .ok_or_else(|| user_error("That role does not exist on this server."))?;

    let mut names = Vec::new();
    let mut members = guild_id.members_iter(ctx.http()).boxed();
    while let Some(member) = members.next().await {
        let member = member?;
        if member.roles.contains(&target.id) {
            names.push(member.display_name().to_string());
        }
    }
    names.sort_by_key(|n| n.to_lowercase());
    debug!(role = %target.name, count = names.len(), "Listed role members");
    paginate(ctx, format!("Members with {}", target.name), names).await
}

/// Mute a member, saving their roles for later
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    check = "moderator_check",
    category = "Moderation"
)]
pub async fn mute(
    ctx: Context<'_>,
    #[description = "Member to mute"] member: serenity::Member,
) -> Result<(), Error> {
    let data = ctx.data();
    let guild_id = member.guild_id;
    let roles = guild_id.roles(ctx.http()).await?;
    let muted = find_role(&roles, &data.config.roles.muted_role)
        .ok_or_else(|| user_error("The muted role does not exist on this server."))?;
    let user = UserId(member.user.id.get());

    if data.db.mute_snapshot(user).await?.is_some() {
        return Err(user_error(format!("{} is already muted.", member.display_name())));
    }

    let everyone = serenity::RoleId::new(guild_id.get());
    let removable = removable_roles(&member.roles, everyone, Some(muted.id), &managed(&roles));
    let gateway = GatewayMember::new(ctx.http(), &member);
    apply_mute(&data.db, &gateway, user, &removable, muted.id).await?;
    info!(user = %user, roles = removable.len(), by = %ctx.author().id, "Member muted");
    ctx.say(format!("Muted {}.", member.display_name())).await?;
    Ok(())
}

/// Unmute a member and give their roles back
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    check = "moderator_check",
    category = "Moderation"
)]
pub async fn unmute(
    ctx: Context<'_>,
    #[description = "Member to unmute"] member: serenity::Member,
) -> Result<(), Error> {
    let data = ctx.data();
    let user = UserId(member.user.id.get());
    let Some(snapshot) = data.db.mute_snapshot(user).await? else {
        return Err(user_error(format!("{} is not muted.", member.display_name())));
    };

    let guild_id = member.guild_id;
    let roles = guild_id.roles(ctx.http()).await?;
    let muted = find_role(&roles, &data.config.roles.muted_role).map(|r| r.id);
    let everyone = serenity::RoleId::new(guild_id.get());
    let restore = restorable(
        &to_gateway(&snapshot.role_ids),
        &assignable(&roles, muted, everyone),
    );

    if !restore.is_empty() {
        member.add_roles(ctx.http(), &restore).await?;
    }
    if let Some(muted) = muted {
        if member.roles.contains(&muted) {
            member.remove_role(ctx.http(), muted).await?;
        }
    }
    data.db.delete_mute(user).await?;
    info!(user = %user, roles = restore.len(), by = %ctx.author().id, "Member unmuted");
    ctx.say(format!("Unmuted {}.", member.display_name())).await?;
    Ok(())
}

/// Saves the roles of a member who left, unless they are muted.
pub async fn on_member_leave(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: serenity::GuildId,
    user: &serenity::User,
    member: Option<&serenity::Member>,
) -> Result<(), Error> {
    let user_id = UserId(user.id.get());
    if data.db.mute_snapshot(user_id).await?.is_some() {
        debug!(user = %user_id, "Muted member left; keeping mute snapshot");
        return Ok(());
    }
    let Some(member) = member else {
        debug!(user = %user_id, "Member left without cached roles");
        return Ok(());
    };

    let roles = guild_id.roles(&ctx.http).await?;
    let muted = find_role(&roles, &data.config.roles.muted_role).map(|r| r.id);
    let everyone = serenity::RoleId::new(guild_id.get());
    let removable = removable_roles(&member.roles, everyone, muted, &managed(&roles));
    if removable.is_empty() {
        return Ok(());
    }
    data.db.save_previous_roles(user_id, &to_stored(&removable)).await?;
    info!(user = %user_id, roles = removable.len(), "Saved roles of departing member");
    Ok(())
}

/// Re-applies the mute or the saved roles of a returning member.
pub async fn on_member_join(
    ctx: &serenity::Context,
    data: &Data,
    member: &serenity::Member,
) -> Result<(), Error> {
    let user_id = UserId(member.user.id.get());
    let roles = member.guild_id.roles(&ctx.http).await?;
    let muted = find_role(&roles, &data.config.roles.muted_role).map(|r| r.id);

    if data.db.mute_snapshot(user_id).await?.is_some() {
        match muted {
            Some(muted) => {
                member.add_role(ctx, muted).await?;
                info!(user = %user_id, "Re-muted returning member");
            }
            None => warn!(user = %user_id, "Returning member is muted but the muted role is gone"),
        }
        return Ok(());
    }

    let Some(snapshot) = data.db.previous_roles(user_id).await? else {
        return Ok(());
    };
    let everyone = serenity::RoleId::new(member.guild_id.get());
    let restore = restorable(
        &to_gateway(&snapshot.role_ids),
        &assignable(&roles, muted, everyone),
    );
    if !restore.is_empty() {
        member.add_roles(ctx, &restore).await?;
    }
    data.db.delete_previous_roles(user_id).await?;
    info!(user = %user_id, roles = restore.len(), "Restored roles of returning member");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use canary_config::Config;
    use std::sync::Mutex;

    /// Records role edits and refuses any edit touching `refuse`.
    #[derive(Default)]
    struct RecordingMember {
        refuse: Option<serenity::RoleId>,
        edits: Mutex<Vec<(&'static str, Vec<u64>)>>,
    }

    impl RecordingMember {
        fn record(&self, kind: &'static str, roles: &[serenity::RoleId]) -> Result<(), Error> {
            self.edits
                .lock()
                .unwrap()
                .push((kind, roles.iter().map(|r| r.get()).collect()));
            match self.refuse {
                Some(refused) if roles.contains(&refused) => Err("Missing Permissions".into()),
                _ => Ok(()),
            }
        }

        fn edits(&self) -> Vec<(&'static str, Vec<u64>)> {
            self.edits.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MemberRoles for RecordingMember {
        async fn add_roles(&self, roles: &[serenity::RoleId]) -> Result<(), Error> {
            self.record("add", roles)
        }

        async fn remove_roles(&self, roles: &[serenity::RoleId]) -> Result<(), Error> {
            self.record("remove", roles)
        }
    }

    fn ids(raw: &[u64]) -> Vec<serenity::RoleId> {
        raw.iter().map(|&id| serenity::RoleId::new(id)).collect()
    }

    #[tokio::test]
    async fn test_apply_mute_saves_snapshot() {
        let db = Database::in_memory().await.unwrap();
        let member = RecordingMember::default();
        let muted = serenity::RoleId::new(99);

        apply_mute(&db, &member, UserId(5), &ids(&[10, 20]), muted)
            .await
            .unwrap();

        let snapshot = db.mute_snapshot(UserId(5)).await.unwrap().unwrap();
        assert_eq!(snapshot.role_ids, vec![RoleId(10), RoleId(20)]);
        assert_eq!(
            member.edits(),
            vec![("remove", vec![10, 20]), ("add", vec![99])]
        );
    }

    #[tokio::test]
    async fn test_refused_mute_leaves_no_snapshot() {
        let db = Database::in_memory().await.unwrap();
        let muted = serenity::RoleId::new(99);
        let member = RecordingMember {
            refuse: Some(muted),
            ..RecordingMember::default()
        };

        assert!(apply_mute(&db, &member, UserId(5), &ids(&[10, 20]), muted)
            .await
            .is_err());

        assert!(db.mute_snapshot(UserId(5)).await.unwrap().is_none());
        assert_eq!(
            member.edits(),
            vec![
                ("remove", vec![10, 20]),
                ("add", vec![99]),
                ("add", vec![10, 20]),
            ]
        );

        // a later attempt is not refused as "already muted"
        let fixed = RecordingMember::default();
        apply_mute(&db, &fixed, UserId(5), &ids(&[10, 20]), muted)
            .await
            .unwrap();
        assert!(db.mute_snapshot(UserId(5)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_refused_removal_keeps_roles() {
        let db = Database::in_memory().await.unwrap();
        let member = RecordingMember {
            refuse: Some(serenity::RoleId::new(10)),
            ..RecordingMember::default()
        };

        let muted = serenity::RoleId::new(99);
        assert!(apply_mute(&db, &member, UserId(6), &ids(&[10]), muted)
            .await
            .is_err());
        assert!(db.mute_snapshot(UserId(6)).await.unwrap().is_none());
        assert_eq!(member.edits(), vec![("remove", vec![10])]);
    }

    fn category(exclusive: bool) -> RoleCategory {
        RoleCategory {
            roles: vec!["Red".to_string(), "Blue".to_string(), "Green".to_string()],
            exclusive,
        }
    }

    #[test]
    fn test_exclusive_conflicts_only_same_category() {
        let held = [(1_u64, "red"), (2, "Blue"), (3, "Helper"), (4, "Green")];
        assert_eq!(exclusive_conflicts(&category(true), held, 4), vec![1, 2]);
        assert!(exclusive_conflicts(&category(true), [(4_u64, "Green")], 4).is_empty());
    }

    #[test]
    fn test_removable_roles_skip_protected() {
        let managed: HashSet<u64> = [30].into_iter().collect();
        let held = [10, 20, 30, 99, 40];
        assert_eq!(removable_roles(&held, 10, Some(99), &managed), vec![20, 40]);
        assert_eq!(removable_roles(&held, 10, None, &managed), vec![20, 99, 40]);
    }

    #[test]
    fn test_restorable_skips_deleted_roles() {
        let existing: HashSet<u64> = [1, 3].into_iter().collect();
        assert_eq!(restorable(&[1, 2, 3], &existing), vec![1, 3]);
        assert!(restorable::<u64>(&[], &existing).is_empty());
    }

    #[test]
    fn test_stored_ids_convert_back() {
        let ids = [serenity::RoleId::new(5), serenity::RoleId::new(u64::MAX)];
        let stored = to_stored(&ids);
        assert_eq!(stored, vec![RoleId(5), RoleId(u64::MAX)]);
        assert_eq!(to_gateway(&stored), ids.to_vec());
        assert!(to_gateway(&[RoleId(0)]).is_empty());
    }

    #[test]
    fn test_role_lines() {
        let config = Config::default();
        let all = role_lines(&config.roles.categories, None).unwrap();
        let total: usize = config.roles.categories.values().map(|c| c.roles.len()).sum();
        assert_eq!(all.len(), total);

        let (name, _) = config.roles.categories.iter().next().unwrap();
        let one = role_lines(&config.roles.categories, Some(&name.to_uppercase())).unwrap();
        assert!(!one.is_empty());
        assert!(role_lines(&config.roles.categories, Some("no such category")).is_none());
    }
}
