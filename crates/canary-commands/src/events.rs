//! Gateway event routing.

use poise::serenity_prelude as serenity;
use tracing::info;

use crate::framework::{Data, Error};
use crate::{custom_reactions, roles, score};

/// Central event handler for Discord events
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!(
                "Connected as {} to {} guild(s)",
                data_about_bot.user.name,
                data_about_bot.guilds.len()
            );
        }
        serenity::FullEvent::Message { new_message } => {
            custom_reactions::dispatch(ctx, data, new_message).await?;
        }
        serenity::FullEvent::ReactionAdd { add_reaction } => {
            score::on_reaction_add(ctx, data, add_reaction).await?;
        }
        serenity::FullEvent::ReactionRemove { removed_reaction } => {
            score::on_reaction_remove(ctx, data, removed_reaction).await?;
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            roles::on_member_join(ctx, data, new_member).await?;
        }
        serenity::FullEvent::GuildMemberRemoval {
            guild_id,
            user,
            member_data_if_available,
        } => {
            roles::on_member_leave(ctx, data, *guild_id, user, member_data_if_available.as_ref())
                .await?;
        }
        _ => {}
    }
    Ok(())
}
