//! Member scores from upvote/downvote reactions.

use canary_common::{escape_markdown, MessageId, UserId};
use canary_config::ScoreConfig;
use canary_db::{RankingEntry, ReactionRecord};
use poise::serenity_prelude as serenity;
use tracing::debug;

use crate::discord::paginate;
use crate::framework::{Context, Data, Error};

/// Name a reaction is tracked under: the character of a unicode emoji or
/// the name of a custom one.
pub fn emoji_name(emoji: &serenity::ReactionType) -> Option<String> {
    match emoji {
        serenity::ReactionType::Unicode(s) => Some(s.clone()),
        serenity::ReactionType::Custom { name, .. } => name.clone(),
        _ => None,
    }
}

/// The record a reaction produces, or `None` when it does not count:
/// untracked emoji, reactions to your own message, and messages by bots.
pub fn record_for(
    config: &ScoreConfig,
    emoji: &str,
    reacter: UserId,
    author: UserId,
    author_is_bot: bool,
    message_id: MessageId,
) -> Option<ReactionRecord> {
    let tracked = emoji == config.upvote_emoji || emoji == config.downvote_emoji;
    (tracked && !author_is_bot && reacter != author).then(|| ReactionRecord {
        reacter_id: reacter,
        reactee_id: author,
        reaction_name: emoji.to_string(),
        message_id,
    })
}

async fn resolve(
    ctx: &serenity::Context,
    data: &Data,
    reaction: &serenity::Reaction,
) -> Result<Option<(ReactionRecord, serenity::User)>, Error> {
    let Some(name) = emoji_name(&reaction.emoji) else {
        return Ok(None);
    };
    let score = &data.config.score;
    if name != score.upvote_emoji && name != score.downvote_emoji {
        return Ok(None);
    }
    let Some(reacter) = reaction.user_id else {
        return Ok(None);
    };

    let message = reaction.message(ctx).await?;
    let record = record_for(
        score,
        &name,
        UserId(reacter.get()),
        UserId(message.author.id.get()),
        message.author.bot,
        MessageId(message.id.get()),
    );
    Ok(record.map(|r| (r, message.author)))
}

/// Records a vote.
pub async fn on_reaction_add(
    ctx: &serenity::Context,
    data: &Data,
    reaction: &serenity::Reaction,
) -> Result<(), Error> {
    let Some((record, author)) = resolve(ctx, data, reaction).await? else {
        return Ok(());
    };
    let name = author.global_name.clone().unwrap_or_else(|| author.name.clone());
    data.db.upsert_member(record.reactee_id, &name).await?;
    if data.db.add_reaction(&record).await? {
        debug!(reactee = %record.reactee_id, emoji = %record.reaction_name, "Vote recorded");
    }
    Ok(())
}

/// Withdraws a vote.
pub async fn on_reaction_remove(
    ctx: &serenity::Context,
    data: &Data,
    reaction: &serenity::Reaction,
) -> Result<(), Error> {
    let Some((record, _)) = resolve(ctx, data, reaction).await? else {
        return Ok(());
    };
    if data.db.remove_reaction(&record).await? {
        debug!(reactee = %record.reactee_id, emoji = %record.reaction_name, "Vote withdrawn");
    }
    Ok(())
}

/// Show the votes a member received
#[poise::command(prefix_command, slash_command, guild_only, category = "Score")]
pub async fn score(
    ctx: Context<'_>,
    #[description = "Member to look up; yourself by default"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let data = ctx.data();
    let user = user.as_ref().unwrap_or_else(|| ctx.author());
    let config = &data.config.score;
    let score = data
        .db
        .score(UserId(user.id.get()), &config.upvote_emoji, &config.downvote_emoji)
        .await?;
    ctx.say(format!(
        "**{}** has {} {} and {} {}, for a score of {}.",
        escape_markdown(user.global_name.as_deref().unwrap_or(&user.name)),
        score.upvotes,
        config.upvote_emoji,
        score.downvotes,
        config.downvote_emoji,
        score.net()
    ))
    .await?;
    Ok(())
}

/// One line of the ranking.
pub fn ranking_line(entry: &RankingEntry) -> String {
    format!(
        "**{}** {} ({}↑ {}↓)",
        escape_markdown(&entry.name),
        entry.score.net(),
        entry.score.upvotes,
        entry.score.downvotes
    )
}

/// Show the members with the best scores
#[poise::command(prefix_command, slash_command, guild_only, category = "Score")]
pub async fn ranking(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let config = &data.config.score;
    let lines = data
        .db
        .ranking(&config.upvote_emoji, &config.downvote_emoji)
        .await?
        .iter()
        .map(ranking_line)
        .collect();
    paginate(ctx, "Ranking", lines).await
}
