//! Banner contest: members submit images, others vote with a reaction.

use canary_common::{format_timestamp, parse_local_datetime, MessageId, UserId};
use canary_db::{BannerSubmission, Database, DbResult};
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::checks::moderator_check;
use crate::discord::DiscordConversation;
use crate::framework::{user_error, Context, Error};
use crate::wizard::{confirm, confirm_with_image, Conversation, Screen, Wizard, WizardOutcome};

/// Settings key holding the [`ContestState`].
pub const CONTEST_KEY: &str = "banner_contest";

const TITLE: &str = "Banner submission";

/// Window of the current or last contest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestState {
    /// Whether the contest has not been ended yet
    pub active: bool,
    /// When it was opened
    pub started_at: DateTime<Utc>,
    /// When submissions close
    pub ends_at: DateTime<Utc>,
}

impl ContestState {
    /// Whether submissions are accepted at `now`.
    pub fn accepting(&self, now: DateTime<Utc>) -> bool {
        self.active && now < self.ends_at
    }
}

/// Reads the contest state.
pub async fn contest_state(db: &Database) -> DbResult<Option<ContestState>> {
    db.get_setting(CONTEST_KEY).await
}

/// Writes the contest state.
pub async fn save_contest_state(db: &Database, state: &ContestState) -> DbResult<()> {
    db.set_setting(CONTEST_KEY, state).await
}

/// Checks that `value` is an http(s) URL and returns it trimmed.
pub fn validate_image_url(value: &str) -> Result<String, String> {
    let value = value.trim();
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {
            Ok(value.to_string())
        }
        _ => Err("That is not an http(s) link to an image.".to_string()),
    }
}

/// Votes on a submission, not counting the bot's own reaction.
pub const fn vote_count(count: u64, me: bool) -> u64 {
    if me {
        count.saturating_sub(1)
    } else {
        count
    }
}

/// Users with the most votes. Ties return every tied user, in input order.
pub fn tally(votes: &[(UserId, u64)]) -> Vec<UserId> {
    let Some(best) = votes.iter().map(|(_, v)| *v).max() else {
        return Vec::new();
    };
    votes
        .iter()
        .filter(|(_, v)| *v == best)
        .map(|(user, _)| *user)
        .collect()
}

/// Banner contest commands
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    subcommands("start", "submit", "end", "status"),
    subcommand_required,
    category = "Banner"
)]
pub async fn banner(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Open a banner contest until the given local time (YYYY-MM-DD HH:MM)
#[poise::command(prefix_command, slash_command, guild_only, check = "moderator_check")]
pub async fn start(
    ctx: Context<'_>,
    #[description = "End of the contest, YYYY-MM-DD HH:MM"]
    #[rest]
    end: String,
) -> Result<(), Error> {
    let data = ctx.data();
    let tz = data.config.timezone();
    let ends_at = parse_local_datetime(end.trim(), tz)
        .ok_or_else(|| user_error("Give the end as YYYY-MM-DD HH:MM."))?;
    let now = Utc::now();
    if ends_at <= now {
        return Err(user_error("The end of the contest must be in the future."));
    }

    let _guard = data.banner_lock.lock().await;
    let cleared = data.db.clear_banner_submissions().await?;
    save_contest_state(
        &data.db,
        &ContestState {
            active: true,
            started_at: now,
            ends_at,
        },
    )
    .await?;
    info!(%ends_at, cleared, "Banner contest opened");
    ctx.say(format!(
        "The banner contest is open until {}. Submit with `{}banner submit`.",
        format_timestamp(ends_at, tz),
        data.config.discord.prefix
    ))
    .await?;
    Ok(())
}

/// Collects and confirms a submission. `None` when the user backs out.
pub async fn submission_flow(
    conv: &mut dyn Conversation,
    db: &Database,
    user: UserId,
    given_url: Option<&str>,
    timeout: Duration,
) -> Result<Option<String>, Error> {
    let url = if let Some(given) = given_url {
        validate_image_url(given).map_err(user_error)?
    } else {
        let outcome = Wizard::new(TITLE)
            .attachment(
                "url",
                "Send a link to your banner or attach the image.",
                |value, _| validate_image_url(value),
            )
            .run(conv, timeout)
            .await?;
        let WizardOutcome::Completed(answers) = outcome else {
            return Ok(None);
        };
        answers.text("url").unwrap_or_default().to_string()
    };

    if db.banner_submission(user).await?.is_some() {
        let replace = confirm(
            conv,
            TITLE,
            "You already submitted a banner. Replace it?",
            timeout,
        )
        .await?;
        if replace != Some(true) {
            if replace.is_some() {
                conv.close(Some(&Screen::new(TITLE, "Kept your earlier submission.")))
                    .await?;
            }
            return Ok(None);
        }
    }

    let submit = confirm_with_image(conv, TITLE, "Submit this banner?", &url, timeout).await?;
    match submit {
        Some(true) => Ok(Some(url)),
        Some(false) => {
            conv.close(Some(&Screen::new(TITLE, "Nothing was submitted.")))
                .await?;
            Ok(None)
        }
        None => Ok(None),
    }
}

/// Submit a banner to the running contest
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn submit(
    ctx: Context<'_>,
    #[description = "Link to the image; attach it instead if you prefer"] url: Option<String>,
) -> Result<(), Error> {
    let data = ctx.data();
    let state = contest_state(&data.db).await?;
    if !state.is_some_and(|s| s.accepting(Utc::now())) {
        return Err(user_error("No banner contest is accepting submissions."));
    }
    let channel = match data.config.banner.submissions_channel_id {
        0 => return Err(user_error("No banner submissions channel is configured.")),
        id => serenity::ChannelId::new(id),
    };

    let user = UserId(ctx.author().id.get());
    let Some(_session) = data.sessions.try_begin(user) else {
        ctx.say("You already have a menu open. Finish or stop it first.")
            .await?;
        return Ok(());
    };

    let mut conv = DiscordConversation::new(ctx);
    let Some(url) = submission_flow(
        &mut conv,
        &data.db,
        user,
        url.as_deref(),
        data.config.wizard_timeout(),
    )
    .await?
    else {
        return Ok(());
    };

    let _guard = data.banner_lock.lock().await;
    let still_open = contest_state(&data.db)
        .await?
        .is_some_and(|s| s.accepting(Utc::now()));
    if !still_open {
        conv.close(Some(&Screen::new(TITLE, "The contest closed before your banner was submitted.")))
            .await?;
        return Ok(());
    }

    let post = channel
        .send_message(
            ctx.serenity_context(),
            serenity::CreateMessage::new()
                .content(format!("Banner submission by {}", user.mention()))
                .embed(serenity::CreateEmbed::new().image(&url)),
        )
        .await?;
    post.react(
        ctx.serenity_context(),
        serenity::ReactionType::Unicode(data.config.banner.vote_emoji.clone()),
    )
    .await?;

    let previous = data.db.banner_submission(user).await?;
    data.db
        .upsert_banner_submission(&BannerSubmission {
            user_id: user,
            image_url: url,
            message_id: MessageId(post.id.get()),
            submitted_at: Utc::now(),
        })
        .await?;
    if let Some(previous) = previous.filter(|p| p.message_id.0 != 0) {
        if let Err(e) = channel
            .delete_message(ctx.http(), serenity::MessageId::new(previous.message_id.0))
            .await
        {
            warn!("Could not delete replaced banner submission: {}", e);
        }
    }

    info!(user = %user, message = %post.id, "Banner submitted");
    conv.close(Some(&Screen::new(TITLE, "Your banner was submitted. Good luck!")))
        .await?;
    Ok(())
}

/// End the banner contest and announce the winner
#[poise::command(prefix_command, slash_command, guild_only, check = "moderator_check")]
pub async fn end(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let _guard = data.banner_lock.lock().await;
    let Some(mut state) = contest_state(&data.db).await?.filter(|s| s.active) else {
        return Err(user_error("No banner contest is running."));
    };
    let channel = match data.config.banner.submissions_channel_id {
        0 => return Err(user_error("No banner submissions channel is configured.")),
        id => serenity::ChannelId::new(id),
    };
    let vote_emoji = &data.config.banner.vote_emoji;

    let mut votes = Vec::new();
    for submission in data.db.banner_submissions().await? {
        let fetched = match submission.message_id.0 {
            0 => continue,
            id => {
                channel
                    .message(ctx.serenity_context(), serenity::MessageId::new(id))
                    .await
            }
        };
        let count = match fetched {
            Ok(message) => message
                .reactions
                .iter()
                .find(|r| matches!(&r.reaction_type, serenity::ReactionType::Unicode(e) if e == vote_emoji))
                .map_or(0, |r| vote_count(r.count, r.me)),
            Err(e) => {
                warn!(user = %submission.user_id, "Could not fetch banner submission: {}", e);
                0
            }
        };
        votes.push((submission.user_id, count));
    }

    state.active = false;
    save_contest_state(&data.db, &state).await?;

    let winners = tally(&votes);
    let announcement = match winners.as_slice() {
        [] => "The banner contest ended without submissions.".to_string(),
        [winner] => format!(
            "The banner contest is over! {} wins with {} vote(s).",
            winner.mention(),
            votes.iter().map(|(_, v)| *v).max().unwrap_or(0)
        ),
        tied => format!(
            "The banner contest is over! It's a tie between {} with {} vote(s) each.",
            tied.iter().map(|u| u.mention()).collect::<Vec<_>>().join(", "),
            votes.iter().map(|(_, v)| *v).max().unwrap_or(0)
        ),
    };
    info!(submissions = votes.len(), winners = winners.len(), "Banner contest ended");
    ctx.say(announcement).await?;
    Ok(())
}

/// Show the state of the banner contest
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let tz = data.config.timezone();
    let submissions = data.db.banner_submissions().await?.len();
    let text = match contest_state(&data.db).await? {
        Some(state) if state.accepting(Utc::now()) => format!(
            "The banner contest runs from {} to {}. {} banner(s) submitted so far.",
            format_timestamp(state.started_at, tz),
            format_timestamp(state.ends_at, tz),
            submissions
        ),
        Some(state) if state.active => format!(
            "Submissions closed at {}. {} banner(s) await the results.",
            format_timestamp(state.ends_at, tz),
            submissions
        ),
        _ => "No banner contest is running.".to_string(),
    };
    ctx.say(text).await?;
    Ok(())
}
