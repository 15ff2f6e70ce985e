//! Memorable things members said.

use canary_common::{escape_markdown, format_timestamp, single_line, truncate_string, UserId};
use canary_db::{Database, Quote};
use chrono_tz::Tz;
use poise::serenity_prelude as serenity;
use std::time::Duration;
use tracing::info;

use crate::checks::{actor, Actor};
use crate::discord::DiscordConversation;
use crate::framework::{user_error, Context, Error};
use crate::pages::{Pages, PagesOutcome};
use crate::wizard::{confirm, Conversation};

/// Longest quote accepted.
pub const MAX_QUOTE_LENGTH: usize = 1000;

/// Quote commands
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    subcommands("add", "get", "list", "remove"),
    subcommand_required,
    category = "Quotes"
)]
pub async fn quote(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Checks and trims the text of a new quote.
pub fn clean_quote(text: &str) -> Result<String, Error> {
    let text = text.trim();
    if text.is_empty() {
        return Err(user_error("The quote cannot be empty."));
    }
    if text.chars().count() > MAX_QUOTE_LENGTH {
        return Err(user_error(format!(
            "Quotes can be at most {MAX_QUOTE_LENGTH} characters long."
        )));
    }
    Ok(text.to_string())
}

/// How a quote is shown on its own.
pub fn render_quote(quote: &Quote, tz: Tz) -> String {
    format!(
        "> {}\n— {} (#{}, {})",
        escape_markdown(&quote.quote).replace('\n', "\n> "),
        quote.name,
        quote.id,
        format_timestamp(quote.created_at, tz)
    )
}

fn list_line(quote: &Quote) -> String {
    format!(
        "#{} {}: {}",
        quote.id,
        quote.name,
        escape_markdown(&truncate_string(&single_line(&quote.quote), 80))
    )
}

/// Save a quote from a member
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn add(
    ctx: Context<'_>,
    #[description = "Who said it"] member: serenity::Member,
    #[description = "What they said"]
    #[rest]
    text: String,
) -> Result<(), Error> {
    let text = clean_quote(&text)?;
    let user = UserId(member.user.id.get());
    let id = ctx
        .data()
        .db
        .add_quote(user, member.display_name(), &text)
        .await?;
    info!(id, user = %user, by = %ctx.author().id, "Quote saved");
    ctx.say(format!("Saved quote #{id}.")).await?;
    Ok(())
}

/// Show a random quote, optionally from a member or containing some text
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn get(
    ctx: Context<'_>,
    #[description = "Only quotes from this member"] member: Option<serenity::Member>,
    #[description = "Only quotes containing this text"]
    #[rest]
    query: Option<String>,
) -> Result<(), Error> {
    let data = ctx.data();
    let user = member.map(|m| UserId(m.user.id.get()));
    let query = query.as_deref().map(str::trim).filter(|q| !q.is_empty());
    match data.db.random_quote(user, query).await? {
        Some(quote) => {
            ctx.say(render_quote(&quote, data.config.timezone())).await?;
        }
        None => {
            ctx.say("No quote matches that.").await?;
        }
    }
    Ok(())
}

/// Pages of quotes; selecting one offers to delete it.
pub async fn list_flow(
    conv: &mut dyn Conversation,
    db: &Database,
    actor: Actor,
    filter: Option<UserId>,
    page_size: usize,
    timeout: Duration,
) -> Result<(), Error> {
    loop {
        let quotes = db.quotes(filter, None).await?;
        let lines = quotes.iter().map(list_line).collect();
        let mut pages = Pages::new("Quotes", lines, page_size).selectable(true);

        let PagesOutcome::Selected(index) = pages.run(conv, timeout).await? else {
            return Ok(());
        };
        let Some(quote) = quotes.get(index) else {
            continue;
        };
        if !actor.can_edit(quote.user_id) {
            conv.notify(&format!(
                "Only {} or a moderator can delete quote #{}.",
                quote.name, quote.id
            ))
            .await?;
            continue;
        }

        let question = format!(
            "{}\n\nDelete this quote?",
            escape_markdown(&truncate_string(&quote.quote, 1500))
        );
        if confirm(conv, &format!("Quote #{}", quote.id), &question, timeout).await? == Some(true) {
            db.delete_quote(quote.id).await?;
            info!(id = quote.id, by = %actor.user_id, "Quote deleted");
            conv.notify(&format!("Deleted quote #{}.", quote.id)).await?;
        }
    }
}

/// Browse quotes, optionally from one member
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn list(
    ctx: Context<'_>,
    #[description = "Only quotes from this member"] member: Option<serenity::Member>,
) -> Result<(), Error> {
    let data = ctx.data();
    let actor = actor(ctx).await?;
    let Some(_session) = data.sessions.try_begin(actor.user_id) else {
        ctx.say("You already have a menu open. Finish or stop it first.")
            .await?;
        return Ok(());
    };
    let mut conv = DiscordConversation::new(ctx);
    list_flow(
        &mut conv,
        &data.db,
        actor,
        member.map(|m| UserId(m.user.id.get())),
        data.config.general.page_size,
        data.config.wizard_timeout(),
    )
    .await
}

/// Delete a quote by its number
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Quote number"] id: i64,
) -> Result<(), Error> {
    let data = ctx.data();
    let quote = data
        .db
        .quote(id)
        .await?
        .ok_or_else(|| user_error(format!("There is no quote #{id}.")))?;
    if !actor(ctx).await?.can_edit(quote.user_id) {
        return Err(user_error(format!(
            "Only {} or a moderator can delete quote #{id}.",
            quote.name
        )));
    }
    data.db.delete_quote(id).await?;
    info!(id, by = %ctx.author().id, "Quote deleted");
    ctx.say(format!("Deleted quote #{id}.")).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::PageControl;
    use crate::testing::ScriptedConversation;
    use crate::wizard::YES;

    const T: Duration = Duration::from_secs(30);

    async fn seeded() -> Database {
        let db = Database::in_memory().await.unwrap();
        db.add_quote(UserId(1), "alice", "first!").await.unwrap();
        db.add_quote(UserId(2), "bob", "second").await.unwrap();
        db
    }

    #[test]
    fn test_clean_quote() {
        assert_eq!(clean_quote("  hi  ").unwrap(), "hi");
        assert!(clean_quote("   ").is_err());
        assert!(clean_quote(&"a".repeat(MAX_QUOTE_LENGTH + 1)).is_err());
    }

    #[tokio::test]
    async fn test_render_quote_blockquotes_every_line() {
        let db = Database::in_memory().await.unwrap();
        let id = db.add_quote(UserId(1), "alice", "one\ntwo").await.unwrap();
        let quote = db.quote(id).await.unwrap().unwrap();
        let rendered = render_quote(&quote, chrono_tz::UTC);
        assert!(rendered.starts_with("> one\n> two\n— alice (#1, "));
    }

    #[tokio::test]
    async fn test_author_deletes_own_quote() {
        let db = seeded().await;
        let mut conv = ScriptedConversation::new()
            .react(PageControl::Select.emoji())
            .text("2")
            .react(YES)
            .react(PageControl::Stop.emoji());

        list_flow(&mut conv, &db, Actor::new(UserId(2), false), None, 5, T)
            .await
            .unwrap();
        let left = db.quotes(None, None).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].name, "alice");
    }

    #[tokio::test]
    async fn test_others_cannot_delete() {
        let db = seeded().await;
        let mut conv = ScriptedConversation::new()
            .react(PageControl::Select.emoji())
            .text("1")
            .react(PageControl::Stop.emoji());

        list_flow(&mut conv, &db, Actor::new(UserId(2), false), None, 5, T)
            .await
            .unwrap();
        assert_eq!(db.quotes(None, None).await.unwrap().len(), 2);
        assert_eq!(conv.notices, vec!["Only alice or a moderator can delete quote #1."]);
    }

    #[tokio::test]
    async fn test_filtered_list() {
        let db = seeded().await;
        let mut conv = ScriptedConversation::new().react(PageControl::Stop.emoji());
        list_flow(&mut conv, &db, Actor::new(UserId(9), true), Some(UserId(1)), 5, T)
            .await
            .unwrap();
        assert_eq!(conv.presented[0].description, "**1.** #1 alice: first!");
    }
}
