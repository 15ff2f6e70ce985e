//! Custom reactions: the management menu and message dispatch.
//!
//! Approved reactions answer matching guild messages. Members without the
//! moderator role can only propose new ones; moderators review proposals
//! from the same menu.

use canary_common::{escape_markdown, single_line, truncate_string, UserId, DISCORD_MESSAGE_LIMIT};
use canary_db::{CustomReaction, NewCustomReaction};
use canary_pstrings::{validate_reaction, PString};
use poise::serenity_prelude as serenity;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::checks::{is_moderator, Actor};
use crate::discord::DiscordConversation;
use crate::framework::{Context, Data, Error};
use crate::pages::{Pages, PagesOutcome};
use crate::wizard::{confirm, menu, Answers, Conversation, MenuOption, Screen, Wizard, WizardOutcome};

const TITLE: &str = "Custom reactions";

/// Manage custom reactions
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    aliases("cr", "reactions"),
    category = "Custom reactions"
)]
pub async fn customreactions(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let user_id = UserId(ctx.author().id.get());
    let Some(_session) = data.sessions.try_begin(user_id) else {
        ctx.say("You already have a menu open. Finish or stop it first.")
            .await?;
        return Ok(());
    };

    let actor = Actor::new(user_id, is_moderator(ctx).await?);
    let mut conv = DiscordConversation::new(ctx);
    main_menu(
        &mut conv,
        data,
        actor,
        data.config.general.page_size,
        data.config.wizard_timeout(),
    )
    .await?;
    Ok(())
}

/// Top-level menu. Returns whether the approved reactions changed.
///
/// The live reactions in `data` are reloaded as soon as a change is
/// committed, so a failure later in the menu cannot leave them stale.
pub async fn main_menu(
    conv: &mut dyn Conversation,
    data: &Data,
    actor: Actor,
    page_size: usize,
    timeout: Duration,
) -> Result<bool, Error> {
    let mut options = vec![
        MenuOption::new("➕", "Add a custom reaction", "add"),
        MenuOption::new("📜", "List custom reactions", "list"),
    ];
    if actor.moderator {
        options.push(MenuOption::new("📥", "Review proposals", "proposals"));
    }

    let choice = menu(conv, TITLE, "What would you like to do?", options, timeout).await?;
    match choice.as_deref() {
        Some("add") => add_flow(conv, data, actor, timeout).await,
        Some("list") => list_flow(conv, data, actor, page_size, timeout).await,
        Some("proposals") if actor.moderator => {
            proposals_flow(conv, data, page_size, timeout).await
        }
        _ => Ok(false),
    }
}

fn check_prompt(value: &str, _: &Answers) -> Result<String, String> {
    let parsed = PString::parse(value).map_err(|e| capitalize(&e.to_string()))?;
    if parsed.is_empty() {
        return Err("The prompt cannot be empty.".to_string());
    }
    Ok(value.to_string())
}

fn check_response(prompt: &str, value: &str) -> Result<String, String> {
    if value.chars().count() > DISCORD_MESSAGE_LIMIT {
        return Err(format!(
            "The response can be at most {DISCORD_MESSAGE_LIMIT} characters long."
        ));
    }
    validate_reaction(prompt, value, false).map_err(|e| capitalize(&e.to_string()))?;
    Ok(value.to_string())
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        format!("{}{}.", first.to_uppercase(), chars.as_str())
    })
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Multi-line description of a reaction.
pub fn summary(
    prompt: &str,
    response: &str,
    delete_prompt: bool,
    anywhere: bool,
    dm: bool,
) -> String {
    format!(
        "**Prompt:** {}\n**Response:** {}\n**Delete prompt:** {}\n**Anywhere:** {}\n**DM:** {}",
        escape_markdown(prompt),
        escape_markdown(&truncate_string(response, 1000)),
        yes_no(delete_prompt),
        yes_no(anywhere),
        yes_no(dm),
    )
}

fn list_line(reaction: &CustomReaction) -> String {
    format!(
        "`{}` → {}",
        truncate_string(&single_line(&reaction.prompt), 60),
        escape_markdown(&truncate_string(&single_line(&reaction.response), 80))
    )
}

/// Add wizard. Returns whether the approved reactions changed, which is
/// only the case when a moderator adds one.
pub async fn add_flow(
    conv: &mut dyn Conversation,
    data: &Data,
    actor: Actor,
    timeout: Duration,
) -> Result<bool, Error> {
    let wizard = Wizard::new("Add a custom reaction")
        .validated_text(
            "prompt",
            "What should I react to? Use `%user%`, `%channel%`, `%1%`..`%9%` and `%[a,b]%` as placeholders.",
            check_prompt,
        )
        .validated_text(
            "response",
            "What should I answer? You can use the prompt's placeholders.",
            |value, answers| check_response(answers.text("prompt").unwrap_or_default(), value),
        )
        .yes_no("delete_prompt", "Delete the message that triggered the reaction?")
        .yes_no("anywhere", "Trigger when the prompt appears anywhere in a message?")
        .yes_no("dm", "Send the response as a direct message?");

    let WizardOutcome::Completed(answers) = wizard.run(conv, timeout).await? else {
        return Ok(false);
    };
    let reaction = NewCustomReaction {
        prompt: answers.text("prompt").unwrap_or_default().to_string(),
        response: answers.text("response").unwrap_or_default().to_string(),
        user_id: actor.user_id,
        delete_prompt: answers.flag("delete_prompt").unwrap_or(false),
        anywhere: answers.flag("anywhere").unwrap_or(false),
        dm: answers.flag("dm").unwrap_or(false),
        proposal: !actor.moderator,
    };

    let description = format!(
        "{}\n\nAdd this custom reaction?",
        summary(
            &reaction.prompt,
            &reaction.response,
            reaction.delete_prompt,
            reaction.anywhere,
            reaction.dm
        )
    );
    match confirm(conv, "Add a custom reaction", &description, timeout).await? {
        Some(true) => {}
        Some(false) => {
            conv.close(Some(&Screen::new(TITLE, "Nothing was added.")))
                .await?;
            return Ok(false);
        }
        None => return Ok(false),
    }

    if let Err(e) = validate_reaction(&reaction.prompt, &reaction.response, reaction.anywhere) {
        conv.close(Some(&Screen::new(
            TITLE,
            format!("That reaction cannot be used: {e}."),
        )))
        .await?;
        return Ok(false);
    }

    let id = data.db.add_custom_reaction(&reaction).await?;
    info!(id, user = %actor.user_id, proposal = reaction.proposal, "Custom reaction created");
    if !reaction.proposal {
        data.reload_reactions().await?;
    }
    let done = if reaction.proposal {
        "Your proposal was submitted. A moderator will review it."
    } else {
        "The custom reaction was added."
    };
    conv.close(Some(&Screen::new(TITLE, done))).await?;
    Ok(!reaction.proposal)
}

/// Pages of approved reactions; selecting one opens the edit menu.
pub async fn list_flow(
    conv: &mut dyn Conversation,
    data: &Data,
    actor: Actor,
    page_size: usize,
    timeout: Duration,
) -> Result<bool, Error> {
    let mut changed = false;
    loop {
        let reactions = data.db.custom_reactions(false).await?;
        let lines = reactions.iter().map(list_line).collect();
        let mut pages = Pages::new(TITLE, lines, page_size).selectable(true);

        let PagesOutcome::Selected(index) = pages.run(conv, timeout).await? else {
            return Ok(changed);
        };
        let Some(reaction) = reactions.get(index).cloned() else {
            continue;
        };
        if !actor.can_edit(reaction.user_id) {
            conv.notify("You can only edit custom reactions you created.")
                .await?;
            continue;
        }
        changed |= edit_flow(conv, data, reaction, timeout).await?;
    }
}

enum Edit {
    Back,
    Unchanged,
    Updated,
    Deleted,
}

/// Edit menu of one reaction. Returns whether it changed.
pub async fn edit_flow(
    conv: &mut dyn Conversation,
    data: &Data,
    mut reaction: CustomReaction,
    timeout: Duration,
) -> Result<bool, Error> {
    let mut changed = false;
    loop {
        match edit_once(conv, data, &mut reaction, timeout).await? {
            Edit::Back => return Ok(changed),
            Edit::Unchanged => {}
            Edit::Updated => changed = true,
            Edit::Deleted => return Ok(true),
        }
    }
}

async fn edit_once(
    conv: &mut dyn Conversation,
    data: &Data,
    reaction: &mut CustomReaction,
    timeout: Duration,
) -> Result<Edit, Error> {
    let options = vec![
        MenuOption::new("📝", "Edit the prompt", "prompt"),
        MenuOption::new("💬", "Edit the response", "response"),
        MenuOption::new("🧹", "Toggle deleting the prompt", "delete_prompt"),
        MenuOption::new("🌐", "Toggle matching anywhere", "anywhere"),
        MenuOption::new("📨", "Toggle answering by DM", "dm"),
        MenuOption::new("🗑", "Delete this reaction", "delete"),
        MenuOption::new("↩", "Back to the list", "back"),
    ];
    let description = summary(
        &reaction.prompt,
        &reaction.response,
        reaction.delete_prompt,
        reaction.anywhere,
        reaction.dm,
    );
    let title = format!("Custom reaction #{}", reaction.id);

    let Some(choice) = menu(conv, &title, &description, options, timeout).await? else {
        return Ok(Edit::Back);
    };
    match choice.as_str() {
        "prompt" => {
            let response = reaction.response.clone();
            let anywhere = reaction.anywhere;
            let outcome = Wizard::new(&title)
                .validated_text("prompt", "Type the new prompt.", move |value, answers| {
                    let value = check_prompt(value, answers)?;
                    validate_reaction(&value, &response, anywhere)
                        .map_err(|e| capitalize(&e.to_string()))?;
                    Ok(value)
                })
                .run(conv, timeout)
                .await?;
            let WizardOutcome::Completed(answers) = outcome else {
                return Ok(Edit::Back);
            };
            reaction.prompt = answers.text("prompt").unwrap_or_default().to_string();
        }
        "response" => {
            let prompt = reaction.prompt.clone();
            let outcome = Wizard::new(&title)
                .validated_text("response", "Type the new response.", move |value, _| {
                    check_response(&prompt, value)
                })
                .run(conv, timeout)
                .await?;
            let WizardOutcome::Completed(answers) = outcome else {
                return Ok(Edit::Back);
            };
            reaction.response = answers.text("response").unwrap_or_default().to_string();
        }
        "delete_prompt" => reaction.delete_prompt = !reaction.delete_prompt,
        "anywhere" => {
            if let Err(e) = validate_reaction(&reaction.prompt, &reaction.response, !reaction.anywhere) {
                conv.notify(&format!("Cannot change matching: {e}.")).await?;
                return Ok(Edit::Unchanged);
            }
            reaction.anywhere = !reaction.anywhere;
        }
        "dm" => reaction.dm = !reaction.dm,
        "delete" => {
            let answer = confirm(conv, &title, "Delete this custom reaction?", timeout).await?;
            if answer != Some(true) {
                return Ok(Edit::Back);
            }
            data.db.delete_custom_reaction(reaction.id).await?;
            info!(id = reaction.id, "Custom reaction deleted");
            data.reload_reactions().await?;
            conv.notify("The custom reaction was deleted.").await?;
            return Ok(Edit::Deleted);
        }
        _ => return Ok(Edit::Back),
    }

    data.db.update_custom_reaction(reaction).await?;
    debug!(id = reaction.id, "Custom reaction updated");
    data.reload_reactions().await?;
    Ok(Edit::Updated)
}

/// Moderator review of pending proposals.
pub async fn proposals_flow(
    conv: &mut dyn Conversation,
    data: &Data,
    page_size: usize,
    timeout: Duration,
) -> Result<bool, Error> {
    let mut changed = false;
    loop {
        let proposals = data.db.custom_reactions(true).await?;
        let lines = proposals.iter().map(list_line).collect();
        let mut pages = Pages::new("Proposals", lines, page_size).selectable(true);

        let PagesOutcome::Selected(index) = pages.run(conv, timeout).await? else {
            return Ok(changed);
        };
        let Some(proposal) = proposals.get(index) else {
            continue;
        };

        let description = format!(
            "Proposed by {}\n\n{}",
            proposal.user_id.mention(),
            summary(
                &proposal.prompt,
                &proposal.response,
                proposal.delete_prompt,
                proposal.anywhere,
                proposal.dm
            )
        );
        let options = vec![
            MenuOption::new("✅", "Approve", "approve"),
            MenuOption::new("🗑", "Reject", "reject"),
            MenuOption::new("↩", "Back to the list", "back"),
        ];
        let title = format!("Proposal #{}", proposal.id);
        match menu(conv, &title, &description, options, timeout)
            .await?
            .as_deref()
        {
            Some("approve") => {
                if data.db.approve_custom_reaction(proposal.id).await? {
                    info!(id = proposal.id, "Proposal approved");
                    data.reload_reactions().await?;
                    conv.notify("The proposal was approved.").await?;
                    changed = true;
                }
            }
            Some("reject") => {
                data.db.delete_custom_reaction(proposal.id).await?;
                info!(id = proposal.id, "Proposal rejected");
                conv.notify("The proposal was rejected.").await?;
            }
            _ => {}
        }
    }
}

/// Whether a message should be matched against the custom reactions.
pub fn should_dispatch(content: &str, prefix: &str, author_is_bot: bool, in_guild: bool) -> bool {
    in_guild && !author_is_bot && !content.trim().is_empty() && !content.starts_with(prefix)
}

/// Answers `message` with the first matching custom reaction.
pub async fn dispatch(
    ctx: &serenity::Context,
    data: &Data,
    message: &serenity::Message,
) -> Result<(), Error> {
    if !data.config.custom_reactions.enabled
        || !should_dispatch(
            &message.content,
            &data.config.discord.prefix,
            message.author.bot,
            message.guild_id.is_some(),
        )
    {
        return Ok(());
    }

    let cached_name = message
        .guild(&ctx.cache)
        .and_then(|guild| guild.channels.get(&message.channel_id).map(|c| c.name.clone()));
    let channel_name = match cached_name {
        Some(name) => name,
        None => message
            .channel_id
            .name(ctx)
            .await
            .unwrap_or_else(|_| message.channel_id.to_string()),
    };
    let mention = UserId(message.author.id.get()).mention();

    let resolved = {
        let mut rng = fastrand::Rng::new();
        data.reactions
            .load()
            .parser(&message.content, &mention, &channel_name, &mut rng)
    };
    let Some(resolved) = resolved else {
        return Ok(());
    };

    let text = truncate_string(&resolved.response, DISCORD_MESSAGE_LIMIT);
    if text.trim().is_empty() {
        return Ok(());
    }
    debug!(id = resolved.id, channel = %message.channel_id, "Custom reaction matched");
    if resolved.dm {
        message
            .author
            .direct_message(ctx, serenity::CreateMessage::new().content(text))
            .await?;
    } else {
        message.channel_id.say(ctx, text).await?;
    }

    if resolved.delete_prompt {
        if let Err(e) = message.delete(ctx).await {
            warn!("Could not delete custom reaction prompt: {}", e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::PageControl;
    use crate::testing::ScriptedConversation;
    use crate::wizard::{NO, STOP, YES};
    use canary_config::Config;
    use canary_db::Database;
    use std::sync::Arc;

    const T: Duration = Duration::from_secs(30);
    const MOD: Actor = Actor {
        user_id: UserId(1),
        moderator: true,
    };
    const MEMBER: Actor = Actor {
        user_id: UserId(2),
        moderator: false,
    };

    async fn fresh() -> Data {
        let db = Database::in_memory().await.unwrap();
        Data::new(Arc::new(Config::default()), db).await.unwrap()
    }

    async fn seeded(owner: UserId) -> (Data, i64) {
        let data = fresh().await;
        let id = data
            .db
            .add_custom_reaction(&NewCustomReaction {
                prompt: "hello".to_string(),
                response: "hi %user%".to_string(),
                user_id: owner,
                delete_prompt: false,
                anywhere: false,
                dm: false,
                proposal: false,
            })
            .await
            .unwrap();
        data.reload_reactions().await.unwrap();
        (data, id)
    }

    fn add_script(prompt: &str, response: &str) -> ScriptedConversation {
        ScriptedConversation::new()
            .react("➕")
            .text(prompt)
            .text(response)
            .react(YES)
            .react(NO)
            .react(NO)
            .react(YES)
    }

    #[tokio::test]
    async fn test_moderator_adds_directly() {
        let data = fresh().await;
        let mut conv = add_script("i like %1%", "%user% likes %1% too");

        assert!(main_menu(&mut conv, &data, MOD, 5, T).await.unwrap());
        let stored = data.db.custom_reactions(false).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].prompt, "i like %1%");
        assert!(stored[0].delete_prompt);
        assert!(!stored[0].anywhere);
        assert_eq!(conv.remaining(), 0);
    }

    #[tokio::test]
    async fn test_member_creates_proposal() {
        let data = fresh().await;
        let mut conv = add_script("ping", "pong");

        assert!(!main_menu(&mut conv, &data, MEMBER, 5, T).await.unwrap());
        assert!(data.db.custom_reactions(false).await.unwrap().is_empty());
        assert_eq!(data.db.custom_reactions(true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_member_has_no_proposals_entry() {
        let data = fresh().await;
        let mut conv = ScriptedConversation::new().react("📥").react(STOP);
        assert!(!main_menu(&mut conv, &data, MEMBER, 5, T).await.unwrap());
        assert!(!conv.presented[0].accepts("📥"));
    }

    #[tokio::test]
    async fn test_response_with_unknown_group_is_rejected() {
        let data = fresh().await;
        let mut conv = ScriptedConversation::new()
            .react("➕")
            .text("hello")
            .text("you said %1%")
            .text("hello back")
            .react(NO)
            .react(NO)
            .react(NO)
            .react(YES);

        assert!(main_menu(&mut conv, &data, MOD, 5, T).await.unwrap());
        assert!(conv
            .presented
            .iter()
            .any(|s| s.description.contains("⚠️ Response uses %1%")));
        let stored = data.db.custom_reactions(false).await.unwrap();
        assert_eq!(stored[0].response, "hello back");
    }

    #[tokio::test]
    async fn test_declined_summary_adds_nothing() {
        let data = fresh().await;
        let mut conv = ScriptedConversation::new()
            .react("➕")
            .text("ping")
            .text("pong")
            .react(NO)
            .react(NO)
            .react(NO)
            .react(NO);
        assert!(!main_menu(&mut conv, &data, MOD, 5, T).await.unwrap());
        assert!(data.db.custom_reactions(false).await.unwrap().is_empty());
    }

    #[test]
    fn test_empty_prompt_is_rejected() {
        assert!(check_prompt("", &Answers::default()).is_err());
        assert!(check_prompt("%[a,b", &Answers::default()).is_err());
        assert!(check_prompt("hi %user%", &Answers::default()).is_ok());
        assert!(check_response("x", &"y".repeat(DISCORD_MESSAGE_LIMIT + 1)).is_err());
    }

    #[tokio::test]
    async fn test_list_edit_toggle_and_delete() {
        let (data, id) = seeded(MEMBER.user_id).await;
        let mut conv = ScriptedConversation::new()
            .react(PageControl::Select.emoji())
            .text("1")
            .react("📨")
            .react("🗑")
            .react(YES)
            .react(PageControl::Stop.emoji());

        assert!(list_flow(&mut conv, &data, MEMBER, 5, T).await.unwrap());
        assert!(data.db.custom_reaction(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_edit_refused_for_others() {
        let (data, id) = seeded(UserId(99)).await;
        let mut conv = ScriptedConversation::new()
            .react(PageControl::Select.emoji())
            .text("1")
            .react(PageControl::Stop.emoji());

        assert!(!list_flow(&mut conv, &data, MEMBER, 5, T).await.unwrap());
        assert_eq!(conv.notices.len(), 1);
        assert!(data.db.custom_reaction(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_edit_response() {
        let (data, id) = seeded(MOD.user_id).await;
        let reaction = data.db.custom_reaction(id).await.unwrap().unwrap();
        let mut conv = ScriptedConversation::new()
            .react("💬")
            .text("hey %channel%")
            .react("↩");

        assert!(edit_flow(&mut conv, &data, reaction, T).await.unwrap());
        assert_eq!(
            data.db.custom_reaction(id).await.unwrap().unwrap().response,
            "hey %channel%"
        );
    }

    #[tokio::test]
    async fn test_approve_proposal() {
        let data = fresh().await;
        let id = data
            .db
            .add_custom_reaction(&NewCustomReaction {
                prompt: "gm".to_string(),
                response: "good morning".to_string(),
                user_id: MEMBER.user_id,
                delete_prompt: false,
                anywhere: false,
                dm: false,
                proposal: true,
            })
            .await
            .unwrap();
        let mut conv = ScriptedConversation::new()
            .react(PageControl::Select.emoji())
            .text("1")
            .react(YES)
            .react(PageControl::Stop.emoji());

        assert!(proposals_flow(&mut conv, &data, 5, T).await.unwrap());
        assert!(!data.db.custom_reaction(id).await.unwrap().unwrap().proposal);
        assert_eq!(conv.last_screen().unwrap().description, "Nothing to show.");
        assert_eq!(data.reactions.load().len(), 1);
    }

    #[tokio::test]
    async fn test_committed_change_is_live_even_if_menu_fails() {
        let data = fresh().await;
        data.db
            .add_custom_reaction(&NewCustomReaction {
                prompt: "gn".to_string(),
                response: "good night".to_string(),
                user_id: MEMBER.user_id,
                delete_prompt: false,
                anywhere: false,
                dm: false,
                proposal: true,
            })
            .await
            .unwrap();
        let mut conv = ScriptedConversation::new()
            .failing_notices()
            .react(PageControl::Select.emoji())
            .text("1")
            .react(YES);

        assert!(proposals_flow(&mut conv, &data, 5, T).await.is_err());
        let mut rng = fastrand::Rng::with_seed(1);
        let resolved = data.reactions.load().parser("GN", "<@3>", "general", &mut rng);
        assert_eq!(resolved.unwrap().response, "good night");
    }

    #[tokio::test]
    async fn test_delete_is_live_immediately() {
        let (data, id) = seeded(MOD.user_id).await;
        let reaction = data.db.custom_reaction(id).await.unwrap().unwrap();
        assert_eq!(data.reactions.load().len(), 1);
        let mut conv = ScriptedConversation::new().react("🗑").react(YES);

        assert!(edit_flow(&mut conv, &data, reaction, T).await.unwrap());
        assert!(data.reactions.load().is_empty());
    }

    #[test]
    fn test_should_dispatch() {
        assert!(should_dispatch("hello", "!", false, true));
        assert!(!should_dispatch("!help", "!", false, true));
        assert!(!should_dispatch("hello", "!", true, true));
        assert!(!should_dispatch("hello", "!", false, false));
        assert!(!should_dispatch("   ", "!", false, true));
    }
}
