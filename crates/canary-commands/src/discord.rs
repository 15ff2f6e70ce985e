//! [`Conversation`] backed by a Discord menu message.

use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use poise::CreateReply;
use std::time::Duration;
use tracing::{debug, warn};

use crate::framework::{Context, Error};
use crate::wizard::{Conversation, Input, Screen, TextReply};

/// Embed colour of every menu.
pub const MENU_COLOUR: serenity::Colour = serenity::Colour::GOLD;

/// Renders a screen as an embed.
pub fn embed(screen: &Screen) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(&screen.title)
        .description(screen.body())
        .colour(MENU_COLOUR);
    if let Some(footer) = &screen.footer {
        embed = embed.footer(serenity::CreateEmbedFooter::new(footer));
    }
    if let Some(url) = &screen.image_url {
        embed = embed.image(url);
    }
    embed
}

/// A menu message in the invoking channel, answered by the invoking user.
pub struct DiscordConversation<'a> {
    ctx: Context<'a>,
    message: Option<serenity::Message>,
    controls: Vec<String>,
}

impl<'a> DiscordConversation<'a> {
    /// A conversation that creates its menu message on first use.
    pub const fn new(ctx: Context<'a>) -> Self {
        Self {
            ctx,
            message: None,
            controls: Vec::new(),
        }
    }

    async fn sync_controls(&mut self, wanted: Vec<String>) -> Result<(), Error> {
        if wanted == self.controls {
            return Ok(());
        }
        let Some(message) = &self.message else {
            return Ok(());
        };
        let serenity_ctx = self.ctx.serenity_context();
        if !self.controls.is_empty() {
            if let Err(e) = message.delete_reactions(serenity_ctx).await {
                warn!("Could not clear menu reactions: {}", e);
            }
        }
        for emoji in &wanted {
            message
                .react(serenity_ctx, serenity::ReactionType::Unicode(emoji.clone()))
                .await?;
        }
        self.controls = wanted;
        Ok(())
    }
}

impl std::fmt::Debug for DiscordConversation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConversation")
            .field("message", &self.message.as_ref().map(|m| m.id))
            .field("controls", &self.controls)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Conversation for DiscordConversation<'_> {
    async fn present(&mut self, screen: &Screen) -> Result<(), Error> {
        let rendered = embed(screen);
        match &mut self.message {
            Some(message) => {
                message
                    .edit(
                        self.ctx.serenity_context(),
                        serenity::EditMessage::new().embed(rendered),
                    )
                    .await?;
            }
            None => {
                let handle = self.ctx.send(CreateReply::default().embed(rendered)).await?;
                self.message = Some(handle.into_message().await?);
            }
        }
        self.sync_controls(screen.control_emojis()).await
    }

    async fn next_input(
        &mut self,
        accept_text: bool,
        timeout: Duration,
    ) -> Result<Option<Input>, Error> {
        let Some(message) = &self.message else {
            return Ok(None);
        };
        let serenity_ctx = self.ctx.serenity_context();
        let author = self.ctx.author().id;
        let controls = self.controls.clone();

        let reaction = serenity::ReactionCollector::new(serenity_ctx)
            .message_id(message.id)
            .author_id(author)
            .timeout(timeout)
            .filter(move |r| {
                matches!(&r.emoji, serenity::ReactionType::Unicode(e) if controls.contains(e))
            })
            .next();
        let reply = serenity::MessageCollector::new(serenity_ctx)
            .channel_id(message.channel_id)
            .author_id(author)
            .timeout(timeout)
            .next();

        tokio::select! {
            reaction = reaction => {
                let Some(reaction) = reaction else {
                    return Ok(None);
                };
                if let Err(e) = reaction.delete(serenity_ctx).await {
                    debug!("Could not remove menu reaction: {}", e);
                }
                match reaction.emoji {
                    serenity::ReactionType::Unicode(emoji) => Ok(Some(Input::Reaction(emoji))),
                    _ => Ok(None),
                }
            }
            reply = reply, if accept_text => {
                let Some(reply) = reply else {
                    return Ok(None);
                };
                let input = TextReply {
                    content: reply.content.clone(),
                    attachment_urls: reply.attachments.iter().map(|a| a.url.clone()).collect(),
                };
                if let Err(e) = reply.delete(serenity_ctx).await {
                    warn!("Could not delete menu reply: {}", e);
                }
                Ok(Some(Input::Text(input)))
            }
        }
    }

    async fn notify(&mut self, text: &str) -> Result<(), Error> {
        self.ctx.say(text).await?;
        Ok(())
    }

    async fn close(&mut self, screen: Option<&Screen>) -> Result<(), Error> {
        if let Some(screen) = screen {
            self.present(&screen.clone().without_controls()).await?;
        } else {
            self.sync_controls(Vec::new()).await?;
        }
        Ok(())
    }
}

/// Shows `items` as pages in the invoking channel until closed.
pub async fn paginate(
    ctx: Context<'_>,
    title: impl Into<String>,
    items: Vec<String>,
) -> Result<(), Error> {
    let data = ctx.data();
    let mut pages = crate::pages::Pages::new(title, items, data.config.general.page_size);
    let mut conv = DiscordConversation::new(ctx);
    pages.run(&mut conv, data.config.wizard_timeout()).await?;
    Ok(())
}
