//! Scripted [`Conversation`] for driving interactive flows without Discord.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use crate::framework::Error;
use crate::wizard::{Conversation, Input, Screen, TextReply};

/// Replays a fixed list of inputs and records everything shown.
///
/// A `None` entry, or running out of script, behaves like a timeout.
#[derive(Debug, Default)]
pub struct ScriptedConversation {
    script: VecDeque<Option<Input>>,
    /// Every screen passed to `present`, in order
    pub presented: Vec<Screen>,
    /// Notices posted next to the menu
    pub notices: Vec<String>,
    /// Arguments of every `close` call
    pub closed: Vec<Option<Screen>>,
    fail_notices: bool,
}

impl ScriptedConversation {
    /// An empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an input.
    #[must_use]
    pub fn input(mut self, input: Input) -> Self {
        self.script.push_back(Some(input));
        self
    }

    /// Queues a control press.
    #[must_use]
    pub fn react(self, emoji: &str) -> Self {
        self.input(Input::Reaction(emoji.to_string()))
    }

    /// Queues a typed reply.
    #[must_use]
    pub fn text(self, content: &str) -> Self {
        self.input(Input::Text(TextReply::new(content)))
    }

    /// Queues a timeout.
    #[must_use]
    pub fn timeout(mut self) -> Self {
        self.script.push_back(None);
        self
    }

    /// Makes every `notify` fail, as a deleted channel would.
    #[must_use]
    pub fn failing_notices(mut self) -> Self {
        self.fail_notices = true;
        self
    }

    /// Inputs not consumed yet.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// The last screen presented.
    pub fn last_screen(&self) -> Option<&Screen> {
        self.presented.last()
    }
}

#[async_trait]
impl Conversation for ScriptedConversation {
    async fn present(&mut self, screen: &Screen) -> Result<(), Error> {
        self.presented.push(screen.clone());
        Ok(())
    }

    async fn next_input(
        &mut self,
        accept_text: bool,
        _timeout: Duration,
    ) -> Result<Option<Input>, Error> {
        loop {
            match self.script.pop_front().flatten() {
                Some(Input::Text(_)) if !accept_text => {}
                other => return Ok(other),
            }
        }
    }

    async fn notify(&mut self, text: &str) -> Result<(), Error> {
        if self.fail_notices {
            return Err(format!("could not post notice: {text}").into());
        }
        self.notices.push(text.to_string());
        Ok(())
    }

    async fn close(&mut self, screen: Option<&Screen>) -> Result<(), Error> {
        self.closed.push(screen.cloned());
        Ok(())
    }
}
