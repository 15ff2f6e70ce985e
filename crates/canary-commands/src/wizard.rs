//! Multi-step menus driven by reactions and typed replies.
//!
//! A [`Wizard`] walks the user through a list of [`Step`]s on a single menu
//! message. Each step is rendered as a [`Screen`]; the user answers by
//! reacting with one of the screen's controls or by typing a reply. Every
//! screen carries the stop control, and typing `cancel` aborts as well.
//!
//! The Discord side is hidden behind [`Conversation`] so flows can be driven
//! by a script in tests.

use async_trait::async_trait;
use canary_common::UserId;
use dashmap::DashSet;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::framework::Error;

/// Stop control present on every screen.
pub const STOP: &str = "⏹";
/// Yes control of yes/no steps.
pub const YES: &str = "✅";
/// No control of yes/no steps.
pub const NO: &str = "❌";
/// Typed reply that aborts a wizard.
pub const CANCEL_WORD: &str = "cancel";

/// A reaction the user can press on a screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    /// Unicode emoji
    pub emoji: String,
    /// Legend shown next to the emoji; empty to leave it out of the legend
    pub label: String,
}

/// One rendering of the menu message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Screen {
    /// Embed title
    pub title: String,
    /// Embed body, without the control legend
    pub description: String,
    /// Embed footer
    pub footer: Option<String>,
    /// Image shown in the embed
    pub image_url: Option<String>,
    /// Reactions accepted on this screen, in display order
    pub controls: Vec<Control>,
}

impl Screen {
    /// A screen without controls.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    /// Sets the footer.
    #[must_use]
    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Sets the image.
    #[must_use]
    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Appends a control.
    #[must_use]
    pub fn control(mut self, emoji: impl Into<String>, label: impl Into<String>) -> Self {
        self.controls.push(Control {
            emoji: emoji.into(),
            label: label.into(),
        });
        self
    }

    /// The same screen with every control removed.
    #[must_use]
    pub fn without_controls(mut self) -> Self {
        self.controls.clear();
        self
    }

    /// Whether `emoji` is one of this screen's controls.
    pub fn accepts(&self, emoji: &str) -> bool {
        self.controls.iter().any(|c| c.emoji == emoji)
    }

    /// Control emojis in display order.
    pub fn control_emojis(&self) -> Vec<String> {
        self.controls.iter().map(|c| c.emoji.clone()).collect()
    }

    /// Description followed by the legend of labelled controls.
    pub fn body(&self) -> String {
        let legend: Vec<String> = self
            .controls
            .iter()
            .filter(|c| !c.label.is_empty())
            .map(|c| format!("{} {}", c.emoji, c.label))
            .collect();
        if legend.is_empty() {
            return self.description.clone();
        }
        if self.description.is_empty() {
            return legend.join("\n");
        }
        format!("{}\n\n{}", self.description, legend.join("\n"))
    }
}

/// A typed reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextReply {
    /// Message content
    pub content: String,
    /// URLs of attached files
    pub attachment_urls: Vec<String>,
}

impl TextReply {
    /// A reply without attachments.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            attachment_urls: Vec::new(),
        }
    }
}

/// Something the user did on the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Pressed a control
    Reaction(String),
    /// Typed a reply
    Text(TextReply),
}

/// The user-facing side of an interactive menu.
#[async_trait]
pub trait Conversation: Send {
    /// Show `screen`, creating the menu message on first use, and make its
    /// controls the only reactions on it.
    async fn present(&mut self, screen: &Screen) -> Result<(), Error>;

    /// Wait for the next control press or, when `accept_text` is set, typed
    /// reply. `None` on timeout.
    async fn next_input(
        &mut self,
        accept_text: bool,
        timeout: Duration,
    ) -> Result<Option<Input>, Error>;

    /// Post a short notice next to the menu.
    async fn notify(&mut self, text: &str) -> Result<(), Error>;

    /// Show a final screen, if any, and remove every control.
    async fn close(&mut self, screen: Option<&Screen>) -> Result<(), Error>;
}

/// A selectable entry of a choice step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuOption {
    /// Reaction selecting the option
    pub emoji: String,
    /// Legend
    pub label: String,
    /// Value recorded when selected
    pub value: String,
}

impl MenuOption {
    /// A new option.
    pub fn new(
        emoji: impl Into<String>,
        label: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            emoji: emoji.into(),
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Checks and normalizes a typed answer. Earlier answers are available for
/// cross-field checks. `Err` holds the message shown to the user.
pub type Validator = Box<dyn Fn(&str, &Answers) -> Result<String, String> + Send + Sync>;

/// One question of a wizard.
pub enum Step {
    /// Free text, optionally taking an attachment's URL when no text is typed
    Text {
        /// Answer key
        key: String,
        /// Question
        prompt: String,
        /// Check applied to the answer
        validator: Option<Validator>,
        /// Accept an attachment instead of text
        allow_attachment: bool,
    },
    /// One of several options
    Choice {
        /// Answer key
        key: String,
        /// Question
        prompt: String,
        /// Options
        options: Vec<MenuOption>,
    },
    /// Yes or no
    YesNo {
        /// Answer key
        key: String,
        /// Question
        prompt: String,
    },
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text { key, .. } => f.debug_tuple("Text").field(key).finish(),
            Self::Choice { key, options, .. } => f
                .debug_tuple("Choice")
                .field(key)
                .field(&options.len())
                .finish(),
            Self::YesNo { key, .. } => f.debug_tuple("YesNo").field(key).finish(),
        }
    }
}

enum Evaluation {
    Answer(Answer),
    Cancel,
    Invalid(String),
}

impl Step {
    fn key(&self) -> &str {
        match self {
            Self::Text { key, .. } | Self::Choice { key, .. } | Self::YesNo { key, .. } => key,
        }
    }

    fn screen(&self, title: String, problem: Option<&str>) -> Screen {
        let (prompt, hint) = match self {
            Self::Text {
                prompt,
                allow_attachment,
                ..
            } => {
                let hint = if *allow_attachment {
                    format!("Type your answer or attach a file. Type `{CANCEL_WORD}` to stop.")
                } else {
                    format!("Type your answer. Type `{CANCEL_WORD}` to stop.")
                };
                (prompt, Some(hint))
            }
            Self::Choice { prompt, .. } | Self::YesNo { prompt, .. } => (prompt, None),
        };

        let mut description = prompt.clone();
        if let Some(hint) = hint {
            description.push_str("\n\n");
            description.push_str(&hint);
        }
        if let Some(problem) = problem {
            description.push_str("\n\n⚠️ ");
            description.push_str(problem);
        }

        let mut screen = Screen::new(title, description);
        match self {
            Self::Text { .. } => {}
            Self::Choice { options, .. } => {
                for option in options {
                    screen = screen.control(&option.emoji, &option.label);
                }
            }
            Self::YesNo { .. } => {
                screen = screen.control(YES, "Yes").control(NO, "No");
            }
        }
        screen.control(STOP, "Stop")
    }

    fn evaluate(&self, input: Input, answers: &Answers) -> Evaluation {
        match &input {
            Input::Reaction(emoji) if emoji == STOP => return Evaluation::Cancel,
            Input::Text(reply) if reply.content.trim().eq_ignore_ascii_case(CANCEL_WORD) => {
                return Evaluation::Cancel
            }
            _ => {}
        }

        match (self, input) {
            (
                Self::Text {
                    validator,
                    allow_attachment,
                    ..
                },
                Input::Text(reply),
            ) => {
                let mut value = reply.content.trim().to_string();
                if value.is_empty() && *allow_attachment {
                    if let Some(url) = reply.attachment_urls.first() {
                        value.clone_from(url);
                    }
                }
                if value.is_empty() {
                    return Evaluation::Invalid("Please type an answer.".to_string());
                }
                match validator {
                    Some(validate) => match validate(&value, answers) {
                        Ok(normalized) => Evaluation::Answer(Answer::Text(normalized)),
                        Err(problem) => Evaluation::Invalid(problem),
                    },
                    None => Evaluation::Answer(Answer::Text(value)),
                }
            }
            (Self::Choice { options, .. }, Input::Reaction(emoji)) => options
                .iter()
                .find(|o| o.emoji == emoji)
                .map_or_else(
                    || Evaluation::Invalid("Pick one of the options.".to_string()),
                    |o| Evaluation::Answer(Answer::Choice(o.value.clone())),
                ),
            (Self::Choice { options, .. }, Input::Text(reply)) => {
                let typed = reply.content.trim();
                let by_number = typed
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| options.get(i));
                by_number
                    .or_else(|| {
                        options
                            .iter()
                            .find(|o| o.label.eq_ignore_ascii_case(typed) || o.value == typed)
                    })
                    .map_or_else(
                        || Evaluation::Invalid("Pick one of the options by reacting.".to_string()),
                        |o| Evaluation::Answer(Answer::Choice(o.value.clone())),
                    )
            }
            (Self::YesNo { .. }, Input::Reaction(emoji)) if emoji == YES => {
                Evaluation::Answer(Answer::Flag(true))
            }
            (Self::YesNo { .. }, Input::Reaction(emoji)) if emoji == NO => {
                Evaluation::Answer(Answer::Flag(false))
            }
            (Self::YesNo { .. }, Input::Text(reply)) => {
                match reply.content.trim().to_ascii_lowercase().as_str() {
                    "y" | "yes" => Evaluation::Answer(Answer::Flag(true)),
                    "n" | "no" => Evaluation::Answer(Answer::Flag(false)),
                    _ => Evaluation::Invalid(format!("React with {YES} or {NO}.")),
                }
            }
            _ => Evaluation::Invalid("That is not an answer to this question.".to_string()),
        }
    }
}

/// A recorded answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Typed (and validated) text
    Text(String),
    /// Value of the selected option
    Choice(String),
    /// Yes/no
    Flag(bool),
}

/// Answers collected so far, by step key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answers {
    values: BTreeMap<String, Answer>,
}

impl Answers {
    /// Records an answer.
    pub fn insert(&mut self, key: impl Into<String>, answer: Answer) {
        self.values.insert(key.into(), answer);
    }

    /// Raw answer.
    pub fn get(&self, key: &str) -> Option<&Answer> {
        self.values.get(key)
    }

    /// Text or choice value.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            Answer::Text(s) | Answer::Choice(s) => Some(s),
            Answer::Flag(_) => None,
        }
    }

    /// Yes/no value.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            Answer::Flag(b) => Some(*b),
            _ => None,
        }
    }

    /// Number of answers.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing was answered.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// How a wizard ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardOutcome {
    /// Every step was answered
    Completed(Answers),
    /// The user stopped it
    Cancelled,
    /// The user did not answer in time
    TimedOut,
}

/// A sequence of steps shown on one menu message.
#[derive(Debug)]
pub struct Wizard {
    title: String,
    image_url: Option<String>,
    steps: Vec<Step>,
}

impl Wizard {
    /// A wizard without steps.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            image_url: None,
            steps: Vec::new(),
        }
    }

    /// Shows `url` on every step.
    #[must_use]
    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Appends a step.
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Appends an unchecked text step.
    #[must_use]
    pub fn text(self, key: impl Into<String>, prompt: impl Into<String>) -> Self {
        self.step(Step::Text {
            key: key.into(),
            prompt: prompt.into(),
            validator: None,
            allow_attachment: false,
        })
    }

    /// Appends a text step checked by `validator`.
    #[must_use]
    pub fn validated_text(
        self,
        key: impl Into<String>,
        prompt: impl Into<String>,
        validator: impl Fn(&str, &Answers) -> Result<String, String> + Send + Sync + 'static,
    ) -> Self {
        self.step(Step::Text {
            key: key.into(),
            prompt: prompt.into(),
            validator: Some(Box::new(validator)),
            allow_attachment: false,
        })
    }

    /// Appends a text step that also accepts an attachment.
    #[must_use]
    pub fn attachment(
        self,
        key: impl Into<String>,
        prompt: impl Into<String>,
        validator: impl Fn(&str, &Answers) -> Result<String, String> + Send + Sync + 'static,
    ) -> Self {
        self.step(Step::Text {
            key: key.into(),
            prompt: prompt.into(),
            validator: Some(Box::new(validator)),
            allow_attachment: true,
        })
    }

    /// Appends a choice step.
    #[must_use]
    pub fn choice(
        self,
        key: impl Into<String>,
        prompt: impl Into<String>,
        options: Vec<MenuOption>,
    ) -> Self {
        self.step(Step::Choice {
            key: key.into(),
            prompt: prompt.into(),
            options,
        })
    }

    /// Appends a yes/no step.
    #[must_use]
    pub fn yes_no(self, key: impl Into<String>, prompt: impl Into<String>) -> Self {
        self.step(Step::YesNo {
            key: key.into(),
            prompt: prompt.into(),
        })
    }

    fn step_title(&self, index: usize) -> String {
        if self.steps.len() > 1 {
            format!("{} ({}/{})", self.title, index + 1, self.steps.len())
        } else {
            self.title.clone()
        }
    }

    /// Runs every step in order.
    ///
    /// An answer the validator rejects re-presents the same step with the
    /// problem appended. Cancelling or timing out closes the menu; a
    /// completed wizard leaves it open for the caller's next screen.
    pub async fn run(
        &self,
        conv: &mut dyn Conversation,
        timeout: Duration,
    ) -> Result<WizardOutcome, Error> {
        let mut answers = Answers::default();

        for (index, step) in self.steps.iter().enumerate() {
            let mut problem: Option<String> = None;
            let answer = loop {
                let mut screen = step.screen(self.step_title(index), problem.as_deref());
                screen.image_url.clone_from(&self.image_url);
                conv.present(&screen).await?;

                let Some(input) = wait_for_input(conv, &screen, timeout).await? else {
                    conv.close(Some(&Screen::new(&self.title, "Timed out.")))
                        .await?;
                    return Ok(WizardOutcome::TimedOut);
                };

                match step.evaluate(input, &answers) {
                    Evaluation::Answer(answer) => break answer,
                    Evaluation::Cancel => {
                        conv.close(Some(&Screen::new(&self.title, "Cancelled.")))
                            .await?;
                        return Ok(WizardOutcome::Cancelled);
                    }
                    Evaluation::Invalid(message) => problem = Some(message),
                }
            };
            answers.insert(step.key(), answer);
        }

        Ok(WizardOutcome::Completed(answers))
    }
}

/// Next input that means something on `screen`; stray reactions are ignored.
async fn wait_for_input(
    conv: &mut dyn Conversation,
    screen: &Screen,
    timeout: Duration,
) -> Result<Option<Input>, Error> {
    loop {
        match conv.next_input(true, timeout).await? {
            None => return Ok(None),
            Some(Input::Reaction(emoji)) if !screen.accepts(&emoji) => {}
            Some(input) => return Ok(Some(input)),
        }
    }
}

/// Asks the user to pick one option. `None` when they stop or time out.
pub async fn menu(
    conv: &mut dyn Conversation,
    title: &str,
    description: &str,
    options: Vec<MenuOption>,
    timeout: Duration,
) -> Result<Option<String>, Error> {
    let outcome = Wizard::new(title)
        .choice("choice", description, options)
        .run(conv, timeout)
        .await?;
    Ok(match outcome {
        WizardOutcome::Completed(answers) => answers.text("choice").map(str::to_string),
        WizardOutcome::Cancelled | WizardOutcome::TimedOut => None,
    })
}

/// Asks a yes/no question. `None` when the user stops or times out.
pub async fn confirm(
    conv: &mut dyn Conversation,
    title: &str,
    description: &str,
    timeout: Duration,
) -> Result<Option<bool>, Error> {
    confirm_wizard(Wizard::new(title), conv, description, timeout).await
}

/// [`confirm`] with an image shown above the buttons.
pub async fn confirm_with_image(
    conv: &mut dyn Conversation,
    title: &str,
    description: &str,
    image_url: &str,
    timeout: Duration,
) -> Result<Option<bool>, Error> {
    confirm_wizard(Wizard::new(title).image(image_url), conv, description, timeout).await
}

async fn confirm_wizard(
    wizard: Wizard,
    conv: &mut dyn Conversation,
    description: &str,
    timeout: Duration,
) -> Result<Option<bool>, Error> {
    let outcome = wizard.yes_no("confirm", description).run(conv, timeout).await?;
    Ok(match outcome {
        WizardOutcome::Completed(answers) => answers.flag("confirm"),
        WizardOutcome::Cancelled | WizardOutcome::TimedOut => None,
    })
}

/// Tracks which users have a menu open, so each user runs at most one.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    open: Arc<DashSet<UserId>>,
}

impl SessionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session for `user`, or `None` if one is already open.
    pub fn try_begin(&self, user: UserId) -> Option<SessionGuard> {
        self.open.insert(user).then(|| SessionGuard {
            open: Arc::clone(&self.open),
            user,
        })
    }

    /// Whether `user` has a session open.
    pub fn is_open(&self, user: UserId) -> bool {
        self.open.contains(&user)
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.open.len()
    }

    /// Whether no session is open.
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

/// An open session; dropping it closes the session.
#[derive(Debug)]
pub struct SessionGuard {
    open: Arc<DashSet<UserId>>,
    user: UserId,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.open.remove(&self.user);
    }
}
