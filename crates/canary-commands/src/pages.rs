//! Reaction-driven paginator.

use std::time::Duration;

use crate::framework::Error;
use crate::wizard::{Conversation, Input, Screen, Wizard, WizardOutcome};

/// A control of the paginator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageControl {
    /// Jump to the first page
    First,
    /// Previous page, wrapping to the last
    Previous,
    /// Next page, wrapping to the first
    Next,
    /// Jump to the last page
    Last,
    /// Close the paginator
    Stop,
    /// Pick an item by number
    Select,
}

impl PageControl {
    const NAVIGATION: [Self; 5] = [Self::First, Self::Previous, Self::Next, Self::Last, Self::Stop];

    /// Emoji of the control.
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::First => "⏮",
            Self::Previous => "◀",
            Self::Next => "▶",
            Self::Last => "⏭",
            Self::Stop => "⏹",
            Self::Select => "✏",
        }
    }

    /// The control an emoji stands for.
    pub fn from_emoji(emoji: &str) -> Option<Self> {
        [
            Self::First,
            Self::Previous,
            Self::Next,
            Self::Last,
            Self::Stop,
            Self::Select,
        ]
        .into_iter()
        .find(|c| c.emoji() == emoji)
    }
}

/// Effect of a control on the paginator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    /// Now showing another page
    Changed,
    /// Nothing to redraw
    Unchanged,
    /// The user closed it
    Stop,
    /// The user wants to pick an item
    Select,
}

/// How a paginator ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagesOutcome {
    /// Closed with the stop control
    Closed,
    /// No input in time
    TimedOut,
    /// Index of the picked item, from zero
    Selected(usize),
}

/// A numbered list split into pages.
#[derive(Debug, Clone)]
pub struct Pages {
    title: String,
    items: Vec<String>,
    per_page: usize,
    page: usize,
    selectable: bool,
}

impl Pages {
    /// Pages of `per_page` items each.
    pub fn new(title: impl Into<String>, items: Vec<String>, per_page: usize) -> Self {
        Self {
            title: title.into(),
            items,
            per_page: per_page.max(1),
            page: 0,
            selectable: false,
        }
    }

    /// Offers the select control.
    #[must_use]
    pub const fn selectable(mut self, selectable: bool) -> Self {
        self.selectable = selectable;
        self
    }

    /// Number of pages; an empty list still has one.
    pub fn page_count(&self) -> usize {
        self.items.len().div_ceil(self.per_page).max(1)
    }

    /// Current page, from zero.
    pub const fn current_page(&self) -> usize {
        self.page
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there is nothing to show.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Applies a control.
    pub fn apply(&mut self, control: PageControl) -> PageEvent {
        let last = self.page_count() - 1;
        let target = match control {
            PageControl::Stop => return PageEvent::Stop,
            PageControl::Select if self.selectable && !self.is_empty() => {
                return PageEvent::Select
            }
            PageControl::Select => return PageEvent::Unchanged,
            PageControl::First => 0,
            PageControl::Last => last,
            PageControl::Previous if self.page == 0 => last,
            PageControl::Previous => self.page - 1,
            PageControl::Next if self.page == last => 0,
            PageControl::Next => self.page + 1,
        };
        if target == self.page {
            PageEvent::Unchanged
        } else {
            self.page = target;
            PageEvent::Changed
        }
    }

    /// The current page with its controls.
    pub fn render(&self) -> Screen {
        let start = self.page * self.per_page;
        let description = if self.is_empty() {
            "Nothing to show.".to_string()
        } else {
            self.items
                .iter()
                .enumerate()
                .skip(start)
                .take(self.per_page)
                .map(|(i, item)| format!("**{}.** {}", i + 1, item))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let mut screen = Screen::new(&self.title, description)
            .footer(format!("Page {}/{}", self.page + 1, self.page_count()));
        for control in PageControl::NAVIGATION {
            screen = screen.control(control.emoji(), "");
        }
        if self.selectable && !self.is_empty() {
            screen = screen.control(PageControl::Select.emoji(), "Select an entry");
        }
        screen
    }

    /// Shows the pages until the user closes them, picks an item or stops
    /// answering. The last page shown stays up without controls.
    pub async fn run(
        &mut self,
        conv: &mut dyn Conversation,
        timeout: Duration,
    ) -> Result<PagesOutcome, Error> {
        conv.present(&self.render()).await?;
        loop {
            let Some(input) = conv.next_input(false, timeout).await? else {
                conv.close(Some(&self.render())).await?;
                return Ok(PagesOutcome::TimedOut);
            };
            let Input::Reaction(emoji) = input else {
                continue;
            };
            let Some(control) = PageControl::from_emoji(&emoji) else {
                continue;
            };
            match self.apply(control) {
                PageEvent::Changed => conv.present(&self.render()).await?,
                PageEvent::Unchanged => {}
                PageEvent::Stop => {
                    conv.close(Some(&self.render())).await?;
                    return Ok(PagesOutcome::Closed);
                }
                PageEvent::Select => {
                    if let Some(index) = self.ask_index(conv, timeout).await? {
                        return Ok(PagesOutcome::Selected(index));
                    }
                    conv.present(&self.render()).await?;
                }
            }
        }
    }

    async fn ask_index(
        &self,
        conv: &mut dyn Conversation,
        timeout: Duration,
    ) -> Result<Option<usize>, Error> {
        let count = self.len();
        let outcome = Wizard::new(&self.title)
            .validated_text(
                "index",
                format!("Type the number of the entry, from 1 to {count}."),
                move |value, _| match value.parse::<usize>() {
                    Ok(n) if (1..=count).contains(&n) => Ok(n.to_string()),
                    _ => Err(format!("Pick a number from 1 to {count}.")),
                },
            )
            .run(conv, timeout)
            .await?;
        Ok(match outcome {
            WizardOutcome::Completed(answers) => answers
                .text("index")
                .and_then(|n| n.parse::<usize>().ok())
                .map(|n| n - 1),
            WizardOutcome::Cancelled | WizardOutcome::TimedOut => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedConversation;

    const T: Duration = Duration::from_secs(30);

    fn items(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("item {i}")).collect()
    }

    #[test]
    fn test_page_count() {
        assert_eq!(Pages::new("t", items(0), 5).page_count(), 1);
        assert_eq!(Pages::new("t", items(5), 5).page_count(), 1);
        assert_eq!(Pages::new("t", items(6), 5).page_count(), 2);
        assert_eq!(Pages::new("t", items(3), 0).page_count(), 3);
    }

    #[test]
    fn test_navigation_wraps() {
        let mut pages = Pages::new("t", items(12), 5);
        assert_eq!(pages.apply(PageControl::Previous), PageEvent::Changed);
        assert_eq!(pages.current_page(), 2);
        assert_eq!(pages.apply(PageControl::Next), PageEvent::Changed);
        assert_eq!(pages.current_page(), 0);
        assert_eq!(pages.apply(PageControl::First), PageEvent::Unchanged);
        assert_eq!(pages.apply(PageControl::Last), PageEvent::Changed);
        assert_eq!(pages.apply(PageControl::Last), PageEvent::Unchanged);
        assert_eq!(pages.apply(PageControl::Stop), PageEvent::Stop);
    }

    #[test]
    fn test_single_page_never_changes() {
        let mut pages = Pages::new("t", items(2), 5);
        assert_eq!(pages.apply(PageControl::Next), PageEvent::Unchanged);
        assert_eq!(pages.apply(PageControl::Previous), PageEvent::Unchanged);
    }

    #[test]
    fn test_render_numbers_globally() {
        let mut pages = Pages::new("List", items(7), 3);
        pages.apply(PageControl::Next);
        let screen = pages.render();
        assert_eq!(screen.description, "**4.** item 4\n**5.** item 5\n**6.** item 6");
        assert_eq!(screen.footer.as_deref(), Some("Page 2/3"));
        assert!(!screen.accepts(PageControl::Select.emoji()));
    }

    #[test]
    fn test_render_empty() {
        let pages = Pages::new("List", Vec::new(), 3).selectable(true);
        let screen = pages.render();
        assert_eq!(screen.description, "Nothing to show.");
        assert_eq!(screen.footer.as_deref(), Some("Page 1/1"));
        assert!(!screen.accepts(PageControl::Select.emoji()));
    }

    #[test]
    fn test_from_emoji() {
        assert_eq!(PageControl::from_emoji("▶"), Some(PageControl::Next));
        assert_eq!(PageControl::from_emoji("🍕"), None);
    }

    #[tokio::test]
    async fn test_run_until_stop() {
        let mut conv = ScriptedConversation::new()
            .react(PageControl::Next.emoji())
            .react(PageControl::First.emoji())
            .react(PageControl::First.emoji())
            .react(PageControl::Stop.emoji());
        let mut pages = Pages::new("List", items(8), 5);

        assert_eq!(pages.run(&mut conv, T).await.unwrap(), PagesOutcome::Closed);
        // initial, next, first; the repeated first redraws nothing
        assert_eq!(conv.presented.len(), 3);
        assert_eq!(conv.closed.len(), 1);
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let mut conv = ScriptedConversation::new();
        let mut pages = Pages::new("List", items(1), 5);
        assert_eq!(pages.run(&mut conv, T).await.unwrap(), PagesOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_select_returns_zero_based_index() {
        let mut conv = ScriptedConversation::new()
            .react(PageControl::Select.emoji())
            .text("0")
            .text("12")
            .text("7");
        let mut pages = Pages::new("List", items(8), 5).selectable(true);
        assert_eq!(
            pages.run(&mut conv, T).await.unwrap(),
            PagesOutcome::Selected(6)
        );
    }

    #[tokio::test]
    async fn test_cancelled_select_returns_to_pages() {
        let mut conv = ScriptedConversation::new()
            .react(PageControl::Select.emoji())
            .text("cancel")
            .react(PageControl::Stop.emoji());
        let mut pages = Pages::new("List", items(2), 5).selectable(true);
        assert_eq!(pages.run(&mut conv, T).await.unwrap(), PagesOutcome::Closed);
        assert_eq!(conv.last_screen().unwrap().footer.as_deref(), Some("Page 1/1"));
    }
}
