//! Reminders delivered by direct message, once or on a schedule.

use canary_common::{format_timestamp, single_line, truncate_string, UserId, DISCORD_MESSAGE_LIMIT};
use canary_db::{Database, DbResult, Frequency, NewReminder, Reminder};
use chrono::{DateTime, Duration as TimeDelta, Months, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use poise::serenity_prelude as serenity;
use regex::Regex;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::discord::DiscordConversation;
use crate::framework::{user_error, Context, Error};
use crate::pages::{Pages, PagesOutcome};
use crate::wizard::{confirm, Conversation};

/// Longest relative delay accepted.
pub const MAX_DELAY_DAYS: i64 = 365;

/// Longest reminder text accepted.
pub const MAX_REMINDER_LENGTH: usize = 1000;

static DURATION_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*([a-z]+)").expect("duration pattern is valid"));

/// When a reminder should fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum When {
    /// Every period, starting one period from now
    Repeating(Frequency),
    /// Once, after the delay
    In(TimeDelta),
}

impl When {
    /// Stored frequency.
    pub const fn frequency(self) -> Frequency {
        match self {
            Self::Repeating(frequency) => frequency,
            Self::In(_) => Frequency::Once,
        }
    }

    /// First due time counted from `now`.
    pub fn first_due(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Repeating(frequency) => advance(now, frequency),
            Self::In(delay) => now + delay,
        }
    }
}

fn unit_seconds(unit: &str) -> Option<i64> {
    match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => Some(1),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(60),
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(3600),
        "d" | "day" | "days" => Some(86_400),
        "w" | "wk" | "wks" | "week" | "weeks" => Some(604_800),
        _ => None,
    }
}

fn is_separator(text: &str) -> bool {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .all(|word| word.is_empty() || word.eq_ignore_ascii_case("and"))
}

/// Parses `2h30m`, `3 days`, `1w, 2d` or `1 hour and 5 minutes`.
pub fn parse_duration(input: &str) -> Result<TimeDelta, String> {
    let mut seconds: i64 = 0;
    let mut consumed = 0;
    let mut parts = 0;

    for caps in DURATION_PART.captures_iter(input) {
        let (Some(whole), Some(amount), Some(unit)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        if !is_separator(&input[consumed..whole.start()]) {
            return Err(format!("I don't understand `{}`.", input.trim()));
        }
        let unit = unit.as_str().to_ascii_lowercase();
        let per_unit =
            unit_seconds(&unit).ok_or_else(|| format!("`{unit}` is not a unit of time."))?;
        seconds = amount
            .as_str()
            .parse::<i64>()
            .ok()
            .and_then(|n| n.checked_mul(per_unit))
            .and_then(|s| s.checked_add(seconds))
            .ok_or_else(|| "That is too far away.".to_string())?;
        consumed = whole.end();
        parts += 1;
    }

    if parts == 0 || !is_separator(&input[consumed..]) {
        return Err(format!("I don't understand `{}`.", input.trim()));
    }
    TimeDelta::try_seconds(seconds).ok_or_else(|| "That is too far away.".to_string())
}

/// Parses the `<when>` part of `remindme`.
pub fn parse_when(input: &str) -> Result<When, String> {
    let lowered = input.trim().to_lowercase();
    match lowered.as_str() {
        "daily" => return Ok(When::Repeating(Frequency::Daily)),
        "weekly" => return Ok(When::Repeating(Frequency::Weekly)),
        "monthly" => return Ok(When::Repeating(Frequency::Monthly)),
        _ => {}
    }

    let relative = lowered.strip_prefix("in ").unwrap_or(&lowered);
    let delay = parse_duration(relative)?;
    if delay <= TimeDelta::zero() {
        return Err("The delay must be positive.".to_string());
    }
    if delay > TimeDelta::days(MAX_DELAY_DAYS) {
        return Err(format!("I can only remember things up to {MAX_DELAY_DAYS} days ahead."));
    }
    Ok(When::In(delay))
}

fn token_ends(input: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut in_token = false;
    for (i, c) in input.char_indices() {
        if c.is_whitespace() {
            if in_token {
                ends.push(i);
            }
            in_token = false;
        } else {
            in_token = true;
        }
    }
    if in_token {
        ends.push(input.len());
    }
    ends
}

fn looks_like_delay(head: &str) -> bool {
    let lowered = head.to_lowercase();
    parse_duration(lowered.strip_prefix("in ").unwrap_or(&lowered)).is_ok()
}

/// Splits `remindme` input into the longest leading `<when>` and the text.
pub fn split_when(input: &str) -> Result<(When, String), String> {
    let input = input.trim();
    let mut out_of_range = None;
    let mut without_text = false;

    for end in token_ends(input).into_iter().rev() {
        let head = &input[..end];
        match parse_when(head) {
            Ok(when) => {
                let text = input[end..].trim();
                if text.is_empty() {
                    without_text = true;
                    continue;
                }
                return Ok((when, text.to_string()));
            }
            Err(e) if out_of_range.is_none() && looks_like_delay(head) => {
                out_of_range = Some(e);
            }
            Err(_) => {}
        }
    }

    if without_text {
        return Err("What should I remind you about?".to_string());
    }
    Err(out_of_range.unwrap_or_else(|| {
        "Start with when: `daily`, `weekly`, `monthly` or a delay like `in 2h30m`.".to_string()
    }))
}

/// The next occurrence after `due`.
pub fn advance(due: DateTime<Utc>, frequency: Frequency) -> DateTime<Utc> {
    match frequency {
        Frequency::Once => due,
        Frequency::Daily => due + TimeDelta::days(1),
        Frequency::Weekly => due + TimeDelta::weeks(1),
        Frequency::Monthly => due
            .checked_add_months(Months::new(1))
            .unwrap_or_else(|| due + TimeDelta::days(30)),
    }
}

/// What to do with a reminder that came due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueAction {
    /// Row id
    pub reminder_id: i64,
    /// Who to message
    pub user_id: UserId,
    /// What to say
    pub text: String,
    /// Next occurrence for repeating reminders; `None` deletes it
    pub next: Option<DateTime<Utc>>,
}

/// Actions for every reminder due at `now`. Repeating reminders skip to
/// their first occurrence after `now`, so missed periods fire once.
pub fn due_actions(now: DateTime<Utc>, reminders: &[Reminder]) -> Vec<DueAction> {
    reminders
        .iter()
        .filter(|r| r.due_at <= now)
        .map(|r| {
            let next = r.frequency.is_repeating().then(|| {
                let mut next = advance(r.due_at, r.frequency);
                while next <= now {
                    next = advance(next, r.frequency);
                }
                next
            });
            DueAction {
                reminder_id: r.id,
                user_id: r.user_id,
                text: r.reminder.clone(),
                next,
            }
        })
        .collect()
}

/// Reschedules or deletes a reminder after delivery.
pub async fn record_delivery(db: &Database, action: &DueAction, now: DateTime<Utc>) -> DbResult<()> {
    match action.next {
        Some(next) => {
            db.reschedule_reminder(action.reminder_id, next, now).await?;
        }
        None => {
            db.delete_reminder(action.reminder_id).await?;
        }
    }
    Ok(())
}

async fn deliver_due(ctx: &serenity::Context, db: &Database, now: DateTime<Utc>) -> Result<usize, Error> {
    let due = db.due_reminders(now).await?;
    let actions = due_actions(now, &due);
    for action in &actions {
        if action.user_id.0 != 0 {
            let text = truncate_string(&format!("⏰ Reminder: {}", action.text), DISCORD_MESSAGE_LIMIT);
            let user = serenity::UserId::new(action.user_id.0);
            if let Err(e) = user
                .direct_message(ctx, serenity::CreateMessage::new().content(text))
                .await
            {
                warn!(user = %action.user_id, "Could not deliver reminder: {}", e);
            }
        }
        record_delivery(db, action, now).await?;
    }
    Ok(actions.len())
}

/// Delivers due reminders every `interval` until the task is dropped.
pub async fn run_reminder_loop(ctx: serenity::Context, db: Database, interval: Duration) {
    info!(interval_secs = interval.as_secs(), "Reminder loop started");
    let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match deliver_due(&ctx, &db, Utc::now()).await {
            Ok(0) => {}
            Ok(count) => debug!(count, "Delivered reminders"),
            Err(e) => error!("Reminder delivery failed: {}", e),
        }
    }
}

fn describe(when: When, due: DateTime<Utc>, tz: Tz) -> String {
    match when {
        When::Repeating(frequency) => format!(
            "{frequency}, starting {}",
            format_timestamp(due, tz)
        ),
        When::In(_) => format!("on {}", format_timestamp(due, tz)),
    }
}

/// Set a reminder: `daily`, `weekly`, `monthly` or a delay like `in 2h30m`, then the text
#[poise::command(prefix_command, slash_command, category = "Reminders")]
pub async fn remindme(
    ctx: Context<'_>,
    #[description = "When, then what to remind you about"]
    #[rest]
    input: String,
) -> Result<(), Error> {
    let data = ctx.data();
    let (when, text) = split_when(&input).map_err(user_error)?;
    if text.chars().count() > MAX_REMINDER_LENGTH {
        return Err(user_error(format!(
            "Reminders can be at most {MAX_REMINDER_LENGTH} characters long."
        )));
    }

    let user = UserId(ctx.author().id.get());
    let due_at = when.first_due(Utc::now());
    let id = data
        .db
        .add_reminder(&NewReminder {
            user_id: user,
            name: truncate_string(&single_line(&text), 50),
            reminder: text,
            frequency: when.frequency(),
            due_at,
        })
        .await?;
    info!(id, user = %user, frequency = %when.frequency(), "Reminder set");
    ctx.say(format!(
        "Got it, I'll remind you {} (#{id}).",
        describe(when, due_at, data.config.timezone())
    ))
    .await?;
    Ok(())
}

fn list_line(reminder: &Reminder, tz: Tz) -> String {
    format!(
        "#{} {} ({}, next {})",
        reminder.id,
        reminder.name,
        reminder.frequency,
        format_timestamp(reminder.due_at, tz)
    )
}

/// Pages of the user's reminders; selecting one offers to delete it.
pub async fn list_flow(
    conv: &mut dyn Conversation,
    db: &Database,
    user: UserId,
    tz: Tz,
    page_size: usize,
    timeout: Duration,
) -> Result<(), Error> {
    loop {
        let reminders = db.reminders_for(user).await?;
        let lines = reminders.iter().map(|r| list_line(r, tz)).collect();
        let mut pages = Pages::new("Your reminders", lines, page_size).selectable(true);

        let PagesOutcome::Selected(index) = pages.run(conv, timeout).await? else {
            return Ok(());
        };
        let Some(reminder) = reminders.get(index) else {
            continue;
        };
        let question = format!("{}\n\nDelete this reminder?", reminder.reminder);
        if confirm(conv, &format!("Reminder #{}", reminder.id), &question, timeout).await?
            == Some(true)
            && db.delete_user_reminder(reminder.id, user).await?
        {
            info!(id = reminder.id, user = %user, "Reminder deleted");
            conv.notify(&format!("Deleted reminder #{}.", reminder.id))
                .await?;
        }
    }
}

/// List your reminders
#[poise::command(prefix_command, slash_command, category = "Reminders")]
pub async fn reminders(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let user = UserId(ctx.author().id.get());
    let Some(_session) = data.sessions.try_begin(user) else {
        ctx.say("You already have a menu open. Finish or stop it first.")
            .await?;
        return Ok(());
    };
    let mut conv = DiscordConversation::new(ctx);
    list_flow(
        &mut conv,
        &data.db,
        user,
        data.config.timezone(),
        data.config.general.page_size,
        data.config.wizard_timeout(),
    )
    .await
}

/// Manage a single reminder
#[poise::command(
    prefix_command,
    slash_command,
    subcommands("remove"),
    subcommand_required,
    category = "Reminders"
)]
pub async fn reminder(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Delete one of your reminders by its number
#[poise::command(prefix_command, slash_command)]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Reminder number"] id: i64,
) -> Result<(), Error> {
    let user = UserId(ctx.author().id.get());
    if !ctx.data().db.delete_user_reminder(id, user).await? {
        return Err(user_error(format!("You have no reminder #{id}.")));
    }
    info!(id, user = %user, "Reminder deleted");
    ctx.say(format!("Deleted reminder #{id}.")).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::PageControl;
    use crate::testing::ScriptedConversation;
    use crate::wizard::YES;
    use canary_common::test_utils::mock_timestamp;

    fn reminder(id: i64, frequency: Frequency, due_at: DateTime<Utc>) -> Reminder {
        Reminder {
            id,
            user_id: UserId(7),
            name: format!("r{id}"),
            reminder: format!("text {id}"),
            frequency,
            due_at,
            last_reminded_at: None,
        }
    }

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("2h30m"), Ok(TimeDelta::minutes(150)));
        assert_eq!(parse_duration("3 days"), Ok(TimeDelta::days(3)));
        assert_eq!(parse_duration("1w 2d"), Ok(TimeDelta::days(9)));
        assert_eq!(parse_duration("90 minutes"), Ok(TimeDelta::minutes(90)));
        assert_eq!(
            parse_duration("1 hour and 5 Minutes"),
            Ok(TimeDelta::minutes(65))
        );
        assert!(parse_duration("3 parsecs").is_err());
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("2h later").is_err());
    }

    #[test]
    fn test_parse_when_bounds() {
        assert_eq!(parse_when("Daily"), Ok(When::Repeating(Frequency::Daily)));
        assert_eq!(parse_when("in 10s"), Ok(When::In(TimeDelta::seconds(10))));
        assert!(parse_when("in 0m").is_err());
        assert!(parse_when("366 days").is_err());
        assert_eq!(parse_when("365 days"), Ok(When::In(TimeDelta::days(365))));
        assert!(parse_when("99999999999999999999 weeks").is_err());
    }

    #[test]
    fn test_split_when_takes_longest_prefix() {
        assert_eq!(
            split_when("in 2 hours 30 minutes take a break"),
            Ok((When::In(TimeDelta::minutes(150)), "take a break".to_string()))
        );
        assert_eq!(
            split_when("weekly  water the plants\nand the cat"),
            Ok((
                When::Repeating(Frequency::Weekly),
                "water the plants\nand the cat".to_string()
            ))
        );
        assert_eq!(
            split_when("in 5m"),
            Err("What should I remind you about?".to_string())
        );
        assert!(split_when("tomorrow buy milk").is_err());
        assert!(split_when("in 400 days party").unwrap_err().contains("365"));
    }

    #[test]
    fn test_advance_monthly_clamps() {
        let jan31 = mock_timestamp(2024, 1, 31, 9, 0, 0);
        assert_eq!(advance(jan31, Frequency::Monthly), mock_timestamp(2024, 2, 29, 9, 0, 0));
        assert_eq!(advance(jan31, Frequency::Weekly), mock_timestamp(2024, 2, 7, 9, 0, 0));
        assert_eq!(advance(jan31, Frequency::Once), jan31);
    }

    #[test]
    fn test_due_actions() {
        let now = mock_timestamp(2024, 3, 10, 12, 0, 0);
        let reminders = [
            reminder(1, Frequency::Once, mock_timestamp(2024, 3, 10, 11, 0, 0)),
            reminder(2, Frequency::Daily, mock_timestamp(2024, 3, 7, 12, 0, 0)),
            reminder(3, Frequency::Weekly, mock_timestamp(2024, 3, 11, 0, 0, 0)),
            reminder(4, Frequency::Daily, now),
        ];
        let actions = due_actions(now, &reminders);
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0].next, None);
        // three missed days collapse into one delivery
        assert_eq!(actions[1].next, Some(mock_timestamp(2024, 3, 11, 12, 0, 0)));
        assert_eq!(actions[2].reminder_id, 4);
        assert_eq!(actions[2].next, Some(mock_timestamp(2024, 3, 11, 12, 0, 0)));
    }

    #[tokio::test]
    async fn test_record_delivery() {
        let db = Database::in_memory().await.unwrap();
        let now = mock_timestamp(2024, 3, 10, 12, 0, 0);
        for frequency in [Frequency::Once, Frequency::Daily] {
            db.add_reminder(&NewReminder {
                user_id: UserId(7),
                name: "n".to_string(),
                reminder: "t".to_string(),
                frequency,
                due_at: now,
            })
            .await
            .unwrap();
        }

        let due = db.due_reminders(now).await.unwrap();
        for action in due_actions(now, &due) {
            record_delivery(&db, &action, now).await.unwrap();
        }

        let left = db.reminders_for(UserId(7)).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].frequency, Frequency::Daily);
        assert_eq!(left[0].due_at, mock_timestamp(2024, 3, 11, 12, 0, 0));
        assert_eq!(left[0].last_reminded_at, Some(now));
    }

    #[tokio::test]
    async fn test_list_flow_deletes_after_confirm() {
        let db = Database::in_memory().await.unwrap();
        let id = db
            .add_reminder(&NewReminder {
                user_id: UserId(7),
                name: "stretch".to_string(),
                reminder: "stretch your legs".to_string(),
                frequency: Frequency::Daily,
                due_at: mock_timestamp(2024, 3, 10, 12, 0, 0),
            })
            .await
            .unwrap();
        let mut conv = ScriptedConversation::new()
            .react(PageControl::Select.emoji())
            .text("1")
            .react(YES)
            .react(PageControl::Stop.emoji());

        list_flow(&mut conv, &db, UserId(7), chrono_tz::UTC, 5, Duration::from_secs(30))
            .await
            .unwrap();
        assert!(db.reminders_for(UserId(7)).await.unwrap().is_empty());
        assert_eq!(conv.notices, vec![format!("Deleted reminder #{id}.")]);
    }
}
