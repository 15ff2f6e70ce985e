//! Integration tests for canary-common crate.

use canary_common::{
    escape_markdown, parse_local_datetime, truncate_string, CanaryError, ChannelId, UserId,
    DISCORD_MESSAGE_LIMIT,
};
use chrono::TimeZone;
use proptest::prelude::*;
use std::collections::HashMap;

#[test]
fn test_ids_usable_as_map_keys() {
    let mut map = HashMap::new();
    map.insert(UserId(1), "one");
    map.insert(UserId(2), "two");
    assert_eq!(map.get(&UserId(1)), Some(&"one"));
    assert_eq!(format!("{}", ChannelId(99)), "99");
}

#[test]
fn test_error_conversion_from_io() {
    fn read() -> canary_common::Result<String> {
        Ok(std::fs::read_to_string("/definitely/not/here")?)
    }
    let err = read().unwrap_err();
    assert!(matches!(err, CanaryError::Io(_)));
}

#[test]
fn test_local_datetime_utc_passthrough() {
    let parsed = parse_local_datetime(" 2025-02-01 00:00 ", chrono_tz::UTC).unwrap();
    assert_eq!(parsed, chrono::Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
}

proptest! {
    #[test]
    fn test_truncate_never_exceeds_limit(input in ".{0,300}", limit in 1usize..100) {
        let truncated = truncate_string(&input, limit);
        prop_assert!(truncated.chars().count() <= input.chars().count().max(limit));
        if input.chars().count() <= limit {
            prop_assert_eq!(truncated, input);
        }
    }

    #[test]
    fn test_escape_markdown_only_grows(input in "[a-z*_`~|]{0,64}") {
        let escaped = escape_markdown(&input);
        prop_assert!(escaped.len() >= input.len());
        prop_assert!(escaped.len() <= input.len() * 2);
    }
}

#[test]
fn test_message_limit_constant() {
    assert_eq!(DISCORD_MESSAGE_LIMIT, 2000);
}
