//! Integration tests for canary-config crate.

use canary_common::test_utils::config_fixtures;
use canary_config::ConfigLoader;
use std::io::Write;

fn write_temp(name: &str, content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    (dir, path)
}

#[test]
fn test_minimal_yaml_fills_defaults() {
    let (_dir, path) = write_temp("config.yaml", config_fixtures::minimal_config_yaml());
    let config = ConfigLoader::parse_file(&path).unwrap();

    assert_eq!(config.discord.token, "test_token");
    assert_eq!(config.discord.guild_id, 123_456_789_012_345_678);
    assert_eq!(config.discord.prefix, "?");
    assert_eq!(config.general.page_size, 10);
    assert!(config.custom_reactions.enabled);
    assert!(config.validate().is_ok());
}

#[test]
fn test_full_yaml() {
    let (_dir, path) = write_temp("config.yml", config_fixtures::full_config_yaml());
    let config = ConfigLoader::parse_file(&path).unwrap();

    assert_eq!(config.discord.prefix, "!");
    assert_eq!(config.discord.owner_ids, vec![42]);
    assert_eq!(config.general.page_size, 8);
    assert_eq!(config.roles.categories.len(), 2);
    assert!(config.roles.categories["year"].exclusive);
    assert_eq!(config.banner.submissions_channel_id, 777);
    assert_eq!(config.reminders.poll_interval_seconds, 30);
    assert_eq!(
        config.logging.format,
        canary_common::logging::LogFormat::Compact
    );
    assert_eq!(config.timezone(), chrono_tz::America::Toronto);

    let (name, category) = config.category_of("u2").unwrap();
    assert_eq!(name, "year");
    assert!(category.exclusive);
    assert!(config.category_of("Astronaut").is_none());
}

#[test]
fn test_toml_config() {
    let toml = r#"
[discord]
token = "toml_token"
prefix = "$"

[general]
page_size = 5
"#;
    let (_dir, path) = write_temp("config.toml", toml);
    let config = ConfigLoader::parse_file(&path).unwrap();
    assert_eq!(config.discord.token, "toml_token");
    assert_eq!(config.discord.prefix, "$");
    assert_eq!(config.general.page_size, 5);
}

#[test]
fn test_invalid_yaml_is_reported() {
    let (_dir, path) = write_temp("config.yaml", "discord: [unterminated");
    assert!(ConfigLoader::parse_file(&path).is_err());
}
