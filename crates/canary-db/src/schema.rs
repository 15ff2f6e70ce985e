//! Table definitions and schema versioning.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

/// Database schema version for migrations
pub const SCHEMA_VERSION: i64 = 1;

const TABLES: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS members (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS quotes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        quote TEXT NOT NULL,
        created_at DATETIME NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS custom_reactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        prompt TEXT NOT NULL,
        response TEXT NOT NULL,
        user_id INTEGER NOT NULL,
        delete_prompt BOOLEAN NOT NULL DEFAULT 0,
        anywhere BOOLEAN NOT NULL DEFAULT 0,
        dm BOOLEAN NOT NULL DEFAULT 0,
        proposal BOOLEAN NOT NULL DEFAULT 0,
        created_at DATETIME NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS reminders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        reminder TEXT NOT NULL,
        frequency TEXT NOT NULL DEFAULT 'once',
        due_at DATETIME NOT NULL,
        last_reminded_at DATETIME
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS muted_users (
        user_id INTEGER PRIMARY KEY,
        role_ids TEXT NOT NULL, -- JSON array
        muted_at DATETIME NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS previous_roles (
        user_id INTEGER PRIMARY KEY,
        role_ids TEXT NOT NULL, -- JSON array
        saved_at DATETIME NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS banner_submissions (
        user_id INTEGER PRIMARY KEY,
        image_url TEXT NOT NULL,
        message_id INTEGER NOT NULL,
        submitted_at DATETIME NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS reactions (
        reacter_id INTEGER NOT NULL,
        reactee_id INTEGER NOT NULL,
        reaction_name TEXT NOT NULL,
        message_id INTEGER NOT NULL,
        PRIMARY KEY (reacter_id, reactee_id, reaction_name, message_id)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL -- JSON
    )
    ",
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_quotes_user_id ON quotes(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_custom_reactions_proposal ON custom_reactions(proposal)",
    "CREATE INDEX IF NOT EXISTS idx_reminders_user_id ON reminders(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_reactions_reactee_id ON reactions(reactee_id)",
];

/// Create every table that does not exist yet and record the schema version.
pub async fn initialize(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        ",
    )
    .execute(pool)
    .await?;

    let current_version: Option<i64> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    match current_version {
        Some(version) if version >= SCHEMA_VERSION => {
            debug!("Database schema is up to date (version {})", version);
            return Ok(());
        }
        Some(version) => {
            info!(
                "Upgrading database schema from version {} to {}",
                version, SCHEMA_VERSION
            );
        }
        None => {
            info!("Creating initial database schema (version {})", SCHEMA_VERSION);
        }
    }

    for statement in TABLES.iter().chain(INDEXES) {
        sqlx::query(statement).execute(pool).await?;
    }

    sqlx::query("INSERT OR REPLACE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// Applied schema version, if any.
pub async fn current_version(pool: &SqlitePool) -> DbResult<Option<i64>> {
    let version =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;
    Ok(version)
}
