use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::model::{Attachment, AttachmentEntry};
use crate::util::now_utc_string;

pub const DB_SCHEMA_VERSION: &str = "0.1.0";

/// Database filename under the cache root when no explicit path is given.
pub const DB_FILENAME: &str = "altaudit_media.sqlite";

/// Meta key under which the decorative flag is stored, one row per
/// attachment id.
pub const META_KEY_DECORATIVE: &str = "decorative";

/// Per-attachment metadata store. Handlers receive an implementation
/// explicitly; nothing reaches the store through globals.
pub trait MetaStore {
    /// Bulk read of every attachment with its decorative flag resolved,
    /// in one statement.
    fn load_attachments(&self) -> Result<Vec<Attachment>>;

    /// Upsert the literal flag string against `id`. The id is not required
    /// to refer to an existing attachment row.
    fn write_decorative_flag(&mut self, id: &str, value: &str) -> Result<()>;

    fn read_decorative_flag(&self, id: &str) -> Result<Option<String>>;
}

pub struct SqliteStore {
    connection: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let connection =
            Connection::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        configure_connection(&connection)?;
        ensure_schema(&connection)?;
        Ok(Self { connection })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let connection =
            Connection::open_in_memory().context("failed to open in-memory database")?;
        ensure_schema(&connection)?;
        Ok(Self { connection })
    }

    /// Upserts manifest entries; returns (attachments upserted, flags
    /// upserted). Entries without a decorative field leave any stored flag
    /// untouched.
    pub fn upsert_attachments(&mut self, entries: &[AttachmentEntry]) -> Result<(usize, usize)> {
        let tx = self
            .connection
            .transaction()
            .context("failed to begin ingest transaction")?;

        let mut attachments_upserted = 0;
        let mut flags_upserted = 0;

        {
            let mut upsert_attachment = tx.prepare(
                "INSERT INTO attachments(attachment_id, alt_text) VALUES (?1, ?2)
                 ON CONFLICT(attachment_id) DO UPDATE SET alt_text=excluded.alt_text",
            )?;
            let mut upsert_flag = tx.prepare(
                "INSERT INTO attachment_meta(attachment_id, meta_key, meta_value)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(attachment_id, meta_key) DO UPDATE SET meta_value=excluded.meta_value",
            )?;

            for entry in entries {
                upsert_attachment
                    .execute(params![entry.id, entry.alt_text])
                    .with_context(|| format!("failed to upsert attachment {}", entry.id))?;
                attachments_upserted += 1;

                if let Some(flag) = &entry.decorative {
                    upsert_flag
                        .execute(params![entry.id.to_string(), META_KEY_DECORATIVE, flag])
                        .with_context(|| format!("failed to upsert flag for {}", entry.id))?;
                    flags_upserted += 1;
                }
            }
        }

        tx.execute(
            "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            params![now_utc_string()],
        )?;

        tx.commit().context("failed to commit ingest transaction")?;

        Ok((attachments_upserted, flags_upserted))
    }

    pub fn count_attachments(&self) -> Result<i64> {
        query_count(&self.connection, "SELECT COUNT(*) FROM attachments")
    }

    pub fn count_decorative_flags(&self) -> Result<i64> {
        let count = self.connection.query_row(
            "SELECT COUNT(*) FROM attachment_meta WHERE meta_key = ?1",
            params![META_KEY_DECORATIVE],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn schema_version(&self) -> Result<Option<String>> {
        let version = self
            .connection
            .query_row(
                "SELECT value FROM metadata WHERE key = 'db_schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version)
    }
}

impl MetaStore for SqliteStore {
    fn load_attachments(&self) -> Result<Vec<Attachment>> {
        let mut statement = self.connection.prepare(
            "SELECT a.attachment_id, a.alt_text, m.meta_value
             FROM attachments a
             LEFT JOIN attachment_meta m
               ON m.attachment_id = CAST(a.attachment_id AS TEXT)
              AND m.meta_key = ?1
             ORDER BY a.attachment_id",
        )?;

        let rows = statement.query_map(params![META_KEY_DECORATIVE], |row| {
            let id: i64 = row.get(0)?;
            let alt_text: String = row.get(1)?;
            let flag: Option<String> = row.get(2)?;
            Ok(Attachment::from_stored(id, alt_text, flag.as_deref()))
        })?;

        let mut attachments = Vec::new();
        for row in rows {
            attachments.push(row.context("failed to read attachment row")?);
        }

        Ok(attachments)
    }

    fn write_decorative_flag(&mut self, id: &str, value: &str) -> Result<()> {
        self.connection
            .execute(
                "INSERT INTO attachment_meta(attachment_id, meta_key, meta_value)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(attachment_id, meta_key) DO UPDATE SET meta_value=excluded.meta_value",
                params![id, META_KEY_DECORATIVE, value],
            )
            .with_context(|| format!("failed to write decorative flag for id {id}"))?;
        Ok(())
    }

    fn read_decorative_flag(&self, id: &str) -> Result<Option<String>> {
        let value = self
            .connection
            .query_row(
                "SELECT meta_value FROM attachment_meta
                 WHERE attachment_id = ?1 AND meta_key = ?2",
                params![id, META_KEY_DECORATIVE],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> Result<()> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS attachments (
          attachment_id INTEGER PRIMARY KEY,
          alt_text TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS attachment_meta (
          attachment_id TEXT NOT NULL,
          meta_key TEXT NOT NULL,
          meta_value TEXT NOT NULL,
          PRIMARY KEY (attachment_id, meta_key)
        );
        ",
    )?;

    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![DB_SCHEMA_VERSION],
    )?;

    Ok(())
}

fn query_count(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
