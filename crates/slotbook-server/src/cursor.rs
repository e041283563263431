//! The sync cursor: when the last import ran and the credential it used.

use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::debug;

use slotbook_providers::Credential;

use crate::db::Database;
use crate::error::EngineResult;

/// Stored sync state. There is exactly one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncCursor {
    pub last_sync_at: Option<DateTime<Utc>>,
    pub credential: Option<Credential>,
}

#[derive(Debug, Clone)]
pub struct SyncCursorStore {
    db: Database,
}

impl SyncCursorStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn load(&self) -> EngineResult<SyncCursor> {
        self.db.read(|conn| {
            let cursor = conn.query_row(
                "SELECT last_sync_at, access_token, refresh_token, token_expiry
                 FROM sync_cursor WHERE id = 1",
                [],
                |row| {
                    let access_token: Option<String> = row.get(1)?;
                    let refresh_token: Option<String> = row.get(2)?;
                    let expires_at: Option<DateTime<Utc>> = row.get(3)?;
                    Ok(SyncCursor {
                        last_sync_at: row.get(0)?,
                        credential: access_token.map(|token| Credential {
                            access_token: token,
                            refresh_token,
                            expires_at,
                        }),
                    })
                },
            )?;
            Ok(cursor)
        })
    }

    /// Replaces the stored credential.
    pub fn store_credential(&self, credential: &Credential) -> EngineResult<()> {
        self.db.write(|tx| {
            tx.execute(
                "UPDATE sync_cursor SET access_token = ?1, refresh_token = ?2, token_expiry = ?3
                 WHERE id = 1",
                params![
                    credential.access_token,
                    credential.refresh_token,
                    credential.expires_at,
                ],
            )?;
            debug!("stored calendar credential");
            Ok(())
        })
    }

    /// Forgets the stored credential, e.g. after the provider rejected it.
    pub fn clear_credential(&self) -> EngineResult<()> {
        self.db.write(|tx| {
            tx.execute(
                "UPDATE sync_cursor SET access_token = NULL, refresh_token = NULL,
                     token_expiry = NULL
                 WHERE id = 1",
                [],
            )?;
            debug!("cleared calendar credential");
            Ok(())
        })
    }

    /// Moves the watermark for the next import.
    pub fn advance(&self, synced_at: DateTime<Utc>) -> EngineResult<()> {
        self.db.write(|tx| {
            tx.execute(
                "UPDATE sync_cursor SET last_sync_at = ?1 WHERE id = 1",
                [synced_at],
            )?;
            debug!(%synced_at, "advanced sync cursor");
            Ok(())
        })
    }
}
