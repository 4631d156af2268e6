//! Scan-state persistence: one `(uidvalidity, last_uid)` watermark per
//! mailbox, written atomically via upsert after each successful pass.

use rusqlite::{params, Connection, OptionalExtension};

use super::StoreError;
use crate::mail::Watermark;

pub fn load(conn: &Connection, mailbox: &str) -> Result<Option<Watermark>, StoreError> {
    let row = conn
        .query_row(
            "SELECT uidvalidity, last_uid FROM scan_state WHERE mailbox = ?1",
            params![mailbox],
            |r| {
                Ok(Watermark {
                    uidvalidity: r.get(0)?,
                    last_uid: r.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn save(
    conn: &Connection,
    mailbox: &str,
    watermark: Watermark,
    updated_at: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO scan_state (mailbox, uidvalidity, last_uid, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(mailbox) DO UPDATE SET
             uidvalidity = excluded.uidvalidity,
             last_uid = excluded.last_uid,
             updated_at = excluded.updated_at",
        params![mailbox, watermark.uidvalidity, watermark.last_uid, updated_at],
    )?;
    Ok(())
}
