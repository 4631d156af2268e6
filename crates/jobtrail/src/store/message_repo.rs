//! Source-message links — which emails are already folded into which
//! application. The `message_id` primary key is what makes reprocessing
//! idempotent and keeps any email out of two records.

use rusqlite::{params, Connection, OptionalExtension};

use super::StoreError;

/// Links a message to an application. Fails if the message is already
/// linked anywhere (primary key).
pub fn link(
    conn: &Connection,
    message_id: &str,
    application_id: &str,
    linked_at: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO source_messages (message_id, application_id, linked_at)
         VALUES (?1, ?2, ?3)",
        params![message_id, application_id, linked_at],
    )?;
    Ok(())
}

/// Returns the application id a message is linked to, if any.
pub fn find_application(
    conn: &Connection,
    message_id: &str,
) -> Result<Option<String>, StoreError> {
    let id = conn
        .query_row(
            "SELECT application_id FROM source_messages WHERE message_id = ?1",
            params![message_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(id)
}

/// All message ids folded into one application, in link order.
pub fn list_for_application(
    conn: &Connection,
    application_id: &str,
) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT message_id FROM source_messages
         WHERE application_id = ?1 ORDER BY linked_at, message_id",
    )?;
    let ids = stmt
        .query_map(params![application_id], |r| r.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Stage;
    use crate::store::{application_repo, Database};

    fn insert_application(conn: &Connection, id: &str) {
        application_repo::insert(
            conn,
            &application_repo::ApplicationRow {
                id: id.to_string(),
                company: Some("Acme".to_string()),
                position: Some("Engineer".to_string()),
                stage: Stage::Applied,
                applied_date: "2026-08-01".to_string(),
                last_updated: "2026-08-01T10:00:00Z".to_string(),
                notes: String::new(),
                company_confidence: 0.9,
                position_confidence: 0.75,
                needs_review: false,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_link_and_lookup() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            insert_application(conn, "a1");
            link(conn, "<m1@x>", "a1", "2026-08-01T10:00:00Z")?;

            assert_eq!(find_application(conn, "<m1@x>")?.as_deref(), Some("a1"));
            assert!(find_application(conn, "<m2@x>")?.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_message_cannot_link_twice() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            insert_application(conn, "a1");
            insert_application(conn, "a2");
            link(conn, "<m1@x>", "a1", "2026-08-01T10:00:00Z")?;

            // Second link for the same message, even to another record,
            // is rejected by the schema.
            assert!(link(conn, "<m1@x>", "a2", "2026-08-01T10:05:00Z").is_err());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_list_for_application() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            insert_application(conn, "a1");
            link(conn, "<m1@x>", "a1", "2026-08-01T10:00:00Z")?;
            link(conn, "<m2@x>", "a1", "2026-08-02T10:00:00Z")?;

            let ids = list_for_application(conn, "a1")?;
            assert_eq!(ids, vec!["<m1@x>".to_string(), "<m2@x>".to_string()]);
            assert!(list_for_application(conn, "a2")?.is_empty());
            Ok(())
        })
        .unwrap();
    }
}
