//! Application repository — CRUD operations for the `applications` table.
//!
//! Functions take a `&Connection` so callers can compose them inside a
//! transaction; `rusqlite::Transaction` derefs to `Connection`.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::StoreError;
use crate::classify::Stage;

/// A persisted application record.
#[derive(Debug, Clone)]
pub struct ApplicationRow {
    pub id: String,
    pub company: Option<String>,
    pub position: Option<String>,
    pub stage: Stage,
    /// `YYYY-MM-DD`.
    pub applied_date: String,
    /// RFC 3339 timestamp of the last mutation.
    pub last_updated: String,
    pub notes: String,
    pub company_confidence: f32,
    pub position_confidence: f32,
    /// Set when the record was created from ambiguous extraction and
    /// needs user attention.
    pub needs_review: bool,
}

impl ApplicationRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let stage: String = row.get("stage")?;
        Ok(Self {
            id: row.get("id")?,
            company: row.get("company")?,
            position: row.get("position")?,
            stage: Stage::parse(&stage).unwrap_or(Stage::Unknown),
            applied_date: row.get("applied_date")?,
            last_updated: row.get("last_updated")?,
            notes: row.get("notes")?,
            company_confidence: row.get("company_confidence")?,
            position_confidence: row.get("position_confidence")?,
            needs_review: row.get("needs_review")?,
        })
    }
}

const COLUMNS: &str = "id, company, position, stage, applied_date, last_updated, notes,
     company_confidence, position_confidence, needs_review";

/// Inserts a new application row.
pub fn insert(conn: &Connection, app: &ApplicationRow) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO applications (id, company, position, stage, applied_date, last_updated,
         notes, company_confidence, position_confidence, needs_review)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            app.id,
            app.company,
            app.position,
            app.stage.as_str(),
            app.applied_date,
            app.last_updated,
            app.notes,
            app.company_confidence,
            app.position_confidence,
            app.needs_review,
        ],
    )?;
    Ok(())
}

/// Updates an existing application row. All fields except `id` and
/// `applied_date` are overwritten.
pub fn update(conn: &Connection, app: &ApplicationRow) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE applications SET company=?2, position=?3, stage=?4, last_updated=?5,
         notes=?6, company_confidence=?7, position_confidence=?8, needs_review=?9
         WHERE id=?1",
        params![
            app.id,
            app.company,
            app.position,
            app.stage.as_str(),
            app.last_updated,
            app.notes,
            app.company_confidence,
            app.position_confidence,
            app.needs_review,
        ],
    )?;
    Ok(())
}

/// Fetches a single application by id.
pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<ApplicationRow>, StoreError> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM applications WHERE id = ?1"),
            params![id],
            ApplicationRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// Exact (case-insensitive) company+position lookup.
pub fn find_exact(
    conn: &Connection,
    company: &str,
    position: &str,
) -> Result<Option<ApplicationRow>, StoreError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {COLUMNS} FROM applications
                 WHERE LOWER(company) = LOWER(?1) AND LOWER(position) = LOWER(?2)
                 ORDER BY last_updated DESC LIMIT 1"
            ),
            params![company, position],
            ApplicationRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// All applications, most recently updated first.
pub fn all(conn: &Connection) -> Result<Vec<ApplicationRow>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM applications ORDER BY last_updated DESC, id"
    ))?;
    let rows = stmt
        .query_map([], ApplicationRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count(conn: &Connection) -> Result<u32, StoreError> {
    let count = conn.query_row("SELECT COUNT(*) FROM applications", [], |r| r.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;

    fn sample_row(id: &str, company: &str, position: &str) -> ApplicationRow {
        ApplicationRow {
            id: id.to_string(),
            company: Some(company.to_string()),
            position: Some(position.to_string()),
            stage: Stage::Applied,
            applied_date: "2026-08-01".to_string(),
            last_updated: "2026-08-01T10:00:00Z".to_string(),
            notes: String::new(),
            company_confidence: 0.9,
            position_confidence: 0.75,
            needs_review: false,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            insert(conn, &sample_row("a1", "Acme Corp", "Backend Engineer"))?;

            let found = find_by_id(conn, "a1")?.unwrap();
            assert_eq!(found.company.as_deref(), Some("Acme Corp"));
            assert_eq!(found.stage, Stage::Applied);
            assert!(!found.needs_review);

            assert!(find_by_id(conn, "nope")?.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_update_round_trip() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            insert(conn, &sample_row("a1", "Acme Corp", "Backend Engineer"))?;

            let mut row = find_by_id(conn, "a1")?.unwrap();
            row.stage = Stage::Interview;
            row.notes = "note".to_string();
            row.last_updated = "2026-08-03T10:00:00Z".to_string();
            update(conn, &row)?;

            let found = find_by_id(conn, "a1")?.unwrap();
            assert_eq!(found.stage, Stage::Interview);
            assert_eq!(found.notes, "note");
            // applied_date is never rewritten.
            assert_eq!(found.applied_date, "2026-08-01");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_find_exact_is_case_insensitive() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            insert(conn, &sample_row("a1", "Acme Corp", "Backend Engineer"))?;

            let found = find_exact(conn, "acme corp", "BACKEND ENGINEER")?;
            assert_eq!(found.unwrap().id, "a1");
            assert!(find_exact(conn, "Other", "Backend Engineer")?.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_all_orders_by_recency() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let mut older = sample_row("a1", "Acme", "Engineer");
            older.last_updated = "2026-08-01T10:00:00Z".to_string();
            let mut newer = sample_row("a2", "Initech", "Analyst");
            newer.last_updated = "2026-08-05T10:00:00Z".to_string();
            insert(conn, &older)?;
            insert(conn, &newer)?;

            let rows = all(conn)?;
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].id, "a2");
            assert_eq!(rows[1].id, "a1");
            assert_eq!(count(conn)?, 2);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_nullable_company_round_trips() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let mut row = sample_row("a1", "x", "y");
            row.company = None;
            row.position = None;
            row.needs_review = true;
            insert(conn, &row)?;

            let found = find_by_id(conn, "a1")?.unwrap();
            assert!(found.company.is_none());
            assert!(found.position.is_none());
            assert!(found.needs_review);
            Ok(())
        })
        .unwrap();
    }
}
