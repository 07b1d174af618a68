use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{parse_datetime, parse_strain_level, to_i64, to_u64},
    Database,
};
use crate::models::SessionRecord;

/// Only this many of the most recent sessions are kept.
pub const MAX_STORED_SESSIONS: usize = 30;

fn row_to_session(row: &Row) -> Result<SessionRecord> {
    let recorded_at: String = row.get("recorded_at")?;
    let duration_secs: i64 = row.get("duration_secs")?;
    let total_blinks: i64 = row.get("total_blinks")?;
    let eye_strain_level: String = row.get("eye_strain_level")?;
    let breaks_taken: i64 = row.get("breaks_taken")?;

    Ok(SessionRecord {
        id: row.get("id")?,
        date: parse_datetime(&recorded_at, "recorded_at")?,
        duration_secs: to_u64(duration_secs, "duration_secs")?,
        total_blinks: to_u64(total_blinks, "total_blinks")?,
        average_blink_rate: row.get("average_blink_rate")?,
        eye_strain_level: parse_strain_level(&eye_strain_level)?,
        breaks_taken: to_u64(breaks_taken, "breaks_taken")?,
    })
}

impl Database {
    /// Append a finished session, dropping the oldest beyond
    /// [`MAX_STORED_SESSIONS`].
    pub async fn add_session(&self, session: &SessionRecord) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO sessions (id, recorded_at, duration_secs, total_blinks, average_blink_rate, eye_strain_level, breaks_taken)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id,
                    record.date.to_rfc3339(),
                    to_i64(record.duration_secs)?,
                    to_i64(record.total_blinks)?,
                    record.average_blink_rate,
                    record.eye_strain_level.as_str(),
                    to_i64(record.breaks_taken)?,
                ],
            )
            .context("failed to insert session")?;
            tx.execute(
                "DELETE FROM sessions
                 WHERE seq NOT IN (SELECT seq FROM sessions ORDER BY seq DESC LIMIT ?1)",
                params![MAX_STORED_SESSIONS as i64],
            )
            .context("failed to prune old sessions")?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Stored sessions, oldest first.
    pub async fn list_sessions(&self) -> Result<Vec<SessionRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, recorded_at, duration_secs, total_blinks, average_blink_rate, eye_strain_level, breaks_taken
                 FROM sessions
                 ORDER BY seq ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }
            Ok(sessions)
        })
        .await
    }
}
