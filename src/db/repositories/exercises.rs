use std::collections::BTreeSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::db::Database;

impl Database {
    /// Returns false when the exercise was already marked.
    pub async fn mark_exercise_completed(
        &self,
        exercise_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let exercise_id = exercise_id.to_string();
        self.execute(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO completed_exercises (exercise_id, completed_at)
                 VALUES (?1, ?2)",
                params![exercise_id, completed_at.to_rfc3339()],
            )?;
            Ok(inserted > 0)
        })
        .await
    }

    pub async fn completed_exercises(&self) -> Result<BTreeSet<String>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare("SELECT exercise_id FROM completed_exercises")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<BTreeSet<_>>>()?;
            Ok(ids)
        })
        .await
    }
}
