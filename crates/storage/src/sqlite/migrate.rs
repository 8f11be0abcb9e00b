use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned migrations recorded in `schema_migrations`.
///
/// Version 1 creates the learner row, per-topic records and completed tasks.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS learner (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    age INTEGER NOT NULL CHECK (age BETWEEN 0 AND 2),
                    stars INTEGER NOT NULL CHECK (stars >= 0),
                    muted INTEGER NOT NULL CHECK (muted IN (0, 1)),
                    story_chapter INTEGER NOT NULL CHECK (story_chapter >= 0),
                    story_point INTEGER NOT NULL CHECK (story_point >= 0),
                    saved_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS topic_progress (
                    topic_id TEXT PRIMARY KEY,
                    history TEXT NOT NULL,
                    current INTEGER NOT NULL DEFAULT 0 CHECK (current >= 0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS topic_completed (
                    topic_id TEXT NOT NULL,
                    task_id TEXT NOT NULL,
                    PRIMARY KEY (topic_id, task_id),
                    FOREIGN KEY (topic_id) REFERENCES topic_progress(topic_id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied sqlite migration");
    }

    Ok(())
}
