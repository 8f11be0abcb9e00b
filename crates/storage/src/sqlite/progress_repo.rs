use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use owl_core::model::{SessionProgress, TaskId, TopicId, TopicProgress};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conn, decode_history, encode_history, map_current, map_learner_row, ser, to_i64,
};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load(&self) -> Result<Option<SessionProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT age, stars, muted, story_chapter, story_point
            FROM learner
            WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let learner = map_learner_row(&row)?;

        let mut completed: BTreeMap<String, BTreeSet<TaskId>> = BTreeMap::new();
        let rows = sqlx::query("SELECT topic_id, task_id FROM topic_completed")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        for row in rows {
            let topic: String = row.try_get("topic_id").map_err(ser)?;
            let task: String = row.try_get("task_id").map_err(ser)?;
            completed.entry(topic).or_default().insert(TaskId::new(task));
        }

        let mut topics = BTreeMap::new();
        let rows = sqlx::query("SELECT topic_id, history, current FROM topic_progress")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        for row in rows {
            let topic: String = row.try_get("topic_id").map_err(ser)?;
            let history: String = row.try_get("history").map_err(ser)?;
            let record = TopicProgress::from_persisted(
                completed.remove(&topic).unwrap_or_default(),
                decode_history(&history)?,
                map_current(&row)?,
            );
            topics.insert(TopicId::new(topic), record);
        }

        if !completed.is_empty() {
            return Err(StorageError::Serialization(
                "completed tasks reference unknown topics".into(),
            ));
        }

        Ok(Some(SessionProgress::from_persisted(
            learner.age,
            learner.stars,
            learner.muted,
            learner.story,
            topics,
        )))
    }

    async fn save(&self, progress: &SessionProgress) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO learner (id, age, stars, muted, story_chapter, story_point, saved_at)
            VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                age = excluded.age,
                stars = excluded.stars,
                muted = excluded.muted,
                story_chapter = excluded.story_chapter,
                story_point = excluded.story_point,
                saved_at = excluded.saved_at
            ",
        )
        .bind(i64::from(progress.age().to_u8()))
        .bind(i64::from(progress.stars()))
        .bind(i64::from(progress.is_muted()))
        .bind(i64::from(progress.story().chapter))
        .bind(to_i64("story_point", progress.story().point)?)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        // Cascades to topic_completed.
        sqlx::query("DELETE FROM topic_progress")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (topic, record) in progress.topics() {
            sqlx::query(
                r"
                INSERT INTO topic_progress (topic_id, history, current)
                VALUES (?1, ?2, ?3)
                ",
            )
            .bind(topic.as_str())
            .bind(encode_history(record.history())?)
            .bind(i64::from(record.current()))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            for task in record.completed() {
                sqlx::query(
                    r"
                    INSERT INTO topic_completed (topic_id, task_id)
                    VALUES (?1, ?2)
                    ",
                )
                .bind(topic.as_str())
                .bind(task.as_str())
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(topics = progress.topics().len(), "saved progress");
        Ok(())
    }
}
