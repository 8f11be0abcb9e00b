use owl_core::model::{AgeTier, History, StoryPosition};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn to_i64(field: &'static str, v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn age_from_i64(v: i64) -> Result<AgeTier, StorageError> {
    let raw = u8::try_from(v).map_err(|_| ser(format!("invalid age: {v}")))?;
    AgeTier::from_u8(raw).map_err(ser)
}

pub(crate) fn encode_history(history: &History) -> Result<String, StorageError> {
    serde_json::to_string(history).map_err(ser)
}

pub(crate) fn decode_history(raw: &str) -> Result<Vec<bool>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

/// Scalar columns of the single learner row.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LearnerRow {
    pub age: AgeTier,
    pub stars: u32,
    pub muted: bool,
    pub story: StoryPosition,
}

pub(crate) fn map_learner_row(row: &SqliteRow) -> Result<LearnerRow, StorageError> {
    let age = age_from_i64(row.try_get("age").map_err(ser)?)?;
    let stars = u32_from_i64("stars", row.try_get("stars").map_err(ser)?)?;
    let muted: i64 = row.try_get("muted").map_err(ser)?;
    let chapter = u32_from_i64("story_chapter", row.try_get("story_chapter").map_err(ser)?)?;
    let point: i64 = row.try_get("story_point").map_err(ser)?;
    let point = usize::try_from(point)
        .map_err(|_| StorageError::Serialization(format!("invalid story_point: {point}")))?;

    Ok(LearnerRow {
        age,
        stars,
        muted: muted != 0,
        story: StoryPosition::new(chapter, point),
    })
}

pub(crate) fn map_current(row: &SqliteRow) -> Result<u32, StorageError> {
    u32_from_i64("current", row.try_get("current").map_err(ser)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_column_is_a_json_array() {
        let history = History::from(vec![true, false, true]);
        let raw = encode_history(&history).unwrap();
        assert_eq!(raw, "[true,false,true]");
        assert_eq!(decode_history(&raw).unwrap(), vec![true, false, true]);
    }

    #[test]
    fn rejects_out_of_range_age() {
        assert_eq!(age_from_i64(2).unwrap(), AgeTier::Older);
        assert!(matches!(age_from_i64(7), Err(StorageError::Serialization(_))));
        assert!(matches!(age_from_i64(-1), Err(StorageError::Serialization(_))));
    }
}
