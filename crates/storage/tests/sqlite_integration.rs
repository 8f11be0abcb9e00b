use owl_core::model::{AgeTier, SessionProgress, Story, StoryPosition, TaskId, TopicId, Verdict};
use storage::repository::ProgressRepository;
use storage::sqlite::SqliteRepository;

async fn repo(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn one_chapter_story() -> Story {
    serde_json::from_str(
        r#"{"chapters": [{"id": 1, "title": "Лес", "points": [
            {"dialogue": "Привет!"},
            {"dialogue": "Посчитай грибы", "task": {"topic": "counting", "taskId": "c1"}}
        ]}]}"#,
    )
    .unwrap()
}

#[tokio::test]
async fn empty_database_loads_nothing() {
    let repo = repo("memdb_empty").await;
    assert!(repo.load().await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_roundtrip_is_lossless() {
    let repo = repo("memdb_roundtrip").await;
    let counting = TopicId::new("counting");
    let colors = TopicId::new("colors");

    let mut progress = SessionProgress::default();
    progress.set_age(AgeTier::Younger);
    progress.toggle_mute();
    for (task, verdict) in [
        ("c1", Verdict::Incorrect),
        ("c1", Verdict::Correct),
        ("c2", Verdict::Correct),
        ("c1", Verdict::Correct),
    ] {
        progress.record_answer(&counting, &TaskId::new(task), verdict);
    }
    progress.record_answer(&colors, &TaskId::new("k1"), Verdict::Incorrect);
    progress.advance_story(&one_chapter_story());

    repo.save(&progress).await.unwrap();
    let loaded = repo.load().await.unwrap().expect("saved state");

    assert_eq!(loaded, progress);
    assert_eq!(loaded.stars(), 2);
    assert!(loaded.is_muted());
    assert_eq!(loaded.story(), StoryPosition::new(1, 1));
    let history: Vec<bool> = loaded.topic(&counting).unwrap().history().iter().collect();
    assert_eq!(history, vec![false, true, true, true]);
    assert!(loaded.topic(&colors).unwrap().completed().is_empty());
}

#[tokio::test]
async fn save_replaces_previous_state() {
    let repo = repo("memdb_replace").await;
    let mut progress = SessionProgress::default();
    progress.record_answer(&"counting".into(), &"c1".into(), Verdict::Correct);
    repo.save(&progress).await.unwrap();

    let reset = SessionProgress::default();
    repo.save(&reset).await.unwrap();

    let loaded = repo.load().await.unwrap().unwrap();
    assert_eq!(loaded, reset);
    assert!(loaded.topics().is_empty());
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = repo("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}
