mod console;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use owl_core::model::{AgeTier, TopicId};
use services::{
    ProgressStore, SessionError, SessionLoop, StoryError, StoryMode, TaskScheduler, TopicRun,
};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

use console::{ConsoleFeedback, ConsoleRenderer, spawn_stdin_reader};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidAge { raw: String },
    MissingTopic,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidAge { raw } => write!(f, "invalid age (expected 1 or 2): {raw}"),
            ArgsError::MissingTopic => write!(f, "play requires a topic id"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Play(TopicId),
    Story,
    Status,
    Age(AgeTier),
    Mute,
    Reset,
}

#[derive(Debug)]
struct Args {
    db_url: String,
    content_dir: PathBuf,
    action: Action,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [status]        [--db <sqlite_url>] [--content <dir>]");
    eprintln!("  cargo run -p app -- play <topic>    [--db <sqlite_url>] [--content <dir>]");
    eprintln!("  cargo run -p app -- story | mute | reset | age <1|2>");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:owl.sqlite3");
    eprintln!("  --content data");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  OWL_DB_URL, OWL_CONTENT_DIR, RUST_LOG");
    eprintln!();
    eprintln!("While playing: `2` picks an option, `l1` `r2` `i3` `s1` tap an element,");
    eprintln!("`i1>s2` drags, `q` quits.");
}

impl Args {
    fn parse_from(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("OWL_DB_URL").map_or_else(
            || normalize_sqlite_url("sqlite:owl.sqlite3".into()),
            normalize_sqlite_url,
        );
        let mut content_dir =
            env("OWL_CONTENT_DIR").map_or_else(|| PathBuf::from("data"), PathBuf::from);
        let mut positional = Vec::new();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--content" => {
                    content_dir = PathBuf::from(require_value(&mut args, "--content")?);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let action = match positional.next().as_deref() {
            None | Some("status") => Action::Status,
            Some("play") => Action::Play(TopicId::new(
                positional.next().ok_or(ArgsError::MissingTopic)?,
            )),
            Some("story") => Action::Story,
            Some("mute") => Action::Mute,
            Some("reset") => Action::Reset,
            Some("age") => {
                let raw = require_value(&mut positional, "age")?;
                let tier = raw
                    .parse::<u8>()
                    .ok()
                    .filter(|v| *v >= 1)
                    .and_then(|v| AgeTier::from_u8(v).ok())
                    .ok_or_else(|| ArgsError::InvalidAge { raw: raw.clone() })?;
                Action::Age(tier)
            }
            Some(other) => return Err(ArgsError::UnknownArg(other.to_owned())),
        };
        if let Some(extra) = positional.next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        Ok(Self {
            db_url,
            content_dir,
            action,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn age_label(age: AgeTier) -> &'static str {
    match age {
        AgeTier::Unset => "не выбран",
        AgeTier::Younger => "3–4 года",
        AgeTier::Older => "5–6 лет",
    }
}

async fn print_status(storage: &Storage, store: &ProgressStore) {
    let progress = store.progress();
    let age = age_label(progress.age());
    let sound = if progress.is_muted() { "выкл" } else { "вкл" };
    println!("⭐ {}   возраст: {age}   звук: {sound}", progress.stars());
    println!(
        "история: глава {}, шаг {}",
        progress.story().chapter,
        progress.story().point + 1
    );

    match storage.content.load_catalog().await {
        Ok(catalog) => {
            for topic in &catalog.topics {
                let summary = store.topic_summary(&topic.id);
                println!(
                    "{} {:<16} {:<5} ({} [{}])",
                    topic.icon,
                    topic.title,
                    "⭐".repeat(summary.card_stars),
                    summary.completed,
                    topic.id
                );
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "topic catalog unavailable");
            for topic in progress.topics().keys() {
                println!("[{topic}] {}", store.topic_summary(topic).completed);
            }
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }
    let parsed = Args::parse_from(args, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url, &parsed.content_dir).await?;
    let mut store = ProgressStore::load(Arc::clone(&storage.progress)).await;

    match parsed.action {
        Action::Status => print_status(&storage, &store).await,
        Action::Age(age) => {
            store.set_age(age).await;
            print_status(&storage, &store).await;
        }
        Action::Mute => {
            let muted = store.toggle_mute().await;
            println!("звук: {}", if muted { "выкл" } else { "вкл" });
        }
        Action::Reset => {
            store.reset().await;
            println!("прогресс сброшен");
        }
        Action::Play(topic) => {
            let mut session = session(&storage, store);
            let mut inputs = spawn_stdin_reader();
            match session.run_topic(&topic, &mut inputs).await {
                Ok(TopicRun::Exhausted { played, correct }) => {
                    session.speak("Ты молодец! Все задания пройдены!");
                    println!("заданий: {played}, верно: {correct}, ⭐ {}", session.store().stars());
                }
                Err(SessionError::Aborted) => println!("пока!"),
                Err(err) => return Err(err.into()),
            }
            report_persist_failures(session.store());
        }
        Action::Story => {
            let mode = StoryMode::load(storage.content.as_ref()).await?;
            let mut session = session(&storage, store);
            let mut inputs = spawn_stdin_reader();
            match mode.run(&mut session, &mut inputs).await {
                Ok(()) => {
                    session.speak("Приключение пройдено! Ты настоящий герой!");
                    println!("⭐ {}", session.store().stars());
                }
                Err(StoryError::Session(SessionError::Aborted)) => println!("пока!"),
                Err(err) => return Err(err.into()),
            }
            report_persist_failures(session.store());
        }
    }

    Ok(())
}

fn session(storage: &Storage, store: ProgressStore) -> SessionLoop {
    SessionLoop::new(
        TaskScheduler::new(Arc::clone(&storage.content)),
        store,
        Arc::new(ConsoleFeedback),
    )
    .with_observer(Arc::new(ConsoleRenderer))
}

fn report_persist_failures(store: &ProgressStore) {
    if store.persist_failures() > 0 {
        eprintln!(
            "warning: progress could not be saved {} time(s)",
            store.persist_failures()
        );
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        Args::parse_from(args.iter().map(|a| (*a).to_owned()), |_| None)
    }

    #[test]
    fn age_labels_match_tiers() {
        assert_eq!(age_label(AgeTier::Younger), "3–4 года");
        assert_eq!(age_label(AgeTier::Older), "5–6 лет");
        assert_eq!(age_label(AgeTier::Unset), "не выбран");
    }

    #[test]
    fn defaults_to_status() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.action, Action::Status);
        assert_eq!(args.content_dir, PathBuf::from("data"));
        assert!(args.db_url.starts_with("sqlite://"));
        assert!(args.db_url.ends_with("owl.sqlite3"));
    }

    #[test]
    fn flags_override_environment() {
        let args = Args::parse_from(
            ["play", "counting", "--db", "sqlite:///tmp/a.db", "--content", "/srv/owl"]
                .map(String::from),
            |key| match key {
                "OWL_DB_URL" => Some("sqlite:///tmp/env.db".into()),
                "OWL_CONTENT_DIR" => Some("/env".into()),
                _ => None,
            },
        )
        .unwrap();
        assert_eq!(args.action, Action::Play(TopicId::new("counting")));
        assert_eq!(args.db_url, "sqlite:///tmp/a.db");
        assert_eq!(args.content_dir, PathBuf::from("/srv/owl"));
    }

    #[test]
    fn parses_age_tiers() {
        assert_eq!(parse(&["age", "2"]).unwrap().action, Action::Age(AgeTier::Older));
        assert!(matches!(parse(&["age", "0"]), Err(ArgsError::InvalidAge { .. })));
        assert!(matches!(parse(&["age", "3"]), Err(ArgsError::InvalidAge { .. })));
        assert!(matches!(parse(&["age"]), Err(ArgsError::MissingValue { .. })));
    }

    #[test]
    fn rejects_unknown_input() {
        assert!(matches!(parse(&["play"]), Err(ArgsError::MissingTopic)));
        assert!(matches!(parse(&["dance"]), Err(ArgsError::UnknownArg(_))));
        assert!(matches!(parse(&["--verbose"]), Err(ArgsError::UnknownArg(_))));
        assert!(matches!(parse(&["mute", "twice"]), Err(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn sqlite_urls_become_absolute() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(normalize_sqlite_url("sqlite:/var/owl.db".into()), "sqlite:///var/owl.db");
    }
}
