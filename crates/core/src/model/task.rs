use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

use crate::model::ids::TaskId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Reasons a task definition is rejected at load time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TaskError {
    #[error("task id cannot be empty")]
    EmptyId,

    #[error("difficulty must be >= 1")]
    ZeroDifficulty,

    #[error("unknown task type: {0}")]
    UnknownType(String),

    #[error("missing field `{field}` for this task type")]
    MissingField { field: &'static str },

    #[error("choice task has no options")]
    NoOptions,

    #[error("choice answer `{0}` is not one of the options")]
    AnswerNotAnOption(String),

    #[error("sequence task has no items")]
    EmptySequence,

    #[error("pairing task has no pairs")]
    NoPairs,

    #[error("placement task must declare at least one slot")]
    ZeroSlots,

    #[error("placement declares {slots} slots but the answer has {answer} entries")]
    SlotCountMismatch { slots: usize, answer: usize },

    #[error("placement answer needs `{value}` more often than the item pool offers it")]
    UnplaceableAnswer { value: String },
}

/// Errors raised while assembling a topic's task list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentError {
    #[error("task `{id}`: {source}")]
    InvalidTask {
        id: String,
        #[source]
        source: TaskError,
    },

    #[error("duplicate task id: {0}")]
    DuplicateTaskId(TaskId),
}

//
// ─── TASK ──────────────────────────────────────────────────────────────────────
//

/// The four game variants a task can be played as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Choice,
    Sequence,
    Pairing,
    Placement,
}

impl TaskKind {
    /// Content-data tag for this kind.
    #[must_use]
    pub fn as_tag(self) -> &'static str {
        match self {
            TaskKind::Choice => "choice",
            TaskKind::Sequence => "sequence",
            TaskKind::Pairing => "match",
            TaskKind::Placement => "drag-drop",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// One left/right association in a pairing task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub left: String,
    pub right: String,
}

impl Pair {
    #[must_use]
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

/// Kind-specific answer definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPayload {
    /// Pick one option; correct when it equals `answer`.
    Choice { options: Vec<String>, answer: String },
    /// Reproduce `items` in this exact order.
    Sequence { items: Vec<String> },
    /// Connect every left value with its right value.
    Pairing { pairs: Vec<Pair> },
    /// Fill `slots` positions from `items` so they read as `answer`.
    Placement {
        items: Vec<String>,
        slots: usize,
        answer: Vec<String>,
    },
}

impl TaskPayload {
    #[must_use]
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskPayload::Choice { .. } => TaskKind::Choice,
            TaskPayload::Sequence { .. } => TaskKind::Sequence,
            TaskPayload::Pairing { .. } => TaskKind::Pairing,
            TaskPayload::Placement { .. } => TaskKind::Placement,
        }
    }

    fn validate(&self) -> Result<(), TaskError> {
        match self {
            TaskPayload::Choice { options, answer } => {
                if options.is_empty() {
                    return Err(TaskError::NoOptions);
                }
                if !options.contains(answer) {
                    return Err(TaskError::AnswerNotAnOption(answer.clone()));
                }
            }
            TaskPayload::Sequence { items } => {
                if items.is_empty() {
                    return Err(TaskError::EmptySequence);
                }
            }
            TaskPayload::Pairing { pairs } => {
                if pairs.is_empty() {
                    return Err(TaskError::NoPairs);
                }
            }
            TaskPayload::Placement {
                items,
                slots,
                answer,
            } => {
                if *slots == 0 {
                    return Err(TaskError::ZeroSlots);
                }
                if answer.len() != *slots {
                    return Err(TaskError::SlotCountMismatch {
                        slots: *slots,
                        answer: answer.len(),
                    });
                }
                let mut available: HashMap<&str, usize> = HashMap::new();
                for item in items {
                    *available.entry(item.as_str()).or_default() += 1;
                }
                for value in answer {
                    match available.get_mut(value.as_str()) {
                        Some(left) if *left > 0 => *left -= 1,
                        _ => {
                            return Err(TaskError::UnplaceableAnswer {
                                value: value.clone(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Immutable content unit: one question of a given kind and difficulty.
///
/// Tasks are only constructed through validation, so every `Task` in a
/// running session is answerable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    difficulty: u8,
    prompt: String,
    illustration: Option<String>,
    payload: TaskPayload,
}

impl Task {
    /// Validates and builds a task.
    ///
    /// # Errors
    ///
    /// Returns `TaskError` when the id is blank, the difficulty is zero, or
    /// the payload cannot be answered correctly.
    pub fn new(
        id: impl Into<TaskId>,
        difficulty: u8,
        prompt: impl Into<String>,
        illustration: Option<String>,
        payload: TaskPayload,
    ) -> Result<Self, TaskError> {
        let id = id.into();
        if id.is_empty() {
            return Err(TaskError::EmptyId);
        }
        if difficulty == 0 {
            return Err(TaskError::ZeroDifficulty);
        }
        payload.validate()?;

        Ok(Self {
            id,
            difficulty,
            prompt: prompt.into(),
            illustration,
            payload,
        })
    }

    #[must_use]
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    #[must_use]
    pub fn difficulty(&self) -> u8 {
        self.difficulty
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn illustration(&self) -> Option<&str> {
        self.illustration.as_deref()
    }

    #[must_use]
    pub fn payload(&self) -> &TaskPayload {
        &self.payload
    }

    #[must_use]
    pub fn kind(&self) -> TaskKind {
        self.payload.kind()
    }
}

//
// ─── RAW RECORDS ───────────────────────────────────────────────────────────────
//

/// Scalar content value; level files mix numbers and strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Real(f64),
}

impl Scalar {
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Scalar::Text(text) => text,
            Scalar::Integer(n) => n.to_string(),
            Scalar::Real(x) => x.to_string(),
        }
    }
}

/// `answer` is a single value for choice tasks and a list for placement tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerField {
    One(Scalar),
    Many(Vec<Scalar>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRecord {
    pub left: Scalar,
    pub right: Scalar,
}

/// Persisted shape of a task inside a level file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub difficulty: u8,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Scalar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<AnswerField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Scalar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairs: Option<Vec<PairRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots: Option<usize>,
}

fn texts(values: Vec<Scalar>) -> Vec<String> {
    values.into_iter().map(Scalar::into_text).collect()
}

impl TaskRecord {
    /// Convert the record into a validated `Task`.
    ///
    /// # Errors
    ///
    /// Returns `TaskError` for unknown types, missing kind-specific fields,
    /// or definitions that fail `Task::new` validation.
    pub fn validate(self) -> Result<Task, TaskError> {
        let payload = match self.kind.as_str() {
            "choice" => {
                let options = self
                    .options
                    .ok_or(TaskError::MissingField { field: "options" })?;
                let answer = match self.answer {
                    Some(AnswerField::One(value)) => value.into_text(),
                    _ => return Err(TaskError::MissingField { field: "answer" }),
                };
                TaskPayload::Choice {
                    options: texts(options),
                    answer,
                }
            }
            "sequence" => TaskPayload::Sequence {
                items: texts(self.items.ok_or(TaskError::MissingField { field: "items" })?),
            },
            "match" => TaskPayload::Pairing {
                pairs: self
                    .pairs
                    .ok_or(TaskError::MissingField { field: "pairs" })?
                    .into_iter()
                    .map(|p| Pair::new(p.left.into_text(), p.right.into_text()))
                    .collect(),
            },
            "drag-drop" => {
                let items = self.items.ok_or(TaskError::MissingField { field: "items" })?;
                let slots = self.slots.ok_or(TaskError::MissingField { field: "slots" })?;
                let answer = match self.answer {
                    Some(AnswerField::Many(values)) => texts(values),
                    _ => return Err(TaskError::MissingField { field: "answer" }),
                };
                TaskPayload::Placement {
                    items: texts(items),
                    slots,
                    answer,
                }
            }
            other => return Err(TaskError::UnknownType(other.to_owned())),
        };

        Task::new(self.id, self.difficulty, self.question, self.image, payload)
    }
}

//
// ─── TOPIC CONTENT ─────────────────────────────────────────────────────────────
//

/// Level file layout: `{ "tasks": [ ... ] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicContentRecord {
    pub tasks: Vec<TaskRecord>,
}

/// Ordered, validated task list of one topic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopicContent {
    tasks: Vec<Task>,
}

impl TopicContent {
    /// # Errors
    ///
    /// Returns `ContentError::DuplicateTaskId` if two tasks share an id.
    pub fn new(tasks: Vec<Task>) -> Result<Self, ContentError> {
        let mut seen = HashSet::with_capacity(tasks.len());
        for task in &tasks {
            if !seen.insert(task.id()) {
                return Err(ContentError::DuplicateTaskId(task.id().clone()));
            }
        }
        Ok(Self { tasks })
    }

    /// Validate every record eagerly, rejecting the whole topic on the first bad task.
    ///
    /// # Errors
    ///
    /// Returns `ContentError` naming the first invalid or duplicated task.
    pub fn from_record(record: TopicContentRecord) -> Result<Self, ContentError> {
        let tasks = record
            .tasks
            .into_iter()
            .map(|raw| {
                let id = raw.id.clone();
                raw.validate()
                    .map_err(|source| ContentError::InvalidTask { id, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(tasks)
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    #[must_use]
    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
