mod catalog;
mod ids;
mod progress;
mod story;
mod task;

pub use ids::{TaskId, TopicId};

pub use catalog::{TOPIC_CARD_STARS, TopicCatalog, TopicInfo, TopicSummary};
pub use progress::{
    AgeTier, DIFFICULTY_WINDOW, HISTORY_CAPACITY, History, ProgressError, RecordOutcome,
    SessionProgress, TopicProgress, Verdict,
};
pub use story::{Chapter, Story, StoryAdvance, StoryPoint, StoryPosition, StoryTask};
pub use task::{
    AnswerField, ContentError, Pair, PairRecord, Scalar, Task, TaskError, TaskKind, TaskPayload,
    TaskRecord, TopicContent, TopicContentRecord,
};
