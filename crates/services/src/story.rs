use owl_core::game::Input;
use owl_core::model::{Story, StoryAdvance, StoryPoint};
use storage::repository::{ContentSource, StorageError};
use tokio::sync::mpsc;

use crate::error::{SchedulerError, StoryError};
use crate::session::SessionLoop;

pub const RETRY_PROMPT: &str = "Давай попробуем ещё раз!";

/// What happened at one story point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointOutcome {
    /// The point was cleared and the position moved on.
    Advanced(StoryAdvance),
    /// The task was failed; the same point comes back with the retry prompt.
    Retry,
    /// Every chapter is done.
    Finished,
}

/// Chapter-by-chapter walk through the story script.
#[derive(Debug, Clone)]
pub struct StoryMode {
    story: Story,
}

impl StoryMode {
    #[must_use]
    pub fn new(story: Story) -> Self {
        Self { story }
    }

    /// # Errors
    ///
    /// Returns `StoryError::Content` if the story cannot be loaded.
    pub async fn load(content: &dyn ContentSource) -> Result<Self, StoryError> {
        Ok(Self::new(content.load_story().await?))
    }

    #[must_use]
    pub fn story(&self) -> &Story {
        &self.story
    }

    /// The point the learner stands on, `None` once the story is over.
    #[must_use]
    pub fn current<'a>(&'a self, session: &SessionLoop) -> Option<&'a StoryPoint> {
        let position = session.store().progress().story();
        self.story.locate(&position).map(|(_, point)| point)
    }

    /// Speak the current point's dialogue and play its task, if it has one.
    ///
    /// A point without a task, or whose task no longer exists, is cleared
    /// right away. A failed task leaves the position unchanged.
    ///
    /// # Errors
    ///
    /// Returns `StoryError` if topic content fails to load for a reason other
    /// than a missing topic, or if input closes mid-task.
    pub async fn play_point(
        &self,
        session: &mut SessionLoop,
        inputs: &mut mpsc::Receiver<Input>,
    ) -> Result<PointOutcome, StoryError> {
        self.visit(session, inputs, false).await
    }

    /// Play the current point again after a failure. The retry prompt takes
    /// the place of the point's dialogue.
    ///
    /// # Errors
    ///
    /// Same as `play_point`.
    pub async fn retry_point(
        &self,
        session: &mut SessionLoop,
        inputs: &mut mpsc::Receiver<Input>,
    ) -> Result<PointOutcome, StoryError> {
        self.visit(session, inputs, true).await
    }

    /// Play points until the story is over.
    ///
    /// # Errors
    ///
    /// Propagates the first error from `play_point`.
    pub async fn run(
        &self,
        session: &mut SessionLoop,
        inputs: &mut mpsc::Receiver<Input>,
    ) -> Result<(), StoryError> {
        let mut outcome = self.play_point(session, inputs).await?;
        loop {
            outcome = match outcome {
                PointOutcome::Finished => {
                    tracing::info!("story finished");
                    return Ok(());
                }
                PointOutcome::Retry => self.retry_point(session, inputs).await?,
                PointOutcome::Advanced(_) => self.play_point(session, inputs).await?,
            };
        }
    }

    async fn visit(
        &self,
        session: &mut SessionLoop,
        inputs: &mut mpsc::Receiver<Input>,
        retry: bool,
    ) -> Result<PointOutcome, StoryError> {
        let position = session.store().progress().story();
        let Some((chapter, point)) = self.story.locate(&position) else {
            return Ok(PointOutcome::Finished);
        };
        tracing::debug!(chapter = chapter.id, point = position.point, retry, "story point");
        session.speak(if retry { RETRY_PROMPT } else { point.dialogue.as_str() });

        let Some(step) = &point.task else {
            return Ok(self.advance(session).await);
        };

        let task = match session.scheduler().task(&step.topic, &step.task_id).await {
            Ok(Some(task)) => task,
            Ok(None) | Err(SchedulerError::Content(StorageError::NotFound)) => {
                tracing::warn!(
                    topic = %step.topic,
                    task = %step.task_id,
                    "story task missing, skipping"
                );
                return Ok(self.advance(session).await);
            }
            Err(err) => return Err(err.into()),
        };

        let verdict = session.play_task(&step.topic, &task, inputs).await?;
        if verdict.is_correct() {
            Ok(self.advance(session).await)
        } else {
            Ok(PointOutcome::Retry)
        }
    }

    async fn advance(&self, session: &mut SessionLoop) -> PointOutcome {
        let advance = session.store_mut().advance_story(&self.story).await;
        if advance == StoryAdvance::Finished {
            tracing::info!("last chapter cleared");
        }
        PointOutcome::Advanced(advance)
    }
}
