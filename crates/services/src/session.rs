use std::sync::Arc;
use std::time::Duration;

use owl_core::game::{Game, Input, Timings};
use owl_core::model::{Task, TopicId, Verdict};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;

use crate::driver::{GameObserver, drive_game};
use crate::error::SessionError;
use crate::feedback::FeedbackSink;
use crate::progress::ProgressStore;
use crate::scheduler::TaskScheduler;

pub const PRAISE: &str = "Правильно! Молодец!";
pub const ENCOURAGE: &str = "Попробуй ещё!";

/// Wait between one task's verdict and the next task.
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(1500);

/// How a topic run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicRun {
    /// No schedulable task is left at the learner's level.
    Exhausted { played: usize, correct: usize },
}

/// Plays tasks one after another and records each verdict.
pub struct SessionLoop {
    scheduler: TaskScheduler,
    store: ProgressStore,
    feedback: Arc<dyn FeedbackSink>,
    observer: Option<Arc<dyn GameObserver>>,
    timings: Timings,
    pause: Duration,
    rng: StdRng,
}

impl SessionLoop {
    #[must_use]
    pub fn new(
        scheduler: TaskScheduler,
        store: ProgressStore,
        feedback: Arc<dyn FeedbackSink>,
    ) -> Self {
        Self {
            scheduler,
            store,
            feedback,
            observer: None,
            timings: Timings::default(),
            pause: DEFAULT_PAUSE,
            rng: StdRng::from_os_rng(),
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn GameObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    #[must_use]
    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    #[must_use]
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Fix the shuffle seed, for reproducible pools.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    #[must_use]
    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ProgressStore {
        &mut self.store
    }

    /// Say `text` unless the learner muted the app.
    pub fn speak(&self, text: &str) {
        if !self.store.is_muted() {
            self.feedback.speak(text);
        }
    }

    /// Run one attempt at `task`, record it, then praise or encourage.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Aborted` if input closes mid-task; nothing is
    /// recorded in that case.
    ///
    /// Input still queued once the pause is over is discarded, so the next
    /// task only sees taps made on its own screen.
    pub async fn play_task(
        &mut self,
        topic: &TopicId,
        task: &Task,
        inputs: &mut mpsc::Receiver<Input>,
    ) -> Result<Verdict, SessionError> {
        let mut game = Game::new(task, self.timings, &mut self.rng);
        tracing::info!(%topic, task = %task.id(), kind = %task.kind(), "task started");

        let verdict = drive_game(
            &mut game,
            inputs,
            self.feedback.as_ref(),
            self.observer.as_deref(),
            self.store.is_muted(),
        )
        .await?;

        self.store.record_answer(topic, task.id(), verdict).await;
        self.speak(if verdict.is_correct() { PRAISE } else { ENCOURAGE });
        tokio::time::sleep(self.pause).await;
        discard_stale(topic, inputs);
        Ok(verdict)
    }

    /// Keep scheduling and playing tasks of `topic` until none is left.
    ///
    /// A failed choice or sequence task stays the first uncompleted one, so
    /// it comes straight back.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if content cannot be loaded or input closes.
    pub async fn run_topic(
        &mut self,
        topic: &TopicId,
        inputs: &mut mpsc::Receiver<Input>,
    ) -> Result<TopicRun, SessionError> {
        let mut played = 0;
        let mut correct = 0;
        while let Some(task) = self.scheduler.next(topic, &self.store).await? {
            let verdict = self.play_task(topic, &task, inputs).await?;
            played += 1;
            if verdict.is_correct() {
                correct += 1;
            }
        }
        tracing::info!(%topic, played, correct, "topic exhausted");
        Ok(TopicRun::Exhausted { played, correct })
    }
}

/// Drop input that arrived after the verdict. It belongs to a screen that is gone.
fn discard_stale(topic: &TopicId, inputs: &mut mpsc::Receiver<Input>) {
    let mut dropped = 0usize;
    while inputs.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        tracing::debug!(%topic, dropped, "discarded input from finished task");
    }
}
