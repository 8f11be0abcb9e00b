//! Audio and speech output as seen from the session.

use std::sync::Mutex;

use owl_core::game::Cue;

/// Where cues and spoken lines go. Infallible: a broken speaker never fails a task.
pub trait FeedbackSink: Send + Sync {
    fn correct(&self);
    fn wrong(&self);
    fn speak(&self, text: &str);

    fn cue(&self, cue: Cue) {
        match cue {
            Cue::Correct => self.correct(),
            Cue::Wrong => self.wrong(),
        }
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentFeedback;

impl FeedbackSink for SilentFeedback {
    fn correct(&self) {}
    fn wrong(&self) {}
    fn speak(&self, _text: &str) {}
}

/// Logs feedback through `tracing`, for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFeedback;

impl FeedbackSink for TracingFeedback {
    fn correct(&self) {
        tracing::info!(cue = "correct", "feedback");
    }

    fn wrong(&self) {
        tracing::info!(cue = "wrong", "feedback");
    }

    fn speak(&self, text: &str) {
        tracing::info!(text, "speak");
    }
}

/// One call received by a `RecordingFeedback`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackEvent {
    Correct,
    Wrong,
    Speak(String),
}

/// Keeps every call in order; handy for asserting on what a learner heard.
#[derive(Debug, Default)]
pub struct RecordingFeedback {
    events: Mutex<Vec<FeedbackEvent>>,
}

impl RecordingFeedback {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<FeedbackEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Spoken lines only.
    #[must_use]
    pub fn spoken(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                FeedbackEvent::Speak(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: FeedbackEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl FeedbackSink for RecordingFeedback {
    fn correct(&self) {
        self.push(FeedbackEvent::Correct);
    }

    fn wrong(&self) {
        self.push(FeedbackEvent::Wrong);
    }

    fn speak(&self, text: &str) {
        self.push(FeedbackEvent::Speak(text.to_owned()));
    }
}
