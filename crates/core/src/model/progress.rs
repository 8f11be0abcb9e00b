use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;

use crate::model::ids::{TaskId, TopicId};
use crate::model::story::{Story, StoryAdvance, StoryPosition};

/// History capacity per topic.
pub const HISTORY_CAPACITY: usize = 10;

/// Number of most recent outcomes that drive difficulty.
pub const DIFFICULTY_WINDOW: usize = 5;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgressError {
    #[error("invalid age tier value: {0}")]
    InvalidAgeTier(u8),
}

//
// ─── VERDICT ───────────────────────────────────────────────────────────────────
//

/// Pass/fail result of one task attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Correct,
    Incorrect,
}

impl Verdict {
    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, Verdict::Correct)
    }
}

impl From<bool> for Verdict {
    fn from(correct: bool) -> Self {
        if correct {
            Verdict::Correct
        } else {
            Verdict::Incorrect
        }
    }
}

//
// ─── AGE TIER ──────────────────────────────────────────────────────────────────
//

/// Player age bracket chosen on the home screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AgeTier {
    /// Not chosen yet.
    #[default]
    Unset,
    /// 3–4 years.
    Younger,
    /// 5–6 years.
    Older,
}

impl AgeTier {
    /// Baseline difficulty tier for this age; `Unset` plays as the younger tier.
    #[must_use]
    pub fn baseline(self) -> u8 {
        match self {
            AgeTier::Unset | AgeTier::Younger => 1,
            AgeTier::Older => 2,
        }
    }

    /// Converts the stored 0/1/2 value.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidAgeTier` for anything else.
    pub fn from_u8(value: u8) -> Result<Self, ProgressError> {
        match value {
            0 => Ok(Self::Unset),
            1 => Ok(Self::Younger),
            2 => Ok(Self::Older),
            _ => Err(ProgressError::InvalidAgeTier(value)),
        }
    }

    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            AgeTier::Unset => 0,
            AgeTier::Younger => 1,
            AgeTier::Older => 2,
        }
    }
}

impl TryFrom<u8> for AgeTier {
    type Error = ProgressError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value)
    }
}

impl From<AgeTier> for u8 {
    fn from(value: AgeTier) -> Self {
        value.to_u8()
    }
}

//
// ─── HISTORY ───────────────────────────────────────────────────────────────────
//

/// Bounded FIFO of recent answer outcomes, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<bool>", into = "Vec<bool>")]
pub struct History(VecDeque<bool>);

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self(VecDeque::with_capacity(HISTORY_CAPACITY))
    }

    /// Appends an outcome, evicting the oldest beyond capacity.
    pub fn push(&mut self, correct: bool) {
        self.0.push_back(correct);
        while self.0.len() > HISTORY_CAPACITY {
            self.0.pop_front();
        }
    }

    /// The most recent `n` outcomes (fewer if the history is shorter), oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().skip(self.0.len().saturating_sub(n)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<bool>> for History {
    fn from(values: Vec<bool>) -> Self {
        let mut history = Self::new();
        for value in values {
            history.push(value);
        }
        history
    }
}

impl From<History> for Vec<bool> {
    fn from(history: History) -> Self {
        history.0.into_iter().collect()
    }
}

//
// ─── TOPIC PROGRESS ────────────────────────────────────────────────────────────
//

/// Per-topic learner record.
///
/// The completed set only ever grows; the history is bounded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopicProgress {
    completed: BTreeSet<TaskId>,
    history: History,
    #[serde(default)]
    current: u32,
}

impl TopicProgress {
    /// Rehydrate a topic record from persisted storage.
    #[must_use]
    pub fn from_persisted(completed: BTreeSet<TaskId>, history: Vec<bool>, current: u32) -> Self {
        Self {
            completed,
            history: History::from(history),
            current,
        }
    }

    #[must_use]
    pub fn completed(&self) -> &BTreeSet<TaskId> {
        &self.completed
    }

    #[must_use]
    pub fn is_completed(&self, id: &TaskId) -> bool {
        self.completed.contains(id)
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Legacy position pointer; kept for round-tripping only.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.current
    }

    /// Records one outcome and returns true when `task` became completed by it.
    pub fn record(&mut self, task: &TaskId, verdict: Verdict) -> bool {
        self.history.push(verdict.is_correct());
        verdict.is_correct() && self.completed.insert(task.clone())
    }
}

//
// ─── SESSION PROGRESS ──────────────────────────────────────────────────────────
//

/// Result of recording a single answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    pub newly_completed: bool,
    pub stars: u32,
}

/// Whole-learner state persisted after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionProgress {
    age: AgeTier,
    stars: u32,
    #[serde(default)]
    muted: bool,
    #[serde(default)]
    story: StoryPosition,
    #[serde(default)]
    topics: BTreeMap<TopicId, TopicProgress>,
}

impl SessionProgress {
    /// Rehydrate session progress from persisted storage.
    #[must_use]
    pub fn from_persisted(
        age: AgeTier,
        stars: u32,
        muted: bool,
        story: StoryPosition,
        topics: BTreeMap<TopicId, TopicProgress>,
    ) -> Self {
        Self {
            age,
            stars,
            muted,
            story,
            topics,
        }
    }

    #[must_use]
    pub fn age(&self) -> AgeTier {
        self.age
    }

    #[must_use]
    pub fn stars(&self) -> u32 {
        self.stars
    }

    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    #[must_use]
    pub fn story(&self) -> StoryPosition {
        self.story
    }

    #[must_use]
    pub fn topics(&self) -> &BTreeMap<TopicId, TopicProgress> {
        &self.topics
    }

    /// Read-only lookup that does not create a record.
    #[must_use]
    pub fn topic(&self, topic: &TopicId) -> Option<&TopicProgress> {
        self.topics.get(topic)
    }

    /// Returns the topic record, creating the zero value on first access.
    pub fn topic_entry(&mut self, topic: &TopicId) -> &TopicProgress {
        self.topics.entry(topic.clone()).or_default()
    }

    pub fn set_age(&mut self, age: AgeTier) {
        self.age = age;
    }

    /// Flips the mute flag and returns the new value.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    /// Appends to the topic history; a first correct answer completes the task
    /// and earns exactly one star.
    pub fn record_answer(
        &mut self,
        topic: &TopicId,
        task: &TaskId,
        verdict: Verdict,
    ) -> RecordOutcome {
        let newly_completed = self
            .topics
            .entry(topic.clone())
            .or_default()
            .record(task, verdict);
        if newly_completed {
            self.stars = self.stars.saturating_add(1);
        }
        RecordOutcome {
            newly_completed,
            stars: self.stars,
        }
    }

    pub fn advance_story(&mut self, story: &Story) -> StoryAdvance {
        self.story.advance(story)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_last_ten_in_order() {
        let mut history = History::new();
        let pushes: Vec<bool> = (1..=11).map(|i| i % 3 == 0).collect();
        for value in &pushes {
            history.push(*value);
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        let kept: Vec<bool> = history.iter().collect();
        assert_eq!(kept, pushes[1..].to_vec());
    }

    #[test]
    fn recent_returns_tail() {
        let history = History::from(vec![false, true, true, false, true, true, false]);
        let tail: Vec<bool> = history.recent(DIFFICULTY_WINDOW).collect();
        assert_eq!(tail, vec![true, false, true, true, false]);
        assert_eq!(history.recent(20).count(), 7);
    }

    #[test]
    fn history_from_long_vec_is_truncated() {
        let history = History::from(vec![true; 15]);
        assert_eq!(history.len(), HISTORY_CAPACITY);
    }

    #[test]
    fn repeated_correct_answer_earns_one_star() {
        let mut progress = SessionProgress::default();
        let topic = TopicId::new("counting");
        let task = TaskId::new("c1");

        let first = progress.record_answer(&topic, &task, Verdict::Correct);
        let second = progress.record_answer(&topic, &task, Verdict::Correct);

        assert!(first.newly_completed);
        assert!(!second.newly_completed);
        assert_eq!(progress.stars(), 1);
        let record = progress.topic(&topic).unwrap();
        assert_eq!(record.history().len(), 2);
        assert_eq!(record.completed().len(), 1);
    }

    #[test]
    fn wrong_answer_only_touches_history() {
        let mut progress = SessionProgress::default();
        let topic = TopicId::new("colors");
        let outcome = progress.record_answer(&topic, &TaskId::new("k1"), Verdict::Incorrect);
        assert_eq!(outcome.stars, 0);
        let record = progress.topic(&topic).unwrap();
        assert!(record.completed().is_empty());
        assert_eq!(record.history().iter().collect::<Vec<_>>(), vec![false]);
    }

    #[test]
    fn topic_entry_creates_zero_record() {
        let mut progress = SessionProgress::default();
        let topic = TopicId::new("shapes");
        assert!(progress.topic(&topic).is_none());
        let record = progress.topic_entry(&topic);
        assert!(record.completed().is_empty());
        assert!(record.history().is_empty());
        assert!(progress.topic(&topic).is_some());
    }

    #[test]
    fn age_tier_conversion() {
        assert_eq!(AgeTier::from_u8(2).unwrap(), AgeTier::Older);
        assert_eq!(AgeTier::Unset.baseline(), 1);
        assert!(matches!(
            AgeTier::from_u8(7),
            Err(ProgressError::InvalidAgeTier(7))
        ));
    }

    #[test]
    fn defaults_match_first_launch() {
        let progress = SessionProgress::default();
        assert_eq!(progress.age(), AgeTier::Unset);
        assert_eq!(progress.stars(), 0);
        assert!(!progress.is_muted());
        assert_eq!(progress.story(), StoryPosition::default());
        assert!(progress.topics().is_empty());
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let mut progress = SessionProgress::default();
        progress.set_age(AgeTier::Younger);
        progress.toggle_mute();
        progress.record_answer(&TopicId::new("t"), &TaskId::new("a"), Verdict::Correct);
        progress.record_answer(&TopicId::new("t"), &TaskId::new("b"), Verdict::Incorrect);

        let json = serde_json::to_string(&progress).unwrap();
        let back: SessionProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, progress);
    }
}
