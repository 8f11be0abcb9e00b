//! Adaptive task selection.
//!
//! Difficulty follows a short, fast-decaying window of recent outcomes:
//! strong recent play raises the tier, weak play drops it, and anything in
//! between holds at the player's age baseline.

use crate::model::{AgeTier, DIFFICULTY_WINDOW, Task, TopicContent, TopicProgress};

/// Highest tier the window can promote a player to.
pub const PROMOTED_TIER: u8 = 2;

/// Tier the window falls back to after a run of mistakes.
pub const DEMOTED_TIER: u8 = 1;

/// Correct answers within the window needed for promotion.
pub const PROMOTE_AT: usize = 4;

/// Correct answers within the window at or below which the player is demoted.
pub const DEMOTE_AT: usize = 1;

/// Effective difficulty for a topic.
///
/// With fewer than five recorded outcomes the age baseline applies. Older
/// history never influences the result.
///
/// # Examples
///
/// ```
/// # use owl_core::model::{AgeTier, TaskId, TopicProgress, Verdict};
/// # use owl_core::scheduler::effective_difficulty;
/// let mut progress = TopicProgress::default();
/// for _ in 0..5 {
///     progress.record(&TaskId::new("t"), Verdict::Correct);
/// }
/// assert_eq!(effective_difficulty(&progress, AgeTier::Unset), 2);
/// ```
#[must_use]
pub fn effective_difficulty(topic: &TopicProgress, age: AgeTier) -> u8 {
    let history = topic.history();
    if history.len() < DIFFICULTY_WINDOW {
        return age.baseline();
    }

    let correct = history.recent(DIFFICULTY_WINDOW).filter(|c| *c).count();
    if correct >= PROMOTE_AT {
        PROMOTED_TIER
    } else if correct <= DEMOTE_AT {
        DEMOTED_TIER
    } else {
        age.baseline()
    }
}

/// First task in content order that is unlocked at `difficulty` and not yet completed.
///
/// `None` means the topic is exhausted at this tier.
#[must_use]
pub fn next_task<'a>(
    content: &'a TopicContent,
    topic: &TopicProgress,
    difficulty: u8,
) -> Option<&'a Task> {
    content
        .tasks()
        .iter()
        .find(|task| task.difficulty() <= difficulty && !topic.is_completed(task.id()))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
