use serde::{Deserialize, Serialize};

use crate::model::ids::TopicId;
use crate::model::progress::TopicProgress;

/// Maximum stars shown on a topic card.
pub const TOPIC_CARD_STARS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicInfo {
    pub id: TopicId,
    pub title: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
}

/// The topic picker's list, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopicCatalog {
    pub topics: Vec<TopicInfo>,
}

/// Progress shown on a topic card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicSummary {
    pub completed: usize,
    pub card_stars: usize,
}

impl TopicSummary {
    #[must_use]
    pub fn from_progress(progress: Option<&TopicProgress>) -> Self {
        let completed = progress.map_or(0, |p| p.completed().len());
        Self {
            completed,
            card_stars: completed.min(TOPIC_CARD_STARS),
        }
    }
}
