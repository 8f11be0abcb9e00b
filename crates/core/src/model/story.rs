use serde::{Deserialize, Serialize};

use crate::model::ids::{TaskId, TopicId};

/// Reference to a task from a topic's level file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryTask {
    pub topic: TopicId,
    #[serde(rename = "taskId")]
    pub task_id: TaskId,
}

/// One stop on a chapter map: a line of dialogue, optionally followed by a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPoint {
    pub dialogue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<StoryTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub icon: String,
    pub points: Vec<StoryPoint>,
}

/// Story-mode content: chapters are looked up by id, starting at 1.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Story {
    pub chapters: Vec<Chapter>,
}

impl Story {
    #[must_use]
    pub fn chapter(&self, id: u32) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    /// Chapter and point at `position`, or `None` once the story is finished.
    #[must_use]
    pub fn locate(&self, position: &StoryPosition) -> Option<(&Chapter, &StoryPoint)> {
        let chapter = self.chapter(position.chapter)?;
        chapter.points.get(position.point).map(|p| (chapter, p))
    }
}

/// What happened when the learner moved past a story point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryAdvance {
    NextPoint,
    NextChapter,
    Finished,
}

/// Chapter id and point index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPosition {
    pub chapter: u32,
    pub point: usize,
}

impl Default for StoryPosition {
    fn default() -> Self {
        Self {
            chapter: 1,
            point: 0,
        }
    }
}

impl StoryPosition {
    #[must_use]
    pub fn new(chapter: u32, point: usize) -> Self {
        Self { chapter, point }
    }

    /// Moves to the next point, rolling into the next chapter past the last one.
    pub fn advance(&mut self, story: &Story) -> StoryAdvance {
        self.point += 1;
        let len = story.chapter(self.chapter).map_or(0, |c| c.points.len());
        if self.point < len {
            return StoryAdvance::NextPoint;
        }

        self.chapter = self.chapter.saturating_add(1);
        self.point = 0;
        if story.chapter(self.chapter).is_some() {
            StoryAdvance::NextChapter
        } else {
            StoryAdvance::Finished
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story() -> Story {
        let point = |d: &str| StoryPoint {
            dialogue: d.into(),
            task: None,
        };
        Story {
            chapters: vec![
                Chapter {
                    id: 1,
                    title: "Forest".into(),
                    icon: "🌲".into(),
                    points: vec![point("hello"), point("bye")],
                },
                Chapter {
                    id: 2,
                    title: "River".into(),
                    icon: "🌊".into(),
                    points: vec![point("splash")],
                },
            ],
        }
    }

    #[test]
    fn advance_walks_points_then_chapters() {
        let story = story();
        let mut pos = StoryPosition::default();

        assert_eq!(story.locate(&pos).unwrap().1.dialogue, "hello");
        assert_eq!(pos.advance(&story), StoryAdvance::NextPoint);
        assert_eq!(pos, StoryPosition::new(1, 1));
        assert_eq!(pos.advance(&story), StoryAdvance::NextChapter);
        assert_eq!(pos, StoryPosition::new(2, 0));
        assert_eq!(pos.advance(&story), StoryAdvance::Finished);
        assert_eq!(pos, StoryPosition::new(3, 0));
        assert!(story.locate(&pos).is_none());
    }

    #[test]
    fn story_json_uses_task_id_key() {
        let json = r#"{"chapters":[{"id":1,"title":"A","icon":"x","points":[
            {"dialogue":"hi","task":{"topic":"counting","taskId":"c2"}}]}]}"#;
        let story: Story = serde_json::from_str(json).unwrap();
        let (_, point) = story.locate(&StoryPosition::default()).unwrap();
        let task = point.task.as_ref().unwrap();
        assert_eq!(task.topic.as_str(), "counting");
        assert_eq!(task.task_id.as_str(), "c2");
    }
}
