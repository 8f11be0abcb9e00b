#![forbid(unsafe_code)]

pub mod driver;
pub mod error;
pub mod feedback;
pub mod progress;
pub mod scheduler;
pub mod session;
pub mod story;

pub use driver::{GameObserver, drive_game};
pub use error::{SchedulerError, SessionError, StoryError};
pub use feedback::{FeedbackEvent, FeedbackSink, RecordingFeedback, SilentFeedback, TracingFeedback};
pub use progress::ProgressStore;
pub use scheduler::TaskScheduler;
pub use session::{SessionLoop, TopicRun};
pub use story::{PointOutcome, StoryMode};
