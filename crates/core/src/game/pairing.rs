use rand::Rng;
use rand::seq::SliceRandom;

use crate::model::{Pair, Task, TaskId, Verdict};

use super::drag::Drag;
use super::timer::Deferrals;
use super::{AnswerMachine, Cue, Effect, Input, Phase, Point, Target, TimerToken, Timings};

#[derive(Debug, Clone, PartialEq)]
enum Deferred {
    ClearWrong,
    Complete,
}

/// Match-the-pairs: connect each left item with its right counterpart.
///
/// Left items keep content order; right items are shuffled. A right value
/// matches when it equals the pending left's partner, so duplicated right
/// values are interchangeable. Wrong attempts only flash; the task as a whole
/// cannot fail.
#[derive(Debug, Clone)]
pub struct PairingGame {
    task_id: TaskId,
    prompt: String,
    pairs: Vec<Pair>,
    rights: Vec<String>,
    left_done: Vec<bool>,
    right_done: Vec<bool>,
    committed: usize,
    pending_left: Option<usize>,
    wrong: Option<(usize, usize)>,
    drag: Drag<usize>,
    timings: Timings,
    phase: Phase,
    deferred: Deferrals<Deferred>,
}

impl PairingGame {
    pub(crate) fn new<R: Rng + ?Sized>(
        task: &Task,
        pairs: &[Pair],
        timings: Timings,
        rng: &mut R,
    ) -> Self {
        let mut rights: Vec<String> = pairs.iter().map(|p| p.right.clone()).collect();
        rights.shuffle(rng);
        Self::with_rights(task, pairs, rights, timings)
    }

    fn with_rights(task: &Task, pairs: &[Pair], rights: Vec<String>, timings: Timings) -> Self {
        let n = pairs.len();
        Self {
            task_id: task.id().clone(),
            prompt: task.prompt().to_owned(),
            pairs: pairs.to_vec(),
            rights,
            left_done: vec![false; n],
            right_done: vec![false; n],
            committed: 0,
            pending_left: None,
            wrong: None,
            drag: Drag::new(),
            timings,
            phase: Phase::Presenting,
            deferred: Deferrals::new(),
        }
    }

    /// Left column, content order.
    pub fn lefts(&self) -> impl Iterator<Item = &str> + '_ {
        self.pairs.iter().map(|p| p.left.as_str())
    }

    /// Right column, shuffled; `Target::Right` indexes into this.
    #[must_use]
    pub fn rights(&self) -> &[String] {
        &self.rights
    }

    #[must_use]
    pub fn is_left_committed(&self, index: usize) -> bool {
        self.left_done.get(index).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn is_right_committed(&self, index: usize) -> bool {
        self.right_done.get(index).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn pending_left(&self) -> Option<usize> {
        self.pending_left
    }

    /// Left and right indices currently flashing as a wrong match.
    #[must_use]
    pub fn wrong_flash(&self) -> Option<(usize, usize)> {
        self.wrong
    }

    #[must_use]
    pub fn committed(&self) -> usize {
        self.committed
    }

    /// Pointer position while a left item is being dragged.
    #[must_use]
    pub fn drag_position(&self) -> Option<Point> {
        self.drag.position()
    }

    fn left_selectable(&self, index: usize) -> bool {
        self.phase.accepts_input() && index < self.pairs.len() && !self.left_done[index]
    }

    fn right_selectable(&self, index: usize) -> bool {
        self.phase.accepts_input() && index < self.rights.len() && !self.right_done[index]
    }

    fn choose_left(&mut self, index: usize) {
        if self.left_selectable(index) {
            self.pending_left = Some(index);
            self.phase = Phase::Collecting;
        }
    }

    fn choose_right(&mut self, index: usize) -> Vec<Effect> {
        match self.pending_left {
            Some(left) if self.right_selectable(index) => self.attempt(left, index),
            _ => Vec::new(),
        }
    }

    fn release(&mut self, over: Option<Target>, at: Point) -> Vec<Effect> {
        let Some(dropped) = self.drag.release(over, at) else {
            return Vec::new();
        };
        match dropped.target {
            Some(Target::Right(right))
                if self.right_selectable(right) && self.left_selectable(dropped.source) =>
            {
                self.attempt(dropped.source, right)
            }
            _ => {
                self.pending_left = None;
                Vec::new()
            }
        }
    }

    fn attempt(&mut self, left: usize, right: usize) -> Vec<Effect> {
        self.pending_left = None;
        if self.pairs[left].right != self.rights[right] {
            self.wrong = Some((left, right));
            self.deferred.cancel(&Deferred::ClearWrong);
            return vec![
                self.deferred
                    .schedule(Deferred::ClearWrong, self.timings.wrong_flash),
            ];
        }

        self.left_done[left] = true;
        self.right_done[right] = true;
        self.committed += 1;
        if self.committed < self.pairs.len() {
            return Vec::new();
        }

        self.wrong = None;
        self.deferred.cancel(&Deferred::ClearWrong);
        self.phase = Phase::ResolvedCorrect;
        vec![
            Effect::Cue(Cue::Correct),
            self.deferred
                .schedule(Deferred::Complete, self.timings.complete_delay),
        ]
    }
}

impl AnswerMachine for PairingGame {
    fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    fn present(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Presenting {
            return Vec::new();
        }
        self.phase = Phase::Collecting;
        vec![Effect::Speak(self.prompt.clone())]
    }

    fn handle_input(&mut self, input: Input) -> Vec<Effect> {
        match input {
            Input::Select(Target::Left(index)) => {
                self.choose_left(index);
                Vec::new()
            }
            Input::Select(Target::Right(index)) => self.choose_right(index),
            Input::PointerDown {
                target: Target::Left(index),
                at,
            } => {
                if self.left_selectable(index) {
                    self.choose_left(index);
                    self.drag.begin(index, at);
                }
                Vec::new()
            }
            Input::PointerMove { at } => {
                self.drag.track(at);
                Vec::new()
            }
            Input::PointerUp { over, at } => self.release(over, at),
            _ => Vec::new(),
        }
    }

    fn fire(&mut self, token: TimerToken) -> Vec<Effect> {
        match self.deferred.take(token) {
            Some(Deferred::ClearWrong) => {
                self.wrong = None;
                Vec::new()
            }
            Some(Deferred::Complete) => {
                self.phase = Phase::Finished;
                vec![Effect::Complete(Verdict::Correct)]
            }
            None => Vec::new(),
        }
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn is_complete(&self) -> bool {
        self.committed == self.pairs.len()
    }

    fn cancel(&mut self) {
        self.deferred.clear();
        self.drag.cancel();
        if self.phase != Phase::Finished {
            self.phase = Phase::Cancelled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::testing::{completions, drain, scheduled};
    use crate::model::TaskPayload;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pairs() -> Vec<Pair> {
        vec![
            Pair::new("🐱", "мяу"),
            Pair::new("🐶", "гав"),
            Pair::new("🐮", "му"),
        ]
    }

    fn game() -> PairingGame {
        let task = Task::new(
            "m1",
            1,
            "Кто как говорит?",
            None,
            TaskPayload::Pairing { pairs: pairs() },
        )
        .unwrap();
        let rights = vec!["му".to_owned(), "мяу".to_owned(), "гав".to_owned()];
        PairingGame::with_rights(&task, &pairs(), rights, Timings::default())
    }

    fn right_of(game: &PairingGame, value: &str) -> usize {
        game.rights().iter().position(|r| r == value).unwrap()
    }

    fn select(game: &mut PairingGame, left: usize, right: usize) -> Vec<Effect> {
        let mut effects = game.handle_input(Input::Select(Target::Left(left)));
        effects.extend(game.handle_input(Input::Select(Target::Right(right))));
        effects
    }

    #[test]
    fn all_correct_with_wrong_attempts_completes_once() {
        let mut game = game();
        game.present();
        let (meow, woof, moo) = (
            right_of(&game, "мяу"),
            right_of(&game, "гав"),
            right_of(&game, "му"),
        );
        let mut effects = Vec::new();

        effects.extend(select(&mut game, 0, woof));
        effects.extend(select(&mut game, 2, moo));
        effects.extend(select(&mut game, 1, meow));
        effects.extend(select(&mut game, 1, woof));
        assert_eq!(game.committed(), 2);
        assert!(completions(&effects).is_empty());

        effects.extend(select(&mut game, 0, meow));
        assert!(game.is_complete());
        assert_eq!(game.phase(), Phase::ResolvedCorrect);

        let all = drain(&mut game, effects);
        assert_eq!(completions(&all), vec![Verdict::Correct]);
        assert_eq!(game.phase(), Phase::Finished);
    }

    #[test]
    fn wrong_attempt_flashes_and_clears_pending() {
        let mut game = game();
        let wrong_right = right_of(&game, "му");
        let effects = select(&mut game, 0, wrong_right);

        assert_eq!(game.committed(), 0);
        assert_eq!(game.pending_left(), None);
        assert_eq!(game.wrong_flash(), Some((0, wrong_right)));
        assert!(completions(&effects).is_empty());

        let token = scheduled(&effects)[0];
        assert!(game.fire(token).is_empty());
        assert_eq!(game.wrong_flash(), None);
        assert_eq!(game.phase(), Phase::Collecting);
    }

    #[test]
    fn newer_flash_replaces_older_timer() {
        let mut game = game();
        let moo = right_of(&game, "му");
        let first = select(&mut game, 0, moo);
        let second = select(&mut game, 1, moo);

        game.fire(scheduled(&first)[0]);
        assert_eq!(game.wrong_flash(), Some((1, moo)));
        game.fire(scheduled(&second)[0]);
        assert_eq!(game.wrong_flash(), None);
    }

    #[test]
    fn committed_items_are_not_selectable() {
        let mut game = game();
        let meow = right_of(&game, "мяу");
        select(&mut game, 0, meow);
        assert!(game.is_left_committed(0));
        assert!(game.is_right_committed(meow));

        game.handle_input(Input::Select(Target::Left(0)));
        assert_eq!(game.pending_left(), None);

        game.handle_input(Input::Select(Target::Left(1)));
        let effects = game.handle_input(Input::Select(Target::Right(meow)));
        assert!(effects.is_empty());
        assert_eq!(game.pending_left(), Some(1));
        assert_eq!(game.wrong_flash(), None);
    }

    #[test]
    fn right_without_pending_left_does_nothing() {
        let mut game = game();
        assert!(game.handle_input(Input::Select(Target::Right(0))).is_empty());
        assert_eq!(game.committed(), 0);
    }

    #[test]
    fn drag_to_matching_right_commits() {
        let mut game = game();
        let woof = right_of(&game, "гав");
        game.handle_input(Input::PointerDown {
            target: Target::Left(1),
            at: Point::new(10.0, 10.0),
        });
        game.handle_input(Input::PointerMove {
            at: Point::new(80.0, 12.0),
        });
        assert_eq!(game.drag_position(), Some(Point::new(80.0, 12.0)));
        assert_eq!(game.pending_left(), Some(1));

        game.handle_input(Input::PointerUp {
            over: Some(Target::Right(woof)),
            at: Point::new(90.0, 12.0),
        });
        assert!(game.is_left_committed(1));
        assert_eq!(game.drag_position(), None);
    }

    #[test]
    fn drag_released_elsewhere_cancels_selection() {
        let mut game = game();
        let meow = right_of(&game, "мяу");
        select(&mut game, 0, meow);

        game.handle_input(Input::PointerDown {
            target: Target::Left(1),
            at: Point::default(),
        });
        game.handle_input(Input::PointerUp {
            over: Some(Target::Right(meow)),
            at: Point::default(),
        });
        assert_eq!(game.pending_left(), None);
        assert_eq!(game.committed(), 1);

        game.handle_input(Input::PointerDown {
            target: Target::Left(2),
            at: Point::default(),
        });
        game.handle_input(Input::PointerUp {
            over: None,
            at: Point::default(),
        });
        assert_eq!(game.pending_left(), None);
        assert_eq!(game.wrong_flash(), None);
    }

    #[test]
    fn drag_release_over_wrong_right_flashes() {
        let mut game = game();
        let moo = right_of(&game, "му");
        game.handle_input(Input::PointerDown {
            target: Target::Left(0),
            at: Point::default(),
        });
        let effects = game.handle_input(Input::PointerUp {
            over: Some(Target::Right(moo)),
            at: Point::default(),
        });
        assert_eq!(game.wrong_flash(), Some((0, moo)));
        assert_eq!(scheduled(&effects).len(), 1);
    }

    #[test]
    fn shuffle_preserves_right_values() {
        let mut rng = StdRng::seed_from_u64(3);
        let task = Task::new("m1", 1, "q", None, TaskPayload::Pairing { pairs: pairs() }).unwrap();
        let game = PairingGame::new(&task, &pairs(), Timings::default(), &mut rng);
        let mut rights = game.rights().to_vec();
        rights.sort();
        let mut expected: Vec<String> = pairs().into_iter().map(|p| p.right).collect();
        expected.sort();
        assert_eq!(rights, expected);
        assert_eq!(game.lefts().collect::<Vec<_>>(), vec!["🐱", "🐶", "🐮"]);
    }
}
