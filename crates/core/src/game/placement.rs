use rand::Rng;
use rand::seq::SliceRandom;

use crate::model::{Task, TaskId, Verdict};

use super::drag::Drag;
use super::timer::Deferrals;
use super::{AnswerMachine, Cue, Effect, Input, Phase, Point, Target, TimerToken, Timings};

#[derive(Debug, Clone, PartialEq)]
enum Deferred {
    Reset,
    Complete,
}

/// Drag-to-slot: fill fixed slots from a shuffled pool whose values may repeat.
///
/// Usage is tracked per pool index, so equal values are placed independently.
/// Invariant: the number of consumed pool entries equals the number of filled
/// slots. A wrong full answer flashes, then clears every slot after a delay;
/// retries are unlimited and only a correct answer completes.
#[derive(Debug, Clone)]
pub struct PlacementGame {
    task_id: TaskId,
    prompt: String,
    expected: Vec<String>,
    pool: Vec<String>,
    consumed: Vec<bool>,
    slots: Vec<Option<usize>>,
    selected: Option<usize>,
    drag: Drag<usize>,
    timings: Timings,
    phase: Phase,
    deferred: Deferrals<Deferred>,
}

impl PlacementGame {
    pub(crate) fn new<R: Rng + ?Sized>(
        task: &Task,
        items: &[String],
        answer: &[String],
        timings: Timings,
        rng: &mut R,
    ) -> Self {
        let mut pool = items.to_vec();
        pool.shuffle(rng);
        Self::with_pool(task, pool, answer, timings)
    }

    fn with_pool(task: &Task, pool: Vec<String>, answer: &[String], timings: Timings) -> Self {
        Self {
            task_id: task.id().clone(),
            prompt: task.prompt().to_owned(),
            expected: answer.to_vec(),
            consumed: vec![false; pool.len()],
            pool,
            slots: vec![None; answer.len()],
            selected: None,
            drag: Drag::new(),
            timings,
            phase: Phase::Presenting,
            deferred: Deferrals::new(),
        }
    }

    /// Shuffled items; `Target::Item` indexes into this.
    #[must_use]
    pub fn pool(&self) -> &[String] {
        &self.pool
    }

    /// Whether pool entry `index` currently sits in a slot.
    #[must_use]
    pub fn is_consumed(&self, index: usize) -> bool {
        self.consumed.get(index).copied().unwrap_or(false)
    }

    /// Slot contents, left to right.
    pub fn slots(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        self.slots
            .iter()
            .map(|slot| slot.map(|i| self.pool[i].as_str()))
    }

    /// Pool index held by `slot`.
    #[must_use]
    pub fn slot_source(&self, slot: usize) -> Option<usize> {
        self.slots.get(slot).copied().flatten()
    }

    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn drag_position(&self) -> Option<Point> {
        self.drag.position()
    }

    fn item_available(&self, index: usize) -> bool {
        self.phase.accepts_input() && index < self.pool.len() && !self.consumed[index]
    }

    fn select_item(&mut self, index: usize) {
        if self.item_available(index) {
            self.selected = Some(index);
            self.phase = Phase::Collecting;
        }
    }

    fn select_slot(&mut self, slot: usize) -> Vec<Effect> {
        if !self.phase.accepts_input() || slot >= self.slots.len() {
            return Vec::new();
        }

        if let Some(index) = self.slots[slot].take() {
            self.consumed[index] = false;
            self.selected = None;
            return Vec::new();
        }

        match self.selected {
            Some(index) => self.place(index, slot),
            None => Vec::new(),
        }
    }

    fn release(&mut self, over: Option<Target>, at: Point) -> Vec<Effect> {
        let Some(dropped) = self.drag.release(over, at) else {
            return Vec::new();
        };
        match dropped.target {
            Some(Target::Slot(slot))
                if slot < self.slots.len()
                    && self.slots[slot].is_none()
                    && self.item_available(dropped.source) =>
            {
                self.place(dropped.source, slot)
            }
            _ => {
                self.selected = None;
                Vec::new()
            }
        }
    }

    fn place(&mut self, index: usize, slot: usize) -> Vec<Effect> {
        self.slots[slot] = Some(index);
        self.consumed[index] = true;
        self.selected = None;
        if !self.is_complete() {
            return Vec::new();
        }
        self.validate()
    }

    fn validate(&mut self) -> Vec<Effect> {
        let correct = self
            .slots()
            .zip(&self.expected)
            .all(|(placed, expected)| placed == Some(expected.as_str()));

        if correct {
            self.phase = Phase::ResolvedCorrect;
            vec![
                Effect::Cue(Cue::Correct),
                self.deferred
                    .schedule(Deferred::Complete, self.timings.complete_delay),
            ]
        } else {
            self.phase = Phase::ResolvedIncorrect;
            vec![
                Effect::Cue(Cue::Wrong),
                self.deferred
                    .schedule(Deferred::Reset, self.timings.retry_reset),
            ]
        }
    }

    fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.consumed.iter_mut().for_each(|used| *used = false);
        self.selected = None;
        self.drag.cancel();
        self.phase = Phase::Collecting;
    }
}

impl AnswerMachine for PlacementGame {
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
            Input::Select(Target::Item(index)) => {
                self.select_item(index);
                Vec::new()
            }
            Input::Select(Target::Slot(slot)) => self.select_slot(slot),
            Input::PointerDown {
                target: Target::Item(index),
                at,
            } => {
                if self.item_available(index) {
                    self.select_item(index);
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
            Some(Deferred::Reset) => {
                self.reset();
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
        self.slots.iter().all(Option::is_some)
    }

    fn cancel(&mut self) {
        self.deferred.clear();
        self.drag.cancel();
        if self.phase != Phase::Finished {
            self.phase = Phase::Cancelled;
        }
    }
}
