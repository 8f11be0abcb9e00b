use rand::Rng;
use rand::seq::SliceRandom;

use crate::model::{Task, TaskId, Verdict};

use super::timer::Deferrals;
use super::{AnswerMachine, Cue, Effect, Input, Phase, Target, TimerToken, Timings};

#[derive(Debug, Clone, PartialEq)]
enum Deferred {
    Complete(Verdict),
}

/// Order-the-sequence: slots fill left to right from a shuffled pool.
///
/// Each pool entry can be chosen once. The attempt resolves when every slot
/// is filled; there is no retry.
#[derive(Debug, Clone)]
pub struct SequenceGame {
    task_id: TaskId,
    prompt: String,
    expected: Vec<String>,
    pool: Vec<String>,
    used: Vec<bool>,
    chosen: Vec<usize>,
    timings: Timings,
    phase: Phase,
    deferred: Deferrals<Deferred>,
}

impl SequenceGame {
    pub(crate) fn new<R: Rng + ?Sized>(
        task: &Task,
        items: &[String],
        timings: Timings,
        rng: &mut R,
    ) -> Self {
        let mut pool = items.to_vec();
        pool.shuffle(rng);
        Self::with_pool(task, items, pool, timings)
    }

    fn with_pool(task: &Task, items: &[String], pool: Vec<String>, timings: Timings) -> Self {
        Self {
            task_id: task.id().clone(),
            prompt: task.prompt().to_owned(),
            expected: items.to_vec(),
            used: vec![false; pool.len()],
            pool,
            chosen: Vec::with_capacity(items.len()),
            timings,
            phase: Phase::Presenting,
            deferred: Deferrals::new(),
        }
    }

    /// Shuffled options; `Target::Option` indexes into this.
    #[must_use]
    pub fn pool(&self) -> &[String] {
        &self.pool
    }

    #[must_use]
    pub fn is_used(&self, index: usize) -> bool {
        self.used.get(index).copied().unwrap_or(false)
    }

    /// Values placed so far, left to right.
    pub fn chosen(&self) -> impl Iterator<Item = &str> + '_ {
        self.chosen.iter().map(|&i| self.pool[i].as_str())
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.expected.len()
    }

    fn select(&mut self, index: usize) -> Vec<Effect> {
        if !self.phase.accepts_input() || index >= self.pool.len() || self.used[index] {
            return Vec::new();
        }

        self.used[index] = true;
        self.chosen.push(index);
        self.phase = Phase::Collecting;
        if !self.is_complete() {
            return Vec::new();
        }

        let verdict = Verdict::from(self.chosen().eq(self.expected.iter().map(String::as_str)));
        self.phase = if verdict.is_correct() {
            Phase::ResolvedCorrect
        } else {
            Phase::ResolvedIncorrect
        };
        vec![
            Effect::Cue(Cue::from(verdict)),
            self.deferred
                .schedule(Deferred::Complete(verdict), self.timings.complete_delay),
        ]
    }
}

impl AnswerMachine for SequenceGame {
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
            Input::Select(Target::Option(index)) => self.select(index),
            _ => Vec::new(),
        }
    }

    fn fire(&mut self, token: TimerToken) -> Vec<Effect> {
        match self.deferred.take(token) {
            Some(Deferred::Complete(verdict)) => {
                self.phase = Phase::Finished;
                vec![Effect::Complete(verdict)]
            }
            None => Vec::new(),
        }
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn is_complete(&self) -> bool {
        self.chosen.len() == self.expected.len()
    }

    fn cancel(&mut self) {
        self.deferred.clear();
        if self.phase != Phase::Finished {
            self.phase = Phase::Cancelled;
        }
    }
}
